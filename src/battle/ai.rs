//! A module for defining AI behaviors for battle participants.

use crate::battle::calculators::check_cast;
use crate::battle::conditions::ConditionSnapshot;
use crate::battle::patterns::{archetype_for, ActionPreference, BehaviorCatalog, BehaviorPattern};
use crate::battle::resolver::{name_of, ActionKind, DecisionSource, ResolvedAction};
use crate::battle::rng::BattleRng;
use crate::battle::targeting::{select_target, suggest_optimal_target, TargetKind};
use crate::participant::{Participant, ParticipantId};
use ordered_float::OrderedFloat;
use schema::{Ability, SkillKind};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;

/// A trait for any system that can decide on a battle action.
/// Rule-driven participants and rule-less enemies both go through this seam.
pub trait Behavior {
    /// Inspects the rosters and decides on the next action for `actor`.
    fn decide_action(
        &mut self,
        actor: &Participant,
        allies: &[Participant],
        enemies: &[Participant],
        turn_number: u32,
        rng: &mut BattleRng,
    ) -> ResolvedAction;
}

/// What the enemy AI settled on, before it is handed to the engine.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct EnemyDecision {
    pub action: ActionKind,
    pub skill_id: Option<String>,
    pub target_id: ParticipantId,
    pub target_name: String,
    pub priority: u32,
    pub reasoning: String,
    pub pattern: String,
}

impl EnemyDecision {
    pub fn into_resolved(self, actor: &Participant) -> ResolvedAction {
        ResolvedAction {
            actor_id: actor.id.clone(),
            actor_name: actor.name.clone(),
            message: format!("{} uses {} on {} ({})", actor.name, self.action, self.target_name, self.reasoning),
            action: self.action,
            target_id: Some(self.target_id),
            target_name: Some(self.target_name),
            priority: self.priority,
            success: true,
            substituted: false,
            source: DecisionSource::Pattern(self.pattern),
        }
    }
}

/// A pattern after its adaptive rules have been folded in.
struct ScoredPattern<'p> {
    pattern: &'p BehaviorPattern,
    score: f32,
    targets: &'p [TargetKind],
    actions: &'p [ActionPreference],
    triggered: Vec<String>,
}

/// Decision source for enemies that carry no authored rules.
pub struct EnemyAI {
    catalog: BehaviorCatalog,
    tank_ratio: f64,
}

impl EnemyAI {
    pub fn new(tank_ratio: f64) -> Self {
        Self {
            catalog: BehaviorCatalog::default(),
            tank_ratio,
        }
    }

    pub fn with_catalog(mut self, catalog: BehaviorCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    fn score<'p>(&self, pattern: &'p BehaviorPattern, snapshot: &ConditionSnapshot<'_>) -> Option<ScoredPattern<'p>> {
        if !pattern.gates.iter().any(|gate| gate.evaluate(snapshot)) {
            return None;
        }
        let mut scored = ScoredPattern {
            pattern,
            score: pattern.priority,
            targets: &pattern.targets,
            actions: &pattern.actions,
            triggered: Vec::new(),
        };
        for rule in pattern.adaptive.iter().filter(|r| r.condition.evaluate(snapshot)) {
            scored.score += rule.priority_bonus;
            if let Some(targets) = &rule.targets {
                scored.targets = targets.as_slice();
            }
            if let Some(actions) = &rule.actions {
                scored.actions = actions.as_slice();
            }
            scored.triggered.push(rule.condition.to_string());
        }
        Some(scored)
    }

    /// Run pattern selection for `actor`. Returns `None` only when there is
    /// nothing left to act on.
    pub fn decide(
        &self,
        actor: &Participant,
        allies: &[Participant],
        enemies: &[Participant],
        turn_number: u32,
        rng: &mut BattleRng,
    ) -> Option<EnemyDecision> {
        let snapshot = ConditionSnapshot {
            actor,
            allies,
            enemies,
            turn_number,
            tank_ratio: self.tank_ratio,
        };
        let archetype = archetype_for(actor);

        let mut candidates: Vec<ScoredPattern> = self
            .catalog
            .patterns_for(archetype)
            .iter()
            .filter_map(|p| self.score(p, &snapshot))
            .collect();
        // Stable, so equal scores keep catalog order.
        candidates.sort_by_key(|c| Reverse(OrderedFloat(c.score)));
        let best = candidates.into_iter().next();

        let (pattern_name, score, targets, actions, mut reasoning) = match &best {
            Some(c) => (
                c.pattern.name.clone(),
                c.score,
                c.targets,
                c.actions,
                if c.triggered.is_empty() {
                    format!("{} pattern '{}'", archetype, c.pattern.name)
                } else {
                    format!("{} pattern '{}' adapted on {}", archetype, c.pattern.name, c.triggered.join(", "))
                },
            ),
            None => (
                "default".to_string(),
                0.0,
                &[][..],
                &[][..],
                format!("no {} pattern applies", archetype),
            ),
        };
        tracing::debug!(actor = %actor.id, %archetype, pattern = %pattern_name, score, "enemy pattern chosen");

        // No usable preference means a basic attack.
        let skill: Option<&Ability> = actions
            .iter()
            .find_map(|pref| usable_ability(actor, pref))
            .flatten();
        let action = match skill {
            Some(ability) => ActionKind::Cast(ability.id.clone()),
            None => ActionKind::Attack,
        };

        let mut target: Option<ParticipantId> = targets
            .iter()
            .find_map(|kind| select_target(*kind, actor, allies, enemies, rng).target);

        // Keep hostile actions on the other side and supportive ones on ours.
        let wants_enemy = skill.map_or(true, |s| matches!(s.kind, SkillKind::Attack | SkillKind::Debuff));
        let on_own_side = |id: &str| allies.iter().any(|a| a.id == id);
        let misaimed = match &target {
            Some(id) if skill.is_some_and(|s| s.is_summon()) => id != &actor.id,
            Some(id) => wants_enemy == on_own_side(id.as_str()),
            None => true,
        };
        if misaimed {
            let retarget = match skill {
                Some(s) if s.is_summon() => select_target(TargetKind::SelfTarget, actor, allies, enemies, rng),
                Some(s) => suggest_optimal_target(s.kind, actor, allies, enemies, rng),
                None => select_target(TargetKind::RandomEnemy, actor, allies, enemies, rng),
            };
            if retarget.target.is_some() && target.is_some() {
                reasoning.push_str("; retargeted to fit the action");
            }
            target = retarget.target;
        }

        let target_id = target?;
        let target_name = name_of(&target_id, allies, enemies).unwrap_or_else(|| target_id.clone());
        Some(EnemyDecision {
            skill_id: skill.map(|s| s.id.clone()),
            action,
            target_id,
            target_name,
            priority: score.max(0.0).round() as u32,
            reasoning,
            pattern: pattern_name,
        })
    }
}

impl Default for EnemyAI {
    fn default() -> Self {
        Self::new(1.2)
    }
}

impl Behavior for EnemyAI {
    fn decide_action(
        &mut self,
        actor: &Participant,
        allies: &[Participant],
        enemies: &[Participant],
        turn_number: u32,
        rng: &mut BattleRng,
    ) -> ResolvedAction {
        match self.decide(actor, allies, enemies, turn_number, rng) {
            Some(decision) => decision.into_resolved(actor),
            None => ResolvedAction::failed(
                actor,
                ActionKind::Attack,
                0,
                DecisionSource::Pattern("default".to_string()),
                format!("{} finds nothing to act on", actor.name),
            ),
        }
    }
}

/// `Some(Some(ability))` for a usable skill, `Some(None)` for a plain
/// attack, `None` when this preference cannot be honored right now.
fn usable_ability<'a>(actor: &'a Participant, preference: &ActionPreference) -> Option<Option<&'a Ability>> {
    let ready = |ability: &'a Ability| check_cast(actor, &ability.id).is_ok();
    match preference {
        ActionPreference::Attack => Some(None),
        ActionPreference::Skill(id) => actor.find_ability(id).filter(|a| ready(*a)).map(Some),
        ActionPreference::AnyOfKind(kind) => actor
            .abilities
            .iter()
            .find(|a| a.kind == *kind && !a.is_summon() && ready(*a))
            .map(Some),
        ActionPreference::Summon => actor.abilities.iter().find(|a| a.is_summon() && ready(*a)).map(Some),
    }
}
