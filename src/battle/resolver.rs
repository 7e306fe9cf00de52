//! Rule-driven action selection for participants that carry authored rules.

use crate::battle::ai::Behavior;
use crate::battle::conditions::{Condition, ConditionSnapshot};
use crate::battle::rng::BattleRng;
use crate::battle::targeting::{select_target, TargetKind};
use crate::errors::ActionError;
use crate::participant::{Participant, ParticipantId};
use schema::{Ability, Rule};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

/// What a participant does on its turn.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub enum ActionKind {
    Attack,
    Cast(String),
}

impl ActionKind {
    pub fn skill_id(&self) -> Option<&str> {
        match self {
            ActionKind::Attack => None,
            ActionKind::Cast(id) => Some(id),
        }
    }
}

impl FromStr for ActionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("attack") {
            return Ok(ActionKind::Attack);
        }
        match trimmed.split_once(':') {
            Some((prefix, skill)) if prefix.trim().eq_ignore_ascii_case("cast") && !skill.trim().is_empty() => {
                Ok(ActionKind::Cast(skill.trim().to_string()))
            }
            _ => Err(format!("Unknown action: {}", s)),
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionKind::Attack => write!(f, "attack"),
            ActionKind::Cast(skill) => write!(f, "cast:{}", skill),
        }
    }
}

/// Where a resolved action came from.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub enum DecisionSource {
    /// An authored rule, by its position in the actor's rule list.
    Rule(usize),
    /// No rule matched; the built-in fallback attack was used.
    Fallback,
    /// A behavior pattern from the enemy AI catalog.
    Pattern(String),
}

/// A decision ready for the engine to execute. Both decision sources
/// produce this shape.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ResolvedAction {
    pub actor_id: ParticipantId,
    pub actor_name: String,
    pub action: ActionKind,
    pub target_id: Option<ParticipantId>,
    pub target_name: Option<String>,
    pub priority: u32,
    /// False when no action could be formed (e.g. no living target).
    pub success: bool,
    pub message: String,
    /// True when a cast was replaced by a basic attack.
    pub substituted: bool,
    pub source: DecisionSource,
}

impl ResolvedAction {
    pub fn failed(actor: &Participant, action: ActionKind, priority: u32, source: DecisionSource, message: String) -> Self {
        Self {
            actor_id: actor.id.clone(),
            actor_name: actor.name.clone(),
            action,
            target_id: None,
            target_name: None,
            priority,
            success: false,
            message,
            substituted: false,
            source,
        }
    }
}

/// Check that `actor` can cast `skill_key` right now.
pub fn check_skill_available<'a>(actor: &'a Participant, skill_key: &str) -> Result<&'a Ability, ActionError> {
    let ability = actor.find_ability(skill_key).ok_or_else(|| ActionError::UnknownSkill {
        actor: actor.name.clone(),
        skill: skill_key.to_string(),
    })?;
    if let Some(remaining) = actor.cooldown_remaining(&ability.id) {
        return Err(ActionError::OnCooldown {
            skill: ability.id.clone(),
            remaining,
        });
    }
    if actor.mp() < ability.mp_cost {
        return Err(ActionError::InsufficientMp {
            skill: ability.id.clone(),
            required: ability.mp_cost,
            available: actor.mp(),
        });
    }
    Ok(ability)
}

/// Findings from checking an authored rule list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RulesValidationReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl RulesValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Picks an action for a participant by walking its rules.
pub struct ActionResolver {
    conditions: HashMap<String, Condition>,
    tank_ratio: f64,
}

impl ActionResolver {
    pub fn new(tank_ratio: f64) -> Self {
        Self {
            conditions: HashMap::new(),
            tank_ratio,
        }
    }

    fn fallback_rule() -> Rule {
        Rule::new(0, "fallback", "randomEnemy", "attack")
    }

    fn condition(&mut self, raw: &str) -> &Condition {
        self.conditions
            .entry(raw.to_string())
            .or_insert_with(|| Condition::parse(raw))
    }

    /// Choose the action for `actor` this turn.
    ///
    /// Rules are tried by descending priority, ties in declaration order.
    /// A cast that cannot be paid for right now becomes a basic attack.
    pub fn resolve_action(
        &mut self,
        actor: &Participant,
        allies: &[Participant],
        enemies: &[Participant],
        turn_number: u32,
        rng: &mut BattleRng,
    ) -> ResolvedAction {
        let snapshot = ConditionSnapshot {
            actor,
            allies,
            enemies,
            turn_number,
            tank_ratio: self.tank_ratio,
        };

        let mut ordered: Vec<(usize, &Rule)> = actor.rules.iter().enumerate().collect();
        ordered.sort_by(|a, b| b.1.priority.cmp(&a.1.priority));

        let mut chosen: Option<(usize, Rule)> = None;
        for (index, rule) in ordered {
            if self.condition(&rule.condition).evaluate(&snapshot) {
                tracing::debug!(actor = %actor.id, priority = rule.priority, condition = %rule.condition, "rule matched");
                chosen = Some((index, rule.clone()));
                break;
            }
        }
        let (rule, source) = match chosen {
            Some((index, rule)) => (rule, DecisionSource::Rule(index)),
            None => {
                tracing::debug!(actor = %actor.id, "no rule matched; using fallback attack");
                (Self::fallback_rule(), DecisionSource::Fallback)
            }
        };

        let target_kind = rule.target.parse::<TargetKind>().unwrap_or_else(|_| {
            tracing::warn!(actor = %actor.id, target = %rule.target, "unknown target; using randomEnemy");
            TargetKind::RandomEnemy
        });
        let action = rule.action.parse::<ActionKind>().unwrap_or_else(|_| {
            tracing::warn!(actor = %actor.id, action = %rule.action, "unknown action; using attack");
            ActionKind::Attack
        });

        let selection = select_target(target_kind, actor, allies, enemies, rng);
        let Some(target_id) = selection.target else {
            return ResolvedAction::failed(
                actor,
                action,
                rule.priority,
                source,
                format!("{} has no target: {}", actor.name, selection.reason),
            );
        };

        let mut resolved = ResolvedAction {
            actor_id: actor.id.clone(),
            actor_name: actor.name.clone(),
            action: action.clone(),
            target_name: name_of(&target_id, allies, enemies),
            target_id: Some(target_id),
            priority: rule.priority,
            success: true,
            message: String::new(),
            substituted: false,
            source,
        };

        if let ActionKind::Cast(skill) = &action {
            if let Err(reason) = check_skill_available(actor, skill) {
                substitute_basic_attack(&mut resolved, target_kind, &reason, actor, allies, enemies, rng);
                return resolved;
            }
        }

        resolved.message = format!(
            "{} uses {} on {} (priority {})",
            actor.name,
            action,
            resolved.target_name.as_deref().unwrap_or("?"),
            rule.priority
        );
        resolved
    }

    /// Whether `actor` can perform `action` right now.
    pub fn validate_action(&self, actor: &Participant, action: &ActionKind) -> Result<(), ActionError> {
        match action {
            ActionKind::Attack => Ok(()),
            ActionKind::Cast(skill) => check_skill_available(actor, skill).map(|_| ()),
        }
    }

    /// Design-time check of an authored rule list.
    pub fn validate_rules_configuration(rules: &[Rule]) -> RulesValidationReport {
        let mut report = RulesValidationReport::default();
        let mut by_priority: BTreeMap<u32, usize> = BTreeMap::new();

        for (index, rule) in rules.iter().enumerate() {
            if let Err(err) = rule.condition.parse::<Condition>() {
                report.errors.push(format!("rule {}: {}", index, err));
            }
            if let Err(err) = rule.target.parse::<TargetKind>() {
                report.errors.push(format!("rule {}: {}", index, err));
            }
            if let Err(err) = rule.action.parse::<ActionKind>() {
                report.errors.push(format!("rule {}: {}", index, err));
            }
            *by_priority.entry(rule.priority).or_default() += 1;
        }

        for (priority, count) in by_priority {
            if count > 1 {
                report.warnings.push(format!(
                    "{} rules share priority {}; declaration order decides between them",
                    count, priority
                ));
            }
        }

        let has_always = rules
            .iter()
            .any(|r| matches!(Condition::parse(&r.condition), Condition::Always));
        if !has_always {
            report
                .warnings
                .push("no 'always' rule; unmatched turns fall back to a random basic attack".to_string());
        }
        report
    }
}

impl Default for ActionResolver {
    fn default() -> Self {
        Self::new(1.2)
    }
}

impl Behavior for ActionResolver {
    fn decide_action(
        &mut self,
        actor: &Participant,
        allies: &[Participant],
        enemies: &[Participant],
        turn_number: u32,
        rng: &mut BattleRng,
    ) -> ResolvedAction {
        self.resolve_action(actor, allies, enemies, turn_number, rng)
    }
}

pub(crate) fn name_of(id: &str, allies: &[Participant], enemies: &[Participant]) -> Option<String> {
    allies
        .iter()
        .chain(enemies.iter())
        .find(|p| p.id == id)
        .map(|p| p.name.clone())
}

/// Turn an unaffordable cast into a basic attack. The attack keeps the
/// original target; a `self` rule is redirected to a random living enemy.
pub(crate) fn substitute_basic_attack(
    resolved: &mut ResolvedAction,
    target_kind: TargetKind,
    reason: &ActionError,
    actor: &Participant,
    allies: &[Participant],
    enemies: &[Participant],
    rng: &mut BattleRng,
) {
    tracing::warn!(actor = %actor.id, action = %resolved.action, %reason, "cast unavailable; substituting basic attack");

    if target_kind == TargetKind::SelfTarget || resolved.target_id.is_none() {
        let selection = select_target(TargetKind::RandomEnemy, actor, allies, enemies, rng);
        resolved.target_name = selection
            .target
            .as_deref()
            .and_then(|id| name_of(id, allies, enemies));
        resolved.target_id = selection.target;
    }

    let original = std::mem::replace(&mut resolved.action, ActionKind::Attack);
    resolved.substituted = true;
    match &resolved.target_name {
        Some(target) => {
            resolved.success = true;
            resolved.message = format!(
                "{} wanted {} but {}; using basic attack on {} instead",
                actor.name, original, reason, target
            );
        }
        None => {
            resolved.success = false;
            resolved.message = format!("{} wanted {} but {} and has no enemy to attack", actor.name, original, reason);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use schema::Stats;

    fn caster(mp: u32) -> Participant {
        let mut p = Participant::new("mage", "Mage", Stats::new(50, 20, 5, 5, 15, 10))
            .with_abilities(vec![Ability::attack("fireball", "Fireball", 30, 5).with_cooldown(2)]);
        p.current_stats.mp = mp;
        p
    }

    fn foes() -> Vec<Participant> {
        vec![
            Participant::new("g1", "Goblin", Stats::new(30, 0, 8, 4, 0, 6)).as_enemy(),
            Participant::new("g2", "Goblin", Stats::new(20, 0, 8, 4, 0, 6)).as_enemy(),
        ]
    }

    #[test]
    fn test_action_kind_parsing() {
        assert_eq!("attack".parse::<ActionKind>(), Ok(ActionKind::Attack));
        assert_eq!(" Cast:fireball ".parse::<ActionKind>(), Ok(ActionKind::Cast("fireball".to_string())));
        assert!("cast:".parse::<ActionKind>().is_err());
        assert!("defend".parse::<ActionKind>().is_err());
    }

    #[test]
    fn test_insufficient_mp_becomes_basic_attack() {
        let actor = caster(3).with_rules(vec![Rule::new(10, "always", "weakestEnemy", "cast:fireball")]);
        let allies = vec![actor.clone()];
        let enemies = foes();
        let mut resolver = ActionResolver::default();
        let mut rng = BattleRng::from_seed(7);

        let resolved = resolver.resolve_action(&actor, &allies, &enemies, 1, &mut rng);
        assert_eq!(resolved.action, ActionKind::Attack);
        assert!(resolved.success);
        assert!(resolved.substituted);
        assert!(resolved.message.contains("not enough MP"));
        assert_eq!(resolved.target_id.as_deref(), Some("g2"));
    }

    #[test]
    fn test_cooldown_on_self_target_retargets_enemy() {
        let mut actor = caster(20).with_rules(vec![Rule::new(10, "always", "self", "cast:fireball")]);
        actor.start_cooldown("fireball", 2);
        let allies = vec![actor.clone()];
        let enemies = foes();
        let mut resolver = ActionResolver::default();
        let mut rng = BattleRng::from_seed(7);

        let resolved = resolver.resolve_action(&actor, &allies, &enemies, 1, &mut rng);
        assert_eq!(resolved.action, ActionKind::Attack);
        assert!(resolved.target_id.as_deref().is_some_and(|id| id.starts_with('g')));
        assert!(resolved.message.contains("cooldown"));
    }

    #[test]
    fn test_ally_targeted_cast_without_mp_keeps_its_target() {
        let actor = caster(0).with_rules(vec![Rule::new(10, "always", "lowestHpAlly", "cast:fireball")]);
        let mut buddy = Participant::new("buddy", "Buddy", Stats::new(60, 0, 5, 5, 0, 8));
        buddy.current_stats.hp = 12;
        let allies = vec![actor.clone(), buddy];
        let enemies = foes();
        let mut resolver = ActionResolver::default();
        let mut rng = BattleRng::from_seed(7);

        let resolved = resolver.resolve_action(&actor, &allies, &enemies, 1, &mut rng);
        assert_eq!(resolved.action, ActionKind::Attack);
        assert!(resolved.substituted);
        assert_eq!(resolved.target_id.as_deref(), Some("buddy"));
        assert_eq!(resolved.target_name.as_deref(), Some("Buddy"));
    }

    #[test]
    fn test_unknown_target_defaults_to_random_enemy() {
        let actor = caster(20).with_rules(vec![Rule::new(5, "always", "nearestFoe", "attack")]);
        let allies = vec![actor.clone()];
        let enemies = foes();
        let mut resolver = ActionResolver::default();
        let mut rng = BattleRng::from_seed(1);

        let resolved = resolver.resolve_action(&actor, &allies, &enemies, 1, &mut rng);
        assert!(resolved.success);
        assert!(resolved.target_id.as_deref().is_some_and(|id| id.starts_with('g')));
    }

    #[test]
    fn test_no_living_target_fails_without_panicking() {
        let actor = caster(20);
        let allies = vec![actor.clone()];
        let mut enemies = foes();
        for e in &mut enemies {
            e.take_damage(1000);
        }
        let mut resolver = ActionResolver::default();
        let mut rng = BattleRng::from_seed(1);

        let resolved = resolver.resolve_action(&actor, &allies, &enemies, 1, &mut rng);
        assert!(!resolved.success);
        assert_eq!(resolved.source, DecisionSource::Fallback);
        assert_eq!(resolved.target_id, None);
    }

    #[test]
    fn test_validate_action() {
        let resolver = ActionResolver::default();
        let actor = caster(3);
        assert_eq!(resolver.validate_action(&actor, &ActionKind::Attack), Ok(()));
        assert!(matches!(
            resolver.validate_action(&actor, &ActionKind::Cast("fireball".into())),
            Err(ActionError::InsufficientMp { required: 5, available: 3, .. })
        ));
        assert!(matches!(
            resolver.validate_action(&actor, &ActionKind::Cast("meteor".into())),
            Err(ActionError::UnknownSkill { .. })
        ));
    }

    #[test]
    fn test_rules_configuration_report() {
        let rules = vec![
            Rule::new(10, "self.hp < 30%", "self", "cast:heal"),
            Rule::new(10, "enemy.count > 2", "weakestEnemy", "attack"),
            Rule::new(5, "whenever", "nowhere", "dance"),
        ];
        let report = ActionResolver::validate_rules_configuration(&rules);
        assert_eq!(report.errors.len(), 3);
        assert!(report.warnings.iter().any(|w| w.contains("priority 10")));
        assert!(report.warnings.iter().any(|w| w.contains("'always'")));
        assert!(!report.is_valid());

        let clean = vec![Rule::new(1, "always", "randomEnemy", "attack")];
        let report = ActionResolver::validate_rules_configuration(&clean);
        assert_eq!(report, RulesValidationReport::default());
    }
}
