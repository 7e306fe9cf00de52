use crate::battle::ai::{Behavior, EnemyAI};
use crate::battle::calculators::calculate_action_outcome;
use crate::battle::commands::{execute_command_batch, CommandContext};
use crate::battle::resolver::{ActionResolver, ResolvedAction};
use crate::battle::rng::BattleRng;
use crate::battle::state::{BattleEvent, BattleState, EventBus, TurnResult, Victor};
use crate::collaborators::{BattleLogger, EntityFactory, LootSummary, LootSystem};
use crate::config::BattleConfig;
use crate::errors::{ActionError, BattleResult, BattleStateError, SetupError, SetupResult};
use crate::participant::{Participant, ParticipantId, Side};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::{BTreeMap, HashSet};
use std::panic::{catch_unwind, AssertUnwindSafe};

pub const REASON_ALLIES_WIN: &str = "all enemies defeated";
pub const REASON_ENEMIES_WIN: &str = "all allies defeated";
pub const REASON_TIMEOUT: &str = "timeout";
pub const REASON_NO_ACTOR: &str = "no actionable participant";

/// Summary returned by `simulate_full_battle`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct BattleOutcome {
    pub victory: bool,
    pub victor: Option<Victor>,
    pub reason: String,
    pub turns_executed: u32,
    pub rounds: u32,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct ParticipantStatistics {
    pub damage_dealt: u32,
    pub healing_done: u32,
    pub actions_taken: u32,
}

/// Full account of a finished battle.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct BattleReport {
    pub victory: bool,
    pub victor: Option<Victor>,
    pub reason: String,
    pub turns: usize,
    pub rounds: u32,
    pub survivors: Vec<String>,
    pub fallen_allies: Vec<String>,
    pub defeated_enemies: Vec<String>,
    pub remaining_enemies: Vec<String>,
    /// Only present when the allies won and a loot system is configured.
    pub loot: Option<LootSummary>,
    pub statistics: BTreeMap<ParticipantId, ParticipantStatistics>,
}

/// Owns one battle from setup to result.
///
/// Lifecycle: `initialize_battle`, then either `execute_turn` repeatedly or
/// `simulate_full_battle` once, then `get_battle_result`.
pub struct BattleSystem {
    state: Option<BattleState>,
    config: BattleConfig,
    rng: BattleRng,
    resolver: ActionResolver,
    enemy_ai: EnemyAI,
    factory: Option<Box<dyn EntityFactory>>,
    loot: Option<Box<dyn LootSystem>>,
    logger: Option<Box<dyn BattleLogger>>,
    events: EventBus,
}

impl Default for BattleSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl BattleSystem {
    pub fn new() -> Self {
        Self::from_config(BattleConfig::default())
    }

    fn from_config(config: BattleConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => BattleRng::from_seed(seed),
            None => BattleRng::from_entropy(),
        };
        Self {
            state: None,
            rng,
            resolver: ActionResolver::new(config.tank_ratio),
            enemy_ai: EnemyAI::new(config.tank_ratio),
            factory: None,
            loot: None,
            logger: None,
            events: EventBus::new(),
            config,
        }
    }

    /// Replace the configuration. A configured seed also reseeds the RNG.
    pub fn with_config(mut self, config: BattleConfig) -> Self {
        if let Some(seed) = config.seed {
            self.rng = BattleRng::from_seed(seed);
        }
        self.resolver = ActionResolver::new(config.tank_ratio);
        self.enemy_ai = EnemyAI::new(config.tank_ratio);
        self.config = config;
        self
    }

    pub fn with_rng(mut self, rng: BattleRng) -> Self {
        self.rng = rng;
        self
    }

    pub fn with_factory(mut self, factory: impl EntityFactory + 'static) -> Self {
        self.factory = Some(Box::new(factory));
        self
    }

    pub fn with_loot(mut self, loot: impl LootSystem + 'static) -> Self {
        self.loot = Some(Box::new(loot));
        self
    }

    pub fn with_logger(mut self, logger: impl BattleLogger + 'static) -> Self {
        self.logger = Some(Box::new(logger));
        self
    }

    pub fn with_enemy_ai(mut self, enemy_ai: EnemyAI) -> Self {
        self.enemy_ai = enemy_ai;
        self
    }

    pub fn state(&self) -> Option<&BattleState> {
        self.state.as_ref()
    }

    pub fn config(&self) -> &BattleConfig {
        &self.config
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn is_complete(&self) -> bool {
        self.state.as_ref().is_some_and(|s| s.is_complete)
    }

    fn log_debug(&self, category: &str, message: &str) {
        if let Some(logger) = &self.logger {
            logger.log_debug(category, message);
        }
    }

    // === Setup ===

    /// Validate both rosters and compute the opening turn order.
    pub fn initialize_battle(&mut self, mut allies: Vec<Participant>, mut enemies: Vec<Participant>) -> BattleResult<()> {
        validate_roster(Side::Allies, &allies)?;
        validate_roster(Side::Enemies, &enemies)?;

        let mut seen = HashSet::new();
        for participant in allies.iter().chain(enemies.iter()) {
            if !seen.insert(participant.id.as_str()) {
                return Err(SetupError::DuplicateParticipantId(participant.id.clone()).into());
            }
        }

        allies.iter_mut().for_each(|p| p.is_enemy = false);
        enemies.iter_mut().for_each(|p| p.is_enemy = true);

        let mut state = BattleState::new(allies, enemies);
        state.compute_turn_order(&mut self.rng, self.config.initiative_jitter);

        self.events.clear();
        self.events.push(BattleEvent::RoundStarted {
            turn_number: state.turn_number,
        });
        self.events.push(BattleEvent::TurnOrderComputed {
            order: state.turn_order_ids(),
        });
        tracing::info!(
            allies = state.allies.len(),
            enemies = state.enemies.len(),
            "battle initialized"
        );
        self.state = Some(state);
        self.log_debug("setup", "battle initialized");
        Ok(())
    }

    // === Turn flow ===

    /// The participant whose turn it is, skipping dead entries. Gives up after
    /// two passes over the turn order.
    pub fn get_current_actor(&mut self) -> Option<ParticipantId> {
        let attempts = {
            let state = self.state.as_ref()?;
            state.turn_order.len().max(1) * 2
        };
        for _ in 0..attempts {
            let state = self.state.as_ref()?;
            if state.is_complete {
                return None;
            }
            if let Some(entry) = state.turn_order.get(state.current_turn_index) {
                if state.is_alive(&entry.participant_id) {
                    return Some(entry.participant_id.clone());
                }
            }
            self.advance_turn();
        }
        tracing::warn!(attempts, "no living participant found in the turn order");
        None
    }

    /// Move to the next slot, starting a new round when the order runs out.
    pub fn advance_turn(&mut self) {
        let Some(state) = self.state.as_mut() else {
            return;
        };
        if state.is_complete {
            return;
        }
        state.current_turn_index += 1;
        if state.current_turn_index >= state.turn_order.len() {
            self.start_next_round();
        }
    }

    fn start_next_round(&mut self) {
        let Some(state) = self.state.as_mut() else {
            return;
        };
        state.turn_number += 1;
        self.events.push(BattleEvent::RoundStarted {
            turn_number: state.turn_number,
        });

        for participant in state.allies.iter_mut().chain(state.enemies.iter_mut()) {
            if !participant.is_alive() {
                continue;
            }
            for buff in participant.tick_buffs() {
                self.events.push(BattleEvent::BuffExpired {
                    target: participant.name.clone(),
                    buff: buff.name,
                });
            }
            if !participant.is_alive() {
                self.events.push(BattleEvent::ParticipantDefeated {
                    id: participant.id.clone(),
                    name: participant.name.clone(),
                });
                continue;
            }
            for skill in participant.tick_cooldowns() {
                self.events.push(BattleEvent::CooldownReady {
                    participant: participant.name.clone(),
                    skill,
                });
            }
        }

        state.compute_turn_order(&mut self.rng, self.config.initiative_jitter);
        self.events.push(BattleEvent::TurnOrderComputed {
            order: state.turn_order_ids(),
        });
        tracing::debug!(round = state.turn_number, order = ?state.turn_order_ids(), "new round");
        self.check_battle_end();
    }

    /// Run the current actor's turn. Returns `Ok(None)` when nobody can act.
    pub fn execute_turn(&mut self) -> BattleResult<Option<TurnResult>> {
        let state = self.state.as_ref().ok_or(BattleStateError::NotInitialized)?;
        if state.is_complete {
            return Err(BattleStateError::AlreadyComplete.into());
        }
        let Some(actor_id) = self.get_current_actor() else {
            return Ok(None);
        };

        let resolved = self.decide(&actor_id)?;
        let record = if !resolved.success || resolved.target_id.is_none() {
            self.skip_turn(&resolved)?
        } else {
            if resolved.substituted {
                self.events.push(BattleEvent::ActionSubstituted {
                    actor: resolved.actor_name.clone(),
                    reason: resolved.message.clone(),
                });
            }
            self.execute_action(&resolved)?
        };

        let state = self.state.as_mut().ok_or(BattleStateError::NotInitialized)?;
        state.history.push(record.clone());
        if let Some(logger) = &self.logger {
            logger.log_turn(&record);
        }
        if !self.check_battle_end() {
            self.advance_turn();
        }
        Ok(Some(record))
    }

    fn decide(&mut self, actor_id: &str) -> BattleResult<ResolvedAction> {
        let state = self.state.as_ref().ok_or(BattleStateError::NotInitialized)?;
        let actor = state
            .get(actor_id)
            .ok_or_else(|| BattleStateError::UnknownParticipant(actor_id.to_string()))?;
        let side = state
            .side_of(actor_id)
            .ok_or_else(|| BattleStateError::UnknownParticipant(actor_id.to_string()))?;
        let (own, other) = state.perspective(side);

        let decider: &mut dyn Behavior = if actor.is_enemy && actor.rules.is_empty() {
            &mut self.enemy_ai
        } else {
            &mut self.resolver
        };
        Ok(decider.decide_action(actor, own, other, state.turn_number, &mut self.rng))
    }

    fn skip_turn(&mut self, resolved: &ResolvedAction) -> BattleResult<TurnResult> {
        let state = self.state.as_ref().ok_or(BattleStateError::NotInitialized)?;
        let actor = state
            .get(&resolved.actor_id)
            .ok_or_else(|| BattleStateError::UnknownParticipant(resolved.actor_id.clone()))?;
        tracing::warn!(actor = %actor.id, reason = %resolved.message, "turn skipped");
        self.events.push(BattleEvent::TurnSkipped {
            actor: actor.name.clone(),
            reason: resolved.message.clone(),
        });
        Ok(TurnResult::skipped(
            state.turn_number,
            actor,
            resolved.action.to_string(),
            resolved.message.clone(),
        ))
    }

    /// Carry out a resolved action against the live state.
    ///
    /// Precondition failures (unknown skill, missing combination, cooldown,
    /// MP) produce an unsuccessful record and cost nothing.
    pub fn execute_action(&mut self, resolved: &ResolvedAction) -> BattleResult<TurnResult> {
        let state = self.state.as_mut().ok_or(BattleStateError::NotInitialized)?;
        let target_id = resolved
            .target_id
            .clone()
            .ok_or_else(|| ActionError::NoTarget(resolved.message.clone()))?;
        let actor = state
            .get(&resolved.actor_id)
            .ok_or_else(|| BattleStateError::UnknownParticipant(resolved.actor_id.clone()))?;
        let target = state
            .get(&target_id)
            .ok_or_else(|| BattleStateError::UnknownParticipant(target_id.clone()))?;

        let mut record = TurnResult {
            turn_number: state.turn_number,
            actor_id: actor.id.clone(),
            actor_name: actor.name.clone(),
            target_id: Some(target.id.clone()),
            target_name: Some(target.name.clone()),
            action: resolved.action.to_string(),
            success: true,
            substituted: resolved.substituted,
            message: resolved.message.clone(),
            target_hp_before: Some(target.hp()),
            target_hp_after: Some(target.hp()),
            ..Default::default()
        };

        if !actor.is_alive() || !target.is_alive() {
            record.success = false;
            record.message = format!("{} cannot act on {}: not alive", actor.name, target.name);
            return Ok(record);
        }

        let commands = match calculate_action_outcome(actor, target, &resolved.action, &self.config, &mut self.rng) {
            Ok(commands) => commands,
            Err(err) => {
                tracing::warn!(actor = %actor.id, action = %resolved.action, %err, "action failed its preconditions");
                record.success = false;
                record.message = format!("{} cannot use {}: {}", actor.name, resolved.action, err);
                return Ok(record);
            }
        };

        let mut ctx = CommandContext {
            rng: &mut self.rng,
            factory: self.factory.as_mut(),
            initiative_jitter: self.config.initiative_jitter,
        };
        execute_command_batch(commands, state, &mut self.events, &mut record, &mut ctx)?;
        record.target_hp_after = state.get(&target_id).map(|p| p.hp());

        if record.success {
            let outcome = describe_outcome(&record);
            record.message = if record.substituted {
                format!("{}; {}", resolved.message, outcome)
            } else {
                outcome
            };
        }
        Ok(record)
    }

    /// Declare a winner if one side has no living members.
    pub fn check_battle_end(&mut self) -> bool {
        let Some(state) = self.state.as_mut() else {
            return false;
        };
        if state.is_complete {
            return true;
        }
        let result = if state.living_count(Side::Allies) == 0 {
            Some((Victor::Enemies, REASON_ENEMIES_WIN))
        } else if state.living_count(Side::Enemies) == 0 {
            Some((Victor::Allies, REASON_ALLIES_WIN))
        } else {
            None
        };
        match result {
            Some((victor, reason)) => {
                finish(state, &mut self.events, Some(victor), reason);
                true
            }
            None => false,
        }
    }

    // === Simulation ===

    /// Run turns until the battle ends or `max_turns` turns have executed
    /// (the configured cap when `None`).
    ///
    /// Never fails: errors and panics from inside the run become a defeat
    /// outcome whose reason carries the message.
    pub fn simulate_full_battle(&mut self, max_turns: Option<u32>) -> BattleOutcome {
        let limit = max_turns.unwrap_or(self.config.max_turns);
        let mut executed = 0u32;
        let run = catch_unwind(AssertUnwindSafe(|| self.run_turns(limit, &mut executed)));
        match run {
            Ok(Ok(())) => self.outcome(executed),
            Ok(Err(err)) => self.abort(format!("battle aborted: {}", err), executed),
            Err(payload) => self.abort(
                format!("battle aborted by panic: {}", panic_message(payload.as_ref())),
                executed,
            ),
        }
    }

    fn run_turns(&mut self, limit: u32, executed: &mut u32) -> BattleResult<()> {
        if self.state.is_none() {
            return Err(BattleStateError::NotInitialized.into());
        }
        while *executed < limit && !self.is_complete() {
            match self.execute_turn()? {
                Some(_) => *executed += 1,
                None => {
                    if !self.check_battle_end() {
                        tracing::warn!("stopping: {}", REASON_NO_ACTOR);
                        self.finish_without_victor(REASON_NO_ACTOR);
                    }
                }
            }
        }
        if !self.is_complete() {
            tracing::warn!(limit, "turn cap reached");
            self.finish_without_victor(REASON_TIMEOUT);
        }
        Ok(())
    }

    fn finish_without_victor(&mut self, reason: &str) {
        if let Some(state) = self.state.as_mut() {
            finish(state, &mut self.events, None, reason);
        }
    }

    fn outcome(&self, executed: u32) -> BattleOutcome {
        match &self.state {
            Some(state) => BattleOutcome {
                victory: state.victor == Some(Victor::Allies),
                victor: state.victor,
                reason: state.end_reason.clone().unwrap_or_default(),
                turns_executed: executed,
                rounds: state.turn_number,
            },
            None => BattleOutcome {
                victory: false,
                victor: None,
                reason: BattleStateError::NotInitialized.to_string(),
                turns_executed: executed,
                rounds: 0,
            },
        }
    }

    fn abort(&mut self, reason: String, executed: u32) -> BattleOutcome {
        tracing::error!(%reason, "simulation aborted");
        if let Some(logger) = &self.logger {
            logger.log_error("simulation", &reason);
        }
        if let Some(state) = self.state.as_mut() {
            state.is_complete = true;
            state.victor = None;
            state.end_reason = Some(reason.clone());
            self.events.push(BattleEvent::BattleEnded {
                victor: None,
                reason: reason.clone(),
            });
        }
        BattleOutcome {
            victory: false,
            victor: None,
            reason,
            turns_executed: executed,
            rounds: self.state.as_ref().map_or(0, |s| s.turn_number),
        }
    }

    // === Results ===

    pub fn get_battle_result(&self) -> BattleResult<BattleReport> {
        let state = self.state.as_ref().ok_or(BattleStateError::NotInitialized)?;
        if !state.is_complete {
            return Err(BattleStateError::NotComplete.into());
        }

        let names = |roster: &[Participant], alive: bool| -> Vec<String> {
            roster
                .iter()
                .filter(|p| p.is_alive() == alive)
                .map(|p| p.name.clone())
                .collect()
        };
        let victory = state.victor == Some(Victor::Allies);
        let loot = if victory {
            let defeated: Vec<Participant> = state.enemies.iter().filter(|e| !e.is_alive()).cloned().collect();
            self.loot.as_ref().map(|loot| loot.generate_battle_loot(&defeated))
        } else {
            None
        };

        let mut statistics: BTreeMap<ParticipantId, ParticipantStatistics> = BTreeMap::new();
        for turn in &state.history {
            let entry = statistics.entry(turn.actor_id.clone()).or_default();
            if turn.success {
                entry.actions_taken += 1;
            }
            entry.damage_dealt += turn.damage.unwrap_or(0);
            entry.healing_done += turn.heal.unwrap_or(0);
        }

        Ok(BattleReport {
            victory,
            victor: state.victor,
            reason: state.end_reason.clone().unwrap_or_default(),
            turns: state.history.len(),
            rounds: state.turn_number,
            survivors: names(&state.allies, true),
            fallen_allies: names(&state.allies, false),
            defeated_enemies: names(&state.enemies, false),
            remaining_enemies: names(&state.enemies, true),
            loot,
            statistics,
        })
    }
}

fn validate_roster(side: Side, roster: &[Participant]) -> SetupResult<()> {
    if roster.is_empty() {
        return Err(SetupError::EmptyRoster(side));
    }
    for participant in roster {
        let malformed = |reason: &str| SetupError::MalformedParticipant {
            id: participant.id.clone(),
            reason: reason.to_string(),
        };
        if participant.id.trim().is_empty() {
            return Err(malformed("empty id"));
        }
        if participant.max_stats.hp == 0 {
            return Err(malformed("max HP is zero"));
        }
        if participant.current_stats.hp > participant.max_stats.hp
            || participant.current_stats.mp > participant.max_stats.mp
        {
            return Err(malformed("current HP/MP exceeds max"));
        }
    }
    if !roster.iter().any(|p| p.is_alive()) {
        return Err(SetupError::NoLivingMembers(side));
    }
    Ok(())
}

fn finish(state: &mut BattleState, events: &mut EventBus, victor: Option<Victor>, reason: &str) {
    state.is_complete = true;
    state.victor = victor;
    state.end_reason = Some(reason.to_string());
    tracing::info!(victor = ?victor, reason, round = state.turn_number, "battle ended");
    events.push(BattleEvent::BattleEnded {
        victor,
        reason: reason.to_string(),
    });
}

fn describe_outcome(record: &TurnResult) -> String {
    let target = record.target_name.as_deref().unwrap_or("?");
    if !record.summoned.is_empty() {
        format!("{} summons {} reinforcement(s)", record.actor_name, record.summoned.len())
    } else if let Some(damage) = record.damage {
        format!("{} uses {} on {} for {} damage", record.actor_name, record.action, target, damage)
    } else if let Some(heal) = record.heal {
        format!("{} uses {} on {}, restoring {} HP", record.actor_name, record.action, target, heal)
    } else if let Some(buff) = record.buff_applied.as_ref().or(record.debuff_applied.as_ref()) {
        format!("{} uses {} on {}: {} takes hold", record.actor_name, record.action, target, buff)
    } else {
        format!("{} uses {} on {}", record.actor_name, record.action, target)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
