use crate::battle::rng::BattleRng;
use crate::battle::state::{BattleEvent, BattleState, EventBus, TurnResult};
use crate::collaborators::EntityFactory;
use crate::errors::BattleStateError;
use crate::participant::{Buff, BuffKind, Participant, ParticipantId};

/// Atomic commands representing final state changes
#[derive(Debug, Clone, PartialEq)]
pub enum BattleCommand {
    SpendMp {
        target: ParticipantId,
        amount: u32,
    },
    StartCooldown {
        target: ParticipantId,
        skill_id: String,
        turns: u32,
    },
    DealDamage {
        target: ParticipantId,
        amount: u32,
    },
    Heal {
        target: ParticipantId,
        amount: u32,
    },
    ApplyBuff {
        target: ParticipantId,
        buff: Buff,
    },
    /// Spawn `count` participants of `enemy_type` on the caster's side.
    Summon {
        caster: ParticipantId,
        enemy_type: String,
        count: u32,
        level: u32,
    },
    EmitEvent(BattleEvent),
}

/// What command execution may need beyond the state itself.
pub struct CommandContext<'a> {
    pub rng: &'a mut BattleRng,
    pub factory: Option<&'a mut Box<dyn EntityFactory>>,
    pub initiative_jitter: u32,
}

/// Apply `commands` in order, filling in `record` as effects land.
pub fn execute_command_batch(
    commands: Vec<BattleCommand>,
    state: &mut BattleState,
    bus: &mut EventBus,
    record: &mut TurnResult,
    ctx: &mut CommandContext<'_>,
) -> Result<(), BattleStateError> {
    for command in commands {
        execute_command(command, state, bus, record, ctx)?;
    }
    Ok(())
}

/// Helper function to execute commands that operate on one participant
fn with_participant<F, T>(state: &mut BattleState, id: &str, operation: F) -> Result<T, BattleStateError>
where
    F: FnOnce(&mut Participant) -> T,
{
    state
        .get_mut(id)
        .map(operation)
        .ok_or_else(|| BattleStateError::UnknownParticipant(id.to_string()))
}

fn defeated_event(participant: &Participant) -> BattleEvent {
    BattleEvent::ParticipantDefeated {
        id: participant.id.clone(),
        name: participant.name.clone(),
    }
}

fn execute_command(
    command: BattleCommand,
    state: &mut BattleState,
    bus: &mut EventBus,
    record: &mut TurnResult,
    ctx: &mut CommandContext<'_>,
) -> Result<(), BattleStateError> {
    match command {
        BattleCommand::EmitEvent(event) => {
            bus.push(event);
            Ok(())
        }
        BattleCommand::SpendMp { target, amount } => {
            let paid = with_participant(state, &target, |p| p.spend_mp(amount))?;
            if paid {
                Ok(())
            } else {
                Err(BattleStateError::InconsistentState(format!(
                    "{} cannot pay {} MP after the cast was validated",
                    target, amount
                )))
            }
        }
        BattleCommand::StartCooldown {
            target,
            skill_id,
            turns,
        } => with_participant(state, &target, |p| p.start_cooldown(&skill_id, turns)),
        BattleCommand::DealDamage { target, amount } => {
            let defeated = with_participant(state, &target, |p| {
                let change = p.take_damage(amount);
                change.died.then(|| defeated_event(p))
            })?;
            record.damage = Some(amount);
            if let Some(event) = defeated {
                bus.push(event);
            }
            Ok(())
        }
        BattleCommand::Heal { target, amount } => {
            let change = with_participant(state, &target, |p| p.heal(amount))?;
            record.heal = Some(change.amount);
            Ok(())
        }
        BattleCommand::ApplyBuff { target, buff } => {
            let name = buff.name.clone();
            let kind = buff.kind;
            let duration = buff.duration;
            let (target_name, defeated) = with_participant(state, &target, |p| {
                let died = p.apply_buff(buff);
                (p.name.clone(), died.then(|| defeated_event(p)))
            })?;
            match kind {
                BuffKind::Buff => record.buff_applied = Some(name.clone()),
                BuffKind::Debuff => record.debuff_applied = Some(name.clone()),
            }
            bus.push(BattleEvent::BuffApplied {
                target: target_name,
                buff: name,
                kind,
                duration,
            });
            if let Some(event) = defeated {
                bus.push(event);
            }
            Ok(())
        }
        BattleCommand::Summon {
            caster,
            enemy_type,
            count,
            level,
        } => execute_summon(&caster, &enemy_type, count, level, state, bus, record, ctx),
    }
}

fn unique_id(state: &BattleState, base: &str) -> ParticipantId {
    if !state.contains(base) {
        return base.to_string();
    }
    let mut n = 2;
    loop {
        let candidate = format!("{}-{}", base, n);
        if !state.contains(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

#[allow(clippy::too_many_arguments)]
fn execute_summon(
    caster_id: &str,
    enemy_type: &str,
    count: u32,
    level: u32,
    state: &mut BattleState,
    bus: &mut EventBus,
    record: &mut TurnResult,
    ctx: &mut CommandContext<'_>,
) -> Result<(), BattleStateError> {
    let side = state
        .side_of(caster_id)
        .ok_or_else(|| BattleStateError::UnknownParticipant(caster_id.to_string()))?;
    let caster_name = state.get(caster_id).map(|p| p.name.clone()).unwrap_or_default();

    let Some(factory) = ctx.factory.as_mut() else {
        tracing::warn!(caster = %caster_id, %enemy_type, "summon skipped: no entity factory configured");
        record.success = false;
        record.message = format!("{} tried to summon {} but nothing answered", caster_name, enemy_type);
        return Ok(());
    };

    let mut summoned = Vec::new();
    let mut names = Vec::new();
    for _ in 0..count {
        match factory.create_enemy(enemy_type, None, level) {
            Ok(mut participant) => {
                participant.id = unique_id(state, &participant.id);
                summoned.push(participant.id.clone());
                names.push(participant.name.clone());
                state.add_participant(side, participant);
            }
            Err(err) => {
                tracing::warn!(caster = %caster_id, %enemy_type, %err, "summon failed");
                record.success = false;
                record.message = format!("{} failed to summon {}: {}", caster_name, enemy_type, err);
                break;
            }
        }
    }

    if !summoned.is_empty() {
        state.reschedule_with(&summoned, ctx.rng, ctx.initiative_jitter);
        tracing::debug!(caster = %caster_id, count = summoned.len(), "summoned participants joined the turn order");
        bus.push(BattleEvent::Summoned {
            caster: caster_name,
            summoned: names,
        });
        record.summoned.extend(summoned);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::FactoryError;
    use pretty_assertions::assert_eq;
    use schema::{StatKind, Stats};

    struct Whelps;

    impl EntityFactory for Whelps {
        fn create_character(&mut self, _def: &crate::collaborators::PartyMemberDef) -> Result<Participant, FactoryError> {
            Err(FactoryError::UnknownTemplate("character".into()))
        }

        fn create_enemy(&mut self, enemy_type: &str, _name: Option<&str>, _level: u32) -> Result<Participant, FactoryError> {
            Ok(Participant::new(enemy_type, "Whelp", Stats::new(20, 0, 5, 5, 0, 4)))
        }
    }

    fn state() -> BattleState {
        BattleState::new(
            vec![Participant::new("hero", "Hero", Stats::new(50, 10, 10, 10, 10, 10))],
            vec![Participant::new("dragon", "Dragon", Stats::new(200, 50, 20, 15, 20, 8)).as_boss()],
        )
    }

    #[test]
    fn test_damage_records_and_reports_defeat() {
        let mut state = state();
        let mut bus = EventBus::new();
        let mut record = TurnResult::default();
        let mut rng = BattleRng::from_seed(0);
        let mut ctx = CommandContext {
            rng: &mut rng,
            factory: None,
            initiative_jitter: 0,
        };

        let commands = vec![BattleCommand::DealDamage {
            target: "hero".into(),
            amount: 80,
        }];
        execute_command_batch(commands, &mut state, &mut bus, &mut record, &mut ctx).unwrap();
        assert_eq!(record.damage, Some(80));
        assert_eq!(state.get("hero").map(|p| p.hp()), Some(0));
        assert!(matches!(bus.events(), [BattleEvent::ParticipantDefeated { .. }]));
    }

    #[test]
    fn test_unknown_target_is_a_state_error() {
        let mut state = state();
        let mut bus = EventBus::new();
        let mut record = TurnResult::default();
        let mut rng = BattleRng::from_seed(0);
        let mut ctx = CommandContext {
            rng: &mut rng,
            factory: None,
            initiative_jitter: 0,
        };
        let result = execute_command_batch(
            vec![BattleCommand::Heal {
                target: "ghost".into(),
                amount: 5,
            }],
            &mut state,
            &mut bus,
            &mut record,
            &mut ctx,
        );
        assert_eq!(result, Err(BattleStateError::UnknownParticipant("ghost".into())));
    }

    #[test]
    fn test_buff_goes_to_record_and_bus() {
        let mut state = state();
        let mut bus = EventBus::new();
        let mut record = TurnResult::default();
        let mut rng = BattleRng::from_seed(0);
        let mut ctx = CommandContext {
            rng: &mut rng,
            factory: None,
            initiative_jitter: 0,
        };
        let buff = Buff::new("Guard", BuffKind::Buff, [(StatKind::Def, 5)].into_iter().collect(), 2);
        execute_command_batch(
            vec![BattleCommand::ApplyBuff {
                target: "hero".into(),
                buff,
            }],
            &mut state,
            &mut bus,
            &mut record,
            &mut ctx,
        )
        .unwrap();
        assert_eq!(record.buff_applied.as_deref(), Some("Guard"));
        assert_eq!(state.get("hero").map(|p| p.current_stats.defense), Some(15));
        assert_eq!(bus.len(), 1);
    }

    #[test]
    fn test_summon_gets_unique_ids_on_casters_side() {
        let mut state = state();
        let mut rng = BattleRng::from_seed(0);
        state.compute_turn_order(&mut rng, 0);
        let mut bus = EventBus::new();
        let mut record = TurnResult::default();
        let mut factory: Box<dyn EntityFactory> = Box::new(Whelps);
        let mut ctx = CommandContext {
            rng: &mut rng,
            factory: Some(&mut factory),
            initiative_jitter: 0,
        };

        execute_command_batch(
            vec![BattleCommand::Summon {
                caster: "dragon".into(),
                enemy_type: "whelp".into(),
                count: 2,
                level: 1,
            }],
            &mut state,
            &mut bus,
            &mut record,
            &mut ctx,
        )
        .unwrap();
        assert_eq!(record.summoned, vec!["whelp".to_string(), "whelp-2".to_string()]);
        assert_eq!(state.enemies.len(), 3);
        assert!(state.enemies.iter().all(|e| e.is_enemy));
        assert_eq!(state.turn_order.len(), 4);
    }

    #[test]
    fn test_summon_without_factory_fails_softly() {
        let mut state = state();
        let mut bus = EventBus::new();
        let mut record = TurnResult {
            success: true,
            ..Default::default()
        };
        let mut rng = BattleRng::from_seed(0);
        let mut ctx = CommandContext {
            rng: &mut rng,
            factory: None,
            initiative_jitter: 0,
        };
        execute_command_batch(
            vec![BattleCommand::Summon {
                caster: "dragon".into(),
                enemy_type: "whelp".into(),
                count: 1,
                level: 1,
            }],
            &mut state,
            &mut bus,
            &mut record,
            &mut ctx,
        )
        .unwrap();
        assert!(!record.success);
        assert_eq!(state.enemies.len(), 1);
    }
}
