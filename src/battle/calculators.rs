use crate::battle::commands::BattleCommand;
use crate::battle::resolver::{check_skill_available, ActionKind};
use crate::battle::rng::BattleRng;
use crate::config::BattleConfig;
use crate::errors::ActionError;
use crate::participant::{Buff, BuffKind, Participant};
use schema::{Ability, SkillEffect, SkillKind};

/// Basic attack: `max(1, str - def + jitter)`.
pub fn attack_damage(attacker: &Participant, defender: &Participant, jitter: u32) -> u32 {
    let raw = attacker.current_stats.strength as i64 - defender.current_stats.defense as i64 + jitter as i64;
    clamp_damage(raw)
}

/// Damage skill: `max(1, base + mag - def + jitter)`.
pub fn skill_damage(base: u32, attacker: &Participant, defender: &Participant, jitter: u32) -> u32 {
    let raw = base as i64 + attacker.current_stats.magic as i64 - defender.current_stats.defense as i64
        + jitter as i64;
    clamp_damage(raw)
}

fn clamp_damage(raw: i64) -> u32 {
    u32::try_from(raw.max(1)).unwrap_or(u32::MAX)
}

/// Heal skill: `base + floor(mag * factor) + jitter`, capped at the target's missing HP.
pub fn heal_amount(base: u32, caster: &Participant, target: &Participant, magic_factor: f64, jitter: u32) -> u32 {
    let from_magic = (caster.current_stats.magic as f64 * magic_factor).floor().max(0.0) as u32;
    base.saturating_add(from_magic)
        .saturating_add(jitter)
        .min(target.missing_hp())
}

pub fn initiative(speed: u32, jitter: u32) -> u32 {
    speed.saturating_add(jitter)
}

/// Check every precondition of casting `ability`, in the order that decides
/// which failure is reported: ownership, combinations, cooldown, MP.
pub fn check_cast<'a>(caster: &'a Participant, skill_key: &str) -> Result<&'a Ability, ActionError> {
    let ability = caster
        .find_ability(skill_key)
        .ok_or_else(|| ActionError::UnknownSkill {
            actor: caster.name.clone(),
            skill: skill_key.to_string(),
        })?;
    let missing = caster.missing_combinations(ability);
    if !missing.is_empty() {
        return Err(ActionError::MissingCombination {
            skill: ability.id.clone(),
            missing,
        });
    }
    check_skill_available(caster, &ability.id)
}

/// Turn a resolved action into the commands that carry it out.
///
/// Costs come first: MP is spent and the cooldown started before any effect
/// command, so a failed precondition never costs anything.
pub fn calculate_action_outcome(
    actor: &Participant,
    target: &Participant,
    action: &ActionKind,
    config: &BattleConfig,
    rng: &mut BattleRng,
) -> Result<Vec<BattleCommand>, ActionError> {
    let mut commands = Vec::new();

    let skill_id = match action {
        ActionKind::Attack => {
            let jitter = rng.below(config.damage_jitter, "attack damage jitter");
            commands.push(BattleCommand::DealDamage {
                target: target.id.clone(),
                amount: attack_damage(actor, target, jitter),
            });
            return Ok(commands);
        }
        ActionKind::Cast(skill_id) => skill_id,
    };

    let ability = check_cast(actor, skill_id)?;
    if ability.mp_cost > 0 {
        commands.push(BattleCommand::SpendMp {
            target: actor.id.clone(),
            amount: ability.mp_cost,
        });
    }
    if ability.cooldown_turns() > 0 {
        commands.push(BattleCommand::StartCooldown {
            target: actor.id.clone(),
            skill_id: ability.id.clone(),
            turns: ability.cooldown_turns(),
        });
    }

    match &ability.effect {
        SkillEffect::Damage { amount } => {
            let jitter = rng.below(config.damage_jitter, "skill damage jitter");
            commands.push(BattleCommand::DealDamage {
                target: target.id.clone(),
                amount: skill_damage(*amount, actor, target, jitter),
            });
        }
        SkillEffect::Heal { amount } => {
            let jitter = rng.below(config.damage_jitter, "heal jitter");
            commands.push(BattleCommand::Heal {
                target: target.id.clone(),
                amount: heal_amount(*amount, actor, target, config.heal_magic_factor, jitter),
            });
        }
        SkillEffect::Modifier { modifiers, duration } => {
            let kind = match ability.kind {
                SkillKind::Debuff => BuffKind::Debuff,
                _ => BuffKind::Buff,
            };
            commands.push(BattleCommand::ApplyBuff {
                target: target.id.clone(),
                buff: Buff::new(&ability.name, kind, modifiers.clone(), *duration),
            });
        }
        SkillEffect::Summon {
            enemy_type,
            count,
            level,
        } => {
            commands.push(BattleCommand::Summon {
                caster: actor.id.clone(),
                enemy_type: enemy_type.clone(),
                count: *count,
                level: *level,
            });
        }
    }
    Ok(commands)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use schema::{StatKind, Stats};

    fn with_stats(id: &str, stats: Stats) -> Participant {
        Participant::new(id, id, stats)
    }

    #[test]
    fn test_attack_damage_range() {
        let attacker = with_stats("a", Stats::new(50, 0, 15, 5, 0, 5));
        let defender = with_stats("d", Stats::new(50, 0, 5, 12, 0, 5));
        let all: Vec<u32> = (0..5).map(|j| attack_damage(&attacker, &defender, j)).collect();
        assert_eq!(all, vec![3, 4, 5, 6, 7]);
    }

    #[test]
    fn test_damage_never_below_one() {
        let attacker = with_stats("a", Stats::new(50, 0, 1, 0, 0, 5));
        let defender = with_stats("d", Stats::new(50, 0, 0, 99, 0, 5));
        assert_eq!(attack_damage(&attacker, &defender, 0), 1);
        assert_eq!(skill_damage(5, &attacker, &defender, 0), 1);
    }

    #[test]
    fn test_damage_saturates_for_huge_stats() {
        let attacker = with_stats("a", Stats::new(50, 0, u32::MAX, 0, u32::MAX, 5));
        let defender = with_stats("d", Stats::new(50, 0, 0, 0, 0, 5));
        assert_eq!(attack_damage(&attacker, &defender, 4), u32::MAX);
        assert_eq!(skill_damage(u32::MAX, &attacker, &defender, 4), u32::MAX);
    }

    #[test]
    fn test_heal_caps_at_missing_hp() {
        let healer = with_stats("h", Stats::new(50, 20, 5, 5, 12, 5));
        let mut ally = with_stats("a", Stats::new(150, 0, 5, 5, 0, 5));
        ally.current_stats.hp = 50;
        for jitter in 0..5 {
            assert_eq!(heal_amount(35, &healer, &ally, 0.5, jitter), 41 + jitter);
        }
        ally.current_stats.hp = 145;
        assert_eq!(heal_amount(35, &healer, &ally, 0.5, 4), 5);
    }

    #[test]
    fn test_cast_costs_come_before_effect() {
        let caster = with_stats("c", Stats::new(50, 20, 5, 5, 10, 5))
            .with_abilities(vec![Ability::debuff("hex", "Hex", &[(StatKind::Def, -3)], 2, 4).with_cooldown(2)]);
        let target = with_stats("t", Stats::new(50, 0, 5, 5, 0, 5));
        let mut rng = BattleRng::from_seed(0);

        let commands = calculate_action_outcome(
            &caster,
            &target,
            &ActionKind::Cast("hex".into()),
            &BattleConfig::default(),
            &mut rng,
        )
        .unwrap();
        assert!(matches!(commands[0], BattleCommand::SpendMp { amount: 4, .. }));
        assert!(matches!(commands[1], BattleCommand::StartCooldown { turns: 2, .. }));
        assert!(matches!(
            &commands[2],
            BattleCommand::ApplyBuff { buff, .. } if buff.kind == BuffKind::Debuff && buff.remaining_turns == 2
        ));
    }

    #[test]
    fn test_check_cast_failure_order() {
        let mut caster = with_stats("c", Stats::new(50, 2, 5, 5, 10, 5)).with_abilities(vec![
            Ability::attack("combo", "Combo", 20, 5).with_combinations(&["jab"]),
            Ability::attack("bolt", "Bolt", 20, 5),
        ]);
        assert!(matches!(check_cast(&caster, "combo"), Err(ActionError::MissingCombination { .. })));
        caster.start_cooldown("bolt", 1);
        assert!(matches!(check_cast(&caster, "bolt"), Err(ActionError::OnCooldown { remaining: 1, .. })));
        caster.tick_cooldowns();
        assert!(matches!(check_cast(&caster, "bolt"), Err(ActionError::InsufficientMp { .. })));
        assert!(matches!(check_cast(&caster, "nope"), Err(ActionError::UnknownSkill { .. })));
    }
}
