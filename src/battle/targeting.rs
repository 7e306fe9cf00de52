use crate::battle::rng::BattleRng;
use crate::participant::{Participant, ParticipantId};
use schema::SkillKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Target strategies a rule or behavior pattern can name.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetKind {
    SelfTarget,
    WeakestEnemy,
    LowestHpEnemy,
    StrongestEnemy,
    RandomEnemy,
    BossEnemy,
    LowestHpAlly,
    RandomAlly,
    StrongestAlly,
    HighestMpAlly,
}

impl TargetKind {
    pub fn is_enemy_side(self) -> bool {
        matches!(
            self,
            TargetKind::WeakestEnemy
                | TargetKind::LowestHpEnemy
                | TargetKind::StrongestEnemy
                | TargetKind::RandomEnemy
                | TargetKind::BossEnemy
        )
    }
}

impl FromStr for TargetKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.to_uppercase().replace([' ', '-', '_'], "");

        match normalized.as_str() {
            "SELF" => Ok(TargetKind::SelfTarget),
            "WEAKESTENEMY" => Ok(TargetKind::WeakestEnemy),
            "LOWESTHPENEMY" => Ok(TargetKind::LowestHpEnemy),
            "STRONGESTENEMY" => Ok(TargetKind::StrongestEnemy),
            "RANDOMENEMY" => Ok(TargetKind::RandomEnemy),
            "BOSSENEMY" => Ok(TargetKind::BossEnemy),
            "LOWESTHPALLY" => Ok(TargetKind::LowestHpAlly),
            "RANDOMALLY" => Ok(TargetKind::RandomAlly),
            "STRONGESTALLY" => Ok(TargetKind::StrongestAlly),
            "HIGHESTMPALLY" => Ok(TargetKind::HighestMpAlly),
            _ => Err(format!("Unknown target: {}", s)),
        }
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TargetKind::SelfTarget => "self",
            TargetKind::WeakestEnemy => "weakestEnemy",
            TargetKind::LowestHpEnemy => "lowestHpEnemy",
            TargetKind::StrongestEnemy => "strongestEnemy",
            TargetKind::RandomEnemy => "randomEnemy",
            TargetKind::BossEnemy => "bossEnemy",
            TargetKind::LowestHpAlly => "lowestHpAlly",
            TargetKind::RandomAlly => "randomAlly",
            TargetKind::StrongestAlly => "strongestAlly",
            TargetKind::HighestMpAlly => "highestMpAlly",
        };
        write!(f, "{}", name)
    }
}

/// Outcome of a target lookup. `target` is `None` when the eligible pool was empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetSelection {
    pub target: Option<ParticipantId>,
    pub reason: String,
    /// Other living candidates that were considered, in roster order.
    pub alternatives: Vec<ParticipantId>,
}

impl TargetSelection {
    fn none(reason: impl Into<String>) -> Self {
        Self {
            target: None,
            reason: reason.into(),
            alternatives: Vec::new(),
        }
    }

    fn chosen(target: &Participant, pool: &[&Participant], reason: String) -> Self {
        Self {
            target: Some(target.id.clone()),
            reason,
            alternatives: pool
                .iter()
                .filter(|p| p.id != target.id)
                .map(|p| p.id.clone())
                .collect(),
        }
    }
}

// Ties keep the first candidate in roster order.
fn min_by_key<'a, K: Ord>(pool: &[&'a Participant], key: impl Fn(&Participant) -> K) -> Option<&'a Participant> {
    let mut best: Option<&'a Participant> = None;
    for candidate in pool {
        if best.map_or(true, |b| key(*candidate) < key(b)) {
            best = Some(*candidate);
        }
    }
    best
}

fn max_by_key<'a, K: Ord>(pool: &[&'a Participant], key: impl Fn(&Participant) -> K) -> Option<&'a Participant> {
    let mut best: Option<&'a Participant> = None;
    for candidate in pool {
        if best.map_or(true, |b| key(*candidate) > key(b)) {
            best = Some(*candidate);
        }
    }
    best
}

/// Resolve `kind` to a concrete living participant.
///
/// `allies` is the actor's own side and includes the actor, so ally
/// strategies may pick the actor itself. Dead participants are never chosen.
pub fn select_target(
    kind: TargetKind,
    actor: &Participant,
    allies: &[Participant],
    enemies: &[Participant],
    rng: &mut BattleRng,
) -> TargetSelection {
    let living_allies: Vec<&Participant> = allies.iter().filter(|p| p.is_alive()).collect();
    let living_enemies: Vec<&Participant> = enemies.iter().filter(|p| p.is_alive()).collect();

    let pool = if kind.is_enemy_side() {
        &living_enemies
    } else {
        &living_allies
    };

    if kind == TargetKind::SelfTarget {
        return if actor.is_alive() {
            TargetSelection {
                target: Some(actor.id.clone()),
                reason: "targeting self".to_string(),
                alternatives: Vec::new(),
            }
        } else {
            TargetSelection::none("actor is not alive")
        };
    }

    if pool.is_empty() {
        let side = if kind.is_enemy_side() { "enemies" } else { "allies" };
        return TargetSelection::none(format!("no living {} for {}", side, kind));
    }

    let (target, reason) = match kind {
        TargetKind::WeakestEnemy | TargetKind::LowestHpEnemy | TargetKind::LowestHpAlly => {
            let t = min_by_key(pool, |p| p.hp());
            (t, format!("lowest current HP for {}", kind))
        }
        TargetKind::StrongestEnemy | TargetKind::StrongestAlly => {
            let t = max_by_key(pool, |p| p.hp());
            (t, format!("highest current HP for {}", kind))
        }
        TargetKind::HighestMpAlly => {
            let t = max_by_key(pool, |p| p.mp());
            (t, "highest current MP among allies".to_string())
        }
        TargetKind::RandomEnemy | TargetKind::RandomAlly => {
            let idx = rng.pick_index(pool.len(), "random target");
            (pool.get(idx).copied(), format!("random pick for {}", kind))
        }
        TargetKind::BossEnemy => match pool.iter().find(|p| p.is_boss) {
            Some(boss) => (Some(*boss), "first living boss".to_string()),
            None => (
                max_by_key(pool, |p| p.hp()),
                "no living boss; falling back to strongest enemy".to_string(),
            ),
        },
        TargetKind::SelfTarget => (Some(actor), "targeting self".to_string()),
    };

    match target {
        Some(t) => TargetSelection::chosen(t, pool, reason),
        None => TargetSelection::none(format!("no candidate for {}", kind)),
    }
}

/// The default target strategy for a skill kind.
pub fn suggest_optimal_target(
    kind: SkillKind,
    actor: &Participant,
    allies: &[Participant],
    enemies: &[Participant],
    rng: &mut BattleRng,
) -> TargetSelection {
    let strategy = match kind {
        SkillKind::Attack => {
            if enemies.iter().any(|e| e.is_alive() && e.is_boss) {
                TargetKind::BossEnemy
            } else {
                TargetKind::WeakestEnemy
            }
        }
        SkillKind::Heal => TargetKind::LowestHpAlly,
        SkillKind::Buff => TargetKind::StrongestAlly,
        SkillKind::Debuff => TargetKind::StrongestEnemy,
    };
    select_target(strategy, actor, allies, enemies, rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use schema::Stats;

    fn unit(id: &str, hp: u32, mp: u32) -> Participant {
        let mut p = Participant::new(id, id, Stats::new(100, 50, 10, 10, 10, 10));
        p.current_stats.hp = hp;
        p.current_stats.mp = mp;
        p
    }

    #[rstest]
    #[case("self", TargetKind::SelfTarget)]
    #[case("weakestEnemy", TargetKind::WeakestEnemy)]
    #[case("lowest_hp_ally", TargetKind::LowestHpAlly)]
    #[case("Boss Enemy", TargetKind::BossEnemy)]
    fn test_target_kind_parses(#[case] raw: &str, #[case] expected: TargetKind) {
        assert_eq!(raw.parse::<TargetKind>(), Ok(expected));
    }

    #[test]
    fn test_unknown_target_is_error() {
        assert!("nearestEnemy".parse::<TargetKind>().is_err());
    }

    #[test]
    fn test_weakest_enemy_skips_dead_and_keeps_first_on_tie() {
        let actor = unit("a", 100, 0);
        let allies = vec![actor.clone()];
        let enemies = vec![unit("dead", 0, 0), unit("e1", 30, 0), unit("e2", 30, 0), unit("e3", 80, 0)];
        let mut rng = BattleRng::from_seed(0);

        let sel = select_target(TargetKind::WeakestEnemy, &actor, &allies, &enemies, &mut rng);
        assert_eq!(sel.target.as_deref(), Some("e1"));
        assert_eq!(sel.alternatives, vec!["e2".to_string(), "e3".to_string()]);
    }

    #[test]
    fn test_ally_pool_includes_actor() {
        let actor = unit("a", 10, 0);
        let allies = vec![unit("b", 60, 0), actor.clone()];
        let enemies = vec![unit("e", 50, 0)];
        let mut rng = BattleRng::from_seed(0);

        let sel = select_target(TargetKind::LowestHpAlly, &actor, &allies, &enemies, &mut rng);
        assert_eq!(sel.target.as_deref(), Some("a"));
    }

    #[test]
    fn test_boss_falls_back_to_strongest() {
        let actor = unit("a", 10, 0);
        let allies = vec![actor.clone()];
        let enemies = vec![unit("e1", 40, 0), unit("e2", 70, 0)];
        let mut rng = BattleRng::from_seed(0);

        let sel = select_target(TargetKind::BossEnemy, &actor, &allies, &enemies, &mut rng);
        assert_eq!(sel.target.as_deref(), Some("e2"));
        assert!(sel.reason.contains("falling back"));
    }

    #[test]
    fn test_empty_pool_returns_none_with_reason() {
        let actor = unit("a", 10, 0);
        let allies = vec![actor.clone()];
        let enemies = vec![unit("e1", 0, 0)];
        let mut rng = BattleRng::from_seed(0);

        let sel = select_target(TargetKind::RandomEnemy, &actor, &allies, &enemies, &mut rng);
        assert_eq!(sel.target, None);
        assert!(sel.reason.contains("no living enemies"));
    }

    #[test]
    fn test_highest_mp_ally() {
        let actor = unit("a", 10, 5);
        let allies = vec![actor.clone(), unit("b", 10, 40)];
        let mut rng = BattleRng::from_seed(0);
        let sel = select_target(TargetKind::HighestMpAlly, &actor, &allies, &[], &mut rng);
        assert_eq!(sel.target.as_deref(), Some("b"));
    }

    #[test]
    fn test_suggest_attack_prefers_boss() {
        let actor = unit("a", 10, 0);
        let allies = vec![actor.clone()];
        let enemies = vec![unit("minion", 5, 0), unit("boss", 100, 0).as_boss()];
        let mut rng = BattleRng::from_seed(0);
        let sel = suggest_optimal_target(SkillKind::Attack, &actor, &allies, &enemies, &mut rng);
        assert_eq!(sel.target.as_deref(), Some("boss"));

        let sel = suggest_optimal_target(SkillKind::Heal, &actor, &allies, &enemies, &mut rng);
        assert_eq!(sel.target.as_deref(), Some("a"));
    }
}
