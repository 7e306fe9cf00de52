use crate::battle::engine::BattleSystem;
use crate::battle::rng::BattleRng;
use crate::config::BattleConfig;
use crate::errors::BattleResult;
use crate::participant::Participant;
use schema::{Ability, Rule, Stats};

/// A builder for creating test participants with common defaults.
///
/// # Example
/// ```
/// let knight = TestParticipantBuilder::new("knight", "Knight")
///     .with_stats(Stats::new(120, 10, 15, 12, 0, 8))
///     .with_rule(10, "always", "weakestEnemy", "attack")
///     .build();
/// ```
pub struct TestParticipantBuilder {
    id: String,
    name: String,
    stats: Stats,
    hp: Option<u32>,
    mp: Option<u32>,
    abilities: Vec<Ability>,
    rules: Vec<Rule>,
    job: String,
    enemy: bool,
    boss: bool,
}

impl TestParticipantBuilder {
    /// Defaults: 100 HP, 20 MP, 10 in every other stat.
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            stats: Stats::new(100, 20, 10, 10, 10, 10),
            hp: None,
            mp: None,
            abilities: Vec::new(),
            rules: Vec::new(),
            job: String::new(),
            enemy: false,
            boss: false,
        }
    }

    pub fn with_stats(mut self, stats: Stats) -> Self {
        self.stats = stats;
        self
    }

    pub fn with_speed(mut self, speed: u32) -> Self {
        self.stats.speed = speed;
        self
    }

    /// Current HP. Max HP stays at the stat block value.
    pub fn with_hp(mut self, hp: u32) -> Self {
        self.hp = Some(hp);
        self
    }

    pub fn with_mp(mut self, mp: u32) -> Self {
        self.mp = Some(mp);
        self
    }

    pub fn with_ability(mut self, ability: Ability) -> Self {
        self.abilities.push(ability);
        self
    }

    pub fn with_rule(mut self, priority: u32, condition: &str, target: &str, action: &str) -> Self {
        self.rules.push(Rule::new(priority, condition, target, action));
        self
    }

    pub fn with_job(mut self, job: &str) -> Self {
        self.job = job.to_string();
        self
    }

    pub fn enemy(mut self) -> Self {
        self.enemy = true;
        self
    }

    pub fn boss(mut self) -> Self {
        self.enemy = true;
        self.boss = true;
        self
    }

    pub fn build(self) -> Participant {
        let mut participant = Participant::new(&self.id, &self.name, self.stats)
            .with_abilities(self.abilities)
            .with_rules(self.rules)
            .with_job(&self.job);
        participant.is_enemy = self.enemy;
        participant.is_boss = self.boss;
        if let Some(hp) = self.hp {
            participant.current_stats.hp = hp;
        }
        if let Some(mp) = self.mp {
            participant.current_stats.mp = mp;
        }
        participant
    }
}

/// Every draw returns 0: initiative is plain speed, damage has no jitter,
/// random targets pick the first living candidate.
pub fn zero_rng() -> BattleRng {
    BattleRng::new_for_test(vec![0])
}

/// Creates a battle system with scripted randomness and the default config.
pub fn create_test_battle(allies: Vec<Participant>, enemies: Vec<Participant>, rng: BattleRng) -> BattleSystem {
    let mut battle = BattleSystem::new().with_rng(rng);
    assert_ok(battle.initialize_battle(allies, enemies));
    battle
}

pub fn quiet_config(max_turns: u32) -> BattleConfig {
    BattleConfig {
        max_turns,
        ..BattleConfig::default()
    }
}

/// Helper function to assert that a Result is Ok and return the value.
pub fn assert_ok<T>(result: BattleResult<T>) -> T {
    match result {
        Ok(value) => value,
        Err(err) => panic!("Expected Ok but got error: {}", err),
    }
}

/// Run one turn and insist that somebody acted.
pub fn run_turn(battle: &mut BattleSystem) -> crate::battle::state::TurnResult {
    match assert_ok(battle.execute_turn()) {
        Some(turn) => turn,
        None => panic!("Expected a turn to be executed"),
    }
}

/// A sturdy, harmless opponent that keeps the battle going.
pub fn training_dummy(id: &str) -> Participant {
    TestParticipantBuilder::new(id, "Training Dummy")
        .with_stats(Stats::new(10_000, 0, 0, 0, 0, 1))
        .enemy()
        .build()
}
