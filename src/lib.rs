//! Rule Battle Engine
//!
//! A turn-based combat simulator. Party members act on authored priority
//! rules, enemies act on archetype behavior patterns, and a `BattleSystem`
//! drives rounds until one side falls or the turn cap is reached.

// --- MODULE DECLARATIONS ---
pub mod battle;
pub mod collaborators;
pub mod config;
pub mod errors;
pub mod factory;
pub mod loot;
pub mod participant;

// --- PUBLIC API RE-EXPORTS ---

// --- From the `schema` crate ---
pub use schema::{Ability, Rule, SkillEffect, SkillKind, StatKind, Stats};

// --- From this crate's modules (`src/`) ---

// Battle driver and its results.
pub use battle::engine::{BattleOutcome, BattleReport, BattleSystem, ParticipantStatistics};
pub use battle::state::{BattleEvent, BattleState, EventBus, TurnResult, Victor};

// Decision making.
pub use battle::ai::{Behavior, EnemyAI, EnemyDecision};
pub use battle::conditions::{validate_condition, Condition, ConditionSnapshot};
pub use battle::resolver::{ActionKind, ActionResolver, ResolvedAction, RulesValidationReport};
pub use battle::rng::BattleRng;
pub use battle::targeting::{select_target, suggest_optimal_target, TargetKind, TargetSelection};

// Runtime participants and collaborators.
pub use collaborators::{BattleEnemyDef, BattleLogger, EntityFactory, LootSummary, LootSystem, PartyMemberDef, TracingLogger};
pub use config::BattleConfig;
pub use factory::{ParticipantTemplate, TemplateFactory};
pub use loot::RewardTable;
pub use participant::{Buff, BuffKind, Participant, ParticipantId, Side};

// Crate-specific error and result types.
pub use errors::{
    ActionError, BattleEngineError, BattleResult, BattleStateError, ConditionSyntaxError, ConfigError, FactoryError,
    SetupError, SetupResult,
};
