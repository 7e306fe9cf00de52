use crate::participant::{ParticipantId, Side};

/// Main error type for the rule-battle engine
#[derive(Debug, thiserror::Error)]
pub enum BattleEngineError {
    /// The battle could not be set up from the given rosters
    #[error("Battle setup error: {0}")]
    Setup(#[from] SetupError),
    /// The battle state was used in a way its current phase does not allow
    #[error("Battle state error: {0}")]
    BattleState(#[from] BattleStateError),
    /// A concrete action could not be carried out
    #[error("Action error: {0}")]
    Action(#[from] ActionError),
    /// A collaborator failed to build a participant
    #[error("Factory error: {0}")]
    Factory(#[from] FactoryError),
    /// Configuration could not be loaded or is invalid
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Errors raised before any turn runs. These are programmer errors and are
/// never swallowed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SetupError {
    #[error("{0} roster is empty")]
    EmptyRoster(Side),
    #[error("{0} roster has no living members")]
    NoLivingMembers(Side),
    #[error("participant id '{0}' appears more than once")]
    DuplicateParticipantId(ParticipantId),
    #[error("participant '{id}' is malformed: {reason}")]
    MalformedParticipant { id: ParticipantId, reason: String },
}

/// Errors related to battle state validation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BattleStateError {
    #[error("battle has not been initialized")]
    NotInitialized,
    #[error("battle is already complete")]
    AlreadyComplete,
    #[error("battle is not complete yet")]
    NotComplete,
    #[error("unknown participant '{0}'")]
    UnknownParticipant(ParticipantId),
    #[error("inconsistent battle state: {0}")]
    InconsistentState(String),
}

/// Reasons a specific action cannot be performed by its actor
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActionError {
    #[error("{actor} does not know skill '{skill}'")]
    UnknownSkill { actor: String, skill: String },
    #[error("skill '{skill}' is on cooldown for {remaining} more turn(s)")]
    OnCooldown { skill: String, remaining: u32 },
    #[error("not enough MP for '{skill}' ({available}/{required})")]
    InsufficientMp {
        skill: String,
        required: u32,
        available: u32,
    },
    #[error("skill '{skill}' requires {missing:?}")]
    MissingCombination { skill: String, missing: Vec<String> },
    #[error("no valid target: {0}")]
    NoTarget(String),
}

/// A condition string that does not match the rule grammar
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid condition '{input}': {reason}")]
pub struct ConditionSyntaxError {
    pub input: String,
    pub reason: String,
}

/// Errors from an `EntityFactory` implementation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FactoryError {
    #[error("no template named '{0}'")]
    UnknownTemplate(String),
    #[error("invalid template '{name}': {reason}")]
    InvalidTemplate { name: String, reason: String },
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse RON: {0}")]
    Parse(#[from] ron::error::SpannedError),
    #[error("failed to read file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Type alias for Results using BattleEngineError
pub type BattleResult<T> = Result<T, BattleEngineError>;

/// Type alias for Results using SetupError
pub type SetupResult<T> = Result<T, SetupError>;
