use serde::{Deserialize, Serialize};

/// An authored decision rule: when `condition` holds, do `action` to `target`.
///
/// `action` is either `"attack"` or `"cast:<skillId>"`. Higher `priority`
/// wins; equal priorities keep declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub priority: u32,
    pub condition: String,
    pub target: String,
    pub action: String,
}

impl Rule {
    pub fn new(priority: u32, condition: &str, target: &str, action: &str) -> Self {
        Self {
            priority,
            condition: condition.to_string(),
            target: target.to_string(),
            action: action.to_string(),
        }
    }
}
