use crate::errors::ConditionSyntaxError;
use crate::participant::Participant;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Whose numbers a condition reads.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subject {
    SelfActor,
    Ally,
    Enemy,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Hp,
    Mp,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Less,
    Greater,
}

impl Comparison {
    pub fn holds(self, lhs: f64, rhs: f64) -> bool {
        match self {
            Comparison::Less => lhs < rhs,
            Comparison::Greater => lhs > rhs,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartyRole {
    Healer,
    Tank,
    Dps,
}

/// Parsed form of a rule condition string.
///
/// Conditions are parsed once and evaluated many times. Input that does not
/// match the grammar becomes `Unrecognized` and always evaluates to false.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum Condition {
    Always,
    /// Any living enemy is a boss.
    EnemyIsBoss,
    /// Any living ally (the actor included) fills the role.
    PartyHas(PartyRole),
    /// `self` reads the actor; `ally`/`enemy` hold if any living member matches.
    ResourcePercent {
        subject: Subject,
        resource: Resource,
        cmp: Comparison,
        percent: f64,
    },
    /// Absolute HP/MP of the actor, e.g. `self.hp < 40`.
    SelfResource {
        resource: Resource,
        cmp: Comparison,
        value: u32,
    },
    /// Living headcount on one side.
    Count {
        subject: Subject,
        cmp: Comparison,
        value: u32,
    },
    Turn {
        cmp: Comparison,
        value: u32,
    },
    Unrecognized(String),
}

/// Everything a condition may look at.
#[derive(Debug, Clone, Copy)]
pub struct ConditionSnapshot<'a> {
    pub actor: &'a Participant,
    /// The actor's side, actor included.
    pub allies: &'a [Participant],
    pub enemies: &'a [Participant],
    pub turn_number: u32,
    pub tank_ratio: f64,
}

impl<'a> ConditionSnapshot<'a> {
    pub fn living_allies(&self) -> impl Iterator<Item = &'a Participant> {
        self.allies.iter().filter(|p| p.is_alive())
    }

    pub fn living_enemies(&self) -> impl Iterator<Item = &'a Participant> {
        self.enemies.iter().filter(|p| p.is_alive())
    }
}

impl Condition {
    /// Parse leniently: anything outside the grammar becomes `Unrecognized`.
    pub fn parse(raw: &str) -> Condition {
        raw.parse()
            .unwrap_or_else(|_| Condition::Unrecognized(raw.to_string()))
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, Condition::Unrecognized(_))
    }

    pub fn evaluate(&self, snapshot: &ConditionSnapshot<'_>) -> bool {
        match self {
            Condition::Always => true,
            Condition::EnemyIsBoss => snapshot.living_enemies().any(|e| e.is_boss),
            Condition::PartyHas(role) => snapshot.living_allies().any(|a| match role {
                PartyRole::Healer => a.has_heal_ability(),
                PartyRole::Tank => a.is_tank(snapshot.tank_ratio),
                PartyRole::Dps => a.has_damage_ability(),
            }),
            Condition::ResourcePercent {
                subject,
                resource,
                cmp,
                percent,
            } => {
                let reads = |p: &Participant| {
                    let value = match resource {
                        Resource::Hp => p.hp_percent(),
                        Resource::Mp => p.mp_percent(),
                    };
                    cmp.holds(value, *percent)
                };
                match subject {
                    Subject::SelfActor => reads(snapshot.actor),
                    Subject::Ally => snapshot.living_allies().any(reads),
                    Subject::Enemy => snapshot.living_enemies().any(reads),
                }
            }
            Condition::SelfResource {
                resource,
                cmp,
                value,
            } => {
                let current = match resource {
                    Resource::Hp => snapshot.actor.hp(),
                    Resource::Mp => snapshot.actor.mp(),
                };
                cmp.holds(current as f64, *value as f64)
            }
            Condition::Count { subject, cmp, value } => {
                let count = match subject {
                    Subject::Enemy => snapshot.living_enemies().count(),
                    _ => snapshot.living_allies().count(),
                };
                cmp.holds(count as f64, *value as f64)
            }
            Condition::Turn { cmp, value } => cmp.holds(snapshot.turn_number as f64, *value as f64),
            Condition::Unrecognized(raw) => {
                tracing::warn!(condition = %raw, actor = %snapshot.actor.id, "unrecognized condition evaluates to false");
                false
            }
        }
    }
}

/// Check a condition string against the grammar without evaluating it.
pub fn validate_condition(raw: &str) -> Result<Condition, ConditionSyntaxError> {
    raw.parse()
}

impl FromStr for Condition {
    type Err = ConditionSyntaxError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let error = |reason: &str| ConditionSyntaxError {
            input: raw.to_string(),
            reason: reason.to_string(),
        };
        let normalized = raw.trim().to_lowercase();
        if normalized.is_empty() {
            return Err(error("empty condition"));
        }

        match normalized.as_str() {
            "always" => return Ok(Condition::Always),
            "enemy.isboss" => return Ok(Condition::EnemyIsBoss),
            "party.hashealer" => return Ok(Condition::PartyHas(PartyRole::Healer)),
            "party.hastank" => return Ok(Condition::PartyHas(PartyRole::Tank)),
            "party.hasdps" => return Ok(Condition::PartyHas(PartyRole::Dps)),
            _ => {}
        }

        let Some(op_at) = normalized.find(['<', '>']) else {
            return Err(error("expected a keyword or a '<'/'>' comparison"));
        };
        let cmp = if normalized[op_at..].starts_with('<') {
            Comparison::Less
        } else {
            Comparison::Greater
        };
        let lhs = normalized[..op_at].trim();
        let rhs = normalized[op_at + 1..].trim();
        let (number, is_percent) = match rhs.strip_suffix('%') {
            Some(n) => (n.trim(), true),
            None => (rhs, false),
        };
        if number.is_empty() {
            return Err(error("missing number after comparison"));
        }

        let subject = |name: &str| match name {
            "self" => Some(Subject::SelfActor),
            "ally" => Some(Subject::Ally),
            "enemy" => Some(Subject::Enemy),
            _ => None,
        };

        if lhs == "turn" {
            return match (is_percent, number.parse::<u32>()) {
                (false, Ok(value)) => Ok(Condition::Turn { cmp, value }),
                (true, _) => Err(error("turn takes a plain number")),
                (_, Err(_)) => Err(error("turn threshold must be a whole number")),
            };
        }

        let Some((who, field)) = lhs.split_once('.') else {
            return Err(error("unknown subject"));
        };
        let Some(who) = subject(who.trim()) else {
            return Err(error("subject must be self, ally or enemy"));
        };

        match field.trim() {
            "count" => {
                if who == Subject::SelfActor {
                    return Err(error("count applies to ally or enemy"));
                }
                if is_percent {
                    return Err(error("count takes a plain number"));
                }
                let value = number
                    .parse::<u32>()
                    .map_err(|_| error("count must be a whole number"))?;
                Ok(Condition::Count {
                    subject: who,
                    cmp,
                    value,
                })
            }
            field @ ("hp" | "mp") => {
                let resource = if field == "hp" { Resource::Hp } else { Resource::Mp };
                if is_percent {
                    let percent = number
                        .parse::<f64>()
                        .ok()
                        .filter(|p| p.is_finite())
                        .ok_or_else(|| error("percentage must be a number"))?;
                    Ok(Condition::ResourcePercent {
                        subject: who,
                        resource,
                        cmp,
                        percent,
                    })
                } else if who == Subject::SelfActor {
                    let value = number
                        .parse::<u32>()
                        .map_err(|_| error("threshold must be a whole number"))?;
                    Ok(Condition::SelfResource { resource, cmp, value })
                } else {
                    Err(error("ally/enemy thresholds must be percentages"))
                }
            }
            _ => Err(error("unknown field; expected hp, mp or count")),
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = |cmp: &Comparison| match cmp {
            Comparison::Less => "<",
            Comparison::Greater => ">",
        };
        let who = |s: &Subject| match s {
            Subject::SelfActor => "self",
            Subject::Ally => "ally",
            Subject::Enemy => "enemy",
        };
        let res = |r: &Resource| match r {
            Resource::Hp => "hp",
            Resource::Mp => "mp",
        };
        match self {
            Condition::Always => write!(f, "always"),
            Condition::EnemyIsBoss => write!(f, "enemy.isBoss"),
            Condition::PartyHas(PartyRole::Healer) => write!(f, "party.hasHealer"),
            Condition::PartyHas(PartyRole::Tank) => write!(f, "party.hasTank"),
            Condition::PartyHas(PartyRole::Dps) => write!(f, "party.hasDps"),
            Condition::ResourcePercent {
                subject,
                resource,
                cmp,
                percent,
            } => write!(f, "{}.{} {} {}%", who(subject), res(resource), op(cmp), percent),
            Condition::SelfResource { resource, cmp, value } => {
                write!(f, "self.{} {} {}", res(resource), op(cmp), value)
            }
            Condition::Count { subject, cmp, value } => {
                write!(f, "{}.count {} {}", who(subject), op(cmp), value)
            }
            Condition::Turn { cmp, value } => write!(f, "turn {} {}", op(cmp), value),
            Condition::Unrecognized(raw) => write!(f, "{}", raw),
        }
    }
}
