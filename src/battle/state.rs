use crate::battle::rng::BattleRng;
use crate::battle::calculators::initiative;
use crate::participant::{BuffKind, Participant, ParticipantId, Side};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Victor {
    Allies,
    Enemies,
}

impl From<Side> for Victor {
    fn from(side: Side) -> Self {
        match side {
            Side::Allies => Victor::Allies,
            Side::Enemies => Victor::Enemies,
        }
    }
}

impl fmt::Display for Victor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TurnOrderEntry {
    pub participant_id: ParticipantId,
    pub speed: u32,
    pub initiative: u32,
}

/// The record of one actor's turn. Immutable once pushed to history.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct TurnResult {
    pub turn_number: u32,
    pub actor_id: ParticipantId,
    pub actor_name: String,
    pub target_id: Option<ParticipantId>,
    pub target_name: Option<String>,
    pub action: String,
    pub damage: Option<u32>,
    pub heal: Option<u32>,
    pub buff_applied: Option<String>,
    pub debuff_applied: Option<String>,
    pub summoned: Vec<ParticipantId>,
    pub success: bool,
    pub substituted: bool,
    pub message: String,
    pub target_hp_before: Option<u32>,
    pub target_hp_after: Option<u32>,
}

impl TurnResult {
    pub fn skipped(turn_number: u32, actor: &Participant, action: String, message: String) -> Self {
        Self {
            turn_number,
            actor_id: actor.id.clone(),
            actor_name: actor.name.clone(),
            action,
            success: false,
            message,
            ..Default::default()
        }
    }
}

/// Round-level happenings that do not fit in a `TurnResult`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub enum BattleEvent {
    RoundStarted {
        turn_number: u32,
    },
    TurnOrderComputed {
        order: Vec<ParticipantId>,
    },
    BuffApplied {
        target: String,
        buff: String,
        kind: BuffKind,
        duration: u32,
    },
    BuffExpired {
        target: String,
        buff: String,
    },
    CooldownReady {
        participant: String,
        skill: String,
    },
    ParticipantDefeated {
        id: ParticipantId,
        name: String,
    },
    Summoned {
        caster: String,
        summoned: Vec<String>,
    },
    ActionSubstituted {
        actor: String,
        reason: String,
    },
    TurnSkipped {
        actor: String,
        reason: String,
    },
    BattleEnded {
        victor: Option<Victor>,
        reason: String,
    },
}

impl fmt::Display for BattleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BattleEvent::RoundStarted { turn_number } => write!(f, "--- Round {} ---", turn_number),
            BattleEvent::TurnOrderComputed { order } => write!(f, "Turn order: {}", order.join(", ")),
            BattleEvent::BuffApplied {
                target,
                buff,
                kind,
                duration,
            } => {
                let label = match kind {
                    BuffKind::Buff => "gains",
                    BuffKind::Debuff => "suffers",
                };
                write!(f, "{} {} {} for {} turn(s)", target, label, buff, duration)
            }
            BattleEvent::BuffExpired { target, buff } => write!(f, "{}'s {} wore off", target, buff),
            BattleEvent::CooldownReady { participant, skill } => {
                write!(f, "{}'s {} is ready again", participant, skill)
            }
            BattleEvent::ParticipantDefeated { name, .. } => write!(f, "{} was defeated!", name),
            BattleEvent::Summoned { caster, summoned } => {
                write!(f, "{} summoned {}", caster, summoned.join(", "))
            }
            BattleEvent::ActionSubstituted { actor, reason } => write!(f, "{}: {}", actor, reason),
            BattleEvent::TurnSkipped { actor, reason } => write!(f, "{} skips the turn: {}", actor, reason),
            BattleEvent::BattleEnded { victor, reason } => match victor {
                Some(victor) => write!(f, "{} win ({})", victor, reason),
                None => write!(f, "Battle ended without a victor ({})", reason),
            },
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct EventBus {
    events: Vec<BattleEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn push(&mut self, event: BattleEvent) {
        tracing::trace!(%event, "battle event");
        self.events.push(event);
    }

    pub fn events(&self) -> &[BattleEvent] {
        &self.events
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// Return true if the event bus contains no events.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Return the number of events on the bus.
    pub fn len(&self) -> usize {
        self.events.len()
    }
}

impl fmt::Display for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for event in &self.events {
            writeln!(f, "  {}", event)?;
        }
        Ok(())
    }
}

/// All mutable state of one battle.
///
/// Participants are addressed by id. The id index maps to a side and a slot
/// in that side's roster; rosters only ever grow, so slots stay valid.
#[derive(Serialize, Debug, Clone)]
pub struct BattleState {
    pub allies: Vec<Participant>,
    pub enemies: Vec<Participant>,
    pub turn_number: u32,
    pub turn_order: Vec<TurnOrderEntry>,
    pub current_turn_index: usize,
    pub is_complete: bool,
    pub victor: Option<Victor>,
    pub end_reason: Option<String>,
    pub history: Vec<TurnResult>,
    #[serde(skip)]
    index: HashMap<ParticipantId, (Side, usize)>,
}

impl BattleState {
    pub fn new(allies: Vec<Participant>, enemies: Vec<Participant>) -> Self {
        let mut state = Self {
            allies,
            enemies,
            turn_number: 1,
            turn_order: Vec::new(),
            current_turn_index: 0,
            is_complete: false,
            victor: None,
            end_reason: None,
            history: Vec::new(),
            index: HashMap::new(),
        };
        for (slot, p) in state.allies.iter().enumerate() {
            state.index.insert(p.id.clone(), (Side::Allies, slot));
        }
        for (slot, p) in state.enemies.iter().enumerate() {
            state.index.insert(p.id.clone(), (Side::Enemies, slot));
        }
        state
    }

    pub fn roster(&self, side: Side) -> &[Participant] {
        match side {
            Side::Allies => &self.allies,
            Side::Enemies => &self.enemies,
        }
    }

    fn roster_mut(&mut self, side: Side) -> &mut Vec<Participant> {
        match side {
            Side::Allies => &mut self.allies,
            Side::Enemies => &mut self.enemies,
        }
    }

    /// `(own side, other side)` as seen by a member of `side`.
    pub fn perspective(&self, side: Side) -> (&[Participant], &[Participant]) {
        (self.roster(side), self.roster(side.opposite()))
    }

    pub fn side_of(&self, id: &str) -> Option<Side> {
        self.index.get(id).map(|(side, _)| *side)
    }

    pub fn get(&self, id: &str) -> Option<&Participant> {
        let (side, slot) = self.index.get(id)?;
        self.roster(*side).get(*slot)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Participant> {
        let (side, slot) = *self.index.get(id)?;
        self.roster_mut(side).get_mut(slot)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Append a participant to `side`. The caller guarantees the id is unused.
    pub fn add_participant(&mut self, side: Side, mut participant: Participant) {
        participant.is_enemy = side == Side::Enemies;
        let roster = self.roster_mut(side);
        roster.push(participant);
        let slot = roster.len() - 1;
        let id = roster[slot].id.clone();
        self.index.insert(id, (side, slot));
    }

    pub fn all_participants(&self) -> impl Iterator<Item = &Participant> {
        self.allies.iter().chain(self.enemies.iter())
    }

    pub fn living_count(&self, side: Side) -> usize {
        self.roster(side).iter().filter(|p| p.is_alive()).count()
    }

    pub fn is_alive(&self, id: &str) -> bool {
        self.get(id).is_some_and(|p| p.is_alive())
    }

    /// Roll initiative for `ids` and order them highest first. Ties keep
    /// the order of `ids`.
    pub fn rank_by_initiative(&self, ids: &[ParticipantId], rng: &mut BattleRng, jitter: u32) -> Vec<TurnOrderEntry> {
        let mut entries: Vec<TurnOrderEntry> = ids
            .iter()
            .filter_map(|id| self.get(id))
            .filter(|p| p.is_alive())
            .map(|p| {
                let speed = p.current_stats.speed;
                TurnOrderEntry {
                    participant_id: p.id.clone(),
                    speed,
                    initiative: initiative(speed, rng.below(jitter, "initiative")),
                }
            })
            .collect();
        entries.sort_by(|a, b| b.initiative.cmp(&a.initiative));
        entries
    }

    /// Recompute the whole turn order over every living participant,
    /// allies listed before enemies, and restart at the first slot.
    pub fn compute_turn_order(&mut self, rng: &mut BattleRng, jitter: u32) {
        let ids: Vec<ParticipantId> = self
            .all_participants()
            .filter(|p| p.is_alive())
            .map(|p| p.id.clone())
            .collect();
        self.turn_order = self.rank_by_initiative(&ids, rng, jitter);
        self.current_turn_index = 0;
    }

    /// Fold newly added participants into the current round. Entries up to
    /// and including the current slot stay put; everyone still waiting,
    /// plus the newcomers, is re-ranked by fresh initiative.
    pub fn reschedule_with(&mut self, newcomers: &[ParticipantId], rng: &mut BattleRng, jitter: u32) {
        let keep = (self.current_turn_index + 1).min(self.turn_order.len());
        let mut waiting: Vec<ParticipantId> = self.turn_order[keep..]
            .iter()
            .map(|e| e.participant_id.clone())
            .collect();
        waiting.extend(newcomers.iter().cloned());
        let reranked = self.rank_by_initiative(&waiting, rng, jitter);
        self.turn_order.truncate(keep);
        self.turn_order.extend(reranked);
    }

    pub fn turn_order_ids(&self) -> Vec<ParticipantId> {
        self.turn_order.iter().map(|e| e.participant_id.clone()).collect()
    }
}
