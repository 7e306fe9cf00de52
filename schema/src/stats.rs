use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

/// One of the six combat stats.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, EnumIter,
)]
#[strum(serialize_all = "lowercase")]
pub enum StatKind {
    Hp,
    Mp,
    Str,
    Def,
    Mag,
    Spd,
}

/// A full stat block. All values are non-negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Stats {
    pub hp: u32,
    pub mp: u32,
    #[serde(rename = "str")]
    pub strength: u32,
    #[serde(rename = "def")]
    pub defense: u32,
    #[serde(rename = "mag")]
    pub magic: u32,
    #[serde(rename = "spd")]
    pub speed: u32,
}

impl Stats {
    pub fn new(hp: u32, mp: u32, strength: u32, defense: u32, magic: u32, speed: u32) -> Self {
        Self {
            hp,
            mp,
            strength,
            defense,
            magic,
            speed,
        }
    }

    pub fn get(&self, stat: StatKind) -> u32 {
        match stat {
            StatKind::Hp => self.hp,
            StatKind::Mp => self.mp,
            StatKind::Str => self.strength,
            StatKind::Def => self.defense,
            StatKind::Mag => self.magic,
            StatKind::Spd => self.speed,
        }
    }

    pub fn set(&mut self, stat: StatKind, value: u32) {
        let slot = match stat {
            StatKind::Hp => &mut self.hp,
            StatKind::Mp => &mut self.mp,
            StatKind::Str => &mut self.strength,
            StatKind::Def => &mut self.defense,
            StatKind::Mag => &mut self.magic,
            StatKind::Spd => &mut self.speed,
        };
        *slot = value;
    }

    /// Returns a copy with every stat multiplied by `numerator / denominator`, rounded down.
    pub fn scaled(&self, numerator: u32, denominator: u32) -> Self {
        let scale = |v: u32| -> u32 {
            if denominator == 0 {
                v
            } else {
                ((v as u64 * numerator as u64) / denominator as u64) as u32
            }
        };
        Self {
            hp: scale(self.hp),
            mp: scale(self.mp),
            strength: scale(self.strength),
            defense: scale(self.defense),
            magic: scale(self.magic),
            speed: scale(self.speed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_get_set_cover_every_stat() {
        let mut stats = Stats::default();
        for (i, stat) in StatKind::iter().enumerate() {
            stats.set(stat, i as u32 + 1);
        }
        assert_eq!(stats, Stats::new(1, 2, 3, 4, 5, 6));
        assert_eq!(stats.get(StatKind::Mag), 5);
    }

    #[test]
    fn test_scaled_rounds_down() {
        let stats = Stats::new(15, 7, 10, 3, 0, 9);
        assert_eq!(stats.scaled(11, 10), Stats::new(16, 7, 11, 3, 0, 9));
    }

    #[test]
    fn test_stats_use_short_field_names_when_serialized() {
        let json = serde_json::to_string(&Stats::new(1, 2, 3, 4, 5, 6)).unwrap();
        assert_eq!(json, r#"{"hp":1,"mp":2,"str":3,"def":4,"mag":5,"spd":6}"#);
    }
}
