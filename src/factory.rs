//! Template-backed `EntityFactory`.
//!
//! Templates are keyed by type id ("goblin", "knight", ...). The built-in
//! table covers a small party and a handful of enemies; a RON table can
//! replace or extend it.

use crate::collaborators::{EntityFactory, PartyMemberDef};
use crate::errors::{ConfigError, FactoryError};
use crate::participant::Participant;
use schema::{Ability, Rule, StatKind, Stats};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

/// Static definition a participant is built from.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ParticipantTemplate {
    pub name: String,
    /// Keywords such as "goblin warrior". Copied onto the participant.
    #[serde(default)]
    pub job: String,
    pub stats: Stats,
    #[serde(default)]
    pub abilities: Vec<Ability>,
    #[serde(default)]
    pub rules: Vec<Rule>,
    #[serde(default)]
    pub is_boss: bool,
}

impl ParticipantTemplate {
    fn new(name: &str, job: &str, stats: Stats) -> Self {
        Self {
            name: name.to_string(),
            job: job.to_string(),
            stats,
            abilities: Vec::new(),
            rules: Vec::new(),
            is_boss: false,
        }
    }

    fn abilities(mut self, abilities: Vec<Ability>) -> Self {
        self.abilities = abilities;
        self
    }

    fn rules(mut self, rules: Vec<Rule>) -> Self {
        self.rules = rules;
        self
    }

    fn boss(mut self) -> Self {
        self.is_boss = true;
        self
    }

    fn instantiate(&self, template_id: &str, id: &str, name: &str, level: u32) -> Participant {
        let mut participant = Participant::new(id, name, scale_for_level(self.stats, level))
            .with_abilities(self.abilities.clone())
            .with_rules(self.rules.clone())
            .with_job(&self.job)
            .with_level(level.max(1));
        participant.template_id = Some(template_id.to_string());
        participant.is_boss = self.is_boss;
        participant
    }
}

/// Each stat times `1 + 0.1 * (level - 1)`, rounded down. Level 0 counts as 1.
pub fn scale_for_level(stats: Stats, level: u32) -> Stats {
    let level = level.max(1);
    stats.scaled(10 + (level - 1), 10)
}

#[derive(Debug, Clone)]
pub struct TemplateFactory {
    templates: BTreeMap<String, ParticipantTemplate>,
    issued: HashMap<String, u32>,
}

impl Default for TemplateFactory {
    fn default() -> Self {
        Self::with_templates(builtin_templates())
    }
}

impl TemplateFactory {
    pub fn with_templates(templates: BTreeMap<String, ParticipantTemplate>) -> Self {
        Self {
            templates,
            issued: HashMap::new(),
        }
    }

    /// Parse a RON map of type id to template.
    pub fn from_ron_str(source: &str) -> Result<Self, ConfigError> {
        let templates: BTreeMap<String, ParticipantTemplate> = ron::from_str(source)?;
        Ok(Self::with_templates(templates))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_ron_str(&source)
    }

    pub fn insert(&mut self, type_id: &str, template: ParticipantTemplate) {
        self.templates.insert(type_id.to_string(), template);
    }

    pub fn template(&self, type_id: &str) -> Option<&ParticipantTemplate> {
        self.templates.get(type_id)
    }

    pub fn template_ids(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(String::as_str)
    }

    fn lookup(&self, type_id: &str) -> Result<&ParticipantTemplate, FactoryError> {
        let template = self
            .templates
            .get(type_id)
            .ok_or_else(|| FactoryError::UnknownTemplate(type_id.to_string()))?;
        if template.stats.hp == 0 {
            return Err(FactoryError::InvalidTemplate {
                name: type_id.to_string(),
                reason: "max HP is zero".to_string(),
            });
        }
        Ok(template)
    }

    /// `<type>-<n>`, counting per type from 1.
    fn next_id(&mut self, type_id: &str) -> String {
        let n = self.issued.entry(type_id.to_string()).or_insert(0);
        *n += 1;
        format!("{}-{}", type_id, n)
    }
}

impl EntityFactory for TemplateFactory {
    fn create_character(&mut self, def: &PartyMemberDef) -> Result<Participant, FactoryError> {
        let template = self.lookup(&def.template)?.clone();
        let id = match &def.id {
            Some(id) => id.clone(),
            None => self.next_id(&def.template),
        };
        let mut participant = template.instantiate(&def.template, &id, &def.name, def.level);
        if !def.rules.is_empty() {
            participant.rules = def.rules.clone();
        }
        tracing::debug!(id = %participant.id, template = %def.template, level = def.level, "created character");
        Ok(participant)
    }

    fn create_enemy(&mut self, enemy_type: &str, name: Option<&str>, level: u32) -> Result<Participant, FactoryError> {
        let template = self.lookup(enemy_type)?.clone();
        let id = self.next_id(enemy_type);
        let name = name.unwrap_or(&template.name);
        let participant = template.instantiate(enemy_type, &id, name, level).as_enemy();
        tracing::debug!(id = %participant.id, %enemy_type, level, "created enemy");
        Ok(participant)
    }
}

fn builtin_templates() -> BTreeMap<String, ParticipantTemplate> {
    let mut templates = BTreeMap::new();

    // === Party ===
    templates.insert(
        "knight".to_string(),
        ParticipantTemplate::new("Knight", "knight", Stats::new(120, 20, 16, 14, 2, 8))
            .abilities(vec![
                Ability::buff("shield_wall", "Shield Wall", &[(StatKind::Def, 6)], 2, 5).with_cooldown(3),
                Ability::attack("power_strike", "Power Strike", 14, 6),
            ])
            .rules(vec![
                Rule::new(50, "self.hp < 30%", "self", "cast:shield_wall"),
                Rule::new(30, "enemy.isBoss", "bossEnemy", "cast:power_strike"),
                Rule::new(10, "always", "weakestEnemy", "attack"),
            ]),
    );
    templates.insert(
        "cleric".to_string(),
        ParticipantTemplate::new("Cleric", "cleric", Stats::new(80, 60, 6, 8, 14, 10))
            .abilities(vec![
                Ability::heal("mend", "Mend", 35, 8),
                Ability::buff("bless", "Bless", &[(StatKind::Str, 4)], 3, 6).with_cooldown(2),
            ])
            .rules(vec![
                Rule::new(80, "ally.hp < 50%", "lowestHpAlly", "cast:mend"),
                Rule::new(40, "turn < 2", "strongestAlly", "cast:bless"),
                Rule::new(10, "always", "randomEnemy", "attack"),
            ]),
    );
    templates.insert(
        "mage".to_string(),
        ParticipantTemplate::new("Mage", "mage", Stats::new(70, 50, 5, 6, 18, 12))
            .abilities(vec![
                Ability::attack("fireball", "Fireball", 28, 10),
                Ability::attack("frost_lance", "Frost Lance", 16, 5),
                Ability::attack("arcane_burst", "Arcane Burst", 45, 20)
                    .with_combinations(&["fireball", "frost_lance"])
                    .with_cooldown(3),
            ])
            .rules(vec![
                Rule::new(60, "enemy.count > 2", "weakestEnemy", "cast:arcane_burst"),
                Rule::new(40, "self.mp > 10", "lowestHpEnemy", "cast:fireball"),
                Rule::new(20, "always", "randomEnemy", "cast:frost_lance"),
            ]),
    );

    // === Enemies ===
    templates.insert(
        "goblin".to_string(),
        ParticipantTemplate::new("Goblin", "goblin warrior", Stats::new(40, 10, 10, 5, 0, 9))
            .abilities(vec![Ability::attack("stab", "Stab", 6, 3)]),
    );
    templates.insert(
        "goblin_shaman".to_string(),
        ParticipantTemplate::new("Goblin Shaman", "goblin healer", Stats::new(35, 30, 5, 4, 10, 7)).abilities(vec![
            Ability::heal("mend", "Mend", 20, 6),
            Ability::debuff("hex", "Hex", &[(StatKind::Def, -3)], 2, 4),
        ]),
    );
    templates.insert(
        "slime".to_string(),
        ParticipantTemplate::new("Slime", "slime", Stats::new(30, 0, 7, 3, 0, 4)),
    );
    templates.insert(
        "orc_guardian".to_string(),
        ParticipantTemplate::new("Orc Guardian", "orc guardian", Stats::new(90, 10, 12, 18, 0, 5))
            .abilities(vec![Ability::buff("brace", "Brace", &[(StatKind::Def, 5)], 2, 4).with_cooldown(2)]),
    );
    templates.insert(
        "dragon".to_string(),
        ParticipantTemplate::new("Ancient Dragon", "dragon", Stats::new(400, 80, 28, 18, 24, 11))
            .abilities(vec![
                Ability::summon("call_whelps", "Call Whelps", "whelp", 2, 1, 15).with_cooldown(4),
                Ability::attack("fire_breath", "Fire Breath", 30, 12),
                Ability::debuff("terrify", "Terrify", &[(StatKind::Str, -5)], 2, 8),
            ])
            .boss(),
    );
    templates.insert(
        "whelp".to_string(),
        ParticipantTemplate::new("Whelp", "whelp fighter", Stats::new(25, 0, 9, 4, 0, 10)),
    );

    templates
}
