use rule_battle::{
    BattleConfig, BattleEnemyDef, BattleSystem, EntityFactory, PartyMemberDef, RewardTable, TemplateFactory,
    TracingLogger,
};
use std::error::Error;

const CONFIG_ENV: &str = "RULE_BATTLE_CONFIG";

fn party() -> Vec<PartyMemberDef> {
    [("Aldric", "knight"), ("Sera", "cleric"), ("Myra", "mage")]
        .into_iter()
        .map(|(name, template)| PartyMemberDef {
            id: None,
            name: name.to_string(),
            template: template.to_string(),
            level: 3,
            rules: Vec::new(),
        })
        .collect()
}

fn encounter() -> Vec<BattleEnemyDef> {
    vec![
        BattleEnemyDef {
            enemy_type: "goblin".to_string(),
            name: None,
            level: 2,
            count: 2,
        },
        BattleEnemyDef {
            enemy_type: "goblin_shaman".to_string(),
            name: None,
            level: 2,
            count: 1,
        },
        BattleEnemyDef {
            enemy_type: "orc_guardian".to_string(),
            name: Some("Gruk".to_string()),
            level: 1,
            count: 1,
        },
    ]
}

fn load_config() -> Result<BattleConfig, Box<dyn Error>> {
    match std::env::var(CONFIG_ENV) {
        Ok(path) => {
            tracing::info!(%path, "loading battle config");
            Ok(BattleConfig::load(path)?)
        }
        Err(_) => Ok(BattleConfig::default()),
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let config = load_config()?;
    let mut factory = TemplateFactory::default();
    let allies = party()
        .iter()
        .map(|def| factory.create_character(def))
        .collect::<Result<Vec<_>, _>>()?;
    let enemies = factory.create_enemies_from_battle(&encounter())?;

    let mut battle = BattleSystem::new()
        .with_config(config)
        .with_factory(factory)
        .with_loot(RewardTable::default())
        .with_logger(TracingLogger);
    battle.initialize_battle(allies, enemies)?;

    let outcome = battle.simulate_full_battle(None);
    tracing::info!(victory = outcome.victory, reason = %outcome.reason, turns = outcome.turns_executed, "simulation finished");

    for event in battle.events().events() {
        println!("{}", event);
    }
    let report = battle.get_battle_result()?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
