#[cfg(test)]
mod tests {
    use crate::battle::engine::BattleSystem;
    use crate::battle::state::BattleEvent;
    use crate::battle::tests::common::{assert_ok, create_test_battle, run_turn, zero_rng, TestParticipantBuilder};
    use crate::collaborators::EntityFactory;
    use crate::factory::TemplateFactory;
    use crate::participant::Participant;
    use pretty_assertions::assert_eq;
    use schema::{Ability, Stats};

    fn hero(id: &str, hp: u32) -> Participant {
        TestParticipantBuilder::new(id, id)
            .with_stats(Stats::new(100, 0, 10, 2, 0, 10))
            .with_hp(hp)
            .with_rule(10, "always", "randomEnemy", "attack")
            .build()
    }

    #[test]
    fn test_goblin_warrior_stabs_the_weakest_hero() {
        let goblin = TestParticipantBuilder::new("goblin", "Goblin")
            .with_stats(Stats::new(40, 10, 10, 5, 0, 30))
            .with_job("goblin warrior")
            .with_ability(Ability::attack("stab", "Stab", 6, 3))
            .enemy()
            .build();
        let mut battle = create_test_battle(vec![hero("tough", 100), hero("hurt", 40)], vec![goblin], zero_rng());

        let turn = run_turn(&mut battle);

        assert_eq!(turn.actor_id, "goblin");
        assert_eq!(turn.action, "cast:stab");
        assert_eq!(turn.target_id.as_deref(), Some("hurt"));
        // 6 base + 0 mag - 2 def
        assert_eq!(turn.damage, Some(4));
        assert_eq!(battle.state().unwrap().get("goblin").map(|p| p.mp()), Some(7));
    }

    #[test]
    fn test_shaman_heals_a_wounded_ally() {
        let shaman = TestParticipantBuilder::new("shaman", "Goblin Shaman")
            .with_stats(Stats::new(35, 30, 5, 4, 10, 30))
            .with_job("goblin healer")
            .with_ability(Ability::heal("mend", "Mend", 20, 6))
            .enemy()
            .build();
        let grunt = TestParticipantBuilder::new("grunt", "Grunt")
            .with_stats(Stats::new(40, 0, 8, 4, 0, 5))
            .with_hp(10)
            .enemy()
            .build();
        let mut battle = create_test_battle(vec![hero("knight", 100)], vec![shaman, grunt], zero_rng());

        let turn = run_turn(&mut battle);

        assert_eq!(turn.action, "cast:mend");
        assert_eq!(turn.target_id.as_deref(), Some("grunt"));
        // 20 base + floor(10 * 0.5)
        assert_eq!(turn.heal, Some(25));
        assert_eq!(battle.state().unwrap().get("grunt").map(|p| p.hp()), Some(35));
    }

    #[test]
    fn test_dragon_summons_whelps_into_the_current_round() {
        let mut factory = TemplateFactory::default();
        let dragon = factory.create_enemy("dragon", None, 1).unwrap();
        let mut battle = BattleSystem::new().with_rng(zero_rng()).with_factory(factory);
        assert_ok(battle.initialize_battle(vec![hero("knight", 100)], vec![dragon]));

        let turn = run_turn(&mut battle);

        assert_eq!(turn.actor_id, "dragon-1");
        assert_eq!(turn.action, "cast:call_whelps");
        assert_eq!(turn.summoned, vec!["whelp-1".to_string(), "whelp-2".to_string()]);
        let state = battle.state().unwrap();
        assert_eq!(state.enemies.len(), 3);
        assert!(state.enemies.iter().all(|e| e.is_enemy));
        assert_eq!(
            state.turn_order_ids(),
            vec!["dragon-1", "knight", "whelp-1", "whelp-2"]
        );
        assert_eq!(state.get("dragon-1").map(|p| p.mp()), Some(65));
        assert_eq!(state.get("dragon-1").and_then(|p| p.cooldown_remaining("call_whelps")), Some(4));
        assert!(battle
            .events()
            .events()
            .iter()
            .any(|e| matches!(e, BattleEvent::Summoned { summoned, .. } if summoned.len() == 2)));

        // The newcomers act before the round ends.
        let actors: Vec<String> = (0..3).map(|_| run_turn(&mut battle).actor_id).collect();
        assert_eq!(actors, vec!["knight", "whelp-1", "whelp-2"]);
        assert_eq!(battle.state().unwrap().turn_number, 2);
    }

    #[test]
    fn test_summon_without_factory_fails_the_turn() {
        let dragon = TestParticipantBuilder::new("dragon", "Dragon")
            .with_stats(Stats::new(300, 50, 20, 10, 10, 30))
            .with_ability(Ability::summon("call", "Call Whelps", "whelp", 2, 1, 15))
            .boss()
            .build();
        let mut battle = create_test_battle(vec![hero("knight", 100)], vec![dragon], zero_rng());

        let turn = run_turn(&mut battle);

        assert!(!turn.success);
        assert!(turn.summoned.is_empty());
        assert_eq!(battle.state().unwrap().enemies.len(), 1);
        assert!(!battle.is_complete());
    }
}
