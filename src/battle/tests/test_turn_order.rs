#[cfg(test)]
mod tests {
    use crate::battle::rng::BattleRng;
    use crate::battle::state::BattleEvent;
    use crate::battle::tests::common::{create_test_battle, run_turn, zero_rng, TestParticipantBuilder};
    use crate::participant::Participant;
    use pretty_assertions::assert_eq;
    use schema::Stats;

    fn fighter(id: &str, speed: u32) -> Participant {
        TestParticipantBuilder::new(id, id)
            .with_speed(speed)
            .with_rule(10, "always", "weakestEnemy", "attack")
            .build()
    }

    fn monster(id: &str, speed: u32) -> Participant {
        TestParticipantBuilder::new(id, id)
            .with_stats(Stats::new(100, 0, 10, 10, 0, speed))
            .enemy()
            .build()
    }

    #[test]
    fn test_initial_order_is_speed_descending_with_allies_first_on_ties() {
        let battle = create_test_battle(
            vec![fighter("a", 10), fighter("b", 15)],
            vec![monster("x", 15), monster("y", 5)],
            zero_rng(),
        );
        let state = battle.state().unwrap();

        assert_eq!(state.turn_order_ids(), vec!["b", "x", "a", "y"]);
        assert_eq!(state.turn_number, 1);
        assert_eq!(
            battle.events().events()[..2].to_vec(),
            vec![
                BattleEvent::RoundStarted { turn_number: 1 },
                BattleEvent::TurnOrderComputed {
                    order: vec!["b".into(), "x".into(), "a".into(), "y".into()],
                },
            ]
        );
    }

    #[test]
    fn test_initiative_jitter_can_reorder() {
        // Initiative draws go allies first: a = 10 + 9, e = 12 + 0.
        let battle = create_test_battle(vec![fighter("a", 10)], vec![monster("e", 12)], BattleRng::new_for_test(vec![9, 0]));

        assert_eq!(battle.state().unwrap().turn_order_ids(), vec!["a", "e"]);
    }

    #[test]
    fn test_defeated_participant_is_skipped() {
        let slayer = TestParticipantBuilder::new("slayer", "Slayer")
            .with_stats(Stats::new(100, 0, 50, 10, 0, 30))
            .with_rule(10, "always", "weakestEnemy", "attack")
            .build();
        let fragile = TestParticipantBuilder::new("fragile", "Fragile")
            .with_stats(Stats::new(100, 0, 10, 10, 0, 20))
            .with_hp(1)
            .enemy()
            .build();
        let mut battle = create_test_battle(vec![slayer], vec![fragile, monster("steady", 10)], zero_rng());
        assert_eq!(battle.state().unwrap().turn_order_ids(), vec!["slayer", "fragile", "steady"]);

        let opening = run_turn(&mut battle);
        let next = run_turn(&mut battle);

        assert_eq!(opening.target_id.as_deref(), Some("fragile"));
        assert_eq!(opening.target_hp_after, Some(0));
        assert_eq!(next.actor_id, "steady");
        let state = battle.state().unwrap();
        // Dead but still present.
        assert_eq!(state.enemies.len(), 2);
        assert!(!state.is_alive("fragile"));
        assert!(battle
            .events()
            .events()
            .iter()
            .any(|e| matches!(e, BattleEvent::ParticipantDefeated { id, .. } if id == "fragile")));

        // The next round is scheduled without the fallen.
        run_turn(&mut battle);
        assert_eq!(battle.state().unwrap().turn_order_ids(), vec!["slayer", "steady"]);
    }

    #[test]
    fn test_round_wraps_after_every_living_actor_has_gone() {
        let mut battle = create_test_battle(vec![fighter("a", 20)], vec![monster("e", 10)], zero_rng());

        run_turn(&mut battle);
        assert_eq!(battle.state().unwrap().turn_number, 1);
        run_turn(&mut battle);

        let state = battle.state().unwrap();
        assert_eq!(state.turn_number, 2);
        assert_eq!(state.current_turn_index, 0);
        assert_eq!(state.history.len(), 2);
        assert_eq!(battle.get_current_actor().as_deref(), Some("a"));
    }

    #[test]
    fn test_no_actor_once_the_battle_is_over() {
        let mut battle = create_test_battle(
            vec![TestParticipantBuilder::new("titan", "Titan")
                .with_stats(Stats::new(100, 0, 500, 10, 0, 30))
                .build()],
            vec![monster("e", 10)],
            zero_rng(),
        );

        let turn = run_turn(&mut battle);

        assert_eq!(turn.target_hp_after, Some(0));
        assert!(battle.is_complete());
        assert_eq!(battle.get_current_actor(), None);
    }
}
