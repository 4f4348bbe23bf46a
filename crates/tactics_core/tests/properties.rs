//! Property tests for the battle core.

use std::sync::Arc;

use proptest::prelude::*;
use tactics_core::ability::{damage_amount, AbilityInstance, AbilityTemplate};
use tactics_core::battle::alive_index_from;
use tactics_core::data::{
    AbilityData, DamageClass, TargetAlliance, TargetChoice, TermData, TermKind, UnitStats,
};
use tactics_core::math::{Fixed, Vec2Fixed};
use tactics_core::report::MatchReport;
use tactics_core::rng::RandomStream;
use tactics_core::term::{Term, TermContext, TermEffect, TermState};
use tactics_core::unit::UnitHandle;
use tactics_test_utils::strategies::{
    arb_alive_mask, arb_frame_delta, arb_match_report, arb_position, arb_seed, arb_stat,
};

fn rank(state: TermState) -> u8 {
    match state {
        TermState::SetupComplete => 0,
        TermState::Start => 1,
        TermState::Do => 2,
        TermState::End => 3,
        TermState::Finished => 4,
    }
}

fn physical(base_damage: i32) -> AbilityTemplate {
    AbilityTemplate::from_data(&AbilityData {
        name: "strike".into(),
        damage_class: DamageClass::Physical,
        target_choice: TargetChoice::Predetermined,
        target_alliance: Some(TargetAlliance::Enemy),
        activation_period: Default::default(),
        base_damage,
        unlock_level: 1,
        activations: 1,
        sequence: Vec::new(),
    })
}

fn timed(at_tenths: i32, duration_tenths: i32, kind: TermKind) -> TermData {
    TermData {
        at_time: Fixed::from_num(at_tenths) / 10,
        duration: Fixed::from_num(duration_tenths) / 10,
        kind,
    }
}

proptest! {
    #[test]
    fn rng_replays_from_any_position(seed in arb_seed(), position in arb_position(), len in 1usize..64) {
        let mut a = RandomStream::new(0);
        let mut b = RandomStream::new(seed.wrapping_add(1));
        a.reseed(seed);
        b.reseed(seed);
        a.jump_to_position(position);
        b.jump_to_position(position);
        for _ in 0..len {
            prop_assert_eq!(a.next_u32(), b.next_u32());
            prop_assert_eq!(a.next_int_in_range(-5, 5), b.next_int_in_range(-5, 5));
            prop_assert_eq!(a.next_fixed_zero_to_one(), b.next_fixed_zero_to_one());
        }
        prop_assert_eq!(a.current_position(), position.wrapping_add(3 * len as u32));
    }

    #[test]
    fn term_state_never_regresses(
        at in 0i32..10,
        duration in 0i32..10,
        dt in arb_frame_delta(),
        seed in arb_seed(),
    ) {
        let data = timed(at, duration, TermKind::Damage { damage_percent: 100, damage_modifier: 1 });
        let mut term = Term::prototype(&data).clone_for_cast();
        let mut rng = RandomStream::new(seed);
        let mut effects = Vec::new();
        let mut elapsed = Fixed::ZERO;
        let mut previous = rank(term.state());

        for _ in 0..2500 {
            let ctx = TermContext {
                dt,
                elapsed,
                caster_position: Vec2Fixed::ZERO,
                original_position: Vec2Fixed::ZERO,
                cast_location: Vec2Fixed::ZERO,
            };
            let was_finished = term.is_finished();
            let before = effects.len();
            term.run(&ctx, &mut rng, &mut effects).unwrap();
            let current = rank(term.state());
            prop_assert!(current >= previous);
            if was_finished {
                prop_assert_eq!(effects.len(), before);
                prop_assert!(term.is_finished());
            }
            previous = current;
            elapsed += dt;
        }
        prop_assert!(term.is_finished());
        prop_assert!(effects.iter().all(|e| matches!(e, TermEffect::PercentDamage { .. })), "expected only PercentDamage effects");
    }

    #[test]
    fn ability_finished_iff_all_terms_finished(
        spans in proptest::collection::vec((0i32..6, 0i32..6), 1..6),
        dt in arb_frame_delta(),
    ) {
        let sequence = spans
            .iter()
            .map(|&(at, duration)| timed(at, duration, TermKind::Anim { animation: "a".into() }))
            .collect();
        let template = AbilityTemplate::from_data(&AbilityData {
            name: "combo".into(),
            damage_class: DamageClass::Physical,
            target_choice: TargetChoice::SelfTarget,
            target_alliance: None,
            activation_period: Default::default(),
            base_damage: 0,
            unlock_level: 1,
            activations: 1,
            sequence,
        });
        let mut instance = AbilityInstance::new(
            Arc::new(template),
            UnitHandle(0),
            UnitHandle(0),
            Vec2Fixed::ZERO,
            Vec2Fixed::ZERO,
        );
        let mut rng = RandomStream::new(1);
        let mut events = Vec::new();
        for _ in 0..2500 {
            instance.update(dt, Vec2Fixed::ZERO, &mut rng, &mut events).unwrap();
            let all = instance.terms().iter().all(Term::is_finished);
            prop_assert_eq!(instance.is_finished(), all);
        }
        prop_assert!(instance.is_finished());
    }

    #[test]
    fn physical_damage_is_never_negative(
        strength in arb_stat(),
        constitution in arb_stat(),
        base in 0i32..10,
        percent in 0i32..200,
    ) {
        let caster = UnitStats { strength, ..UnitStats::default() };
        let target = UnitStats { constitution, ..UnitStats::default() };
        let amount = damage_amount(&physical(base), &caster, &target, percent, 1);
        prop_assert!(amount >= 0);
        prop_assert!(amount <= base * strength * percent / 100);
        if constitution >= strength {
            prop_assert_eq!(amount, 0);
        }
    }

    #[test]
    fn report_differing_in_one_field_is_unequal(report in arb_match_report(), field in 0usize..4) {
        let mut other = report;
        match field {
            0 => other.winning_player_id += 1,
            1 => other.losing_player_id += 1,
            2 => other.damage_dealt_to_losing_player += 1,
            _ => other.match_id += 1,
        }
        prop_assert_eq!(report, report);
        prop_assert_ne!(report, other);
        prop_assert_eq!(MatchReport::ignored(report.match_id), other);
        prop_assert_eq!(other, MatchReport::ignored(7));
    }

    #[test]
    fn round_robin_never_picks_the_dead(mask in arb_alive_mask(8), start in 0usize..8) {
        let start = start % mask.len();
        let index = alive_index_from(&mask, start).unwrap();
        prop_assert!(mask[index]);
        let skipped = (index + mask.len() - start) % mask.len();
        for step in 0..skipped {
            prop_assert!(!mask[(start + step) % mask.len()]);
        }
    }
}
