use proptest::prelude::*;
use vigil_core::{ActionKind, Drive, SIM_MINUTES_PER_TICK};
use vigil_kernel::config::PolicyConfig;
use vigil_kernel::goals::Objective;
use vigil_kernel::kernel::events::RareEventKind;
use vigil_kernel::kernel::FixedWallClock;
use vigil_kernel::state::{ActionMemory, OutcomeRecord};
use vigil_kernel::{Engine, EngineError};

fn engine(seed: u64) -> Engine {
    Engine::seeded(seed).with_wall_clock(FixedWallClock(12))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn every_scalar_stays_in_unit_interval(seed in any::<u64>(), ticks in 1usize..200) {
        let mut engine = engine(seed);
        for _ in 0..ticks {
            engine.life_cycle_step().unwrap();
            for (_, value) in engine.internal().iter() {
                prop_assert!((0.0..=1.0).contains(&value));
            }
            for (_, value) in engine.world().iter() {
                prop_assert!((0.0..=1.0).contains(&value));
            }
        }
    }

    #[test]
    fn time_advances_by_a_fixed_step(seed in any::<u64>(), ticks in 1u64..100) {
        let mut engine = engine(seed);
        for expected in 1..=ticks {
            let report = engine.life_cycle_step().unwrap();
            prop_assert_eq!(report.tick, expected);
            prop_assert!((report.sim_minutes - expected as f64 * SIM_MINUTES_PER_TICK).abs() < 1e-9);
        }
    }
}

#[test]
fn same_seed_replays_the_same_life() {
    let mut a = engine(42);
    let mut b = engine(42);
    for _ in 0..120 {
        let ra = a.life_cycle_step().unwrap();
        let rb = b.life_cycle_step().unwrap();
        assert_eq!(ra.action, rb.action);
        assert_eq!(ra.success, rb.success);
        assert_eq!(ra.rare_event, rb.rare_event);
    }
    assert_eq!(a.internal(), b.internal());
}

#[test]
fn low_energy_only_allows_safe_actions() {
    let mut engine = engine(7);
    for _ in 0..50 {
        engine.internal_mut().set(Drive::Energy, 0.10);
        let report = engine.life_cycle_step().unwrap();
        assert!(report.candidates.iter().all(|a| a.is_low_energy_safe()));
        assert!(matches!(
            report.action,
            ActionKind::Rest | ActionKind::Idle | ActionKind::Reflect
        ));
    }
}

#[test]
fn rest_is_chosen_when_it_is_the_only_safe_candidate() {
    let mut engine = engine(3);
    engine.internal_mut().set(Drive::Energy, 0.10);
    engine.set_cooldown(ActionKind::Idle, 1_000);
    engine.set_cooldown(ActionKind::Reflect, 1_000);

    let report = engine.life_cycle_step().unwrap();
    assert_eq!(report.candidates, vec![ActionKind::Rest]);
    assert_eq!(report.action, ActionKind::Rest);
}

#[test]
fn streaks_reset_on_the_opposite_outcome() {
    let mut memory = ActionMemory::default();
    let outcome = |tick, success| OutcomeRecord {
        tick,
        success,
        reward: 0.1,
        cost: 0.05,
        stress: 0.2,
        context: "d0o1",
        notable: false,
    };

    memory.record(outcome(1, false));
    memory.record(outcome(2, false));
    assert_eq!(memory.fail_streak, 2);

    memory.record(outcome(3, true));
    assert_eq!(memory.fail_streak, 0);
    assert_eq!(memory.success_streak, 1);

    memory.record(outcome(4, false));
    assert_eq!(memory.success_streak, 0);
    assert_eq!(memory.fail_streak, 1);
}

#[test]
fn failing_under_stress_is_avoided_for_a_while() {
    let mut memory = ActionMemory::default();
    memory.record(OutcomeRecord {
        tick: 10,
        success: false,
        reward: 0.0,
        cost: 0.2,
        stress: 0.9,
        context: "d1o0",
        notable: false,
    });
    assert!(memory.is_avoided(49));
    assert!(!memory.is_avoided(50));
}

#[test]
fn repeated_actions_are_penalized_and_cooled_down() {
    let mut engine = engine(5);
    engine.life_cycle_step().unwrap();
    engine
        .action_history_mut()
        .extend(std::iter::repeat(ActionKind::Practice).take(30));

    assert!(engine.anti_loop_penalty(ActionKind::Practice) >= 0.30);
    assert_eq!(engine.anti_loop_penalty(ActionKind::Rest), 0.0);

    let until = engine.enforce_anti_loop().unwrap();
    assert!(until > engine.tick());
    assert_eq!(engine.cooldowns().get(&ActionKind::Practice), Some(&until));
    assert!(!engine.gated_candidates().contains(&ActionKind::Practice));
}

#[test]
fn consolidation_runs_on_schedule_and_prunes_weak_memories() {
    let mut engine = engine(11);
    for _ in 0..96 {
        let report = engine.life_cycle_step().unwrap();
        if report.tick % 48 == 0 {
            assert!(report.consolidation.is_some());
            assert!(engine
                .memory()
                .notable()
                .iter()
                .all(|m| m.severity >= 0.55));
        } else {
            assert!(report.consolidation.is_none());
        }
    }
}

#[test]
fn a_simulated_day_produces_a_dashboard() {
    let mut engine = engine(21);
    for _ in 0..290 {
        engine.life_cycle_step().unwrap();
    }
    let dashboards = engine.dashboard().dashboards();
    assert!(!dashboards.is_empty());
    let first = &dashboards[0];
    assert_eq!(first.day_index, 0);
    assert!((0.0..=1.0).contains(&first.fail_rate));
    assert!(!first.top_actions.is_empty());
    assert!(engine.dashboard().last_summary().is_some());
}

#[test]
fn disallowed_capability_is_denied_and_audited() {
    let mut engine = engine(1);
    assert!(!engine.request("network"));
    assert!(!engine.request("teleport"));
    assert!(engine.request("simulate"));

    let denials = engine.permissions().denials();
    assert_eq!(denials.len(), 2);
    assert_eq!(denials[0].capability, "network");
}

#[test]
fn policy_violation_aborts_the_step() {
    let mut engine = engine(1);
    engine.life_cycle_step().unwrap();
    engine.policy_mut().set_config(PolicyConfig {
        offline_strict: true,
        external_api_allowed: true,
    });

    let err = engine.life_cycle_step().unwrap_err();
    assert!(matches!(err, EngineError::PolicyViolation(_)));
    assert_eq!(engine.tick(), 1);
}

#[test]
fn non_loopback_backend_violates_offline_policy() {
    let mut engine = engine(1);
    engine.policy_mut().set_primary_endpoint("http://10.1.2.3:1234");
    assert!(matches!(
        engine.life_cycle_step(),
        Err(EngineError::PolicyViolation(_))
    ));
}

#[test]
fn propose_does_not_mutate() {
    let mut engine = engine(9);
    for _ in 0..10 {
        engine.life_cycle_step().unwrap();
    }
    let before = engine.to_document();
    let first = engine.propose();
    let second = engine.propose();
    assert_eq!(first, second);
    assert_eq!(engine.to_document(), before);
    assert!(first.candidates.contains(&first.action));
}

#[test]
fn decision_journal_records_every_tick() {
    let mut engine = engine(17);
    for _ in 0..12 {
        engine.life_cycle_step().unwrap();
    }
    assert_eq!(engine.journal().decisions().len(), 12);
    assert_eq!(engine.journal().human().len(), 12);
    let last = engine.journal().last_decision().unwrap();
    assert_eq!(last.tick, 12);
    assert_eq!(last.scores.len(), last.candidates.len());
    assert!(last.candidates.contains(&last.chosen));
}

#[test]
fn suggestions_follow_the_intention() {
    let mut engine = engine(2);
    assert!(engine.suggest(ActionKind::Challenge));

    engine.set_intention(Objective::Recover);
    assert!(engine.suggest(ActionKind::Rest));
    assert!(!engine.suggest(ActionKind::Challenge));
}

#[test]
fn severe_events_drop_the_active_intention() {
    let mut severe = 0;
    for seed in 0..4 {
        let mut engine = engine(seed);
        for _ in 0..500 {
            engine.set_intention(Objective::Progress);
            let report = engine.life_cycle_step().unwrap();
            if report.rare_event.is_some_and(RareEventKind::is_severe) {
                severe += 1;
                assert!(engine.intention().is_none(), "tick {}", report.tick);
            } else {
                assert!(engine.intention().is_some(), "tick {}", report.tick);
            }
        }
    }
    assert!(severe > 0);
}

#[test]
fn strong_ideas_are_adopted_as_intentions() {
    let adopted = (0..4)
        .map(|seed| {
            let mut engine = engine(seed);
            (0..1500)
                .filter(|_| {
                    engine.life_cycle_step().unwrap();
                    engine
                        .intention()
                        .is_some_and(|i| i.label.starts_with("test idea: "))
                })
                .count()
        })
        .sum::<usize>();
    assert!(adopted > 0);
}
