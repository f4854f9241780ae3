use proptest::prelude::*;
use vigil_core::{DeterministicRng, Drive, InternalState, SplitMix64, WorldDim, WorldState};

proptest! {
    #[test]
    fn world_drift_never_leaves_unit_interval(seed in any::<u64>(), steps in 1usize..600) {
        let mut rng = SplitMix64::new(seed);
        let mut world = WorldState::default();
        for _ in 0..steps {
            world.drift(&mut rng);
            for (_, value) in world.iter() {
                prop_assert!((0.0..=1.0).contains(&value));
            }
        }
    }

    #[test]
    fn arbitrary_adjustments_stay_bounded(
        deltas in proptest::collection::vec((0usize..7, -3.0f64..3.0), 1..200)
    ) {
        let mut state = InternalState::default();
        for (idx, delta) in deltas {
            state.adjust(Drive::ALL[idx], delta);
            for (_, value) in state.iter() {
                prop_assert!((0.0..=1.0).contains(&value));
            }
        }
    }
}

#[test]
fn novelty_wears_off_without_stimulus() {
    let mut rng = SplitMix64::new(11);
    let mut world = WorldState::default();
    let before = world.novelty();
    for _ in 0..50 {
        world.drift(&mut rng);
    }
    assert!(world.novelty() < before);
    assert!(world.get(WorldDim::Novelty) >= 0.0);
    // the generator is still usable afterwards
    let _ = rng.next_f64_unit();
}
