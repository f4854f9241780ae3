//! Action execution, world effects, and passive recovery.

use vigil_core::{
    ActionKind, ActionProfile, DayPhase, DeterministicRng, Drive, InternalState, WallPhase,
    WorldDim, WorldState,
};

use crate::state::SkillModifiers;

/// Result of executing one action.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActionOutcome {
    pub success: bool,
    pub reward: f64,
    pub cost: f64,
    pub effective_risk: f64,
}

/// Execution risk, clamped to `[0, 1]`.
pub fn effective_risk(
    profile: &ActionProfile,
    mods: &SkillModifiers,
    state: &InternalState,
    world: &WorldState,
) -> f64 {
    (profile.base_risk * mods.risk_mult + state.stress() * 0.20 - state.stability() * 0.10
        + world.danger() * 0.20
        + world.instability_noise() * 0.10)
        .clamp(0.0, 1.0)
}

/// Simulates the action and applies its effect on the internal state.
pub fn execute(
    profile: &ActionProfile,
    mods: &SkillModifiers,
    state: &mut InternalState,
    world: &WorldState,
    rng: &mut impl DeterministicRng,
) -> ActionOutcome {
    let risk = effective_risk(profile, mods, state, world);
    let success = rng.next_f64_unit() > risk;

    state.adjust(Drive::Energy, -profile.energy_cost * mods.energy_mult);
    state.adjust(Drive::Clarity, -profile.clarity_cost);
    state.adjust(
        Drive::Stability,
        profile.stability_gain * if success { 1.0 } else { 0.4 },
    );
    state.adjust(
        Drive::Curiosity,
        profile.knowledge_gain * 0.05 + world.novelty() * 0.02,
    );
    state.adjust(Drive::Fatigue, profile.fatigue_gain);

    let reward = if success {
        state.adjust(Drive::Stress, -(0.02 + mods.stress_relief));
        profile.raw_reward() * mods.reward_mult
    } else {
        state.adjust(
            Drive::Stress,
            profile.stress_on_fail + world.danger() * 0.05,
        );
        profile.raw_reward() * 0.25
    };

    let cost = profile.energy_cost * mods.energy_mult
        + profile.clarity_cost
        + profile.fatigue_gain * 0.6;

    ActionOutcome {
        success,
        reward,
        cost,
        effective_risk: risk,
    }
}

/// Durable effect of an action on the world. Failures apply half the gain.
pub fn apply_world_effect(action: ActionKind, success: bool, world: &mut WorldState) {
    let gain = if success { 1.0 } else { 0.5 };
    match action {
        ActionKind::Organize => {
            world.adjust(WorldDim::GlobalStability, 0.030 * gain);
            world.adjust(WorldDim::InstabilityNoise, -0.025 * gain);
            world.adjust(WorldDim::Danger, -0.010 * gain);
        }
        ActionKind::Explore => {
            world.adjust(WorldDim::Novelty, 0.060 * gain);
            world.adjust(WorldDim::Opportunity, 0.030 * gain);
            world.adjust(WorldDim::InstabilityNoise, 0.015 * (2.0 - gain));
        }
        ActionKind::Challenge => {
            world.adjust(WorldDim::Opportunity, 0.045 * gain);
            world.adjust(WorldDim::Danger, 0.030 * (2.0 - gain));
        }
        ActionKind::Reflect => {
            world.adjust(WorldDim::GlobalStability, 0.018 * gain);
            world.adjust(WorldDim::InstabilityNoise, -0.012 * gain);
        }
        ActionKind::Idle => world.adjust(WorldDim::Novelty, -0.010),
        ActionKind::Rest | ActionKind::Practice => {}
    }
}

/// Per-tick recovery, stronger during the simulated night and nudged by the wall clock.
pub fn passive_recovery(state: &mut InternalState, phase: DayPhase, wall: WallPhase) {
    let (energy, clarity, fatigue, stress) = match phase {
        DayPhase::Night => (0.030, 0.020, -0.025, -0.012),
        _ => (0.012, 0.008, -0.010, -0.006),
    };
    let boost = wall.recovery_boost();
    state.adjust(Drive::Energy, energy * boost);
    state.adjust(Drive::Clarity, clarity * boost);
    state.adjust(Drive::Fatigue, fatigue * boost);
    state.adjust(Drive::Stress, stress * boost);
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_core::{ActionCatalog, SplitMix64};

    #[test]
    fn failure_raises_stress_and_discounts_reward() {
        let catalog = ActionCatalog::standard();
        let profile = catalog.profile(ActionKind::Challenge);
        let mods = SkillModifiers::for_level(1);
        let mut world = WorldState::default();
        world.set(WorldDim::Danger, 1.0);
        world.set(WorldDim::InstabilityNoise, 1.0);
        let mut state = InternalState::default();
        state.set(Drive::Stress, 1.0);
        state.set(Drive::Stability, 0.0);

        let outcome = execute(profile, &mods, &mut state, &world, &mut SplitMix64::new(5));
        assert!((outcome.effective_risk - 0.85).abs() < 1e-9);
        if !outcome.success {
            assert!((outcome.reward - 0.25 * profile.raw_reward()).abs() < 1e-12);
        }
    }

    #[test]
    fn night_recovery_is_larger() {
        let mut day = InternalState::default();
        let mut night = InternalState::default();
        passive_recovery(&mut day, DayPhase::Day, WallPhase::Day);
        passive_recovery(&mut night, DayPhase::Night, WallPhase::Day);
        assert!(night.energy() > day.energy());
        assert!(night.fatigue() < day.fatigue());
    }

    #[test]
    fn wall_night_boosts_by_ten_percent() {
        let mut plain = InternalState::default();
        let mut boosted = InternalState::default();
        passive_recovery(&mut plain, DayPhase::Day, WallPhase::Day);
        passive_recovery(&mut boosted, DayPhase::Day, WallPhase::Night);
        let base = InternalState::default().energy();
        let ratio = (boosted.energy() - base) / (plain.energy() - base);
        assert!((ratio - 1.10).abs() < 1e-9);
    }

    #[test]
    fn organize_calms_the_world() {
        let mut world = WorldState::default();
        let before = world;
        apply_world_effect(ActionKind::Organize, true, &mut world);
        assert!(world.global_stability() > before.global_stability());
        assert!(world.instability_noise() < before.instability_noise());
    }
}
