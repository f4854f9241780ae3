//! Rare stochastic events.

use std::fmt;

use serde::{Deserialize, Serialize};
use vigil_core::{DeterministicRng, Drive, InternalState, WorldDim, WorldState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RareEventKind {
    Discovery,
    NearFailure,
    SuccessMajor,
    StressSpike,
    OpportunityExceptional,
}

impl RareEventKind {
    pub const ALL: [RareEventKind; 5] = [
        RareEventKind::Discovery,
        RareEventKind::NearFailure,
        RareEventKind::SuccessMajor,
        RareEventKind::StressSpike,
        RareEventKind::OpportunityExceptional,
    ];

    pub fn name(self) -> &'static str {
        match self {
            RareEventKind::Discovery => "discovery",
            RareEventKind::NearFailure => "near_failure",
            RareEventKind::SuccessMajor => "success_major",
            RareEventKind::StressSpike => "stress_spike",
            RareEventKind::OpportunityExceptional => "opportunity_exceptional",
        }
    }

    pub fn is_positive(self) -> bool {
        !matches!(self, RareEventKind::NearFailure | RareEventKind::StressSpike)
    }

    /// Severe events invalidate the active intention at the end of the tick.
    pub fn is_severe(self) -> bool {
        matches!(
            self,
            RareEventKind::NearFailure | RareEventKind::StressSpike | RareEventKind::SuccessMajor
        )
    }
}

impl fmt::Display for RareEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// `"none"` for ticks without an event.
pub fn event_name(kind: Option<RareEventKind>) -> &'static str {
    kind.map(RareEventKind::name).unwrap_or("none")
}

/// A triggered event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RareEvent {
    pub kind: RareEventKind,
    pub severity: f64,
}

/// Trigger probability for the current instability.
pub fn trigger_probability(instability: f64) -> f64 {
    (0.03 + 0.08 * instability).min(0.25)
}

/// Rolls for an event this tick.
pub fn roll(world: &WorldState, rng: &mut impl DeterministicRng) -> Option<RareEvent> {
    let p = trigger_probability(world.instability_noise());
    if rng.next_f64_unit() >= p {
        return None;
    }
    let kind = RareEventKind::ALL[rng.below(RareEventKind::ALL.len())];
    let severity = rng.uniform(0.45, 1.0);
    Some(RareEvent { kind, severity })
}

/// Applies the event's immediate deltas.
pub fn apply(event: RareEvent, state: &mut InternalState, world: &mut WorldState) {
    let sev = event.severity;
    match event.kind {
        RareEventKind::Discovery => {
            state.adjust(Drive::Curiosity, 0.12 * sev);
            state.adjust(Drive::Stability, 0.04 * sev);
        }
        RareEventKind::NearFailure => {
            state.adjust(Drive::Stress, 0.14 * sev);
            state.adjust(Drive::Stability, -0.07 * sev);
        }
        RareEventKind::SuccessMajor => {
            state.adjust(Drive::Stress, -0.08 * sev);
            state.adjust(Drive::RiskTolerance, 0.05 * sev);
            state.adjust(Drive::Stability, 0.06 * sev);
        }
        RareEventKind::StressSpike => {
            state.adjust(Drive::Stress, 0.18 * sev);
            state.adjust(Drive::Clarity, -0.06 * sev);
        }
        RareEventKind::OpportunityExceptional => {
            state.adjust(Drive::Curiosity, 0.10 * sev);
            world.adjust(WorldDim::Opportunity, 0.12 * sev);
        }
    }
}

/// Lingering shift applied after the notable memory has been captured.
pub fn aftermath(event: RareEvent, state: &mut InternalState) {
    let sev = event.severity;
    if event.kind.is_positive() {
        state.adjust(Drive::RiskTolerance, 0.02 * sev);
    } else {
        state.adjust(Drive::RiskTolerance, -0.03 * sev);
    }
    match event.kind {
        RareEventKind::Discovery | RareEventKind::OpportunityExceptional => {
            state.adjust(Drive::Curiosity, 0.01 * sev)
        }
        _ => state.adjust(Drive::Curiosity, -0.005 * sev),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_core::SplitMix64;

    #[test]
    fn probability_is_capped() {
        assert!((trigger_probability(0.0) - 0.03).abs() < 1e-12);
        assert_eq!(trigger_probability(5.0), 0.25);
    }

    #[test]
    fn rolls_respect_severity_range() {
        let mut rng = SplitMix64::new(11);
        let mut world = WorldState::default();
        world.set(WorldDim::InstabilityNoise, 1.0);
        let mut fired = 0;
        for _ in 0..2_000 {
            if let Some(event) = roll(&world, &mut rng) {
                fired += 1;
                assert!((0.45..1.0).contains(&event.severity));
            }
        }
        assert!(fired > 100);
    }

    #[test]
    fn stress_spike_raises_stress() {
        let mut state = InternalState::default();
        let mut world = WorldState::default();
        let event = RareEvent {
            kind: RareEventKind::StressSpike,
            severity: 1.0,
        };
        apply(event, &mut state, &mut world);
        assert!((state.stress() - 0.43).abs() < 1e-9);
        assert!((state.clarity() - 0.59).abs() < 1e-9);
    }
}
