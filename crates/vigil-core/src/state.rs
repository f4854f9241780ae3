//! Bounded agent and world state vectors.
//!
//! Fields are private: every write goes through a clamping mutator, so no caller can ever observe
//! a value outside `[0, 1]`.

use crate::rng::DeterministicRng;

#[inline]
fn unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

#[cfg(feature = "serde")]
mod bounded {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<f64, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = f64::deserialize(deserializer)?;
        Ok(super::unit(raw))
    }
}

/// One dimension of [`InternalState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Drive {
    Energy,
    Clarity,
    Stability,
    Curiosity,
    RiskTolerance,
    Fatigue,
    Stress,
}

impl Drive {
    pub const ALL: [Drive; 7] = [
        Drive::Energy,
        Drive::Clarity,
        Drive::Stability,
        Drive::Curiosity,
        Drive::RiskTolerance,
        Drive::Fatigue,
        Drive::Stress,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Drive::Energy => "energy",
            Drive::Clarity => "clarity",
            Drive::Stability => "stability",
            Drive::Curiosity => "curiosity",
            Drive::RiskTolerance => "risk_tolerance",
            Drive::Fatigue => "fatigue",
            Drive::Stress => "stress",
        }
    }
}

/// Agent physiology/psychology, every scalar in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InternalState {
    #[cfg_attr(feature = "serde", serde(deserialize_with = "bounded::deserialize"))]
    energy: f64,
    #[cfg_attr(feature = "serde", serde(deserialize_with = "bounded::deserialize"))]
    clarity: f64,
    #[cfg_attr(feature = "serde", serde(deserialize_with = "bounded::deserialize"))]
    stability: f64,
    #[cfg_attr(feature = "serde", serde(deserialize_with = "bounded::deserialize"))]
    curiosity: f64,
    #[cfg_attr(feature = "serde", serde(deserialize_with = "bounded::deserialize"))]
    risk_tolerance: f64,
    #[cfg_attr(feature = "serde", serde(deserialize_with = "bounded::deserialize"))]
    fatigue: f64,
    #[cfg_attr(feature = "serde", serde(deserialize_with = "bounded::deserialize"))]
    stress: f64,
}

impl Default for InternalState {
    fn default() -> Self {
        Self {
            energy: 0.70,
            clarity: 0.65,
            stability: 0.70,
            curiosity: 0.60,
            risk_tolerance: 0.45,
            fatigue: 0.25,
            stress: 0.25,
        }
    }
}

impl InternalState {
    pub fn get(&self, drive: Drive) -> f64 {
        match drive {
            Drive::Energy => self.energy,
            Drive::Clarity => self.clarity,
            Drive::Stability => self.stability,
            Drive::Curiosity => self.curiosity,
            Drive::RiskTolerance => self.risk_tolerance,
            Drive::Fatigue => self.fatigue,
            Drive::Stress => self.stress,
        }
    }

    fn slot(&mut self, drive: Drive) -> &mut f64 {
        match drive {
            Drive::Energy => &mut self.energy,
            Drive::Clarity => &mut self.clarity,
            Drive::Stability => &mut self.stability,
            Drive::Curiosity => &mut self.curiosity,
            Drive::RiskTolerance => &mut self.risk_tolerance,
            Drive::Fatigue => &mut self.fatigue,
            Drive::Stress => &mut self.stress,
        }
    }

    pub fn set(&mut self, drive: Drive, value: f64) {
        *self.slot(drive) = unit(value);
    }

    pub fn adjust(&mut self, drive: Drive, delta: f64) {
        let slot = self.slot(drive);
        *slot = unit(*slot + delta);
    }

    pub fn energy(&self) -> f64 {
        self.energy
    }

    pub fn clarity(&self) -> f64 {
        self.clarity
    }

    pub fn stability(&self) -> f64 {
        self.stability
    }

    pub fn curiosity(&self) -> f64 {
        self.curiosity
    }

    pub fn risk_tolerance(&self) -> f64 {
        self.risk_tolerance
    }

    pub fn fatigue(&self) -> f64 {
        self.fatigue
    }

    pub fn stress(&self) -> f64 {
        self.stress
    }

    /// Energy below 0.15 or stress above 0.90.
    pub fn is_critical(&self) -> bool {
        self.energy < 0.15 || self.stress > 0.90
    }

    pub fn iter(&self) -> impl Iterator<Item = (Drive, f64)> + '_ {
        Drive::ALL.into_iter().map(move |d| (d, self.get(d)))
    }
}

/// One dimension of [`WorldState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum WorldDim {
    InstabilityNoise,
    Opportunity,
    Danger,
    Novelty,
    GlobalStability,
}

impl WorldDim {
    pub const ALL: [WorldDim; 5] = [
        WorldDim::InstabilityNoise,
        WorldDim::Opportunity,
        WorldDim::Danger,
        WorldDim::Novelty,
        WorldDim::GlobalStability,
    ];

    pub fn name(self) -> &'static str {
        match self {
            WorldDim::InstabilityNoise => "instability_noise",
            WorldDim::Opportunity => "opportunity",
            WorldDim::Danger => "danger",
            WorldDim::Novelty => "novelty",
            WorldDim::GlobalStability => "global_stability",
        }
    }
}

/// Exogenous environment; drifts on its own and is nudged by action outcomes.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WorldState {
    #[cfg_attr(feature = "serde", serde(deserialize_with = "bounded::deserialize"))]
    instability_noise: f64,
    #[cfg_attr(feature = "serde", serde(deserialize_with = "bounded::deserialize"))]
    opportunity: f64,
    #[cfg_attr(feature = "serde", serde(deserialize_with = "bounded::deserialize"))]
    danger: f64,
    #[cfg_attr(feature = "serde", serde(deserialize_with = "bounded::deserialize"))]
    novelty: f64,
    #[cfg_attr(feature = "serde", serde(deserialize_with = "bounded::deserialize"))]
    global_stability: f64,
}

impl Default for WorldState {
    fn default() -> Self {
        Self {
            instability_noise: 0.35,
            opportunity: 0.55,
            danger: 0.30,
            novelty: 0.70,
            global_stability: 0.60,
        }
    }
}

impl WorldState {
    pub fn get(&self, dim: WorldDim) -> f64 {
        match dim {
            WorldDim::InstabilityNoise => self.instability_noise,
            WorldDim::Opportunity => self.opportunity,
            WorldDim::Danger => self.danger,
            WorldDim::Novelty => self.novelty,
            WorldDim::GlobalStability => self.global_stability,
        }
    }

    fn slot(&mut self, dim: WorldDim) -> &mut f64 {
        match dim {
            WorldDim::InstabilityNoise => &mut self.instability_noise,
            WorldDim::Opportunity => &mut self.opportunity,
            WorldDim::Danger => &mut self.danger,
            WorldDim::Novelty => &mut self.novelty,
            WorldDim::GlobalStability => &mut self.global_stability,
        }
    }

    pub fn set(&mut self, dim: WorldDim, value: f64) {
        *self.slot(dim) = unit(value);
    }

    pub fn adjust(&mut self, dim: WorldDim, delta: f64) {
        let slot = self.slot(dim);
        *slot = unit(*slot + delta);
    }

    pub fn instability_noise(&self) -> f64 {
        self.instability_noise
    }

    pub fn opportunity(&self) -> f64 {
        self.opportunity
    }

    pub fn danger(&self) -> f64 {
        self.danger
    }

    pub fn novelty(&self) -> f64 {
        self.novelty
    }

    pub fn global_stability(&self) -> f64 {
        self.global_stability
    }

    /// Autonomous per-tick evolution: small bounded random walk plus weak cross-coupling
    /// (danger follows instability, opportunity shrinks as danger grows, novelty wears off).
    pub fn drift(&mut self, rng: &mut impl DeterministicRng) {
        let shared = rng.jitter(0.015);

        let noise_step = shared + rng.jitter(0.01);
        self.adjust(WorldDim::InstabilityNoise, noise_step);

        let danger_step = 0.25 * self.instability_noise * 0.01 + rng.jitter(0.008);
        self.adjust(WorldDim::Danger, danger_step);

        let opportunity_step = rng.jitter(0.01) + (0.5 - self.danger) * 0.005;
        self.adjust(WorldDim::Opportunity, opportunity_step);

        self.adjust(WorldDim::Novelty, -0.004);

        let stability_step = (0.5 - self.instability_noise) * 0.01 + rng.jitter(0.006);
        self.adjust(WorldDim::GlobalStability, stability_step);
    }

    pub fn iter(&self) -> impl Iterator<Item = (WorldDim, f64)> + '_ {
        WorldDim::ALL.into_iter().map(move |d| (d, self.get(d)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adjust_clamps_both_ends() {
        let mut s = InternalState::default();
        s.adjust(Drive::Energy, 5.0);
        assert_eq!(s.energy(), 1.0);
        s.adjust(Drive::Energy, -9.0);
        assert_eq!(s.energy(), 0.0);
    }

    #[test]
    fn nan_is_treated_as_zero() {
        let mut w = WorldState::default();
        w.set(WorldDim::Danger, f64::NAN);
        assert_eq!(w.danger(), 0.0);
    }

    #[test]
    fn critical_thresholds() {
        let mut s = InternalState::default();
        assert!(!s.is_critical());
        s.set(Drive::Energy, 0.10);
        assert!(s.is_critical());
        s.set(Drive::Energy, 0.5);
        s.set(Drive::Stress, 0.95);
        assert!(s.is_critical());
    }
}
