//! Per-action skill progression.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use vigil_core::ActionKind;

const SUCCESS_EXPERIENCE: f64 = 0.30;
const FAILURE_EXPERIENCE: f64 = 0.12;
const THRESHOLD_GROWTH: f64 = 1.25;

/// Level/experience for one action. `experience < threshold` holds between calls.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Competence {
    level: u32,
    experience: f64,
    threshold: f64,
}

impl Default for Competence {
    fn default() -> Self {
        Self {
            level: 1,
            experience: 0.0,
            threshold: 1.0,
        }
    }
}

impl Competence {
    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn experience(&self) -> f64 {
        self.experience
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Adds experience for one execution. Returns true on level-up.
    ///
    /// Overflow is carried into the next level. A single gain never exceeds the starting
    /// threshold, so at most one level is gained per call, but the loop keeps the invariant
    /// even for restored documents with inflated experience.
    pub fn gain(&mut self, success: bool) -> bool {
        self.experience += if success {
            SUCCESS_EXPERIENCE
        } else {
            FAILURE_EXPERIENCE
        };

        let mut leveled = false;
        while self.experience >= self.threshold {
            self.experience -= self.threshold;
            self.level = self.level.saturating_add(1);
            self.threshold *= THRESHOLD_GROWTH;
            leveled = true;
        }
        leveled
    }

    pub fn modifiers(&self) -> SkillModifiers {
        SkillModifiers::for_level(self.level)
    }

    /// Repairs values from an untrusted document.
    pub(crate) fn sanitize(&mut self) {
        self.level = self.level.max(1);
        if !self.threshold.is_finite() || self.threshold <= 0.0 {
            self.threshold = 1.0;
        }
        if !self.experience.is_finite() || self.experience < 0.0 {
            self.experience = 0.0;
        }
        while self.experience >= self.threshold {
            self.experience -= self.threshold;
            self.level = self.level.saturating_add(1);
            self.threshold *= THRESHOLD_GROWTH;
        }
    }
}

/// Multipliers derived from a skill level. Each one is bounded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkillModifiers {
    pub risk_mult: f64,
    pub energy_mult: f64,
    pub reward_mult: f64,
    pub stress_relief: f64,
}

impl SkillModifiers {
    pub fn for_level(level: u32) -> Self {
        let steps = f64::from(level.max(1) - 1);
        Self {
            risk_mult: (1.0 - 0.02 * steps).max(0.75),
            energy_mult: (1.0 - 0.015 * steps).max(0.78),
            reward_mult: (1.0 + 0.02 * steps).min(1.25),
            stress_relief: (0.005 * steps).min(0.08),
        }
    }
}

/// Competence for every action in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompetenceTracker {
    skills: BTreeMap<ActionKind, Competence>,
}

impl Default for CompetenceTracker {
    fn default() -> Self {
        Self {
            skills: ActionKind::ALL
                .into_iter()
                .map(|a| (a, Competence::default()))
                .collect(),
        }
    }
}

impl CompetenceTracker {
    pub fn get(&self, action: ActionKind) -> Competence {
        self.skills.get(&action).copied().unwrap_or_default()
    }

    pub fn level(&self, action: ActionKind) -> u32 {
        self.get(action).level
    }

    pub fn modifiers(&self, action: ActionKind) -> SkillModifiers {
        self.get(action).modifiers()
    }

    pub fn record(&mut self, action: ActionKind, success: bool) -> bool {
        self.skills.entry(action).or_default().gain(success)
    }

    pub fn levels(&self) -> BTreeMap<ActionKind, u32> {
        ActionKind::ALL
            .into_iter()
            .map(|a| (a, self.level(a)))
            .collect()
    }

    pub(crate) fn sanitize(&mut self) {
        for action in ActionKind::ALL {
            self.skills.entry(action).or_default().sanitize();
        }
    }
}
