//! Scoring engine - one scalar per candidate action.

use std::collections::BTreeMap;

use vigil_core::{ActionCatalog, ActionKind, DayPhase, InternalState, WorldState};

use super::gating::anti_loop_penalty;
use super::meta::MetaFactors;
use crate::goals::Objective;
use crate::state::{CompetenceTracker, MemoryStore};

/// Half-width of the uniform tie-breaking noise.
pub const SCORE_NOISE: f64 = 0.05;

const RECENCY_HORIZON: f64 = 50.0;
const RECENCY_MAX: f64 = 0.20;

/// Everything the score of one action depends on, borrowed for one decision.
pub struct ScoringContext<'a> {
    pub tick: u64,
    pub phase: DayPhase,
    pub state: &'a InternalState,
    pub world: &'a WorldState,
    pub catalog: &'a ActionCatalog,
    pub competence: &'a CompetenceTracker,
    pub memory: &'a MemoryStore,
    pub objectives: &'a [Objective],
    pub meta: &'a MetaFactors,
    pub history: &'a [ActionKind],
    pub last_action_tick: &'a BTreeMap<ActionKind, u64>,
    pub context_key: &'a str,
}

/// Score terms kept apart for auditing and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScoreBreakdown {
    pub reward: f64,
    pub cost: f64,
    pub objectives: f64,
    pub memory: f64,
    pub recency: f64,
    pub risk_penalty: f64,
    pub situational: f64,
    pub routine: f64,
    pub notable: f64,
    pub context: f64,
    pub anti_loop: f64,
}

impl ScoreBreakdown {
    /// Sum of every term, noise excluded.
    pub fn total(&self) -> f64 {
        self.reward - self.cost + self.objectives + self.memory + self.recency
            - self.risk_penalty
            + self.situational
            + self.routine
            + self.notable
            + self.context
            - self.anti_loop
    }
}

impl ScoringContext<'_> {
    pub fn breakdown(&self, action: ActionKind) -> ScoreBreakdown {
        let profile = self.catalog.profile(action);
        let mods = self.competence.modifiers(action);
        let s = self.state;

        let reward = profile.raw_reward() * mods.reward_mult + 0.03 * self.world.opportunity();
        let cost = profile.energy_cost * mods.energy_mult
            + profile.clarity_cost
            + 0.6 * profile.fatigue_gain;

        let objectives = self
            .objectives
            .iter()
            .map(|o| o.priority() * o.affinity(action))
            .sum();

        let (memory, context) = match self.memory.action(action) {
            Some(m) => (
                0.60 * m.ema_reward - 0.60 * m.ema_cost - 0.80 * f64::from(m.fail_streak)
                    + 0.25 * f64::from(m.success_streak),
                m.context_bias(self.context_key),
            ),
            None => (0.0, 0.0),
        };

        let last = self.last_action_tick.get(&action).copied().unwrap_or(0);
        let gap = (self.tick.saturating_sub(last) as f64 / RECENCY_HORIZON).min(1.0);
        let recency = RECENCY_MAX * gap * self.meta.diversity;

        let risk = profile.base_risk * mods.risk_mult + s.stress() * 0.25 - s.stability() * 0.15
            + self.world.danger() * 0.15;
        let risk_penalty = (1.0 - s.risk_tolerance()) * 0.60 * risk / self.meta.audacity.max(0.01);

        let mut situational = 0.0;
        if action == ActionKind::Explore {
            if s.stability() < 0.30 {
                situational -= 0.20;
            }
            if s.stress() > 0.85 {
                situational -= 0.30;
            }
        }

        ScoreBreakdown {
            reward,
            cost,
            objectives,
            memory,
            recency,
            risk_penalty,
            situational,
            routine: self.memory.routine_bonus(action, self.phase),
            notable: self.memory.notable_bias(action),
            context,
            anti_loop: anti_loop_penalty(self.history, action),
        }
    }

    /// Deterministic part of the score.
    pub fn score(&self, action: ActionKind) -> f64 {
        self.breakdown(action).total()
    }
}
