//! Consolidation scheduler - periodic identity drift and notable-memory pruning.

use vigil_core::{ActionKind, Drive, InternalState};

use crate::state::MemoryStore;

/// Recent actions inspected by a consolidation pass.
const CONSOLIDATION_WINDOW: usize = 80;

/// Result of a consolidation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsolidationReport {
    pub dominant: ActionKind,
    pub avoided: ActionKind,
    pub pruned: usize,
}

impl ConsolidationReport {
    pub fn summary(&self) -> String {
        format!(
            "Dominant: {}, Avoided: {}, Pruned: {}",
            self.dominant, self.avoided, self.pruned
        )
    }
}

/// Runs a consolidation pass every `every` ticks.
#[derive(Debug, Clone, Copy)]
pub struct ConsolidationScheduler {
    every: u64,
}

impl ConsolidationScheduler {
    pub fn new(every: u64) -> Self {
        Self {
            every: every.max(1),
        }
    }

    pub fn every(&self) -> u64 {
        self.every
    }

    pub fn is_due(&self, tick: u64) -> bool {
        tick > 0 && tick % self.every == 0
    }

    /// Consolidate if due. Returns `None` on off-ticks or with an empty history.
    pub fn run(
        &self,
        tick: u64,
        history: &[ActionKind],
        state: &mut InternalState,
        memory: &mut MemoryStore,
    ) -> Option<ConsolidationReport> {
        if !self.is_due(tick) {
            return None;
        }
        let window = &history[history.len().saturating_sub(CONSOLIDATION_WINDOW)..];
        if window.is_empty() {
            return None;
        }

        let mut counts = [0usize; 7];
        for action in window {
            counts[action.index()] += 1;
        }

        // first-wins on ties, in catalog order
        let mut dominant = ActionKind::ALL[0];
        let mut avoided = ActionKind::ALL[0];
        for action in ActionKind::ALL {
            if counts[action.index()] > counts[dominant.index()] {
                dominant = action;
            }
            if counts[action.index()] < counts[avoided.index()] {
                avoided = action;
            }
        }

        if dominant.is_exploratory() {
            state.adjust(Drive::RiskTolerance, 0.015);
            state.adjust(Drive::Curiosity, 0.010);
        }
        if dominant.is_stabilizing() {
            state.adjust(Drive::Stability, 0.012);
            state.adjust(Drive::RiskTolerance, -0.006);
        }
        if avoided.is_exploratory() {
            state.adjust(Drive::Curiosity, -0.008);
        }

        let pruned = memory.prune_notable();
        let report = ConsolidationReport {
            dominant,
            avoided,
            pruned,
        };
        tracing::info!(tick, "consolidation: {}", report.summary());
        Some(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_runs_on_period() {
        let scheduler = ConsolidationScheduler::new(48);
        let history = vec![ActionKind::Rest; 10];
        let mut state = InternalState::default();
        let mut memory = MemoryStore::default();
        assert!(scheduler.run(47, &history, &mut state, &mut memory).is_none());
        assert!(scheduler.run(0, &history, &mut state, &mut memory).is_none());
        let report = scheduler.run(96, &history, &mut state, &mut memory).unwrap();
        assert_eq!(report.dominant, ActionKind::Rest);
        assert_eq!(report.avoided, ActionKind::Organize);
    }

    #[test]
    fn exploratory_dominance_raises_risk_tolerance() {
        let scheduler = ConsolidationScheduler::new(48);
        let history = vec![ActionKind::Explore; 80];
        let mut state = InternalState::default();
        let before = state.risk_tolerance();
        scheduler.run(48, &history, &mut state, &mut MemoryStore::default());
        assert!((state.risk_tolerance() - before - 0.015).abs() < 1e-9);
    }
}
