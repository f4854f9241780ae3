//! Per-simulated-day rollups.

use std::collections::{BTreeMap, VecDeque};

use serde::{Deserialize, Serialize};
use vigil_core::{ActionKind, InternalState};

use super::events::RareEventKind;
use crate::state::NotableMemory;

/// Completed days retained in memory.
const DAY_HISTORY: usize = 60;

/// Running totals for the simulated day in progress.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DayAccumulator {
    pub ticks: u64,
    pub fails: u64,
    pub reward_sum: f64,
    pub actions: BTreeMap<ActionKind, u32>,
    pub events: BTreeMap<RareEventKind, u32>,
}

impl DayAccumulator {
    pub fn observe(&mut self, action: ActionKind, success: bool, reward: f64, event: Option<RareEventKind>) {
        self.ticks += 1;
        if !success {
            self.fails += 1;
        }
        self.reward_sum += reward;
        *self.actions.entry(action).or_default() += 1;
        if let Some(kind) = event {
            *self.events.entry(kind).or_default() += 1;
        }
    }

    pub fn fail_rate(&self) -> f64 {
        if self.ticks == 0 {
            0.0
        } else {
            self.fails as f64 / self.ticks as f64
        }
    }

    pub fn avg_reward(&self) -> f64 {
        if self.ticks == 0 {
            0.0
        } else {
            self.reward_sum / self.ticks as f64
        }
    }

    /// Most frequent actions, count descending, ties in catalog order.
    pub fn top_actions(&self, n: usize) -> Vec<(ActionKind, u32)> {
        let mut ranked: Vec<(ActionKind, u32)> = self
            .actions
            .iter()
            .filter(|(_, count)| **count > 0)
            .map(|(a, c)| (*a, *c))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked.truncate(n);
        ranked
    }

    pub fn top_events(&self, n: usize) -> Vec<(RareEventKind, u32)> {
        let mut ranked: Vec<(RareEventKind, u32)> =
            self.events.iter().map(|(k, c)| (*k, *c)).collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked.truncate(n);
        ranked
    }
}

/// Narrative summary of one simulated day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaySummary {
    pub day_index: u64,
    pub top_actions: Vec<(ActionKind, u32)>,
    pub recent_events: Vec<RareEventKind>,
    pub skills: BTreeMap<ActionKind, u32>,
    pub state: InternalState,
}

/// Numeric rollup of one simulated day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dashboard {
    pub day_index: u64,
    pub ticks: u64,
    pub fail_rate: f64,
    pub avg_reward: f64,
    pub top_actions: Vec<ActionKind>,
    pub top_events: Vec<(RareEventKind, u32)>,
    pub skills: BTreeMap<ActionKind, u32>,
}

/// Detects day rollovers and keeps the recent day journals.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardAggregator {
    last_day_index: u64,
    current: DayAccumulator,
    summaries: VecDeque<DaySummary>,
    dashboards: VecDeque<Dashboard>,
}

impl DashboardAggregator {
    pub fn observe(&mut self, action: ActionKind, success: bool, reward: f64, event: Option<RareEventKind>) {
        self.current.observe(action, success, reward, event);
    }

    pub fn current(&self) -> &DayAccumulator {
        &self.current
    }

    pub fn summaries(&self) -> &VecDeque<DaySummary> {
        &self.summaries
    }

    pub fn dashboards(&self) -> &VecDeque<Dashboard> {
        &self.dashboards
    }

    pub fn last_summary(&self) -> Option<&DaySummary> {
        self.summaries.back()
    }

    pub fn last_dashboard(&self) -> Option<&Dashboard> {
        self.dashboards.back()
    }

    /// Closes the finished day when `day_index` has moved past it.
    pub fn roll_over(
        &mut self,
        day_index: u64,
        skills: BTreeMap<ActionKind, u32>,
        state: &InternalState,
        notable: &VecDeque<NotableMemory>,
    ) -> Option<&Dashboard> {
        if day_index <= self.last_day_index {
            return None;
        }
        let finished = self.last_day_index;
        self.last_day_index = day_index;
        let day = std::mem::take(&mut self.current);

        let recent_events = notable
            .iter()
            .skip(notable.len().saturating_sub(5))
            .map(|m| m.kind)
            .collect();

        self.summaries.push_back(DaySummary {
            day_index: finished,
            top_actions: day.top_actions(3),
            recent_events,
            skills: skills.clone(),
            state: *state,
        });
        self.dashboards.push_back(Dashboard {
            day_index: finished,
            ticks: day.ticks,
            fail_rate: day.fail_rate(),
            avg_reward: day.avg_reward(),
            top_actions: day.top_actions(3).into_iter().map(|(a, _)| a).collect(),
            top_events: day.top_events(3),
            skills,
        });
        while self.summaries.len() > DAY_HISTORY {
            self.summaries.pop_front();
        }
        while self.dashboards.len() > DAY_HISTORY {
            self.dashboards.pop_front();
        }

        let dashboard = self.dashboards.back()?;
        tracing::info!(
            day = dashboard.day_index,
            fail_rate = dashboard.fail_rate,
            avg_reward = dashboard.avg_reward,
            "day summary"
        );
        Some(dashboard)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rollover_closes_previous_day() {
        let mut agg = DashboardAggregator::default();
        agg.observe(ActionKind::Rest, true, 0.05, None);
        agg.observe(ActionKind::Rest, false, 0.0, None);
        agg.observe(ActionKind::Practice, true, 0.2, Some(RareEventKind::Discovery));

        let state = InternalState::default();
        assert!(agg.roll_over(0, BTreeMap::new(), &state, &VecDeque::new()).is_none());

        let dashboard = agg
            .roll_over(1, BTreeMap::new(), &state, &VecDeque::new())
            .unwrap()
            .clone();
        assert_eq!(dashboard.day_index, 0);
        assert_eq!(dashboard.ticks, 3);
        assert!((dashboard.fail_rate - 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(dashboard.top_actions[0], ActionKind::Rest);
        assert_eq!(dashboard.top_events, vec![(RareEventKind::Discovery, 1)]);
        assert_eq!(agg.current().ticks, 0);
    }
}
