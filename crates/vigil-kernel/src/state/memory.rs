//! Short-term log, per-action long-term statistics, notable memories and routines.

use std::collections::{BTreeMap, VecDeque};

use serde::{Deserialize, Serialize};
use vigil_core::{ActionKind, DayPhase, InternalState};

use crate::kernel::events::RareEventKind;

/// Smoothing factor for the reward/cost moving averages.
pub const EMA_ALPHA: f64 = 0.15;

/// Failures under this much stress put the action on hold.
const AVOID_STRESS: f64 = 0.75;
const AVOID_TICKS: u64 = 40;

/// Severity kept by the consolidation pruning pass.
pub const NOTABLE_KEEP_SEVERITY: f64 = 0.55;

/// Window of notable entries scanned for scoring bias.
const NOTABLE_BIAS_WINDOW: usize = 20;

/// Aggregate for one discrete danger/opportunity context.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ContextStat {
    pub score: f64,
    pub frequency: u32,
    pub notable: u32,
}

/// Long-term statistics for a single action.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionMemory {
    pub n_total: u64,
    pub n_success: u64,
    pub n_fail: u64,
    pub last_tick: u64,
    pub ema_reward: f64,
    pub ema_cost: f64,
    pub fail_streak: u32,
    pub success_streak: u32,
    pub avoid_until: u64,
    #[serde(default)]
    pub contexts: BTreeMap<String, ContextStat>,
}

/// Inputs for one long-term memory update.
#[derive(Debug, Clone, Copy)]
pub struct OutcomeRecord<'a> {
    pub tick: u64,
    pub success: bool,
    pub reward: f64,
    pub cost: f64,
    pub stress: f64,
    pub context: &'a str,
    pub notable: bool,
}

impl ActionMemory {
    pub fn record(&mut self, outcome: OutcomeRecord<'_>) {
        self.n_total += 1;
        self.last_tick = outcome.tick;

        if outcome.success {
            self.n_success += 1;
            self.success_streak += 1;
            self.fail_streak = 0;
        } else {
            self.n_fail += 1;
            self.fail_streak += 1;
            self.success_streak = 0;
            if outcome.stress > AVOID_STRESS {
                self.avoid_until = outcome.tick + AVOID_TICKS;
            }
        }

        self.ema_reward = (1.0 - EMA_ALPHA) * self.ema_reward + EMA_ALPHA * outcome.reward;
        self.ema_cost = (1.0 - EMA_ALPHA) * self.ema_cost + EMA_ALPHA * outcome.cost;

        let stat = self.contexts.entry(outcome.context.to_string()).or_default();
        stat.frequency += 1;
        stat.score = (1.0 - EMA_ALPHA) * stat.score + EMA_ALPHA * (outcome.reward - outcome.cost);
        if outcome.notable {
            stat.notable += 1;
        }
    }

    pub fn is_avoided(&self, tick: u64) -> bool {
        self.avoid_until > tick
    }

    /// Small bias once a context has been seen at least three times.
    pub fn context_bias(&self, context: &str) -> f64 {
        match self.contexts.get(context) {
            Some(stat) if stat.frequency >= 3 => (0.1 * stat.score).clamp(-0.08, 0.08),
            _ => 0.0,
        }
    }

    pub fn fail_rate(&self) -> f64 {
        if self.n_total == 0 {
            0.0
        } else {
            self.n_fail as f64 / self.n_total as f64
        }
    }
}

/// Buckets danger and opportunity into thirds, e.g. `d1o2`.
pub fn context_key(danger: f64, opportunity: f64) -> String {
    fn bucket(x: f64) -> u8 {
        if x < 1.0 / 3.0 {
            0
        } else if x < 2.0 / 3.0 {
            1
        } else {
            2
        }
    }
    format!("d{}o{}", bucket(danger), bucket(opportunity))
}

/// One tick's outcome in the sliding window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShortTermEvent {
    pub tick: u64,
    pub action: ActionKind,
    pub success: bool,
    pub reward: f64,
    pub cost: f64,
    pub stress: f64,
    pub fatigue: f64,
    pub rare_event: Option<RareEventKind>,
}

/// High-salience memory captured when a rare event fires.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotableMemory {
    pub kind: RareEventKind,
    pub severity: f64,
    pub action: ActionKind,
    pub tick: u64,
    pub state: InternalState,
}

fn default_short_term_capacity() -> usize {
    40
}

fn default_notable_capacity() -> usize {
    200
}

/// All memory owned by one engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryStore {
    short_term: VecDeque<ShortTermEvent>,
    long_term: BTreeMap<ActionKind, ActionMemory>,
    notable: VecDeque<NotableMemory>,
    routines: BTreeMap<ActionKind, [u32; 4]>,
    #[serde(default = "default_short_term_capacity")]
    short_term_capacity: usize,
    #[serde(default = "default_notable_capacity")]
    notable_capacity: usize,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::with_capacity(default_short_term_capacity(), default_notable_capacity())
    }
}

impl MemoryStore {
    pub fn with_capacity(short_term_capacity: usize, notable_capacity: usize) -> Self {
        Self {
            short_term: VecDeque::with_capacity(short_term_capacity),
            long_term: ActionKind::ALL
                .into_iter()
                .map(|a| (a, ActionMemory::default()))
                .collect(),
            notable: VecDeque::new(),
            routines: ActionKind::ALL.into_iter().map(|a| (a, [0; 4])).collect(),
            short_term_capacity: short_term_capacity.max(1),
            notable_capacity: notable_capacity.max(1),
        }
    }

    pub fn action(&self, action: ActionKind) -> Option<&ActionMemory> {
        self.long_term.get(&action)
    }

    pub fn action_mut(&mut self, action: ActionKind) -> &mut ActionMemory {
        self.long_term.entry(action).or_default()
    }

    pub fn long_term(&self) -> &BTreeMap<ActionKind, ActionMemory> {
        &self.long_term
    }

    pub fn push_event(&mut self, event: ShortTermEvent) {
        self.short_term.push_back(event);
        while self.short_term.len() > self.short_term_capacity {
            self.short_term.pop_front();
        }
    }

    pub fn short_term(&self) -> &VecDeque<ShortTermEvent> {
        &self.short_term
    }

    /// The last `n` events, oldest first.
    pub fn recent(&self, n: usize) -> impl Iterator<Item = &ShortTermEvent> {
        let skip = self.short_term.len().saturating_sub(n);
        self.short_term.iter().skip(skip)
    }

    pub fn push_notable(&mut self, memory: NotableMemory) {
        self.notable.push_back(memory);
        while self.notable.len() > self.notable_capacity {
            self.notable.pop_front();
        }
    }

    pub fn notable(&self) -> &VecDeque<NotableMemory> {
        &self.notable
    }

    /// Forgets minor notable memories. Returns how many were dropped.
    pub fn prune_notable(&mut self) -> usize {
        let before = self.notable.len();
        self.notable.retain(|m| m.severity >= NOTABLE_KEEP_SEVERITY);
        before - self.notable.len()
    }

    /// Scoring bias from the most recent notable memories involving `action`.
    pub fn notable_bias(&self, action: ActionKind) -> f64 {
        let skip = self.notable.len().saturating_sub(NOTABLE_BIAS_WINDOW);
        self.notable
            .iter()
            .skip(skip)
            .filter(|m| m.action == action)
            .map(|m| {
                if m.kind.is_positive() {
                    0.08 * m.severity
                } else {
                    -0.06 * m.severity
                }
            })
            .sum()
    }

    pub fn bump_routine(&mut self, action: ActionKind, phase: DayPhase) {
        self.routines.entry(action).or_insert([0; 4])[phase.index()] += 1;
    }

    pub fn routine_count(&self, action: ActionKind, phase: DayPhase) -> u32 {
        self.routines
            .get(&action)
            .map(|counts| counts[phase.index()])
            .unwrap_or(0)
    }

    pub fn routine_bonus(&self, action: ActionKind, phase: DayPhase) -> f64 {
        (0.01 * f64::from(self.routine_count(action, phase))).min(0.10)
    }

    pub(crate) fn sanitize(&mut self) {
        self.short_term_capacity = self.short_term_capacity.max(1);
        self.notable_capacity = self.notable_capacity.max(1);
        for action in ActionKind::ALL {
            self.long_term.entry(action).or_default();
            self.routines.entry(action).or_insert([0; 4]);
        }
        while self.short_term.len() > self.short_term_capacity {
            self.short_term.pop_front();
        }
        while self.notable.len() > self.notable_capacity {
            self.notable.pop_front();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(tick: u64, success: bool, stress: f64) -> OutcomeRecord<'static> {
        OutcomeRecord {
            tick,
            success,
            reward: 0.1,
            cost: 0.05,
            stress,
            context: "d1o1",
            notable: false,
        }
    }

    #[test]
    fn stressed_failure_sets_avoidance() {
        let mut mem = ActionMemory::default();
        mem.record(outcome(10, false, 0.80));
        assert_eq!(mem.avoid_until, 50);
        assert!(mem.is_avoided(49));
        assert!(!mem.is_avoided(50));
    }

    #[test]
    fn calm_failure_does_not_avoid() {
        let mut mem = ActionMemory::default();
        mem.record(outcome(10, false, 0.50));
        assert_eq!(mem.avoid_until, 0);
    }

    #[test]
    fn context_keys_bucket_thirds() {
        assert_eq!(context_key(0.0, 0.9), "d0o2");
        assert_eq!(context_key(0.5, 0.5), "d1o1");
        assert_eq!(context_key(1.0, 0.1), "d2o0");
    }

    #[test]
    fn context_bias_needs_three_samples() {
        let mut mem = ActionMemory::default();
        mem.record(outcome(1, true, 0.2));
        mem.record(outcome(2, true, 0.2));
        assert_eq!(mem.context_bias("d1o1"), 0.0);
        mem.record(outcome(3, true, 0.2));
        assert!(mem.context_bias("d1o1") > 0.0);
        assert!(mem.context_bias("d1o1") <= 0.08);
    }

    #[test]
    fn short_term_window_is_bounded() {
        let mut store = MemoryStore::with_capacity(3, 10);
        for tick in 0..5 {
            store.push_event(ShortTermEvent {
                tick,
                action: ActionKind::Idle,
                success: true,
                reward: 0.0,
                cost: 0.0,
                stress: 0.2,
                fatigue: 0.2,
                rare_event: None,
            });
        }
        let ticks: Vec<u64> = store.short_term().iter().map(|e| e.tick).collect();
        assert_eq!(ticks, vec![2, 3, 4]);
        assert_eq!(store.recent(2).count(), 2);
    }

    #[test]
    fn routine_bonus_caps() {
        let mut store = MemoryStore::default();
        for _ in 0..30 {
            store.bump_routine(ActionKind::Rest, DayPhase::Night);
        }
        assert_eq!(store.routine_count(ActionKind::Rest, DayPhase::Night), 30);
        assert_eq!(store.routine_bonus(ActionKind::Rest, DayPhase::Night), 0.10);
        assert_eq!(store.routine_bonus(ActionKind::Rest, DayPhase::Day), 0.0);
    }
}
