//! Meta-learning: slow self-tuning of the scoring multipliers.

use serde::{Deserialize, Serialize};
use vigil_core::{ActionKind, Drive, InternalState};

use crate::state::ShortTermEvent;

const META_WINDOW: usize = 20;

/// Multipliers fed into scoring. `audacity` scales down the risk penalty,
/// `diversity` scales the recency bonus.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetaFactors {
    pub audacity: f64,
    pub diversity: f64,
}

impl Default for MetaFactors {
    fn default() -> Self {
        Self {
            audacity: 1.0,
            diversity: 1.0,
        }
    }
}

/// Window statistics used by [`meta_learn`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowStats {
    pub fail_rate: f64,
    pub avg_reward: f64,
    pub rest_ratio: f64,
}

impl WindowStats {
    pub fn from_events<'a>(events: impl Iterator<Item = &'a ShortTermEvent>) -> Option<Self> {
        let (mut n, mut fails, mut rests, mut reward) = (0usize, 0usize, 0usize, 0.0);
        for event in events {
            n += 1;
            if !event.success {
                fails += 1;
            }
            if event.action == ActionKind::Rest {
                rests += 1;
            }
            reward += event.reward;
        }
        if n == 0 {
            return None;
        }
        let n = n as f64;
        Some(Self {
            fail_rate: fails as f64 / n,
            avg_reward: reward / n,
            rest_ratio: rests as f64 / n,
        })
    }
}

/// Adjusts the multipliers (and curiosity) from the last 20 short-term events.
pub fn meta_learn<'a>(
    recent: impl DoubleEndedIterator<Item = &'a ShortTermEvent>,
    state: &mut InternalState,
    meta: &mut MetaFactors,
) -> Option<WindowStats> {
    let stats = WindowStats::from_events(recent.rev().take(META_WINDOW))?;

    if stats.fail_rate > 0.45 {
        meta.audacity = (meta.audacity - 0.02).max(0.85);
    } else if stats.fail_rate < 0.25 {
        meta.audacity = (meta.audacity + 0.01).min(1.10);
    }

    if stats.avg_reward < 0.08 {
        state.adjust(Drive::Curiosity, 0.005);
    }

    if stats.rest_ratio > 0.40 {
        meta.diversity = (meta.diversity + 0.02).min(1.20);
    } else {
        meta.diversity = (meta.diversity - 0.005).max(0.90);
    }

    Some(stats)
}
