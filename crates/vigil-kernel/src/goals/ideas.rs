use serde::{Deserialize, Serialize};
use uuid::Uuid;
use vigil_core::{ActionCatalog, ActionKind};

use crate::kernel::events::RareEventKind;
use crate::state::ShortTermEvent;

/// Priority lost by every idea on every tick.
pub const IDEA_DECAY_PER_TICK: f64 = 0.002;
/// Ideas decayed below this are dropped.
pub const IDEA_MIN_PRIORITY: f64 = 0.05;

const STAGNATION_WINDOW: usize = 20;
const STAGNATION_COOLDOWN: u64 = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdeaOrigin {
    RareEvent,
    SkillUp,
    Stagnation,
}

/// A self-generated suggestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Idea {
    pub id: Uuid,
    pub description: String,
    pub rationale: String,
    pub action: Option<ActionKind>,
    pub estimated_cost: f64,
    pub estimated_risk: f64,
    pub priority: f64,
    pub created_tick: u64,
    pub origin: IdeaOrigin,
}

fn default_capacity() -> usize {
    25
}

/// Priority-ordered, capacity-bounded backlog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdeaBacklog {
    ideas: Vec<Idea>,
    #[serde(default = "default_capacity")]
    capacity: usize,
    #[serde(default)]
    seq: u64,
    #[serde(default)]
    last_stagnation_tick: Option<u64>,
}

impl Default for IdeaBacklog {
    fn default() -> Self {
        Self::with_capacity(default_capacity())
    }
}

impl IdeaBacklog {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            ideas: Vec::new(),
            capacity: capacity.max(1),
            seq: 0,
            last_stagnation_tick: None,
        }
    }

    pub fn len(&self) -> usize {
        self.ideas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ideas.is_empty()
    }

    pub fn ideas(&self) -> &[Idea] {
        &self.ideas
    }

    pub fn top(&self) -> Option<&Idea> {
        self.ideas.first()
    }

    pub fn top_n(&self, n: usize) -> &[Idea] {
        &self.ideas[..n.min(self.ideas.len())]
    }

    /// Removes and returns the highest-priority idea.
    pub fn pop_top(&mut self) -> Option<Idea> {
        if self.ideas.is_empty() {
            None
        } else {
            Some(self.ideas.remove(0))
        }
    }

    /// Inserts keeping descending priority; equal priorities keep insertion order.
    pub fn push(&mut self, idea: Idea) {
        let at = self
            .ideas
            .iter()
            .position(|existing| existing.priority < idea.priority)
            .unwrap_or(self.ideas.len());
        self.ideas.insert(at, idea);
        self.ideas.truncate(self.capacity);
    }

    pub fn decay(&mut self) {
        for idea in &mut self.ideas {
            idea.priority -= IDEA_DECAY_PER_TICK;
        }
        self.ideas.retain(|idea| idea.priority >= IDEA_MIN_PRIORITY);
    }

    fn next_id(&mut self, tick: u64) -> Uuid {
        self.seq += 1;
        Uuid::from_u64_pair(tick, self.seq)
    }

    #[allow(clippy::too_many_arguments)]
    fn make(
        &mut self,
        catalog: &ActionCatalog,
        tick: u64,
        action: ActionKind,
        description: String,
        rationale: String,
        priority: f64,
        origin: IdeaOrigin,
    ) -> Idea {
        let profile = catalog.profile(action);
        Idea {
            id: self.next_id(tick),
            description,
            rationale,
            action: Some(action),
            estimated_cost: (profile.energy_cost + profile.clarity_cost).max(0.0),
            estimated_risk: profile.base_risk,
            priority: priority.clamp(0.0, 1.0),
            created_tick: tick,
            origin,
        }
    }

    /// Seeds an idea from a rare event.
    pub fn seed_from_event(
        &mut self,
        catalog: &ActionCatalog,
        kind: RareEventKind,
        severity: f64,
        action: ActionKind,
        tick: u64,
    ) {
        let idea = if kind.is_positive() {
            self.make(
                catalog,
                tick,
                action,
                format!("Lean into {action} while {} lasts", kind.name()),
                format!("{} after {action} at severity {severity:.2}", kind.name()),
                0.45 + 0.35 * severity,
                IdeaOrigin::RareEvent,
            )
        } else {
            let remedy = match kind {
                RareEventKind::StressSpike => ActionKind::Organize,
                _ => ActionKind::Reflect,
            };
            self.make(
                catalog,
                tick,
                remedy,
                format!("Use {remedy} to absorb the {}", kind.name()),
                format!("{} after {action} at severity {severity:.2}", kind.name()),
                0.40 + 0.30 * severity,
                IdeaOrigin::RareEvent,
            )
        };
        self.push(idea);
    }

    pub fn seed_from_skill_up(
        &mut self,
        catalog: &ActionCatalog,
        action: ActionKind,
        level: u32,
        tick: u64,
    ) {
        let idea = self.make(
            catalog,
            tick,
            action,
            format!("Put level {level} {action} to use"),
            format!("{action} just reached level {level}"),
            0.35 + 0.05 * f64::from(level.min(6)),
            IdeaOrigin::SkillUp,
        );
        self.push(idea);
    }

    /// Suggests the least-used action when recent behaviour is repetitive or unrewarding.
    /// Returns true when an idea was added.
    pub fn check_stagnation<'a>(
        &mut self,
        catalog: &ActionCatalog,
        recent: impl Iterator<Item = &'a ShortTermEvent>,
        tick: u64,
    ) -> bool {
        if let Some(last) = self.last_stagnation_tick {
            if tick < last + STAGNATION_COOLDOWN {
                return false;
            }
        }

        let window: Vec<&ShortTermEvent> = recent.collect();
        if window.len() < STAGNATION_WINDOW {
            return false;
        }
        let window = &window[window.len() - STAGNATION_WINDOW..];

        let mut counts = [0usize; 7];
        for event in window {
            counts[event.action.index()] += 1;
        }
        let distinct = counts.iter().filter(|c| **c > 0).count();
        let avg_reward = window.iter().map(|e| e.reward).sum::<f64>() / window.len() as f64;
        if distinct > 2 && avg_reward >= 0.05 {
            return false;
        }

        let mut least = ActionKind::ALL[0];
        for action in ActionKind::ALL {
            if counts[action.index()] < counts[least.index()] {
                least = action;
            }
        }

        let idea = self.make(
            catalog,
            tick,
            least,
            format!("Break the routine with {least}"),
            format!("{distinct} distinct actions, avg reward {avg_reward:.3} over last {STAGNATION_WINDOW} ticks"),
            0.5,
            IdeaOrigin::Stagnation,
        );
        self.push(idea);
        self.last_stagnation_tick = Some(tick);
        true
    }
}
