use serde::{Deserialize, Serialize};
use vigil_core::{ActionKind, DeterministicRng, InternalState, WorldState};

use super::ideas::IdeaBacklog;
use super::objective::Objective;

/// Top idea priority above which the agent commits to testing it.
const IDEA_ADOPTION_PRIORITY: f64 = 0.7;
/// World novelty above which exploring becomes an intention of its own.
const EXPLORE_NOVELTY: f64 = 0.55;

/// Ephemeral multi-tick commitment. Replaced wholesale, never edited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intention {
    pub label: String,
    pub objective: Objective,
    pub preferred: Vec<ActionKind>,
    pub expires_at: u64,
    pub cancel_on_critical: bool,
}

impl Intention {
    /// Intention serving `objective`, expiring 6-20 ticks from `tick`.
    pub fn for_objective(objective: Objective, tick: u64, rng: &mut impl DeterministicRng) -> Self {
        Self {
            label: objective.name().to_lowercase(),
            objective,
            preferred: objective.preferred_actions(),
            expires_at: tick + rng.range_inclusive(6, 20),
            cancel_on_critical: objective != Objective::Recover,
        }
    }

    pub fn is_expired(&self, tick: u64) -> bool {
        tick > self.expires_at
    }

    pub fn prefers(&self, action: ActionKind) -> bool {
        self.preferred.contains(&action)
    }
}

/// Holds at most one active intention.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IntentionManager {
    current: Option<Intention>,
}

impl IntentionManager {
    pub fn new(current: Option<Intention>) -> Self {
        Self { current }
    }

    pub fn current(&self) -> Option<&Intention> {
        self.current.as_ref()
    }

    pub fn label(&self) -> Option<&str> {
        self.current.as_ref().map(|i| i.label.as_str())
    }

    pub fn install(&mut self, intention: Intention) {
        tracing::debug!(label = %intention.label, expires_at = intention.expires_at, "intention installed");
        self.current = Some(intention);
    }

    pub fn clear(&mut self) -> Option<Intention> {
        self.current.take()
    }

    fn needs_replacement(&self, tick: u64, state: &InternalState) -> bool {
        match &self.current {
            None => true,
            Some(i) => i.is_expired(tick) || (state.is_critical() && i.cancel_on_critical),
        }
    }

    /// Keeps the current intention if still valid, otherwise picks a new one.
    pub fn refresh(
        &mut self,
        tick: u64,
        state: &InternalState,
        world: &WorldState,
        active: &[Objective],
        ideas: &mut IdeaBacklog,
        rng: &mut impl DeterministicRng,
    ) {
        if !self.needs_replacement(tick, state) {
            return;
        }

        let adopt_idea = ideas
            .top()
            .is_some_and(|idea| idea.priority > IDEA_ADOPTION_PRIORITY);
        if adopt_idea {
            if let Some(idea) = ideas.pop_top() {
                let preferred = match idea.action {
                    Some(action) => vec![action],
                    None => Objective::Progress.preferred_actions(),
                };
                self.install(Intention {
                    label: format!("test idea: {}", idea.description),
                    objective: Objective::Progress,
                    preferred,
                    expires_at: tick + rng.range_inclusive(5, 12),
                    cancel_on_critical: true,
                });
                return;
            }
        }

        let objective = if active.contains(&Objective::Recover) {
            Objective::Recover
        } else if active.contains(&Objective::Stabilize) {
            Objective::Stabilize
        } else if world.novelty() > EXPLORE_NOVELTY {
            Objective::Explore
        } else {
            Objective::Progress
        };
        self.install(Intention::for_objective(objective, tick, rng));
    }
}
