use serde::Serialize;
use vigil_core::{DayPhase, InternalState, WorldState};

use super::InferenceMode;
use crate::goals::{Idea, Intention};
use crate::state::ShortTermEvent;

/// Structured context handed to a backend alongside the prompt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContextPacket {
    pub tick: u64,
    pub phase: DayPhase,
    pub state: InternalState,
    pub world: WorldState,
    pub intention: Option<Intention>,
    pub objectives: Vec<String>,
    pub recent_events: Vec<ShortTermEvent>,
    pub ideas: Vec<Idea>,
    pub style: String,
    pub mode: InferenceMode,
}

impl ContextPacket {
    /// Empty packet for callers with no engine at hand.
    pub fn detached(mode: InferenceMode) -> Self {
        Self {
            tick: 0,
            phase: DayPhase::Night,
            state: InternalState::default(),
            world: WorldState::default(),
            intention: None,
            objectives: Vec::new(),
            recent_events: Vec::new(),
            ideas: Vec::new(),
            style: "neutral".to_string(),
            mode,
        }
    }

    /// Short system prompt describing the agent's situation.
    pub fn system_prompt(&self) -> String {
        let intention = self
            .intention
            .as_ref()
            .map(|i| i.label.as_str())
            .unwrap_or("none");
        format!(
            "You are Vigil, a concise, local and careful agent. Tick {} ({}). Energy {:.2}, stress {:.2}. \
             Intention: {}. Objectives: {}. Style: {}.",
            self.tick,
            self.phase.name(),
            self.state.energy(),
            self.state.stress(),
            intention,
            if self.objectives.is_empty() {
                "none".to_string()
            } else {
                self.objectives.join(", ")
            },
            self.style,
        )
    }
}
