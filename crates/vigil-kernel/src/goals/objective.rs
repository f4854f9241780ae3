use std::fmt;

use serde::{Deserialize, Serialize};
use vigil_core::{ActionKind, InternalState};

/// The four fixed goals, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Objective {
    Recover,
    Stabilize,
    Explore,
    Progress,
}

impl Objective {
    pub const ALL: [Objective; 4] = [
        Objective::Recover,
        Objective::Stabilize,
        Objective::Explore,
        Objective::Progress,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Objective::Recover => "Recover",
            Objective::Stabilize => "Stabilize",
            Objective::Explore => "Explore",
            Objective::Progress => "Progress",
        }
    }

    /// Case-insensitive lookup; also accepts the verb forms used by chat commands.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "recover" | "recovery" | "rest" => Some(Objective::Recover),
            "stabilize" | "stabilise" | "stability" => Some(Objective::Stabilize),
            "explore" | "exploration" => Some(Objective::Explore),
            "progress" | "practice" => Some(Objective::Progress),
            _ => None,
        }
    }

    pub fn priority(self) -> f64 {
        match self {
            Objective::Recover => 1.0,
            Objective::Stabilize => 0.9,
            Objective::Explore => 0.6,
            Objective::Progress => 0.5,
        }
    }

    /// Activation predicate. Progress depends on whether Recover or Stabilize hold.
    pub fn is_active(self, s: &InternalState, recover_active: bool, stabilize_active: bool) -> bool {
        match self {
            Objective::Recover => s.energy() < 0.35 || s.clarity() < 0.35 || s.fatigue() > 0.70,
            Objective::Stabilize => s.stability() < 0.45 || s.stress() > 0.65,
            Objective::Explore => {
                s.curiosity() > 0.60
                    && s.energy() > 0.50
                    && s.stability() > 0.55
                    && s.stress() < 0.70
            }
            Objective::Progress => !(recover_active || stabilize_active),
        }
    }

    pub fn affinity(self, action: ActionKind) -> f64 {
        use ActionKind::*;
        match (self, action) {
            (Objective::Recover, Rest) => 1.0,
            (Objective::Recover, Idle) => 0.5,
            (Objective::Recover, Reflect) => 0.3,
            (Objective::Stabilize, Organize) => 1.0,
            (Objective::Stabilize, Reflect) => 0.6,
            (Objective::Stabilize, Rest) => 0.4,
            (Objective::Explore, Explore) => 1.0,
            (Objective::Explore, Challenge) => 0.3,
            (Objective::Progress, Practice) => 1.0,
            (Objective::Progress, Reflect) => 0.4,
            (Objective::Progress, Organize) => 0.2,
            _ => 0.0,
        }
    }

    /// Actions an intention serving this objective narrows the candidates to.
    pub fn preferred_actions(self) -> Vec<ActionKind> {
        ActionKind::ALL
            .into_iter()
            .filter(|a| self.affinity(*a) > 0.0)
            .collect()
    }
}

impl fmt::Display for Objective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Objectives whose predicate holds, in declaration order.
pub fn active_objectives(state: &InternalState) -> Vec<Objective> {
    let recover = Objective::Recover.is_active(state, false, false);
    let stabilize = Objective::Stabilize.is_active(state, recover, false);
    Objective::ALL
        .into_iter()
        .filter(|o| o.is_active(state, recover, stabilize))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_core::Drive;

    #[test]
    fn fresh_state_only_progresses() {
        let mut state = InternalState::default();
        assert_eq!(active_objectives(&state), vec![Objective::Progress]);
        state.set(Drive::Curiosity, 0.8);
        assert_eq!(
            active_objectives(&state),
            vec![Objective::Explore, Objective::Progress]
        );
    }

    #[test]
    fn recover_suppresses_progress() {
        let mut state = InternalState::default();
        state.set(Drive::Energy, 0.2);
        let active = active_objectives(&state);
        assert_eq!(active, vec![Objective::Recover]);
    }

    #[test]
    fn order_is_declaration_order() {
        let mut state = InternalState::default();
        state.set(Drive::Energy, 0.2);
        state.set(Drive::Stress, 0.9);
        assert_eq!(
            active_objectives(&state),
            vec![Objective::Recover, Objective::Stabilize]
        );
    }

    #[test]
    fn preferred_sets_follow_affinity() {
        assert_eq!(
            Objective::Explore.preferred_actions(),
            vec![ActionKind::Explore, ActionKind::Challenge]
        );
        assert_eq!(Objective::from_name("STABILIZE"), Some(Objective::Stabilize));
    }
}
