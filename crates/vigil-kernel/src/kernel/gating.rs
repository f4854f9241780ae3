//! Gating - the hard candidate filter applied before scoring.

use std::collections::BTreeMap;

use vigil_core::{ActionKind, InternalState};

use crate::goals::Intention;
use crate::state::MemoryStore;

/// Repetition run that starts drawing a penalty.
const LOOP_PENALTY_RUN: usize = 3;
/// Repetition run that puts the action on cooldown.
const LOOP_COOLDOWN_RUN: usize = 5;
const LOOP_COOLDOWN_TICKS: u64 = 3;
const LOOP_PENALTY_MAX: f64 = 0.6;

/// Inputs the gate reads. Borrowed from the engine for one call.
pub struct GateInput<'a> {
    pub tick: u64,
    pub state: &'a InternalState,
    pub memory: &'a MemoryStore,
    pub cooldowns: &'a BTreeMap<ActionKind, u64>,
    pub intention: Option<&'a Intention>,
}

fn or_rest(candidates: Vec<ActionKind>) -> Vec<ActionKind> {
    if candidates.is_empty() {
        vec![ActionKind::Rest]
    } else {
        candidates
    }
}

/// Candidate subset, in catalog order. Never empty.
pub fn gate(input: &GateInput<'_>) -> Vec<ActionKind> {
    let tick = input.tick;

    let candidates: Vec<ActionKind> = ActionKind::ALL
        .into_iter()
        .filter(|a| {
            let avoided = input.memory.action(*a).is_some_and(|m| m.is_avoided(tick));
            let cooling = input.cooldowns.get(a).is_some_and(|until| *until > tick);
            !avoided && !cooling
        })
        .collect();
    let mut candidates = or_rest(candidates);

    if input.state.energy() < 0.20 {
        candidates = or_rest(
            candidates
                .into_iter()
                .filter(|a| a.is_low_energy_safe())
                .collect(),
        );
    }

    if input.state.stability() < 0.30 || input.state.stress() > 0.85 {
        candidates = or_rest(
            candidates
                .into_iter()
                .filter(|a| *a != ActionKind::Challenge)
                .collect(),
        );
    }

    if let Some(intention) = input.intention {
        let preferred: Vec<ActionKind> = candidates
            .iter()
            .copied()
            .filter(|a| intention.prefers(*a))
            .collect();
        if !preferred.is_empty() {
            candidates = preferred;
        }
    }

    candidates
}

/// Length of the run of identical actions at the end of `history`.
pub fn trailing_run(history: &[ActionKind]) -> Option<(ActionKind, usize)> {
    let last = *history.last()?;
    let run = history.iter().rev().take_while(|a| **a == last).count();
    Some((last, run))
}

/// Penalty for picking `action` again while it is on a repetition run.
pub fn anti_loop_penalty(history: &[ActionKind], action: ActionKind) -> f64 {
    match trailing_run(history) {
        Some((last, run)) if last == action && run >= LOOP_PENALTY_RUN => {
            (0.05 * (run - 2) as f64).min(LOOP_PENALTY_MAX)
        }
        _ => 0.0,
    }
}

/// Cooldown expiry for the trailing action, if its run is long enough.
pub fn loop_cooldown(history: &[ActionKind], tick: u64) -> Option<(ActionKind, u64)> {
    match trailing_run(history) {
        Some((last, run)) if run >= LOOP_COOLDOWN_RUN => Some((last, tick + LOOP_COOLDOWN_TICKS)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_core::Drive;

    #[test]
    fn low_energy_restricts_to_safe_actions() {
        let mut state = InternalState::default();
        state.set(Drive::Energy, 0.1);
        let memory = MemoryStore::default();
        let cooldowns = BTreeMap::new();
        let candidates = gate(&GateInput {
            tick: 1,
            state: &state,
            memory: &memory,
            cooldowns: &cooldowns,
            intention: None,
        });
        assert_eq!(
            candidates,
            vec![ActionKind::Rest, ActionKind::Reflect, ActionKind::Idle]
        );
    }

    #[test]
    fn everything_cooling_falls_back_to_rest() {
        let state = InternalState::default();
        let memory = MemoryStore::default();
        let cooldowns: BTreeMap<_, _> = ActionKind::ALL.into_iter().map(|a| (a, 10)).collect();
        let candidates = gate(&GateInput {
            tick: 1,
            state: &state,
            memory: &memory,
            cooldowns: &cooldowns,
            intention: None,
        });
        assert_eq!(candidates, vec![ActionKind::Rest]);
    }

    #[test]
    fn penalty_grows_and_caps() {
        let history = vec![ActionKind::Practice; 4];
        assert!((anti_loop_penalty(&history, ActionKind::Practice) - 0.10).abs() < 1e-12);
        assert_eq!(anti_loop_penalty(&history, ActionKind::Rest), 0.0);
        let long = vec![ActionKind::Practice; 30];
        assert_eq!(anti_loop_penalty(&long, ActionKind::Practice), 0.6);
        assert_eq!(loop_cooldown(&long, 7), Some((ActionKind::Practice, 10)));
        assert_eq!(loop_cooldown(&history, 7), None);
    }
}
