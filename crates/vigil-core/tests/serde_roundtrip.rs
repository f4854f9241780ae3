#![cfg(feature = "serde")]

use vigil_core::{Drive, InternalState, SimClock, WorldState};

#[test]
fn state_json_roundtrip() {
    let mut state = InternalState::default();
    state.set(Drive::Stress, 0.8);
    let json = serde_json::to_string(&state).expect("serialize");
    let back: InternalState = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(back, state);

    let world = WorldState::default();
    let json = serde_json::to_string(&world).expect("serialize");
    assert_eq!(serde_json::from_str::<WorldState>(&json).expect("deserialize"), world);
}

#[test]
fn out_of_range_documents_are_clamped_on_load() {
    let json = r#"{"energy":1.7,"clarity":-0.2,"stability":0.5,"curiosity":0.5,
        "risk_tolerance":0.5,"fatigue":0.5,"stress":0.5}"#;
    let state: InternalState = serde_json::from_str(json).expect("deserialize");
    assert_eq!(state.energy(), 1.0);
    assert_eq!(state.clarity(), 0.0);
}

#[test]
fn clock_roundtrip() {
    let mut clock = SimClock::new();
    clock.advance();
    clock.advance();
    let json = serde_json::to_string(&clock).expect("serialize");
    assert_eq!(serde_json::from_str::<SimClock>(&json).expect("deserialize"), clock);
}
