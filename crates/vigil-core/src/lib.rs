//! Deterministic, bounded state primitives for a single simulated agent.
//!
//! Everything here is engine-agnostic: a seedable RNG, the simulated clock, the two bounded state
//! vectors and the fixed action table. Higher-level behaviour lives in `vigil-kernel`.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod action;
pub mod rng;
pub mod state;
pub mod tick;

pub use action::{ActionCatalog, ActionKind, ActionProfile};
pub use rng::{DeterministicRng, SplitMix64};
pub use state::{Drive, InternalState, WorldDim, WorldState};
pub use tick::{DayPhase, SimClock, WallPhase, MINUTES_PER_DAY, SIM_MINUTES_PER_TICK};
