//! Decision kernel - gating, scoring, outcomes, rare events and the tick loop that ties them.

pub mod dashboard;
pub mod events;
pub mod gating;
pub mod meta;
pub mod outcome;
pub mod scheduler;
pub mod scoring;
pub mod wall;

mod engine;

pub use engine::{Engine, Proposal, TickReport};
pub use wall::{FixedWallClock, SystemWallClock, WallClock};
