//! Goals - objectives, intentions, and the idea backlog.

mod ideas;
mod intention;
mod objective;

pub use ideas::{Idea, IdeaBacklog, IdeaOrigin, IDEA_DECAY_PER_TICK, IDEA_MIN_PRIORITY};
pub use intention::{Intention, IntentionManager};
pub use objective::{active_objectives, Objective};
