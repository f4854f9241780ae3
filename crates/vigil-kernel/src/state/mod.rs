//! Persistent agent state: competence, memory, and the snapshot document.

mod competence;
mod memory;
mod snapshot;

pub use competence::{Competence, CompetenceTracker, SkillModifiers};
pub use memory::{
    context_key, ActionMemory, ContextStat, MemoryStore, NotableMemory, OutcomeRecord,
    ShortTermEvent, EMA_ALPHA, NOTABLE_KEEP_SEVERITY,
};
pub use snapshot::{SnapshotDocument, SnapshotStore, SNAPSHOT_VERSION};
