//! Vigil Kernel - tick-driven decision engine
//!
//! This crate owns the full lifetime of one simulated agent: bounded internal and world state,
//! per-action memory and competence, objective/intention arbitration, an idea backlog, rare
//! events, periodic consolidation, and the scoring engine that picks exactly one action per tick.
//! Around the engine sit the snapshot store, the text-backend router, the line command surface,
//! and the chat service that binds them together.

pub mod adapters;
pub mod commands;
pub mod config;
pub mod error;
pub mod goals;
pub mod kernel;
pub mod observability;
pub mod policy;
pub mod service;
pub mod state;

pub use adapters::{BackendRouter, InferenceMode, TextBackend};
pub use config::EngineConfig;
pub use error::{BackendError, CommandError, EngineError, SnapshotError};
pub use kernel::{Engine, TickReport};
pub use service::ChatService;
pub use state::{SnapshotDocument, SnapshotStore, SNAPSHOT_VERSION};
