//! Versioned snapshot document and its primary/backup file store.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use vigil_core::{ActionKind, InternalState, SplitMix64, WorldState};

use super::competence::CompetenceTracker;
use super::memory::MemoryStore;
use crate::adapters::RouterSettings;
use crate::error::SnapshotError;
use crate::goals::{IdeaBacklog, Intention};
use crate::kernel::dashboard::DashboardAggregator;
use crate::kernel::meta::MetaFactors;

/// Bumped whenever the document shape changes. Loads require an exact match.
pub const SNAPSHOT_VERSION: u32 = 3;

/// Everything needed to resume an agent exactly where it stopped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotDocument {
    pub version: u32,
    pub tick: u64,
    pub sim_minutes: f64,
    pub internal: InternalState,
    pub world: WorldState,
    pub meta: MetaFactors,
    pub competence: CompetenceTracker,
    pub memory: MemoryStore,
    pub intention: Option<Intention>,
    pub ideas: IdeaBacklog,
    pub router: RouterSettings,
    #[serde(default)]
    pub history: Vec<ActionKind>,
    #[serde(default)]
    pub last_action_tick: BTreeMap<ActionKind, u64>,
    #[serde(default)]
    pub cooldowns: BTreeMap<ActionKind, u64>,
    #[serde(default)]
    pub dashboard: DashboardAggregator,
    #[serde(default)]
    pub paused: bool,
    pub rng: SplitMix64,
}

impl SnapshotDocument {
    /// Parse and version-check a serialized document.
    pub fn from_json(content: &str) -> Result<Self, SnapshotError> {
        let value: serde_json::Value = serde_json::from_str(content)?;
        let found = value
            .get("version")
            .and_then(serde_json::Value::as_u64)
            .unwrap_or(0);
        if u32::try_from(found).ok() != Some(SNAPSHOT_VERSION) {
            return Err(SnapshotError::VersionMismatch {
                found,
                expected: SNAPSHOT_VERSION,
            });
        }
        let mut doc: Self = serde_json::from_value(value)?;
        doc.competence.sanitize();
        doc.memory.sanitize();
        Ok(doc)
    }

    pub fn to_json(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Primary snapshot file plus a `.bak` sibling for one level of rollback.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    primary: PathBuf,
    backup: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        let primary = path.as_ref().to_path_buf();
        let mut backup = primary.clone().into_os_string();
        backup.push(".bak");
        Self {
            primary,
            backup: PathBuf::from(backup),
        }
    }

    pub fn primary_path(&self) -> &Path {
        &self.primary
    }

    pub fn backup_path(&self) -> &Path {
        &self.backup
    }

    /// Write the document.
    ///
    /// A readable previous primary is rotated into `.bak` first. With no primary at all the new
    /// document is written to `.bak` as well; a corrupt primary leaves `.bak` untouched.
    pub fn save(&self, doc: &SnapshotDocument) -> Result<(), SnapshotError> {
        if let Some(parent) = self.primary.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let content = doc.to_json()?;

        match std::fs::read_to_string(&self.primary) {
            Ok(old) if SnapshotDocument::from_json(&old).is_ok() => {
                std::fs::copy(&self.primary, &self.backup)?;
            }
            Ok(_) => {
                tracing::warn!(path = %self.primary.display(), "previous primary unreadable, keeping backup");
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                write_atomic(&self.backup, &content)?;
            }
            Err(e) => return Err(e.into()),
        }

        write_atomic(&self.primary, &content)?;
        tracing::info!(path = %self.primary.display(), tick = doc.tick, "snapshot saved");
        Ok(())
    }

    /// Read the primary, falling back to `.bak` if it is missing, corrupt, or the wrong version.
    pub fn load(&self) -> Result<SnapshotDocument, SnapshotError> {
        let primary_err = match read_document(&self.primary) {
            Ok(doc) => {
                tracing::info!(path = %self.primary.display(), tick = doc.tick, "snapshot loaded");
                return Ok(doc);
            }
            Err(e) => e,
        };

        tracing::warn!(
            path = %self.primary.display(),
            error = %primary_err,
            "primary snapshot unreadable, trying backup"
        );

        match read_document(&self.backup) {
            Ok(doc) => {
                tracing::info!(path = %self.backup.display(), tick = doc.tick, "snapshot restored from backup");
                Ok(doc)
            }
            Err(backup_err) => Err(SnapshotError::Unreadable {
                primary: primary_err.to_string(),
                backup: backup_err.to_string(),
            }),
        }
    }
}

fn read_document(path: &Path) -> Result<SnapshotDocument, SnapshotError> {
    let content = std::fs::read_to_string(path)?;
    SnapshotDocument::from_json(&content)
}

fn write_atomic(path: &Path, content: &str) -> Result<(), SnapshotError> {
    let mut tmp = path.to_path_buf().into_os_string();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    std::fs::write(&tmp, content)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}
