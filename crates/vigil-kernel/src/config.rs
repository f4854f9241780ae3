//! Engine configuration loading and management.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::adapters::InferenceMode;

/// Main engine configuration, loaded from .vigil/config.yaml
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// RNG seed; unset means seeded from the wall clock
    pub seed: Option<u64>,

    /// Primary snapshot file (a `.bak` sibling is maintained next to it)
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: PathBuf,

    /// JSON-lines journal of tick events
    #[serde(default = "default_journal_path")]
    pub journal_path: PathBuf,

    /// Memory capacities
    #[serde(default)]
    pub memory: MemoryConfig,

    /// Consolidation period in ticks
    #[serde(default = "default_consolidation_every")]
    pub consolidation_every_ticks: u64,

    /// Maximum idea backlog size
    #[serde(default = "default_idea_capacity")]
    pub idea_capacity: usize,

    /// Offline execution policy
    #[serde(default)]
    pub policy: PolicyConfig,

    /// Capability allow/deny lists
    #[serde(default)]
    pub permissions: PermissionsConfig,

    /// Text-generation backend routing
    #[serde(default)]
    pub backend: BackendConfig,
}

/// Memory capacity configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    #[serde(default = "default_short_term_capacity")]
    pub short_term_capacity: usize,

    #[serde(default = "default_notable_capacity")]
    pub notable_capacity: usize,

    #[serde(default = "default_decision_log_capacity")]
    pub decision_log_capacity: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            short_term_capacity: default_short_term_capacity(),
            notable_capacity: default_notable_capacity(),
            decision_log_capacity: default_decision_log_capacity(),
        }
    }
}

fn default_snapshot_path() -> PathBuf {
    PathBuf::from(".vigil/snapshot.json")
}
fn default_journal_path() -> PathBuf {
    PathBuf::from(".vigil/events.jsonl")
}
fn default_consolidation_every() -> u64 {
    48
}
fn default_idea_capacity() -> usize {
    25
}
fn default_short_term_capacity() -> usize {
    40
}
fn default_notable_capacity() -> usize {
    200
}
fn default_decision_log_capacity() -> usize {
    500
}

/// Offline policy: the agent must never silently go networked.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    #[serde(default = "default_true")]
    pub offline_strict: bool,

    #[serde(default)]
    pub external_api_allowed: bool,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            offline_strict: true,
            external_api_allowed: false,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Capability allow/deny lists
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionsConfig {
    #[serde(default = "default_allowed")]
    pub allow: Vec<String>,

    #[serde(default = "default_denied")]
    pub deny: Vec<String>,
}

impl Default for PermissionsConfig {
    fn default() -> Self {
        Self {
            allow: default_allowed(),
            deny: default_denied(),
        }
    }
}

fn default_allowed() -> Vec<String> {
    ["simulate", "journal", "snapshot", "local_inference", "propose"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_denied() -> Vec<String> {
    ["network", "external_api", "shell", "filesystem_external"]
        .into_iter()
        .map(String::from)
        .collect()
}

/// Backend router configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the OpenAI-compatible primary server (must be loopback while offline)
    #[serde(default = "default_primary_endpoint")]
    pub primary_endpoint: String,

    /// Minimum interval between reachability probes of the primary
    #[serde(default = "default_probe_interval_ms")]
    pub probe_interval_ms: u64,

    /// Bound on a single generation request
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    #[serde(default = "default_true")]
    pub auto_mode: bool,

    #[serde(default)]
    pub forced_model: Option<String>,

    #[serde(default)]
    pub mode: InferenceMode,

    /// Keep previously used backends loaded
    #[serde(default = "default_true")]
    pub keep_warm: bool,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            primary_endpoint: default_primary_endpoint(),
            probe_interval_ms: default_probe_interval_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            auto_mode: true,
            forced_model: None,
            mode: InferenceMode::default(),
            keep_warm: true,
        }
    }
}

fn default_primary_endpoint() -> String {
    "http://127.0.0.1:1234".to_string()
}
fn default_probe_interval_ms() -> u64 {
    2_000
}
fn default_request_timeout_ms() -> u64 {
    2_000
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            seed: None,
            snapshot_path: default_snapshot_path(),
            journal_path: default_journal_path(),
            memory: MemoryConfig::default(),
            consolidation_every_ticks: default_consolidation_every(),
            idea_capacity: default_idea_capacity(),
            policy: PolicyConfig::default(),
            permissions: PermissionsConfig::default(),
            backend: BackendConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a YAML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        let config: Self = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))?;
        Ok(config)
    }

    /// Load from project root (looks for .vigil/config.yaml)
    pub fn load_from_project(project_root: &Path) -> Result<Self> {
        let config_path = project_root.join(".vigil/config.yaml");
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Resolve paths relative to project root
    pub fn resolve_paths(&mut self, project_root: &Path) {
        self.snapshot_path = project_root.join(&self.snapshot_path);
        self.journal_path = project_root.join(&self.journal_path);
    }

    /// Config with a fixed seed and defaults everywhere else
    pub fn seeded(seed: u64) -> Self {
        Self {
            seed: Some(seed),
            ..Self::default()
        }
    }
}

/// True when the URL's host is a loopback address.
pub fn is_loopback_endpoint(endpoint: &str) -> bool {
    let Ok(url) = reqwest::Url::parse(endpoint) else {
        return false;
    };
    let Some(host) = url.host_str() else {
        return false;
    };
    if host.eq_ignore_ascii_case("localhost") {
        return true;
    }
    host.trim_start_matches('[')
        .trim_end_matches(']')
        .parse::<std::net::IpAddr>()
        .map(|ip| ip.is_loopback())
        .unwrap_or(false)
}
