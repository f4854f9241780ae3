//! Offline execution policy and capability permissions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::{EngineConfig, PermissionsConfig, PolicyConfig};
use crate::error::EngineError;

/// Guards the offline invariant. Checked once per tick; a breach aborts the step.
#[derive(Debug, Clone)]
pub struct ExecutionPolicy {
    config: PolicyConfig,
    primary_endpoint: String,
}

impl ExecutionPolicy {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            config: config.policy.clone(),
            primary_endpoint: config.backend.primary_endpoint.clone(),
        }
    }

    pub fn offline_strict(&self) -> bool {
        self.config.offline_strict
    }

    /// Verify the policy still holds.
    pub fn verify(&self) -> Result<(), EngineError> {
        if !self.config.offline_strict {
            return Ok(());
        }
        if self.config.external_api_allowed {
            tracing::error!("external api enabled while offline_strict is set");
            return Err(EngineError::PolicyViolation(
                "offline_strict forbids external_api_allowed".to_string(),
            ));
        }
        if !crate::config::is_loopback_endpoint(&self.primary_endpoint) {
            tracing::error!(endpoint = %self.primary_endpoint, "non-loopback primary backend");
            return Err(EngineError::PolicyViolation(format!(
                "primary backend {} is not a loopback address",
                self.primary_endpoint
            )));
        }
        Ok(())
    }

    /// Swap in a different policy (used when an operator edits the config at runtime).
    pub fn set_config(&mut self, config: PolicyConfig) {
        self.config = config;
    }

    pub fn set_primary_endpoint(&mut self, endpoint: impl Into<String>) {
        self.primary_endpoint = endpoint.into();
    }
}

/// One refused capability request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenialRecord {
    pub capability: String,
    pub tick: u64,
    pub reason: String,
    pub at: DateTime<Utc>,
}

/// Capability allow/deny lists plus the audit trail of refusals.
#[derive(Debug, Clone, Default)]
pub struct Permissions {
    allow: Vec<String>,
    deny: Vec<String>,
    denials: Vec<DenialRecord>,
}

impl Permissions {
    pub fn new(config: &PermissionsConfig) -> Self {
        Self {
            allow: config.allow.iter().map(|c| c.to_lowercase()).collect(),
            deny: config.deny.iter().map(|c| c.to_lowercase()).collect(),
            denials: Vec::new(),
        }
    }

    /// Checks a capability; refusals are appended to the audit log.
    pub fn authorize(&mut self, capability: &str, tick: u64) -> bool {
        let key = capability.trim().to_lowercase();
        let reason = if self.deny.contains(&key) {
            "explicitly denied"
        } else if !self.allow.contains(&key) {
            "not on allow-list"
        } else {
            return true;
        };

        tracing::warn!(capability = %key, tick, reason, "capability denied");
        self.denials.push(DenialRecord {
            capability: key,
            tick,
            reason: reason.to_string(),
            at: Utc::now(),
        });
        false
    }

    pub fn denials(&self) -> &[DenialRecord] {
        &self.denials
    }
}
