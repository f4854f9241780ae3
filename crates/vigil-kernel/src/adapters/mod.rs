//! Adapters - text-generation backends the agent can talk through.

mod bench;
mod commands;
mod context;
mod openai;
mod registry;
mod router;
mod template;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::BackendError;

pub use bench::{quick_eval, QuickEvalReport, QuickEvalRow, EVAL_PROMPTS};
pub use commands::{sanitize_commands, BackendCommand, RawCommand};
pub use context::ContextPacket;
pub use openai::OpenAiCompatBackend;
pub use registry::{ModelProfile, ModelRegistry, ModelSpec, RuntimeType, DEEP_KEY, FAST_KEY, PRIMARY_KEY};
pub use router::{BackendRouter, ReplyMeta, RouterReply, RouterSettings, RouterStatus};
pub use template::TemplateBackend;

/// Generation mode. Realtime favours short answers, reflection longer ones.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InferenceMode {
    #[default]
    Realtime,
    Reflection,
}

impl InferenceMode {
    /// Parse mode from name
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "realtime" => Some(Self::Realtime),
            "reflection" | "reflexion" => Some(Self::Reflection),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Realtime => "realtime",
            Self::Reflection => "reflection",
        }
    }
}

impl fmt::Display for InferenceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Raw output of a backend, before command validation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Generation {
    pub text: String,
    pub commands: Vec<RawCommand>,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// Trait for text-generation backends.
#[async_trait]
pub trait TextBackend: Send + Sync {
    /// Produce a reply for `prompt`.
    async fn generate(
        &self,
        prompt: &str,
        mode: InferenceMode,
        context: &ContextPacket,
    ) -> Result<Generation, BackendError>;

    /// Cheap reachability check. Local backends are always ready.
    async fn probe(&self) -> bool {
        true
    }
}

/// Rough token estimate used when a backend reports no usage.
pub(crate) fn estimate_tokens(text: &str) -> u64 {
    (text.len() as u64 / 4).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_names_round_trip() {
        for mode in [InferenceMode::Realtime, InferenceMode::Reflection] {
            assert_eq!(InferenceMode::from_name(mode.name()), Some(mode));
        }
        assert_eq!(InferenceMode::from_name("REFLEXION"), Some(InferenceMode::Reflection));
        assert_eq!(InferenceMode::from_name("batch"), None);
    }

    #[test]
    fn token_estimate_is_never_zero() {
        assert_eq!(estimate_tokens(""), 1);
        assert_eq!(estimate_tokens("abcdefgh"), 2);
    }
}
