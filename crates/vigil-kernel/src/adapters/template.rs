//! Local template backend - deterministic canned replies, no model weights needed.

use async_trait::async_trait;

use super::{estimate_tokens, ContextPacket, Generation, InferenceMode, RawCommand, TextBackend};
use crate::error::BackendError;

/// Canned-text backend registered under the local model keys.
#[derive(Debug, Clone)]
pub struct TemplateBackend {
    key: String,
}

impl TemplateBackend {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

/// Later keywords win.
fn keyword_commands(prompt: &str) -> Vec<RawCommand> {
    let lower = prompt.to_lowercase();
    let mut command = RawCommand::new("PROPOSE");
    if lower.contains("state") {
        command = RawCommand::new("GET_STATE");
    }
    if lower.contains("intention") {
        command = RawCommand::with_value("SET_INTENTION", "stabilize");
    }
    if lower.contains("pause") {
        command = RawCommand::new("PAUSE");
    }
    if lower.contains("resume") {
        command = RawCommand::new("RESUME");
    }
    vec![command]
}

#[async_trait]
impl TextBackend for TemplateBackend {
    async fn generate(
        &self,
        prompt: &str,
        mode: InferenceMode,
        context: &ContextPacket,
    ) -> Result<Generation, BackendError> {
        let text = match mode {
            InferenceMode::Realtime => {
                "I suggest a careful action that fits my current state.".to_string()
            }
            InferenceMode::Reflection => {
                let intention = context
                    .intention
                    .as_ref()
                    .map(|i| i.label.as_str())
                    .unwrap_or("no fixed intention");
                format!(
                    "I suggest a structured plan in several steps, proceeding with care and continuity ({intention})."
                )
            }
        };
        Ok(Generation {
            input_tokens: estimate_tokens(prompt),
            output_tokens: estimate_tokens(&text),
            commands: keyword_commands(prompt),
            text,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keywords_pick_the_last_matching_command() {
        assert_eq!(keyword_commands("hello")[0].cmd, "PROPOSE");
        assert_eq!(keyword_commands("what is your state?")[0].cmd, "GET_STATE");
        let cmd = &keyword_commands("set an intention")[0];
        assert_eq!(cmd.cmd, "SET_INTENTION");
        assert_eq!(cmd.value.as_deref(), Some("stabilize"));
        assert_eq!(keyword_commands("state then pause")[0].cmd, "PAUSE");
        assert_eq!(keyword_commands("pause, no, resume")[0].cmd, "RESUME");
    }

    #[tokio::test]
    async fn reflection_replies_are_longer() {
        let backend = TemplateBackend::new("fast-local");
        let ctx = ContextPacket::detached(InferenceMode::Realtime);
        let short = backend.generate("hi", InferenceMode::Realtime, &ctx).await.unwrap();
        let long = backend.generate("hi", InferenceMode::Reflection, &ctx).await.unwrap();
        assert!(long.text.len() > short.text.len());
        assert_eq!(backend.key(), "fast-local");
    }
}
