//! OpenAI-compatible backend - chat completions against a local inference server.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use super::{estimate_tokens, ContextPacket, Generation, InferenceMode, RawCommand, TextBackend};
use crate::error::BackendError;

/// Chat endpoints tried in order; servers disagree on the prefix.
const CHAT_PATHS: [&str; 3] = [
    "/v1/chat/completions",
    "/api/v1/chat/completions",
    "/api/v1/chat",
];

const PROBE_PATHS: [&str; 2] = ["/v1/models", "/api/v1/models"];

const PROBE_TIMEOUT: Duration = Duration::from_millis(600);

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Debug, Deserialize)]
struct Message {
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: Option<u64>,
    completion_tokens: Option<u64>,
}

/// Sampling parameters per mode: (temperature, top_p, max_tokens).
fn sampling(mode: InferenceMode) -> (f64, f64, u32) {
    match mode {
        InferenceMode::Realtime => (0.5, 0.9, 180),
        InferenceMode::Reflection => (0.65, 0.95, 420),
    }
}

/// Backend for an OpenAI-compatible server on loopback.
#[derive(Debug, Clone)]
pub struct OpenAiCompatBackend {
    base_url: String,
    client: reqwest::Client,
}

impl OpenAiCompatBackend {
    pub fn new(base_url: &str, request_timeout: Duration) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| BackendError::Transport(e.to_string()))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post_chat(&self, path: &str, payload: &serde_json::Value) -> Result<ChatResponse, BackendError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .post(&url)
            .json(payload)
            .send()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;
        if !response.status().is_success() {
            return Err(BackendError::Transport(format!("{url}: HTTP {}", response.status())));
        }
        response
            .json::<ChatResponse>()
            .await
            .map_err(|e| BackendError::Malformed(e.to_string()))
    }
}

#[async_trait]
impl TextBackend for OpenAiCompatBackend {
    async fn generate(
        &self,
        prompt: &str,
        mode: InferenceMode,
        context: &ContextPacket,
    ) -> Result<Generation, BackendError> {
        let (temperature, top_p, max_tokens) = sampling(mode);
        let payload = json!({
            "model": "local",
            "messages": [
                {"role": "system", "content": context.system_prompt()},
                {"role": "user", "content": prompt},
            ],
            "temperature": temperature,
            "top_p": top_p,
            "max_tokens": max_tokens,
            "stream": false,
        });

        let mut last_err = None;
        let mut body = None;
        for path in CHAT_PATHS {
            match self.post_chat(path, &payload).await {
                Ok(parsed) => {
                    body = Some(parsed);
                    break;
                }
                Err(e) => {
                    tracing::debug!(path, error = %e, "chat path failed");
                    last_err = Some(e);
                }
            }
        }
        let body = match (body, last_err) {
            (Some(body), _) => body,
            (None, Some(e)) => return Err(e),
            (None, None) => return Err(BackendError::Transport("no chat path".to_string())),
        };

        let text = body
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .unwrap_or_default();

        let lower = text.to_lowercase();
        let commands = if lower.contains("state") {
            vec![RawCommand::new("GET_STATE")]
        } else {
            vec![RawCommand::new("PROPOSE")]
        };

        let usage = body.usage;
        let input_tokens = usage
            .as_ref()
            .and_then(|u| u.prompt_tokens)
            .unwrap_or_else(|| estimate_tokens(prompt));
        let output_tokens = usage
            .as_ref()
            .and_then(|u| u.completion_tokens)
            .unwrap_or_else(|| estimate_tokens(&text));

        Ok(Generation {
            text: if text.is_empty() {
                "Empty reply from the model.".to_string()
            } else {
                text
            },
            commands,
            input_tokens,
            output_tokens,
        })
    }

    async fn probe(&self) -> bool {
        for path in PROBE_PATHS {
            let url = format!("{}{}", self.base_url, path);
            let ready = self
                .client
                .get(&url)
                .timeout(PROBE_TIMEOUT)
                .send()
                .await
                .map(|r| r.status().is_success())
                .unwrap_or(false);
            if ready {
                return true;
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sampling_follows_mode() {
        assert_eq!(sampling(InferenceMode::Realtime), (0.5, 0.9, 180));
        assert_eq!(sampling(InferenceMode::Reflection), (0.65, 0.95, 420));
    }

    #[test]
    fn chat_response_tolerates_missing_usage() {
        let body: ChatResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"content":"hi"}}]}"#).unwrap();
        assert_eq!(body.choices[0].message.content, "hi");
        assert!(body.usage.is_none());
    }

    #[test]
    fn base_url_is_normalized() {
        let backend = OpenAiCompatBackend::new("http://127.0.0.1:1234/", Duration::from_secs(1)).unwrap();
        assert_eq!(backend.base_url(), "http://127.0.0.1:1234");
    }
}
