use std::time::Duration;

use async_trait::async_trait;
use vigil_kernel::adapters::{
    quick_eval, BackendCommand, ContextPacket, Generation, InferenceMode, RawCommand,
    TemplateBackend, TextBackend, EVAL_PROMPTS, FAST_KEY, PRIMARY_KEY,
};
use vigil_kernel::config::BackendConfig;
use vigil_kernel::{BackendError, BackendRouter};

struct Refused;

#[async_trait]
impl TextBackend for Refused {
    async fn generate(
        &self,
        _prompt: &str,
        _mode: InferenceMode,
        _context: &ContextPacket,
    ) -> Result<Generation, BackendError> {
        Err(BackendError::Transport("connection refused".to_string()))
    }

    async fn probe(&self) -> bool {
        false
    }
}

struct Slow;

#[async_trait]
impl TextBackend for Slow {
    async fn generate(
        &self,
        _prompt: &str,
        _mode: InferenceMode,
        _context: &ContextPacket,
    ) -> Result<Generation, BackendError> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok(Generation::default())
    }
}

struct Chatty;

#[async_trait]
impl TextBackend for Chatty {
    async fn generate(
        &self,
        _prompt: &str,
        _mode: InferenceMode,
        _context: &ContextPacket,
    ) -> Result<Generation, BackendError> {
        Ok(Generation {
            text: "done".to_string(),
            commands: vec![
                RawCommand::new("DELETE_EVERYTHING"),
                RawCommand::new("SET_INTENTION"),
                RawCommand::with_value("SET_INTENTION", "recover"),
                RawCommand::new("PAUSE"),
            ],
            input_tokens: 3,
            output_tokens: 1,
        })
    }
}

fn config() -> BackendConfig {
    BackendConfig {
        request_timeout_ms: 50,
        ..BackendConfig::default()
    }
}

#[tokio::test]
async fn failing_primary_falls_back_once() {
    let mut router = BackendRouter::new(&config()).with_backend(PRIMARY_KEY, Refused);
    let ctx = ContextPacket::detached(InferenceMode::Reflection);

    let reply = router.generate("hello", InferenceMode::Reflection, &ctx).await;
    assert_eq!(reply.meta.model, FAST_KEY);
    let error = reply.meta.error.unwrap();
    assert!(error.starts_with("fallback:"));
    assert!(error.contains("connection refused"));
    assert!(!reply.text.is_empty());
    assert!(!router.primary_available());
    assert_eq!(router.latency_history().len(), 1);
}

#[tokio::test]
async fn slow_backend_times_out_into_fallback() {
    let mut router = BackendRouter::new(&config()).with_backend(PRIMARY_KEY, Slow);
    let ctx = ContextPacket::detached(InferenceMode::Realtime);

    let reply = router.generate("hello", InferenceMode::Realtime, &ctx).await;
    assert_eq!(reply.meta.model, FAST_KEY);
    assert!(reply.meta.error.unwrap().contains("timed out"));
}

#[tokio::test]
async fn fallback_failure_is_reported_not_raised() {
    let mut router = BackendRouter::new(&config())
        .with_backend(PRIMARY_KEY, Refused)
        .with_backend(FAST_KEY, Refused);
    let ctx = ContextPacket::detached(InferenceMode::Realtime);

    let reply = router.generate("hello", InferenceMode::Realtime, &ctx).await;
    assert!(reply.commands.is_empty());
    assert!(reply.meta.error.is_some());
}

#[tokio::test]
async fn commands_outside_the_allow_list_are_dropped() {
    let mut router = BackendRouter::new(&config()).with_backend(PRIMARY_KEY, Chatty);
    let ctx = ContextPacket::detached(InferenceMode::Realtime);

    let reply = router.generate("anything", InferenceMode::Realtime, &ctx).await;
    assert_eq!(reply.meta.model, PRIMARY_KEY);
    assert_eq!(reply.meta.error, None);
    assert_eq!(
        reply.commands,
        vec![
            BackendCommand::SetIntention("recover".to_string()),
            BackendCommand::Pause,
        ]
    );
}

#[tokio::test]
async fn quick_eval_covers_every_prompt() {
    let mut router = BackendRouter::new(&config())
        .with_backend(PRIMARY_KEY, TemplateBackend::new(PRIMARY_KEY));

    let report = quick_eval(&mut router).await;
    assert_eq!(report.tests.len(), EVAL_PROMPTS.len());
    assert_eq!(report.avg_coherence, 1.0);
    assert!(report.avg_length > 0.0);
    assert_eq!(router.status().active_model, "Local server active model");
}
