//! Backend router - picks a backend per request, probes the primary, falls back on failure.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use super::{
    sanitize_commands, BackendCommand, ContextPacket, Generation, InferenceMode, ModelRegistry,
    OpenAiCompatBackend, RuntimeType, TemplateBackend, TextBackend, DEEP_KEY, FAST_KEY,
    PRIMARY_KEY,
};
use crate::config::BackendConfig;
use crate::error::BackendError;

/// Latency samples kept for the status average.
const LATENCY_HISTORY: usize = 200;

/// Router settings persisted with the snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouterSettings {
    pub auto_mode: bool,
    pub forced_model: Option<String>,
    pub mode: InferenceMode,
    pub keep_warm: bool,
}

impl Default for RouterSettings {
    fn default() -> Self {
        Self {
            auto_mode: true,
            forced_model: None,
            mode: InferenceMode::Realtime,
            keep_warm: true,
        }
    }
}

impl RouterSettings {
    pub fn from_config(config: &BackendConfig) -> Self {
        Self {
            auto_mode: config.auto_mode,
            forced_model: config.forced_model.clone(),
            mode: config.mode,
            keep_warm: config.keep_warm,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplyMeta {
    pub latency_ms: f64,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub model: String,
    pub error: Option<String>,
}

/// What the router hands back. Never an error: failures end up in `meta.error`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouterReply {
    pub text: String,
    pub commands: Vec<BackendCommand>,
    pub meta: ReplyMeta,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouterStatus {
    pub auto_mode: bool,
    pub mode: InferenceMode,
    pub forced_model: Option<String>,
    pub active_model: String,
    pub loaded: Vec<String>,
    pub avg_latency_ms: f64,
    pub primary_available: bool,
}

/// Automatic-with-override backend selection.
pub struct BackendRouter {
    registry: ModelRegistry,
    settings: RouterSettings,
    overrides: BTreeMap<String, Arc<dyn TextBackend>>,
    loaded: BTreeMap<String, Arc<dyn TextBackend>>,
    active: Option<String>,
    latency: VecDeque<f64>,
    primary_available: bool,
    next_probe_at: Option<Instant>,
    probe_interval: Duration,
    request_timeout: Duration,
}

impl BackendRouter {
    pub fn new(config: &BackendConfig) -> Self {
        Self {
            registry: ModelRegistry::with_primary(&config.primary_endpoint),
            settings: RouterSettings::from_config(config),
            overrides: BTreeMap::new(),
            loaded: BTreeMap::new(),
            active: None,
            latency: VecDeque::new(),
            primary_available: true,
            next_probe_at: None,
            probe_interval: Duration::from_millis(config.probe_interval_ms),
            request_timeout: Duration::from_millis(config.request_timeout_ms),
        }
    }

    /// Serve `key` with a caller-supplied backend instead of the registry's runtime.
    pub fn with_backend(mut self, key: &str, backend: impl TextBackend + 'static) -> Self {
        self.overrides.insert(key.to_string(), Arc::new(backend));
        self
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    pub fn settings(&self) -> &RouterSettings {
        &self.settings
    }

    pub fn apply_settings(&mut self, settings: RouterSettings) {
        self.settings = settings;
    }

    pub fn mode(&self) -> InferenceMode {
        self.settings.mode
    }

    pub fn set_mode(&mut self, mode: InferenceMode) {
        self.settings.mode = mode;
    }

    /// Enabling automatic selection drops any forced key.
    pub fn set_auto(&mut self, enabled: bool) {
        self.settings.auto_mode = enabled;
        if enabled {
            self.settings.forced_model = None;
        }
    }

    pub fn force_model(&mut self, key: &str) -> Result<(), BackendError> {
        if !self.registry.contains(key) {
            return Err(BackendError::UnknownModel(key.to_string()));
        }
        self.settings.auto_mode = false;
        self.settings.forced_model = Some(key.to_string());
        Ok(())
    }

    pub fn primary_available(&self) -> bool {
        self.primary_available
    }

    pub fn latency_history(&self) -> &VecDeque<f64> {
        &self.latency
    }

    pub fn status(&self) -> RouterStatus {
        let avg = if self.latency.is_empty() {
            0.0
        } else {
            self.latency.iter().sum::<f64>() / self.latency.len() as f64
        };
        let active_model = self
            .active
            .as_deref()
            .and_then(|key| self.registry.get(key))
            .map(|spec| spec.display_name.clone())
            .unwrap_or_else(|| "none".to_string());
        RouterStatus {
            auto_mode: self.settings.auto_mode,
            mode: self.settings.mode,
            forced_model: self.settings.forced_model.clone(),
            active_model,
            loaded: self.loaded.keys().cloned().collect(),
            avg_latency_ms: (avg * 1000.0).round() / 1000.0,
            primary_available: self.primary_available,
        }
    }

    fn instantiate(&self, key: &str) -> Result<Arc<dyn TextBackend>, BackendError> {
        if let Some(backend) = self.overrides.get(key) {
            return Ok(Arc::clone(backend));
        }
        let spec = self
            .registry
            .get(key)
            .ok_or_else(|| BackendError::UnknownModel(key.to_string()))?;
        let backend: Arc<dyn TextBackend> = match spec.runtime {
            RuntimeType::OpenAiCompatible => {
                Arc::new(OpenAiCompatBackend::new(&spec.location, self.request_timeout)?)
            }
            RuntimeType::LocalTemplate => Arc::new(TemplateBackend::new(key)),
        };
        Ok(backend)
    }

    fn loaded_or_new(&mut self, key: &str) -> Result<Arc<dyn TextBackend>, BackendError> {
        if let Some(backend) = self.loaded.get(key) {
            return Ok(Arc::clone(backend));
        }
        let backend = self.instantiate(key)?;
        tracing::debug!(model = key, "backend loaded");
        self.loaded.insert(key.to_string(), Arc::clone(&backend));
        Ok(backend)
    }

    /// Load `key` and make it the active backend.
    fn activate(&mut self, key: &str) -> Result<Arc<dyn TextBackend>, BackendError> {
        let backend = self.loaded_or_new(key)?;
        self.active = Some(key.to_string());
        if !self.settings.keep_warm {
            self.loaded.retain(|k, _| k == key);
        }
        Ok(backend)
    }

    /// Re-check the primary, at most once per probe interval.
    async fn probe_primary(&mut self) -> bool {
        let now = Instant::now();
        if self.next_probe_at.is_some_and(|at| now < at) {
            return false;
        }
        self.next_probe_at = Some(now + self.probe_interval);

        let Ok(backend) = self.loaded_or_new(PRIMARY_KEY) else {
            return false;
        };
        if backend.probe().await {
            tracing::info!("primary backend reachable again");
            self.primary_available = true;
            return true;
        }
        false
    }

    /// Forced key, else the primary if reachable, else a local model by mode.
    pub async fn choose_key(&mut self, mode: InferenceMode) -> String {
        if !self.settings.auto_mode {
            if let Some(key) = &self.settings.forced_model {
                return key.clone();
            }
        }
        if self.primary_available || self.probe_primary().await {
            return PRIMARY_KEY.to_string();
        }
        match mode {
            InferenceMode::Realtime => FAST_KEY.to_string(),
            InferenceMode::Reflection => DEEP_KEY.to_string(),
        }
    }

    async fn call(
        backend: &dyn TextBackend,
        timeout: Duration,
        prompt: &str,
        mode: InferenceMode,
        context: &ContextPacket,
    ) -> Result<Generation, BackendError> {
        match tokio::time::timeout(timeout, backend.generate(prompt, mode, context)).await {
            Ok(result) => result,
            Err(_) => Err(BackendError::Timeout(timeout)),
        }
    }

    async fn attempt(
        &mut self,
        key: &str,
        prompt: &str,
        mode: InferenceMode,
        context: &ContextPacket,
    ) -> Result<Generation, BackendError> {
        let backend = self.activate(key)?;
        Self::call(backend.as_ref(), self.request_timeout, prompt, mode, context).await
    }

    /// Answer `prompt`. Any failure triggers one realtime attempt on the fast local model.
    pub async fn generate(
        &mut self,
        prompt: &str,
        mode: InferenceMode,
        context: &ContextPacket,
    ) -> RouterReply {
        let started = Instant::now();
        let target = self.choose_key(mode).await;

        let first = self.attempt(&target, prompt, mode, context).await;
        let (outcome, model, error) = match first {
            Ok(generation) => (Ok(generation), target, None),
            Err(e) => {
                tracing::warn!(model = %target, error = %e, "backend failed, falling back");
                if target == PRIMARY_KEY {
                    self.primary_available = false;
                    self.next_probe_at = Some(Instant::now() + self.probe_interval);
                }
                let fallback = self
                    .attempt(FAST_KEY, prompt, InferenceMode::Realtime, context)
                    .await;
                (fallback, FAST_KEY.to_string(), Some(format!("fallback:{e}")))
            }
        };

        let latency_ms = started.elapsed().as_secs_f64() * 1000.0;
        self.latency.push_back(latency_ms);
        while self.latency.len() > LATENCY_HISTORY {
            self.latency.pop_front();
        }

        match outcome {
            Ok(generation) => RouterReply {
                commands: sanitize_commands(&generation.commands),
                text: generation.text,
                meta: ReplyMeta {
                    latency_ms,
                    input_tokens: generation.input_tokens,
                    output_tokens: generation.output_tokens,
                    model,
                    error,
                },
            },
            Err(e) => {
                tracing::warn!(model = %model, error = %e, "fallback backend failed");
                let error = match error {
                    Some(first) => format!("{first}; {e}"),
                    None => e.to_string(),
                };
                RouterReply {
                    text: "I cannot answer right now.".to_string(),
                    commands: Vec::new(),
                    meta: ReplyMeta {
                        latency_ms,
                        input_tokens: 0,
                        output_tokens: 0,
                        model,
                        error: Some(error),
                    },
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct Down;

    #[async_trait]
    impl TextBackend for Down {
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

    fn router() -> BackendRouter {
        BackendRouter::new(&BackendConfig::default()).with_backend(PRIMARY_KEY, Down)
    }

    #[tokio::test]
    async fn forced_key_takes_precedence() {
        let mut router = router();
        router.force_model(DEEP_KEY).unwrap();
        assert_eq!(router.choose_key(InferenceMode::Realtime).await, DEEP_KEY);
        router.set_auto(true);
        assert_eq!(router.settings().forced_model, None);
        assert_eq!(router.choose_key(InferenceMode::Realtime).await, PRIMARY_KEY);
    }

    #[test]
    fn unknown_key_cannot_be_forced() {
        let mut router = router();
        assert!(matches!(
            router.force_model("cloud"),
            Err(BackendError::UnknownModel(_))
        ));
        assert!(router.settings().auto_mode);
    }

    #[tokio::test]
    async fn unavailable_primary_selects_local_by_mode() {
        let mut router = router();
        let ctx = ContextPacket::detached(InferenceMode::Realtime);
        let reply = router.generate("hello", InferenceMode::Realtime, &ctx).await;
        assert_eq!(reply.meta.model, FAST_KEY);
        assert!(!router.primary_available());

        // Probe interval has not elapsed and the probe fails anyway.
        assert_eq!(router.choose_key(InferenceMode::Reflection).await, DEEP_KEY);
        assert_eq!(router.choose_key(InferenceMode::Realtime).await, FAST_KEY);
    }

    #[tokio::test]
    async fn cold_router_drops_other_backends() {
        let mut router = router();
        router.apply_settings(RouterSettings {
            keep_warm: false,
            ..RouterSettings::default()
        });
        router.force_model(DEEP_KEY).unwrap();
        let ctx = ContextPacket::detached(InferenceMode::Reflection);
        router.generate("hi", InferenceMode::Reflection, &ctx).await;
        router.force_model(FAST_KEY).unwrap();
        router.generate("hi", InferenceMode::Realtime, &ctx).await;
        assert_eq!(router.status().loaded, vec![FAST_KEY.to_string()]);
    }
}
