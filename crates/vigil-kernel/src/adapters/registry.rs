//! Model registry - the backends the router knows how to load.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Key of the OpenAI-compatible primary server.
pub const PRIMARY_KEY: &str = "local-server";
/// Fast local model, used for realtime and as the fixed fallback.
pub const FAST_KEY: &str = "fast-local";
/// Larger local model, used for reflection.
pub const DEEP_KEY: &str = "deep-local";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuntimeType {
    OpenAiCompatible,
    LocalTemplate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelProfile {
    pub context_length: u32,
    pub quantization: String,
    pub threads: u32,
    pub gpu_layers: u32,
    pub temperature: f64,
    pub top_p: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSpec {
    pub display_name: String,
    pub location: String,
    pub runtime: RuntimeType,
    pub profile: ModelProfile,
    pub tags: Vec<String>,
}

/// Known model specs by key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelRegistry {
    models: BTreeMap<String, ModelSpec>,
}

impl ModelRegistry {
    /// Default registry with the primary pointed at `primary_endpoint`.
    pub fn with_primary(primary_endpoint: &str) -> Self {
        let mut models = BTreeMap::new();
        models.insert(
            PRIMARY_KEY.to_string(),
            ModelSpec {
                display_name: "Local server active model".to_string(),
                location: primary_endpoint.trim_end_matches('/').to_string(),
                runtime: RuntimeType::OpenAiCompatible,
                profile: ModelProfile {
                    context_length: 8192,
                    quantization: "runtime".to_string(),
                    threads: 0,
                    gpu_layers: 0,
                    temperature: 0.55,
                    top_p: 0.92,
                },
                tags: vec!["realtime".to_string(), "quality".to_string()],
            },
        );
        models.insert(
            FAST_KEY.to_string(),
            ModelSpec {
                display_name: "Fast local model".to_string(),
                location: "models/fast-local.gguf".to_string(),
                runtime: RuntimeType::LocalTemplate,
                profile: ModelProfile {
                    context_length: 4096,
                    quantization: "Q4_K_M".to_string(),
                    threads: 8,
                    gpu_layers: 20,
                    temperature: 0.5,
                    top_p: 0.9,
                },
                tags: vec!["realtime".to_string(), "fast".to_string()],
            },
        );
        models.insert(
            DEEP_KEY.to_string(),
            ModelSpec {
                display_name: "Deep local model".to_string(),
                location: "models/deep-local.gguf".to_string(),
                runtime: RuntimeType::LocalTemplate,
                profile: ModelProfile {
                    context_length: 8192,
                    quantization: "Q4_K_M".to_string(),
                    threads: 12,
                    gpu_layers: 40,
                    temperature: 0.6,
                    top_p: 0.95,
                },
                tags: vec!["quality".to_string(), "reflection".to_string()],
            },
        );
        Self { models }
    }

    pub fn get(&self, key: &str) -> Option<&ModelSpec> {
        self.models.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.models.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.models.keys().map(String::as_str)
    }
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::with_primary("http://127.0.0.1:1234")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_registry_has_three_backends() {
        let registry = ModelRegistry::default();
        assert_eq!(registry.keys().count(), 3);
        assert_eq!(
            registry.get(PRIMARY_KEY).map(|s| s.runtime),
            Some(RuntimeType::OpenAiCompatible)
        );
        assert!(registry.contains(FAST_KEY));
        assert!(registry.contains(DEEP_KEY));
        assert!(!registry.contains("cloud"));
    }
}
