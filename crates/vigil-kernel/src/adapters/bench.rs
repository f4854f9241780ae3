//! Quick evaluation harness for the active backend.

use serde::Serialize;

use super::{BackendRouter, ContextPacket};

pub const EVAL_PROMPTS: [&str; 5] = [
    "natural refusal",
    "risk negotiation",
    "journal summary",
    "idea proposal",
    "personality consistency",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuickEvalRow {
    pub prompt: String,
    pub latency_ms: f64,
    pub length: usize,
    pub coherence: f64,
    pub model: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuickEvalReport {
    pub tests: Vec<QuickEvalRow>,
    pub avg_latency_ms: f64,
    pub avg_length: f64,
    pub avg_coherence: f64,
}

/// Runs the fixed prompts through `router` in its current mode.
pub async fn quick_eval(router: &mut BackendRouter) -> QuickEvalReport {
    let mode = router.mode();
    let ctx = ContextPacket::detached(mode);
    let mut tests = Vec::with_capacity(EVAL_PROMPTS.len());

    for prompt in EVAL_PROMPTS {
        let reply = router.generate(prompt, mode, &ctx).await;
        let coherence = if reply.text.trim().is_empty() { 0.0 } else { 1.0 };
        tests.push(QuickEvalRow {
            prompt: prompt.to_string(),
            latency_ms: reply.meta.latency_ms,
            length: reply.text.chars().count(),
            coherence,
            model: reply.meta.model,
        });
    }

    let n = tests.len() as f64;
    QuickEvalReport {
        avg_latency_ms: tests.iter().map(|r| r.latency_ms).sum::<f64>() / n,
        avg_length: tests.iter().map(|r| r.length as f64).sum::<f64>() / n,
        avg_coherence: tests.iter().map(|r| r.coherence).sum::<f64>() / n,
        tests,
    }
}
