#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UtilityPolicyConfig {
    /// Minimum score required to select a candidate.
    ///
    /// If every candidate scores below this threshold the policy selects nothing, allowing
    /// fallbacks in higher-level control flow. Defaults to negative infinity (always select).
    pub min_score: f64,
}

impl Default for UtilityPolicyConfig {
    fn default() -> Self {
        Self {
            min_score: f64::NEG_INFINITY,
        }
    }
}

/// Outcome of one evaluation: the winner plus every candidate's score, in candidate order.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UtilitySelection<K> {
    pub key: K,
    pub score: f64,
    pub scores: Vec<(K, f64)>,
}

impl<K: Copy + PartialEq> UtilitySelection<K> {
    pub fn score_of(&self, key: K) -> Option<f64> {
        self.scores.iter().find(|(k, _)| *k == key).map(|(_, s)| *s)
    }
}

/// Argmax selection with NaN protection and stable ordering.
#[derive(Debug, Clone)]
pub struct UtilityPolicy<K> {
    config: UtilityPolicyConfig,
    last_choice: Option<K>,
    last_best_score: f64,
}

impl<K> Default for UtilityPolicy<K> {
    fn default() -> Self {
        Self {
            config: UtilityPolicyConfig::default(),
            last_choice: None,
            last_best_score: f64::NEG_INFINITY,
        }
    }
}

impl<K: Copy + PartialEq> UtilityPolicy<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, config: UtilityPolicyConfig) -> Self {
        self.config = config;
        self
    }

    pub fn last_choice(&self) -> Option<K> {
        self.last_choice
    }

    pub fn last_best_score(&self) -> f64 {
        self.last_best_score
    }

    /// Scores every candidate and returns the best one.
    ///
    /// A NaN score is treated as negative infinity so a broken consideration can never win.
    pub fn select<C: ?Sized>(
        &mut self,
        ctx: &C,
        candidates: &[K],
        mut score_fn: impl FnMut(K, &C) -> f64,
    ) -> Option<UtilitySelection<K>> {
        let mut scores = Vec::with_capacity(candidates.len());
        let mut best: Option<(K, f64)> = None;

        for &key in candidates {
            let raw = score_fn(key, ctx);
            let score = if raw.is_nan() { f64::NEG_INFINITY } else { raw };
            scores.push((key, score));
            match best {
                Some((_, best_score)) if score <= best_score => {}
                _ => best = Some((key, score)),
            }
        }

        self.last_best_score = best.map(|(_, s)| s).unwrap_or(f64::NEG_INFINITY);

        let Some((key, score)) = best else {
            self.last_choice = None;
            return None;
        };

        if score < self.config.min_score {
            self.last_choice = None;
            return None;
        }

        self.last_choice = Some(key);
        Some(UtilitySelection { key, score, scores })
    }
}
