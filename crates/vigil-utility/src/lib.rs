//! Utility AI selection primitives.
//!
//! The core idea is simple: on each decision, score a set of candidates and pick the
//! highest-scoring one. Tie-breaking is stable by candidate order for determinism; callers that
//! want exploration add their own noise term to the score.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod policy;

pub use policy::{UtilityPolicy, UtilityPolicyConfig, UtilitySelection};
