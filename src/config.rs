//! Retrieval and segmentation options.
//!
//! Options are read from a JSON file when one exists (see
//! [`RetrievalConfig::from_file`]) and fall back to defaults tuned for
//! short technical documents.

use std::path::Path;

use serde::Deserialize;

use crate::error::{Error, Result};

/// Options consumed by the chunker, the index adapters and the fusion
/// engine.
///
/// # Examples
///
/// ```
/// use braid::config::RetrievalConfig;
///
/// let cfg = RetrievalConfig::default();
/// assert_eq!(cfg.child_max_size, 200);
/// assert_eq!(cfg.adaptive_k(), 20); // 4096 / 200, floored
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Maximum child chunk size in characters (advisory, not a hard cap).
    pub child_max_size: usize,
    /// Maximum parent chunk size in characters.
    pub parent_max_size: usize,
    /// Trailing characters of a closed child chunk seeded into the next one.
    pub overlap: usize,
    /// Ordered delimiters applied successively when splitting child chunks.
    pub child_delimiters: Vec<String>,
    /// Reserved. Accepted in configuration but not consulted by the
    /// segmentation algorithm.
    pub parent_delimiter: String,
    /// Per-adapter fan-out: candidates requested from each index before
    /// fusion. Distinct from the adaptive result count.
    pub top_k: usize,
    /// Fusion weight for the dense score, in [0, 1].
    pub lambda_hybrid: f32,
    /// Adaptive filter threshold multiplier, >= 0.
    pub gamma_filter: f32,
    /// Context budget in characters available for retrieved chunks.
    pub context_budget: usize,
    /// Expected size of a retrieved chunk in characters.
    pub expected_chunk_size: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            child_max_size: 200,
            parent_max_size: 500,
            overlap: 50,
            child_delimiters: vec![
                "\n".to_string(),
                ",".to_string(),
                ".".to_string(),
            ],
            parent_delimiter: "\n\n".to_string(),
            top_k: 3,
            lambda_hybrid: 0.5,
            gamma_filter: 1.0,
            context_budget: 4096,
            expected_chunk_size: 200,
        }
    }
}

impl RetrievalConfig {
    /// Load options from a JSON file and validate them.
    ///
    /// Unknown keys are ignored; missing keys take their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Check option ranges.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.lambda_hybrid) {
            return Err(Error::Config(format!(
                "lambda_hybrid must be within [0, 1], got {}",
                self.lambda_hybrid
            )));
        }
        if self.gamma_filter < 0.0 {
            return Err(Error::Config(format!(
                "gamma_filter must be >= 0, got {}",
                self.gamma_filter
            )));
        }
        if self.child_max_size == 0 {
            return Err(Error::Config(
                "child_max_size must be positive".into(),
            ));
        }
        if self.parent_max_size == 0 {
            return Err(Error::Config(
                "parent_max_size must be positive".into(),
            ));
        }
        if self.expected_chunk_size == 0 {
            return Err(Error::Config(
                "expected_chunk_size must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Result budget for one query: how many chunks of the expected size
    /// fit into the context budget, never less than 1.
    pub fn adaptive_k(&self) -> usize {
        (self.context_budget / self.expected_chunk_size.max(1)).max(1)
    }
}
