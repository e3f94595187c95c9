//! Size estimation for budget accounting
//!
//! The budget is expressed in approximate tokens. No tokenizer is loaded; the
//! estimate is a fixed character ratio so results are deterministic and
//! independent of locale.

use serde::Serialize;

/// Token estimator trait for different estimation strategies
pub trait TokenEstimator: Send + Sync {
    /// Estimate the number of budget units in the given text
    fn estimate(&self, text: &str) -> usize;

    /// Estimate a structured value on its compact JSON serialization
    fn estimate_json<T: Serialize + ?Sized>(&self, value: &T) -> serde_json::Result<usize>
    where
        Self: Sized,
    {
        Ok(self.estimate(&serde_json::to_string(value)?))
    }
}

/// Character-ratio estimator: one unit per `chars_per_unit` characters, truncated
#[derive(Debug, Clone, Copy)]
pub struct CharRatioEstimator {
    chars_per_unit: usize,
}

impl CharRatioEstimator {
    pub fn new(chars_per_unit: usize) -> Self {
        Self {
            chars_per_unit: chars_per_unit.max(1),
        }
    }
}

impl Default for CharRatioEstimator {
    fn default() -> Self {
        Self::new(4)
    }
}

impl TokenEstimator for CharRatioEstimator {
    fn estimate(&self, text: &str) -> usize {
        text.chars().count() / self.chars_per_unit
    }
}

/// Estimate with the default four-characters-per-unit ratio
pub fn estimate(text: &str) -> usize {
    CharRatioEstimator::default().estimate(text)
}
