use crate::error::{PeakCallError, Result};
use serde::{Deserialize, Serialize};

pub const P_VALUE: f64 = 0.00001;
pub const FRAGMENT_SIZE: usize = 300;
pub const MIN_FOLD_ENRICHMENT: f64 = 20f64;
pub const MAX_FOLD_ENRICHMENT: f64 = 100f64;
pub const REDUNDANCY_SIGNIFICANCE: f64 = 0.00001;
pub const MAX_SHIFT_SAMPLES: usize = 1000;
pub const SEED: u64 = 42;

/// The parameters of a single peak calling run.
/// It is created once, validated, and then passed by reference to every phase.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PeakCallConfig {
    /// Significance threshold of both the global and the local Poisson cutoffs.
    pub p_value: f64,
    /// The width of the scanning windows. Should be about the sonicated fragment size.
    pub fragment_size: usize,
    pub skip_deduplication: bool,
    /// Lower bound of the enrichment band of the high-confidence seeds, in fold of the average coverage.
    pub min_fold_enrichment: f64,
    pub max_fold_enrichment: f64,
    /// Tail probability of the binomial distribution used to cap duplicated reads.
    pub redundancy_significance: f64,
    /// How many seeds are used to estimate the fragment shift.
    pub max_shift_samples: usize,
    pub seed: u64,
}

impl PeakCallConfig {
    pub fn new(p_value: f64, fragment_size: usize, skip_deduplication: bool, seed: u64) -> Self {
        Self {
            p_value,
            fragment_size,
            skip_deduplication,
            seed,
            ..Default::default()
        }
    }
    pub fn with_fold_enrichment(mut self, min: f64, max: f64) -> Self {
        self.min_fold_enrichment = min;
        self.max_fold_enrichment = max;
        self
    }
    pub fn validate(&self) -> Result<()> {
        let is_prob = |p: f64| 0f64 < p && p < 1f64;
        if !is_prob(self.p_value) {
            let msg = format!("p-value must be in (0,1), found {}", self.p_value);
            return Err(PeakCallError::Configuration(msg));
        }
        if !is_prob(self.redundancy_significance) {
            let msg = format!(
                "redundancy significance must be in (0,1), found {}",
                self.redundancy_significance
            );
            return Err(PeakCallError::Configuration(msg));
        }
        if self.fragment_size == 0 {
            let msg = "fragment size must be positive".to_string();
            return Err(PeakCallError::Configuration(msg));
        }
        if !(0f64 <= self.min_fold_enrichment && self.min_fold_enrichment <= self.max_fold_enrichment)
        {
            let msg = format!(
                "fold enrichment band {}-{} is empty",
                self.min_fold_enrichment, self.max_fold_enrichment
            );
            return Err(PeakCallError::Configuration(msg));
        }
        if self.max_shift_samples == 0 {
            let msg = "at least one seed is needed to estimate the shift".to_string();
            return Err(PeakCallError::Configuration(msg));
        }
        Ok(())
    }
    /// Windows advance by half of their width.
    pub fn step_size(&self) -> usize {
        (self.fragment_size / 2).max(1)
    }
}

impl std::default::Default for PeakCallConfig {
    fn default() -> Self {
        Self {
            p_value: P_VALUE,
            fragment_size: FRAGMENT_SIZE,
            skip_deduplication: false,
            min_fold_enrichment: MIN_FOLD_ENRICHMENT,
            max_fold_enrichment: MAX_FOLD_ENRICHMENT,
            redundancy_significance: REDUNDANCY_SIGNIFICANCE,
            max_shift_samples: MAX_SHIFT_SAMPLES,
            seed: SEED,
        }
    }
}
