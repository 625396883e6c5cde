//! Solver configuration.

/// Configuration for the rule-by-rule swap search.
///
/// # Examples
///
/// ```
/// use u_cohort::search::SolverConfig;
///
/// let config = SolverConfig::default()
///     .with_max_retries(10)
///     .with_mixing_swaps(40)
///     .with_seed(42);
/// assert_eq!(config.max_retries, 10);
/// ```
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SolverConfig {
    /// Extra repair passes per rule after the first one fails.
    pub max_retries: usize,

    /// Random swaps attempted between repair passes.
    ///
    /// Mixing only performs swaps that every already bound rule permits.
    pub mixing_swaps: usize,

    /// Random seed for reproducibility.
    pub seed: Option<u64>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            mixing_swaps: 20,
            seed: None,
        }
    }
}

impl SolverConfig {
    pub fn with_max_retries(mut self, n: usize) -> Self {
        self.max_retries = n;
        self
    }

    pub fn with_mixing_swaps(mut self, n: usize) -> Self {
        self.mixing_swaps = n;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Repair passes per rule, first attempt included.
    pub fn passes(&self) -> usize {
        self.max_retries + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SolverConfig::default();
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.mixing_swaps, 20);
        assert_eq!(config.passes(), 6);
        assert!(config.seed.is_none());
    }

    #[test]
    fn test_builder() {
        let config = SolverConfig::default().with_max_retries(0).with_seed(3);
        assert_eq!(config.passes(), 1);
        assert_eq!(config.seed, Some(3));
    }
}
