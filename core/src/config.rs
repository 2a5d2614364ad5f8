//! Grading configuration.
//!
//! Every knob has a default matching the production rule set, so a missing
//! or partial JSON file still yields a complete config.

use serde::{Deserialize, Serialize};

/// Normal reference shape used for within-band weighting and the shape
/// correlation check.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShapeConfig {
    pub mean:    f64,
    pub std_dev: f64,
}

impl Default for ShapeConfig {
    fn default() -> Self {
        Self { mean: 15.0, std_dev: 7.0 }
    }
}

/// Composite-score weights for the boundary optimizer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectiveWeights {
    /// Added once per satisfied mandatory rule.
    pub hard_bonus:          f64,
    /// Added once per satisfied preferred rule.
    pub soft_bonus:          f64,
    /// Multiplies the shape correlation.
    pub correlation_weight:  f64,
    /// Multiplies (upgrades − downgrades).
    pub margin_weight:       f64,
    /// Subtracted when any mandatory rule fails.
    pub infeasible_penalty:  f64,
}

impl Default for ObjectiveWeights {
    fn default() -> Self {
        Self {
            hard_bonus:         1e9,
            soft_bonus:         5e6,
            correlation_weight: 1e6,
            margin_weight:      1.0,
            infeasible_penalty: 1e10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GradingConfig {
    /// Candidate offsets per cutpoint; the grid is their 4-fold product.
    pub shift_options:       Vec<f64>,
    /// Allowed deviation of a band share from its target (0.001 = ±0.1 pp).
    pub band_tolerance:      f64,
    pub shape:               ShapeConfig,
    /// Preferred floor on the smallest tier's population share.
    pub min_tier_share:      f64,
    /// Preferred floor on the shape correlation (strictly exceeded).
    pub correlation_floor:   f64,
    /// Reference band for the weighted-indicator change rate.
    pub change_rate_limit:   f64,
    pub objective:           ObjectiveWeights,
    /// Stop starting new candidates after this many milliseconds.
    pub deadline_ms:         Option<u64>,
    /// Worker threads for the grid search. 0 = rayon default.
    pub workers:             usize,
}

impl Default for GradingConfig {
    fn default() -> Self {
        Self {
            shift_options:     vec![-0.001, -0.0009, -0.0005, 0.0, 0.0005, 0.0009, 0.001],
            band_tolerance:    0.001,
            shape:             ShapeConfig::default(),
            min_tier_share:    0.01,
            correlation_floor: 0.8,
            change_rate_limit: 0.05,
            objective:         ObjectiveWeights::default(),
            deadline_ms:       None,
            workers:           0,
        }
    }
}

impl GradingConfig {
    /// Load from a JSON file. Fields absent from the file keep their defaults.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: GradingConfig = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {path}: {e}"))?;
        config.validate()?;
        Ok(config)
    }

    /// Config with a reduced shift grid for fast unit tests.
    pub fn default_test() -> Self {
        Self {
            shift_options: vec![-0.001, 0.0, 0.001],
            ..Self::default()
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.shift_options.is_empty() {
            anyhow::bail!("shift_options must not be empty");
        }
        if self.shift_options.iter().any(|s| !s.is_finite()) {
            anyhow::bail!("shift_options must be finite");
        }
        if self.shape.std_dev.is_nan() || self.shape.std_dev <= 0.0 {
            anyhow::bail!("shape.std_dev must be positive, got {}", self.shape.std_dev);
        }
        if self.band_tolerance < 0.0 {
            anyhow::bail!("band_tolerance must be non-negative");
        }
        Ok(())
    }

    /// Number of candidates the optimizer will enumerate.
    pub fn grid_size(&self) -> usize {
        self.shift_options.len().pow(4)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_file_matches_defaults() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../data/grading_config.json");
        let config = GradingConfig::load(path).unwrap();
        let defaults = GradingConfig::default();
        assert_eq!(config.grid_size(), defaults.grid_size());
        for (loaded, default) in config.shift_options.iter().zip(&defaults.shift_options) {
            assert!((loaded - default).abs() < 1e-12, "shift option {loaded} vs {default}");
        }
        assert_eq!(config.shape, defaults.shape);
        assert_eq!(config.objective, defaults.objective);
        assert_eq!(config.deadline_ms, None);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config: GradingConfig = serde_json::from_str(r#"{"workers": 4, "shape": {"std_dev": 5.0}}"#).unwrap();
        assert_eq!(config.workers, 4);
        assert_eq!(config.shape.mean, 15.0);
        assert_eq!(config.shape.std_dev, 5.0);
        assert_eq!(config.band_tolerance, 0.001);
    }

    #[test]
    fn rejects_bad_values() {
        let config = GradingConfig {
            shape: ShapeConfig { mean: 15.0, std_dev: 0.0 },
            ..GradingConfig::default()
        };
        assert!(config.validate().is_err());
        assert!(GradingConfig::load("/nonexistent/grading.json").is_err());
    }
}
