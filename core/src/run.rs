//! Versioned run records.
//!
//! A run record is the unit handed from the engine to the store: who ran,
//! for which date key, how the tiers were chosen, the tiered population and
//! the rule metrics that went with it. Nothing is kept in process-global
//! state between runs.

use crate::{
    allocator::{ShiftSet, ThresholdMap},
    population::TieredPopulation,
    rules::RuleMetrics,
    types::RunId,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// How the tiers of a run were chosen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GradingMethod {
    Optimized {
        shifts:    ShiftSet,
        score:     f64,
        evaluated: usize,
        grid_size: usize,
        cancelled: bool,
    },
    Thresholds {
        #[serde(with = "threshold_pairs")]
        thresholds: ThresholdMap,
    },
}

/// Thresholds as `[tier, score]` pairs. Internally tagged enums buffer their
/// content, and buffered JSON object keys only ever come back as strings.
mod threshold_pairs {
    use crate::allocator::ThresholdMap;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(map: &ThresholdMap, serializer: S) -> Result<S::Ok, S::Error> {
        let pairs: Vec<(i64, f64)> = map.iter().map(|(k, v)| (*k, *v)).collect();
        pairs.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<ThresholdMap, D::Error> {
        let pairs = Vec::<(i64, f64)>::deserialize(deserializer)?;
        Ok(pairs.into_iter().collect())
    }
}

impl GradingMethod {
    pub fn name(&self) -> &'static str {
        match self {
            GradingMethod::Optimized { .. }  => "optimized",
            GradingMethod::Thresholds { .. } => "thresholds",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id:     RunId,
    /// Business date the run is filed under. One stored run per date.
    pub date_key:   NaiveDate,
    pub created_at: DateTime<Utc>,
    pub method:     GradingMethod,
    pub tiered:     TieredPopulation,
    pub metrics:    RuleMetrics,
}

impl RunRecord {
    pub fn new(
        date_key: NaiveDate,
        method: GradingMethod,
        tiered: TieredPopulation,
        metrics: RuleMetrics,
    ) -> Self {
        Self {
            run_id: format!("grade-{}", uuid::Uuid::new_v4()),
            date_key,
            created_at: Utc::now(),
            method,
            tiered,
            metrics,
        }
    }

    /// Date key in the `YYYY-MM-DD` form used by the store.
    pub fn date_str(&self) -> String {
        self.date_key.format("%Y-%m-%d").to_string()
    }
}
