//! The grading engine.
//!
//! PIPELINE (fixed order):
//!   1. Score      raw records → scored population
//!   2. Tier       optimizer search, or manual thresholds
//!   3. Summarize  tier table, district rollups, rule compliance
//!   4. Record     run record filed under a business date
//!   5. Commit     optional; replaces whatever the store holds for that date
//!
//! RULES:
//!   - The engine owns no global state; every run is independent.
//!   - Only `commit` touches the store. Preview never builds a record.

use crate::{
    allocator::{assign_by_thresholds, ThresholdMap},
    config::GradingConfig,
    error::GradingResult,
    optimizer::{optimize_tiers, Optimization},
    population::{LicenseRecord, ScoredPopulation, TieredPopulation},
    report::{summarize, Summary},
    rules::RuleEvaluator,
    run::{GradingMethod, RunRecord},
    scoring::compute_scores,
    store::GradingStore,
};
use chrono::NaiveDate;

pub struct GradingEngine {
    pub config: GradingConfig,
}

impl GradingEngine {
    pub fn new(config: GradingConfig) -> GradingResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn score(&self, records: Vec<LicenseRecord>) -> GradingResult<ScoredPopulation> {
        compute_scores(records)
    }

    pub fn optimize(&self, scored: &ScoredPopulation) -> GradingResult<Optimization> {
        optimize_tiers(scored, &self.config)
    }

    pub fn assign_thresholds(&self, scored: &ScoredPopulation, thresholds: &ThresholdMap) -> TieredPopulation {
        assign_by_thresholds(scored, thresholds)
    }

    pub fn summarize(&self, tiered: &TieredPopulation) -> GradingResult<Summary> {
        summarize(tiered, &self.config)
    }

    /// Score, optimize and summarize. Nothing is persisted.
    pub fn run_optimized(
        &self,
        records: Vec<LicenseRecord>,
        date_key: NaiveDate,
    ) -> GradingResult<(RunRecord, Summary)> {
        log::info!("engine: optimized run for {date_key} over {} records", records.len());
        let scored = self.score(records)?;
        let optimization = self.optimize(&scored)?;
        let summary = self.summarize(&optimization.tiered)?;

        let method = GradingMethod::Optimized {
            shifts:    optimization.shifts,
            score:     optimization.score,
            evaluated: optimization.evaluated,
            grid_size: optimization.grid_size,
            cancelled: optimization.cancelled,
        };
        let record = RunRecord::new(date_key, method, optimization.tiered, optimization.metrics);
        log::info!(
            "engine: run {} ready, mandatory rules {}",
            record.run_id,
            if summary.compliance.mandatory_passed() { "met" } else { "NOT met" }
        );
        Ok((record, summary))
    }

    /// Score and tier by manual thresholds. Nothing is persisted.
    pub fn run_thresholds(
        &self,
        records: Vec<LicenseRecord>,
        thresholds: &ThresholdMap,
        date_key: NaiveDate,
    ) -> GradingResult<(RunRecord, Summary)> {
        log::info!(
            "engine: threshold run for {date_key} over {} records, {} thresholds",
            records.len(),
            thresholds.len()
        );
        let scored = self.score(records)?;
        let tiered = self.assign_thresholds(&scored, thresholds);
        let summary = self.summarize(&tiered)?;
        let metrics = RuleEvaluator::new(&self.config).evaluate(tiered.scored().entities(), tiered.tiers());

        let method = GradingMethod::Thresholds {
            thresholds: thresholds.clone(),
        };
        Ok((RunRecord::new(date_key, method, tiered, metrics), summary))
    }

    /// Threshold tiering and its summary, without a run record.
    pub fn preview_thresholds(
        &self,
        records: Vec<LicenseRecord>,
        thresholds: &ThresholdMap,
    ) -> GradingResult<(TieredPopulation, Summary)> {
        let scored = self.score(records)?;
        let tiered = self.assign_thresholds(&scored, thresholds);
        let summary = self.summarize(&tiered)?;
        log::debug!("engine: previewed {} thresholds over {} records", thresholds.len(), tiered.len());
        Ok((tiered, summary))
    }

    /// Persist a run; replaces any rows already stored for its date.
    pub fn commit(&self, store: &GradingStore, record: &RunRecord, summary: &Summary) -> GradingResult<()> {
        store.save_run(record, summary)
    }
}
