//! Score calculator: indicator values to sub-scores, total score and ranks.
//!
//! Purchase score:     (2 − purchase_rank / N) × 40
//! Non-purchase score: credit + five inspection scores + transaction + environment
//! Total score:        purchase score + non-purchase score
//!
//! Missing or unparseable indicators contribute 0. Scoring never fails on a
//! bad cell; only an empty population is rejected.

use crate::{
    error::{GradingError, GradingResult},
    population::{LicenseRecord, ScoreCard, ScoredEntity, ScoredPopulation},
    ranking::competition_rank,
    tier::parse_tier_label,
    types::DistrictKey,
};

const PURCHASE_SCORE_SCALE: f64 = 40.0;
const DISTRICT_PREFIX_CHARS: usize = 2;

/// Score every record. Pure: the result depends only on the input values.
pub fn compute_scores(records: Vec<LicenseRecord>) -> GradingResult<ScoredPopulation> {
    if records.is_empty() {
        return Err(GradingError::EmptyPopulation);
    }
    let population_size = records.len() as f64;

    let purchase_values: Vec<f64> = records
        .iter()
        .map(|r| r.purchase_amount.unwrap_or(0.0))
        .collect();
    let purchase_ranks = competition_rank(&purchase_values);

    let mut entities: Vec<ScoredEntity> = records
        .into_iter()
        .zip(purchase_ranks)
        .map(|(record, purchase_rank)| {
            let purchase_score = purchase_score(purchase_rank, population_size);
            let credit_score = credit_score(record.credit_rating.as_deref());
            let transaction_score = transaction_score(record.transaction_data);
            let non_purchase_score = credit_score
                + inspection_total(&record)
                + transaction_score
                + record.consumption_env.unwrap_or(0.0);

            ScoredEntity {
                previous_tier: parse_tier_label(&record.previous_grade),
                district: district_of(&record.marketing_route),
                scores: ScoreCard {
                    purchase_rank,
                    purchase_score,
                    credit_score,
                    transaction_score,
                    non_purchase_score,
                    total: purchase_score + non_purchase_score,
                    total_rank: 0,
                },
                record,
            }
        })
        .collect();

    let totals: Vec<f64> = entities.iter().map(|e| e.scores.total).collect();
    for (entity, rank) in entities.iter_mut().zip(competition_rank(&totals)) {
        entity.scores.total_rank = rank;
    }

    log::debug!(
        "scoring: {} entities, best total {:.3}",
        entities.len(),
        totals.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    );

    ScoredPopulation::new(entities)
}

/// Strictly decreasing in rank; rank 1 gives (2 − 1/N) × 40.
pub fn purchase_score(rank: u32, population_size: f64) -> f64 {
    (2.0 - rank as f64 / population_size) * PURCHASE_SCORE_SCALE
}

/// Credit category lookup. Unknown or missing categories score 0.
pub fn credit_score(category: Option<&str>) -> f64 {
    let Some(raw) = category else { return 0.0 };
    match raw.trim().to_uppercase().as_str() {
        "AAA" | "AA" | "A" => 6.0,
        "B" => 4.0,
        "C" => 2.0,
        _ => 0.0,
    }
}

/// Piecewise lookup over the transaction-data indicator.
///
/// [60, 85) and [0, 60) both score 1. The rule table has always read this
/// way; keep the two ranges separate until the owners confirm intent.
pub fn transaction_score(value: Option<f64>) -> f64 {
    let Some(v) = value else { return 0.0 };
    if (98.0..101.0).contains(&v) {
        5.0
    } else if (95.0..98.0).contains(&v) {
        4.0
    } else if (90.0..95.0).contains(&v) {
        3.0
    } else if (85.0..90.0).contains(&v) {
        2.0
    } else if (60.0..85.0).contains(&v) {
        1.0
    } else if (0.0..60.0).contains(&v) {
        1.0
    } else if v >= 101.0 {
        5.0
    } else {
        0.0
    }
}

/// District key: the first two characters of the route, unvalidated.
pub fn district_of(route: &str) -> DistrictKey {
    route.chars().take(DISTRICT_PREFIX_CHARS).collect()
}

fn inspection_total(record: &LicenseRecord) -> f64 {
    [
        record.counter_display,
        record.placement_rule,
        record.damage_fading,
        record.theme_display,
        record.price_tagging,
    ]
    .iter()
    .map(|v| v.unwrap_or(0.0))
    .sum()
}
