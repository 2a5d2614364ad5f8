//! Aggregation over a finalized tiering: tier table, district rollups and a
//! rule-compliance report.
//!
//! Everything here is recomputed from the tiered population itself, so the
//! report is correct even when the optimizer's metrics were never persisted.

use crate::{
    config::GradingConfig,
    error::{GradingError, GradingResult},
    population::TieredPopulation,
    rules::{RuleEvaluator, RuleFlags, RuleMetrics},
    tier::{tier_label, tiers_descending, BANDS},
    types::{DistrictKey, Tier, TIER_MAX, TIER_MIN},
};
use serde::Serialize;
use std::collections::BTreeMap;

/// Score range and occupancy of one tier under one tiering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct TierStats {
    pub min_score: f64,
    pub max_score: f64,
    pub count:     usize,
    pub share:     f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TierSummaryRow {
    pub tier:           Tier,
    pub label:          String,
    /// Lowest total score that landed in this tier.
    pub cut_line:       f64,
    /// Same tier number under the previous tiering.
    pub before:         TierStats,
    pub after:          TierStats,
    /// Entities in this tier whose previous tier was lower.
    pub upgrades:       usize,
    pub upgrade_rate:   f64,
    /// Entities in this tier whose previous tier was higher.
    pub downgrades:     usize,
    pub downgrade_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistrictSummaryRow {
    pub district:       DistrictKey,
    pub total:          usize,
    pub upgrades:       usize,
    pub downgrades:     usize,
    pub upgrade_rate:   f64,
    pub downgrade_rate: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct DistrictTierRow {
    pub tier:       Tier,
    pub count:      usize,
    pub upgrades:   usize,
    pub downgrades: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    Mandatory,
    Preferred,
    /// Reported for information; never affects selection.
    Reference,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleCheck {
    pub rule:   String,
    pub kind:   RuleKind,
    pub detail: String,
    pub passed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComplianceReport {
    pub checks:  Vec<RuleCheck>,
    pub metrics: RuleMetrics,
}

impl ComplianceReport {
    pub fn flags(&self) -> RuleFlags {
        self.metrics.flags
    }

    pub fn mandatory_passed(&self) -> bool {
        self.checks
            .iter()
            .filter(|c| c.kind == RuleKind::Mandatory)
            .all(|c| c.passed)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    /// Tiers 30 down to 1.
    pub tiers:          Vec<TierSummaryRow>,
    /// Sorted by district key.
    pub districts:      Vec<DistrictSummaryRow>,
    /// Per district, tiers 1 up to 30.
    pub district_tiers: BTreeMap<DistrictKey, Vec<DistrictTierRow>>,
    pub compliance:     ComplianceReport,
}

/// Summarize a tiered population. Pure; calling it twice yields equal output.
pub fn summarize(tiered: &TieredPopulation, config: &GradingConfig) -> GradingResult<Summary> {
    if tiered.is_empty() {
        return Err(GradingError::EmptyPopulation);
    }
    let metrics = RuleEvaluator::new(config).evaluate(tiered.scored().entities(), tiered.tiers());

    Ok(Summary {
        tiers:          tier_rows(tiered),
        districts:      district_rows(tiered),
        district_tiers: district_tier_rows(tiered),
        compliance:     compliance_report(metrics, config),
    })
}

fn rate(part: usize, whole: usize) -> f64 {
    if whole > 0 {
        part as f64 / whole as f64
    } else {
        0.0
    }
}

fn stats_for(scores: impl Iterator<Item = f64>, population: usize) -> TierStats {
    let mut stats = TierStats::default();
    for score in scores {
        if stats.count == 0 {
            stats.min_score = score;
            stats.max_score = score;
        } else {
            stats.min_score = stats.min_score.min(score);
            stats.max_score = stats.max_score.max(score);
        }
        stats.count += 1;
    }
    stats.share = rate(stats.count, population);
    stats
}

fn tier_rows(tiered: &TieredPopulation) -> Vec<TierSummaryRow> {
    let population = tiered.len();
    tiers_descending()
        .map(|tier| {
            let after = stats_for(
                tiered.iter().filter(|(_, t)| *t == tier).map(|(e, _)| e.scores.total),
                population,
            );
            let before = stats_for(
                tiered
                    .iter()
                    .filter(|(e, _)| e.previous_tier == tier)
                    .map(|(e, _)| e.scores.total),
                population,
            );
            let upgrades = tiered
                .iter()
                .filter(|(e, t)| *t == tier && e.previous_tier < tier)
                .count();
            let downgrades = tiered
                .iter()
                .filter(|(e, t)| *t == tier && e.previous_tier > tier)
                .count();

            TierSummaryRow {
                tier,
                label: tier_label(tier),
                cut_line: after.min_score,
                before,
                after,
                upgrades,
                upgrade_rate: rate(upgrades, after.count),
                downgrades,
                downgrade_rate: rate(downgrades, after.count),
            }
        })
        .collect()
}

fn district_rows(tiered: &TieredPopulation) -> Vec<DistrictSummaryRow> {
    let mut tallies: BTreeMap<&str, (usize, usize, usize)> = BTreeMap::new();
    for (entity, tier) in tiered.iter() {
        let entry = tallies.entry(entity.district.as_str()).or_default();
        entry.0 += 1;
        if tier > entity.previous_tier {
            entry.1 += 1;
        } else if tier < entity.previous_tier {
            entry.2 += 1;
        }
    }

    tallies
        .into_iter()
        .map(|(district, (total, upgrades, downgrades))| DistrictSummaryRow {
            district: district.to_string(),
            total,
            upgrades,
            downgrades,
            upgrade_rate: rate(upgrades, total),
            downgrade_rate: rate(downgrades, total),
        })
        .collect()
}

fn district_tier_rows(tiered: &TieredPopulation) -> BTreeMap<DistrictKey, Vec<DistrictTierRow>> {
    let mut detail: BTreeMap<DistrictKey, Vec<DistrictTierRow>> = BTreeMap::new();
    for (entity, tier) in tiered.iter() {
        let rows = detail.entry(entity.district.clone()).or_insert_with(|| {
            (TIER_MIN..=TIER_MAX)
                .map(|t| DistrictTierRow { tier: t, ..DistrictTierRow::default() })
                .collect()
        });
        let row = &mut rows[(tier - TIER_MIN) as usize];
        row.count += 1;
        if entity.previous_tier < tier {
            row.upgrades += 1;
        } else if entity.previous_tier > tier {
            row.downgrades += 1;
        }
    }
    detail
}

/// Render a fraction as a percentage with two decimals, e.g. `9.10%`.
pub fn percent(fraction: f64) -> String {
    format!("{:.2}%", fraction * 100.0)
}

fn compliance_report(metrics: RuleMetrics, config: &GradingConfig) -> ComplianceReport {
    let flags = metrics.flags;
    let mut checks = Vec::with_capacity(BANDS.len() + 6);

    for (i, band) in BANDS.iter().enumerate() {
        checks.push(RuleCheck {
            rule:   format!("band_{}", band.label.to_ascii_lowercase()),
            kind:   RuleKind::Mandatory,
            detail: format!(
                "tiers {}-{} share {} (target {} ± {})",
                band.bottom,
                band.top,
                percent(metrics.band_shares[i]),
                percent(band.target_share),
                percent(config.band_tolerance)
            ),
            passed: metrics.band_on_target[i],
        });
    }

    checks.push(RuleCheck {
        rule:   "tier_occupancy".into(),
        kind:   RuleKind::Mandatory,
        detail: format!("smallest tier holds {} (must be > 0)", metrics.min_tier_count),
        passed: flags.all_tiers_occupied,
    });
    checks.push(RuleCheck {
        rule:   "tier_share_floor".into(),
        kind:   RuleKind::Preferred,
        detail: format!(
            "smallest occupied tier share {} (target >= {})",
            percent(metrics.min_tier_share),
            percent(config.min_tier_share)
        ),
        passed: flags.min_share_floor,
    });
    checks.push(RuleCheck {
        rule:   "net_upgrade".into(),
        kind:   RuleKind::Mandatory,
        detail: format!(
            "upgrades {} vs downgrades {} (upgrades must be >= downgrades)",
            metrics.upgrades, metrics.downgrades
        ),
        passed: flags.net_upgrade,
    });
    checks.push(RuleCheck {
        rule:   "shape_correlation".into(),
        kind:   RuleKind::Preferred,
        detail: format!(
            "correlation with normal reference {:.4} (target > {:.2})",
            metrics.shape_correlation, config.correlation_floor
        ),
        passed: flags.shape_match,
    });
    checks.push(RuleCheck {
        rule:   "purchase_variance".into(),
        kind:   RuleKind::Reference,
        detail: format!("total intra-tier purchase variance {:.2}", metrics.total_variance),
        passed: true,
    });
    checks.push(RuleCheck {
        rule:   "change_rate".into(),
        kind:   RuleKind::Reference,
        detail: format!(
            "weighted indicator change {} (reference band ± {}, within={})",
            percent(metrics.change_rate),
            percent(config.change_rate_limit),
            flags.change_rate_within
        ),
        passed: true,
    });

    ComplianceReport { checks, metrics }
}
