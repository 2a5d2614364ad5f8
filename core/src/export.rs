//! Sectioned CSV export of a finished run.
//!
//! One file, three sections in order: `[detail]`, `[tier_summary]`,
//! `[rule_check]`. Each section starts with its label row and its own header
//! row; sections are separated by a blank line.

use crate::{
    error::GradingResult,
    population::TieredPopulation,
    report::{percent, RuleKind, Summary},
    tier::tier_label,
};
use std::{fs::File, io::Write, path::Path};

const DETAIL_HEADER: [&str; 22] = [
    "license_no",
    "previous_grade",
    "new_grade",
    "tier",
    "purchase_amount",
    "purchase_rank",
    "purchase_score",
    "credit_rating",
    "credit_score",
    "counter_display",
    "placement_rule",
    "damage_fading",
    "theme_display",
    "price_tagging",
    "transaction_data",
    "transaction_score",
    "consumption_env",
    "non_purchase_score",
    "total_score",
    "total_rank",
    "marketing_route",
    "district",
];

const TIER_HEADER: [&str; 15] = [
    "tier",
    "label",
    "cut_line",
    "before_count",
    "before_share",
    "before_min",
    "before_max",
    "after_count",
    "after_share",
    "after_min",
    "after_max",
    "upgrades",
    "upgrade_rate",
    "downgrades",
    "downgrade_rate",
];

const RULE_HEADER: [&str; 4] = ["rule", "kind", "passed", "detail"];

fn score(value: f64) -> String {
    format!("{value:.4}")
}

fn optional(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn yes_no(passed: bool) -> &'static str {
    if passed {
        "yes"
    } else {
        "no"
    }
}

fn kind_name(kind: RuleKind) -> &'static str {
    match kind {
        RuleKind::Mandatory => "mandatory",
        RuleKind::Preferred => "preferred",
        RuleKind::Reference => "reference",
    }
}

fn section<W: Write>(writer: &mut W, label: &str, header: &[&str], rows: Vec<Vec<String>>) -> GradingResult<()> {
    let mut csv = csv::WriterBuilder::new().flexible(true).from_writer(&mut *writer);
    csv.write_record([label])?;
    csv.write_record(header)?;
    for row in rows {
        csv.write_record(&row)?;
    }
    csv.flush()?;
    Ok(())
}

/// Write the three report sections to `writer`.
pub fn write_report<W: Write>(mut writer: W, tiered: &TieredPopulation, summary: &Summary) -> GradingResult<()> {
    let detail = tiered
        .ranked()
        .into_iter()
        .map(|(entity, tier)| {
            let r = &entity.record;
            let s = &entity.scores;
            vec![
                r.license_no.clone(),
                r.previous_grade.clone(),
                tier_label(tier),
                tier.to_string(),
                optional(r.purchase_amount),
                s.purchase_rank.to_string(),
                score(s.purchase_score),
                r.credit_rating.clone().unwrap_or_default(),
                score(s.credit_score),
                optional(r.counter_display),
                optional(r.placement_rule),
                optional(r.damage_fading),
                optional(r.theme_display),
                optional(r.price_tagging),
                optional(r.transaction_data),
                score(s.transaction_score),
                optional(r.consumption_env),
                score(s.non_purchase_score),
                score(s.total),
                s.total_rank.to_string(),
                r.marketing_route.clone(),
                entity.district.clone(),
            ]
        })
        .collect();
    section(&mut writer, "[detail]", &DETAIL_HEADER, detail)?;
    writer.write_all(b"\n")?;

    let tiers = summary
        .tiers
        .iter()
        .map(|row| {
            vec![
                row.tier.to_string(),
                row.label.clone(),
                score(row.cut_line),
                row.before.count.to_string(),
                percent(row.before.share),
                score(row.before.min_score),
                score(row.before.max_score),
                row.after.count.to_string(),
                percent(row.after.share),
                score(row.after.min_score),
                score(row.after.max_score),
                row.upgrades.to_string(),
                percent(row.upgrade_rate),
                row.downgrades.to_string(),
                percent(row.downgrade_rate),
            ]
        })
        .collect();
    section(&mut writer, "[tier_summary]", &TIER_HEADER, tiers)?;
    writer.write_all(b"\n")?;

    let rules = summary
        .compliance
        .checks
        .iter()
        .map(|check| {
            vec![
                check.rule.clone(),
                kind_name(check.kind).to_string(),
                yes_no(check.passed).to_string(),
                check.detail.clone(),
            ]
        })
        .collect();
    section(&mut writer, "[rule_check]", &RULE_HEADER, rules)?;
    writer.flush()?;
    Ok(())
}

/// Create (or truncate) `path` and write the report into it.
pub fn export_to_path(path: impl AsRef<Path>, tiered: &TieredPopulation, summary: &Summary) -> GradingResult<()> {
    let path = path.as_ref();
    let file = File::create(path)?;
    write_report(std::io::BufWriter::new(file), tiered, summary)?;
    log::info!("export: wrote {} rows to {}", tiered.len(), path.display());
    Ok(())
}
