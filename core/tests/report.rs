//! Aggregator: tier table, district rollups and rule compliance.

use grading_core::{
    allocator::{assign_by_thresholds, ThresholdMap},
    config::GradingConfig,
    optimizer::optimize_tiers,
    population::{LicenseRecord, TieredPopulation},
    report::{percent, summarize, RuleKind},
    scoring::compute_scores,
    synthetic::synthetic_population,
    types::TIER_COUNT,
};

/// Four licenses with totals 70, 60, 50, 40 tiered 30, 10, 10, 1.
///
/// Previous tiers 29, 10, 15 and unparsed (0): two upgrades, one downgrade.
fn hand_tiered() -> TieredPopulation {
    let rows = [
        ("L1", 400.0, "二十九档", "东城01"),
        ("L2", 300.0, "十档", "东城02"),
        ("L3", 200.0, "十五档", "西湖01"),
        ("L4", 100.0, "", "西湖02"),
    ];
    let records = rows
        .iter()
        .map(|(license, purchase, grade, route)| LicenseRecord {
            license_no: license.to_string(),
            previous_grade: grade.to_string(),
            marketing_route: route.to_string(),
            purchase_amount: Some(*purchase),
            ..LicenseRecord::default()
        })
        .collect();
    let scored = compute_scores(records).unwrap();
    assign_by_thresholds(&scored, &ThresholdMap::from([(30, 65.0), (10, 45.0)]))
}

#[test]
fn tier_rows_cover_every_tier_best_first() {
    let summary = summarize(&hand_tiered(), &GradingConfig::default()).unwrap();
    assert_eq!(summary.tiers.len(), TIER_COUNT);
    assert_eq!(summary.tiers[0].tier, 30);
    assert_eq!(summary.tiers[0].label, "三十档");
    assert_eq!(summary.tiers[29].tier, 1);

    let after: usize = summary.tiers.iter().map(|r| r.after.count).sum();
    assert_eq!(after, 4);
    let before: usize = summary.tiers.iter().map(|r| r.before.count).sum();
    assert_eq!(before, 3, "the unparsed previous tier belongs to no row");
}

#[test]
fn tier_row_movement_and_cut_lines() {
    let summary = summarize(&hand_tiered(), &GradingConfig::default()).unwrap();
    let row = |tier: u8| summary.tiers.iter().find(|r| r.tier == tier).unwrap();

    let top = row(30);
    assert_eq!(top.after.count, 1);
    assert_eq!(top.upgrades, 1);
    assert_eq!(top.upgrade_rate, 1.0);
    assert_eq!(top.cut_line, 70.0);
    assert_eq!(top.after.share, 0.25);

    let ten = row(10);
    assert_eq!(ten.after.count, 2);
    assert_eq!(ten.before.count, 1);
    assert_eq!(ten.downgrades, 1);
    assert_eq!(ten.downgrade_rate, 0.5);
    assert_eq!(ten.cut_line, 50.0);
    assert_eq!(ten.after.max_score, 60.0);

    let fifteen = row(15);
    assert_eq!(fifteen.after.count, 0);
    assert_eq!(fifteen.before.count, 1);
    assert_eq!(fifteen.before.min_score, 50.0);
}

#[test]
fn district_rollups() {
    let summary = summarize(&hand_tiered(), &GradingConfig::default()).unwrap();
    let names: Vec<&str> = summary.districts.iter().map(|d| d.district.as_str()).collect();
    assert_eq!(names, vec!["东城", "西湖"]);

    let east = &summary.districts[0];
    assert_eq!((east.total, east.upgrades, east.downgrades), (2, 1, 0));
    assert_eq!(east.upgrade_rate, 0.5);
    let west = &summary.districts[1];
    assert_eq!((west.total, west.upgrades, west.downgrades), (2, 1, 1));

    let detail = &summary.district_tiers["西湖"];
    assert_eq!(detail.len(), TIER_COUNT);
    assert_eq!(detail[0].tier, 1, "district detail runs from tier 1 up");
    assert_eq!((detail[0].count, detail[0].upgrades), (1, 1));
    assert_eq!((detail[9].count, detail[9].downgrades), (1, 1));
}

#[test]
fn compliance_lists_every_rule() {
    let summary = summarize(&hand_tiered(), &GradingConfig::default()).unwrap();
    let compliance = &summary.compliance;
    assert_eq!(compliance.checks.len(), 11);

    let check = |name: &str| compliance.checks.iter().find(|c| c.rule == name).unwrap();
    assert!(check("net_upgrade").passed, "2 upgrades vs 1 downgrade");
    assert_eq!(check("net_upgrade").kind, RuleKind::Mandatory);
    assert!(!check("tier_occupancy").passed);
    assert_eq!(compliance.metrics.min_tier_count, 0, "26 tiers are empty");
    assert_eq!(
        compliance.metrics.min_tier_share, 0.25,
        "share floor looks at occupied tiers only"
    );
    assert!(check("tier_share_floor").passed);
    assert_eq!(check("shape_correlation").kind, RuleKind::Preferred);
    assert!(check("purchase_variance").passed, "reference rules always pass");
    assert!(!compliance.mandatory_passed());

    // old Σ tier × purchase = 17600, new = 17100.
    let expected = (17100.0 - 17600.0) / 17600.0;
    assert!((compliance.metrics.change_rate - expected).abs() < 1e-12);
    assert!(compliance.flags().change_rate_within);
}

#[test]
fn summary_is_idempotent() {
    let tiered = hand_tiered();
    let config = GradingConfig::default();
    assert_eq!(summarize(&tiered, &config).unwrap(), summarize(&tiered, &config).unwrap());
}

#[test]
fn compliance_matches_the_optimizer() {
    let config = GradingConfig::default_test();
    let scored = compute_scores(synthetic_population(800, 17)).unwrap();
    let result = optimize_tiers(&scored, &config).unwrap();
    let summary = summarize(&result.tiered, &config).unwrap();

    assert_eq!(summary.compliance.metrics, result.metrics);
    assert_eq!(summary.compliance.flags(), result.metrics.flags);
    assert_eq!(summary.compliance.mandatory_passed(), result.feasible());
}

#[test]
fn percentages_render_with_two_decimals() {
    assert_eq!(percent(0.091), "9.10%");
    assert_eq!(percent(0.0), "0.00%");
    assert_eq!(percent(1.0), "100.00%");
}
