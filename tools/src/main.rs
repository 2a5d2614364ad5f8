//! grade-runner: headless license grading runner.
//!
//! Usage:
//!   grade-runner --input licenses.xlsx --date 2026-10-01 --db grading.db
//!   grade-runner --synthetic 5000 --seed 7 --export report.csv
//!   grade-runner --input licenses.csv --thresholds thresholds.json --preview

use anyhow::{Context, Result};
use chrono::NaiveDate;
use grading_core::{
    allocator::ThresholdMap,
    config::GradingConfig,
    engine::GradingEngine,
    export::export_to_path,
    import::read_population,
    population::TieredPopulation,
    report::{percent, Summary},
    run::GradingMethod,
    store::GradingStore,
    synthetic::synthetic_population,
};
use std::env;

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let seed = parse_arg(&args, "--seed", 42u64);
    let synthetic = parse_arg(&args, "--synthetic", 0usize);
    let preview = args.iter().any(|a| a == "--preview");
    let input = flag_value(&args, "--input");
    let db = flag_value(&args, "--db").unwrap_or(":memory:");
    let export = flag_value(&args, "--export");
    let date_key = match flag_value(&args, "--date") {
        Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .with_context(|| format!("--date must be YYYY-MM-DD, got {raw}"))?,
        None => chrono::Local::now().date_naive(),
    };
    let config = match flag_value(&args, "--config") {
        Some(path) => GradingConfig::load(path)?,
        None => GradingConfig::default(),
    };
    let thresholds = flag_value(&args, "--thresholds").map(load_thresholds).transpose()?;

    let records = match (input, synthetic) {
        (Some(path), _) => read_population(path)?,
        (None, n) if n > 0 => synthetic_population(n, seed),
        _ => anyhow::bail!("pass --input <file> or --synthetic <n>"),
    };

    println!("License grading: grade-runner");
    println!("  records:    {}", records.len());
    println!("  date:       {date_key}");
    println!("  db:         {db}");
    println!("  grid size:  {}", config.grid_size());
    println!();

    let engine = GradingEngine::new(config)?;

    if preview {
        let thresholds = thresholds.context("--preview needs --thresholds <json>")?;
        let (tiered, summary) = engine.preview_thresholds(records, &thresholds)?;
        print_summary(&summary);
        maybe_export(export, &tiered, &summary)?;
        return Ok(());
    }

    let (record, summary) = match &thresholds {
        Some(thresholds) => engine.run_thresholds(records, thresholds, date_key)?,
        None => engine.run_optimized(records, date_key)?,
    };

    println!("=== RUN ===");
    println!("  run_id:     {}", record.run_id);
    println!("  method:     {}", record.method.name());
    if let GradingMethod::Optimized { shifts, score, evaluated, grid_size, cancelled } = &record.method {
        println!("  shifts:     {:?}", shifts.to_array());
        println!("  score:      {score:.3}");
        println!("  evaluated:  {evaluated}/{grid_size}{}", if *cancelled { " (deadline)" } else { "" });
    }
    println!();
    print_summary(&summary);

    let store = GradingStore::open(db)?;
    store.migrate()?;
    engine.commit(&store, &record, &summary)?;
    println!();
    println!("saved {} rows for {}", store.detail_count_for_date(&record.date_str())?, record.date_str());

    maybe_export(export, &record.tiered, &summary)?;
    Ok(())
}

fn print_summary(summary: &Summary) {
    println!("=== TIERS ===");
    println!("  {:>4} {:<8} {:>10} {:>7} {:>7} {:>8} {:>8} {:>6} {:>6}",
        "tier", "label", "cut line", "before", "after", "before%", "after%", "up", "down");
    for row in &summary.tiers {
        println!(
            "  {:>4} {:<8} {:>10.3} {:>7} {:>7} {:>8} {:>8} {:>6} {:>6}",
            row.tier,
            row.label,
            row.cut_line,
            row.before.count,
            row.after.count,
            percent(row.before.share),
            percent(row.after.share),
            row.upgrades,
            row.downgrades,
        );
    }

    println!();
    println!("=== DISTRICTS ===");
    for row in &summary.districts {
        println!(
            "  {:<6} total {:>6}  up {:>5} ({})  down {:>5} ({})",
            row.district,
            row.total,
            row.upgrades,
            percent(row.upgrade_rate),
            row.downgrades,
            percent(row.downgrade_rate),
        );
    }

    println!();
    println!("=== RULES ===");
    for check in &summary.compliance.checks {
        let mark = if check.passed { "PASS" } else { "FAIL" };
        println!("  [{mark}] {:<18} {:?}  {}", check.rule, check.kind, check.detail);
    }
}

fn maybe_export(path: Option<&str>, tiered: &TieredPopulation, summary: &Summary) -> Result<()> {
    if let Some(path) = path {
        export_to_path(path, tiered, summary)?;
        println!("exported report to {path}");
    }
    Ok(())
}

/// Thresholds file: a JSON object of tier → minimum total score,
/// e.g. `{"30": 120.0, "29": 118.5}`.
fn load_thresholds(path: &str) -> Result<ThresholdMap> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
    let thresholds: ThresholdMap = serde_json::from_str(&content)
        .map_err(|e| anyhow::anyhow!("Cannot parse {path}: {e}"))?;
    log::info!("loaded {} thresholds from {path}", thresholds.len());
    Ok(thresholds)
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}
