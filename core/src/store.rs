//! SQLite persistence layer.
//!
//! RULE: Only store.rs talks to the database.
//! Everything is keyed by business date; saving a run replaces whatever was
//! stored for that date (delete-then-insert inside one transaction).

use crate::{
    error::GradingResult,
    report::Summary,
    run::RunRecord,
    tier::tier_label,
    types::Tier,
};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;

pub struct GradingStore {
    conn: Connection,
}

/// One persisted cut line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TierLine {
    pub tier:  Tier,
    pub label: String,
    pub score: f64,
}

impl GradingStore {
    /// Open (or create) the grading database at `path`. Accepts SQLite URIs.
    pub fn open(path: &str) -> GradingResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> GradingResult<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> GradingResult<()> {
        self.conn
            .execute_batch(include_str!("../../migrations/001_grading.sql"))?;
        Ok(())
    }

    // ── Runs ───────────────────────────────────────────────────

    /// Persist a run, replacing every row previously stored for its date.
    pub fn save_run(&self, record: &RunRecord, summary: &Summary) -> GradingResult<()> {
        let date = record.date_str();
        let tx = self.conn.unchecked_transaction()?;

        let replaced: usize = ["grading_run", "grading_data", "grading_line"]
            .iter()
            .map(|table| tx.execute(&format!("DELETE FROM {table} WHERE date_str = ?1"), params![date]))
            .sum::<Result<usize, _>>()?;
        if replaced > 0 {
            log::info!("store: replacing {replaced} rows previously saved for {date}");
        }

        tx.execute(
            "INSERT INTO grading_run (run_id, date_str, method, created_at, population, feasible, snapshot_json)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                record.run_id,
                date,
                record.method.name(),
                record.created_at.to_rfc3339(),
                record.tiered.len() as i64,
                record.metrics.flags.mandatory_met(),
                serde_json::to_string(record)?,
            ],
        )?;

        {
            let mut stmt = tx.prepare(
                "INSERT INTO grading_data
                 (date_str, license_no, original_level, new_level, level_code,
                  purchase_amount_val, purchase_amount_rank, purchase_amount_score,
                  credit_rating_val, credit_rating_score,
                  counter_display_score, placement_rule_score, damage_crease_score,
                  theme_display_score, pricing_tag_score,
                  transaction_data_val, transaction_data_score, consumption_env_score,
                  marketing_route, district, non_purchase_score, total_score, total_score_rank)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15,
                         ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23)",
            )?;
            for (entity, tier) in record.tiered.ranked() {
                let r = &entity.record;
                let s = &entity.scores;
                stmt.execute(params![
                    date,
                    r.license_no,
                    r.previous_grade,
                    tier_label(tier),
                    tier as i64,
                    r.purchase_amount,
                    s.purchase_rank as i64,
                    s.purchase_score,
                    r.credit_rating,
                    s.credit_score,
                    r.counter_display,
                    r.placement_rule,
                    r.damage_fading,
                    r.theme_display,
                    r.price_tagging,
                    r.transaction_data,
                    s.transaction_score,
                    r.consumption_env,
                    r.marketing_route,
                    entity.district,
                    s.non_purchase_score,
                    s.total,
                    s.total_rank as i64,
                ])?;
            }
        }

        {
            let mut stmt = tx.prepare(
                "INSERT INTO grading_line (date_str, new_level, tier, score, remark, remark1)
                 VALUES (?1, ?2, ?3, ?4, '', '')",
            )?;
            for row in &summary.tiers {
                stmt.execute(params![date, row.label, row.tier as i64, row.cut_line])?;
            }
        }

        tx.commit()?;
        log::info!(
            "store: saved run {} for {date} ({} licenses)",
            record.run_id,
            record.tiered.len()
        );
        Ok(())
    }

    /// The run stored for `date` (`YYYY-MM-DD`), if any.
    pub fn run_for_date(&self, date: &str) -> GradingResult<Option<RunRecord>> {
        let json: Option<String> = self
            .conn
            .query_row(
                "SELECT snapshot_json FROM grading_run
                 WHERE date_str = ?1 ORDER BY created_at DESC LIMIT 1",
                params![date],
                |row| row.get(0),
            )
            .optional()?;
        match json {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    pub fn run_count_for_date(&self, date: &str) -> GradingResult<i64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM grading_run WHERE date_str = ?1",
            params![date],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    pub fn detail_count_for_date(&self, date: &str) -> GradingResult<i64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM grading_data WHERE date_str = ?1",
            params![date],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Cut lines for `date`, tier 30 first.
    pub fn tier_lines_for_date(&self, date: &str) -> GradingResult<Vec<TierLine>> {
        let mut stmt = self.conn.prepare(
            "SELECT tier, new_level, score FROM grading_line
             WHERE date_str = ?1 ORDER BY tier DESC",
        )?;
        let lines = stmt
            .query_map(params![date], |row| {
                Ok(TierLine {
                    tier:  row.get::<_, i64>(0)? as Tier,
                    label: row.get(1)?,
                    score: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(lines)
    }

    /// Every date with a stored run, oldest first.
    pub fn stored_dates(&self) -> GradingResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT DISTINCT date_str FROM grading_run ORDER BY date_str ASC")?;
        let dates = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(dates)
    }
}
