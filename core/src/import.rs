//! Input table importer.
//!
//! Reads license records from a CSV file or the first worksheet of a
//! spreadsheet. Headers are matched by name (localized or snake_case), so
//! column order does not matter and extra columns are ignored.

use crate::{
    error::{GradingError, GradingResult},
    population::LicenseRecord,
};
use calamine::Reader;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
    LicenseNo,
    PreviousGrade,
    MarketingRoute,
    PurchaseAmount,
    CreditRating,
    CounterDisplay,
    PlacementRule,
    DamageFading,
    ThemeDisplay,
    PriceTagging,
    TransactionData,
    ConsumptionEnv,
}

impl Column {
    const ALL: [Column; 12] = [
        Column::LicenseNo,
        Column::PreviousGrade,
        Column::MarketingRoute,
        Column::PurchaseAmount,
        Column::CreditRating,
        Column::CounterDisplay,
        Column::PlacementRule,
        Column::DamageFading,
        Column::ThemeDisplay,
        Column::PriceTagging,
        Column::TransactionData,
        Column::ConsumptionEnv,
    ];

    fn aliases(self) -> &'static [&'static str] {
        match self {
            Column::LicenseNo       => &["许可证号", "license_no"],
            Column::PreviousGrade   => &["原档位", "previous_grade"],
            Column::MarketingRoute  => &["营销线路", "marketing_route"],
            Column::PurchaseAmount  => &["卷烟购进金额指标值", "purchase_amount"],
            Column::CreditRating    => &["信用等级指标值", "credit_rating"],
            Column::CounterDisplay  => &["专柜陈列得分", "counter_display"],
            Column::PlacementRule   => &["摆放规则得分", "placement_rule"],
            Column::DamageFading    => &["破损褪色得分", "破损褶皱得分", "damage_fading"],
            Column::ThemeDisplay    => &["主题陈列得分", "theme_display"],
            Column::PriceTagging    => &["明码标价得分", "price_tagging"],
            Column::TransactionData => &["交易数据指标值", "transaction_data"],
            Column::ConsumptionEnv  => &["消费环境得分", "consumption_env"],
        }
    }

    fn matching(header: &str) -> Option<Column> {
        let header = header.trim();
        Column::ALL
            .into_iter()
            .find(|c| c.aliases().iter().any(|a| a.eq_ignore_ascii_case(header)))
    }
}

/// Header position of each known column.
struct HeaderMap {
    positions: Vec<(Column, usize)>,
}

impl HeaderMap {
    fn new<'a>(headers: impl IntoIterator<Item = &'a str>) -> Self {
        let mut positions: Vec<(Column, usize)> = Vec::new();
        for (idx, header) in headers.into_iter().enumerate() {
            if let Some(column) = Column::matching(header) {
                if !positions.iter().any(|(c, _)| *c == column) {
                    positions.push((column, idx));
                }
            }
        }
        for column in Column::ALL {
            if !positions.iter().any(|(c, _)| *c == column) {
                log::warn!("import: column {column:?} not found; values will be empty");
            }
        }
        Self { positions }
    }

    fn record(&self, cells: &[String]) -> LicenseRecord {
        let mut record = LicenseRecord::default();
        for &(column, idx) in &self.positions {
            let Some(cell) = cells.get(idx) else { continue };
            let text = cell.trim();
            match column {
                Column::LicenseNo       => record.license_no = text.to_string(),
                Column::PreviousGrade   => record.previous_grade = text.to_string(),
                Column::MarketingRoute  => record.marketing_route = text.to_string(),
                Column::CreditRating    => {
                    record.credit_rating = (!text.is_empty()).then(|| text.to_string())
                }
                Column::PurchaseAmount  => record.purchase_amount = parse_number(text),
                Column::CounterDisplay  => record.counter_display = parse_number(text),
                Column::PlacementRule   => record.placement_rule = parse_number(text),
                Column::DamageFading    => record.damage_fading = parse_number(text),
                Column::ThemeDisplay    => record.theme_display = parse_number(text),
                Column::PriceTagging    => record.price_tagging = parse_number(text),
                Column::TransactionData => record.transaction_data = parse_number(text),
                Column::ConsumptionEnv  => record.consumption_env = parse_number(text),
            }
        }
        record
    }
}

/// Finite numbers only; anything else is treated as missing.
fn parse_number(text: &str) -> Option<f64> {
    text.trim()
        .replace(',', "")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

fn is_blank(cells: &[String]) -> bool {
    cells.iter().all(|c| c.trim().is_empty())
}

/// Load license records from `path`. The format is chosen by extension.
pub fn read_population(path: impl AsRef<Path>) -> GradingResult<Vec<LicenseRecord>> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    let rows = match extension.as_str() {
        "csv" => csv_rows(path)?,
        "xlsx" | "xlsm" | "xls" | "xlsb" | "ods" => workbook_rows(path)?,
        other => {
            return Err(GradingError::UnsupportedInput {
                path:   path.display().to_string(),
                reason: format!("unknown extension '{other}' (expected csv, xlsx, xls or ods)"),
            })
        }
    };

    let mut rows = rows.into_iter();
    let Some(header) = rows.next() else {
        log::warn!("import: {} has no header row", path.display());
        return Ok(Vec::new());
    };
    let headers = HeaderMap::new(header.iter().map(String::as_str));

    let records: Vec<LicenseRecord> = rows
        .filter(|cells| !is_blank(cells))
        .map(|cells| headers.record(&cells))
        .collect();
    log::info!("import: {} records from {}", records.len(), path.display());
    Ok(records)
}

fn csv_rows(path: &Path) -> GradingResult<Vec<Vec<String>>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;
    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        rows.push(record.iter().map(|s| s.trim_start_matches('\u{feff}').to_string()).collect());
    }
    Ok(rows)
}

fn workbook_rows(path: &Path) -> GradingResult<Vec<Vec<String>>> {
    let mut workbook = calamine::open_workbook_auto(path)?;
    let Some(sheet) = workbook.sheet_names().first().cloned() else {
        return Err(GradingError::UnsupportedInput {
            path:   path.display().to_string(),
            reason: "workbook has no sheets".into(),
        });
    };
    let range = workbook.worksheet_range(&sheet)?;
    Ok(range
        .rows()
        .map(|row| row.iter().map(cell_text).collect())
        .collect())
}

/// Integral floats render without a fractional part, so `24.0` reads as `24`.
fn cell_text(cell: &calamine::Data) -> String {
    match cell {
        calamine::Data::Empty => String::new(),
        calamine::Data::String(s) => s.trim().to_string(),
        calamine::Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        calamine::Data::Float(f) => f.to_string(),
        calamine::Data::Int(i) => i.to_string(),
        calamine::Data::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}
