//! Tabular input for batch settlement
//!
//! Uploads are parsed into [`SettlementRow`]s before any row is applied, so
//! a malformed file changes nothing. CSV and spreadsheet uploads share the
//! same header and row checks.

use calamine::{Data, Reader, open_workbook_auto_from_rs};
use chrono::NaiveTime;
use rust_decimal::Decimal;
use serde::Serialize;
use std::io::Cursor;
use std::str::FromStr;

use crate::error::{CoreError, CoreResult};

pub const COL_DATE: &str = "Date";
pub const COL_TRANSACTION_TYPE: &str = "TransactionType";
pub const COL_STRATEGY_NAME: &str = "StrategyName";
pub const COL_TRADE_DETAILS: &str = "TradeDetails";
pub const COL_PROFIT_LOSS_PERCENTAGE: &str = "ProfitLossPercentage";

const REQUIRED_COLUMNS: [&str; 5] = [
    COL_DATE,
    COL_TRANSACTION_TYPE,
    COL_STRATEGY_NAME,
    COL_TRADE_DETAILS,
    COL_PROFIT_LOSS_PERCENTAGE,
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SettlementRow {
    pub date: String,
    pub transaction_type: String,
    pub strategy_name: String,
    pub trade_details: String,
    pub profit_loss_percentage: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TabularFormat {
    Csv,
    /// Excel workbook, first sheet
    Xlsx,
}

impl TabularFormat {
    pub fn from_filename(filename: &str) -> CoreResult<Self> {
        let ext = filename
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "csv" => Ok(TabularFormat::Csv),
            "xlsx" | "xls" => Ok(TabularFormat::Xlsx),
            _ => Err(CoreError::InvalidInput(format!(
                "unsupported file type: {}",
                filename
            ))),
        }
    }

    pub fn parser(&self) -> Box<dyn TabularParser> {
        match self {
            TabularFormat::Csv => Box::new(CsvTabularParser),
            TabularFormat::Xlsx => Box::new(XlsxTabularParser),
        }
    }
}

pub trait TabularParser: Send + Sync {
    fn parse(&self, bytes: &[u8]) -> CoreResult<Vec<SettlementRow>>;
}

/// RFC 4180 style CSV: quoted fields, doubled quotes, CRLF, optional BOM
#[derive(Debug, Default, Clone, Copy)]
pub struct CsvTabularParser;

impl TabularParser for CsvTabularParser {
    fn parse(&self, bytes: &[u8]) -> CoreResult<Vec<SettlementRow>> {
        let text = std::str::from_utf8(bytes)
            .map_err(|_| CoreError::InvalidInput("upload is not valid UTF-8".into()))?;
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);

        rows_from_records(split_records(text)?, 1)
    }
}

/// First worksheet of an xlsx or xls workbook
#[derive(Debug, Default, Clone, Copy)]
pub struct XlsxTabularParser;

impl TabularParser for XlsxTabularParser {
    fn parse(&self, bytes: &[u8]) -> CoreResult<Vec<SettlementRow>> {
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))
            .map_err(|e| CoreError::InvalidInput(format!("upload is not a readable workbook: {}", e)))?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| CoreError::SchemaMismatch("workbook has no sheets".into()))?
            .map_err(|e| CoreError::InvalidInput(format!("first sheet is unreadable: {}", e)))?;

        // The used range may start below row 1
        let header_line = range.start().map(|(row, _)| row as usize + 1).unwrap_or(1);
        let records = range
            .rows()
            .map(|cells| cells.iter().map(cell_text).collect::<Vec<_>>());
        rows_from_records(records, header_line)
    }
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(dt) if dt.time() == NaiveTime::MIN => dt.date().to_string(),
            Some(dt) => dt.to_string(),
            None => dt.as_f64().to_string(),
        },
        Data::Error(e) => e.to_string(),
    }
}

/// Header row first. `header_line` is its 1-based line in the source, used
/// in error messages.
fn rows_from_records<I>(records: I, header_line: usize) -> CoreResult<Vec<SettlementRow>>
where
    I: IntoIterator<Item = Vec<String>>,
{
    let mut records = records.into_iter();
    let header = records
        .next()
        .ok_or_else(|| CoreError::SchemaMismatch("file is empty".into()))?;

    let mut index = [0usize; 5];
    for (slot, column) in index.iter_mut().zip(REQUIRED_COLUMNS) {
        *slot = header
            .iter()
            .position(|h| h.trim() == column)
            .ok_or_else(|| CoreError::SchemaMismatch(format!("missing column '{}'", column)))?;
    }

    let mut rows = Vec::new();
    for (n, record) in records.enumerate() {
        if record.iter().all(|f| f.trim().is_empty()) {
            continue;
        }
        let line = header_line + n + 1;
        let field = |i: usize| record.get(index[i]).map(|f| f.trim().to_string()).unwrap_or_default();

        let raw_pct = field(4);
        let profit_loss_percentage = parse_percentage(&raw_pct).ok_or_else(|| {
            CoreError::SchemaMismatch(format!(
                "row {}: ProfitLossPercentage '{}' is not a number",
                line, raw_pct
            ))
        })?;

        rows.push(SettlementRow {
            date: field(0),
            transaction_type: field(1),
            strategy_name: field(2),
            trade_details: field(3),
            profit_loss_percentage,
        });
    }
    Ok(rows)
}

fn parse_percentage(raw: &str) -> Option<Decimal> {
    let raw = raw.trim().trim_end_matches('%').trim();
    if raw.is_empty() {
        return None;
    }
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .ok()
}

fn split_records(text: &str) -> CoreResult<Vec<Vec<String>>> {
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    field.push('"');
                    chars.next();
                }
                '"' => in_quotes = false,
                _ => field.push(c),
            }
            continue;
        }
        match c {
            '"' => in_quotes = true,
            ',' => record.push(std::mem::take(&mut field)),
            '\r' => {}
            '\n' => {
                record.push(std::mem::take(&mut field));
                records.push(std::mem::take(&mut record));
            }
            _ => field.push(c),
        }
    }
    if in_quotes {
        return Err(CoreError::SchemaMismatch("unterminated quoted field".into()));
    }
    if !field.is_empty() || !record.is_empty() {
        record.push(field);
        records.push(record);
    }
    Ok(records)
}
