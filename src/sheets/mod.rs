//! Tabular output: the [`TabularSink`] seam, batched row writing with a
//! header row, and the Google Sheets implementation.

pub mod auth;
pub mod google;

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Result, ReviewDeskError};

pub use auth::ServiceAccountKey;
pub use google::GoogleSheet;

/// Default number of data rows per write request.
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// One spreadsheet cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Bool(bool),
    Int(i64),
    Number(f64),
    Text(String),
}

impl CellValue {
    pub fn empty() -> Self {
        CellValue::Text(String::new())
    }

    /// Display form, as the sheet would show it.
    pub fn render(&self) -> String {
        match self {
            CellValue::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
            CellValue::Int(i) => i.to_string(),
            CellValue::Number(n) => n.to_string(),
            CellValue::Text(s) => s.clone(),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        CellValue::Bool(value)
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Int(value)
    }
}

impl From<usize> for CellValue {
    fn from(value: usize) -> Self {
        CellValue::Int(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

/// A flat record: field name → cell. Keys iterate in sorted order.
pub type Row = BTreeMap<String, CellValue>;

/// A worksheet that can be cleared, read and written by range.
#[async_trait]
pub trait TabularSink: Send + Sync {
    /// Remove every value from the worksheet.
    async fn clear(&self) -> Result<()>;

    /// All values, row-major, as displayed strings.
    async fn read_values(&self) -> Result<Vec<Vec<String>>>;

    /// Write `rows` starting at 0-based row `start_row`, column A.
    async fn write_range(&self, start_row: usize, rows: Vec<Vec<CellValue>>) -> Result<()>;
}

/// Options for [`write_rows`].
#[derive(Debug, Clone)]
pub struct WriteOptions {
    /// Column order. `None` uses the sheet's existing header row.
    pub headers: Option<Vec<String>>,
    /// Clear the worksheet first.
    pub empty_sheet: bool,
    pub write_headers: bool,
    /// 0-based row of the header (or of the first data row when headers are
    /// not written).
    pub start_row_idx: usize,
    pub batch_size: usize,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            headers: None,
            empty_sheet: false,
            write_headers: true,
            start_row_idx: 0,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

/// Sorted union of every field name in `rows`.
pub fn sorted_headers(rows: &[Row]) -> Vec<String> {
    rows.iter()
        .flat_map(|row| row.keys().cloned())
        .collect::<std::collections::BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Lay out `row` in `headers` order; missing fields become empty cells.
pub fn row_values(row: &Row, headers: &[String]) -> Vec<CellValue> {
    headers
        .iter()
        .map(|h| row.get(h).cloned().unwrap_or_else(CellValue::empty))
        .collect()
}

/// Write `rows` under a header row in batches. Returns the 0-based index of
/// the first row after the written block.
pub async fn write_rows<S>(sink: &S, rows: &[Row], options: &WriteOptions) -> Result<usize>
where
    S: TabularSink + ?Sized,
{
    if options.empty_sheet {
        sink.clear().await?;
    }

    let headers = match &options.headers {
        Some(headers) => headers.clone(),
        None => sink
            .read_values()
            .await?
            .into_iter()
            .next()
            .filter(|row| !row.is_empty())
            .ok_or_else(|| {
                ReviewDeskError::Sheet(
                    "no headers given and the worksheet has no header row".to_string(),
                )
            })?,
    };

    let mut current_row = options.start_row_idx;
    if options.write_headers {
        let header_cells = headers.iter().map(|h| CellValue::from(h.as_str())).collect();
        sink.write_range(current_row, vec![header_cells]).await?;
        current_row += 1;
    }

    let batch_size = options.batch_size.max(1);
    for (batch_idx, batch) in rows.chunks(batch_size).enumerate() {
        let values: Vec<Vec<CellValue>> = batch.iter().map(|r| row_values(r, &headers)).collect();
        debug!(batch = batch_idx, start_row = current_row, rows = batch.len(), "Writing batch");
        sink.write_range(current_row, values).await?;
        current_row += batch.len();
    }

    info!(
        rows = rows.len(),
        next_row = current_row,
        "Wrote rows to sheet"
    );
    Ok(current_row)
}

/// Read the worksheet as records keyed by the header row.
pub async fn read_records<S>(sink: &S) -> Result<Vec<BTreeMap<String, String>>>
where
    S: TabularSink + ?Sized,
{
    let mut values = sink.read_values().await?.into_iter();
    let Some(headers) = values.next() else {
        return Ok(Vec::new());
    };
    Ok(values
        .map(|row| headers.iter().cloned().zip(row).collect())
        .collect())
}

/// Spreadsheet column letters for a 0-based index: 0 → A, 25 → Z, 26 → AA.
pub fn column_letter(index: usize) -> String {
    let mut n = index + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

/// Quoted A1 range for a block of `height` rows × `width` columns starting at
/// 0-based `start_row`, column A.
pub fn a1_range(sheet: &str, start_row: usize, height: usize, width: usize) -> String {
    let sheet = format!("'{}'", sheet.replace('\'', "''"));
    let first = start_row + 1;
    let last = start_row + height.max(1);
    let last_col = column_letter(width.max(1) - 1);
    format!("{sheet}!A{first}:{last_col}{last}")
}
