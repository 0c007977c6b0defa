//! Ingest: turn provider rows into a clean, date-ordered series.
//!
//! - sort by date ascending
//! - drop duplicate dates (first occurrence wins)
//! - drop empty rows (every price NaN); rows with only some prices missing stay
//! - count, but keep, rows that fail the OHLC sanity check

use super::provider::{DataError, RawBar};
use tracing::warn;

/// Output of the ingest step.
#[derive(Debug, Clone)]
pub struct IngestResult {
    pub bars: Vec<RawBar>,
    pub duplicates_dropped: usize,
    pub empty_dropped: usize,
    pub insane_rows: usize,
}

/// Every price missing. A row with some prices left is kept.
fn is_empty_row(bar: &RawBar) -> bool {
    bar.open.is_nan()
        && bar.high.is_nan()
        && bar.low.is_nan()
        && bar.close.is_nan()
        && bar.adj_close.is_nan()
}

fn is_sane(bar: &RawBar) -> bool {
    bar.high >= bar.low
        && bar.high >= bar.open
        && bar.high >= bar.close
        && bar.low <= bar.open
        && bar.low <= bar.close
        && bar.open > 0.0
        && bar.close > 0.0
}

pub fn ingest(mut raw: Vec<RawBar>) -> Result<IngestResult, DataError> {
    let before = raw.len();
    raw.retain(|b| !is_empty_row(b));
    let empty_dropped = before - raw.len();

    // Stable sort keeps the provider's first row for a duplicated date in front.
    raw.sort_by_key(|b| b.date);
    let before = raw.len();
    raw.dedup_by_key(|b| b.date);
    let duplicates_dropped = before - raw.len();

    if raw.is_empty() {
        return Err(DataError::ValidationError(
            "no usable rows after ingest".into(),
        ));
    }

    let insane_rows = raw.iter().filter(|b| !is_sane(b)).count();
    if insane_rows > 0 {
        warn!(insane_rows, "rows failed the OHLC sanity check");
    }

    Ok(IngestResult {
        bars: raw,
        duplicates_dropped,
        empty_dropped,
        insane_rows,
    })
}
