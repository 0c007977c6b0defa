//! On-disk bar cache: one Parquet file per symbol and calendar year.
//!
//! ```text
//! {cache_dir}/symbol={SYMBOL}/2023.parquet
//! {cache_dir}/symbol={SYMBOL}/2024.parquet
//! {cache_dir}/symbol={SYMBOL}/meta.json
//! ```
//!
//! Partitions are written to a `.tmp` sibling and renamed into place. A
//! partition that fails to read or lacks a column is renamed to
//! `{year}.parquet.quarantined` and skipped. `meta.json` records the date
//! range, row count, source and a BLAKE3 hash of the bars.

use super::provider::{DataError, DataSource, RawBar};
use chrono::{Datelike, NaiveDate};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const PARTITION_COLUMNS: [&str; 7] = ["date", "open", "high", "low", "close", "adj_close", "volume"];

/// Contents of `meta.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheMeta {
    pub symbol: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub bar_count: usize,
    pub data_hash: String,
    pub source: String,
    pub cached_at: chrono::NaiveDateTime,
    /// Contiguous range known to be complete. Wider than the bar dates when
    /// a fetch started or ended on a non-trading day; narrower than them when
    /// two writes left a hole in between.
    #[serde(default)]
    pub requested: Option<(NaiveDate, NaiveDate)>,
}

impl CacheMeta {
    /// Inclusive range this cache entry answers for.
    pub fn covered_range(&self) -> (NaiveDate, NaiveDate) {
        self.requested.unwrap_or((self.start_date, self.end_date))
    }
}

/// Union of two inclusive ranges, or `None` if a day lies between them.
fn join_ranges(
    a: (NaiveDate, NaiveDate),
    b: (NaiveDate, NaiveDate),
) -> Option<(NaiveDate, NaiveDate)> {
    let touches = |x: NaiveDate, y: NaiveDate| x.succ_opt().map_or(true, |next| next >= y);
    (touches(a.1, b.0) && touches(b.1, a.0)).then(|| (a.0.min(b.0), a.1.max(b.1)))
}

fn cache_err(context: &'static str) -> impl FnOnce(std::io::Error) -> DataError {
    move |e| DataError::CacheError(format!("{context}: {e}"))
}

fn parquet_err(context: &'static str) -> impl FnOnce(PolarsError) -> DataError {
    move |e| DataError::ParquetError(format!("{context}: {e}"))
}

pub struct ParquetCache {
    cache_dir: PathBuf,
}

impl ParquetCache {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// `{cache_dir}/symbol={SYMBOL}/`
    pub fn symbol_dir(&self, symbol: &str) -> PathBuf {
        self.cache_dir.join(format!("symbol={symbol}"))
    }

    fn meta_path(&self, symbol: &str) -> PathBuf {
        self.symbol_dir(symbol).join("meta.json")
    }

    /// Merge `bars` into the cache. Rows already cached for other dates are
    /// kept; a cached row with the same date is replaced. Bars must already be
    /// ingested (sorted, deduplicated).
    pub fn write(&self, symbol: &str, bars: &[RawBar], source: DataSource) -> Result<(), DataError> {
        self.store(symbol, bars, source, None)
    }

    /// Like [`write`](Self::write), but also remembers the requested range so
    /// that asking for the same range again is a hit even when its ends fall
    /// on weekends or holidays.
    pub fn write_fetched(
        &self,
        symbol: &str,
        bars: &[RawBar],
        source: DataSource,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<(), DataError> {
        self.store(symbol, bars, source, Some((start, end)))
    }

    fn store(
        &self,
        symbol: &str,
        bars: &[RawBar],
        source: DataSource,
        requested: Option<(NaiveDate, NaiveDate)>,
    ) -> Result<(), DataError> {
        let (Some(first), Some(last)) = (bars.first(), bars.last()) else {
            return Err(DataError::CacheError("no bars to cache".into()));
        };
        let previous = self.get_meta(symbol);

        let dir = self.symbol_dir(symbol);
        fs::create_dir_all(&dir).map_err(cache_err("create symbol dir"))?;

        let mut partitions: BTreeMap<i32, Vec<&RawBar>> = BTreeMap::new();
        for bar in bars {
            partitions.entry(bar.date.year()).or_default().push(bar);
        }
        for (year, rows) in &partitions {
            let path = dir.join(format!("{year}.parquet"));
            let merged = merge_partition(&path, rows);
            write_partition(&path, &merged)?;
            debug!(symbol, year, new = rows.len(), rows = merged.len(), "wrote cache partition");
        }

        let fresh = match requested {
            Some((start, end)) => (start.min(first.date), end.max(last.date)),
            None => (first.date, last.date),
        };
        let covered = match previous.as_ref().map(CacheMeta::covered_range) {
            None => fresh,
            Some(old) => join_ranges(old, fresh).unwrap_or_else(|| {
                warn!(
                    symbol,
                    start = %fresh.0,
                    end = %fresh.1,
                    "new rows leave a gap after the cached range; coverage reset to the new rows"
                );
                fresh
            }),
        };

        let all = self.load(symbol)?;
        let (Some(oldest), Some(newest)) = (all.first(), all.last()) else {
            return Err(DataError::NoCachedData {
                symbol: symbol.to_string(),
            });
        };
        let meta = CacheMeta {
            symbol: symbol.to_string(),
            start_date: oldest.date,
            end_date: newest.date,
            bar_count: all.len(),
            data_hash: hash_bars(&all)?,
            source: source.label().to_string(),
            cached_at: chrono::Local::now().naive_local(),
            requested: Some(covered),
        };
        let json = serde_json::to_string_pretty(&meta)
            .map_err(|e| DataError::CacheError(format!("encode meta: {e}")))?;
        fs::write(self.meta_path(symbol), json).map_err(cache_err("write meta"))
    }

    /// Every cached bar for `symbol`, oldest first. Unreadable partitions are
    /// quarantined and skipped.
    pub fn load(&self, symbol: &str) -> Result<Vec<RawBar>, DataError> {
        let no_data = || DataError::NoCachedData {
            symbol: symbol.to_string(),
        };
        let dir = self.symbol_dir(symbol);
        if !dir.is_dir() {
            return Err(no_data());
        }

        let mut bars = Vec::new();
        for path in partition_files(&dir)? {
            match read_partition(&path) {
                Ok(rows) => bars.extend(rows),
                Err(e) => quarantine(&path, &e),
            }
        }
        if bars.is_empty() {
            return Err(no_data());
        }
        bars.sort_by_key(|b| b.date);
        Ok(bars)
    }

    /// Cached bars with `start <= date <= end`.
    pub fn load_range(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<RawBar>, DataError> {
        let mut bars = self.load(symbol)?;
        bars.retain(|b| (start..=end).contains(&b.date));
        if bars.is_empty() {
            return Err(DataError::NoCachedData {
                symbol: symbol.to_string(),
            });
        }
        Ok(bars)
    }

    /// `None` when the sidecar is missing or unreadable.
    pub fn get_meta(&self, symbol: &str) -> Option<CacheMeta> {
        let text = fs::read_to_string(self.meta_path(symbol)).ok()?;
        serde_json::from_str(&text).ok()
    }

    pub fn status(&self, symbols: &[&str]) -> Vec<CacheStatus> {
        symbols
            .iter()
            .map(|&symbol| match self.get_meta(symbol) {
                Some(meta) => CacheStatus {
                    symbol: symbol.to_string(),
                    cached: true,
                    start_date: Some(meta.start_date),
                    end_date: Some(meta.end_date),
                    bar_count: Some(meta.bar_count),
                },
                None => CacheStatus {
                    symbol: symbol.to_string(),
                    cached: false,
                    start_date: None,
                    end_date: None,
                    bar_count: None,
                },
            })
            .collect()
    }

    /// Symbols with a `symbol=` directory under the cache root, sorted.
    pub fn cached_symbols(&self) -> Result<Vec<String>, DataError> {
        if !self.cache_dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut symbols = Vec::new();
        for entry in fs::read_dir(&self.cache_dir).map_err(cache_err("read cache dir"))? {
            let name = entry.map_err(cache_err("read cache dir"))?.file_name();
            if let Some(symbol) = name.to_string_lossy().strip_prefix("symbol=") {
                symbols.push(symbol.to_string());
            }
        }
        symbols.sort();
        Ok(symbols)
    }

    pub fn covers_range(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> CoverageResult {
        let Some(meta) = self.get_meta(symbol) else {
            return CoverageResult::NotCached;
        };
        let (from, to) = meta.covered_range();
        if from <= start && to >= end {
            CoverageResult::FullyCovered
        } else {
            CoverageResult::PartiallyCovered {
                cached_start: meta.start_date,
                cached_end: meta.end_date,
            }
        }
    }
}

/// One row of `indilab cache status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStatus {
    pub symbol: String,
    pub cached: bool,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub bar_count: Option<usize>,
}

/// How much of a requested range the cache can answer.
#[derive(Debug, Clone, PartialEq)]
pub enum CoverageResult {
    NotCached,
    FullyCovered,
    PartiallyCovered {
        cached_start: NaiveDate,
        cached_end: NaiveDate,
    },
}

/// BLAKE3 over the JSON encoding of the bars.
fn hash_bars(bars: &[RawBar]) -> Result<String, DataError> {
    let bytes = serde_json::to_vec(bars)
        .map_err(|e| DataError::CacheError(format!("hash serialization: {e}")))?;
    Ok(blake3::hash(&bytes).to_hex().to_string())
}

/// `*.parquet` files in a symbol directory. Sidecars, quarantined files and
/// stray `.tmp` files are ignored.
fn partition_files(dir: &Path) -> Result<Vec<PathBuf>, DataError> {
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir).map_err(cache_err("read symbol dir"))? {
        let path = entry.map_err(cache_err("read symbol dir"))?.path();
        if path.extension().is_some_and(|ext| ext == "parquet") {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

fn quarantine(path: &Path, err: &DataError) {
    warn!(path = %path.display(), error = %err, "quarantining unreadable cache partition");
    let _ = fs::rename(path, path.with_extension("parquet.quarantined"));
}

// Days since 1970-01-01, the physical representation of polars' Date.

fn to_epoch_days(date: NaiveDate) -> i32 {
    (date - NaiveDate::default()).num_days() as i32
}

fn from_epoch_days(days: i32) -> NaiveDate {
    NaiveDate::default() + chrono::Duration::days(i64::from(days))
}

/// Cached rows of the partition at `path` overlaid with `rows` (same date:
/// the new row wins), sorted by date. An unreadable partition is quarantined
/// and only `rows` survive.
fn merge_partition(path: &Path, rows: &[&RawBar]) -> Vec<RawBar> {
    let mut by_date: BTreeMap<NaiveDate, RawBar> = BTreeMap::new();
    if path.exists() {
        match read_partition(path) {
            Ok(cached) => by_date.extend(cached.into_iter().map(|b| (b.date, b))),
            Err(e) => quarantine(path, &e),
        }
    }
    by_date.extend(rows.iter().map(|&b| (b.date, b.clone())));
    by_date.into_values().collect()
}

fn write_partition(path: &Path, rows: &[RawBar]) -> Result<(), DataError> {
    let field = |f: fn(&RawBar) -> f64| rows.iter().map(f).collect::<Vec<f64>>();
    let date = Column::new("date".into(), rows.iter().map(|b| to_epoch_days(b.date)).collect::<Vec<i32>>())
        .cast(&DataType::Date)
        .map_err(parquet_err("date cast"))?;
    let mut df = DataFrame::new(vec![
        date,
        Column::new("open".into(), field(|b| b.open)),
        Column::new("high".into(), field(|b| b.high)),
        Column::new("low".into(), field(|b| b.low)),
        Column::new("close".into(), field(|b| b.close)),
        Column::new("adj_close".into(), field(|b| b.adj_close)),
        Column::new("volume".into(), rows.iter().map(|b| b.volume).collect::<Vec<u64>>()),
    ])
    .map_err(parquet_err("build frame"))?;

    let tmp = path.with_extension("parquet.tmp");
    let file = fs::File::create(&tmp).map_err(cache_err("create partition"))?;
    ParquetWriter::new(file)
        .finish(&mut df)
        .map_err(parquet_err("write partition"))?;
    fs::rename(&tmp, path).map_err(|e| {
        let _ = fs::remove_file(&tmp);
        DataError::CacheError(format!("rename partition into place: {e}"))
    })
}

fn read_partition(path: &Path) -> Result<Vec<RawBar>, DataError> {
    let file = fs::File::open(path).map_err(cache_err("open partition"))?;
    let df = ParquetReader::new(file)
        .finish()
        .map_err(parquet_err("read partition"))?;

    if df.height() == 0 {
        return Err(DataError::ValidationError("partition has no rows".into()));
    }
    if let Some(missing) = PARTITION_COLUMNS.iter().find(|c| df.column(c).is_err()) {
        return Err(DataError::ValidationError(format!(
            "partition lacks column '{missing}'"
        )));
    }

    let floats = |name: &str| -> Result<Vec<f64>, DataError> {
        let col = df.column(name).map_err(parquet_err("column"))?;
        let ca = col.f64().map_err(parquet_err("float column"))?;
        Ok(ca.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect())
    };
    let open = floats("open")?;
    let high = floats("high")?;
    let low = floats("low")?;
    let close = floats("close")?;
    let adj_close = floats("adj_close")?;
    let date_col = df.column("date").map_err(parquet_err("column"))?;
    let dates = date_col.date().map_err(parquet_err("date column"))?;
    let volume_col = df.column("volume").map_err(parquet_err("column"))?;
    let volumes = volume_col.u64().map_err(parquet_err("volume column"))?;

    (0..df.height())
        .map(|i| {
            let days = dates
                .get(i)
                .ok_or_else(|| DataError::ParquetError(format!("null date at row {i}")))?;
            Ok(RawBar {
                date: from_epoch_days(days),
                open: open[i],
                high: high[i],
                low: low[i],
                close: close[i],
                adj_close: adj_close[i],
                volume: volumes.get(i).unwrap_or(0),
            })
        })
        .collect()
}
