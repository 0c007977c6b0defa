//! Bar loading for one symbol, with the fallback policy:
//!
//! 1. Cached data covering the range → use it
//! 2. Otherwise, if online and a provider is given → download, ingest, cache
//! 3. Otherwise, cached data that covers part of the range → use it, with a warning
//! 4. Otherwise, if `synthetic` → deterministic random walk, tagged as synthetic
//! 5. Otherwise → fail with a clear error
//!
//! Synthetic data is a developer mode for working offline. It is never
//! written to the cache.

use chrono::{Datelike, NaiveDate, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;
use tracing::{info, warn};

use super::cache::{CoverageResult, ParquetCache};
use super::ingest::ingest;
use super::provider::{DataError, DataProvider, DataSource, RawBar};
use crate::domain::Bar;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("no cached data for '{symbol}' and no network access (use --synthetic for synthetic data)")]
    NoCachedDataOffline { symbol: String },

    #[error("no cached data for '{symbol}' and download failed: {source}")]
    DownloadFailed {
        symbol: String,
        #[source]
        source: DataError,
    },

    #[error("no bars for '{symbol}' between {start} and {end}")]
    EmptyRange {
        symbol: String,
        start: NaiveDate,
        end: NaiveDate,
    },

    #[error("invalid date range: start {start} is after end {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    #[error("data error: {0}")]
    Data(#[from] DataError),
}

/// Options controlling how bars are loaded.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// Never make network requests.
    pub offline: bool,
    /// Generate synthetic bars when real data is unavailable.
    pub synthetic: bool,
    /// Re-download even if the cache covers the range.
    pub force: bool,
}

/// Bars for one symbol plus where they came from.
#[derive(Debug, Clone)]
pub struct LoadedData {
    pub symbol: String,
    pub bars: Vec<Bar>,
    pub source: DataSource,
}

impl LoadedData {
    pub fn is_synthetic(&self) -> bool {
        self.source == DataSource::Synthetic
    }
}

pub fn load_bars(
    symbol: &str,
    cache: &ParquetCache,
    provider: Option<&dyn DataProvider>,
    opts: &LoadOptions,
) -> Result<LoadedData, LoadError> {
    if opts.start > opts.end {
        return Err(LoadError::InvalidRange {
            start: opts.start,
            end: opts.end,
        });
    }

    if !opts.force && cache.covers_range(symbol, opts.start, opts.end) == CoverageResult::FullyCovered
    {
        match cache.load_range(symbol, opts.start, opts.end) {
            Ok(raw) => {
                info!(symbol, rows = raw.len(), "loaded bars from cache");
                return finish(symbol, raw, DataSource::Cache, opts);
            }
            Err(e) => warn!(symbol, error = %e, "cache unreadable, falling back"),
        }
    }

    let mut download_error = None;
    if !opts.offline {
        if let Some(provider) = provider {
            match download(symbol, cache, provider, opts) {
                Ok(raw) => return finish(symbol, raw, DataSource::YahooFinance, opts),
                Err(e) => {
                    warn!(symbol, provider = provider.name(), error = %e, "download failed");
                    download_error = Some(e);
                }
            }
        }
    }

    if let Ok(raw) = cache.load_range(symbol, opts.start, opts.end) {
        warn!(symbol, rows = raw.len(), "using cached bars that only partly cover the range");
        return finish(symbol, raw, DataSource::Cache, opts);
    }

    if opts.synthetic {
        warn!(symbol, "generating synthetic data; results are not real market data");
        let raw = generate_synthetic_bars(symbol, opts.start, opts.end);
        return finish(symbol, raw, DataSource::Synthetic, opts);
    }

    match download_error {
        Some(source) => Err(LoadError::DownloadFailed {
            symbol: symbol.to_string(),
            source,
        }),
        None => Err(LoadError::NoCachedDataOffline {
            symbol: symbol.to_string(),
        }),
    }
}

/// Fetch → ingest → cache write. Returns the ingested rows.
pub fn download(
    symbol: &str,
    cache: &ParquetCache,
    provider: &dyn DataProvider,
    opts: &LoadOptions,
) -> Result<Vec<RawBar>, DataError> {
    let fetched = provider.fetch(symbol, opts.start, opts.end)?;
    let ingested = ingest(fetched.bars)?;
    cache.write_fetched(symbol, &ingested.bars, fetched.source, opts.start, opts.end)?;
    info!(
        symbol,
        rows = ingested.bars.len(),
        duplicates = ingested.duplicates_dropped,
        "cached downloaded bars"
    );
    Ok(ingested.bars)
}

fn finish(
    symbol: &str,
    raw: Vec<RawBar>,
    source: DataSource,
    opts: &LoadOptions,
) -> Result<LoadedData, LoadError> {
    let bars: Vec<Bar> = raw
        .into_iter()
        .filter(|b| b.date >= opts.start && b.date <= opts.end)
        .map(|b| b.into_bar(symbol))
        .collect();

    if bars.is_empty() {
        return Err(LoadError::EmptyRange {
            symbol: symbol.to_string(),
            start: opts.start,
            end: opts.end,
        });
    }

    Ok(LoadedData {
        symbol: symbol.to_string(),
        bars,
        source,
    })
}

/// Weekday-only random walk from 100.0, seeded from the symbol name so the
/// same symbol always produces the same series.
pub fn generate_synthetic_bars(symbol: &str, start: NaiveDate, end: NaiveDate) -> Vec<RawBar> {
    let seed: [u8; 32] = *blake3::hash(symbol.as_bytes()).as_bytes();
    let mut rng = StdRng::from_seed(seed);

    let mut bars = Vec::new();
    let mut price = 100.0_f64;
    let mut current = start;

    while current <= end {
        if matches!(current.weekday(), Weekday::Sat | Weekday::Sun) {
            current += chrono::Duration::days(1);
            continue;
        }

        let daily_return: f64 = rng.gen_range(-0.03..0.03);
        let open = price;
        let close = price * (1.0 + daily_return);
        let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.01));
        let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.01));
        let volume = rng.gen_range(500_000..5_000_000u64);

        bars.push(RawBar {
            date: current,
            open,
            high,
            low,
            close,
            adj_close: close,
            volume,
        });

        price = close;
        current += chrono::Duration::days(1);
    }

    bars
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::provider::FetchResult;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn opts(offline: bool, synthetic: bool) -> LoadOptions {
        LoadOptions {
            start: d(2023, 1, 2),
            end: d(2023, 1, 31),
            offline,
            synthetic,
            force: false,
        }
    }

    struct FixtureProvider {
        calls: AtomicUsize,
        fail: bool,
    }

    impl FixtureProvider {
        fn new(fail: bool) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail,
            }
        }
    }

    impl DataProvider for FixtureProvider {
        fn name(&self) -> &str {
            "fixture"
        }

        fn fetch(
            &self,
            symbol: &str,
            start: NaiveDate,
            end: NaiveDate,
        ) -> Result<FetchResult, DataError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(DataError::NetworkUnreachable("fixture offline".into()));
            }
            Ok(FetchResult {
                symbol: symbol.to_string(),
                bars: generate_synthetic_bars("FIXTURE", start, end),
                source: DataSource::YahooFinance,
            })
        }
    }

    #[test]
    fn downloads_then_serves_from_cache() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ParquetCache::new(dir.path());
        let provider = FixtureProvider::new(false);

        let first = load_bars("AAPL", &cache, Some(&provider), &opts(false, false)).unwrap();
        assert_eq!(first.source, DataSource::YahooFinance);
        assert_eq!(first.bars.len(), 22);
        assert!(first.bars.iter().all(|b| b.symbol == "AAPL"));

        let second = load_bars("AAPL", &cache, Some(&provider), &opts(false, false)).unwrap();
        assert_eq!(second.source, DataSource::Cache);
        assert_eq!(second.bars, first.bars);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn offline_without_cache_fails() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ParquetCache::new(dir.path());
        let err = load_bars("AAPL", &cache, None, &opts(true, false)).unwrap_err();
        assert!(matches!(err, LoadError::NoCachedDataOffline { .. }));
    }

    #[test]
    fn failed_download_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ParquetCache::new(dir.path());
        let provider = FixtureProvider::new(true);
        let err = load_bars("AAPL", &cache, Some(&provider), &opts(false, false)).unwrap_err();
        assert!(matches!(err, LoadError::DownloadFailed { .. }));
    }

    #[test]
    fn synthetic_fallback_is_tagged_and_not_cached() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ParquetCache::new(dir.path());
        let loaded = load_bars("AAPL", &cache, None, &opts(true, true)).unwrap();
        assert!(loaded.is_synthetic());
        assert!(!loaded.bars.is_empty());
        assert!(cache.get_meta("AAPL").is_none());
    }

    #[test]
    fn offline_uses_partial_cache() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ParquetCache::new(dir.path());
        let raw = generate_synthetic_bars("AAPL", d(2023, 1, 2), d(2023, 1, 13));
        cache.write("AAPL", &raw, DataSource::YahooFinance).unwrap();

        let loaded = load_bars("AAPL", &cache, None, &opts(true, false)).unwrap();
        assert_eq!(loaded.source, DataSource::Cache);
        assert_eq!(loaded.bars.len(), 10);
    }

    #[test]
    fn inverted_range_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ParquetCache::new(dir.path());
        let mut o = opts(true, true);
        o.start = d(2023, 2, 1);
        let err = load_bars("AAPL", &cache, None, &o).unwrap_err();
        assert!(matches!(err, LoadError::InvalidRange { .. }));
    }

    #[test]
    fn synthetic_bars_are_deterministic_weekdays() {
        let a = generate_synthetic_bars("AAPL", d(2023, 1, 1), d(2023, 1, 14));
        let b = generate_synthetic_bars("AAPL", d(2023, 1, 1), d(2023, 1, 14));
        assert_eq!(a, b);
        assert_eq!(a.len(), 10);
        assert!(a
            .iter()
            .all(|bar| !matches!(bar.date.weekday(), Weekday::Sat | Weekday::Sun)));
        assert!(a.iter().all(|bar| bar.high >= bar.low));
    }
}
