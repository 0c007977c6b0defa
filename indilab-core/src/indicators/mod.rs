//! Indicator trait and concrete indicators.
//!
//! Indicators are pure functions: bar history in, numeric series out. Each
//! output has the same length as the input, with `f64::NAN` marking rows
//! where the indicator is not yet (or not) defined.
//!
//! # Look-ahead contamination guard
//! No indicator value at row t may depend on data from row t+1 or later.
//! `tests/lookahead_test.rs` checks every indicator against a truncated series.

pub mod obv;
pub mod rsi;
pub mod sma;

pub use obv::Obv;
pub use rsi::{rsi_from_averages, Rsi, RsiSmoothing};
pub use sma::Sma;

use crate::domain::Bar;

pub trait Indicator: Send + Sync {
    /// Column name, e.g. "sma_50", "rsi_14", "obv".
    fn name(&self) -> &str;

    /// Number of leading rows that are always missing.
    fn lookback(&self) -> usize;

    /// Compute the indicator for the entire bar series.
    fn compute(&self, bars: &[Bar]) -> Vec<f64>;
}

/// Run every indicator over the same bars, keeping their order.
pub fn compute_all(indicators: &[Box<dyn Indicator>], bars: &[Bar]) -> Vec<(String, Vec<f64>)> {
    indicators
        .iter()
        .map(|ind| (ind.name().to_string(), ind.compute(bars)))
        .collect()
}

/// Synthetic bars from prices for testing: adj_close = close = price,
/// open = previous price, volume = 1000.
#[cfg(test)]
pub fn make_bars(prices: &[f64]) -> Vec<Bar> {
    make_bars_with_volume(prices, &vec![1000; prices.len()])
}

#[cfg(test)]
pub fn make_bars_with_volume(prices: &[f64], volumes: &[u64]) -> Vec<Bar> {
    let base_date = chrono::NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
    prices
        .iter()
        .zip(volumes)
        .enumerate()
        .map(|(i, (&price, &volume))| {
            let open = if i == 0 { price } else { prices[i - 1] };
            Bar {
                symbol: "TEST".to_string(),
                date: base_date + chrono::Duration::days(i as i64),
                open,
                high: open.max(price) + 1.0,
                low: open.min(price) - 1.0,
                close: price,
                adj_close: price,
                volume,
            }
        })
        .collect()
}

#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
