//! Relative Strength Index (RSI).
//!
//! RSI = 100 - 100 / (1 + avg_gain / avg_loss)
//!
//! Two smoothing modes:
//! - `Simple`: rolling mean of the trailing `period` gains and losses. Row 0
//!   has no prior day, so its change counts as zero, as does any change next to
//!   a missing price. First value at `period - 1`.
//! - `Wilder`: seeded with the mean of changes `1..=period`, then
//!   `avg += (x - avg) / period`. First value at `period`.
//!
//! Edge cases: avg_loss == 0 with gains → 100; no movement at all → NaN.

use serde::{Deserialize, Serialize};

use super::sma::rolling_mean;
use super::Indicator;
use crate::domain::{Bar, PriceField};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RsiSmoothing {
    #[default]
    Simple,
    Wilder,
}

#[derive(Debug, Clone)]
pub struct Rsi {
    period: usize,
    smoothing: RsiSmoothing,
    field: PriceField,
    name: String,
}

impl Rsi {
    pub fn new(period: usize) -> Self {
        Self::with_smoothing(period, RsiSmoothing::default(), PriceField::default())
    }

    pub fn with_smoothing(period: usize, smoothing: RsiSmoothing, field: PriceField) -> Self {
        assert!(period >= 1, "RSI period must be >= 1");
        Self {
            period,
            smoothing,
            field,
            name: format!("rsi_{period}"),
        }
    }

    pub fn period(&self) -> usize {
        self.period
    }

    pub fn smoothing(&self) -> RsiSmoothing {
        self.smoothing
    }
}

impl Indicator for Rsi {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        match self.smoothing {
            RsiSmoothing::Simple => self.period - 1,
            RsiSmoothing::Wilder => self.period,
        }
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let prices: Vec<f64> = bars.iter().map(|b| b.price(self.field)).collect();
        let changes = price_changes(&prices);
        match self.smoothing {
            RsiSmoothing::Simple => simple_rsi(&changes, self.period),
            RsiSmoothing::Wilder => wilder_rsi(&changes, self.period),
        }
    }
}

/// `price[t] - price[t-1]`, with row 0 fixed at zero. NaN if either side is NaN.
fn price_changes(prices: &[f64]) -> Vec<f64> {
    let mut changes = Vec::with_capacity(prices.len());
    if !prices.is_empty() {
        changes.push(0.0);
    }
    changes.extend(prices.windows(2).map(|w| w[1] - w[0]));
    changes
}

fn simple_rsi(changes: &[f64], period: usize) -> Vec<f64> {
    // A missing change counts as neither gain nor loss, the same as row 0.
    let gains: Vec<f64> = changes
        .iter()
        .map(|&c| if c > 0.0 { c } else { 0.0 })
        .collect();
    let losses: Vec<f64> = changes
        .iter()
        .map(|&c| if c < 0.0 { -c } else { 0.0 })
        .collect();

    let avg_gain = rolling_mean(&gains, period);
    let avg_loss = rolling_mean(&losses, period);

    avg_gain
        .iter()
        .zip(&avg_loss)
        .map(|(&g, &l)| rsi_from_averages(g, l))
        .collect()
}

fn wilder_rsi(changes: &[f64], period: usize) -> Vec<f64> {
    let n = changes.len();
    let mut result = vec![f64::NAN; n];

    let p = period as f64;
    let mut avg_gain = 0.0;
    let mut avg_loss = 0.0;
    // Changes accumulated toward the seed; `period` once seeded.
    let mut seen = 0usize;

    // Row 0 has no real change, so seeding starts at row 1.
    for i in 1..n {
        let ch = changes[i];
        if ch.is_nan() {
            // A gap restarts the seed window.
            avg_gain = 0.0;
            avg_loss = 0.0;
            seen = 0;
            continue;
        }

        let gain = ch.max(0.0);
        let loss = (-ch).max(0.0);

        if seen < period {
            avg_gain += gain;
            avg_loss += loss;
            seen += 1;
            if seen == period {
                avg_gain /= p;
                avg_loss /= p;
                result[i] = rsi_from_averages(avg_gain, avg_loss);
            }
        } else {
            avg_gain += (gain - avg_gain) / p;
            avg_loss += (loss - avg_loss) / p;
            result[i] = rsi_from_averages(avg_gain, avg_loss);
        }
    }

    result
}

/// RSI from averaged gain and loss. NaN when either input is missing or
/// when there was no movement at all.
pub fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_gain.is_nan() || avg_loss.is_nan() {
        return f64::NAN;
    }
    if avg_loss == 0.0 {
        return if avg_gain > 0.0 { 100.0 } else { f64::NAN };
    }
    100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
}
