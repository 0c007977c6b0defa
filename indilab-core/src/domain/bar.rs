//! Bar: one trading day for one symbol.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Which price series an indicator reads.
///
/// Analysis defaults to the adjusted close so that splits and dividends do
/// not show up as price jumps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceField {
    Close,
    #[default]
    AdjClose,
}

impl PriceField {
    pub fn label(self) -> &'static str {
        match self {
            PriceField::Close => "close",
            PriceField::AdjClose => "adj_close",
        }
    }
}

/// Daily OHLCV bar for a single symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub symbol: String,
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub adj_close: f64,
    pub volume: u64,
}

impl Bar {
    /// Returns true if any price field is NaN.
    pub fn is_void(&self) -> bool {
        self.open.is_nan()
            || self.high.is_nan()
            || self.low.is_nan()
            || self.close.is_nan()
            || self.adj_close.is_nan()
    }

    /// Basic OHLC sanity check: high >= low, high >= open, high >= close, etc.
    pub fn is_sane(&self) -> bool {
        if self.is_void() {
            return false;
        }
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
            && self.open > 0.0
            && self.close > 0.0
    }

    pub fn price(&self, field: PriceField) -> f64 {
        match field {
            PriceField::Close => self.close,
            PriceField::AdjClose => self.adj_close,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_bar() -> Bar {
        Bar {
            symbol: "AAPL".into(),
            date: NaiveDate::from_ymd_opt(2023, 1, 3).unwrap(),
            open: 130.0,
            high: 131.0,
            low: 124.0,
            close: 125.0,
            adj_close: 124.2,
            volume: 112_117_500,
        }
    }

    #[test]
    fn bar_is_sane() {
        assert!(sample_bar().is_sane());
    }

    #[test]
    fn bar_detects_void() {
        let mut bar = sample_bar();
        bar.adj_close = f64::NAN;
        assert!(bar.is_void());
        assert!(!bar.is_sane());
    }

    #[test]
    fn bar_detects_inverted_range() {
        let mut bar = sample_bar();
        bar.high = 120.0;
        assert!(!bar.is_sane());
    }

    #[test]
    fn price_field_selects_series() {
        let bar = sample_bar();
        assert_eq!(bar.price(PriceField::Close), 125.0);
        assert_eq!(bar.price(PriceField::AdjClose), 124.2);
        assert_eq!(PriceField::default(), PriceField::AdjClose);
    }

    #[test]
    fn price_field_serde_names() {
        let json = serde_json::to_string(&PriceField::AdjClose).unwrap();
        assert_eq!(json, "\"adj_close\"");
        let parsed: PriceField = serde_json::from_str("\"close\"").unwrap();
        assert_eq!(parsed, PriceField::Close);
    }
}
