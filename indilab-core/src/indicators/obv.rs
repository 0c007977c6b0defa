//! On-Balance Volume (OBV).
//!
//! Running total of volume signed by the direction of the day's price move.
//! Row 0 is missing (no prior day); row 1 is ±volume[1].
//! A NaN price makes that row missing without resetting the total.

use super::Indicator;
use crate::domain::{Bar, PriceField};

#[derive(Debug, Clone)]
pub struct Obv {
    field: PriceField,
}

impl Obv {
    pub fn new() -> Self {
        Self::on(PriceField::default())
    }

    pub fn on(field: PriceField) -> Self {
        Self { field }
    }
}

impl Default for Obv {
    fn default() -> Self {
        Self::new()
    }
}

impl Indicator for Obv {
    fn name(&self) -> &str {
        "obv"
    }

    fn lookback(&self) -> usize {
        1
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let n = bars.len();
        let mut result = vec![f64::NAN; n];
        let mut total = 0.0;

        for i in 1..n {
            let change = bars[i].price(self.field) - bars[i - 1].price(self.field);
            if change.is_nan() {
                continue;
            }
            let volume = bars[i].volume as f64;
            if change > 0.0 {
                total += volume;
            } else if change < 0.0 {
                total -= volume;
            }
            result[i] = total;
        }

        result
    }
}
