//! Golden cross: the fast SMA crosses above the slow SMA while RSI is still
//! below the overbought line.

use super::{current_and_previous, BuyRule};
use crate::table::PriceTable;

#[derive(Debug, Clone)]
pub struct GoldenCross {
    pub fast_key: String,
    pub slow_key: String,
    pub rsi_key: String,
    pub overbought: f64,
}

impl GoldenCross {
    pub fn new(
        fast_key: impl Into<String>,
        slow_key: impl Into<String>,
        rsi_key: impl Into<String>,
        overbought: f64,
    ) -> Self {
        Self {
            fast_key: fast_key.into(),
            slow_key: slow_key.into(),
            rsi_key: rsi_key.into(),
            overbought,
        }
    }
}

impl BuyRule for GoldenCross {
    fn name(&self) -> &str {
        "buy_golden_cross"
    }

    fn required_columns(&self) -> Vec<String> {
        vec![
            self.fast_key.clone(),
            self.slow_key.clone(),
            self.rsi_key.clone(),
        ]
    }

    fn evaluate(&self, table: &PriceTable, row: usize) -> bool {
        let Some((fast, fast_prev)) = current_and_previous(table, &self.fast_key, row) else {
            return false;
        };
        let Some((slow, slow_prev)) = current_and_previous(table, &self.slow_key, row) else {
            return false;
        };
        let Some(rsi) = table.value(&self.rsi_key, row) else {
            return false;
        };
        fast > slow && fast_prev <= slow_prev && rsi < self.overbought
    }
}
