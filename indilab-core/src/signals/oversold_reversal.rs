//! Oversold reversal: RSI below the oversold line and turning up, with OBV
//! rising on the same day.

use super::{current_and_previous, BuyRule};
use crate::table::PriceTable;

#[derive(Debug, Clone)]
pub struct OversoldReversal {
    pub rsi_key: String,
    pub obv_key: String,
    pub oversold: f64,
}

impl OversoldReversal {
    pub fn new(rsi_key: impl Into<String>, obv_key: impl Into<String>, oversold: f64) -> Self {
        Self {
            rsi_key: rsi_key.into(),
            obv_key: obv_key.into(),
            oversold,
        }
    }
}

impl BuyRule for OversoldReversal {
    fn name(&self) -> &str {
        "buy_oversold_reversal"
    }

    fn required_columns(&self) -> Vec<String> {
        vec![self.rsi_key.clone(), self.obv_key.clone()]
    }

    fn evaluate(&self, table: &PriceTable, row: usize) -> bool {
        let Some((rsi, rsi_prev)) = current_and_previous(table, &self.rsi_key, row) else {
            return false;
        };
        let Some((obv, obv_prev)) = current_and_previous(table, &self.obv_key, row) else {
            return false;
        };
        rsi < self.oversold && rsi > rsi_prev && obv > obv_prev
    }
}
