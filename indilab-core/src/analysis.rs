//! Analysis pipeline: bars → table → indicator columns → optional buy flags.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::domain::{Bar, PriceField};
use crate::indicators::{Indicator, Obv, Rsi, RsiSmoothing, Sma};
use crate::signals::{apply_rules, BuyRule, GoldenCross, OversoldReversal, SignalError};
use crate::table::{PriceTable, TableError};

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("invalid analysis settings: {0}")]
    InvalidSettings(String),

    #[error(transparent)]
    Table(#[from] TableError),

    #[error(transparent)]
    Signal(#[from] SignalError),
}

/// `[indicators]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorSettings {
    pub sma_short: usize,
    pub sma_long: usize,
    pub rsi_period: usize,
    pub rsi_smoothing: RsiSmoothing,
    pub price_field: PriceField,
}

impl Default for IndicatorSettings {
    fn default() -> Self {
        Self {
            sma_short: 50,
            sma_long: 200,
            rsi_period: 14,
            rsi_smoothing: RsiSmoothing::Simple,
            price_field: PriceField::AdjClose,
        }
    }
}

/// `[signals]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalSettings {
    pub enabled: bool,
    pub oversold: f64,
    pub overbought: f64,
}

impl Default for SignalSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            oversold: 30.0,
            overbought: 70.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSettings {
    #[serde(default)]
    pub indicators: IndicatorSettings,
    #[serde(default)]
    pub signals: SignalSettings,
}

impl AnalysisSettings {
    pub fn validate(&self) -> Result<(), AnalysisError> {
        let ind = &self.indicators;
        if ind.sma_short == 0 || ind.sma_long == 0 || ind.rsi_period == 0 {
            return Err(AnalysisError::InvalidSettings(
                "indicator periods must be >= 1".into(),
            ));
        }
        if ind.sma_short >= ind.sma_long {
            return Err(AnalysisError::InvalidSettings(format!(
                "sma_short ({}) must be less than sma_long ({})",
                ind.sma_short, ind.sma_long
            )));
        }
        let sig = &self.signals;
        if !(0.0..=100.0).contains(&sig.oversold)
            || !(0.0..=100.0).contains(&sig.overbought)
            || sig.oversold >= sig.overbought
        {
            return Err(AnalysisError::InvalidSettings(format!(
                "need 0 <= oversold ({}) < overbought ({}) <= 100",
                sig.oversold, sig.overbought
            )));
        }
        Ok(())
    }

    pub fn keys(&self) -> ColumnKeys {
        ColumnKeys::from_settings(self)
    }
}

/// Canonical derived column names for a set of settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnKeys {
    pub sma_short: String,
    pub sma_long: String,
    pub rsi: String,
    pub obv: String,
}

impl ColumnKeys {
    pub fn from_settings(settings: &AnalysisSettings) -> Self {
        let ind = &settings.indicators;
        Self {
            sma_short: format!("sma_{}", ind.sma_short),
            sma_long: format!("sma_{}", ind.sma_long),
            rsi: format!("rsi_{}", ind.rsi_period),
            obv: "obv".to_string(),
        }
    }
}

/// Build the full table for `bars`: SMA short, SMA long, RSI, OBV, then the
/// buy flags when signals are enabled.
pub fn analyze(bars: Vec<Bar>, settings: &AnalysisSettings) -> Result<PriceTable, AnalysisError> {
    settings.validate()?;
    let ind = &settings.indicators;

    let mut table = PriceTable::from_bars(bars)?;

    let indicators: Vec<Box<dyn Indicator>> = vec![
        Box::new(Sma::on(ind.sma_short, ind.price_field)),
        Box::new(Sma::on(ind.sma_long, ind.price_field)),
        Box::new(Rsi::with_smoothing(ind.rsi_period, ind.rsi_smoothing, ind.price_field)),
        Box::new(Obv::on(ind.price_field)),
    ];
    for indicator in &indicators {
        let values = indicator.compute(table.bars());
        table.add_column(indicator.name(), values)?;
    }

    if settings.signals.enabled {
        apply_rules(&mut table, &buy_rules(settings))?;
    }

    info!(
        symbol = table.symbol(),
        rows = table.len(),
        columns = table.column_names().len(),
        flags = table.flag_names().len(),
        "analysis complete"
    );
    Ok(table)
}

/// The two buy rules wired to the settings' column keys and thresholds.
pub fn buy_rules(settings: &AnalysisSettings) -> Vec<Box<dyn BuyRule>> {
    let keys = settings.keys();
    vec![
        Box::new(OversoldReversal::new(
            keys.rsi.clone(),
            keys.obv.clone(),
            settings.signals.oversold,
        )),
        Box::new(GoldenCross::new(
            keys.sma_short,
            keys.sma_long,
            keys.rsi,
            settings.signals.overbought,
        )),
    ]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RsiZone {
    Oversold,
    Neutral,
    Overbought,
}

impl RsiZone {
    pub fn classify(rsi: f64, oversold: f64, overbought: f64) -> Self {
        if rsi < oversold {
            RsiZone::Oversold
        } else if rsi > overbought {
            RsiZone::Overbought
        } else {
            RsiZone::Neutral
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RsiZone::Oversold => "oversold",
            RsiZone::Neutral => "neutral",
            RsiZone::Overbought => "overbought",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlagSummary {
    pub name: String,
    pub count: usize,
    pub last_date: Option<NaiveDate>,
    pub dates: Vec<NaiveDate>,
}

/// Snapshot of the last row plus per-flag counts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSummary {
    pub symbol: String,
    pub first_date: NaiveDate,
    pub last_date: NaiveDate,
    pub rows: usize,
    pub last_price: f64,
    pub sma_short: Option<f64>,
    pub sma_long: Option<f64>,
    pub rsi: Option<f64>,
    pub obv: Option<f64>,
    pub rsi_zone: Option<RsiZone>,
    pub flags: Vec<FlagSummary>,
}

impl AnalysisSummary {
    pub fn from_table(table: &PriceTable, settings: &AnalysisSettings) -> Self {
        let keys = settings.keys();
        let last = table.len() - 1;
        let rsi = table.value(&keys.rsi, last);
        let dates = table.dates();

        let flags = table
            .flag_names()
            .into_iter()
            .map(|name| {
                let flagged: Vec<NaiveDate> =
                    table.flagged_rows(name).into_iter().map(|i| dates[i]).collect();
                FlagSummary {
                    name: name.to_string(),
                    count: flagged.len(),
                    last_date: flagged.last().copied(),
                    dates: flagged,
                }
            })
            .collect();

        Self {
            symbol: table.symbol().to_string(),
            first_date: table.first_date(),
            last_date: table.last_date(),
            rows: table.len(),
            last_price: table.bars()[last].price(settings.indicators.price_field),
            sma_short: table.value(&keys.sma_short, last),
            sma_long: table.value(&keys.sma_long, last),
            rsi,
            obv: table.value(&keys.obv, last),
            rsi_zone: rsi.map(|v| {
                RsiZone::classify(v, settings.signals.oversold, settings.signals.overbought)
            }),
            flags,
        }
    }
}
