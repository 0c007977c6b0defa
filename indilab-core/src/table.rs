//! `PriceTable`: the date-indexed table of daily bars plus derived columns.
//!
//! Sourced columns (OHLCV) come from the bars and never change. Derived
//! columns are appended once, in order, and never removed or overwritten.
//! Numeric cells use `f64::NAN` for missing values.

use chrono::NaiveDate;
use polars::prelude::*;
use thiserror::Error;
use tracing::debug;

use crate::domain::{Bar, PriceField};

/// Names reserved by the sourced columns.
pub const SOURCED_COLUMNS: [&str; 7] =
    ["date", "open", "high", "low", "close", "adj_close", "volume"];

#[derive(Debug, Error)]
pub enum TableError {
    #[error("cannot build a table from zero bars")]
    Empty,

    #[error("dates must be strictly ascending: {next} follows {prev}")]
    UnorderedDates { prev: NaiveDate, next: NaiveDate },

    #[error("column '{0}' already exists")]
    DuplicateColumn(String),

    #[error("column '{name}' has {actual} rows, table has {expected}")]
    LengthMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },

    #[error("dataframe conversion failed: {0}")]
    Frame(#[from] PolarsError),
}

#[derive(Debug, Clone)]
pub struct PriceTable {
    symbol: String,
    bars: Vec<Bar>,
    columns: Vec<(String, Vec<f64>)>,
    flags: Vec<(String, Vec<bool>)>,
}

impl PriceTable {
    pub fn from_bars(bars: Vec<Bar>) -> Result<Self, TableError> {
        let symbol = match bars.first() {
            Some(bar) => bar.symbol.clone(),
            None => return Err(TableError::Empty),
        };
        for pair in bars.windows(2) {
            if pair[1].date <= pair[0].date {
                return Err(TableError::UnorderedDates {
                    prev: pair[0].date,
                    next: pair[1].date,
                });
            }
        }
        Ok(Self {
            symbol,
            bars,
            columns: Vec::new(),
            flags: Vec::new(),
        })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn first_date(&self) -> NaiveDate {
        self.bars[0].date
    }

    pub fn last_date(&self) -> NaiveDate {
        self.bars[self.bars.len() - 1].date
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.bars.iter().map(|b| b.date).collect()
    }

    pub fn prices(&self, field: PriceField) -> Vec<f64> {
        self.bars.iter().map(|b| b.price(field)).collect()
    }

    pub fn volumes(&self) -> Vec<u64> {
        self.bars.iter().map(|b| b.volume).collect()
    }

    /// Whether `name` is taken by a sourced column, a derived column or a flag.
    pub fn has_name(&self, name: &str) -> bool {
        SOURCED_COLUMNS.contains(&name)
            || self.columns.iter().any(|(n, _)| n == name)
            || self.flags.iter().any(|(n, _)| n == name)
    }

    fn check_new(&self, name: &str, len: usize) -> Result<(), TableError> {
        if self.has_name(name) {
            return Err(TableError::DuplicateColumn(name.to_string()));
        }
        if len != self.len() {
            return Err(TableError::LengthMismatch {
                name: name.to_string(),
                expected: self.len(),
                actual: len,
            });
        }
        Ok(())
    }

    pub fn add_column(&mut self, name: impl Into<String>, values: Vec<f64>) -> Result<(), TableError> {
        let name = name.into();
        self.check_new(&name, values.len())?;
        debug!(column = %name, "added derived column");
        self.columns.push((name, values));
        Ok(())
    }

    pub fn add_flag(&mut self, name: impl Into<String>, values: Vec<bool>) -> Result<(), TableError> {
        let name = name.into();
        self.check_new(&name, values.len())?;
        debug!(flag = %name, set = values.iter().filter(|&&v| v).count(), "added flag column");
        self.flags.push((name, values));
        Ok(())
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_slice())
    }

    pub fn flag(&self, name: &str) -> Option<&[bool]> {
        self.flags
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_slice())
    }

    /// Derived value at `row`; `None` if the column is unknown, the row is out
    /// of range, or the cell is missing.
    pub fn value(&self, name: &str, row: usize) -> Option<f64> {
        self.column(name)
            .and_then(|c| c.get(row).copied())
            .filter(|v| !v.is_nan())
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn flag_names(&self) -> Vec<&str> {
        self.flags.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    pub fn flagged_rows(&self, name: &str) -> Vec<usize> {
        self.flag(name)
            .map(|f| {
                f.iter()
                    .enumerate()
                    .filter_map(|(i, &set)| set.then_some(i))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Full table as a polars frame. Missing numeric cells become nulls.
    pub fn to_dataframe(&self) -> Result<DataFrame, TableError> {
        let epoch = NaiveDate::default();
        let dates: Vec<i32> = self
            .bars
            .iter()
            .map(|b| (b.date - epoch).num_days() as i32)
            .collect();

        let mut cols = vec![
            Column::new("date".into(), dates).cast(&DataType::Date)?,
            Column::new("open".into(), self.bars.iter().map(|b| b.open).collect::<Vec<_>>()),
            Column::new("high".into(), self.bars.iter().map(|b| b.high).collect::<Vec<_>>()),
            Column::new("low".into(), self.bars.iter().map(|b| b.low).collect::<Vec<_>>()),
            Column::new("close".into(), self.bars.iter().map(|b| b.close).collect::<Vec<_>>()),
            Column::new(
                "adj_close".into(),
                self.bars.iter().map(|b| b.adj_close).collect::<Vec<_>>(),
            ),
            Column::new("volume".into(), self.volumes()),
        ];

        for (name, values) in &self.columns {
            let cells: Vec<Option<f64>> = values
                .iter()
                .map(|&v| (!v.is_nan()).then_some(v))
                .collect();
            cols.push(Column::new(name.as_str().into(), cells));
        }
        for (name, values) in &self.flags {
            cols.push(Column::new(name.as_str().into(), values.clone()));
        }

        Ok(DataFrame::new(cols)?)
    }
}
