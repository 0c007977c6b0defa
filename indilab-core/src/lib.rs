//! IndiLab Core: daily bars, technical indicators, buy flags.
//!
//! - Domain types (bars, price fields)
//! - Data layer: Yahoo provider, ingest, Parquet cache, bar loading
//! - `PriceTable`: date-indexed bars plus append-only derived columns
//! - Indicators (SMA, RSI, OBV) and buy rules
//! - Analysis pipeline, TOML config, CSV/Parquet export

pub mod analysis;
pub mod config;
pub mod data;
pub mod domain;
pub mod export;
pub mod indicators;
pub mod signals;
pub mod table;

pub use analysis::{analyze, AnalysisSettings, AnalysisSummary, ColumnKeys};
pub use config::AppConfig;
pub use table::PriceTable;
