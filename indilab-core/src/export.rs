//! Table export to CSV and Parquet.

use std::fs;
use std::path::Path;

use polars::prelude::*;
use thiserror::Error;
use tracing::info;

use crate::table::{PriceTable, TableError, SOURCED_COLUMNS};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Table(#[from] TableError),

    #[error("parquet error: {0}")]
    Parquet(#[from] PolarsError),
}

/// Format a numeric cell; missing values are empty.
fn cell(v: f64) -> String {
    if v.is_nan() {
        String::new()
    } else {
        v.to_string()
    }
}

pub fn write_table_csv(path: &Path, table: &PriceTable) -> Result<(), ExportError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut writer = csv::Writer::from_path(path)?;

    let columns = table.column_names();
    let flags = table.flag_names();

    let mut header: Vec<&str> = SOURCED_COLUMNS.to_vec();
    header.extend(&columns);
    header.extend(&flags);
    writer.write_record(&header)?;

    let derived: Vec<&[f64]> = columns.iter().filter_map(|c| table.column(c)).collect();
    let flag_values: Vec<&[bool]> = flags.iter().filter_map(|f| table.flag(f)).collect();

    for (row, bar) in table.bars().iter().enumerate() {
        let mut record = vec![
            bar.date.to_string(),
            cell(bar.open),
            cell(bar.high),
            cell(bar.low),
            cell(bar.close),
            cell(bar.adj_close),
            bar.volume.to_string(),
        ];
        record.extend(derived.iter().map(|c| cell(c[row])));
        record.extend(flag_values.iter().map(|f| f[row].to_string()));
        writer.write_record(&record)?;
    }
    writer.flush()?;

    info!(path = %path.display(), rows = table.len(), "exported table to csv");
    Ok(())
}

pub fn write_table_parquet(path: &Path, table: &PriceTable) -> Result<(), ExportError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut df = table.to_dataframe()?;
    let file = fs::File::create(path)?;
    ParquetWriter::new(file).finish(&mut df)?;

    info!(path = %path.display(), rows = table.len(), "exported table to parquet");
    Ok(())
}
