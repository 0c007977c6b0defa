//! Test helpers for building analyzed tables.

use chrono::NaiveDate;
use indilab_core::analysis::{analyze, AnalysisSettings};
use indilab_core::data::{generate_synthetic_bars, DataSource};

use crate::app::App;

/// App over a synthetic year of AAPL with default settings.
pub fn test_app(signals: bool) -> App {
    let mut settings = AnalysisSettings::default();
    settings.signals.enabled = signals;
    app_with(settings, 2023)
}

pub fn app_with(settings: AnalysisSettings, year: i32) -> App {
    let start = NaiveDate::from_ymd_opt(year, 1, 1).unwrap();
    let end = NaiveDate::from_ymd_opt(year, 12, 31).unwrap();
    let bars = generate_synthetic_bars("AAPL", start, end)
        .into_iter()
        .map(|b| b.into_bar("AAPL"))
        .collect();
    let table = analyze(bars, &settings).unwrap();
    App::new(table, settings, DataSource::Synthetic)
}

/// Flatten a buffer into one string, row by row.
pub fn buffer_text(buf: &ratatui::buffer::Buffer) -> String {
    let area = buf.area;
    let mut out = String::new();
    for y in area.top()..area.bottom() {
        for x in area.left()..area.right() {
            out.push_str(buf[(x, y)].symbol());
        }
        out.push('\n');
    }
    out
}
