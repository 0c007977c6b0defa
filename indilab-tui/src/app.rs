//! Application state: the analyzed table plus the visible window.
//!
//! Single owner, main thread only.

use std::ops::Range;

use chrono::NaiveDate;
use tracing::{info, warn};

use indilab_core::analysis::{buy_rules, AnalysisSettings, ColumnKeys};
use indilab_core::data::DataSource;
use indilab_core::signals::apply_rules;
use indilab_core::table::PriceTable;

/// Zooming never shows fewer rows than this (unless the table is shorter).
pub const MIN_VIEW_ROWS: usize = 10;

/// Contiguous slice of table rows on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewWindow {
    start: usize,
    len: usize,
    total: usize,
}

impl ViewWindow {
    /// Whole table visible.
    pub fn full(total: usize) -> Self {
        Self {
            start: 0,
            len: total,
            total,
        }
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.start + self.len
    }

    fn min_len(&self) -> usize {
        MIN_VIEW_ROWS.min(self.total)
    }

    fn pan_step(&self) -> usize {
        (self.len / 10).max(1)
    }

    pub fn pan_left(&mut self) {
        self.start = self.start.saturating_sub(self.pan_step());
    }

    pub fn pan_right(&mut self) {
        let max_start = self.total - self.len;
        self.start = (self.start + self.pan_step()).min(max_start);
    }

    /// Show about two thirds as many rows, keeping the center in place.
    pub fn zoom_in(&mut self) {
        let new_len = (self.len * 2 / 3).max(self.min_len());
        self.resize(new_len);
    }

    /// Show about half again as many rows, keeping the center in place.
    pub fn zoom_out(&mut self) {
        let new_len = (self.len * 3 / 2 + 1).min(self.total);
        self.resize(new_len);
    }

    pub fn reset(&mut self) {
        *self = Self::full(self.total);
    }

    fn resize(&mut self, new_len: usize) {
        let center = self.start + self.len / 2;
        let start = center.saturating_sub(new_len / 2);
        self.len = new_len;
        self.start = start.min(self.total - new_len);
    }
}

/// Status message severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    Info,
    Warning,
    Error,
}

pub struct App {
    pub table: PriceTable,
    pub settings: AnalysisSettings,
    pub keys: ColumnKeys,
    pub source: DataSource,
    pub view: ViewWindow,
    pub show_signals: bool,
    pub running: bool,
    pub status_message: Option<(String, StatusLevel)>,
}

impl App {
    pub fn new(table: PriceTable, settings: AnalysisSettings, source: DataSource) -> Self {
        let view = ViewWindow::full(table.len());
        let keys = settings.keys();
        let show_signals = !table.flag_names().is_empty();
        let status_message = (source == DataSource::Synthetic).then(|| {
            (
                "SYNTHETIC data: not real market prices".to_string(),
                StatusLevel::Warning,
            )
        });
        Self {
            table,
            keys,
            source,
            view,
            show_signals,
            running: true,
            status_message,
            settings,
        }
    }

    pub fn symbol(&self) -> &str {
        self.table.symbol()
    }

    pub fn set_status(&mut self, msg: impl Into<String>) {
        self.status_message = Some((msg.into(), StatusLevel::Info));
    }

    pub fn set_error(&mut self, msg: impl Into<String>) {
        self.status_message = Some((msg.into(), StatusLevel::Error));
    }

    /// First and last date on screen.
    pub fn visible_dates(&self) -> (NaiveDate, NaiveDate) {
        let bars = self.table.bars();
        let range = self.view.range();
        (bars[range.start].date, bars[range.end - 1].date)
    }

    /// Show or hide buy markers. The flags are computed the first time they
    /// are needed.
    pub fn toggle_signals(&mut self) {
        if self.show_signals {
            self.show_signals = false;
            self.set_status("Buy markers hidden");
            return;
        }

        if self.table.flag_names().is_empty() {
            if let Err(e) = apply_rules(&mut self.table, &buy_rules(&self.settings)) {
                warn!(error = %e, "failed to compute buy flags");
                self.set_error(format!("Buy flags unavailable: {e}"));
                return;
            }
            self.settings.signals.enabled = true;
            info!(symbol = self.table.symbol(), "buy flags computed on demand");
        }

        self.show_signals = true;
        let count: usize = self
            .table
            .flag_names()
            .iter()
            .map(|f| self.table.flagged_rows(f).len())
            .sum();
        self.set_status(format!("Buy markers shown ({count} flagged rows)"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::test_app;
    use proptest::prelude::*;

    #[test]
    fn starts_with_full_view() {
        let app = test_app(false);
        assert_eq!(app.view.range(), 0..260);
        assert!(app.running);
        assert!(!app.show_signals);
        assert_eq!(
            app.status_message.as_ref().map(|(_, l)| *l),
            Some(StatusLevel::Warning)
        );
    }

    #[test]
    fn signals_visible_when_computed_up_front() {
        assert!(test_app(true).show_signals);
    }

    #[test]
    fn toggle_computes_flags_once() {
        let mut app = test_app(false);
        assert!(app.table.flag_names().is_empty());

        app.toggle_signals();
        assert!(app.show_signals);
        assert_eq!(
            app.table.flag_names(),
            vec!["buy_oversold_reversal", "buy_golden_cross"]
        );

        app.toggle_signals();
        assert!(!app.show_signals);
        app.toggle_signals();
        assert!(app.show_signals);
        assert_eq!(app.table.flag_names().len(), 2);
    }

    #[test]
    fn zoom_keeps_minimum_rows() {
        let mut view = ViewWindow::full(260);
        for _ in 0..50 {
            view.zoom_in();
        }
        assert_eq!(view.len(), MIN_VIEW_ROWS);
        for _ in 0..50 {
            view.zoom_out();
        }
        assert_eq!(view.range(), 0..260);
    }

    #[test]
    fn pan_stops_at_edges() {
        let mut view = ViewWindow::full(100);
        view.zoom_in();
        view.reset();
        view.zoom_in();
        let len = view.len();
        for _ in 0..100 {
            view.pan_right();
        }
        assert_eq!(view.range().end, 100);
        for _ in 0..100 {
            view.pan_left();
        }
        assert_eq!(view.start(), 0);
        assert_eq!(view.len(), len);
    }

    #[test]
    fn short_table_never_zooms_below_its_length() {
        let mut view = ViewWindow::full(4);
        view.zoom_in();
        assert_eq!(view.range(), 0..4);
        view.pan_right();
        assert_eq!(view.range(), 0..4);
    }

    #[test]
    fn visible_dates_follow_window() {
        let mut app = test_app(false);
        let (first, last) = app.visible_dates();
        assert_eq!(first, NaiveDate::from_ymd_opt(2023, 1, 2).unwrap());
        assert_eq!(last, NaiveDate::from_ymd_opt(2023, 12, 29).unwrap());

        app.view.zoom_in();
        let (zfirst, zlast) = app.visible_dates();
        assert!(zfirst > first && zlast < last);
    }

    proptest! {
        #[test]
        fn window_stays_in_bounds(total in 1usize..500, ops in prop::collection::vec(0u8..5, 0..60)) {
            let mut view = ViewWindow::full(total);
            for op in ops {
                match op {
                    0 => view.pan_left(),
                    1 => view.pan_right(),
                    2 => view.zoom_in(),
                    3 => view.zoom_out(),
                    _ => view.reset(),
                }
                prop_assert!(view.range().end <= total);
                prop_assert!(view.len() >= MIN_VIEW_ROWS.min(total));
                prop_assert!(view.len() <= total);
            }
        }
    }
}
