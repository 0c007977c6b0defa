//! Top-level layout: three stacked charts sharing the date axis, plus a
//! one-line status bar.

pub mod obv_chart;
pub mod price_chart;
pub mod rsi_chart;
pub mod status_bar;

use std::ops::Range;

use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::text::Span;
use ratatui::widgets::{Axis, Block, Borders};
use ratatui::Frame;

use crate::app::App;
use crate::theme;

/// Draw the entire UI.
pub fn draw(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Ratio(2, 4),
            Constraint::Ratio(1, 4),
            Constraint::Ratio(1, 4),
            Constraint::Length(1),
        ])
        .split(f.area());

    price_chart::render(f, chunks[0], app);
    rsi_chart::render(f, chunks[1], app);
    obv_chart::render(f, chunks[2], app);
    status_bar::render(f, chunks[3], app);
}

/// `(row, value)` points for the visible rows, skipping missing values.
pub(crate) fn points(values: &[f64], range: Range<usize>) -> Vec<(f64, f64)> {
    range
        .filter_map(|i| {
            let v = *values.get(i)?;
            (!v.is_nan()).then_some((i as f64, v))
        })
        .collect()
}

/// Y bounds over all series with 5% padding; `[0, 1]` if nothing is visible.
pub(crate) fn y_bounds(series: &[&[(f64, f64)]]) -> [f64; 2] {
    let (lo, hi) = series
        .iter()
        .flat_map(|s| s.iter().map(|&(_, y)| y))
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), y| (lo.min(y), hi.max(y)));

    if !lo.is_finite() || !hi.is_finite() {
        return [0.0, 1.0];
    }
    let range = hi - lo;
    let pad = if range > 0.0 {
        range * 0.05
    } else {
        (hi.abs() * 0.05).max(1.0)
    };
    [lo - pad, hi + pad]
}

/// Shared date axis for the visible window: first, middle and last date.
pub(crate) fn date_axis(app: &App) -> Axis<'static> {
    let range = app.view.range();
    let bars = app.table.bars();
    let first = range.start;
    let last = range.end - 1;
    let mid = first + (last - first) / 2;
    let upper = if last > first { last as f64 } else { first as f64 + 1.0 };

    Axis::default()
        .style(theme::muted())
        .bounds([first as f64, upper])
        .labels(vec![
            Span::styled(bars[first].date.to_string(), theme::label()),
            Span::styled(bars[mid].date.to_string(), theme::label()),
            Span::styled(bars[last].date.to_string(), theme::label()),
        ])
}

pub(crate) fn chart_block(title: String) -> Block<'static> {
    Block::default()
        .title(Span::styled(format!(" {title} "), theme::chart_title()))
        .borders(Borders::ALL)
        .border_style(theme::chart_border())
        .style(theme::chart_block())
}

/// Compact number: 1.2K, 3.4M, 5.6B.
pub(crate) fn compact(v: f64) -> String {
    let a = v.abs();
    if a >= 1e9 {
        format!("{:.1}B", v / 1e9)
    } else if a >= 1e6 {
        format!("{:.1}M", v / 1e6)
    } else if a >= 1e3 {
        format!("{:.1}K", v / 1e3)
    } else {
        format!("{v:.0}")
    }
}
