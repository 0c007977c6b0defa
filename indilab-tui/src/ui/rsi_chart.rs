//! RSI chart with fixed [0, 100] bounds and overbought/oversold guides.

use ratatui::layout::{Constraint, Rect};
use ratatui::style::Style;
use ratatui::symbols;
use ratatui::widgets::{Axis, Chart, Dataset, GraphType, LegendPosition};
use ratatui::Frame;

use super::{chart_block, date_axis, points};
use crate::app::App;
use crate::theme;

/// Two-point horizontal line across the visible rows.
fn guide(level: f64, app: &App) -> Vec<(f64, f64)> {
    let range = app.view.range();
    vec![(range.start as f64, level), ((range.end - 1) as f64, level)]
}

pub fn render(f: &mut Frame, area: Rect, app: &App) {
    let rsi_pts = app
        .table
        .column(&app.keys.rsi)
        .map(|c| points(c, app.view.range()))
        .unwrap_or_default();
    let overbought = app.settings.signals.overbought;
    let oversold = app.settings.signals.oversold;
    let overbought_pts = guide(overbought, app);
    let oversold_pts = guide(oversold, app);

    let datasets = vec![
        Dataset::default()
            .name(format!("RSI {}", app.settings.indicators.rsi_period))
            .marker(symbols::Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(theme::NEUTRAL))
            .data(&rsi_pts),
        Dataset::default()
            .name(format!("Overbought ({overbought:.0})"))
            .marker(symbols::Marker::Dot)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(theme::NEGATIVE))
            .data(&overbought_pts),
        Dataset::default()
            .name(format!("Oversold ({oversold:.0})"))
            .marker(symbols::Marker::Dot)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(theme::POSITIVE))
            .data(&oversold_pts),
    ];

    let chart = Chart::new(datasets)
        .block(chart_block(format!(
            "{} RSI (Relative Strength Index)",
            app.symbol()
        )))
        .x_axis(date_axis(app))
        .y_axis(
            Axis::default()
                .title("RSI")
                .style(theme::muted())
                .bounds([0.0, 100.0])
                .labels(vec!["0", "50", "100"]),
        )
        .legend_position(Some(LegendPosition::TopLeft))
        .hidden_legend_constraints((Constraint::Ratio(1, 2), Constraint::Ratio(2, 3)));

    f.render_widget(chart, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{buffer_text, test_app};
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    #[test]
    fn guides_and_title() {
        let app = test_app(false);
        let mut terminal = Terminal::new(TestBackend::new(120, 16)).unwrap();
        terminal.draw(|f| render(f, f.area(), &app)).unwrap();
        let text = buffer_text(terminal.backend().buffer());

        assert!(text.contains("AAPL RSI (Relative Strength Index)"));
        assert!(text.contains("Overbought (70)"));
        assert!(text.contains("Oversold (30)"));
        assert!(text.contains("100"));
    }

    #[test]
    fn guide_spans_visible_rows() {
        let mut app = test_app(false);
        app.view.zoom_in();
        let range = app.view.range();
        let pts = guide(70.0, &app);
        assert_eq!(pts[0], (range.start as f64, 70.0));
        assert_eq!(pts[1], ((range.end - 1) as f64, 70.0));
    }
}
