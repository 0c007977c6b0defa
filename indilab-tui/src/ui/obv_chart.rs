//! On-balance volume chart.

use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::symbols;
use ratatui::widgets::{Axis, Chart, Dataset, GraphType};
use ratatui::Frame;

use super::{chart_block, compact, date_axis, points, y_bounds};
use crate::app::App;
use crate::theme;

pub fn render(f: &mut Frame, area: Rect, app: &App) {
    let obv_pts = app
        .table
        .column(&app.keys.obv)
        .map(|c| points(c, app.view.range()))
        .unwrap_or_default();
    let bounds = y_bounds(&[&obv_pts]);

    let datasets = vec![Dataset::default()
        .name("OBV")
        .marker(symbols::Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(theme::ACCENT))
        .data(&obv_pts)];

    let chart = Chart::new(datasets)
        .block(chart_block(format!("{} On-Balance Volume (OBV)", app.symbol())))
        .x_axis(date_axis(app))
        .y_axis(
            Axis::default()
                .title("OBV")
                .style(theme::muted())
                .bounds(bounds)
                .labels(vec![
                    compact(bounds[0]),
                    compact((bounds[0] + bounds[1]) / 2.0),
                    compact(bounds[1]),
                ]),
        );

    f.render_widget(chart, area);
}
