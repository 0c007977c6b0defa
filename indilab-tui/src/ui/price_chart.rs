//! Price chart: price line, short and long SMA, buy markers.

use ratatui::layout::{Constraint, Rect};
use ratatui::style::Style;
use ratatui::symbols;
use ratatui::widgets::{Axis, Chart, Dataset, GraphType, LegendPosition};
use ratatui::Frame;

use indilab_core::domain::PriceField;

use super::{chart_block, date_axis, points, y_bounds};
use crate::app::App;
use crate::theme;

fn price_label(field: PriceField) -> &'static str {
    match field {
        PriceField::AdjClose => "Adj Close",
        PriceField::Close => "Close",
    }
}

fn flag_label(flag: &str) -> String {
    let name = flag.strip_prefix("buy_").unwrap_or(flag).replace('_', " ");
    format!("Buy: {name}")
}

pub fn render(f: &mut Frame, area: Rect, app: &App) {
    let range = app.view.range();
    let field = app.settings.indicators.price_field;
    let table = &app.table;

    let prices = table.prices(field);
    let price_pts = points(&prices, range.clone());
    let short_pts = table
        .column(&app.keys.sma_short)
        .map(|c| points(c, range.clone()))
        .unwrap_or_default();
    let long_pts = table
        .column(&app.keys.sma_long)
        .map(|c| points(c, range.clone()))
        .unwrap_or_default();

    // Markers sit on the price of each flagged row.
    let markers: Vec<(&str, Vec<(f64, f64)>)> = if app.show_signals {
        table
            .flag_names()
            .into_iter()
            .map(|name| {
                let pts = table
                    .flagged_rows(name)
                    .into_iter()
                    .filter(|row| range.contains(row) && !prices[*row].is_nan())
                    .map(|row| (row as f64, prices[row]))
                    .collect();
                (name, pts)
            })
            .collect()
    } else {
        Vec::new()
    };

    let bounds = y_bounds(&[&price_pts, &short_pts, &long_pts]);

    let mut datasets = vec![
        Dataset::default()
            .name(price_label(field))
            .marker(symbols::Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(theme::ACCENT))
            .data(&price_pts),
        Dataset::default()
            .name(format!("SMA {}", app.settings.indicators.sma_short))
            .marker(symbols::Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(theme::WARNING))
            .data(&short_pts),
        Dataset::default()
            .name(format!("SMA {}", app.settings.indicators.sma_long))
            .marker(symbols::Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(theme::NEUTRAL))
            .data(&long_pts),
    ];
    for (name, pts) in &markers {
        datasets.push(
            Dataset::default()
                .name(flag_label(name))
                .marker(symbols::Marker::Block)
                .graph_type(GraphType::Scatter)
                .style(Style::default().fg(theme::flag_color(name)))
                .data(pts),
        );
    }

    let chart = Chart::new(datasets)
        .block(chart_block(format!("{} Stock Price with SMA", app.symbol())))
        .x_axis(date_axis(app))
        .y_axis(
            Axis::default()
                .title("Price")
                .style(theme::muted())
                .bounds(bounds)
                .labels(vec![
                    format!("{:.2}", bounds[0]),
                    format!("{:.2}", (bounds[0] + bounds[1]) / 2.0),
                    format!("{:.2}", bounds[1]),
                ]),
        )
        .legend_position(Some(LegendPosition::TopLeft))
        .hidden_legend_constraints((Constraint::Ratio(1, 2), Constraint::Ratio(1, 2)));

    f.render_widget(chart, area);
}
