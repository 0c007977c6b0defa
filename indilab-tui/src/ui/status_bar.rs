//! Bottom status bar: symbol, dates, rows, source, key hints, last message.

use ratatui::layout::Rect;
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use crate::app::{App, StatusLevel};
use crate::theme;

pub fn render(f: &mut Frame, area: Rect, app: &App) {
    let (first, last) = app.visible_dates();
    let view = app.view;

    let mut spans: Vec<Span> = vec![
        Span::styled(format!(" {} ", app.symbol()), theme::chart_title()),
        Span::styled(
            format!(
                "{} to {} | {} rows | source: {} | view {}..{}",
                app.table.first_date(),
                app.table.last_date(),
                app.table.len(),
                app.source.label(),
                first,
                last,
            ),
            theme::text(),
        ),
        Span::raw(" | "),
        Span::styled(
            "q:quit h/l:pan +/-:zoom 0:reset s:signals",
            theme::muted(),
        ),
    ];

    if let Some((msg, level)) = &app.status_message {
        let style = match level {
            StatusLevel::Info => theme::accent(),
            StatusLevel::Warning => theme::warning(),
            StatusLevel::Error => theme::negative(),
        };
        spans.push(Span::raw(" | "));
        spans.push(Span::styled(msg.as_str(), style));
    }

    if view.len() < app.table.len() {
        spans.push(Span::styled(
            format!(" [{}/{} rows]", view.len(), app.table.len()),
            theme::label(),
        ));
    }

    f.render_widget(Paragraph::new(Line::from(spans)), area);
}
