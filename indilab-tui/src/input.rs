//! Keyboard input: quit, pan, zoom, reset, toggle markers.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind};

use crate::app::App;

pub fn handle_key(app: &mut App, key: KeyEvent) {
    // Only handle key press events (Windows sends both Press and Release).
    if key.kind != KeyEventKind::Press {
        return;
    }

    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => app.running = false,
        KeyCode::Char('h') | KeyCode::Left => app.view.pan_left(),
        KeyCode::Char('l') | KeyCode::Right => app.view.pan_right(),
        KeyCode::Char('+') | KeyCode::Char('=') => app.view.zoom_in(),
        KeyCode::Char('-') | KeyCode::Char('_') => app.view.zoom_out(),
        KeyCode::Char('0') => {
            app.view.reset();
            app.set_status("View reset");
        }
        KeyCode::Char('s') => app.toggle_signals(),
        _ => {}
    }
}
