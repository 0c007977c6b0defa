//! Parrot/neon palette and shared styles.
//!
//! # Color Palette
//! - **Background**: deep charcoal
//! - **Accent**: electric cyan (price line, focus)
//! - **Positive**: neon green (buy markers, oversold guide)
//! - **Negative**: hot pink (errors, overbought guide)
//! - **Warning**: neon orange (short SMA, warnings)
//! - **Neutral**: cool purple (long SMA, RSI)
//! - **Muted**: steel blue (axes, hints)

use ratatui::style::{Color, Modifier, Style};

pub const BACKGROUND: Color = Color::Rgb(18, 18, 20);
pub const ACCENT: Color = Color::Rgb(0, 255, 255);
pub const POSITIVE: Color = Color::Rgb(0, 255, 128);
pub const NEGATIVE: Color = Color::Rgb(255, 20, 147);
pub const WARNING: Color = Color::Rgb(255, 140, 0);
pub const NEUTRAL: Color = Color::Rgb(147, 112, 219);
pub const MUTED: Color = Color::Rgb(100, 149, 237);
pub const TEXT_PRIMARY: Color = Color::White;
pub const TEXT_SECONDARY: Color = Color::Rgb(170, 170, 170);
pub const GOLD: Color = Color::Rgb(255, 215, 0);

pub fn accent() -> Style {
    Style::default().fg(ACCENT)
}

pub fn warning() -> Style {
    Style::default().fg(WARNING)
}

pub fn negative() -> Style {
    Style::default().fg(NEGATIVE)
}

pub fn muted() -> Style {
    Style::default().fg(MUTED)
}

pub fn text() -> Style {
    Style::default().fg(TEXT_PRIMARY)
}

pub fn label() -> Style {
    Style::default().fg(TEXT_SECONDARY)
}

pub fn chart_block() -> Style {
    Style::default().bg(BACKGROUND)
}

pub fn chart_title() -> Style {
    Style::default().fg(ACCENT).add_modifier(Modifier::BOLD)
}

pub fn chart_border() -> Style {
    Style::default().fg(MUTED)
}

/// Color for a named buy flag.
pub fn flag_color(flag: &str) -> Color {
    match flag {
        "buy_oversold_reversal" => POSITIVE,
        "buy_golden_cross" => GOLD,
        _ => TEXT_SECONDARY,
    }
}
