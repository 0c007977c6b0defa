//! IndiLab TUI: three stacked charts for one ticker.
//!
//! - Price with short and long SMA, plus buy markers
//! - RSI with overbought/oversold guides
//! - On-balance volume
//!
//! All data is loaded before the terminal opens; the event loop only pans,
//! zooms and toggles markers.

pub mod app;
pub mod input;
pub mod theme;
pub mod ui;

pub use app::{App, ViewWindow};
pub use input::handle_key;

#[cfg(test)]
mod test_helpers;
