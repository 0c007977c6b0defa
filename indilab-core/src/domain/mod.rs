//! Domain types shared by every stage of the analysis.

pub mod bar;

pub use bar::{Bar, PriceField};
