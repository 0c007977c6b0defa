//! Shared bar builders for integration tests.

#![allow(dead_code)]

use chrono::NaiveDate;
use indilab_core::domain::Bar;

/// Bars with the given adjusted closes and volumes on consecutive days.
pub fn bars_from(prices: &[f64], volumes: &[u64]) -> Vec<Bar> {
    let base_date = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
    prices
        .iter()
        .zip(volumes)
        .enumerate()
        .map(|(i, (&price, &volume))| Bar {
            symbol: "TEST".to_string(),
            date: base_date + chrono::Duration::days(i as i64),
            open: price,
            high: price + 1.0,
            low: price - 1.0,
            close: price,
            adj_close: price,
            volume,
        })
        .collect()
}

/// Deterministic pseudo-random walk of `n` bars.
pub fn walk_bars(n: usize) -> Vec<Bar> {
    let mut price = 100.0;
    let mut prices = Vec::with_capacity(n);
    let mut volumes = Vec::with_capacity(n);
    for i in 0..n {
        let seed = (i as u64).wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        let change = ((seed >> 33) % 200) as f64 / 100.0 - 1.0;
        price = (price + change).max(5.0);
        prices.push(price);
        volumes.push(1_000 + (seed >> 40) % 9_000);
    }
    bars_from(&prices, &volumes)
}
