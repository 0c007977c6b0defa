//! Property tests for indicator and flag invariants.
//!
//! Uses proptest to verify:
//! 1. SMA equals the trailing mean once the window is full
//! 2. RSI stays in [0, 100] and rises with the gain/loss ratio
//! 3. OBV follows the signed-volume recurrence
//! 4. Every flagged row satisfies all of its rule's conditions

mod common;

use common::bars_from;
use indilab_core::analysis::{analyze, AnalysisSettings, IndicatorSettings, SignalSettings};
use indilab_core::indicators::{rsi_from_averages, Indicator, Obv, Rsi, RsiSmoothing, Sma};
use indilab_core::domain::PriceField;
use proptest::prelude::*;

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_prices(max_len: usize) -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec((1.0..500.0_f64).prop_map(|p| (p * 100.0).round() / 100.0), 1..max_len)
}

fn arb_series(max_len: usize) -> impl Strategy<Value = (Vec<f64>, Vec<u64>)> {
    arb_prices(max_len).prop_flat_map(|prices| {
        let n = prices.len();
        (Just(prices), prop::collection::vec(0u64..1_000_000, n))
    })
}

// ── 1. SMA ───────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn sma_is_trailing_mean(prices in arb_prices(80), window in 1usize..20) {
        let bars = bars_from(&prices, &vec![1; prices.len()]);
        let sma = Sma::new(window).compute(&bars);
        prop_assert_eq!(sma.len(), prices.len());
        for (t, v) in sma.iter().enumerate() {
            if t + 1 < window {
                prop_assert!(v.is_nan());
            } else {
                let mean = prices[t + 1 - window..=t].iter().sum::<f64>() / window as f64;
                prop_assert!((v - mean).abs() < 1e-6 * mean.abs().max(1.0));
            }
        }
    }
}

// ── 2. RSI ───────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn rsi_bounded(prices in arb_prices(120), period in 1usize..30, wilder in any::<bool>()) {
        let smoothing = if wilder { RsiSmoothing::Wilder } else { RsiSmoothing::Simple };
        let bars = bars_from(&prices, &vec![1; prices.len()]);
        let rsi = Rsi::with_smoothing(period, smoothing, PriceField::AdjClose).compute(&bars);
        for v in rsi.iter().filter(|v| !v.is_nan()) {
            prop_assert!((0.0..=100.0).contains(v), "rsi out of bounds: {}", v);
        }
    }

    #[test]
    fn rsi_monotone_in_ratio(
        g1 in 0.0..100.0_f64,
        g2 in 0.0..100.0_f64,
        loss in 0.001..100.0_f64,
    ) {
        let (lo, hi) = if g1 <= g2 { (g1, g2) } else { (g2, g1) };
        prop_assert!(rsi_from_averages(lo, loss) <= rsi_from_averages(hi, loss));
    }

    #[test]
    fn rsi_depends_only_on_ratio(gain in 0.01..50.0_f64, loss in 0.01..50.0_f64, k in 0.1..10.0_f64) {
        let a = rsi_from_averages(gain, loss);
        let b = rsi_from_averages(gain * k, loss * k);
        prop_assert!((a - b).abs() < 1e-9);
    }
}

// ── 3. OBV ───────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn obv_recurrence((prices, volumes) in arb_series(100)) {
        let obv = Obv::new().compute(&bars_from(&prices, &volumes));
        prop_assert!(obv[0].is_nan());
        for n in 1..prices.len() {
            let prev = if n == 1 { 0.0 } else { obv[n - 1] };
            let vol = volumes[n] as f64;
            let expected = if prices[n] > prices[n - 1] {
                prev + vol
            } else if prices[n] < prices[n - 1] {
                prev - vol
            } else {
                prev
            };
            prop_assert_eq!(obv[n], expected);
        }
    }
}

// ── 4. Flags ─────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn flags_imply_conditions(
        (prices, volumes) in arb_series(120),
        oversold in 10.0..45.0_f64,
        overbought in 55.0..90.0_f64,
    ) {
        let settings = AnalysisSettings {
            indicators: IndicatorSettings {
                sma_short: 3,
                sma_long: 8,
                rsi_period: 4,
                ..IndicatorSettings::default()
            },
            signals: SignalSettings { enabled: true, oversold, overbought },
        };
        let table = analyze(bars_from(&prices, &volumes), &settings).unwrap();

        for t in table.flagged_rows("buy_oversold_reversal") {
            prop_assert!(t >= 1);
            let rsi = table.value("rsi_4", t).unwrap();
            let rsi_prev = table.value("rsi_4", t - 1).unwrap();
            prop_assert!(rsi < oversold && rsi > rsi_prev);
            prop_assert!(table.value("obv", t).unwrap() > table.value("obv", t - 1).unwrap());
        }

        for t in table.flagged_rows("buy_golden_cross") {
            prop_assert!(t >= 1);
            let fast = table.value("sma_3", t).unwrap();
            let slow = table.value("sma_8", t).unwrap();
            prop_assert!(fast > slow);
            prop_assert!(table.value("sma_3", t - 1).unwrap() <= table.value("sma_8", t - 1).unwrap());
            prop_assert!(table.value("rsi_4", t).unwrap() < overbought);
        }
    }
}
