//! Criterion benchmarks for the analysis hot paths.
//!
//! 1. Single indicators (SMA 200, RSI 14 simple and Wilder, OBV)
//! 2. Full pipeline (table build, four indicators, two buy rules)

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use indilab_core::analysis::{analyze, AnalysisSettings};
use indilab_core::domain::{Bar, PriceField};
use indilab_core::indicators::{Indicator, Obv, Rsi, RsiSmoothing, Sma};

fn make_bars(n: usize) -> Vec<Bar> {
    let base_date = chrono::NaiveDate::from_ymd_opt(2000, 1, 3).unwrap();
    (0..n)
        .map(|i| {
            let close = 100.0 + (i as f64 * 0.1).sin() * 10.0 + i as f64 * 0.01;
            Bar {
                symbol: "BENCH".to_string(),
                date: base_date + chrono::Duration::days(i as i64),
                open: close - 0.3,
                high: close + 1.5,
                low: close - 1.5,
                close,
                adj_close: close,
                volume: 1_000_000 + (i as u64 % 500_000),
            }
        })
        .collect()
}

fn bench_indicators(c: &mut Criterion) {
    let mut group = c.benchmark_group("indicators");
    let indicators: Vec<Box<dyn Indicator>> = vec![
        Box::new(Sma::new(200)),
        Box::new(Rsi::new(14)),
        Box::new(Rsi::with_smoothing(14, RsiSmoothing::Wilder, PriceField::AdjClose)),
        Box::new(Obv::new()),
    ];

    for n in [252usize, 2520] {
        let bars = make_bars(n);
        for (i, indicator) in indicators.iter().enumerate() {
            let id = format!("{}#{i}", indicator.name());
            group.bench_with_input(BenchmarkId::new(id, n), &bars, |b, bars| {
                b.iter(|| black_box(indicator.compute(black_box(bars))))
            });
        }
    }
    group.finish();
}

fn bench_pipeline(c: &mut Criterion) {
    let mut settings = AnalysisSettings::default();
    settings.signals.enabled = true;
    let bars = make_bars(2520);

    c.bench_function("analyze_10y_with_signals", |b| {
        b.iter(|| analyze(black_box(bars.clone()), &settings).unwrap())
    });
}

criterion_group!(benches, bench_indicators, bench_pipeline);
criterion_main!(benches);
