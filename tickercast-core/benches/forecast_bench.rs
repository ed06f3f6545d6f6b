//! Criterion benchmarks for the forecast hot paths.
//!
//! Benchmarks:
//! 1. Model fit over multi-year daily histories
//! 2. Full fit + predict sequence with a one-year horizon

use chrono::{Duration, NaiveDate};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use tickercast_core::forecast::{
    run_forecast, ForecastModel, ForecastRequest, ModelOptions, SeasonalTrendModel,
};
use tickercast_core::frame::{TrainingFrame, TrainingPoint};
use tickercast_core::NullProgress;

fn make_frame(n: usize) -> TrainingFrame {
    let start = NaiveDate::from_ymd_opt(2015, 1, 2).unwrap();
    let points: Vec<TrainingPoint> = (0..n)
        .map(|i| TrainingPoint {
            timestamp: start + Duration::days(i as i64),
            value: 100.0 + (i as f64 * 0.05).sin() * 8.0 + i as f64 * 0.02,
        })
        .collect();
    TrainingFrame::from_points(points).unwrap()
}

fn bench_fit(c: &mut Criterion) {
    let mut group = c.benchmark_group("model_fit");
    for n in [250, 1_250, 2_500] {
        let frame = make_frame(n);
        let options = ModelOptions::default();
        group.bench_with_input(BenchmarkId::from_parameter(n), &frame, |b, frame| {
            b.iter(|| SeasonalTrendModel.fit(black_box(frame), &options).unwrap());
        });
    }
    group.finish();
}

fn bench_full_forecast(c: &mut Criterion) {
    let frame = make_frame(1_250);
    let request = ForecastRequest::new(365, ModelOptions::default());

    c.bench_function("fit_and_predict_1y", |b| {
        b.iter(|| {
            run_forecast(
                &SeasonalTrendModel,
                black_box(&frame),
                &request,
                &NullProgress,
            )
            .unwrap()
        });
    });
}

criterion_group!(benches, bench_fit, bench_full_forecast);
criterion_main!(benches);
