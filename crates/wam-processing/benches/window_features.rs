//! Feature extraction benchmarks
//!
//! Per-window feature cost and whole-recording pipeline throughput on
//! simulated data.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use wam_processing::features::{dominant_frequency, iqr_of_autocovariance, signal_entropy};
use wam_processing::{butter_bandpass, filtfilt, FeaturePipeline, UseCase};
use wam_core::{Axis, Band};
use wam_simulation::{simulate, MovementPattern};

fn bench_window_features(c: &mut Criterion) {
    let mut group = c.benchmark_group("window_features");

    for &fs in &[50.0, 100.0, 200.0] {
        let recording = simulate(MovementPattern::resting_tremor(), fs, 3.0, 1).unwrap();
        let window = recording.axis(Axis::X).to_vec();

        group.bench_with_input(BenchmarkId::new("signal_entropy", fs), &window, |b, w| {
            b.iter(|| black_box(signal_entropy(black_box(w))))
        });
        group.bench_with_input(BenchmarkId::new("dominant_frequency", fs), &window, |b, w| {
            b.iter(|| black_box(dominant_frequency(black_box(w), fs, 12.0)))
        });
        group.bench_with_input(BenchmarkId::new("iqr_of_autocovariance", fs), &window, |b, w| {
            b.iter(|| black_box(iqr_of_autocovariance(black_box(w))))
        });
    }

    group.finish();
}

fn bench_filtfilt(c: &mut Criterion) {
    let mut group = c.benchmark_group("filtfilt");
    let recording = simulate(MovementPattern::walking(), 100.0, 60.0, 2).unwrap();
    let samples = recording.axis(Axis::Z);

    for order in [1, 4, 8] {
        let coeffs = butter_bandpass(order, Band::new(0.25, 3.0), 100.0).unwrap();
        group.bench_function(BenchmarkId::new("order", order), |b| {
            b.iter(|| black_box(filtfilt(&coeffs, black_box(samples), 10)))
        });
    }

    group.finish();
}

fn bench_pipelines(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline");
    group.sample_size(20);

    let recording = simulate(MovementPattern::walking(), 100.0, 120.0, 3).unwrap();
    for use_case in UseCase::PRESETS {
        let pipeline = FeaturePipeline::preset(use_case, 100.0).unwrap();
        group.bench_function(use_case.as_str(), |b| {
            b.iter(|| black_box(pipeline.run(black_box(&recording))))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_window_features, bench_filtfilt, bench_pipelines);
criterion_main!(benches);
