use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::distributions::{Distribution, Uniform};
use tensile::analysis::{analyze, AnalysisConfig};
use tensile::live::LiveAccumulator;
use tensile::sample::{DerivedSample, TestSample};
use tensile::specimen::SpecimenGeometry;

fn setup_large_dataset(n: usize) -> Vec<DerivedSample> {
    // Elastic-plastic curve with ±0.5 MPa noise, 1 % elastic limit, break at the end.
    let geometry = SpecimenGeometry::new(50.0, 40.0).unwrap();
    let noise = Uniform::new(-0.5, 0.5);
    let mut rng = rand::thread_rng();
    (0..n)
        .map(|i| {
            let strain = 0.1 * i as f64 / n as f64;
            let stress = if strain < 0.01 { 20000.0 * strain } else { 200.0 + 1000.0 * (strain - 0.01) };
            let force = (stress + noise.sample(&mut rng)) * 40.0;
            geometry.derive(&TestSample::new(i as f64 * 0.01, force, strain * 50.0))
        })
        .collect()
}

fn bench_batch_analysis(c: &mut Criterion) {
    let samples = setup_large_dataset(100_000);
    let config = AnalysisConfig::default();
    c.bench_function("batch analysis on large dataset", |b| {
        b.iter(|| analyze(black_box(&samples), &config));
    });
}

fn bench_live_updates(c: &mut Criterion) {
    let samples = setup_large_dataset(100_000);
    c.bench_function("live accumulator on large dataset", |b| {
        b.iter(|| {
            let mut live = LiveAccumulator::default();
            for s in &samples {
                live.update(black_box(s));
            }
            live.state().cumulative_energy_j
        });
    });
}

criterion_group!(benches, bench_batch_analysis, bench_live_updates);
criterion_main!(benches);
