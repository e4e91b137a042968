//! Superquadric Fit Benchmark
//!
//! Times a full fit on synthetic clouds of increasing size, with sequential
//! and parallel accumulation.
//!
//! ## Usage
//!
//! ```bash
//! cargo bench --bench fit_benchmark
//! ```

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use tracing::info;

use sq_fitter::SuperquadricFactor;
use sq_fitter::core::{SamplerConfig, SuperquadricParams, sample_surface};
use sq_fitter::init_logger_with_level;
use sq_fitter::optimizer::{DampedNewton, MinimizerConfig};

fn reference_shape() -> SuperquadricParams {
    SuperquadricParams::new([1.0, 0.7, 0.5], [0.6, 0.9], [0.5, -0.3, 1.2], [0.2, -0.1, 0.35])
}

fn perturbed_guess() -> SuperquadricParams {
    SuperquadricParams::new([1.1, 0.6, 0.55], [0.7, 1.0], [0.45, -0.25, 1.15], [0.25, -0.05, 0.3])
}

fn criterion_benchmark(c: &mut Criterion) {
    use std::sync::Once;
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        // Per-iteration logs would dominate the timings
        init_logger_with_level(tracing::Level::WARN);
    });

    let reference = reference_shape();
    let initial = perturbed_guess();

    let mut group = c.benchmark_group("superquadric_fit");
    group.sample_size(20);

    for grid in [10usize, 20, 40] {
        let cloud = sample_surface(&reference, &SamplerConfig::new().with_grid(grid, grid));
        info!("Benchmarking {} points", grid * grid);

        for parallel in [false, true] {
            let config = MinimizerConfig::new().with_parallel(parallel);
            let solver = DampedNewton::with_config(SuperquadricFactor::new(), config);
            let label = if parallel { "parallel" } else { "sequential" };

            group.bench_with_input(BenchmarkId::new(label, grid * grid), &cloud, |b, cloud| {
                b.iter(|| black_box(solver.minimize(cloud, &initial)))
            });
        }
    }

    group.finish();
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
