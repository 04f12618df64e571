//! Scoring Benchmarks
//!
//! Benchmarks for pixel similarity, structural similarity and overlays.
//!
//! Run with: `cargo bench --bench scoring`

#![allow(missing_docs)]
#![allow(clippy::unwrap_used)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use fidelity::{difference_overlay, pixel_similarity, region_scores, PixelStrategy};
use image::{Rgb, RgbImage};

fn gradient(size: u32, shift: u8) -> RgbImage {
    RgbImage::from_fn(size, size, |x, y| {
        Rgb([
            ((x * 255) / size) as u8,
            ((y * 255) / size) as u8,
            shift.wrapping_add(((x + y) % 256) as u8),
        ])
    })
}

fn bench_pixel_similarity(c: &mut Criterion) {
    let mut group = c.benchmark_group("pixel_similarity");

    for size in [64u32, 256, 512] {
        let original = gradient(size, 0);
        let clone = gradient(size, 8);
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |bench, _| {
            bench.iter(|| black_box(pixel_similarity(black_box(&original), black_box(&clone), 10)));
        });
    }

    group.finish();
}

fn bench_resampled_pixel_similarity(c: &mut Criterion) {
    let original = gradient(512, 0);
    let clone = gradient(256, 0);
    c.bench_function("pixel_similarity_resampled_256_to_512", |bench| {
        bench.iter(|| black_box(pixel_similarity(black_box(&original), black_box(&clone), 10)));
    });
}

#[cfg(feature = "structural")]
fn bench_structural_similarity(c: &mut Criterion) {
    let mut group = c.benchmark_group("structural_similarity");
    group.sample_size(20);

    for size in [64u32, 256, 512] {
        let original = gradient(size, 0);
        let clone = gradient(size, 40);
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |bench, _| {
            bench.iter(|| {
                black_box(fidelity::structural_similarity(
                    black_box(&original),
                    black_box(&clone),
                ))
            });
        });
    }

    group.finish();
}

#[cfg(not(feature = "structural"))]
fn bench_structural_similarity(_c: &mut Criterion) {}

fn bench_difference_overlay(c: &mut Criterion) {
    let original = gradient(512, 0);
    let clone = gradient(512, 64);
    c.bench_function("difference_overlay_512", |bench| {
        bench.iter(|| black_box(difference_overlay(black_box(&original), black_box(&clone), 30)));
    });
}

fn bench_region_scores(c: &mut Criterion) {
    let mut group = c.benchmark_group("region_scores");
    let original = gradient(512, 0);
    let clone = gradient(512, 16);
    let strategy = PixelStrategy::default();

    for count in [1usize, 4, 16] {
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |bench, &count| {
            bench.iter(|| black_box(region_scores(&original, &clone, count, &strategy).unwrap()));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_pixel_similarity,
    bench_resampled_pixel_similarity,
    bench_structural_similarity,
    bench_difference_overlay,
    bench_region_scores
);
criterion_main!(benches);
