//! Performance benchmarks for depth conditioning and segmentation
//!
//! Run with: cargo bench --bench depth_benchmarks
//!
//! Filtering cost grows with the median window and image size; floor-plane
//! masking is dominated by the fixed RANSAC sample count.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::rngs::StdRng;
use rand::SeedableRng;
use scangate::preprocess::{DepthConditioner, ForegroundSegmenter, MaskMethod};
use scangate::quality::FrameQualityAnalyzer;
use scangate::testing::{floor_scene_depth, noisy_rgb, with_dropouts};
use std::time::Duration;

const RESOLUTIONS: [(u32, u32, &str); 3] =
    [(160, 120, "QQVGA"), (320, 240, "QVGA"), (640, 480, "VGA")];

fn bench_filter_depth(c: &mut Criterion) {
    let mut group = c.benchmark_group("Depth Filter");
    group.measurement_time(Duration::from_secs(10));
    let conditioner = DepthConditioner::default();

    for (width, height, name) in RESOLUTIONS {
        if width == 640 {
            group.sample_size(10);
        }
        let depth = with_dropouts(&floor_scene_depth(width, height), 0.05, 7);
        group.throughput(Throughput::Elements(depth.len() as u64));
        group.bench_with_input(BenchmarkId::new("filter_depth", name), &depth, |b, depth| {
            b.iter(|| conditioner.filter_depth(black_box(depth)))
        });
    }
    group.finish();
}

fn bench_masks(c: &mut Criterion) {
    let mut group = c.benchmark_group("Foreground Mask");
    let segmenter = ForegroundSegmenter::default();

    for (width, height, name) in RESOLUTIONS {
        let depth = floor_scene_depth(width, height);
        group.throughput(Throughput::Elements(depth.len() as u64));
        group.bench_with_input(BenchmarkId::new("depth_threshold", name), &depth, |b, depth| {
            b.iter(|| segmenter.create_mask(black_box(depth), MaskMethod::DepthThreshold))
        });
        group.bench_with_input(BenchmarkId::new("floor_plane", name), &depth, |b, depth| {
            let mut rng = StdRng::seed_from_u64(42);
            b.iter(|| {
                segmenter.create_mask_with_rng(black_box(depth), MaskMethod::FloorPlane, &mut rng)
            })
        });
    }
    group.finish();
}

fn bench_blur_score(c: &mut Criterion) {
    let analyzer = FrameQualityAnalyzer::default();
    let rgb = noisy_rgb(640, 480, 40, 3);
    c.bench_function("blur_score VGA", |b| b.iter(|| analyzer.blur_score(black_box(&rgb))));
}

criterion_group!(benches, bench_filter_depth, bench_masks, bench_blur_score);
criterion_main!(benches);
