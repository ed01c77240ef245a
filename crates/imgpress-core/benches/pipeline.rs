//! Benchmarks for the ImgPress conversion pipeline.
//!
//! Run with: cargo bench -p imgpress-core

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use image::{DynamicImage, Rgb, RgbImage};
use imgpress_core::config::ThumbnailConfig;
use imgpress_core::pipeline::{
    FileDiscovery, FileTypeValidator, ImageTranscoder, NativeTranscoder, ThumbnailCache,
    TranscodeOptions,
};
use imgpress_core::TargetFormat;
use std::path::PathBuf;
use std::sync::Arc;

fn write_tree(root: &std::path::Path, dirs: usize, files_per_dir: usize) {
    for d in 0..dirs {
        let dir = root.join(format!("album{d}"));
        std::fs::create_dir_all(&dir).unwrap();
        for f in 0..files_per_dir {
            std::fs::write(dir.join(format!("img{f}.jpg")), [0xFF, 0xD8, 0xFF, 0xE0]).unwrap();
        }
        std::fs::write(dir.join(".DS_Store"), b"x").unwrap();
    }
}

fn benchmark_discovery(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    write_tree(dir.path(), 10, 50);
    let inputs = vec![dir.path().to_path_buf()];

    c.bench_function("discovery_flatten_500", |b| {
        b.iter(|| FileDiscovery::flatten(black_box(inputs.as_slice())))
    });

    let files = FileDiscovery::flatten(&inputs);
    let validator = FileTypeValidator::default();
    c.bench_function("validate_500", |b| {
        b.iter(|| {
            files
                .iter()
                .filter(|p| validator.is_acceptable(black_box(p)))
                .count()
        })
    });
}

fn benchmark_thumbnail_cache(c: &mut Criterion) {
    let cache = ThumbnailCache::new(&ThumbnailConfig::default());
    let image = Arc::new(DynamicImage::new_rgb8(80, 80));
    let paths: Vec<PathBuf> = (0..250)
        .map(|i| PathBuf::from(format!("/photos/{i}.jpg")))
        .collect();

    c.bench_function("thumbnail_cache_put_evicting", |b| {
        b.iter(|| {
            for path in &paths {
                cache.put(path.clone(), Arc::clone(&image));
            }
        })
    });

    c.bench_function("thumbnail_cache_get", |b| {
        b.iter(|| {
            for path in &paths {
                let _ = cache.get(black_box(path));
            }
        })
    });
}

fn benchmark_transcode(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("input.png");
    RgbImage::from_fn(1920, 1080, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 90]))
        .save(&input)
        .unwrap();
    let output = dir.path().join("output.jpg");

    let transcoder = NativeTranscoder::new();
    let Some(tag) = transcoder.format_tag(TargetFormat::Jpeg) else {
        eprintln!("Skipping transcode benchmark: JPEG encoding unavailable");
        return;
    };
    let options = TranscodeOptions {
        quality: Some(0.75),
        max_dimension: Some(960),
        metadata: None,
    };

    let mut group = c.benchmark_group("transcode");
    group.sample_size(10);
    group.bench_function("png_1080p_to_jpeg_half", |b| {
        b.iter(|| transcoder.transcode(black_box(&input), &output, tag, &options))
    });
    group.finish();
}

criterion_group!(
    benches,
    benchmark_discovery,
    benchmark_thumbnail_cache,
    benchmark_transcode
);
criterion_main!(benches);
