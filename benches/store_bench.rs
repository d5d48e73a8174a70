//! Benchmarks for imgstore storage operations

use criterion::{criterion_group, criterion_main, Criterion};
use imgstore::{Color, Kind, Meta, Store};
use tempfile::TempDir;

fn store_benchmarks(c: &mut Criterion) {
    let temp_dir = TempDir::new().unwrap();
    let store = Store::open_path(temp_dir.path()).unwrap();

    let meta = Meta::new(256, 256, Color::Rgba, Kind::Uint, 8).unwrap();
    let payload = vec![0x7Fu8; meta.total_bytes()];

    c.bench_function("set_256x256_rgba_u8", |b| {
        b.iter(|| {
            store.set("bench", &meta, Some(&payload)).unwrap().close();
        })
    });

    store.set("bench", &meta, Some(&payload)).unwrap().close();

    c.bench_function("get_256x256_rgba_u8", |b| {
        b.iter(|| {
            let handle = store.get("bench", false).unwrap();
            criterion::black_box(handle.payload());
        })
    });

    c.bench_function("get_pixel_center", |b| {
        let handle = store.get("bench", false).unwrap();
        let image = handle.image();
        b.iter(|| criterion::black_box(image.get_pixel(128, 128)))
    });
}

criterion_group!(benches, store_benchmarks);
criterion_main!(benches);
