//! Tests for the parallel pixel engine
//!
//! These tests verify:
//! - Byte-identical output between single-threaded and parallel runs
//! - Row partitioning with remainders and thread-count clamping
//! - Operation directly on store-mapped images

use imgstore::{each_pixel_to, Color, Image, Kind, Meta, Pixel, Store};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

/// A pure per-coordinate function: output depends only on (x, y)
fn checker(x: u64, y: u64, px: &mut Pixel) -> bool {
    let on = (x + y) % 2 == 0;
    *px = if on {
        Pixel::rgba(1.0, 0.25, 0.0, 1.0)
    } else {
        Pixel::rgba(0.0, 0.75, 1.0, 0.5)
    };
    true
}

fn run_with_threads(meta: Meta, threads: Option<usize>) -> Image {
    let mut image = Image::new(meta);
    image.each_pixel(threads, checker).unwrap();
    image
}

// =============================================================================
// Determinism Tests
// =============================================================================

#[test]
fn test_parallel_output_is_byte_identical() {
    // odd dimensions so the last chunk absorbs a remainder
    let meta = Meta::new(61, 47, Color::Rgba, Kind::Uint, 8).unwrap();
    let serial = run_with_threads(meta, Some(1));

    for n in [2, 3, 5, 8, 16] {
        let parallel = run_with_threads(meta, Some(n));
        assert_eq!(serial.data(), parallel.data(), "nthreads={n}");
    }
}

#[test]
fn test_detected_thread_count() {
    let meta = Meta::new(32, 32, Color::Rgb, Kind::Float, 32).unwrap();
    let serial = run_with_threads(meta, Some(1));
    let auto = run_with_threads(meta, None);
    assert_eq!(serial.data(), auto.data());
}

#[test]
fn test_more_threads_than_rows_is_clamped() {
    let meta = Meta::new(128, 2, Color::Gray, Kind::Uint, 16).unwrap();
    let serial = run_with_threads(meta, Some(1));
    let oversubscribed = run_with_threads(meta, Some(64));
    assert_eq!(serial.data(), oversubscribed.data());
}

#[test]
fn test_partial_writes_only_touch_selected_pixels() {
    let meta = Meta::new(10, 10, Color::Gray, Kind::Uint, 8).unwrap();
    let mut image = Image::new(meta);

    // only even rows are written
    image
        .each_pixel(Some(4), |_, y, px| {
            px.0[0] = 1.0;
            y % 2 == 0
        })
        .unwrap();

    for y in 0..10u64 {
        let expected = if y % 2 == 0 { 255 } else { 0 };
        assert_eq!(image.data()[(y * 10) as usize], expected, "row {y}");
    }
}

// =============================================================================
// Source/Destination Tests
// =============================================================================

#[test]
fn test_each_pixel_to_reads_source_writes_destination() {
    let meta = Meta::new(24, 18, Color::Rgb, Kind::Float, 32).unwrap();
    let mut src = Image::new(meta);
    src.each_pixel(Some(1), checker).unwrap();
    let src_snapshot = src.clone();

    let mut serial_dst = Image::new(meta);
    each_pixel_to(src.as_ref(), &mut serial_dst.as_mut(), Some(1), |_, _, px| {
        *px = *px * 0.5;
        true
    })
    .unwrap();

    let mut parallel_dst = Image::new(meta);
    each_pixel_to(src.as_ref(), &mut parallel_dst.as_mut(), Some(4), |_, _, px| {
        *px = *px * 0.5;
        true
    })
    .unwrap();

    assert_eq!(serial_dst.data(), parallel_dst.data());
    assert_eq!(src, src_snapshot); // source untouched
}

// =============================================================================
// Mapped Image Tests
// =============================================================================

#[test]
fn test_each_pixel_over_a_store_mapping() {
    let temp_dir = TempDir::new().unwrap();
    let store = Store::open_path(temp_dir.path()).unwrap();
    let meta = Meta::new(19, 13, Color::Rgba, Kind::Uint, 8).unwrap();

    {
        let mut handle = store.set("mapped", &meta, None).unwrap();
        let mut image = handle.image_mut().unwrap();
        imgstore::each_pixel(&mut image, Some(3), checker).unwrap();
    }

    // the same function applied to a heap image must agree byte for byte
    let reference = run_with_threads(meta, Some(1));
    let handle = store.get("mapped", false).unwrap();
    assert_eq!(handle.payload(), reference.data());
}
