//! Parallel pixel engine
//!
//! Fork-join application of a per-pixel function over row-partitioned
//! chunks. Rows are split into contiguous, disjoint ranges (the last chunk
//! absorbs any remainder), one worker per chunk, all joined before the call
//! returns. Disjoint ranges mean the only synchronization is the final join
//! barrier; the callback must not assume ordering relative to other rows.

use crate::error::{Result, StoreError};
use crate::image::{ImageMut, ImageRef};
use crate::pixel::Pixel;

/// Resolve a requested thread count
///
/// `None` or `Some(0)` selects the detected processor count. The result is
/// never larger than the number of rows.
fn resolve_threads(threads: Option<usize>, rows: usize) -> usize {
    let n = match threads {
        None | Some(0) => num_cpus::get(),
        Some(n) => n,
    };
    n.max(1).min(rows.max(1))
}

/// Apply `f` to every pixel of `image` in place
///
/// `f(x, y, pixel)` returns true when the (possibly mutated) pixel should be
/// written back; otherwise the coordinate is left unmodified. Coordinates
/// are visited in row-major order within each chunk.
///
/// With one thread no worker is spawned, which makes runs deterministic for
/// debugging; for a pure per-coordinate `f` the output is identical for any
/// thread count. A worker that fails to spawn aborts the operation, but the
/// workers already running are joined before the error is returned.
pub fn each_pixel<F>(image: &mut ImageMut<'_>, threads: Option<usize>, f: F) -> Result<()>
where
    F: Fn(u64, u64, &mut Pixel) -> bool + Sync,
{
    let meta = *image.meta();
    let rows = meta.height as usize;
    let width = meta.width;
    if rows == 0 || width == 0 {
        return Ok(());
    }

    let nthreads = resolve_threads(threads, rows);
    if nthreads == 1 {
        for y in 0..meta.height {
            for x in 0..width {
                if let Some(mut px) = image.get_pixel(x, y) {
                    if f(x, y, &mut px) {
                        image.set_pixel(x, y, &px);
                    }
                }
            }
        }
        return Ok(());
    }

    let row_bytes = meta.row_bytes();
    let chunk_rows = rows / nthreads;
    let f = &f;

    crossbeam::thread::scope(|s| {
        let mut workers = Vec::with_capacity(nthreads);
        let mut rest = image.data_mut();

        for i in 0..nthreads {
            let y0 = i * chunk_rows;
            let y1 = if i + 1 == nthreads { rows } else { y0 + chunk_rows };
            let (chunk, tail) = rest.split_at_mut((y1 - y0) * row_bytes);
            rest = tail;

            let mut chunk_meta = meta;
            chunk_meta.height = (y1 - y0) as u64;

            let worker = s
                .builder()
                .name(format!("imgstore-pixel-{i}"))
                .spawn(move |_| {
                    let mut local = ImageMut::new(chunk_meta, chunk);
                    for j in 0..chunk_meta.height {
                        let y = y0 as u64 + j;
                        for x in 0..width {
                            if let Some(mut px) = local.get_pixel(x, j) {
                                if f(x, y, &mut px) {
                                    local.set_pixel(x, j, &px);
                                }
                            }
                        }
                    }
                })
                .map_err(|e| StoreError::Thread(format!("failed to spawn worker: {e}")))?;
            workers.push(worker);
        }

        for worker in workers {
            worker
                .join()
                .map_err(|_| StoreError::Thread("pixel worker panicked".into()))?;
        }
        Ok(())
    })
    .map_err(|_| StoreError::Thread("pixel worker panicked".into()))?
}

/// Apply `f` to every pixel of `src`, writing results into `dst`
///
/// Same contract as [`each_pixel`], reading from `src` and writing changed
/// pixels into `dst` at the same coordinate.
///
/// Panics if `src` and `dst` dimensions differ.
pub fn each_pixel_to<F>(
    src: ImageRef<'_>,
    dst: &mut ImageMut<'_>,
    threads: Option<usize>,
    f: F,
) -> Result<()>
where
    F: Fn(u64, u64, &mut Pixel) -> bool + Sync,
{
    let src_meta = *src.meta();
    let dst_meta = *dst.meta();
    assert_eq!(
        (src_meta.width, src_meta.height),
        (dst_meta.width, dst_meta.height),
        "source and destination dimensions differ"
    );

    let rows = dst_meta.height as usize;
    let width = dst_meta.width;
    if rows == 0 || width == 0 {
        return Ok(());
    }

    let nthreads = resolve_threads(threads, rows);
    if nthreads == 1 {
        for y in 0..dst_meta.height {
            for x in 0..width {
                if let Some(mut px) = src.get_pixel(x, y) {
                    if f(x, y, &mut px) {
                        dst.set_pixel(x, y, &px);
                    }
                }
            }
        }
        return Ok(());
    }

    let row_bytes = dst_meta.row_bytes();
    let chunk_rows = rows / nthreads;
    let f = &f;

    crossbeam::thread::scope(|s| {
        let mut workers = Vec::with_capacity(nthreads);
        let mut rest = dst.data_mut();

        for i in 0..nthreads {
            let y0 = i * chunk_rows;
            let y1 = if i + 1 == nthreads { rows } else { y0 + chunk_rows };
            let (chunk, tail) = rest.split_at_mut((y1 - y0) * row_bytes);
            rest = tail;

            let mut chunk_meta = dst_meta;
            chunk_meta.height = (y1 - y0) as u64;

            let worker = s
                .builder()
                .name(format!("imgstore-pixel-{i}"))
                .spawn(move |_| {
                    let mut local = ImageMut::new(chunk_meta, chunk);
                    for j in 0..chunk_meta.height {
                        let y = y0 as u64 + j;
                        for x in 0..width {
                            if let Some(mut px) = src.get_pixel(x, y) {
                                if f(x, y, &mut px) {
                                    local.set_pixel(x, j, &px);
                                }
                            }
                        }
                    }
                })
                .map_err(|e| StoreError::Thread(format!("failed to spawn worker: {e}")))?;
            workers.push(worker);
        }

        for worker in workers {
            worker
                .join()
                .map_err(|_| StoreError::Thread("pixel worker panicked".into()))?;
        }
        Ok(())
    })
    .map_err(|_| StoreError::Thread("pixel worker panicked".into()))?
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::Image;
    use crate::meta::{Color, Kind, Meta};

    fn gradient(width: u64, height: u64) -> impl Fn(u64, u64, &mut Pixel) -> bool {
        move |x, y, px| {
            px.0[0] = x as f32 / width as f32;
            px.0[1] = y as f32 / height as f32;
            px.0[2] = 0.25;
            px.0[3] = 1.0;
            true
        }
    }

    #[test]
    fn test_single_thread_matches_parallel() {
        let meta = Meta::new(33, 17, Color::Rgba, Kind::Uint, 8).unwrap();

        let mut serial = Image::new(meta);
        serial.each_pixel(Some(1), gradient(33, 17)).unwrap();

        for n in [2, 3, 4, 7] {
            let mut parallel = Image::new(meta);
            parallel.each_pixel(Some(n), gradient(33, 17)).unwrap();
            assert_eq!(serial.data(), parallel.data(), "nthreads={n}");
        }
    }

    #[test]
    fn test_auto_thread_count_matches_serial() {
        let meta = Meta::new(16, 16, Color::Rgb, Kind::Float, 32).unwrap();

        let mut serial = Image::new(meta);
        serial.each_pixel(Some(1), gradient(16, 16)).unwrap();

        let mut auto = Image::new(meta);
        auto.each_pixel(None, gradient(16, 16)).unwrap();
        assert_eq!(serial.data(), auto.data());
    }

    #[test]
    fn test_should_write_false_leaves_pixels() {
        let meta = Meta::new(8, 8, Color::Gray, Kind::Uint, 8).unwrap();
        let mut image = Image::new(meta);
        image
            .each_pixel(Some(2), |_, _, px| {
                px.0[0] = 1.0;
                false
            })
            .unwrap();
        assert!(image.data().iter().all(|b| *b == 0));
    }

    #[test]
    fn test_more_threads_than_rows() {
        let meta = Meta::new(64, 3, Color::Gray, Kind::Uint, 8).unwrap();
        let mut image = Image::new(meta);
        // thread count is clamped to the row count
        image.each_pixel(Some(16), gradient(64, 3)).unwrap();
        let expected = (63.0f32 / 64.0 * 255.0).round() as u8;
        assert_eq!(image.data()[64 * 3 - 1], expected);
    }

    #[test]
    fn test_each_pixel_to_separate_destination() {
        let meta = Meta::new(12, 9, Color::Rgb, Kind::Float, 32).unwrap();
        let mut src = Image::new(meta);
        src.each_pixel(Some(1), gradient(12, 9)).unwrap();

        let mut dst = Image::new(meta);
        let src_view = src.as_ref();
        each_pixel_to(src_view, &mut dst.as_mut(), Some(3), |_, _, px| {
            *px = *px * 0.5;
            true
        })
        .unwrap();

        let a = src.get_pixel(7, 5).unwrap();
        let b = dst.get_pixel(7, 5).unwrap();
        for c in 0..3 {
            assert!((a.0[c] * 0.5 - b.0[c]).abs() < 1e-6);
        }
        // source is untouched
        assert_eq!(src.get_pixel(7, 5).unwrap(), a);
    }

    #[test]
    fn test_empty_image_is_a_no_op() {
        let meta = Meta::new(0, 0, Color::Rgb, Kind::Uint, 8).unwrap();
        let mut image = Image::new(meta);
        image.each_pixel(Some(4), |_, _, _| true).unwrap();
    }
}
