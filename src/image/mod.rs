//! Image buffers and the normalized pixel accessor
//!
//! An [`Image`] owns its pixel buffer on the heap; [`ImageRef`] and
//! [`ImageMut`] borrow a buffer owned elsewhere, typically a store mapping.
//! All three expose the same accessor: `get_pixel`/`set_pixel` convert
//! between the stored scalar encoding (any valid kind/bits pair) and the
//! canonical 4-channel unit-range [`Pixel`].
//!
//! ## Scalar conversion rules
//! - Integer channels are linearly mapped: `(raw - min) / (max - min)` on
//!   read, the inverse (rounded) on write.
//! - Float channels pass through; 16-bit floats go through explicit
//!   bit-pattern expansion (see `half.rs`), not a cast.
//! - A pixel carries at most 4 channels. Images with fewer channels leave
//!   the alpha slot at 1.0 on read; channel counts above 4 are truncated.
//!
//! Payload scalars are stored little-endian.

mod half;
mod parallel;

pub use parallel::{each_pixel, each_pixel_to};

use crate::meta::{Kind, Meta};
use crate::pixel::Pixel;

use half::{f16_to_f32, f32_to_f16};

// =============================================================================
// Buffer types
// =============================================================================

/// Heap-owned image: metadata plus pixel buffer
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    meta: Meta,
    data: Vec<u8>,
}

/// Borrowed read-only view of an image buffer
#[derive(Debug, Clone, Copy)]
pub struct ImageRef<'a> {
    meta: Meta,
    data: &'a [u8],
}

/// Borrowed mutable view of an image buffer
#[derive(Debug)]
pub struct ImageMut<'a> {
    meta: Meta,
    data: &'a mut [u8],
}

/// Flat description of an image buffer for external kernel backends
///
/// Strides are in elements (scalars), interleaved layout: the channel is the
/// fastest axis.
#[derive(Debug, Clone, Copy)]
pub struct BufferDesc {
    pub data: *mut u8,
    pub width: u64,
    pub height: u64,
    pub channels: usize,
    pub channel_stride: usize,
    pub x_stride: usize,
    pub y_stride: usize,
    pub kind: Kind,
    pub bits: u8,
}

impl Image {
    /// Create a zero-filled image
    pub fn new(meta: Meta) -> Image {
        Image {
            meta,
            data: vec![0u8; meta.total_bytes()],
        }
    }

    /// Create an image from an existing payload
    ///
    /// Panics if `data.len()` does not match `meta.total_bytes()`.
    pub fn with_data(meta: Meta, data: Vec<u8>) -> Image {
        assert_eq!(
            data.len(),
            meta.total_bytes(),
            "payload length does not match image metadata"
        );
        Image { meta, data }
    }

    pub fn meta(&self) -> &Meta {
        &self.meta
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Read-only view of this image
    pub fn as_ref(&self) -> ImageRef<'_> {
        ImageRef {
            meta: self.meta,
            data: &self.data,
        }
    }

    /// Mutable view of this image
    pub fn as_mut(&mut self) -> ImageMut<'_> {
        ImageMut {
            meta: self.meta,
            data: &mut self.data,
        }
    }

    /// Get the normalized pixel at `(x, y)`, or `None` out of bounds
    pub fn get_pixel(&self, x: u64, y: u64) -> Option<Pixel> {
        read_pixel(&self.meta, &self.data, x, y)
    }

    /// Write a normalized pixel at `(x, y)`; false out of bounds
    pub fn set_pixel(&mut self, x: u64, y: u64, px: &Pixel) -> bool {
        write_pixel(&self.meta, &mut self.data, x, y, px)
    }

    /// Apply `f` to every pixel in parallel, writing changed pixels back
    ///
    /// See [`each_pixel`] for the threading contract.
    pub fn each_pixel<F>(&mut self, threads: Option<usize>, f: F) -> crate::Result<()>
    where
        F: Fn(u64, u64, &mut Pixel) -> bool + Sync,
    {
        each_pixel(&mut self.as_mut(), threads, f)
    }

    /// Buffer description for external kernel backends
    pub fn buffer_desc(&mut self) -> BufferDesc {
        buffer_desc(self.meta, self.data.as_mut_ptr())
    }
}

impl<'a> ImageRef<'a> {
    /// Borrow `data` as an image with the given shape
    ///
    /// Panics if `data.len()` does not match `meta.total_bytes()`.
    pub fn new(meta: Meta, data: &'a [u8]) -> ImageRef<'a> {
        assert_eq!(
            data.len(),
            meta.total_bytes(),
            "payload length does not match image metadata"
        );
        ImageRef { meta, data }
    }

    pub fn meta(&self) -> &Meta {
        &self.meta
    }

    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    pub fn get_pixel(&self, x: u64, y: u64) -> Option<Pixel> {
        read_pixel(&self.meta, self.data, x, y)
    }

    /// Copy into a heap-owned image
    pub fn to_owned(&self) -> Image {
        Image {
            meta: self.meta,
            data: self.data.to_vec(),
        }
    }
}

impl<'a> ImageMut<'a> {
    /// Borrow `data` mutably as an image with the given shape
    ///
    /// Panics if `data.len()` does not match `meta.total_bytes()`.
    pub fn new(meta: Meta, data: &'a mut [u8]) -> ImageMut<'a> {
        assert_eq!(
            data.len(),
            meta.total_bytes(),
            "payload length does not match image metadata"
        );
        ImageMut { meta, data }
    }

    pub fn meta(&self) -> &Meta {
        &self.meta
    }

    pub fn data(&self) -> &[u8] {
        self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        self.data
    }

    /// Read-only view with the same lifetime as this borrow
    pub fn as_ref(&self) -> ImageRef<'_> {
        ImageRef {
            meta: self.meta,
            data: self.data,
        }
    }

    pub fn get_pixel(&self, x: u64, y: u64) -> Option<Pixel> {
        read_pixel(&self.meta, self.data, x, y)
    }

    pub fn set_pixel(&mut self, x: u64, y: u64, px: &Pixel) -> bool {
        write_pixel(&self.meta, self.data, x, y, px)
    }

    /// Buffer description for external kernel backends
    pub fn buffer_desc(&mut self) -> BufferDesc {
        buffer_desc(self.meta, self.data.as_mut_ptr())
    }
}

fn buffer_desc(meta: Meta, data: *mut u8) -> BufferDesc {
    let channels = meta.channels();
    BufferDesc {
        data,
        width: meta.width,
        height: meta.height,
        channels,
        channel_stride: 1,
        x_stride: channels,
        y_stride: meta.width as usize * channels,
        kind: meta.kind,
        bits: meta.bits,
    }
}

// =============================================================================
// Normalized accessor
// =============================================================================

/// Byte offset of pixel `(x, y)`, or `None` out of bounds
fn pixel_offset(meta: &Meta, x: u64, y: u64) -> Option<usize> {
    if x >= meta.width || y >= meta.height {
        return None;
    }
    Some((y as usize * meta.width as usize + x as usize) * meta.bytes_per_pixel())
}

fn norm_int(raw: i64, min: i64, max: i64) -> f32 {
    ((raw as f64 - min as f64) / (max as f64 - min as f64)) as f32
}

fn norm_uint(raw: u64, max: u64) -> f32 {
    (raw as f64 / max as f64) as f32
}

fn denorm(v: f32, min: f64, max: f64) -> f64 {
    ((max - min) * v as f64 + min).round()
}

fn read_pixel(meta: &Meta, data: &[u8], x: u64, y: u64) -> Option<Pixel> {
    let offset = pixel_offset(meta, x, y)?;
    let step = meta.bytes_per_channel();
    let n = meta.channels().min(4);

    let mut px = Pixel([0.0, 0.0, 0.0, 1.0]);
    for i in 0..n {
        let at = offset + i * step;
        let raw = &data[at..at + step];
        px.0[i] = match (meta.kind, meta.bits) {
            (Kind::Int, 8) => norm_int(
                i8::from_le_bytes(raw.try_into().unwrap()) as i64,
                i8::MIN as i64,
                i8::MAX as i64,
            ),
            (Kind::Int, 16) => norm_int(
                i16::from_le_bytes(raw.try_into().unwrap()) as i64,
                i16::MIN as i64,
                i16::MAX as i64,
            ),
            (Kind::Int, 32) => norm_int(
                i32::from_le_bytes(raw.try_into().unwrap()) as i64,
                i32::MIN as i64,
                i32::MAX as i64,
            ),
            (Kind::Int, 64) => norm_int(
                i64::from_le_bytes(raw.try_into().unwrap()),
                i64::MIN,
                i64::MAX,
            ),
            (Kind::Uint, 8) => norm_uint(raw[0] as u64, u8::MAX as u64),
            (Kind::Uint, 16) => norm_uint(
                u16::from_le_bytes(raw.try_into().unwrap()) as u64,
                u16::MAX as u64,
            ),
            (Kind::Uint, 32) => norm_uint(
                u32::from_le_bytes(raw.try_into().unwrap()) as u64,
                u32::MAX as u64,
            ),
            (Kind::Uint, 64) => norm_uint(
                u64::from_le_bytes(raw.try_into().unwrap()),
                u64::MAX,
            ),
            (Kind::Float, 16) => f16_to_f32(u16::from_le_bytes(raw.try_into().unwrap())),
            (Kind::Float, 32) => f32::from_le_bytes(raw.try_into().unwrap()),
            (Kind::Float, 64) => f64::from_le_bytes(raw.try_into().unwrap()) as f32,
            _ => return None,
        };
    }

    Some(px)
}

fn write_pixel(meta: &Meta, data: &mut [u8], x: u64, y: u64, px: &Pixel) -> bool {
    let Some(offset) = pixel_offset(meta, x, y) else {
        return false;
    };
    let step = meta.bytes_per_channel();
    let n = meta.channels().min(4);

    for i in 0..n {
        let at = offset + i * step;
        let out = &mut data[at..at + step];
        let v = px.0[i];
        match (meta.kind, meta.bits) {
            (Kind::Int, 8) => {
                out.copy_from_slice(
                    &(denorm(v, i8::MIN as f64, i8::MAX as f64) as i8).to_le_bytes(),
                );
            }
            (Kind::Int, 16) => {
                out.copy_from_slice(
                    &(denorm(v, i16::MIN as f64, i16::MAX as f64) as i16).to_le_bytes(),
                );
            }
            (Kind::Int, 32) => {
                out.copy_from_slice(
                    &(denorm(v, i32::MIN as f64, i32::MAX as f64) as i32).to_le_bytes(),
                );
            }
            (Kind::Int, 64) => {
                out.copy_from_slice(
                    &(denorm(v, i64::MIN as f64, i64::MAX as f64) as i64).to_le_bytes(),
                );
            }
            (Kind::Uint, 8) => {
                out.copy_from_slice(&(denorm(v, 0.0, u8::MAX as f64) as u8).to_le_bytes());
            }
            (Kind::Uint, 16) => {
                out.copy_from_slice(&(denorm(v, 0.0, u16::MAX as f64) as u16).to_le_bytes());
            }
            (Kind::Uint, 32) => {
                out.copy_from_slice(&(denorm(v, 0.0, u32::MAX as f64) as u32).to_le_bytes());
            }
            (Kind::Uint, 64) => {
                out.copy_from_slice(&(denorm(v, 0.0, u64::MAX as f64) as u64).to_le_bytes());
            }
            (Kind::Float, 16) => {
                out.copy_from_slice(&f32_to_f16(v).to_le_bytes());
            }
            (Kind::Float, 32) => {
                out.copy_from_slice(&v.to_le_bytes());
            }
            (Kind::Float, 64) => {
                out.copy_from_slice(&(v as f64).to_le_bytes());
            }
            _ => return false,
        }
    }

    true
}

// =============================================================================
// Tests
// =============================================================================
