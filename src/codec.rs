//! Codec collaborator interfaces
//!
//! The store holds raw typed buffers and never decodes or encodes image
//! file formats itself; these traits are the seams where external codec,
//! RAW-decoder and color-management implementations plug in. Callers use
//! them around `set`/`get`; the engine never calls them internally.

use std::path::Path;

use tracing::debug;

use crate::error::Result;
use crate::image::{Image, ImageRef};
use crate::meta::{Color, Kind};

/// Options for RAW decoding, passed explicitly per call
///
/// These replace any process-wide decoder state: one call, one
/// configuration.
#[derive(Debug, Clone, Copy)]
pub struct RawOptions {
    pub auto_brightness: bool,
    pub camera_white_balance: bool,
}

impl Default for RawOptions {
    fn default() -> Self {
        Self {
            auto_brightness: true,
            camera_white_balance: true,
        }
    }
}

/// Encode and decode standard image file formats (PNG/JPEG/EXR/...)
pub trait Codec {
    /// Decode the file at `path` into a heap image
    fn decode(&self, path: &Path) -> Result<Image>;

    /// Encode `image` to the file at `path`
    fn encode(&self, path: &Path, image: ImageRef<'_>) -> Result<()>;
}

/// Demosaic camera RAW files
pub trait RawDecoder {
    fn decode_raw(&self, path: &Path, options: &RawOptions) -> Result<Image>;
}

/// Convert an image between color spaces and scalar types
pub trait ColorConverter {
    fn convert(&self, image: ImageRef<'_>, color: Color, kind: Kind, bits: u8) -> Result<Image>;
}

/// Read an image, falling back to the RAW decoder when the codec fails
pub fn read_with_fallback(
    codec: &dyn Codec,
    raw: &dyn RawDecoder,
    path: &Path,
    options: &RawOptions,
) -> Result<Image> {
    match codec.decode(path) {
        Ok(image) => Ok(image),
        Err(e) => {
            debug!(path = %path.display(), error = %e, "codec failed, trying RAW decoder");
            raw.decode_raw(path, options)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meta::Meta;
    use crate::StoreError;

    struct FailingCodec;

    impl Codec for FailingCodec {
        fn decode(&self, path: &Path) -> Result<Image> {
            Err(StoreError::FileDoesNotExist(path.to_path_buf()))
        }

        fn encode(&self, _path: &Path, _image: ImageRef<'_>) -> Result<()> {
            Ok(())
        }
    }

    struct StubRaw;

    impl RawDecoder for StubRaw {
        fn decode_raw(&self, _path: &Path, options: &RawOptions) -> Result<Image> {
            assert!(options.auto_brightness);
            let meta = Meta::new(2, 2, Color::Rgb, Kind::Uint, 8)?;
            Ok(Image::new(meta))
        }
    }

    #[test]
    fn test_raw_decoder_is_the_fallback() {
        let image = read_with_fallback(
            &FailingCodec,
            &StubRaw,
            Path::new("shot.raw"),
            &RawOptions::default(),
        )
        .unwrap();
        assert_eq!(image.meta().width, 2);
    }
}
