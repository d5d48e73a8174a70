//! Image metadata
//!
//! `Meta` describes the shape and scalar type of a stored image: dimensions,
//! color (which fixes the channel count), and the numeric encoding of each
//! channel (`Kind` + bit width). The metadata record has a fixed 28-byte
//! little-endian encoding used by the on-disk format.

use std::fmt;
use std::str::FromStr;

use crate::error::{Result, StoreError};

/// Size of the encoded `Meta` record in bytes
pub const META_SIZE: usize = 28;

// =============================================================================
// Color
// =============================================================================

/// Color type of an image, fixing the number of channels per pixel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum Color {
    Undefined = 0,
    Gray = 1,
    GrayA = 2,
    Rgb = 3,
    Rgba = 4,
    Cmyk = 5,
    CmykA = 6,
    Ycbcr = 7,
    YcbcrA = 8,
    Cielab = 9,
    CielabA = 10,
    Cielch = 11,
    CielchA = 12,
    Ciexyz = 13,
    CiexyzA = 14,
    Yuv = 15,
    YuvA = 16,
    Hsl = 17,
    HslA = 18,
    Hsv = 19,
    HsvA = 20,
    Ciexyy = 21,
    CiexyyA = 22,
    Hcy = 23,
    HcyA = 24,
}

/// Channel count per color, indexed by discriminant
const COLOR_CHANNELS: [usize; 25] = [
    0, // Undefined
    1, // Gray
    2, // GrayA
    3, // Rgb
    4, // Rgba
    4, // Cmyk
    5, // CmykA
    3, // Ycbcr
    4, // YcbcrA
    3, // Cielab
    4, // CielabA
    3, // Cielch
    4, // CielchA
    3, // Ciexyz
    4, // CiexyzA
    3, // Yuv
    4, // YuvA
    3, // Hsl
    4, // HslA
    3, // Hsv
    4, // HsvA
    3, // Ciexyy
    4, // CiexyyA
    3, // Hcy
    4, // HcyA
];

const COLOR_NAMES: [&str; 25] = [
    "undefined",
    "gray",
    "graya",
    "rgb",
    "rgba",
    "cmyk",
    "cmyka",
    "ycbcr",
    "ycbcra",
    "cielab",
    "cielaba",
    "cielch",
    "cielcha",
    "ciexyz",
    "ciexyza",
    "yuv",
    "yuva",
    "hsl",
    "hsla",
    "hsv",
    "hsva",
    "ciexyy",
    "ciexyya",
    "hcy",
    "hcya",
];

impl Color {
    /// Number of channels for this color; `Undefined` has zero
    pub fn channels(self) -> usize {
        COLOR_CHANNELS[self as usize]
    }

    /// Canonical lowercase name, also accepted by `FromStr`
    pub fn name(self) -> &'static str {
        COLOR_NAMES[self as usize]
    }

    /// Decode from the on-disk discriminant
    pub fn from_u32(value: u32) -> Option<Color> {
        use Color::*;
        Some(match value {
            0 => Undefined,
            1 => Gray,
            2 => GrayA,
            3 => Rgb,
            4 => Rgba,
            5 => Cmyk,
            6 => CmykA,
            7 => Ycbcr,
            8 => YcbcrA,
            9 => Cielab,
            10 => CielabA,
            11 => Cielch,
            12 => CielchA,
            13 => Ciexyz,
            14 => CiexyzA,
            15 => Yuv,
            16 => YuvA,
            17 => Hsl,
            18 => HslA,
            19 => Hsv,
            20 => HsvA,
            21 => Ciexyy,
            22 => CiexyyA,
            23 => Hcy,
            24 => HcyA,
            _ => return None,
        })
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Color {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        // Accept the CIE names with or without their prefix ("lab" == "cielab")
        let stripped = lower.strip_prefix("cie").unwrap_or(&lower);
        for (i, name) in COLOR_NAMES.iter().enumerate().skip(1) {
            if lower == *name || stripped == name.strip_prefix("cie").unwrap_or(name) {
                return Ok(Color::from_u32(i as u32).unwrap());
            }
        }
        Err(format!("unknown color: {s}"))
    }
}

// =============================================================================
// Kind
// =============================================================================

/// Numeric encoding family of a channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum Kind {
    Int = 0,
    Uint = 1,
    Float = 2,
}

impl Kind {
    /// Decode from the on-disk discriminant
    pub fn from_u32(value: u32) -> Option<Kind> {
        match value {
            0 => Some(Kind::Int),
            1 => Some(Kind::Uint),
            2 => Some(Kind::Float),
            _ => None,
        }
    }
}

/// Name of a scalar type, or `None` if the kind/bits pair is not valid
///
/// Integers exist at 8/16/32/64 bits, floats at 16/32/64.
pub fn type_name(kind: Kind, bits: u8) -> Option<&'static str> {
    match kind {
        Kind::Int => match bits {
            8 => Some("i8"),
            16 => Some("i16"),
            32 => Some("i32"),
            64 => Some("i64"),
            _ => None,
        },
        Kind::Uint => match bits {
            8 => Some("u8"),
            16 => Some("u16"),
            32 => Some("u32"),
            64 => Some("u64"),
            _ => None,
        },
        Kind::Float => match bits {
            16 => Some("half"),
            32 => Some("float"),
            64 => Some("double"),
            _ => None,
        },
    }
}

/// Returns true if the kind/bits pair names a supported scalar type
pub fn is_valid_type(kind: Kind, bits: u8) -> bool {
    type_name(kind, bits).is_some()
}

/// Parse a scalar type name like `u8`, `i16`, `f32`, `half`, `double`
pub fn parse_type(s: &str) -> Option<(Kind, u8)> {
    match s.to_ascii_lowercase().as_str() {
        "i8" | "int8" => Some((Kind::Int, 8)),
        "i16" | "int16" => Some((Kind::Int, 16)),
        "i32" | "int32" => Some((Kind::Int, 32)),
        "i64" | "int64" => Some((Kind::Int, 64)),
        "u8" | "uint8" => Some((Kind::Uint, 8)),
        "u16" | "uint16" => Some((Kind::Uint, 16)),
        "u32" | "uint32" => Some((Kind::Uint, 32)),
        "u64" | "uint64" => Some((Kind::Uint, 64)),
        "f16" | "half" => Some((Kind::Float, 16)),
        "f32" | "float" => Some((Kind::Float, 32)),
        "f64" | "double" => Some((Kind::Float, 64)),
        _ => None,
    }
}

// =============================================================================
// Meta
// =============================================================================

/// Shape and scalar type of a stored image
///
/// Invariant: `is_valid_type(kind, bits)` holds for every constructed `Meta`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Meta {
    pub width: u64,
    pub height: u64,
    pub color: Color,
    pub kind: Kind,
    pub bits: u8,
}

impl Meta {
    /// Create a new `Meta`, validating the kind/bits pair
    pub fn new(width: u64, height: u64, color: Color, kind: Kind, bits: u8) -> Result<Meta> {
        if !is_valid_type(kind, bits) {
            return Err(StoreError::InvalidType { kind, bits });
        }
        Ok(Meta {
            width,
            height,
            color,
            kind,
            bits,
        })
    }

    /// Number of pixels in the image
    pub fn num_pixels(&self) -> u64 {
        self.width * self.height
    }

    /// Number of channels per pixel
    pub fn channels(&self) -> usize {
        self.color.channels()
    }

    /// Bytes per channel
    pub fn bytes_per_channel(&self) -> usize {
        self.bits as usize / 8
    }

    /// Bytes per pixel
    pub fn bytes_per_pixel(&self) -> usize {
        self.channels() * self.bytes_per_channel()
    }

    /// Bytes per row
    pub fn row_bytes(&self) -> usize {
        self.width as usize * self.bytes_per_pixel()
    }

    /// Total payload size in bytes: `width * height * channels * (bits / 8)`
    pub fn total_bytes(&self) -> usize {
        self.num_pixels() as usize * self.bytes_per_pixel()
    }

    /// Name of the scalar type, e.g. `u8` or `half`
    pub fn type_name(&self) -> &'static str {
        // The constructor and decoder both enforce validity
        type_name(self.kind, self.bits).unwrap_or("invalid")
    }

    /// Encode to the fixed 28-byte little-endian record
    pub(crate) fn encode(&self) -> [u8; META_SIZE] {
        let mut buf = [0u8; META_SIZE];
        buf[0..8].copy_from_slice(&self.width.to_le_bytes());
        buf[8..16].copy_from_slice(&self.height.to_le_bytes());
        buf[16..20].copy_from_slice(&(self.color as u32).to_le_bytes());
        buf[20..24].copy_from_slice(&(self.kind as u32).to_le_bytes());
        buf[24] = self.bits;
        // buf[25..28] reserved, zero
        buf
    }

    /// Decode from a 28-byte record, rejecting unknown color/kind/bits
    pub(crate) fn decode(buf: &[u8]) -> Option<Meta> {
        if buf.len() < META_SIZE {
            return None;
        }
        let width = u64::from_le_bytes(buf[0..8].try_into().unwrap());
        let height = u64::from_le_bytes(buf[8..16].try_into().unwrap());
        let color = Color::from_u32(u32::from_le_bytes(buf[16..20].try_into().unwrap()))?;
        let kind = Kind::from_u32(u32::from_le_bytes(buf[20..24].try_into().unwrap()))?;
        let bits = buf[24];
        if !is_valid_type(kind, bits) {
            return None;
        }
        Some(Meta {
            width,
            height,
            color,
            kind,
            bits,
        })
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_bytes_size_law() {
        // width=150, height=100, RGB (3 channels), 32 bits => 180000 bytes
        let meta = Meta::new(150, 100, Color::Rgb, Kind::Float, 32).unwrap();
        assert_eq!(meta.total_bytes(), 150 * 100 * 3 * 4);
        assert_eq!(meta.total_bytes(), 180_000);
    }

    #[test]
    fn test_channel_counts() {
        assert_eq!(Color::Undefined.channels(), 0);
        assert_eq!(Color::Gray.channels(), 1);
        assert_eq!(Color::GrayA.channels(), 2);
        assert_eq!(Color::Rgb.channels(), 3);
        assert_eq!(Color::Rgba.channels(), 4);
        assert_eq!(Color::Cmyk.channels(), 4);
        assert_eq!(Color::CmykA.channels(), 5);
        assert_eq!(Color::HcyA.channels(), 4);
    }

    #[test]
    fn test_type_validity_matrix() {
        for bits in [8u8, 16, 32, 64] {
            assert!(is_valid_type(Kind::Int, bits));
            assert!(is_valid_type(Kind::Uint, bits));
        }
        for bits in [16u8, 32, 64] {
            assert!(is_valid_type(Kind::Float, bits));
        }
        assert!(!is_valid_type(Kind::Float, 8));
        assert!(!is_valid_type(Kind::Int, 12));
        assert!(!is_valid_type(Kind::Uint, 0));
    }

    #[test]
    fn test_meta_new_rejects_invalid_type() {
        let err = Meta::new(1, 1, Color::Rgb, Kind::Float, 8).unwrap_err();
        assert!(matches!(
            err,
            crate::StoreError::InvalidType {
                kind: Kind::Float,
                bits: 8
            }
        ));
    }

    #[test]
    fn test_encode_decode_round_trip() {
        let meta = Meta::new(640, 480, Color::Rgba, Kind::Uint, 16).unwrap();
        let buf = meta.encode();
        assert_eq!(Meta::decode(&buf), Some(meta));
    }

    #[test]
    fn test_decode_rejects_bad_fields() {
        let meta = Meta::new(8, 8, Color::Rgb, Kind::Uint, 8).unwrap();

        let mut bad_color = meta.encode();
        bad_color[16..20].copy_from_slice(&99u32.to_le_bytes());
        assert_eq!(Meta::decode(&bad_color), None);

        let mut bad_kind = meta.encode();
        bad_kind[20..24].copy_from_slice(&7u32.to_le_bytes());
        assert_eq!(Meta::decode(&bad_kind), None);

        let mut bad_bits = meta.encode();
        bad_bits[24] = 12;
        assert_eq!(Meta::decode(&bad_bits), None);

        assert_eq!(Meta::decode(&[0u8; 10]), None);
    }

    #[test]
    fn test_color_parsing() {
        assert_eq!("rgb".parse::<Color>().unwrap(), Color::Rgb);
        assert_eq!("RGBA".parse::<Color>().unwrap(), Color::Rgba);
        assert_eq!("cielab".parse::<Color>().unwrap(), Color::Cielab);
        assert_eq!("lab".parse::<Color>().unwrap(), Color::Cielab);
        assert_eq!("xyz".parse::<Color>().unwrap(), Color::Ciexyz);
        assert!("mauve".parse::<Color>().is_err());
    }

    #[test]
    fn test_type_parsing() {
        assert_eq!(parse_type("u8"), Some((Kind::Uint, 8)));
        assert_eq!(parse_type("uint16"), Some((Kind::Uint, 16)));
        assert_eq!(parse_type("i32"), Some((Kind::Int, 32)));
        assert_eq!(parse_type("half"), Some((Kind::Float, 16)));
        assert_eq!(parse_type("F32"), Some((Kind::Float, 32)));
        assert_eq!(parse_type("double"), Some((Kind::Float, 64)));
        assert_eq!(parse_type("q8"), None);
    }

    #[test]
    fn test_type_names() {
        assert_eq!(type_name(Kind::Uint, 8), Some("u8"));
        assert_eq!(type_name(Kind::Float, 16), Some("half"));
        assert_eq!(type_name(Kind::Float, 64), Some("double"));
        assert_eq!(type_name(Kind::Float, 8), None);
    }
}
