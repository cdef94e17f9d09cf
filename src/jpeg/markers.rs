//! Marker codes and payload signatures of the segments this crate understands.

/// Prefix byte of every marker.
pub const MARKER_PREFIX: u8 = 0xFF;
/// Start of image.
pub const SOI: u8 = 0xD8;
/// Start of scan. Everything after it is entropy-coded data.
pub const SOS: u8 = 0xDA;
/// JFIF / JFXX application segment.
pub const APP0: u8 = 0xE0;
/// EXIF application segment.
pub const APP1: u8 = 0xE1;
/// ICC profile application segment.
pub const APP2: u8 = 0xE2;
/// Photoshop application segment.
pub const APP13: u8 = 0xED;

/// Leading bytes of an EXIF payload.
pub const EXIF_SIGNATURE: &[u8] = b"Exif\0\0";
/// Leading bytes of a JFIF payload.
pub const JFIF_SIGNATURE: &[u8] = b"JFIF\0";
/// Leading bytes of a JFIF extension payload.
pub const JFXX_SIGNATURE: &[u8] = b"JFXX\0";
/// Leading bytes of each ICC profile chunk.
pub const ICC_PROFILE_SIGNATURE: &[u8] = b"ICC_PROFILE\0";
/// Leading bytes of a Photoshop resource payload.
pub const PHOTOSHOP_SIGNATURE: &[u8] = b"Photoshop 3.0\0";

/// Largest payload a segment can carry: the 16-bit length counts itself.
pub const MAX_SEGMENT_PAYLOAD: usize = 0xFFFF - 2;

/// Largest slice of an ICC profile stored in one segment.
pub const ICC_MAX_CHUNK: usize = 0xFFFF - ICC_PROFILE_SIGNATURE.len() - 4;
