//! Error handling.

use std::error::Error as StdError;
use std::fmt;

use thiserror::Error;

use crate::tiff::tags::Type;

/// Enum with all errors in this crate.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum MetadataError {
    /// A read or write ran past the end of the buffer.
    #[error("End of buffer: {length} bytes at offset {offset} requested, buffer holds {available}")]
    EndOfBuffer {
        /// Position where the access started.
        offset: usize,
        /// Number of bytes requested.
        length: usize,
        /// Total size of the buffer.
        available: usize,
    },

    /// The input is not formatted properly.
    #[error("Format error: {0}")]
    Format(#[from] FormatError),

    /// A tree path could not be used.
    #[error("Path error: {0}")]
    Path(#[from] PathError),

    /// General error.
    #[error("General error: {0}")]
    General(String),

    /// IO Error.
    #[error(transparent)]
    IOError(#[from] std::io::Error),

    /// Reqwest error
    #[cfg(feature = "reqwest")]
    #[error(transparent)]
    ReqwestError(#[from] reqwest::Error),
}

impl From<std::num::TryFromIntError> for MetadataError {
    fn from(_err: std::num::TryFromIntError) -> MetadataError {
        MetadataError::Format(FormatError::IntSizeExceeded)
    }
}

/// Crate-specific result type.
pub type MetadataResult<T> = std::result::Result<T, MetadataError>;

/// The data is not formatted properly, or a structure cannot be encoded.
///
/// This indicates that the encoder producing the image might behave incorrectly, that the input
/// was corrupted, or that an edited model no longer fits the limits of the format.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum FormatError {
    JpegSignatureInvalid,
    MarkerExpected(u8),
    SegmentLengthInvalid(u16),
    SegmentTooLarge(usize),
    MultipleSegments(u8),
    TiffSignatureInvalid,
    TiffMagicInvalid(u16),
    UnknownType(u16),
    AsciiCountZero,
    AsciiValueInvalid(char),
    DuplicateTag(u16),
    DuplicateBranch(u16),
    InvalidSubIfdType(u16, Type),
    BrokenDataPair { position: u16, length: u16 },
    InvalidDataPairType(u16, Type),
    InconsistentDataPair { positions: usize, lengths: usize },
    CycleInOffsets(u32),
    ResourceSignatureInvalid(u32),
    PascalStringTooLong(usize),
    ThumbnailFormatInvalid(u32),
    ProfileChunkTruncated(usize),
    ProfileSequenceInvalid { expected: u8, found: u8 },
    ProfileCountInvalid { expected: usize, found: u8 },
    ProfileTooLarge(usize),
    IntSizeExceeded,
}

impl fmt::Display for FormatError {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        use self::FormatError::*;
        match *self {
            JpegSignatureInvalid => write!(fmt, "JPEG start-of-image marker not found."),
            MarkerExpected(found) => write!(fmt, "Expected marker prefix 0xFF, found 0x{found:02X}."),
            SegmentLengthInvalid(length) => write!(fmt, "Invalid segment length {length}."),
            SegmentTooLarge(size) => {
                write!(fmt, "Segment payload of {size} bytes does not fit a 16-bit length.")
            }
            MultipleSegments(marker) => {
                write!(fmt, "Expected a single segment with marker 0x{marker:02X}, found several.")
            }
            TiffSignatureInvalid => write!(fmt, "TIFF byte-order mark invalid."),
            TiffMagicInvalid(magic) => write!(fmt, "TIFF magic number {magic} invalid."),
            UnknownType(code) => write!(fmt, "Unknown field type {code}."),
            AsciiCountZero => write!(fmt, "ASCII field with zero count."),
            AsciiValueInvalid(c) => write!(fmt, "Character {c:?} cannot be stored in an ASCII field."),
            DuplicateTag(id) => write!(fmt, "Tag {id} occurs more than once in one directory."),
            DuplicateBranch(id) => write!(fmt, "Multiple sub-directory branches for tag {id}."),
            InvalidSubIfdType(id, ty) => {
                write!(fmt, "Tag {id} points to sub-directories but has type {ty:?}.")
            }
            BrokenDataPair { position, length } => write!(
                fmt,
                "Data pair ({position}, {length}) has only one of its two tags."
            ),
            InvalidDataPairType(id, ty) => write!(fmt, "Data pair tag {id} has invalid type {ty:?}."),
            InconsistentDataPair { positions, lengths } => write!(
                fmt,
                "Data pair lists differ in length: {positions} positions, {lengths} lengths."
            ),
            CycleInOffsets(offset) => {
                write!(fmt, "Directory at offset {offset} is referenced more than once.")
            }
            ResourceSignatureInvalid(signature) => {
                write!(fmt, "Invalid resource signature 0x{signature:08X}.")
            }
            PascalStringTooLong(len) => {
                write!(fmt, "String of {len} bytes cannot be stored as a pascal string.")
            }
            ThumbnailFormatInvalid(format) => write!(fmt, "Unknown thumbnail format {format}."),
            ProfileChunkTruncated(len) => {
                write!(fmt, "Profile chunk of {len} bytes is shorter than its header.")
            }
            ProfileSequenceInvalid { expected, found } => write!(
                fmt,
                "Profile chunk sequence number {found} found, expected {expected}."
            ),
            ProfileCountInvalid { expected, found } => write!(
                fmt,
                "Profile chunk declares {found} chunks, {expected} present."
            ),
            ProfileTooLarge(chunks) => {
                write!(fmt, "Profile needs {chunks} chunks, at most 255 are possible.")
            }
            IntSizeExceeded => write!(fmt, "Platform or format size limits exceeded."),
        }
    }
}

impl StdError for FormatError {}

/// A tree path that is malformed or names something that does not exist in the format.
///
/// A well-formed path that simply does not resolve is not an error; lookups return `None`.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum PathError {
    MissingRoot(String),
    InvalidComponent(String),
    DirectoryExpected(String),
    UnknownBranch(String),
    EndsOnBranch(String),
    UnknownDataName(String),
}

impl fmt::Display for PathError {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        use self::PathError::*;
        match *self {
            MissingRoot(ref path) => write!(fmt, "Path {path:?} must start with '/'."),
            InvalidComponent(ref component) => {
                write!(fmt, "Invalid path component {component:?}, expected name[index].")
            }
            DirectoryExpected(ref component) => {
                write!(fmt, "Invalid path component {component:?}, expected \"ifd\".")
            }
            UnknownBranch(ref name) => write!(fmt, "Unknown branch {name:?} in path."),
            EndsOnBranch(ref path) => write!(
                fmt,
                "Invalid path {path:?}, last component must be \"ifd[N]\"."
            ),
            UnknownDataName(ref name) => write!(fmt, "Unknown data name {name:?}."),
        }
    }
}

impl StdError for PathError {}
