#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

mod cursor;
pub mod encoding;
pub mod error;
pub mod fetch;
pub mod jpeg;
pub mod photoshop;
pub mod tiff;

pub use cursor::Endianness;
pub use jpeg::{JpegSegments, Segment};
pub use photoshop::{PhotoshopResources, ResourceBlock, Thumbnail, ThumbnailFormat};
pub use tiff::{DataName, Tag, Tiff, TiffPath, Type, Value};
