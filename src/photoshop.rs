//! Photoshop image resource blocks, as stored in the APP13 segment.
//!
//! The payload is a flat sequence of `8BIM` records, each with an id, a pascal-string name and a
//! length-prefixed data block. All fields are big endian and every variable-length part is
//! padded to an even size.

use bytes::Bytes;
use log::trace;
use num_enum::TryFromPrimitive;

use crate::cursor::{ByteReader, ByteWriter, Endianness};
use crate::error::{FormatError, MetadataResult};
use crate::tiff::Value;

const SIGNATURE_8BIM: u32 = 0x3842_494D;

/// Resource id of the thumbnail written by Photoshop 5 and later.
pub const THUMBNAIL_RESOURCE: u16 = 0x040C;
/// Resource id of the thumbnail written by Photoshop 4.
pub const LEGACY_THUMBNAIL_RESOURCE: u16 = 0x0409;

/// One record of a resource block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceBlock {
    /// Resource id.
    pub id: u16,
    /// Name, usually empty. Stored one byte per character.
    pub name: String,
    /// Resource data.
    pub data: Bytes,
}

impl ResourceBlock {
    /// Create a new unnamed block.
    pub fn new(id: u16, data: impl Into<Bytes>) -> Self {
        Self {
            id,
            name: String::new(),
            data: data.into(),
        }
    }
}

fn padded(size: usize) -> usize {
    size + size % 2
}

fn read_pascal_string(reader: &mut ByteReader) -> MetadataResult<String> {
    let len = usize::from(reader.read_u8()?);
    let name = reader.take(len)?.iter().map(|b| char::from(*b)).collect();
    if (len + 1) % 2 == 1 {
        reader.read_u8()?;
    }
    Ok(name)
}

fn write_pascal_string(writer: &mut ByteWriter, name: &[u8]) -> MetadataResult<()> {
    let len = u8::try_from(name.len()).map_err(|_| FormatError::PascalStringTooLong(name.len()))?;
    writer.write_u8(len)?;
    writer.write(name)?;
    if (name.len() + 1) % 2 == 1 {
        writer.write_u8(0)?;
    }
    Ok(())
}

/// An ordered list of resource blocks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhotoshopResources {
    blocks: Vec<ResourceBlock>,
}

impl PhotoshopResources {
    /// An empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a resource payload, without the segment signature.
    pub fn parse(data: &[u8]) -> MetadataResult<Self> {
        let mut reader = ByteReader::new(data, Endianness::BigEndian);
        let mut blocks = vec![];
        while !reader.is_at_end() {
            let signature = reader.read_u32()?;
            if signature != SIGNATURE_8BIM {
                return Err(FormatError::ResourceSignatureInvalid(signature).into());
            }
            let id = reader.read_u16()?;
            let name = read_pascal_string(&mut reader)?;
            let len = reader.read_u32()? as usize;
            let data = reader.read(len)?;
            reader.seek(reader.position() + len % 2);
            trace!("resource 0x{id:04X} of {len} bytes");
            blocks.push(ResourceBlock { id, name, data });
        }
        Ok(Self { blocks })
    }

    /// All blocks, in file order.
    pub fn blocks(&self) -> &[ResourceBlock] {
        &self.blocks
    }

    /// The first block with the given id.
    pub fn get(&self, id: u16) -> Option<&ResourceBlock> {
        self.blocks.iter().find(|block| block.id == id)
    }

    /// Replace the first block with the same id, or append the block.
    pub fn set(&mut self, block: ResourceBlock) {
        match self.blocks.iter_mut().find(|existing| existing.id == block.id) {
            Some(existing) => *existing = block,
            None => self.blocks.push(block),
        }
    }

    /// Remove every block with the given id, returning the first.
    pub fn remove(&mut self, id: u16) -> Option<ResourceBlock> {
        let index = self.blocks.iter().position(|block| block.id == id)?;
        let removed = self.blocks.remove(index);
        self.blocks.retain(|block| block.id != id);
        Some(removed)
    }

    /// Serialize the blocks.
    pub fn to_bytes(&self) -> MetadataResult<Vec<u8>> {
        let names = self
            .blocks
            .iter()
            .map(|block| Value::ascii_bytes(&block.name))
            .collect::<MetadataResult<Vec<_>>>()?;
        let size = self
            .blocks
            .iter()
            .zip(&names)
            .map(|(block, name)| 4 + 2 + padded(1 + name.len()) + 4 + padded(block.data.len()))
            .sum();

        let mut writer = ByteWriter::new(size, Endianness::BigEndian);
        for (block, name) in self.blocks.iter().zip(&names) {
            writer.write_u32(SIGNATURE_8BIM)?;
            writer.write_u16(block.id)?;
            write_pascal_string(&mut writer, name)?;
            writer.write_u32(u32::try_from(block.data.len())?)?;
            writer.write(&block.data)?;
            if block.data.len() % 2 == 1 {
                writer.write_u8(0)?;
            }
        }
        Ok(writer.into_inner())
    }

    /// The embedded thumbnail, from the newest thumbnail resource present.
    pub fn thumbnail(&self) -> MetadataResult<Option<Thumbnail>> {
        self.get(THUMBNAIL_RESOURCE)
            .or_else(|| self.get(LEGACY_THUMBNAIL_RESOURCE))
            .map(|block| Thumbnail::parse(&block.data))
            .transpose()
    }
}

/// Encoding of a thumbnail resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u32)]
pub enum ThumbnailFormat {
    /// Uncompressed pixels.
    Raw = 0,
    /// A complete JPEG stream.
    Jpeg = 1,
}

/// A decoded thumbnail resource.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thumbnail {
    pub format: ThumbnailFormat,
    pub width: u32,
    pub height: u32,
    /// Padded row bytes, `(width * bits_per_pixel + 31) / 32 * 4`.
    pub width_bytes: u32,
    pub total_size: u32,
    pub compressed_size: u32,
    pub bits_per_pixel: u16,
    pub planes: u16,
    /// Image data following the header.
    pub data: Bytes,
}

impl Thumbnail {
    /// Decode the 28-byte header and the data that follows it.
    fn parse(data: &[u8]) -> MetadataResult<Self> {
        let mut reader = ByteReader::new(data, Endianness::BigEndian);
        let format = reader.read_u32()?;
        let format = ThumbnailFormat::try_from_primitive(format)
            .map_err(|_| FormatError::ThumbnailFormatInvalid(format))?;
        Ok(Self {
            format,
            width: reader.read_u32()?,
            height: reader.read_u32()?,
            width_bytes: reader.read_u32()?,
            total_size: reader.read_u32()?,
            compressed_size: reader.read_u32()?,
            bits_per_pixel: reader.read_u16()?,
            planes: reader.read_u16()?,
            data: reader.read_remaining()?,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::error::MetadataError;

    #[test]
    #[rustfmt::skip]
    fn test_parse_blocks() {
        let data = [
            b'8', b'B', b'I', b'M', 0x04, 0x04,
            0, 0,
            0, 0, 0, 3, 0x1c, 0x02, 0x00, 0,
            b'8', b'B', b'I', b'M', 0x04, 0x25,
            2, b'a', b'b', 0,
            0, 0, 0, 2, 0xde, 0xad,
        ];
        let resources = PhotoshopResources::parse(&data).unwrap();
        assert_eq!(resources.blocks().len(), 2);
        assert_eq!(resources.blocks()[0].name, "");
        assert_eq!(resources.get(0x0404).unwrap().data.as_ref(), &[0x1c, 0x02, 0x00]);
        assert_eq!(resources.get(0x0425).unwrap().name, "ab");
        assert_eq!(resources.to_bytes().unwrap(), data.to_vec());
    }

    #[test]
    fn test_bad_signature() {
        let data = *b"8BIX\x04\x04\0\0\0\0\0\0";
        match PhotoshopResources::parse(&data) {
            Err(MetadataError::Format(FormatError::ResourceSignatureInvalid(0x3842_4958))) => {}
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_set_and_remove() {
        let mut resources = PhotoshopResources::new();
        resources.set(ResourceBlock::new(1, &b"one"[..]));
        resources.set(ResourceBlock::new(2, &b"two"[..]));
        resources.set(ResourceBlock::new(1, &b"uno"[..]));
        assert_eq!(resources.blocks().len(), 2);
        assert_eq!(resources.get(1).unwrap().data.as_ref(), b"uno");
        assert_eq!(resources.remove(1).unwrap().id, 1);
        assert_eq!(resources.remove(1), None);

        let mut long = ResourceBlock::new(3, Bytes::new());
        long.name = "x".repeat(256);
        resources.set(long);
        assert!(resources.to_bytes().is_err());
    }

    #[test]
    #[rustfmt::skip]
    fn test_thumbnail_prefers_newer_resource() {
        let header = |format: u8| -> Vec<u8> {
            vec![
                0, 0, 0, format,
                0, 0, 0, 160, 0, 0, 0, 120, 0, 0, 1, 224,
                0, 0, 0xe1, 0, 0, 0, 0, 4,
                0, 24, 0, 1,
            ]
        };
        let mut resources = PhotoshopResources::new();
        resources.set(ResourceBlock::new(LEGACY_THUMBNAIL_RESOURCE, [header(0), vec![1, 2]].concat()));
        assert_eq!(resources.thumbnail().unwrap().unwrap().format, ThumbnailFormat::Raw);

        resources.set(ResourceBlock::new(THUMBNAIL_RESOURCE, [header(1), vec![0xff, 0xd8, 0xff, 0xd9]].concat()));
        let thumbnail = resources.thumbnail().unwrap().unwrap();
        assert_eq!(thumbnail.format, ThumbnailFormat::Jpeg);
        assert_eq!((thumbnail.width, thumbnail.height), (160, 120));
        assert_eq!(thumbnail.bits_per_pixel, 24);
        assert_eq!(thumbnail.data.as_ref(), &[0xff, 0xd8, 0xff, 0xd9]);

        resources.set(ResourceBlock::new(THUMBNAIL_RESOURCE, header(7)));
        assert!(resources.thumbnail().is_err());
    }
}
