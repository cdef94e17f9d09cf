//! Endian-aware positional reads and writes over fixed-size buffers.
//!
//! Both the JPEG segment framing (always big endian) and the TIFF tag tree (whatever its header
//! declares) go through these cursors, so the byte order is carried per cursor instead of being a
//! global setting.

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use bytes::Bytes;

use crate::error::{MetadataError, MetadataResult};

/// Endianness
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Endianness {
    /// Little Endian
    #[default]
    LittleEndian,
    /// Big Endian
    BigEndian,
}

fn out_of_bounds(offset: usize, length: usize, available: usize) -> MetadataError {
    MetadataError::EndOfBuffer {
        offset,
        length,
        available,
    }
}

/// Reads values from a borrowed buffer, tracking the current position.
///
/// Every fixed-width read advances the position by exactly its width. Reading past the end of
/// the buffer is an error and leaves the position untouched.
#[derive(Debug, Clone)]
pub(crate) struct ByteReader<'a> {
    data: &'a [u8],
    position: usize,
    endianness: Endianness,
}

impl<'a> ByteReader<'a> {
    pub(crate) fn new(data: &'a [u8], endianness: Endianness) -> Self {
        Self {
            data,
            position: 0,
            endianness,
        }
    }

    pub(crate) fn position(&self) -> usize {
        self.position
    }

    pub(crate) fn seek(&mut self, position: usize) {
        self.position = position;
    }

    pub(crate) fn is_at_end(&self) -> bool {
        self.position >= self.data.len()
    }

    pub(crate) fn endianness(&self) -> Endianness {
        self.endianness
    }

    pub(crate) fn set_endianness(&mut self, endianness: Endianness) {
        self.endianness = endianness;
    }

    /// Borrow the next `length` bytes, advancing the cursor past them.
    pub(crate) fn take(&mut self, length: usize) -> MetadataResult<&'a [u8]> {
        let start = self.position;
        let end = start
            .checked_add(length)
            .filter(|end| *end <= self.data.len())
            .ok_or_else(|| out_of_bounds(start, length, self.data.len()))?;
        self.position = end;
        Ok(&self.data[start..end])
    }

    /// Read the given number of bytes into an owned buffer.
    pub(crate) fn read(&mut self, length: usize) -> MetadataResult<Bytes> {
        Ok(Bytes::copy_from_slice(self.take(length)?))
    }

    /// Read everything from the current position to the end of the buffer.
    pub(crate) fn read_remaining(&mut self) -> MetadataResult<Bytes> {
        let length = self.data.len().saturating_sub(self.position);
        self.read(length)
    }

    /// Read a u8 from the cursor, advancing the internal state by 1 byte.
    pub(crate) fn read_u8(&mut self) -> MetadataResult<u8> {
        Ok(self.take(1)?[0])
    }

    /// Read a i8 from the cursor, advancing the internal state by 1 byte.
    pub(crate) fn read_i8(&mut self) -> MetadataResult<i8> {
        Ok(self.take(1)?[0] as i8)
    }

    pub(crate) fn read_u16(&mut self) -> MetadataResult<u16> {
        let buf = self.take(2)?;
        Ok(match self.endianness {
            Endianness::LittleEndian => LittleEndian::read_u16(buf),
            Endianness::BigEndian => BigEndian::read_u16(buf),
        })
    }

    pub(crate) fn read_i16(&mut self) -> MetadataResult<i16> {
        let buf = self.take(2)?;
        Ok(match self.endianness {
            Endianness::LittleEndian => LittleEndian::read_i16(buf),
            Endianness::BigEndian => BigEndian::read_i16(buf),
        })
    }

    pub(crate) fn read_u32(&mut self) -> MetadataResult<u32> {
        let buf = self.take(4)?;
        Ok(match self.endianness {
            Endianness::LittleEndian => LittleEndian::read_u32(buf),
            Endianness::BigEndian => BigEndian::read_u32(buf),
        })
    }

    pub(crate) fn read_i32(&mut self) -> MetadataResult<i32> {
        let buf = self.take(4)?;
        Ok(match self.endianness {
            Endianness::LittleEndian => LittleEndian::read_i32(buf),
            Endianness::BigEndian => BigEndian::read_i32(buf),
        })
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub(crate) fn read_u64(&mut self) -> MetadataResult<u64> {
        let buf = self.take(8)?;
        Ok(match self.endianness {
            Endianness::LittleEndian => LittleEndian::read_u64(buf),
            Endianness::BigEndian => BigEndian::read_u64(buf),
        })
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub(crate) fn read_i64(&mut self) -> MetadataResult<i64> {
        let buf = self.take(8)?;
        Ok(match self.endianness {
            Endianness::LittleEndian => LittleEndian::read_i64(buf),
            Endianness::BigEndian => BigEndian::read_i64(buf),
        })
    }

    pub(crate) fn read_f32(&mut self) -> MetadataResult<f32> {
        let buf = self.take(4)?;
        Ok(match self.endianness {
            Endianness::LittleEndian => LittleEndian::read_f32(buf),
            Endianness::BigEndian => BigEndian::read_f32(buf),
        })
    }

    pub(crate) fn read_f64(&mut self) -> MetadataResult<f64> {
        let buf = self.take(8)?;
        Ok(match self.endianness {
            Endianness::LittleEndian => LittleEndian::read_f64(buf),
            Endianness::BigEndian => BigEndian::read_f64(buf),
        })
    }
}

/// Writes values into a zero-filled buffer whose size is fixed up front.
///
/// The position can be moved freely, which is how offsets get back-patched once their targets
/// are known. Writing past the declared size is an error.
#[derive(Debug, Clone)]
pub(crate) struct ByteWriter {
    buffer: Vec<u8>,
    position: usize,
    endianness: Endianness,
}

impl ByteWriter {
    pub(crate) fn new(size: usize, endianness: Endianness) -> Self {
        Self {
            buffer: vec![0; size],
            position: 0,
            endianness,
        }
    }

    pub(crate) fn position(&self) -> usize {
        self.position
    }

    pub(crate) fn seek(&mut self, position: usize) {
        self.position = position;
    }

    fn slot(&mut self, length: usize) -> MetadataResult<&mut [u8]> {
        let start = self.position;
        let end = start
            .checked_add(length)
            .filter(|end| *end <= self.buffer.len())
            .ok_or_else(|| out_of_bounds(start, length, self.buffer.len()))?;
        self.position = end;
        Ok(&mut self.buffer[start..end])
    }

    pub(crate) fn write(&mut self, bytes: &[u8]) -> MetadataResult<()> {
        self.slot(bytes.len())?.copy_from_slice(bytes);
        Ok(())
    }

    pub(crate) fn write_u8(&mut self, value: u8) -> MetadataResult<()> {
        self.slot(1)?[0] = value;
        Ok(())
    }

    pub(crate) fn write_i8(&mut self, value: i8) -> MetadataResult<()> {
        self.slot(1)?[0] = value as u8;
        Ok(())
    }

    pub(crate) fn write_u16(&mut self, value: u16) -> MetadataResult<()> {
        let endianness = self.endianness;
        let buf = self.slot(2)?;
        match endianness {
            Endianness::LittleEndian => LittleEndian::write_u16(buf, value),
            Endianness::BigEndian => BigEndian::write_u16(buf, value),
        }
        Ok(())
    }

    pub(crate) fn write_i16(&mut self, value: i16) -> MetadataResult<()> {
        let endianness = self.endianness;
        let buf = self.slot(2)?;
        match endianness {
            Endianness::LittleEndian => LittleEndian::write_i16(buf, value),
            Endianness::BigEndian => BigEndian::write_i16(buf, value),
        }
        Ok(())
    }

    pub(crate) fn write_u32(&mut self, value: u32) -> MetadataResult<()> {
        let endianness = self.endianness;
        let buf = self.slot(4)?;
        match endianness {
            Endianness::LittleEndian => LittleEndian::write_u32(buf, value),
            Endianness::BigEndian => BigEndian::write_u32(buf, value),
        }
        Ok(())
    }

    pub(crate) fn write_i32(&mut self, value: i32) -> MetadataResult<()> {
        let endianness = self.endianness;
        let buf = self.slot(4)?;
        match endianness {
            Endianness::LittleEndian => LittleEndian::write_i32(buf, value),
            Endianness::BigEndian => BigEndian::write_i32(buf, value),
        }
        Ok(())
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub(crate) fn write_u64(&mut self, value: u64) -> MetadataResult<()> {
        let endianness = self.endianness;
        let buf = self.slot(8)?;
        match endianness {
            Endianness::LittleEndian => LittleEndian::write_u64(buf, value),
            Endianness::BigEndian => BigEndian::write_u64(buf, value),
        }
        Ok(())
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub(crate) fn write_i64(&mut self, value: i64) -> MetadataResult<()> {
        let endianness = self.endianness;
        let buf = self.slot(8)?;
        match endianness {
            Endianness::LittleEndian => LittleEndian::write_i64(buf, value),
            Endianness::BigEndian => BigEndian::write_i64(buf, value),
        }
        Ok(())
    }

    pub(crate) fn write_f32(&mut self, value: f32) -> MetadataResult<()> {
        let endianness = self.endianness;
        let buf = self.slot(4)?;
        match endianness {
            Endianness::LittleEndian => LittleEndian::write_f32(buf, value),
            Endianness::BigEndian => BigEndian::write_f32(buf, value),
        }
        Ok(())
    }

    pub(crate) fn write_f64(&mut self, value: f64) -> MetadataResult<()> {
        let endianness = self.endianness;
        let buf = self.slot(8)?;
        match endianness {
            Endianness::LittleEndian => LittleEndian::write_f64(buf, value),
            Endianness::BigEndian => BigEndian::write_f64(buf, value),
        }
        Ok(())
    }

    pub(crate) fn into_inner(self) -> Vec<u8> {
        self.buffer
    }
}
