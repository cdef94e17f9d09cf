use std::collections::{HashSet, VecDeque};

use bytes::Bytes;
use log::{debug, trace};

use crate::cursor::{ByteReader, Endianness};
use crate::error::{FormatError, MetadataResult};
use crate::tiff::tags::{points_to_sub_ifd, DataName, Tag, Type, Value};
use crate::tiff::{Directory, DirectoryId, Tiff, Trunk};

/// Where a parsed trunk is stored once complete.
#[derive(Debug, Clone, Copy)]
enum Slot {
    Root,
    Branch {
        owner: DirectoryId,
        branch: u16,
        index: usize,
    },
}

/// Decode `count` elements of `field_type` from the reader.
///
/// A single element decodes to the scalar variant. Rationals always decode to a list of pairs.
fn decode_value(reader: &mut ByteReader, field_type: Type, count: usize) -> MetadataResult<Value> {
    fn many<T>(
        count: usize,
        mut read: impl FnMut() -> MetadataResult<T>,
    ) -> MetadataResult<Vec<T>> {
        (0..count).map(|_| read()).collect()
    }

    let one = count == 1;
    Ok(match field_type {
        Type::BYTE if one => Value::Byte(reader.read_u8()?),
        Type::BYTE => Value::ByteList(reader.take(count)?.to_vec()),
        Type::UNDEFINED if one => Value::Undefined(reader.read_u8()?),
        Type::UNDEFINED => Value::UndefinedList(reader.take(count)?.to_vec()),
        Type::ASCII => {
            if count == 0 {
                return Err(FormatError::AsciiCountZero.into());
            }
            let raw = reader.take(count)?;
            Value::Ascii(raw[..count - 1].iter().map(|b| char::from(*b)).collect())
        }
        Type::SBYTE if one => Value::SignedByte(reader.read_i8()?),
        Type::SBYTE => Value::SignedByteList(many(count, || reader.read_i8())?),
        Type::SHORT if one => Value::Short(reader.read_u16()?),
        Type::SHORT => Value::ShortList(many(count, || reader.read_u16())?),
        Type::SSHORT if one => Value::SignedShort(reader.read_i16()?),
        Type::SSHORT => Value::SignedShortList(many(count, || reader.read_i16())?),
        Type::LONG if one => Value::Long(reader.read_u32()?),
        Type::LONG => Value::LongList(many(count, || reader.read_u32())?),
        Type::IFD if one => Value::Ifd(reader.read_u32()?),
        Type::IFD => Value::IfdList(many(count, || reader.read_u32())?),
        Type::SLONG if one => Value::SignedLong(reader.read_i32()?),
        Type::SLONG => Value::SignedLongList(many(count, || reader.read_i32())?),
        Type::FLOAT if one => Value::Float(reader.read_f32()?),
        Type::FLOAT => Value::FloatList(many(count, || reader.read_f32())?),
        Type::DOUBLE if one => Value::Double(reader.read_f64()?),
        Type::DOUBLE => Value::DoubleList(many(count, || reader.read_f64())?),
        Type::RATIONAL => Value::Rational(many(count, || {
            Ok([reader.read_u32()?, reader.read_u32()?])
        })?),
        Type::SRATIONAL => Value::SignedRational(many(count, || {
            Ok([reader.read_i32()?, reader.read_i32()?])
        })?),
    })
}

/// Read one 12-byte directory entry, following its offset if the payload is out of line.
fn read_tag(reader: &mut ByteReader) -> MetadataResult<Tag> {
    let id = reader.read_u16()?;
    let code = reader.read_u16()?;
    let field_type = Type::from_u16(code).ok_or(FormatError::UnknownType(code))?;
    let count = usize::try_from(reader.read_u32()?)?;
    let size = count
        .checked_mul(field_type.size())
        .ok_or(FormatError::IntSizeExceeded)?;

    let payload = if size > 4 {
        let offset = reader.read_u32()?;
        let mut target = reader.clone();
        target.seek(offset as usize);
        target.take(size)?
    } else {
        &reader.take(4)?[..size]
    };
    let value = decode_value(
        &mut ByteReader::new(payload, reader.endianness()),
        field_type,
        count,
    )?;
    trace!("tag {id} type {field_type:?} count {count}");
    Ok(Tag::new(id, value))
}

/// Read the payload chunks addressed by each known position/length pair.
fn read_data(reader: &ByteReader, dir: &mut Directory) -> MetadataResult<()> {
    for name in DataName::ALL {
        let position = dir.tags.iter().find(|tag| tag.id == name.position_id());
        let length = dir.tags.iter().find(|tag| tag.id == name.length_id());
        let (position, length) = match (position, length) {
            (Some(position), Some(length)) => (position, length),
            (None, None) => continue,
            _ => {
                return Err(FormatError::BrokenDataPair {
                    position: name.position_id(),
                    length: name.length_id(),
                }
                .into())
            }
        };

        if position.field_type() != Type::LONG {
            return Err(FormatError::InvalidDataPairType(position.id, position.field_type()).into());
        }
        let lengths = match length.field_type() {
            Type::LONG | Type::SHORT | Type::BYTE => length.value.to_u32_vec().unwrap_or_default(),
            other => return Err(FormatError::InvalidDataPairType(length.id, other).into()),
        };
        let positions = position.value.to_u32_vec().unwrap_or_default();
        if positions.len() != lengths.len() {
            return Err(FormatError::InconsistentDataPair {
                positions: positions.len(),
                lengths: lengths.len(),
            }
            .into());
        }

        let mut chunks: Vec<Bytes> = Vec::with_capacity(positions.len());
        for (offset, len) in positions.iter().zip(lengths.iter()) {
            let mut target = reader.clone();
            target.seek(*offset as usize);
            chunks.push(target.read(*len as usize)?);
        }
        dir.data.insert(name, chunks);
    }
    Ok(())
}

impl Tiff {
    /// Parse a TIFF byte stream, such as the payload of an EXIF segment.
    ///
    /// Every reachable directory is read, including the trunks behind pointer tags. Payload
    /// bytes are copied out, so the input can be dropped afterwards.
    pub fn from_bytes(data: &[u8]) -> MetadataResult<Self> {
        let mut reader = ByteReader::new(data, Endianness::BigEndian);
        let endianness = match reader.take(2)? {
            b"II" => Endianness::LittleEndian,
            b"MM" => Endianness::BigEndian,
            _ => return Err(FormatError::TiffSignatureInvalid.into()),
        };
        reader.set_endianness(endianness);
        let magic = reader.read_u16()?;
        if magic != 42 {
            return Err(FormatError::TiffMagicInvalid(magic).into());
        }
        let first = reader.read_u32()?;

        let mut tiff = Tiff {
            endianness,
            ..Default::default()
        };
        let mut visited = HashSet::new();
        let mut pending = VecDeque::from([(first, Slot::Root)]);

        while let Some((mut offset, slot)) = pending.pop_front() {
            let mut trunk = Trunk::default();
            while offset != 0 {
                if !visited.insert(offset) {
                    return Err(FormatError::CycleInOffsets(offset).into());
                }
                reader.seek(offset as usize);
                let tag_count = reader.read_u16()?;

                let mut dir = Directory::default();
                let mut sub_ifds = vec![];
                for _ in 0..tag_count {
                    let tag = read_tag(&mut reader)?;
                    if points_to_sub_ifd(tag.id, tag.field_type())? {
                        if dir.branches.contains_key(&tag.id) {
                            return Err(FormatError::DuplicateBranch(tag.id).into());
                        }
                        let offsets = tag.value.to_u32_vec().unwrap_or_default();
                        dir.branches
                            .insert(tag.id, vec![Trunk::default(); offsets.len()]);
                        sub_ifds.push((tag.id, offsets));
                    }
                    dir.tags.push(tag);
                }
                offset = reader.read_u32()?;
                read_data(&reader, &mut dir)?;

                tiff.directories.push(dir);
                let id = tiff.directories.len() - 1;
                trunk.0.push(id);
                for (branch, offsets) in sub_ifds {
                    for (index, sub) in offsets.into_iter().enumerate() {
                        pending.push_back((sub, Slot::Branch { owner: id, branch, index }));
                    }
                }
            }

            debug!("parsed trunk of {} directories", trunk.0.len());
            match slot {
                Slot::Root => tiff.root = trunk,
                Slot::Branch {
                    owner,
                    branch,
                    index,
                } => {
                    if let Some(target) = tiff.directories[owner]
                        .branches
                        .get_mut(&branch)
                        .and_then(|trunks| trunks.get_mut(index))
                    {
                        *target = trunk;
                    }
                }
            }
        }

        Ok(tiff)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::error::MetadataError;

    #[test]
    #[rustfmt::skip]
    fn test_single_ascii_tag() {
        let data = [
            b'I', b'I', 42, 0, 8, 0, 0, 0,
            1, 0,
            0x0e, 0x01, 2, 0, 5, 0, 0, 0, 26, 0, 0, 0,
            0, 0, 0, 0,
            b't', b'e', b's', b't', 0, 0,
        ];
        let tiff = Tiff::from_bytes(&data).unwrap();
        assert_eq!(tiff.endianness(), Endianness::LittleEndian);
        let tags = tiff.tags("/ifd[0]").unwrap().unwrap();
        assert_eq!(tags, &[Tag::new(0x010e, Value::Ascii("test".into()))]);
    }

    #[test]
    #[rustfmt::skip]
    fn test_inline_and_rational_values() {
        let data = [
            b'M', b'M', 0, 42, 0, 0, 0, 8,
            0, 3,
            0x01, 0x12, 0, 3, 0, 0, 0, 1, 0, 6, 0, 0,
            0x01, 0x1a, 0, 5, 0, 0, 0, 2, 0, 0, 0, 50,
            0x02, 0x13, 0, 8, 0, 0, 0, 2, 0xff, 0xfe, 0, 3,
            0, 0, 0, 0,
            0, 0, 0, 72, 0, 0, 0, 1,
            0, 0, 1, 44, 0, 0, 0, 4,
        ];
        let tiff = Tiff::from_bytes(&data).unwrap();
        assert_eq!(tiff.endianness(), Endianness::BigEndian);
        let tags = tiff.tags("/ifd[0]").unwrap().unwrap();
        assert_eq!(tags[0].value, Value::Short(6));
        assert_eq!(tags[1].value, Value::Rational(vec![[72, 1], [300, 4]]));
        assert_eq!(tags[2].value, Value::SignedShortList(vec![-2, 3]));
    }

    #[test]
    #[rustfmt::skip]
    fn test_exif_branch_and_thumbnail() {
        let data = [
            b'I', b'I', 42, 0, 8, 0, 0, 0,
            // ifd[0] at 8: exif pointer to 26, next ifd at 44
            1, 0,
            0x69, 0x87, 4, 0, 1, 0, 0, 0, 26, 0, 0, 0,
            44, 0, 0, 0,
            // exif ifd at 26
            1, 0,
            0x00, 0x90, 7, 0, 4, 0, 0, 0, b'0', b'2', b'3', b'0',
            0, 0, 0, 0,
            // ifd[1] at 44: thumbnail of 3 bytes at 74
            2, 0,
            0x01, 0x02, 4, 0, 1, 0, 0, 0, 74, 0, 0, 0,
            0x02, 0x02, 4, 0, 1, 0, 0, 0, 3, 0, 0, 0,
            0, 0, 0, 0,
            0xff, 0xd8, 0xd9,
        ];
        let tiff = Tiff::from_bytes(&data).unwrap();
        let version = tiff.tag("/ifd[0]/exif[0]/ifd[0]", 0x9000).unwrap().unwrap();
        assert_eq!(version.value, Value::UndefinedList(b"0230".to_vec()));
        let thumbnail = tiff.data("/ifd[1]", DataName::JpegInterchangeFormat).unwrap().unwrap();
        assert_eq!(thumbnail, &[Bytes::from_static(&[0xff, 0xd8, 0xd9])]);
    }

    #[test]
    #[rustfmt::skip]
    fn test_format_errors() {
        let cases: [(&[u8], FormatError); 12] = [
            (&[b'X', b'X', 42, 0, 8, 0, 0, 0], FormatError::TiffSignatureInvalid),
            (&[b'I', b'I', 43, 0, 8, 0, 0, 0], FormatError::TiffMagicInvalid(43)),
            // type 14 does not exist
            (&[b'I', b'I', 42, 0, 8, 0, 0, 0, 1, 0, 1, 0, 14, 0, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
                FormatError::UnknownType(14)),
            // gps pointer stored as SHORT
            (&[b'I', b'I', 42, 0, 8, 0, 0, 0, 1, 0, 0x25, 0x88, 3, 0, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
                FormatError::InvalidSubIfdType(0x8825, Type::SHORT)),
            // strip offsets without byte counts
            (&[b'I', b'I', 42, 0, 8, 0, 0, 0, 1, 0, 0x11, 0x01, 4, 0, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
                FormatError::BrokenDataPair { position: 0x0111, length: 0x0117 }),
            // next pointer back to the first directory
            (&[b'I', b'I', 42, 0, 8, 0, 0, 0, 0, 0, 8, 0, 0, 0], FormatError::CycleInOffsets(8)),
            // exif and gps pointers sharing one directory at 38
            (&[b'I', b'I', 42, 0, 8, 0, 0, 0, 2, 0,
                0x69, 0x87, 4, 0, 1, 0, 0, 0, 38, 0, 0, 0,
                0x25, 0x88, 4, 0, 1, 0, 0, 0, 38, 0, 0, 0,
                0, 0, 0, 0,
                0, 0, 0, 0, 0, 0],
                FormatError::CycleInOffsets(38)),
            // ASCII with no room for its terminator
            (&[b'I', b'I', 42, 0, 8, 0, 0, 0, 1, 0, 0x0e, 0x01, 2, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
                FormatError::AsciiCountZero),
            // two exif pointers in one directory
            (&[b'I', b'I', 42, 0, 8, 0, 0, 0, 2, 0,
                0x69, 0x87, 4, 0, 1, 0, 0, 0, 0, 0, 0, 0,
                0x69, 0x87, 4, 0, 1, 0, 0, 0, 0, 0, 0, 0,
                0, 0, 0, 0],
                FormatError::DuplicateBranch(0x8769)),
            // strip offsets stored as SHORT
            (&[b'I', b'I', 42, 0, 8, 0, 0, 0, 2, 0,
                0x11, 0x01, 3, 0, 1, 0, 0, 0, 0, 0, 0, 0,
                0x17, 0x01, 4, 0, 1, 0, 0, 0, 0, 0, 0, 0,
                0, 0, 0, 0],
                FormatError::InvalidDataPairType(0x0111, Type::SHORT)),
            // strip byte counts stored as RATIONAL, payload read from offset 0
            (&[b'I', b'I', 42, 0, 8, 0, 0, 0, 2, 0,
                0x11, 0x01, 4, 0, 1, 0, 0, 0, 0, 0, 0, 0,
                0x17, 0x01, 5, 0, 1, 0, 0, 0, 0, 0, 0, 0,
                0, 0, 0, 0],
                FormatError::InvalidDataPairType(0x0117, Type::RATIONAL)),
            // two strip offsets but one byte count
            (&[b'I', b'I', 42, 0, 8, 0, 0, 0, 2, 0,
                0x11, 0x01, 4, 0, 2, 0, 0, 0, 0, 0, 0, 0,
                0x17, 0x01, 4, 0, 1, 0, 0, 0, 0, 0, 0, 0,
                0, 0, 0, 0],
                FormatError::InconsistentDataPair { positions: 2, lengths: 1 }),
        ];
        for (data, expected) in cases {
            match Tiff::from_bytes(data) {
                Err(MetadataError::Format(err)) => assert_eq!(err, expected),
                other => panic!("expected {expected:?}, got {other:?}"),
            }
        }
    }

    #[test]
    #[rustfmt::skip]
    fn test_truncated_payload() {
        let data = [
            b'I', b'I', 42, 0, 8, 0, 0, 0,
            1, 0,
            0x0e, 0x01, 2, 0, 0xff, 0xff, 0, 0, 26, 0, 0, 0,
            0, 0, 0, 0,
        ];
        assert!(matches!(
            Tiff::from_bytes(&data),
            Err(MetadataError::EndOfBuffer { .. })
        ));
    }
}
