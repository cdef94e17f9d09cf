//! Field types, tag values and the fixed name tables of the tag tree.

use std::fmt;
use std::str::FromStr;

use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::error::{FormatError, MetadataResult, PathError};

/// The field type of a tag, as stored in the 2-byte type slot of a directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[allow(clippy::upper_case_acronyms)]
#[repr(u16)]
pub enum Type {
    /// 8-bit unsigned integer.
    BYTE = 1,
    /// 8-bit byte that contains a 7-bit ASCII code; the last byte must be zero.
    ASCII = 2,
    /// 16-bit unsigned integer.
    SHORT = 3,
    /// 32-bit unsigned integer.
    LONG = 4,
    /// Fraction stored as two 32-bit unsigned integers.
    RATIONAL = 5,
    /// 8-bit signed integer.
    SBYTE = 6,
    /// 8-bit byte whose meaning depends on the field.
    UNDEFINED = 7,
    /// 16-bit signed integer.
    SSHORT = 8,
    /// 32-bit signed integer.
    SLONG = 9,
    /// Fraction stored as two 32-bit signed integers.
    SRATIONAL = 10,
    /// 32-bit IEEE floating point.
    FLOAT = 11,
    /// 64-bit IEEE floating point.
    DOUBLE = 12,
    /// 32-bit unsigned offset to a sub-directory.
    IFD = 13,
}

impl Type {
    /// Look up a type from its numeric code.
    pub fn from_u16(code: u16) -> Option<Self> {
        Self::try_from_primitive(code).ok()
    }

    /// The size in bytes of a single element of this type.
    pub fn size(&self) -> usize {
        match self {
            Type::BYTE | Type::SBYTE | Type::ASCII | Type::UNDEFINED => 1,
            Type::SHORT | Type::SSHORT => 2,
            Type::LONG | Type::SLONG | Type::FLOAT | Type::IFD => 4,
            Type::DOUBLE | Type::RATIONAL | Type::SRATIONAL => 8,
        }
    }
}

/// The data of a tag.
///
/// Each field type has a scalar variant, holding the single element of a `count == 1` tag, and a
/// `List` variant for any other count. Rationals are always a list of `[numerator, denominator]`
/// pairs and text is always a string. The count written to the file is derived from the data, so
/// a one-element list serializes exactly like the scalar and parses back as the scalar.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Byte(u8),
    ByteList(Vec<u8>),
    /// Text without its zero terminator. Characters are stored one byte each (Latin-1).
    Ascii(String),
    Short(u16),
    ShortList(Vec<u16>),
    Long(u32),
    LongList(Vec<u32>),
    Rational(Vec<[u32; 2]>),
    SignedByte(i8),
    SignedByteList(Vec<i8>),
    Undefined(u8),
    UndefinedList(Vec<u8>),
    SignedShort(i16),
    SignedShortList(Vec<i16>),
    SignedLong(i32),
    SignedLongList(Vec<i32>),
    SignedRational(Vec<[i32; 2]>),
    Float(f32),
    FloatList(Vec<f32>),
    Double(f64),
    DoubleList(Vec<f64>),
    Ifd(u32),
    IfdList(Vec<u32>),
}

impl Value {
    /// The field type this value is written as.
    pub fn field_type(&self) -> Type {
        match self {
            Value::Byte(_) | Value::ByteList(_) => Type::BYTE,
            Value::Ascii(_) => Type::ASCII,
            Value::Short(_) | Value::ShortList(_) => Type::SHORT,
            Value::Long(_) | Value::LongList(_) => Type::LONG,
            Value::Rational(_) => Type::RATIONAL,
            Value::SignedByte(_) | Value::SignedByteList(_) => Type::SBYTE,
            Value::Undefined(_) | Value::UndefinedList(_) => Type::UNDEFINED,
            Value::SignedShort(_) | Value::SignedShortList(_) => Type::SSHORT,
            Value::SignedLong(_) | Value::SignedLongList(_) => Type::SLONG,
            Value::SignedRational(_) => Type::SRATIONAL,
            Value::Float(_) | Value::FloatList(_) => Type::FLOAT,
            Value::Double(_) | Value::DoubleList(_) => Type::DOUBLE,
            Value::Ifd(_) | Value::IfdList(_) => Type::IFD,
        }
    }

    /// Whether this is one of the scalar variants.
    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            Value::Byte(_)
                | Value::Short(_)
                | Value::Long(_)
                | Value::SignedByte(_)
                | Value::Undefined(_)
                | Value::SignedShort(_)
                | Value::SignedLong(_)
                | Value::Float(_)
                | Value::Double(_)
                | Value::Ifd(_)
        )
    }

    /// The count field written for this value.
    ///
    /// Text counts its zero terminator.
    pub fn count(&self) -> usize {
        match self {
            Value::ByteList(v) | Value::UndefinedList(v) => v.len(),
            Value::Ascii(s) => s.chars().count() + 1,
            Value::ShortList(v) => v.len(),
            Value::LongList(v) | Value::IfdList(v) => v.len(),
            Value::Rational(v) => v.len(),
            Value::SignedByteList(v) => v.len(),
            Value::SignedShortList(v) => v.len(),
            Value::SignedLongList(v) => v.len(),
            Value::SignedRational(v) => v.len(),
            Value::FloatList(v) => v.len(),
            Value::DoubleList(v) => v.len(),
            // scalars
            _ => 1,
        }
    }

    /// The number of bytes the value occupies once encoded.
    pub fn byte_size(&self) -> usize {
        self.count() * self.field_type().size()
    }

    /// A `LONG` value holding `values`, as a scalar when there is exactly one.
    pub(crate) fn longs(values: Vec<u32>) -> Self {
        match values.as_slice() {
            [x] => Value::Long(*x),
            _ => Value::LongList(values),
        }
    }

    /// A zero-filled value of the given type with `count` elements.
    ///
    /// Used for offset placeholders that get filled in during serialization. Like a parsed
    /// value, a single element is a scalar.
    pub(crate) fn zeroed(field_type: Type, count: usize) -> Self {
        match (field_type, count) {
            (Type::IFD, 1) => Value::Ifd(0),
            (Type::IFD, _) => Value::IfdList(vec![0; count]),
            _ => Value::longs(vec![0; count]),
        }
    }

    /// Interpret the value as a list of unsigned offsets or lengths.
    ///
    /// Only the unsigned integer types qualify.
    pub fn to_u32_vec(&self) -> Option<Vec<u32>> {
        match self {
            Value::Byte(x) => Some(vec![u32::from(*x)]),
            Value::ByteList(v) => Some(v.iter().map(|x| u32::from(*x)).collect()),
            Value::Short(x) => Some(vec![u32::from(*x)]),
            Value::ShortList(v) => Some(v.iter().map(|x| u32::from(*x)).collect()),
            Value::Long(x) | Value::Ifd(x) => Some(vec![*x]),
            Value::LongList(v) | Value::IfdList(v) => Some(v.clone()),
            _ => None,
        }
    }

    /// The text of an ASCII value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Ascii(s) => Some(s),
            _ => None,
        }
    }

    /// The single element of a one-element unsigned integer value.
    pub fn as_u32(&self) -> Option<u32> {
        match self.to_u32_vec()?.as_slice() {
            [x] => Some(*x),
            _ => None,
        }
    }

    /// Encode text as one byte per character, rejecting characters outside Latin-1.
    pub(crate) fn ascii_bytes(s: &str) -> MetadataResult<Vec<u8>> {
        s.chars()
            .map(|c| u8::try_from(c).map_err(|_| FormatError::AsciiValueInvalid(c).into()))
            .collect()
    }
}

/// One entry of a directory.
#[derive(Debug, Clone, PartialEq)]
pub struct Tag {
    /// The tag id.
    pub id: u16,
    /// The tag data; its variant determines the field type.
    pub value: Value,
}

impl Tag {
    /// Create a new tag.
    pub fn new(id: u16, value: Value) -> Self {
        Self { id, value }
    }

    /// The field type of this tag.
    pub fn field_type(&self) -> Type {
        self.value.field_type()
    }
}

pub(crate) const EXIF_IFD: u16 = 0x8769;
pub(crate) const GPS_IFD: u16 = 0x8825;
pub(crate) const INTEROPERABILITY_IFD: u16 = 0xA005;
pub(crate) const SUB_IFDS: u16 = 0x014A;

pub(crate) const JPEG_INTERCHANGE_FORMAT: u16 = 0x0201;
pub(crate) const JPEG_INTERCHANGE_FORMAT_LENGTH: u16 = 0x0202;
pub(crate) const STRIP_OFFSETS: u16 = 0x0111;
pub(crate) const STRIP_BYTE_COUNTS: u16 = 0x0117;
pub(crate) const TILE_OFFSETS: u16 = 0x0144;
pub(crate) const TILE_BYTE_COUNTS: u16 = 0x0145;

/// Tags that point to nested directories, addressable by name in paths.
pub const KNOWN_BRANCHES: [(&str, u16); 4] = [
    ("exif", EXIF_IFD),
    ("gps", GPS_IFD),
    ("interoperability", INTEROPERABILITY_IFD),
    ("subifds", SUB_IFDS),
];

/// The id of a named branch.
pub fn branch_id(name: &str) -> Option<u16> {
    KNOWN_BRANCHES
        .iter()
        .find(|(known, _)| *known == name)
        .map(|(_, id)| *id)
}

/// The path name of a branch: its known name, or its decimal id.
pub fn branch_name(id: u16) -> String {
    KNOWN_BRANCHES
        .iter()
        .find(|(_, known)| *known == id)
        .map_or_else(|| id.to_string(), |(name, _)| name.to_string())
}

pub(crate) fn is_known_branch(id: u16) -> bool {
    KNOWN_BRANCHES.iter().any(|(_, known)| *known == id)
}

/// Whether a tag points to one or more sub-directories.
///
/// A known pointer id with a type other than `LONG` or `IFD` is an error.
pub(crate) fn points_to_sub_ifd(id: u16, field_type: Type) -> MetadataResult<bool> {
    if field_type == Type::IFD {
        return Ok(true);
    }
    if is_known_branch(id) {
        if field_type != Type::LONG {
            return Err(FormatError::InvalidSubIfdType(id, field_type).into());
        }
        return Ok(true);
    }
    Ok(false)
}

/// The payloads addressed by a (position, length) tag pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DataName {
    /// Embedded compressed thumbnail (`JPEGInterchangeFormat`).
    JpegInterchangeFormat,
    /// Strip data (`StripOffsets` / `StripByteCounts`).
    Strips,
    /// Tile data (`TileOffsets` / `TileByteCounts`).
    Tiles,
}

impl DataName {
    /// All data names, in a fixed order.
    pub const ALL: [DataName; 3] = [
        DataName::JpegInterchangeFormat,
        DataName::Strips,
        DataName::Tiles,
    ];

    /// The name used to address this payload.
    pub fn as_str(&self) -> &'static str {
        match self {
            DataName::JpegInterchangeFormat => "jpeginterchangeformat",
            DataName::Strips => "strips",
            DataName::Tiles => "tiles",
        }
    }

    /// The id of the tag holding the payload offsets.
    pub fn position_id(&self) -> u16 {
        match self {
            DataName::JpegInterchangeFormat => JPEG_INTERCHANGE_FORMAT,
            DataName::Strips => STRIP_OFFSETS,
            DataName::Tiles => TILE_OFFSETS,
        }
    }

    /// The id of the tag holding the payload lengths.
    pub fn length_id(&self) -> u16 {
        match self {
            DataName::JpegInterchangeFormat => JPEG_INTERCHANGE_FORMAT_LENGTH,
            DataName::Strips => STRIP_BYTE_COUNTS,
            DataName::Tiles => TILE_BYTE_COUNTS,
        }
    }

    /// The pair a tag id belongs to, if any.
    pub(crate) fn from_tag_id(id: u16) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|name| name.position_id() == id || name.length_id() == id)
    }
}

impl fmt::Display for DataName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataName {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|name| name.as_str() == lower)
            .ok_or_else(|| PathError::UnknownDataName(s.to_string()))
    }
}
