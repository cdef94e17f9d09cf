//! JPEG marker segments and the metadata payloads carried in them.
//!
//! Only the segment framing is decoded. The scan segment and everything after it is kept as one
//! opaque payload, so image data passes through untouched.

use bytes::{Bytes, BytesMut};
use log::{debug, trace};

use crate::cursor::{ByteReader, ByteWriter, Endianness};
use crate::error::{FormatError, MetadataResult};
use crate::photoshop::{PhotoshopResources, ThumbnailFormat};
use crate::tiff::{DataName, Tiff};

pub mod markers;
pub mod profile;

use markers::*;

/// One marker segment. The payload excludes the marker and the length field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// Marker byte, without the `0xFF` prefix.
    pub marker: u8,
    /// Segment payload.
    pub data: Bytes,
}

impl Segment {
    /// Create a new segment.
    pub fn new(marker: u8, data: impl Into<Bytes>) -> Self {
        Self {
            marker,
            data: data.into(),
        }
    }

    /// Build a segment whose payload starts with `signature`.
    fn signed(marker: u8, signature: &[u8], payload: &[u8]) -> MetadataResult<Self> {
        let size = signature.len() + payload.len();
        if size > MAX_SEGMENT_PAYLOAD {
            return Err(FormatError::SegmentTooLarge(size).into());
        }
        let mut data = BytesMut::with_capacity(size);
        data.extend_from_slice(signature);
        data.extend_from_slice(payload);
        Ok(Self::new(marker, data.freeze()))
    }

    fn matches(&self, marker: u8, signature: &[u8]) -> bool {
        self.marker == marker && self.data.starts_with(signature)
    }
}

/// The segments of a JPEG file, in file order, ending with the scan segment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JpegSegments {
    segments: Vec<Segment>,
}

impl JpegSegments {
    /// Split a JPEG file into its segments.
    pub fn parse(data: &[u8]) -> MetadataResult<Self> {
        let mut reader = ByteReader::new(data, Endianness::BigEndian);
        if reader.read_u8()? != MARKER_PREFIX || reader.read_u8()? != SOI {
            return Err(FormatError::JpegSignatureInvalid.into());
        }

        let mut segments = vec![];
        loop {
            let prefix = reader.read_u8()?;
            if prefix != MARKER_PREFIX {
                return Err(FormatError::MarkerExpected(prefix).into());
            }
            let marker = reader.read_u8()?;
            if marker == SOS {
                segments.push(Segment::new(marker, reader.read_remaining()?));
                break;
            }
            let length = reader.read_u16()?;
            let size = length
                .checked_sub(2)
                .ok_or(FormatError::SegmentLengthInvalid(length))?;
            trace!("segment 0x{marker:02X} of {size} bytes");
            segments.push(Segment::new(marker, reader.read(size.into())?));
        }
        debug!("parsed {} segments", segments.len());
        Ok(Self { segments })
    }

    /// Serialize the segments, prefixed by the start-of-image marker.
    pub fn to_bytes(&self) -> MetadataResult<Vec<u8>> {
        let size = 2 + self
            .segments
            .iter()
            .map(|segment| match segment.marker {
                SOS => 2 + segment.data.len(),
                _ => 4 + segment.data.len(),
            })
            .sum::<usize>();

        let mut writer = ByteWriter::new(size, Endianness::BigEndian);
        writer.write_u8(MARKER_PREFIX)?;
        writer.write_u8(SOI)?;
        for segment in &self.segments {
            writer.write_u8(MARKER_PREFIX)?;
            writer.write_u8(segment.marker)?;
            if segment.marker != SOS {
                let length = u16::try_from(segment.data.len() + 2)
                    .map_err(|_| FormatError::SegmentTooLarge(segment.data.len()))?;
                writer.write_u16(length)?;
            }
            writer.write(&segment.data)?;
        }
        Ok(writer.into_inner())
    }

    /// All segments, in file order.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Segments with the given marker whose payload starts with `signature`.
    ///
    /// An empty signature matches every segment with the marker.
    pub fn find_segments<'a>(
        &'a self,
        marker: u8,
        signature: &'a [u8],
    ) -> impl Iterator<Item = &'a Segment> + 'a {
        self.segments
            .iter()
            .filter(move |segment| segment.matches(marker, signature))
    }

    /// Remove every segment matching `marker` and `signature`, returning how many were removed.
    pub fn remove_segments(&mut self, marker: u8, signature: &[u8]) -> usize {
        let before = self.segments.len();
        self.segments
            .retain(|segment| !segment.matches(marker, signature));
        before - self.segments.len()
    }

    /// Insert a segment at `index`.
    ///
    /// The index is clamped so the segment never lands after the scan segment.
    pub fn insert_segment(&mut self, index: usize, segment: Segment) {
        let scan = self
            .segments
            .iter()
            .position(|segment| segment.marker == SOS)
            .unwrap_or(self.segments.len());
        self.segments.insert(index.min(scan), segment);
    }

    /// The payload, after `signature`, of the only segment matching `marker` and `signature`.
    ///
    /// Several matching segments are an error.
    pub fn segment_data_single(&self, marker: u8, signature: &[u8]) -> MetadataResult<Option<Bytes>> {
        let mut found = self.find_segments(marker, signature);
        match (found.next(), found.next()) {
            (None, _) => Ok(None),
            (Some(segment), None) => Ok(Some(segment.data.slice(signature.len()..))),
            (Some(_), Some(_)) => Err(FormatError::MultipleSegments(marker).into()),
        }
    }

    /// Index just after the last APP0 or APP1 segment, or 0 if there is none.
    fn after_app_segments(&self) -> usize {
        self.segments
            .iter()
            .rposition(|segment| segment.marker == APP0 || segment.marker == APP1)
            .map_or(0, |index| index + 1)
    }

    /// The raw TIFF stream of the EXIF segment.
    pub fn exif(&self) -> MetadataResult<Option<Bytes>> {
        self.segment_data_single(APP1, EXIF_SIGNATURE)
    }

    /// Replace the EXIF segment, or remove it with `None`.
    ///
    /// The new segment becomes the first one. EXIF and JFIF headers cannot coexist at the start
    /// of the file, so any JFIF and JFXX segments are removed as well.
    pub fn set_exif(&mut self, tiff: Option<&[u8]>) -> MetadataResult<()> {
        let Some(tiff) = tiff else {
            self.remove_segments(APP1, EXIF_SIGNATURE);
            return Ok(());
        };
        let segment = Segment::signed(APP1, EXIF_SIGNATURE, tiff)?;
        self.remove_segments(APP1, EXIF_SIGNATURE);
        self.remove_segments(APP0, JFIF_SIGNATURE);
        self.remove_segments(APP0, JFXX_SIGNATURE);
        self.insert_segment(0, segment);
        Ok(())
    }

    /// The EXIF segment, parsed as a tag tree.
    pub fn exif_tree(&self) -> MetadataResult<Option<Tiff>> {
        self.exif()?.map(|data| Tiff::from_bytes(&data)).transpose()
    }

    /// Serialize a tag tree into the EXIF segment, or remove the segment with `None`.
    pub fn set_exif_tree(&mut self, tiff: Option<&Tiff>) -> MetadataResult<()> {
        match tiff {
            Some(tiff) => self.set_exif(Some(tiff.to_bytes()?.as_slice())),
            None => self.set_exif(None),
        }
    }

    /// The Photoshop resource payload.
    pub fn photoshop(&self) -> MetadataResult<Option<Bytes>> {
        self.segment_data_single(APP13, PHOTOSHOP_SIGNATURE)
    }

    /// Replace the Photoshop segment, or remove it with `None`.
    ///
    /// The new segment is placed right after the last APP0 or APP1 segment.
    pub fn set_photoshop(&mut self, resources: Option<&[u8]>) -> MetadataResult<()> {
        let Some(resources) = resources else {
            self.remove_segments(APP13, PHOTOSHOP_SIGNATURE);
            return Ok(());
        };
        let segment = Segment::signed(APP13, PHOTOSHOP_SIGNATURE, resources)?;
        self.remove_segments(APP13, PHOTOSHOP_SIGNATURE);
        self.insert_segment(self.after_app_segments(), segment);
        Ok(())
    }

    /// The Photoshop segment, parsed into resource blocks.
    pub fn photoshop_resources(&self) -> MetadataResult<Option<PhotoshopResources>> {
        self.photoshop()?
            .map(|data| PhotoshopResources::parse(&data))
            .transpose()
    }

    /// The embedded ICC profile, reassembled from all of its segments.
    pub fn icc_profile(&self) -> MetadataResult<Option<Bytes>> {
        let chunks = self
            .find_segments(APP2, ICC_PROFILE_SIGNATURE)
            .map(|segment| segment.data.clone())
            .collect::<Vec<_>>();
        if chunks.is_empty() {
            return Ok(None);
        }
        profile::merge_chunks(ICC_PROFILE_SIGNATURE, &chunks).map(Some)
    }

    /// Replace the ICC profile, or remove it with `None`.
    ///
    /// The profile is split over as many segments as needed, placed as one run right after the
    /// last APP0 or APP1 segment.
    pub fn set_icc_profile(&mut self, icc: Option<&[u8]>) -> MetadataResult<()> {
        let chunks = match icc {
            Some(icc) => profile::split_chunks(ICC_PROFILE_SIGNATURE, icc, ICC_MAX_CHUNK)?,
            None => vec![],
        };
        self.remove_segments(APP2, ICC_PROFILE_SIGNATURE);
        let index = self.after_app_segments();
        for (i, chunk) in chunks.into_iter().enumerate() {
            self.insert_segment(index + i, Segment::new(APP2, chunk));
        }
        Ok(())
    }

    /// The embedded JPEG thumbnail.
    ///
    /// A JPEG thumbnail resource in the Photoshop segment wins. Raw thumbnail resources and
    /// resources that do not decode are skipped. Otherwise the thumbnail stored in the second
    /// EXIF directory is used, provided it is a single chunk.
    pub fn thumbnail(&self) -> MetadataResult<Option<Bytes>> {
        if let Some(resources) = self.photoshop_resources()? {
            match resources.thumbnail() {
                Ok(Some(thumbnail)) if thumbnail.format == ThumbnailFormat::Jpeg => {
                    return Ok(Some(thumbnail.data));
                }
                Ok(_) => {}
                Err(err) => debug!("skipping thumbnail resource: {err}"),
            }
        }
        let Some(tiff) = self.exif_tree()? else {
            return Ok(None);
        };
        Ok(match tiff.data("/ifd[1]", DataName::JpegInterchangeFormat)? {
            Some([chunk]) => Some(chunk.clone()),
            _ => None,
        })
    }
}
