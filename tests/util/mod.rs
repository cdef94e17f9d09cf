#![allow(dead_code)]

/// Assemble a JPEG file from `(marker, payload)` segments followed by a scan segment.
pub(crate) fn jpeg_file(segments: &[(u8, &[u8])], scan: &[u8]) -> Vec<u8> {
    let mut out = vec![0xff, 0xd8];
    for (marker, payload) in segments {
        out.extend_from_slice(&[0xff, *marker]);
        out.extend_from_slice(&((payload.len() + 2) as u16).to_be_bytes());
        out.extend_from_slice(payload);
    }
    out.extend_from_slice(&[0xff, 0xda]);
    out.extend_from_slice(scan);
    out
}

/// Prefix a TIFF stream with the EXIF segment signature.
pub(crate) fn exif_payload(tiff: &[u8]) -> Vec<u8> {
    [b"Exif\0\0".as_slice(), tiff].concat()
}

/// A little endian TIFF stream with one directory holding one ASCII tag.
pub(crate) fn single_ascii_tiff(id: u16, text: &str) -> Vec<u8> {
    let count = text.len() as u32 + 1;
    let mut out = b"II\x2a\x00\x08\x00\x00\x00".to_vec();
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&id.to_le_bytes());
    out.extend_from_slice(&2u16.to_le_bytes());
    out.extend_from_slice(&count.to_le_bytes());
    if count <= 4 {
        let mut slot = [0u8; 4];
        slot[..text.len()].copy_from_slice(text.as_bytes());
        out.extend_from_slice(&slot);
    } else {
        out.extend_from_slice(&26u32.to_le_bytes());
    }
    out.extend_from_slice(&0u32.to_le_bytes());
    if count > 4 {
        out.extend_from_slice(text.as_bytes());
        out.push(0);
        if count % 2 == 1 {
            out.push(0);
        }
    }
    out
}

/// A Photoshop thumbnail resource body: the 28-byte header followed by `data`.
pub(crate) fn thumbnail_resource(format: u32, width: u32, height: u32, data: &[u8]) -> Vec<u8> {
    let mut out = vec![];
    out.extend_from_slice(&format.to_be_bytes());
    out.extend_from_slice(&width.to_be_bytes());
    out.extend_from_slice(&height.to_be_bytes());
    out.extend_from_slice(&(width * 3).to_be_bytes());
    out.extend_from_slice(&(width * 3 * height).to_be_bytes());
    out.extend_from_slice(&(data.len() as u32).to_be_bytes());
    out.extend_from_slice(&24u16.to_be_bytes());
    out.extend_from_slice(&1u16.to_be_bytes());
    out.extend_from_slice(data);
    out
}
