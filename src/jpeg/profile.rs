//! Payloads split across several segments, each numbered `seq/total` after a signature.

use bytes::{Bytes, BytesMut};

use crate::error::{FormatError, MetadataError, MetadataResult};

/// Split `payload` into signed chunks of at most `max_chunk` payload bytes each.
///
/// Every chunk is `signature`, a 1-based sequence number, the chunk count, then its slice of the
/// payload. An empty payload produces no chunks. More than 255 chunks cannot be numbered and is
/// an error.
pub fn split_chunks(signature: &[u8], payload: &[u8], max_chunk: usize) -> MetadataResult<Vec<Bytes>> {
    if max_chunk == 0 {
        return Err(MetadataError::General("chunk size must be positive".to_string()));
    }
    let count = payload.len().div_ceil(max_chunk);
    let total = u8::try_from(count).map_err(|_| FormatError::ProfileTooLarge(count))?;

    payload
        .chunks(max_chunk)
        .enumerate()
        .map(|(i, slice)| -> MetadataResult<Bytes> {
            let mut chunk = BytesMut::with_capacity(signature.len() + 2 + slice.len());
            chunk.extend_from_slice(signature);
            chunk.extend_from_slice(&[u8::try_from(i + 1)?, total]);
            chunk.extend_from_slice(slice);
            Ok(chunk.freeze())
        })
        .collect()
}

/// Reassemble chunks produced by [`split_chunks`], in any order.
///
/// The chunks are sorted by sequence number, which must run from 1 to the chunk count, and every
/// chunk must declare that count.
pub fn merge_chunks<C: AsRef<[u8]>>(signature: &[u8], chunks: &[C]) -> MetadataResult<Bytes> {
    let header = signature.len() + 2;
    let mut parts = chunks
        .iter()
        .map(|chunk| {
            let chunk = chunk.as_ref();
            match chunk.get(signature.len()..header) {
                Some(&[seq, total]) => Ok((seq, total, &chunk[header..])),
                _ => Err(FormatError::ProfileChunkTruncated(chunk.len())),
            }
        })
        .collect::<Result<Vec<_>, _>>()?;
    parts.sort_by_key(|(seq, _, _)| *seq);

    let mut out = BytesMut::with_capacity(parts.iter().map(|(_, _, data)| data.len()).sum());
    for (i, (seq, total, data)) in parts.iter().enumerate() {
        if usize::from(*total) != parts.len() {
            return Err(FormatError::ProfileCountInvalid {
                expected: parts.len(),
                found: *total,
            }
            .into());
        }
        let expected = u8::try_from(i + 1)?;
        if *seq != expected {
            return Err(FormatError::ProfileSequenceInvalid {
                expected,
                found: *seq,
            }
            .into());
        }
        out.extend_from_slice(data);
    }
    Ok(out.freeze())
}
