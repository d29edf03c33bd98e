//! Binary container reader: splits a .glb byte sequence into its JSON
//! document and optional binary blob.

use byteorder::{ByteOrder, LittleEndian};

use super::format::*;
use crate::util::{Error, Result};

/// The two payloads of a binary container.
///
/// `bin`, when present, is the implicit data source for buffer 0.
#[derive(Debug)]
pub struct Chunks {
    pub json: String,
    pub bin: Option<Vec<u8>>,
}

/// Split a binary container into its JSON text and binary blob.
///
/// Fails with [`Error::MalformedContainer`] on magic/version mismatch,
/// chunk overrun of the declared total length, a missing or non-leading
/// JSON chunk, or more than one binary chunk. Unknown chunk types are
/// skipped. The duplicate-binary-chunk check happens here, before any
/// JSON parsing takes place.
pub fn split(bytes: &[u8]) -> Result<Chunks> {
    if bytes.len() < HEADER_SIZE {
        return Err(Error::MalformedContainer(format!(
            "file too short for header: {} bytes",
            bytes.len()
        )));
    }
    if bytes[..4] != GLB_MAGIC {
        return Err(Error::MalformedContainer("bad magic".into()));
    }

    let version = LittleEndian::read_u32(&bytes[4..8]);
    if version != GLB_VERSION {
        return Err(Error::MalformedContainer(format!(
            "unsupported container version {version}"
        )));
    }

    let total = LittleEndian::read_u32(&bytes[8..12]) as usize;
    if total > bytes.len() {
        return Err(Error::MalformedContainer(format!(
            "declared length {total} exceeds available {} bytes",
            bytes.len()
        )));
    }
    // Everything past the declared total length is ignored.
    let bytes = &bytes[..total];

    let mut json: Option<&[u8]> = None;
    let mut bin: Option<&[u8]> = None;
    let mut offset = HEADER_SIZE;

    while offset < bytes.len() {
        if offset + CHUNK_HEADER_SIZE > bytes.len() {
            return Err(Error::MalformedContainer(format!(
                "truncated chunk header at offset {offset}"
            )));
        }
        let length = LittleEndian::read_u32(&bytes[offset..]) as usize;
        let kind = LittleEndian::read_u32(&bytes[offset + 4..]);
        offset += CHUNK_HEADER_SIZE;

        let end = offset
            .checked_add(length)
            .ok_or_else(|| Error::MalformedContainer("chunk length overflow".into()))?;
        if end > bytes.len() {
            return Err(Error::MalformedContainer(format!(
                "chunk of {length} bytes at offset {offset} overruns total length {}",
                bytes.len()
            )));
        }
        let payload = &bytes[offset..end];

        match kind {
            CHUNK_JSON => {
                if json.is_some() {
                    return Err(Error::MalformedContainer("more than one JSON chunk".into()));
                }
                if bin.is_some() {
                    return Err(Error::MalformedContainer(
                        "JSON chunk after binary chunk".into(),
                    ));
                }
                json = Some(payload);
            }
            CHUNK_BIN => {
                if json.is_none() {
                    return Err(Error::MalformedContainer(
                        "binary chunk before JSON chunk".into(),
                    ));
                }
                if bin.is_some() {
                    return Err(Error::MalformedContainer(
                        "more than one binary chunk".into(),
                    ));
                }
                bin = Some(payload);
            }
            // Unknown chunk types are tolerated and skipped.
            _ => {}
        }

        offset += align_up(length);
    }

    let json = json.ok_or_else(|| Error::MalformedContainer("no JSON chunk".into()))?;
    // JSON chunks are padded with trailing spaces, but some writers pad
    // with NULs, which the JSON parser would reject.
    let json = std::str::from_utf8(json)?.trim_end_matches('\0').to_string();
    if json.trim().is_empty() {
        return Err(Error::MalformedContainer("empty JSON chunk".into()));
    }

    Ok(Chunks {
        json,
        bin: bin.map(|b| b.to_vec()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::ErrorKind;

    /// Assemble a .glb from raw chunks, handling padding and lengths.
    fn build_glb(chunks: &[(u32, &[u8])]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&GLB_MAGIC);
        out.extend_from_slice(&GLB_VERSION.to_le_bytes());
        out.extend_from_slice(&[0u8; 4]); // total length, patched below
        for &(kind, payload) in chunks {
            let padded = align_up(payload.len());
            out.extend_from_slice(&(padded as u32).to_le_bytes());
            out.extend_from_slice(&kind.to_le_bytes());
            out.extend_from_slice(payload);
            let pad = if kind == CHUNK_JSON { b' ' } else { 0u8 };
            out.resize(out.len() + (padded - payload.len()), pad);
        }
        let total = out.len() as u32;
        out[8..12].copy_from_slice(&total.to_le_bytes());
        out
    }

    #[test]
    fn test_json_only() {
        let glb = build_glb(&[(CHUNK_JSON, b"{\"asset\":{\"version\":\"2.0\"}}")]);
        let chunks = split(&glb).unwrap();
        assert!(chunks.json.contains("asset"));
        assert!(chunks.bin.is_none());
    }

    #[test]
    fn test_json_and_bin() {
        let glb = build_glb(&[
            (CHUNK_JSON, b"{\"asset\":{\"version\":\"2.0\"}}"),
            (CHUNK_BIN, &[1, 2, 3, 4]),
        ]);
        let chunks = split(&glb).unwrap();
        assert_eq!(chunks.bin.unwrap(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_bad_magic() {
        let mut glb = build_glb(&[(CHUNK_JSON, b"{}")]);
        glb[0] = b'x';
        let err = split(&glb).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedContainer);
    }

    #[test]
    fn test_bad_version() {
        let mut glb = build_glb(&[(CHUNK_JSON, b"{}")]);
        glb[4] = 1;
        assert!(matches!(split(&glb), Err(Error::MalformedContainer(_))));
    }

    #[test]
    fn test_two_bin_chunks() {
        let glb = build_glb(&[
            (CHUNK_JSON, b"{\"asset\":{\"version\":\"2.0\"}}"),
            (CHUNK_BIN, &[1, 2, 3, 4]),
            (CHUNK_BIN, &[5, 6, 7, 8]),
        ]);
        let err = split(&glb).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedContainer);
        assert!(err.to_string().contains("more than one binary chunk"));
    }

    #[test]
    fn test_chunk_overrun() {
        let mut glb = build_glb(&[(CHUNK_JSON, b"{\"asset\":{\"version\":\"2.0\"}}")]);
        // Inflate the chunk length past the declared total
        let huge = 0xFFFFu32;
        glb[HEADER_SIZE..HEADER_SIZE + 4].copy_from_slice(&huge.to_le_bytes());
        assert!(matches!(split(&glb), Err(Error::MalformedContainer(_))));
    }

    #[test]
    fn test_missing_json_chunk() {
        let glb = build_glb(&[]);
        let err = split(&glb).unwrap_err();
        assert!(err.to_string().contains("no JSON chunk"));
    }

    #[test]
    fn test_unknown_chunk_skipped() {
        let glb = build_glb(&[
            (CHUNK_JSON, b"{\"asset\":{\"version\":\"2.0\"}}"),
            (u32::from_le_bytes(*b"XTRA"), &[9, 9]),
            (CHUNK_BIN, &[1, 2]),
        ]);
        let chunks = split(&glb).unwrap();
        assert_eq!(chunks.bin.unwrap(), vec![1, 2, 0, 0]);
    }
}
