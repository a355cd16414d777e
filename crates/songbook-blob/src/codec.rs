//! Gzip wrapping of blob payloads.

use std::borrow::Cow;
use std::io::{Read, Write};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};

use crate::error::BlobError;

/// The two leading bytes of every gzip member.
pub const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Whether `data` starts with the gzip magic.
pub fn is_gzip(data: &[u8]) -> bool {
    data.starts_with(&GZIP_MAGIC)
}

/// Compresses `data` into a single gzip member.
pub fn gzip(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}

/// Decompresses a gzip stream.
pub fn gunzip(data: &[u8]) -> Result<Vec<u8>, BlobError> {
    if !is_gzip(data) {
        return Err(BlobError::NotGzip);
    }
    let mut decoder = GzDecoder::new(data);
    let mut raw = Vec::new();
    decoder
        .read_to_end(&mut raw)
        .map_err(BlobError::Decompress)?;
    Ok(raw)
}

/// Compression state of a blob on disk, as declared by its descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Wrapping {
    Raw,
    Gzip,
}

impl Wrapping {
    /// Maps the descriptor's `areFilesGZipped` flag.
    pub fn from_flag(gzipped: bool) -> Self {
        if gzipped {
            Wrapping::Gzip
        } else {
            Wrapping::Raw
        }
    }

    /// Returns the raw payload of stored bytes.
    pub fn decode<'a>(&self, stored: &'a [u8]) -> Result<Cow<'a, [u8]>, BlobError> {
        match self {
            Wrapping::Raw => Ok(Cow::Borrowed(stored)),
            Wrapping::Gzip => gunzip(stored).map(Cow::Owned),
        }
    }

    /// Returns the bytes to store for a raw payload.
    pub fn encode<'a>(&self, raw: &'a [u8]) -> std::io::Result<Cow<'a, [u8]>> {
        match self {
            Wrapping::Raw => Ok(Cow::Borrowed(raw)),
            Wrapping::Gzip => gzip(raw).map(Cow::Owned),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gzip_output_has_magic() {
        let packed = gzip(b"payload").unwrap();
        assert!(is_gzip(&packed));
        assert_eq!(gunzip(&packed).unwrap(), b"payload");
    }

    #[test]
    fn test_gunzip_rejects_raw_data() {
        assert!(matches!(gunzip(b"plain"), Err(BlobError::NotGzip)));
    }

    #[test]
    fn test_gunzip_rejects_truncated_stream() {
        let packed = gzip(&[7u8; 1024]).unwrap();
        let truncated = &packed[..packed.len() / 2];
        assert!(matches!(gunzip(truncated), Err(BlobError::Decompress(_))));
    }

    #[test]
    fn test_raw_wrapping_borrows() {
        let data = [1u8, 2, 3];
        assert!(matches!(Wrapping::Raw.decode(&data).unwrap(), Cow::Borrowed(_)));
        assert_eq!(Wrapping::from_flag(true), Wrapping::Gzip);
    }
}
