//! In-place patching of the volume field.
//!
//! The volume is a big-endian IEEE-754 `f32` at byte offset `0x217` of the
//! raw (decompressed) blob. A patch touches only that 4-byte window and
//! stores the blob back in the compression state it was found in.

use std::path::Path;

use byteorder::{BigEndian, ByteOrder};
use serde::Serialize;

use crate::atomic::replace_file;
use crate::codec::{gunzip, gzip, is_gzip, Wrapping};
use crate::error::BlobError;

/// Byte offset of the volume field.
pub const VOLUME_OFFSET: usize = 0x217;

/// Width of the volume field in bytes.
pub const VOLUME_LEN: usize = 4;

/// Minimum raw blob length holding the whole volume window.
pub const MIN_BLOB_LEN: usize = VOLUME_OFFSET + VOLUME_LEN;

/// Result of a volume patch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PatchOutcome {
    /// The window already held the target; nothing was written.
    Unchanged { volume: f32 },
    /// The window was rewritten and verified.
    Patched { previous: f32, volume: f32 },
}

impl PatchOutcome {
    pub fn is_patched(&self) -> bool {
        matches!(self, PatchOutcome::Patched { .. })
    }
}

/// Result of a gzip maintenance operation on one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RewrapOutcome {
    /// The file was already in the requested state.
    AlreadyDone,
    /// The file was rewritten.
    Rewritten { before: usize, after: usize },
}

/// Reads the volume from a raw payload.
pub fn volume_at(raw: &[u8]) -> Result<f32, BlobError> {
    check_len(raw)?;
    Ok(BigEndian::read_f32(&raw[VOLUME_OFFSET..MIN_BLOB_LEN]))
}

/// Writes the volume into a raw payload, leaving every other byte intact.
pub fn set_volume_at(raw: &mut [u8], volume: f32) -> Result<(), BlobError> {
    check_len(raw)?;
    BigEndian::write_f32(&mut raw[VOLUME_OFFSET..MIN_BLOB_LEN], volume);
    Ok(())
}

/// Reads the volume stored in the blob at `path`.
pub fn read_volume(path: &Path, wrapping: Wrapping) -> Result<f32, BlobError> {
    let stored = read(path)?;
    let raw = wrapping.decode(&stored)?;
    volume_at(&raw)
}

/// Reports what [`patch_volume`] would do without writing anything.
pub fn preview_patch(path: &Path, wrapping: Wrapping, target: f32) -> Result<PatchOutcome, BlobError> {
    let current = read_volume(path, wrapping)?;
    Ok(outcome(current, target))
}

/// Writes `target` into the blob's volume window.
///
/// The stored blob is decoded in memory, patched, re-encoded with the same
/// wrapping and atomically replaced. The file is then read back and the
/// window compared with the target. A blob already holding the target bit
/// pattern is not written at all.
pub fn patch_volume(path: &Path, wrapping: Wrapping, target: f32) -> Result<PatchOutcome, BlobError> {
    let stored = read(path)?;
    let mut raw = wrapping.decode(&stored)?.into_owned();
    let current = volume_at(&raw)?;

    let result = outcome(current, target);
    if !result.is_patched() {
        return Ok(result);
    }

    set_volume_at(&mut raw, target)?;
    let encoded = wrapping.encode(&raw).map_err(|e| BlobError::io(path, e))?;
    replace_file(path, &encoded).map_err(|e| BlobError::io(path, e))?;

    let written = read_volume(path, wrapping)?;
    if written.to_bits() != target.to_bits() {
        return Err(BlobError::VerificationFailed {
            expected: target,
            found: written,
        });
    }

    Ok(result)
}

/// Decompresses a gzip-wrapped blob in place. Raw blobs are left alone.
pub fn unwrap_file(path: &Path) -> Result<RewrapOutcome, BlobError> {
    let stored = read(path)?;
    if !is_gzip(&stored) {
        return Ok(RewrapOutcome::AlreadyDone);
    }
    let raw = gunzip(&stored)?;
    replace_file(path, &raw).map_err(|e| BlobError::io(path, e))?;
    Ok(RewrapOutcome::Rewritten {
        before: stored.len(),
        after: raw.len(),
    })
}

/// Reports what [`unwrap_file`] would do without writing anything.
pub fn preview_unwrap(path: &Path) -> Result<RewrapOutcome, BlobError> {
    let stored = read(path)?;
    if !is_gzip(&stored) {
        return Ok(RewrapOutcome::AlreadyDone);
    }
    let raw = gunzip(&stored)?;
    Ok(RewrapOutcome::Rewritten {
        before: stored.len(),
        after: raw.len(),
    })
}

/// Compresses a raw blob in place. Gzip-wrapped blobs are left alone.
pub fn wrap_file(path: &Path) -> Result<RewrapOutcome, BlobError> {
    let stored = read(path)?;
    if is_gzip(&stored) {
        return Ok(RewrapOutcome::AlreadyDone);
    }
    let packed = gzip(&stored).map_err(|e| BlobError::io(path, e))?;
    replace_file(path, &packed).map_err(|e| BlobError::io(path, e))?;
    Ok(RewrapOutcome::Rewritten {
        before: stored.len(),
        after: packed.len(),
    })
}

fn outcome(current: f32, target: f32) -> PatchOutcome {
    if current.to_bits() == target.to_bits() {
        PatchOutcome::Unchanged { volume: current }
    } else {
        PatchOutcome::Patched {
            previous: current,
            volume: target,
        }
    }
}

fn check_len(raw: &[u8]) -> Result<(), BlobError> {
    if raw.len() < MIN_BLOB_LEN {
        return Err(BlobError::TooShort {
            len: raw.len(),
            required: MIN_BLOB_LEN,
        });
    }
    Ok(())
}

fn read(path: &Path) -> Result<Vec<u8>, BlobError> {
    std::fs::read(path).map_err(|e| BlobError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::time::SystemTime;

    /// A 600-byte blob with a recognizable pattern and zero volume.
    fn sample_blob() -> Vec<u8> {
        let mut data: Vec<u8> = (0..600u32).map(|i| (i * 7 % 251) as u8).collect();
        data[VOLUME_OFFSET..MIN_BLOB_LEN].copy_from_slice(&0.0f32.to_be_bytes());
        data
    }

    fn write_blob(dir: &Path, bytes: &[u8]) -> std::path::PathBuf {
        let path = dir.join("song_abc.bin");
        std::fs::write(&path, bytes).unwrap();
        path
    }

    fn modified(path: &Path) -> SystemTime {
        std::fs::metadata(path).unwrap().modified().unwrap()
    }

    #[test]
    fn test_raw_patch_touches_only_window() {
        let dir = tempfile::tempdir().unwrap();
        let original = sample_blob();
        let path = write_blob(dir.path(), &original);

        let result = patch_volume(&path, Wrapping::Raw, 1.25).unwrap();
        assert_eq!(
            result,
            PatchOutcome::Patched {
                previous: 0.0,
                volume: 1.25
            }
        );

        let patched = std::fs::read(&path).unwrap();
        assert_eq!(patched.len(), original.len());
        assert_eq!(&patched[..VOLUME_OFFSET], &original[..VOLUME_OFFSET]);
        assert_eq!(&patched[MIN_BLOB_LEN..], &original[MIN_BLOB_LEN..]);
        assert_eq!(&patched[VOLUME_OFFSET..MIN_BLOB_LEN], &1.25f32.to_be_bytes());
    }

    #[test]
    fn test_repeat_patch_is_unchanged_without_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_blob(dir.path(), &sample_blob());

        patch_volume(&path, Wrapping::Raw, 1.25).unwrap();
        let before = std::fs::read(&path).unwrap();
        let stamp = modified(&path);

        let result = patch_volume(&path, Wrapping::Raw, 1.25).unwrap();
        assert_eq!(result, PatchOutcome::Unchanged { volume: 1.25 });
        assert_eq!(std::fs::read(&path).unwrap(), before);
        assert_eq!(modified(&path), stamp);
    }

    #[test]
    fn test_gzip_patch_matches_raw_patch() {
        let raw_dir = tempfile::tempdir().unwrap();
        let raw_path = write_blob(raw_dir.path(), &sample_blob());
        patch_volume(&raw_path, Wrapping::Raw, 1.25).unwrap();

        let gz_dir = tempfile::tempdir().unwrap();
        let gz_path = write_blob(gz_dir.path(), &gzip(&sample_blob()).unwrap());
        let result = patch_volume(&gz_path, Wrapping::Gzip, 1.25).unwrap();
        assert!(result.is_patched());

        let stored = std::fs::read(&gz_path).unwrap();
        assert!(is_gzip(&stored));
        assert_eq!(gunzip(&stored).unwrap(), std::fs::read(&raw_path).unwrap());
        assert_eq!(read_volume(&gz_path, Wrapping::Gzip).unwrap(), 1.25);
    }

    #[test]
    fn test_short_blob_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_blob(dir.path(), &[0u8; MIN_BLOB_LEN - 1]);
        match patch_volume(&path, Wrapping::Raw, 1.0) {
            Err(BlobError::TooShort { len, required }) => {
                assert_eq!(len, MIN_BLOB_LEN - 1);
                assert_eq!(required, 0x21B);
            }
            other => panic!("expected TooShort, got {:?}", other),
        }
    }

    #[test]
    fn test_exact_minimum_length_is_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_blob(dir.path(), &[0u8; MIN_BLOB_LEN]);
        assert!(patch_volume(&path, Wrapping::Raw, 2.0).unwrap().is_patched());
        assert_eq!(std::fs::read(&path).unwrap().len(), MIN_BLOB_LEN);
    }

    #[test]
    fn test_gzip_flag_on_raw_data_fails_without_writing() {
        let dir = tempfile::tempdir().unwrap();
        let original = sample_blob();
        let path = write_blob(dir.path(), &original);
        assert!(matches!(
            patch_volume(&path, Wrapping::Gzip, 1.0),
            Err(BlobError::NotGzip)
        ));
        assert_eq!(std::fs::read(&path).unwrap(), original);
    }

    #[test]
    fn test_missing_blob() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_volume(&dir.path().join("song_none.bin"), Wrapping::Raw).unwrap_err();
        assert!(matches!(err, BlobError::Missing(_)));
    }

    #[test]
    fn test_preview_does_not_write() {
        let dir = tempfile::tempdir().unwrap();
        let original = sample_blob();
        let path = write_blob(dir.path(), &original);
        assert!(preview_patch(&path, Wrapping::Raw, 0.5).unwrap().is_patched());
        assert_eq!(std::fs::read(&path).unwrap(), original);
    }

    #[test]
    fn test_unwrap_and_wrap_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let original = sample_blob();
        let path = write_blob(dir.path(), &gzip(&original).unwrap());

        assert!(matches!(preview_unwrap(&path).unwrap(), RewrapOutcome::Rewritten { after: 600, .. }));
        assert!(is_gzip(&std::fs::read(&path).unwrap()));
        assert!(matches!(unwrap_file(&path).unwrap(), RewrapOutcome::Rewritten { after: 600, .. }));
        assert_eq!(std::fs::read(&path).unwrap(), original);
        assert_eq!(unwrap_file(&path).unwrap(), RewrapOutcome::AlreadyDone);

        assert!(matches!(wrap_file(&path).unwrap(), RewrapOutcome::Rewritten { before: 600, .. }));
        assert_eq!(gunzip(&std::fs::read(&path).unwrap()).unwrap(), original);
        assert_eq!(wrap_file(&path).unwrap(), RewrapOutcome::AlreadyDone);
    }
}
