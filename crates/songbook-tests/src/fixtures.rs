//! Test fixture utilities for creating synthetic song libraries.

use std::fs;
use std::path::{Path, PathBuf};

use songbook_blob::{gzip, MIN_BLOB_LEN, VOLUME_OFFSET};
use songbook_cli::loaders::CsvSheet;
use songbook_cli::manifest::Manifest;
use songbook_cli::CatalogConfig;
use tempfile::TempDir;

/// Length of the synthetic song blobs.
pub const BLOB_LEN: usize = 600;

/// A raw song blob with a recognizable byte pattern and the given volume.
pub fn blob_bytes(volume: f32) -> Vec<u8> {
    let mut data: Vec<u8> = (0..BLOB_LEN as u32).map(|i| (i * 13 % 251) as u8).collect();
    data[VOLUME_OFFSET..MIN_BLOB_LEN].copy_from_slice(&volume.to_be_bytes());
    data
}

/// A test fixture representing a song library with its table copies.
///
/// Layout:
///
/// ```text
/// <root>/songs/<id>/data.json
/// <root>/songs/<id>/song_<id>.bin
/// <root>/songs/conversion.json
/// <root>/metadata.csv
/// <root>/sheet.csv
/// ```
pub struct LibraryFixture {
    pub root: TempDir,
    pub songs_dir: PathBuf,
}

impl LibraryFixture {
    /// Create a new empty library.
    pub fn new() -> Self {
        let root = TempDir::new().expect("Failed to create temp dir");
        let songs_dir = root.path().join("songs");
        fs::create_dir_all(&songs_dir).expect("Failed to create songs dir");
        Self { root, songs_dir }
    }

    /// Get the library root path.
    pub fn path(&self) -> &Path {
        self.root.path()
    }

    /// Directory of one song.
    pub fn song_dir(&self, id: &str) -> PathBuf {
        self.songs_dir.join(id)
    }

    pub fn table_path(&self) -> PathBuf {
        self.path().join("metadata.csv")
    }

    pub fn sheet_path(&self) -> PathBuf {
        self.path().join("sheet.csv")
    }

    /// Configuration pointing at this library's songs and tabular export.
    pub fn config(&self) -> CatalogConfig {
        let mut config = CatalogConfig::new(&self.songs_dir);
        config.tabular_path = self.table_path();
        config
    }

    /// The spreadsheet snapshot of this library.
    pub fn sheet(&self) -> CsvSheet {
        CsvSheet::new(self.sheet_path())
    }

    /// Add a song directory with a descriptor.
    ///
    /// # Arguments
    /// * `id` - Directory name
    /// * `descriptor` - Raw descriptor file content
    pub fn add_song(&self, id: &str, descriptor: &str) -> PathBuf {
        let dir = self.song_dir(id);
        fs::create_dir_all(&dir).expect("Failed to create song dir");
        fs::write(dir.join("data.json"), descriptor).expect("Failed to write descriptor");
        dir
    }

    /// Add the primary blob of a song.
    pub fn add_blob(&self, id: &str, volume: f32, gzipped: bool) -> PathBuf {
        let raw = blob_bytes(volume);
        let bytes = if gzipped {
            gzip(&raw).expect("Failed to gzip blob")
        } else {
            raw
        };
        self.add_file(id, &format!("song_{}.bin", id), &bytes)
    }

    /// Add an arbitrary file to a song directory.
    pub fn add_file(&self, id: &str, name: &str, bytes: &[u8]) -> PathBuf {
        let dir = self.song_dir(id);
        fs::create_dir_all(&dir).expect("Failed to create song dir");
        let path = dir.join(name);
        fs::write(&path, bytes).expect("Failed to write file");
        path
    }

    /// Add the converter's manifest next to the song directories.
    pub fn add_manifest(&self, dir_name: &str) -> PathBuf {
        let path = self.songs_dir.join("conversion.json");
        Manifest::for_dir(&path, dir_name)
            .write()
            .expect("Failed to write manifest");
        path
    }

    /// Write the tabular export.
    pub fn write_table(&self, content: &str) -> PathBuf {
        let path = self.table_path();
        fs::write(&path, content).expect("Failed to write table");
        path
    }

    /// Write the spreadsheet snapshot.
    pub fn write_sheet(&self, content: &str) -> PathBuf {
        let path = self.sheet_path();
        fs::write(&path, content).expect("Failed to write sheet");
        path
    }

    /// Read a song's descriptor as JSON, skipping the BOM.
    pub fn descriptor(&self, id: &str) -> serde_json::Value {
        let text = fs::read_to_string(self.song_dir(id).join("data.json"))
            .expect("Failed to read descriptor");
        serde_json::from_str(text.trim_start_matches('\u{feff}')).expect("Invalid descriptor JSON")
    }
}

impl Default for LibraryFixture {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_layout() {
        let library = LibraryFixture::new();
        let dir = library.add_song("abc", r#"{"id":"abc"}"#);
        let blob = library.add_blob("abc", 1.0, false);

        assert_eq!(dir, library.songs_dir.join("abc"));
        assert_eq!(blob, dir.join("song_abc.bin"));
        assert_eq!(fs::read(&blob).unwrap().len(), BLOB_LEN);
        assert_eq!(library.descriptor("abc")["id"], "abc");
    }
}
