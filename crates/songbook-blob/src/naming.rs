//! Blob file naming conventions.
//!
//! The primary blob of a song is `song_{id}.bin`. Per-difficulty companions
//! are `{id}_{suffix}.bin` and `{id}_{suffix}_{n}.bin`.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use songbook_schema::Difficulty;

const SONG_BLOB_PATTERN: &str = r"^song_(.+)\.bin$";
const CHART_BLOB_PATTERN: &str = r"^(.+)_([ehmnx])(?:_(\d+))?\.bin$";

static SONG_BLOB_REGEX: OnceLock<Regex> = OnceLock::new();
static CHART_BLOB_REGEX: OnceLock<Regex> = OnceLock::new();

fn song_blob_regex() -> &'static Regex {
    SONG_BLOB_REGEX.get_or_init(|| Regex::new(SONG_BLOB_PATTERN).expect("invalid regex pattern"))
}

fn chart_blob_regex() -> &'static Regex {
    CHART_BLOB_REGEX.get_or_init(|| Regex::new(CHART_BLOB_PATTERN).expect("invalid regex pattern"))
}

/// File name of a song's primary blob.
pub fn song_blob_name(id: &str) -> String {
    format!("song_{}.bin", id)
}

/// Path of a song's primary blob inside its directory.
pub fn song_blob_path(dir: &Path, id: &str) -> PathBuf {
    dir.join(song_blob_name(id))
}

/// Extracts the song id from a primary blob file name.
pub fn parse_song_blob(file_name: &str) -> Option<&str> {
    song_blob_regex()
        .captures(file_name)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// A parsed per-difficulty blob name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartBlob<'a> {
    pub id: &'a str,
    pub difficulty: Difficulty,
    pub part: Option<u32>,
}

/// Parses a per-difficulty blob file name.
pub fn parse_chart_blob(file_name: &str) -> Option<ChartBlob<'_>> {
    let caps = chart_blob_regex().captures(file_name)?;
    let id = caps.get(1)?.as_str();
    let difficulty = caps
        .get(2)
        .and_then(|m| m.as_str().chars().next())
        .and_then(Difficulty::from_suffix)?;
    let part = match caps.get(3) {
        Some(m) => Some(m.as_str().parse().ok()?),
        None => None,
    };
    Some(ChartBlob {
        id,
        difficulty,
        part,
    })
}

/// Whether `file_name` is the primary or a per-difficulty blob of `id`.
pub fn is_blob_of(file_name: &str, id: &str) -> bool {
    if parse_song_blob(file_name) == Some(id) {
        return true;
    }
    parse_chart_blob(file_name).is_some_and(|chart| chart.id == id)
}

/// Lists the blobs of `id` directly inside `dir`, sorted by file name.
pub fn blob_files(dir: &Path, id: &str) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name();
        if name.to_str().is_some_and(|n| is_blob_of(n, id)) {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_song_blob_names() {
        assert_eq!(song_blob_name("abc"), "song_abc.bin");
        assert_eq!(parse_song_blob("song_abc.bin"), Some("abc"));
        assert_eq!(parse_song_blob("song_a_b.bin"), Some("a_b"));
        assert_eq!(parse_song_blob("abc_e.bin"), None);
    }

    #[test]
    fn test_chart_blob_names() {
        assert_eq!(
            parse_chart_blob("abc_e.bin"),
            Some(ChartBlob {
                id: "abc",
                difficulty: Difficulty::Easy,
                part: None
            })
        );
        assert_eq!(
            parse_chart_blob("abc_x_2.bin"),
            Some(ChartBlob {
                id: "abc",
                difficulty: Difficulty::Ura,
                part: Some(2)
            })
        );
        assert_eq!(parse_chart_blob("abc_q.bin"), None);
        assert_eq!(parse_chart_blob("abc.bin"), None);
    }

    #[test]
    fn test_blob_ownership_uses_the_given_id() {
        // "song_x.bin" is the primary blob of "x", and also looks like the
        // Ura chart of "song".
        assert!(is_blob_of("song_x.bin", "x"));
        assert!(is_blob_of("song_x.bin", "song"));
        assert!(is_blob_of("abc_m_1.bin", "abc"));
        assert!(!is_blob_of("abcd_m.bin", "abc"));
        assert!(!is_blob_of("abc.tja", "abc"));
    }

    #[test]
    fn test_blob_files_lists_sorted() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["song_abc.bin", "abc_h.bin", "abc_e.bin", "abc.tja", "other_e.bin"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        let names: Vec<String> = blob_files(dir.path(), "abc")
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["abc_e.bin", "abc_h.bin", "song_abc.bin"]);
    }
}
