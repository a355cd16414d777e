//! Catalog configuration.
//!
//! A [`CatalogConfig`] is built once at startup from defaults, an optional
//! JSON file and command-line overrides, then passed into the pipeline.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// Sort key used by order assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OrderKey {
    /// Genre, scored songs first, tier descending, score descending, title, id.
    #[default]
    Full,
    /// Genre, tier descending, title, id.
    GenreStars,
    /// Title, id.
    Title,
}

impl OrderKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderKey::Full => "full",
            OrderKey::GenreStars => "genre-stars",
            OrderKey::Title => "title",
        }
    }
}

impl FromStr for OrderKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "full" => Ok(OrderKey::Full),
            "genre-stars" => Ok(OrderKey::GenreStars),
            "title" => Ok(OrderKey::Title),
            _ => Err(format!(
                "unknown order key '{}', expected full, genre-stars or title",
                s
            )),
        }
    }
}

impl std::fmt::Display for OrderKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Locations and naming conventions of one song library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Root directory scanned for song directories
    pub songs_dir: PathBuf,
    /// Descriptor file name inside each song directory
    pub descriptor_file: String,
    /// Conversion manifest file name
    pub manifest_file: String,
    /// Local tabular export
    pub tabular_path: PathBuf,
    /// Spreadsheet snapshot; when set it is the remote source
    pub sheet_path: Option<PathBuf>,
    /// Sort key for order assignment
    pub order_key: OrderKey,
    /// Directory names whose subtrees are skipped during the scan
    pub exclude_dirs: Vec<String>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            songs_dir: PathBuf::from("."),
            descriptor_file: "data.json".to_string(),
            manifest_file: "conversion.json".to_string(),
            tabular_path: PathBuf::from("metadata.csv"),
            sheet_path: None,
            order_key: OrderKey::Full,
            exclude_dirs: vec!["uras".to_string()],
        }
    }
}

impl CatalogConfig {
    /// Creates a default configuration rooted at `songs_dir`.
    pub fn new(songs_dir: impl Into<PathBuf>) -> Self {
        Self {
            songs_dir: songs_dir.into(),
            ..Self::default()
        }
    }

    /// Parse a configuration from a JSON file. Missing keys keep defaults.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Loads the optional config file, then applies command-line overrides.
    pub fn resolve(config_path: Option<&str>, overrides: ConfigOverrides<'_>) -> anyhow::Result<Self> {
        let mut config = match config_path {
            Some(path) => Self::from_file(Path::new(path))?,
            None => Self::default(),
        };
        if let Some(dir) = overrides.songs_dir {
            config.songs_dir = PathBuf::from(dir);
        }
        if let Some(path) = overrides.tabular {
            config.tabular_path = PathBuf::from(path);
        }
        if let Some(path) = overrides.sheet {
            config.sheet_path = Some(PathBuf::from(path));
        }
        if let Some(key) = overrides.order_key {
            config.order_key = key;
        }
        Ok(config)
    }

    /// Whether `path` lies under an excluded directory.
    pub fn is_excluded(&self, path: &Path) -> bool {
        let relative = path.strip_prefix(&self.songs_dir).unwrap_or(path);
        relative.components().any(|c| {
            c.as_os_str()
                .to_str()
                .is_some_and(|name| self.exclude_dirs.iter().any(|ex| ex == name))
        })
    }
}

/// Command-line values that take precedence over the config file.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfigOverrides<'a> {
    pub songs_dir: Option<&'a str>,
    pub tabular: Option<&'a str>,
    pub sheet: Option<&'a str>,
    pub order_key: Option<OrderKey>,
}

/// Per-run switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RunOptions {
    /// Plan every stage but write nothing
    pub dry_run: bool,
    /// Patch non-zero volumes into song blobs
    pub patch_volume: bool,
    /// Publish the reconciled table to the spreadsheet snapshot
    pub write_sheet: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CatalogConfig::default();
        assert_eq!(config.descriptor_file, "data.json");
        assert_eq!(config.manifest_file, "conversion.json");
        assert_eq!(config.tabular_path, PathBuf::from("metadata.csv"));
        assert_eq!(config.sheet_path, None);
        assert_eq!(config.order_key, OrderKey::Full);
        assert_eq!(config.exclude_dirs, vec!["uras".to_string()]);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("songbook.json");
        std::fs::write(&path, r#"{"songs_dir": "/library", "order_key": "genre-stars"}"#).unwrap();

        let config = CatalogConfig::from_file(&path).unwrap();
        assert_eq!(config.songs_dir, PathBuf::from("/library"));
        assert_eq!(config.order_key, OrderKey::GenreStars);
        assert_eq!(config.descriptor_file, "data.json");
    }

    #[test]
    fn test_overrides_win_over_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("songbook.json");
        std::fs::write(&path, r#"{"songs_dir": "/library", "tabular_path": "a.csv"}"#).unwrap();

        let config = CatalogConfig::resolve(
            path.to_str(),
            ConfigOverrides {
                songs_dir: Some("/other"),
                sheet: Some("sheet.csv"),
                order_key: Some(OrderKey::Title),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(config.songs_dir, PathBuf::from("/other"));
        assert_eq!(config.tabular_path, PathBuf::from("a.csv"));
        assert_eq!(config.sheet_path, Some(PathBuf::from("sheet.csv")));
        assert_eq!(config.order_key, OrderKey::Title);
    }

    #[test]
    fn test_invalid_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{").unwrap();
        let err = CatalogConfig::from_file(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn test_order_key_parsing() {
        assert_eq!("genre-stars".parse::<OrderKey>(), Ok(OrderKey::GenreStars));
        assert!("stars".parse::<OrderKey>().is_err());
    }

    #[test]
    fn test_exclusion_matches_whole_components() {
        let config = CatalogConfig::new("/library");
        assert!(config.is_excluded(Path::new("/library/uras/abc")));
        assert!(!config.is_excluded(Path::new("/library/urasawa/abc")));
        assert!(!config.is_excluded(Path::new("/library/pop/abc")));
    }
}
