//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and handed to the worker
//! thread by value.

use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::AppPaths;

// ---------------------------------------------------------------------------
// LoudnessConfig
// ---------------------------------------------------------------------------

/// Default loudnorm targets used when the CLI / form does not override them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoudnessConfig {
    /// Integrated loudness target in LUFS.
    pub integrated: f64,
    /// True-peak ceiling in dBTP.
    pub true_peak: f64,
    /// Loudness range target.
    pub range: f64,
}

impl Default for LoudnessConfig {
    fn default() -> Self {
        Self {
            integrated: -14.0,
            true_peak: -1.5,
            range: 11.0,
        }
    }
}

// ---------------------------------------------------------------------------
// ToolsConfig
// ---------------------------------------------------------------------------

/// Where to find the external engine binaries.
///
/// Each entry is either a bare program name (searched on `PATH`) or an
/// explicit path to the executable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            ffprobe: PathBuf::from("ffprobe"),
        }
    }
}

// ---------------------------------------------------------------------------
// OutputConfig
// ---------------------------------------------------------------------------

/// Naming of default output files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Token appended to the input stem, e.g. `song.mp3` → `song_-14LUFS.mp3`.
    pub suffix: String,
    /// Extension used when the input has none (leading dot included).
    pub fallback_extension: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            suffix: "_-14LUFS".into(),
            fallback_extension: ".mp3".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// UiConfig
// ---------------------------------------------------------------------------

/// Desktop form settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// Directory the file dialogs open in; updated when the form closes.
    pub last_dir: Option<PathBuf>,
    /// Initial inner window size `(width, height)` in logical points.
    pub window_size: (f32, f32),
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            last_dir: None,
            window_size: (640.0, 600.0),
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// # Persistence
///
/// ```rust,no_run
/// use lufs_normalizer::config::AppConfig;
///
/// // Load (returns Default when file is missing)
/// let config = AppConfig::load().unwrap();
///
/// // Modify and save
/// // config.save().unwrap();
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Default loudnorm targets.
    pub loudness: LoudnessConfig,
    /// External engine locations.
    pub tools: ToolsConfig,
    /// Default output naming.
    pub output: OutputConfig,
    /// Desktop form settings.
    pub ui: UiConfig,
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path.
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path.
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn round_trip_toml() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("settings.toml");

        let original = AppConfig::default();
        original.save_to(&path).expect("save");

        let loaded = AppConfig::load_from(&path).expect("load");
        assert_eq!(original, loaded);
    }

    /// `load_from` on a non-existent path must return `Default` without error.
    #[test]
    fn load_missing_returns_default() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("nonexistent.toml");

        let config = AppConfig::load_from(&path).expect("should not error");
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn default_values() {
        let cfg = AppConfig::default();

        assert_eq!(cfg.loudness.integrated, -14.0);
        assert_eq!(cfg.loudness.true_peak, -1.5);
        assert_eq!(cfg.loudness.range, 11.0);
        assert_eq!(cfg.tools.ffmpeg, PathBuf::from("ffmpeg"));
        assert_eq!(cfg.tools.ffprobe, PathBuf::from("ffprobe"));
        assert_eq!(cfg.output.suffix, "_-14LUFS");
        assert_eq!(cfg.output.fallback_extension, ".mp3");
        assert!(cfg.ui.last_dir.is_none());
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("partial.toml");
        std::fs::write(&path, "[loudness]\nintegrated = -16.0\n").expect("write");

        let cfg = AppConfig::load_from(&path).expect("load");
        assert_eq!(cfg.loudness.integrated, -16.0);
        assert_eq!(cfg.loudness.true_peak, -1.5);
        assert_eq!(cfg.output, OutputConfig::default());
    }

    #[test]
    fn round_trip_modified_values() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("nested").join("modified.toml");

        let mut cfg = AppConfig::default();
        cfg.loudness.integrated = -23.0;
        cfg.tools.ffmpeg = PathBuf::from("/opt/ffmpeg/bin/ffmpeg");
        cfg.output.suffix = "_norm".into();
        cfg.ui.last_dir = Some(PathBuf::from("/music"));

        cfg.save_to(&path).expect("save");
        let loaded = AppConfig::load_from(&path).expect("load");

        assert_eq!(loaded.loudness.integrated, -23.0);
        assert_eq!(loaded.tools.ffmpeg, PathBuf::from("/opt/ffmpeg/bin/ffmpeg"));
        assert_eq!(loaded.output.suffix, "_norm");
        assert_eq!(loaded.ui.last_dir, Some(PathBuf::from("/music")));
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "loudness = [not toml").expect("write");

        assert!(AppConfig::load_from(&path).is_err());
    }
}
