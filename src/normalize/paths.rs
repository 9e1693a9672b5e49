//! Output naming and overwrite avoidance.

use std::path::{Path, PathBuf};

use super::NormalizeError;
use crate::config::OutputConfig;

/// Highest numeric disambiguator tried by [`avoid_overwrite_path`].
pub const MAX_DISAMBIGUATOR: u32 = 999;

/// Output path for `input`: `explicit` if given, else
/// `<dir>/<stem><suffix><ext>` next to the input.
///
/// ```
/// use std::path::Path;
/// use lufs_normalizer::config::OutputConfig;
/// use lufs_normalizer::normalize::default_output_path;
///
/// let out = default_output_path(Path::new("music/song.wav"), None, &OutputConfig::default());
/// assert_eq!(out, Path::new("music/song_-14LUFS.wav"));
/// ```
pub fn default_output_path(input: &Path, explicit: Option<&Path>, naming: &OutputConfig) -> PathBuf {
    if let Some(explicit) = explicit {
        return explicit.to_path_buf();
    }
    input.with_file_name(default_file_name(input, naming))
}

/// File name part of [`default_output_path`].
pub fn default_file_name(input: &Path, naming: &OutputConfig) -> String {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = match input.extension() {
        Some(ext) => format!(".{}", ext.to_string_lossy()),
        None => naming.fallback_extension.clone(),
    };
    format!("{stem}{}{ext}", naming.suffix)
}

/// Return `path` if it is free, otherwise the first free
/// `<stem>-NNN<ext>` sibling for `NNN` in `001..=999`.
///
/// # Errors
///
/// [`NormalizeError::DisambiguationExhausted`] when every candidate exists.
pub fn avoid_overwrite_path(path: &Path) -> Result<PathBuf, NormalizeError> {
    if !path.exists() {
        return Ok(path.to_path_buf());
    }

    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    (1..=MAX_DISAMBIGUATOR)
        .map(|i| path.with_file_name(format!("{stem}-{i:03}{ext}")))
        .find(|candidate| !candidate.exists())
        .ok_or_else(|| {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            NormalizeError::DisambiguationExhausted(name)
        })
}

/// Create the destination's parent directories.
pub fn ensure_parent_dir(path: &Path) -> Result<(), NormalizeError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            std::fs::create_dir_all(parent)?;
            Ok(())
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn touch(path: &Path) {
        std::fs::write(path, b"").expect("touch");
    }

    #[test]
    fn default_name_keeps_extension() {
        let out = default_output_path(Path::new("/a/b/song.flac"), None, &OutputConfig::default());
        assert_eq!(out, PathBuf::from("/a/b/song_-14LUFS.flac"));
    }

    #[test]
    fn default_name_falls_back_to_mp3() {
        let out = default_output_path(Path::new("/a/b/recording"), None, &OutputConfig::default());
        assert_eq!(out, PathBuf::from("/a/b/recording_-14LUFS.mp3"));
    }

    #[test]
    fn default_name_uses_last_extension_only() {
        let name = default_file_name(Path::new("mix.final.wav"), &OutputConfig::default());
        assert_eq!(name, "mix.final_-14LUFS.wav");
    }

    #[test]
    fn explicit_output_wins() {
        let out = default_output_path(
            Path::new("in.wav"),
            Some(Path::new("elsewhere/out.mp3")),
            &OutputConfig::default(),
        );
        assert_eq!(out, PathBuf::from("elsewhere/out.mp3"));
    }

    #[test]
    fn custom_suffix() {
        let naming = OutputConfig {
            suffix: "_norm".into(),
            fallback_extension: ".m4a".into(),
        };
        assert_eq!(default_file_name(Path::new("take"), &naming), "take_norm.m4a");
    }

    #[test]
    fn free_path_is_returned_unchanged() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("f.x");
        assert_eq!(avoid_overwrite_path(&path).unwrap(), path);
    }

    #[test]
    fn first_collision_gets_001() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("f.x");
        touch(&path);
        assert_eq!(avoid_overwrite_path(&path).unwrap(), dir.path().join("f-001.x"));
    }

    #[test]
    fn skips_existing_sequence() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("f.x");
        touch(&path);
        for i in 1..=10 {
            touch(&dir.path().join(format!("f-{i:03}.x")));
        }

        let next = avoid_overwrite_path(&path).unwrap();
        assert_eq!(next, dir.path().join("f-011.x"));
        assert!(!next.exists());
    }

    #[test]
    fn gap_in_sequence_is_reused() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("f.x");
        touch(&path);
        touch(&dir.path().join("f-001.x"));
        touch(&dir.path().join("f-003.x"));

        assert_eq!(avoid_overwrite_path(&path).unwrap(), dir.path().join("f-002.x"));
    }

    #[test]
    fn extensionless_collision() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("track");
        touch(&path);
        assert_eq!(avoid_overwrite_path(&path).unwrap(), dir.path().join("track-001"));
    }

    #[test]
    fn exhausted_range_is_an_error() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("f.x");
        touch(&path);
        for i in 1..=MAX_DISAMBIGUATOR {
            touch(&dir.path().join(format!("f-{i:03}.x")));
        }

        let err = avoid_overwrite_path(&path).unwrap_err();
        assert_eq!(err.exit_code(), 6);
        assert!(err.to_string().contains("f.x"));
    }

    #[test]
    fn ensure_parent_dir_creates_nested_dirs() {
        let dir = tempdir().expect("temp dir");
        let out = dir.path().join("a").join("b").join("out.mp3");
        ensure_parent_dir(&out).unwrap();
        assert!(dir.path().join("a").join("b").is_dir());
    }

    #[test]
    fn ensure_parent_dir_accepts_bare_file_name() {
        assert!(ensure_parent_dir(Path::new("out.mp3")).is_ok());
    }
}
