//! Locating the external `ffmpeg` / `ffprobe` binaries.

use std::path::{Path, PathBuf};

use crate::config::ToolsConfig;
use crate::normalize::NormalizeError;

/// Resolved engine executables.
///
/// `ffmpeg` is mandatory; `ffprobe` only improves duration and bitrate
/// probing, so its absence is tolerated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toolchain {
    pub ffmpeg: PathBuf,
    pub ffprobe: Option<PathBuf>,
}

impl Toolchain {
    /// Resolve both tools from `config`.
    ///
    /// # Errors
    ///
    /// [`NormalizeError::ToolMissing`] when `ffmpeg` cannot be found.
    pub fn discover(config: &ToolsConfig) -> Result<Self, NormalizeError> {
        let ffmpeg = find_executable(&config.ffmpeg).ok_or_else(|| NormalizeError::ToolMissing {
            tool: config.ffmpeg.display().to_string(),
        })?;

        let ffprobe = find_executable(&config.ffprobe);
        if ffprobe.is_none() {
            log::info!(
                "ffmpeg: {} not found; duration/bitrate probing falls back to ffmpeg",
                config.ffprobe.display()
            );
        }

        log::debug!("ffmpeg: using {}", ffmpeg.display());
        Ok(Self { ffmpeg, ffprobe })
    }
}

/// Find `program` either as an explicit path or by searching `PATH`.
///
/// A bare name (no directory component) is looked up in every `PATH` entry;
/// on Windows `.exe` is appended when the name has no extension.
pub fn find_executable(program: &Path) -> Option<PathBuf> {
    let has_dir = program
        .parent()
        .is_some_and(|parent| !parent.as_os_str().is_empty());

    if has_dir {
        return is_executable(program).then(|| program.to_path_buf());
    }

    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var)
        .flat_map(|dir| candidates(&dir, program))
        .find(|candidate| is_executable(candidate))
}

fn candidates(dir: &Path, program: &Path) -> Vec<PathBuf> {
    let mut out = vec![dir.join(program)];
    if cfg!(windows) && program.extension().is_none() {
        out.push(dir.join(program).with_extension("exe"));
    }
    out
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    std::fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
