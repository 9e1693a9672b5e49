//! Encoder arguments for the correction pass.

use std::ffi::OsString;
use std::path::Path;

/// Extensions whose encoders benefit from an explicit bitrate.
pub const LOSSY_EXTENSIONS: &[&str] = &["mp3", "m4a", "aac", "opus", "ogg"];

/// Forced output channel layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum ChannelLayout {
    Mono,
    Stereo,
}

impl ChannelLayout {
    /// Value passed to ffmpeg's `-ac`.
    pub fn count(self) -> u8 {
        match self {
            ChannelLayout::Mono => 1,
            ChannelLayout::Stereo => 2,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ChannelLayout::Mono => "mono",
            ChannelLayout::Stereo => "stereo",
        }
    }
}

/// Lower-cased extension of `path`, without the dot.
fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
}

pub fn is_lossy(path: &Path) -> bool {
    extension_of(path).is_some_and(|ext| LOSSY_EXTENSIONS.contains(&ext.as_str()))
}

/// Encoder choices for one output file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncodeSettings {
    pub codec: Option<&'static str>,
    pub bitrate: Option<String>,
    pub channels: Option<ChannelLayout>,
}

impl EncodeSettings {
    /// Whether the source bitrate should be probed for `output`.
    pub fn wants_probed_bitrate(output: &Path, explicit_bitrate: Option<&str>) -> bool {
        explicit_bitrate.is_none() && is_lossy(output)
    }

    /// Apply the encoding policy.
    ///
    /// * `.mp3` forces `libmp3lame`.
    /// * An explicit bitrate is always passed; a probed one only for lossy
    ///   outputs.
    /// * Channels are only forced when requested.
    pub fn resolve(
        output: &Path,
        explicit_bitrate: Option<&str>,
        probed_bitrate: Option<String>,
        channels: Option<ChannelLayout>,
    ) -> Self {
        let codec = match extension_of(output).as_deref() {
            Some("mp3") => Some("libmp3lame"),
            _ => None,
        };

        let bitrate = match explicit_bitrate.map(str::trim).filter(|b| !b.is_empty()) {
            Some(explicit) => Some(explicit.to_string()),
            None if is_lossy(output) => probed_bitrate,
            None => None,
        };

        Self {
            codec,
            bitrate,
            channels,
        }
    }

    pub fn to_args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = Vec::new();
        if let Some(codec) = self.codec {
            args.push("-c:a".into());
            args.push(codec.into());
        }
        if let Some(bitrate) = &self.bitrate {
            args.push("-b:a".into());
            args.push(bitrate.into());
        }
        if let Some(channels) = self.channels {
            args.push("-ac".into());
            args.push(channels.count().to_string().into());
        }
        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(settings: &EncodeSettings) -> Vec<String> {
        settings
            .to_args()
            .into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn mp3_forces_lame_and_uses_probe() {
        let s = EncodeSettings::resolve(Path::new("out.MP3"), None, Some("192k".into()), None);
        assert_eq!(args(&s), ["-c:a", "libmp3lame", "-b:a", "192k"]);
    }

    #[test]
    fn explicit_bitrate_wins_over_probe() {
        let s = EncodeSettings::resolve(
            Path::new("out.m4a"),
            Some("256k"),
            Some("128k".into()),
            None,
        );
        assert_eq!(args(&s), ["-b:a", "256k"]);
    }

    #[test]
    fn explicit_bitrate_is_passed_for_lossless_too() {
        let s = EncodeSettings::resolve(Path::new("out.flac"), Some("320k"), None, None);
        assert_eq!(args(&s), ["-b:a", "320k"]);
    }

    #[test]
    fn probed_bitrate_ignored_for_lossless() {
        let s = EncodeSettings::resolve(Path::new("out.wav"), None, Some("1411k".into()), None);
        assert!(args(&s).is_empty());
    }

    #[test]
    fn channels_are_forced_when_requested() {
        let s = EncodeSettings::resolve(
            Path::new("out.wav"),
            None,
            None,
            Some(ChannelLayout::Mono),
        );
        assert_eq!(args(&s), ["-ac", "1"]);

        let s = EncodeSettings::resolve(
            Path::new("out.ogg"),
            None,
            None,
            Some(ChannelLayout::Stereo),
        );
        assert_eq!(args(&s), ["-ac", "2"]);
    }

    #[test]
    fn probe_wanted_only_for_lossy_without_explicit() {
        assert!(EncodeSettings::wants_probed_bitrate(Path::new("a.opus"), None));
        assert!(EncodeSettings::wants_probed_bitrate(Path::new("a.AAC"), None));
        assert!(!EncodeSettings::wants_probed_bitrate(Path::new("a.opus"), Some("96k")));
        assert!(!EncodeSettings::wants_probed_bitrate(Path::new("a.wav"), None));
        assert!(!EncodeSettings::wants_probed_bitrate(Path::new("noext"), None));
    }

    #[test]
    fn blank_explicit_bitrate_is_ignored() {
        let s = EncodeSettings::resolve(Path::new("out.mp3"), Some("  "), None, None);
        assert_eq!(args(&s), ["-c:a", "libmp3lame"]);
    }
}
