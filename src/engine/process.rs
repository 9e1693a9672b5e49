//! Small helpers shared by every engine invocation: spawning with closed
//! stdin, capturing output, and keeping a bounded tail of diagnostics.

use std::collections::VecDeque;
use std::ffi::OsString;
use std::path::Path;
use std::process::{Output, Stdio};

use tokio::process::Command;

use crate::normalize::NormalizeError;

/// Build a command for `program` with stdin closed so the engine can never
/// block on an interactive prompt.
pub fn engine_command(program: &Path, args: &[OsString]) -> Command {
    log::debug!("ffmpeg: {}", describe(program, args));
    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    cmd
}

/// Run `program` to completion and capture both streams.
pub async fn run_captured(program: &Path, args: &[OsString]) -> Result<Output, NormalizeError> {
    engine_command(program, args)
        .output()
        .await
        .map_err(|source| spawn_error(program, source))
}

pub(crate) fn spawn_error(program: &Path, source: std::io::Error) -> NormalizeError {
    NormalizeError::Spawn {
        program: program.display().to_string(),
        source,
    }
}

/// Render a command line for logs.
pub fn describe(program: &Path, args: &[OsString]) -> String {
    let mut line = program.display().to_string();
    for arg in args {
        line.push(' ');
        line.push_str(&arg.to_string_lossy());
    }
    line
}

/// Return the last `max_chars` characters of `text` (char-boundary safe).
pub fn tail_chars(text: &str, max_chars: usize) -> &str {
    if max_chars == 0 {
        return "";
    }
    match text.char_indices().rev().nth(max_chars - 1) {
        Some((idx, _)) => &text[idx..],
        None => text,
    }
}

// ---------------------------------------------------------------------------
// DiagnosticTail
// ---------------------------------------------------------------------------

/// Keeps only the most recent `capacity` lines of a diagnostic stream.
#[derive(Debug, Clone)]
pub struct DiagnosticTail {
    lines: VecDeque<String>,
    capacity: usize,
}

impl DiagnosticTail {
    /// Lines retained from the second pass's stderr.
    pub const DEFAULT_LINES: usize = 200;

    pub fn new(capacity: usize) -> Self {
        Self {
            lines: VecDeque::with_capacity(capacity.min(1024)),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, line: String) {
        if self.lines.len() == self.capacity {
            self.lines.pop_front();
        }
        self.lines.push_back(line);
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Join the retained lines and keep at most `max_chars` trailing chars.
    pub fn render(&self, max_chars: usize) -> String {
        let joined = self
            .lines
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join("\n");
        tail_chars(&joined, max_chars).to_string()
    }
}

impl Default for DiagnosticTail {
    fn default() -> Self {
        Self::new(Self::DEFAULT_LINES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tail_chars_shorter_text_is_unchanged() {
        assert_eq!(tail_chars("abc", 10), "abc");
    }

    #[test]
    fn tail_chars_keeps_trailing_chars() {
        assert_eq!(tail_chars("abcdef", 3), "def");
        assert_eq!(tail_chars("abcdef", 0), "");
    }

    #[test]
    fn tail_chars_respects_multibyte_boundaries() {
        assert_eq!(tail_chars("añbµc", 3), "bµc");
    }

    #[test]
    fn diagnostic_tail_drops_oldest_lines() {
        let mut tail = DiagnosticTail::new(3);
        for i in 0..5 {
            tail.push(format!("line {i}"));
        }
        assert_eq!(tail.len(), 3);
        assert_eq!(tail.render(1000), "line 2\nline 3\nline 4");
    }

    #[test]
    fn diagnostic_tail_render_truncates_chars() {
        let mut tail = DiagnosticTail::default();
        tail.push("x".repeat(3000));
        assert_eq!(tail.render(2000).len(), 2000);
    }

    #[test]
    fn describe_joins_args() {
        let args: Vec<OsString> = vec!["-i".into(), "in.wav".into()];
        assert_eq!(describe(Path::new("ffmpeg"), &args), "ffmpeg -i in.wav");
    }
}
