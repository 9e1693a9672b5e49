//! Parsing of ffmpeg's `-progress` key/value stream.
//!
//! ffmpeg reports elapsed output time under one of three keys depending on
//! version and build. Each key is a [`ProgressEncoding`] with its own value
//! parser; all of them feed the same [`fraction`] computation.
//!
//! [`ProgressReporter`] forwards fractions to a caller callback and always
//! delivers a final `1.0` when it is dropped.

/// How a progress line encodes elapsed output time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressEncoding {
    /// `out_time_ms=<milliseconds>`
    Milliseconds,
    /// `out_time_us=<microseconds>`
    Microseconds,
    /// `out_time=HH:MM:SS.ffffff`
    Timestamp,
}

impl ProgressEncoding {
    /// The key this encoding is reported under.
    pub fn key(self) -> &'static str {
        match self {
            ProgressEncoding::Milliseconds => "out_time_ms",
            ProgressEncoding::Microseconds => "out_time_us",
            ProgressEncoding::Timestamp => "out_time",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "out_time_ms" => Some(ProgressEncoding::Milliseconds),
            "out_time_us" => Some(ProgressEncoding::Microseconds),
            "out_time" => Some(ProgressEncoding::Timestamp),
            _ => None,
        }
    }

    /// Parse a raw value into elapsed seconds.
    pub fn parse_seconds(self, raw: &str) -> Option<f64> {
        let raw = raw.trim();
        let secs = match self {
            ProgressEncoding::Milliseconds => raw.parse::<f64>().ok()? / 1_000.0,
            ProgressEncoding::Microseconds => raw.parse::<f64>().ok()? / 1_000_000.0,
            ProgressEncoding::Timestamp => parse_timestamp(raw)?,
        };
        secs.is_finite().then_some(secs)
    }
}

fn parse_timestamp(raw: &str) -> Option<f64> {
    let mut parts = raw.split(':');
    let (hh, mm, ss) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }
    let hours = hh.parse::<i64>().ok()?;
    let minutes = mm.parse::<i64>().ok()?;
    let seconds = ss.parse::<f64>().ok()?;
    Some(hours as f64 * 3600.0 + minutes as f64 * 60.0 + seconds)
}

/// One recognised elapsed-time sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressSample {
    pub encoding: ProgressEncoding,
    pub elapsed_secs: f64,
}

/// Outcome of looking at a single `-progress` line.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressLine {
    /// An elapsed-time key with a usable value.
    Sample(ProgressSample),
    /// An elapsed-time key whose value could not be parsed (e.g. `N/A`).
    Malformed(ProgressEncoding),
    /// Any other key (`bitrate=`, `progress=continue`, …).
    Other,
}

/// Classify one line of the progress stream.
pub fn parse_progress_line(line: &str) -> ProgressLine {
    let Some((key, value)) = line.trim().split_once('=') else {
        return ProgressLine::Other;
    };
    let Some(encoding) = ProgressEncoding::from_key(key.trim()) else {
        return ProgressLine::Other;
    };
    match encoding.parse_seconds(value) {
        Some(elapsed_secs) => ProgressLine::Sample(ProgressSample {
            encoding,
            elapsed_secs,
        }),
        None => ProgressLine::Malformed(encoding),
    }
}

/// Completion fraction `elapsed / total`, clamped into `[0, 1]`.
pub fn fraction(elapsed_secs: f64, total_secs: f64) -> f64 {
    if total_secs.is_nan() || total_secs <= 0.0 || elapsed_secs.is_nan() {
        return 0.0;
    }
    (elapsed_secs / total_secs).clamp(0.0, 1.0)
}

// ---------------------------------------------------------------------------
// ProgressReporter
// ---------------------------------------------------------------------------

/// Caller-supplied progress callback.
pub type ProgressFn<'a> = &'a mut (dyn FnMut(f64) + Send);

/// Forwards progress fractions to a callback; emits `1.0` on drop.
///
/// When the total duration is unknown no intermediate fractions are sent,
/// but the final `1.0` still is.
pub struct ProgressReporter<'a> {
    sink: ProgressFn<'a>,
    total_secs: Option<f64>,
    last: Option<f64>,
}

impl<'a> ProgressReporter<'a> {
    pub fn new(sink: ProgressFn<'a>, total_secs: Option<f64>) -> Self {
        Self {
            sink,
            total_secs: total_secs.filter(|t| t.is_finite() && *t > 0.0),
            last: None,
        }
    }

    /// Whether fractional progress can be reported at all.
    pub fn is_determinate(&self) -> bool {
        self.total_secs.is_some()
    }

    /// Feed one line of the `-progress` stream.
    pub fn observe_line(&mut self, line: &str) {
        let Some(total) = self.total_secs else {
            return;
        };
        match parse_progress_line(line) {
            ProgressLine::Sample(sample) => {
                let frac = fraction(sample.elapsed_secs, total);
                self.last = Some(frac);
                (self.sink)(frac);
            }
            ProgressLine::Malformed(encoding) => {
                log::trace!("ffmpeg: ignoring unparsable {} line: {line:?}", encoding.key());
            }
            ProgressLine::Other => {}
        }
    }

    /// Most recent fraction sent (excluding the final `1.0`).
    pub fn last_fraction(&self) -> Option<f64> {
        self.last
    }
}

impl Drop for ProgressReporter<'_> {
    fn drop(&mut self) {
        (self.sink)(1.0);
    }
}
