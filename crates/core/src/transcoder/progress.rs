//! Parsing of ffmpeg's textual progress output.
//!
//! ffmpeg reports conversion progress as stats lines on stderr, terminated
//! with `\r`, carrying `time=HH:MM:SS.cc` and `speed=N.Nx` markers. The
//! parser here is pure text-in, samples-out: it holds no process state and is
//! exercised against recorded fixtures. It tolerates markers split across
//! read boundaries and any number of markers per chunk.

use regex_lite::Regex;

/// A `time=` marker recognized in the tool output.
#[derive(Debug, Clone, PartialEq)]
pub struct RawProgress {
    /// Media time the tool has reached, in seconds.
    pub time_secs: f64,
    /// Reported processing speed multiplier, if present on the same line.
    pub speed: Option<f64>,
}

/// A progress sample derived from a marker and the expected duration.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressSample {
    /// Media time the tool has reached, in seconds.
    pub time_secs: f64,
    /// Completion percentage, clamped to 0..=100.
    pub percentage: f64,
    /// Processing speed multiplier (1.0 when the tool did not report one).
    pub speed: f64,
    /// Estimated seconds remaining for this file.
    pub eta_secs: f64,
}

impl ProgressSample {
    /// Derives a sample from a raw marker against the expected duration.
    pub fn compute(raw: &RawProgress, expected_duration: f64) -> Self {
        let percentage = if expected_duration > 0.0 {
            (raw.time_secs / expected_duration * 100.0).clamp(0.0, 100.0)
        } else {
            0.0
        };
        let speed = raw.speed.unwrap_or(1.0);
        let remaining = expected_duration - raw.time_secs;
        let eta_secs = if speed > 0.0 { remaining / speed } else { remaining };

        Self {
            time_secs: raw.time_secs,
            percentage,
            speed,
            eta_secs,
        }
    }
}

/// Incremental parser over the tool's stderr stream.
pub struct ProgressParser {
    carry: String,
    time_re: Regex,
    speed_re: Regex,
}

impl ProgressParser {
    pub fn new() -> Self {
        Self {
            carry: String::new(),
            // 2-digit groups per the tool's stats format, e.g. time=00:01:23.45
            time_re: Regex::new(r"time=(\d{2,}):(\d{2}):(\d{2})\.(\d{2})")
                .expect("static pattern"),
            speed_re: Regex::new(r"speed=\s*([0-9.]+)x").expect("static pattern"),
        }
    }

    /// Feeds a chunk of tool output, returning every marker completed by it.
    ///
    /// A trailing partial line is carried over to the next call, so a marker
    /// split across two reads is recognized once its line terminator arrives.
    pub fn push(&mut self, chunk: &str) -> Vec<RawProgress> {
        self.carry.push_str(chunk);

        let Some(last_break) = self.carry.rfind(['\r', '\n']) else {
            return Vec::new();
        };

        let complete: String = self.carry.drain(..=last_break).collect();
        complete
            .split(['\r', '\n'])
            .filter_map(|line| self.parse_line(line))
            .collect()
    }

    /// Flushes the carried partial line at end of stream.
    pub fn finish(&mut self) -> Option<RawProgress> {
        let tail = std::mem::take(&mut self.carry);
        self.parse_line(&tail)
    }

    fn parse_line(&self, line: &str) -> Option<RawProgress> {
        let caps = self.time_re.captures(line)?;

        let field = |i: usize| {
            caps.get(i)
                .and_then(|m| m.as_str().parse::<f64>().ok())
                .unwrap_or(0.0)
        };
        let time_secs = field(1) * 3600.0 + field(2) * 60.0 + field(3) + field(4) / 100.0;

        let speed = self
            .speed_re
            .captures(line)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse::<f64>().ok());

        Some(RawProgress { time_secs, speed })
    }
}

impl Default for ProgressParser {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STATS_LINE: &str =
        "size=    2048KiB time=00:01:23.45 bitrate= 201.0kbits/s speed=12.3x\r";

    #[test]
    fn test_parses_time_and_speed_from_stats_line() {
        let mut parser = ProgressParser::new();
        let samples = parser.push(STATS_LINE);
        assert_eq!(samples.len(), 1);
        let expected = 60.0 + 23.0 + 0.45;
        assert!((samples[0].time_secs - expected).abs() < 1e-9);
        assert_eq!(samples[0].speed, Some(12.3));
    }

    #[test]
    fn test_parses_hours() {
        let mut parser = ProgressParser::new();
        let samples = parser.push("time=01:02:03.04 speed=1.0x\n");
        let expected = 3600.0 + 120.0 + 3.0 + 0.04;
        assert!((samples[0].time_secs - expected).abs() < 1e-9);
    }

    #[test]
    fn test_marker_split_across_reads() {
        let mut parser = ProgressParser::new();
        assert!(parser.push("size= 1024KiB time=00:0").is_empty());
        let samples = parser.push("0:30.00 bitrate=N/A speed= 4.0x\rnext");
        assert_eq!(samples.len(), 1);
        assert!((samples[0].time_secs - 30.0).abs() < 1e-9);
        assert_eq!(samples[0].speed, Some(4.0));
    }

    #[test]
    fn test_multiple_markers_in_one_chunk() {
        let mut parser = ProgressParser::new();
        let chunk = "time=00:00:10.00 speed=2.0x\rtime=00:00:20.00 speed=2.5x\r";
        let samples = parser.push(chunk);
        assert_eq!(samples.len(), 2);
        assert!((samples[0].time_secs - 10.0).abs() < 1e-9);
        assert!((samples[1].time_secs - 20.0).abs() < 1e-9);
        assert_eq!(samples[1].speed, Some(2.5));
    }

    #[test]
    fn test_missing_speed_is_none() {
        let mut parser = ProgressParser::new();
        let samples = parser.push("time=00:00:05.50 bitrate=N/A\r");
        assert_eq!(samples[0].speed, None);
    }

    #[test]
    fn test_non_progress_lines_ignored() {
        let mut parser = ProgressParser::new();
        let chunk = "Input #0, flac, from 'in.flac':\n  Duration: 00:03:00.00\n";
        // The Duration line carries no time= marker.
        assert!(parser.push(chunk).is_empty());
    }

    #[test]
    fn test_finish_flushes_unterminated_line() {
        let mut parser = ProgressParser::new();
        assert!(parser.push("time=00:00:42.00 speed=1.5x").is_empty());
        let last = parser.finish().unwrap();
        assert!((last.time_secs - 42.0).abs() < 1e-9);
        assert_eq!(last.speed, Some(1.5));
        assert!(parser.finish().is_none());
    }

    #[test]
    fn test_sample_percentage_and_eta() {
        let raw = RawProgress {
            time_secs: 30.0,
            speed: Some(2.0),
        };
        let sample = ProgressSample::compute(&raw, 60.0);
        assert!((sample.percentage - 50.0).abs() < 1e-9);
        assert!((sample.eta_secs - 15.0).abs() < 1e-9);
    }

    #[test]
    fn test_sample_clamps_past_end() {
        let raw = RawProgress {
            time_secs: 65.0,
            speed: Some(1.0),
        };
        let sample = ProgressSample::compute(&raw, 60.0);
        assert_eq!(sample.percentage, 100.0);
    }

    #[test]
    fn test_sample_defaults_missing_speed_to_unity() {
        let raw = RawProgress {
            time_secs: 10.0,
            speed: None,
        };
        let sample = ProgressSample::compute(&raw, 40.0);
        assert_eq!(sample.speed, 1.0);
        assert!((sample.eta_secs - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_sample_zero_expected_duration() {
        let raw = RawProgress {
            time_secs: 10.0,
            speed: None,
        };
        let sample = ProgressSample::compute(&raw, 0.0);
        assert_eq!(sample.percentage, 0.0);
    }
}
