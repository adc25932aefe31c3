//! Configuration for the transcoder module.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for the ffmpeg-based transcoder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscoderConfig {
    /// Path to the ffmpeg binary.
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: PathBuf,

    /// Path to the ffprobe binary.
    #[serde(default = "default_ffprobe_path")]
    pub ffprobe_path: PathBuf,

    /// Duration assumed for a file whose probe fails, in seconds.
    /// Used only for progress weighting, never for correctness.
    #[serde(default = "default_fallback_duration")]
    pub fallback_duration_secs: f64,

    /// How much trailing tool output to keep for failure diagnostics.
    #[serde(default = "default_stderr_tail")]
    pub stderr_tail_chars: usize,
}

fn default_ffmpeg_path() -> PathBuf {
    PathBuf::from("ffmpeg")
}

fn default_ffprobe_path() -> PathBuf {
    PathBuf::from("ffprobe")
}

fn default_fallback_duration() -> f64 {
    180.0
}

fn default_stderr_tail() -> usize {
    500
}

impl Default for TranscoderConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: default_ffmpeg_path(),
            ffprobe_path: default_ffprobe_path(),
            fallback_duration_secs: default_fallback_duration(),
            stderr_tail_chars: default_stderr_tail(),
        }
    }
}

impl TranscoderConfig {
    /// Creates a config with custom ffmpeg/ffprobe paths.
    pub fn with_paths(ffmpeg_path: PathBuf, ffprobe_path: PathBuf) -> Self {
        Self {
            ffmpeg_path,
            ffprobe_path,
            ..Default::default()
        }
    }

    /// Sets the fallback duration in seconds.
    pub fn with_fallback_duration(mut self, secs: f64) -> Self {
        self.fallback_duration_secs = secs;
        self
    }
}
