//! External transcoding-tool driver.
//!
//! Wraps two ffmpeg-family invocations: a one-shot ffprobe duration probe and
//! a streaming ffmpeg transcode whose textual stderr output is parsed into
//! structured progress samples.

mod config;
mod error;
mod ffmpeg;
mod progress;
mod traits;

pub use config::TranscoderConfig;
pub use error::TranscoderError;
pub use ffmpeg::FfmpegTranscoder;
pub use progress::{ProgressParser, ProgressSample, RawProgress};
pub use traits::{SampleCallback, Transcoder};
