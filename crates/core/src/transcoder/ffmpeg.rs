//! FFmpeg-based transcoder implementation.

use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tracing::debug;

use super::config::TranscoderConfig;
use super::error::TranscoderError;
use super::progress::{ProgressParser, ProgressSample};
use super::traits::{SampleCallback, Transcoder};

/// FFmpeg-based transcoder implementation.
pub struct FfmpegTranscoder {
    config: TranscoderConfig,
}

impl FfmpegTranscoder {
    /// Creates a new transcoder with the given configuration.
    pub fn new(config: TranscoderConfig) -> Self {
        Self { config }
    }

    /// Creates a transcoder with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(TranscoderConfig::default())
    }

    /// Builds the ffmpeg argument list for one file.
    ///
    /// Fixed AAC/256k parameters; `-c:v copy -map 0` carries embedded cover
    /// art through, `-movflags +faststart` keeps the output streamable.
    fn build_transcode_args(input: &Path, output: &Path) -> Vec<String> {
        vec![
            "-i".to_string(),
            input.to_string_lossy().to_string(),
            "-c:a".to_string(),
            "aac".to_string(),
            "-b:a".to_string(),
            "256k".to_string(),
            "-c:v".to_string(),
            "copy".to_string(),
            "-map".to_string(),
            "0".to_string(),
            "-movflags".to_string(),
            "+faststart".to_string(),
            "-y".to_string(),
            output.to_string_lossy().to_string(),
        ]
    }

    /// Parses the probe tool's single-value output.
    fn parse_duration_output(output: &str) -> Result<f64, TranscoderError> {
        output.trim().parse::<f64>().map_err(|_| {
            TranscoderError::probe_failed(format!("unparseable duration output: {:?}", output.trim()))
        })
    }
}

/// Keeps only the trailing `max` bytes of a growing string, on a char boundary.
fn truncate_front(s: &mut String, max: usize) {
    if s.len() <= max {
        return;
    }
    let cut = s.len() - max;
    let boundary = (cut..s.len())
        .find(|&i| s.is_char_boundary(i))
        .unwrap_or(s.len());
    s.drain(..boundary);
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn probe(&self, path: &Path) -> Result<f64, TranscoderError> {
        if !path.exists() {
            return Err(TranscoderError::InputNotFound {
                path: path.to_path_buf(),
            });
        }

        let output = Command::new(&self.config.ffprobe_path)
            .args([
                "-v",
                "error",
                "-show_entries",
                "format=duration",
                "-of",
                "default=noprint_wrappers=1:nokey=1",
            ])
            .arg(path)
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    TranscoderError::FfprobeNotFound {
                        path: self.config.ffprobe_path.clone(),
                    }
                } else {
                    TranscoderError::probe_failed(e.to_string())
                }
            })?;

        if !output.status.success() {
            return Err(TranscoderError::probe_failed(format!(
                "ffprobe exited with code {:?}: {}",
                output.status.code(),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Self::parse_duration_output(&String::from_utf8_lossy(&output.stdout))
    }

    async fn transcode(
        &self,
        input: &Path,
        output: &Path,
        expected_duration: f64,
        on_sample: SampleCallback<'_>,
    ) -> Result<(), TranscoderError> {
        let args = Self::build_transcode_args(input, output);
        debug!(input = %input.display(), output = %output.display(), "spawning ffmpeg");

        let mut child = Command::new(&self.config.ffmpeg_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    TranscoderError::FfmpegNotFound {
                        path: self.config.ffmpeg_path.clone(),
                    }
                } else {
                    TranscoderError::Io(e)
                }
            })?;

        let mut stderr = child.stderr.take().expect("stderr should be captured");

        // The tool interleaves diagnostics and \r-terminated stats lines on
        // stderr; read raw chunks, feed the parser, and keep a bounded tail
        // for failure diagnostics.
        let mut parser = ProgressParser::new();
        let mut tail = String::new();
        let mut buf = [0u8; 4096];

        loop {
            let n = stderr.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            let chunk = String::from_utf8_lossy(&buf[..n]);
            tail.push_str(&chunk);
            truncate_front(&mut tail, self.config.stderr_tail_chars);

            for raw in parser.push(&chunk) {
                on_sample(ProgressSample::compute(&raw, expected_duration));
            }
        }
        if let Some(raw) = parser.finish() {
            on_sample(ProgressSample::compute(&raw, expected_duration));
        }

        let status = child.wait().await?;
        if status.success() {
            Ok(())
        } else {
            let code = status
                .code()
                .map(|c| c.to_string())
                .unwrap_or_else(|| "unknown (killed by signal)".to_string());
            Err(TranscoderError::conversion_failed(
                format!("ffmpeg exited with code {}", code),
                (!tail.is_empty()).then(|| tail.clone()),
            ))
        }
    }

    async fn validate(&self) -> Result<(), TranscoderError> {
        for (binary, not_found) in [
            (
                &self.config.ffmpeg_path,
                TranscoderError::FfmpegNotFound {
                    path: self.config.ffmpeg_path.clone(),
                },
            ),
            (
                &self.config.ffprobe_path,
                TranscoderError::FfprobeNotFound {
                    path: self.config.ffprobe_path.clone(),
                },
            ),
        ] {
            if let Err(e) = Command::new(binary).arg("-version").output().await {
                if e.kind() == std::io::ErrorKind::NotFound {
                    return Err(not_found);
                }
                return Err(TranscoderError::Io(e));
            }
        }
        Ok(())
    }
}
