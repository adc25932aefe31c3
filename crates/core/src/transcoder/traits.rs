//! Trait definitions for the transcoder module.

use async_trait::async_trait;
use std::path::Path;

use super::error::TranscoderError;
use super::progress::ProgressSample;

/// Callback invoked synchronously for every progress sample the tool emits.
///
/// Sample cadence is whatever the tool produces; no throttling is applied.
/// Implementations must be cheap, they run on the stream-reading task.
pub type SampleCallback<'a> = &'a mut (dyn FnMut(ProgressSample) + Send);

/// A driver that can probe and transcode audio files.
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Returns the playback duration of a file in seconds.
    ///
    /// Best-effort: used only for progress weighting. Callers substitute a
    /// fallback duration on [`TranscoderError::ProbeFailed`].
    async fn probe(&self, path: &Path) -> Result<f64, TranscoderError>;

    /// Transcodes one file, reporting progress through `on_sample`.
    ///
    /// `expected_duration` weights the percentage/ETA computation; it is the
    /// probed (or fallback) duration of the input.
    async fn transcode(
        &self,
        input: &Path,
        output: &Path,
        expected_duration: f64,
        on_sample: SampleCallback<'_>,
    ) -> Result<(), TranscoderError>;

    /// Validates that the external tools are available.
    ///
    /// Called once at startup; failure prevents the service from accepting
    /// any job.
    async fn validate(&self) -> Result<(), TranscoderError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    struct FixedTranscoder;

    #[async_trait]
    impl Transcoder for FixedTranscoder {
        async fn probe(&self, _path: &Path) -> Result<f64, TranscoderError> {
            Ok(180.0)
        }

        async fn transcode(
            &self,
            _input: &Path,
            _output: &Path,
            expected_duration: f64,
            on_sample: SampleCallback<'_>,
        ) -> Result<(), TranscoderError> {
            on_sample(ProgressSample {
                time_secs: expected_duration,
                percentage: 100.0,
                speed: 1.0,
                eta_secs: 0.0,
            });
            Ok(())
        }

        async fn validate(&self) -> Result<(), TranscoderError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_trait_object_usage() {
        let transcoder: Box<dyn Transcoder> = Box::new(FixedTranscoder);
        let duration = transcoder.probe(Path::new("/x.flac")).await.unwrap();
        assert_eq!(duration, 180.0);

        let mut seen = Vec::new();
        let mut on_sample = |s: ProgressSample| seen.push(s);
        transcoder
            .transcode(
                &PathBuf::from("/x.flac"),
                &PathBuf::from("/x.m4a"),
                duration,
                &mut on_sample,
            )
            .await
            .unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].percentage, 100.0);
    }
}
