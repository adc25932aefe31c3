//! The sequential conversion job runner.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::events::{ConversionEvent, ErrorDetail, EventSink, FileCompletion};
use crate::scanner::{converted_relative_path, SourceFile};
use crate::transcoder::{ProgressSample, Transcoder};

use super::types::{FileError, JobError, JobProgress, JobResult};

/// The single in-flight job. Only the cancellation flag is shared; all other
/// job state lives on the job task.
struct ActiveJob {
    cancelled: Arc<AtomicBool>,
}

/// Owns the process-wide conversion job slot.
///
/// At most one job runs at a time; `start` while one is active fails with
/// [`JobError::Conflict`] rather than queueing. `start`, `cancel` and
/// `is_active` are the only entry points and are safe to call concurrently
/// from any number of request handlers.
pub struct JobRunner {
    transcoder: Arc<dyn Transcoder>,
    sink: Arc<dyn EventSink>,
    fallback_duration_secs: f64,
    active: Arc<Mutex<Option<ActiveJob>>>,
}

impl JobRunner {
    pub fn new(
        transcoder: Arc<dyn Transcoder>,
        sink: Arc<dyn EventSink>,
        fallback_duration_secs: f64,
    ) -> Self {
        Self {
            transcoder,
            sink,
            fallback_duration_secs,
            active: Arc::new(Mutex::new(None)),
        }
    }

    /// Starts a job over `files` in the given order.
    ///
    /// Returns the accepted file count; the job itself runs on a background
    /// task and reports through the event sink.
    pub async fn start(
        &self,
        files: Vec<SourceFile>,
        source_root: PathBuf,
        target_root: PathBuf,
    ) -> Result<usize, JobError> {
        let cancelled = Arc::new(AtomicBool::new(false));
        {
            let mut active = self.active.lock().await;
            if active.is_some() {
                return Err(JobError::Conflict);
            }
            *active = Some(ActiveJob {
                cancelled: Arc::clone(&cancelled),
            });
        }

        let total = files.len();
        info!(
            total_files = total,
            source_root = %source_root.display(),
            target_root = %target_root.display(),
            "starting conversion job"
        );

        let transcoder = Arc::clone(&self.transcoder);
        let sink = Arc::clone(&self.sink);
        let active = Arc::clone(&self.active);
        let fallback = self.fallback_duration_secs;

        tokio::spawn(async move {
            run_job(transcoder, sink, active, cancelled, files, target_root, fallback).await;
        });

        Ok(total)
    }

    /// Requests cancellation of the active job, returning whether one existed.
    ///
    /// Cooperative: the flag is observed at file boundaries only, so a file
    /// already transcoding runs to completion first. The external process is
    /// never killed.
    pub async fn cancel(&self) -> bool {
        let active = self.active.lock().await;
        match active.as_ref() {
            Some(job) => {
                job.cancelled.store(true, Ordering::SeqCst);
                info!("conversion job cancellation requested");
                true
            }
            None => false,
        }
    }

    /// Whether a job is currently running.
    pub async fn is_active(&self) -> bool {
        self.active.lock().await.is_some()
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_job(
    transcoder: Arc<dyn Transcoder>,
    sink: Arc<dyn EventSink>,
    active: Arc<Mutex<Option<ActiveJob>>>,
    cancelled: Arc<AtomicBool>,
    files: Vec<SourceFile>,
    target_root: PathBuf,
    fallback_duration_secs: f64,
) {
    let started = Instant::now();
    let total_files = files.len();
    let mut result = JobResult::new(total_files);

    // Probe everything up front so overall progress can be weighted by
    // duration. Probe failures are non-fatal: the fallback keeps the file's
    // weight plausible without affecting correctness.
    let mut durations = Vec::with_capacity(total_files);
    let mut total_duration = 0.0;
    for file in &files {
        let duration = match transcoder.probe(&file.path).await {
            Ok(duration) => duration,
            Err(e) => {
                warn!(file = %file.name, error = %e, "duration probe failed, using fallback");
                fallback_duration_secs
            }
        };
        durations.push(duration);
        total_duration += duration;
    }

    let mut completed_duration = 0.0;

    for (index, file) in files.iter().enumerate() {
        if cancelled.load(Ordering::SeqCst) {
            info!(
                processed = index,
                total_files, "conversion job cancelled, remaining files skipped"
            );
            break;
        }

        let duration = durations[index];
        let output = target_root.join(converted_relative_path(&file.relative_path));

        if let Some(parent) = output.parent() {
            if let Err(e) = tokio::fs::create_dir_all(parent).await {
                error!(dir = %parent.display(), error = %e, "cannot create output directory, aborting job");
                sink.emit(ConversionEvent::Error(ErrorDetail {
                    message: format!(
                        "failed to create output directory {}: {}",
                        parent.display(),
                        e
                    ),
                    file: Some(file.name.clone()),
                }));
                break;
            }
        }

        let completed_before = completed_duration;
        let current_file = file.name.clone();
        let sink_ref = &sink;
        let mut on_sample = move |sample: ProgressSample| {
            let completed_so_far = completed_before + duration * sample.percentage / 100.0;
            let overall_progress = if total_duration > 0.0 {
                completed_so_far / total_duration * 100.0
            } else {
                100.0
            };

            let elapsed = started.elapsed().as_secs_f64();
            let rate = if elapsed > 0.0 {
                completed_so_far / elapsed
            } else {
                0.0
            };
            let remaining = total_duration - completed_so_far;
            let overall_eta = if rate > 0.0 { remaining / rate } else { remaining };

            sink_ref.emit(ConversionEvent::Progress(JobProgress {
                current_file: current_file.clone(),
                current_file_index: index + 1,
                total_files,
                file_progress: sample.percentage,
                file_eta: sample.eta_secs,
                overall_progress,
                overall_eta,
            }));
        };

        match transcoder
            .transcode(&file.path, &output, duration, &mut on_sample)
            .await
        {
            Ok(()) => {
                result.successful += 1;
                sink.emit(ConversionEvent::FileComplete(FileCompletion {
                    file: file.name.clone(),
                    success: true,
                    error: None,
                }));
            }
            Err(e) => {
                warn!(file = %file.name, error = %e, "file conversion failed, continuing");
                result.failed += 1;
                result.errors.push(FileError {
                    file: file.name.clone(),
                    error: e.to_string(),
                });
                sink.emit(ConversionEvent::FileComplete(FileCompletion {
                    file: file.name.clone(),
                    success: false,
                    error: Some(e.to_string()),
                }));
            }
        }

        // The file's full weight counts once it has been dealt with, pass or
        // fail, keeping overall progress monotonic.
        completed_duration += duration;
    }

    active.lock().await.take();

    info!(
        successful = result.successful,
        failed = result.failed,
        total_files = result.total_files,
        "conversion job finished"
    );
    sink.emit(ConversionEvent::JobComplete(result));
}
