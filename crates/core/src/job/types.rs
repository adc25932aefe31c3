//! Types for the job module.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Snapshot of job progress, recomputed on every sample and never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobProgress {
    /// Display name of the file currently converting.
    pub current_file: String,
    /// 1-based index of the current file.
    pub current_file_index: usize,
    /// Number of files in the job.
    pub total_files: usize,
    /// Percentage of the current file, 0..=100.
    pub file_progress: f64,
    /// Estimated seconds remaining for the current file.
    pub file_eta: f64,
    /// Duration-weighted percentage across the whole job.
    pub overall_progress: f64,
    /// Estimated seconds remaining for the whole job, from the observed
    /// consumption rate.
    pub overall_eta: f64,
}

/// One failed file in a job result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileError {
    pub file: String,
    pub error: String,
}

/// Final accounting of a job, produced exactly once when it ends.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobResult {
    /// Files accepted at job start. Fixed even when the job is cancelled
    /// before reaching all of them.
    pub total_files: usize,
    pub successful: usize,
    pub failed: usize,
    /// Per-file failures, in processing order.
    pub errors: Vec<FileError>,
}

impl JobResult {
    pub(crate) fn new(total_files: usize) -> Self {
        Self {
            total_files,
            successful: 0,
            failed: 0,
            errors: Vec::new(),
        }
    }
}

/// Errors surfaced synchronously by the job entry points.
#[derive(Debug, Error)]
pub enum JobError {
    /// A job is already running; concurrent jobs are never queued or merged.
    #[error("a conversion job is already in progress")]
    Conflict,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_result_wire_shape() {
        let mut result = JobResult::new(4);
        result.successful = 3;
        result.failed = 1;
        result.errors.push(FileError {
            file: "bad.flac".to_string(),
            error: "ffmpeg exited with code 1".to_string(),
        });

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["totalFiles"], 4);
        assert_eq!(json["successful"], 3);
        assert_eq!(json["failed"], 1);
        assert_eq!(json["errors"][0]["file"], "bad.flac");
    }

    #[test]
    fn test_progress_wire_shape_is_camel_case() {
        let progress = JobProgress {
            current_file: "a.flac".to_string(),
            current_file_index: 1,
            total_files: 2,
            file_progress: 10.0,
            file_eta: 54.0,
            overall_progress: 5.0,
            overall_eta: 114.0,
        };
        let json = serde_json::to_value(&progress).unwrap();
        assert!(json.get("fileEta").is_some());
        assert!(json.get("overallEta").is_some());
        assert!(json.get("file_eta").is_none());
    }
}
