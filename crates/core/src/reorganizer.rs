//! One-shot reorganization of a flat library into the reserved subfolder.
//!
//! Moves every source file sitting directly in a folder into a new `flac`
//! subfolder, so a later scan classifies the folder as already organized.
//! Purely a filesystem operation; no concurrency or progress concerns.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tracing::info;

use crate::scanner::{has_source_extension, SOURCE_EXT};

/// Outcome of a successful reorganization.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReorganizeResult {
    pub success: bool,
    pub moved_files: usize,
    pub flac_folder: PathBuf,
}

/// Errors that can occur while reorganizing.
#[derive(Debug, Error)]
pub enum ReorganizeError {
    /// The requested path is missing or not a directory.
    #[error("invalid folder path: {path}")]
    InvalidInput { path: PathBuf },

    /// The reserved subfolder already exists.
    #[error("folder already has a flac subfolder")]
    AlreadyOrganized,

    /// No source files sit directly under the folder.
    #[error("no flac files found in folder")]
    NothingToMove,

    /// Filesystem error while moving files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Moves all top-level source files into a new reserved subfolder.
///
/// Files inside subdirectories are left untouched.
pub async fn reorganize_folder(path: &Path) -> Result<ReorganizeResult, ReorganizeError> {
    let metadata = fs::metadata(path)
        .await
        .map_err(|_| ReorganizeError::InvalidInput {
            path: path.to_path_buf(),
        })?;
    if !metadata.is_dir() {
        return Err(ReorganizeError::InvalidInput {
            path: path.to_path_buf(),
        });
    }

    let flac_folder = path.join(SOURCE_EXT);
    if fs::try_exists(&flac_folder).await? {
        return Err(ReorganizeError::AlreadyOrganized);
    }

    let mut to_move = Vec::new();
    let mut entries = fs::read_dir(path).await?;
    while let Some(entry) = entries.next_entry().await? {
        let file_type = entry.file_type().await?;
        if file_type.is_file() && has_source_extension(&entry.file_name().to_string_lossy()) {
            to_move.push(entry.file_name());
        }
    }

    if to_move.is_empty() {
        return Err(ReorganizeError::NothingToMove);
    }

    fs::create_dir_all(&flac_folder).await?;

    let mut moved_files = 0;
    for name in to_move {
        fs::rename(path.join(&name), flac_folder.join(&name)).await?;
        moved_files += 1;
    }

    info!(folder = %path.display(), moved_files, "reorganized flat folder");

    Ok(ReorganizeResult {
        success: true,
        moved_files,
        flac_folder,
    })
}
