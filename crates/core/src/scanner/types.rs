//! Types for the scanner module.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// A lossless source file discovered under a scan root.
///
/// Identity is the absolute path; instances are never mutated after the scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceFile {
    /// Absolute path to the file.
    pub path: PathBuf,
    /// Path relative to the scan root, reused to mirror the folder layout
    /// under the target root.
    pub relative_path: PathBuf,
    /// File name for display and event payloads.
    pub name: String,
}

/// Classified layout of a library folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FolderStructure {
    /// A reserved `flac` subfolder exists; output goes to a sibling `m4a`.
    AlreadyOrganized,
    /// Source files sit directly in the folder with no other subfolders.
    Flat,
    /// Subfolders (albums) contain the source files.
    AlbumFolders,
    /// Source files at the top level alongside unrelated subfolders.
    Mixed,
    /// No source files found (or the folder could not be read).
    Empty,
}

/// Result of scanning a library folder.
///
/// Built fresh per scan request and never mutated after return; creating or
/// removing converted files afterwards does not change an already-returned
/// result.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResult {
    /// Effective root that was scanned for source files.
    pub source_root: PathBuf,
    /// Root under which converted files are (or will be) mirrored.
    pub target_root: PathBuf,
    /// Classified layout of the requested folder.
    pub structure: FolderStructure,
    /// Total number of source files found under the source root.
    pub total_files: usize,
    /// Files without a converted counterpart, in processing order.
    pub needs_conversion: Vec<SourceFile>,
    /// Files that already have a converted counterpart.
    pub already_converted: usize,
}

/// Errors that can occur while scanning.
///
/// Read failures below the root are recovered per-directory instead of
/// surfacing here, so only an unusable root is an error.
#[derive(Debug, Error)]
pub enum ScanError {
    /// The requested path is missing or not a directory.
    #[error("invalid folder path: {path}")]
    InvalidInput { path: PathBuf },
}
