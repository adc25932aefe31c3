//! Library folder scanning and structure classification.
//!
//! The scanner walks a library folder, classifies its layout, and determines
//! which source files still need a converted counterpart. All state it
//! produces is value-like; nothing here mutates after construction.

mod types;

pub use types::{FolderStructure, ScanError, ScanResult, SourceFile};

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::warn;

/// Lossless source extension.
pub const SOURCE_EXT: &str = "flac";

/// Compressed target extension.
pub const TARGET_EXT: &str = "m4a";

/// Whether a file name carries the source extension (case-insensitive).
pub(crate) fn has_source_extension(name: &str) -> bool {
    Path::new(name)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case(SOURCE_EXT))
}

/// Relative path of the converted counterpart for a source file.
pub fn converted_relative_path(relative: &Path) -> PathBuf {
    relative.with_extension(TARGET_EXT)
}

/// Classifies the layout of a library folder.
///
/// Any filesystem error during classification yields [`FolderStructure::Empty`]
/// rather than failing the scan.
pub async fn detect_structure(dir: &Path) -> FolderStructure {
    match classify(dir).await {
        Ok(structure) => structure,
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "structure classification failed, treating folder as empty");
            FolderStructure::Empty
        }
    }
}

async fn classify(dir: &Path) -> std::io::Result<FolderStructure> {
    let mut entries = fs::read_dir(dir).await?;

    let mut has_source_folder = false;
    let mut has_source_files = false;
    let mut other_subdirs: Vec<PathBuf> = Vec::new();

    while let Some(entry) = entries.next_entry().await? {
        let file_type = entry.file_type().await?;
        let name = entry.file_name().to_string_lossy().to_lowercase();

        if file_type.is_dir() {
            if name == SOURCE_EXT {
                has_source_folder = true;
            } else if name != TARGET_EXT {
                other_subdirs.push(entry.path());
            }
        } else if file_type.is_file() && has_source_extension(&name) {
            has_source_files = true;
        }
    }

    if has_source_folder {
        return Ok(FolderStructure::AlreadyOrganized);
    }

    if has_source_files && other_subdirs.is_empty() {
        return Ok(FolderStructure::Flat);
    }

    for subdir in &other_subdirs {
        if dir_contains_source_file(subdir).await? {
            return Ok(FolderStructure::AlbumFolders);
        }
    }

    if has_source_files {
        return Ok(FolderStructure::Mixed);
    }

    Ok(FolderStructure::Empty)
}

/// Only the immediate children of an album candidate are inspected.
async fn dir_contains_source_file(dir: &Path) -> std::io::Result<bool> {
    let mut entries = fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        if has_source_extension(&entry.file_name().to_string_lossy()) {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Recursively collects all source files under `root`.
///
/// Traversal is depth-first with an explicit work stack; within a directory,
/// files are collected in listing order before its subdirectories are
/// descended. The resulting order is deterministic for an unmodified folder
/// and is the order files are later converted in. A directory that cannot be
/// read is logged and skipped, excluding its subtree without aborting the
/// scan. Canonicalized directories are tracked so cyclic symlinks terminate.
pub async fn find_source_files(root: &Path) -> Vec<SourceFile> {
    let mut files = Vec::new();
    let mut visited: HashSet<PathBuf> = HashSet::new();
    let mut stack: Vec<PathBuf> = vec![root.to_path_buf()];

    while let Some(dir) = stack.pop() {
        let canonical = match fs::canonicalize(&dir).await {
            Ok(canonical) => canonical,
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "skipping unresolvable directory");
                continue;
            }
        };
        if !visited.insert(canonical) {
            // Symlink cycle or duplicate route into the same directory.
            continue;
        }

        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "skipping unreadable directory");
                continue;
            }
        };

        let mut subdirs: Vec<PathBuf> = Vec::new();
        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            let (is_dir, is_file) = match entry.file_type().await {
                Ok(ft) if ft.is_symlink() => match fs::metadata(&path).await {
                    Ok(meta) => (meta.is_dir(), meta.is_file()),
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "skipping broken symlink");
                        continue;
                    }
                },
                Ok(ft) => (ft.is_dir(), ft.is_file()),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping unreadable entry");
                    continue;
                }
            };

            if is_dir {
                subdirs.push(path);
            } else if is_file {
                let name = entry.file_name().to_string_lossy().into_owned();
                if has_source_extension(&name) {
                    let relative_path = path
                        .strip_prefix(root)
                        .map(Path::to_path_buf)
                        .unwrap_or_else(|_| path.clone());
                    files.push(SourceFile {
                        path,
                        relative_path,
                        name,
                    });
                }
            }
        }

        // Reversed so the stack pops subdirectories in listing order.
        subdirs.reverse();
        stack.extend(subdirs);
    }

    files
}

/// Whether a source file still needs conversion.
///
/// The sole criterion is the absence of a file at the mirrored target path;
/// no content hashing or timestamp comparison.
pub async fn needs_conversion(file: &SourceFile, target_root: &Path) -> bool {
    let target = target_root.join(converted_relative_path(&file.relative_path));
    !fs::try_exists(&target).await.unwrap_or(false)
}

/// Scans a library folder: classification, discovery, and conversion filter.
pub async fn scan_folder(path: &Path) -> Result<ScanResult, ScanError> {
    let metadata = fs::metadata(path).await.map_err(|_| ScanError::InvalidInput {
        path: path.to_path_buf(),
    })?;
    if !metadata.is_dir() {
        return Err(ScanError::InvalidInput {
            path: path.to_path_buf(),
        });
    }

    let structure = detect_structure(path).await;

    let (source_root, target_root) = match structure {
        FolderStructure::AlreadyOrganized => (path.join(SOURCE_EXT), path.join(TARGET_EXT)),
        _ => (path.to_path_buf(), path.join(TARGET_EXT)),
    };

    let all_files = find_source_files(&source_root).await;
    let total_files = all_files.len();

    let mut needs = Vec::new();
    for file in all_files {
        if needs_conversion(&file, &target_root).await {
            needs.push(file);
        }
    }

    Ok(ScanResult {
        source_root,
        target_root,
        structure,
        total_files,
        already_converted: total_files - needs.len(),
        needs_conversion: needs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.unwrap();
        }
        fs::write(path, b"").await.unwrap();
    }

    #[tokio::test]
    async fn test_detect_structure_already_organized() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("FLAC")).await.unwrap();
        assert_eq!(
            detect_structure(temp.path()).await,
            FolderStructure::AlreadyOrganized
        );
    }

    #[tokio::test]
    async fn test_detect_structure_flat() {
        let temp = TempDir::new().unwrap();
        touch(&temp.path().join("track.flac")).await;
        assert_eq!(detect_structure(temp.path()).await, FolderStructure::Flat);
    }

    #[tokio::test]
    async fn test_detect_structure_flat_ignores_output_folder() {
        let temp = TempDir::new().unwrap();
        touch(&temp.path().join("track.flac")).await;
        fs::create_dir(temp.path().join("m4a")).await.unwrap();
        assert_eq!(detect_structure(temp.path()).await, FolderStructure::Flat);
    }

    #[tokio::test]
    async fn test_detect_structure_album_folders() {
        let temp = TempDir::new().unwrap();
        touch(&temp.path().join("Album One/01.flac")).await;
        touch(&temp.path().join("Album Two/01.flac")).await;
        assert_eq!(
            detect_structure(temp.path()).await,
            FolderStructure::AlbumFolders
        );
    }

    #[tokio::test]
    async fn test_detect_structure_mixed() {
        let temp = TempDir::new().unwrap();
        touch(&temp.path().join("loose.flac")).await;
        fs::create_dir(temp.path().join("covers")).await.unwrap();
        assert_eq!(detect_structure(temp.path()).await, FolderStructure::Mixed);
    }

    #[tokio::test]
    async fn test_detect_structure_empty() {
        let temp = TempDir::new().unwrap();
        touch(&temp.path().join("notes.txt")).await;
        assert_eq!(detect_structure(temp.path()).await, FolderStructure::Empty);
    }

    #[tokio::test]
    async fn test_detect_structure_missing_folder_is_empty() {
        assert_eq!(
            detect_structure(Path::new("/nonexistent/folder")).await,
            FolderStructure::Empty
        );
    }

    #[tokio::test]
    async fn test_find_source_files_recursive_case_insensitive() {
        let temp = TempDir::new().unwrap();
        touch(&temp.path().join("a.flac")).await;
        touch(&temp.path().join("album/b.FLAC")).await;
        touch(&temp.path().join("album/cover.jpg")).await;
        touch(&temp.path().join("album/disc2/c.flac")).await;

        let files = find_source_files(temp.path()).await;
        assert_eq!(files.len(), 3);
        let names: Vec<&str> = files.iter().map(|f| f.name.as_str()).collect();
        assert!(names.contains(&"a.flac"));
        assert!(names.contains(&"b.FLAC"));
        assert!(names.contains(&"c.flac"));

        let b = files.iter().find(|f| f.name == "b.FLAC").unwrap();
        assert_eq!(b.relative_path, PathBuf::from("album/b.FLAC"));
    }

    #[tokio::test]
    async fn test_find_source_files_deterministic_order() {
        let temp = TempDir::new().unwrap();
        for name in ["z.flac", "a.flac", "m/1.flac", "m/2.flac", "b.flac"] {
            touch(&temp.path().join(name)).await;
        }

        let first = find_source_files(temp.path()).await;
        let second = find_source_files(temp.path()).await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_find_source_files_lists_directory_files_before_descending() {
        let temp = TempDir::new().unwrap();
        touch(&temp.path().join("top.flac")).await;
        touch(&temp.path().join("album/deep.flac")).await;

        let files = find_source_files(temp.path()).await;
        assert_eq!(files[0].name, "top.flac");
        assert_eq!(files[1].name, "deep.flac");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_find_source_files_survives_symlink_cycle() {
        let temp = TempDir::new().unwrap();
        touch(&temp.path().join("album/track.flac")).await;
        std::os::unix::fs::symlink(temp.path(), temp.path().join("album/loop")).unwrap();

        let files = find_source_files(temp.path()).await;
        // Terminates, and the file is reported exactly once.
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].name, "track.flac");
    }

    #[tokio::test]
    async fn test_needs_conversion_checks_mirrored_target() {
        let temp = TempDir::new().unwrap();
        let source_root = temp.path().join("flac");
        let target_root = temp.path().join("m4a");
        touch(&source_root.join("album/song.flac")).await;

        let file = SourceFile {
            path: source_root.join("album/song.flac"),
            relative_path: PathBuf::from("album/song.flac"),
            name: "song.flac".to_string(),
        };

        assert!(needs_conversion(&file, &target_root).await);

        touch(&target_root.join("album/song.m4a")).await;
        assert!(!needs_conversion(&file, &target_root).await);
    }

    #[tokio::test]
    async fn test_scan_folder_counts_are_consistent() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("flac")).await.unwrap();
        touch(&temp.path().join("flac/one.flac")).await;
        touch(&temp.path().join("flac/two.flac")).await;
        touch(&temp.path().join("flac/three.flac")).await;
        touch(&temp.path().join("m4a/two.m4a")).await;

        let result = scan_folder(temp.path()).await.unwrap();
        assert_eq!(result.structure, FolderStructure::AlreadyOrganized);
        assert_eq!(result.source_root, temp.path().join("flac"));
        assert_eq!(result.target_root, temp.path().join("m4a"));
        assert_eq!(result.total_files, 3);
        assert_eq!(result.needs_conversion.len(), 2);
        assert_eq!(
            result.already_converted + result.needs_conversion.len(),
            result.total_files
        );
    }

    #[tokio::test]
    async fn test_scan_folder_flat_targets_output_subfolder() {
        let temp = TempDir::new().unwrap();
        touch(&temp.path().join("one.flac")).await;

        let result = scan_folder(temp.path()).await.unwrap();
        assert_eq!(result.structure, FolderStructure::Flat);
        assert_eq!(result.source_root, temp.path());
        assert_eq!(result.target_root, temp.path().join("m4a"));
        assert_eq!(result.needs_conversion.len(), 1);
    }

    #[tokio::test]
    async fn test_scan_folder_snapshot_is_not_retroactive() {
        let temp = TempDir::new().unwrap();
        touch(&temp.path().join("one.flac")).await;

        let before = scan_folder(temp.path()).await.unwrap();
        assert_eq!(before.needs_conversion.len(), 1);

        // Converting after the scan must not change the returned value,
        // only a fresh scan observes it.
        touch(&temp.path().join("m4a/one.m4a")).await;
        assert_eq!(before.needs_conversion.len(), 1);
        assert_eq!(before.already_converted, 0);

        let after = scan_folder(temp.path()).await.unwrap();
        assert_eq!(after.needs_conversion.len(), 0);
        assert_eq!(after.already_converted, 1);
    }

    #[tokio::test]
    async fn test_scan_folder_invalid_path() {
        let result = scan_folder(Path::new("/definitely/not/here")).await;
        assert!(matches!(result, Err(ScanError::InvalidInput { .. })));
    }

    #[tokio::test]
    async fn test_scan_folder_rejects_file_path() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("song.flac");
        touch(&file).await;

        let result = scan_folder(&file).await;
        assert!(matches!(result, Err(ScanError::InvalidInput { .. })));
    }

    #[test]
    fn test_converted_relative_path_swaps_extension() {
        assert_eq!(
            converted_relative_path(Path::new("album/song.flac")),
            PathBuf::from("album/song.m4a")
        );
        assert_eq!(
            converted_relative_path(Path::new("SONG.FLAC")),
            PathBuf::from("SONG.m4a")
        );
    }
}
