//! Extraction and placement of downloaded tool, core, and plugin
//! archives.
//!
//! Extraction shells out to `7z` the same way the launcher always has —
//! there is no pure-Rust 7z decoder in reach that handles every format
//! publishers use (zip, rar, 7z).

use crate::layout::EXTRACTING_EXTENSIONS;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("I/O error on {path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },
    #[error("7z exited with status {0}")]
    ExtractionFailed(std::process::ExitStatus),
    #[error("no file extension on {0}")]
    NoExtension(PathBuf),
}

fn extension_of(path: &Path) -> Option<&str> {
    path.extension().and_then(|e| e.to_str())
}

/// Whether `path` names a file this module knows how to extract.
pub fn needs_extraction(path: &Path) -> bool {
    extension_of(path)
        .map(|ext| EXTRACTING_EXTENSIONS.contains(&ext))
        .unwrap_or(false)
}

/// Runs `7z x <archive> -o<dest_dir>`, creating `dest_dir` first.
pub fn extract(sevenzip_path: &Path, archive: &Path, dest_dir: &Path) -> Result<(), ArchiveError> {
    std::fs::create_dir_all(dest_dir).map_err(|source| ArchiveError::Io {
        path: dest_dir.to_path_buf(),
        source,
    })?;

    let mut out_arg = std::ffi::OsString::from("-o");
    out_arg.push(dest_dir.as_os_str());

    let status = std::process::Command::new(sevenzip_path)
        .arg("x")
        .arg(archive)
        .arg(out_arg)
        .status()
        .map_err(|source| ArchiveError::Io {
            path: sevenzip_path.to_path_buf(),
            source,
        })?;

    if !status.success() {
        return Err(ArchiveError::ExtractionFailed(status));
    }
    Ok(())
}

/// Finds the first file under `dir` (recursively) whose extension
/// matches `extension`.
pub fn find_file_with_extension(dir: &Path, extension: &str) -> Option<PathBuf> {
    let mut stack = vec![dir.to_path_buf()];
    while let Some(current) = stack.pop() {
        let Ok(entries) = std::fs::read_dir(&current) else {
            continue;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
            } else if extension_of(&path) == Some(extension) {
                return Some(path);
            }
        }
    }
    None
}

/// Moves `source` under `destination_dir`, keeping its file name, and
/// creates `destination_dir` first if needed.
pub fn place_file(source: &Path, destination_dir: &Path) -> Result<PathBuf, ArchiveError> {
    std::fs::create_dir_all(destination_dir).map_err(|err| ArchiveError::Io {
        path: destination_dir.to_path_buf(),
        source: err,
    })?;
    let file_name = source.file_name().ok_or_else(|| ArchiveError::NoExtension(source.to_path_buf()))?;
    let destination = destination_dir.join(file_name);
    std::fs::rename(source, &destination).map_err(|err| ArchiveError::Io {
        path: destination.clone(),
        source: err,
    })?;
    Ok(destination)
}

/// Moves a directory (or its sole contents) into place the way
/// extracted plugin/tool collections are placed: if `source` is itself
/// a directory it's renamed wholesale onto `destination_dir`; if it's a
/// file it lands inside `destination_dir` under its own name.
pub fn place_collection(source: &Path, destination_dir: &Path) -> Result<PathBuf, ArchiveError> {
    if source.is_dir() {
        if let Some(parent) = destination_dir.parent() {
            std::fs::create_dir_all(parent).map_err(|err| ArchiveError::Io {
                path: parent.to_path_buf(),
                source: err,
            })?;
        }
        std::fs::rename(source, destination_dir).map_err(|err| ArchiveError::Io {
            path: destination_dir.to_path_buf(),
            source: err,
        })?;
        Ok(destination_dir.to_path_buf())
    } else {
        place_file(source, destination_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn needs_extraction_recognizes_known_archive_types() {
        assert!(needs_extraction(Path::new("nestopia.dll.zip")));
        assert!(needs_extraction(Path::new("bios.7z")));
        assert!(!needs_extraction(Path::new("gamecontrollerdb.txt")));
    }

    #[test]
    fn find_file_with_extension_walks_subdirectories() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a/b");
        std::fs::create_dir_all(&nested).unwrap();
        let target = nested.join("core.dll");
        std::fs::write(&target, b"fake").unwrap();

        let found = find_file_with_extension(dir.path(), "dll").unwrap();
        assert_eq!(found, target);
    }

    #[test]
    fn place_file_moves_into_destination_keeping_name() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("source.bin");
        std::fs::write(&source, b"data").unwrap();
        let dest_dir = dir.path().join("dest");

        let placed = place_file(&source, &dest_dir).unwrap();
        assert_eq!(placed, dest_dir.join("source.bin"));
        assert!(placed.exists());
        assert!(!source.exists());
    }

    #[test]
    fn place_collection_renames_directory_wholesale() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("extracted");
        std::fs::create_dir_all(source.join("sub")).unwrap();
        std::fs::write(source.join("sub/file.txt"), b"x").unwrap();
        let dest = dir.path().join("final");

        let placed = place_collection(&source, &dest).unwrap();
        assert_eq!(placed, dest);
        assert!(dest.join("sub/file.txt").exists());
    }
}
