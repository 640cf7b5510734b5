use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tokio::fs;
use tracing::debug;
use walkdir::WalkDir;
use crate::utils::{OptimizerError, OptimizerResult};

/// Recursively list regular files under `root` as absolute paths.
///
/// Directories are descended into but never emitted, and symlinks are not
/// followed. An unreadable root is an error; unreadable entries below it are
/// logged and skipped. No ordering is guaranteed.
pub fn walk(root: impl AsRef<Path>) -> OptimizerResult<Vec<PathBuf>> {
    let root = root.as_ref();
    let root = std::path::absolute(root).map_err(|e| OptimizerError::io(root, e))?;

    // Surface an unreadable root to the caller instead of yielding nothing silently
    std::fs::read_dir(&root).map_err(|e| OptimizerError::io(&root, e))?;

    let mut files = Vec::new();
    for entry in WalkDir::new(&root).follow_links(false) {
        match entry {
            Ok(entry) if entry.file_type().is_file() => files.push(entry.into_path()),
            Ok(_) => {}
            Err(e) => debug!("Skipping unreadable entry under {}: {}", root.display(), e),
        }
    }

    Ok(files)
}

/// Modification time and byte length of a file.
pub async fn stat_file(path: impl AsRef<Path>) -> OptimizerResult<(SystemTime, u64)> {
    let path = path.as_ref();
    let meta = fs::metadata(path)
        .await
        .map_err(|e| OptimizerError::io(path, e))?;
    let mtime = meta.modified().map_err(|e| OptimizerError::io(path, e))?;
    Ok((mtime, meta.len()))
}
