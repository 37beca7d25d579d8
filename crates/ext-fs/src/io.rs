//! Bounded reads and atomic writes

use std::fs::{self, OpenOptions};
use std::io::{Read, Write};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use fs2::FileExt;

use crate::{Error, Result};

static TEMP_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// Write content atomically to a file.
///
/// Uses write-to-temp-then-rename so readers in other processes observe either
/// the previous file or the complete new one. The temp file lives in the same
/// directory as the target to keep the rename on one filesystem. After the
/// rename the target is checked for existence.
pub fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }

    let temp_name = format!(
        ".{}.{}.{}.tmp",
        path.file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default(),
        std::process::id(),
        TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
    );
    let temp_path = path.with_file_name(&temp_name);

    let result = write_temp(&temp_path, path, content);
    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
        return result;
    }

    fs::rename(&temp_path, path).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        Error::io(path, e)
    })?;

    if !path.is_file() {
        return Err(Error::WriteNotVerified {
            path: path.to_path_buf(),
        });
    }

    tracing::debug!(path = %path.display(), bytes = content.len(), "wrote file atomically");
    Ok(())
}

fn write_temp(temp_path: &Path, target: &Path, content: &[u8]) -> Result<()> {
    let mut temp_file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(temp_path)
        .map_err(|e| Error::io(temp_path, e))?;

    temp_file.lock_exclusive().map_err(|_| Error::LockFailed {
        path: target.to_path_buf(),
    })?;

    temp_file
        .write_all(content)
        .map_err(|e| Error::io(temp_path, e))?;
    temp_file.sync_all().map_err(|e| Error::io(temp_path, e))?;

    FileExt::unlock(&temp_file).map_err(|_| Error::LockFailed {
        path: target.to_path_buf(),
    })?;

    Ok(())
}

/// Restrict a file's permission bits (no-op on non-unix targets).
#[cfg(unix)]
pub fn restrict_permissions(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, fs::Permissions::from_mode(mode)).map_err(|e| Error::io(path, e))
}

/// Restrict a file's permission bits (no-op on non-unix targets).
#[cfg(not(unix))]
pub fn restrict_permissions(_path: &Path, _mode: u32) -> Result<()> {
    Ok(())
}

/// Read a regular file as UTF-8, refusing anything larger than `limit` bytes.
///
/// The size is checked from metadata first and again while reading, so a file
/// growing between the two steps is still rejected.
pub fn read_bounded(path: &Path, limit: u64) -> Result<String> {
    let metadata = fs::metadata(path).map_err(|e| Error::io(path, e))?;
    if !metadata.is_file() {
        return Err(Error::NotAFile {
            path: path.to_path_buf(),
        });
    }
    if metadata.len() > limit {
        return Err(Error::TooLarge {
            path: path.to_path_buf(),
            size: metadata.len(),
            limit,
        });
    }

    let file = fs::File::open(path).map_err(|e| Error::io(path, e))?;
    let mut content = String::new();
    let read = file
        .take(limit + 1)
        .read_to_string(&mut content)
        .map_err(|e| Error::io(path, e))?;
    if read as u64 > limit {
        return Err(Error::TooLarge {
            path: path.to_path_buf(),
            size: read as u64,
            limit,
        });
    }

    Ok(content)
}

/// Remove a file, treating "already gone" as success.
pub fn remove_if_exists(path: &Path) -> Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(Error::io(path, e)),
    }
}
