//! Local extension directory scan.
//!
//! Only the immediate children of the scan root are considered. A child
//! qualifies when it is a real directory (not a symlink) holding an
//! `extension.json` descriptor that is itself a regular file under the size
//! ceiling and declares a namespaced provider.

use std::collections::BinaryHeap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::DESCRIPTOR_FILENAME;
use crate::descriptor::PackageDescriptor;
use crate::error::Result;

/// Default cap on directories inspected per scan.
pub const DEFAULT_MAX_DIRS: usize = 200;

/// Default ceiling for a descriptor file.
pub const DEFAULT_MAX_DESCRIPTOR_BYTES: u64 = 100 * 1024;

/// An extension found by the local scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalExtension {
    /// Directory name under the scan root.
    pub dir_name: String,
    /// Absolute (or root-relative) path of the extension directory.
    pub path: PathBuf,
    pub provider: String,
    /// Namespace prefixes and the directories they map to.
    pub namespaces: Vec<(String, PathBuf)>,
}

/// Scans a directory of locally developed extensions.
#[derive(Debug, Clone)]
pub struct LocalScanner {
    max_dirs: usize,
    max_descriptor_bytes: u64,
}

impl Default for LocalScanner {
    fn default() -> Self {
        Self {
            max_dirs: DEFAULT_MAX_DIRS,
            max_descriptor_bytes: DEFAULT_MAX_DESCRIPTOR_BYTES,
        }
    }
}

impl LocalScanner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_dirs(mut self, max_dirs: usize) -> Self {
        self.max_dirs = max_dirs;
        self
    }

    pub fn with_max_descriptor_bytes(mut self, bytes: u64) -> Self {
        self.max_descriptor_bytes = bytes;
        self
    }

    /// Scan `root`, returning extensions sorted by directory name.
    ///
    /// At most `max_dirs` directories are held and inspected: the first ones
    /// by name, whatever order the filesystem lists them in. A missing or
    /// unreadable root yields an empty list.
    pub fn scan(&self, root: &Path) -> Vec<LocalExtension> {
        let read_dir = match fs::read_dir(root) {
            Ok(rd) => rd,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(root = %root.display(), "local extension root does not exist");
                return Vec::new();
            }
            Err(e) => {
                tracing::warn!(root = %root.display(), error = %e, "cannot read local extension root");
                return Vec::new();
            }
        };

        // only the `max_dirs` smallest names are kept while listing
        let mut found = 0usize;
        let mut kept: BinaryHeap<(String, PathBuf)> = BinaryHeap::new();
        let candidates = read_dir
            .filter_map(|entry| entry.ok())
            .filter(|entry| {
                // file_type() does not follow symlinks
                entry.file_type().map(|t| t.is_dir()).unwrap_or(false)
            })
            .filter_map(|entry| {
                let name = entry.file_name().to_str()?.to_string();
                (!name.starts_with('.')).then(|| (name, entry.path()))
            });
        for candidate in candidates {
            found += 1;
            kept.push(candidate);
            if kept.len() > self.max_dirs {
                kept.pop();
            }
        }

        if found > self.max_dirs {
            tracing::warn!(
                root = %root.display(),
                found,
                limit = self.max_dirs,
                "too many local extension directories, scanning only the first ones"
            );
        }

        kept.into_sorted_vec()
            .into_iter()
            .filter_map(|(name, path)| match self.inspect(&name, &path) {
                Ok(found) => found,
                Err(e) => {
                    tracing::warn!(dir = %path.display(), error = %e, "skipping local extension");
                    None
                }
            })
            .collect()
    }

    fn inspect(&self, dir_name: &str, dir: &Path) -> Result<Option<LocalExtension>> {
        let descriptor_path = dir.join(DESCRIPTOR_FILENAME);
        let metadata = match fs::symlink_metadata(&descriptor_path) {
            Ok(m) => m,
            Err(_) => return Ok(None),
        };
        if metadata.file_type().is_symlink() {
            tracing::debug!(path = %descriptor_path.display(), "ignoring symlinked descriptor");
            return Ok(None);
        }

        let content = ext_fs::io::read_bounded(&descriptor_path, self.max_descriptor_bytes)?;
        let descriptor = PackageDescriptor::from_json(&content)?;
        let provider = descriptor.require_provider(&descriptor_path)?.to_string();

        let namespaces = descriptor
            .autoload
            .namespaces
            .iter()
            .map(|(prefix, rel)| (prefix.clone(), dir.join(rel)))
            .collect();

        Ok(Some(LocalExtension {
            dir_name: dir_name.to_string(),
            path: dir.to_path_buf(),
            provider,
            namespaces,
        }))
    }
}
