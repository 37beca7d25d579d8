//! Persisted discovery results.
//!
//! The artifact is a JSON document holding the ordered identifier list and
//! the time it was written:
//!
//! ```json
//! { "generated_at": "2024-05-01T12:00:00Z", "providers": ["A", "B"] }
//! ```
//!
//! Writes are atomic (temp file, rename, existence check) and the file is
//! made world-readable but owner-writable. Reads never fail: a missing,
//! unreadable, malformed, or stale artifact means "no cache".

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Size ceiling for the artifact.
pub const MAX_CACHE_BYTES: u64 = 4 * 1024 * 1024;

/// Permission bits applied after each write (unix only).
pub const CACHE_FILE_MODE: u32 = 0o644;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheArtifact {
    pub generated_at: DateTime<Utc>,
    pub providers: Vec<String>,
}

impl CacheArtifact {
    pub fn new(providers: Vec<String>) -> Self {
        Self {
            generated_at: Utc::now(),
            providers,
        }
    }

    /// Age at `now`, or `None` when the timestamp lies in the future.
    pub fn age_at(&self, now: DateTime<Utc>) -> Option<chrono::Duration> {
        let age = now.signed_duration_since(self.generated_at);
        (age >= chrono::Duration::zero()).then_some(age)
    }

    /// Whether the artifact is usable at `now` under `ttl` (`None` = unlimited).
    pub fn is_fresh_at(&self, ttl: Option<Duration>, now: DateTime<Utc>) -> bool {
        let Some(age) = self.age_at(now) else {
            return false;
        };
        match ttl.map(chrono::Duration::from_std) {
            None => true,
            Some(Ok(ttl)) => age <= ttl,
            // TTL too large to represent
            Some(Err(_)) => true,
        }
    }
}

/// Reads and writes the cache artifact at one path.
#[derive(Debug, Clone)]
pub struct ProviderCache {
    path: PathBuf,
}

impl ProviderCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The cached identifier list if the artifact is fresh under `ttl`.
    pub fn load(&self, ttl: Option<Duration>) -> Option<Vec<String>> {
        self.load_at(ttl, Utc::now())
    }

    pub fn load_at(&self, ttl: Option<Duration>, now: DateTime<Utc>) -> Option<Vec<String>> {
        let artifact = match self.read() {
            Ok(Some(artifact)) => artifact,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "ignoring unreadable provider cache");
                return None;
            }
        };

        if !artifact.is_fresh_at(ttl, now) {
            tracing::debug!(
                path = %self.path.display(),
                generated_at = %artifact.generated_at,
                "provider cache is stale"
            );
            return None;
        }

        tracing::debug!(
            path = %self.path.display(),
            count = artifact.providers.len(),
            "provider cache hit"
        );
        Some(artifact.providers)
    }

    /// Read the artifact regardless of age. `Ok(None)` when it does not exist.
    pub fn read(&self) -> Result<Option<CacheArtifact>> {
        let content = match ext_fs::io::read_bounded(&self.path, MAX_CACHE_BYTES) {
            Ok(content) => content,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| Error::InvalidCache {
                path: self.path.clone(),
                reason: e.to_string(),
            })
    }

    /// Atomically write `providers` with the current timestamp.
    pub fn store(&self, providers: &[String]) -> Result<()> {
        let artifact = CacheArtifact::new(providers.to_vec());
        self.store_artifact(&artifact)
    }

    pub fn store_artifact(&self, artifact: &CacheArtifact) -> Result<()> {
        let content = serde_json::to_vec_pretty(artifact)?;
        ext_fs::io::write_atomic(&self.path, &content)?;
        ext_fs::io::restrict_permissions(&self.path, CACHE_FILE_MODE)?;
        tracing::info!(
            path = %self.path.display(),
            count = artifact.providers.len(),
            "wrote provider cache"
        );
        Ok(())
    }

    /// Remove the artifact. Returns whether a file was removed.
    pub fn clear(&self) -> Result<bool> {
        Ok(ext_fs::io::remove_if_exists(&self.path)?)
    }
}
