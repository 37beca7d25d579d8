//! Error types for ext-core

use std::path::PathBuf;

/// Result type for ext-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that abort an orchestrator operation
///
/// Everything else (unknown providers, failing hooks, dependency cycles,
/// unreadable sources) is logged and recorded as a failure instead.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The cache artifact could not be decoded
    #[error("Invalid cache artifact at {path}: {reason}")]
    InvalidCache { path: PathBuf, reason: String },

    /// A cache operation was requested without a configured cache path
    #[error("No provider cache path configured")]
    CacheNotConfigured,

    /// Boot was requested after discovery failed its integrity check
    #[error("Boot refused: {reason}")]
    BootRefused { reason: String },

    // Transparent wrappers for underlying crate errors
    /// Filesystem error from ext-fs
    #[error(transparent)]
    Fs(#[from] ext_fs::Error),

    /// Configuration error from ext-meta
    #[error(transparent)]
    Meta(#[from] ext_meta::Error),

    /// Discovery error from ext-discovery
    #[error(transparent)]
    Discovery(#[from] ext_discovery::Error),

    /// Service compilation or reference integrity error from ext-services
    #[error(transparent)]
    Services(#[from] ext_services::Error),

    /// JSON serialization error
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
