use std::path::PathBuf;

/// Errors raised while reading a discovery source.
///
/// None of these escape discovery: the locator logs them and moves on to the
/// next source. They are public so callers reading a single source directly
/// can inspect the failure.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Fs(#[from] ext_fs::Error),

    #[error("failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Registry content is valid JSON but has neither supported shape.
    #[error("unsupported package registry shape: {reason}")]
    InvalidRegistry { reason: String },

    /// A local descriptor was read but does not describe a usable provider.
    #[error("invalid extension descriptor at {path}: {reason}")]
    InvalidDescriptor { path: PathBuf, reason: String },
}

pub type Result<T> = std::result::Result<T, Error>;
