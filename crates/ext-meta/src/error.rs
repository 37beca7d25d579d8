//! Error types for ext-meta

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Filesystem error: {0}")]
    Fs(#[from] ext_fs::Error),

    #[error("Invalid environment: {value}")]
    InvalidEnvironment { value: String },
}
