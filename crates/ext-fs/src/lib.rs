//! Filesystem helpers for the extension host
//!
//! Everything the discovery path touches on disk goes through here: size-capped
//! reads for registries and descriptors, atomic writes for the provider cache,
//! and format-agnostic loading of configuration files.

pub mod config;
pub mod error;
pub mod io;

pub use config::ConfigStore;
pub use error::{Error, Result};
