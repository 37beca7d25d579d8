//! Configuration and metadata for the extension host.
//!
//! This crate provides the recognized configuration options, the
//! production/development environment signal, and a keyed registry of
//! descriptive extension metadata.

pub mod config;
pub mod error;
pub mod registry;

pub use config::{CacheConfig, Environment, ExtensionsConfig, ScopeLists};
pub use error::{Error, Result};
pub use registry::{ExtensionMetadata, MetadataRegistry};
