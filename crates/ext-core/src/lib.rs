//! Extension lifecycle orchestration
//!
//! This crate ties the lower layers together:
//!
//! - **Provider contract**: the [`Provider`] trait with `register`/`boot` hooks
//! - **Catalog**: identifier-to-factory lookup, filled at link time or by hand
//! - **Boot order**: priority pre-sort plus Kahn's algorithm with cycle fallback
//! - **Cache**: atomic JSON artifact of the discovered identifier list
//! - **Orchestrator**: the discover → register → boot state machine
//!
//! # Architecture
//!
//! ```text
//!                     host application
//!                            |
//!                        ext-core
//!                            |
//!      +----------+----------+-----------+
//!      |          |          |           |
//!   ext-fs    ext-meta  ext-discovery ext-services
//! ```
//!
//! # Example
//!
//! ```
//! use ext_core::{Orchestrator, Provider, ProviderCatalog};
//! use ext_meta::{Environment, ExtensionsConfig};
//! use ext_services::{ServiceMap, ServiceSpec};
//!
//! struct BlogServiceProvider;
//!
//! impl Provider for BlogServiceProvider {
//!     fn services(&self) -> ServiceMap {
//!         ServiceMap::new().service("blog.posts", ServiceSpec::new().class("Extensions.Blog.Posts"))
//!     }
//! }
//!
//! let catalog = ProviderCatalog::new()
//!     .with("Extensions.Blog.BlogServiceProvider", || Box::new(BlogServiceProvider));
//!
//! let mut config = ExtensionsConfig::default();
//! config.app.enabled = vec!["Extensions.Blog.BlogServiceProvider".to_string()];
//!
//! let mut orchestrator = Orchestrator::new(config, Environment::Development, catalog);
//! orchestrator.boot().unwrap();
//! assert!(orchestrator.has_provider("Extensions.Blog.BlogServiceProvider"));
//! ```

pub mod cache;
pub mod catalog;
pub mod error;
pub mod graph;
pub mod orchestrator;
pub mod provider;

// Re-exported for `register_provider!`
pub use inventory;

pub use cache::{CacheArtifact, ProviderCache};
pub use catalog::{ProviderCatalog, ProviderFactory, ProviderRegistration};
pub use error::{Error, Result};
pub use graph::{BootOrder, DependencyGraph, DependencyNode};
pub use orchestrator::{Orchestrator, OrchestratorState, Phase, ProviderFailure};
pub use provider::{BootContext, Provider, ProviderError, ProviderResult, RegisterContext};
