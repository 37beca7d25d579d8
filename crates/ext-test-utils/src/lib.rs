//! Shared test utilities for the extension-host workspace.
//!
//! This crate provides standardised fixtures to eliminate duplication
//! across crate test suites. It is a dev-dependency only, never published.
//!
//! # Modules
//!
//! - [`fixtures`]: JSON builders for registry entries and local descriptors
//! - [`workspace`]: [`TestWorkspace`](workspace::TestWorkspace) builder for
//!   an application root with extensions, a package registry, and a cache

pub mod fixtures;
pub mod workspace;

pub use workspace::TestWorkspace;
