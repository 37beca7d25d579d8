//! Provider discovery for the extension host.
//!
//! Discovery merges three kinds of sources into one ordered, duplicate-free
//! list of provider identifiers:
//!
//! - configuration lists (`only`, `enabled`, `dev_only`, `disabled`) in the
//!   app and extension scopes
//! - a scan of local extension directories (non-production only)
//! - the installed-package registry
//!
//! The [`Locator`] applies the precedence rules; the other modules read the
//! individual sources.

pub mod descriptor;
pub mod error;
pub mod identifier;
pub mod loader;
pub mod locator;
pub mod manifest;
pub mod scan;

/// Package `type` that marks an installed package as an extension.
pub const EXTENSION_TYPE: &str = "framework-extension";

/// Descriptor file expected at the root of each local extension directory.
pub const DESCRIPTOR_FILENAME: &str = "extension.json";

pub use descriptor::{FrameworkExtra, PackageDescriptor};
pub use error::{Error, Result};
pub use identifier::is_namespaced;
pub use loader::{LoaderRegistrar, NamespaceLoader, NamespaceMap};
pub use locator::{DiscoveryEntry, DiscoverySource, Locator};
pub use manifest::{ManifestEntries, ManifestEntry, ManifestReader};
pub use scan::{LocalExtension, LocalScanner};
