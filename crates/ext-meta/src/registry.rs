//! Descriptive metadata registry
//!
//! Maps provider identifiers to human-facing information about the
//! extension behind them. Nothing here affects discovery or ordering.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Descriptive information about one extension.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ExtensionMetadata {
    /// Display name.
    pub name: String,
    /// Version string as published by the extension.
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    /// Free-form extra fields.
    #[serde(default)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl ExtensionMetadata {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Keyed store of extension metadata.
///
/// # Example
///
/// ```
/// use ext_meta::{ExtensionMetadata, MetadataRegistry};
///
/// let mut registry = MetadataRegistry::new();
/// registry.set("Extensions.Blog.BlogServiceProvider", ExtensionMetadata::new("Blog"));
/// assert_eq!(
///     registry.get("Extensions.Blog.BlogServiceProvider").map(|m| m.name.as_str()),
///     Some("Blog")
/// );
/// ```
#[derive(Debug, Clone, Default)]
pub struct MetadataRegistry {
    entries: BTreeMap<String, ExtensionMetadata>,
}

impl MetadataRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store metadata for a provider, replacing any previous entry.
    pub fn set(&mut self, provider: impl Into<String>, metadata: ExtensionMetadata) {
        self.entries.insert(provider.into(), metadata);
    }

    pub fn get(&self, provider: &str) -> Option<&ExtensionMetadata> {
        self.entries.get(provider)
    }

    pub fn has(&self, provider: &str) -> bool {
        self.entries.contains_key(provider)
    }

    pub fn remove(&mut self, provider: &str) -> Option<ExtensionMetadata> {
        self.entries.remove(provider)
    }

    /// All entries, ordered by provider identifier.
    pub fn all(&self) -> impl Iterator<Item = (&str, &ExtensionMetadata)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
