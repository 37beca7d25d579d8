//! Installed-package registry reader.
//!
//! The registry is a JSON file written by the package installer. Two shapes
//! are accepted:
//!
//! - a flat list of descriptors, either bare (`[{...}, ...]`) or wrapped as
//!   `{"packages": [...]}`; each descriptor carries its own `name`
//! - a map of package name to descriptor, either bare or wrapped as
//!   `{"versions": {...}}`
//!
//! Only descriptors with `type = "framework-extension"` and a namespaced
//! `extra.framework.provider` are kept. Reading never fails: a missing or
//! malformed registry is logged and yields no entries, so a broken install
//! cannot block host startup.

use std::collections::BTreeMap;
use std::path::Path;

use semver::Version;
use serde_json::Value;

use crate::EXTENSION_TYPE;
use crate::descriptor::PackageDescriptor;
use crate::error::{Error, Result};

/// Largest registry file the reader will load.
pub const MAX_REGISTRY_BYTES: u64 = 16 * 1024 * 1024;

/// One accepted extension package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    pub package: String,
    pub provider: String,
    pub version: Option<String>,
    pub min_version: Option<String>,
}

/// Accepted entries keyed (and therefore ordered) by package name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManifestEntries {
    entries: BTreeMap<String, ManifestEntry>,
}

impl ManifestEntries {
    pub fn get(&self, package: &str) -> Option<&ManifestEntry> {
        self.entries.get(package)
    }

    /// Entries in package-name order.
    pub fn iter(&self) -> impl Iterator<Item = &ManifestEntry> {
        self.entries.values()
    }

    /// Provider identifiers in package-name order.
    pub fn provider_ids(&self) -> Vec<String> {
        self.iter().map(|e| e.provider.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Reads extension entries out of the installed-package registry.
#[derive(Debug, Clone, Default)]
pub struct ManifestReader {
    framework_version: Option<Version>,
}

impl ManifestReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Skip packages whose `minVersion` is above `version`.
    pub fn with_framework_version(mut self, version: Option<Version>) -> Self {
        self.framework_version = version;
        self
    }

    /// Read the registry at `path`. Never fails; see the module docs.
    pub fn read(&self, path: &Path) -> ManifestEntries {
        let content = match ext_fs::io::read_bounded(path, MAX_REGISTRY_BYTES) {
            Ok(content) => content,
            Err(e) if e.is_not_found() => {
                tracing::debug!(path = %path.display(), "package registry not found");
                return ManifestEntries::default();
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to read package registry");
                return ManifestEntries::default();
            }
        };

        match self.try_parse(&content) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring malformed package registry");
                ManifestEntries::default()
            }
        }
    }

    /// Parse registry content. Never fails; see the module docs.
    pub fn parse(&self, content: &str) -> ManifestEntries {
        self.try_parse(content).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "ignoring malformed package registry");
            ManifestEntries::default()
        })
    }

    fn try_parse(&self, content: &str) -> Result<ManifestEntries> {
        let root: Value = serde_json::from_str(content)?;
        let mut entries = ManifestEntries::default();

        for (name, raw) in Self::packages(root)? {
            let Some(package) = name.or_else(|| {
                raw.get("name").and_then(Value::as_str).map(str::to_string)
            }) else {
                continue;
            };

            if raw.get("type").and_then(Value::as_str) != Some(EXTENSION_TYPE) {
                continue;
            }

            let descriptor = match PackageDescriptor::from_value(raw) {
                Ok(d) => d,
                Err(e) => {
                    tracing::warn!(package = %package, error = %e, "skipping malformed package descriptor");
                    continue;
                }
            };

            let Some(provider) = descriptor.provider() else {
                tracing::debug!(package = %package, "extension package declares no namespaced provider");
                continue;
            };

            if !self.satisfies_min_version(&package, descriptor.min_version()) {
                continue;
            }

            let entry = ManifestEntry {
                package: package.clone(),
                provider: provider.to_string(),
                version: descriptor.version.clone(),
                min_version: descriptor.min_version().map(str::to_string),
            };
            entries.entries.entry(package).or_insert(entry);
        }

        Ok(entries)
    }

    /// Flatten either registry shape into `(name-from-key, descriptor)` pairs.
    fn packages(root: Value) -> Result<Vec<(Option<String>, Value)>> {
        match root {
            Value::Array(list) => Ok(list.into_iter().map(|v| (None, v)).collect()),
            Value::Object(mut map) => {
                if let Some(Value::Array(list)) = map.remove("packages") {
                    return Ok(list.into_iter().map(|v| (None, v)).collect());
                }
                let map = match map.remove("versions") {
                    Some(Value::Object(versions)) => versions,
                    _ => map,
                };
                Ok(map
                    .into_iter()
                    .filter(|(_, v)| v.is_object())
                    .map(|(k, v)| (Some(k), v))
                    .collect())
            }
            other => Err(Error::InvalidRegistry {
                reason: format!("expected an object or array, found {}", type_name(&other)),
            }),
        }
    }

    fn satisfies_min_version(&self, package: &str, min_version: Option<&str>) -> bool {
        let (Some(current), Some(raw)) = (&self.framework_version, min_version) else {
            return true;
        };
        match parse_min_version(raw) {
            Some(required) if *current < required => {
                tracing::warn!(
                    package = %package,
                    required = %required,
                    current = %current,
                    "skipping extension that requires a newer framework"
                );
                false
            }
            Some(_) => true,
            None => {
                tracing::warn!(package = %package, min_version = %raw, "unparsable minVersion, keeping package");
                true
            }
        }
    }
}

/// Parse a lenient minimum version such as `2`, `v2.1`, or `>=2.1.3`.
pub fn parse_min_version(raw: &str) -> Option<Version> {
    let trimmed = raw
        .trim()
        .trim_start_matches(">=")
        .trim_start_matches('^')
        .trim_start_matches('v')
        .trim();
    if let Ok(version) = Version::parse(trimmed) {
        return Some(version);
    }

    let parts: Vec<&str> = trimmed.split('.').collect();
    if parts.is_empty() || parts.len() > 3 {
        return None;
    }
    let mut numbers = [0u64; 3];
    for (slot, part) in numbers.iter_mut().zip(&parts) {
        *slot = part.parse().ok()?;
    }
    Some(Version::new(numbers[0], numbers[1], numbers[2]))
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
