//! Multi-source provider locator.
//!
//! Precedence, highest first:
//!
//! 1. Exclusive allow-list: a non-empty `app.only`, else a non-empty
//!    `extensions.only`, is returned verbatim. Nothing else is consulted,
//!    including the blacklists.
//! 2. Otherwise the sources are concatenated in this order: `app.enabled`,
//!    `extensions.enabled`, `app.dev_only`*, `extensions.dev_only`*, the local
//!    scan* (sorted by directory name), then the package registry (sorted by
//!    package name). Sources marked * are skipped in production.
//! 3. Duplicates are removed, keeping the first occurrence.
//! 4. Identifiers in either `disabled` list are removed.
//!
//! Identical configuration and filesystem state always produce an identical
//! list, which keeps development and production discovery in step.

use std::collections::HashSet;
use std::fmt;

use ext_meta::{Environment, ExtensionsConfig};

use crate::loader::LoaderRegistrar;
use crate::manifest::ManifestReader;
use crate::scan::{LocalExtension, LocalScanner};

/// Where a discovered identifier came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiscoverySource {
    AppOnly,
    ExtensionOnly,
    AppEnabled,
    ExtensionEnabled,
    AppDevOnly,
    ExtensionDevOnly,
    Local,
    Manifest,
}

impl fmt::Display for DiscoverySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::AppOnly => "app.only",
            Self::ExtensionOnly => "extensions.only",
            Self::AppEnabled => "app.enabled",
            Self::ExtensionEnabled => "extensions.enabled",
            Self::AppDevOnly => "app.dev_only",
            Self::ExtensionDevOnly => "extensions.dev_only",
            Self::Local => "local",
            Self::Manifest => "manifest",
        };
        f.write_str(name)
    }
}

/// One identifier together with the source that contributed it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryEntry {
    pub source: DiscoverySource,
    pub identifier: String,
}

impl DiscoveryEntry {
    fn new(source: DiscoverySource, identifier: &str) -> Self {
        Self {
            source,
            identifier: identifier.to_string(),
        }
    }
}

/// Computes the ordered provider list for a configuration and environment.
///
/// The locator holds no discovery results; calling it twice re-reads every
/// source.
#[derive(Debug, Clone)]
pub struct Locator<'a> {
    config: &'a ExtensionsConfig,
    environment: Environment,
    scanner: LocalScanner,
}

impl<'a> Locator<'a> {
    pub fn new(config: &'a ExtensionsConfig, environment: Environment) -> Self {
        Self {
            config,
            environment,
            scanner: LocalScanner::default(),
        }
    }

    pub fn with_scanner(mut self, scanner: LocalScanner) -> Self {
        self.scanner = scanner;
        self
    }

    /// Ordered, duplicate-free provider identifiers.
    pub fn all(&self, registrar: &mut LoaderRegistrar) -> Vec<String> {
        self.entries(registrar)
            .into_iter()
            .map(|e| e.identifier)
            .collect()
    }

    /// Scan the local extension root and register every namespace mapping
    /// found with `registrar`. Does nothing in production or without a
    /// configured root.
    pub fn register_local(&self, registrar: &mut LoaderRegistrar) -> Vec<LocalExtension> {
        if self.environment.is_production() {
            return Vec::new();
        }
        let Some(root) = &self.config.local_path else {
            return Vec::new();
        };

        let found = self.scanner.scan(root);
        for local in &found {
            for (prefix, path) in &local.namespaces {
                registrar.register(prefix, path);
            }
        }
        found
    }

    /// Like [`all`](Self::all), keeping the source of each identifier.
    ///
    /// Namespace mappings of locally scanned extensions are registered with
    /// `registrar` before this returns.
    pub fn entries(&self, registrar: &mut LoaderRegistrar) -> Vec<DiscoveryEntry> {
        if let Some(only) = self.config.app.allow_list() {
            tracing::debug!(count = only.len(), "using exclusive app allow-list");
            return only
                .iter()
                .map(|id| DiscoveryEntry::new(DiscoverySource::AppOnly, id))
                .collect();
        }
        if let Some(only) = self.config.extensions.allow_list() {
            tracing::debug!(count = only.len(), "using exclusive extensions allow-list");
            return only
                .iter()
                .map(|id| DiscoveryEntry::new(DiscoverySource::ExtensionOnly, id))
                .collect();
        }

        let mut candidates = Vec::new();
        let push_all = |candidates: &mut Vec<DiscoveryEntry>, source: DiscoverySource, ids: &[String]| {
            candidates.extend(ids.iter().map(|id| DiscoveryEntry::new(source, id)));
        };

        push_all(&mut candidates, DiscoverySource::AppEnabled, &self.config.app.enabled);
        push_all(
            &mut candidates,
            DiscoverySource::ExtensionEnabled,
            &self.config.extensions.enabled,
        );

        if !self.environment.is_production() {
            push_all(&mut candidates, DiscoverySource::AppDevOnly, &self.config.app.dev_only);
            push_all(
                &mut candidates,
                DiscoverySource::ExtensionDevOnly,
                &self.config.extensions.dev_only,
            );

            for local in self.register_local(registrar) {
                candidates.push(DiscoveryEntry::new(DiscoverySource::Local, &local.provider));
            }
        }

        if self.config.scan_manifest {
            if let Some(path) = &self.config.manifest_path {
                let reader = ManifestReader::new()
                    .with_framework_version(self.config.framework_version.clone());
                for entry in reader.read(path).iter() {
                    candidates.push(DiscoveryEntry::new(DiscoverySource::Manifest, &entry.provider));
                }
            }
        }

        let disabled: HashSet<&str> = self.config.disabled().collect();
        let mut seen = HashSet::new();
        let result: Vec<DiscoveryEntry> = candidates
            .into_iter()
            .filter(|e| seen.insert(e.identifier.clone()))
            .filter(|e| {
                let blocked = disabled.contains(e.identifier.as_str());
                if blocked {
                    tracing::debug!(provider = %e.identifier, source = %e.source, "provider disabled by config");
                }
                !blocked
            })
            .collect();

        tracing::debug!(count = result.len(), environment = %self.environment, "located providers");
        result
    }
}

/// Convenience wrapper around [`Locator::all`].
pub fn all(
    config: &ExtensionsConfig,
    environment: Environment,
    registrar: &mut LoaderRegistrar,
) -> Vec<String> {
    Locator::new(config, environment).all(registrar)
}
