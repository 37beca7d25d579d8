//! Namespace loader contract.
//!
//! Locally scanned extensions declare which directories back which namespace
//! prefixes. Those mappings are handed to the host's loader before the
//! locator returns, so every identifier it reports can be resolved.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

/// A loader accepting namespace-to-directory registrations.
pub trait NamespaceLoader: Send {
    /// Map `prefix` to `path`. With `prepend`, the path is searched before any
    /// previously registered ones for the same prefix.
    fn add_namespace(&mut self, prefix: &str, path: &Path, prepend: bool);
}

/// In-memory loader keeping every registered mapping.
#[derive(Debug, Clone, Default)]
pub struct NamespaceMap {
    prefixes: BTreeMap<String, Vec<PathBuf>>,
}

impl NamespaceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Search paths for `prefix`, highest precedence first.
    pub fn paths_for(&self, prefix: &str) -> &[PathBuf] {
        self.prefixes.get(prefix).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Find the longest registered prefix owning `identifier`.
    pub fn resolve(&self, identifier: &str) -> Option<(&str, &Path)> {
        self.prefixes
            .iter()
            .filter(|(prefix, _)| owns(prefix, identifier))
            .max_by_key(|(prefix, _)| prefix.len())
            .and_then(|(prefix, paths)| paths.first().map(|p| (prefix.as_str(), p.as_path())))
    }

    pub fn len(&self) -> usize {
        self.prefixes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prefixes.is_empty()
    }
}

fn owns(prefix: &str, identifier: &str) -> bool {
    let prefix = prefix.trim_end_matches(['.', '\\', ':']);
    identifier
        .strip_prefix(prefix)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with(['.', '\\', ':']))
}

impl NamespaceLoader for NamespaceMap {
    fn add_namespace(&mut self, prefix: &str, path: &Path, prepend: bool) {
        let paths = self.prefixes.entry(prefix.to_string()).or_default();
        if paths.iter().any(|p| p == path) {
            return;
        }
        if prepend {
            paths.insert(0, path.to_path_buf());
        } else {
            paths.push(path.to_path_buf());
        }
    }
}

/// Forwards namespace mappings to a loader, each at most once.
///
/// Owned by the orchestrator so the "already registered" set lives exactly as
/// long as the process's discovery state.
pub struct LoaderRegistrar {
    loader: Box<dyn NamespaceLoader>,
    registered: HashSet<(String, PathBuf)>,
    order: Vec<(String, PathBuf)>,
}

impl Default for LoaderRegistrar {
    fn default() -> Self {
        Self::new(Box::new(NamespaceMap::new()))
    }
}

impl std::fmt::Debug for LoaderRegistrar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoaderRegistrar")
            .field("registered", &self.order)
            .finish_non_exhaustive()
    }
}

impl LoaderRegistrar {
    pub fn new(loader: Box<dyn NamespaceLoader>) -> Self {
        Self {
            loader,
            registered: HashSet::new(),
            order: Vec::new(),
        }
    }

    /// Register a local mapping. Returns `false` if it was already registered.
    ///
    /// Local mappings are prepended so they win over installed packages.
    pub fn register(&mut self, prefix: &str, path: &Path) -> bool {
        let key = (prefix.to_string(), path.to_path_buf());
        if !self.registered.insert(key.clone()) {
            return false;
        }
        self.loader.add_namespace(prefix, path, true);
        tracing::debug!(prefix = %prefix, path = %path.display(), "registered extension namespace");
        self.order.push(key);
        true
    }

    /// Every mapping forwarded so far, in registration order.
    pub fn mappings(&self) -> &[(String, PathBuf)] {
        &self.order
    }
}
