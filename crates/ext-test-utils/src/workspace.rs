//! [`TestWorkspace`] builder for extension discovery scenarios.

use std::fs;
use std::path::{Path, PathBuf};

use ext_meta::{CacheConfig, ExtensionsConfig};
use serde_json::Value;
use tempfile::TempDir;

use crate::fixtures;

/// Directory holding local extensions, relative to the workspace root.
pub const LOCAL_DIR: &str = "extensions";
/// Package registry location, relative to the workspace root.
pub const REGISTRY_PATH: &str = "vendor/installed.json";
/// Provider cache location, relative to the workspace root.
pub const CACHE_PATH: &str = "storage/cache/providers.json";

/// A temporary application root with helpers for laying out extensions.
///
/// # Example
///
/// ```rust,no_run
/// use ext_test_utils::TestWorkspace;
///
/// let ws = TestWorkspace::new();
/// ws.add_local_extension("blog", "Extensions.Blog.BlogServiceProvider");
/// ws.write_registry(&[("acme/shop", "Acme.Shop.ShopProvider")]);
/// let config = ws.config();
/// assert!(config.local_path.is_some());
/// ```
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl Default for TestWorkspace {
    fn default() -> Self {
        Self::new()
    }
}

impl TestWorkspace {
    /// Create an empty temporary directory.
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().unwrap(),
        }
    }

    /// Return the root path of the temporary directory.
    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn local_root(&self) -> PathBuf {
        self.root().join(LOCAL_DIR)
    }

    pub fn registry_path(&self) -> PathBuf {
        self.root().join(REGISTRY_PATH)
    }

    pub fn cache_path(&self) -> PathBuf {
        self.root().join(CACHE_PATH)
    }

    /// Configuration pointing at this workspace's scan root, registry, and cache.
    pub fn config(&self) -> ExtensionsConfig {
        ExtensionsConfig {
            local_path: Some(self.local_root()),
            manifest_path: Some(self.registry_path()),
            cache: CacheConfig {
                path: Some(self.cache_path()),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Write `content` to `rel` under the root, creating parent directories.
    pub fn write_file(&self, rel: &str, content: &str) -> PathBuf {
        let path = self.root().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }

    /// Write a flat-list package registry of extension packages.
    pub fn write_registry(&self, packages: &[(&str, &str)]) -> PathBuf {
        let list: Vec<Value> = packages
            .iter()
            .map(|(name, provider)| fixtures::extension_package(name, provider))
            .collect();
        self.write_registry_value(&Value::Array(list))
    }

    /// Write an arbitrary registry document.
    pub fn write_registry_value(&self, value: &Value) -> PathBuf {
        self.write_file(REGISTRY_PATH, &serde_json::to_string_pretty(value).unwrap())
    }

    /// Create `extensions/<dir_name>/extension.json` declaring `provider`.
    pub fn add_local_extension(&self, dir_name: &str, provider: &str) -> PathBuf {
        let descriptor = fixtures::local_descriptor(provider);
        self.add_local_extension_raw(dir_name, &serde_json::to_string_pretty(&descriptor).unwrap())
    }

    /// Create `extensions/<dir_name>/extension.json` with raw content.
    pub fn add_local_extension_raw(&self, dir_name: &str, descriptor: &str) -> PathBuf {
        let dir = self.local_root().join(dir_name);
        fs::create_dir_all(dir.join("src")).unwrap();
        fs::write(dir.join("extension.json"), descriptor).unwrap();
        dir
    }

    /// Assert that `path` (relative to the root) exists.
    ///
    /// # Panics
    /// Panics with a descriptive message if the path does not exist.
    pub fn assert_file_exists(&self, path: &str) {
        let full_path = self.root().join(path);
        assert!(
            full_path.exists(),
            "Expected file to exist: {}",
            full_path.display()
        );
    }

    /// Assert that `path` (relative to the root) does **not** exist.
    ///
    /// # Panics
    /// Panics with a descriptive message if the path exists.
    pub fn assert_file_not_exists(&self, path: &str) {
        let full_path = self.root().join(path);
        assert!(
            !full_path.exists(),
            "Expected file NOT to exist: {}",
            full_path.display()
        );
    }
}
