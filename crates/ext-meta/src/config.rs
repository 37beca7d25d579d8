//! Configuration types for extension discovery
//!
//! The options mirror the host's `extensions` configuration block. Two scopes
//! carry the same list options: `app` (owned by the application) and
//! `extensions` (owned by the extension layer's own defaults).

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default cache TTL outside production.
pub const DEFAULT_DEVELOPMENT_TTL_SECS: u64 = 5;

/// Deployment environment.
///
/// Production freezes discovery: dev-only lists and the local filesystem scan
/// are ignored and the provider cache is written and trusted indefinitely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Production,
    #[default]
    Development,
}

impl Environment {
    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }
}

impl FromStr for Environment {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let value = s.trim().to_lowercase();
        match value.as_str() {
            "" => Err(Error::InvalidEnvironment {
                value: s.to_string(),
            }),
            "production" | "prod" => Ok(Environment::Production),
            _ => Ok(Environment::Development),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Production => write!(f, "production"),
            Environment::Development => write!(f, "development"),
        }
    }
}

/// Provider lists for one configuration scope.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScopeLists {
    /// Exclusive allow-list. When non-empty every other source is ignored.
    #[serde(default)]
    pub only: Option<Vec<String>>,
    /// Providers enabled in every environment, in boot-preference order.
    #[serde(default)]
    pub enabled: Vec<String>,
    /// Providers enabled outside production only.
    #[serde(default)]
    pub dev_only: Vec<String>,
    /// Blacklist applied after merging.
    #[serde(default)]
    pub disabled: Vec<String>,
}

impl ScopeLists {
    /// The exclusive allow-list, if one is configured and non-empty.
    pub fn allow_list(&self) -> Option<&[String]> {
        self.only.as_deref().filter(|list| !list.is_empty())
    }
}

/// Provider cache settings.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Location of the cache artifact. Caching is off when unset.
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// TTL in production. Absent or zero means unlimited.
    #[serde(default)]
    pub production_ttl_secs: Option<u64>,
    /// TTL outside production. Defaults to [`DEFAULT_DEVELOPMENT_TTL_SECS`].
    #[serde(default)]
    pub development_ttl_secs: Option<u64>,
}

impl CacheConfig {
    /// Maximum artifact age for `env`; `None` means the artifact never expires.
    pub fn ttl_for(&self, env: Environment) -> Option<Duration> {
        match env {
            Environment::Production => self
                .production_ttl_secs
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
            Environment::Development => Some(Duration::from_secs(
                self.development_ttl_secs
                    .unwrap_or(DEFAULT_DEVELOPMENT_TTL_SECS),
            )),
        }
    }
}

fn default_scan_manifest() -> bool {
    true
}

/// Recognized extension discovery options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtensionsConfig {
    /// Application scope lists.
    #[serde(default)]
    pub app: ScopeLists,
    /// Extension scope lists.
    #[serde(default)]
    pub extensions: ScopeLists,
    /// Root directory scanned for local extensions (non-production only).
    #[serde(default)]
    pub local_path: Option<PathBuf>,
    /// Whether the installed-package registry is scanned.
    #[serde(default = "default_scan_manifest", alias = "scan_composer")]
    pub scan_manifest: bool,
    /// Location of the installed-package registry.
    #[serde(default)]
    pub manifest_path: Option<PathBuf>,
    /// Running framework version, checked against each package's `minVersion`.
    #[serde(default)]
    pub framework_version: Option<semver::Version>,
    #[serde(default)]
    pub cache: CacheConfig,
}

impl Default for ExtensionsConfig {
    fn default() -> Self {
        Self {
            app: ScopeLists::default(),
            extensions: ScopeLists::default(),
            local_path: None,
            scan_manifest: default_scan_manifest(),
            manifest_path: None,
            framework_version: None,
            cache: CacheConfig::default(),
        }
    }
}

impl ExtensionsConfig {
    /// Load the configuration from a TOML, JSON, or YAML file.
    pub fn load(path: &Path) -> Result<Self> {
        let config: Self = ext_fs::ConfigStore::new().load(path)?;
        tracing::debug!(path = %path.display(), "loaded extensions config");
        Ok(config)
    }

    /// Resolve every relative path option against `base`.
    pub fn rooted_at(mut self, base: &Path) -> Self {
        let root = |p: &mut Option<PathBuf>| {
            if let Some(path) = p.as_mut().filter(|path| path.is_relative()) {
                *path = base.join(&*path);
            }
        };
        root(&mut self.local_path);
        root(&mut self.manifest_path);
        root(&mut self.cache.path);
        self
    }

    /// The union of both blacklists.
    pub fn disabled(&self) -> impl Iterator<Item = &str> {
        self.app
            .disabled
            .iter()
            .chain(self.extensions.disabled.iter())
            .map(String::as_str)
    }
}
