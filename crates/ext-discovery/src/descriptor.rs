//! Package descriptors.
//!
//! The same JSON shape describes an entry in the installed-package registry
//! and the `extension.json` file of a local extension:
//!
//! ```json
//! {
//!   "name": "acme/blog",
//!   "type": "framework-extension",
//!   "version": "1.4.0",
//!   "extra": {
//!     "framework": {
//!       "provider": "Extensions.Blog.BlogServiceProvider",
//!       "minVersion": "2.0"
//!     }
//!   },
//!   "autoload": {
//!     "namespaces": { "Extensions.Blog": "src" }
//!   }
//! }
//! ```
//!
//! Unknown fields are ignored; both files are owned by other tools.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::identifier::is_namespaced;

/// A package or local extension descriptor.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PackageDescriptor {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "type")]
    pub package_type: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub extra: Extra,
    #[serde(default)]
    pub autoload: Autoload,
}

/// The `extra` block. Only the `framework` key is read.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Extra {
    #[serde(default)]
    pub framework: Option<FrameworkExtra>,
}

/// Framework-specific metadata declared by an extension package.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FrameworkExtra {
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default, rename = "minVersion", alias = "min_version")]
    pub min_version: Option<String>,
}

/// Namespace-to-directory mapping, relative to the descriptor's directory.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Autoload {
    #[serde(default)]
    pub namespaces: BTreeMap<String, String>,
}

impl PackageDescriptor {
    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }

    /// The declared provider, if it is a non-empty namespaced identifier.
    pub fn provider(&self) -> Option<&str> {
        self.framework()
            .and_then(|f| f.provider.as_deref())
            .map(str::trim)
            .filter(|p| is_namespaced(p))
    }

    pub fn min_version(&self) -> Option<&str> {
        self.framework().and_then(|f| f.min_version.as_deref())
    }

    pub fn framework(&self) -> Option<&FrameworkExtra> {
        self.extra.framework.as_ref()
    }

    /// Whether the descriptor declares the reserved extension package type.
    pub fn is_extension_package(&self) -> bool {
        self.package_type.as_deref() == Some(crate::EXTENSION_TYPE)
    }

    /// Require a usable provider, reporting why it is missing otherwise.
    pub fn require_provider(&self, path: &Path) -> Result<&str> {
        let declared = self.framework().and_then(|f| f.provider.as_deref());
        match declared {
            None => Err(Error::InvalidDescriptor {
                path: path.to_path_buf(),
                reason: "missing extra.framework.provider".to_string(),
            }),
            Some(raw) => self.provider().ok_or_else(|| Error::InvalidDescriptor {
                path: path.to_path_buf(),
                reason: format!("provider '{raw}' is not a namespaced identifier"),
            }),
        }
    }
}
