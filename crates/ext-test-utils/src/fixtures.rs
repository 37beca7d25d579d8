//! JSON builders for registry entries and local descriptors.

use serde_json::{Value, json};

/// Package type that marks an extension in the registry.
pub const EXTENSION_TYPE: &str = "framework-extension";

/// A registry entry for an extension package.
pub fn extension_package(name: &str, provider: &str) -> Value {
    json!({
        "name": name,
        "type": EXTENSION_TYPE,
        "version": "1.0.0",
        "extra": { "framework": { "provider": provider } }
    })
}

/// A registry entry for an extension package with a minimum framework version.
pub fn extension_package_with_min(name: &str, provider: &str, min_version: &str) -> Value {
    json!({
        "name": name,
        "type": EXTENSION_TYPE,
        "version": "1.0.0",
        "extra": { "framework": { "provider": provider, "minVersion": min_version } }
    })
}

/// A registry entry for an ordinary library package.
pub fn library_package(name: &str) -> Value {
    json!({ "name": name, "type": "library", "version": "1.0.0" })
}

/// An `extension.json` mapping the provider's own namespace to `src/`.
///
/// `Extensions.Blog.BlogServiceProvider` maps `Extensions.Blog` to `src`.
pub fn local_descriptor(provider: &str) -> Value {
    let namespace = provider
        .rsplit_once('.')
        .map(|(ns, _)| ns)
        .unwrap_or(provider);
    json!({
        "name": namespace.to_lowercase().replace('.', "/"),
        "extra": { "framework": { "provider": provider } },
        "autoload": { "namespaces": { namespace: "src" } }
    })
}
