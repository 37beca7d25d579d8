//! Identifier-to-factory registry for providers.
//!
//! Discovery only yields strings. The catalog turns an identifier into a
//! provider instance. Extensions add themselves either at link time with
//! [`register_provider!`](crate::register_provider) or explicitly through
//! [`ProviderCatalog::register`]. An identifier without a catalog entry is
//! not loadable and is skipped by the orchestrator.

use std::collections::BTreeMap;
use std::fmt;

use crate::provider::Provider;

/// Builds a fresh provider instance.
pub type ProviderFactory = Box<dyn Fn() -> Box<dyn Provider> + Send + Sync>;

/// A link-time provider registration collected through `inventory`.
pub struct ProviderRegistration {
    pub id: &'static str,
    pub factory: fn() -> Box<dyn Provider>,
}

impl ProviderRegistration {
    pub const fn new(id: &'static str, factory: fn() -> Box<dyn Provider>) -> Self {
        Self { id, factory }
    }
}

inventory::collect!(ProviderRegistration);

/// Register a provider type under an identifier at link time.
///
/// The type must implement [`Provider`] and `Default`.
///
/// ```ignore
/// #[derive(Default)]
/// struct BlogServiceProvider;
///
/// impl ext_core::Provider for BlogServiceProvider {}
///
/// ext_core::register_provider!("Extensions.Blog.BlogServiceProvider", BlogServiceProvider);
/// ```
#[macro_export]
macro_rules! register_provider {
    ($id:expr, $ty:ty) => {
        $crate::inventory::submit! {
            $crate::ProviderRegistration::new($id, || {
                ::std::boxed::Box::new(<$ty as ::std::default::Default>::default())
                    as ::std::boxed::Box<dyn $crate::Provider>
            })
        }
    };
}

/// Maps provider identifiers to factories.
///
/// The first registration of an identifier wins.
#[derive(Default)]
pub struct ProviderCatalog {
    factories: BTreeMap<String, ProviderFactory>,
}

impl fmt::Debug for ProviderCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderCatalog")
            .field("ids", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ProviderCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// A catalog holding every [`register_provider!`](crate::register_provider)
    /// registration linked into the binary.
    pub fn from_inventory() -> Self {
        let mut catalog = Self::new();
        // inventory iteration order is unspecified; sort so duplicate
        // resolution does not depend on link order
        let mut registrations: Vec<&ProviderRegistration> =
            inventory::iter::<ProviderRegistration>.into_iter().collect();
        registrations.sort_by_key(|r| r.id);
        for registration in registrations {
            catalog.register(registration.id, registration.factory);
        }
        tracing::debug!(count = catalog.len(), "collected linked provider registrations");
        catalog
    }

    /// Add a factory. Returns `false` (and keeps the existing entry) when the
    /// identifier is already registered.
    pub fn register<F>(&mut self, id: impl Into<String>, factory: F) -> bool
    where
        F: Fn() -> Box<dyn Provider> + Send + Sync + 'static,
    {
        let id = id.into();
        if self.factories.contains_key(&id) {
            tracing::warn!(provider = %id, "provider already registered in catalog, keeping the first");
            return false;
        }
        self.factories.insert(id, Box::new(factory));
        true
    }

    /// Builder form of [`register`](Self::register).
    pub fn with<F>(mut self, id: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Box<dyn Provider> + Send + Sync + 'static,
    {
        self.register(id, factory);
        self
    }

    pub fn contains(&self, id: &str) -> bool {
        self.factories.contains_key(id)
    }

    /// A new instance for `id`, or `None` when it is not loadable.
    pub fn instantiate(&self, id: &str) -> Option<Box<dyn Provider>> {
        self.factories.get(id).map(|factory| factory())
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}
