//! The provider contract and the contexts handed to its lifecycle hooks.
//!
//! A provider is the entry point of one extension. The orchestrator calls
//! [`Provider::register`] on every provider in boot order, then
//! [`Provider::boot`] in the same order once all registrations are done.
//! Providers do not keep a handle on the container; each hook receives a
//! context borrowing what it may touch during that phase.

use ext_meta::{ExtensionMetadata, MetadataRegistry};
use ext_services::{CompileReport, ContainerBuilder, ServiceCompiler, ServiceMap};

/// Result type for provider hooks
pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

/// Errors a provider hook may report
///
/// A failing hook never aborts startup; the orchestrator logs it and skips
/// the provider.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// Free-form failure raised by the provider itself
    #[error("{0}")]
    Message(String),

    /// The provider's service map was rejected
    #[error(transparent)]
    Services(#[from] ext_services::Error),
}

impl ProviderError {
    pub fn msg(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }
}

/// Lifecycle hooks of an extension.
///
/// Only the identifier-independent behavior lives here: the identifier a
/// provider is known by is the key it was registered under in the
/// [`ProviderCatalog`](crate::ProviderCatalog).
pub trait Provider: Send {
    /// Lower boots earlier among providers with no unmet dependency.
    fn priority(&self) -> i32 {
        0
    }

    /// Identifiers that must boot before this provider.
    ///
    /// Identifiers that are not loaded are ignored.
    fn boot_after(&self) -> Vec<String> {
        Vec::new()
    }

    /// Declarative services compiled by the default [`register`](Self::register).
    fn services(&self) -> ServiceMap {
        ServiceMap::new()
    }

    /// Descriptive information recorded when the provider is instantiated.
    fn metadata(&self) -> Option<ExtensionMetadata> {
        None
    }

    /// Register services. The default compiles [`services`](Self::services).
    fn register(&mut self, ctx: &mut RegisterContext<'_>) -> ProviderResult<()> {
        let services = self.services();
        if !services.is_empty() {
            ctx.compile(&services)?;
        }
        Ok(())
    }

    /// Start the extension after every provider has registered.
    fn boot(&mut self, _ctx: &BootContext<'_>) -> ProviderResult<()> {
        Ok(())
    }
}

/// What a provider may touch during `register`.
pub struct RegisterContext<'a> {
    provider: &'a str,
    container: &'a mut dyn ContainerBuilder,
    compiler: &'a mut ServiceCompiler,
    metadata: &'a mut MetadataRegistry,
}

impl<'a> RegisterContext<'a> {
    pub(crate) fn new(
        provider: &'a str,
        container: &'a mut dyn ContainerBuilder,
        compiler: &'a mut ServiceCompiler,
        metadata: &'a mut MetadataRegistry,
    ) -> Self {
        Self {
            provider,
            container,
            compiler,
            metadata,
        }
    }

    /// Identifier of the provider being registered.
    pub fn provider_id(&self) -> &str {
        self.provider
    }

    /// Compile a service map on behalf of this provider.
    pub fn compile(&mut self, services: &ServiceMap) -> ProviderResult<CompileReport> {
        Ok(self
            .compiler
            .compile(self.provider, services, &mut *self.container)?)
    }

    /// Direct container access for registrations a service map cannot express.
    pub fn container(&mut self) -> &mut dyn ContainerBuilder {
        &mut *self.container
    }

    pub fn metadata(&mut self) -> &mut MetadataRegistry {
        &mut *self.metadata
    }
}

/// What a provider may read during `boot`.
pub struct BootContext<'a> {
    provider: &'a str,
    container: &'a dyn ContainerBuilder,
    metadata: &'a MetadataRegistry,
}

impl<'a> BootContext<'a> {
    pub(crate) fn new(
        provider: &'a str,
        container: &'a dyn ContainerBuilder,
        metadata: &'a MetadataRegistry,
    ) -> Self {
        Self {
            provider,
            container,
            metadata,
        }
    }

    pub fn provider_id(&self) -> &str {
        self.provider
    }

    pub fn container(&self) -> &dyn ContainerBuilder {
        self.container
    }

    pub fn metadata(&self) -> &MetadataRegistry {
        self.metadata
    }
}
