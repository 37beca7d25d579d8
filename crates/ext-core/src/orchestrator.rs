//! Discover, register, and boot extension providers.
//!
//! The orchestrator moves through three states:
//!
//! ```text
//! Undiscovered --discover()--> Discovered --boot()--> Booted
//! ```
//!
//! `discover()` loads the identifier list (from a fresh cache artifact when
//! one exists, else from the [`Locator`]), instantiates every identifier the
//! catalog knows, sorts the providers once, and runs `register` on each in
//! that order. `boot()` runs `boot` in the same order. Both are idempotent.
//!
//! A single provider failing, by error or by panic, never stops the others:
//! the failure is logged and recorded in [`failures`](Orchestrator::failures).
//! The one fatal condition is a dangling service reference after all
//! providers registered.

use std::any::Any;
use std::collections::HashSet;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;

use ext_discovery::{LoaderRegistrar, Locator};
use ext_meta::{Environment, ExtensionsConfig, MetadataRegistry};
use ext_services::{ContainerBuilder, InMemoryContainer, ReferenceIssue, ServiceCompiler};

use crate::cache::ProviderCache;
use crate::catalog::ProviderCatalog;
use crate::error::{Error, Result};
use crate::graph::DependencyGraph;
use crate::provider::{BootContext, Provider, RegisterContext};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrchestratorState {
    Undiscovered,
    Discovered,
    Booted,
}

/// Lifecycle step in which a provider was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Instantiate,
    Register,
    Boot,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Instantiate => write!(f, "instantiate"),
            Self::Register => write!(f, "register"),
            Self::Boot => write!(f, "boot"),
        }
    }
}

/// A provider skipped because of a non-fatal error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderFailure {
    pub provider: String,
    pub phase: Phase,
    pub message: String,
}

struct LoadedProvider {
    id: String,
    provider: Box<dyn Provider>,
}

/// Owns the provider lifecycle for one process.
pub struct Orchestrator<C: ContainerBuilder = InMemoryContainer> {
    config: ExtensionsConfig,
    environment: Environment,
    catalog: ProviderCatalog,
    container: C,
    compiler: ServiceCompiler,
    registrar: LoaderRegistrar,
    metadata: MetadataRegistry,
    /// Loaded providers in boot order.
    providers: Vec<LoadedProvider>,
    /// Every instantiated identifier in boot order, register failures included.
    instantiated: Vec<String>,
    state: OrchestratorState,
    cache_used: bool,
    dangling: Option<Vec<ReferenceIssue>>,
    failures: Vec<ProviderFailure>,
}

impl Orchestrator<InMemoryContainer> {
    /// An orchestrator writing into a fresh [`InMemoryContainer`].
    pub fn new(config: ExtensionsConfig, environment: Environment, catalog: ProviderCatalog) -> Self {
        Self::with_container(config, environment, catalog, InMemoryContainer::new())
    }
}

impl<C: ContainerBuilder> Orchestrator<C> {
    /// An orchestrator writing into a host-supplied container.
    ///
    /// Services already present in `container` satisfy references from
    /// provider service maps.
    pub fn with_container(
        config: ExtensionsConfig,
        environment: Environment,
        catalog: ProviderCatalog,
        container: C,
    ) -> Self {
        Self {
            config,
            environment,
            catalog,
            container,
            compiler: ServiceCompiler::new(),
            registrar: LoaderRegistrar::default(),
            metadata: MetadataRegistry::new(),
            providers: Vec::new(),
            instantiated: Vec::new(),
            state: OrchestratorState::Undiscovered,
            cache_used: false,
            dangling: None,
            failures: Vec::new(),
        }
    }

    /// Replace the loader that receives local namespace mappings.
    pub fn with_registrar(mut self, registrar: LoaderRegistrar) -> Self {
        self.registrar = registrar;
        self
    }

    /// Discover, instantiate, sort, and register providers.
    ///
    /// Runs once; later calls repeat the outcome of the first run without
    /// doing any work.
    ///
    /// # Errors
    ///
    /// Returns [`ext_services::Error::DanglingReferences`] (wrapped) when a
    /// compiled service references an id no provider or host registered.
    /// The orchestrator is still marked discovered, but every later
    /// `discover()` returns the same error and [`boot`](Self::boot) refuses
    /// to run.
    pub fn discover(&mut self) -> Result<()> {
        if self.state != OrchestratorState::Undiscovered {
            return match &self.dangling {
                Some(issues) => Err(ext_services::Error::DanglingReferences {
                    issues: issues.clone(),
                }
                .into()),
                None => Ok(()),
            };
        }

        let ids = match self.load_cache() {
            Some(ids) => {
                self.cache_used = true;
                // cached lists skip the locator, but local classes must still load
                Locator::new(&self.config, self.environment).register_local(&mut self.registrar);
                ids
            }
            None => self.locate(),
        };

        self.instantiate(&ids);
        self.sort();
        self.instantiated = self.providers.iter().map(|p| p.id.clone()).collect();
        self.register_all();
        self.state = OrchestratorState::Discovered;

        let issues = self.compiler.check_references(&self.container);
        if !issues.is_empty() {
            tracing::error!(
                count = issues.len(),
                "provider registration left dangling service references"
            );
            self.dangling = Some(issues.clone());
            return Err(ext_services::Error::DanglingReferences { issues }.into());
        }

        if self.environment.is_production() && !self.cache_used {
            self.persist_cache();
        }

        tracing::info!(
            providers = self.providers.len(),
            skipped = self.failures.len(),
            cache_used = self.cache_used,
            environment = %self.environment,
            "extension discovery complete"
        );
        Ok(())
    }

    /// Boot every registered provider in boot order.
    ///
    /// Discovers first when needed. Runs once.
    pub fn boot(&mut self) -> Result<()> {
        if self.state == OrchestratorState::Undiscovered {
            self.discover()?;
        }
        if self.state == OrchestratorState::Booted {
            return Ok(());
        }
        if self.dangling.is_some() {
            return Err(Error::BootRefused {
                reason: "service references did not resolve during discovery".to_string(),
            });
        }

        let mut failed = HashSet::new();
        for loaded in &mut self.providers {
            let ctx = BootContext::new(&loaded.id, &self.container, &self.metadata);
            let message = match guarded(|| loaded.provider.boot(&ctx)) {
                Ok(Ok(())) => continue,
                Ok(Err(e)) => e.to_string(),
                Err(panicked) => panicked,
            };
            tracing::warn!(provider = %loaded.id, error = %message, "provider failed to boot");
            self.failures.push(ProviderFailure {
                provider: loaded.id.clone(),
                phase: Phase::Boot,
                message,
            });
            failed.insert(loaded.id.clone());
        }

        self.state = OrchestratorState::Booted;
        tracing::info!(
            booted = self.providers.len() - failed.len(),
            failed = failed.len(),
            "extension boot complete"
        );
        Ok(())
    }

    /// Rebuild the cache artifact from `ids`, or from a fresh locator run
    /// when `None`, regardless of environment. Returns the artifact path.
    ///
    /// # Errors
    ///
    /// Fails when no cache path is configured or the write fails.
    pub fn write_cache_now(&mut self, ids: Option<Vec<String>>) -> Result<PathBuf> {
        let cache = self.cache().ok_or(Error::CacheNotConfigured)?;
        let ids = match ids {
            Some(ids) => ids,
            None => self.locate(),
        };
        cache.store(&ids)?;
        Ok(cache.path().to_path_buf())
    }

    /// Delete the cache artifact. Returns whether one existed.
    pub fn clear_cache(&self) -> Result<bool> {
        let cache = self.cache().ok_or(Error::CacheNotConfigured)?;
        cache.clear()
    }

    pub fn state(&self) -> OrchestratorState {
        self.state
    }

    /// Service references left unresolved by discovery, if any.
    pub fn dangling_references(&self) -> Option<&[ReferenceIssue]> {
        self.dangling.as_deref()
    }

    /// Whether discovery was served from the cache artifact.
    pub fn cache_used(&self) -> bool {
        self.cache_used
    }

    /// Identifiers of registered providers, in boot order.
    pub fn provider_ids(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.id.as_str()).collect()
    }

    pub fn has_provider(&self, id: &str) -> bool {
        self.providers.iter().any(|p| p.id == id)
    }

    pub fn metadata(&self) -> &MetadataRegistry {
        &self.metadata
    }

    pub fn failures(&self) -> &[ProviderFailure] {
        &self.failures
    }

    pub fn container(&self) -> &C {
        &self.container
    }

    /// Mutable container access, e.g. to pre-register host services before
    /// discovery.
    pub fn container_mut(&mut self) -> &mut C {
        &mut self.container
    }

    pub fn into_container(self) -> C {
        self.container
    }

    pub fn registrar(&self) -> &LoaderRegistrar {
        &self.registrar
    }

    pub fn config(&self) -> &ExtensionsConfig {
        &self.config
    }

    pub fn environment(&self) -> Environment {
        self.environment
    }

    fn cache(&self) -> Option<ProviderCache> {
        self.config.cache.path.as_ref().map(ProviderCache::new)
    }

    fn load_cache(&self) -> Option<Vec<String>> {
        let cache = self.cache()?;
        cache.load(self.config.cache.ttl_for(self.environment))
    }

    fn locate(&mut self) -> Vec<String> {
        Locator::new(&self.config, self.environment).all(&mut self.registrar)
    }

    /// Providers that failed to register stay in the artifact so the next
    /// start retries them.
    fn persist_cache(&self) {
        let Some(cache) = self.cache() else {
            return;
        };
        if let Err(e) = cache.store(&self.instantiated) {
            tracing::warn!(path = %cache.path().display(), error = %e, "could not write provider cache");
        }
    }

    fn instantiate(&mut self, ids: &[String]) {
        let mut seen = HashSet::new();
        for id in ids {
            if !seen.insert(id.as_str()) {
                continue;
            }
            let message = match guarded(|| self.catalog.instantiate(id)) {
                Ok(Some(provider)) => {
                    if let Some(metadata) = provider.metadata() {
                        self.metadata.set(id.clone(), metadata);
                    }
                    self.providers.push(LoadedProvider {
                        id: id.clone(),
                        provider,
                    });
                    continue;
                }
                Ok(None) => "identifier is not registered in the provider catalog".to_string(),
                Err(panicked) => panicked,
            };
            tracing::warn!(provider = %id, error = %message, "could not instantiate provider, skipping");
            self.failures.push(ProviderFailure {
                provider: id.clone(),
                phase: Phase::Instantiate,
                message,
            });
        }
    }

    fn sort(&mut self) {
        let mut graph = DependencyGraph::new();
        for loaded in &self.providers {
            graph.add_node(loaded.id.clone(), loaded.provider.priority());
        }
        for loaded in &self.providers {
            for dependency in loaded.provider.boot_after() {
                graph.add_dependency(&loaded.id, &dependency);
            }
        }

        let order = graph.topological_sort();
        let mut remaining: Vec<Option<LoadedProvider>> =
            std::mem::take(&mut self.providers).into_iter().map(Some).collect();
        // graph nodes keep insertion order, so node index == position here
        let position = |id: &str| graph.nodes().iter().position(|n| n.id == id);
        self.providers = order
            .ids
            .iter()
            .filter_map(|id| position(id).and_then(|i| remaining[i].take()))
            .collect();
    }

    fn register_all(&mut self) {
        let mut failed = HashSet::new();
        for loaded in &mut self.providers {
            let mut ctx = RegisterContext::new(
                &loaded.id,
                &mut self.container,
                &mut self.compiler,
                &mut self.metadata,
            );
            let message = match guarded(|| loaded.provider.register(&mut ctx)) {
                Ok(Ok(())) => continue,
                Ok(Err(e)) => e.to_string(),
                Err(panicked) => panicked,
            };
            tracing::warn!(provider = %loaded.id, error = %message, "provider failed to register, skipping");
            self.failures.push(ProviderFailure {
                provider: loaded.id.clone(),
                phase: Phase::Register,
                message,
            });
            failed.insert(loaded.id.clone());
        }
        self.providers.retain(|p| !failed.contains(&p.id));
    }
}

/// Run a provider hook, turning a panic into an error message.
fn guarded<T>(hook: impl FnOnce() -> T) -> std::result::Result<T, String> {
    panic::catch_unwind(AssertUnwindSafe(hook))
        .map_err(|payload| format!("panicked: {}", panic_message(payload.as_ref())))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

impl<C: ContainerBuilder> fmt::Debug for Orchestrator<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orchestrator")
            .field("environment", &self.environment)
            .field("state", &self.state)
            .field("providers", &self.provider_ids())
            .field("cache_used", &self.cache_used)
            .field("failures", &self.failures.len())
            .finish()
    }
}
