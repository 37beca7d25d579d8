//! Orchestrator behavior against a real filesystem layout

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use ext_core::{
    CacheArtifact, Error, Orchestrator, OrchestratorState, Phase, Provider, ProviderCache,
    ProviderCatalog, ProviderError, ProviderResult, RegisterContext,
};
use ext_meta::Environment;
use ext_services::{ContainerBuilder, Definition, InMemoryContainer, ServiceMap, ServiceSpec};
use ext_test_utils::TestWorkspace;
use pretty_assertions::assert_eq;

const BLOG: &str = "Extensions.Blog.BlogServiceProvider";
const SHOP: &str = "Acme.Shop.ShopProvider";
const CORE: &str = "App.Core.CoreProvider";

struct Declared {
    services: ServiceMap,
    after: Vec<String>,
}

impl Provider for Declared {
    fn boot_after(&self) -> Vec<String> {
        self.after.clone()
    }

    fn services(&self) -> ServiceMap {
        self.services.clone()
    }
}

fn declared(services: ServiceMap, after: &[&str]) -> Box<dyn Provider> {
    Box::new(Declared {
        services,
        after: after.iter().map(|s| s.to_string()).collect(),
    })
}

fn catalog() -> ProviderCatalog {
    ProviderCatalog::new()
        .with(CORE, || {
            declared(
                ServiceMap::new().service("database", ServiceSpec::new().class("App.Db.Connection")),
                &[],
            )
        })
        .with(BLOG, || {
            declared(
                ServiceMap::new().service(
                    "blog.posts",
                    ServiceSpec::new()
                        .class("Extensions.Blog.Posts")
                        .argument("@database"),
                ),
                &[CORE],
            )
        })
        .with(SHOP, || {
            declared(
                ServiceMap::new().service("shop.cart", ServiceSpec::new().argument("@database")),
                &[],
            )
        })
}

fn workspace() -> TestWorkspace {
    let ws = TestWorkspace::new();
    ws.add_local_extension("blog", BLOG);
    ws.write_registry(&[("acme/shop", SHOP)]);
    ws
}

#[test]
fn test_full_discovery_from_all_sources() {
    let ws = workspace();
    let mut config = ws.config();
    config.app.enabled = vec![CORE.to_string()];

    let mut orchestrator = Orchestrator::new(config, Environment::Development, catalog());
    orchestrator.boot().unwrap();

    assert_eq!(orchestrator.state(), OrchestratorState::Booted);
    assert!(!orchestrator.cache_used());
    assert_eq!(orchestrator.provider_ids(), vec![CORE, BLOG, SHOP]);
    assert!(orchestrator.container().has("blog.posts"));
    assert_eq!(
        orchestrator.registrar().mappings(),
        &[(
            "Extensions.Blog".to_string(),
            ws.local_root().join("blog").join("src")
        )]
    );
}

#[test]
fn test_development_does_not_write_cache() {
    let ws = workspace();
    let mut config = ws.config();
    config.app.enabled = vec![CORE.to_string()];

    let mut orchestrator = Orchestrator::new(config, Environment::Development, catalog());
    orchestrator.discover().unwrap();

    ws.assert_file_not_exists(ext_test_utils::workspace::CACHE_PATH);
}

#[test]
fn test_production_writes_cache_then_reuses_it() {
    let ws = workspace();
    let mut config = ws.config();
    config.app.enabled = vec![CORE.to_string()];

    let mut first = Orchestrator::new(config.clone(), Environment::Production, catalog());
    first.discover().unwrap();
    assert!(!first.cache_used());
    assert_eq!(first.provider_ids(), vec![CORE, SHOP]);
    ws.assert_file_exists(ext_test_utils::workspace::CACHE_PATH);

    // a registry change is invisible while the cache is trusted
    ws.write_registry(&[]);
    let mut second = Orchestrator::new(config, Environment::Production, catalog());
    second.discover().unwrap();

    assert!(second.cache_used());
    assert_eq!(second.provider_ids(), vec![CORE, SHOP]);
}

#[test]
fn test_stale_development_cache_triggers_rediscovery() {
    let ws = workspace();
    let mut config = ws.config();
    config.app.enabled = vec![CORE.to_string()];
    ProviderCache::new(ws.cache_path())
        .store_artifact(&CacheArtifact {
            generated_at: Utc::now() - chrono::Duration::seconds(60),
            providers: vec![SHOP.to_string()],
        })
        .unwrap();

    let mut orchestrator = Orchestrator::new(config, Environment::Development, catalog());
    orchestrator.discover().unwrap();

    assert!(!orchestrator.cache_used());
    assert_eq!(orchestrator.provider_ids(), vec![CORE, BLOG, SHOP]);
}

#[test]
fn test_fresh_development_cache_still_registers_local_namespaces() {
    let ws = workspace();
    let mut config = ws.config();
    config.cache.development_ttl_secs = Some(3600);
    ProviderCache::new(ws.cache_path())
        .store(&[SHOP.to_string(), CORE.to_string()])
        .unwrap();

    let mut orchestrator = Orchestrator::new(config, Environment::Development, catalog());
    orchestrator.discover().unwrap();

    assert!(orchestrator.cache_used());
    assert_eq!(orchestrator.provider_ids(), vec![SHOP, CORE]);
    assert_eq!(
        orchestrator.registrar().mappings(),
        &[(
            "Extensions.Blog".to_string(),
            ws.local_root().join("blog").join("src")
        )]
    );
}

#[test]
fn test_production_cache_hit_skips_local_namespaces() {
    let ws = workspace();
    ProviderCache::new(ws.cache_path())
        .store(&[CORE.to_string()])
        .unwrap();

    let mut orchestrator = Orchestrator::new(ws.config(), Environment::Production, catalog());
    orchestrator.discover().unwrap();

    assert!(orchestrator.cache_used());
    assert!(orchestrator.registrar().mappings().is_empty());
}

#[test]
fn test_cached_identifiers_still_checked_against_catalog() {
    let ws = workspace();
    let mut config = ws.config();
    config.app.enabled = vec![CORE.to_string()];
    ProviderCache::new(ws.cache_path())
        .store(&[CORE.to_string(), "Removed.Old.Provider".to_string()])
        .unwrap();

    let mut orchestrator = Orchestrator::new(config, Environment::Production, catalog());
    orchestrator.discover().unwrap();

    assert!(orchestrator.cache_used());
    assert_eq!(orchestrator.provider_ids(), vec![CORE]);
    assert_eq!(orchestrator.failures()[0].provider, "Removed.Old.Provider");
    assert_eq!(orchestrator.failures()[0].phase, Phase::Instantiate);
}

#[test]
fn test_write_cache_now_and_clear() {
    let ws = workspace();
    let mut config = ws.config();
    config.app.enabled = vec![CORE.to_string()];
    let mut orchestrator = Orchestrator::new(config, Environment::Development, catalog());

    let path = orchestrator.write_cache_now(None).unwrap();
    assert_eq!(path, ws.cache_path());
    let cached = ProviderCache::new(&path).read().unwrap().unwrap();
    assert_eq!(cached.providers, vec![CORE, BLOG, SHOP]);

    orchestrator
        .write_cache_now(Some(vec!["Only.This.Provider".to_string()]))
        .unwrap();
    let cached = ProviderCache::new(&path).read().unwrap().unwrap();
    assert_eq!(cached.providers, vec!["Only.This.Provider"]);

    assert!(orchestrator.clear_cache().unwrap());
    assert!(!orchestrator.clear_cache().unwrap());
}

#[test]
fn test_write_cache_now_reports_write_failure() {
    let ws = workspace();
    // a plain file where the cache directory should be
    ws.write_file("blocker", "");
    let mut config = ws.config();
    config.cache.path = Some(ws.root().join("blocker").join("providers.json"));
    let mut orchestrator = Orchestrator::new(config, Environment::Production, catalog());

    assert!(matches!(
        orchestrator.write_cache_now(Some(vec![CORE.to_string()])),
        Err(Error::Fs(_))
    ));
}

#[test]
fn test_production_cache_write_failure_is_not_fatal() {
    let ws = workspace();
    ws.write_file("blocker", "");
    let mut config = ws.config();
    config.app.enabled = vec![CORE.to_string()];
    config.cache.path = Some(ws.root().join("blocker").join("providers.json"));

    let mut orchestrator = Orchestrator::new(config, Environment::Production, catalog());

    assert!(orchestrator.discover().is_ok());
    assert_eq!(orchestrator.provider_ids(), vec![CORE, SHOP]);
}

#[test]
fn test_dangling_reference_is_fatal_and_blocks_boot() {
    let ws = workspace();
    // Core is not enabled, so nothing defines "database"
    let config = ws.config();

    let mut orchestrator = Orchestrator::new(config, Environment::Development, catalog());
    let err = orchestrator.discover().unwrap_err();

    match err {
        Error::Services(ext_services::Error::DanglingReferences { issues }) => {
            let pairs: Vec<(&str, &str)> = issues
                .iter()
                .map(|i| (i.service.as_str(), i.missing.as_str()))
                .collect();
            assert_eq!(pairs, vec![("blog.posts", "database"), ("shop.cart", "database")]);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(orchestrator.state(), OrchestratorState::Discovered);
    assert_eq!(orchestrator.dangling_references().map(|i| i.len()), Some(2));

    // the failure sticks on repeated calls
    for _ in 0..2 {
        assert!(matches!(
            orchestrator.discover(),
            Err(Error::Services(ext_services::Error::DanglingReferences { ref issues })) if issues.len() == 2
        ));
    }
    assert!(matches!(orchestrator.boot(), Err(Error::BootRefused { .. })));
    ws.assert_file_not_exists(ext_test_utils::workspace::CACHE_PATH);
}

#[test]
fn test_host_services_satisfy_references() {
    let ws = workspace();
    let mut container = InMemoryContainer::new();
    container.set_definition("database", Definition::new("Host.Db"));

    let mut orchestrator =
        Orchestrator::with_container(ws.config(), Environment::Development, catalog(), container);
    orchestrator.boot().unwrap();

    assert_eq!(orchestrator.provider_ids(), vec![BLOG, SHOP]);
    assert_eq!(
        orchestrator.container().definition("database").unwrap().class,
        "Host.Db"
    );
}

/// Fails its first `register` call only.
struct Flaky {
    attempts: Arc<AtomicUsize>,
}

impl Provider for Flaky {
    fn register(&mut self, _ctx: &mut RegisterContext<'_>) -> ProviderResult<()> {
        if self.attempts.fetch_add(1, Ordering::SeqCst) == 0 {
            return Err(ProviderError::msg("database not ready"));
        }
        Ok(())
    }
}

#[test]
fn test_register_failure_is_retried_after_production_cache_write() {
    let ws = TestWorkspace::new();
    let attempts = Arc::new(AtomicUsize::new(0));
    let flaky_catalog = || {
        let attempts = attempts.clone();
        catalog().with("App.Flaky.Provider", move || {
            Box::new(Flaky {
                attempts: attempts.clone(),
            }) as Box<dyn Provider>
        })
    };
    let mut config = ws.config();
    config.app.enabled = vec![CORE.to_string(), "App.Flaky.Provider".to_string()];

    let mut first = Orchestrator::new(config.clone(), Environment::Production, flaky_catalog());
    first.boot().unwrap();
    assert_eq!(first.provider_ids(), vec![CORE]);
    assert_eq!(first.failures()[0].phase, Phase::Register);
    let cached = ProviderCache::new(ws.cache_path()).read().unwrap().unwrap();
    assert_eq!(cached.providers, vec![CORE, "App.Flaky.Provider"]);

    let mut second = Orchestrator::new(config, Environment::Production, flaky_catalog());
    second.boot().unwrap();
    assert!(second.cache_used());
    assert_eq!(second.provider_ids(), vec![CORE, "App.Flaky.Provider"]);
    assert!(second.failures().is_empty());
}

struct Manual {
    seen: Arc<Mutex<Vec<String>>>,
}

impl Provider for Manual {
    fn register(&mut self, ctx: &mut RegisterContext<'_>) -> ProviderResult<()> {
        let id = ctx.provider_id().to_string();
        self.seen.lock().unwrap().push(id.clone());
        ctx.container().set_definition("manual", Definition::new("Manual"));
        ctx.metadata().set(id, ext_meta::ExtensionMetadata::new("Manual"));
        Ok(())
    }
}

#[test]
fn test_custom_register_uses_context() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_in_factory = seen.clone();
    let catalog = ProviderCatalog::new().with("Manual.Provider", move || {
        Box::new(Manual {
            seen: seen_in_factory.clone(),
        }) as Box<dyn Provider>
    });
    let mut config = ext_meta::ExtensionsConfig::default();
    config.app.enabled = vec!["Manual.Provider".to_string()];

    let mut orchestrator = Orchestrator::new(config, Environment::Development, catalog);
    orchestrator.boot().unwrap();

    assert_eq!(*seen.lock().unwrap(), vec!["Manual.Provider"]);
    assert!(orchestrator.container().has("manual"));
    assert!(orchestrator.metadata().has("Manual.Provider"));
}
