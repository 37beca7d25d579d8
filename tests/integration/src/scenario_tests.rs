//! Startup scenarios across discovery, ordering, compilation, and caching

use std::sync::{Arc, Mutex};

use chrono::Utc;
use ext_core::{
    BootContext, CacheArtifact, Error, Orchestrator, Provider, ProviderCache, ProviderCatalog,
    ProviderResult,
};
use ext_discovery::{LoaderRegistrar, NamespaceMap, locator};
use ext_meta::{Environment, ExtensionsConfig};
use ext_services::{ContainerBuilder, ServiceMap, ServiceSpec};
use ext_test_utils::TestWorkspace;
use pretty_assertions::assert_eq;

type Journal = Arc<Mutex<Vec<String>>>;

struct Scripted {
    id: &'static str,
    priority: i32,
    after: Vec<String>,
    services: ServiceMap,
    journal: Journal,
}

impl Provider for Scripted {
    fn priority(&self) -> i32 {
        self.priority
    }

    fn boot_after(&self) -> Vec<String> {
        self.after.clone()
    }

    fn services(&self) -> ServiceMap {
        self.services.clone()
    }

    fn boot(&mut self, _ctx: &BootContext<'_>) -> ProviderResult<()> {
        self.journal.lock().unwrap().push(self.id.to_string());
        Ok(())
    }
}

#[derive(Default)]
struct Catalog {
    catalog: ProviderCatalog,
    journal: Journal,
}

impl Catalog {
    fn add(mut self, id: &'static str, priority: i32, after: &[&str], services: ServiceMap) -> Self {
        let journal = self.journal.clone();
        let after: Vec<String> = after.iter().map(|s| s.to_string()).collect();
        self.catalog.register(id, move || {
            Box::new(Scripted {
                id,
                priority,
                after: after.clone(),
                services: services.clone(),
                journal: journal.clone(),
            }) as Box<dyn Provider>
        });
        self
    }

    fn simple(self, id: &'static str, priority: i32, after: &[&str]) -> Self {
        self.add(id, priority, after, ServiceMap::new())
    }
}

fn enabled(ids: &[&str]) -> ExtensionsConfig {
    let mut config = ExtensionsConfig::default();
    config.app.enabled = ids.iter().map(|s| s.to_string()).collect();
    config
}

#[test]
fn test_priority_and_dependency_scenario_boots_c_a_b() {
    let Catalog { catalog, journal } = Catalog::default()
        .simple("A", 0, &[])
        .simple("B", 5, &["A"])
        .simple("C", -5, &[]);

    let mut orchestrator =
        Orchestrator::new(enabled(&["A", "B", "C"]), Environment::Production, catalog);
    orchestrator.boot().unwrap();

    assert_eq!(*journal.lock().unwrap(), vec!["C", "A", "B"]);
}

#[test]
fn test_cycle_still_boots_every_provider_once() {
    let Catalog { catalog, journal } = Catalog::default()
        .simple("X", 0, &["Y"])
        .simple("Y", 0, &["X"])
        .simple("Z", -1, &[]);

    let mut orchestrator =
        Orchestrator::new(enabled(&["X", "Y", "Z"]), Environment::Development, catalog);
    orchestrator.boot().unwrap();

    assert_eq!(*journal.lock().unwrap(), vec!["Z", "X", "Y"]);
    assert!(orchestrator.failures().is_empty());
}

#[test]
fn test_blog_descriptor_lands_between_config_and_registry() {
    let ws = TestWorkspace::new();
    ws.add_local_extension("blog", "Extensions.Blog.BlogServiceProvider");
    ws.write_registry(&[("acme/shop", "Acme.Shop.ShopProvider")]);
    let mut config = ws.config();
    config.app.enabled = vec!["App.Enabled".to_string()];
    config.extensions.dev_only = vec!["Ext.DevOnly".to_string()];

    let mut registrar = LoaderRegistrar::new(Box::new(NamespaceMap::new()));
    let ids = locator::all(&config, Environment::Development, &mut registrar);

    assert_eq!(
        ids,
        vec![
            "App.Enabled",
            "Ext.DevOnly",
            "Extensions.Blog.BlogServiceProvider",
            "Acme.Shop.ShopProvider"
        ]
    );
}

#[test]
fn test_fresh_process_sees_identical_discovery() {
    let ws = TestWorkspace::new();
    for (dir, provider) in [
        ("zeta", "Extensions.Zeta.ZetaProvider"),
        ("alpha", "Extensions.Alpha.AlphaProvider"),
        ("beta", "Extensions.Beta.BetaProvider"),
    ] {
        ws.add_local_extension(dir, provider);
    }
    ws.write_registry(&[
        ("z/pkg", "Vendor.Z.Provider"),
        ("a/pkg", "Vendor.A.Provider"),
    ]);
    let config = ws.config();

    let runs: Vec<Vec<String>> = (0..3)
        .map(|_| {
            let mut registrar = LoaderRegistrar::default();
            locator::all(&config, Environment::Development, &mut registrar)
        })
        .collect();

    assert!(runs.windows(2).all(|w| w[0] == w[1]));
    assert_eq!(
        runs[0],
        vec![
            "Extensions.Alpha.AlphaProvider",
            "Extensions.Beta.BetaProvider",
            "Extensions.Zeta.ZetaProvider",
            "Vendor.A.Provider",
            "Vendor.Z.Provider",
        ]
    );
}

#[test]
fn test_allow_list_overrides_every_source() {
    let ws = TestWorkspace::new();
    ws.add_local_extension("blog", "Extensions.Blog.BlogServiceProvider");
    ws.write_registry(&[("acme/shop", "Acme.Shop.ShopProvider")]);
    let mut config = ws.config();
    config.extensions.only = Some(vec!["Only.One".to_string(), "Only.Two".to_string()]);
    config.extensions.disabled = vec!["Only.Two".to_string()];
    config.app.enabled = vec!["App.Enabled".to_string()];

    let mut registrar = LoaderRegistrar::default();
    let ids = locator::all(&config, Environment::Development, &mut registrar);

    assert_eq!(ids, vec!["Only.One", "Only.Two"]);
    assert!(registrar.mappings().is_empty());
}

#[test]
fn test_collision_keeps_first_provider_definition() {
    let Catalog { catalog, .. } = Catalog::default()
        .add(
            "First.Provider",
            0,
            &[],
            ServiceMap::new().service("mailer", ServiceSpec::new().class("SmtpMailer")),
        )
        .add(
            "Second.Provider",
            1,
            &[],
            ServiceMap::new().service("mailer", ServiceSpec::new().class("NullMailer")),
        );

    let mut orchestrator = Orchestrator::new(
        enabled(&["Second.Provider", "First.Provider"]),
        Environment::Development,
        catalog,
    );
    orchestrator.boot().unwrap();

    // priority, not discovery order, decides who registers first
    assert_eq!(
        orchestrator.container().definition("mailer").unwrap().class,
        "SmtpMailer"
    );
}

#[test]
fn test_integrity_failure_names_exact_pair() {
    let Catalog { catalog, .. } = Catalog::default().add(
        "Shop.Provider",
        0,
        &[],
        ServiceMap::new()
            .service("cart", ServiceSpec::new().argument("@session"))
            .service("checkout", ServiceSpec::new().argument("@cart")),
    );

    let mut orchestrator =
        Orchestrator::new(enabled(&["Shop.Provider"]), Environment::Development, catalog);

    match orchestrator.discover() {
        Err(Error::Services(ext_services::Error::DanglingReferences { issues })) => {
            assert_eq!(issues.len(), 1);
            assert_eq!(issues[0].service, "cart");
            assert_eq!(issues[0].missing, "session");
        }
        other => panic!("expected dangling reference error, got {other:?}"),
    }
}

#[test]
fn test_old_cache_in_development_is_rebuilt_from_sources() {
    let ws = TestWorkspace::new();
    let Catalog { catalog, .. } = Catalog::default().simple("Live", 0, &[]).simple("Cached", 0, &[]);
    let mut config = ws.config();
    config.app.enabled = vec!["Live".to_string()];
    ProviderCache::new(ws.cache_path())
        .store_artifact(&CacheArtifact {
            generated_at: Utc::now() - chrono::Duration::seconds(10),
            providers: vec!["Cached".to_string()],
        })
        .unwrap();

    let mut orchestrator = Orchestrator::new(config, Environment::Development, catalog);
    orchestrator.discover().unwrap();

    assert!(!orchestrator.cache_used());
    assert_eq!(orchestrator.provider_ids(), vec!["Live"]);
}

#[test]
fn test_old_cache_in_production_is_reused() {
    let ws = TestWorkspace::new();
    let Catalog { catalog, .. } = Catalog::default().simple("Live", 0, &[]).simple("Cached", 0, &[]);
    let mut config = ws.config();
    config.app.enabled = vec!["Live".to_string()];
    ProviderCache::new(ws.cache_path())
        .store_artifact(&CacheArtifact {
            generated_at: Utc::now() - chrono::Duration::days(30),
            providers: vec!["Cached".to_string()],
        })
        .unwrap();

    let mut orchestrator = Orchestrator::new(config, Environment::Production, catalog);
    orchestrator.discover().unwrap();

    assert!(orchestrator.cache_used());
    assert_eq!(orchestrator.provider_ids(), vec!["Cached"]);
}
