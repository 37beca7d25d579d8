//! End-to-end lifecycle tests
//!
//! Configuration is loaded from files on disk, providers come from link-time
//! registrations, and the orchestrator runs against a temp application root.

use std::sync::Once;

use ext_core::{Orchestrator, OrchestratorState, Provider, ProviderCatalog, register_provider};
use ext_meta::{Environment, ExtensionMetadata, ExtensionsConfig};
use ext_services::{ContainerBuilder, ServiceMap, ServiceSpec};
use ext_test_utils::{TestWorkspace, fixtures};
use pretty_assertions::assert_eq;
use serde_json::json;

static TRACING: Once = Once::new();

fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

#[derive(Default)]
struct KernelProvider;

impl Provider for KernelProvider {
    fn priority(&self) -> i32 {
        -100
    }

    fn services(&self) -> ServiceMap {
        ServiceMap::new()
            .service("events", ServiceSpec::new().class("App.Kernel.EventBus").public(true))
            .service("log", ServiceSpec::new().class("App.Kernel.Logger").alias("logger"))
    }

    fn metadata(&self) -> Option<ExtensionMetadata> {
        Some(ExtensionMetadata::new("Kernel").with_version("3.1.0"))
    }
}

#[derive(Default)]
struct BlogProvider;

impl Provider for BlogProvider {
    fn boot_after(&self) -> Vec<String> {
        vec!["Acme.Comments.CommentsProvider".to_string()]
    }

    fn services(&self) -> ServiceMap {
        ServiceMap::new().service(
            "blog.posts",
            ServiceSpec::new()
                .class("Extensions.Blog.PostRepository")
                .argument("@logger")
                .argument("@comments")
                .tag("event.subscriber"),
        )
    }

    fn metadata(&self) -> Option<ExtensionMetadata> {
        Some(ExtensionMetadata::new("Blog").with_description("Posts and feeds"))
    }
}

#[derive(Default)]
struct CommentsProvider;

impl Provider for CommentsProvider {
    fn services(&self) -> ServiceMap {
        ServiceMap::new().service(
            "comments",
            ServiceSpec::new()
                .class("Acme.Comments.Store")
                .argument("@events")
                .tag("event.subscriber"),
        )
    }
}

#[derive(Default)]
struct FutureProvider;

impl Provider for FutureProvider {}

register_provider!("App.Kernel.KernelProvider", KernelProvider);
register_provider!("Extensions.Blog.BlogServiceProvider", BlogProvider);
register_provider!("Acme.Comments.CommentsProvider", CommentsProvider);
register_provider!("Acme.Future.FutureProvider", FutureProvider);

const CONFIG_TOML: &str = r#"
local_path = "extensions"
manifest_path = "vendor/installed.json"
framework_version = "2.4.0"

[app]
enabled = ["App.Kernel.KernelProvider"]
disabled = ["Acme.Legacy.LegacyProvider"]

[cache]
path = "storage/cache/providers.json"
"#;

/// A workspace with a config file, one local extension, and a registry in
/// `{"packages": [...]}` form.
fn application() -> TestWorkspace {
    let ws = TestWorkspace::new();
    ws.write_file("config/extensions.toml", CONFIG_TOML);
    ws.add_local_extension("blog", "Extensions.Blog.BlogServiceProvider");
    ws.write_registry_value(&json!({
        "packages": [
            fixtures::extension_package_with_min("acme/future", "Acme.Future.FutureProvider", ">=3.0"),
            fixtures::extension_package("acme/legacy", "Acme.Legacy.LegacyProvider"),
            fixtures::extension_package("acme/comments", "Acme.Comments.CommentsProvider"),
            fixtures::library_package("acme/utils"),
        ]
    }));
    ws
}

fn load_config(ws: &TestWorkspace) -> ExtensionsConfig {
    ExtensionsConfig::load(&ws.root().join("config/extensions.toml"))
        .unwrap()
        .rooted_at(ws.root())
}

#[test]
fn test_lifecycle_from_config_file() {
    init_tracing();
    let ws = application();
    let config = load_config(&ws);

    let mut orchestrator =
        Orchestrator::new(config, Environment::Development, ProviderCatalog::from_inventory());
    orchestrator.boot().unwrap();

    assert_eq!(orchestrator.state(), OrchestratorState::Booted);
    // future package needs framework 3.0, legacy is disabled, utils is no extension
    assert_eq!(
        orchestrator.provider_ids(),
        vec![
            "App.Kernel.KernelProvider",
            "Acme.Comments.CommentsProvider",
            "Extensions.Blog.BlogServiceProvider",
        ]
    );
    assert!(orchestrator.failures().is_empty());

    let container = orchestrator.container();
    assert_eq!(container.alias_target("logger"), Some("log"));
    let subscribers: Vec<&str> = container
        .tagged("event.subscriber")
        .into_iter()
        .map(|(id, _)| id)
        .collect();
    assert_eq!(subscribers, vec!["comments", "blog.posts"]);

    assert_eq!(
        orchestrator
            .metadata()
            .get("App.Kernel.KernelProvider")
            .and_then(|m| m.version.as_deref()),
        Some("3.1.0")
    );
    assert!(orchestrator.metadata().has("Extensions.Blog.BlogServiceProvider"));
}

#[test]
fn test_newer_framework_accepts_min_version_package() {
    init_tracing();
    let ws = application();
    let mut config = load_config(&ws);
    config.framework_version = Some("3.0.0".parse().unwrap());

    let mut orchestrator =
        Orchestrator::new(config, Environment::Production, ProviderCatalog::from_inventory());
    orchestrator.discover().unwrap();

    assert!(orchestrator.has_provider("Acme.Future.FutureProvider"));
    assert!(!orchestrator.has_provider("Extensions.Blog.BlogServiceProvider"));
}

#[test]
fn test_scan_composer_alias_disables_registry() {
    init_tracing();
    let ws = application();
    ws.write_file(
        "config/extensions.json",
        r#"{
            "scan_composer": false,
            "local_path": "extensions",
            "manifest_path": "vendor/installed.json",
            "app": {"enabled": ["App.Kernel.KernelProvider"]}
        }"#,
    );
    let config = ExtensionsConfig::load(&ws.root().join("config/extensions.json"))
        .unwrap()
        .rooted_at(ws.root());
    assert!(!config.scan_manifest);

    let mut orchestrator =
        Orchestrator::new(config, Environment::Development, ProviderCatalog::from_inventory());
    let result = orchestrator.discover();

    // blog needs "comments", which only the registry package provides
    assert!(result.is_err());
    assert_eq!(
        orchestrator.provider_ids(),
        vec![
            "App.Kernel.KernelProvider",
            "Extensions.Blog.BlogServiceProvider"
        ]
    );
}

#[test]
fn test_production_round_trip_through_cache() {
    init_tracing();
    let ws = application();

    let mut first = Orchestrator::new(
        load_config(&ws),
        Environment::Production,
        ProviderCatalog::from_inventory(),
    );
    first.boot().unwrap();
    assert!(!first.cache_used());
    ws.assert_file_exists("storage/cache/providers.json");

    let mut second = Orchestrator::new(
        load_config(&ws),
        Environment::Production,
        ProviderCatalog::from_inventory(),
    );
    second.boot().unwrap();

    assert!(second.cache_used());
    assert_eq!(first.provider_ids(), second.provider_ids());
}

#[test]
fn test_build_time_cache_rebuild_then_clear() {
    init_tracing();
    let ws = application();
    let mut builder = Orchestrator::new(
        load_config(&ws),
        Environment::Development,
        ProviderCatalog::from_inventory(),
    );

    let path = builder.write_cache_now(None).unwrap();
    let written: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(
        written["providers"],
        json!([
            "App.Kernel.KernelProvider",
            "Extensions.Blog.BlogServiceProvider",
            "Acme.Comments.CommentsProvider"
        ])
    );
    assert!(written["generated_at"].is_string());

    assert!(builder.clear_cache().unwrap());
    ws.assert_file_not_exists("storage/cache/providers.json");
}
