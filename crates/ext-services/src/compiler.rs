//! Translation of service maps into container definitions.
//!
//! Compilation of one provider's map is all-or-nothing with respect to
//! validation: every spec is translated first, and only a fully valid map is
//! written to the container. Writing follows declaration order so the
//! container content depends only on the provider order.
//!
//! Ids and aliases share one namespace. The first registration of a name
//! wins; later attempts are dropped, recorded in the [`CompileReport`], and
//! logged with both provider identifiers.

use std::collections::HashMap;

use serde_json::Value;

use crate::REFERENCE_SIGIL;
use crate::container::ContainerBuilder;
use crate::definition::{
    AliasSpec, Argument, DecorateSpec, Decoration, Definition, Factory, FactoryTarget,
    ServiceMap, ServiceSpec, Tag, TagSpec,
};
use crate::error::{Error, ReferenceIssue, Result};

/// Owner reported for ids registered directly by the host.
const HOST_OWNER: &str = "host";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionKind {
    Service,
    Alias,
}

/// A dropped registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collision {
    pub id: String,
    pub kind: CollisionKind,
    /// Provider that registered the name first.
    pub original: String,
    /// Provider whose registration was dropped.
    pub offending: String,
}

/// What one `compile` call wrote.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompileReport {
    pub provider: String,
    pub registered: Vec<String>,
    pub aliases: Vec<String>,
    pub collisions: Vec<Collision>,
}

impl CompileReport {
    fn new(provider: &str) -> Self {
        Self {
            provider: provider.to_string(),
            ..Default::default()
        }
    }
}

struct Compiled<'a> {
    id: &'a str,
    definition: Definition,
    aliases: Vec<String>,
}

/// Compiles service maps across all providers of one registration batch.
#[derive(Debug, Default)]
pub struct ServiceCompiler {
    owners: HashMap<String, String>,
}

impl ServiceCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Provider that registered `id` (service or alias) through this compiler.
    pub fn owner(&self, id: &str) -> Option<&str> {
        self.owners.get(id).map(String::as_str)
    }

    /// Validate `services` and write them into `container` on behalf of
    /// `provider`.
    ///
    /// Returns the first validation error without touching the container.
    /// Collisions are not errors.
    pub fn compile(
        &mut self,
        provider: &str,
        services: &ServiceMap,
        container: &mut dyn ContainerBuilder,
    ) -> Result<CompileReport> {
        let compiled = services
            .iter()
            .map(|(id, spec)| compile_service(id, spec))
            .collect::<Result<Vec<_>>>()?;

        let mut report = CompileReport::new(provider);
        for Compiled {
            id,
            definition,
            aliases,
        } in compiled
        {
            if container.has(id) {
                self.record_collision(&mut report, id, CollisionKind::Service);
                continue;
            }

            let inner = definition
                .decoration
                .as_ref()
                .map(|d| (d.inner.clone(), d.id.clone()));

            container.set_definition(id, definition);
            self.owners.insert(id.to_string(), provider.to_string());
            report.registered.push(id.to_string());

            for alias in aliases {
                self.register_alias(&mut report, container, &alias, id);
            }
            if let Some((inner, decorated)) = inner {
                self.register_alias(&mut report, container, &inner, &decorated);
            }
        }

        tracing::debug!(
            provider = %provider,
            services = report.registered.len(),
            aliases = report.aliases.len(),
            collisions = report.collisions.len(),
            "compiled service map"
        );
        Ok(report)
    }

    /// Every `(service, missing)` pair in the container, in definition order.
    ///
    /// An empty result means every reference resolves.
    pub fn check_references(&self, container: &dyn ContainerBuilder) -> Vec<ReferenceIssue> {
        let mut issues: Vec<ReferenceIssue> = Vec::new();
        for id in container.definition_ids() {
            let Some(definition) = container.definition(&id) else {
                continue;
            };
            for reference in definition.references() {
                if container.has(reference) {
                    continue;
                }
                let issue = ReferenceIssue::new(id.as_str(), reference);
                if !issues.contains(&issue) {
                    issues.push(issue);
                }
            }
        }
        issues
    }

    /// Raise all dangling references as one error.
    pub fn verify_references(&self, container: &dyn ContainerBuilder) -> Result<()> {
        let issues = self.check_references(container);
        if issues.is_empty() {
            return Ok(());
        }
        tracing::error!(count = issues.len(), "service graph has dangling references");
        Err(Error::DanglingReferences { issues })
    }

    fn register_alias(
        &mut self,
        report: &mut CompileReport,
        container: &mut dyn ContainerBuilder,
        alias: &str,
        target: &str,
    ) {
        if container.has(alias) {
            self.record_collision(report, alias, CollisionKind::Alias);
            return;
        }
        container.set_alias(alias, target);
        self.owners.insert(alias.to_string(), report.provider.clone());
        report.aliases.push(alias.to_string());
    }

    fn record_collision(&self, report: &mut CompileReport, id: &str, kind: CollisionKind) {
        let original = self.owner(id).unwrap_or(HOST_OWNER).to_string();
        tracing::warn!(
            id = %id,
            kind = ?kind,
            original = %original,
            offending = %report.provider,
            "name already registered, keeping the first registration"
        );
        report.collisions.push(Collision {
            id: id.to_string(),
            kind,
            original,
            offending: report.provider.clone(),
        });
    }
}

fn compile_service<'a>(id: &'a str, spec: &ServiceSpec) -> Result<Compiled<'a>> {
    if id.trim().is_empty() {
        return Err(invalid_service(id, "service id is empty"));
    }

    let class = match &spec.class {
        Some(class) if class.trim().is_empty() => {
            return Err(invalid_service(id, "class is empty"));
        }
        Some(class) => class.clone(),
        None => id.to_string(),
    };

    let arguments = spec
        .arguments
        .iter()
        .map(|arg| compile_argument(id, arg))
        .collect::<Result<Vec<_>>>()?;

    let tags = spec
        .tags
        .iter()
        .map(|tag| compile_tag(id, tag))
        .collect::<Result<Vec<_>>>()?;

    let factory = spec
        .factory
        .as_ref()
        .map(|f| compile_factory(id, f))
        .transpose()?;

    let decoration = spec
        .decorate
        .as_ref()
        .map(|d| compile_decoration(id, d))
        .transpose()?;

    let aliases = spec
        .alias
        .as_ref()
        .map(AliasSpec::names)
        .unwrap_or_default()
        .to_vec();
    for alias in &aliases {
        if alias.trim().is_empty() {
            return Err(invalid_service(id, "alias is empty"));
        }
        if alias == id {
            return Err(invalid_service(id, "alias equals the service id"));
        }
    }

    Ok(Compiled {
        id,
        definition: Definition {
            class,
            arguments,
            shared: spec.shared.unwrap_or(true),
            public: spec.public.unwrap_or(false),
            tags,
            factory,
            decoration,
        },
        aliases,
    })
}

/// `"@id"` is a reference; `"@"` and `"@@..."` are rejected; arrays are
/// compiled element by element; everything else is a literal.
fn compile_argument(service: &str, value: &Value) -> Result<Argument> {
    match value {
        Value::String(s) => match s.strip_prefix(REFERENCE_SIGIL) {
            Some(target) => parse_reference(service, s, target).map(Argument::Reference),
            None => Ok(Argument::Value(value.clone())),
        },
        Value::Array(items) => items
            .iter()
            .map(|item| compile_argument(service, item))
            .collect::<Result<Vec<_>>>()
            .map(Argument::Collection),
        _ => Ok(Argument::Value(value.clone())),
    }
}

fn parse_reference(service: &str, raw: &str, target: &str) -> Result<String> {
    if target.is_empty() || target.starts_with(REFERENCE_SIGIL) {
        return Err(Error::InvalidReference {
            service: service.to_string(),
            argument: raw.to_string(),
        });
    }
    Ok(target.to_string())
}

fn compile_tag(service: &str, tag: &TagSpec) -> Result<Tag> {
    let (name, attributes) = match tag {
        TagSpec::Name(name) => (name, Default::default()),
        TagSpec::Record { name, attributes } => (name, attributes.clone()),
    };
    if name.trim().is_empty() {
        return Err(invalid_service(service, "tag name is empty"));
    }
    Ok(Tag {
        name: name.clone(),
        attributes,
    })
}

fn compile_factory(service: &str, value: &Value) -> Result<Factory> {
    let invalid = |reason: &str| Error::InvalidFactory {
        service: service.to_string(),
        reason: reason.to_string(),
    };

    let (target, method) = match value {
        Value::Array(parts) => match parts.as_slice() {
            [Value::String(target), Value::String(method)] => (target.as_str(), method.as_str()),
            _ => return Err(invalid("expected [target, method] with two strings")),
        },
        Value::String(s) => s
            .rsplit_once("::")
            .ok_or_else(|| invalid("expected \"Class::method\""))?,
        _ => {
            return Err(invalid(
                "expected [target, method] or \"Class::method\"",
            ));
        }
    };

    if method.is_empty() || method.contains("::") {
        return Err(invalid("method name is empty or malformed"));
    }
    if target.is_empty() {
        return Err(invalid("factory target is empty"));
    }

    let target = match target.strip_prefix(REFERENCE_SIGIL) {
        Some(id) => FactoryTarget::Service(parse_reference(service, target, id)?),
        None => FactoryTarget::Class(target.to_string()),
    };

    Ok(Factory {
        target,
        method: method.to_string(),
    })
}

fn compile_decoration(service: &str, spec: &DecorateSpec) -> Result<Decoration> {
    let (id, inner, priority) = match spec {
        DecorateSpec::Id(id) => (id, None, None),
        DecorateSpec::Record { id, inner, priority } => (id, inner.as_ref(), *priority),
    };
    if id.trim().is_empty() {
        return Err(Error::InvalidDecoration {
            service: service.to_string(),
            reason: "decorated id is empty".to_string(),
        });
    }
    if id == service {
        return Err(Error::InvalidDecoration {
            service: service.to_string(),
            reason: "a service cannot decorate itself".to_string(),
        });
    }
    Ok(Decoration {
        id: id.clone(),
        inner: inner
            .cloned()
            .unwrap_or_else(|| format!("{service}.inner")),
        priority: priority.unwrap_or(0),
    })
}

fn invalid_service(service: &str, reason: &str) -> Error {
    Error::InvalidService {
        service: service.to_string(),
        reason: reason.to_string(),
    }
}
