//! Declarative service specs and the compiled definitions they become.
//!
//! A [`ServiceSpec`] mirrors what a provider writes:
//!
//! ```json
//! {
//!   "mailer": {
//!     "class": "App.Mail.Mailer",
//!     "arguments": ["@logger", "smtp://localhost"],
//!     "tags": ["mail.transport", {"name": "event.subscriber", "attributes": {"priority": 10}}],
//!     "alias": ["mail", "mailer.default"],
//!     "factory": ["@mailer.factory", "create"],
//!     "decorate": {"id": "base.mailer", "inner": "mailer.inner", "priority": 5}
//!   }
//! }
//! ```
//!
//! A [`Definition`] is the validated form written into the container.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::Result;

/// A tag as written: a bare name or a `{name, attributes}` record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TagSpec {
    Name(String),
    Record {
        name: String,
        #[serde(default)]
        attributes: BTreeMap<String, Value>,
    },
}

/// One alias or a list of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AliasSpec {
    One(String),
    Many(Vec<String>),
}

impl AliasSpec {
    pub fn names(&self) -> &[String] {
        match self {
            Self::One(name) => std::slice::from_ref(name),
            Self::Many(names) => names,
        }
    }
}

/// Decoration as written: the decorated id alone, or the full record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DecorateSpec {
    Id(String),
    Record {
        id: String,
        #[serde(default)]
        inner: Option<String>,
        #[serde(default)]
        priority: Option<i32>,
    },
}

/// A service as declared by a provider.
///
/// The factory is kept as raw JSON so that malformed shapes surface as
/// compiler errors naming the service rather than as parse errors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceSpec {
    /// Implementation class; the service id is used when absent.
    #[serde(default)]
    pub class: Option<String>,
    #[serde(default)]
    pub arguments: Vec<Value>,
    #[serde(default)]
    pub shared: Option<bool>,
    #[serde(default)]
    pub public: Option<bool>,
    #[serde(default)]
    pub tags: Vec<TagSpec>,
    #[serde(default)]
    pub alias: Option<AliasSpec>,
    #[serde(default)]
    pub factory: Option<Value>,
    #[serde(default)]
    pub decorate: Option<DecorateSpec>,
}

impl ServiceSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn class(mut self, class: impl Into<String>) -> Self {
        self.class = Some(class.into());
        self
    }

    pub fn argument(mut self, argument: impl Into<Value>) -> Self {
        self.arguments.push(argument.into());
        self
    }

    pub fn shared(mut self, shared: bool) -> Self {
        self.shared = Some(shared);
        self
    }

    pub fn public(mut self, public: bool) -> Self {
        self.public = Some(public);
        self
    }

    pub fn tag(mut self, name: impl Into<String>) -> Self {
        self.tags.push(TagSpec::Name(name.into()));
        self
    }

    pub fn tag_with(mut self, name: impl Into<String>, attributes: BTreeMap<String, Value>) -> Self {
        self.tags.push(TagSpec::Record {
            name: name.into(),
            attributes,
        });
        self
    }

    /// Add an alias, keeping any declared earlier.
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        let alias = alias.into();
        self.alias = Some(match self.alias.take() {
            None => AliasSpec::One(alias),
            Some(AliasSpec::One(first)) => AliasSpec::Many(vec![first, alias]),
            Some(AliasSpec::Many(mut names)) => {
                names.push(alias);
                AliasSpec::Many(names)
            }
        });
        self
    }

    pub fn factory(mut self, factory: impl Into<Value>) -> Self {
        self.factory = Some(factory.into());
        self
    }

    pub fn decorates(mut self, id: impl Into<String>) -> Self {
        self.decorate = Some(DecorateSpec::Id(id.into()));
        self
    }

    pub fn decorates_with(
        mut self,
        id: impl Into<String>,
        inner: Option<String>,
        priority: Option<i32>,
    ) -> Self {
        self.decorate = Some(DecorateSpec::Record {
            id: id.into(),
            inner,
            priority,
        });
        self
    }
}

/// Ordered map of service id to spec, in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServiceMap {
    entries: Vec<(String, ServiceSpec)>,
}

impl ServiceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON object of id to spec, keeping document order.
    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn service(mut self, id: impl Into<String>, spec: ServiceSpec) -> Self {
        self.insert(id, spec);
        self
    }

    /// Append a service. A repeated id inside one map replaces the spec
    /// but keeps the original position.
    pub fn insert(&mut self, id: impl Into<String>, spec: ServiceSpec) {
        let id = id.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == id) {
            Some((_, slot)) => *slot = spec,
            None => self.entries.push((id, spec)),
        }
    }

    pub fn get(&self, id: &str) -> Option<&ServiceSpec> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == id)
            .map(|(_, spec)| spec)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ServiceSpec)> {
        self.entries.iter().map(|(id, spec)| (id.as_str(), spec))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'de> Deserialize<'de> for ServiceMap {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct ServiceMapVisitor;

        impl<'de> Visitor<'de> for ServiceMapVisitor {
            type Value = ServiceMap;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of service id to service spec")
            }

            fn visit_map<A>(self, mut access: A) -> std::result::Result<ServiceMap, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut map = ServiceMap::new();
                while let Some((id, spec)) = access.next_entry::<String, ServiceSpec>()? {
                    map.insert(id, spec);
                }
                Ok(map)
            }
        }

        deserializer.deserialize_map(ServiceMapVisitor)
    }
}

/// A compiled constructor argument.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Argument {
    /// Another service, by id.
    Reference(String),
    /// A literal passed through unchanged.
    Value(Value),
    /// A list whose elements are compiled individually.
    Collection(Vec<Argument>),
}

impl Argument {
    /// Service ids referenced by this argument, depth first.
    pub fn references(&self) -> Vec<&str> {
        match self {
            Self::Reference(id) => vec![id.as_str()],
            Self::Value(_) => Vec::new(),
            Self::Collection(items) => items.iter().flat_map(Argument::references).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tag {
    pub name: String,
    pub attributes: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum FactoryTarget {
    Service(String),
    Class(String),
}

/// A static construction recipe: call `method` on `target`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Factory {
    pub target: FactoryTarget,
    pub method: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Decoration {
    /// The decorated service.
    pub id: String,
    /// Alias under which the decorated service stays reachable.
    pub inner: String,
    pub priority: i32,
}

/// A validated service definition as stored in the container.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Definition {
    pub class: String,
    pub arguments: Vec<Argument>,
    pub shared: bool,
    pub public: bool,
    pub tags: Vec<Tag>,
    pub factory: Option<Factory>,
    pub decoration: Option<Decoration>,
}

impl Definition {
    /// A shared, private definition with no arguments.
    pub fn new(class: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            arguments: Vec::new(),
            shared: true,
            public: false,
            tags: Vec::new(),
            factory: None,
            decoration: None,
        }
    }

    pub fn has_tag(&self, name: &str) -> bool {
        self.tags.iter().any(|t| t.name == name)
    }

    /// Every service id this definition needs, in a stable order:
    /// arguments, then factory target, then decorated service.
    pub fn references(&self) -> Vec<&str> {
        let mut refs: Vec<&str> = self.arguments.iter().flat_map(Argument::references).collect();
        if let Some(Factory {
            target: FactoryTarget::Service(id),
            ..
        }) = &self.factory
        {
            refs.push(id);
        }
        if let Some(decoration) = &self.decoration {
            refs.push(&decoration.id);
        }
        refs
    }
}
