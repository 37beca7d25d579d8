//! Container builder contract and an in-memory implementation.

use std::collections::{BTreeMap, BTreeSet};

use crate::definition::Definition;

/// The write side of a dependency-injection container.
///
/// Aliases and definitions share one id space: `has` answers for either.
/// Implementations decide storage; the compiler only relies on these
/// operations and never overwrites an existing id itself.
pub trait ContainerBuilder {
    /// Whether `id` names a definition, an alias, or an externally provided
    /// service.
    fn has(&self, id: &str) -> bool;

    fn definition(&self, id: &str) -> Option<&Definition>;

    fn set_definition(&mut self, id: &str, definition: Definition);

    fn set_alias(&mut self, alias: &str, target: &str);

    fn alias_target(&self, alias: &str) -> Option<&str>;

    /// Ids of all definitions, in registration order.
    fn definition_ids(&self) -> Vec<String>;
}

/// Ordered in-memory container.
#[derive(Debug, Clone, Default)]
pub struct InMemoryContainer {
    order: Vec<String>,
    definitions: BTreeMap<String, Definition>,
    aliases: BTreeMap<String, String>,
    synthetic: BTreeSet<String>,
}

impl InMemoryContainer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a service the host injects at runtime without a definition.
    ///
    /// References to synthetic ids satisfy the integrity pass.
    pub fn add_synthetic(&mut self, id: impl Into<String>) {
        self.synthetic.insert(id.into());
    }

    /// Follow aliases to the definition they name.
    pub fn resolve(&self, id: &str) -> Option<&Definition> {
        let mut current = id;
        // alias chains are short; the bound only guards against loops
        for _ in 0..=self.aliases.len() {
            if let Some(def) = self.definitions.get(current) {
                return Some(def);
            }
            current = self.aliases.get(current).map(String::as_str)?;
        }
        None
    }

    /// Definitions carrying `tag`, in registration order.
    pub fn tagged(&self, tag: &str) -> Vec<(&str, &Definition)> {
        self.order
            .iter()
            .filter_map(|id| self.definitions.get(id).map(|def| (id.as_str(), def)))
            .filter(|(_, def)| def.has_tag(tag))
            .collect()
    }

    pub fn aliases(&self) -> &BTreeMap<String, String> {
        &self.aliases
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

impl ContainerBuilder for InMemoryContainer {
    fn has(&self, id: &str) -> bool {
        self.definitions.contains_key(id) || self.aliases.contains_key(id) || self.synthetic.contains(id)
    }

    fn definition(&self, id: &str) -> Option<&Definition> {
        self.definitions.get(id)
    }

    fn set_definition(&mut self, id: &str, definition: Definition) {
        if self.definitions.insert(id.to_string(), definition).is_none() {
            self.order.push(id.to_string());
        }
    }

    fn set_alias(&mut self, alias: &str, target: &str) {
        self.aliases.insert(alias.to_string(), target.to_string());
    }

    fn alias_target(&self, alias: &str) -> Option<&str> {
        self.aliases.get(alias).map(String::as_str)
    }

    fn definition_ids(&self) -> Vec<String> {
        self.order.clone()
    }
}
