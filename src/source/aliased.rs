//! Alias resolution over another source.
//!
//! An alias table maps a canonical name to alternate names. The aliased
//! view answers a lookup for either side with whatever the delegate holds
//! under the other, so renamed keys keep working in both directions.

use std::sync::Arc;

use hashbrown::HashMap;

use super::{DescendantState, PropertySource};
use crate::model::Property;
use crate::name::{InvalidNameError, PropertyName};

// ============================================================================
// Alias table
// ============================================================================

/// Canonical name → alternate names.
#[derive(Debug, Clone, Default)]
pub struct PropertyNameAliases {
    aliases: HashMap<PropertyName, Vec<PropertyName>>,
}

impl PropertyNameAliases {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `aliases` as alternates of `name`. All names parse strictly.
    pub fn add_aliases(&mut self, name: &str, aliases: &[&str]) -> Result<(), InvalidNameError> {
        let name = PropertyName::parse(name)?;
        let parsed = aliases
            .iter()
            .map(|alias| PropertyName::parse(alias))
            .collect::<Result<Vec<_>, _>>()?;
        let entry = self.aliases.entry(name).or_default();
        for alias in parsed {
            if !entry.contains(&alias) {
                entry.push(alias);
            }
        }
        Ok(())
    }

    /// Builder-style [`PropertyNameAliases::add_aliases`].
    pub fn with(mut self, name: &str, aliases: &[&str]) -> Result<Self, InvalidNameError> {
        self.add_aliases(name, aliases)?;
        Ok(self)
    }

    /// Alternates registered for `name`.
    pub fn aliases(&self, name: &PropertyName) -> &[PropertyName] {
        self.aliases.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The canonical name `alias` stands for.
    pub fn name_for_alias(&self, alias: &PropertyName) -> Option<&PropertyName> {
        self.aliases
            .iter()
            .find(|(_, aliases)| aliases.contains(alias))
            .map(|(name, _)| name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PropertyName, &[PropertyName])> {
        self.aliases.iter().map(|(name, aliases)| (name, aliases.as_slice()))
    }
}

// ============================================================================
// AliasedSource
// ============================================================================

/// Resolves canonical names and their aliases against a delegate.
pub struct AliasedSource {
    source: Arc<dyn PropertySource>,
    aliases: PropertyNameAliases,
}

impl AliasedSource {
    pub fn new(source: Arc<dyn PropertySource>, aliases: PropertyNameAliases) -> Self {
        Self { source, aliases }
    }

    pub fn aliases(&self) -> &PropertyNameAliases {
        &self.aliases
    }
}

impl PropertySource for AliasedSource {
    fn label(&self) -> &str {
        self.source.label()
    }

    fn get(&self, name: &PropertyName) -> Option<Property> {
        if let Some(property) = self.source.get(name) {
            return Some(property);
        }
        if let Some(canonical) = self.aliases.name_for_alias(name)
            && let Some(property) = self.source.get(canonical)
        {
            return Some(property.renamed(name.clone()));
        }
        self.aliases
            .aliases(name)
            .iter()
            .find_map(|alias| self.source.get(alias))
            .map(|property| property.renamed(name.clone()))
    }

    fn contains_descendant_of(&self, name: &PropertyName) -> DescendantState {
        let result = self.source.contains_descendant_of(name);
        if result != DescendantState::Absent {
            return result;
        }
        for alias in self.aliases.aliases(name) {
            let state = self.source.contains_descendant_of(alias);
            if state != DescendantState::Absent {
                return state;
            }
        }
        // a name may only become visible below `name` through an alias
        for (canonical, aliases) in self.aliases.iter() {
            for alias in aliases {
                if name.is_ancestor_of(alias) && self.source.get(canonical).is_some() {
                    return DescendantState::Present;
                }
                if name.is_ancestor_of(canonical) && self.source.get(alias).is_some() {
                    return DescendantState::Present;
                }
            }
        }
        DescendantState::Absent
    }

    fn is_iterable(&self) -> bool {
        self.source.is_iterable()
    }

    fn names(&self) -> Option<Vec<PropertyName>> {
        let mut names = self.source.names()?;
        let mut visible = Vec::new();
        for name in &names {
            visible.extend(self.aliases.aliases(name).iter().cloned());
            if let Some(canonical) = self.aliases.name_for_alias(name) {
                visible.push(canonical.clone());
            }
        }
        for name in visible {
            if !names.contains(&name) {
                names.push(name);
            }
        }
        Some(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Value;
    use crate::source::MapPropertySource;

    fn name(s: &str) -> PropertyName {
        PropertyName::parse(s).unwrap()
    }

    fn aliases() -> PropertyNameAliases {
        PropertyNameAliases::new()
            .with("server.port", &["server.http-port", "port"])
            .unwrap()
    }

    #[test]
    fn test_alias_resolves_canonical_value() {
        let map = MapPropertySource::new("test").with("server.port", 8080);
        let source = AliasedSource::new(Arc::new(map), aliases());
        let property = source.get(&name("port")).unwrap();
        assert_eq!(property.value, Value::Int(8080));
        assert_eq!(property.name, name("port"));
    }

    #[test]
    fn test_canonical_resolves_alias_value() {
        let map = MapPropertySource::new("test").with("server.httpPort", 9090);
        let source = AliasedSource::new(Arc::new(map), aliases());
        assert_eq!(source.get(&name("server.port")).unwrap().value, Value::Int(9090));
    }

    #[test]
    fn test_descendants_through_alias() {
        let map = MapPropertySource::new("test").with("port", 1);
        let source = AliasedSource::new(Arc::new(map), aliases());
        assert_eq!(source.contains_descendant_of(&name("server")), DescendantState::Present);
        assert_eq!(source.contains_descendant_of(&name("client")), DescendantState::Absent);
    }

    #[test]
    fn test_names_include_aliases() {
        let map = MapPropertySource::new("test").with("server.port", 1);
        let source = AliasedSource::new(Arc::new(map), aliases());
        let names = source.names().unwrap();
        assert_eq!(names, vec![name("server.port"), name("server.http-port"), name("port")]);
    }

    #[test]
    fn test_invalid_alias_is_rejected() {
        assert!(PropertyNameAliases::new().add_aliases("a", &["Not_Valid"]).is_err());
    }
}
