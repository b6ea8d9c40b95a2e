//! View that relocates every lookup under a fixed prefix.

use std::sync::Arc;

use super::{DescendantState, PropertySource};
use crate::model::Property;
use crate::name::PropertyName;

/// `get(name)` reads `prefix.name` from the delegate.
pub struct PrefixedSource {
    source: Arc<dyn PropertySource>,
    prefix: PropertyName,
}

impl PrefixedSource {
    pub fn new(source: Arc<dyn PropertySource>, prefix: PropertyName) -> Self {
        Self { source, prefix }
    }

    pub fn prefix(&self) -> &PropertyName {
        &self.prefix
    }

    fn prefixed(&self, name: &PropertyName) -> PropertyName {
        self.prefix.append_name(name)
    }
}

impl PropertySource for PrefixedSource {
    fn label(&self) -> &str {
        self.source.label()
    }

    fn get(&self, name: &PropertyName) -> Option<Property> {
        self.source
            .get(&self.prefixed(name))
            .map(|property| property.renamed(name.clone()))
    }

    fn contains_descendant_of(&self, name: &PropertyName) -> DescendantState {
        self.source.contains_descendant_of(&self.prefixed(name))
    }

    fn is_iterable(&self) -> bool {
        self.source.is_iterable()
    }

    fn names(&self) -> Option<Vec<PropertyName>> {
        let names = self.source.names()?;
        Some(
            names
                .iter()
                .filter(|name| self.prefix.is_ancestor_of(name))
                .map(|name| name.sub_name(self.prefix.len()))
                .collect(),
        )
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

    fn source() -> PrefixedSource {
        let map = MapPropertySource::new("test")
            .with("my.app.name", "demo")
            .with("my.app.ports[0]", 80)
            .with("other.key", 1);
        PrefixedSource::new(Arc::new(map), name("my.app"))
    }

    #[test]
    fn test_get_reads_under_prefix() {
        let property = source().get(&name("name")).unwrap();
        assert_eq!(property.value, Value::from("demo"));
        assert_eq!(property.name, name("name"));
        assert_eq!(property.origin.as_deref(), Some("test [my.app.name]"));
    }

    #[test]
    fn test_names_are_stripped() {
        assert_eq!(source().names().unwrap(), vec![name("name"), name("ports[0]")]);
    }

    #[test]
    fn test_descendants_under_prefix() {
        assert_eq!(source().contains_descendant_of(&name("ports")), DescendantState::Present);
        assert_eq!(source().contains_descendant_of(&name("key")), DescendantState::Absent);
    }
}
