//! In-memory property source.
//!
//! This is the reference implementation of `PropertySource`. Keys are
//! adapted leniently, so `server.maxThreads`, `server.max-threads` and
//! `server.max_threads` all land on the same entry (the last write wins).
//!
//! The source is iterable: it answers `contains_descendant_of` exactly and
//! exposes its names to map and collection binding.

use indexmap::IndexMap;
use parking_lot::RwLock;

use super::{DescendantState, PropertySource};
use crate::model::{Property, Value};
use crate::name::PropertyName;

// ============================================================================
// MapPropertySource
// ============================================================================

/// In-memory name → value source.
pub struct MapPropertySource {
    label: String,
    entries: RwLock<IndexMap<PropertyName, Entry>>,
}

struct Entry {
    /// Key exactly as it was inserted, for origins.
    key: String,
    value: Value,
}

impl MapPropertySource {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            entries: RwLock::new(IndexMap::new()),
        }
    }

    /// Builder-style [`MapPropertySource::insert`].
    pub fn with(self, key: &str, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Store `value` under the leniently adapted `key`. Keys with no valid
    /// element at all are ignored.
    pub fn insert(&self, key: &str, value: impl Into<Value>) {
        let name = PropertyName::adapt(key, '.');
        if name.is_empty() {
            tracing::debug!(source = %self.label, key, "ignoring key without a valid element");
            return;
        }
        self.entries.write().insert(name, Entry { key: key.to_owned(), value: value.into() });
    }

    pub fn remove(&self, key: &str) -> Option<Value> {
        let name = PropertyName::adapt(key, '.');
        self.entries.write().shift_remove(&name).map(|entry| entry.value)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl<K: AsRef<str>, V: Into<Value>> FromIterator<(K, V)> for MapPropertySource {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let source = MapPropertySource::new("map");
        for (key, value) in iter {
            source.insert(key.as_ref(), value);
        }
        source
    }
}

// ============================================================================
// PropertySource impl
// ============================================================================

impl PropertySource for MapPropertySource {
    fn label(&self) -> &str {
        &self.label
    }

    fn get(&self, name: &PropertyName) -> Option<Property> {
        let entries = self.entries.read();
        let entry = entries.get(name)?;
        Some(
            Property::new(name.clone(), entry.value.clone())
                .with_origin(format!("{} [{}]", self.label, entry.key)),
        )
    }

    fn contains_descendant_of(&self, name: &PropertyName) -> DescendantState {
        let entries = self.entries.read();
        DescendantState::search(entries.keys(), |candidate| name.is_ancestor_of(candidate))
    }

    fn names(&self) -> Option<Vec<PropertyName>> {
        Some(self.entries.read().keys().cloned().collect())
    }

    fn is_iterable(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> PropertyName {
        PropertyName::parse(s).unwrap()
    }

    #[test]
    fn test_lenient_keys_share_an_entry() {
        let source = MapPropertySource::new("test")
            .with("server.maxThreads", 10)
            .with("server.max_threads", 20);
        assert_eq!(source.len(), 1);
        let property = source.get(&name("server.max-threads")).unwrap();
        assert_eq!(property.value, Value::Int(20));
        assert_eq!(property.origin.as_deref(), Some("test [server.max_threads]"));
    }

    #[test]
    fn test_descendants() {
        let source = MapPropertySource::new("test").with("app.server.port", 8080);
        assert_eq!(source.contains_descendant_of(&name("app")), DescendantState::Present);
        assert_eq!(source.contains_descendant_of(&name("app.server")), DescendantState::Present);
        assert_eq!(source.contains_descendant_of(&name("app.server.port")), DescendantState::Absent);
        assert_eq!(source.contains_descendant_of(&name("app.unused")), DescendantState::Absent);
        assert_eq!(source.contains_descendant_of(&PropertyName::empty()), DescendantState::Present);
    }

    #[test]
    fn test_names_keep_insertion_order() {
        let source: MapPropertySource = [("b", 1), ("a", 2)].into_iter().collect();
        assert_eq!(source.names().unwrap(), vec![name("b"), name("a")]);
    }

    #[test]
    fn test_remove() {
        let source = MapPropertySource::new("test").with("a.b", true);
        assert_eq!(source.remove("a.b"), Some(Value::Bool(true)));
        assert!(source.is_empty());
    }

    #[test]
    fn test_invalid_key_is_ignored() {
        let source = MapPropertySource::new("test").with("..", 1);
        assert!(source.is_empty());
    }
}
