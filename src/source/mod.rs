//! # Property Sources
//!
//! This is the contract between the binder and wherever configuration lives.
//! A source answers two questions: "what is the value of this name" and
//! "does anything exist below this name". The second one lets the binder
//! skip whole subtrees when a source knows they are empty.
//!
//! ## Implementations
//!
//! | Source | Module | Description |
//! |--------|--------|-------------|
//! | `MapPropertySource` | `map` | In-memory, iterable, lenient keys |
//! | `FilteredSource` | `filtered` | Hides names rejected by a predicate |
//! | `AliasedSource` | `aliased` | Resolves alternate names to the same value |
//! | `PrefixedSource` | `prefixed` | Relocates lookups under a prefix |
//!
//! Decorators are views over a shared `Arc<dyn PropertySource>`; they copy
//! no data.

pub mod map;
pub mod filtered;
pub mod aliased;
pub mod prefixed;

use std::sync::Arc;

use crate::model::Property;
use crate::name::{InvalidNameError, PropertyName};

pub use aliased::{AliasedSource, PropertyNameAliases};
pub use filtered::FilteredSource;
pub use map::MapPropertySource;
pub use prefixed::PrefixedSource;

// ============================================================================
// Descendant state
// ============================================================================

/// Answer to "does any descendant of this name exist in the source".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DescendantState {
    /// At least one descendant exists.
    Present,
    /// No descendant exists. The binder prunes the subtree.
    Absent,
    /// The source cannot tell cheaply.
    Unknown,
}

impl DescendantState {
    /// `Present` if any of `names` matches `predicate`, `Absent` otherwise.
    pub fn search<'a>(
        names: impl IntoIterator<Item = &'a PropertyName>,
        predicate: impl Fn(&PropertyName) -> bool,
    ) -> Self {
        if names.into_iter().any(|name| predicate(name)) {
            DescendantState::Present
        } else {
            DescendantState::Absent
        }
    }
}

// ============================================================================
// PropertySource trait
// ============================================================================

/// A name → value lookup.
///
/// Sources are read concurrently by independent bind calls and must not
/// change while a bind is running.
pub trait PropertySource: Send + Sync {
    /// Label used in diagnostics and origins.
    fn label(&self) -> &str {
        "unnamed source"
    }

    /// The property stored under `name`, if any.
    fn get(&self, name: &PropertyName) -> Option<Property>;

    /// Whether anything exists below `name`. Sources that cannot answer
    /// cheaply keep the default `Unknown`.
    fn contains_descendant_of(&self, name: &PropertyName) -> DescendantState {
        let _ = name;
        DescendantState::Unknown
    }

    /// Every name the source holds, for sources that can enumerate them.
    ///
    /// Map binding discovers keys only through this, and collection binding
    /// uses it to find indexes instead of probing.
    fn names(&self) -> Option<Vec<PropertyName>> {
        None
    }

    /// Whether `names` returns `Some`. Sources whose enumeration is costly
    /// should override this with a constant.
    fn is_iterable(&self) -> bool {
        self.names().is_some()
    }
}

// ============================================================================
// Decorators
// ============================================================================

/// Decorator constructors for shared sources.
pub trait PropertySourceExt {
    /// A view that only exposes names accepted by `predicate`.
    fn filter<F>(&self, predicate: F) -> Arc<dyn PropertySource>
    where
        F: Fn(&PropertyName) -> bool + Send + Sync + 'static;

    /// A view that also resolves the alternate names in `aliases`.
    fn with_aliases(&self, aliases: PropertyNameAliases) -> Arc<dyn PropertySource>;

    /// A view where `name` is looked up as `prefix.name`. A blank prefix
    /// returns this source unchanged.
    fn with_prefix(&self, prefix: &str) -> Result<Arc<dyn PropertySource>, InvalidNameError>;
}

impl PropertySourceExt for Arc<dyn PropertySource> {
    fn filter<F>(&self, predicate: F) -> Arc<dyn PropertySource>
    where
        F: Fn(&PropertyName) -> bool + Send + Sync + 'static,
    {
        Arc::new(FilteredSource::new(Arc::clone(self), predicate))
    }

    fn with_aliases(&self, aliases: PropertyNameAliases) -> Arc<dyn PropertySource> {
        Arc::new(AliasedSource::new(Arc::clone(self), aliases))
    }

    fn with_prefix(&self, prefix: &str) -> Result<Arc<dyn PropertySource>, InvalidNameError> {
        let prefix = prefix.trim();
        if prefix.is_empty() {
            return Ok(Arc::clone(self));
        }
        let prefix = PropertyName::parse(prefix)?;
        Ok(Arc::new(PrefixedSource::new(Arc::clone(self), prefix)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shared() -> Arc<dyn PropertySource> {
        Arc::new(
            MapPropertySource::new("test")
                .with("app.name", "demo")
                .with("app.server.port", 8080),
        )
    }

    #[test]
    fn test_search() {
        let names = [PropertyName::parse("a.b").unwrap()];
        let parent = PropertyName::parse("a").unwrap();
        assert_eq!(DescendantState::search(&names, |n| parent.is_ancestor_of(n)), DescendantState::Present);
        assert_eq!(DescendantState::search(&names, |n| n.is_ancestor_of(&parent)), DescendantState::Absent);
    }

    #[test]
    fn test_blank_prefix_returns_same_source() {
        let source = shared();
        let same = source.with_prefix("  ").unwrap();
        assert!(Arc::ptr_eq(&source, &same));
    }

    #[test]
    fn test_invalid_prefix_is_rejected() {
        assert!(shared().with_prefix("App").is_err());
    }

    #[test]
    fn test_decorators_stack() {
        let source = shared()
            .with_prefix("app")
            .unwrap()
            .filter(|name| name.len() == 1);
        let name = PropertyName::parse("name").unwrap();
        assert_eq!(source.get(&name).unwrap().value.as_str(), Some("demo"));
        assert!(source.get(&PropertyName::parse("server.port").unwrap()).is_none());
    }
}
