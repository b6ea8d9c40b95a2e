//! Predicate-filtered view over another source.

use std::sync::Arc;

use super::{DescendantState, PropertySource};
use crate::model::Property;
use crate::name::PropertyName;

/// Exposes only the names of `source` accepted by a predicate.
pub struct FilteredSource {
    source: Arc<dyn PropertySource>,
    predicate: Box<dyn Fn(&PropertyName) -> bool + Send + Sync>,
}

impl FilteredSource {
    pub fn new<F>(source: Arc<dyn PropertySource>, predicate: F) -> Self
    where
        F: Fn(&PropertyName) -> bool + Send + Sync + 'static,
    {
        Self { source, predicate: Box::new(predicate) }
    }
}

impl PropertySource for FilteredSource {
    fn label(&self) -> &str {
        self.source.label()
    }

    fn get(&self, name: &PropertyName) -> Option<Property> {
        if !(self.predicate)(name) {
            return None;
        }
        self.source.get(name)
    }

    fn contains_descendant_of(&self, name: &PropertyName) -> DescendantState {
        if let Some(names) = self.source.names() {
            return DescendantState::search(&names, |candidate| {
                name.is_ancestor_of(candidate) && (self.predicate)(candidate)
            });
        }
        // the delegate's descendants may all be filtered out
        match self.source.contains_descendant_of(name) {
            DescendantState::Present => DescendantState::Unknown,
            other => other,
        }
    }

    fn names(&self) -> Option<Vec<PropertyName>> {
        let mut names = self.source.names()?;
        names.retain(|name| (self.predicate)(name));
        Some(names)
    }

    fn is_iterable(&self) -> bool {
        self.source.is_iterable()
    }
}
