//! Per-bind-call state threaded through the recursion.

use std::sync::Arc;

use super::{BindError, BindHandler, Bindable, Binder};
use crate::model::{Property, Value};
use crate::name::{PropertyName, to_dashed_form};
use crate::source::PropertySource;

/// State of one top-level bind call.
///
/// Tracks recursion depth, an optional restriction to a single source
/// (collection elements are read from the source that listed them), the
/// composite types currently being assembled, and whether the current
/// position sits inside a constructor-bound object. Never shared across
/// threads and dropped when the call returns.
pub struct BindContext<'a> {
    binder: &'a Binder,
    handler: &'a dyn BindHandler,
    depth: usize,
    source: Option<usize>,
    data_objects: Vec<String>,
    constructor_bindings: usize,
    property: Option<Property>,
}

impl<'a> BindContext<'a> {
    pub(crate) fn new(binder: &'a Binder, handler: &'a dyn BindHandler) -> Self {
        Self {
            binder,
            handler,
            depth: 0,
            source: None,
            data_objects: Vec::new(),
            constructor_bindings: 0,
            property: None,
        }
    }

    pub fn binder(&self) -> &'a Binder {
        self.binder
    }

    pub(crate) fn handler(&self) -> &'a dyn BindHandler {
        self.handler
    }

    /// Nesting level: 0 while binding the root name.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Sources visible at this point, with their binder index, in priority
    /// order. Only one while binding is restricted to a single source.
    pub fn sources(&self) -> impl Iterator<Item = (usize, &'a Arc<dyn PropertySource>)> + use<'a> {
        let all = self.binder.sources();
        let range = match self.source {
            Some(index) => index..index + 1,
            None => 0..all.len(),
        };
        let start = range.start;
        all[range].iter().enumerate().map(move |(offset, source)| (start + offset, source))
    }

    /// Whether a constructor-bound object is being assembled further up.
    pub fn is_nested_constructor_binding(&self) -> bool {
        self.constructor_bindings > 0
    }

    /// The last property converted at a leaf position.
    pub fn property(&self) -> Option<&Property> {
        self.property.as_ref()
    }

    pub(crate) fn set_property(&mut self, property: Option<Property>) {
        self.property = property;
    }

    pub(crate) fn is_binding_data_object(&self, type_name: &str) -> bool {
        self.data_objects.iter().any(|bound| bound == type_name)
    }

    // ------------------------------------------------------------------------
    // Scoped state
    // ------------------------------------------------------------------------

    fn increase_depth(&mut self, name: &PropertyName) -> Result<(), BindError> {
        let max_depth = self.binder.options().max_depth;
        if self.depth >= max_depth {
            return Err(BindError::DepthExceeded { name: name.clone(), max_depth });
        }
        self.depth += 1;
        Ok(())
    }

    pub(crate) fn with_increased_depth<R>(
        &mut self,
        name: &PropertyName,
        f: impl FnOnce(&mut Self) -> Result<R, BindError>,
    ) -> Result<R, BindError> {
        self.increase_depth(name)?;
        let result = f(self);
        self.depth -= 1;
        result
    }

    pub(crate) fn with_source<R>(&mut self, source: Option<usize>, f: impl FnOnce(&mut Self) -> R) -> R {
        let Some(source) = source else {
            return f(self);
        };
        let previous = self.source.replace(source);
        let result = f(self);
        self.source = previous;
        result
    }

    pub(crate) fn with_data_object<R>(
        &mut self,
        name: &PropertyName,
        type_name: &str,
        f: impl FnOnce(&mut Self) -> Result<R, BindError>,
    ) -> Result<R, BindError> {
        self.increase_depth(name)?;
        self.data_objects.push(type_name.to_owned());
        let result = f(self);
        self.data_objects.pop();
        self.depth -= 1;
        result
    }

    pub(crate) fn with_constructor_binding<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        self.constructor_bindings += 1;
        let result = f(self);
        self.constructor_bindings -= 1;
        self.property = None;
        result
    }

    // ------------------------------------------------------------------------
    // Recursion helpers
    // ------------------------------------------------------------------------

    /// Bind the child of `parent` named after a parameter or property
    /// (`maxRetries` binds `parent.max-retries`).
    pub(crate) fn bind_property(
        &mut self,
        parent: &PropertyName,
        property: &str,
        target: &Bindable,
    ) -> Result<Option<Value>, BindError> {
        let name = parent.append(&to_dashed_form(property))?;
        let binder = self.binder;
        binder.bind_target(&name, target, self, false, false)
    }
}
