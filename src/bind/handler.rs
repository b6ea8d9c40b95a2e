//! # Bind Handlers
//!
//! Callbacks around every name the binder visits. A handler can skip a
//! name, rewrite a result, swallow a failure or veto the whole bind once the
//! root name finishes. Handlers chain: each wraps a parent and delegates to
//! it before applying its own logic.
//!
//! | Handler | Behavior |
//! |---------|----------|
//! | `DefaultBindHandler` | Pass-through; failures propagate |
//! | `IgnoreErrorsBindHandler` | Failures yield the existing value (or nothing) |
//! | `NoUnboundElementsBindHandler` | Fails the root bind if a source holds names below it that were never bound |

use hashbrown::HashSet;
use parking_lot::Mutex;

use super::{BindContext, BindError, Bindable};
use crate::model::{Property, Value};
use crate::name::PropertyName;

// ============================================================================
// BindHandler trait
// ============================================================================

/// Observer and veto point for each bind step.
///
/// Every method has a pass-through default.
pub trait BindHandler: Send + Sync {
    /// Called before `name` is bound. Returning `false` skips it.
    fn on_start(&self, name: &PropertyName, target: &Bindable, ctx: &BindContext<'_>) -> bool {
        let _ = (name, target, ctx);
        true
    }

    /// Called with a successfully bound value; may replace it.
    fn on_success(
        &self,
        name: &PropertyName,
        target: &Bindable,
        ctx: &BindContext<'_>,
        result: Value,
    ) -> Result<Value, BindError> {
        let _ = (name, target, ctx);
        Ok(result)
    }

    /// Called with a value created because nothing was bound.
    fn on_create(
        &self,
        name: &PropertyName,
        target: &Bindable,
        ctx: &BindContext<'_>,
        result: Value,
    ) -> Result<Value, BindError> {
        let _ = (name, target, ctx);
        Ok(result)
    }

    /// Called when binding `name` failed. Returning `Ok` recovers.
    fn on_failure(
        &self,
        name: &PropertyName,
        target: &Bindable,
        ctx: &BindContext<'_>,
        error: BindError,
    ) -> Result<Option<Value>, BindError> {
        let _ = (name, target, ctx);
        Err(error)
    }

    /// Called after `name` was bound, found nothing, or was skipped.
    /// Not called after a failure.
    fn on_finish(
        &self,
        name: &PropertyName,
        target: &Bindable,
        ctx: &BindContext<'_>,
        result: Option<&Value>,
    ) -> Result<(), BindError> {
        let _ = (name, target, ctx, result);
        Ok(())
    }
}

/// Pass-through handler.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultBindHandler;

impl BindHandler for DefaultBindHandler {}

impl<H: BindHandler + ?Sized> BindHandler for Box<H> {
    fn on_start(&self, name: &PropertyName, target: &Bindable, ctx: &BindContext<'_>) -> bool {
        (**self).on_start(name, target, ctx)
    }

    fn on_success(&self, name: &PropertyName, target: &Bindable, ctx: &BindContext<'_>, result: Value) -> Result<Value, BindError> {
        (**self).on_success(name, target, ctx, result)
    }

    fn on_create(&self, name: &PropertyName, target: &Bindable, ctx: &BindContext<'_>, result: Value) -> Result<Value, BindError> {
        (**self).on_create(name, target, ctx, result)
    }

    fn on_failure(
        &self,
        name: &PropertyName,
        target: &Bindable,
        ctx: &BindContext<'_>,
        error: BindError,
    ) -> Result<Option<Value>, BindError> {
        (**self).on_failure(name, target, ctx, error)
    }

    fn on_finish(&self, name: &PropertyName, target: &Bindable, ctx: &BindContext<'_>, result: Option<&Value>) -> Result<(), BindError> {
        (**self).on_finish(name, target, ctx, result)
    }
}

// ============================================================================
// IgnoreErrorsBindHandler
// ============================================================================

/// Turns failures into "use the existing value, or nothing".
pub struct IgnoreErrorsBindHandler {
    parent: Box<dyn BindHandler>,
}

impl IgnoreErrorsBindHandler {
    pub fn new(parent: impl BindHandler + 'static) -> Self {
        Self { parent: Box::new(parent) }
    }
}

impl Default for IgnoreErrorsBindHandler {
    fn default() -> Self {
        Self::new(DefaultBindHandler)
    }
}

impl BindHandler for IgnoreErrorsBindHandler {
    fn on_start(&self, name: &PropertyName, target: &Bindable, ctx: &BindContext<'_>) -> bool {
        self.parent.on_start(name, target, ctx)
    }

    fn on_success(&self, name: &PropertyName, target: &Bindable, ctx: &BindContext<'_>, result: Value) -> Result<Value, BindError> {
        self.parent.on_success(name, target, ctx, result)
    }

    fn on_create(&self, name: &PropertyName, target: &Bindable, ctx: &BindContext<'_>, result: Value) -> Result<Value, BindError> {
        self.parent.on_create(name, target, ctx, result)
    }

    fn on_failure(
        &self,
        name: &PropertyName,
        target: &Bindable,
        ctx: &BindContext<'_>,
        error: BindError,
    ) -> Result<Option<Value>, BindError> {
        match self.parent.on_failure(name, target, ctx, error) {
            Ok(recovered) => Ok(recovered),
            Err(error) => {
                tracing::debug!(name = %name, %error, "ignoring bind failure");
                Ok(target.existing().cloned())
            }
        }
    }

    fn on_finish(&self, name: &PropertyName, target: &Bindable, ctx: &BindContext<'_>, result: Option<&Value>) -> Result<(), BindError> {
        self.parent.on_finish(name, target, ctx, result)
    }
}

// ============================================================================
// NoUnboundElementsBindHandler
// ============================================================================

/// Rejects configuration that nothing consumed.
///
/// Tracks every name bound successfully. When the root name finishes, any
/// name below it held by an iterable source and never bound is reported as
/// [`BindError::UnboundProperties`]. Collection elements overridden by a
/// single value bound at their parent do not count.
///
/// Bound names accumulate across bind calls; use a fresh handler per root.
pub struct NoUnboundElementsBindHandler {
    parent: Box<dyn BindHandler>,
    bound: Mutex<HashSet<PropertyName>>,
}

impl NoUnboundElementsBindHandler {
    pub fn new(parent: impl BindHandler + 'static) -> Self {
        Self { parent: Box::new(parent), bound: Mutex::new(HashSet::new()) }
    }

    fn check_no_unbound_elements(&self, name: &PropertyName, ctx: &BindContext<'_>) -> Result<(), BindError> {
        let bound = self.bound.lock();
        let mut unbound: Vec<Property> = Vec::new();
        for (_, source) in ctx.sources() {
            let Some(names) = source.names() else { continue };
            for candidate in names {
                if !name.is_ancestor_of(&candidate)
                    || bound.contains(&candidate)
                    || is_overridden_collection_element(&bound, &candidate)
                    || unbound.iter().any(|property| property.name == candidate)
                {
                    continue;
                }
                if let Some(property) = source.get(&candidate) {
                    unbound.push(property);
                }
            }
        }
        if unbound.is_empty() {
            return Ok(());
        }
        unbound.sort_by(|a, b| a.name.cmp(&b.name));
        Err(BindError::UnboundProperties { properties: unbound })
    }
}

impl Default for NoUnboundElementsBindHandler {
    fn default() -> Self {
        Self::new(DefaultBindHandler)
    }
}

fn is_overridden_collection_element(bound: &HashSet<PropertyName>, candidate: &PropertyName) -> bool {
    (0..candidate.len())
        .filter(|&i| candidate.is_numeric_index(i))
        .any(|i| bound.contains(&candidate.chop(i)))
}

impl BindHandler for NoUnboundElementsBindHandler {
    fn on_start(&self, name: &PropertyName, target: &Bindable, ctx: &BindContext<'_>) -> bool {
        self.parent.on_start(name, target, ctx)
    }

    fn on_success(&self, name: &PropertyName, target: &Bindable, ctx: &BindContext<'_>, result: Value) -> Result<Value, BindError> {
        self.bound.lock().insert(name.clone());
        self.parent.on_success(name, target, ctx, result)
    }

    fn on_create(&self, name: &PropertyName, target: &Bindable, ctx: &BindContext<'_>, result: Value) -> Result<Value, BindError> {
        self.parent.on_create(name, target, ctx, result)
    }

    fn on_failure(
        &self,
        name: &PropertyName,
        target: &Bindable,
        ctx: &BindContext<'_>,
        error: BindError,
    ) -> Result<Option<Value>, BindError> {
        self.parent.on_failure(name, target, ctx, error)
    }

    fn on_finish(&self, name: &PropertyName, target: &Bindable, ctx: &BindContext<'_>, result: Option<&Value>) -> Result<(), BindError> {
        self.parent.on_finish(name, target, ctx, result)?;
        if ctx.depth() == 0 {
            self.check_no_unbound_elements(name, ctx)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> PropertyName {
        PropertyName::parse(s).unwrap()
    }

    #[test]
    fn test_overridden_collection_element() {
        let mut bound = HashSet::new();
        bound.insert(name("app.ports"));
        assert!(is_overridden_collection_element(&bound, &name("app.ports[1]")));
        assert!(is_overridden_collection_element(&bound, &name("app.ports[0].host")));
        assert!(!is_overridden_collection_element(&bound, &name("app.hosts[0]")));
        assert!(!is_overridden_collection_element(&bound, &name("app.ports.extra")));
    }
}
