//! # Aggregate Binding
//!
//! Strategies for array, list, set and map targets. Each strategy
//! enumerates candidate child names, binds every element recursively and
//! merges the result into the target's existing value:
//!
//! | Shape | Merge with existing |
//! |-------|---------------------|
//! | Array | Replaced entirely |
//! | List | Bound indexes overwrite, extra elements append; a single delimited value replaces |
//! | Set | Union |
//! | Map | Bound keys overwrite, other keys are kept |

mod indexed;
mod map;

use super::{BindContext, BindError, Bindable};
use crate::model::{Shape, Value};
use crate::name::PropertyName;
use crate::source::PropertySource;

pub(crate) use indexed::IndexedElementsBinder;
pub(crate) use map::MapBinder;

pub(crate) trait AggregateBinder {
    /// Whether elements read from `source` may recurse into a composite
    /// type that is already being bound. `None` means "all sources".
    fn allows_recursive_binding(&self, source: Option<&dyn PropertySource>) -> bool;

    /// Bind the aggregate itself, ignoring any existing value.
    fn bind_aggregate(
        &self,
        name: &PropertyName,
        target: &Bindable,
        ctx: &mut BindContext<'_>,
    ) -> Result<Option<Value>, BindError>;

    /// Fold a freshly bound aggregate into the existing one.
    fn merge(&self, existing: &Value, additional: Value) -> Value;

    fn bind(&self, name: &PropertyName, target: &Bindable, ctx: &mut BindContext<'_>) -> Result<Option<Value>, BindError> {
        let result = ctx.with_increased_depth(name, |ctx| self.bind_aggregate(name, target, ctx))?;
        Ok(match (result, target.existing()) {
            (Some(additional), Some(existing)) => Some(self.merge(existing, additional)),
            (result, _) => result,
        })
    }

    /// Bind one element, restricted to `source` when given.
    fn bind_element(
        &self,
        name: &PropertyName,
        target: &Bindable,
        ctx: &mut BindContext<'_>,
        source: Option<usize>,
    ) -> Result<Option<Value>, BindError> {
        let binder = ctx.binder();
        let allow_recursive = self.allows_recursive_binding(source.map(|index| &*binder.sources()[index]));
        ctx.with_source(source, |ctx| binder.bind_target(name, target, ctx, allow_recursive, false))
    }
}

/// The aggregate strategy for `shape`, if it is an aggregate.
pub(crate) fn for_shape(shape: &Shape) -> Option<Box<dyn AggregateBinder>> {
    match shape {
        Shape::Array(_) => Some(Box::new(IndexedElementsBinder::array())),
        Shape::List(_) => Some(Box::new(IndexedElementsBinder::list())),
        Shape::Set(_) => Some(Box::new(IndexedElementsBinder::set())),
        Shape::Map { .. } => Some(Box::new(MapBinder)),
        Shape::Scalar(_) | Shape::Composite(_) => None,
    }
}
