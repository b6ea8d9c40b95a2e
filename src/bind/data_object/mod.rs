//! # Data Object Binding
//!
//! Composite targets are assembled by one of two strategies, tried in a
//! fixed order:
//!
//! | Strategy | Applies when | Builds the value by |
//! |----------|--------------|---------------------|
//! | `ConstructorBinder` | a binding constructor is marked or can be deduced | binding each parameter |
//! | `FieldBinder` | an instance exists or can be default-constructed | binding each property onto it |
//!
//! The first strategy that returns a value wins. A [`BindMethod`] on the
//! target narrows the list to one strategy.

mod constructor;
mod fields;

use super::{BindContext, BindError, BindMethod, Bindable};
use crate::model::{CompositeShape, Value};
use crate::name::PropertyName;

pub(crate) use constructor::ConstructorBinder;
pub(crate) use fields::FieldBinder;

pub(crate) trait DataObjectBinder: Sync {
    /// Bind `composite` at `name`. `None` when the strategy does not apply
    /// or nothing below `name` was bound.
    fn bind(
        &self,
        name: &PropertyName,
        target: &Bindable,
        composite: &CompositeShape,
        ctx: &mut BindContext<'_>,
    ) -> Result<Option<Value>, BindError>;

    /// A fresh instance with nothing bound, if this strategy can make one.
    fn create(
        &self,
        target: &Bindable,
        composite: &CompositeShape,
        ctx: &mut BindContext<'_>,
    ) -> Result<Option<Value>, BindError>;
}

const ALL: &[&dyn DataObjectBinder] = &[&ConstructorBinder, &FieldBinder];
const CONSTRUCTOR: &[&dyn DataObjectBinder] = &[&ConstructorBinder];
const FIELDS: &[&dyn DataObjectBinder] = &[&FieldBinder];

/// Strategies to try for a target, in order.
pub(crate) fn strategies(bind_method: Option<BindMethod>) -> &'static [&'static dyn DataObjectBinder] {
    match bind_method {
        None => ALL,
        Some(BindMethod::Constructor) => CONSTRUCTOR,
        Some(BindMethod::Fields) => FIELDS,
    }
}
