//! Description of what is being bound.

use smallvec::SmallVec;

use crate::model::{Describe, Shape, Value};

/// Restrictions that narrow how a target may be bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindRestriction {
    /// Never bind from a property stored directly under the target name;
    /// only nested properties count.
    NoDirectProperty,
}

/// Forces one data-object strategy for a composite target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindMethod {
    /// Default-construct (or reuse the existing value) and assign properties.
    Fields,
    /// Build through the binding constructor.
    Constructor,
}

/// A bind target: shape, optional existing value, hints and restrictions.
///
/// Immutable; the `with_*` methods return a new target.
#[derive(Debug, Clone)]
pub struct Bindable {
    shape: Shape,
    existing: Option<Value>,
    restrictions: SmallVec<[BindRestriction; 1]>,
    bind_method: Option<BindMethod>,
}

impl Bindable {
    pub fn of(shape: impl Into<Shape>) -> Self {
        Self {
            shape: shape.into(),
            existing: None,
            restrictions: SmallVec::new(),
            bind_method: None,
        }
    }

    pub fn of_type<T: Describe>() -> Self {
        Self::of(T::shape())
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// The existing value, if one was supplied and it is not null.
    pub fn existing(&self) -> Option<&Value> {
        self.existing.as_ref().filter(|value| !value.is_null())
    }

    pub fn has_restriction(&self, restriction: BindRestriction) -> bool {
        self.restrictions.contains(&restriction)
    }

    pub fn bind_method(&self) -> Option<BindMethod> {
        self.bind_method
    }

    pub fn with_existing(mut self, value: Value) -> Self {
        self.existing = Some(value);
        self
    }

    pub fn without_existing(mut self) -> Self {
        self.existing = None;
        self
    }

    pub fn with_restriction(mut self, restriction: BindRestriction) -> Self {
        if !self.restrictions.contains(&restriction) {
            self.restrictions.push(restriction);
        }
        self
    }

    pub fn with_bind_method(mut self, bind_method: BindMethod) -> Self {
        self.bind_method = Some(bind_method);
        self
    }
}
