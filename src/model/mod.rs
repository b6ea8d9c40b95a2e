//! # Binding Model
//!
//! Plain data shared by sources and the binder:
//!
//! - [`Value`]: what sources hold and what binding produces
//! - [`Property`]: a value plus the name and origin it was found under
//! - [`Shape`]: what a bind target looks like, and [`Describe`] to derive
//!   it from Rust types
//!
//! Nothing here performs lookups or holds state.

pub mod value;
pub mod property;
pub mod shape;

pub use value::Value;
pub use property::Property;
pub use shape::{
    CompositeKind, CompositeShape, Constructor, Describe, DescribeKey,
    ParamDefault, Parameter, PropertyDescriptor, ScalarKind, Shape, ShapeRef,
};
