//! # Type Shapes
//!
//! The binder never looks at Rust types directly. It walks a [`Shape`]: a
//! description of what a target looks like (scalar, array, list, set, map or
//! composite), which constructors a composite offers and which properties it
//! exposes. [`Describe`] produces the shape for a Rust type.
//!
//! ```rust
//! use propbind::model::{CompositeShape, Constructor, Describe, Parameter, Shape};
//!
//! struct Server;
//!
//! impl Describe for Server {
//!     fn shape() -> Shape {
//!         CompositeShape::record("Server")
//!             .with_constructor(Constructor::new([
//!                 Parameter::required("host", String::shape()),
//!                 Parameter::required("port", u16::shape()),
//!             ]))
//!             .into_shape()
//!     }
//! }
//! ```

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::Serialize;

use super::Value;

// ============================================================================
// Scalars
// ============================================================================

/// Leaf types the converter can produce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScalarKind {
    String,
    Bool,
    /// Integer with inclusive bounds. Bounds are clamped to the `i64` range.
    Int { min: i64, max: i64 },
    Float,
    Char,
    /// One of a fixed set of variant names.
    Enum(&'static [&'static str]),
}

impl ScalarKind {
    pub const fn int(min: i128, max: i128) -> Self {
        let min = if min < i64::MIN as i128 { i64::MIN } else { min as i64 };
        let max = if max > i64::MAX as i128 { i64::MAX } else { max as i64 };
        ScalarKind::Int { min, max }
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarKind::String => write!(f, "string"),
            ScalarKind::Bool => write!(f, "boolean"),
            ScalarKind::Int { min, max } => write!(f, "integer in [{min}, {max}]"),
            ScalarKind::Float => write!(f, "float"),
            ScalarKind::Char => write!(f, "char"),
            ScalarKind::Enum(variants) => write!(f, "one of [{}]", variants.join(", ")),
        }
    }
}

// ============================================================================
// Shapes
// ============================================================================

/// Reference to a nested shape.
///
/// `Lazy` defers building the shape until the binder descends into it, which
/// is what makes self-referential types describable.
#[derive(Clone)]
pub enum ShapeRef {
    Eager(Box<Shape>),
    Lazy(fn() -> Shape),
}

impl ShapeRef {
    pub fn of<T: Describe>() -> Self {
        ShapeRef::Lazy(T::shape)
    }

    pub fn resolve(&self) -> Shape {
        match self {
            ShapeRef::Eager(shape) => (**shape).clone(),
            ShapeRef::Lazy(build) => build(),
        }
    }
}

impl From<Shape> for ShapeRef {
    fn from(shape: Shape) -> Self {
        ShapeRef::Eager(Box::new(shape))
    }
}

impl fmt::Debug for ShapeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShapeRef::Eager(shape) => write!(f, "{shape:?}"),
            ShapeRef::Lazy(_) => write!(f, "<lazy>"),
        }
    }
}

/// Resolved shape of a bind target.
#[derive(Debug, Clone)]
pub enum Shape {
    Scalar(ScalarKind),
    /// Fixed array: a newly bound array replaces an existing one.
    Array(ShapeRef),
    /// Ordered collection.
    List(ShapeRef),
    /// Unordered collection without duplicates.
    Set(ShapeRef),
    Map { key: ScalarKind, value: ShapeRef },
    Composite(Arc<CompositeShape>),
}

impl Shape {
    pub fn list_of(element: impl Into<ShapeRef>) -> Self {
        Shape::List(element.into())
    }

    pub fn map_of(key: ScalarKind, value: impl Into<ShapeRef>) -> Self {
        Shape::Map { key, value: value.into() }
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self, Shape::Scalar(_))
    }

    pub fn is_aggregate(&self) -> bool {
        matches!(self, Shape::Array(_) | Shape::List(_) | Shape::Set(_) | Shape::Map { .. })
    }

    /// Element shape of an array, list or set.
    pub fn element(&self) -> Option<Shape> {
        match self {
            Shape::Array(element) | Shape::List(element) | Shape::Set(element) => Some(element.resolve()),
            _ => None,
        }
    }

    pub fn as_composite(&self) -> Option<&CompositeShape> {
        match self {
            Shape::Composite(composite) => Some(composite),
            _ => None,
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shape::Scalar(kind) => write!(f, "{kind}"),
            Shape::Array(element) => write!(f, "array<{}>", element.resolve()),
            Shape::List(element) => write!(f, "list<{}>", element.resolve()),
            Shape::Set(element) => write!(f, "set<{}>", element.resolve()),
            Shape::Map { key, value } => write!(f, "map<{key}, {}>", value.resolve()),
            Shape::Composite(composite) => write!(f, "{}", composite.type_name),
        }
    }
}

impl From<ScalarKind> for Shape {
    fn from(kind: ScalarKind) -> Self {
        Shape::Scalar(kind)
    }
}

impl From<CompositeShape> for Shape {
    fn from(composite: CompositeShape) -> Self {
        Shape::Composite(Arc::new(composite))
    }
}

// ============================================================================
// Composites
// ============================================================================

/// How instances of a composite come into being.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompositeKind {
    /// Natively immutable: built from its constructor parameters.
    Record,
    /// Mutable: default-constructed, then assigned property by property.
    Bean,
}

/// Fallback for a constructor parameter that no source supplied.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamDefault {
    /// Missing value is an error once any sibling parameter was bound.
    Required,
    /// Missing value is simply left out.
    Optional,
    /// Missing value is replaced by this one (converted like a source value).
    Value(Value),
}

#[derive(Debug, Clone)]
pub struct Parameter {
    pub name: String,
    pub shape: ShapeRef,
    pub default: ParamDefault,
}

impl Parameter {
    pub fn required(name: impl Into<String>, shape: impl Into<ShapeRef>) -> Self {
        Self { name: name.into(), shape: shape.into(), default: ParamDefault::Required }
    }

    pub fn optional(name: impl Into<String>, shape: impl Into<ShapeRef>) -> Self {
        Self { name: name.into(), shape: shape.into(), default: ParamDefault::Optional }
    }

    pub fn with_default(name: impl Into<String>, shape: impl Into<ShapeRef>, default: impl Into<Value>) -> Self {
        Self { name: name.into(), shape: shape.into(), default: ParamDefault::Value(default.into()) }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Constructor {
    pub params: Vec<Parameter>,
    /// Explicit "bind via this constructor" marker.
    pub bind_directive: bool,
}

impl Constructor {
    pub fn new(params: impl IntoIterator<Item = Parameter>) -> Self {
        Self { params: params.into_iter().collect(), bind_directive: false }
    }

    pub fn marked(mut self) -> Self {
        self.bind_directive = true;
        self
    }
}

/// A property of a bean-like composite.
#[derive(Debug, Clone)]
pub struct PropertyDescriptor {
    pub name: String,
    pub shape: ShapeRef,
    /// `false` for getter-only properties.
    pub writable: bool,
}

/// Constructors, properties and defaults of a composite type.
#[derive(Debug, Clone)]
pub struct CompositeShape {
    pub type_name: String,
    pub kind: CompositeKind,
    /// Type-level "bind via constructor" directive.
    pub bind_via_constructor: bool,
    pub constructors: Vec<Constructor>,
    pub properties: Vec<PropertyDescriptor>,
    /// State of a freshly default-constructed instance, as a map value.
    pub default_instance: Option<Value>,
}

impl CompositeShape {
    fn new(type_name: impl Into<String>, kind: CompositeKind) -> Self {
        Self {
            type_name: type_name.into(),
            kind,
            bind_via_constructor: false,
            constructors: Vec::new(),
            properties: Vec::new(),
            default_instance: None,
        }
    }

    pub fn record(type_name: impl Into<String>) -> Self {
        Self::new(type_name, CompositeKind::Record)
    }

    pub fn bean(type_name: impl Into<String>) -> Self {
        Self::new(type_name, CompositeKind::Bean)
    }

    pub fn with_constructor(mut self, constructor: Constructor) -> Self {
        self.constructors.push(constructor);
        self
    }

    pub fn with_property(mut self, name: impl Into<String>, shape: impl Into<ShapeRef>) -> Self {
        self.properties.push(PropertyDescriptor { name: name.into(), shape: shape.into(), writable: true });
        self
    }

    pub fn with_read_only_property(mut self, name: impl Into<String>, shape: impl Into<ShapeRef>) -> Self {
        self.properties.push(PropertyDescriptor { name: name.into(), shape: shape.into(), writable: false });
        self
    }

    pub fn with_default_instance(mut self, instance: Value) -> Self {
        self.default_instance = Some(instance);
        self
    }

    /// Use `T::default()` as the default instance. Types whose default does
    /// not serialize to a map are left without one.
    pub fn with_default<T: Default + Serialize>(mut self) -> Self {
        self.default_instance = serde_json::to_value(T::default())
            .ok()
            .map(Value::from)
            .filter(|value| matches!(value, Value::Map(_)));
        self
    }

    pub fn bind_via_constructor(mut self) -> Self {
        self.bind_via_constructor = true;
        self
    }

    pub fn into_shape(self) -> Shape {
        self.into()
    }
}

// ============================================================================
// Describe
// ============================================================================

/// Produces the bind shape of a Rust type.
pub trait Describe {
    fn shape() -> Shape;
}

/// Types usable as map keys: their textual key converts to this scalar.
pub trait DescribeKey {
    fn key_kind() -> ScalarKind;
}

macro_rules! describe_scalar {
    ($($ty:ty => $kind:expr),* $(,)?) => {$(
        impl Describe for $ty {
            fn shape() -> Shape { Shape::Scalar($kind) }
        }
        impl DescribeKey for $ty {
            fn key_kind() -> ScalarKind { $kind }
        }
    )*};
}

describe_scalar! {
    String => ScalarKind::String,
    bool => ScalarKind::Bool,
    char => ScalarKind::Char,
    i8 => ScalarKind::int(i8::MIN as i128, i8::MAX as i128),
    i16 => ScalarKind::int(i16::MIN as i128, i16::MAX as i128),
    i32 => ScalarKind::int(i32::MIN as i128, i32::MAX as i128),
    i64 => ScalarKind::int(i64::MIN as i128, i64::MAX as i128),
    isize => ScalarKind::int(isize::MIN as i128, isize::MAX as i128),
    u8 => ScalarKind::int(0, u8::MAX as i128),
    u16 => ScalarKind::int(0, u16::MAX as i128),
    u32 => ScalarKind::int(0, u32::MAX as i128),
    u64 => ScalarKind::int(0, u64::MAX as i128),
    usize => ScalarKind::int(0, usize::MAX as i128),
}

impl Describe for f32 {
    fn shape() -> Shape { Shape::Scalar(ScalarKind::Float) }
}

impl Describe for f64 {
    fn shape() -> Shape { Shape::Scalar(ScalarKind::Float) }
}

impl<T: Describe> Describe for Option<T> {
    fn shape() -> Shape { T::shape() }
}

impl<T: Describe> Describe for Box<T> {
    fn shape() -> Shape { T::shape() }
}

impl<T: Describe> Describe for Vec<T> {
    fn shape() -> Shape { Shape::List(ShapeRef::of::<T>()) }
}

impl<T: Describe> Describe for VecDeque<T> {
    fn shape() -> Shape { Shape::List(ShapeRef::of::<T>()) }
}

impl<T: Describe, const N: usize> Describe for [T; N] {
    fn shape() -> Shape { Shape::Array(ShapeRef::of::<T>()) }
}

impl<T: Describe, S> Describe for HashSet<T, S> {
    fn shape() -> Shape { Shape::Set(ShapeRef::of::<T>()) }
}

impl<T: Describe> Describe for BTreeSet<T> {
    fn shape() -> Shape { Shape::Set(ShapeRef::of::<T>()) }
}

impl<K: DescribeKey, V: Describe, S> Describe for HashMap<K, V, S> {
    fn shape() -> Shape { Shape::Map { key: K::key_kind(), value: ShapeRef::of::<V>() } }
}

impl<K: DescribeKey, V: Describe> Describe for BTreeMap<K, V> {
    fn shape() -> Shape { Shape::Map { key: K::key_kind(), value: ShapeRef::of::<V>() } }
}

impl<K: DescribeKey, V: Describe, S> Describe for IndexMap<K, V, S> {
    fn shape() -> Shape { Shape::Map { key: K::key_kind(), value: ShapeRef::of::<V>() } }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Tree;

    impl Describe for Tree {
        fn shape() -> Shape {
            CompositeShape::record("Tree")
                .with_constructor(Constructor::new([
                    Parameter::required("label", String::shape()),
                    Parameter::optional("children", ShapeRef::of::<Vec<Tree>>()),
                ]))
                .into_shape()
        }
    }

    #[test]
    fn test_integer_bounds_follow_type() {
        assert!(matches!(u8::shape(), Shape::Scalar(ScalarKind::Int { min: 0, max: 255 })));
        assert!(matches!(u64::shape(), Shape::Scalar(ScalarKind::Int { min: 0, max: i64::MAX })));
    }

    #[test]
    fn test_container_shapes() {
        assert_eq!(Vec::<u16>::shape().to_string(), "list<integer in [0, 65535]>");
        assert_eq!(HashMap::<String, bool>::shape().to_string(), "map<string, boolean>");
        assert_eq!(<[char; 2]>::shape().to_string(), "array<char>");
        assert_eq!(BTreeSet::<String>::shape().to_string(), "set<string>");
        assert_eq!(Option::<Box<f64>>::shape().to_string(), "float");
    }

    #[test]
    fn test_self_referential_shape_resolves_lazily() {
        let shape = Tree::shape();
        let composite = shape.as_composite().unwrap();
        let children = composite.constructors[0].params[1].shape.resolve();
        let element = children.element().unwrap();
        assert_eq!(element.as_composite().unwrap().type_name, "Tree");
    }

    #[test]
    fn test_default_instance_from_type() {
        #[derive(Default, Serialize)]
        struct Retry {
            attempts: u32,
        }
        let composite = CompositeShape::bean("Retry").with_default::<Retry>();
        let expected: Value = [("attempts", Value::Int(0))].into_iter().collect();
        assert_eq!(composite.default_instance, Some(expected));
    }
}
