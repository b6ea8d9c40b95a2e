//! # Binder
//!
//! Turns the flat name → value view of the configured sources into a
//! [`Value`] shaped like the target. Binding walks the target shape top
//! down:
//!
//! 1. A scalar target converts the property stored directly under its name.
//! 2. An aggregate target (array, list, set, map) enumerates child names and
//!    binds each element recursively, then merges into any existing value.
//! 3. A composite target is assembled by the first data-object strategy that
//!    applies (constructor, then fields).
//!
//! Below the root, a name for which every source answers
//! [`DescendantState::Absent`] is pruned without being visited. A name that
//! binds nothing is `Ok(None)`; only real failures are errors.
//!
//! ## Entry points
//!
//! | Method | Returns |
//! |--------|---------|
//! | [`Binder::bind`] | `Option<Value>` |
//! | [`Binder::bind_or_create`] | `Value`, default-constructed when nothing bound |
//! | [`Binder::bind_as`] | `Option<T>` for any `T: Describe + DeserializeOwned` |
//! | [`Binder::bind_instance`] | `T`, with unbound fields kept from the given instance |

mod aggregate;
mod bindable;
mod context;
mod convert;
mod data_object;
mod handler;

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::Deserialize;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::model::{CompositeShape, Describe, Property, ScalarKind, Shape, Value};
use crate::name::{InvalidNameError, PropertyName};
use crate::source::{DescendantState, PropertySource};
use crate::{Error, Result};

pub use bindable::{BindMethod, BindRestriction, Bindable};
pub use context::BindContext;
pub use convert::{ConversionFailure, Converter, DefaultConverter};
pub use handler::{BindHandler, DefaultBindHandler, IgnoreErrorsBindHandler, NoUnboundElementsBindHandler};

// ============================================================================
// Errors
// ============================================================================

/// Why binding a name failed.
#[derive(Debug, thiserror::Error)]
pub enum BindError {
    #[error("cannot convert '{name}' = {value}{} to {target}: {reason}", origin_suffix(.origin))]
    Conversion {
        name: PropertyName,
        value: Value,
        target: String,
        origin: Option<String>,
        reason: String,
    },

    #[error("no value bound for required parameter '{parameter}' of {type_name} at '{name}'")]
    MissingParameter { name: PropertyName, parameter: String, type_name: String },

    #[error("{type_name} has more than one binding constructor")]
    AmbiguousConstructor { type_name: String },

    #[error("binding constructor of {type_name} takes no parameters")]
    InvalidConstructor { type_name: String },

    #[error("maximum bind depth {max_depth} exceeded at '{name}'")]
    DepthExceeded { name: PropertyName, max_depth: usize },

    #[error("properties were left unbound: {}", list_properties(.properties))]
    UnboundProperties { properties: Vec<Property> },

    #[error("cannot set read-only property '{property}' of {type_name} at '{name}'")]
    ReadOnlyProperty { name: PropertyName, property: String, type_name: String },

    #[error("cannot create an instance of {type_name}")]
    Uncreatable { type_name: String },

    #[error("bound value does not fit {target}: {source}")]
    TypeMismatch {
        target: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    InvalidName(#[from] InvalidNameError),
}

impl BindError {
    pub(crate) fn conversion(property: &Property, target: impl fmt::Display, reason: impl Into<String>) -> Self {
        BindError::Conversion {
            name: property.name.clone(),
            value: property.value.clone(),
            target: target.to_string(),
            origin: property.origin.clone(),
            reason: reason.into(),
        }
    }
}

fn origin_suffix(origin: &Option<String>) -> String {
    origin.as_deref().map(|origin| format!(" (from {origin})")).unwrap_or_default()
}

fn list_properties(properties: &[Property]) -> String {
    properties.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}

// ============================================================================
// Options
// ============================================================================

/// Tunables for a [`Binder`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BinderOptions {
    /// Nesting limit for aggregates and composites.
    pub max_depth: usize,
    /// Separator used to split a single value into collection elements.
    pub list_delimiter: char,
    /// Trim whitespace around split elements.
    pub trim_list_elements: bool,
}

impl Default for BinderOptions {
    fn default() -> Self {
        Self { max_depth: 64, list_delimiter: ',', trim_list_elements: true }
    }
}

// ============================================================================
// Binder
// ============================================================================

/// Binds targets from an ordered list of sources. Earlier sources win.
///
/// A binder holds no per-call state and can be shared across threads; each
/// call gets its own [`BindContext`].
pub struct Binder {
    sources: Vec<Arc<dyn PropertySource>>,
    converter: Arc<dyn Converter>,
    handler: Arc<dyn BindHandler>,
    options: BinderOptions,
}

impl fmt::Debug for Binder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binder")
            .field("sources", &self.sources.iter().map(|source| source.label()).collect::<Vec<_>>())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Binder {
    pub fn new(sources: impl IntoIterator<Item = Arc<dyn PropertySource>>) -> Self {
        Self {
            sources: sources.into_iter().collect(),
            converter: Arc::new(DefaultConverter),
            handler: Arc::new(DefaultBindHandler),
            options: BinderOptions::default(),
        }
    }

    pub fn with_converter(mut self, converter: impl Converter + 'static) -> Self {
        self.converter = Arc::new(converter);
        self
    }

    /// Handler used by calls that do not pass their own.
    pub fn with_handler(mut self, handler: impl BindHandler + 'static) -> Self {
        self.handler = Arc::new(handler);
        self
    }

    pub fn with_options(mut self, options: BinderOptions) -> Self {
        self.options = options;
        self
    }

    pub fn sources(&self) -> &[Arc<dyn PropertySource>] {
        &self.sources
    }

    pub fn options(&self) -> &BinderOptions {
        &self.options
    }

    pub fn converter(&self) -> &dyn Converter {
        &*self.converter
    }

    // ------------------------------------------------------------------------
    // Public entry points
    // ------------------------------------------------------------------------

    /// Bind `target` at `name`. `Ok(None)` when nothing was found.
    pub fn bind(&self, name: &str, target: &Bindable) -> Result<Option<Value>> {
        let name = PropertyName::parse(name)?;
        self.bind_name(&name, target)
    }

    pub fn bind_name(&self, name: &PropertyName, target: &Bindable) -> Result<Option<Value>> {
        self.bind_with_handler(name, target, &*self.handler)
    }

    pub fn bind_with_handler(
        &self,
        name: &PropertyName,
        target: &Bindable,
        handler: &dyn BindHandler,
    ) -> Result<Option<Value>> {
        self.bind_root(name, target, handler, false)
    }

    /// Like [`bind`](Self::bind), but creates a default value when nothing
    /// was found.
    pub fn bind_or_create(&self, name: &str, target: &Bindable) -> Result<Value> {
        let name = PropertyName::parse(name)?;
        self.bind_or_create_with_handler(&name, target, &*self.handler)
    }

    pub fn bind_or_create_with_handler(
        &self,
        name: &PropertyName,
        target: &Bindable,
        handler: &dyn BindHandler,
    ) -> Result<Value> {
        self.bind_root(name, target, handler, true)?.ok_or_else(|| Error::Bind {
            name: name.clone(),
            source: BindError::Uncreatable { type_name: target.shape().to_string() },
        })
    }

    /// Bind and deserialize into `T`.
    pub fn bind_as<T: Describe + DeserializeOwned>(&self, name: &str) -> Result<Option<T>> {
        let name = PropertyName::parse(name)?;
        self.bind_name(&name, &Bindable::of_type::<T>())?
            .map(|value| deserialize(&name, value))
            .transpose()
    }

    /// Bind onto a copy of `existing`: fields no source mentions keep their
    /// current values.
    pub fn bind_instance<T>(&self, name: &str, existing: &T) -> Result<T>
    where
        T: Describe + Serialize + DeserializeOwned,
    {
        let name = PropertyName::parse(name)?;
        let existing = serialize(&name, existing)?;
        let target = Bindable::of_type::<T>().with_existing(existing.clone());
        let value = self.bind_name(&name, &target)?.unwrap_or(existing);
        deserialize(&name, value)
    }

    fn bind_root(
        &self,
        name: &PropertyName,
        target: &Bindable,
        handler: &dyn BindHandler,
        create: bool,
    ) -> Result<Option<Value>> {
        tracing::debug!(name = %name, target = %target.shape(), "binding");
        let mut ctx = BindContext::new(self, handler);
        self.bind_target(name, target, &mut ctx, false, create)
            .map_err(|source| Error::Bind { name: name.clone(), source })
    }

    // ------------------------------------------------------------------------
    // Recursion
    // ------------------------------------------------------------------------

    /// Bind one name, routing the outcome through the handler.
    pub(crate) fn bind_target(
        &self,
        name: &PropertyName,
        target: &Bindable,
        ctx: &mut BindContext<'_>,
        allow_recursive: bool,
        create: bool,
    ) -> std::result::Result<Option<Value>, BindError> {
        let handler = ctx.handler();
        let outcome = if handler.on_start(name, target, ctx) {
            self.bind_object(name, target, ctx, allow_recursive)
        } else {
            tracing::trace!(name = %name, "skipped by handler");
            Ok(None)
        };
        let result = match outcome.and_then(|bound| self.handle_result(name, target, ctx, bound, create)) {
            Ok(result) => result,
            Err(error) => {
                ctx.set_property(None);
                return handler.on_failure(name, target, ctx, error);
            }
        };
        handler.on_finish(name, target, ctx, result.as_ref())?;
        Ok(result)
    }

    fn handle_result(
        &self,
        name: &PropertyName,
        target: &Bindable,
        ctx: &mut BindContext<'_>,
        bound: Option<Value>,
        create: bool,
    ) -> std::result::Result<Option<Value>, BindError> {
        let handler = ctx.handler();
        match bound {
            Some(value) => handler.on_success(name, target, ctx, value).map(Some),
            None if create => {
                let created = self.create(target, ctx)?;
                handler.on_create(name, target, ctx, created).map(Some)
            }
            None => Ok(None),
        }
    }

    fn bind_object(
        &self,
        name: &PropertyName,
        target: &Bindable,
        ctx: &mut BindContext<'_>,
        allow_recursive: bool,
    ) -> std::result::Result<Option<Value>, BindError> {
        let property = self.find_property(name, target, ctx);
        if property.is_none() && ctx.depth() != 0 && contains_no_descendant_of(name, ctx) {
            tracing::trace!(name = %name, "no descendants in any source, pruned");
            return Ok(None);
        }
        if let Some(aggregate) = aggregate::for_shape(target.shape()) {
            return aggregate.bind(name, target, ctx);
        }
        match target.shape() {
            Shape::Scalar(kind) => property.map(|property| self.convert_property(property, kind, ctx)).transpose(),
            Shape::Composite(composite) => {
                let bound = self.bind_data_object(name, target, composite, ctx, allow_recursive)?;
                match (bound, property) {
                    (Some(value), _) => Ok(Some(value)),
                    (None, Some(property)) => Err(BindError::conversion(
                        &property,
                        &composite.type_name,
                        "a single value cannot be bound to this type",
                    )),
                    (None, None) => Ok(None),
                }
            }
            Shape::Array(_) | Shape::List(_) | Shape::Set(_) | Shape::Map { .. } => Ok(None),
        }
    }

    /// The property stored directly under `name` in the first source that
    /// has one.
    fn find_property(&self, name: &PropertyName, target: &Bindable, ctx: &BindContext<'_>) -> Option<Property> {
        if name.is_empty() || target.has_restriction(BindRestriction::NoDirectProperty) {
            return None;
        }
        let property = ctx.sources().find_map(|(_, source)| source.get(name))?;
        tracing::trace!(name = %name, origin = ?property.origin, "found property");
        Some(property)
    }

    fn bind_data_object(
        &self,
        name: &PropertyName,
        target: &Bindable,
        composite: &CompositeShape,
        ctx: &mut BindContext<'_>,
        allow_recursive: bool,
    ) -> std::result::Result<Option<Value>, BindError> {
        if !allow_recursive && ctx.is_binding_data_object(&composite.type_name) && !contains_descendant_of(name, ctx) {
            tracing::debug!(
                name = %name,
                type_name = %composite.type_name,
                "already binding this type and nothing below, skipped"
            );
            return Ok(None);
        }
        ctx.with_data_object(name, &composite.type_name, |ctx| {
            for strategy in data_object::strategies(target.bind_method()) {
                if let Some(instance) = strategy.bind(name, target, composite, ctx)? {
                    return Ok(Some(instance));
                }
            }
            Ok(None)
        })
    }

    fn create(&self, target: &Bindable, ctx: &mut BindContext<'_>) -> std::result::Result<Value, BindError> {
        if let Some(existing) = target.existing() {
            return Ok(existing.clone());
        }
        match target.shape() {
            Shape::Array(_) | Shape::List(_) | Shape::Set(_) => Ok(Value::List(Vec::new())),
            Shape::Map { .. } => Ok(Value::Map(IndexMap::new())),
            Shape::Composite(composite) => {
                for strategy in data_object::strategies(target.bind_method()) {
                    if let Some(instance) = strategy.create(target, composite, ctx)? {
                        return Ok(instance);
                    }
                }
                Err(BindError::Uncreatable { type_name: composite.type_name.clone() })
            }
            Shape::Scalar(_) => Err(BindError::Uncreatable { type_name: target.shape().to_string() }),
        }
    }

    // ------------------------------------------------------------------------
    // Conversion
    // ------------------------------------------------------------------------

    /// Convert a source property at a leaf and remember it as the current
    /// property.
    pub(crate) fn convert_property(
        &self,
        property: Property,
        kind: &ScalarKind,
        ctx: &mut BindContext<'_>,
    ) -> std::result::Result<Value, BindError> {
        match self.converter.convert(&property.value, kind) {
            Ok(value) => {
                tracing::trace!(name = %property.name, target = %kind, "converted");
                ctx.set_property(Some(property));
                Ok(value)
            }
            Err(failure) => Err(BindError::Conversion {
                name: property.name,
                value: property.value,
                target: kind.to_string(),
                origin: property.origin,
                reason: failure.0,
            }),
        }
    }

    /// Convert a declared default. Only scalar shapes are converted.
    pub(crate) fn convert_default(
        &self,
        name: &PropertyName,
        value: &Value,
        shape: &Shape,
    ) -> std::result::Result<Value, BindError> {
        let Shape::Scalar(kind) = shape else {
            return Ok(value.clone());
        };
        self.converter.convert(value, kind).map_err(|failure| BindError::Conversion {
            name: name.clone(),
            value: value.clone(),
            target: kind.to_string(),
            origin: None,
            reason: failure.0,
        })
    }
}

fn contains_no_descendant_of(name: &PropertyName, ctx: &BindContext<'_>) -> bool {
    ctx.sources().all(|(_, source)| source.contains_descendant_of(name) == DescendantState::Absent)
}

fn contains_descendant_of(name: &PropertyName, ctx: &BindContext<'_>) -> bool {
    ctx.sources().any(|(_, source)| source.contains_descendant_of(name) == DescendantState::Present)
}

pub(crate) fn serialize<T: Serialize>(name: &PropertyName, value: &T) -> Result<Value> {
    serde_json::to_value(value).map(Value::from).map_err(|source| Error::Bind {
        name: name.clone(),
        source: BindError::TypeMismatch { target: std::any::type_name::<T>().to_owned(), source },
    })
}

pub(crate) fn deserialize<T: DeserializeOwned>(name: &PropertyName, value: Value) -> Result<T> {
    serde_json::from_value(value.into()).map_err(|source| Error::Bind {
        name: name.clone(),
        source: BindError::TypeMismatch { target: std::any::type_name::<T>().to_owned(), source },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Constructor, Parameter};
    use crate::source::MapPropertySource;

    fn binder(entries: &[(&str, &str)]) -> Binder {
        let source = entries
            .iter()
            .fold(MapPropertySource::new("test"), |source, (key, value)| source.with(key, *value));
        Binder::new([Arc::new(source) as Arc<dyn PropertySource>])
    }

    fn bind_error(error: Error) -> BindError {
        match error {
            Error::Bind { source, .. } => source,
            other => panic!("expected a bind error, got {other}"),
        }
    }

    #[test]
    fn test_scalar_binds_and_converts() {
        let binder = binder(&[("app.port", "8080")]);
        let bound = binder.bind("app.port", &Bindable::of_type::<u16>()).unwrap();
        assert_eq!(bound, Some(Value::Int(8080)));
        assert_eq!(binder.bind("app.missing", &Bindable::of_type::<u16>()).unwrap(), None);
    }

    #[test]
    fn test_conversion_error_carries_name_value_and_origin() {
        let binder = binder(&[("app.port", "eighty")]);
        let err = bind_error(binder.bind("app.port", &Bindable::of_type::<u16>()).unwrap_err());
        match err {
            BindError::Conversion { name, value, origin, .. } => {
                assert_eq!(name.to_string(), "app.port");
                assert_eq!(value, Value::from("eighty"));
                assert_eq!(origin.as_deref(), Some("test [app.port]"));
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn test_list_from_indexes_and_from_delimited_value() {
        let binder = binder(&[("a.ports[0]", "1"), ("a.ports[1]", "2"), ("b.ports", "3, 4")]);
        let target = Bindable::of_type::<Vec<u16>>();
        assert_eq!(binder.bind("a.ports", &target).unwrap(), Some(Value::from(vec![1, 2])));
        assert_eq!(binder.bind("b.ports", &target).unwrap(), Some(Value::from(vec![3, 4])));
    }

    #[test]
    fn test_set_removes_duplicates() {
        let binder = binder(&[("tags", "a,b,a")]);
        let bound = binder.bind("tags", &Bindable::of_type::<std::collections::BTreeSet<String>>()).unwrap();
        assert_eq!(bound, Some(Value::from(vec!["a", "b"])));
    }

    #[test]
    fn test_constructor_with_default() {
        let server = CompositeShape::record("Server").with_constructor(Constructor::new([
            Parameter::required("host", String::shape()),
            Parameter::with_default("port", u16::shape(), "8080"),
        ]));
        let binder = binder(&[("server.host", "localhost")]);
        let bound = binder.bind("server", &Bindable::of(server)).unwrap();
        let expected: Value = [("host", Value::from("localhost")), ("port", Value::Int(8080))].into_iter().collect();
        assert_eq!(bound, Some(expected));
    }

    #[test]
    fn test_bind_or_create_uses_defaults() {
        let pool = CompositeShape::bean("Pool")
            .with_property("size", u32::shape())
            .with_default_instance([("size", 4)].into_iter().collect());
        let binder = binder(&[]);
        let created = binder.bind_or_create("pool", &Bindable::of(pool)).unwrap();
        assert_eq!(created, [("size", 4)].into_iter().collect());

        let err = bind_error(binder.bind_or_create("port", &Bindable::of_type::<u16>()).unwrap_err());
        assert!(matches!(err, BindError::Uncreatable { .. }));
    }

    #[test]
    fn test_invalid_root_name() {
        let binder = binder(&[]);
        let err = binder.bind("App.Port", &Bindable::of_type::<u16>()).unwrap_err();
        assert!(matches!(err, Error::InvalidName(_)));
    }

    #[test]
    fn test_options_deserialize_with_defaults() {
        let options: BinderOptions = serde_json::from_str(r#"{"max_depth": 8}"#).unwrap();
        assert_eq!(options, BinderOptions { max_depth: 8, ..BinderOptions::default() });
    }
}
