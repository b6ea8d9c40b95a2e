//! Constructor-based binding for records and marked constructors.

use indexmap::IndexMap;

use super::DataObjectBinder;
use crate::bind::{BindContext, BindError, BindMethod, Bindable};
use crate::model::{CompositeKind, CompositeShape, Constructor, ParamDefault, Parameter, Value};
use crate::name::PropertyName;

pub(crate) struct ConstructorBinder;

/// The constructor to bind through, if any.
///
/// A marked constructor always wins. Otherwise one is deduced for records,
/// for types carrying the bind-via-constructor directive, inside another
/// constructor-bound object, or when the target asks for it; deduction needs
/// exactly one declared constructor and it must take parameters. Beans with an
/// existing instance are left to field binding.
fn binding_constructor<'c>(
    composite: &'c CompositeShape,
    target: &Bindable,
    nested: bool,
) -> Result<Option<&'c Constructor>, BindError> {
    let mut marked = composite.constructors.iter().filter(|constructor| constructor.bind_directive);
    if let Some(first) = marked.next() {
        if marked.next().is_some() {
            return Err(BindError::AmbiguousConstructor { type_name: composite.type_name.clone() });
        }
        if first.params.is_empty() {
            return Err(BindError::InvalidConstructor { type_name: composite.type_name.clone() });
        }
        return Ok(Some(first));
    }

    let deduce = composite.kind == CompositeKind::Record
        || composite.bind_via_constructor
        || nested
        || target.bind_method() == Some(BindMethod::Constructor);
    if !deduce || (composite.kind == CompositeKind::Bean && target.existing().is_some()) {
        return Ok(None);
    }
    match composite.constructors.as_slice() {
        [only] if !only.params.is_empty() => Ok(Some(only)),
        _ => Ok(None),
    }
}

fn existing_field(target: &Bindable, field: &str) -> Option<Value> {
    target
        .existing()
        .and_then(Value::as_map)
        .and_then(|fields| fields.get(field))
        .filter(|value| !value.is_null())
        .cloned()
}

impl ConstructorBinder {
    fn bind_parameters(
        name: &PropertyName,
        target: &Bindable,
        composite: &CompositeShape,
        constructor: &Constructor,
        ctx: &mut BindContext<'_>,
    ) -> Result<Option<Value>, BindError> {
        let mut arguments: Vec<(&Parameter, Option<Value>)> = Vec::with_capacity(constructor.params.len());
        let mut bound_any = false;
        for param in &constructor.params {
            let current = existing_field(target, &param.name);
            let mut param_target = Bindable::of(param.shape.resolve());
            if let Some(current) = &current {
                param_target = param_target.with_existing(current.clone());
            }
            let bound = ctx.bind_property(name, &param.name, &param_target)?;
            bound_any |= bound.is_some();
            arguments.push((param, bound.or(current)));
        }
        if !bound_any {
            tracing::trace!(name = %name, type_name = %composite.type_name, "no constructor parameter bound");
            return Ok(None);
        }

        let binder = ctx.binder();
        let mut instance = IndexMap::with_capacity(arguments.len());
        for (param, argument) in arguments {
            let value = match (argument, &param.default) {
                (Some(value), _) => value,
                (None, ParamDefault::Required) => {
                    return Err(BindError::MissingParameter {
                        name: name.clone(),
                        parameter: param.name.clone(),
                        type_name: composite.type_name.clone(),
                    });
                }
                (None, ParamDefault::Optional) => continue,
                (None, ParamDefault::Value(default)) => {
                    let param_name = name.append(&crate::name::to_dashed_form(&param.name))?;
                    binder.convert_default(&param_name, default, &param.shape.resolve())?
                }
            };
            instance.insert(param.name.clone(), value);
        }
        Ok(Some(Value::Map(instance)))
    }
}

impl DataObjectBinder for ConstructorBinder {
    fn bind(
        &self,
        name: &PropertyName,
        target: &Bindable,
        composite: &CompositeShape,
        ctx: &mut BindContext<'_>,
    ) -> Result<Option<Value>, BindError> {
        let Some(constructor) = binding_constructor(composite, target, ctx.is_nested_constructor_binding())? else {
            return Ok(None);
        };
        tracing::debug!(name = %name, type_name = %composite.type_name, "binding through constructor");
        ctx.with_constructor_binding(|ctx| Self::bind_parameters(name, target, composite, constructor, ctx))
    }

    fn create(
        &self,
        target: &Bindable,
        composite: &CompositeShape,
        ctx: &mut BindContext<'_>,
    ) -> Result<Option<Value>, BindError> {
        let Some(constructor) = binding_constructor(composite, target, ctx.is_nested_constructor_binding())? else {
            return Ok(None);
        };
        let binder = ctx.binder();
        let mut instance = IndexMap::with_capacity(constructor.params.len());
        for param in &constructor.params {
            match &param.default {
                ParamDefault::Required => return Ok(None),
                ParamDefault::Optional => {}
                ParamDefault::Value(default) => {
                    let param_name = PropertyName::adapt(&param.name, '.');
                    let value = binder.convert_default(&param_name, default, &param.shape.resolve())?;
                    instance.insert(param.name.clone(), value);
                }
            }
        }
        Ok(Some(Value::Map(instance)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Describe, Parameter};

    fn server() -> CompositeShape {
        CompositeShape::bean("Server").with_constructor(Constructor::new([
            Parameter::required("host", String::shape()),
            Parameter::with_default("port", u16::shape(), 8080),
        ]))
    }

    #[test]
    fn test_records_deduce_their_constructor() {
        let record = CompositeShape::record("Point").with_constructor(Constructor::new([
            Parameter::required("x", i32::shape()),
            Parameter::required("y", i32::shape()),
        ]));
        let target = Bindable::of(record.clone());
        assert!(binding_constructor(&record, &target, false).unwrap().is_some());
    }

    #[test]
    fn test_beans_need_a_directive() {
        let bean = server();
        let target = Bindable::of(bean.clone());
        assert!(binding_constructor(&bean, &target, false).unwrap().is_none());
        assert!(binding_constructor(&bean, &target, true).unwrap().is_some());

        let directed = server().bind_via_constructor();
        assert!(binding_constructor(&directed, &Bindable::of(directed.clone()), false).unwrap().is_some());

        let with_existing = Bindable::of(directed.clone()).with_existing([("host", "a")].into_iter().collect());
        assert!(binding_constructor(&directed, &with_existing, false).unwrap().is_none());
    }

    #[test]
    fn test_deduction_needs_a_single_constructor() {
        let record = CompositeShape::record("Pair")
            .with_constructor(Constructor::new([Parameter::required("a", i32::shape())]))
            .with_constructor(Constructor::new([Parameter::required("b", i32::shape())]));
        assert!(binding_constructor(&record, &Bindable::of(record.clone()), false).unwrap().is_none());
    }

    #[test]
    fn test_marked_constructor_errors() {
        let ambiguous = CompositeShape::bean("Twice")
            .with_constructor(Constructor::new([Parameter::required("a", i32::shape())]).marked())
            .with_constructor(Constructor::new([Parameter::required("b", i32::shape())]).marked());
        let err = binding_constructor(&ambiguous, &Bindable::of(ambiguous.clone()), false).unwrap_err();
        assert!(matches!(err, BindError::AmbiguousConstructor { .. }));

        let empty = CompositeShape::bean("Empty").with_constructor(Constructor::default().marked());
        let err = binding_constructor(&empty, &Bindable::of(empty.clone()), false).unwrap_err();
        assert!(matches!(err, BindError::InvalidConstructor { .. }));
    }
}
