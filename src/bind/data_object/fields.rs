//! Property-by-property binding onto an existing or default instance.

use indexmap::IndexMap;

use super::DataObjectBinder;
use crate::bind::{BindContext, BindError, Bindable};
use crate::model::{CompositeKind, CompositeShape, Value};
use crate::name::PropertyName;

pub(crate) struct FieldBinder;

/// The instance properties are written onto: the existing value, else the
/// type's default instance, else an empty bean. Records cannot be
/// default-constructed.
fn base_instance(target: &Bindable, composite: &CompositeShape) -> Option<IndexMap<String, Value>> {
    if let Some(Value::Map(existing)) = target.existing() {
        return Some(existing.clone());
    }
    if let Some(Value::Map(default)) = &composite.default_instance {
        return Some(default.clone());
    }
    (composite.kind == CompositeKind::Bean).then(IndexMap::new)
}

impl DataObjectBinder for FieldBinder {
    fn bind(
        &self,
        name: &PropertyName,
        target: &Bindable,
        composite: &CompositeShape,
        ctx: &mut BindContext<'_>,
    ) -> Result<Option<Value>, BindError> {
        let Some(mut instance) = base_instance(target, composite) else {
            return Ok(None);
        };
        tracing::debug!(name = %name, type_name = %composite.type_name, "binding properties");

        let mut bound_any = false;
        for property in &composite.properties {
            let shape = property.shape.resolve();
            let current = instance.get(&property.name).filter(|value| !value.is_null()).cloned();
            let mut property_target = Bindable::of(shape.clone());
            if let Some(current) = &current {
                property_target = property_target.with_existing(current.clone());
            }
            let Some(value) = ctx.bind_property(name, &property.name, &property_target)? else {
                continue;
            };
            bound_any = true;
            if property.writable {
                instance.insert(property.name.clone(), value);
                continue;
            }
            // read-only: only an in-place update of a held aggregate or object
            match current {
                Some(_) if !shape.is_scalar() => {
                    instance.insert(property.name.clone(), value);
                }
                Some(current) if current == value => {}
                _ => {
                    return Err(BindError::ReadOnlyProperty {
                        name: name.clone(),
                        property: property.name.clone(),
                        type_name: composite.type_name.clone(),
                    });
                }
            }
        }
        Ok(bound_any.then_some(Value::Map(instance)))
    }

    fn create(
        &self,
        target: &Bindable,
        composite: &CompositeShape,
        _ctx: &mut BindContext<'_>,
    ) -> Result<Option<Value>, BindError> {
        Ok(base_instance(target, composite).map(Value::Map))
    }
}
