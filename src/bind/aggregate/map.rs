//! Maps bound from the names an iterable source holds below the map's name.
//!
//! Keys come from the remaining path in original form: `app.labels[env]`
//! gives `env`, and for scalar values `app.labels.a.b` gives `a.b`. When the
//! value type is a composite or another map only the next element becomes
//! the key, the rest is bound into the value.

use hashbrown::HashSet;
use indexmap::IndexMap;

use super::AggregateBinder;
use crate::bind::{BindContext, BindError, BindRestriction, Bindable};
use crate::model::{Property, ScalarKind, Shape, Value};
use crate::name::{Form, PropertyName};
use crate::source::{DescendantState, PropertySource};

pub(crate) struct MapBinder;

impl AggregateBinder for MapBinder {
    fn allows_recursive_binding(&self, _source: Option<&dyn PropertySource>) -> bool {
        true
    }

    fn bind_aggregate(
        &self,
        name: &PropertyName,
        target: &Bindable,
        ctx: &mut BindContext<'_>,
    ) -> Result<Option<Value>, BindError> {
        let Shape::Map { key, value } = target.shape() else {
            return Ok(None);
        };
        let value_shape = value.resolve();
        let has_descendants = ctx
            .sources()
            .any(|(_, source)| source.contains_descendant_of(name) == DescendantState::Present);
        let direct_allowed =
            !name.is_empty() && !has_descendants && !target.has_restriction(BindRestriction::NoDirectProperty);

        let mut map = IndexMap::new();
        let mut seen = HashSet::new();
        for (_, source) in ctx.sources() {
            if direct_allowed && let Some(property) = source.get(name) {
                tracing::trace!(name = %name, "binding map from a single value");
                return bind_direct(property, target.shape(), key, &value_shape, ctx).map(Some);
            }
            let Some(names) = source.names() else {
                continue;
            };
            for candidate in names.iter().filter(|candidate| name.is_ancestor_of(candidate)) {
                let entry_name = entry_name(name, candidate, &value_shape);
                if !seen.insert(entry_name.clone()) {
                    continue;
                }
                let key_text = key_name(name, &entry_name);
                let key_property = Property::new(entry_name.clone(), key_text);
                let converted = ctx.binder().convert_property(key_property, key, ctx)?;
                let Some(map_key) = converted.to_text().map(|text| text.into_owned()) else {
                    continue;
                };
                if map.contains_key(&map_key) {
                    continue;
                }
                let entry = Bindable::of(value_shape.clone());
                if let Some(bound) = ctx.binder().bind_target(&entry_name, &entry, ctx, true, false)? {
                    map.insert(map_key, bound);
                }
            }
        }
        Ok((!map.is_empty()).then_some(Value::Map(map)))
    }

    fn merge(&self, existing: &Value, additional: Value) -> Value {
        match (existing, additional) {
            (Value::Map(existing), Value::Map(additional)) => {
                let mut merged = existing.clone();
                merged.extend(additional);
                Value::Map(merged)
            }
            (_, additional) => additional,
        }
    }
}

/// The name bound as one entry for `candidate`.
fn entry_name(root: &PropertyName, candidate: &PropertyName, value: &Shape) -> PropertyName {
    match value {
        Shape::Scalar(_) => candidate.clone(),
        Shape::Array(_) | Shape::List(_) | Shape::Set(_) => (root.len() + 1..candidate.len())
            .find(|&i| candidate.is_numeric_index(i))
            .map_or_else(|| candidate.clone(), |i| candidate.chop(i)),
        Shape::Map { .. } | Shape::Composite(_) => candidate.chop(root.len() + 1),
    }
}

fn key_name(root: &PropertyName, entry: &PropertyName) -> String {
    (root.len()..entry.len())
        .map(|i| entry.element(i, Form::Original))
        .collect::<Vec<_>>()
        .join(".")
}

/// A whole map held as a single value.
fn bind_direct(
    property: Property,
    target: &Shape,
    key: &ScalarKind,
    value: &Shape,
    ctx: &mut BindContext<'_>,
) -> Result<Value, BindError> {
    let Value::Map(entries) = &property.value else {
        return Err(BindError::conversion(&property, target, "only a map value can be bound to a map"));
    };
    let binder = ctx.binder();
    let mut map = IndexMap::with_capacity(entries.len());
    for (entry_key, entry_value) in entries {
        let converted = binder.convert_property(Property { value: Value::from(entry_key.as_str()), ..property.clone() }, key, ctx)?;
        let map_key = converted.to_text().map_or_else(|| entry_key.clone(), |text| text.into_owned());
        let entry_value = match value {
            Shape::Scalar(kind) => binder.convert_property(Property { value: entry_value.clone(), ..property.clone() }, kind, ctx)?,
            _ => entry_value.clone(),
        };
        map.insert(map_key, entry_value);
    }
    ctx.set_property(Some(property));
    Ok(Value::Map(map))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Describe;

    fn name(s: &str) -> PropertyName {
        PropertyName::parse(s).unwrap()
    }

    #[test]
    fn test_entry_name_by_value_shape() {
        let root = name("app.labels");
        let candidate = name("app.labels.a[0].b");
        assert_eq!(entry_name(&root, &candidate, &String::shape()), candidate);
        assert_eq!(entry_name(&root, &candidate, &Vec::<String>::shape()), name("app.labels.a"));
        assert_eq!(entry_name(&root, &candidate, &Shape::map_of(ScalarKind::String, String::shape())), name("app.labels.a"));
    }

    #[test]
    fn test_key_name_keeps_original_form() {
        let root = name("app.labels");
        assert_eq!(key_name(&root, &name("app.labels[Env.Name]")), "Env.Name");
        assert_eq!(key_name(&root, &name("app.labels.a.b")), "a.b");
    }

    #[test]
    fn test_merge_overlays_keys() {
        let existing: Value = [("a", 1), ("b", 2)].into_iter().collect();
        let additional: Value = [("b", 3), ("c", 4)].into_iter().collect();
        let merged = MapBinder.merge(&existing, additional);
        let expected: Value = [("a", 1), ("b", 3), ("c", 4)].into_iter().collect();
        assert_eq!(merged, expected);
    }
}
