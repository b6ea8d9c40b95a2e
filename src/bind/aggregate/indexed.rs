//! Arrays, lists and sets bound from `name[0]`, `name[1]`, ... or from a
//! single delimited value at `name`.

use std::collections::BTreeSet;

use super::AggregateBinder;
use crate::bind::{BindContext, BindError, BindRestriction, Bindable, BinderOptions};
use crate::model::{Property, Shape, Value};
use crate::name::{Form, PropertyName};
use crate::source::PropertySource;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Collection {
    Array,
    List,
    Set,
}

/// Where the bound elements were read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ElementsFrom {
    Indexes,
    SingleValue,
}

pub(crate) struct IndexedElementsBinder {
    collection: Collection,
}

impl IndexedElementsBinder {
    pub fn array() -> Self {
        Self { collection: Collection::Array }
    }

    pub fn list() -> Self {
        Self { collection: Collection::List }
    }

    pub fn set() -> Self {
        Self { collection: Collection::Set }
    }

    /// Elements of one source, from index `start` up to the first gap.
    ///
    /// Iterable sources report their indexes up front; an index left over
    /// after the gap is an error. Other sources are read index by index until one
    /// binds nothing.
    fn bind_indexed(
        &self,
        name: &PropertyName,
        element: &Bindable,
        ctx: &mut BindContext<'_>,
        index: usize,
        source: &dyn PropertySource,
        start: usize,
    ) -> Result<Vec<Value>, BindError> {
        let mut known = source.names().map(|names| indexed_children(name, &names, start));
        let mut values = Vec::new();
        let mut position = start;
        loop {
            if known.as_ref().is_some_and(|known| known.range(position..).next().is_none()) {
                break;
            }
            let element_name = name.append_index(&position.to_string());
            let Some(value) = self.bind_element(&element_name, element, ctx, Some(index))? else {
                break;
            };
            values.push(value);
            if let Some(known) = known.as_mut() {
                known.remove(&position);
            }
            position += 1;
        }
        match known {
            Some(known) if !known.is_empty() => Err(unbound_elements(name, &known, source)),
            _ => Ok(values),
        }
    }

    /// Elements from a single value: a list is taken as is, text is split
    /// on the configured delimiter.
    fn split_value(&self, property: Property, element: &Shape, ctx: &mut BindContext<'_>) -> Result<Vec<Value>, BindError> {
        let binder = ctx.binder();
        let Shape::Scalar(kind) = element else {
            return Err(BindError::conversion(&property, element, "elements of this type cannot be read from a single value"));
        };
        let pieces = match &property.value {
            Value::List(items) => items.clone(),
            Value::String(text) => split_text(text, binder.options()),
            Value::Map(_) => return Err(BindError::conversion(&property, element, "a map cannot be read as a collection")),
            other => vec![other.clone()],
        };
        pieces
            .into_iter()
            .map(|piece| binder.convert_property(Property { value: piece, ..property.clone() }, kind, ctx))
            .collect()
    }

    fn collect(&self, elements: Vec<Value>) -> Value {
        if self.collection != Collection::Set {
            return Value::List(elements);
        }
        let mut unique: Vec<Value> = Vec::with_capacity(elements.len());
        for element in elements {
            if !unique.contains(&element) {
                unique.push(element);
            }
        }
        Value::List(unique)
    }

    fn bind_elements(
        &self,
        name: &PropertyName,
        target: &Bindable,
        ctx: &mut BindContext<'_>,
    ) -> Result<Option<(Value, ElementsFrom)>, BindError> {
        let Some(element_shape) = target.shape().element() else {
            return Ok(None);
        };
        let element = Bindable::of(element_shape.clone());
        let direct_allowed = !name.is_empty() && !target.has_restriction(BindRestriction::NoDirectProperty);

        // indexes are unioned across sources, earlier sources win
        let mut elements = Vec::new();
        let mut scalar = None;
        for (index, source) in ctx.sources() {
            if direct_allowed && scalar.is_none() {
                scalar = source.get(name);
            }
            let bound = self.bind_indexed(name, &element, ctx, index, &**source, elements.len())?;
            elements.extend(bound);
        }

        if !elements.is_empty() {
            if let Some(property) = scalar {
                tracing::debug!(
                    name = %name,
                    origin = ?property.origin,
                    "ignoring single value, indexed elements take precedence"
                );
            }
            return Ok(Some((self.collect(elements), ElementsFrom::Indexes)));
        }
        match scalar {
            Some(property) => {
                tracing::trace!(name = %name, "reading elements from a single value");
                let values = self.split_value(property, &element_shape, ctx)?;
                Ok(Some((self.collect(values), ElementsFrom::SingleValue)))
            }
            None => Ok(None),
        }
    }
}

impl AggregateBinder for IndexedElementsBinder {
    fn allows_recursive_binding(&self, source: Option<&dyn PropertySource>) -> bool {
        source.is_none_or(|source| source.is_iterable())
    }

    fn bind_aggregate(
        &self,
        name: &PropertyName,
        target: &Bindable,
        ctx: &mut BindContext<'_>,
    ) -> Result<Option<Value>, BindError> {
        Ok(self.bind_elements(name, target, ctx)?.map(|(value, _)| value))
    }

    /// A single value describes the whole collection and replaces any
    /// existing elements; indexed elements merge.
    fn bind(&self, name: &PropertyName, target: &Bindable, ctx: &mut BindContext<'_>) -> Result<Option<Value>, BindError> {
        let result = ctx.with_increased_depth(name, |ctx| self.bind_elements(name, target, ctx))?;
        Ok(match (result, target.existing()) {
            (Some((additional, ElementsFrom::Indexes)), Some(existing)) => Some(self.merge(existing, additional)),
            (result, _) => result.map(|(value, _)| value),
        })
    }

    fn merge(&self, existing: &Value, additional: Value) -> Value {
        match (existing, additional) {
            (Value::List(existing), Value::List(additional)) => match self.collection {
                Collection::Array => Value::List(additional),
                Collection::List => {
                    let mut merged = existing.clone();
                    for (position, value) in additional.into_iter().enumerate() {
                        match merged.get_mut(position) {
                            Some(slot) => *slot = value,
                            None => merged.push(value),
                        }
                    }
                    Value::List(merged)
                }
                Collection::Set => {
                    let mut merged = existing.clone();
                    for value in additional {
                        if !merged.contains(&value) {
                            merged.push(value);
                        }
                    }
                    Value::List(merged)
                }
            },
            (_, additional) => additional,
        }
    }
}

fn indexed_children(name: &PropertyName, names: &[PropertyName], start: usize) -> BTreeSet<usize> {
    names
        .iter()
        .filter(|candidate| name.is_ancestor_of(candidate) && candidate.is_numeric_index(name.len()))
        .filter_map(|candidate| candidate.element(name.len(), Form::Original).parse::<usize>().ok())
        .filter(|&position| position >= start)
        .collect()
}

fn unbound_elements(name: &PropertyName, known: &BTreeSet<usize>, source: &dyn PropertySource) -> BindError {
    let properties = source
        .names()
        .unwrap_or_default()
        .iter()
        .filter(|candidate| name.is_ancestor_of(candidate) && candidate.is_numeric_index(name.len()))
        .filter(|candidate| {
            candidate
                .element(name.len(), Form::Original)
                .parse::<usize>()
                .is_ok_and(|position| known.contains(&position))
        })
        .filter_map(|candidate| source.get(candidate))
        .collect();
    BindError::UnboundProperties { properties }
}

fn split_text(text: &str, options: &BinderOptions) -> Vec<Value> {
    if text.trim().is_empty() {
        return Vec::new();
    }
    text.split(options.list_delimiter)
        .map(|piece| if options.trim_list_elements { piece.trim() } else { piece })
        .map(Value::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_text() {
        let options = BinderOptions::default();
        assert_eq!(split_text("a, b ,c", &options), vec![Value::from("a"), Value::from("b"), Value::from("c")]);
        assert_eq!(split_text("  ", &options), Vec::<Value>::new());

        let options = BinderOptions { list_delimiter: ';', trim_list_elements: false, ..BinderOptions::default() };
        assert_eq!(split_text("a; b", &options), vec![Value::from("a"), Value::from(" b")]);
    }

    #[test]
    fn test_list_merge_overwrites_then_appends() {
        let existing = Value::from(vec![1, 2, 3]);
        let merged = IndexedElementsBinder::list().merge(&existing, Value::from(vec![9]));
        assert_eq!(merged, Value::from(vec![9, 2, 3]));
        let merged = IndexedElementsBinder::list().merge(&existing, Value::from(vec![7, 8, 9, 10]));
        assert_eq!(merged, Value::from(vec![7, 8, 9, 10]));
    }

    #[test]
    fn test_array_merge_replaces() {
        let merged = IndexedElementsBinder::array().merge(&Value::from(vec![1, 2, 3]), Value::from(vec![9]));
        assert_eq!(merged, Value::from(vec![9]));
    }

    #[test]
    fn test_set_merge_is_union() {
        let merged = IndexedElementsBinder::set().merge(&Value::from(vec!["a", "b"]), Value::from(vec!["b", "c"]));
        assert_eq!(merged, Value::from(vec!["a", "b", "c"]));
    }

    #[test]
    fn test_indexed_children() {
        let names: Vec<PropertyName> = ["a.list[0]", "a.list[2].x", "a.list[k]", "a.other[1]"]
            .iter()
            .map(|n| PropertyName::parse(n).unwrap())
            .collect();
        let root = PropertyName::parse("a.list").unwrap();
        assert_eq!(indexed_children(&root, &names, 0), BTreeSet::from([0, 2]));
        assert_eq!(indexed_children(&root, &names, 1), BTreeSet::from([2]));
    }
}
