//! Property-based tests for `PropertyName` parsing, equality and ordering.

use std::cmp::Ordering;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use propbind::{Form, PropertyName};

fn hash_of(name: &PropertyName) -> u64 {
    let mut hasher = DefaultHasher::new();
    name.hash(&mut hasher);
    hasher.finish()
}

fn word() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9]{0,5}"
}

fn element() -> impl Strategy<Value = String> {
    prop_oneof![
        3 => word(),
        2 => (word(), word()).prop_map(|(a, b)| format!("{a}-{b}")),
        1 => (0u32..500).prop_map(|i| format!("[{i}]")),
        1 => "[A-Za-z0-9.]{1,6}".prop_map(|key| format!("[{key}]")),
    ]
}

/// Strictly valid canonical names.
fn canonical_name() -> impl Strategy<Value = String> {
    (word(), prop::collection::vec(element(), 0..5)).prop_map(|(first, rest)| {
        let mut name = first;
        for element in rest {
            if !element.starts_with('[') {
                name.push('.');
            }
            name.push_str(&element);
        }
        name
    })
}

proptest! {
    #[test]
    fn test_parse_round_trip(text in canonical_name()) {
        let name = PropertyName::parse(&text).unwrap();
        prop_assert_eq!(name.to_string(), text.clone());
        prop_assert_eq!(PropertyName::parse(&name.to_string()).unwrap(), name);
    }

    #[test]
    fn test_case_and_dash_variants_are_equal(words in prop::collection::vec(word(), 2..4)) {
        let dashed = words.join("-");
        let camel: String = words
            .iter()
            .enumerate()
            .map(|(i, w)| if i == 0 { w.clone() } else { capitalize(w) })
            .collect();
        let screaming = words.iter().map(|w| w.to_uppercase()).collect::<Vec<_>>().join("_");

        let canonical = PropertyName::parse(&format!("app.{dashed}")).unwrap();
        for raw in [format!("app.{camel}"), format!("APP.{screaming}")] {
            let adapted = PropertyName::adapt(&raw, '.');
            prop_assert_eq!(&adapted, &canonical);
            prop_assert_eq!(hash_of(&adapted), hash_of(&canonical));
            prop_assert_eq!(adapted.cmp(&canonical), Ordering::Equal);
        }
    }

    #[test]
    fn test_append_then_chop_is_identity(base in canonical_name(), suffix in word()) {
        let name = PropertyName::parse(&base).unwrap();
        let appended = name.append(&suffix).unwrap();
        prop_assert_eq!(appended.len(), name.len() + 1);
        prop_assert_eq!(appended.chop(name.len()), name.clone());
        prop_assert_eq!(appended.parent(), name.clone());
        prop_assert!(name.is_parent_of(&appended));
    }

    #[test]
    fn test_chop_reduces_length(text in canonical_name(), keep in 0usize..6) {
        let name = PropertyName::parse(&text).unwrap();
        let chopped = name.chop(keep);
        prop_assert_eq!(chopped.len(), keep.min(name.len()));
        if chopped.len() < name.len() {
            prop_assert!(chopped.is_ancestor_of(&name));
        }
    }

    #[test]
    fn test_ordering_is_consistent_with_equality(a in canonical_name(), b in canonical_name(), c in canonical_name()) {
        let (a, b, c) = (
            PropertyName::parse(&a).unwrap(),
            PropertyName::parse(&b).unwrap(),
            PropertyName::parse(&c).unwrap(),
        );
        prop_assert_eq!(a.cmp(&b) == Ordering::Equal, a == b);
        prop_assert_eq!(a.cmp(&b), b.cmp(&a).reverse());
        if a <= b && b <= c {
            prop_assert!(a <= c);
        }
    }

    #[test]
    fn test_numeric_indexes_order_numerically(x in 0u32..10_000, y in 0u32..10_000) {
        let a = PropertyName::parse(&format!("item[{x}]")).unwrap();
        let b = PropertyName::parse(&format!("item[{y}]")).unwrap();
        prop_assert_eq!(a.cmp(&b), x.cmp(&y));
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

#[test]
fn test_numeric_order_examples() {
    let mut names: Vec<PropertyName> = ["item[10]", "item[2]", "item[b]", "item[1]"]
        .iter()
        .map(|n| PropertyName::parse(n).unwrap())
        .collect();
    names.sort();
    let sorted: Vec<String> = names.iter().map(ToString::to_string).collect();
    assert_eq!(sorted, vec!["item[1]", "item[2]", "item[10]", "item[b]"]);
}

#[test]
fn test_indexed_elements_are_case_sensitive() {
    let upper = PropertyName::parse("log[org.Foo]").unwrap();
    let lower = PropertyName::parse("log[org.foo]").unwrap();
    assert_ne!(upper, lower);
    assert_eq!(upper.element(1, Form::Original), "org.Foo");
}

#[test]
fn test_sub_name_and_append_name() {
    let name = PropertyName::parse("server.hosts[0].port").unwrap();
    let tail = name.sub_name(1);
    assert_eq!(tail.to_string(), "hosts[0].port");
    let rebuilt = PropertyName::parse("server").unwrap().append_name(&tail);
    assert_eq!(rebuilt, name);
}

#[test]
fn test_nested_brackets_are_generic_indexes() {
    let name = PropertyName::parse("a[[1]]").unwrap();
    assert!(name.is_indexed(1));
    assert!(!name.is_numeric_index(1));
    assert_eq!(name.element(1, Form::Original), "[1]");

    let mut names = vec![name.clone(), PropertyName::parse("a[2]").unwrap()];
    names.sort();
    assert_eq!(names[1], name);
}
