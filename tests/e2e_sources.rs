//! Integration tests for property sources and their decorators.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use propbind::{
    DescendantState, MapPropertySource, PropertyName, PropertyNameAliases, PropertySource, PropertySourceExt, Value,
};

fn name(s: &str) -> PropertyName {
    PropertyName::parse(s).unwrap()
}

fn shared(source: MapPropertySource) -> Arc<dyn PropertySource> {
    Arc::new(source)
}

#[test]
fn test_map_source_lenient_keys_and_origin() {
    let source = MapPropertySource::new("application.yml")
        .with("server.maxThreads", 200)
        .with("SERVER.HOST_NAME", "example.org");

    let threads = source.get(&name("server.max-threads")).unwrap();
    assert_eq!(threads.value, Value::Int(200));
    assert_eq!(threads.origin.as_deref(), Some("application.yml [server.maxThreads]"));
    assert_eq!(source.get(&name("server.host-name")).unwrap().value, Value::from("example.org"));
    assert_eq!(source.len(), 2);
}

#[test]
fn test_map_source_descendants() {
    let source = MapPropertySource::new("test").with("app.pool.size", 4);
    assert_eq!(source.contains_descendant_of(&name("app")), DescendantState::Present);
    assert_eq!(source.contains_descendant_of(&name("app.pool")), DescendantState::Present);
    assert_eq!(source.contains_descendant_of(&name("app.pool.size")), DescendantState::Absent);
    assert_eq!(source.contains_descendant_of(&name("other")), DescendantState::Absent);
}

#[test]
fn test_map_source_insert_and_remove() {
    let source = MapPropertySource::new("test");
    source.insert("a.b", "1");
    source.insert("a.b", "2");
    assert_eq!(source.len(), 1);
    assert_eq!(source.remove("a.b"), Some(Value::from("2")));
    assert!(source.is_empty());
}

#[test]
fn test_filtered_source_hides_names_and_descendants() {
    let source = shared(
        MapPropertySource::new("test")
            .with("app.visible", "1")
            .with("app.hidden.key", "2"),
    );
    let filtered = source.filter(|n| !n.as_str().contains("hidden"));

    assert!(filtered.get(&name("app.visible")).is_some());
    assert!(filtered.get(&name("app.hidden.key")).is_none());
    assert_eq!(filtered.contains_descendant_of(&name("app.hidden")), DescendantState::Absent);
    assert_eq!(filtered.names().unwrap(), vec![name("app.visible")]);
}

#[test]
fn test_prefixed_source_strips_prefix_from_names() {
    let source = shared(MapPropertySource::new("env").with("acme.app.port", 9000).with("other.key", 1));
    let prefixed = source.with_prefix("acme").unwrap();

    let port = prefixed.get(&name("app.port")).unwrap();
    assert_eq!(port.name, name("app.port"));
    assert_eq!(port.value, Value::Int(9000));
    assert_eq!(prefixed.names().unwrap(), vec![name("app.port")]);
    assert_eq!(prefixed.contains_descendant_of(&name("app")), DescendantState::Present);
}

#[test]
fn test_blank_prefix_returns_same_source() {
    let source = shared(MapPropertySource::new("env").with("a", 1));
    let same = source.with_prefix("  ").unwrap();
    assert!(Arc::ptr_eq(&source, &same));
    assert!(source.with_prefix("Bad.Prefix").is_err());
}

#[test]
fn test_aliases_resolve_both_directions() {
    let aliases = PropertyNameAliases::new().with("app.host", &["app.hostname"]).unwrap();
    let new_style = shared(MapPropertySource::new("new").with("app.host", "a")).with_aliases(aliases.clone());
    let old_style = shared(MapPropertySource::new("old").with("app.hostname", "b")).with_aliases(aliases);

    let via_alias = new_style.get(&name("app.hostname")).unwrap();
    assert_eq!(via_alias.name, name("app.hostname"));
    assert_eq!(via_alias.value, Value::from("a"));
    assert_eq!(old_style.get(&name("app.host")).unwrap().value, Value::from("b"));
    assert!(old_style.names().unwrap().contains(&name("app.host")));
}
