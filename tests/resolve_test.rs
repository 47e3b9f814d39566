use std::{borrow::Cow, path::PathBuf};

use anyhow::{Context, Result};
use camel_schema::{
    Definition, ResolveError, Resolver, Schema, lookup_definition,
    resolve::{self, DEFAULT_MAX_DEPTH},
};
use pretty_assertions::assert_eq;
use serde_json::json;

fn extends_type_schema() -> Result<Schema> {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/testdata/extends-type-schema.json");
    Schema::load(&path).with_context(|| format!("could not load {:?}", path))
}

fn property_names(definition: &Definition) -> Vec<&str> {
    definition.properties.keys().map(String::as_str).collect()
}

fn definition(typ: &str, properties: &[&str]) -> Definition {
    let mut definition = Definition::new(typ);
    for name in properties {
        definition
            .properties
            .insert(name.to_string(), json!({ "type": "string", "title": name }));
    }
    definition
}

#[test]
fn test_lookup_definition_type_extends() -> Result<()> {
    let schema = extends_type_schema()?;

    let def = lookup_definition("base", &schema)?.context("base should resolve")?;
    assert_eq!(def.typ, "object");
    assert_eq!(def.properties.len(), 2);

    let def = lookup_definition("typed", &schema)?.context("typed should resolve")?;
    assert_eq!(def.typ, "base");
    assert_eq!(property_names(&def), vec!["name", "description", "kind"]);

    let def = lookup_definition("extended", &schema)?.context("extended should resolve")?;
    assert_eq!(def.typ, "object");
    assert_eq!(property_names(&def), vec!["name", "description", "kind"]);

    Ok(())
}

#[test]
fn test_base_definition_is_returned_unchanged() -> Result<()> {
    let schema = extends_type_schema()?;
    let stored = schema.get("base").context("base missing from fixture")?;

    let def = lookup_definition("base", &schema)?.context("base should resolve")?;

    assert!(matches!(def, Cow::Borrowed(_)));
    assert!(std::ptr::eq(&*def, stored));

    Ok(())
}

#[test]
fn test_derived_property_shadows_ancestor() -> Result<()> {
    let schema = extends_type_schema()?;

    let def = lookup_definition("extended", &schema)?.context("extended should resolve")?;

    assert_eq!(
        def.properties["name"],
        json!({ "type": "string", "title": "Extended Name", "required": true })
    );
    assert_eq!(
        def.properties["description"],
        json!({ "type": "string", "title": "Description" })
    );

    Ok(())
}

#[test]
fn test_scalar_fields_fall_back_to_nearest_ancestor() -> Result<()> {
    let schema = extends_type_schema()?;

    let def = lookup_definition("typed", &schema)?.context("typed should resolve")?;

    assert_eq!(def.title(), Some("Typed"));
    assert_eq!(def.group(), Some("base"));
    assert_eq!(def.icon(), Some("base24.png"));
    assert_eq!(def.description(), Some("The root of the test hierarchy"));
    assert_eq!(def.fields.get("acceptInput"), Some(&json!("true")));

    Ok(())
}

#[test]
fn test_extends_does_not_inherit_scalar_fields() -> Result<()> {
    let schema = extends_type_schema()?;

    let def = lookup_definition("extended", &schema)?.context("extended should resolve")?;

    assert_eq!(def.title(), Some("Extended"));
    assert_eq!(def.group(), None);
    assert_eq!(def.icon(), None);

    Ok(())
}

#[test]
fn test_three_level_chain_merges_all_properties() -> Result<()> {
    let schema: Schema = [
        ("a".to_string(), definition("b", &["p1"])),
        ("b".to_string(), definition("c", &["p2", "p3"])),
        ("c".to_string(), definition("object", &["p4"])),
    ]
    .into_iter()
    .collect();

    let def = lookup_definition("a", &schema)?.context("a should resolve")?;

    assert_eq!(property_names(&def), vec!["p4", "p2", "p3", "p1"]);
    assert_eq!(def.typ, "b");

    Ok(())
}

#[test]
fn test_missing_name_is_absent() -> Result<()> {
    let schema = extends_type_schema()?;

    assert_eq!(lookup_definition("nope", &schema)?, None);
    assert_eq!(
        resolve::resolve("nope", &schema, DEFAULT_MAX_DEPTH),
        Err(ResolveError::NotFound("nope".to_string()))
    );

    Ok(())
}

#[test]
fn test_dangling_parent_is_absent() -> Result<()> {
    let schema = extends_type_schema()?;

    assert_eq!(lookup_definition("orphan", &schema)?, None);
    assert_eq!(lookup_definition("orphanChild", &schema)?, None);
    assert_eq!(
        resolve::resolve("orphanChild", &schema, DEFAULT_MAX_DEPTH),
        Err(ResolveError::DanglingParent {
            name: "orphan".to_string(),
            parent: "missing".to_string()
        })
    );

    Ok(())
}

#[test]
fn test_dangling_extends_is_absent() -> Result<()> {
    let mut child = definition("object", &["p1"]);
    child.extends = serde_json::from_value(json!({ "type": ["gone"] }))?;
    let schema: Schema = [("child".to_string(), child)].into_iter().collect();

    assert_eq!(lookup_definition("child", &schema)?, None);

    Ok(())
}

#[test]
fn test_resolution_is_idempotent_and_leaves_schema_untouched() -> Result<()> {
    let schema = extends_type_schema()?;
    let before = schema.clone();

    let first = lookup_definition("extended", &schema)?.context("extended should resolve")?;
    let second = lookup_definition("extended", &schema)?.context("extended should resolve")?;

    assert_eq!(first, second);
    assert_eq!(schema, before);
    assert_eq!(
        schema.get("extended").map(|d| d.properties.len()),
        Some(1)
    );

    Ok(())
}

#[test]
fn test_cyclic_schema_is_reported() -> Result<()> {
    let schema: Schema = [
        ("A".to_string(), definition("B", &["p1"])),
        ("B".to_string(), definition("A", &["p2"])),
    ]
    .into_iter()
    .collect();

    let result = lookup_definition("A", &schema);

    assert_eq!(
        result,
        Err(ResolveError::Cycle(vec![
            "A".to_string(),
            "B".to_string(),
            "A".to_string()
        ]))
    );
    assert_eq!(
        result.err().map(|e| e.to_string()),
        Some("cyclic type definition: A -> B -> A".to_string())
    );

    Ok(())
}

#[test]
fn test_cycle_through_extends_is_reported() -> Result<()> {
    let mut a = definition("object", &["p1"]);
    a.extends = serde_json::from_value(json!({ "type": "B" }))?;
    let schema: Schema = [
        ("A".to_string(), a),
        ("B".to_string(), definition("A", &["p2"])),
    ]
    .into_iter()
    .collect();

    assert!(matches!(
        lookup_definition("B", &schema),
        Err(ResolveError::Cycle(_))
    ));

    Ok(())
}

#[test]
fn test_diamond_through_extends_is_not_a_cycle() -> Result<()> {
    let mut child = definition("left", &["own"]);
    child.extends = serde_json::from_value(json!({ "type": ["right"] }))?;
    let schema: Schema = [
        ("root".to_string(), definition("object", &["shared"])),
        ("left".to_string(), definition("root", &["l"])),
        ("right".to_string(), definition("root", &["r"])),
        ("child".to_string(), child),
    ]
    .into_iter()
    .collect();

    let def = lookup_definition("child", &schema)?.context("child should resolve")?;

    assert_eq!(property_names(&def), vec!["shared", "l", "r", "own"]);

    Ok(())
}

#[test]
fn test_resolver_respects_max_depth() -> Result<()> {
    let schema: Schema = [
        ("a".to_string(), definition("b", &[])),
        ("b".to_string(), definition("c", &[])),
        ("c".to_string(), definition("object", &[])),
    ]
    .into_iter()
    .collect();
    let resolver = Resolver::new(schema);

    assert!(resolver.lookup_definition("a")?.is_some());

    let shallow = resolver.with_max_depth(2);
    assert_eq!(
        shallow.lookup_definition("a"),
        Err(ResolveError::TooDeep {
            name: "a".to_string(),
            max_depth: 2
        })
    );

    Ok(())
}

#[test]
fn test_explicit_null_field_overrides_ancestor() -> Result<()> {
    let schema = Schema::from_json_str(
        r#"{
            "parent": { "type": "object", "title": "B", "group": "g" },
            "child": { "type": "parent", "title": null }
        }"#,
    )?;

    let def = lookup_definition("child", &schema)?.context("child should resolve")?;

    assert_eq!(def.title(), None);
    assert_eq!(def.fields.get("title"), Some(&serde_json::Value::Null));
    assert_eq!(def.group(), Some("g"));

    Ok(())
}

#[test]
fn test_non_string_descriptive_fields_are_carried_through() -> Result<()> {
    let schema = Schema::from_json_str(
        r#"{
            "parent": { "type": "object", "description": { "text": "nested", "lang": "en" } },
            "child": { "type": "parent", "icon": 42 }
        }"#,
    )?;

    let def = lookup_definition("child", &schema)?.context("child should resolve")?;

    assert_eq!(
        def.fields.get("description"),
        Some(&json!({ "text": "nested", "lang": "en" }))
    );
    assert_eq!(def.fields.get("icon"), Some(&json!(42)));
    assert_eq!(def.description(), None);

    Ok(())
}

// every type mixes in the two before it, so each ancestor is reachable along many paths
fn layered_mixins(count: usize) -> Result<Schema> {
    let mut schema = Schema::new();
    for i in 0..count {
        let property = format!("p{}", i);
        let mut def = definition("object", &[property.as_str()]);
        if i >= 2 {
            def.extends = serde_json::from_value(json!({
                "type": [format!("x{}", i - 1), format!("x{}", i - 2)]
            }))?;
        }
        schema.insert(format!("x{}", i), def);
    }
    Ok(schema)
}

#[test]
fn test_shared_mixins_are_merged_once_per_lookup() -> Result<()> {
    let schema = layered_mixins(60)?;

    let def = resolve::resolve("x59", &schema, 64)?;

    assert_eq!(def.properties.len(), 60);
    assert_eq!(def.properties.keys().last().map(String::as_str), Some("p59"));

    Ok(())
}
