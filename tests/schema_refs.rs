// tests/schema_refs.rs

use std::fs;

use manuallabour::errors::ManualError;
use manuallabour::schema::{SchemaLoader, property_defaults};
use serde_json::{Value, json};
use tempfile::tempdir;

fn contains_ref(value: &Value) -> bool {
    match value {
        Value::Object(map) => map.contains_key("$ref") || map.values().any(contains_ref),
        Value::Array(items) => items.iter().any(contains_ref),
        _ => false,
    }
}

#[test]
fn bundled_schemas_are_fully_substituted() {
    let mut loader = SchemaLoader::bundled();

    for name in ["common.json", "object.json", "step.json", "graph.json", "schedule.json"] {
        let schema = loader.load(name).unwrap();
        assert!(!contains_ref(&schema), "{name} still contains a $ref");
    }
}

#[test]
fn sibling_and_local_refs_are_resolved() {
    let mut loader = SchemaLoader::bundled();
    let step = loader.load("step.json").unwrap();

    let id = &step["properties"]["step_id"];
    assert_eq!(id["pattern"], "^[a-zA-Z][a-zA-Z0-9]*$");

    // parts -> #/definitions/obj_namespace -> common.json#/obj_ref
    let obj_ref = &step["properties"]["parts"]["additionalProperties"];
    assert_eq!(obj_ref["properties"]["quantity"]["default"], 1);
    assert_eq!(obj_ref["properties"]["obj_id"]["pattern"], "^[a-zA-Z0-9_]+$");
}

#[test]
fn keys_next_to_a_ref_take_precedence() {
    let mut loader = SchemaLoader::bundled();
    let sched = loader.load("schedule.json").unwrap();

    let step = &sched["definitions"]["schedule_step"];
    assert!(step["properties"].get("step_idx").is_some());
    assert_eq!(step["required"], json!(["step_id", "step_idx"]));
    // inherited from graph.json#/definitions/graph_step
    assert_eq!(step["additionalProperties"], false);
}

#[test]
fn schema_defaults_match_reference_defaults() {
    let mut loader = SchemaLoader::bundled();
    let obj_ref = loader.load_part("common.json", "/obj_ref").unwrap();

    let defaults = property_defaults(&obj_ref);
    assert_eq!(defaults["optional"], false);
    assert_eq!(defaults["quantity"], 1);
    assert_eq!(defaults["created"], false);
    assert!(!defaults.contains_key("obj_id"));
}

#[test]
fn cyclic_refs_across_files_fail() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.json"), r#"{"x": {"$ref": "b.json#/y"}}"#).unwrap();
    fs::write(dir.path().join("b.json"), r#"{"y": {"$ref": "a.json#/x"}}"#).unwrap();

    let mut loader = SchemaLoader::new(dir.path());
    assert!(matches!(
        loader.load("a.json"),
        Err(ManualError::CyclicSchemaRef(_))
    ));
}

#[test]
fn self_referencing_schema_fails() {
    let dir = tempdir().unwrap();
    fs::write(
        dir.path().join("tree.json"),
        r##"{"node": {"type": "object", "properties": {"children": {"items": {"$ref": "#/node"}}}}}"##,
    )
    .unwrap();

    let mut loader = SchemaLoader::new(dir.path());
    assert!(matches!(
        loader.load("tree.json"),
        Err(ManualError::CyclicSchemaRef(_))
    ));
}

#[test]
fn shared_refs_are_not_cycles() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("base.json"), r#"{"id": {"type": "string"}}"#).unwrap();
    fs::write(
        dir.path().join("pair.json"),
        r#"{"a": {"$ref": "base.json#/id"}, "b": {"$ref": "base.json#/id", "minLength": 1}}"#,
    )
    .unwrap();

    let mut loader = SchemaLoader::new(dir.path());
    let pair = loader.load("pair.json").unwrap();
    assert_eq!(pair["a"], json!({"type": "string"}));
    assert_eq!(pair["b"], json!({"type": "string", "minLength": 1}));
}

#[test]
fn unresolvable_refs_fail() {
    let dir = tempdir().unwrap();
    let cases = [
        ("parent.json", r#"{"x": {"$ref": "../common.json#/obj_id"}}"#),
        ("nested.json", r#"{"x": {"$ref": "sub/common.json#/obj_id"}}"#),
        ("missing.json", r#"{"x": {"$ref": "nope.json#/obj_id"}}"#),
        ("pointer.json", r##"{"x": {"$ref": "#/nothing"}}"##),
    ];
    for (name, text) in cases {
        fs::write(dir.path().join(name), text).unwrap();
    }

    let mut loader = SchemaLoader::new(dir.path());
    for (name, _) in cases {
        match loader.load(name) {
            Err(ManualError::UnresolvedSchemaRef(_)) => {}
            other => panic!("{name}: expected UnresolvedSchemaRef, got {:?}", other),
        }
    }
}
