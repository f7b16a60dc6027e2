//! Loader Tests
//!
//! Schema documents on disk: single files, directories, and fallback.

use std::fs;
use std::path::{Path, PathBuf};

use schema_flow::loader::{load_dir, load_file, load_or_fallback, load_path, DEFAULT_EXAMPLE};
use schema_flow::{compile_dictionary, CompileOptions, FlowError, Schema, SchemaKind};

fn fixtures_path() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

#[test]
fn test_load_directory_merges_documents() {
    let dict = load_dir(&fixtures_path().join("split")).unwrap();

    let names: Vec<&str> = dict.names().collect();
    assert_eq!(names, vec!["Account", "Currency", "Customer"]);

    // Cross-file references keep identity
    let SchemaKind::Object(fields) = dict.get("Account").unwrap().kind() else {
        panic!("Account should be an object");
    };
    assert!(Schema::ptr_eq(&fields[0].1, dict.get("Customer").unwrap()));

    let graph = compile_dictionary(&dict, CompileOptions::default()).unwrap();
    assert_eq!(graph.edges_from("Account").count(), 2);
    assert_eq!(graph.node("Customer:tier").unwrap().members(), ["0", "1"]);
}

#[test]
fn test_load_path_dispatches_on_kind() {
    assert_eq!(load_path(&fixtures_path().join("split")).unwrap().len(), 3);
    assert_eq!(load_path(&fixtures_path().join("scenario_a.json")).unwrap().len(), 2);
}

#[test]
fn test_duplicate_names_across_files() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("a.json"), r#"{"Shared": "string"}"#).unwrap();
    fs::write(dir.path().join("b.json"), r#"{"Shared": "number"}"#).unwrap();

    match load_dir(dir.path()) {
        Err(FlowError::DuplicateName(name)) => assert_eq!(name, "Shared"),
        other => panic!("Expected DuplicateName, got {:?}", other.map(|d| d.len())),
    }
}

#[test]
fn test_empty_directory_loads_nothing() {
    let dir = tempfile::tempdir().unwrap();
    assert!(load_dir(dir.path()).unwrap().is_empty());
}

#[test]
fn test_broken_document_reports_source() {
    let path = fixtures_path().join("broken.json");
    match load_file(&path) {
        Err(FlowError::Load { source_name, .. }) => assert!(source_name.ends_with("broken.json")),
        other => panic!("Expected Load error, got {:?}", other.map(|d| d.len())),
    }
}

#[test]
fn test_fallback_reports_error() {
    let path = fixtures_path().join("broken.json");
    let (dict, outcome) = load_or_fallback(Some(&path), DEFAULT_EXAMPLE).unwrap();

    assert!(outcome.fallback);
    assert_eq!(outcome.source, "bundled:shop");
    assert!(outcome.error.unwrap().contains("broken.json"));
    assert!(dict.contains_name("MasterSchema"));
}

#[test]
fn test_successful_load_is_not_a_fallback() {
    let path = fixtures_path().join("scenario_b.json");
    let (dict, outcome) = load_or_fallback(Some(&path), DEFAULT_EXAMPLE).unwrap();

    assert!(!outcome.fallback);
    assert!(outcome.error.is_none());
    assert!(dict.contains_name("Order"));
}

#[test]
fn test_unknown_fallback_example_is_an_error() {
    let path = fixtures_path().join("broken.json");
    assert!(matches!(
        load_or_fallback(Some(&path), "missing"),
        Err(FlowError::UnknownExample(_))
    ));
}
