//! Schema Document Loading
//!
//! Reads JSON documents of named definitions into a [`SchemaDictionary`].
//!
//! ```json
//! {
//!   "Role": { "kind": "enum", "values": ["admin", "user"] },
//!   "User": {
//!     "kind": "object",
//!     "fields": {
//!       "role": { "$ref": "Role" },
//!       "email": "string",
//!       "nickname": { "kind": "string", "optional": true }
//!     }
//!   }
//! }
//! ```
//!
//! Every `$ref` to a name resolves to the same handle, so references stay
//! identity-equal to the registered value. Definition order is preserved.

use include_dir::{include_dir, Dir};
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::dictionary::SchemaDictionary;
use crate::error::{FlowError, Result};
use crate::schema::{ScalarKind, Schema};

/// Example documents compiled into the binary
static BUNDLED: Dir<'static> = include_dir!("$CARGO_MANIFEST_DIR/bundled");

/// Bundled example used when nothing else loads
pub const DEFAULT_EXAMPLE: &str = "shop";

/// How a dictionary was obtained
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadOutcome {
    /// Where the dictionary came from (a path or `bundled:<name>`)
    pub source: String,
    /// True when the requested document failed and the bundled example was used
    pub fallback: bool,
    /// Load error that caused the fallback
    pub error: Option<String>,
}

// =============================================================================
// Entry Points
// =============================================================================

/// Parse one JSON document
pub fn load_str(text: &str, source_name: &str) -> Result<SchemaDictionary> {
    let document: Value = serde_json::from_str(text).map_err(|e| FlowError::Load {
        source_name: source_name.to_string(),
        message: e.to_string(),
    })?;
    let definitions = as_definitions(&document, source_name)?;
    resolve_all(definitions)
}

pub fn load_file(path: &Path) -> Result<SchemaDictionary> {
    let text = fs::read_to_string(path)?;
    load_str(&text, &path.display().to_string())
}

/// Load every `*.json` under `dir` (sorted by path) as one namespace
pub fn load_dir(dir: &Path) -> Result<SchemaDictionary> {
    let mut files: Vec<_> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension().map(|ext| ext == "json").unwrap_or(false))
        .map(|e| e.into_path())
        .collect();
    files.sort();

    let mut merged = Map::new();
    for path in &files {
        let source_name = path.display().to_string();
        let text = fs::read_to_string(path)?;
        let document: Value = serde_json::from_str(&text).map_err(|e| FlowError::Load {
            source_name: source_name.clone(),
            message: e.to_string(),
        })?;

        for (name, definition) in as_definitions(&document, &source_name)? {
            if merged.contains_key(name) {
                return Err(FlowError::DuplicateName(name.clone()));
            }
            merged.insert(name.clone(), definition.clone());
        }
    }

    debug!(files = files.len(), definitions = merged.len(), "loaded schema directory");
    resolve_all(&merged)
}

/// Load a file or a directory of documents
pub fn load_path(path: &Path) -> Result<SchemaDictionary> {
    if path.is_dir() {
        load_dir(path)
    } else {
        load_file(path)
    }
}

/// Names of the bundled example documents, sorted
pub fn bundled_names() -> Vec<&'static str> {
    let mut names: Vec<&'static str> = BUNDLED
        .files()
        .filter(|f| f.path().extension().map(|e| e == "json").unwrap_or(false))
        .filter_map(|f| f.path().file_stem().and_then(|s| s.to_str()))
        .collect();
    names.sort_unstable();
    names
}

pub fn load_bundled(name: &str) -> Result<SchemaDictionary> {
    let file = BUNDLED
        .get_file(format!("{}.json", name))
        .ok_or_else(|| FlowError::UnknownExample(name.to_string()))?;
    let text = file.contents_utf8().ok_or_else(|| FlowError::Load {
        source_name: format!("bundled:{}", name),
        message: "not valid UTF-8".to_string(),
    })?;
    load_str(text, &format!("bundled:{}", name))
}

/// Load `path`, falling back to the bundled `example` on failure.
///
/// Only an unknown `example` is an error; a failing `path` is reported
/// through the outcome.
pub fn load_or_fallback(path: Option<&Path>, example: &str) -> Result<(SchemaDictionary, LoadOutcome)> {
    let error = match path {
        Some(path) => match load_path(path) {
            Ok(dict) => {
                info!(path = %path.display(), schemas = dict.len(), "loaded schemas");
                let outcome = LoadOutcome {
                    source: path.display().to_string(),
                    fallback: false,
                    error: None,
                };
                return Ok((dict, outcome));
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load schemas, using bundled example");
                Some(e.to_string())
            }
        },
        None => None,
    };

    let dict = load_bundled(example)?;
    let outcome = LoadOutcome {
        source: format!("bundled:{}", example),
        fallback: error.is_some(),
        error,
    };
    Ok((dict, outcome))
}

// =============================================================================
// Resolution
// =============================================================================

fn as_definitions<'a>(document: &'a Value, source_name: &str) -> Result<&'a Map<String, Value>> {
    document.as_object().ok_or_else(|| FlowError::Load {
        source_name: source_name.to_string(),
        message: "top level must be an object of named definitions".to_string(),
    })
}

fn resolve_all(definitions: &Map<String, Value>) -> Result<SchemaDictionary> {
    let mut resolver = Resolver {
        definitions,
        resolved: HashMap::new(),
        in_progress: HashSet::new(),
    };

    let mut dict = SchemaDictionary::new();
    for name in definitions.keys() {
        let schema = resolver.named(name, name)?;
        dict.insert(name.as_str(), schema)?;
    }
    Ok(dict)
}

struct Resolver<'a> {
    definitions: &'a Map<String, Value>,
    resolved: HashMap<String, Schema>,
    in_progress: HashSet<String>,
}

impl<'a> Resolver<'a> {
    /// Handle for a named definition, built once
    fn named(&mut self, name: &str, within: &str) -> Result<Schema> {
        if let Some(schema) = self.resolved.get(name) {
            return Ok(schema.clone());
        }

        let definitions = self.definitions;
        let definition = definitions
            .get(name)
            .ok_or_else(|| FlowError::UnknownReference {
                reference: name.to_string(),
                within: within.to_string(),
            })?;

        if !self.in_progress.insert(name.to_string()) {
            return Err(FlowError::RecursiveReference(name.to_string()));
        }
        let schema = self.definition(definition, name)?;
        self.in_progress.remove(name);

        self.resolved.insert(name.to_string(), schema.clone());
        Ok(schema)
    }

    fn definition(&mut self, definition: &Value, within: &str) -> Result<Schema> {
        match definition {
            Value::String(word) => scalar(word, within),
            Value::Object(map) => {
                let schema = match map.get("$ref") {
                    Some(_) if map.contains_key("kind") => {
                        return Err(invalid(within, "\"$ref\" and \"kind\" cannot be combined"));
                    }
                    Some(target) => {
                        let target = target.as_str().ok_or_else(|| invalid(within, "$ref must be a string"))?;
                        self.named(target, within)?
                    }
                    None => self.kind(map, within)?,
                };
                apply_modifiers(schema, map, within)
            }
            other => Err(invalid(within, format!("expected a string or object, found {}", other))),
        }
    }

    fn kind(&mut self, map: &Map<String, Value>, within: &str) -> Result<Schema> {
        let kind = map
            .get("kind")
            .and_then(Value::as_str)
            .ok_or_else(|| invalid(within, "missing \"kind\""))?;

        let schema = match kind {
            "object" => {
                let fields = object_key(map, "fields", within)?;
                let mut built = Vec::with_capacity(fields.len());
                for (key, field) in fields {
                    built.push((key.clone(), self.definition(field, within)?));
                }
                Schema::object(built)
            }
            "enum" => {
                let values = array_key(map, "values", within)?
                    .iter()
                    .map(|v| {
                        v.as_str()
                            .map(str::to_string)
                            .ok_or_else(|| invalid(within, "enum values must be strings"))
                    })
                    .collect::<Result<Vec<_>>>()?;
                Schema::enumeration(values)
            }
            "nativeEnum" => {
                let members = object_key(map, "members", within)?
                    .iter()
                    .map(|(name, value)| (name.clone(), value.clone()));
                Schema::native_enum(members)
            }
            "array" => Schema::array(self.slot(map, "of", within)?),
            "set" => Schema::set(self.slot(map, "of", within)?),
            "promise" => Schema::promise(self.slot(map, "of", within)?),
            "tuple" => Schema::tuple(self.list(map, "items", within)?),
            "union" => Schema::union(self.list(map, "options", within)?),
            "record" => {
                let key = match map.get("key") {
                    Some(key) => self.definition(key, within)?,
                    None => Schema::string(),
                };
                Schema::record(key, self.slot(map, "value", within)?)
            }
            "map" => Schema::map(self.slot(map, "key", within)?, self.slot(map, "value", within)?),
            "intersection" => {
                Schema::intersection(self.slot(map, "left", within)?, self.slot(map, "right", within)?)
            }
            "literal" => {
                let value = map.get("value").ok_or_else(|| invalid(within, "literal needs \"value\""))?;
                Schema::literal(value.clone())
            }
            "function" => Schema::function(),
            word => scalar(word, within)?,
        };
        Ok(schema)
    }

    fn slot(&mut self, map: &Map<String, Value>, key: &str, within: &str) -> Result<Schema> {
        let definition = map
            .get(key)
            .ok_or_else(|| invalid(within, format!("missing \"{}\"", key)))?;
        self.definition(definition, within)
    }

    fn list(&mut self, map: &Map<String, Value>, key: &str, within: &str) -> Result<Vec<Schema>> {
        array_key(map, key, within)?
            .iter()
            .map(|item| self.definition(item, within))
            .collect()
    }
}

fn scalar(word: &str, within: &str) -> Result<Schema> {
    ScalarKind::from_word(word)
        .map(Schema::scalar)
        .ok_or_else(|| FlowError::UnknownKind {
            kind: word.to_string(),
            within: within.to_string(),
        })
}

/// Wrap in modifier layers, innermost first: effects, default, nullable, optional
fn apply_modifiers(schema: Schema, map: &Map<String, Value>, within: &str) -> Result<Schema> {
    let flag = |key: &str| -> Result<bool> {
        match map.get(key) {
            None => Ok(false),
            Some(Value::Bool(b)) => Ok(*b),
            Some(_) => Err(invalid(within, format!("\"{}\" must be a boolean", key))),
        }
    };

    let mut schema = schema;
    if flag("effects")? {
        schema = schema.effects();
    }
    if let Some(default) = map.get("default") {
        schema = schema.default_value(default.clone());
    }
    if flag("nullable")? {
        schema = schema.nullable();
    }
    if flag("optional")? {
        schema = schema.optional();
    }
    Ok(schema)
}

fn object_key<'m>(map: &'m Map<String, Value>, key: &str, within: &str) -> Result<&'m Map<String, Value>> {
    map.get(key)
        .and_then(Value::as_object)
        .ok_or_else(|| invalid(within, format!("\"{}\" must be an object", key)))
}

fn array_key<'m>(map: &'m Map<String, Value>, key: &str, within: &str) -> Result<&'m Vec<Value>> {
    map.get(key)
        .and_then(Value::as_array)
        .ok_or_else(|| invalid(within, format!("\"{}\" must be an array", key)))
}

fn invalid(within: &str, message: impl Into<String>) -> FlowError {
    FlowError::InvalidDefinition {
        within: within.to_string(),
        message: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{resolve_base, SchemaKind, SchemaTag};
    use serde_json::json;

    fn load(doc: Value) -> Result<SchemaDictionary> {
        load_str(&doc.to_string(), "test")
    }

    #[test]
    fn test_references_share_handles() {
        let dict = load(json!({
            "User": {"kind": "object", "fields": {"role": {"$ref": "Role"}}},
            "Role": {"kind": "enum", "values": ["admin", "user"]}
        }))
        .unwrap();

        let role = dict.get("Role").unwrap();
        let SchemaKind::Object(fields) = dict.get("User").unwrap().kind() else {
            panic!("User should be an object");
        };
        assert!(Schema::ptr_eq(&fields[0].1, role));
        let names: Vec<&str> = dict.names().collect();
        assert_eq!(names, vec!["User", "Role"]);
    }

    #[test]
    fn test_bare_ref_is_an_alias() {
        let dict = load(json!({
            "Role": {"kind": "enum", "values": ["a"]},
            "Alias": {"$ref": "Role"}
        }))
        .unwrap();
        assert!(Schema::ptr_eq(dict.get("Role").unwrap(), dict.get("Alias").unwrap()));
        assert_eq!(dict.distinct().len(), 1);
    }

    #[test]
    fn test_modifiers() {
        let dict = load(json!({
            "Name": {"kind": "string", "optional": true, "nullable": true, "default": "anon", "effects": true}
        }))
        .unwrap();

        let base = resolve_base(dict.get("Name").unwrap());
        assert_eq!(base.schema.tag(), SchemaTag::String);
        assert!(base.optional && base.nullable);
        assert_eq!(base.default_value, Some(json!("anon")));
    }

    #[test]
    fn test_compound_kinds() {
        let dict = load(json!({
            "Everything": {"kind": "object", "fields": {
                "list": {"kind": "array", "of": "number"},
                "pair": {"kind": "tuple", "items": ["string", "boolean"]},
                "either": {"kind": "union", "options": ["string", {"kind": "literal", "value": 3}]},
                "lookup": {"kind": "record", "value": "date"},
                "index": {"kind": "map", "key": "string", "value": "bigint"},
                "unique": {"kind": "set", "of": "symbol"},
                "both": {"kind": "intersection", "left": "string", "right": "number"},
                "later": {"kind": "promise", "of": "void"},
                "call": {"kind": "function"},
                "level": {"kind": "nativeEnum", "members": {"Low": 0, "High": 1}}
            }}
        }))
        .unwrap();

        let SchemaKind::Object(fields) = dict.get("Everything").unwrap().kind() else {
            panic!("Everything should be an object");
        };
        let tags: Vec<SchemaTag> = fields.iter().map(|(_, s)| s.tag()).collect();
        assert_eq!(
            tags,
            vec![
                SchemaTag::Array,
                SchemaTag::Tuple,
                SchemaTag::Union,
                SchemaTag::Record,
                SchemaTag::Map,
                SchemaTag::Set,
                SchemaTag::Intersection,
                SchemaTag::Promise,
                SchemaTag::Function,
                SchemaTag::NativeEnum,
            ]
        );
    }

    #[test]
    fn test_errors() {
        assert!(matches!(
            load(json!({"A": {"$ref": "Missing"}})),
            Err(FlowError::UnknownReference { reference, .. }) if reference == "Missing"
        ));
        assert!(matches!(
            load(json!({"A": {"$ref": "B"}, "B": {"$ref": "A"}})),
            Err(FlowError::RecursiveReference(_))
        ));
        assert!(matches!(
            load(json!({"A": "float"})),
            Err(FlowError::UnknownKind { kind, .. }) if kind == "float"
        ));
        assert!(matches!(
            load(json!({"A": {"kind": "enum", "values": [1]}})),
            Err(FlowError::InvalidDefinition { .. })
        ));
        assert!(matches!(
            load(json!({"B": "string", "A": {"$ref": "B", "kind": "number"}})),
            Err(FlowError::InvalidDefinition { within, .. }) if within == "A"
        ));
        assert!(matches!(load(json!([1, 2])), Err(FlowError::Load { .. })));
        assert!(matches!(load_str("{ nope", "broken"), Err(FlowError::Load { .. })));
    }

    #[test]
    fn test_bundled_examples() {
        let names = bundled_names();
        assert!(names.contains(&DEFAULT_EXAMPLE));
        for name in names {
            assert!(load_bundled(name).is_ok(), "bundled example {} should load", name);
        }
        assert!(matches!(load_bundled("nope"), Err(FlowError::UnknownExample(_))));
    }

    #[test]
    fn test_fallback_without_path_is_not_an_error() {
        let (dict, outcome) = load_or_fallback(None, DEFAULT_EXAMPLE).unwrap();
        assert!(!dict.is_empty());
        assert!(!outcome.fallback);
        assert_eq!(outcome.source, "bundled:shop");
    }

    #[test]
    fn test_fallback_on_missing_file() {
        let (dict, outcome) =
            load_or_fallback(Some(Path::new("/definitely/not/here.json")), DEFAULT_EXAMPLE).unwrap();
        assert!(dict.contains_name("UserSchema"));
        assert!(outcome.fallback);
        assert!(outcome.error.is_some());
    }
}
