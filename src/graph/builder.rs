//! Graph Builder
//!
//! Recursive compiler from schema values to a [`FlowGraph`]. Registered
//! node-kind values become references plus edges; unregistered objects and
//! enums get synthetic ids derived from their parent id and field key.
//!
//! All mutable state lives in one `GraphBuilder`, built per compile:
//! - `IdGenerator` counters
//! - the anonymous-node index (identity -> emitted id)
//! - claimed node and edge ids

use serde_json::Value;
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::debug;

use super::descriptor::TypeDescriptor;
use super::{FieldEntry, FlowGraph, GraphEdge, GraphNode};
use crate::dictionary::SchemaDictionary;
use crate::error::{FlowError, Result};
use crate::ident::IdGenerator;
use crate::schema::{resolve_base, Schema, SchemaKind};

/// Id and label given to an unregistered root object
pub const ROOT_ID: &str = "Root";

/// Default nesting limit for one compile
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Id and label handed down to an anonymous nested compile
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeContext {
    pub id: String,
    pub label: String,
}

impl NodeContext {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompileOptions {
    pub max_depth: usize,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Position inside the object field currently being described
struct FieldCursor<'a> {
    source: &'a str,
    key: &'a str,
    /// Anonymous nodes synthesized for this field so far
    synthesized: usize,
}

pub struct GraphBuilder<'d> {
    dict: &'d SchemaDictionary,
    options: CompileOptions,
    ids: IdGenerator,
    anonymous: HashMap<usize, String>,
    node_ids: HashSet<String>,
    edge_ids: HashSet<String>,
}

impl<'d> GraphBuilder<'d> {
    pub fn new(dict: &'d SchemaDictionary) -> Self {
        // Registered node names are reserved so synthetic ids never shadow them
        let node_ids = dict
            .iter()
            .filter(|(_, schema)| resolve_base(schema).schema.tag().is_node_kind())
            .map(|(name, _)| name.to_string())
            .collect();

        Self {
            dict,
            options: CompileOptions::default(),
            ids: IdGenerator::new(),
            anonymous: HashMap::new(),
            node_ids,
            edge_ids: HashSet::new(),
        }
    }

    pub fn with_options(mut self, options: CompileOptions) -> Self {
        self.options = options;
        self
    }

    /// Compile one schema value and everything anonymous beneath it
    pub fn compile(&mut self, schema: &Schema, context: Option<NodeContext>) -> Result<FlowGraph> {
        self.compile_at(schema, context, 0)
    }

    /// Registered name of a node-kind base value
    fn node_name(&self, base: &Schema) -> Option<&'d str> {
        if !base.tag().is_node_kind() {
            return None;
        }
        self.dict.find_name(base)
    }

    /// Claim `candidate` as a node id, or a generated variant of it when taken
    fn claim_node_id(&mut self, candidate: String) -> String {
        if self.node_ids.insert(candidate.clone()) {
            return candidate;
        }
        loop {
            let id = self.ids.generate(&candidate);
            if self.node_ids.insert(id.clone()) {
                return id;
            }
        }
    }

    fn claim_edge_id(&mut self, source: &str, target: &str) -> String {
        let candidate = format!("{}->{}", source, target);
        if self.edge_ids.insert(candidate.clone()) {
            return candidate;
        }
        loop {
            let id = self.ids.generate(&candidate);
            if self.edge_ids.insert(id.clone()) {
                return id;
            }
        }
    }

    fn compile_at(
        &mut self,
        schema: &Schema,
        context: Option<NodeContext>,
        depth: usize,
    ) -> Result<FlowGraph> {
        let base = resolve_base(schema).schema;
        let tag = base.tag();

        if !tag.is_node_kind() {
            debug!(kind = %tag, "no node for top-level kind");
            return Ok(FlowGraph::default());
        }

        let (source_id, label) = match (self.node_name(&base), context) {
            (Some(name), context) => (
                name.to_string(),
                context.map(|c| c.label).unwrap_or_else(|| name.to_string()),
            ),
            (None, Some(context)) => (context.id, context.label),
            (None, None) => {
                let generated = self.ids.generate(&tag.word());
                let id = self.claim_node_id(generated);
                (id.clone(), id)
            }
        };

        if depth > self.options.max_depth {
            return Err(FlowError::DepthLimitExceeded {
                node: source_id,
                limit: self.options.max_depth,
            });
        }

        let mut graph = FlowGraph::default();
        match base.kind() {
            SchemaKind::Enum(_) | SchemaKind::NativeEnum(_) => {
                let members = enum_members(&base).unwrap_or_default();
                graph.nodes.push(GraphNode::enumeration(source_id, label, members));
            }
            SchemaKind::Object(fields) => {
                let mut linked = HashSet::new();
                let mut nested = FlowGraph::default();
                let mut entries = Vec::with_capacity(fields.len());

                for (key, field) in fields {
                    let resolved = resolve_base(field);
                    let mut cursor = FieldCursor {
                        source: &source_id,
                        key,
                        synthesized: 0,
                    };
                    let ty = self.describe(&resolved.schema, &mut cursor, depth + 1, &mut linked, &mut nested)?;
                    entries.push(FieldEntry::new(key.as_str(), ty, &resolved));
                }

                graph.nodes.push(GraphNode::object(source_id, label, entries));
                graph.extend(nested);
            }
            _ => {}
        }

        Ok(graph)
    }

    /// Descriptor for one field slot; edges and anonymous nodes go to `out`
    fn describe(
        &mut self,
        schema: &Schema,
        cursor: &mut FieldCursor<'_>,
        depth: usize,
        linked: &mut HashSet<String>,
        out: &mut FlowGraph,
    ) -> Result<TypeDescriptor> {
        if depth > self.options.max_depth {
            return Err(FlowError::DepthLimitExceeded {
                node: format!("{}:{}", cursor.source, cursor.key),
                limit: self.options.max_depth,
            });
        }

        let base = resolve_base(schema).schema;
        if let Some(name) = self.node_name(&base) {
            self.link(cursor, name, linked, out);
            return Ok(TypeDescriptor::Ref(name.to_string()));
        }

        let ty = match base.kind() {
            SchemaKind::Object(_) | SchemaKind::Enum(_) | SchemaKind::NativeEnum(_) => {
                let id = self.anonymous_node(&base, cursor, depth, out)?;
                self.link(cursor, &id, linked, out);
                TypeDescriptor::Ref(id)
            }
            SchemaKind::Array(item) => {
                TypeDescriptor::Array(Box::new(self.describe(item, cursor, depth + 1, linked, out)?))
            }
            SchemaKind::Set(item) => {
                TypeDescriptor::Set(Box::new(self.describe(item, cursor, depth + 1, linked, out)?))
            }
            SchemaKind::Tuple(items) => TypeDescriptor::Tuple(
                items
                    .iter()
                    .map(|item| self.describe(item, cursor, depth + 1, linked, out))
                    .collect::<Result<Vec<_>>>()?,
            ),
            SchemaKind::Union(options) => TypeDescriptor::Union(
                options
                    .iter()
                    .map(|option| self.describe(option, cursor, depth + 1, linked, out))
                    .collect::<Result<Vec<_>>>()?,
            ),
            SchemaKind::Record { key, value } => {
                let key = self.describe(key, cursor, depth + 1, linked, out)?;
                let value = self.describe(value, cursor, depth + 1, linked, out)?;
                TypeDescriptor::Record(Box::new(key), Box::new(value))
            }
            SchemaKind::Map { key, value } => {
                let key = self.describe(key, cursor, depth + 1, linked, out)?;
                let value = self.describe(value, cursor, depth + 1, linked, out)?;
                TypeDescriptor::Map(Box::new(key), Box::new(value))
            }
            SchemaKind::Literal(value) => TypeDescriptor::Literal(value.clone()),
            _ => TypeDescriptor::Kind(base.tag()),
        };

        Ok(ty)
    }

    /// Emit an unregistered object or enum once per compile, returning its id
    fn anonymous_node(
        &mut self,
        base: &Schema,
        cursor: &mut FieldCursor<'_>,
        depth: usize,
        out: &mut FlowGraph,
    ) -> Result<String> {
        if let Some(id) = self.anonymous.get(&base.identity()) {
            return Ok(id.clone());
        }

        let candidate = match cursor.synthesized {
            0 => format!("{}:{}", cursor.source, cursor.key),
            n => format!("{}:{}~{}", cursor.source, cursor.key, n),
        };
        cursor.synthesized += 1;
        let id = self.claim_node_id(candidate);
        self.anonymous.insert(base.identity(), id.clone());
        debug!(id = %id, kind = %base.tag(), "synthesized anonymous node");

        match enum_members(base) {
            Some(members) => out
                .nodes
                .push(GraphNode::enumeration(id.clone(), cursor.key, members)),
            None => {
                let context = NodeContext::new(id.clone(), cursor.key);
                let subtree = self.compile_at(base, Some(context), depth + 1)?;
                out.extend(subtree);
            }
        }

        Ok(id)
    }

    /// Edge from the cursor's node to `target`, once per target
    fn link(
        &mut self,
        cursor: &FieldCursor<'_>,
        target: &str,
        linked: &mut HashSet<String>,
        out: &mut FlowGraph,
    ) {
        if !linked.insert(target.to_string()) {
            return;
        }
        let id = self.claim_edge_id(cursor.source, target);
        out.edges.push(GraphEdge {
            id,
            source: cursor.source.to_string(),
            target: target.to_string(),
            source_handle: cursor.key.to_string(),
        });
    }
}

/// Member list of an enum-like value: enum values, or native enum member values
fn enum_members(schema: &Schema) -> Option<Vec<String>> {
    match schema.kind() {
        SchemaKind::Enum(values) => Some(values.clone()),
        SchemaKind::NativeEnum(members) => Some(
            members
                .iter()
                .map(|(_, value)| match value {
                    Value::String(text) => text.clone(),
                    other => other.to_string(),
                })
                .collect(),
        ),
        _ => None,
    }
}

// =============================================================================
// Drivers
// =============================================================================

/// Compile every distinct dictionary entry (first name per value)
pub fn compile_dictionary(dict: &SchemaDictionary, options: CompileOptions) -> Result<FlowGraph> {
    let mut builder = GraphBuilder::new(dict).with_options(options);
    let mut graph = FlowGraph::default();

    for (name, schema) in dict.distinct() {
        let subtree = builder.compile(schema, None)?;
        debug!(
            name,
            nodes = subtree.nodes.len(),
            edges = subtree.edges.len(),
            "compiled entry"
        );
        graph.extend(subtree);
    }

    Ok(graph)
}

/// Compile `root` and every registered node reachable from it.
///
/// The root's base must be an object.
pub fn compile_root(dict: &SchemaDictionary, root: &Schema, options: CompileOptions) -> Result<FlowGraph> {
    let base = resolve_base(root).schema;
    if !matches!(base.kind(), SchemaKind::Object(_)) {
        return Err(FlowError::RootNotObject {
            kind: base.tag().word(),
        });
    }

    let mut builder = GraphBuilder::new(dict).with_options(options);
    let context = match dict.find_name(&base) {
        Some(_) => None,
        None => {
            let id = builder.claim_node_id(ROOT_ID.to_string());
            Some(NodeContext::new(id, ROOT_ID))
        }
    };

    let mut graph = builder.compile(root, context)?;
    let mut compiled: HashSet<String> = graph.nodes.iter().map(|n| n.id.clone()).collect();
    let mut pending: VecDeque<String> = graph.edges.iter().map(|e| e.target.clone()).collect();

    while let Some(target) = pending.pop_front() {
        if compiled.contains(&target) {
            continue;
        }
        let Some(schema) = dict.get(&target) else {
            continue;
        };

        let subtree = builder.compile(schema, None)?;
        compiled.extend(subtree.nodes.iter().map(|n| n.id.clone()));
        pending.extend(subtree.edges.iter().map(|e| e.target.clone()));
        graph.extend(subtree);
    }

    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ScalarKind;
    use serde_json::json;

    fn compile(dict: &SchemaDictionary) -> FlowGraph {
        compile_dictionary(dict, CompileOptions::default()).unwrap()
    }

    #[test]
    fn test_enum_and_native_enum_nodes() {
        let dict = SchemaDictionary::from_entries([
            ("Role", Schema::enumeration(["admin", "user"])),
            (
                "Level",
                Schema::native_enum([("Low", json!(1)), ("High", json!("high"))]),
            ),
        ])
        .unwrap();

        let graph = compile(&dict);
        assert_eq!(graph.node("Role").unwrap().members(), ["admin", "user"]);
        assert_eq!(graph.node("Level").unwrap().members(), ["1", "high"]);
        assert!(graph.edges.is_empty());
    }

    #[test]
    fn test_unsupported_top_level_kinds_are_skipped() {
        let dict = SchemaDictionary::from_entries([
            ("Name", Schema::string()),
            ("Both", Schema::intersection(Schema::string(), Schema::number())),
            ("Call", Schema::function()),
        ])
        .unwrap();

        let graph = compile(&dict);
        assert!(graph.nodes.is_empty());
        assert!(graph.edges.is_empty());
    }

    #[test]
    fn test_unregistered_top_level_gets_generated_id() {
        let dict = SchemaDictionary::new();
        let mut builder = GraphBuilder::new(&dict);
        let graph = builder
            .compile(&Schema::object([("a", Schema::string())]), None)
            .unwrap();
        assert_eq!(graph.nodes[0].id, "object-0");
        assert_eq!(graph.nodes[0].label, "object-0");
    }

    #[test]
    fn test_context_label_overrides_registered_label() {
        let user = Schema::object([("id", Schema::string())]);
        let dict = SchemaDictionary::from_entries([("User", user.clone())]).unwrap();
        let mut builder = GraphBuilder::new(&dict);
        let graph = builder
            .compile(&user, Some(NodeContext::new("ignored", "Account")))
            .unwrap();
        assert_eq!(graph.nodes[0].id, "User");
        assert_eq!(graph.nodes[0].label, "Account");
    }

    #[test]
    fn test_anonymous_enum_field() {
        let dict = SchemaDictionary::from_entries([(
            "Task",
            Schema::object([("status", Schema::enumeration(["open", "done"]).optional())]),
        )])
        .unwrap();

        let graph = compile(&dict);
        let status = graph.node("Task:status").unwrap();
        assert_eq!(status.label, "status");
        assert_eq!(status.members(), ["open", "done"]);

        let field = graph.node("Task").unwrap().field("status").unwrap();
        assert_eq!(field.ty, TypeDescriptor::Ref("Task:status".into()));
        assert!(field.optional);
        assert_eq!(graph.edges[0].id, "Task->Task:status");
    }

    #[test]
    fn test_several_anonymous_values_in_one_field() {
        let a = Schema::object([("x", Schema::number())]);
        let b = Schema::object([("y", Schema::number())]);
        let dict = SchemaDictionary::from_entries([(
            "Shape",
            Schema::object([("part", Schema::union([a, b, Schema::scalar(ScalarKind::Null)]))]),
        )])
        .unwrap();

        let graph = compile(&dict);
        assert!(graph.node("Shape:part").is_some());
        assert!(graph.node("Shape:part~1").is_some());
        let field = graph.node("Shape").unwrap().field("part").unwrap();
        assert_eq!(field.display, "Shape:part | Shape:part~1 | null");
        assert_eq!(graph.edges_from("Shape").count(), 2);
    }

    #[test]
    fn test_shared_anonymous_value_is_emitted_once() {
        let point = Schema::object([("x", Schema::number())]);
        let dict = SchemaDictionary::from_entries([(
            "Line",
            Schema::object([("from", point.clone()), ("to", point)]),
        )])
        .unwrap();

        let graph = compile(&dict);
        assert_eq!(graph.node_count(), 2);
        let to = graph.node("Line").unwrap().field("to").unwrap();
        assert_eq!(to.ty, TypeDescriptor::Ref("Line:from".into()));
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn test_wrapped_alias_registered_first_keeps_direct_node() {
        let role = Schema::enumeration(["admin", "user"]);
        let dict = SchemaDictionary::from_entries([
            ("MaybeRole", role.optional()),
            ("Role", role.clone()),
            ("User", Schema::object([("role", role)])),
        ])
        .unwrap();

        let graph = compile(&dict);
        let ids: Vec<&str> = graph.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["Role", "User"]);
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.edges[0].target, "Role");
        assert!(graph.dangling_edges().is_empty());
    }

    #[test]
    fn test_synthetic_id_never_shadows_registered_name() {
        let dict = SchemaDictionary::from_entries([
            ("A", Schema::object([("b", Schema::object([("c", Schema::string())]))])),
            ("A:b", Schema::enumeration(["x"])),
        ])
        .unwrap();

        let graph = compile(&dict);
        let ids: Vec<&str> = graph.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["A", "A:b-0", "A:b"]);
        assert!(graph.dangling_edges().is_empty());
    }

    #[test]
    fn test_registered_scalar_alias_is_inlined() {
        let email = Schema::string();
        let dict = SchemaDictionary::from_entries([
            ("Email", email.clone()),
            ("Contact", Schema::object([("email", email)])),
        ])
        .unwrap();

        let graph = compile(&dict);
        let field = graph.node("Contact").unwrap().field("email").unwrap();
        assert_eq!(field.display, "string");
        assert!(!field.handle);
        assert!(graph.edges.is_empty());
    }

    #[test]
    fn test_field_flags_and_default() {
        let dict = SchemaDictionary::from_entries([(
            "Settings",
            Schema::object([("theme", Schema::string().nullable().default_value("dark"))]),
        )])
        .unwrap();

        let graph = compile(&dict);
        let theme = graph.node("Settings").unwrap().field("theme").unwrap();
        assert!(theme.nullable);
        assert!(!theme.optional);
        assert_eq!(theme.default, Some(json!("dark")));
    }

    #[test]
    fn test_depth_limit() {
        let mut deep = Schema::object([("leaf", Schema::string())]);
        for _ in 0..10 {
            deep = Schema::object([("next", deep)]);
        }
        let dict = SchemaDictionary::from_entries([("Deep", deep)]).unwrap();

        let result = compile_dictionary(&dict, CompileOptions { max_depth: 5 });
        assert!(matches!(
            result,
            Err(FlowError::DepthLimitExceeded { limit: 5, .. })
        ));
        assert!(compile_dictionary(&dict, CompileOptions::default()).is_ok());
    }

    #[test]
    fn test_compile_root_follows_references() {
        let tag = Schema::object([("label", Schema::string())]);
        let product = Schema::object([("tags", Schema::array(tag.clone()))]);
        let unrelated = Schema::object([("x", Schema::number())]);
        let dict = SchemaDictionary::from_entries([
            ("Tag", tag),
            ("Product", product.clone()),
            ("Unrelated", unrelated),
        ])
        .unwrap();

        let root = Schema::object([("featured", product)]);
        let graph = compile_root(&dict, &root, CompileOptions::default()).unwrap();
        let ids: Vec<&str> = graph.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["Root", "Product", "Tag"]);
        assert!(graph.dangling_edges().is_empty());
    }

    #[test]
    fn test_compile_root_rejects_non_objects() {
        let dict = SchemaDictionary::new();
        let result = compile_root(&dict, &Schema::array(Schema::string()), CompileOptions::default());
        match result {
            Err(FlowError::RootNotObject { kind }) => assert_eq!(kind, "array"),
            other => panic!("Expected RootNotObject, got {:?}", other),
        }
    }
}
