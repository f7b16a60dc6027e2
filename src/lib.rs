//! Schema Flow
//!
//! Compiles a named dictionary of schema values into a node/edge graph for
//! interactive visualization: objects and enums become nodes, references
//! between them become edges, and compound field types (arrays, tuples,
//! unions, records, maps, sets, literals) render to display strings.
//!
//! ## Pipeline
//!
//! ```text
//! JSON documents ──loader──▶ SchemaDictionary ──GraphBuilder──▶ FlowGraph
//!                                                                  │
//!                                          LayeredLayout ◀─────────┘
//! ```
//!
//! ## Example
//!
//! ```
//! use schema_flow::{compile_dictionary, CompileOptions, Schema, SchemaDictionary};
//!
//! let role = Schema::enumeration(["admin", "user"]);
//! let user = Schema::object([("role", role.clone()), ("name", Schema::string())]);
//! let dict = SchemaDictionary::from_entries([("User", user), ("Role", role)]).unwrap();
//!
//! let graph = compile_dictionary(&dict, CompileOptions::default()).unwrap();
//! assert_eq!(graph.nodes.len(), 2);
//! assert_eq!(graph.edges[0].source_handle, "role");
//! ```

pub mod config;
pub mod dictionary;
pub mod error;
pub mod graph;
pub mod ident;
pub mod loader;
pub mod schema;

pub use config::FlowConfig;
pub use dictionary::SchemaDictionary;
pub use error::{FlowError, Result};
pub use graph::{
    compile_dictionary, compile_root, CompileOptions, FlowDocument, FlowGraph, GraphBuilder, GraphEdge,
    GraphNode, NodeKind, TypeDescriptor,
};
pub use ident::IdGenerator;
pub use loader::{load_or_fallback, LoadOutcome};
pub use schema::{resolve_base, BaseSchema, ScalarKind, Schema, SchemaKind, SchemaTag};
