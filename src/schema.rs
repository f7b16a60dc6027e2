//! Schema model
//!
//! A [`Schema`] is a shared handle to a [`SchemaKind`]. Identity matters:
//! two handles are "the same schema" only when they point at the same
//! allocation, never because their contents happen to match. Cloning a
//! handle keeps its identity.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::rc::Rc;

/// Prefix carried by every canonical kind tag name
pub const KIND_PREFIX: &str = "Schema";

/// Thunk producing a field's default value
pub type DefaultFn = Rc<dyn Fn() -> Value>;

// =============================================================================
// Scalar Kinds
// =============================================================================

/// Leaf kinds without nested structure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarKind {
    String,
    Number,
    BigInt,
    Boolean,
    Date,
    Symbol,
    Undefined,
    Null,
    Void,
    Any,
    Unknown,
    Never,
}

impl ScalarKind {
    pub const ALL: [ScalarKind; 12] = [
        ScalarKind::String,
        ScalarKind::Number,
        ScalarKind::BigInt,
        ScalarKind::Boolean,
        ScalarKind::Date,
        ScalarKind::Symbol,
        ScalarKind::Undefined,
        ScalarKind::Null,
        ScalarKind::Void,
        ScalarKind::Any,
        ScalarKind::Unknown,
        ScalarKind::Never,
    ];

    /// Parse the lowercase shorthand used in schema documents
    pub fn from_word(word: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.tag().word() == word)
    }

    pub fn tag(&self) -> SchemaTag {
        match self {
            ScalarKind::String => SchemaTag::String,
            ScalarKind::Number => SchemaTag::Number,
            ScalarKind::BigInt => SchemaTag::BigInt,
            ScalarKind::Boolean => SchemaTag::Boolean,
            ScalarKind::Date => SchemaTag::Date,
            ScalarKind::Symbol => SchemaTag::Symbol,
            ScalarKind::Undefined => SchemaTag::Undefined,
            ScalarKind::Null => SchemaTag::Null,
            ScalarKind::Void => SchemaTag::Void,
            ScalarKind::Any => SchemaTag::Any,
            ScalarKind::Unknown => SchemaTag::Unknown,
            ScalarKind::Never => SchemaTag::Never,
        }
    }
}

// =============================================================================
// Kind Tags
// =============================================================================

/// Discriminant naming a [`SchemaKind`] variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemaTag {
    Object,
    Enum,
    NativeEnum,
    Array,
    Tuple,
    Union,
    Record,
    Map,
    Set,
    Literal,
    String,
    Number,
    BigInt,
    Boolean,
    Date,
    Symbol,
    Undefined,
    Null,
    Void,
    Any,
    Unknown,
    Never,
    Intersection,
    Promise,
    Function,
    Optional,
    Nullable,
    Default,
    Effects,
}

impl SchemaTag {
    pub const ALL: [SchemaTag; 29] = [
        SchemaTag::Object,
        SchemaTag::Enum,
        SchemaTag::NativeEnum,
        SchemaTag::Array,
        SchemaTag::Tuple,
        SchemaTag::Union,
        SchemaTag::Record,
        SchemaTag::Map,
        SchemaTag::Set,
        SchemaTag::Literal,
        SchemaTag::String,
        SchemaTag::Number,
        SchemaTag::BigInt,
        SchemaTag::Boolean,
        SchemaTag::Date,
        SchemaTag::Symbol,
        SchemaTag::Undefined,
        SchemaTag::Null,
        SchemaTag::Void,
        SchemaTag::Any,
        SchemaTag::Unknown,
        SchemaTag::Never,
        SchemaTag::Intersection,
        SchemaTag::Promise,
        SchemaTag::Function,
        SchemaTag::Optional,
        SchemaTag::Nullable,
        SchemaTag::Default,
        SchemaTag::Effects,
    ];

    /// Canonical tag name, e.g. `SchemaNativeEnum`
    pub fn name(&self) -> &'static str {
        match self {
            SchemaTag::Object => "SchemaObject",
            SchemaTag::Enum => "SchemaEnum",
            SchemaTag::NativeEnum => "SchemaNativeEnum",
            SchemaTag::Array => "SchemaArray",
            SchemaTag::Tuple => "SchemaTuple",
            SchemaTag::Union => "SchemaUnion",
            SchemaTag::Record => "SchemaRecord",
            SchemaTag::Map => "SchemaMap",
            SchemaTag::Set => "SchemaSet",
            SchemaTag::Literal => "SchemaLiteral",
            SchemaTag::String => "SchemaString",
            SchemaTag::Number => "SchemaNumber",
            SchemaTag::BigInt => "SchemaBigInt",
            SchemaTag::Boolean => "SchemaBoolean",
            SchemaTag::Date => "SchemaDate",
            SchemaTag::Symbol => "SchemaSymbol",
            SchemaTag::Undefined => "SchemaUndefined",
            SchemaTag::Null => "SchemaNull",
            SchemaTag::Void => "SchemaVoid",
            SchemaTag::Any => "SchemaAny",
            SchemaTag::Unknown => "SchemaUnknown",
            SchemaTag::Never => "SchemaNever",
            SchemaTag::Intersection => "SchemaIntersection",
            SchemaTag::Promise => "SchemaPromise",
            SchemaTag::Function => "SchemaFunction",
            SchemaTag::Optional => "SchemaOptional",
            SchemaTag::Nullable => "SchemaNullable",
            SchemaTag::Default => "SchemaDefault",
            SchemaTag::Effects => "SchemaEffects",
        }
    }

    /// Display word: the name without [`KIND_PREFIX`], lowercased
    pub fn word(&self) -> String {
        let name = self.name();
        name.strip_prefix(KIND_PREFIX).unwrap_or(name).to_lowercase()
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.name() == name)
    }

    /// Tags whose base value becomes a graph node
    pub fn is_node_kind(&self) -> bool {
        matches!(self, SchemaTag::Object | SchemaTag::Enum | SchemaTag::NativeEnum)
    }
}

impl fmt::Display for SchemaTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// Schema Kind
// =============================================================================

/// Payload of a schema value, one variant per kind
pub enum SchemaKind {
    /// Ordered named fields
    Object(Vec<(String, Schema)>),
    /// Ordered string members
    Enum(Vec<String>),
    /// Ordered member name -> value pairs
    NativeEnum(Vec<(String, Value)>),
    Array(Schema),
    Tuple(Vec<Schema>),
    Union(Vec<Schema>),
    Record { key: Schema, value: Schema },
    Map { key: Schema, value: Schema },
    Set(Schema),
    Literal(Value),
    Scalar(ScalarKind),
    Intersection(Schema, Schema),
    Promise(Schema),
    Function,
    Optional(Schema),
    Nullable(Schema),
    Default { inner: Schema, value: DefaultFn },
    Effects(Schema),
}

impl SchemaKind {
    pub fn tag(&self) -> SchemaTag {
        match self {
            SchemaKind::Object(_) => SchemaTag::Object,
            SchemaKind::Enum(_) => SchemaTag::Enum,
            SchemaKind::NativeEnum(_) => SchemaTag::NativeEnum,
            SchemaKind::Array(_) => SchemaTag::Array,
            SchemaKind::Tuple(_) => SchemaTag::Tuple,
            SchemaKind::Union(_) => SchemaTag::Union,
            SchemaKind::Record { .. } => SchemaTag::Record,
            SchemaKind::Map { .. } => SchemaTag::Map,
            SchemaKind::Set(_) => SchemaTag::Set,
            SchemaKind::Literal(_) => SchemaTag::Literal,
            SchemaKind::Scalar(kind) => kind.tag(),
            SchemaKind::Intersection(..) => SchemaTag::Intersection,
            SchemaKind::Promise(_) => SchemaTag::Promise,
            SchemaKind::Function => SchemaTag::Function,
            SchemaKind::Optional(_) => SchemaTag::Optional,
            SchemaKind::Nullable(_) => SchemaTag::Nullable,
            SchemaKind::Default { .. } => SchemaTag::Default,
            SchemaKind::Effects(_) => SchemaTag::Effects,
        }
    }
}

impl fmt::Debug for SchemaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaKind::Object(fields) => f
                .debug_map()
                .entries(fields.iter().map(|(k, v)| (k, v)))
                .finish(),
            SchemaKind::Enum(values) => f.debug_tuple("Enum").field(values).finish(),
            SchemaKind::NativeEnum(members) => {
                f.debug_tuple("NativeEnum").field(members).finish()
            }
            SchemaKind::Array(item) => f.debug_tuple("Array").field(item).finish(),
            SchemaKind::Tuple(items) => f.debug_tuple("Tuple").field(items).finish(),
            SchemaKind::Union(options) => f.debug_tuple("Union").field(options).finish(),
            SchemaKind::Record { key, value } => {
                f.debug_tuple("Record").field(key).field(value).finish()
            }
            SchemaKind::Map { key, value } => {
                f.debug_tuple("Map").field(key).field(value).finish()
            }
            SchemaKind::Set(item) => f.debug_tuple("Set").field(item).finish(),
            SchemaKind::Literal(value) => f.debug_tuple("Literal").field(value).finish(),
            SchemaKind::Scalar(kind) => write!(f, "{:?}", kind),
            SchemaKind::Intersection(left, right) => {
                f.debug_tuple("Intersection").field(left).field(right).finish()
            }
            SchemaKind::Promise(inner) => f.debug_tuple("Promise").field(inner).finish(),
            SchemaKind::Function => f.write_str("Function"),
            SchemaKind::Optional(inner) => f.debug_tuple("Optional").field(inner).finish(),
            SchemaKind::Nullable(inner) => f.debug_tuple("Nullable").field(inner).finish(),
            SchemaKind::Default { inner, .. } => f.debug_tuple("Default").field(inner).finish(),
            SchemaKind::Effects(inner) => f.debug_tuple("Effects").field(inner).finish(),
        }
    }
}

// =============================================================================
// Schema Handle
// =============================================================================

/// Shared, identity-significant handle to a schema value
#[derive(Clone)]
pub struct Schema(Rc<SchemaKind>);

impl Schema {
    pub fn new(kind: SchemaKind) -> Self {
        Self(Rc::new(kind))
    }

    pub fn kind(&self) -> &SchemaKind {
        &self.0
    }

    pub fn tag(&self) -> SchemaTag {
        self.0.tag()
    }

    /// Address of the shared allocation; equal iff the handles are the same value
    pub fn identity(&self) -> usize {
        Rc::as_ptr(&self.0) as *const () as usize
    }

    pub fn ptr_eq(a: &Schema, b: &Schema) -> bool {
        Rc::ptr_eq(&a.0, &b.0)
    }

    // ========== Constructors ==========

    pub fn object<K: Into<String>>(fields: impl IntoIterator<Item = (K, Schema)>) -> Self {
        Self::new(SchemaKind::Object(
            fields.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        ))
    }

    pub fn enumeration<S: Into<String>>(values: impl IntoIterator<Item = S>) -> Self {
        Self::new(SchemaKind::Enum(values.into_iter().map(Into::into).collect()))
    }

    pub fn native_enum<K: Into<String>>(members: impl IntoIterator<Item = (K, Value)>) -> Self {
        Self::new(SchemaKind::NativeEnum(
            members.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        ))
    }

    pub fn array(item: Schema) -> Self {
        Self::new(SchemaKind::Array(item))
    }

    pub fn tuple(items: impl IntoIterator<Item = Schema>) -> Self {
        Self::new(SchemaKind::Tuple(items.into_iter().collect()))
    }

    pub fn union(options: impl IntoIterator<Item = Schema>) -> Self {
        Self::new(SchemaKind::Union(options.into_iter().collect()))
    }

    pub fn record(key: Schema, value: Schema) -> Self {
        Self::new(SchemaKind::Record { key, value })
    }

    pub fn map(key: Schema, value: Schema) -> Self {
        Self::new(SchemaKind::Map { key, value })
    }

    pub fn set(item: Schema) -> Self {
        Self::new(SchemaKind::Set(item))
    }

    pub fn literal(value: impl Into<Value>) -> Self {
        Self::new(SchemaKind::Literal(value.into()))
    }

    pub fn scalar(kind: ScalarKind) -> Self {
        Self::new(SchemaKind::Scalar(kind))
    }

    pub fn string() -> Self {
        Self::scalar(ScalarKind::String)
    }

    pub fn number() -> Self {
        Self::scalar(ScalarKind::Number)
    }

    pub fn boolean() -> Self {
        Self::scalar(ScalarKind::Boolean)
    }

    pub fn intersection(left: Schema, right: Schema) -> Self {
        Self::new(SchemaKind::Intersection(left, right))
    }

    pub fn promise(inner: Schema) -> Self {
        Self::new(SchemaKind::Promise(inner))
    }

    pub fn function() -> Self {
        Self::new(SchemaKind::Function)
    }

    // ========== Modifiers ==========

    pub fn optional(&self) -> Self {
        Self::new(SchemaKind::Optional(self.clone()))
    }

    pub fn nullable(&self) -> Self {
        Self::new(SchemaKind::Nullable(self.clone()))
    }

    /// Wrap with a constant default value
    pub fn default_value(&self, value: impl Into<Value>) -> Self {
        let value = value.into();
        self.default_with(move || value.clone())
    }

    pub fn default_with(&self, thunk: impl Fn() -> Value + 'static) -> Self {
        Self::new(SchemaKind::Default {
            inner: self.clone(),
            value: Rc::new(thunk),
        })
    }

    /// Wrap in a refinement/transform layer
    pub fn effects(&self) -> Self {
        Self::new(SchemaKind::Effects(self.clone()))
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

// =============================================================================
// Base Schema Resolution
// =============================================================================

/// A schema with its modifier wrappers stripped
#[derive(Debug, Clone)]
pub struct BaseSchema {
    pub schema: Schema,
    pub optional: bool,
    pub nullable: bool,
    pub has_default: bool,
    pub default_value: Option<Value>,
}

/// Strip Optional, Nullable, Default and Effects layers in any order.
///
/// Stacked defaults report the innermost value.
pub fn resolve_base(schema: &Schema) -> BaseSchema {
    let mut base = schema.clone();
    let mut optional = false;
    let mut nullable = false;
    let mut default_value = None;

    loop {
        let next = match base.kind() {
            SchemaKind::Optional(inner) => {
                optional = true;
                inner.clone()
            }
            SchemaKind::Nullable(inner) => {
                nullable = true;
                inner.clone()
            }
            SchemaKind::Default { inner, value } => {
                default_value = Some((**value)());
                inner.clone()
            }
            SchemaKind::Effects(inner) => inner.clone(),
            _ => break,
        };
        base = next;
    }

    BaseSchema {
        schema: base,
        optional,
        nullable,
        has_default: default_value.is_some(),
        default_value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_identity_is_per_allocation() {
        let a = Schema::string();
        let b = Schema::string();
        assert!(!Schema::ptr_eq(&a, &b));
        assert_ne!(a.identity(), b.identity());

        let a2 = a.clone();
        assert!(Schema::ptr_eq(&a, &a2));
        assert_eq!(a.identity(), a2.identity());
    }

    #[test]
    fn test_resolve_base_is_identity_on_base_values() {
        let object = Schema::object([("id", Schema::string())]);
        let resolved = resolve_base(&object);
        assert!(Schema::ptr_eq(&resolved.schema, &object));
        assert!(!resolved.optional);
        assert!(!resolved.nullable);
        assert!(!resolved.has_default);
        assert!(resolved.default_value.is_none());
    }

    #[test]
    fn test_resolve_base_strips_wrappers_in_any_order() {
        let inner = Schema::number();
        let wrapped = inner.effects().default_value(3).nullable().optional().effects();

        let resolved = resolve_base(&wrapped);
        assert!(Schema::ptr_eq(&resolved.schema, &inner));
        assert!(resolved.optional);
        assert!(resolved.nullable);
        assert!(resolved.has_default);
        assert_eq!(resolved.default_value, Some(json!(3)));
    }

    #[test]
    fn test_stacked_defaults_report_innermost() {
        let wrapped = Schema::string().default_value("inner").default_value("outer");
        let resolved = resolve_base(&wrapped);
        assert_eq!(resolved.default_value, Some(json!("inner")));
    }

    #[test]
    fn test_tag_words() {
        assert_eq!(SchemaTag::String.word(), "string");
        assert_eq!(SchemaTag::NativeEnum.word(), "nativeenum");
        assert_eq!(SchemaTag::BigInt.word(), "bigint");
        assert_eq!(SchemaTag::from_name("SchemaRecord"), Some(SchemaTag::Record));
        assert_eq!(SchemaTag::from_name("Record"), None);
        assert_eq!(ScalarKind::from_word("date"), Some(ScalarKind::Date));
    }
}
