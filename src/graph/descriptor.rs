//! Type Descriptors
//!
//! Tree form of a field's type as recorded on an object node. The graph
//! builder produces these directly; the canonical string grammar (see
//! [`super::type_string`]) and the display form are both derived from
//! the tree.

use serde::{Serialize, Serializer};
use serde_json::Value;
use std::fmt::{self, Write};

use crate::schema::SchemaTag;

/// Keywords that open a compound form in the encoded grammar
pub const COMPOUND_KEYWORDS: [&str; 7] = ["Array", "Tuple", "Union", "Record", "Map", "Set", "Literal"];

#[derive(Debug, Clone, PartialEq)]
pub enum TypeDescriptor {
    /// Bare kind tag (scalars and kinds without a structural rendering)
    Kind(SchemaTag),
    /// Another node: a registered name or a synthetic id
    Ref(String),
    Array(Box<TypeDescriptor>),
    Tuple(Vec<TypeDescriptor>),
    Union(Vec<TypeDescriptor>),
    Record(Box<TypeDescriptor>, Box<TypeDescriptor>),
    Map(Box<TypeDescriptor>, Box<TypeDescriptor>),
    Set(Box<TypeDescriptor>),
    Literal(Value),
}

impl TypeDescriptor {
    /// Canonical grammar string, e.g. `Array<Product>`
    pub fn encode(&self) -> String {
        let mut out = String::new();
        self.encode_into(&mut out);
        out
    }

    fn encode_into(&self, out: &mut String) {
        match self {
            TypeDescriptor::Kind(tag) => out.push_str(tag.name()),
            TypeDescriptor::Ref(id) => encode_reference(id, out),
            TypeDescriptor::Array(item) => {
                out.push_str("Array<");
                item.encode_into(out);
                out.push('>');
            }
            TypeDescriptor::Set(item) => {
                out.push_str("Set<");
                item.encode_into(out);
                out.push('>');
            }
            TypeDescriptor::Tuple(items) => encode_list("Tuple", items, out),
            TypeDescriptor::Union(options) => encode_list("Union", options, out),
            TypeDescriptor::Record(key, value) => encode_pair("Record", key, value, out),
            TypeDescriptor::Map(key, value) => encode_pair("Map", key, value, out),
            TypeDescriptor::Literal(value) => {
                out.push_str("Literal<");
                out.push_str(&value.to_string());
                out.push('>');
            }
        }
    }

    /// Display-ready rendering, e.g. `Product[]`
    pub fn display(&self) -> String {
        self.to_string()
    }

    /// Node ids referenced anywhere in this descriptor, in order of appearance
    pub fn references(&self) -> Vec<&str> {
        let mut refs = Vec::new();
        self.collect_references(&mut refs);
        refs
    }

    fn collect_references<'a>(&'a self, refs: &mut Vec<&'a str>) {
        match self {
            TypeDescriptor::Ref(id) => refs.push(id),
            TypeDescriptor::Array(item) | TypeDescriptor::Set(item) => {
                item.collect_references(refs)
            }
            TypeDescriptor::Tuple(items) | TypeDescriptor::Union(items) => {
                for item in items {
                    item.collect_references(refs);
                }
            }
            TypeDescriptor::Record(key, value) | TypeDescriptor::Map(key, value) => {
                key.collect_references(refs);
                value.collect_references(refs);
            }
            TypeDescriptor::Kind(_) | TypeDescriptor::Literal(_) => {}
        }
    }
}

/// Whether `text` can be written as a bare identifier without quoting
pub(crate) fn is_bare_reference(text: &str) -> bool {
    !text.is_empty()
        && text.chars().all(is_ident_char)
        && !COMPOUND_KEYWORDS.contains(&text)
        && SchemaTag::from_name(text).is_none()
}

pub(crate) fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$'
}

fn encode_reference(id: &str, out: &mut String) {
    if is_bare_reference(id) {
        out.push_str(id);
    } else {
        // serde_json string escaping keeps punctuation inside names unambiguous
        out.push_str(&Value::String(id.to_string()).to_string());
    }
}

fn encode_list(keyword: &str, items: &[TypeDescriptor], out: &mut String) {
    out.push_str(keyword);
    out.push_str("<[");
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        item.encode_into(out);
    }
    out.push_str("]>");
}

fn encode_pair(keyword: &str, key: &TypeDescriptor, value: &TypeDescriptor, out: &mut String) {
    out.push_str(keyword);
    out.push('<');
    key.encode_into(out);
    out.push(',');
    value.encode_into(out);
    out.push('>');
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeDescriptor::Kind(tag) => f.write_str(&tag.word()),
            TypeDescriptor::Ref(id) => f.write_str(id),
            TypeDescriptor::Array(item) => match item.as_ref() {
                TypeDescriptor::Union(_) => write!(f, "({})[]", item),
                _ => write!(f, "{}[]", item),
            },
            TypeDescriptor::Tuple(items) => {
                f.write_char('[')?;
                write_joined(f, items, ", ")?;
                f.write_char(']')
            }
            TypeDescriptor::Union(options) => write_joined(f, options, " | "),
            TypeDescriptor::Record(key, value) => write!(f, "{{ [key: {}]: {} }}", key, value),
            TypeDescriptor::Map(key, value) => write!(f, "Map<{}, {}>", key, value),
            TypeDescriptor::Set(item) => write!(f, "Set<{}>", item),
            TypeDescriptor::Literal(value) => write!(f, "{}", value),
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, items: &[TypeDescriptor], sep: &str) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(sep)?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

impl Serialize for TypeDescriptor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.encode())
    }
}
