//! Schema Dictionary
//!
//! Ordered name -> schema registry with identity indexes for reverse
//! lookup. An entry whose own handle is the value always names it; only
//! when no such entry exists does an entry whose base (wrappers stripped)
//! is the value name it, so `Foo = bar.optional()` names `bar` unless `bar`
//! is registered directly. Within each index the first registration wins.

use std::collections::HashMap;

use crate::error::{FlowError, Result};
use crate::schema::{resolve_base, Schema};

#[derive(Debug, Clone, Default)]
pub struct SchemaDictionary {
    entries: Vec<(String, Schema)>,
    /// Index: name -> entry position
    by_name: HashMap<String, usize>,
    /// Index: own handle identity -> first entry position
    by_identity: HashMap<usize, usize>,
    /// Index: base handle identity -> first entry position
    by_base: HashMap<usize, usize>,
}

impl SchemaDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from ordered entries; duplicate names are rejected
    pub fn from_entries<K: Into<String>>(
        entries: impl IntoIterator<Item = (K, Schema)>,
    ) -> Result<Self> {
        let mut dict = Self::new();
        for (name, schema) in entries {
            dict.insert(name, schema)?;
        }
        Ok(dict)
    }

    pub fn insert(&mut self, name: impl Into<String>, schema: Schema) -> Result<()> {
        let name = name.into();
        if self.by_name.contains_key(&name) {
            return Err(FlowError::DuplicateName(name));
        }

        let position = self.entries.len();
        let base = resolve_base(&schema).schema;
        self.by_identity.entry(schema.identity()).or_insert(position);
        self.by_base.entry(base.identity()).or_insert(position);
        self.by_name.insert(name.clone(), position);
        self.entries.push((name, schema));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Schema> {
        self.by_name.get(name).map(|&i| &self.entries[i].1)
    }

    pub fn contains_name(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// First registered name whose value is `schema` itself, else the first
    /// whose base is
    pub fn find_name(&self, schema: &Schema) -> Option<&str> {
        let identity = schema.identity();
        self.by_identity
            .get(&identity)
            .or_else(|| self.by_base.get(&identity))
            .map(|&i| self.entries[i].0.as_str())
    }

    /// Entries in registration order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Schema)> {
        self.entries.iter().map(|(name, schema)| (name.as_str(), schema))
    }

    /// Entries that name their base value; aliases of another entry's value
    /// (exact duplicates and wrapped copies alike) are dropped
    pub fn distinct(&self) -> Vec<(&str, &Schema)> {
        self.iter()
            .filter(|(name, schema)| self.find_name(&resolve_base(schema).schema) == Some(*name))
            .collect()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_name_uses_identity() {
        let user = Schema::object([("id", Schema::string())]);
        let lookalike = Schema::object([("id", Schema::string())]);
        let dict = SchemaDictionary::from_entries([("User", user.clone())]).unwrap();

        assert_eq!(dict.find_name(&user), Some("User"));
        assert_eq!(dict.find_name(&lookalike), None);
    }

    #[test]
    fn test_find_name_sees_through_wrappers() {
        let payload = Schema::enumeration(["a", "b"]);
        let dict = SchemaDictionary::from_entries([("Letter", payload.optional())]).unwrap();
        assert_eq!(dict.find_name(&payload), Some("Letter"));
    }

    #[test]
    fn test_first_name_wins_and_duplicates_are_dropped() {
        let role = Schema::enumeration(["admin", "user"]);
        let dict = SchemaDictionary::from_entries([
            ("Role", role.clone()),
            ("Other", Schema::string()),
            ("RoleAlias", role.clone()),
        ])
        .unwrap();

        assert_eq!(dict.find_name(&role), Some("Role"));
        let distinct: Vec<&str> = dict.distinct().into_iter().map(|(n, _)| n).collect();
        assert_eq!(distinct, vec!["Role", "Other"]);
        assert_eq!(dict.len(), 3);
    }

    #[test]
    fn test_direct_entry_beats_earlier_wrapped_alias() {
        let role = Schema::enumeration(["admin", "user"]);
        let dict = SchemaDictionary::from_entries([
            ("MaybeRole", role.optional()),
            ("Role", role.clone()),
            ("User", Schema::object([("role", role.clone())])),
        ])
        .unwrap();

        assert_eq!(dict.find_name(&role), Some("Role"));
        let distinct: Vec<&str> = dict.distinct().into_iter().map(|(n, _)| n).collect();
        assert_eq!(distinct, vec!["Role", "User"]);
    }

    #[test]
    fn test_wrapped_aliases_keep_the_first() {
        let payload = Schema::object([("id", Schema::string())]);
        let dict = SchemaDictionary::from_entries([
            ("Maybe", payload.optional()),
            ("OrNull", payload.nullable()),
        ])
        .unwrap();

        assert_eq!(dict.find_name(&payload), Some("Maybe"));
        let distinct: Vec<&str> = dict.distinct().into_iter().map(|(n, _)| n).collect();
        assert_eq!(distinct, vec!["Maybe"]);
    }

    #[test]
    fn test_duplicate_name_is_rejected() {
        let result = SchemaDictionary::from_entries([
            ("A", Schema::string()),
            ("A", Schema::number()),
        ]);
        assert!(matches!(result, Err(FlowError::DuplicateName(name)) if name == "A"));
    }
}
