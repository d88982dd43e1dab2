//! The message registry: dense per-type IDs for deduplicated records, name
//! tables for cross-references, the interned-string table, and the
//! emitted-set. Owned by exactly one compilation run.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::compile::{CompileErrorKind, CompilerError};
use crate::record::{record_key, tag_spec_name, Record, RecordKey};

#[derive(Debug, Default)]
pub struct Registry {
    next_id_by_type: BTreeMap<&'static str, i64>,
    id_by_key: HashMap<RecordKey, i64>,
    emitted: HashSet<RecordKey>,
    tag_spec_id_by_name: BTreeMap<String, i64>,
    attr_list_id_by_name: BTreeMap<String, i64>,
    interned_strings: Vec<String>,
    string_id_by_value: HashMap<String, i64>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The dense ID for a record key, allocating the next ID for its type if
    /// the key is unseen. The Nth distinct key of a type always gets N-1.
    pub fn id_for_key(&mut self, key: &RecordKey) -> i64 {
        if let Some(id) = self.id_by_key.get(key) {
            return *id;
        }
        let next = self.next_id_by_type.entry(key.type_name).or_insert(0);
        let id = *next;
        *next += 1;
        self.id_by_key.insert(key.clone(), id);
        id
    }

    pub fn id_for(&mut self, record: &Record) -> i64 {
        self.id_for_key(&record_key(record))
    }

    /// The generated-code variable name for a record, e.g. `tagspec_4`.
    pub fn reference_for_key(&mut self, key: &RecordKey) -> String {
        let id = self.id_for_key(key);
        format!("{}_{}", key.type_name.to_lowercase(), id)
    }

    pub fn reference_for(&mut self, record: &Record) -> String {
        self.reference_for_key(&record_key(record))
    }

    /// Marks a key emitted. Returns whether it had already been emitted.
    pub fn mark_emitted(&mut self, key: &RecordKey) -> bool {
        !self.emitted.insert(key.clone())
    }

    pub fn is_emitted(&self, key: &RecordKey) -> bool {
        self.emitted.contains(key)
    }

    pub fn register_tag_spec(&mut self, tag: &Record) -> Result<(), CompilerError> {
        let name = tag_spec_name(tag);
        let id = self.id_for(tag);
        bind_name(&mut self.tag_spec_id_by_name, "tag spec", name, id)
    }

    pub fn register_attr_list(&mut self, attr_list: &Record) -> Result<(), CompilerError> {
        let name = attr_list.get_str("name").unwrap_or_default().to_string();
        if name.is_empty() {
            return Err(CompilerError::new(
                CompileErrorKind::SchemaMismatch,
                "attr list without a name".to_string(),
            ));
        }
        let id = self.id_for(attr_list);
        bind_name(&mut self.attr_list_id_by_name, "attr list", name, id)
    }

    pub fn tag_spec_id(&self, name: &str) -> Option<i64> {
        self.tag_spec_id_by_name.get(name).copied()
    }

    pub fn attr_list_id(&self, name: &str) -> Option<i64> {
        self.attr_list_id_by_name.get(name).copied()
    }

    pub fn tag_spec_ids_by_name(&self) -> &BTreeMap<String, i64> {
        &self.tag_spec_id_by_name
    }

    pub fn attr_list_ids_by_name(&self) -> &BTreeMap<String, i64> {
        &self.attr_list_id_by_name
    }

    /// Interns a string, returning its negative ID (-1, -2, ...). Idempotent.
    /// Negative IDs keep interned-string references distinguishable from
    /// record IDs without a type tag; the string for ID `s` lives at index
    /// `-1 - s` of the interned table.
    pub fn intern_string(&mut self, value: &str) -> i64 {
        if let Some(id) = self.string_id_by_value.get(value) {
            return *id;
        }
        self.interned_strings.push(value.to_string());
        let id = -(self.interned_strings.len() as i64);
        self.string_id_by_value.insert(value.to_string(), id);
        id
    }

    pub fn interned_strings(&self) -> &[String] {
        &self.interned_strings
    }
}

fn bind_name(
    table: &mut BTreeMap<String, i64>,
    category: &str,
    name: String,
    id: i64,
) -> Result<(), CompilerError> {
    match table.get(&name) {
        Some(existing) if *existing != id => Err(CompilerError::new(
            CompileErrorKind::DuplicateName,
            format!("duplicate {category} name {name:?}"),
        )),
        _ => {
            table.insert(name, id);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Value;

    fn attr(name: &str, mandatory: bool) -> Record {
        let mut r = Record::new("AttrSpec");
        r.set("name", Value::Str(name.to_string()));
        if mandatory {
            r.set("mandatory", Value::Bool(true));
        }
        r
    }

    fn tag(tag_name: &str, spec_name: Option<&str>) -> Record {
        let mut r = Record::new("TagSpec");
        r.set("tag_name", Value::Str(tag_name.to_string()));
        if let Some(s) = spec_name {
            r.set("spec_name", Value::Str(s.to_string()));
        }
        r
    }

    #[test]
    fn ids_are_dense_per_type_and_idempotent() {
        let mut reg = Registry::new();
        let a = attr("a", false);
        let b = attr("b", false);
        let t = tag("A", None);
        assert_eq!(reg.id_for(&a), 0);
        assert_eq!(reg.id_for(&b), 1);
        assert_eq!(reg.id_for(&a), 0);
        // Separate ID space per type.
        assert_eq!(reg.id_for(&t), 0);
        assert_eq!(reg.reference_for(&b), "attrspec_1");
        assert_eq!(reg.reference_for(&t), "tagspec_0");
    }

    #[test]
    fn structurally_identical_records_share_an_id() {
        let mut reg = Registry::new();
        assert_eq!(reg.id_for(&attr("href", true)), reg.id_for(&attr("href", true)));
        assert_ne!(reg.id_for(&attr("href", true)), reg.id_for(&attr("href", false)));
    }

    #[test]
    fn interning_is_idempotent_with_negative_ids() {
        let mut reg = Registry::new();
        assert_eq!(reg.intern_string("foo"), -1);
        assert_eq!(reg.intern_string("bar"), -2);
        assert_eq!(reg.intern_string("foo"), -1);
        assert_eq!(reg.interned_strings(), &["foo".to_string(), "bar".to_string()]);
    }

    #[test]
    fn duplicate_name_with_different_content_is_fatal() {
        let mut reg = Registry::new();
        reg.register_tag_spec(&tag("A", Some("x"))).expect("first binding");
        // Same name, same content: fine (the ids collapse anyway).
        reg.register_tag_spec(&tag("A", Some("x"))).expect("same key rebinding");
        let mut other = tag("B", Some("x"));
        other.set("mandatory", Value::Bool(true));
        let err = reg.register_tag_spec(&other).expect_err("must reject");
        assert_eq!(err.kind, CompileErrorKind::DuplicateName);
        assert!(err.message.contains("\"x\""), "{}", err.message);
    }

    #[test]
    fn unresolved_names_are_absent() {
        let mut reg = Registry::new();
        reg.register_tag_spec(&tag("A", None)).expect("binding");
        assert_eq!(reg.tag_spec_id("a"), Some(0));
        assert_eq!(reg.tag_spec_id("nope"), None);
    }

    #[test]
    fn mark_emitted_reports_prior_emission() {
        let mut reg = Registry::new();
        let key = record_key(&attr("a", false));
        assert!(!reg.mark_emitted(&key));
        assert!(reg.mark_emitted(&key));
        assert!(reg.is_emitted(&key));
    }
}
