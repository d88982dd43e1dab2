//! In-memory records: typed instances of catalog message types, plus the
//! content-addressed keys used for deduplication.

use std::collections::BTreeMap;

use serde_json::Value as Json;
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Str(String),
    Int(i64),
    Bool(bool),
    EnumSym(String),
    Record(Record),
    List(Vec<Value>),
}

/// One instance of a catalog message type. Field names are the catalog's
/// static names; the map keeps digesting and JSON dumps deterministic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub type_name: &'static str,
    pub fields: BTreeMap<&'static str, Value>,
}

impl Record {
    pub fn new(type_name: &'static str) -> Self {
        Self {
            type_name,
            fields: BTreeMap::new(),
        }
    }

    pub fn set(&mut self, field: &'static str, value: Value) {
        self.fields.insert(field, value);
    }

    /// Appends to a repeated field, creating it if absent.
    pub fn push(&mut self, field: &'static str, value: Value) {
        match self.fields.entry(field).or_insert_with(|| Value::List(Vec::new())) {
            Value::List(items) => items.push(value),
            _ => {
                // A scalar slot cannot become repeated; the loader rejects
                // this before records are built.
                unreachable!("push on non-repeated field {field}")
            }
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn get_str(&self, field: &str) -> Option<&str> {
        match self.fields.get(field) {
            Some(Value::Str(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn get_record(&self, field: &str) -> Option<&Record> {
        match self.fields.get(field) {
            Some(Value::Record(r)) => Some(r),
            _ => None,
        }
    }

    pub fn get_list(&self, field: &str) -> Option<&[Value]> {
        match self.fields.get(field) {
            Some(Value::List(items)) => Some(items.as_slice()),
            _ => None,
        }
    }

    pub fn get_list_mut(&mut self, field: &'static str) -> Option<&mut Vec<Value>> {
        match self.fields.get_mut(field) {
            Some(Value::List(items)) => Some(items),
            _ => None,
        }
    }
}

/// Identity for deduplication: type name plus a digest of the record's
/// canonical serialization. Records of the same type with equal digests are
/// interchangeable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordKey {
    pub type_name: &'static str,
    pub digest: [u8; 32],
}

pub fn record_key(record: &Record) -> RecordKey {
    let mut h = Sha256::new();
    h.update(b"rulec.record.v1\0");
    hash_record(&mut h, record);
    RecordKey {
        type_name: record.type_name,
        digest: h.finalize().into(),
    }
}

fn hash_str(h: &mut Sha256, s: &str) {
    h.update((s.len() as u64).to_le_bytes());
    h.update(s.as_bytes());
}

fn hash_record(h: &mut Sha256, record: &Record) {
    hash_str(h, record.type_name);
    h.update((record.fields.len() as u64).to_le_bytes());
    for (name, value) in &record.fields {
        hash_str(h, name);
        hash_value(h, value);
    }
}

fn hash_value(h: &mut Sha256, value: &Value) {
    match value {
        Value::Str(s) => {
            h.update([0x01]);
            hash_str(h, s);
        }
        Value::Int(i) => {
            h.update([0x02]);
            h.update(i.to_le_bytes());
        }
        Value::Bool(b) => {
            h.update([0x03, u8::from(*b)]);
        }
        Value::EnumSym(s) => {
            h.update([0x04]);
            hash_str(h, s);
        }
        Value::Record(r) => {
            h.update([0x05]);
            hash_record(h, r);
        }
        Value::List(items) => {
            h.update([0x06]);
            h.update((items.len() as u64).to_le_bytes());
            for item in items {
                hash_value(h, item);
            }
        }
    }
}

/// A trivial attr spec is just a name with no constraints. These never become
/// records in the output; the name is interned instead.
pub fn is_trivial_attr(record: &Record) -> bool {
    record.type_name == "AttrSpec"
        && record.fields.len() == 1
        && record.get_str("name").is_some()
}

/// The unique name under which a tag spec registers: its declared spec_name
/// if set, otherwise the lowercased tag name.
pub fn tag_spec_name(tag: &Record) -> String {
    if let Some(spec_name) = tag.get_str("spec_name") {
        return spec_name.to_string();
    }
    tag.get_str("tag_name").unwrap_or_default().to_lowercase()
}

pub fn value_to_json(value: &Value) -> Json {
    match value {
        Value::Str(s) | Value::EnumSym(s) => Json::String(s.clone()),
        Value::Int(i) => Json::from(*i),
        Value::Bool(b) => Json::Bool(*b),
        Value::Record(r) => record_to_json(r),
        Value::List(items) => Json::Array(items.iter().map(value_to_json).collect()),
    }
}

pub fn record_to_json(record: &Record) -> Json {
    let mut map = serde_json::Map::new();
    for (name, value) in &record.fields {
        map.insert((*name).to_string(), value_to_json(value));
    }
    Json::Object(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attr(name: &str) -> Record {
        let mut r = Record::new("AttrSpec");
        r.set("name", Value::Str(name.to_string()));
        r
    }

    #[test]
    fn equal_content_means_equal_key() {
        let mut a = attr("href");
        a.set("mandatory", Value::Bool(true));
        let mut b = attr("href");
        b.set("mandatory", Value::Bool(true));
        assert_eq!(record_key(&a), record_key(&b));
    }

    #[test]
    fn different_content_means_different_key() {
        let a = attr("href");
        let b = attr("src");
        assert_ne!(record_key(&a), record_key(&b));
        let mut c = attr("href");
        c.set("mandatory", Value::Bool(true));
        assert_ne!(record_key(&a), record_key(&c));
    }

    #[test]
    fn trivial_attr_detection() {
        assert!(is_trivial_attr(&attr("href")));
        let mut r = attr("href");
        r.set("mandatory", Value::Bool(true));
        assert!(!is_trivial_attr(&r));
        let mut list = Record::new("AttrList");
        list.set("name", Value::Str("x".to_string()));
        assert!(!is_trivial_attr(&list));
    }

    #[test]
    fn tag_spec_name_prefers_declared_spec_name() {
        let mut tag = Record::new("TagSpec");
        tag.set("tag_name", Value::Str("SCRIPT".to_string()));
        assert_eq!(tag_spec_name(&tag), "script");
        tag.set("spec_name", Value::Str("module script".to_string()));
        assert_eq!(tag_spec_name(&tag), "module script");
    }
}
