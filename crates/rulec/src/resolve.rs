//! The reference resolver: rewrites field values into the form the emitter
//! assigns, driven by each field's [`RefKind`] tag.
//!
//! Name references become dense IDs, synthetic references become interned
//! string IDs or record IDs, and plain nested messages are emitted through
//! an [`EmitSink`] and referenced by generated variable name.

use crate::compile::{CompileErrorKind, CompilerError};
use crate::js_emit::{element_type_for, js_str};
use crate::record::{is_trivial_attr, Record, Value};
use crate::registry::Registry;
use crate::schema::{FieldDescriptor, FieldKind, RefKind};

/// Crossing point from resolution back into emission: resolving a plain
/// message field requires the nested record to exist in the output first.
pub trait EmitSink {
    fn ensure_emitted(
        &mut self,
        record: &Record,
        registry: &mut Registry,
    ) -> Result<String, CompilerError>;
}

/// Renders the assigned value for one field of the record named by `ctx`
/// (used only in diagnostics). Repeated fields resolve element-wise; an
/// empty repeated value falls back to the shared empty-array constant.
pub fn resolved_value(
    field: &FieldDescriptor,
    value: &Value,
    ctx: &str,
    registry: &mut Registry,
    sink: &mut dyn EmitSink,
) -> Result<String, CompilerError> {
    if field.repeated {
        let Value::List(items) = value else {
            return Err(mismatch(field, ctx, "a repeated value"));
        };
        if items.is_empty() {
            return Ok(format!("EMPTY_{}_ARRAY", element_type_for(field)));
        }
        let mut rendered = Vec::with_capacity(items.len());
        for item in items {
            rendered.push(render_element(field, item, ctx, registry, sink)?);
        }
        return Ok(format!("[{}]", rendered.join(",")));
    }
    if matches!(value, Value::List(_)) {
        return Err(mismatch(field, ctx, "a singular value"));
    }
    render_element(field, value, ctx, registry, sink)
}

fn render_element(
    field: &FieldDescriptor,
    value: &Value,
    ctx: &str,
    registry: &mut Registry,
    sink: &mut dyn EmitSink,
) -> Result<String, CompilerError> {
    match field.ref_kind {
        RefKind::TagName => {
            let Value::Str(name) = value else {
                return Err(mismatch(field, ctx, "a tag spec name"));
            };
            let id = registry.tag_spec_id(name).ok_or_else(|| {
                CompilerError::new(
                    CompileErrorKind::UnresolvedReference,
                    format!("{ctx}: unresolved tag spec reference {name:?} in field {}", field.name),
                )
            })?;
            Ok(id.to_string())
        }
        RefKind::AttrListName => {
            let Value::Str(name) = value else {
                return Err(mismatch(field, ctx, "an attr list name"));
            };
            let id = registry.attr_list_id(name).ok_or_else(|| {
                CompilerError::new(
                    CompileErrorKind::UnresolvedReference,
                    format!("{ctx}: unresolved attr list reference {name:?} in field {}", field.name),
                )
            })?;
            Ok(id.to_string())
        }
        RefKind::SyntheticRef => match value {
            // Condition strings and regexes intern directly.
            Value::Str(s) => Ok(registry.intern_string(s).to_string()),
            // An attr that is just a name collapses to its interned name
            // instead of costing a record.
            Value::Record(r) if is_trivial_attr(r) => {
                let name = r.get_str("name").unwrap_or_default();
                Ok(registry.intern_string(name).to_string())
            }
            Value::Record(r) => Ok(registry.id_for(r).to_string()),
            _ => Err(mismatch(field, ctx, "a string or record")),
        },
        RefKind::Plain => match (field.kind, value) {
            (FieldKind::Str, Value::Str(s)) => Ok(js_str(s)),
            (FieldKind::Int, Value::Int(i)) => Ok(i.to_string()),
            (FieldKind::Bool, Value::Bool(b)) => Ok(b.to_string()),
            (FieldKind::Enum(enum_name), Value::EnumSym(sym)) => Ok(format!("{enum_name}.{sym}")),
            (FieldKind::Message(_), Value::Record(r)) => sink.ensure_emitted(r, registry),
            _ => Err(mismatch(field, ctx, "a value matching its declared kind")),
        },
    }
}

fn mismatch(field: &FieldDescriptor, ctx: &str, expected: &str) -> CompilerError {
    CompilerError::new(
        CompileErrorKind::SchemaMismatch,
        format!("{ctx}: field {} expects {expected}", field.name),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::record_key;
    use crate::schema::catalog;

    struct FakeSink {
        emitted: Vec<&'static str>,
    }

    impl EmitSink for FakeSink {
        fn ensure_emitted(
            &mut self,
            record: &Record,
            registry: &mut Registry,
        ) -> Result<String, CompilerError> {
            self.emitted.push(record.type_name);
            Ok(registry.reference_for_key(&record_key(record)))
        }
    }

    fn tag_field(name: &str) -> &'static FieldDescriptor {
        catalog()
            .message("TagSpec")
            .and_then(|m| m.field(name))
            .expect("field present")
    }

    fn attr(name: &str) -> Record {
        let mut r = Record::new("AttrSpec");
        r.set("name", Value::Str(name.to_string()));
        r
    }

    #[test]
    fn name_reference_resolves_to_registered_id() {
        let mut registry = Registry::new();
        let mut sink = FakeSink { emitted: Vec::new() };
        let mut target = Record::new("TagSpec");
        target.set("tag_name", Value::Str("B".to_string()));
        registry.register_tag_spec(&target).expect("register");

        let field = tag_field("also_requires_tag_warning");
        let value = Value::List(vec![Value::Str("b".to_string())]);
        let out = resolved_value(field, &value, "tag spec 'a'", &mut registry, &mut sink)
            .expect("resolves");
        assert_eq!(out, "[0]");
    }

    #[test]
    fn unresolved_name_is_fatal_with_referrer_context() {
        let mut registry = Registry::new();
        let mut sink = FakeSink { emitted: Vec::new() };
        let field = tag_field("also_requires_tag_warning");
        let value = Value::List(vec![Value::Str("missing".to_string())]);
        let err = resolved_value(field, &value, "tag spec 'a'", &mut registry, &mut sink)
            .expect_err("must fail");
        assert_eq!(err.kind, CompileErrorKind::UnresolvedReference);
        assert!(err.message.contains("tag spec 'a'"), "{}", err.message);
        assert!(err.message.contains("missing"), "{}", err.message);
    }

    #[test]
    fn trivial_attrs_intern_and_full_attrs_take_record_ids() {
        let mut registry = Registry::new();
        let mut sink = FakeSink { emitted: Vec::new() };
        let field = tag_field("attrs");
        let mut full = attr("src");
        full.set("mandatory", Value::Bool(true));
        let value = Value::List(vec![
            Value::Record(attr("href")),
            Value::Record(full),
            Value::Record(attr("href")),
        ]);
        let out = resolved_value(field, &value, "tag spec 'a'", &mut registry, &mut sink)
            .expect("resolves");
        // Both trivial occurrences share one interned id; the full attr gets
        // record id 0; nothing is emitted inline.
        assert_eq!(out, "[-1,0,-1]");
        assert!(sink.emitted.is_empty());
    }

    #[test]
    fn empty_repeated_fields_use_the_shared_constant() {
        let mut registry = Registry::new();
        let mut sink = FakeSink { emitted: Vec::new() };
        let field = tag_field("enabled_by");
        let out = resolved_value(field, &Value::List(Vec::new()), "t", &mut registry, &mut sink)
            .expect("resolves");
        assert_eq!(out, "EMPTY_string_ARRAY");
    }

    #[test]
    fn plain_message_fields_emit_through_the_sink() {
        let mut registry = Registry::new();
        let mut sink = FakeSink { emitted: Vec::new() };
        let field = tag_field("extension_spec");
        let mut ext = Record::new("ExtensionSpec");
        ext.set("name", Value::Str("carousel".to_string()));
        let out = resolved_value(field, &Value::Record(ext), "t", &mut registry, &mut sink)
            .expect("resolves");
        assert_eq!(out, "extensionspec_0");
        assert_eq!(sink.emitted, vec!["ExtensionSpec"]);
    }

    #[test]
    fn scalar_kind_mismatch_is_fatal() {
        let mut registry = Registry::new();
        let mut sink = FakeSink { emitted: Vec::new() };
        let field = tag_field("mandatory");
        let err = resolved_value(field, &Value::Str("yes".to_string()), "t", &mut registry, &mut sink)
            .expect_err("must fail");
        assert_eq!(err.kind, CompileErrorKind::SchemaMismatch);
    }
}
