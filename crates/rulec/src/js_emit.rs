//! Emits the generated JavaScript module: enum and class declarations from
//! the schema catalog, then `createRules()`, which constructs every unique
//! record exactly once and fills in the registry-derived flat tables.

use std::collections::BTreeMap;

use crate::compile::{CompileErrorKind, CompileOptions, CompilerError, Variant};
use crate::record::{is_trivial_attr, record_key, tag_spec_name, Record, Value};
use crate::registry::Registry;
use crate::resolve::{self, EmitSink};
use crate::schema::{catalog, EnumDescriptor, FieldDescriptor, FieldKind, MessageDescriptor, RefKind};

/// Attr list whose attrs apply to every tag; pulled out of directAttrLists
/// into its own table for direct access.
const GLOBAL_ATTRS_LIST: &str = "$GLOBAL_ATTRS";

/// Line writer with an indent stack.
struct CodeWriter {
    out: String,
    indent_by: Vec<usize>,
}

impl CodeWriter {
    fn new() -> Self {
        Self {
            out: String::new(),
            indent_by: vec![0],
        }
    }

    fn push_indent(&mut self, indent: usize) {
        let current = self.indent_by.last().copied().unwrap_or(0);
        self.indent_by.push(current + indent);
    }

    fn pop_indent(&mut self) {
        self.indent_by.pop();
    }

    fn line(&mut self, line: &str) {
        let indent = self.indent_by.last().copied().unwrap_or(0);
        for _ in 0..indent {
            self.out.push(' ');
        }
        self.out.push_str(line);
        self.out.push('\n');
    }
}

pub(crate) fn camel_case(under_score: &str) -> String {
    let mut out = String::with_capacity(under_score.len());
    let mut upper_next = false;
    for c in under_score.chars() {
        if c == '_' {
            upper_next = true;
        } else if upper_next {
            out.extend(c.to_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }
    out
}

pub(crate) fn js_str(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            ' '..='~' => out.push(c),
            c if (c as u32) < 0x10000 => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push_str(&format!("\\u{{{:x}}}", c as u32)),
        }
    }
    out.push('\'');
    out
}

/// The generated element type of a field. Reference fields become numbers
/// since the resolver replaces their values with IDs.
pub(crate) fn element_type_for(field: &FieldDescriptor) -> String {
    if !matches!(field.ref_kind, RefKind::Plain) {
        return "number".to_string();
    }
    match field.kind {
        FieldKind::Str => "string".to_string(),
        FieldKind::Int => "number".to_string(),
        FieldKind::Bool => "boolean".to_string(),
        FieldKind::Enum(name) | FieldKind::Message(name) => name.to_string(),
    }
}

fn field_type_for(field: &FieldDescriptor, nullable: bool) -> String {
    let element_type = element_type_for(field);
    if field.repeated {
        if nullable {
            return format!("Array<!{element_type}>");
        }
        return format!("!Array<!{element_type}>");
    }
    if nullable {
        return format!("?{element_type}");
    }
    element_type
}

fn internal(message: String) -> CompilerError {
    CompilerError::new(CompileErrorKind::Internal, message)
}

fn emit_enum(desc: &EnumDescriptor, out: &mut CodeWriter) {
    out.line("/**");
    out.line(" * @enum {string}");
    out.line(" */");
    out.line(&format!("const {} = {{", desc.name));
    out.push_indent(2);
    for (name, _) in desc.values {
        out.line(&format!("{name}: '{name}',"));
    }
    out.pop_indent();
    out.line("};");
    let names: Vec<&str> = desc.values.iter().map(|(n, _)| *n).collect();
    out.line("/** @type {!Array<string>} */");
    out.line(&format!(
        "const {}_NamesByIndex = [\"{}\"];",
        desc.name,
        names.join("\",\"")
    ));
    out.line(&format!("/** @type {{!Array<!{}>}} */", desc.name));
    out.line(&format!(
        "const {}_ValuesByIndex = [{}];",
        desc.name,
        names
            .iter()
            .map(|n| format!("{}.{n}", desc.name))
            .collect::<Vec<_>>()
            .join(",")
    ));
    out.line(&format!("/** @type {{!Object<{}, number>}} */", desc.name));
    out.line(&format!("const {}_NumberByName = {{", desc.name));
    out.push_indent(2);
    for (name, number) in desc.values {
        out.line(&format!("'{name}': {number},"));
    }
    out.pop_indent();
    out.line("};");
    out.line(&format!("/** @type {{!Object<number, {}>}} */", desc.name));
    out.line(&format!("const {}_NameByNumber = {{", desc.name));
    out.push_indent(2);
    for (name, number) in desc.values {
        out.line(&format!("{number}: '{name}',"));
    }
    out.pop_indent();
    out.line("};");
}

fn emit_class(desc: &MessageDescriptor, options: &CompileOptions, out: &mut CodeWriter) {
    let ctor_fields: Vec<&FieldDescriptor> =
        desc.fields.iter().filter(|f| f.ctor_arg).collect();
    out.line("/**");
    for field in &ctor_fields {
        out.line(&format!(
            " * @param {{{}}} {}",
            field_type_for(field, false),
            camel_case(field.name)
        ));
    }
    out.line(" * @constructor");
    out.line(" * @struct");
    out.line(" */");
    let params: Vec<String> = ctor_fields.iter().map(|f| camel_case(f.name)).collect();
    out.line(&format!("const {} = function({}) {{", desc.name, params.join(",")));
    out.push_indent(2);
    for field in desc.fields {
        if field.derived_table {
            continue;
        }
        if options.variant == Variant::Minimal && field.detailed_only {
            continue;
        }
        let assigned = if field.ctor_arg {
            camel_case(field.name)
        } else if field.repeated {
            // Empty arrays are shared between instances; the generated data
            // never mutates them.
            format!("EMPTY_{}_ARRAY", element_type_for(field))
        } else {
            match field.kind {
                FieldKind::Bool => "false".to_string(),
                FieldKind::Int => "0".to_string(),
                _ => "null".to_string(),
            }
        };
        out.line(&format!(
            "/**@export @type {{{}}} */",
            field_type_for(field, assigned == "null")
        ));
        out.line(&format!("this.{} = {};", camel_case(field.name), assigned));
    }
    if desc.name == "Rules" {
        out.line("/** @type {!Array<string>} */");
        out.line("this.internedStrings = [];");
        out.line("/** @type {!Array<!AttrSpec>} */");
        out.line("this.attrs = [];");
        out.line("/** @type {!Array<!Array<number>>} */");
        out.line("this.directAttrLists = [];");
        out.line("/** @type {!Array<number>} */");
        out.line("this.globalAttrs = [];");
        out.line("/** @type {!Object<string, number>} */");
        out.line("this.tagSpecIdsByTagSpecName = {};");
        out.line("/** @type {!Object<string, number>} */");
        out.line("this.attrListIdsByName = {};");
        out.line("/** @type {!Array<?string>} */");
        out.line("this.dispatchKeyByTagSpecId = [];");
    }
    out.pop_indent();
    out.line("};");
}

/// Emits record construction statements into `createRules()`.
struct BodyEmitter<'a> {
    out: CodeWriter,
    options: &'a CompileOptions,
}

impl BodyEmitter<'_> {
    /// One construction statement per unique record: constructor arguments in
    /// catalog field order, remaining fields overlaid with `Object.assign`.
    /// Nested plain-message records are emitted first via the resolver.
    fn emit_record(
        &mut self,
        record: &Record,
        registry: &mut Registry,
    ) -> Result<String, CompilerError> {
        let key = record_key(record);
        registry.mark_emitted(&key);
        let desc = catalog()
            .message(record.type_name)
            .ok_or_else(|| internal(format!("catalog is missing message {}", record.type_name)))?;
        let ctx = emit_context(record);

        let mut ctor_values: Vec<String> = Vec::new();
        let mut overlay: Vec<String> = Vec::new();
        for field in desc.fields {
            if field.derived_table {
                continue;
            }
            if self.options.variant == Variant::Minimal && field.detailed_only {
                continue;
            }
            let Some(value) = record.get(field.name) else {
                continue;
            };
            let rendered = resolve::resolved_value(field, value, &ctx, registry, self)?;
            if field.ctor_arg {
                ctor_values.push(rendered);
            } else {
                overlay.push(format!("{} : {}", camel_case(field.name), rendered));
            }
        }

        let reference = registry.reference_for_key(&key);
        if overlay.is_empty() {
            self.out.line(&format!(
                "let {reference} = new {}({});",
                desc.name,
                ctor_values.join(",")
            ));
        } else {
            // Object-literal overlay over the constructed instance; more
            // compact than one assignment statement per field.
            self.out.line(&format!(
                "let {reference} = /** @type {{!{}}} */ (oa(new {}({}), {{{}}}));",
                desc.name,
                desc.name,
                ctor_values.join(","),
                overlay.join(",")
            ));
        }
        Ok(reference)
    }
}

impl EmitSink for BodyEmitter<'_> {
    fn ensure_emitted(
        &mut self,
        record: &Record,
        registry: &mut Registry,
    ) -> Result<String, CompilerError> {
        let key = record_key(record);
        if !registry.is_emitted(&key) {
            self.emit_record(record, registry)?;
        }
        Ok(registry.reference_for_key(&key))
    }
}

fn emit_context(record: &Record) -> String {
    match record.type_name {
        "TagSpec" => format!("tag spec {:?}", tag_spec_name(record)),
        "AttrList" => format!("attr list {:?}", record.get_str("name").unwrap_or_default()),
        other => other.to_string(),
    }
}

fn record_elements<'a>(
    rules: &'a Record,
    field: &str,
) -> Result<Vec<&'a Record>, CompilerError> {
    let mut out = Vec::new();
    for value in rules.get_list(field).unwrap_or_default() {
        let Value::Record(r) = value else {
            return Err(CompilerError::new(
                CompileErrorKind::SchemaMismatch,
                format!("Rules.{field} holds a non-record element"),
            ));
        };
        out.push(r);
    }
    Ok(out)
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, CompilerError> {
    serde_json::to_string(value).map_err(|e| internal(format!("serialize emitted table: {e}")))
}

/// The precomputed dispatch key for a tag spec: taken from the first of its
/// attrs (direct first, then referenced attr lists in order) flagged with a
/// dispatch key type. Lets the runtime shortlist candidate tag specs without
/// scanning all of them.
fn dispatch_key_for(
    tag: &Record,
    attr_lists_by_name: &BTreeMap<&str, &Record>,
) -> Result<Option<String>, CompilerError> {
    let mut candidates: Vec<&Record> = Vec::new();
    for value in tag.get_list("attrs").unwrap_or_default() {
        if let Value::Record(attr) = value {
            candidates.push(attr);
        }
    }
    for value in tag.get_list("attr_lists").unwrap_or_default() {
        if let Value::Str(list_name) = value {
            let Some(attr_list) = attr_lists_by_name.get(list_name.as_str()) else {
                return Err(CompilerError::new(
                    CompileErrorKind::UnresolvedReference,
                    format!(
                        "{}: unresolved attr list reference {list_name:?} in field attr_lists",
                        emit_context(tag)
                    ),
                ));
            };
            for value in attr_list.get_list("attrs").unwrap_or_default() {
                if let Value::Record(attr) = value {
                    candidates.push(attr);
                }
            }
        }
    }

    for attr in candidates {
        let Some(Value::EnumSym(dispatch)) = attr.get("dispatch_key") else {
            continue;
        };
        if dispatch == "NONE_DISPATCH" {
            continue;
        }
        let name = attr.get_str("name").unwrap_or_default().to_ascii_lowercase();
        let attr_value = match attr.get_list("value").unwrap_or_default().first() {
            Some(Value::Str(v)) => v.to_ascii_lowercase(),
            _ => String::new(),
        };
        let parent = tag
            .get_str("mandatory_parent")
            .unwrap_or_default()
            .to_ascii_lowercase();
        let key = match dispatch.as_str() {
            "NAME_DISPATCH" => name,
            "NAME_VALUE_DISPATCH" => format!("{name}\0{attr_value}"),
            "NAME_VALUE_PARENT_DISPATCH" => format!("{name}\0{attr_value}\0{parent}"),
            other => {
                return Err(internal(format!("unhandled dispatch key type {other}")));
            }
        };
        return Ok(Some(key));
    }
    Ok(None)
}

pub fn emit_rules_js(
    rules: &Record,
    registry: &mut Registry,
    options: &CompileOptions,
) -> Result<String, CompilerError> {
    let cat = catalog();
    let mut out = CodeWriter::new();

    out.line("//");
    out.line("// Generated by rulec - do not edit.");
    out.line(&format!(
        "// schema: {} variant: {} format: {}",
        rulec_contracts::RULES_JS_SCHEMA_VERSION,
        options.variant.as_str(),
        options.html_format.as_deref().unwrap_or("(all)")
    ));
    out.line("//");
    out.line("'use strict';");
    out.line("");

    // Shared empty arrays, one per element type so the generated code stays
    // monomorphic.
    let mut decl_names: Vec<&str> = cat
        .messages
        .iter()
        .map(|m| m.name)
        .chain(cat.enums.iter().map(|e| e.name))
        .collect();
    decl_names.sort_unstable();
    for name in ["string", "number", "boolean"].iter().chain(decl_names.iter()) {
        out.line(&format!("/** @type {{!Array<!{name}>}} */"));
        out.line(&format!("const EMPTY_{name}_ARRAY = [];"));
        out.line("");
    }

    // Type declarations, sorted by name for determinism.
    for name in &decl_names {
        if let Some(msg) = cat.message(name) {
            emit_class(msg, options, &mut out);
        } else if let Some(en) = cat.enum_by_name(name) {
            emit_enum(en, &mut out);
        }
        out.line("");
    }

    out.line("/**");
    out.line(" * @return {!Rules}");
    out.line(" */");
    out.line("const createRules = function() {");
    out.push_indent(2);
    out.line("const oa = Object.assign;");

    let mut body = BodyEmitter {
        out,
        options,
    };
    let rules_reference = body.emit_record(rules, registry)?;

    let tags = record_elements(rules, "tags")?;
    let attr_lists = record_elements(rules, "attr_lists")?;

    // Dense attr spec array: every non-trivial attr reachable from an attr
    // list or a tag, sorted by its assigned id.
    let mut attrs_by_id: BTreeMap<i64, &Record> = BTreeMap::new();
    for container in attr_lists.iter().chain(tags.iter()) {
        for value in container.get_list("attrs").unwrap_or_default() {
            let Value::Record(attr) = value else {
                return Err(CompilerError::new(
                    CompileErrorKind::SchemaMismatch,
                    format!("{}: attrs holds a non-record element", emit_context(container)),
                ));
            };
            if !is_trivial_attr(attr) {
                attrs_by_id.insert(registry.id_for(attr), attr);
            }
        }
    }
    let mut attr_references: Vec<String> = Vec::with_capacity(attrs_by_id.len());
    for attr in attrs_by_id.values() {
        attr_references.push(body.ensure_emitted(attr, registry)?);
    }
    body.out.line(&format!(
        "{rules_reference}.attrs = [{}];",
        attr_references.join(",")
    ));

    // Attr lists become arrays of ids; the global list gets its own table
    // and leaves an empty slot behind.
    let mut direct_attr_lists: Vec<Vec<i64>> = Vec::with_capacity(attr_lists.len());
    let mut global_attrs: Vec<i64> = Vec::new();
    let mut attr_lists_by_name: BTreeMap<&str, &Record> = BTreeMap::new();
    for attr_list in &attr_lists {
        let name = attr_list.get_str("name").unwrap_or_default();
        // The table is keyed by dense id, so each list must occupy exactly
        // one slot.
        if attr_lists_by_name.insert(name, attr_list).is_some() {
            return Err(CompilerError::new(
                CompileErrorKind::DuplicateName,
                format!("duplicate attr list name {name:?}"),
            ));
        }
        let mut ids: Vec<i64> = Vec::new();
        for value in attr_list.get_list("attrs").unwrap_or_default() {
            let Value::Record(attr) = value else {
                continue;
            };
            if is_trivial_attr(attr) {
                let attr_name = attr.get_str("name").unwrap_or_default();
                ids.push(registry.intern_string(attr_name));
            } else {
                ids.push(registry.id_for(attr));
            }
        }
        if name == GLOBAL_ATTRS_LIST {
            global_attrs = ids;
            direct_attr_lists.push(Vec::new());
        } else {
            direct_attr_lists.push(ids);
        }
    }
    let direct_json = to_json(&direct_attr_lists)?;
    let global_json = to_json(&global_attrs)?;
    body.out
        .line(&format!("{rules_reference}.directAttrLists = {direct_json};"));
    body.out
        .line(&format!("{rules_reference}.globalAttrs = {global_json};"));

    // Name-to-id tables per entity category.
    let tag_ids_json = to_json(registry.tag_spec_ids_by_name())?;
    let attr_list_ids_json = to_json(registry.attr_list_ids_by_name())?;
    body.out.line(&format!(
        "{rules_reference}.tagSpecIdsByTagSpecName = {tag_ids_json};"
    ));
    body.out.line(&format!(
        "{rules_reference}.attrListIdsByName = {attr_list_ids_json};"
    ));

    // Dispatch keys, indexed by tag spec id.
    let mut dispatch_keys: Vec<Option<String>> = Vec::new();
    for tag in &tags {
        let id = registry.id_for(tag) as usize;
        if id >= dispatch_keys.len() {
            dispatch_keys.resize(id + 1, None);
        }
        dispatch_keys[id] = dispatch_key_for(tag, &attr_lists_by_name)?;
    }
    let dispatch_json = to_json(&dispatch_keys)?;
    body.out.line(&format!(
        "{rules_reference}.dispatchKeyByTagSpecId = {dispatch_json};"
    ));

    // Emitted last, after the final intern call.
    let interned_json = to_json(&registry.interned_strings())?;
    body.out.line(&format!(
        "{rules_reference}.internedStrings = {interned_json};"
    ));

    body.out.line(&format!("return {rules_reference};"));
    let mut out = body.out;
    out.pop_indent();
    out.line("};");
    out.line("");

    let mut exports: Vec<&str> = decl_names.clone();
    exports.push("createRules");
    exports.sort_unstable();
    out.line(&format!("export {{{}}};", exports.join(", ")));
    Ok(out.out)
}
