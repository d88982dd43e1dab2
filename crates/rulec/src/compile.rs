//! Top-level compilation entry points and the compiler error type.

use crate::filter;
use crate::js_emit;
use crate::loader;
use crate::record::{record_to_json, Record, Value};
use crate::registry::Registry;
use crate::schema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Variant {
    #[default]
    Full,
    Minimal,
}

impl Variant {
    pub fn as_str(self) -> &'static str {
        match self {
            Variant::Full => "full",
            Variant::Minimal => "minimal",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CompileOptions {
    pub variant: Variant,
    /// If set, tag specs restricted to other formats are pruned.
    pub html_format: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompileErrorKind {
    Parse,
    UnresolvedReference,
    DuplicateName,
    SchemaMismatch,
    Internal,
}

impl CompileErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            CompileErrorKind::Parse => "parse",
            CompileErrorKind::UnresolvedReference => "unresolved-reference",
            CompileErrorKind::DuplicateName => "duplicate-name",
            CompileErrorKind::SchemaMismatch => "schema-mismatch",
            CompileErrorKind::Internal => "internal",
        }
    }
}

#[derive(Debug, Clone)]
pub struct CompilerError {
    pub kind: CompileErrorKind,
    pub message: String,
}

impl CompilerError {
    pub fn new(kind: CompileErrorKind, message: String) -> Self {
        Self { kind, message }
    }
}

impl std::fmt::Display for CompilerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} error: {}", self.kind.as_str(), self.message)
    }
}

impl std::error::Error for CompilerError {}

fn check_options(options: &CompileOptions) -> Result<(), CompilerError> {
    let Some(format) = &options.html_format else {
        return Ok(());
    };
    let desc = schema::catalog()
        .enum_by_name("HtmlFormat")
        .ok_or_else(|| {
            CompilerError::new(
                CompileErrorKind::Internal,
                "catalog is missing the HtmlFormat enum".to_string(),
            )
        })?;
    if !desc.has_value(format) {
        return Err(CompilerError::new(
            CompileErrorKind::Parse,
            format!("unknown html format {format:?}"),
        ));
    }
    Ok(())
}

fn pre_register(rules: &Record, registry: &mut Registry) -> Result<(), CompilerError> {
    // Two-phase resolution: every named entity is registered before any field
    // body is resolved, so forward references by name are valid. Registration
    // order is document order, which makes tag spec ids 0..tags.len() match
    // the emitted tags array and likewise for attr lists.
    for value in rules.get_list("tags").unwrap_or_default() {
        let Value::Record(tag) = value else {
            return Err(CompilerError::new(
                CompileErrorKind::SchemaMismatch,
                "Rules.tags holds a non-record element".to_string(),
            ));
        };
        registry.register_tag_spec(tag)?;
    }
    for value in rules.get_list("attr_lists").unwrap_or_default() {
        let Value::Record(attr_list) = value else {
            return Err(CompilerError::new(
                CompileErrorKind::SchemaMismatch,
                "Rules.attr_lists holds a non-record element".to_string(),
            ));
        };
        registry.register_attr_list(attr_list)?;
    }
    Ok(())
}

/// Compiles a rule document into the generated JavaScript module for one
/// (variant, format) combination. Builds a fresh registry per call; ID
/// assignment is variant-specific and must not leak across runs.
pub fn compile_rules_to_js(
    input: &str,
    options: &CompileOptions,
) -> Result<String, CompilerError> {
    check_options(options)?;
    let mut rules = loader::parse_rules(input)?;
    filter::apply_variant(&mut rules, options)?;
    let mut registry = Registry::new();
    pre_register(&rules, &mut registry)?;
    js_emit::emit_rules_js(&rules, &mut registry, options)
}

/// Dumps the parsed (unfiltered) rule tree as JSON, for diffing and tooling.
pub fn dump_rules_json(input: &str) -> Result<String, CompilerError> {
    let rules = loader::parse_rules(input)?;
    let doc = serde_json::json!({
        "schema_version": rulec_contracts::RULES_JSON_SCHEMA_VERSION,
        "rules": record_to_json(&rules),
    });
    serde_json::to_string_pretty(&doc).map_err(|e| {
        CompilerError::new(
            CompileErrorKind::Internal,
            format!("serialize rules json: {e}"),
        )
    })
}
