//! The variant filter: prunes tag specs outside the requested format and
//! synthesizes the module/nomodule pair for extension script tags.

use crate::compile::{CompileErrorKind, CompileOptions, CompilerError};
use crate::record::{Record, Value};

/// Condition satisfied by loading the validator runtime script in any form.
pub const RUNTIME_SCRIPT_CONDITION: &str = "runtime script";

/// The `enabled_by` marker carried by synthesized extension variants.
pub const ENABLED_BY_TRANSFORMED: &str = "transformed";

/// The format whose extension script tags expand into module/nomodule forms.
const PRIMARY_FORMAT: &str = "HTML";

/// One mutation applied by [`derive_variant`].
#[derive(Debug, Clone)]
pub enum Override {
    /// Replaces the field value outright.
    Set(&'static str, Value),
    /// Appends to a repeated field.
    Extend(&'static str, Vec<Value>),
}

/// Builds a derived record from a template plus overrides. The template is
/// never mutated; synthesis stays side-effect-free and testable alone.
pub fn derive_variant(template: &Record, overrides: &[Override]) -> Record {
    let mut derived = template.clone();
    for op in overrides {
        match op {
            Override::Set(field, value) => derived.set(field, value.clone()),
            Override::Extend(field, values) => {
                for value in values {
                    derived.push(field, value.clone());
                }
            }
        }
    }
    derived
}

/// Applies the variant selection to the parsed rules in place: format
/// pruning first, then extension synthesis. Field stripping for the minimal
/// variant happens at emission time, not here.
pub fn apply_variant(rules: &mut Record, options: &CompileOptions) -> Result<(), CompilerError> {
    if let Some(format) = &options.html_format {
        prune_tags(rules, format)?;
    }
    synthesize_extension_variants(rules)?;
    Ok(())
}

fn tag_declares_format(tag: &Record, format: &str) -> bool {
    match tag.get_list("html_format") {
        // No restriction declared: the tag applies to every format.
        None => true,
        Some(formats) => formats
            .iter()
            .any(|v| matches!(v, Value::EnumSym(sym) if sym == format)),
    }
}

fn prune_tags(rules: &mut Record, format: &str) -> Result<(), CompilerError> {
    let Some(tags) = rules.get_list_mut("tags") else {
        return Ok(());
    };
    for value in tags.iter() {
        if !matches!(value, Value::Record(_)) {
            return Err(CompilerError::new(
                CompileErrorKind::SchemaMismatch,
                "Rules.tags holds a non-record element".to_string(),
            ));
        }
    }
    tags.retain(|value| match value {
        Value::Record(tag) => tag_declares_format(tag, format),
        _ => false,
    });
    Ok(())
}

fn mandatory_attr(name: &str, value: &str) -> Record {
    let mut attr = Record::new("AttrSpec");
    attr.set("name", Value::Str(name.to_string()));
    attr.push("value", Value::Str(value.to_string()));
    attr.set("mandatory", Value::Bool(true));
    attr
}

fn extension_base_spec_name(extension_spec: &Record) -> Option<String> {
    let name = extension_spec.get_str("name")?;
    match extension_spec.get_str("version_name") {
        Some(version_name) => Some(format!("{name} {version_name}")),
        None => Some(name.to_string()),
    }
}

/// Every extension script tag gains the runtime-script requirement; those
/// applicable to the primary format additionally expand into a module form
/// (`type=module crossorigin=anonymous`) and a nomodule form, each requiring
/// the other's condition so a document must include exactly the pairing.
fn synthesize_extension_variants(rules: &mut Record) -> Result<(), CompilerError> {
    let Some(tags) = rules.get_list_mut("tags") else {
        return Ok(());
    };

    let mut additional: Vec<Value> = Vec::new();
    for value in tags.iter_mut() {
        let Value::Record(tag) = value else {
            return Err(CompilerError::new(
                CompileErrorKind::SchemaMismatch,
                "Rules.tags holds a non-record element".to_string(),
            ));
        };
        let Some(base_spec_name) = tag.get_record("extension_spec").and_then(extension_base_spec_name)
        else {
            continue;
        };
        tag.push(
            "requires_condition",
            Value::Str(RUNTIME_SCRIPT_CONDITION.to_string()),
        );
        if !tag_declares_restricted_format(tag, PRIMARY_FORMAT) {
            continue;
        }

        let template = derive_variant(
            tag,
            &[
                Override::Set(
                    "html_format",
                    Value::List(vec![Value::EnumSym(PRIMARY_FORMAT.to_string())]),
                ),
                Override::Set(
                    "enabled_by",
                    Value::List(vec![Value::Str(ENABLED_BY_TRANSFORMED.to_string())]),
                ),
            ],
        );

        let module_name = format!("{base_spec_name} module extension script");
        let nomodule_name = format!("{base_spec_name} nomodule extension script");

        let mut type_module = mandatory_attr("type", "module");
        type_module.set("dispatch_key", Value::EnumSym("NAME_VALUE_DISPATCH".to_string()));

        let module_tag = derive_variant(
            &template,
            &[
                Override::Set("spec_name", Value::Str(module_name.clone())),
                Override::Extend(
                    "requires_condition",
                    vec![Value::Str(nomodule_name.clone())],
                ),
                Override::Extend(
                    "satisfies_condition",
                    vec![Value::Str(module_name.clone())],
                ),
                Override::Extend(
                    "attrs",
                    vec![
                        Value::Record(mandatory_attr("crossorigin", "anonymous")),
                        Value::Record(type_module),
                    ],
                ),
            ],
        );
        let nomodule_tag = derive_variant(
            &template,
            &[
                Override::Set("spec_name", Value::Str(nomodule_name.clone())),
                Override::Extend("requires_condition", vec![Value::Str(module_name)]),
                Override::Extend("satisfies_condition", vec![Value::Str(nomodule_name)]),
                Override::Extend("attrs", vec![Value::Record(mandatory_attr("nomodule", ""))]),
            ],
        );

        additional.push(Value::Record(module_tag));
        additional.push(Value::Record(nomodule_tag));
    }
    tags.extend(additional);
    Ok(())
}

/// Unlike [`tag_declares_format`], an absent `html_format` list does not
/// count: synthesis only applies to tags explicitly listing the format.
fn tag_declares_restricted_format(tag: &Record, format: &str) -> bool {
    tag.get_list("html_format")
        .map(|formats| {
            formats
                .iter()
                .any(|v| matches!(v, Value::EnumSym(sym) if sym == format))
        })
        .unwrap_or(false)
}
