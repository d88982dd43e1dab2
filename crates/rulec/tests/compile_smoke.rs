use rulec::compile::{compile_rules_to_js, dump_rules_json, CompileOptions};

#[test]
fn compiles_a_minimal_document() {
    let doc = r#"
        tags: {
          tag_name: "HTML"
          mandatory: true
        }
    "#;
    let out = compile_rules_to_js(doc, &CompileOptions::default()).expect("document must compile");
    assert!(out.contains("const createRules = function() {"), "{out}");
    assert!(out.contains("new TagSpec('HTML')"), "{out}");
    assert!(out.contains("mandatory : true"), "{out}");
    assert!(out.contains("rules_0.tagSpecIdsByTagSpecName = {\"html\":0};"), "{out}");
    assert!(out.contains("rules_0.dispatchKeyByTagSpecId = [null];"), "{out}");
    assert!(out.contains("return rules_0;"), "{out}");
    assert!(out.contains("export {"), "{out}");
}

#[test]
fn emits_type_declarations_for_the_whole_catalog() {
    let out =
        compile_rules_to_js("tags: { tag_name: \"A\" }", &CompileOptions::default())
            .expect("document must compile");
    for decl in [
        "const AttrList = function(",
        "const AttrSpec = function(name)",
        "const AttrTriggerSpec = function(alsoRequiresAttr)",
        "const ErrorFormat = function(code,format)",
        "const ExtensionSpec = function(",
        "const Rules = function(tags)",
        "const TagSpec = function(tagName)",
        "const DispatchKeyType = {",
        "const ErrorCode = {",
        "const HtmlFormat = {",
    ] {
        assert!(out.contains(decl), "missing {decl:?} in output");
    }
    // Shared empty arrays exist per element type.
    assert!(out.contains("const EMPTY_string_ARRAY = [];"), "{out}");
    assert!(out.contains("const EMPTY_AttrSpec_ARRAY = [];"), "{out}");
}

#[test]
fn error_formats_use_constructor_arguments() {
    let doc = r#"
        error_formats: { code: DISALLOWED_TAG format: "tag is not allowed" }
    "#;
    let out = compile_rules_to_js(doc, &CompileOptions::default()).expect("document must compile");
    assert!(
        out.contains("new ErrorFormat(ErrorCode.DISALLOWED_TAG,'tag is not allowed')"),
        "{out}"
    );
    assert!(out.contains("errorFormats : [errorformat_0]"), "{out}");
}

#[test]
fn attr_triggers_emit_inline_records() {
    let doc = r#"
        tags: {
          tag_name: "INPUT"
          attrs: {
            name: "type"
            trigger: {
              also_requires_attr: "name"
              if_value_regex: "submit|image"
            }
          }
        }
    "#;
    let out = compile_rules_to_js(doc, &CompileOptions::default()).expect("document must compile");
    assert!(out.contains("new AttrTriggerSpec(['name'])"), "{out}");
    // The trigger regex is a synthetic reference: interned, not inlined.
    assert!(out.contains("ifValueRegex : -1"), "{out}");
    assert!(out.contains("\"submit|image\""), "{out}");
}

#[test]
fn compiling_twice_is_byte_identical() {
    let doc = r#"
        tags: {
          tag_name: "SCRIPT"
          spec_name: "carousel extension script"
          html_format: HTML
          extension_spec: { name: "carousel" }
        }
        tags: {
          tag_name: "LINK"
          attrs: { name: "href" }
          attrs: { name: "rel" mandatory: true }
          attr_lists: "common"
        }
        attr_lists: {
          name: "common"
          attrs: { name: "title" }
        }
    "#;
    let options = CompileOptions::default();
    let first = compile_rules_to_js(doc, &options).expect("document must compile");
    let second = compile_rules_to_js(doc, &options).expect("document must compile");
    assert_eq!(first, second);
}

#[test]
fn dump_json_round_trips_field_names() {
    let doc = "tags: { tag_name: \"A\" unique: true }";
    let json = dump_rules_json(doc).expect("document must dump");
    assert!(json.contains("\"tag_name\": \"A\""), "{json}");
    assert!(json.contains("\"unique\": true"), "{json}");
    assert!(json.contains("rulec.rules-json@"), "{json}");
}
