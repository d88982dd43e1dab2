use rulec::compile::{compile_rules_to_js, CompileOptions};

const EXTENSION_DOC: &str = r#"
    tags: {
      tag_name: "SCRIPT"
      spec_name: "carousel extension script"
      html_format: HTML
      extension_spec: { name: "carousel" }
    }
"#;

#[test]
fn extension_tags_expand_into_module_and_nomodule_forms() {
    let out =
        compile_rules_to_js(EXTENSION_DOC, &CompileOptions::default()).expect("document must compile");
    assert!(out.contains("'carousel module extension script'"), "{out}");
    assert!(out.contains("'carousel nomodule extension script'"), "{out}");
    // Template, module form, nomodule form.
    assert_eq!(out.matches("let tagspec_").count(), 3, "{out}");
    // Synthesized mandatory attrs.
    assert!(out.contains("new AttrSpec('crossorigin')"), "{out}");
    assert!(out.contains("new AttrSpec('nomodule')"), "{out}");
    assert!(out.contains("new AttrSpec('type')"), "{out}");
}

#[test]
fn module_and_nomodule_forms_require_each_other() {
    let out =
        compile_rules_to_js(EXTENSION_DOC, &CompileOptions::default()).expect("document must compile");
    // Interning order: the runtime condition first (from the template tag),
    // then the nomodule and module spec names as the derived pair resolves.
    assert!(
        out.contains(
            ".internedStrings = [\"runtime script\",\
             \"carousel nomodule extension script\",\
             \"carousel module extension script\"];"
        ),
        "{out}"
    );
    // module requires nomodule's condition and satisfies its own.
    assert!(out.contains("requiresCondition : [-1,-2]"), "{out}");
    assert!(out.contains("satisfiesCondition : [-3]"), "{out}");
    // nomodule requires module's condition and satisfies its own.
    assert!(out.contains("requiresCondition : [-1,-3]"), "{out}");
    assert!(out.contains("satisfiesCondition : [-2]"), "{out}");
}

#[test]
fn module_form_carries_a_name_value_dispatch_key() {
    let out =
        compile_rules_to_js(EXTENSION_DOC, &CompileOptions::default()).expect("document must compile");
    // Tag ids: 0 template, 1 module, 2 nomodule. Only the module form has a
    // dispatch-flagged attr (type=module).
    assert!(
        out.contains(".dispatchKeyByTagSpecId = [null,\"type\\u0000module\",null];"),
        "{out}"
    );
}

#[test]
fn derived_forms_are_marked_transformed_and_primary_format() {
    let out =
        compile_rules_to_js(EXTENSION_DOC, &CompileOptions::default()).expect("document must compile");
    assert_eq!(out.matches("enabledBy : ['transformed']").count(), 2, "{out}");
    assert_eq!(out.matches("htmlFormat : [HtmlFormat.HTML]").count(), 3, "{out}");
}
