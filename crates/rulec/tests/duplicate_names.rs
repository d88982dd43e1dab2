use rulec::compile::{compile_rules_to_js, CompileErrorKind, CompileOptions};

#[test]
fn same_name_with_different_content_is_fatal() {
    let doc = r#"
        tags: {
          tag_name: "A"
          spec_name: "dup"
        }
        tags: {
          tag_name: "B"
          spec_name: "dup"
        }
    "#;
    let err = compile_rules_to_js(doc, &CompileOptions::default()).expect_err("must reject");
    assert_eq!(err.kind, CompileErrorKind::DuplicateName);
    assert!(err.message.contains("\"dup\""), "{}", err.message);
}

#[test]
fn duplicate_attr_list_names_are_fatal() {
    let doc = r#"
        attr_lists: {
          name: "shared"
          attrs: { name: "a" }
        }
        attr_lists: {
          name: "shared"
          attrs: { name: "b" }
        }
    "#;
    let err = compile_rules_to_js(doc, &CompileOptions::default()).expect_err("must reject");
    assert_eq!(err.kind, CompileErrorKind::DuplicateName);
    assert!(err.message.contains("attr list"), "{}", err.message);
}

#[test]
fn lowercased_tag_name_collides_with_a_declared_spec_name() {
    // TagSpec names default to the lowercased tag name, so a declared
    // spec_name can collide with another tag's implicit name.
    let doc = r#"
        tags: {
          tag_name: "A"
        }
        tags: {
          tag_name: "B"
          spec_name: "a"
        }
    "#;
    let err = compile_rules_to_js(doc, &CompileOptions::default()).expect_err("must reject");
    assert_eq!(err.kind, CompileErrorKind::DuplicateName);
}
