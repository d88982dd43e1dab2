//! The schema catalog: an explicit, enumerated description of every message
//! type and enum the rule document may contain.
//!
//! Each field carries a [`RefKind`] tag telling the resolver how to rewrite
//! its value, so traversal is a static iteration over these tables rather
//! than runtime introspection or string matching on field names.

/// Scalar/composite kind of a single field (element kind for repeated fields).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Str,
    Int,
    Bool,
    /// References an [`EnumDescriptor`] by name.
    Enum(&'static str),
    /// References a [`MessageDescriptor`] by name.
    Message(&'static str),
}

/// How the resolver rewrites a field value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefKind {
    /// Emit the value as-is (scalars, enums, plain nested messages).
    Plain,
    /// String naming another tag spec; rewritten to its dense ID.
    TagName,
    /// String naming an attr list; rewritten to its dense ID.
    AttrListName,
    /// Full nested record (or condition string) stored by ID: strings and
    /// trivial attr specs intern to a negative string ID, other records get
    /// their type-scoped dense ID.
    SyntheticRef,
}

#[derive(Debug, Clone, Copy)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub kind: FieldKind,
    pub repeated: bool,
    pub ref_kind: RefKind,
    /// Passed as a constructor argument in the generated code.
    pub ctor_arg: bool,
    /// Only emitted for the full variant; textually absent from minimal output.
    pub detailed_only: bool,
    /// Suppressed from per-record emission; replaced by derived flat tables.
    pub derived_table: bool,
}

impl FieldDescriptor {
    pub const fn new(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            repeated: false,
            ref_kind: RefKind::Plain,
            ctor_arg: false,
            detailed_only: false,
            derived_table: false,
        }
    }

    pub const fn repeated(mut self) -> Self {
        self.repeated = true;
        self
    }

    pub const fn ctor(mut self) -> Self {
        self.ctor_arg = true;
        self
    }

    pub const fn reference(mut self, ref_kind: RefKind) -> Self {
        self.ref_kind = ref_kind;
        self
    }

    pub const fn detailed_only(mut self) -> Self {
        self.detailed_only = true;
        self
    }

    pub const fn derived_table(mut self) -> Self {
        self.derived_table = true;
        self
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MessageDescriptor {
    pub name: &'static str,
    pub fields: &'static [FieldDescriptor],
}

impl MessageDescriptor {
    pub fn field(&self, name: &str) -> Option<&'static FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct EnumDescriptor {
    pub name: &'static str,
    /// `(symbol, number)` pairs in declaration order.
    pub values: &'static [(&'static str, i32)],
}

impl EnumDescriptor {
    pub fn has_value(&self, symbol: &str) -> bool {
        self.values.iter().any(|(name, _)| *name == symbol)
    }
}

use FieldKind::{Bool, Enum, Int, Message, Str};
use RefKind::{AttrListName, SyntheticRef, TagName};

static HTML_FORMAT: EnumDescriptor = EnumDescriptor {
    name: "HtmlFormat",
    values: &[("HTML", 1), ("ADS", 2), ("EMAIL", 3)],
};

static DISPATCH_KEY_TYPE: EnumDescriptor = EnumDescriptor {
    name: "DispatchKeyType",
    values: &[
        ("NONE_DISPATCH", 0),
        ("NAME_DISPATCH", 1),
        ("NAME_VALUE_DISPATCH", 2),
        ("NAME_VALUE_PARENT_DISPATCH", 3),
    ],
};

static ERROR_CODE: EnumDescriptor = EnumDescriptor {
    name: "ErrorCode",
    values: &[
        ("UNKNOWN_CODE", 0),
        ("DISALLOWED_TAG", 1),
        ("MANDATORY_TAG_MISSING", 2),
        ("DUPLICATE_UNIQUE_TAG", 3),
        ("MANDATORY_ATTR_MISSING", 4),
        ("DISALLOWED_ATTR", 5),
        ("INVALID_ATTR_VALUE", 6),
    ],
};

static RULES: MessageDescriptor = MessageDescriptor {
    name: "Rules",
    fields: &[
        FieldDescriptor::new("tags", Message("TagSpec")).repeated().ctor(),
        // Replaced in the output by directAttrLists/globalAttrs and the
        // dense attrs array.
        FieldDescriptor::new("attr_lists", Message("AttrList"))
            .repeated()
            .derived_table(),
        FieldDescriptor::new("error_formats", Message("ErrorFormat")).repeated(),
        FieldDescriptor::new("rules_revision", Int).detailed_only(),
    ],
};

static TAG_SPEC: MessageDescriptor = MessageDescriptor {
    name: "TagSpec",
    fields: &[
        FieldDescriptor::new("tag_name", Str).ctor(),
        FieldDescriptor::new("spec_name", Str),
        FieldDescriptor::new("html_format", Enum("HtmlFormat")).repeated(),
        FieldDescriptor::new("enabled_by", Str).repeated(),
        FieldDescriptor::new("mandatory", Bool),
        FieldDescriptor::new("mandatory_parent", Str),
        FieldDescriptor::new("unique", Bool),
        FieldDescriptor::new("attrs", Message("AttrSpec"))
            .repeated()
            .reference(SyntheticRef),
        FieldDescriptor::new("attr_lists", Str)
            .repeated()
            .reference(AttrListName),
        FieldDescriptor::new("requires_condition", Str)
            .repeated()
            .reference(SyntheticRef),
        FieldDescriptor::new("satisfies_condition", Str)
            .repeated()
            .reference(SyntheticRef),
        FieldDescriptor::new("excludes_condition", Str)
            .repeated()
            .reference(SyntheticRef),
        FieldDescriptor::new("also_requires_tag_warning", Str)
            .repeated()
            .reference(TagName),
        FieldDescriptor::new("mandatory_alternatives", Str).reference(SyntheticRef),
        FieldDescriptor::new("extension_spec", Message("ExtensionSpec")),
        FieldDescriptor::new("deprecation", Str),
        FieldDescriptor::new("deprecation_url", Str).detailed_only(),
        FieldDescriptor::new("spec_url", Str).detailed_only(),
    ],
};

static ATTR_SPEC: MessageDescriptor = MessageDescriptor {
    name: "AttrSpec",
    fields: &[
        FieldDescriptor::new("name", Str).ctor(),
        FieldDescriptor::new("value", Str).repeated(),
        FieldDescriptor::new("value_casei", Str).repeated(),
        FieldDescriptor::new("mandatory", Bool),
        FieldDescriptor::new("mandatory_oneof", Str).reference(SyntheticRef),
        FieldDescriptor::new("mandatory_anyof", Str).reference(SyntheticRef),
        FieldDescriptor::new("value_regex", Str).reference(SyntheticRef),
        FieldDescriptor::new("value_regex_casei", Str).reference(SyntheticRef),
        FieldDescriptor::new("disallowed_value_regex", Str).reference(SyntheticRef),
        FieldDescriptor::new("alternative_names", Str).repeated(),
        FieldDescriptor::new("dispatch_key", Enum("DispatchKeyType")),
        FieldDescriptor::new("trigger", Message("AttrTriggerSpec")),
        FieldDescriptor::new("deprecation", Str),
        FieldDescriptor::new("deprecation_url", Str).detailed_only(),
    ],
};

static ATTR_TRIGGER_SPEC: MessageDescriptor = MessageDescriptor {
    name: "AttrTriggerSpec",
    fields: &[
        FieldDescriptor::new("also_requires_attr", Str).repeated().ctor(),
        FieldDescriptor::new("if_value_regex", Str).reference(SyntheticRef),
    ],
};

static ATTR_LIST: MessageDescriptor = MessageDescriptor {
    name: "AttrList",
    fields: &[
        FieldDescriptor::new("name", Str),
        FieldDescriptor::new("attrs", Message("AttrSpec"))
            .repeated()
            .reference(SyntheticRef),
    ],
};

static EXTENSION_SPEC: MessageDescriptor = MessageDescriptor {
    name: "ExtensionSpec",
    fields: &[
        FieldDescriptor::new("name", Str),
        FieldDescriptor::new("version", Str).repeated(),
        FieldDescriptor::new("version_name", Str),
        FieldDescriptor::new("deprecated_recommends_usage_of_tag", Str).reference(TagName),
    ],
};

static ERROR_FORMAT: MessageDescriptor = MessageDescriptor {
    name: "ErrorFormat",
    fields: &[
        FieldDescriptor::new("code", Enum("ErrorCode")).ctor(),
        FieldDescriptor::new("format", Str).ctor(),
    ],
};

#[derive(Debug, Clone, Copy)]
pub struct Catalog {
    pub messages: &'static [&'static MessageDescriptor],
    pub enums: &'static [&'static EnumDescriptor],
}

impl Catalog {
    pub fn message(&self, name: &str) -> Option<&'static MessageDescriptor> {
        self.messages.iter().find(|m| m.name == name).copied()
    }

    pub fn enum_by_name(&self, name: &str) -> Option<&'static EnumDescriptor> {
        self.enums.iter().find(|e| e.name == name).copied()
    }
}

static CATALOG: Catalog = Catalog {
    messages: &[
        &RULES,
        &TAG_SPEC,
        &ATTR_SPEC,
        &ATTR_TRIGGER_SPEC,
        &ATTR_LIST,
        &EXTENSION_SPEC,
        &ERROR_FORMAT,
    ],
    enums: &[&HTML_FORMAT, &DISPATCH_KEY_TYPE, &ERROR_CODE],
};

pub fn catalog() -> &'static Catalog {
    &CATALOG
}
