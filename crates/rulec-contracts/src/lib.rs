//! Shared, version-pinned protocol identifiers.
//!
//! These constants are the single source of truth for schema/version strings
//! that appear in machine-readable I/O.

pub const RULEC_REPORT_SCHEMA_VERSION: &str = "rulec.report@0.1.0";
pub const RULES_JS_SCHEMA_VERSION: &str = "rulec.rules-js@0.1.0";
pub const RULES_JSON_SCHEMA_VERSION: &str = "rulec.rules-json@0.1.0";
