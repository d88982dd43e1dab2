use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Parse,
    Filter,
    Resolve,
    Emit,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub code: String,
    pub severity: Severity,
    pub stage: Stage,
    pub message: String,
}

impl Diagnostic {
    pub fn error(code: &str, stage: Stage, message: &str) -> Self {
        Self {
            code: code.to_string(),
            severity: Severity::Error,
            stage,
            message: message.to_string(),
        }
    }
}
