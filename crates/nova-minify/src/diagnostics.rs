use std::fmt;

use serde::Serialize;

/// A generic signature that no longer parses, or cannot be rewritten, and was dropped.
pub const MALFORMED_SIGNATURE: &str = "malformed-signature";
/// A non-rebound reference whose resolution candidates were renamed inconsistently.
pub const AMBIGUOUS_REFERENCE: &str = "ambiguous-reference";
/// An apply-mapping entry that names a class or member the program does not contain.
pub const MISSING_MAPPING_TARGET: &str = "missing-mapping-target";

/// `Error` marks an unsound input program (the pass still completes); `Warning` marks a local
/// fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// A problem found during a renaming pass. The pass falls back to the original name for the
/// affected item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: &'static str,
    pub message: String,
}

impl Diagnostic {
    pub fn error(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            code,
            message: message.into(),
        }
    }

    pub fn warning(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let severity = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{severity}[{}]: {}", self.code, self.message)
    }
}
