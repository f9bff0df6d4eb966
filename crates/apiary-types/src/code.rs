use std::fmt;

use serde::{Deserialize, Serialize};

/// Whether a piece of cell code is raw source or gate output.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodeKind {
    Source,
    Compiled,
}

/// A unit of cell markup, tagged with its kind.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellCode {
    pub kind: CodeKind,
    pub markup: String,
}

impl CellCode {
    pub fn source(markup: impl Into<String>) -> Self {
        Self {
            kind: CodeKind::Source,
            markup: markup.into(),
        }
    }

    pub fn compiled(markup: impl Into<String>) -> Self {
        Self {
            kind: CodeKind::Compiled,
            markup: markup.into(),
        }
    }

    /// Character count used for quota accounting.
    pub fn char_count(&self) -> usize {
        self.markup.chars().count()
    }
}

/// Outcome of a compilation attempt.
///
/// The set is closed: callers match on it rather than parsing messages.
/// Everything except [`CompilationStatus::CompilerError`] describes a
/// problem with the submitted source; `CompilerError` is a fault inside
/// the gate itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompilationStatus {
    /// Compilation succeeded and produced a payload.
    NoError,
    /// Source exceeds the cell's character quota.
    QuotaExceeded,
    /// Source references network endpoints outside the cell's tier.
    PolicyViolation,
    /// Source is malformed (empty, or contains unrepresentable bytes).
    SourceError,
    /// The gate itself failed; the source may be fine.
    CompilerError,
}

impl CompilationStatus {
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::NoError)
    }

    /// True when the failure is the platform's fault, not the caller's.
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::CompilerError)
    }
}

impl fmt::Display for CompilationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoError => f.write_str("no error"),
            Self::QuotaExceeded => f.write_str("quota exceeded"),
            Self::PolicyViolation => f.write_str("policy violation"),
            Self::SourceError => f.write_str("source error"),
            Self::CompilerError => f.write_str("compiler error"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn char_count_counts_characters_not_bytes() {
        let code = CellCode::source("héllo");
        assert_eq!(code.char_count(), 5);
        assert_eq!(code.markup.len(), 6);
    }

    #[test]
    fn only_no_error_is_ok() {
        assert!(CompilationStatus::NoError.is_ok());
        assert!(!CompilationStatus::QuotaExceeded.is_ok());
        assert!(!CompilationStatus::PolicyViolation.is_ok());
        assert!(!CompilationStatus::SourceError.is_ok());
        assert!(!CompilationStatus::CompilerError.is_ok());
    }

    #[test]
    fn only_compiler_error_is_internal() {
        assert!(CompilationStatus::CompilerError.is_internal());
        assert!(!CompilationStatus::SourceError.is_internal());
    }
}
