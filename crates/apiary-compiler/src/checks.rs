use apiary_types::{CellCode, CodePrivileges, CompilationStatus, NetworkPrivilege};

/// The outcome of a single source check.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CheckVerdict {
    Pass,
    Fail {
        status: CompilationStatus,
        reason: String,
    },
}

impl CheckVerdict {
    pub fn fail(status: CompilationStatus, reason: impl Into<String>) -> Self {
        Self::Fail {
            status,
            reason: reason.into(),
        }
    }

    pub fn is_pass(&self) -> bool {
        matches!(self, Self::Pass)
    }
}

/// One validation rule the gate runs before transforming source.
///
/// Checks are pure: they look at the source and the cell's privileges and
/// produce a verdict, nothing else.
pub trait SourceCheck: Send + Sync {
    fn name(&self) -> &'static str;

    fn evaluate(&self, source: &CellCode, policy: &CodePrivileges) -> CheckVerdict;
}

/// The standard pipeline: shape, then size, then network policy.
pub fn default_checks() -> Vec<Box<dyn SourceCheck>> {
    vec![
        Box::new(MarkupCheck),
        Box::new(QuotaCheck),
        Box::new(NetworkAccessCheck),
    ]
}

// ---------------------------------------------------------------------------
// MarkupCheck
// ---------------------------------------------------------------------------

/// Rejects source that cannot be markup at all: empty input, or control
/// characters other than newline, carriage return, and tab.
pub struct MarkupCheck;

impl SourceCheck for MarkupCheck {
    fn name(&self) -> &'static str {
        "markup"
    }

    fn evaluate(&self, source: &CellCode, _policy: &CodePrivileges) -> CheckVerdict {
        if source.markup.trim().is_empty() {
            return CheckVerdict::fail(CompilationStatus::SourceError, "source is empty");
        }
        if let Some(ch) = source
            .markup
            .chars()
            .find(|ch| ch.is_control() && !matches!(ch, '\n' | '\r' | '\t'))
        {
            return CheckVerdict::fail(
                CompilationStatus::SourceError,
                format!("control character {:?} in source", ch),
            );
        }
        CheckVerdict::Pass
    }
}

// ---------------------------------------------------------------------------
// QuotaCheck
// ---------------------------------------------------------------------------

/// Enforces the cell's character quota tier.
pub struct QuotaCheck;

impl SourceCheck for QuotaCheck {
    fn name(&self) -> &'static str {
        "quota"
    }

    fn evaluate(&self, source: &CellCode, policy: &CodePrivileges) -> CheckVerdict {
        let count = source.char_count();
        let max = policy.quota.max_chars();
        if count > max {
            return CheckVerdict::fail(
                CompilationStatus::QuotaExceeded,
                format!("source is {count} characters, quota {} allows {max}", policy.quota),
            );
        }
        CheckVerdict::Pass
    }
}

// ---------------------------------------------------------------------------
// NetworkAccessCheck
// ---------------------------------------------------------------------------

/// Enforces the cell's network tier against external references in the
/// source.
///
/// The scan is lexical: `http://` and `https://` anywhere, plus
/// protocol-relative `//` directly after an attribute quote. Cells with
/// [`NetworkPrivilege::All`] skip the scan entirely.
pub struct NetworkAccessCheck;

impl NetworkAccessCheck {
    fn has_insecure_reference(markup: &str) -> bool {
        markup.contains("http://")
    }

    fn has_any_reference(markup: &str) -> bool {
        markup.contains("http://")
            || markup.contains("https://")
            || markup.contains("\"//")
            || markup.contains("'//")
    }
}

impl SourceCheck for NetworkAccessCheck {
    fn name(&self) -> &'static str {
        "network"
    }

    fn evaluate(&self, source: &CellCode, policy: &CodePrivileges) -> CheckVerdict {
        let markup = source.markup.to_ascii_lowercase();
        match policy.network {
            NetworkPrivilege::All => CheckVerdict::Pass,
            NetworkPrivilege::Restricted => {
                if Self::has_insecure_reference(&markup) {
                    CheckVerdict::fail(
                        CompilationStatus::PolicyViolation,
                        "insecure http reference under restricted network privilege",
                    )
                } else {
                    CheckVerdict::Pass
                }
            }
            NetworkPrivilege::None => {
                if Self::has_any_reference(&markup) {
                    CheckVerdict::fail(
                        CompilationStatus::PolicyViolation,
                        "external reference without network privilege",
                    )
                } else {
                    CheckVerdict::Pass
                }
            }
        }
    }
}
