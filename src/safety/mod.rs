//! Query safety classification module.
//!
//! Classifies LLM-generated SQL as allowed or rejected before it reaches the
//! query service. Classification is pattern-level: an allow-list on the
//! leading keyword, a sensitive-column token scan, and a structural sanity
//! check. There is deliberately no SQL parser here; anything the rules do
//! not recognize is rejected, not guessed at.

mod rules;

pub use rules::Validator;

use std::fmt;

/// Default sensitive column identifiers blocked from appearing in queries.
pub const DEFAULT_SENSITIVE_COLUMNS: &[&str] = &["password", "salary", "ssn", "credit_card"];

/// Why a candidate query was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RejectReason {
    /// Leading keyword is not on the read-only allow-list. Covers every
    /// write statement and anything unrecognized (default-deny).
    WriteOperation,
    /// The text references a configured sensitive column.
    SensitiveField,
    /// Unbalanced quotes/parentheses or stacked statements.
    Malformed,
}

impl RejectReason {
    /// Stable identifier used in audit log entries.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WriteOperation => "rejected_write",
            Self::SensitiveField => "rejected_sensitive",
            Self::Malformed => "rejected_malformed",
        }
    }

    /// Short human-readable explanation for the refusal shown to the user.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::WriteOperation => {
                "Only read-only statements (SELECT, SHOW, DESCRIBE, EXPLAIN) are allowed."
            }
            Self::SensitiveField => "The query references a restricted column.",
            Self::Malformed => "The query is malformed and was not executed.",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WriteOperation => write!(f, "write operation"),
            Self::SensitiveField => write!(f, "sensitive field"),
            Self::Malformed => write!(f, "malformed"),
        }
    }
}

/// Result of classifying a candidate SQL string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// The statement is a recognized read and may be executed.
    Ok,
    /// The statement was rejected and must not be executed.
    Rejected(RejectReason),
}

impl Verdict {
    /// Returns true if the statement may be sent to the query service.
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Ok)
    }

    /// Returns the reject reason, if any.
    pub fn reject_reason(&self) -> Option<RejectReason> {
        match self {
            Self::Ok => None,
            Self::Rejected(reason) => Some(*reason),
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => write!(f, "ok"),
            Self::Rejected(reason) => write!(f, "rejected ({})", reason),
        }
    }
}
