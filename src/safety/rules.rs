//! Classification rules for candidate SQL.
//!
//! Rules are evaluated in order with first match winning: leading-keyword
//! allow-list, sensitive-column scan, then structural sanity. The whole
//! module is pure and total: no I/O, and no input can make it panic.

use regex::Regex;

use super::{RejectReason, Verdict, DEFAULT_SENSITIVE_COLUMNS};

/// Statements whose leading keyword is read-only.
const ALLOWED_KEYWORDS: &[&str] = &["SELECT", "SHOW", "DESCRIBE", "DESC", "EXPLAIN"];

/// Classifies candidate SQL strings against a configured sensitive-column list.
#[derive(Debug, Clone)]
pub struct Validator {
    sensitive_columns: Vec<String>,
    sensitive_pattern: Option<Regex>,
}

impl Default for Validator {
    fn default() -> Self {
        Self::new(
            DEFAULT_SENSITIVE_COLUMNS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        )
    }
}

impl Validator {
    /// Creates a validator that blocks the given column identifiers.
    ///
    /// An empty list disables the sensitive-field rule entirely.
    pub fn new(sensitive_columns: Vec<String>) -> Self {
        let sensitive_pattern = build_sensitive_pattern(&sensitive_columns);
        Self {
            sensitive_columns,
            sensitive_pattern,
        }
    }

    /// Returns the configured sensitive column identifiers.
    pub fn sensitive_columns(&self) -> &[String] {
        &self.sensitive_columns
    }

    /// Classifies a candidate SQL string.
    ///
    /// Pure function: no side effects, and total over arbitrary text.
    pub fn validate(&self, sql: &str) -> Verdict {
        let trimmed = sql.trim();

        if !is_allowed_statement(trimmed) {
            return Verdict::Rejected(RejectReason::WriteOperation);
        }

        if let Some(pattern) = &self.sensitive_pattern {
            if pattern.is_match(trimmed) {
                return Verdict::Rejected(RejectReason::SensitiveField);
            }
        }

        if !is_structurally_sound(trimmed) {
            return Verdict::Rejected(RejectReason::Malformed);
        }

        Verdict::Ok
    }
}

/// Builds a case-insensitive word-boundary pattern over the column list.
///
/// Identifiers are regex-escaped, so names like `credit_card` match literally.
fn build_sensitive_pattern(columns: &[String]) -> Option<Regex> {
    let alternates: Vec<String> = columns
        .iter()
        .map(|c| c.trim())
        .filter(|c| !c.is_empty())
        .map(regex::escape)
        .collect();

    if alternates.is_empty() {
        return None;
    }

    let pattern = format!(r"(?i)\b(?:{})\b", alternates.join("|"));
    // Escaped alternates over a fixed template always compile.
    Regex::new(&pattern).ok()
}

/// Checks the leading keyword against the read-only allow-list.
///
/// Empty input and unrecognized keywords both fail: default-deny means an
/// obfuscated or novel write statement is rejected without being recognized.
fn is_allowed_statement(sql: &str) -> bool {
    let keyword: String = sql
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .collect::<String>()
        .to_ascii_uppercase();

    if keyword.is_empty() {
        return false;
    }

    ALLOWED_KEYWORDS.contains(&keyword.as_str())
}

/// Lightweight structural sanity check.
///
/// Verifies balanced single/double quotes, balanced parentheses, and the
/// absence of stacked statements (an unquoted `;` followed by further
/// tokens). Doubled quotes inside a quoted region are treated as escapes.
fn is_structurally_sound(sql: &str) -> bool {
    let mut chars = sql.chars().peekable();
    let mut in_single = false;
    let mut in_double = false;
    let mut depth: i64 = 0;
    let mut terminated = false;

    while let Some(c) = chars.next() {
        if terminated && !c.is_whitespace() && c != ';' {
            // Tokens after a statement terminator: stacked statements.
            return false;
        }

        match c {
            '\'' if !in_double => {
                if in_single && chars.peek() == Some(&'\'') {
                    chars.next();
                } else {
                    in_single = !in_single;
                }
            }
            '"' if !in_single => {
                if in_double && chars.peek() == Some(&'"') {
                    chars.next();
                } else {
                    in_double = !in_double;
                }
            }
            '(' if !in_single && !in_double => depth += 1,
            ')' if !in_single && !in_double => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
            ';' if !in_single && !in_double => terminated = true,
            _ => {}
        }
    }

    !in_single && !in_double && depth == 0
}
