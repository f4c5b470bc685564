//! Error types for askdb.
//!
//! Defines the main error enum used throughout the library. Validation
//! rejections and execution failures are not errors in this sense: they are
//! ordinary turn outcomes carried by [`crate::safety::Verdict`] and
//! [`crate::exec::ExecutionError`] respectively.

use thiserror::Error;

/// Main error type for askdb operations.
#[derive(Error, Debug)]
pub enum AskdbError {
    /// LLM API errors (auth, rate limits, unusable responses, etc.)
    #[error("LLM error: {0}")]
    Llm(String),

    /// Configuration errors (invalid config file, bad endpoint URL, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Audit log storage errors. Operational only; never shown to the
    /// end user as a query outcome.
    #[error("Audit error: {0}")]
    Audit(String),

    /// Session errors (unknown session, next-page before any query, etc.)
    #[error("Session error: {0}")]
    Session(String),
}

impl AskdbError {
    /// Creates an LLM error with the given message.
    pub fn llm(msg: impl Into<String>) -> Self {
        Self::Llm(msg.into())
    }

    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates an audit log error with the given message.
    pub fn audit(msg: impl Into<String>) -> Self {
        Self::Audit(msg.into())
    }

    /// Creates a session error with the given message.
    pub fn session(msg: impl Into<String>) -> Self {
        Self::Session(msg.into())
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Llm(_) => "LLM Error",
            Self::Config(_) => "Configuration Error",
            Self::Audit(_) => "Audit Error",
            Self::Session(_) => "Session Error",
        }
    }
}

/// Result type alias using AskdbError.
pub type Result<T> = std::result::Result<T, AskdbError>;
