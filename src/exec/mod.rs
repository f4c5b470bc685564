//! Execution client for the remote query service.
//!
//! Provides a trait-based interface for running already-validated SQL
//! against the external query service, so the pipeline can be tested with
//! fakes instead of a live service.

mod mock;
mod remote;
mod types;

pub use mock::{FailingQueryService, MockQueryService};
pub use remote::{RemoteQueryService, RemoteServiceConfig};
pub use types::{ColumnInfo, ResultSet, Row, SchemaColumn, SchemaInfo, Value};

use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

/// What went wrong while executing a statement remotely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExecutionErrorKind {
    /// The service did not answer within the configured deadline.
    Timeout,
    /// The service could not be reached.
    ConnectionFailed,
    /// The service answered, but the response was not usable
    /// (unparseable body, or a structured error payload).
    MalformedResponse,
    /// The surrounding turn was cancelled before a result arrived.
    Cancelled,
}

impl ExecutionErrorKind {
    /// Stable identifier used in audit log entries.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::ConnectionFailed => "connection_failed",
            Self::MalformedResponse => "malformed_response",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ExecutionErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A typed execution failure from the query service boundary.
///
/// Not a process error: a failed execution is an ordinary turn outcome that
/// is reported to the user and written to the audit log.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{kind}: {detail}")]
pub struct ExecutionError {
    pub kind: ExecutionErrorKind,
    pub detail: String,
}

impl ExecutionError {
    /// Creates an execution error of the given kind.
    pub fn new(kind: ExecutionErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }

    /// Creates a timeout error.
    pub fn timeout(detail: impl Into<String>) -> Self {
        Self::new(ExecutionErrorKind::Timeout, detail)
    }

    /// Creates a connection failure error.
    pub fn connection_failed(detail: impl Into<String>) -> Self {
        Self::new(ExecutionErrorKind::ConnectionFailed, detail)
    }

    /// Creates a malformed-response error.
    pub fn malformed_response(detail: impl Into<String>) -> Self {
        Self::new(ExecutionErrorKind::MalformedResponse, detail)
    }

    /// Creates a cancellation error.
    pub fn cancelled(detail: impl Into<String>) -> Self {
        Self::new(ExecutionErrorKind::Cancelled, detail)
    }
}

/// Trait defining the interface to the remote query service.
///
/// Implementations send SQL text and return rows with column metadata, or a
/// typed [`ExecutionError`]. They must not retry: whether re-running an
/// arbitrary statement is safe under ambiguous partial failure is unknown.
#[async_trait]
pub trait QueryService: Send + Sync {
    /// Executes a SQL statement and returns the result set.
    async fn run_sql(&self, sql: &str) -> std::result::Result<ResultSet, ExecutionError>;

    /// Fetches the schema the service exposes, for grounding SQL generation.
    async fn fetch_schema(&self) -> std::result::Result<SchemaInfo, ExecutionError>;
}
