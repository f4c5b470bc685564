//! Append-only audit log for processed queries.
//!
//! Every candidate query that enters the pipeline produces exactly one
//! entry here, whatever its outcome. Entries are never mutated or deleted;
//! the log is the audit trail. Storage is SQLite via sqlx, safe for
//! concurrent appenders through a single pool.

use crate::error::{AskdbError, Result};
use crate::exec::ExecutionErrorKind;
use crate::safety::RejectReason;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::FromRow;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::{error, info, warn};

/// Final outcome of one processed candidate query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Validated and executed; rows returned.
    Ok,
    /// Rejected: not a read-only statement.
    RejectedWrite,
    /// Rejected: referenced a sensitive column.
    RejectedSensitive,
    /// Rejected: structurally unsound.
    RejectedMalformed,
    /// Execution timed out.
    Timeout,
    /// Query service unreachable.
    ConnectionFailed,
    /// Query service response unusable.
    MalformedResponse,
    /// Turn cancelled before completion.
    Cancelled,
    /// Stored outcome text not recognized by this version. Never written;
    /// only read back from rows produced by a newer or corrupted log.
    Unknown,
}

impl Outcome {
    /// Stable identifier stored in the log.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::RejectedWrite => "rejected_write",
            Self::RejectedSensitive => "rejected_sensitive",
            Self::RejectedMalformed => "rejected_malformed",
            Self::Timeout => "timeout",
            Self::ConnectionFailed => "connection_failed",
            Self::MalformedResponse => "malformed_response",
            Self::Cancelled => "cancelled",
            Self::Unknown => "unknown",
        }
    }

    /// Maps stored text back to an outcome. Unrecognized text must not
    /// masquerade as any real outcome, least of all a successful one.
    fn parse(s: &str) -> Self {
        match s {
            "ok" => Self::Ok,
            "rejected_write" => Self::RejectedWrite,
            "rejected_sensitive" => Self::RejectedSensitive,
            "rejected_malformed" => Self::RejectedMalformed,
            "timeout" => Self::Timeout,
            "connection_failed" => Self::ConnectionFailed,
            "malformed_response" => Self::MalformedResponse,
            "cancelled" => Self::Cancelled,
            _ => Self::Unknown,
        }
    }

    /// Returns true for outcomes where the statement was never executed.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::RejectedWrite | Self::RejectedSensitive | Self::RejectedMalformed
        )
    }
}

impl From<RejectReason> for Outcome {
    fn from(reason: RejectReason) -> Self {
        match reason {
            RejectReason::WriteOperation => Self::RejectedWrite,
            RejectReason::SensitiveField => Self::RejectedSensitive,
            RejectReason::Malformed => Self::RejectedMalformed,
        }
    }
}

impl From<ExecutionErrorKind> for Outcome {
    fn from(kind: ExecutionErrorKind) -> Self {
        match kind {
            ExecutionErrorKind::Timeout => Self::Timeout,
            ExecutionErrorKind::ConnectionFailed => Self::ConnectionFailed,
            ExecutionErrorKind::MalformedResponse => Self::MalformedResponse,
            ExecutionErrorKind::Cancelled => Self::Cancelled,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One audit record of a processed query attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: i64,
    pub session_id: String,
    pub sql: String,
    pub outcome: Outcome,
    pub execution_time_ms: i64,
    pub row_count: i64,
    pub error_message: Option<String>,
    pub created_at: String,
}

/// Fields of an entry about to be appended.
#[derive(Debug, Clone)]
pub struct NewAuditEntry {
    pub session_id: String,
    pub sql: String,
    pub outcome: Outcome,
    pub execution_time_ms: i64,
    pub row_count: i64,
    pub error_message: Option<String>,
}

/// Raw database row for an audit entry.
#[derive(Debug, Clone, FromRow)]
struct AuditEntryRow {
    id: i64,
    session_id: String,
    sql: String,
    outcome: String,
    execution_time_ms: i64,
    row_count: i64,
    error_message: Option<String>,
    created_at: String,
}

impl From<AuditEntryRow> for AuditEntry {
    fn from(row: AuditEntryRow) -> Self {
        Self {
            id: row.id,
            session_id: row.session_id,
            sql: row.sql,
            outcome: Outcome::parse(&row.outcome),
            execution_time_ms: row.execution_time_ms,
            row_count: row.row_count,
            error_message: row.error_message,
            created_at: row.created_at,
        }
    }
}

/// Filter options for reading the audit log.
#[derive(Debug, Clone, Default)]
pub struct AuditFilter {
    /// Restrict to one session.
    pub session_id: Option<String>,
    /// Entries created at or after this timestamp (`YYYY-MM-DD HH:MM:SS`).
    pub since: Option<String>,
    /// Entries created before this timestamp (`YYYY-MM-DD HH:MM:SS`).
    pub until: Option<String>,
    /// Maximum number of entries returned (newest first).
    pub limit: Option<i64>,
}

/// The durable query log.
pub struct AuditLog {
    pool: SqlitePool,
}

impl AuditLog {
    /// Opens or creates the audit database at the given path.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                AskdbError::audit(format!("Failed to create audit directory: {e}"))
            })?;
        }

        let conn_str = format!("sqlite:{}?mode=rwc", path.display());
        let options = SqliteConnectOptions::from_str(&conn_str)
            .map_err(|e| AskdbError::audit(format!("Invalid audit database path: {e}")))?
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5))
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(options)
            .await
            .map_err(|e| AskdbError::audit(format!("Failed to open audit database: {e}")))?;

        ensure_schema(&pool).await?;
        info!("Audit log opened at {}", path.display());

        Ok(Self { pool })
    }

    /// Opens an in-memory audit log, for tests.
    pub async fn open_in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| AskdbError::audit(format!("Failed to open audit database: {e}")))?;

        ensure_schema(&pool).await?;
        Ok(Self { pool })
    }

    /// Returns the default audit database path for the current platform.
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| AskdbError::audit("Could not determine config directory"))?;
        Ok(config_dir.join("askdb").join("audit.db"))
    }

    /// Appends one entry to the log.
    ///
    /// Retried once on failure; a second failure is reported on the
    /// operational log and returned. Callers that have already produced a
    /// user-facing result must not let this error overwrite it.
    pub async fn record(&self, entry: &NewAuditEntry) -> Result<i64> {
        match self.insert(entry).await {
            Ok(id) => Ok(id),
            Err(first) => {
                warn!("Audit append failed, retrying once: {first}");
                match self.insert(entry).await {
                    Ok(id) => Ok(id),
                    Err(second) => {
                        error!("Audit append failed after retry: {second}");
                        Err(second)
                    }
                }
            }
        }
    }

    async fn insert(&self, entry: &NewAuditEntry) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO audit_log
            (session_id, sql, outcome, execution_time_ms, row_count, error_message)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&entry.session_id)
        .bind(&entry.sql)
        .bind(entry.outcome.as_str())
        .bind(entry.execution_time_ms)
        .bind(entry.row_count)
        .bind(&entry.error_message)
        .execute(&self.pool)
        .await
        .map_err(|e| AskdbError::audit(format!("Failed to append audit entry: {e}")))?;

        Ok(result.last_insert_rowid())
    }

    /// Lists entries matching the filter, newest first.
    pub async fn list(&self, filter: &AuditFilter) -> Result<Vec<AuditEntry>> {
        let mut query = String::from(
            r#"
            SELECT id, session_id, sql, outcome,
                   execution_time_ms, row_count, error_message, created_at
            FROM audit_log
            WHERE 1=1
            "#,
        );

        if filter.session_id.is_some() {
            query.push_str(" AND session_id = ?");
        }
        if filter.since.is_some() {
            query.push_str(" AND created_at >= ?");
        }
        if filter.until.is_some() {
            query.push_str(" AND created_at < ?");
        }

        query.push_str(" ORDER BY id DESC");

        if filter.limit.is_some() {
            query.push_str(" LIMIT ?");
        }

        let mut sqlx_query = sqlx::query_as::<_, AuditEntryRow>(&query);

        if let Some(ref session) = filter.session_id {
            sqlx_query = sqlx_query.bind(session);
        }
        if let Some(ref since) = filter.since {
            sqlx_query = sqlx_query.bind(since);
        }
        if let Some(ref until) = filter.until {
            sqlx_query = sqlx_query.bind(until);
        }
        if let Some(limit) = filter.limit {
            sqlx_query = sqlx_query.bind(limit);
        }

        let rows = sqlx_query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AskdbError::audit(format!("Failed to list audit entries: {e}")))?;

        Ok(rows.into_iter().map(AuditEntry::from).collect())
    }

    /// Returns the total number of entries.
    pub async fn count(&self) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM audit_log")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AskdbError::audit(format!("Failed to count audit entries: {e}")))?;

        Ok(count)
    }
}

/// Creates the audit table if it does not exist.
///
/// Intentionally no UPDATE or DELETE paths exist anywhere in this module.
async fn ensure_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS audit_log (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            session_id TEXT NOT NULL,
            sql TEXT NOT NULL,
            outcome TEXT NOT NULL,
            execution_time_ms INTEGER NOT NULL DEFAULT 0,
            row_count INTEGER NOT NULL DEFAULT 0,
            error_message TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(|e| AskdbError::audit(format!("Failed to create audit table: {e}")))?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_audit_created ON audit_log (created_at)")
        .execute(pool)
        .await
        .map_err(|e| AskdbError::audit(format!("Failed to create audit index: {e}")))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(session: &str, sql: &str, outcome: Outcome) -> NewAuditEntry {
        NewAuditEntry {
            session_id: session.to_string(),
            sql: sql.to_string(),
            outcome,
            execution_time_ms: 12,
            row_count: if outcome == Outcome::Ok { 3 } else { 0 },
            error_message: None,
        }
    }

    #[tokio::test]
    async fn test_record_and_list() {
        let log = AuditLog::open_in_memory().await.unwrap();

        let id = log
            .record(&entry("s1", "SELECT 1", Outcome::Ok))
            .await
            .unwrap();
        assert!(id > 0);

        let entries = log.list(&AuditFilter::default()).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].sql, "SELECT 1");
        assert_eq!(entries[0].outcome, Outcome::Ok);
        assert_eq!(entries[0].row_count, 3);
        assert!(!entries[0].created_at.is_empty());
    }

    #[tokio::test]
    async fn test_entries_append_in_order_newest_first() {
        let log = AuditLog::open_in_memory().await.unwrap();

        log.record(&entry("s1", "SELECT 1", Outcome::Ok))
            .await
            .unwrap();
        log.record(&entry("s1", "DROP TABLE t", Outcome::RejectedWrite))
            .await
            .unwrap();

        let entries = log.list(&AuditFilter::default()).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].sql, "DROP TABLE t");
        assert_eq!(entries[1].sql, "SELECT 1");
    }

    #[tokio::test]
    async fn test_filter_by_session() {
        let log = AuditLog::open_in_memory().await.unwrap();

        log.record(&entry("s1", "SELECT 1", Outcome::Ok))
            .await
            .unwrap();
        log.record(&entry("s2", "SELECT 2", Outcome::Ok))
            .await
            .unwrap();

        let filter = AuditFilter {
            session_id: Some("s1".to_string()),
            ..Default::default()
        };
        let entries = log.list(&filter).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].session_id, "s1");
    }

    #[tokio::test]
    async fn test_filter_by_time_range() {
        let log = AuditLog::open_in_memory().await.unwrap();
        log.record(&entry("s1", "SELECT 1", Outcome::Ok))
            .await
            .unwrap();

        // Everything was written "now"; a window in the past excludes it
        // and an open window from the past includes it.
        let past_only = AuditFilter {
            until: Some("2000-01-01 00:00:00".to_string()),
            ..Default::default()
        };
        assert!(log.list(&past_only).await.unwrap().is_empty());

        let open_window = AuditFilter {
            since: Some("2000-01-01 00:00:00".to_string()),
            ..Default::default()
        };
        assert_eq!(log.list(&open_window).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_limit() {
        let log = AuditLog::open_in_memory().await.unwrap();
        for i in 0..5 {
            log.record(&entry("s1", &format!("SELECT {i}"), Outcome::Ok))
                .await
                .unwrap();
        }

        let filter = AuditFilter {
            limit: Some(2),
            ..Default::default()
        };
        let entries = log.list(&filter).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].sql, "SELECT 4");
    }

    #[tokio::test]
    async fn test_count() {
        let log = AuditLog::open_in_memory().await.unwrap();
        assert_eq!(log.count().await.unwrap(), 0);
        log.record(&entry("s1", "SELECT 1", Outcome::Ok))
            .await
            .unwrap();
        assert_eq!(log.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.db");

        {
            let log = AuditLog::open(&path).await.unwrap();
            log.record(&entry("s1", "SELECT 1", Outcome::Ok))
                .await
                .unwrap();
        }

        let log = AuditLog::open(&path).await.unwrap();
        assert_eq!(log.count().await.unwrap(), 1);
    }

    #[test]
    fn test_outcome_round_trip() {
        for outcome in [
            Outcome::Ok,
            Outcome::RejectedWrite,
            Outcome::RejectedSensitive,
            Outcome::RejectedMalformed,
            Outcome::Timeout,
            Outcome::ConnectionFailed,
            Outcome::MalformedResponse,
            Outcome::Cancelled,
            Outcome::Unknown,
        ] {
            assert_eq!(Outcome::parse(outcome.as_str()), outcome);
        }
    }

    #[test]
    fn test_unrecognized_outcome_text_is_not_ok() {
        assert_eq!(Outcome::parse("partial_success"), Outcome::Unknown);
        assert_eq!(Outcome::parse(""), Outcome::Unknown);
        assert!(!Outcome::Unknown.is_rejection());
    }

    #[test]
    fn test_outcome_from_reject_reason() {
        assert_eq!(
            Outcome::from(RejectReason::WriteOperation),
            Outcome::RejectedWrite
        );
        assert_eq!(
            Outcome::from(RejectReason::SensitiveField),
            Outcome::RejectedSensitive
        );
        assert!(Outcome::RejectedMalformed.is_rejection());
        assert!(!Outcome::Timeout.is_rejection());
    }

    #[test]
    fn test_outcome_from_execution_error_kind() {
        assert_eq!(Outcome::from(ExecutionErrorKind::Timeout), Outcome::Timeout);
        assert_eq!(
            Outcome::from(ExecutionErrorKind::Cancelled),
            Outcome::Cancelled
        );
    }
}
