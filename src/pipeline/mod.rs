//! Pipeline orchestration.
//!
//! Composes the SQL generator, safety validator, execution client,
//! paginator, and audit log into one per-turn flow: a natural-language
//! question comes in, a first page of results (or a typed refusal or
//! failure) comes out, and exactly one audit entry is written whatever
//! happens.
//!
//! Turns within one session run strictly sequentially: the session lock is
//! held for the whole turn, so a session cannot race its own cursor or
//! interleave its own log entries. Distinct sessions proceed concurrently
//! and share only the audit log, which supports concurrent appends.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::audit::{AuditLog, NewAuditEntry, Outcome};
use crate::error::{AskdbError, Result};
use crate::exec::{ExecutionError, QueryService};
use crate::llm::SqlGenerator;
use crate::paginate::{Page, PageCursor, DEFAULT_PAGE_SIZE};
use crate::safety::{RejectReason, Validator, Verdict};

/// Default deadline for one query service call.
const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 8;

/// Outcome of one user turn, as seen by the caller.
#[derive(Debug)]
pub enum TurnResponse {
    /// The query ran; here is the first page of results.
    Page {
        /// The SQL that was executed.
        sql: String,
        /// First page of the new cursor.
        page: Page,
    },
    /// The candidate SQL was rejected by the safety validator.
    Rejected {
        /// The SQL that was refused.
        sql: String,
        /// Why it was refused.
        reason: RejectReason,
    },
    /// The query was allowed but execution failed.
    Failed {
        /// The SQL that was attempted.
        sql: String,
        /// The typed execution failure.
        error: ExecutionError,
    },
}

/// Per-session state.
///
/// One cursor is live per session at most; a new query replaces it and
/// drops the previous result set with it.
#[derive(Debug, Default)]
struct Session {
    cursor: Option<PageCursor>,
}

/// The query pipeline.
///
/// Cheap to share: hold it in an `Arc` and call from as many tasks as
/// there are sessions.
pub struct Pipeline {
    generator: Arc<dyn SqlGenerator>,
    service: Arc<dyn QueryService>,
    validator: Validator,
    audit: Arc<AuditLog>,
    page_size: usize,
    query_timeout: Duration,
    schema_context: OnceCell<String>,
    sessions: Mutex<HashMap<String, Arc<tokio::sync::Mutex<Session>>>>,
}

impl Pipeline {
    /// Creates a pipeline with default validator, page size, and timeout.
    pub fn new(
        generator: Arc<dyn SqlGenerator>,
        service: Arc<dyn QueryService>,
        audit: Arc<AuditLog>,
    ) -> Self {
        Self {
            generator,
            service,
            validator: Validator::default(),
            audit,
            page_size: DEFAULT_PAGE_SIZE,
            query_timeout: Duration::from_secs(DEFAULT_QUERY_TIMEOUT_SECS),
            schema_context: OnceCell::new(),
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Replaces the safety validator (e.g., with a custom sensitive list).
    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validator = validator;
        self
    }

    /// Sets the page size used for new cursors.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Sets the deadline for one query service call.
    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }

    /// Presets the schema description passed to the SQL generator,
    /// bypassing the fetch from the query service.
    pub fn with_schema_context(mut self, schema_context: impl Into<String>) -> Self {
        self.schema_context = OnceCell::new_with(Some(schema_context.into()));
        self
    }

    /// Returns the audit log for inspection surfaces.
    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    /// Processes one natural-language turn for the session.
    ///
    /// Generates candidate SQL, validates it, executes it when allowed, and
    /// opens a fresh cursor on success. An audit entry is written before
    /// this returns, whatever the outcome; an audit write failure is
    /// reported operationally and never alters the returned result.
    pub async fn ask(&self, question: &str, session_id: &str) -> Result<TurnResponse> {
        let session = self.session(session_id);
        let mut session = session.lock().await;

        let schema_context = self.schema_context().await;
        let sql = self
            .generator
            .generate_sql(question, schema_context)
            .await?;
        debug!(session_id, "Candidate SQL: {sql}");

        let start = Instant::now();
        let verdict = self.validator.validate(&sql);

        let response = match verdict {
            Verdict::Rejected(reason) => {
                info!(session_id, %reason, "Candidate query rejected");
                self.write_audit(
                    session_id,
                    &sql,
                    Outcome::from(reason),
                    start.elapsed(),
                    0,
                    Some(reason.user_message().to_string()),
                )
                .await;
                TurnResponse::Rejected { sql, reason }
            }
            Verdict::Ok => match self.execute_with_deadline(&sql).await {
                Ok(result) => {
                    let row_count = result.row_count();
                    let elapsed = start.elapsed();
                    info!(session_id, row_count, "Query executed");

                    let cursor = PageCursor::open(result, self.page_size);
                    let page = cursor.current_page();
                    session.cursor = Some(cursor);

                    self.write_audit(session_id, &sql, Outcome::Ok, elapsed, row_count as i64, None)
                        .await;
                    TurnResponse::Page { sql, page }
                }
                Err(error) => {
                    warn!(session_id, kind = %error.kind, "Query execution failed");
                    self.write_audit(
                        session_id,
                        &sql,
                        Outcome::from(error.kind),
                        start.elapsed(),
                        0,
                        Some(error.detail.clone()),
                    )
                    .await;
                    TurnResponse::Failed { sql, error }
                }
            },
        };

        Ok(response)
    }

    /// Advances the session's cursor and returns the next page.
    ///
    /// Advancing past the end returns an empty page; calling this before
    /// any successful query is a session error.
    pub async fn next_page(&self, session_id: &str) -> Result<Page> {
        let session = self.session(session_id);
        let mut session = session.lock().await;

        let cursor = session
            .cursor
            .as_mut()
            .ok_or_else(|| AskdbError::session("no active query to paginate"))?;

        Ok(cursor.advance())
    }

    /// Re-reads the session's current page without advancing.
    pub async fn current_page(&self, session_id: &str) -> Result<Page> {
        let session = self.session(session_id);
        let session = session.lock().await;

        let cursor = session
            .cursor
            .as_ref()
            .ok_or_else(|| AskdbError::session("no active query to paginate"))?;

        Ok(cursor.current_page())
    }

    /// Records a cancelled turn for audit completeness.
    ///
    /// A dropped turn future cannot write its own entry; the host that
    /// observed the disconnect calls this instead.
    pub async fn record_cancelled(&self, session_id: &str, sql: &str) {
        self.write_audit(
            session_id,
            sql,
            Outcome::Cancelled,
            Duration::ZERO,
            0,
            Some("session disconnected mid-turn".to_string()),
        )
        .await;
    }

    /// Drops a session's state (cursor and result set).
    pub fn end_session(&self, session_id: &str) {
        // Unwrap: the registry mutex is never held across await points.
        self.sessions.lock().unwrap().remove(session_id);
    }

    /// Returns the schema context for SQL generation, fetching it from the
    /// query service on first use.
    ///
    /// A failed fetch caches an empty context and is not retried; turns
    /// proceed ungrounded rather than fail.
    async fn schema_context(&self) -> &str {
        self.schema_context
            .get_or_init(|| async {
                match self.service.fetch_schema().await {
                    Ok(schema) => schema.to_prompt_context(),
                    Err(e) => {
                        warn!(kind = %e.kind, "Schema fetch failed, generating without schema");
                        String::new()
                    }
                }
            })
            .await
    }

    /// Returns the session handle, creating it on first use.
    fn session(&self, session_id: &str) -> Arc<tokio::sync::Mutex<Session>> {
        let mut sessions = self.sessions.lock().unwrap();
        sessions
            .entry(session_id.to_string())
            .or_default()
            .clone()
    }

    /// Runs the statement with the configured deadline.
    async fn execute_with_deadline(
        &self,
        sql: &str,
    ) -> std::result::Result<crate::exec::ResultSet, ExecutionError> {
        match tokio::time::timeout(self.query_timeout, self.service.run_sql(sql)).await {
            Ok(result) => result,
            Err(_) => Err(ExecutionError::timeout(format!(
                "no response after {:?}",
                self.query_timeout
            ))),
        }
    }

    /// Writes the turn's audit entry.
    ///
    /// The result the caller computed stands regardless; a failed append is
    /// an operational problem, not a user-facing one, and `record` has
    /// already retried and logged it.
    async fn write_audit(
        &self,
        session_id: &str,
        sql: &str,
        outcome: Outcome,
        elapsed: Duration,
        row_count: i64,
        error_message: Option<String>,
    ) {
        let entry = NewAuditEntry {
            session_id: session_id.to_string(),
            sql: sql.to_string(),
            outcome,
            execution_time_ms: elapsed.as_millis() as i64,
            row_count,
            error_message,
        };

        if self.audit.record(&entry).await.is_err() {
            warn!(session_id, "Turn completed but audit entry was not recorded");
        }
    }
}
