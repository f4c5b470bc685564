//! HTTP client for the remote query service.
//!
//! The query service is an external collaborator reached over a JSON
//! request/response channel: we send the SQL text, it runs the statement
//! against the database and answers with columns and rows, or with a
//! structured error. Transport failures are converted to typed
//! [`ExecutionError`]s and never retried here.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::{ColumnInfo, ExecutionError, QueryService, ResultSet, SchemaInfo, Value};
use crate::error::{AskdbError, Result};
use async_trait::async_trait;

/// Default timeout for query service requests.
const DEFAULT_TIMEOUT_SECS: u64 = 8;

/// Remote query service configuration.
#[derive(Debug, Clone)]
pub struct RemoteServiceConfig {
    /// Base URL of the query service; `/query` and `/schema` hang off it.
    pub endpoint: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl RemoteServiceConfig {
    /// Creates a new config for the given service base URL.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// URL for statement execution requests.
    pub fn query_url(&self) -> String {
        format!("{}/query", self.endpoint.trim_end_matches('/'))
    }

    /// URL for schema requests.
    pub fn schema_url(&self) -> String {
        format!("{}/schema", self.endpoint.trim_end_matches('/'))
    }
}

/// Execution client backed by the remote query service.
#[derive(Debug, Clone)]
pub struct RemoteQueryService {
    config: RemoteServiceConfig,
    client: Client,
}

impl RemoteQueryService {
    /// Creates a new client with the given configuration.
    pub fn new(config: RemoteServiceConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AskdbError::config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { config, client })
    }

    /// Converts a transport error into a typed execution error.
    fn map_request_error(error: reqwest::Error) -> ExecutionError {
        if error.is_timeout() {
            ExecutionError::timeout("query service did not respond in time")
        } else if error.is_connect() {
            ExecutionError::connection_failed(format!(
                "could not reach query service: {error}"
            ))
        } else {
            ExecutionError::connection_failed(format!("request failed: {error}"))
        }
    }
}

#[async_trait]
impl QueryService for RemoteQueryService {
    async fn run_sql(&self, sql: &str) -> std::result::Result<ResultSet, ExecutionError> {
        debug!("Sending statement to query service");

        let request = QueryRequest { sql };

        let response = self
            .client
            .post(self.config.query_url())
            .json(&request)
            .send()
            .await
            .map_err(Self::map_request_error)?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            ExecutionError::malformed_response(format!("failed to read response body: {e}"))
        })?;

        if !status.is_success() {
            return Err(ExecutionError::malformed_response(format!(
                "query service returned {status}: {body}"
            )));
        }

        let payload: QueryResponse = serde_json::from_str(&body).map_err(|e| {
            ExecutionError::malformed_response(format!("unparseable response: {e}"))
        })?;

        if let Some(error) = payload.error {
            return Err(ExecutionError::malformed_response(error));
        }

        Ok(convert_payload(payload))
    }

    async fn fetch_schema(&self) -> std::result::Result<SchemaInfo, ExecutionError> {
        debug!("Fetching schema from query service");

        let response = self
            .client
            .get(self.config.schema_url())
            .send()
            .await
            .map_err(Self::map_request_error)?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            ExecutionError::malformed_response(format!("failed to read response body: {e}"))
        })?;

        if !status.is_success() {
            return Err(ExecutionError::malformed_response(format!(
                "query service returned {status}: {body}"
            )));
        }

        serde_json::from_str(&body).map_err(|e| {
            ExecutionError::malformed_response(format!("unparseable schema response: {e}"))
        })
    }
}

/// Converts the wire payload into a [`ResultSet`].
fn convert_payload(payload: QueryResponse) -> ResultSet {
    let columns = payload
        .columns
        .into_iter()
        .map(|c| ColumnInfo::new(c.name, c.data_type.unwrap_or_default()))
        .collect();

    let rows = payload
        .rows
        .into_iter()
        .map(|row| row.into_iter().map(Value::from).collect())
        .collect();

    ResultSet::with_data(columns, rows)
}

// Wire types for the query service protocol.

#[derive(Debug, Serialize)]
struct QueryRequest<'a> {
    sql: &'a str,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    columns: Vec<WireColumn>,
    #[serde(default)]
    rows: Vec<Vec<serde_json::Value>>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireColumn {
    name: String,
    #[serde(default)]
    data_type: Option<String>,
}
