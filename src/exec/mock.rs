//! Mock query services for testing.
//!
//! Provide in-memory stand-ins for the remote query service so the pipeline
//! can be exercised without a network.

use async_trait::async_trait;
use std::time::Duration;

use super::{ColumnInfo, ExecutionError, QueryService, ResultSet, SchemaColumn, SchemaInfo, Value};

/// A mock query service that returns a canned result set.
#[derive(Debug, Clone)]
pub struct MockQueryService {
    result: ResultSet,
    schema: SchemaInfo,
    delay: Option<Duration>,
}

/// A two-column `users` table matching the default mock result.
fn default_schema() -> SchemaInfo {
    let mut schema = SchemaInfo::default();
    schema.tables.insert(
        "users".to_string(),
        vec![
            SchemaColumn {
                name: "id".to_string(),
                data_type: "integer".to_string(),
            },
            SchemaColumn {
                name: "name".to_string(),
                data_type: "text".to_string(),
            },
        ],
    );
    schema
}

impl MockQueryService {
    /// Creates a mock service returning a small default result.
    pub fn new() -> Self {
        let columns = vec![
            ColumnInfo::new("id", "integer"),
            ColumnInfo::new("name", "text"),
        ];
        let rows = vec![
            vec![Value::Int(1), Value::from("Alice")],
            vec![Value::Int(2), Value::from("Bob")],
        ];
        Self {
            result: ResultSet::with_data(columns, rows),
            schema: default_schema(),
            delay: None,
        }
    }

    /// Creates a mock service returning the given result set.
    pub fn with_result(result: ResultSet) -> Self {
        Self {
            result,
            schema: default_schema(),
            delay: None,
        }
    }

    /// Replaces the schema reported by the mock.
    pub fn with_schema(mut self, schema: SchemaInfo) -> Self {
        self.schema = schema;
        self
    }

    /// Creates a mock service returning `n` numbered rows, for pagination
    /// scenarios.
    pub fn with_numbered_rows(n: usize) -> Self {
        let columns = vec![ColumnInfo::new("n", "integer")];
        let rows = (0..n).map(|i| vec![Value::Int(i as i64)]).collect();
        Self::with_result(ResultSet::with_data(columns, rows))
    }

    /// Adds an artificial response delay, for timeout scenarios.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

impl Default for MockQueryService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl QueryService for MockQueryService {
    async fn run_sql(&self, _sql: &str) -> Result<ResultSet, ExecutionError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.result.clone())
    }

    async fn fetch_schema(&self) -> Result<SchemaInfo, ExecutionError> {
        Ok(self.schema.clone())
    }
}

/// A query service that always fails with a fixed error.
#[derive(Debug, Clone)]
pub struct FailingQueryService {
    error: ExecutionError,
}

impl FailingQueryService {
    /// Creates a service failing with the given error.
    pub fn new(error: ExecutionError) -> Self {
        Self { error }
    }
}

#[async_trait]
impl QueryService for FailingQueryService {
    async fn run_sql(&self, _sql: &str) -> Result<ResultSet, ExecutionError> {
        Err(self.error.clone())
    }

    async fn fetch_schema(&self) -> Result<SchemaInfo, ExecutionError> {
        Err(self.error.clone())
    }
}
