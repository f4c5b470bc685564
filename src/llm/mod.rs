//! SQL generation via an external language model.
//!
//! The model is an external collaborator consumed as a black box: a
//! question goes in, SQL text comes out. Whatever comes back is wholly
//! untrusted and always passes through the safety validator before it can
//! reach the query service.

pub mod mock;
pub mod openai;
pub mod parser;
pub mod prompt;

pub use mock::MockSqlGenerator;
pub use openai::{OpenAiConfig, OpenAiGenerator};
pub use parser::extract_sql;
pub use prompt::build_prompt;

use async_trait::async_trait;

use crate::error::Result;

/// Trait for collaborators that turn a natural-language question into SQL.
///
/// Implementations must be thread-safe (Send + Sync) so the pipeline can
/// serve concurrent sessions.
#[async_trait]
pub trait SqlGenerator: Send + Sync {
    /// Generates a candidate SQL statement for the question.
    ///
    /// `schema_context` describes the available tables and columns; pass an
    /// empty string when no schema information is available. The returned
    /// text is a candidate only: the caller must validate it before
    /// execution.
    async fn generate_sql(&self, question: &str, schema_context: &str) -> Result<String>;
}
