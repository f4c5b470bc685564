//! Mock SQL generator for testing.
//!
//! Provides deterministic question-to-SQL mappings without API calls.

use async_trait::async_trait;

use crate::error::Result;
use crate::llm::parser::extract_sql;
use crate::llm::SqlGenerator;

/// Mock generator that returns canned SQL based on question patterns.
///
/// Used for unit testing and the `--mock` CLI mode.
#[derive(Debug, Clone, Default)]
pub struct MockSqlGenerator {
    /// Custom response mappings (pattern -> raw model reply).
    custom_responses: Vec<(String, String)>,
}

impl MockSqlGenerator {
    /// Creates a new mock generator with default responses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a custom response mapping.
    ///
    /// When the question contains `pattern`, the mock replies with
    /// `response` (which may include markdown fences, as a real model
    /// would).
    pub fn with_response(
        mut self,
        pattern: impl Into<String>,
        response: impl Into<String>,
    ) -> Self {
        self.custom_responses
            .push((pattern.into(), response.into()));
        self
    }

    fn mock_reply(&self, question: &str) -> String {
        let question_lower = question.to_lowercase();

        for (pattern, response) in &self.custom_responses {
            if question_lower.contains(&pattern.to_lowercase()) {
                return response.clone();
            }
        }

        if question_lower.contains("all users") || question_lower.contains("show users") {
            return "```sql\nSELECT * FROM users\n```".to_string();
        }

        if question_lower.contains("count") && question_lower.contains("orders") {
            return "```sql\nSELECT COUNT(*) FROM orders\n```".to_string();
        }

        if question_lower.contains("tables") {
            return "```sql\nSHOW TABLES\n```".to_string();
        }

        if question_lower.contains("delete") {
            // A model ignoring its instructions; the validator must catch it.
            return "```sql\nDELETE FROM users WHERE id = 1\n```".to_string();
        }

        if question_lower.contains("password") {
            return "```sql\nSELECT password FROM users\n```".to_string();
        }

        "```sql\nSELECT name, age FROM users WHERE age > 25\n```".to_string()
    }
}

#[async_trait]
impl SqlGenerator for MockSqlGenerator {
    async fn generate_sql(&self, question: &str, _schema_context: &str) -> Result<String> {
        Ok(extract_sql(&self.mock_reply(question)))
    }
}
