//! Prompt construction for SQL generation requests.
//!
//! Builds the system prompt with schema context and few-shot examples.

/// System prompt template for the SQL generator.
const SYSTEM_PROMPT_TEMPLATE: &str = r#"You are a SQL assistant for a MySQL database. Generate a SQL query that answers the user's question.

DATABASE SCHEMA:
{schema}

INSTRUCTIONS:
- Generate only a single read-only statement (SELECT, SHOW, DESCRIBE, or EXPLAIN)
- Return ONLY the SQL query, no explanations
- Never generate INSERT, UPDATE, DELETE, DROP, or any other write statement
- If the question cannot be answered with the schema, say so instead of guessing

OUTPUT FORMAT:
Return the SQL query wrapped in ```sql code blocks."#;

/// Few-shot examples appended after the schema, mirroring the kinds of
/// questions users actually ask.
const FEW_SHOT_EXAMPLES: &str = r#"EXAMPLES:
Q: Show me all users
```sql
SELECT * FROM users
```
Q: How many orders were placed last month?
```sql
SELECT COUNT(*) FROM orders WHERE created_at >= DATE_SUB(CURDATE(), INTERVAL 1 MONTH)
```"#;

/// Builds the system prompt with the schema context injected.
///
/// An empty `schema_context` produces a prompt that still constrains the
/// model to read-only statements.
pub fn build_prompt(schema_context: &str) -> String {
    let schema = if schema_context.trim().is_empty() {
        "(no schema information available)"
    } else {
        schema_context
    };

    format!(
        "{}\n\n{}",
        SYSTEM_PROMPT_TEMPLATE.replace("{schema}", schema),
        FEW_SHOT_EXAMPLES
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_includes_schema() {
        let prompt = build_prompt("users(id, name, age)");
        assert!(prompt.contains("users(id, name, age)"));
        assert!(!prompt.contains("{schema}"));
    }

    #[test]
    fn test_prompt_without_schema() {
        let prompt = build_prompt("  ");
        assert!(prompt.contains("(no schema information available)"));
    }

    #[test]
    fn test_prompt_constrains_to_reads() {
        let prompt = build_prompt("");
        assert!(prompt.contains("read-only"));
        assert!(prompt.contains("Never generate INSERT"));
    }

    #[test]
    fn test_prompt_has_examples() {
        let prompt = build_prompt("");
        assert!(prompt.contains("EXAMPLES:"));
        assert!(prompt.contains("SELECT COUNT(*) FROM orders"));
    }
}
