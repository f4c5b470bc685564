//! Response parsing for LLM outputs.
//!
//! Extracts the SQL statement from model replies that may wrap it in
//! markdown code blocks.

/// Extracts SQL from a model reply.
///
/// Looks for a ```sql fenced block first, then a bare ``` block, and falls
/// back to the trimmed reply text when no fence is present. If multiple
/// blocks exist, the first one wins.
pub fn extract_sql(response: &str) -> String {
    if let Some(sql) = extract_code_block(response, "sql") {
        return sql.trim().to_string();
    }

    if let Some(sql) = extract_code_block(response, "") {
        return sql.trim().to_string();
    }

    response.trim().to_string()
}

/// Extracts content from a markdown code block with the specified language.
///
/// Pass an empty string for `lang` to match blocks without a language
/// specifier.
fn extract_code_block(text: &str, lang: &str) -> Option<String> {
    let start_pattern = if lang.is_empty() {
        "```".to_string()
    } else {
        format!("```{}", lang)
    };

    let start_idx = text.find(&start_pattern)?;

    // Find the newline after the opening fence
    let content_start = text[start_idx + start_pattern.len()..]
        .find('\n')
        .map(|i| start_idx + start_pattern.len() + i + 1)?;

    // For generic blocks, text between ``` and the newline means the block
    // actually carries a language specifier.
    if lang.is_empty() {
        let after_fence = &text[start_idx + 3..content_start - 1];
        if !after_fence.trim().is_empty() {
            return None;
        }
    }

    let end_idx = text[content_start..].find("```")?;

    Some(text[content_start..content_start + end_idx].to_string())
}
