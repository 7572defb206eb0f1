//! Formatting of retrieved exemplars for prompt injection.

use crate::rag::search::RetrievedExample;

/// Literal injected when retrieval found nothing or failed.
pub const NO_EXAMPLES: &str = "(no relevant examples)";

/// Render retrieved examples as an ordered Markdown list.
///
/// ```text
/// - Example 1
///   - Tags : hypertension, recording
///   - User : I want to record my blood pressure
///   - Response sketch : Ask for systolic and diastolic ...
/// ```
pub fn format_retrieved_examples(results: &[RetrievedExample]) -> String {
    if results.is_empty() {
        return NO_EXAMPLES.to_string();
    }

    let mut lines = Vec::new();
    for (i, example) in results.iter().enumerate() {
        let tags = if example.tags.is_empty() {
            "none".to_string()
        } else {
            example.tags.join(", ")
        };
        lines.push(format!("- Example {}", i + 1));
        lines.push(format!("  - Tags : {tags}"));
        lines.push(format!("  - User : {}", example.user_input));
        lines.push(format!("  - Response sketch : {}", example.agent_response));
        if i + 1 < results.len() {
            lines.push(String::new());
        }
    }
    lines.join("\n")
}
