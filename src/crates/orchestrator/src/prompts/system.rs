//! Turn-time system message construction.

use crate::error::Result;
use crate::prompts::manager::{placeholder_regex, PromptManager};
use flowgraph::Message;
use serde_json::Value;
use std::collections::HashMap;

/// Build the [`Message::system`] for an agent node.
///
/// Every `{name}` in the cached template with `name` present in
/// `prompt_vars` is substituted: null becomes the empty string, maps and
/// lists become pretty-printed JSON (2-space indent, non-ASCII preserved),
/// scalars their plain string form. Names not in `prompt_vars` stay as-is.
///
/// Substitution is a single pass; substituted content is never re-scanned
/// for further `{...}` tokens.
pub fn build_system_message(
    prompts: &PromptManager,
    prompt_cache_key: &str,
    prompt_vars: &HashMap<String, Value>,
) -> Result<Message> {
    let template = prompts.get_prompt_by_key(prompt_cache_key)?;

    let rendered = placeholder_regex()
        .replace_all(&template, |caps: &regex::Captures<'_>| {
            let name = &caps[1];
            match prompt_vars.get(name) {
                Some(value) => render_value(value),
                None => caps[0].to_string(),
            }
        })
        .into_owned();

    tracing::debug!(
        key = prompt_cache_key,
        vars = prompt_vars.len(),
        length = rendered.len(),
        "Built system message"
    );

    Ok(Message::system(rendered))
}

fn render_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Object(_) | Value::Array(_) => {
            serde_json::to_string_pretty(value).unwrap_or_default()
        }
        other => other.to_string(),
    }
}
