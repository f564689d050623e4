//! Turn command outcomes into MCP tool results

use crate::filter::clean;
use crate::tools::CommandKind;
use design_mcp_core::{Delivery, DesignError, Result};
use serde_json::{Value, json};

fn text_content(text: String, is_error: bool) -> Value {
    let mut result = json!({ "content": [{ "type": "text", "text": text }] });
    if is_error {
        result["isError"] = Value::Bool(true);
    }
    result
}

/// Render the outcome of one command as a `tools/call` result
pub fn tool_result(command: &str, kind: CommandKind, outcome: Result<Value>) -> Value {
    match outcome {
        Ok(payload) => text_content(success_text(payload), false),
        Err(err) => text_content(failure_text(command, kind, &err), true),
    }
}

fn success_text(payload: Value) -> String {
    match clean(payload) {
        Value::Null => "Done.".to_string(),
        Value::String(s) => s,
        other => serde_json::to_string_pretty(&other).unwrap_or_else(|_| other.to_string()),
    }
}

/// Human-readable failure that says whether the document may have changed
pub fn failure_text(command: &str, kind: CommandKind, err: &DesignError) -> String {
    match err.delivery() {
        Delivery::NotApplied => format!(
            "Command '{}' was not sent: {}. Nothing was changed in the document.",
            command, err
        ),
        Delivery::Rejected => match err {
            DesignError::Application { message, .. } => {
                format!("The application rejected '{}': {}", command, message)
            }
            other => format!("Command '{}' failed: {}", command, other),
        },
        Delivery::Unknown => match kind {
            CommandKind::Read => format!(
                "Command '{}' did not complete: {}. It only reads the document, so it is safe to retry.",
                command, err
            ),
            CommandKind::Mutation => format!(
                "Command '{}' did not complete: {}. The change may or may not have been applied; check the document before retrying.",
                command, err
            ),
        },
    }
}
