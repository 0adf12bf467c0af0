use serde_json::Value;

pub mod get_response;
pub mod send_message;

pub use get_response::{GET_RESPONSE, GetResponseTool};
pub use send_message::{SEND_MESSAGE, SendMessageConfig, SendMessageTool, send_message_tool};

pub fn extract_string_arg(args: &Value, key: &str) -> anyhow::Result<String> {
    args.get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| anyhow::anyhow!("Missing '{}' parameter", key))
        .map(|s| s.to_string())
}

pub fn extract_string_arg_opt(args: &Value, key: &str, default: &str) -> String {
    args.get(key)
        .and_then(|v| v.as_str())
        .unwrap_or(default)
        .to_string()
}

/// Accepts a single string or an array of strings; anything else is empty.
pub fn extract_string_list(args: &Value, key: &str) -> Vec<String> {
    match args.get(key) {
        Some(Value::String(s)) if !s.trim().is_empty() => vec![s.clone()],
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

/// A string, or an array of strings joined with newlines.
pub fn extract_text_arg_opt(args: &Value, key: &str) -> Option<String> {
    let text = extract_string_list(args, key).join("\n");
    if text.trim().is_empty() { None } else { Some(text) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn string_args() {
        let args = json!({"recipient": "dev"});
        assert_eq!(extract_string_arg(&args, "recipient").unwrap(), "dev");
        assert!(extract_string_arg(&args, "message").is_err());
        assert_eq!(extract_string_arg_opt(&args, "message", ""), "");
    }

    #[test]
    fn lists_accept_single_strings() {
        let args = json!({"one": "file-1", "many": ["file-1", "file-2", 3], "blank": ""});
        assert_eq!(extract_string_list(&args, "one"), vec!["file-1"]);
        assert_eq!(extract_string_list(&args, "many"), vec!["file-1", "file-2"]);
        assert!(extract_string_list(&args, "blank").is_empty());
        assert!(extract_string_list(&args, "missing").is_empty());
    }

    #[test]
    fn text_arrays_are_joined() {
        let args = json!({"steps": ["be brief", "cite sources"], "note": "hurry", "empty": []});
        assert_eq!(
            extract_text_arg_opt(&args, "steps").as_deref(),
            Some("be brief\ncite sources")
        );
        assert_eq!(extract_text_arg_opt(&args, "note").as_deref(), Some("hurry"));
        assert_eq!(extract_text_arg_opt(&args, "empty"), None);
    }
}
