use async_trait::async_trait;
use serde_json::json;
use std::sync::Weak;

use crate::agency::AgentProfile;
use crate::dispatch::{Dispatch, DispatchMode, Dispatcher, SendRequest};
use crate::tools::{
    extract_string_arg, extract_string_arg_opt, extract_string_list, extract_text_arg_opt,
};
use crate::traits::{Tool, ToolResult};

pub const SEND_MESSAGE: &str = "send_message";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SendMessageConfig {
    pub mode: DispatchMode,
}

/// Lets `caller` address one of the agents it may talk to.
pub struct SendMessageTool {
    caller: String,
    recipients: Vec<AgentProfile>,
    dispatcher: Weak<Dispatcher>,
    config: SendMessageConfig,
    description: String,
}

pub fn send_message_tool(
    caller: &str,
    recipients: Vec<AgentProfile>,
    dispatcher: Weak<Dispatcher>,
    config: SendMessageConfig,
) -> SendMessageTool {
    let mut description = String::from(
        "Send a message to another agent and receive its reply. \
         Describe the task in full; the recipient cannot see your conversation.",
    );
    if config.mode.is_async() {
        description.push_str(
            " Replies arrive later: collect them with get_response before messaging the same agent again.",
        );
    }

    SendMessageTool {
        caller: caller.to_string(),
        recipients,
        dispatcher,
        config,
        description,
    }
}

impl SendMessageTool {
    pub fn recipient_names(&self) -> Vec<&str> {
        self.recipients.iter().map(|r| r.name.as_str()).collect()
    }

    fn recipients_description(&self) -> String {
        self.recipients
            .iter()
            .map(|r| {
                if r.description.is_empty() {
                    r.name.clone()
                } else {
                    format!("{}: {}", r.name, r.description)
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[async_trait]
impl Tool for SendMessageTool {
    fn name(&self) -> &str {
        SEND_MESSAGE
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "recipient": {
                    "type": "string",
                    "enum": self.recipient_names(),
                    "description": self.recipients_description()
                },
                "message": {
                    "type": "string",
                    "description": "The task for the recipient, with every detail it needs"
                },
                "message_files": {
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "Ids of files to attach, required when the message mentions file ids"
                },
                "additional_instructions": {
                    "type": "string",
                    "description": "Extra instructions for the recipient for this message only"
                }
            },
            "required": ["recipient", "message"]
        })
    }

    async fn execute(&self, args: serde_json::Value) -> anyhow::Result<ToolResult> {
        let recipient = extract_string_arg(&args, "recipient")?;
        let body = extract_string_arg_opt(&args, "message", "");
        let mut request = SendRequest::new(recipient.as_str(), body)
            .with_files(extract_string_list(&args, "message_files"));
        if let Some(instructions) = extract_text_arg_opt(&args, "additional_instructions") {
            request = request.with_instructions(instructions);
        }

        let Some(dispatcher) = self.dispatcher.upgrade() else {
            anyhow::bail!("Agency has shut down");
        };

        match dispatcher.send_with(&self.caller, request, self.config.mode).await {
            Ok(Dispatch::Reply(reply)) => Ok(ToolResult::success(reply)),
            Ok(Dispatch::Uncollected(reply)) => Ok(ToolResult::success(format!(
                "System notification: your new message to {} was NOT sent. \
                 Here is its earlier reply, which had not been collected; \
                 send the new message again.\n\n{}",
                recipient.trim(),
                reply
            ))),
            Ok(Dispatch::Scheduled(token)) => Ok(ToolResult::success(format!(
                "System notification: message sent to {} as request {}. \
                 The reply is not ready yet; call get_response with recipient '{}' to collect it.",
                recipient.trim(),
                token,
                recipient.trim()
            ))),
            Err(e) => Ok(ToolResult::error(e.to_string())),
        }
    }
}
