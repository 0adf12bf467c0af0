use async_trait::async_trait;
use serde_json::json;
use std::sync::Weak;

use crate::dispatch::{Collected, Dispatcher};
use crate::tools::extract_string_arg;
use crate::traits::{Tool, ToolResult};

pub const GET_RESPONSE: &str = "get_response";

/// Collects replies to messages sent asynchronously by `caller`.
pub struct GetResponseTool {
    caller: String,
    recipients: Vec<String>,
    dispatcher: Weak<Dispatcher>,
}

impl GetResponseTool {
    pub fn new(caller: &str, recipients: Vec<String>, dispatcher: Weak<Dispatcher>) -> Self {
        Self {
            caller: caller.to_string(),
            recipients,
            dispatcher,
        }
    }
}

#[async_trait]
impl Tool for GetResponseTool {
    fn name(&self) -> &str {
        GET_RESPONSE
    }

    fn description(&self) -> &str {
        "Check on a message sent earlier with send_message and collect the reply once it is ready"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "recipient": {
                    "type": "string",
                    "enum": self.recipients,
                    "description": "The agent the message was sent to"
                }
            },
            "required": ["recipient"]
        })
    }

    async fn execute(&self, args: serde_json::Value) -> anyhow::Result<ToolResult> {
        let recipient = extract_string_arg(&args, "recipient")?;
        let Some(dispatcher) = self.dispatcher.upgrade() else {
            anyhow::bail!("Agency has shut down");
        };

        let result = match dispatcher.collect(&self.caller, &recipient) {
            Ok(Collected::Ready(reply)) => ToolResult::success(reply),
            Ok(Collected::InFlight(token)) => ToolResult::success(format!(
                "System notification: {} has not completed request {} yet. Check back later.",
                recipient, token
            )),
            Ok(Collected::Idle) => ToolResult::success(format!(
                "System notification: there is no task for {} to report on. Send a message first.",
                recipient
            )),
            Err(e) => ToolResult::error(e.to_string()),
        };
        Ok(result)
    }
}
