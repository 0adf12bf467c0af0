use crate::agency::AgentDirectory;
use crate::agent::{ContextBuilder, ToolRegistry};
use crate::error::CompletionFailure;
use crate::providers::ApiError;
use crate::traits::{ChatMessage, ChatRequest, CompletionProvider, CompletionRequest, Provider};
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

const DEFAULT_MAX_ITERATIONS: usize = 20;

#[derive(Debug, thiserror::Error)]
#[error("Agent '{agent}' gave no final answer after {iterations} iterations")]
struct IterationLimit {
    agent: String,
    iterations: usize,
}

/// Answers messages on behalf of the agents of an agency, letting each agent
/// call its own tools until it produces a final reply.
pub struct AgentRunner {
    provider: Arc<dyn Provider>,
    agents: AgentDirectory,
    toolboxes: HashMap<String, Arc<ToolRegistry>>,
    context_builder: ContextBuilder,
    max_iterations: usize,
}

impl AgentRunner {
    pub fn new(
        provider: Arc<dyn Provider>,
        agents: AgentDirectory,
        context_builder: ContextBuilder,
    ) -> Self {
        let toolboxes = agents
            .names()
            .into_iter()
            .map(|name| (name, Arc::new(ToolRegistry::new())))
            .collect();

        Self {
            provider,
            agents,
            toolboxes,
            context_builder,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }

    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max.max(1);
        self
    }

    pub fn tools(&self, agent: &str) -> Option<Arc<ToolRegistry>> {
        self.toolboxes.get(agent).cloned()
    }

    pub fn agents(&self) -> &AgentDirectory {
        &self.agents
    }

    pub async fn run(&self, request: &CompletionRequest) -> Result<String> {
        let agent = request.message.recipient();
        let profile = self
            .agents
            .get(agent)
            .ok_or_else(|| anyhow::anyhow!("Unknown agent '{}'", agent))?;
        let tools = self
            .toolboxes
            .get(agent)
            .cloned()
            .unwrap_or_default();

        let mut messages = self.context_builder.build_messages(profile, request);
        let specs = tools.get_specs();

        for iteration in 1..=self.max_iterations {
            let chat = ChatRequest {
                messages: &messages,
                tools: if specs.is_empty() { None } else { Some(&specs) },
            };
            let response = self.provider.chat(chat).await?;

            if !response.has_tool_calls() {
                let text = response.text.unwrap_or_default();
                debug!(agent, iteration, "Final answer");
                return Ok(text);
            }

            let assistant_text = response.text.clone().unwrap_or_default();
            messages.push(ChatMessage::assistant_with_tool_calls(
                assistant_text,
                response.tool_calls.clone(),
            ));

            for tool_call in response.tool_calls {
                debug!(agent, tool = %tool_call.name, "Tool call");
                let output = match serde_json::from_str::<serde_json::Value>(&tool_call.arguments) {
                    Ok(args) => tools.execute(&tool_call.name, args).await.render(),
                    Err(e) => format!(
                        "Error: failed to parse tool arguments for {}: {}",
                        tool_call.name, e
                    ),
                };
                messages.push(ChatMessage::tool_result(tool_call.id, output));
            }
        }

        Err(IterationLimit {
            agent: agent.to_string(),
            iterations: self.max_iterations,
        }
        .into())
    }
}

#[async_trait]
impl CompletionProvider for AgentRunner {
    async fn complete(&self, request: CompletionRequest) -> Result<String, CompletionFailure> {
        self.run(&request).await.map_err(|e| classify_failure(&e))
    }
}

/// Network timeouts, connection failures, rate limits and server errors are
/// retriable. Everything else is not.
pub fn classify_failure(err: &anyhow::Error) -> CompletionFailure {
    let retriable = err.chain().any(|cause| {
        if let Some(e) = cause.downcast_ref::<reqwest::Error>() {
            return e.is_timeout() || e.is_connect();
        }
        cause
            .downcast_ref::<ApiError>()
            .is_some_and(ApiError::is_transient)
    });
    CompletionFailure::new(format!("{:#}", err), retriable)
}
