//! Completion providers shared by unit tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::Notify;

use crate::error::CompletionFailure;
use crate::thread::ConversationThread;
use crate::traits::{
    ChatMessage, ChatRequest, ChatResponse, CompletionProvider, CompletionRequest, Provider,
    ToolCall,
};

/// Replies `re: <body>` and remembers how much history each request carried.
#[derive(Default)]
pub struct EchoCompletion {
    history_lengths: Mutex<Vec<usize>>,
}

impl EchoCompletion {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn history_lengths(&self) -> Vec<usize> {
        self.history_lengths.lock().clone()
    }
}

#[async_trait]
impl CompletionProvider for EchoCompletion {
    async fn complete(&self, request: CompletionRequest) -> Result<String, CompletionFailure> {
        self.history_lengths.lock().push(request.history.len());
        Ok(format!("re: {}", request.message.body()))
    }
}

/// Signals `started` when a request begins, then holds it until `gate` is
/// notified.
pub struct GatedCompletion {
    pub started: Notify,
    pub gate: Notify,
    reply: String,
}

impl GatedCompletion {
    pub fn new(reply: &str) -> Self {
        Self {
            started: Notify::new(),
            gate: Notify::new(),
            reply: reply.to_string(),
        }
    }
}

#[async_trait]
impl CompletionProvider for GatedCompletion {
    async fn complete(&self, _request: CompletionRequest) -> Result<String, CompletionFailure> {
        self.started.notify_one();
        self.gate.notified().await;
        Ok(self.reply.clone())
    }
}

pub struct FailingCompletion {
    failure: CompletionFailure,
}

impl FailingCompletion {
    pub fn new(failure: CompletionFailure) -> Self {
        Self { failure }
    }
}

#[async_trait]
impl CompletionProvider for FailingCompletion {
    async fn complete(&self, _request: CompletionRequest) -> Result<String, CompletionFailure> {
        Err(self.failure.clone())
    }
}

/// Plays back canned chat responses in order and records every request.
#[derive(Default)]
pub struct ScriptedProvider {
    responses: Mutex<VecDeque<anyhow::Result<ChatResponse>>>,
    requests: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedProvider {
    pub fn new<I>(responses: I) -> Self
    where
        I: IntoIterator<Item = anyhow::Result<ChatResponse>>,
    {
        Self {
            responses: Mutex::new(responses.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<Vec<ChatMessage>> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    async fn chat(&self, request: ChatRequest<'_>) -> anyhow::Result<ChatResponse> {
        self.requests.lock().push(request.messages.to_vec());
        self.responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(anyhow::anyhow!("script exhausted")))
    }
}

pub fn tool_call(id: &str, name: &str, arguments: serde_json::Value) -> ChatResponse {
    ChatResponse::calls(vec![ToolCall {
        id: id.to_string(),
        name: name.to_string(),
        arguments: arguments.to_string(),
    }])
}

pub async fn wait_for_terminal(thread: &ConversationThread) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !thread.poll().is_some_and(|p| p.state().is_terminal()) {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("request did not reach a terminal state");
}
