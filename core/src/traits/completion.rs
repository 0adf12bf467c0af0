use async_trait::async_trait;
use serde::Serialize;

use crate::error::CompletionFailure;
use crate::message::Message;
use crate::thread::ParticipantPair;

/// A prior message of the thread together with the reply it received, if any.
#[derive(Debug, Clone, Serialize)]
pub struct Exchange {
    pub message: Message,
    pub reply: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub pair: ParticipantPair,
    pub message: Message,
    pub history: Vec<Exchange>,
}

/// Turns a message plus the thread's history into a reply.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<String, CompletionFailure>;
}
