use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CompletionFailure;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestToken(String);

impl RequestToken {
    pub fn new() -> Self {
        Self(format!("req_{}", uuid::Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RequestToken {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestState {
    Queued,
    Running,
    Completed,
    Failed,
}

impl RequestState {
    pub fn is_in_flight(self) -> bool {
        matches!(self, Self::Queued | Self::Running)
    }

    pub fn is_terminal(self) -> bool {
        !self.is_in_flight()
    }
}

impl fmt::Display for RequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Queued => write!(f, "queued"),
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// The single outstanding completion attempt of a conversation thread.
///
/// Moves `queued -> running -> {completed, failed}`. Terminal states stay
/// until the owning thread clears the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingRequest {
    token: RequestToken,
    message_id: String,
    submitted_at: DateTime<Utc>,
    state: RequestState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    reply: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    failure: Option<CompletionFailure>,
}

impl PendingRequest {
    pub(crate) fn queued(message_id: &str) -> Self {
        Self {
            token: RequestToken::new(),
            message_id: message_id.to_string(),
            submitted_at: Utc::now(),
            state: RequestState::Queued,
            reply: None,
            failure: None,
        }
    }

    pub fn token(&self) -> &RequestToken {
        &self.token
    }

    pub fn message_id(&self) -> &str {
        &self.message_id
    }

    pub fn submitted_at(&self) -> DateTime<Utc> {
        self.submitted_at
    }

    pub fn state(&self) -> RequestState {
        self.state
    }

    pub fn reply(&self) -> Option<&str> {
        self.reply.as_deref()
    }

    pub fn failure(&self) -> Option<&CompletionFailure> {
        self.failure.as_ref()
    }

    pub fn is_in_flight(&self) -> bool {
        self.state.is_in_flight()
    }

    pub(crate) fn start(&mut self) -> bool {
        if self.state != RequestState::Queued {
            return false;
        }
        self.state = RequestState::Running;
        true
    }

    /// Records the outcome. Only an in-flight request can finish; a
    /// terminal one keeps its first outcome.
    pub(crate) fn finish(&mut self, outcome: &Result<String, CompletionFailure>) -> bool {
        if !self.state.is_in_flight() {
            return false;
        }
        match outcome {
            Ok(reply) => {
                self.state = RequestState::Completed;
                self.reply = Some(reply.clone());
            }
            Err(failure) => {
                self.state = RequestState::Failed;
                self.failure = Some(failure.clone());
            }
        }
        true
    }

    pub(crate) fn into_outcome(self) -> Option<Result<String, CompletionFailure>> {
        match self.state {
            RequestState::Completed => Some(Ok(self.reply.unwrap_or_default())),
            RequestState::Failed => Some(Err(self
                .failure
                .unwrap_or_else(|| CompletionFailure::permanent("unknown failure")))),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Reply { text: String },
    Failed { reason: String, retriable: bool },
}

impl From<&Result<String, CompletionFailure>> for Outcome {
    fn from(result: &Result<String, CompletionFailure>) -> Self {
        match result {
            Ok(text) => Self::Reply { text: text.clone() },
            Err(failure) => Self::Failed {
                reason: failure.reason.clone(),
                retriable: failure.retriable,
            },
        }
    }
}

/// What became of one message once its request finished.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionRecord {
    pub token: RequestToken,
    pub message_id: String,
    pub outcome: Outcome,
    pub finished_at: DateTime<Utc>,
}

impl CompletionRecord {
    pub fn reply(&self) -> Option<&str> {
        match &self.outcome {
            Outcome::Reply { text } => Some(text),
            Outcome::Failed { .. } => None,
        }
    }
}
