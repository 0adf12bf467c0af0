use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::thread::{ParticipantPair, RequestToken};

/// Failure reported by a completion provider.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
#[error("{reason}")]
pub struct CompletionFailure {
    pub reason: String,
    pub retriable: bool,
}

impl CompletionFailure {
    pub fn new(reason: impl Into<String>, retriable: bool) -> Self {
        Self {
            reason: reason.into(),
            retriable,
        }
    }

    /// A failure worth resubmitting, e.g. an upstream timeout.
    pub fn transient(reason: impl Into<String>) -> Self {
        Self::new(reason, true)
    }

    pub fn permanent(reason: impl Into<String>) -> Self {
        Self::new(reason, false)
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RelayError {
    #[error("Unknown recipient: '{0}'")]
    UnknownRecipient(String),

    #[error("Message body is empty and no files are attached")]
    EmptyBody,

    #[error("Message references file ids but message_files is empty")]
    MissingAttachments,

    #[error("Thread {pair} is busy with request {token}; check its status before sending again")]
    ThreadBusy {
        pair: ParticipantPair,
        token: RequestToken,
    },

    #[error("Completion failed: {0}")]
    Completion(CompletionFailure),
}

impl RelayError {
    pub fn is_retriable(&self) -> bool {
        match self {
            Self::ThreadBusy { .. } => true,
            Self::Completion(failure) => failure.retriable,
            _ => false,
        }
    }
}

impl From<CompletionFailure> for RelayError {
    fn from(failure: CompletionFailure) -> Self {
        Self::Completion(failure)
    }
}
