use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::thread::ParticipantPair;

const FILE_ID_PREFIX: &str = "file-";

/// A message sent from one agent to another. Fields are only readable once
/// the message has been built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    id: String,
    sender: String,
    recipient: String,
    body: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    files: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    instructions: Option<String>,
    created_at: DateTime<Utc>,
}

impl Message {
    pub fn new(
        sender: impl Into<String>,
        recipient: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            id: format!("msg_{}", uuid::Uuid::new_v4().simple()),
            sender: sender.into(),
            recipient: recipient.into(),
            body: body.into(),
            files: Vec::new(),
            instructions: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_files(mut self, files: Vec<String>) -> Self {
        self.files = files;
        self
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        let instructions = instructions.into();
        self.instructions = if instructions.trim().is_empty() {
            None
        } else {
            Some(instructions)
        };
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn sender(&self) -> &str {
        &self.sender
    }

    pub fn recipient(&self) -> &str {
        &self.recipient
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn files(&self) -> &[String] {
        &self.files
    }

    pub fn instructions(&self) -> Option<&str> {
        self.instructions.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn pair(&self) -> ParticipantPair {
        ParticipantPair::new(&self.sender, &self.recipient)
    }

    pub fn is_empty(&self) -> bool {
        self.body.trim().is_empty() && self.files.is_empty()
    }

    /// True when the body or instructions mention a file id that is not
    /// attached.
    pub fn has_unattached_file_ids(&self) -> bool {
        if !self.files.is_empty() {
            return false;
        }
        self.body.contains(FILE_ID_PREFIX)
            || self
                .instructions
                .as_deref()
                .is_some_and(|i| i.contains(FILE_ID_PREFIX))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_instructions_are_dropped() {
        let message = Message::new("ceo", "dev", "hi").with_instructions("   ");
        assert_eq!(message.instructions(), None);
    }

    #[test]
    fn empty_means_no_body_and_no_files() {
        assert!(Message::new("ceo", "dev", "  ").is_empty());
        assert!(!Message::new("ceo", "dev", "").with_files(vec!["file-1".into()]).is_empty());
    }

    #[test]
    fn detects_unattached_file_ids() {
        let message = Message::new("ceo", "dev", "summarize file-abc");
        assert!(message.has_unattached_file_ids());

        let message = message.with_files(vec!["file-abc".into()]);
        assert!(!message.has_unattached_file_ids());

        let message = Message::new("ceo", "dev", "read it").with_instructions("it is file-xyz");
        assert!(message.has_unattached_file_ids());
    }

    #[test]
    fn pair_is_unordered() {
        let outbound = Message::new("ceo", "dev", "ping");
        let inbound = Message::new("dev", "ceo", "pong");
        assert_eq!(outbound.pair(), inbound.pair());
    }
}
