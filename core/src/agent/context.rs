use crate::agency::AgentProfile;
use crate::message::Message;
use crate::traits::{ChatMessage, CompletionRequest};

const SECTION_SEPARATOR: &str = "\n\n---\n\n";

/// Builds the prompt an agent sees when answering a message.
#[derive(Debug, Clone, Default)]
pub struct ContextBuilder {
    shared_instructions: Option<String>,
}

impl ContextBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_shared_instructions(mut self, instructions: impl Into<String>) -> Self {
        let instructions = instructions.into();
        if !instructions.trim().is_empty() {
            self.shared_instructions = Some(instructions);
        }
        self
    }

    pub fn build_system_prompt(&self, profile: &AgentProfile, message: &Message) -> String {
        let mut parts = vec![self.get_identity(profile)];

        if !profile.instructions.trim().is_empty() {
            parts.push(format!("## Instructions\n\n{}", profile.instructions.trim()));
        }

        if let Some(shared) = &self.shared_instructions {
            parts.push(format!("## Agency Manifesto\n\n{}", shared.trim()));
        }

        parts.push(self.get_runtime_context(message));

        if let Some(extra) = message.instructions() {
            parts.push(format!("## Additional Instructions\n\n{}", extra.trim()));
        }

        parts.join(SECTION_SEPARATOR)
    }

    /// System prompt, then the thread's history seen from the recipient's
    /// side, then the new message.
    pub fn build_messages(
        &self,
        profile: &AgentProfile,
        request: &CompletionRequest,
    ) -> Vec<ChatMessage> {
        let mut messages = vec![ChatMessage::system(
            self.build_system_prompt(profile, &request.message),
        )];

        for exchange in &request.history {
            let incoming = exchange.message.recipient() == profile.name;
            let text = format_message(&exchange.message);
            let reply = exchange.reply.clone();

            if incoming {
                messages.push(ChatMessage::user(text));
                if let Some(reply) = reply {
                    messages.push(ChatMessage::assistant(reply));
                }
            } else {
                messages.push(ChatMessage::assistant(text));
                if let Some(reply) = reply {
                    messages.push(ChatMessage::user(reply));
                }
            }
        }

        messages.push(ChatMessage::user(format_message(&request.message)));
        messages
    }

    fn get_identity(&self, profile: &AgentProfile) -> String {
        let mut identity = format!("## Agent Identity\n\nYou are {}.", profile.name);
        if !profile.description.is_empty() {
            identity.push(' ');
            identity.push_str(&profile.description);
        }
        identity
    }

    fn get_runtime_context(&self, message: &Message) -> String {
        let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M (%A)");

        format!(
            "## Runtime Context

### Current Time
{}

### Conversation
Messages in this conversation come from {}.",
            timestamp,
            message.sender()
        )
    }
}

fn format_message(message: &Message) -> String {
    if message.files().is_empty() {
        return message.body().to_string();
    }
    format!(
        "{}\n\nAttached files: {}",
        message.body(),
        message.files().join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::thread::ParticipantPair;
    use crate::traits::Exchange;

    fn dev() -> AgentProfile {
        AgentProfile::new("dev", "Writes code.").with_instructions("Ship small changes.")
    }

    #[test]
    fn system_prompt_sections() {
        let builder = ContextBuilder::new().with_shared_instructions("Be honest.");
        let message =
            Message::new("ceo", "dev", "fix the bug").with_instructions("Reply in one line.");

        let prompt = builder.build_system_prompt(&dev(), &message);
        let sections: Vec<&str> = prompt.split(SECTION_SEPARATOR).collect();

        assert_eq!(sections.len(), 5);
        assert_eq!(sections[0], "## Agent Identity\n\nYou are dev. Writes code.");
        assert!(sections[1].contains("Ship small changes."));
        assert!(sections[2].contains("Be honest."));
        assert!(sections[3].contains("come from ceo"));
        assert!(sections[4].contains("Reply in one line."));
    }

    #[test]
    fn blank_shared_instructions_are_omitted() {
        let builder = ContextBuilder::new().with_shared_instructions("  ");
        let prompt = builder
            .build_system_prompt(&AgentProfile::new("dev", ""), &Message::new("ceo", "dev", "hi"));
        assert_eq!(prompt.split(SECTION_SEPARATOR).count(), 2);
    }

    #[test]
    fn history_is_seen_from_the_recipient() {
        let earlier = Message::new("ceo", "dev", "first task");
        let asked = Message::new("dev", "ceo", "which branch?");
        let current = Message::new("ceo", "dev", "second task").with_files(vec!["file-1".into()]);

        let request = CompletionRequest {
            pair: ParticipantPair::new("ceo", "dev"),
            message: current,
            history: vec![
                Exchange {
                    message: earlier,
                    reply: Some("done".into()),
                },
                Exchange {
                    message: asked,
                    reply: Some("main".into()),
                },
            ],
        };

        let messages = ContextBuilder::new().build_messages(&dev(), &request);
        let turns: Vec<(&str, &str)> = messages[1..]
            .iter()
            .map(|m| (m.role.as_str(), m.content.as_str()))
            .collect();

        assert_eq!(messages[0].role, "system");
        assert_eq!(
            turns,
            vec![
                ("user", "first task"),
                ("assistant", "done"),
                ("assistant", "which branch?"),
                ("user", "main"),
                ("user", "second task\n\nAttached files: file-1"),
            ]
        );
    }
}
