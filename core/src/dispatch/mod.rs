//! Tool-facing façade that validates send requests and routes them to the
//! conversation thread of the caller/recipient pair.

pub mod roster;

pub use roster::Roster;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::warn;

use crate::error::RelayError;
use crate::message::Message;
use crate::thread::{
    AsyncMode, AsyncReply, ParticipantPair, PendingRequest, RequestToken, ThreadLookup,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchMode {
    #[default]
    Synchronous,
    Threaded,
    Task,
}

impl DispatchMode {
    pub fn is_async(self) -> bool {
        self.async_mode().is_some()
    }

    fn async_mode(self) -> Option<AsyncMode> {
        match self {
            Self::Synchronous => None,
            Self::Threaded => Some(AsyncMode::Threaded),
            Self::Task => Some(AsyncMode::Task),
        }
    }
}

impl fmt::Display for DispatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Synchronous => write!(f, "synchronous"),
            Self::Threaded => write!(f, "threaded"),
            Self::Task => write!(f, "task"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SendRequest {
    pub recipient: String,
    pub body: String,
    pub files: Vec<String>,
    pub instructions: Option<String>,
}

impl SendRequest {
    pub fn new(recipient: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            recipient: recipient.into(),
            body: body.into(),
            ..Default::default()
        }
    }

    pub fn with_files(mut self, files: Vec<String>) -> Self {
        self.files = files;
        self
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    Reply(String),
    Scheduled(RequestToken),
    /// An earlier reply that was never collected. The new message was not
    /// sent.
    Uncollected(String),
}

impl Dispatch {
    pub fn text(&self) -> &str {
        match self {
            Self::Reply(text) | Self::Uncollected(text) => text,
            Self::Scheduled(_) => "",
        }
    }
}

impl From<AsyncReply> for Dispatch {
    fn from(reply: AsyncReply) -> Self {
        match reply {
            AsyncReply::Scheduled(token) => Self::Scheduled(token),
            AsyncReply::Ready(text) => Self::Uncollected(text),
        }
    }
}

/// What a caller finds when it comes back for a scheduled reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Collected {
    Idle,
    InFlight(RequestToken),
    Ready(String),
}

pub struct Dispatcher {
    roster: Roster,
    threads: Arc<dyn ThreadLookup>,
    mode: DispatchMode,
}

impl Dispatcher {
    pub fn new(roster: Roster, threads: Arc<dyn ThreadLookup>, mode: DispatchMode) -> Self {
        Self {
            roster,
            threads,
            mode,
        }
    }

    pub fn mode(&self) -> DispatchMode {
        self.mode
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub async fn send(&self, caller: &str, request: SendRequest) -> Result<Dispatch, RelayError> {
        self.send_with(caller, request, self.mode).await
    }

    pub async fn send_with(
        &self,
        caller: &str,
        request: SendRequest,
        mode: DispatchMode,
    ) -> Result<Dispatch, RelayError> {
        let message = self.prepare(caller, request).inspect_err(|e| {
            warn!(caller, error = %e, "send rejected");
        })?;

        let thread = self.threads.get_or_create(&message.pair());
        match mode.async_mode() {
            None => thread.get_completion(message).await.map(Dispatch::Reply),
            Some(async_mode) => thread
                .get_completion_async(message, async_mode)
                .map(Dispatch::from),
        }
    }

    /// Status of the caller's request to `recipient`, without consuming it.
    pub fn poll(
        &self,
        caller: &str,
        recipient: &str,
    ) -> Result<Option<PendingRequest>, RelayError> {
        let pair = self.route(caller, recipient)?;
        Ok(self.threads.get(&pair).and_then(|thread| thread.poll()))
    }

    /// Collects a finished reply, clearing the request. Failures are returned
    /// once and cleared as well.
    pub fn collect(&self, caller: &str, recipient: &str) -> Result<Collected, RelayError> {
        let pair = self.route(caller, recipient)?;
        let Some(thread) = self.threads.get(&pair) else {
            return Ok(Collected::Idle);
        };

        if let Some(pending) = thread.poll()
            && pending.is_in_flight()
        {
            return Ok(Collected::InFlight(pending.token().clone()));
        }

        match thread.take_result() {
            Some(Ok(reply)) => Ok(Collected::Ready(reply)),
            Some(Err(failure)) => Err(RelayError::Completion(failure)),
            None => Ok(Collected::Idle),
        }
    }

    fn route(&self, caller: &str, recipient: &str) -> Result<ParticipantPair, RelayError> {
        let recipient = recipient.trim();
        if recipient.is_empty() || !self.roster.can_message(caller, recipient) {
            return Err(RelayError::UnknownRecipient(recipient.to_string()));
        }
        Ok(ParticipantPair::new(caller, recipient))
    }

    fn prepare(&self, caller: &str, request: SendRequest) -> Result<Message, RelayError> {
        self.route(caller, &request.recipient)?;
        let recipient = request.recipient.trim().to_string();

        let mut message = Message::new(caller, recipient, request.body).with_files(request.files);
        if let Some(instructions) = request.instructions {
            message = message.with_instructions(instructions);
        }

        if message.is_empty() {
            return Err(RelayError::EmptyBody);
        }
        if message.has_unattached_file_ids() {
            return Err(RelayError::MissingAttachments);
        }
        Ok(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{EchoCompletion, GatedCompletion, wait_for_terminal};
    use crate::thread::{RequestState, ThreadRegistry};
    use crate::traits::CompletionProvider;

    fn roster() -> Roster {
        let mut roster = Roster::new();
        roster.allow("ceo", "dev");
        roster.allow("ceo", "qa");
        roster.allow("dev", "ceo");
        roster
    }

    fn dispatcher(
        provider: Arc<dyn CompletionProvider>,
        mode: DispatchMode,
    ) -> (Dispatcher, Arc<ThreadRegistry>) {
        let registry = Arc::new(ThreadRegistry::new(provider));
        let dispatcher = Dispatcher::new(roster(), registry.clone(), mode);
        (dispatcher, registry)
    }

    #[tokio::test]
    async fn sync_send_returns_reply_and_records_message() {
        let (dispatcher, registry) =
            dispatcher(Arc::new(EchoCompletion::new()), DispatchMode::Synchronous);

        let result = dispatcher
            .send("ceo", SendRequest::new("dev", "ping"))
            .await
            .unwrap();
        assert_eq!(result, Dispatch::Reply("re: ping".to_string()));

        let thread = registry.get(&ParticipantPair::new("ceo", "dev")).unwrap();
        let messages = thread.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].sender(), "ceo");
        assert_eq!(messages[0].recipient(), "dev");
        assert!(registry.get(&ParticipantPair::new("ceo", "qa")).is_none());
    }

    #[tokio::test]
    async fn unrelated_threads_are_untouched() {
        let (dispatcher, registry) =
            dispatcher(Arc::new(EchoCompletion::new()), DispatchMode::Synchronous);

        dispatcher.send("ceo", SendRequest::new("qa", "test it")).await.unwrap();
        dispatcher.send("ceo", SendRequest::new("dev", "build it")).await.unwrap();
        dispatcher.send("dev", SendRequest::new("ceo", "built")).await.unwrap();

        let qa = registry.get(&ParticipantPair::new("ceo", "qa")).unwrap();
        let dev = registry.get(&ParticipantPair::new("ceo", "dev")).unwrap();
        assert_eq!(qa.len(), 1);
        assert_eq!(dev.len(), 2);
        assert_eq!(registry.len(), 2);
    }

    #[tokio::test]
    async fn unknown_recipient_creates_nothing() {
        let (dispatcher, registry) =
            dispatcher(Arc::new(EchoCompletion::new()), DispatchMode::Synchronous);

        for recipient in ["", "   ", "ghost", "ceo"] {
            let err = dispatcher
                .send("ceo", SendRequest::new(recipient, "hello"))
                .await
                .unwrap_err();
            assert!(matches!(err, RelayError::UnknownRecipient(_)));
        }
        // routes are directed: qa was never allowed to reach ceo
        let err = dispatcher
            .send("qa", SendRequest::new("ceo", "hello"))
            .await
            .unwrap_err();
        assert_eq!(err, RelayError::UnknownRecipient("ceo".to_string()));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn empty_body_is_rejected_unless_files_attached() {
        let (dispatcher, registry) =
            dispatcher(Arc::new(EchoCompletion::new()), DispatchMode::Synchronous);

        let err = dispatcher
            .send("ceo", SendRequest::new("dev", "  "))
            .await
            .unwrap_err();
        assert_eq!(err, RelayError::EmptyBody);
        assert!(registry.is_empty());

        let request = SendRequest::new("dev", "").with_files(vec!["file-123".into()]);
        assert!(dispatcher.send("ceo", request).await.is_ok());
    }

    #[tokio::test]
    async fn file_ids_must_be_attached() {
        let (dispatcher, registry) =
            dispatcher(Arc::new(EchoCompletion::new()), DispatchMode::Synchronous);

        let err = dispatcher
            .send("ceo", SendRequest::new("dev", "review file-123"))
            .await
            .unwrap_err();
        assert_eq!(err, RelayError::MissingAttachments);
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn task_mode_schedules_then_collects() {
        let provider = Arc::new(GatedCompletion::new("shipped"));
        let (dispatcher, registry) = dispatcher(provider.clone(), DispatchMode::Task);

        let scheduled = dispatcher
            .send("ceo", SendRequest::new("dev", "ship it"))
            .await
            .unwrap();
        let Dispatch::Scheduled(token) = scheduled.clone() else {
            panic!("expected a scheduled request");
        };
        assert_eq!(scheduled.text(), "");
        assert_eq!(
            dispatcher.collect("ceo", "dev").unwrap(),
            Collected::InFlight(token.clone())
        );

        let busy = dispatcher
            .send("ceo", SendRequest::new("dev", "ship it again"))
            .await
            .unwrap_err();
        assert!(matches!(busy, RelayError::ThreadBusy { .. }));

        provider.gate.notify_one();
        let thread = registry.get(&ParticipantPair::new("ceo", "dev")).unwrap();
        wait_for_terminal(&thread).await;

        let status = dispatcher.poll("ceo", "dev").unwrap().unwrap();
        assert_eq!(status.state(), RequestState::Completed);
        assert_eq!(status.token(), &token);

        assert_eq!(
            dispatcher.collect("ceo", "dev").unwrap(),
            Collected::Ready("shipped".to_string())
        );
        assert_eq!(dispatcher.collect("ceo", "dev").unwrap(), Collected::Idle);
        assert!(dispatcher.poll("ceo", "dev").unwrap().is_none());
    }

    #[tokio::test]
    async fn uncollected_reply_is_not_mistaken_for_a_new_one() {
        let (dispatcher, registry) =
            dispatcher(Arc::new(EchoCompletion::new()), DispatchMode::Task);

        dispatcher
            .send("ceo", SendRequest::new("dev", "task A"))
            .await
            .unwrap();
        let thread = registry.get(&ParticipantPair::new("ceo", "dev")).unwrap();
        wait_for_terminal(&thread).await;

        let second = dispatcher
            .send("ceo", SendRequest::new("dev", "task B"))
            .await
            .unwrap();
        assert_eq!(second, Dispatch::Uncollected("re: task A".to_string()));
        assert_eq!(thread.len(), 1);
        assert_eq!(dispatcher.collect("ceo", "dev").unwrap(), Collected::Idle);
    }

    #[tokio::test]
    async fn explicit_mode_overrides_default() {
        let (dispatcher, _registry) =
            dispatcher(Arc::new(EchoCompletion::new()), DispatchMode::Task);

        let reply = dispatcher
            .send_with("ceo", SendRequest::new("dev", "now"), DispatchMode::Synchronous)
            .await
            .unwrap();
        assert_eq!(reply.text(), "re: now");
    }

    #[test]
    fn collect_requires_a_route() {
        let (dispatcher, _registry) =
            dispatcher(Arc::new(EchoCompletion::new()), DispatchMode::Task);
        assert!(matches!(
            dispatcher.collect("qa", "dev"),
            Err(RelayError::UnknownRecipient(_))
        ));
        assert_eq!(dispatcher.collect("ceo", "dev").unwrap(), Collected::Idle);
    }

    #[test]
    fn mode_serializes_snake_case() {
        let mode: DispatchMode = serde_json::from_str("\"threaded\"").unwrap();
        assert_eq!(mode, DispatchMode::Threaded);
        assert!(mode.is_async());
        assert!(!DispatchMode::default().is_async());
        assert_eq!(DispatchMode::Task.to_string(), "task");
    }
}
