use chrono::Utc;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::{CompletionFailure, RelayError};
use crate::message::Message;
use crate::thread::{
    CompletionRecord, Outcome, ParticipantPair, PendingRequest, RequestToken, ThreadSnapshot,
    ThreadStore,
};
use crate::traits::{CompletionProvider, CompletionRequest, Exchange};

/// Where a non-blocking completion runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AsyncMode {
    /// A dedicated OS thread driving the request on the current runtime.
    Threaded,
    /// A task on the current tokio runtime.
    Task,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AsyncReply {
    Scheduled(RequestToken),
    /// A reply that finished earlier and had not been collected yet.
    Ready(String),
}

impl AsyncReply {
    /// Empty while the work is only scheduled.
    pub fn text(&self) -> &str {
        match self {
            Self::Scheduled(_) => "",
            Self::Ready(text) => text,
        }
    }
}

#[derive(Default)]
struct ThreadState {
    messages: Vec<Message>,
    records: Vec<CompletionRecord>,
    pending: Option<PendingRequest>,
}

impl ThreadState {
    fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    fn exchanges(&self) -> Vec<Exchange> {
        let replies: HashMap<&str, &str> = self
            .records
            .iter()
            .filter_map(|r| r.reply().map(|text| (r.message_id.as_str(), text)))
            .collect();

        self.messages
            .iter()
            .map(|message| Exchange {
                message: message.clone(),
                reply: replies.get(message.id()).map(|text| text.to_string()),
            })
            .collect()
    }

    fn pending_for(&mut self, token: &RequestToken) -> Option<&mut PendingRequest> {
        self.pending.as_mut().filter(|p| p.token() == token)
    }

    fn snapshot(&self, pair: &ParticipantPair) -> ThreadSnapshot {
        ThreadSnapshot {
            pair: pair.clone(),
            messages: self.messages.clone(),
            records: self.records.clone(),
        }
    }
}

/// Ordered history and completion lifecycle of one participant pair.
///
/// At most one [`PendingRequest`] exists at a time; both the blocking and the
/// non-blocking operation refuse to queue work while it is present.
pub struct ConversationThread {
    pair: ParticipantPair,
    provider: Arc<dyn CompletionProvider>,
    store: Option<Arc<dyn ThreadStore>>,
    state: Mutex<ThreadState>,
}

impl ConversationThread {
    pub fn new(pair: ParticipantPair, provider: Arc<dyn CompletionProvider>) -> Self {
        Self {
            pair,
            provider,
            store: None,
            state: Mutex::new(ThreadState::default()),
        }
    }

    pub fn with_store(mut self, store: Arc<dyn ThreadStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Rebuilds a thread by replaying a snapshot through append.
    pub fn from_snapshot(snapshot: ThreadSnapshot, provider: Arc<dyn CompletionProvider>) -> Self {
        let thread = Self::new(snapshot.pair, provider);
        {
            let mut state = thread.state.lock();
            for message in snapshot.messages {
                state.append(message);
            }
            state.records.extend(snapshot.records);
        }
        thread
    }

    pub fn pair(&self) -> &ParticipantPair {
        &self.pair
    }

    pub fn messages(&self) -> Vec<Message> {
        self.state.lock().messages.clone()
    }

    pub fn records(&self) -> Vec<CompletionRecord> {
        self.state.lock().records.clone()
    }

    pub fn len(&self) -> usize {
        self.state.lock().messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn snapshot(&self) -> ThreadSnapshot {
        self.state.lock().snapshot(&self.pair)
    }

    /// Current request, if any. Never changes state.
    pub fn poll(&self) -> Option<PendingRequest> {
        self.state.lock().pending.clone()
    }

    /// Consumes a completed or failed request. In-flight requests are left
    /// alone.
    pub fn take_result(&self) -> Option<Result<String, CompletionFailure>> {
        let mut state = self.state.lock();
        if !state.pending.as_ref().is_some_and(|p| p.state().is_terminal()) {
            return None;
        }
        state.pending.take().and_then(PendingRequest::into_outcome)
    }

    pub fn clear(&self) -> bool {
        self.take_result().is_some()
    }

    /// Sends `message` and waits for the reply on the caller's task.
    pub async fn get_completion(&self, message: Message) -> Result<String, RelayError> {
        let (token, request) = self.submit(message)?;
        let guard = RequestGuard::new(self, token, true);
        guard.start();

        let outcome = self.provider.complete(request).await;
        guard.settle(&outcome);

        outcome.map_err(RelayError::Completion)
    }

    /// Schedules `message` on a worker and returns immediately.
    ///
    /// A reply that finished earlier and was never collected is handed back
    /// instead, and `message` is not sent; the caller resends it.
    pub fn get_completion_async(
        self: &Arc<Self>,
        message: Message,
        mode: AsyncMode,
    ) -> Result<AsyncReply, RelayError> {
        let handle = tokio::runtime::Handle::try_current().map_err(|e| {
            RelayError::Completion(CompletionFailure::permanent(format!(
                "no async runtime available: {e}"
            )))
        })?;

        if let Some(outcome) = self.take_result() {
            debug!(pair = %self.pair, "handing back uncollected reply");
            return outcome.map(AsyncReply::Ready).map_err(RelayError::Completion);
        }

        let (token, request) = self.submit(message)?;

        let thread = Arc::clone(self);
        let worker_token = token.clone();
        let work = async move {
            let guard = RequestGuard::new(&thread, worker_token, false);
            guard.start();
            let outcome = thread.provider.complete(request).await;
            guard.settle(&outcome);
        };

        match mode {
            AsyncMode::Task => drop(handle.spawn(work)),
            AsyncMode::Threaded => {
                let spawned = std::thread::Builder::new()
                    .name(format!("relay-{}", self.pair.file_stem()))
                    .spawn(move || handle.block_on(work));
                if let Err(e) = spawned {
                    let failure =
                        CompletionFailure::permanent(format!("failed to spawn worker thread: {e}"));
                    self.finish(&token, &Err(failure.clone()), true);
                    return Err(RelayError::Completion(failure));
                }
            }
        }

        info!(pair = %self.pair, token = %token, mode = ?mode, "request scheduled");
        Ok(AsyncReply::Scheduled(token))
    }

    fn submit(&self, message: Message) -> Result<(RequestToken, CompletionRequest), RelayError> {
        if !self.pair.contains(message.sender()) || !self.pair.contains(message.recipient()) {
            return Err(RelayError::UnknownRecipient(message.recipient().to_string()));
        }

        let mut state = self.state.lock();
        if let Some(pending) = &state.pending {
            return Err(RelayError::ThreadBusy {
                pair: self.pair.clone(),
                token: pending.token().clone(),
            });
        }

        let history = state.exchanges();
        let pending = PendingRequest::queued(message.id());
        let token = pending.token().clone();
        state.pending = Some(pending);
        state.append(message.clone());
        drop(state);

        debug!(pair = %self.pair, token = %token, "request queued");
        Ok((
            token,
            CompletionRequest {
                pair: self.pair.clone(),
                message,
                history,
            },
        ))
    }

    fn start(&self, token: &RequestToken) {
        let mut state = self.state.lock();
        if let Some(pending) = state.pending_for(token)
            && pending.start()
        {
            debug!(pair = %self.pair, token = %token, "request running");
        }
    }

    fn finish(
        &self,
        token: &RequestToken,
        outcome: &Result<String, CompletionFailure>,
        consume: bool,
    ) {
        let snapshot = {
            let mut state = self.state.lock();
            let Some(pending) = state.pending_for(token) else {
                return;
            };
            if !pending.finish(outcome) {
                return;
            }
            let message_id = pending.message_id().to_string();

            state.records.push(CompletionRecord {
                token: token.clone(),
                message_id,
                outcome: Outcome::from(outcome),
                finished_at: Utc::now(),
            });
            if consume {
                state.pending = None;
            }
            self.store.as_ref().map(|_| state.snapshot(&self.pair))
        };

        debug!(pair = %self.pair, token = %token, ok = outcome.is_ok(), "request finished");

        if let (Some(store), Some(snapshot)) = (&self.store, snapshot)
            && let Err(e) = store.save(&snapshot)
        {
            warn!(pair = %self.pair, "Failed to persist thread: {:#}", e);
        }
    }
}

/// Settles a request exactly once. Dropping it unsettled (the caller's
/// future was dropped, or the worker panicked) fails the request as
/// retriable so the thread does not stay busy.
struct RequestGuard<'a> {
    thread: &'a ConversationThread,
    token: Option<RequestToken>,
    consume: bool,
}

impl<'a> RequestGuard<'a> {
    fn new(thread: &'a ConversationThread, token: RequestToken, consume: bool) -> Self {
        Self {
            thread,
            token: Some(token),
            consume,
        }
    }

    fn start(&self) {
        if let Some(token) = &self.token {
            self.thread.start(token);
        }
    }

    fn settle(mut self, outcome: &Result<String, CompletionFailure>) {
        if let Some(token) = self.token.take() {
            self.thread.finish(&token, outcome, self.consume);
        }
    }
}

impl Drop for RequestGuard<'_> {
    fn drop(&mut self) {
        if let Some(token) = self.token.take() {
            warn!(pair = %self.thread.pair, token = %token, "request abandoned before completion");
            let failure = CompletionFailure::transient("request abandoned before completion");
            self.thread.finish(&token, &Err(failure), self.consume);
        }
    }
}
