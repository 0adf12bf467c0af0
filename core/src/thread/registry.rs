use dashmap::DashMap;
use std::sync::Arc;

use crate::thread::{ConversationThread, ParticipantPair, ThreadStore};
use crate::traits::CompletionProvider;

/// Lookup of conversation threads by participant pair.
pub trait ThreadLookup: Send + Sync {
    /// Returns the pair's thread, creating it on first contact. Concurrent
    /// first contacts resolve to the same instance.
    fn get_or_create(&self, pair: &ParticipantPair) -> Arc<ConversationThread>;

    fn get(&self, pair: &ParticipantPair) -> Option<Arc<ConversationThread>>;
}

pub struct ThreadRegistry {
    threads: DashMap<ParticipantPair, Arc<ConversationThread>>,
    provider: Arc<dyn CompletionProvider>,
    store: Option<Arc<dyn ThreadStore>>,
}

impl ThreadRegistry {
    pub fn new(provider: Arc<dyn CompletionProvider>) -> Self {
        Self {
            threads: DashMap::new(),
            provider,
            store: None,
        }
    }

    pub fn with_store(mut self, store: Arc<dyn ThreadStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn len(&self) -> usize {
        self.threads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.threads.is_empty()
    }

    pub fn pairs(&self) -> Vec<ParticipantPair> {
        let mut pairs: Vec<_> = self.threads.iter().map(|e| e.key().clone()).collect();
        pairs.sort();
        pairs
    }

    fn open(&self, pair: &ParticipantPair) -> ConversationThread {
        let restored = match &self.store {
            Some(store) => match store.load(pair) {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    tracing::warn!(pair = %pair, "Ignoring stored thread: {:#}", e);
                    None
                }
            },
            None => None,
        };

        let thread = match restored {
            Some(snapshot) => {
                tracing::info!(pair = %pair, messages = snapshot.messages.len(), "Thread restored");
                ConversationThread::from_snapshot(snapshot, self.provider.clone())
            }
            None => {
                tracing::info!(pair = %pair, "Thread created");
                ConversationThread::new(pair.clone(), self.provider.clone())
            }
        };

        match &self.store {
            Some(store) => thread.with_store(store.clone()),
            None => thread,
        }
    }
}

impl ThreadLookup for ThreadRegistry {
    fn get_or_create(&self, pair: &ParticipantPair) -> Arc<ConversationThread> {
        if let Some(thread) = self.threads.get(pair) {
            return Arc::clone(thread.value());
        }

        let entry = self
            .threads
            .entry(pair.clone())
            .or_insert_with(|| Arc::new(self.open(pair)));
        Arc::clone(entry.value())
    }

    fn get(&self, pair: &ParticipantPair) -> Option<Arc<ConversationThread>> {
        self.threads.get(pair).map(|t| Arc::clone(t.value()))
    }
}
