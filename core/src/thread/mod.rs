pub mod conversation;
pub mod pair;
pub mod pending;
pub mod registry;
pub mod store;

pub use conversation::{AsyncMode, AsyncReply, ConversationThread};
pub use pair::ParticipantPair;
pub use pending::{CompletionRecord, Outcome, PendingRequest, RequestState, RequestToken};
pub use registry::{ThreadLookup, ThreadRegistry};
pub use store::{JsonThreadStore, ThreadSnapshot, ThreadStore};
