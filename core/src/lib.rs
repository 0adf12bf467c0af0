pub mod agency;
pub mod agent;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod message;
pub mod providers;
pub mod thread;
pub mod tools;
pub mod traits;

#[cfg(test)]
mod testing;

pub use agency::{Agency, AgencyChart, AgencyOptions, AgentDirectory, AgentProfile, USER};
pub use agent::{AgentRunner, ContextBuilder, ToolRegistry};
pub use config::*;
pub use dispatch::{Collected, Dispatch, DispatchMode, Dispatcher, Roster, SendRequest};
pub use error::{CompletionFailure, RelayError};
pub use message::Message;
pub use providers::{ApiError, OpenAIProvider, create_provider};
pub use thread::{
    AsyncMode, AsyncReply, CompletionRecord, ConversationThread, JsonThreadStore, Outcome,
    ParticipantPair, PendingRequest, RequestState, RequestToken, ThreadLookup, ThreadRegistry,
    ThreadSnapshot, ThreadStore,
};
pub use tools::{GetResponseTool, SendMessageConfig, SendMessageTool, send_message_tool};
pub use traits::{
    ChatMessage, ChatRequest, ChatResponse, CompletionProvider, CompletionRequest, Exchange,
    Provider, Tool, ToolCall, ToolResult, ToolSpec,
};
