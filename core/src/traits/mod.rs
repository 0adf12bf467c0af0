pub mod completion;
pub mod provider;
pub mod tool;

pub use completion::{CompletionProvider, CompletionRequest, Exchange};
pub use provider::{ChatMessage, ChatRequest, ChatResponse, Provider, ToolCall};
pub use tool::{Tool, ToolResult, ToolSpec};
