pub mod context;
pub mod loop_;
pub mod registry;

pub use context::ContextBuilder;
pub use loop_::{AgentRunner, classify_failure};
pub use registry::ToolRegistry;
