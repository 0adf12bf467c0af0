use crate::traits::{Tool, ToolResult, ToolSpec};
use parking_lot::Mutex;
use std::sync::Arc;

/// Tools available to one agent.
pub struct ToolRegistry {
    tools: Mutex<Vec<Arc<dyn Tool>>>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: Mutex::new(Vec::new()),
        }
    }

    /// Registers a tool, replacing any tool with the same name.
    pub fn register(&self, tool: Box<dyn Tool>) {
        let tool: Arc<dyn Tool> = Arc::from(tool);
        let mut tools = self.tools.lock();
        match tools.iter().position(|t| t.name() == tool.name()) {
            Some(idx) => tools[idx] = tool,
            None => tools.push(tool),
        }
    }

    pub fn get_specs(&self) -> Vec<ToolSpec> {
        self.tools.lock().iter().map(|t| t.spec()).collect()
    }

    pub fn names(&self) -> Vec<String> {
        self.tools
            .lock()
            .iter()
            .map(|t| t.name().to_string())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tools.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.lock().is_empty()
    }

    pub async fn execute(&self, name: &str, args: serde_json::Value) -> ToolResult {
        let tool = {
            let tools = self.tools.lock();
            tools.iter().find(|t| t.name() == name).cloned()
        };

        match tool {
            Some(tool) => match tool.execute(args).await {
                Ok(result) => result,
                Err(e) => ToolResult::error(format!("Execution failed: {}", e)),
            },
            None => ToolResult::error(format!("Tool '{}' not found", name)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;

    struct Fixed {
        name: &'static str,
        output: &'static str,
    }

    #[async_trait]
    impl Tool for Fixed {
        fn name(&self) -> &str {
            self.name
        }

        fn description(&self) -> &str {
            "returns a fixed string"
        }

        fn parameters_schema(&self) -> serde_json::Value {
            json!({"type": "object", "properties": {}})
        }

        async fn execute(&self, _args: serde_json::Value) -> anyhow::Result<ToolResult> {
            if self.output.is_empty() {
                anyhow::bail!("nothing to say");
            }
            Ok(ToolResult::success(self.output))
        }
    }

    #[tokio::test]
    async fn executes_registered_tool() {
        let registry = ToolRegistry::new();
        registry.register(Box::new(Fixed {
            name: "greet",
            output: "hello",
        }));

        let result = registry.execute("greet", json!({})).await;
        assert!(result.success);
        assert_eq!(result.output, "hello");
        assert_eq!(registry.get_specs()[0].name, "greet");
    }

    #[tokio::test]
    async fn missing_and_failing_tools_report_errors() {
        let registry = ToolRegistry::new();
        registry.register(Box::new(Fixed {
            name: "mute",
            output: "",
        }));

        let missing = registry.execute("ghost", json!({})).await;
        assert_eq!(missing.error.as_deref(), Some("Tool 'ghost' not found"));

        let failed = registry.execute("mute", json!({})).await;
        assert!(!failed.success);
        assert!(failed.render().contains("nothing to say"));
    }

    #[test]
    fn same_name_replaces() {
        let registry = ToolRegistry::new();
        registry.register(Box::new(Fixed {
            name: "greet",
            output: "hello",
        }));
        registry.register(Box::new(Fixed {
            name: "greet",
            output: "hi",
        }));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.names(), vec!["greet"]);
    }
}
