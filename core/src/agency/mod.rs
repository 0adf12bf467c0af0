//! An agency is a set of agents wired together by a chart: each agent gets a
//! `send_message` tool for the peers it may address, and in asynchronous
//! modes a `get_response` tool to collect scheduled replies.

pub mod chart;
pub mod directory;
pub mod profile;

pub use chart::{AgencyChart, USER};
pub use directory::{AgentDirectory, agents_dir};
pub use profile::{AgentProfile, load_profile};

use anyhow::Result;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

use crate::agent::{AgentRunner, ContextBuilder, ToolRegistry};
use crate::dispatch::{DispatchMode, Dispatcher, SendRequest};
use crate::error::RelayError;
use crate::thread::{ThreadRegistry, ThreadStore};
use crate::tools::{GetResponseTool, SendMessageConfig, send_message_tool};
use crate::traits::{CompletionProvider, Provider};

const DEFAULT_MAX_ITERATIONS: usize = 20;

#[derive(Clone)]
pub struct AgencyOptions {
    pub mode: DispatchMode,
    pub shared_instructions: Option<String>,
    pub max_iterations: usize,
    pub store: Option<Arc<dyn ThreadStore>>,
}

impl Default for AgencyOptions {
    fn default() -> Self {
        Self {
            mode: DispatchMode::default(),
            shared_instructions: None,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            store: None,
        }
    }
}

pub struct Agency {
    chart: AgencyChart,
    directory: AgentDirectory,
    registry: Arc<ThreadRegistry>,
    dispatcher: Arc<Dispatcher>,
    toolboxes: HashMap<String, Arc<ToolRegistry>>,
}

impl Agency {
    /// Agents answer through `provider`, each with its own tool registry.
    pub fn build(
        chart: AgencyChart,
        directory: AgentDirectory,
        provider: Arc<dyn Provider>,
        options: AgencyOptions,
    ) -> Result<Self> {
        chart.validate(&directory)?;

        let mut context = ContextBuilder::new();
        if let Some(shared) = &options.shared_instructions {
            context = context.with_shared_instructions(shared.as_str());
        }
        let runner = AgentRunner::new(provider, directory.clone(), context)
            .with_max_iterations(options.max_iterations);
        let toolboxes = directory
            .names()
            .into_iter()
            .map(|name| {
                let tools = runner.tools(&name).unwrap_or_default();
                (name, tools)
            })
            .collect();

        Ok(Self::assemble(chart, directory, Arc::new(runner), toolboxes, options))
    }

    /// Replies come from `completion` directly. Tools are still registered
    /// for every agent.
    pub fn with_completion(
        chart: AgencyChart,
        directory: AgentDirectory,
        completion: Arc<dyn CompletionProvider>,
        options: AgencyOptions,
    ) -> Result<Self> {
        chart.validate(&directory)?;
        let toolboxes = directory
            .names()
            .into_iter()
            .map(|name| (name, Arc::new(ToolRegistry::new())))
            .collect();
        Ok(Self::assemble(chart, directory, completion, toolboxes, options))
    }

    fn assemble(
        chart: AgencyChart,
        directory: AgentDirectory,
        completion: Arc<dyn CompletionProvider>,
        toolboxes: HashMap<String, Arc<ToolRegistry>>,
        options: AgencyOptions,
    ) -> Self {
        let mut registry = ThreadRegistry::new(completion);
        if let Some(store) = options.store {
            registry = registry.with_store(store);
        }
        let registry = Arc::new(registry);
        let dispatcher = Arc::new(Dispatcher::new(
            chart.roster(),
            registry.clone(),
            options.mode,
        ));

        for (agent, tools) in &toolboxes {
            let recipients = dispatcher.roster().recipients(agent);
            if recipients.is_empty() {
                continue;
            }

            let profiles = recipients
                .iter()
                .filter_map(|name| directory.get(name).cloned())
                .collect();
            tools.register(Box::new(send_message_tool(
                agent,
                profiles,
                Arc::downgrade(&dispatcher),
                SendMessageConfig { mode: options.mode },
            )));

            if options.mode.is_async() {
                tools.register(Box::new(GetResponseTool::new(
                    agent,
                    recipients,
                    Arc::downgrade(&dispatcher),
                )));
            }
        }

        info!(
            entry = %chart.entry,
            agents = directory.len(),
            mode = %options.mode,
            "Agency ready"
        );

        Self {
            chart,
            directory,
            registry,
            dispatcher,
            toolboxes,
        }
    }

    /// Sends a user message to the entry agent and waits for the reply. The
    /// user's thread is always synchronous.
    pub async fn get_completion(&self, message: &str) -> Result<String, RelayError> {
        self.send(SendRequest::new(self.chart.entry.as_str(), message))
            .await
    }

    /// Like `get_completion`, with attachments or extra instructions.
    /// The request's recipient is ignored.
    pub async fn send(&self, mut request: SendRequest) -> Result<String, RelayError> {
        request.recipient = self.chart.entry.clone();
        self.dispatcher
            .send_with(USER, request, DispatchMode::Synchronous)
            .await
            .map(|dispatch| dispatch.text().to_string())
    }

    pub fn chart(&self) -> &AgencyChart {
        &self.chart
    }

    pub fn directory(&self) -> &AgentDirectory {
        &self.directory
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    pub fn registry(&self) -> &Arc<ThreadRegistry> {
        &self.registry
    }

    pub fn tools(&self, agent: &str) -> Option<Arc<ToolRegistry>> {
        self.toolboxes.get(agent).cloned()
    }
}
