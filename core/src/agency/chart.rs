use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::directory::AgentDirectory;
use crate::dispatch::Roster;

/// Name under which the human user appears in threads.
pub const USER: &str = "user";

/// The entry agent plus the communication flows between agents.
///
/// Within a flow every agent except the last may message every other agent
/// of that flow. The user may only message the entry agent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgencyChart {
    pub entry: String,
    pub flows: Vec<Vec<String>>,
}

impl AgencyChart {
    pub fn new(entry: impl Into<String>) -> Self {
        Self {
            entry: entry.into(),
            flows: Vec::new(),
        }
    }

    pub fn with_flow<I, S>(mut self, flow: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.flows.push(flow.into_iter().map(Into::into).collect());
        self
    }

    /// Every agent named by the chart, sorted.
    pub fn agents(&self) -> Vec<String> {
        let mut agents: BTreeSet<&str> = BTreeSet::new();
        if !self.entry.is_empty() {
            agents.insert(&self.entry);
        }
        agents.extend(self.flows.iter().flatten().map(String::as_str));
        agents.into_iter().map(str::to_string).collect()
    }

    pub fn roster(&self) -> Roster {
        let mut roster = Roster::new();
        if !self.entry.is_empty() {
            roster.allow(USER, self.entry.as_str());
        }

        for flow in &self.flows {
            let Some((_, callers)) = flow.split_last() else {
                continue;
            };
            for caller in callers {
                for recipient in flow {
                    roster.allow(caller.as_str(), recipient.as_str());
                }
            }
        }
        roster
    }

    pub fn validate(&self, directory: &AgentDirectory) -> Result<()> {
        if self.entry.trim().is_empty() {
            anyhow::bail!("Agency chart has no entry agent");
        }

        for flow in &self.flows {
            if flow.len() < 2 {
                anyhow::bail!("Flow {:?} needs at least two agents", flow);
            }
        }

        for agent in self.agents() {
            if agent == USER {
                anyhow::bail!("'{}' is reserved for the user and cannot name an agent", USER);
            }
            if !directory.contains(&agent) {
                anyhow::bail!("Agency chart names unknown agent '{}'", agent);
            }
        }
        Ok(())
    }
}
