use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use super::profile::{AgentProfile, load_profile};

pub fn agents_dir(workspace_dir: &Path) -> PathBuf {
    workspace_dir.join("agents")
}

/// All agent profiles known to the agency, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct AgentDirectory {
    agents: BTreeMap<String, AgentProfile>,
}

impl AgentDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load_from_workspace(workspace_dir: &Path) -> Result<Self> {
        let mut directory = Self::new();
        let agents_path = agents_dir(workspace_dir);

        if !agents_path.exists() {
            tracing::debug!("Agents directory does not exist: {}", agents_path.display());
            return Ok(directory);
        }

        let mut paths: Vec<PathBuf> = fs::read_dir(&agents_path)
            .with_context(|| {
                format!("Failed to read agents directory: {}", agents_path.display())
            })?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_dir())
            .collect();
        paths.sort();

        let mut loaded = 0;
        let mut skipped = 0;

        for path in paths {
            let dir_name = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("unknown");

            if is_unsafe_agent_name(dir_name) {
                tracing::warn!("Skipping unsafe agent directory: {}", dir_name);
                skipped += 1;
                continue;
            }

            match load_profile(&path) {
                Ok(profile) => {
                    directory.register(profile)?;
                    loaded += 1;
                }
                Err(e) => {
                    tracing::warn!("Failed to load agent '{}': {:#}", dir_name, e);
                    skipped += 1;
                }
            }
        }

        tracing::info!(
            loaded,
            skipped,
            path = %agents_path.display(),
            "Agents loaded"
        );

        Ok(directory)
    }

    /// Fails when another profile already uses the name.
    pub fn register(&mut self, profile: AgentProfile) -> Result<()> {
        if is_unsafe_agent_name(&profile.name) {
            anyhow::bail!("Invalid agent name: '{}'", profile.name);
        }
        if self.agents.contains_key(&profile.name) {
            anyhow::bail!(
                "Agent names must be unique: '{}' is defined more than once",
                profile.name
            );
        }
        self.agents.insert(profile.name.clone(), profile);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&AgentProfile> {
        self.agents.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.agents.contains_key(name)
    }

    pub fn list(&self) -> Vec<AgentProfile> {
        self.agents.values().cloned().collect()
    }

    pub fn names(&self) -> Vec<String> {
        self.agents.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

fn is_unsafe_agent_name(name: &str) -> bool {
    name.contains("..")
        || name.contains('/')
        || name.contains('\\')
        || name.contains('\0')
        || name.trim().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agency::profile::PROFILE_FILE;
    use tempfile::TempDir;

    fn write_agent(workspace: &Path, dir: &str, name: &str) {
        let agent_dir = agents_dir(workspace).join(dir);
        fs::create_dir_all(&agent_dir).unwrap();
        fs::write(
            agent_dir.join(PROFILE_FILE),
            format!("---\nname: {}\ndescription: {} agent\n---\nDo {} things.\n", name, name, name),
        )
        .unwrap();
    }

    #[test]
    fn loads_profiles_sorted_by_name() {
        let tmp = TempDir::new().unwrap();
        write_agent(tmp.path(), "b", "dev");
        write_agent(tmp.path(), "a", "ceo");

        let directory = AgentDirectory::load_from_workspace(tmp.path()).unwrap();
        assert_eq!(directory.names(), vec!["ceo", "dev"]);
        assert_eq!(directory.get("dev").unwrap().description, "dev agent");
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let tmp = TempDir::new().unwrap();
        write_agent(tmp.path(), "one", "dev");
        write_agent(tmp.path(), "two", "dev");

        let err = AgentDirectory::load_from_workspace(tmp.path()).unwrap_err();
        assert!(err.to_string().contains("must be unique"));
    }

    #[test]
    fn skips_unsafe_and_broken_entries() {
        let tmp = TempDir::new().unwrap();
        write_agent(tmp.path(), "..sneaky", "sneaky");
        fs::create_dir_all(agents_dir(tmp.path()).join("empty")).unwrap();
        write_agent(tmp.path(), "ok", "ceo");

        let directory = AgentDirectory::load_from_workspace(tmp.path()).unwrap();
        assert_eq!(directory.len(), 1);
        assert!(directory.contains("ceo"));
    }

    #[test]
    fn missing_directory_is_empty() {
        let tmp = TempDir::new().unwrap();
        let directory = AgentDirectory::load_from_workspace(tmp.path()).unwrap();
        assert!(directory.is_empty());
    }
}
