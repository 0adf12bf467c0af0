use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const PROFILE_FILE: &str = "AGENT.md";

#[derive(Debug, Deserialize)]
struct FrontMatter {
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    instructions: Option<String>,
}

/// Who an agent is and how it should behave.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentProfile {
    pub name: String,
    pub description: String,
    pub instructions: String,
    pub location: Option<PathBuf>,
}

impl AgentProfile {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            instructions: String::new(),
            location: None,
        }
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = instructions.into();
        self
    }
}

/// Loads `<agent_dir>/AGENT.md`. The front matter names the agent; the
/// markdown body holds its instructions unless `instructions` points to a
/// file next to the profile.
pub fn load_profile(agent_dir: &Path) -> Result<AgentProfile> {
    let path = agent_dir.join(PROFILE_FILE);
    if !path.exists() {
        anyhow::bail!("No {} found in {}", PROFILE_FILE, agent_dir.display());
    }

    let content =
        fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path.display()))?;
    let (front, body) = split_front_matter(&content)
        .with_context(|| format!("Missing front matter in {}", path.display()))?;
    let front: FrontMatter = serde_yaml::from_str(front)
        .with_context(|| format!("Invalid front matter in {}", path.display()))?;

    if front.name.trim().is_empty() {
        anyhow::bail!("Agent name is empty in {}", path.display());
    }

    let instructions = match &front.instructions {
        Some(file) => {
            let file_path = agent_dir.join(file);
            fs::read_to_string(&file_path).with_context(|| {
                format!("Failed to read instructions from {}", file_path.display())
            })?
        }
        None => body.to_string(),
    };

    Ok(AgentProfile {
        name: front.name.trim().to_string(),
        description: front.description.trim().to_string(),
        instructions: instructions.trim().to_string(),
        location: Some(path),
    })
}

fn split_front_matter(content: &str) -> Option<(&str, &str)> {
    let rest = content.trim_start().strip_prefix("---")?;
    let rest = rest.strip_prefix('\n').or_else(|| rest.strip_prefix("\r\n"))?;

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim() == "---" {
            return Some((&rest[..offset], &rest[offset + line.len()..]));
        }
        offset += line.len();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn loads_body_as_instructions() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join(PROFILE_FILE),
            "---\nname: ceo\ndescription: Runs the agency\n---\n\n# Role\nDelegate work.\n",
        )
        .unwrap();

        let profile = load_profile(tmp.path()).unwrap();
        assert_eq!(profile.name, "ceo");
        assert_eq!(profile.description, "Runs the agency");
        assert_eq!(profile.instructions, "# Role\nDelegate work.");
        assert_eq!(profile.location, Some(tmp.path().join(PROFILE_FILE)));
    }

    #[test]
    fn instructions_file_overrides_body() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join(PROFILE_FILE),
            "---\nname: dev\ninstructions: instructions.md\n---\nignored\n",
        )
        .unwrap();
        fs::write(tmp.path().join("instructions.md"), "Write the code.\n").unwrap();

        let profile = load_profile(tmp.path()).unwrap();
        assert_eq!(profile.instructions, "Write the code.");
        assert_eq!(profile.description, "");
    }

    #[test]
    fn missing_instructions_file_is_an_error() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join(PROFILE_FILE),
            "---\nname: dev\ninstructions: nope.md\n---\n",
        )
        .unwrap();
        assert!(load_profile(tmp.path()).is_err());
    }

    #[test]
    fn front_matter_is_required() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(PROFILE_FILE), "# dev\nNo front matter\n").unwrap();
        let err = load_profile(tmp.path()).unwrap_err();
        assert!(err.to_string().contains("Missing front matter"));

        let empty = TempDir::new().unwrap();
        assert!(load_profile(empty.path()).is_err());
    }
}
