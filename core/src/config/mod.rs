use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::agency::AgencyChart;
use crate::dispatch::DispatchMode;

const RELAY_DIR: &str = ".relay";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub provider: Option<String>,
    pub api_key: String,
    pub base_url: Option<String>,
    pub model: String,
    pub temperature: f64,
    pub max_iterations: usize,
    pub mode: DispatchMode,
    /// A file path, or the instructions themselves.
    pub shared_instructions: Option<String>,
    pub agency: AgencyChart,
    #[serde(skip)]
    pub workspace_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            provider: None,
            api_key: String::new(),
            base_url: None,
            model: "gpt-4o".to_string(),
            temperature: 0.3,
            max_iterations: 20,
            mode: DispatchMode::Synchronous,
            shared_instructions: None,
            agency: AgencyChart::new("ceo").with_flow(["ceo", "developer"]),
            workspace_dir: get_relay_dir().join("workspace"),
        }
    }
}

pub fn get_relay_dir() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(RELAY_DIR)
}

pub fn get_config_path() -> PathBuf {
    get_relay_dir().join("config.toml")
}

pub fn ensure_relay_dir() -> Result<PathBuf> {
    let relay_dir = get_relay_dir();

    if !relay_dir.exists() {
        std::fs::create_dir_all(&relay_dir).with_context(|| {
            format!("Failed to create relay directory at {}", relay_dir.display())
        })?;
    }

    Ok(relay_dir)
}

impl Config {
    pub fn load_or_init() -> Result<Self> {
        if config_exists() {
            load_config()
        } else {
            Ok(Config::default())
        }
    }

    /// Shared instructions for every agent: the contents of the configured
    /// file when it exists (relative paths resolve against the workspace),
    /// otherwise the configured text itself.
    pub fn resolve_shared_instructions(&self) -> Result<Option<String>> {
        let Some(value) = self.shared_instructions.as_deref() else {
            return Ok(None);
        };
        if value.trim().is_empty() {
            return Ok(None);
        }

        let path = Path::new(value);
        let path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.workspace_dir.join(path)
        };

        if path.is_file() {
            let content = std::fs::read_to_string(&path).with_context(|| {
                format!("Failed to read shared instructions from {}", path.display())
            })?;
            Ok(Some(content))
        } else {
            Ok(Some(value.to_string()))
        }
    }
}

pub fn parse_config(content: &str) -> Result<Config> {
    let mut config: Config = toml::from_str(content)?;
    config.workspace_dir = get_relay_dir().join("workspace");
    Ok(config)
}

pub fn load_config() -> Result<Config> {
    let config_path = get_config_path();

    let content = std::fs::read_to_string(&config_path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            anyhow::anyhow!("Config file not found. Run 'relay init' to set up your configuration.")
        } else {
            anyhow::anyhow!("Failed to read config from {}: {}", config_path.display(), e)
        }
    })?;

    parse_config(&content)
        .with_context(|| format!("Failed to parse config from {}", config_path.display()))
}

pub fn save_config(config: &Config) -> Result<()> {
    ensure_relay_dir()?;

    let config_path = get_config_path();
    let content =
        toml::to_string_pretty(config).with_context(|| "Failed to serialize config to TOML")?;

    std::fs::write(&config_path, content)
        .with_context(|| format!("Failed to write config to {}", config_path.display()))?;

    Ok(())
}

pub fn config_exists() -> bool {
    get_config_path().exists()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_fields_use_defaults() {
        let config = parse_config("model = \"gpt-4o-mini\"\nmode = \"task\"\n").unwrap();
        assert_eq!(config.model, "gpt-4o-mini");
        assert_eq!(config.mode, DispatchMode::Task);
        assert_eq!(config.max_iterations, 20);
        assert_eq!(config.agency.entry, "ceo");
    }

    #[test]
    fn round_trips_through_toml() {
        let config = Config {
            provider: Some("openrouter".into()),
            mode: DispatchMode::Threaded,
            agency: AgencyChart::new("lead").with_flow(["lead", "writer", "editor"]),
            ..Config::default()
        };
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed = parse_config(&text).unwrap();

        assert_eq!(parsed.provider.as_deref(), Some("openrouter"));
        assert_eq!(parsed.mode, DispatchMode::Threaded);
        assert_eq!(parsed.agency, config.agency);
    }

    #[test]
    fn invalid_mode_is_rejected() {
        assert!(parse_config("mode = \"eventually\"\n").is_err());
    }

    #[test]
    fn shared_instructions_from_file_or_text() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("manifesto.md"), "Be kind.\n").unwrap();

        let mut config = Config {
            workspace_dir: tmp.path().to_path_buf(),
            shared_instructions: Some("manifesto.md".into()),
            ..Config::default()
        };
        assert_eq!(
            config.resolve_shared_instructions().unwrap().as_deref(),
            Some("Be kind.\n")
        );

        config.shared_instructions = Some("Always cite sources.".into());
        assert_eq!(
            config.resolve_shared_instructions().unwrap().as_deref(),
            Some("Always cite sources.")
        );

        config.shared_instructions = None;
        assert_eq!(config.resolve_shared_instructions().unwrap(), None);
    }
}
