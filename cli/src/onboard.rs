use anyhow::{Context, Result};
use console::style;
use relay_core::agency::agents_dir;
use relay_core::agency::profile::PROFILE_FILE;
use relay_core::config::{self, Config};
use std::path::Path;

use crate::templates::SAMPLE_AGENTS;

const BANNER: &str = r"
    ---------------------------
     r e l a y
     agents talking to agents
    ---------------------------
";

fn print_step(step: usize, total: usize, title: &str) {
    println!();
    println!(
        "{}",
        style(format!("[{}/{}] {}", step, total, title))
            .cyan()
            .bold()
    );
    println!();
}

fn ensure_file(path: &Path, content: &str) -> Result<bool> {
    if !path.exists() {
        std::fs::write(path, content)?;
        Ok(true)
    } else {
        Ok(false)
    }
}

/// Writes the sample agents into the workspace, keeping any existing profile.
pub fn ensure_sample_agents(workspace: &Path) -> Result<Vec<&'static str>> {
    let mut created = Vec::new();
    for (dir, content) in SAMPLE_AGENTS {
        let agent_dir = agents_dir(workspace).join(dir);
        std::fs::create_dir_all(&agent_dir)
            .with_context(|| format!("Failed to create {}", agent_dir.display()))?;
        if ensure_file(&agent_dir.join(PROFILE_FILE), content)? {
            created.push(*dir);
        }
    }
    Ok(created)
}

pub fn run_init() -> Result<Config> {
    println!("{}", style(BANNER).cyan().bold());

    print_step(1, 2, "Configuration");
    let config = if config::config_exists() {
        println!(
            "  {} Keeping existing config at {}",
            style("•").dim(),
            style(config::get_config_path().display()).cyan()
        );
        config::load_config()?
    } else {
        let config = Config::default();
        config::save_config(&config)?;
        println!(
            "  {} Config written to {}",
            style("✓").green(),
            style(config::get_config_path().display()).cyan()
        );
        config
    };

    print_step(2, 2, "Sample Agents");
    let created = ensure_sample_agents(&config.workspace_dir)?;
    if created.is_empty() {
        println!("  {} Agents already present", style("•").dim());
    }
    for name in created {
        println!(
            "  {} {}",
            style("✓").green(),
            style(agents_dir(&config.workspace_dir).join(name).display()).cyan()
        );
    }

    println!();
    println!(
        "  {} Set OPENAI_API_KEY (or api_key in the config), then run: {}",
        style("→").green(),
        style("relay chat").cyan().bold()
    );
    println!();

    Ok(config)
}
