use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use console::style;
use relay_core::agency::{Agency, AgencyOptions, AgentDirectory, USER};
use relay_core::thread::{JsonThreadStore, ThreadStore};
use relay_core::{config, providers};
use std::io::Write;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

mod onboard;
mod templates;

#[derive(Parser)]
#[command(name = "relay")]
#[command(about = "relay - LLM agents that message each other", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default config and sample agents
    Init,
    /// Talk to the entry agent
    Chat {
        #[arg(short, long)]
        message: Option<String>,
    },
    /// List agents and who may message whom
    Agents,
    /// List stored conversation threads
    Threads,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("RELAY_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let command = cli.command.unwrap_or_else(|| {
        if !config::config_exists() {
            Commands::Init
        } else {
            Commands::Chat { message: None }
        }
    });

    match command {
        Commands::Init => {
            onboard::run_init().map_err(|e| {
                eprintln!("❌ Init failed: {:#}", e);
                anyhow::anyhow!("Init failed: {}", e)
            })?;
        }
        Commands::Chat { message } => chat(message).await?,
        Commands::Agents => list_agents()?,
        Commands::Threads => list_threads()?,
    }

    Ok(())
}

fn load_directory(config: &config::Config) -> Result<AgentDirectory> {
    let directory = AgentDirectory::load_from_workspace(&config.workspace_dir)?;
    if directory.is_empty() {
        anyhow::bail!(
            "No agents found under {}. Run 'relay init' to create sample agents.",
            relay_core::agency::agents_dir(&config.workspace_dir).display()
        );
    }
    Ok(directory)
}

async fn chat(message: Option<String>) -> Result<()> {
    let config = config::load_config()?;

    if !config.workspace_dir.exists()
        && let Err(e) = std::fs::create_dir_all(&config.workspace_dir)
    {
        eprintln!(
            "❌ Error: Could not create workspace at {}: {}",
            config.workspace_dir.display(),
            e
        );
        return Err(e.into());
    }

    tracing::debug!(
        workspace = %config.workspace_dir.display(),
        mode = %config.mode,
        "Starting chat"
    );
    let provider = providers::create_provider(&config)?;
    let directory = load_directory(&config)?;
    let options = AgencyOptions {
        mode: config.mode,
        shared_instructions: config.resolve_shared_instructions()?,
        max_iterations: config.max_iterations,
        store: Some(Arc::new(JsonThreadStore::new(&config.workspace_dir))),
    };
    let agency = Agency::build(config.agency.clone(), directory, provider, options)
        .context("Invalid agency")?;

    if let Some(msg) = message {
        println!("\n🤔 Processing...\n");
        match agency.get_completion(&msg).await {
            Ok(response) => println!("{}", response),
            Err(e) => {
                eprintln!("❌ Error: {}", e);
                anyhow::bail!("Agency failed: {}", e);
            }
        }
        return Ok(());
    }

    println!(
        "📨 relay · talking to {} ({} mode)",
        style(&agency.chart().entry).cyan().bold(),
        agency.dispatcher().mode()
    );
    println!("Type your message (Ctrl+D to exit):\n");

    use std::io::{self, BufRead};
    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut stdout_lock = stdout.lock();

    loop {
        print!("> ");
        let _ = stdout_lock.flush();

        let mut input = String::new();
        match stdin.lock().read_line(&mut input) {
            Ok(0) | Err(_) => {
                println!("\n👋 Goodbye!");
                break;
            }
            Ok(_) => {
                let input = input.trim();
                if input.is_empty() {
                    continue;
                }

                println!("\n🤔 Processing...\n");
                match agency.get_completion(input).await {
                    Ok(response) => println!("{}", response),
                    Err(e) if e.is_retriable() => {
                        eprintln!("⏳ {} (try again)", e)
                    }
                    Err(e) => eprintln!("❌ Error: {}", e),
                }
                println!();
            }
        }
    }

    Ok(())
}

fn list_agents() -> Result<()> {
    let config = config::Config::load_or_init()?;
    let directory = load_directory(&config)?;
    let roster = config.agency.roster();

    println!("{}", style("Agents").bold());
    for profile in directory.list() {
        let marker = if profile.name == config.agency.entry {
            style("*").green().to_string()
        } else {
            " ".to_string()
        };
        println!("{} {} - {}", marker, style(&profile.name).cyan(), profile.description);
    }

    println!();
    println!("{}", style("Routes").bold());
    for caller in roster.callers() {
        println!("  {} -> {}", caller, roster.recipients(caller).join(", "));
    }

    if let Err(e) = config.agency.validate(&directory) {
        println!();
        println!("{} {}", style("!").yellow(), e);
    }
    Ok(())
}

fn list_threads() -> Result<()> {
    let config = config::Config::load_or_init()?;
    let store = JsonThreadStore::new(&config.workspace_dir);
    let threads = store.list()?;

    if threads.is_empty() {
        println!("{} No stored threads in {}", style("!").yellow(), store.dir().display());
        return Ok(());
    }

    for snapshot in threads {
        let label = if snapshot.pair.contains(USER) {
            style(snapshot.pair.to_string()).green()
        } else {
            style(snapshot.pair.to_string()).cyan()
        };
        println!(
            "{}  {} messages, {} replies",
            label,
            snapshot.messages.len(),
            snapshot.records.len()
        );
    }
    Ok(())
}
