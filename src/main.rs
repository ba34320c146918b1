use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use jarvis_agent::agent::ToolAgent;
use jarvis_agent::config::Config;
use jarvis_agent::llm::LLMClient;
use jarvis_agent::repl;
use jarvis_agent::store::ProjectStore;
use jarvis_agent::tools::ProjectTools;

/// J.A.R.V.I.S. - self-improving assistant that proposes edits to its own project files
#[derive(Parser, Debug)]
#[command(name = "jarvis", version, about)]
struct Args {
    /// TOML configuration file (defaults apply when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Project directory, overrides the config file
    #[arg(short, long)]
    root: Option<PathBuf>,

    /// Model identifier, overrides the config file
    #[arg(short, long)]
    model: Option<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr; stdout carries the conversation
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    if let Some(root) = args.root {
        config.project_root = root;
    }
    if let Some(model) = args.model {
        config.llm.model = model;
    }

    info!(
        project_root = %config.project_root.display(),
        model = %config.llm.model,
        "J.A.R.V.I.S. starting"
    );

    let store = Arc::new(ProjectStore::open(&config.project_root)?);
    let client = LLMClient::from_config(&config.llm)?;
    let agent = ToolAgent::new(
        client,
        ProjectTools::new(Arc::clone(&store)),
        config.llm.max_steps,
    );

    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();
    repl::run(&agent, &store, agent.model_name(), stdin.lock(), &mut stdout).await?;

    Ok(())
}
