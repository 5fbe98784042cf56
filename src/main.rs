//! Treasury review console entry point

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::runtime::Runtime;

use treasury_api::{start_server, AppState, HttpWorkflowEndpoint, WorkspaceRegistry};
use treasury_config::Config;
use treasury_core::{
    NoopPreferencesStore, PreferencesStoreRef, StaticPermissions, StatusStateMachine, WorkflowEndpointRef,
    YamlPreferencesStore,
};

#[derive(Parser, Debug)]
#[command(name = "treasury-console")]
#[command(version = "0.1.0")]
#[command(about = "Maker-checker review console for treasury records", long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Print the default configuration and exit
    #[arg(long)]
    print_default_config: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    if args.print_default_config {
        print!("{}", Config::generate_default());
        return Ok(());
    }

    let config = match Config::load(args.config.clone()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e.hint());
            return Err(e).with_context(|| format!("Failed to load configuration from {}", args.config.display()));
        }
    };

    // RUST_LOG wins over the configured level
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(config.logging.level.as_str())).init();
    log::info!(
        "Config loaded: {} workspace(s), authority at {}",
        config.workspaces.len(),
        config.authority.base_url
    );

    let table = match &config.workflow.transitions {
        Some(rules) => StatusStateMachine::from_config(rules).context("Invalid workflow transitions")?,
        None => StatusStateMachine::standard(),
    };
    let endpoint: WorkflowEndpointRef =
        Arc::new(HttpWorkflowEndpoint::from_config(&config.authority).context("Failed to build HTTP client")?);
    let preferences: PreferencesStoreRef = if config.preferences.enabled {
        log::info!("Grid preferences stored in {}", config.preferences.path.display());
        Arc::new(YamlPreferencesStore::new(config.preferences.path.clone()))
    } else {
        Arc::new(NoopPreferencesStore)
    };
    let permissions = Arc::new(StaticPermissions::new(config.permissions.tabs.clone()));

    let registry = WorkspaceRegistry::from_config(&config, endpoint, Arc::new(table), preferences)
        .context("Invalid workspace definition")?;
    let server = config.server.clone();
    let state = AppState::new(config, registry, permissions);

    let rt = Runtime::new()?;
    rt.block_on(start_server(&server, state))?;
    Ok(())
}
