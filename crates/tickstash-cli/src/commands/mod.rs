mod cache;
mod fetch;
mod news;
mod prices;
mod serve;
mod tools;

use std::env;
use std::time::Duration;

use serde_json::Value;
use tickstash_core::{ServiceConfig, TickstashService, ToolResponse};

use crate::cli::{CacheCommand, Cli, Command};
use crate::error::CliError;

/// What a command produced for `main` to render.
pub enum Outcome {
    /// The RPC loop ran until stdin closed.
    Served,
    /// Plain JSON output.
    Data(Value),
    /// A tool response; exits 3 when it carries an error.
    Tool(ToolResponse),
}

pub async fn run(cli: &Cli) -> Result<Outcome, CliError> {
    if let Command::Tools = &cli.command {
        return tools::run();
    }

    let service = TickstashService::open(service_config(cli), cli.store.into())?;

    match &cli.command {
        Command::Serve => serve::run(&service).await,
        Command::Tools => tools::run(),
        Command::Prices(args) => prices::run(args, &service).await,
        Command::News(args) => news::run(args, &service),
        Command::Fetch(command) => fetch::run(command, &service).await,
        Command::Cache(CacheCommand::Stats) => cache::stats(&service),
    }
}

fn service_config(cli: &Cli) -> ServiceConfig {
    let mut config = ServiceConfig::resolve(cli.home.as_deref(), |name| env::var(name).ok());

    if let Some(path) = &cli.keys_file {
        config.keys_file = path.clone();
    }
    if let Some(path) = &cli.db_path {
        config.db_path = path.clone();
    }
    if let Some(ms) = cli.pace_ms {
        config.pacing_delay = Duration::from_millis(ms);
    }
    config
}
