//! Jot CLI - notes in a Supabase project, from the terminal.

mod auth;
mod cli;
mod commands;
mod config_profiles;
mod error;

#[cfg(test)]
mod tests;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};
use crate::commands::add::run_add;
use crate::commands::auth_cmd::run_auth;
use crate::commands::completions::run_completions;
use crate::commands::config::run_config;
use crate::commands::delete::run_delete;
use crate::commands::edit::run_edit;
use crate::commands::export::run_export;
use crate::commands::list::run_list;
use crate::commands::search::run_search;
use crate::error::CliError;

/// Log directives used when `RUST_LOG` is unset: the binary and its core library.
const DEFAULT_LOG_DIRECTIVES: &str = "jot=info,jot_core=info";

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_DIRECTIVES));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let profile = cli.profile.as_deref();

    match cli.command {
        Commands::Add { title, content } => run_add(profile, title, content).await,
        Commands::List { json } => run_list(profile, json).await,
        Commands::Search { query, json } => run_search(profile, &query, json).await,
        Commands::Edit { id, title, content } => run_edit(profile, &id, title, content).await,
        Commands::Delete { id, yes } => run_delete(profile, &id, yes).await,
        Commands::Export { format, output } => {
            run_export(profile, format, output.as_deref()).await
        }
        Commands::Completions { shell, output } => run_completions(shell, output.as_deref()),
        Commands::Config { command } => run_config(command, profile),
        Commands::Auth { command } => run_auth(command, profile).await,
    }
}
