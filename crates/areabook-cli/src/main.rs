//! AreaBook CLI - Operator tool for the conflict engine
//!
//! Stores remote snapshots, checks local copies against them, resolves the
//! resulting conflicts and manages leases and editing presence, all over a
//! local libSQL document store.

mod cli;
mod commands;
mod error;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands, LockCommands, SessionCommands};
use crate::commands::common::{open_engine, resolve_db_path, resolve_user};
use crate::commands::completions::run_completions;
use crate::commands::history::{run_analytics, run_history};
use crate::commands::lock::{run_lock_acquire, run_lock_release, run_lock_status};
use crate::commands::records::{run_check, run_get, run_put};
use crate::commands::resolve::{run_conflicts, run_resolve, run_sweep};
use crate::commands::session::{run_session_join, run_session_leave, run_session_show};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    let mut filter = EnvFilter::from_default_env();
    if let Ok(directive) = "areabook=info".parse() {
        filter = filter.add_directive(directive);
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Commands::Completions { shell, output } = &cli.command {
        return run_completions(*shell, output.as_deref());
    }

    let db_path = resolve_db_path(cli.db_path);
    let engine = open_engine(&db_path, resolve_user(cli.user)).await?;

    match cli.command {
        Commands::Put { entity_type, file } => run_put(&engine, entity_type, file.as_deref()).await?,
        Commands::Get { entity_type, id } => run_get(&engine, entity_type, &id).await?,
        Commands::Check {
            entity_type,
            file,
            json,
        } => run_check(&engine, entity_type, file.as_deref(), json).await?,
        Commands::Conflicts { json } => run_conflicts(&engine, json).await?,
        Commands::Resolve { id, strategy } => run_resolve(&engine, &id, strategy).await?,
        Commands::Sweep { json } => run_sweep(&engine, json).await?,
        Commands::Lock { command } => match command {
            LockCommands::Acquire {
                entity_type,
                id,
                ttl_secs,
            } => run_lock_acquire(&engine, entity_type, &id, ttl_secs).await?,
            LockCommands::Release { entity_type, id } => {
                run_lock_release(&engine, entity_type, &id).await?;
            }
            LockCommands::Status {
                entity_type,
                id,
                json,
            } => run_lock_status(&engine, entity_type, &id, json).await?,
        },
        Commands::Session { command } => match command {
            SessionCommands::Join { entity_type, id } => {
                run_session_join(&engine, entity_type, &id).await?;
            }
            SessionCommands::Leave { entity_type, id } => {
                run_session_leave(&engine, entity_type, &id).await?;
            }
            SessionCommands::Show {
                entity_type,
                id,
                json,
            } => run_session_show(&engine, entity_type, &id, json).await?,
        },
        Commands::History { json } => run_history(&engine, json).await?,
        Commands::Analytics { json } => run_analytics(&engine, json).await?,
        Commands::Completions { .. } => {}
    }

    Ok(())
}
