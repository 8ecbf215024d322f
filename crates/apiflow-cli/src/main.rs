//! Apiflow CLI - imports payloads and serves the import API

mod commands;

use clap::{Parser, Subcommand};
use commands::{ImportCommand, ServeCommand, WorkspaceCommand};
use tracing_subscriber::{layer::SubscriberExt, Layer};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "APIFLOW_LOG_LEVEL", global = true)]
    log_level: String,

    /// Log format: compact, full
    #[arg(
        long,
        default_value = "compact",
        env = "APIFLOW_LOG_FORMAT",
        global = true
    )]
    log_format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP import API
    Serve(ServeCommand),
    /// Import a file or URL into a workspace
    Import(ImportCommand),
    /// Workspace management commands
    Workspace(WorkspaceCommand),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins when set; otherwise our crates follow --log-level
    let filter = match std::env::var("RUST_LOG") {
        Ok(_) => tracing_subscriber::EnvFilter::try_from_default_env()
            .map_err(|e| anyhow::anyhow!("Invalid RUST_LOG environment variable: {}", e))?,
        Err(_) => tracing_subscriber::EnvFilter::try_new(format!(
            "apiflow={level},\
             apiflow_cli={level},\
             apiflow_core={level},\
             apiflow_database={level},\
             apiflow_migrations={level},\
             apiflow_events={level},\
             apiflow_import={level},\
             apiflow_import_formats={level},\
             apiflow_import_types={level},\
             sqlx=warn,\
             sea_orm=warn,\
             h2=warn,\
             tower=warn,\
             hyper=warn,\
             reqwest=warn",
            level = cli.log_level
        ))
        .map_err(|e| anyhow::anyhow!("Invalid log level {}: {}", cli.log_level, e))?,
    };

    let fmt_layer = match cli.log_format.as_str() {
        "full" => tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_thread_names(false)
            .boxed(),
        _ => tracing_subscriber::fmt::layer()
            .compact()
            .with_target(false)
            .with_thread_ids(false)
            .with_thread_names(false)
            .boxed(),
    };

    let subscriber = tracing_subscriber::registry().with(filter).with(fmt_layer);
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to set global default subscriber: {}", e))?;

    match cli.command {
        Commands::Serve(serve_cmd) => serve_cmd.execute(),
        Commands::Import(import_cmd) => import_cmd.execute(),
        Commands::Workspace(workspace_cmd) => workspace_cmd.execute(),
    }
}
