use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod commands;
mod controller;
mod render;
mod store;
#[cfg(test)]
mod testing;
mod util;

use commands::event::EventCommands;
use commands::inventory::InventoryCommands;

#[derive(Parser)]
#[command(name = "ledger", version, about = "CI Ledger CLI for browsing and editing change events")]
struct Cli {
    /// API base URL
    #[arg(long, env = "LEDGER_API_URL", default_value = "http://localhost:8000")]
    api_url: String,

    /// Bearer token sent with every request
    #[arg(long, env = "LEDGER_API_TOKEN", hide_env_values = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Browse, filter, create and delete events
    Events {
        #[command(subcommand)]
        command: EventCommands,
    },
    /// Manage agents, tools and tags
    Inventory {
        #[command(subcommand)]
        command: InventoryCommands,
    },
    /// Interactive events page: filters, pagination, delete with undo
    Shell,
}

/// Logs go to stderr so stdout stays clean for JSON output.
fn init_tracing() {
    let json = std::env::var("LEDGER_LOG_JSON").is_ok_and(|v| v == "1" || v.eq_ignore_ascii_case("true"));
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ledger_cli=warn,ledger_core=warn".into()),
        )
        .with(json.then(|| tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr)))
        .with((!json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr)))
        .init();
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    init_tracing();
    let cli = Cli::parse();
    let token = cli.token.as_deref();

    let code = match cli.command {
        Commands::Events { command } => commands::event::run(&cli.api_url, token, command).await,
        Commands::Inventory { command } => commands::inventory::run(&cli.api_url, token, command).await,
        Commands::Shell => commands::shell::run(&cli.api_url, token).await,
    };
    std::process::exit(code);
}
