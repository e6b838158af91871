use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use embed_lsp::config::{DEFAULT_SOURCE_SUFFIX, ServerConfig};
use embed_lsp::lsp::server::run_server;

#[derive(Parser)]
#[command(name = "embed-lsp", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Deadline for each request in milliseconds
    #[arg(long, global = true, default_value_t = 1000)]
    timeout_ms: u64,

    /// Only documents whose path ends with this suffix are tracked
    #[arg(long, global = true, default_value = DEFAULT_SOURCE_SUFFIX)]
    suffix: String,

    /// Log file (defaults to $XDG_DATA_HOME/embed-lsp/embed-lsp.log)
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the language server over stdio (default)
    Lsp,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = ServerConfig {
        source_suffix: cli.suffix,
        request_timeout: Duration::from_millis(cli.timeout_ms),
        ..ServerConfig::default()
    };
    if let Some(log_file) = cli.log_file {
        config.log_file = log_file;
    }

    match cli.command.unwrap_or(Command::Lsp) {
        Command::Lsp => run_server(config).await,
    }
}
