//! Command-line administration tool for the openlrs Learning Record Store.
//!
//! Commands:
//! - install: Apply storage indexes for the configured backend
//! - token create/list/delete: Manage basic auth tokens directly in storage
//! - status: Query a running server's /about endpoint
//!
//! Storage commands read the same environment variables as the server
//! (LRS_STORAGE, DATABASE_URL); status talks to a server over HTTP.

mod commands;

use clap::{Parser, Subcommand};

use commands::{install::InstallArgs, status::StatusArgs, token::TokenCommand};

/// openlrs administration CLI
#[derive(Parser)]
#[command(name = "lrs")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Output human-readable formatted text instead of JSON
    #[arg(long, global = true)]
    human: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply storage indexes for the configured backend
    Install(InstallArgs),

    /// Manage basic auth tokens
    #[command(subcommand)]
    Token(TokenCommand),

    /// Query a running server's /about endpoint
    Status(StatusArgs),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Install(args) => commands::install::execute(cli.human, args).await,
        Commands::Token(command) => commands::token::execute(cli.human, command).await,
        Commands::Status(args) => commands::status::execute(cli.human, args).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
