//! INSTALL command - Apply storage indexes.

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use serde::Serialize;

use super::{HumanReadable, output, resolve_storage};

/// Arguments for the install command.
#[derive(Args)]
pub struct InstallArgs {
    /// Probe connectivity first and fail early if the backend is unreachable
    #[arg(long)]
    pub ping: bool,
}

/// Response from the install command.
#[derive(Debug, Serialize)]
pub struct InstallResponse {
    pub backend: String,
    pub installed: bool,
}

impl HumanReadable for InstallResponse {
    fn print_human(&self) {
        println!("{}", "Storage indexes installed!".green().bold());
        println!();
        println!("  {} {}", "Backend:".cyan(), self.backend);
    }
}

/// Execute the install command.
pub async fn execute(human: bool, args: InstallArgs) -> Result<()> {
    let storage = resolve_storage().await?;

    if args.ping {
        storage.ping().await?;
    }
    storage.install().await?;

    output(
        &InstallResponse {
            backend: storage.name().to_string(),
            installed: true,
        },
        human,
    )
}
