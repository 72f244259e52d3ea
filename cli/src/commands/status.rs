//! STATUS command - Query a running server's /about endpoint.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::{Deserialize, Serialize};

use super::{HumanReadable, output};

/// Arguments for the status command.
#[derive(Args)]
pub struct StatusArgs {
    /// Server base URL
    #[arg(long, env = "LRS_URL", default_value = "http://localhost:8080")]
    pub url: String,
}

/// The server's /about response.
#[derive(Debug, Deserialize, Serialize)]
pub struct StatusResponse {
    pub version: String,
    #[serde(rename = "supportedVersions")]
    pub supported_versions: Vec<String>,
    pub storage: String,
}

impl HumanReadable for StatusResponse {
    fn print_human(&self) {
        println!("{}", "Server is up!".green().bold());
        println!();
        println!("  {} {}", "Version:".cyan(), self.version);
        println!(
            "  {} {}",
            "Supported:".cyan(),
            self.supported_versions.join(", ")
        );
        println!("  {} {}", "Storage:".cyan(), self.storage);
    }
}

/// Execute the status command.
pub async fn execute(human: bool, args: StatusArgs) -> Result<()> {
    let client = reqwest::Client::new();
    let url = format!("{}/about", args.url.trim_end_matches('/'));

    let response: StatusResponse = client
        .get(&url)
        .send()
        .await
        .with_context(|| format!("request to {} failed", url))?
        .error_for_status()?
        .json()
        .await
        .context("response body is not the expected /about shape")?;

    output(&response, human)
}
