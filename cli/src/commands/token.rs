//! TOKEN commands - Manage basic auth tokens directly in storage.

use anyhow::{Result, anyhow};
use chrono::Utc;
use clap::{Args, Subcommand};
use colored::Colorize;
use serde::Serialize;
use serde_json::{Value, json};

use lrs_server::auth::{generate_token, hash_secret};
use lrs_store::collections;

use super::{HumanReadable, output, resolve_storage};

/// Token management subcommands.
#[derive(Subcommand)]
pub enum TokenCommand {
    /// Create a basic auth token
    Create(CreateArgs),

    /// List token metadata (never secrets)
    List,

    /// Delete a token by key
    Delete(DeleteArgs),
}

/// Arguments for `token create`.
#[derive(Args)]
pub struct CreateArgs {
    /// Key to register; generated when absent
    #[arg(long)]
    pub key: Option<String>,

    /// Secret to register; generated when absent
    #[arg(long)]
    pub secret: Option<String>,

    /// Granted scopes (repeatable; defaults to "all")
    #[arg(long = "scope")]
    pub scopes: Vec<String>,

    /// Free-form label
    #[arg(long)]
    pub name: Option<String>,
}

/// Arguments for `token delete`.
#[derive(Args)]
pub struct DeleteArgs {
    /// Key of the token to delete
    pub key: String,
}

/// Response from `token create`. The only place the plaintext secret
/// ever appears.
#[derive(Debug, Serialize)]
pub struct CreateResponse {
    pub key: String,
    pub secret: String,
    pub scopes: Vec<String>,
}

impl HumanReadable for CreateResponse {
    fn print_human(&self) {
        println!("{}", "Token created!".green().bold());
        println!();
        println!("  {} {}", "Key:".cyan(), self.key);
        println!("  {} {}", "Secret:".cyan(), self.secret);
        println!("  {} {}", "Scopes:".cyan(), self.scopes.join(", "));
        println!();
        println!("{}", "Store the secret now; it is not recoverable.".yellow());
    }
}

/// Response from `token list`.
#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub tokens: Vec<Value>,
}

impl HumanReadable for ListResponse {
    fn print_human(&self) {
        println!("{} token(s)", self.tokens.len());
        for token in &self.tokens {
            let key = token.get("key").and_then(|v| v.as_str()).unwrap_or("?");
            let scopes = token
                .get("scopes")
                .and_then(|v| v.as_array())
                .map(|s| {
                    s.iter()
                        .filter_map(|v| v.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                })
                .unwrap_or_default();
            println!("  {} {} [{}]", "-".dimmed(), key.cyan(), scopes);
        }
    }
}

/// Response from `token delete`.
#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub key: String,
    pub deleted: bool,
}

impl HumanReadable for DeleteResponse {
    fn print_human(&self) {
        println!("{} {}", "Deleted token".green(), self.key.cyan());
    }
}

/// Execute a token subcommand.
pub async fn execute(human: bool, command: TokenCommand) -> Result<()> {
    match command {
        TokenCommand::Create(args) => create(human, args).await,
        TokenCommand::List => list(human).await,
        TokenCommand::Delete(args) => delete(human, args).await,
    }
}

async fn create(human: bool, args: CreateArgs) -> Result<()> {
    let storage = resolve_storage().await?;
    let tokens = storage.collection(collections::BASIC_TOKENS)?;

    let key = args.key.unwrap_or_else(generate_token);
    let secret = args.secret.unwrap_or_else(generate_token);
    let scopes = if args.scopes.is_empty() {
        vec!["all".to_string()]
    } else {
        args.scopes
    };

    if tokens.get(&key).await?.is_some() {
        return Err(anyhow!("token key {} already exists", key));
    }

    let document = json!({
        "key": key,
        "name": args.name,
        "secretHash": hash_secret(&secret).map_err(|e| anyhow!(e.to_string()))?,
        "scopes": scopes.clone(),
        "createdAt": Utc::now().to_rfc3339(),
    });
    tokens.put(&key, document).await?;

    output(&CreateResponse { key, secret, scopes }, human)
}

async fn list(human: bool) -> Result<()> {
    let storage = resolve_storage().await?;
    let tokens = storage.collection(collections::BASIC_TOKENS)?;

    let documents = tokens.list("", 100).await?;
    let listed = documents
        .iter()
        .map(|d| {
            json!({
                "key": d.get("key"),
                "name": d.get("name"),
                "scopes": d.get("scopes"),
                "createdAt": d.get("createdAt"),
            })
        })
        .collect();

    output(&ListResponse { tokens: listed }, human)
}

async fn delete(human: bool, args: DeleteArgs) -> Result<()> {
    let storage = resolve_storage().await?;
    let tokens = storage.collection(collections::BASIC_TOKENS)?;

    if !tokens.delete(&args.key).await? {
        return Err(anyhow!("token key {} not found", args.key));
    }

    output(
        &DeleteResponse {
            key: args.key,
            deleted: true,
        },
        human,
    )
}
