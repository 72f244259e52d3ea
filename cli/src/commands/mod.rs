//! Command implementations and shared output helpers.

pub mod install;
pub mod status;
pub mod token;

use anyhow::Result;
use serde::Serialize;

/// Types that can render themselves for a human reader.
pub trait HumanReadable {
    fn print_human(&self);
}

/// Print a response: JSON by default, formatted text with `--human`.
pub fn output<T: Serialize + HumanReadable>(value: &T, human: bool) -> Result<()> {
    if human {
        value.print_human();
    } else {
        println!("{}", serde_json::to_string_pretty(value)?);
    }
    Ok(())
}

/// Resolve the storage backend from the environment, exactly as the server
/// does at boot.
pub async fn resolve_storage() -> Result<std::sync::Arc<dyn lrs_store::StorageAdapter>> {
    let config = lrs_store::StoreConfig::from_env()?;
    let storage = lrs_store::registry::resolve(&config).await?;
    Ok(storage)
}
