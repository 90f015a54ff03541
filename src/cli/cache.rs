//! Cache inspection command handler.

use anyhow::{Context, Result};
use serde_json::Value;

use reviewdesk::cache::{Cache, MemoCache};
use reviewdesk::config::Config;

use super::CacheSubcommand;

/// Handle `reviewdesk cache` subcommands.
pub(crate) fn cmd_cache(config: &Config, action: CacheSubcommand) -> Result<()> {
    let cache = MemoCache::new(&config.cache.root);
    match action {
        CacheSubcommand::Stats => {
            let count = cache
                .entry_count()
                .with_context(|| "Failed to count cache records")?;
            println!("Cache root: {}", cache.root().display());
            println!("Records:    {}", count);
        }
        CacheSubcommand::Show { key } => {
            match cache
                .load::<Value>(&key)
                .with_context(|| format!("Failed to read cache record {}", key))?
            {
                Some(value) => println!("{}", serde_json::to_string_pretty(&value)?),
                None => println!("No record for {}", key),
            }
        }
        CacheSubcommand::Remove { key } => {
            if cache
                .remove(&key)
                .with_context(|| format!("Failed to remove cache record {}", key))?
            {
                println!("Removed {}", key);
            } else {
                println!("No record for {}", key);
            }
        }
    }
    Ok(())
}
