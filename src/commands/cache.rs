/// `snb cache` command implementation
///
/// Inspects or resets the cache state directory of a build root.
use anyhow::{Context, Result};
use std::fs;
use std::io;

use crate::cli::{CacheArgs, CacheCommands, CommonConfigArgs};
use crate::cli_utils::{snb_prefix, use_ansi};
use crate::merger::MergedBuildConfig;
use crate::storage::{rocks::DB_NAME, CacheStore, RocksCacheStore};

pub async fn cache(args: &CacheArgs) -> Result<()> {
    match &args.command {
        CacheCommands::Stats { common } => stats(common).await,
        CacheCommands::Clean { common } => clean(common).await,
    }
}

/// Show cache statistics
async fn stats(common: &CommonConfigArgs) -> Result<()> {
    let config = MergedBuildConfig::load(common)?;

    println!("Cache: {}", config.state_dir.display());

    if !config.state_dir.join(DB_NAME).exists() {
        println!("Status: EMPTY");
        return Ok(());
    }

    let store = RocksCacheStore::open(&config.state_dir).context("Failed to open cache store")?;
    let stats = store.stats().context("Failed to get cache statistics")?;

    println!("Step records: {}", stats.step_records);
    println!("Object records: {}", stats.object_records);

    Ok(())
}

/// Remove the whole state directory
async fn clean(common: &CommonConfigArgs) -> Result<()> {
    let config = MergedBuildConfig::load(common)?;
    let prefix = snb_prefix(use_ansi(&io::stdout()));

    if !config.state_dir.exists() {
        println!("{} Nothing to clean.", prefix);
        return Ok(());
    }

    fs::remove_dir_all(&config.state_dir).with_context(|| {
        format!(
            "Failed to remove cache directory: {}",
            config.state_dir.display()
        )
    })?;

    println!(
        "{} Removed cache directory: {}",
        prefix,
        config.state_dir.display()
    );

    Ok(())
}
