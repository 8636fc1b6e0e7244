//! CLI command for `tokenforge cache`
//!
//! Inspects and clears the incremental build cache.

use anyhow::Result;
use std::path::Path;

use super::load_config_or_default;
use crate::cli::output::OutputConfig;
use crate::core::incremental::IncrementalBuilder;
use crate::core::platform::Platform;

/// Execute cache info subcommand
pub async fn execute_info(
    project_dir: &Path,
    config_path: Option<&Path>,
    output: OutputConfig,
) -> Result<()> {
    let config = load_config_or_default(project_dir, config_path)?;
    let stats = IncrementalBuilder::from_config(&config).get_cache_stats();

    if output.json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }
    if output.quiet {
        return Ok(());
    }

    println!("📦 Cache Information\n");
    println!("Location: {}", stats.path.display());
    println!("Artifact size: {}", stats.format_size());
    println!("Entries: {}", stats.entry_count);

    if stats.entry_count == 0 {
        println!("\n⚠️  No cached builds");
        return Ok(());
    }

    let platforms: Vec<&str> = stats.platforms.iter().map(|p| p.as_str()).collect();
    println!("Platforms: {}", platforms.join(", "));
    if let (Some(oldest), Some(newest)) = (stats.oldest_entry, stats.newest_entry) {
        println!("Oldest entry: {}", oldest.to_rfc3339());
        println!("Newest entry: {}", newest.to_rfc3339());
    }

    Ok(())
}

/// Execute cache clear subcommand
pub async fn execute_clear(
    project_dir: &Path,
    config_path: Option<&Path>,
    platform: Option<Platform>,
    output: OutputConfig,
) -> Result<()> {
    let config = load_config_or_default(project_dir, config_path)?;
    let builder = IncrementalBuilder::from_config(&config);
    let before = builder.get_cache_stats().entry_count;

    builder.clear_cache(platform);
    let removed = before - builder.get_cache_stats().entry_count;

    if output.json {
        let value = serde_json::json!({ "removed": removed, "platform": platform });
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else if !output.quiet {
        match (platform, removed) {
            (Some(platform), 0) => println!("✅ No cached build for {platform}"),
            (None, 0) => println!("✅ Cache was already empty"),
            (Some(platform), _) => println!("✅ Cleared cached build for {platform}"),
            (None, n) => println!("✅ Cache cleared ({n} entries removed)"),
        }
    }
    Ok(())
}
