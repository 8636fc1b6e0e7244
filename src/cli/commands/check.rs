//! Check command implementation
//!
//! Implements `tokenforge check` to validate configuration without building.

use anyhow::{bail, Result};
use std::path::Path;

use super::load_config;
use crate::cli::output::{status, OutputConfig};

/// Execute the check command
pub async fn execute(project_dir: &Path, config_path: Option<&Path>, output: OutputConfig) -> Result<()> {
    let config = load_config(project_dir, config_path)?;
    let validation = config.validate();
    let errors: Vec<String> = validation.errors.iter().map(ToString::to_string).collect();

    tracing::info!("Checking configuration for {} platforms", config.platforms.len());

    if output.json {
        let value = serde_json::json!({
            "valid": validation.valid,
            "errors": errors,
            "warnings": validation.warnings,
            "platforms": config.platforms,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else if !output.quiet {
        println!("Checking build configuration...\n");

        if validation.valid {
            println!("{} Configuration is valid", status::SUCCESS);
        } else {
            println!("{} Configuration has errors", status::ERROR);
            for error in &errors {
                println!("  - {error}");
            }
        }

        if !validation.warnings.is_empty() {
            println!("\nWarnings:");
            for warning in &validation.warnings {
                println!("  {} {warning}", status::WARNING);
            }
        }

        println!("\nPlatforms that would be built:");
        if config.platforms.is_empty() {
            println!("  (none)");
        }
        for &platform in &config.platforms {
            match config.command_for(platform) {
                Some(command) => println!("  • {platform}: {command}"),
                None => println!("  {} {platform}: no build command configured", status::WARNING),
            }
        }
        println!(
            "\nMode: {}, strategy: {}, incremental: {}",
            config.mode,
            if config.parallel { "parallel" } else { "sequential" },
            if config.incremental { "on" } else { "off" }
        );
    }

    if !validation.valid {
        bail!("Configuration check failed with {} errors", errors.len());
    }
    Ok(())
}
