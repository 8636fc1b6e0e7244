//! CLI command implementations
//!
//! Each command is implemented in its own submodule.

pub mod build;
pub mod cache;
pub mod check;

use anyhow::{Context, Result};
use clap::Subcommand;
use std::path::{Path, PathBuf};

use crate::cli::output::OutputConfig;
use crate::config::defaults;
use crate::core::config::{BuildConfig, BuildMode};
use crate::core::platform::Platform;
use crate::error::ConfigError;

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build platform artifacts
    Build {
        /// Platforms to build (defaults to every configured platform)
        #[arg(short, long = "platform", value_name = "PLATFORM", value_delimiter = ',')]
        platforms: Vec<Platform>,

        /// Build one platform at a time
        #[arg(long)]
        sequential: bool,

        /// Ignore the incremental build cache
        #[arg(long)]
        no_incremental: bool,

        /// Maximum number of simultaneous builds
        #[arg(short, long)]
        jobs: Option<usize>,

        /// Build mode (development or production)
        #[arg(short, long)]
        mode: Option<BuildMode>,
    },

    /// Validate configuration without building
    Check,

    /// Manage the incremental build cache
    Cache {
        #[command(subcommand)]
        command: CacheCommands,
    },
}

/// Cache subcommands
#[derive(Subcommand, Debug)]
pub enum CacheCommands {
    /// Show cache information
    Info,

    /// Clear cache entries
    Clear {
        /// Only clear this platform's entry
        #[arg(short, long)]
        platform: Option<Platform>,
    },
}

impl Commands {
    /// Execute the command
    pub async fn run(
        self,
        project_dir: &Path,
        config_path: Option<&Path>,
        output: OutputConfig,
    ) -> Result<()> {
        match self {
            Self::Build {
                platforms,
                sequential,
                no_incremental,
                jobs,
                mode,
            } => {
                let options = build::BuildOptions {
                    platforms,
                    sequential,
                    no_incremental,
                    jobs,
                    mode,
                };
                build::execute(project_dir, config_path, options, output).await
            }
            Self::Check => check::execute(project_dir, config_path, output).await,
            Self::Cache { command } => match command {
                CacheCommands::Info => cache::execute_info(project_dir, config_path, output).await,
                CacheCommands::Clear { platform } => {
                    cache::execute_clear(project_dir, config_path, platform, output).await
                }
            },
        }
    }
}

/// Config file location: the explicit path, or `tokenforge.toml` in the project
fn config_file(project_dir: &Path, config_path: Option<&Path>) -> PathBuf {
    config_path.map_or_else(
        || project_dir.join(defaults::CONFIG_FILE_NAME),
        |p| project_dir.join(p),
    )
}

/// Load the project configuration with paths resolved against its directory
pub(crate) fn load_config(project_dir: &Path, config_path: Option<&Path>) -> Result<BuildConfig> {
    let path = config_file(project_dir, config_path);
    let root = path.parent().unwrap_or(project_dir).to_path_buf();

    match BuildConfig::load(&path) {
        Ok(config) => {
            tracing::debug!("Loaded configuration from {}", path.display());
            Ok(config.rooted_at(&root))
        }
        Err(ConfigError::NotFound { .. }) => anyhow::bail!(
            "No {} found at {}. Create one to describe the platforms to build.",
            defaults::CONFIG_FILE_NAME,
            path.display()
        ),
        Err(e) => Err(e).with_context(|| format!("Failed to load {}", path.display())),
    }
}

/// Like [`load_config`], but fall back to defaults when there is no config file
pub(crate) fn load_config_or_default(
    project_dir: &Path,
    config_path: Option<&Path>,
) -> Result<BuildConfig> {
    if config_file(project_dir, config_path).exists() {
        load_config(project_dir, config_path)
    } else {
        Ok(BuildConfig::new(Vec::new()).rooted_at(project_dir))
    }
}

/// Project root implied by the config file location
pub(crate) fn project_root(project_dir: &Path, config_path: Option<&Path>) -> PathBuf {
    config_file(project_dir, config_path)
        .parent()
        .map_or_else(|| project_dir.to_path_buf(), Path::to_path_buf)
}
