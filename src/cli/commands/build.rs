//! Build command implementation
//!
//! Implements `tokenforge build` to generate platform artifacts.

use anyhow::{bail, Result};
use std::path::Path;
use std::sync::Arc;

use super::{load_config, project_root};
use crate::cli::output::{create_build_bar, format_duration_ms, status, OutputConfig};
use crate::core::config::BuildMode;
use crate::core::executor::ExecutionResult;
use crate::core::orchestrator::BuildOrchestrator;
use crate::core::platform::Platform;
use crate::core::progress::CompletionReport;
use crate::core::result::BuildResult;
use crate::infra::script::ScriptBuilder;

/// Build options
#[derive(Debug, Default)]
pub struct BuildOptions {
    /// Platforms to build; empty means every configured platform
    pub platforms: Vec<Platform>,
    /// Use the sequential strategy
    pub sequential: bool,
    /// Bypass the incremental build cache
    pub no_incremental: bool,
    /// Maximum number of simultaneous builds
    pub jobs: Option<usize>,
    /// Override the configured build mode
    pub mode: Option<BuildMode>,
}

/// Execute the build command
pub async fn execute(
    project_dir: &Path,
    config_path: Option<&Path>,
    options: BuildOptions,
    output: OutputConfig,
) -> Result<()> {
    let mut config = load_config(project_dir, config_path)?;
    if options.sequential {
        config.parallel = false;
    }
    if options.no_incremental {
        config.incremental = false;
    }
    if let Some(jobs) = options.jobs {
        config.max_concurrency = Some(jobs);
    }
    if let Some(mode) = options.mode {
        config.mode = mode;
    }

    let platforms = if options.platforms.is_empty() {
        config.platforms.clone()
    } else {
        options.platforms
    };

    let builder = ScriptBuilder::new(project_root(project_dir, config_path));
    let orchestrator = Arc::new(BuildOrchestrator::new(Arc::new(builder)));
    let warnings = orchestrator.configure(config)?;
    if output.is_human() {
        for warning in &warnings {
            println!("{} {warning}", status::WARNING);
        }
    }

    let bar = output.is_human().then(|| {
        let bar = create_build_bar(platforms.len() as u64);
        let progress = bar.clone();
        orchestrator.on_progress(move |snapshot| {
            progress.set_position((snapshot.completed_count + snapshot.failed_count) as u64);
            progress.set_message(format!("{} active", snapshot.active_count));
            Ok(())
        });
        bar
    });

    let interrupt = {
        let orchestrator = Arc::clone(&orchestrator);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupted; cancelling build");
                orchestrator.cancel();
            }
        })
    };
    let outcome = orchestrator.build(&platforms).await;
    interrupt.abort();
    if let Some(bar) = &bar {
        bar.finish_and_clear();
    }
    let execution = outcome?;
    let report = orchestrator.get_summary();

    if output.json {
        let value = serde_json::json!({
            "execution": &execution,
            "report": &report,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else if !output.quiet {
        print_execution(&execution, report.as_ref());
    }

    if !execution.is_success() {
        bail!(
            "{} of {} platforms did not build",
            execution.failure_count + execution.skipped_platforms.len(),
            platforms.len()
        );
    }
    Ok(())
}

fn print_result(result: &BuildResult) {
    let duration = format_duration_ms(result.duration_ms);
    if result.success {
        let path = result
            .output_path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        let cached = if result.cache_hit { ", cached" } else { "" };
        println!("{} {:<8} {path} ({duration}{cached})", status::SUCCESS, result.platform.as_str());
    } else {
        println!("{} {:<8} ({duration})", status::ERROR, result.platform.as_str());
        for error in &result.errors {
            println!("    [{}] {}", error.code(), error.message());
            for suggestion in error.suggestions() {
                println!("      • {suggestion}");
            }
        }
    }
    for warning in &result.warnings {
        println!("    {} {warning}", status::WARNING);
    }
}

fn print_execution(execution: &ExecutionResult, report: Option<&CompletionReport>) {
    for result in &execution.results {
        print_result(result);
    }
    for platform in &execution.skipped_platforms {
        println!("{} {:<8} skipped", status::INFO, platform.as_str());
    }

    if let Some(report) = report {
        println!();
        println!("{}", report.summary);
        if report.cache_hits > 0 {
            println!("  Cache hits: {}", report.cache_hits);
        }
        if report.average_build_time_ms > 0 {
            println!(
                "  Build times: avg {}, fastest {}, slowest {}",
                format_duration_ms(report.average_build_time_ms),
                format_duration_ms(report.fastest_build_time_ms),
                format_duration_ms(report.slowest_build_time_ms)
            );
        }
    }
}
