//! Shell command platform builder
//!
//! Runs the command configured for a platform under `[commands]` with
//! `sh -c`, from the project root. The command receives:
//!
//! - `TOKENFORGE_PLATFORM` - platform name
//! - `TOKENFORGE_MODE` - `development` or `production`
//! - `TOKENFORGE_OUTPUT_DIR` - directory the command should write into
//!
//! Lines on stdout starting with `warning:` become build warnings.

use anyhow::{anyhow, bail, Context, Result};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Instant;
use tokio::process::Command;

use crate::core::config::BuildConfig;
use crate::core::executor::BuildFuture;
use crate::core::orchestrator::PlatformBuilder;
use crate::core::platform::Platform;
use crate::core::result::BuildResult;

const WARNING_PREFIX: &str = "warning:";

/// Builds platforms by running configured shell commands
#[derive(Debug, Clone)]
pub struct ScriptBuilder {
    project_root: PathBuf,
}

impl ScriptBuilder {
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
        }
    }
}

impl PlatformBuilder for ScriptBuilder {
    fn build(&self, platform: Platform, config: Arc<BuildConfig>) -> BuildFuture {
        let root = self.project_root.clone();
        Box::pin(async move { run_command(&root, platform, &config).await })
    }
}

/// Last few lines of a command's stderr, for error messages
fn stderr_tail(stderr: &str) -> String {
    let lines: Vec<&str> = stderr.lines().filter(|l| !l.trim().is_empty()).collect();
    lines[lines.len().saturating_sub(5)..].join("\n")
}

/// Run the build command for one platform
pub async fn run_command(root: &Path, platform: Platform, config: &BuildConfig) -> Result<BuildResult> {
    let command = config.command_for(platform).ok_or_else(|| {
        anyhow!("No build command configured for {platform}. Add one under [commands] in tokenforge.toml")
    })?;
    let output_dir = config.platform_output_dir(platform);
    tokio::fs::create_dir_all(&output_dir)
        .await
        .with_context(|| format!("Failed to create output directory: {}", output_dir.display()))?;

    tracing::debug!("Running build command for {platform}: {command}");
    let start = Instant::now();
    let output = Command::new("sh")
        .arg("-c")
        .arg(command)
        .current_dir(root)
        .env("TOKENFORGE_PLATFORM", platform.as_str())
        .env("TOKENFORGE_MODE", config.mode.as_str())
        .env("TOKENFORGE_OUTPUT_DIR", &output_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .with_context(|| format!("Failed to run build command for {platform}"))?;
    let duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);

    if !output.status.success() {
        let status = output
            .status
            .code()
            .map_or_else(|| "a signal".to_string(), |code| format!("exit code {code}"));
        let tail = stderr_tail(&stderr);
        if tail.is_empty() {
            bail!("Build command for {platform} failed with {status}");
        }
        bail!("Build command for {platform} failed with {status}:\n{tail}");
    }

    let mut result = BuildResult::success(platform, output_dir)
        .with_duration(duration_ms)
        .with_metadata("command", serde_json::Value::String(command.to_string()));
    for line in stdout.lines() {
        if let Some(warning) = line.trim().strip_prefix(WARNING_PREFIX) {
            result = result.with_warning(warning.trim());
        }
    }
    Ok(result)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config_with(temp: &TempDir, platform: Platform, command: &str) -> BuildConfig {
        let mut config = BuildConfig::new(vec![platform]).rooted_at(temp.path());
        config
            .commands
            .insert(platform.as_str().to_string(), command.to_string());
        config
    }

    #[test]
    fn test_stderr_tail_keeps_last_lines() {
        let stderr = (1..=8).map(|i| format!("line {i}")).collect::<Vec<_>>().join("\n");
        let tail = stderr_tail(&stderr);
        assert!(tail.starts_with("line 4"));
        assert!(tail.ends_with("line 8"));
    }

    #[tokio::test]
    async fn test_successful_command() {
        let temp = TempDir::new().unwrap();
        let config = config_with(
            &temp,
            Platform::Web,
            "echo \":root {}\" > \"$TOKENFORGE_OUTPUT_DIR/tokens.css\"",
        );

        let result = run_command(temp.path(), Platform::Web, &config).await.unwrap();

        assert!(result.success);
        let output_dir = temp.path().join("dist/web");
        assert_eq!(result.output_path.as_deref(), Some(output_dir.as_path()));
        assert!(output_dir.join("tokens.css").exists());
    }

    #[tokio::test]
    async fn test_environment_is_passed() {
        let temp = TempDir::new().unwrap();
        let config = config_with(
            &temp,
            Platform::Ios,
            "echo \"$TOKENFORGE_PLATFORM $TOKENFORGE_MODE\" > \"$TOKENFORGE_OUTPUT_DIR/env.txt\"",
        );

        run_command(temp.path(), Platform::Ios, &config).await.unwrap();

        let env = std::fs::read_to_string(temp.path().join("dist/ios/env.txt")).unwrap();
        assert_eq!(env.trim(), "ios development");
    }

    #[tokio::test]
    async fn test_warnings_are_collected() {
        let temp = TempDir::new().unwrap();
        let config = config_with(
            &temp,
            Platform::Android,
            "echo 'generating'; echo 'warning: unused color token'",
        );

        let result = run_command(temp.path(), Platform::Android, &config).await.unwrap();
        assert_eq!(result.warnings, vec!["unused color token"]);
    }

    #[tokio::test]
    async fn test_failing_command() {
        let temp = TempDir::new().unwrap();
        let config = config_with(&temp, Platform::Web, "echo 'bad token file' >&2; exit 3");

        let err = run_command(temp.path(), Platform::Web, &config).await.unwrap_err();
        let message = err.to_string();
        assert!(message.contains("exit code 3"));
        assert!(message.contains("bad token file"));
    }

    #[tokio::test]
    async fn test_missing_command() {
        let temp = TempDir::new().unwrap();
        let config = BuildConfig::new(vec![Platform::Web]).rooted_at(temp.path());

        let err = run_command(temp.path(), Platform::Web, &config).await.unwrap_err();
        assert!(err.to_string().contains("No build command configured for web"));
    }
}
