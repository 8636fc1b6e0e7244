//! Sequential build strategy
//!
//! Builds one platform at a time in input order. Platforms that never start
//! (after a cancellation, or after a failure with `stop_on_failure`) are
//! listed in `skipped_platforms` and have no entry in `results`.

use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

use super::{millis, run_guarded, BuildFn, CancelSlot, ExecutionResult, ResultCallback};
use crate::config::defaults;
use crate::core::platform::Platform;
use crate::error::ExecutorError;

/// Progress report emitted before each platform and once at the end
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequentialProgress {
    /// Platform about to be built; `None` in the final report
    pub current_platform: Option<Platform>,
    /// Zero-based index of the current platform
    pub current_index: usize,
    /// Number of platforms in the run
    pub total: usize,
    /// `round(current_index / total * 100)`
    pub percent_complete: u8,
    /// Successful builds so far
    pub success_count: usize,
    /// Failed builds so far
    pub failure_count: usize,
    /// Time since the run started, in milliseconds
    pub elapsed_ms: u64,
}

/// Callback receiving [`SequentialProgress`] reports
pub type SequentialProgressCallback = Box<dyn Fn(&SequentialProgress) + Send + Sync>;

/// Options for [`SequentialExecutor::execute`]
pub struct SequentialOptions {
    /// Skip the remaining platforms after the first failure
    pub stop_on_failure: bool,
    /// Per-build timeout
    pub build_timeout: Duration,
    /// Optional progress callback
    pub on_progress: Option<SequentialProgressCallback>,
    /// Called with every result; skipped platforms have none
    pub on_result: Option<ResultCallback>,
}

impl Default for SequentialOptions {
    fn default() -> Self {
        Self {
            stop_on_failure: false,
            build_timeout: Duration::from_millis(defaults::BUILD_TIMEOUT_MS),
            on_progress: None,
            on_result: None,
        }
    }
}

impl std::fmt::Debug for SequentialOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SequentialOptions")
            .field("stop_on_failure", &self.stop_on_failure)
            .field("build_timeout", &self.build_timeout)
            .field("on_progress", &self.on_progress.is_some())
            .field("on_result", &self.on_result.is_some())
            .finish()
    }
}

/// Runs builds one at a time
#[derive(Debug, Default)]
pub struct SequentialExecutor {
    cancel: CancelSlot,
}

fn percent(index: usize, total: usize) -> u8 {
    u8::try_from((index * 100 + total / 2) / total).unwrap_or(100)
}

impl SequentialExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation of the current run
    pub fn cancel(&self) {
        tracing::info!("Cancelling sequential build");
        self.cancel.cancel();
    }

    /// Whether the current run has been cancelled
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Build platforms one by one in input order
    pub async fn execute(
        &self,
        platforms: &[Platform],
        build: BuildFn,
        options: &SequentialOptions,
    ) -> Result<ExecutionResult, ExecutorError> {
        self.execute_with_token(platforms, build, options, CancellationToken::new())
            .await
    }

    /// Like [`execute`](Self::execute), cancelled through a caller-supplied token
    pub async fn execute_with_token(
        &self,
        platforms: &[Platform],
        build: BuildFn,
        options: &SequentialOptions,
        token: CancellationToken,
    ) -> Result<ExecutionResult, ExecutorError> {
        if platforms.is_empty() {
            return Err(ExecutorError::NoPlatforms);
        }

        self.cancel.install(&token);
        let started = Instant::now();
        let total = platforms.len();
        let mut results = Vec::with_capacity(total);
        let mut skipped = Vec::new();
        let mut stopped_on_failure = false;
        let (mut succeeded, mut failed) = (0, 0);

        tracing::info!("Building {total} platforms sequentially");

        for (index, &platform) in platforms.iter().enumerate() {
            if token.is_cancelled() {
                skipped.extend_from_slice(&platforms[index..]);
                tracing::info!("Build cancelled; skipping {} platforms", skipped.len());
                break;
            }

            if let Some(report) = &options.on_progress {
                report(&SequentialProgress {
                    current_platform: Some(platform),
                    current_index: index,
                    total,
                    percent_complete: percent(index, total),
                    success_count: succeeded,
                    failure_count: failed,
                    elapsed_ms: millis(started.elapsed()),
                });
            }

            let result = run_guarded(platform, &build, options.build_timeout, &token).await;
            if let Some(on_result) = &options.on_result {
                on_result(&result);
            }
            let stop = !result.success && options.stop_on_failure && !result.is_cancelled();
            if result.success {
                succeeded += 1;
            } else {
                failed += 1;
            }
            results.push(result);

            if stop {
                skipped.extend_from_slice(&platforms[index + 1..]);
                stopped_on_failure = true;
                tracing::warn!(
                    "Build for {platform} failed; skipping {} remaining platforms",
                    skipped.len()
                );
                break;
            }
        }

        if let Some(report) = &options.on_progress {
            report(&SequentialProgress {
                current_platform: None,
                current_index: total,
                total,
                percent_complete: 100,
                success_count: succeeded,
                failure_count: failed,
                elapsed_ms: millis(started.elapsed()),
            });
        }

        let all_completed = !token.is_cancelled() && skipped.is_empty();
        let mut execution = ExecutionResult::new(results, started.elapsed(), all_completed);
        execution.skipped_platforms = skipped;
        execution.stopped_on_failure = stopped_on_failure;

        tracing::info!(
            "Sequential build finished: {} succeeded, {} failed, {} skipped in {}ms",
            execution.success_count,
            execution.failure_count,
            execution.skipped_platforms.len(),
            execution.duration_ms
        );
        Ok(execution)
    }
}
