//! Parallel build strategy
//!
//! Without a concurrency limit every platform starts at once and all builds
//! are settled before returning; one failure never cancels its siblings.
//! With `max_concurrency = K` platforms are split into fixed batches of `K`
//! that run one after another, each batch fully settled before the next
//! starts. A result is synthesized for every platform, including ones that
//! never started.

use futures::future::join_all;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

use super::{run_guarded, BuildFn, CancelSlot, ExecutionResult, ResultCallback};
use crate::config::defaults;
use crate::core::platform::Platform;
use crate::core::result::{BuildResult, CancelReason};
use crate::error::ExecutorError;

/// Options for [`ParallelExecutor::execute`]
#[derive(Clone)]
pub struct ParallelOptions {
    /// Batch size; `None` runs every platform at once
    pub max_concurrency: Option<usize>,
    /// Per-build timeout
    pub build_timeout: Duration,
    /// Keep starting batches after a failure
    pub continue_on_failure: bool,
    /// Called with every result, including synthesized cancellations
    pub on_result: Option<ResultCallback>,
}

impl ParallelOptions {
    fn settled(&self, result: BuildResult) -> BuildResult {
        if let Some(on_result) = &self.on_result {
            on_result(&result);
        }
        result
    }
}

impl Default for ParallelOptions {
    fn default() -> Self {
        Self {
            max_concurrency: None,
            build_timeout: Duration::from_millis(defaults::BUILD_TIMEOUT_MS),
            continue_on_failure: true,
            on_result: None,
        }
    }
}

impl std::fmt::Debug for ParallelOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParallelOptions")
            .field("max_concurrency", &self.max_concurrency)
            .field("build_timeout", &self.build_timeout)
            .field("continue_on_failure", &self.continue_on_failure)
            .field("on_result", &self.on_result.is_some())
            .finish()
    }
}

/// Runs builds concurrently
#[derive(Debug, Default)]
pub struct ParallelExecutor {
    cancel: CancelSlot,
}

impl ParallelExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation of the current run
    ///
    /// In-flight builds resolve to `BUILD_CANCELLED` immediately; the build
    /// futures themselves are left to finish in the background.
    pub fn cancel(&self) {
        tracing::info!("Cancelling parallel build");
        self.cancel.cancel();
    }

    /// Whether the current run has been cancelled
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Build every platform and aggregate the results in input order
    pub async fn execute(
        &self,
        platforms: &[Platform],
        build: BuildFn,
        options: &ParallelOptions,
    ) -> Result<ExecutionResult, ExecutorError> {
        self.execute_with_token(platforms, build, options, CancellationToken::new())
            .await
    }

    /// Like [`execute`](Self::execute), cancelled through a caller-supplied token
    ///
    /// A token cancelled before the call makes every platform `BUILD_CANCELLED`.
    pub async fn execute_with_token(
        &self,
        platforms: &[Platform],
        build: BuildFn,
        options: &ParallelOptions,
        token: CancellationToken,
    ) -> Result<ExecutionResult, ExecutorError> {
        if platforms.is_empty() {
            return Err(ExecutorError::NoPlatforms);
        }

        self.cancel.install(&token);
        let started = Instant::now();
        let batch_size = options
            .max_concurrency
            .unwrap_or(platforms.len())
            .clamp(1, platforms.len());

        tracing::info!(
            "Building {} platforms in parallel (batch size {batch_size})",
            platforms.len()
        );

        let mut results: Vec<BuildResult> = Vec::with_capacity(platforms.len());
        let mut halted: Option<CancelReason> = None;

        for batch in platforms.chunks(batch_size) {
            if halted.is_none() && token.is_cancelled() {
                halted = Some(CancelReason::Requested);
            }
            if let Some(reason) = halted {
                results.extend(
                    batch
                        .iter()
                        .map(|&p| options.settled(BuildResult::cancelled(p, reason))),
                );
                continue;
            }

            let batch_results = join_all(batch.iter().map(|&platform| {
                let (build, token) = (&build, &token);
                async move {
                    let result = run_guarded(platform, build, options.build_timeout, token).await;
                    options.settled(result)
                }
            }))
            .await;

            let batch_failed = batch_results.iter().any(|r| !r.success);
            results.extend(batch_results);

            if token.is_cancelled() {
                halted = Some(CancelReason::Requested);
            } else if batch_failed && !options.continue_on_failure {
                tracing::warn!("Build failed; cancelling platforms that have not started");
                halted = Some(CancelReason::PriorFailure);
            }
        }

        let execution = ExecutionResult::new(results, started.elapsed(), !token.is_cancelled());
        tracing::info!(
            "Parallel build finished: {} succeeded, {} failed in {}ms",
            execution.success_count,
            execution.failure_count,
            execution.duration_ms
        );
        Ok(execution)
    }
}
