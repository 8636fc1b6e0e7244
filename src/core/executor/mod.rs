//! Build execution strategies
//!
//! Two interchangeable strategies run an opaque build function across a list
//! of platforms and aggregate the results:
//!
//! - [`parallel`] - concurrent builds, optionally in fixed-size batches
//! - [`sequential`] - one platform at a time with optional fail-fast
//!
//! Both guard every build the same way (see [`run_guarded`]): the build races a
//! timeout and a cancellation token, and whatever happens the caller gets a
//! [`BuildResult`] back. Results are index-correlated with the input platform
//! list, never ordered by completion.

pub mod parallel;
pub mod sequential;

use futures::future::BoxFuture;
use futures::FutureExt;
use serde::Serialize;
use std::any::Any;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

use crate::core::platform::Platform;
use crate::core::result::{BuildError, BuildResult, CancelReason};

pub use parallel::{ParallelExecutor, ParallelOptions};
pub use sequential::{SequentialExecutor, SequentialOptions, SequentialProgress};

/// Future returned by a build function
pub type BuildFuture = BoxFuture<'static, anyhow::Result<BuildResult>>;

/// Build function: produces one [`BuildResult`] for one platform
///
/// An `Err` (or a panic) is converted into a failed result by the executor.
pub type BuildFn = Arc<dyn Fn(Platform) -> BuildFuture + Send + Sync>;

/// Receives each platform's final result as soon as the executor settles it
pub type ResultCallback = Arc<dyn Fn(&BuildResult) + Send + Sync>;

/// Wrap an async closure as a [`BuildFn`]
pub fn build_fn<F, Fut>(f: F) -> BuildFn
where
    F: Fn(Platform) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<BuildResult>> + Send + 'static,
{
    Arc::new(move |platform| f(platform).boxed())
}

/// Aggregated outcome of one executor run
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    /// One result per executed platform, in input order
    pub results: Vec<BuildResult>,
    /// Wall-clock duration of the whole run in milliseconds
    pub duration_ms: u64,
    /// Number of successful results
    pub success_count: usize,
    /// Number of failed results (including cancelled ones)
    pub failure_count: usize,
    /// False when the run was cut short
    pub all_completed: bool,
    /// Platforms that never started (sequential strategy only)
    pub skipped_platforms: Vec<Platform>,
    /// Whether a failure stopped the run (sequential strategy only)
    pub stopped_on_failure: bool,
}

impl ExecutionResult {
    pub(crate) fn new(results: Vec<BuildResult>, elapsed: Duration, all_completed: bool) -> Self {
        let success_count = results.iter().filter(|r| r.success).count();
        Self {
            failure_count: results.len() - success_count,
            success_count,
            duration_ms: millis(elapsed),
            all_completed,
            results,
            skipped_platforms: Vec::new(),
            stopped_on_failure: false,
        }
    }

    /// Whether every executed platform succeeded
    pub fn is_success(&self) -> bool {
        self.failure_count == 0 && self.skipped_platforms.is_empty()
    }
}

/// Cancellation handle shared by an executor and its in-flight builds
///
/// Each run installs its own token so a cancellation only affects the run it
/// was issued against.
#[derive(Debug, Default)]
pub(crate) struct CancelSlot {
    token: Mutex<CancellationToken>,
}

impl CancelSlot {
    /// Make `token` the current run's token
    pub(crate) fn install(&self, token: &CancellationToken) {
        *self.token.lock().unwrap_or_else(PoisonError::into_inner) = token.clone();
    }

    pub(crate) fn cancel(&self) {
        self.token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .cancel();
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_cancelled()
    }
}

enum Outcome {
    Finished(Result<anyhow::Result<BuildResult>, tokio::task::JoinError>),
    TimedOut,
    Cancelled,
}

/// Run one build, racing it against `timeout` and `token`
///
/// Never fails: errors, panics, timeouts and cancellation all become a
/// [`BuildResult`] for `platform`. A build that loses the race is detached,
/// not aborted.
pub(crate) async fn run_guarded(
    platform: Platform,
    build: &BuildFn,
    timeout: Duration,
    token: &CancellationToken,
) -> BuildResult {
    let started = Instant::now();

    if token.is_cancelled() {
        return BuildResult::cancelled(platform, CancelReason::Requested);
    }

    tracing::debug!("Starting build for {platform}");
    let mut task = tokio::spawn(build(platform));

    let outcome = tokio::select! {
        biased;
        () = token.cancelled() => Outcome::Cancelled,
        joined = &mut task => Outcome::Finished(joined),
        () = tokio::time::sleep(timeout) => Outcome::TimedOut,
    };
    let elapsed = millis(started.elapsed());

    match outcome {
        Outcome::Finished(Ok(Ok(mut result))) => {
            if result.platform != platform {
                tracing::warn!(
                    "Build function for {platform} returned a result for {}; correcting",
                    result.platform
                );
                result.platform = platform;
            }
            if result.duration_ms == 0 {
                result.duration_ms = elapsed;
            }
            tracing::debug!(
                "Build for {platform} finished (success: {}, {}ms)",
                result.success,
                result.duration_ms
            );
            result
        }
        Outcome::Finished(Ok(Err(error))) => {
            tracing::warn!("Build for {platform} failed: {error:#}");
            BuildResult::failure(platform, BuildError::build_failed(platform, &error))
                .with_duration(elapsed)
        }
        Outcome::Finished(Err(join_error)) => {
            let detail = if join_error.is_panic() {
                panic_message(&*join_error.into_panic())
            } else {
                join_error.to_string()
            };
            tracing::warn!("Build task for {platform} panicked: {detail}");
            BuildResult::failure(platform, BuildError::panicked(platform, detail))
                .with_duration(elapsed)
        }
        Outcome::TimedOut => {
            let timeout_ms = millis(timeout);
            tracing::warn!("Build for {platform} hit the {timeout_ms}ms timeout");
            BuildResult::failure(platform, BuildError::timeout(platform, timeout_ms))
                .with_duration(elapsed)
        }
        Outcome::Cancelled => {
            tracing::info!("Build for {platform} cancelled");
            BuildResult::cancelled(platform, CancelReason::Requested).with_duration(elapsed)
        }
    }
}

/// Extract a readable message from a panic payload
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Duration as whole milliseconds, saturating
pub(crate) fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
