//! Build orchestration
//!
//! [`BuildOrchestrator`] is the top-level state machine:
//!
//! ```text
//! idle -> configuring -> building -> (validating) -> complete | failed
//! ```
//!
//! It validates the configuration, picks the parallel or sequential executor,
//! feeds it a build function backed by the [`PlatformBuilder`] collaborator
//! (wrapped in an [`IncrementalBuilder`] when incremental builds are on), and
//! reports progress through a per-run [`ProgressTracker`]. Every method takes
//! `&self`, so a build can be cancelled from another task while it runs.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::core::config::{validate_config, BuildConfig, ConfigValidation};
use crate::core::executor::{
    build_fn, BuildFn, BuildFuture, ExecutionResult, ParallelExecutor, ParallelOptions,
    ResultCallback, SequentialExecutor, SequentialOptions, SequentialProgress,
};
use crate::core::incremental::IncrementalBuilder;
use crate::core::platform::Platform;
use crate::core::progress::{BuildPhase, CompletionReport, ProgressSnapshot, ProgressTracker};
use crate::core::result::{BuildError, BuildResult};
use crate::error::{ExecutorError, OrchestratorError};

/// Produces the artifact for one platform
pub trait PlatformBuilder: Send + Sync {
    /// Build `platform`; an `Err` becomes a failed result
    fn build(&self, platform: Platform, config: Arc<BuildConfig>) -> BuildFuture;
}

/// Checks a generated artifact
pub trait ArtifactValidator: Send + Sync {
    /// Return the problems found in `output_path`; empty when the artifact is fine
    fn validate(
        &self,
        platform: Platform,
        output_path: &Path,
        config: &BuildConfig,
    ) -> anyhow::Result<Vec<String>>;
}

/// Orchestrator state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OrchestratorPhase {
    Idle,
    Configuring,
    Building,
    Validating,
    Complete,
    Failed,
}

impl OrchestratorPhase {
    fn is_running(self) -> bool {
        matches!(self, Self::Building | Self::Validating)
    }
}

impl std::fmt::Display for OrchestratorPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Configuring => "configuring",
            Self::Building => "building",
            Self::Validating => "validating",
            Self::Complete => "complete",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Orchestrator status
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrchestratorStatus {
    pub phase: OrchestratorPhase,
    /// Latest snapshot of the current or last run
    pub progress: Option<ProgressSnapshot>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
}

type SharedCallback = Arc<dyn Fn(&ProgressSnapshot) -> anyhow::Result<()> + Send + Sync>;

struct OrchestratorState {
    phase: OrchestratorPhase,
    config: Option<Arc<BuildConfig>>,
    incremental: Option<Arc<IncrementalBuilder>>,
    tracker: Option<Arc<ProgressTracker>>,
    last_report: Option<CompletionReport>,
    started_at: Option<DateTime<Utc>>,
    ended_at: Option<DateTime<Utc>>,
    /// Cancellation token of the current or last run
    cancel: CancellationToken,
}

impl OrchestratorState {
    fn idle() -> Self {
        Self {
            phase: OrchestratorPhase::Idle,
            config: None,
            incremental: None,
            tracker: None,
            last_report: None,
            started_at: None,
            ended_at: None,
            cancel: CancellationToken::new(),
        }
    }
}

/// Fails the run if the `build` future is dropped before it finishes
struct RunGuard<'a> {
    orchestrator: &'a BuildOrchestrator,
    token: CancellationToken,
    finished: bool,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        self.token.cancel();
        let mut state = self.orchestrator.state();
        if state.phase.is_running() {
            tracing::warn!("Build abandoned before it finished");
            state.phase = OrchestratorPhase::Failed;
            state.ended_at = Some(Utc::now());
        }
    }
}

/// Top-level build coordinator
pub struct BuildOrchestrator {
    builder: Arc<dyn PlatformBuilder>,
    validator: Option<Arc<dyn ArtifactValidator>>,
    callbacks: Mutex<Vec<SharedCallback>>,
    state: Mutex<OrchestratorState>,
    parallel: ParallelExecutor,
    sequential: SequentialExecutor,
}

impl std::fmt::Debug for BuildOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuildOrchestrator")
            .field("phase", &self.state().phase)
            .field("has_validator", &self.validator.is_some())
            .finish_non_exhaustive()
    }
}

impl BuildOrchestrator {
    pub fn new(builder: Arc<dyn PlatformBuilder>) -> Self {
        Self {
            builder,
            validator: None,
            callbacks: Mutex::new(Vec::new()),
            state: Mutex::new(OrchestratorState::idle()),
            parallel: ParallelExecutor::new(),
            sequential: SequentialExecutor::new(),
        }
    }

    /// Attach an artifact validator
    #[must_use]
    pub fn with_validator(mut self, validator: Arc<dyn ArtifactValidator>) -> Self {
        self.validator = Some(validator);
        self
    }

    fn state(&self) -> MutexGuard<'_, OrchestratorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a progress subscriber for every subsequent run
    pub fn on_progress<F>(&self, callback: F)
    where
        F: Fn(&ProgressSnapshot) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.callbacks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(callback));
    }

    /// Validate a configuration without applying it
    pub fn validate_config(&self, config: &BuildConfig) -> ConfigValidation {
        validate_config(config)
    }

    /// Validate and store a configuration; returns its warnings
    pub fn configure(&self, config: BuildConfig) -> Result<Vec<String>, OrchestratorError> {
        let warnings = validate_config(&config).into_result()?;
        for warning in &warnings {
            tracing::warn!("{warning}");
        }

        let incremental = config
            .incremental
            .then(|| Arc::new(IncrementalBuilder::from_config(&config)));

        let mut state = self.state();
        if state.phase.is_running() {
            return Err(OrchestratorError::BuildInProgress);
        }
        tracing::info!(
            "Configured {} platforms ({} mode, {})",
            config.platforms.len(),
            config.mode,
            if config.parallel { "parallel" } else { "sequential" }
        );
        state.config = Some(Arc::new(config));
        state.incremental = incremental;
        state.phase = OrchestratorPhase::Configuring;
        Ok(warnings)
    }

    /// Current configuration
    pub fn config(&self) -> Option<Arc<BuildConfig>> {
        self.state().config.clone()
    }

    /// Incremental builder backing the current configuration
    pub fn incremental(&self) -> Option<Arc<IncrementalBuilder>> {
        self.state().incremental.clone()
    }

    fn new_tracker(&self, platforms: &[Platform]) -> Arc<ProgressTracker> {
        let tracker = ProgressTracker::new(platforms);
        for callback in self
            .callbacks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
        {
            let callback = Arc::clone(callback);
            tracker.on_progress(Box::new(move |snapshot| callback(snapshot)));
        }
        Arc::new(tracker)
    }

    /// Build function for one run: collaborator, optional cache, progress tracking
    ///
    /// Platforms are only started here. They are completed from the results the
    /// executor settles, so a build that outlives its timeout or a cancellation
    /// never overwrites the recorded outcome.
    fn run_build_fn(
        &self,
        config: &Arc<BuildConfig>,
        incremental: Option<Arc<IncrementalBuilder>>,
        tracker: &Arc<ProgressTracker>,
    ) -> BuildFn {
        let raw: BuildFn = {
            let builder = Arc::clone(&self.builder);
            let config = Arc::clone(config);
            Arc::new(move |platform| builder.build(platform, Arc::clone(&config)))
        };
        let tracker = Arc::clone(tracker);

        build_fn(move |platform| {
            let raw = Arc::clone(&raw);
            let incremental = incremental.clone();
            let tracker = Arc::clone(&tracker);
            async move {
                if let Err(e) = tracker.start_platform(platform) {
                    tracing::warn!("{e}");
                }
                match incremental {
                    Some(cache) => cache.build_incremental(platform, &raw).await,
                    None => raw(platform).await,
                }
            }
        })
    }

    fn complete_on(tracker: &Arc<ProgressTracker>) -> ResultCallback {
        let tracker = Arc::clone(tracker);
        Arc::new(move |result: &BuildResult| {
            if let Err(e) = tracker.complete_platform(result.platform, result) {
                tracing::warn!("{e}");
            }
        })
    }

    fn check_request(
        config: &BuildConfig,
        platforms: &[Platform],
    ) -> Result<(), OrchestratorError> {
        if platforms.is_empty() {
            return Err(ExecutorError::NoPlatforms.into());
        }
        match platforms.iter().copied().find(|p| !config.platforms.contains(p)) {
            Some(platform) => Err(OrchestratorError::PlatformNotConfigured { platform }),
            None => Ok(()),
        }
    }

    /// Build a subset of the configured platforms
    pub async fn build(&self, platforms: &[Platform]) -> Result<ExecutionResult, OrchestratorError> {
        let (config, incremental, tracker, token) = {
            let mut state = self.state();
            if state.phase.is_running() {
                return Err(OrchestratorError::BuildInProgress);
            }
            let config = state.config.clone().ok_or(OrchestratorError::NotConfigured)?;
            Self::check_request(&config, platforms)?;

            let tracker = self.new_tracker(platforms);
            state.phase = OrchestratorPhase::Building;
            state.tracker = Some(Arc::clone(&tracker));
            state.started_at = Some(Utc::now());
            state.ended_at = None;
            state.cancel = CancellationToken::new();
            (config, state.incremental.clone(), tracker, state.cancel.clone())
        };
        let mut guard = RunGuard {
            orchestrator: self,
            token: token.clone(),
            finished: false,
        };

        tracing::info!("Building {} platforms", platforms.len());
        tracker.start();

        let build = self.run_build_fn(&config, incremental, &tracker);
        let timeout = Duration::from_millis(config.build_timeout_ms);
        let mut execution = if config.parallel {
            let options = ParallelOptions {
                max_concurrency: config.max_concurrency,
                build_timeout: timeout,
                continue_on_failure: config.continue_on_failure,
                on_result: Some(Self::complete_on(&tracker)),
            };
            self.parallel
                .execute_with_token(platforms, build, &options, token)
                .await?
        } else {
            let options = SequentialOptions {
                stop_on_failure: config.stop_on_failure,
                build_timeout: timeout,
                on_progress: Some(Box::new(|p: &SequentialProgress| {
                    tracing::debug!(
                        "Sequential progress: {}% ({}/{})",
                        p.percent_complete,
                        p.current_index,
                        p.total
                    );
                })),
                on_result: Some(Self::complete_on(&tracker)),
            };
            self.sequential
                .execute_with_token(platforms, build, &options, token)
                .await?
        };

        if config.validation.enabled {
            if let Some(validator) = &self.validator {
                self.state().phase = OrchestratorPhase::Validating;
                self.validate_results(validator.as_ref(), &config, &tracker, &mut execution);
            }
        }

        tracker.complete();
        let report = tracker.generate_report(&execution.results);
        tracing::info!("{}", report.summary);

        guard.finished = true;
        let mut state = self.state();
        state.phase = if execution.is_success() {
            OrchestratorPhase::Complete
        } else {
            OrchestratorPhase::Failed
        };
        state.ended_at = Some(Utc::now());
        state.last_report = Some(report);
        Ok(execution)
    }

    fn validate_results(
        &self,
        validator: &dyn ArtifactValidator,
        config: &BuildConfig,
        tracker: &ProgressTracker,
        execution: &mut ExecutionResult,
    ) {
        for result in execution.results.iter_mut().filter(|r| r.success) {
            let Some(output_path) = result.output_path.clone() else {
                continue;
            };
            let platform = result.platform;
            let _ = tracker.update_platform(platform, BuildPhase::Validating, 90, Some("Validating"));

            let issues = match validator.validate(platform, &output_path, config) {
                Ok(issues) => issues,
                Err(e) => vec![format!("Validator failed: {e:#}")],
            };

            if !issues.is_empty() {
                tracing::warn!("{} validation issues for {platform}", issues.len());
                if config.validation.strict {
                    result.success = false;
                    result.output_path = None;
                    result
                        .errors
                        .push(BuildError::validation_failed(platform, issues));
                } else {
                    result.warnings.extend(issues);
                }
            }
            let _ = tracker.complete_platform(platform, result);
        }

        execution.success_count = execution.results.iter().filter(|r| r.success).count();
        execution.failure_count = execution.results.len() - execution.success_count;
    }

    /// Cancel the running build, if any
    ///
    /// The token is the one handed to the active executor, so a cancel issued
    /// before the executor starts still applies to this run.
    pub fn cancel(&self) {
        let state = self.state();
        if !state.phase.is_running() {
            tracing::debug!("No build in progress; nothing to cancel");
            return;
        }
        tracing::info!("Cancelling build");
        state.cancel.cancel();
    }

    /// Current phase and latest progress snapshot
    pub fn get_status(&self) -> OrchestratorStatus {
        let state = self.state();
        OrchestratorStatus {
            phase: state.phase,
            progress: state.tracker.as_ref().map(|t| t.snapshot()),
            started_at: state.started_at,
            ended_at: state.ended_at,
        }
    }

    /// Report of the last finished build
    pub fn get_summary(&self) -> Option<CompletionReport> {
        self.state().last_report.clone()
    }

    /// Return to `idle`, dropping configuration and history
    pub fn reset(&self) -> Result<(), OrchestratorError> {
        let mut state = self.state();
        if state.phase.is_running() {
            return Err(OrchestratorError::BuildInProgress);
        }
        *state = OrchestratorState::idle();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::result::ErrorCode;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeBuilder {
        fail: Option<Platform>,
        delay_ms: u64,
        calls: AtomicUsize,
    }

    impl FakeBuilder {
        fn new(fail: Option<Platform>, delay_ms: u64) -> Arc<Self> {
            Arc::new(Self {
                fail,
                delay_ms,
                calls: AtomicUsize::new(0),
            })
        }
    }

    impl PlatformBuilder for FakeBuilder {
        fn build(&self, platform: Platform, config: Arc<BuildConfig>) -> BuildFuture {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let fail = self.fail == Some(platform);
            let delay = self.delay_ms;
            Box::pin(async move {
                tokio::time::sleep(Duration::from_millis(delay)).await;
                if fail {
                    anyhow::bail!("generator failed for {platform}");
                }
                Ok(BuildResult::success(platform, config.platform_output_dir(platform)))
            })
        }
    }

    struct RejectingValidator;

    impl ArtifactValidator for RejectingValidator {
        fn validate(&self, _: Platform, _: &Path, _: &BuildConfig) -> anyhow::Result<Vec<String>> {
            Ok(vec!["unused token".to_string()])
        }
    }

    fn config(platforms: Vec<Platform>) -> BuildConfig {
        let mut config = BuildConfig::new(platforms);
        config.incremental = false;
        config
    }

    #[tokio::test]
    async fn test_build_requires_configuration() {
        let orchestrator = BuildOrchestrator::new(FakeBuilder::new(None, 0));
        let err = orchestrator.build(&[Platform::Web]).await.unwrap_err();
        assert!(matches!(err, OrchestratorError::NotConfigured));
    }

    #[test]
    fn test_configure_rejects_invalid_config() {
        let orchestrator = BuildOrchestrator::new(FakeBuilder::new(None, 0));
        let err = orchestrator.configure(config(vec![])).unwrap_err();
        assert!(matches!(err, OrchestratorError::Config(_)));
        assert_eq!(orchestrator.get_status().phase, OrchestratorPhase::Idle);
    }

    #[test]
    fn test_configure_moves_to_configuring() {
        let orchestrator = BuildOrchestrator::new(FakeBuilder::new(None, 0));
        orchestrator.configure(config(vec![Platform::Web])).unwrap();
        assert_eq!(orchestrator.get_status().phase, OrchestratorPhase::Configuring);
        assert!(orchestrator.get_summary().is_none());
    }

    #[tokio::test]
    async fn test_rejects_unconfigured_platform() {
        let orchestrator = BuildOrchestrator::new(FakeBuilder::new(None, 0));
        orchestrator.configure(config(vec![Platform::Web])).unwrap();

        let err = orchestrator.build(&[Platform::Ios]).await.unwrap_err();
        assert!(matches!(
            err,
            OrchestratorError::PlatformNotConfigured { platform: Platform::Ios }
        ));
        let err = orchestrator.build(&[]).await.unwrap_err();
        assert!(matches!(err, OrchestratorError::Executor(ExecutorError::NoPlatforms)));
    }

    #[tokio::test]
    async fn test_successful_parallel_build() {
        let builder = FakeBuilder::new(None, 5);
        let orchestrator = BuildOrchestrator::new(builder.clone());
        orchestrator.configure(config(Platform::ALL.to_vec())).unwrap();

        let execution = orchestrator.build(&Platform::ALL).await.unwrap();

        assert_eq!(execution.success_count, 3);
        assert_eq!(builder.calls.load(Ordering::SeqCst), 3);
        let status = orchestrator.get_status();
        assert_eq!(status.phase, OrchestratorPhase::Complete);
        assert!(status.started_at.is_some() && status.ended_at.is_some());
        let progress = status.progress.unwrap();
        assert_eq!(progress.phase, BuildPhase::Complete);
        assert_eq!(progress.completed_count, 3);
        assert_eq!(orchestrator.get_summary().unwrap().successful, 3);
    }

    #[tokio::test]
    async fn test_sequential_build_with_failure() {
        let orchestrator = BuildOrchestrator::new(FakeBuilder::new(Some(Platform::Ios), 0));
        let mut cfg = config(vec![Platform::Web, Platform::Ios, Platform::Android]);
        cfg.parallel = false;
        cfg.stop_on_failure = true;
        orchestrator.configure(cfg).unwrap();

        let execution = orchestrator
            .build(&[Platform::Web, Platform::Ios, Platform::Android])
            .await
            .unwrap();

        assert_eq!(execution.results.len(), 2);
        assert_eq!(execution.skipped_platforms, vec![Platform::Android]);
        assert_eq!(orchestrator.get_status().phase, OrchestratorPhase::Failed);
        let summary = orchestrator.get_summary().unwrap();
        assert_eq!(summary.failed, 1);
    }

    #[tokio::test]
    async fn test_progress_callbacks_receive_snapshots() {
        let orchestrator = BuildOrchestrator::new(FakeBuilder::new(None, 0));
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        orchestrator.on_progress(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        orchestrator.configure(config(vec![Platform::Web])).unwrap();

        orchestrator.build(&[Platform::Web]).await.unwrap();

        // start, start_platform, complete_platform, complete
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_validation_issues_become_warnings() {
        let orchestrator = BuildOrchestrator::new(FakeBuilder::new(None, 0))
            .with_validator(Arc::new(RejectingValidator));
        orchestrator.configure(config(vec![Platform::Web])).unwrap();

        let execution = orchestrator.build(&[Platform::Web]).await.unwrap();

        assert!(execution.results[0].success);
        assert_eq!(execution.results[0].warnings, vec!["unused token"]);
    }

    #[tokio::test]
    async fn test_strict_validation_fails_build() {
        let orchestrator = BuildOrchestrator::new(FakeBuilder::new(None, 0))
            .with_validator(Arc::new(RejectingValidator));
        let mut cfg = config(vec![Platform::Web]);
        cfg.validation.strict = true;
        orchestrator.configure(cfg).unwrap();

        let execution = orchestrator.build(&[Platform::Web]).await.unwrap();

        assert!(!execution.results[0].success);
        assert!(execution.results[0].has_error_code(ErrorCode::ValidationFailed));
        assert_eq!(execution.failure_count, 1);
        assert_eq!(orchestrator.get_status().phase, OrchestratorPhase::Failed);
    }

    #[tokio::test]
    async fn test_cancel_running_build() {
        let orchestrator = Arc::new(BuildOrchestrator::new(FakeBuilder::new(None, 300)));
        orchestrator.configure(config(Platform::ALL.to_vec())).unwrap();

        let runner = Arc::clone(&orchestrator);
        let handle = tokio::spawn(async move { runner.build(&Platform::ALL).await });
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(orchestrator.get_status().phase, OrchestratorPhase::Building);
        assert!(matches!(
            orchestrator.build(&[Platform::Web]).await,
            Err(OrchestratorError::BuildInProgress)
        ));
        orchestrator.cancel();

        let execution = handle.await.unwrap().unwrap();
        assert!(!execution.all_completed);
        assert!(execution.results.iter().all(BuildResult::is_cancelled));
        assert_eq!(orchestrator.get_status().phase, OrchestratorPhase::Failed);
    }

    #[tokio::test]
    async fn test_timed_out_platform_stays_failed_in_progress() {
        for parallel in [true, false] {
            let orchestrator = BuildOrchestrator::new(FakeBuilder::new(None, 100));
            let mut cfg = config(vec![Platform::Web]);
            cfg.parallel = parallel;
            cfg.build_timeout_ms = 50;
            orchestrator.configure(cfg).unwrap();

            let execution = orchestrator.build(&[Platform::Web]).await.unwrap();
            assert!(execution.results[0].has_error_code(ErrorCode::BuildTimeout));

            // The detached build finishes after the run
            tokio::time::sleep(Duration::from_millis(150)).await;

            let progress = orchestrator.get_status().progress.unwrap();
            assert_eq!(progress.platforms[&Platform::Web].phase, BuildPhase::Failed);
            assert_eq!(progress.phase, BuildPhase::Failed);
            assert_eq!(progress.failed_count, 1);
            assert_eq!(progress.completed_count, 0);
        }
    }

    #[tokio::test]
    async fn test_dropped_build_releases_orchestrator() {
        let orchestrator = BuildOrchestrator::new(FakeBuilder::new(None, 200));
        orchestrator.configure(config(vec![Platform::Web])).unwrap();

        let abandoned =
            tokio::time::timeout(Duration::from_millis(10), orchestrator.build(&[Platform::Web]))
                .await;
        assert!(abandoned.is_err());

        let status = orchestrator.get_status();
        assert_eq!(status.phase, OrchestratorPhase::Failed);
        assert!(status.ended_at.is_some());

        let execution = orchestrator.build(&[Platform::Web]).await.unwrap();
        assert!(execution.results[0].success);
        orchestrator.reset().unwrap();
        assert_eq!(orchestrator.get_status().phase, OrchestratorPhase::Idle);
    }

    #[tokio::test]
    async fn test_cancel_before_executor_starts_applies_to_run() {
        let builder = FakeBuilder::new(None, 50);
        let orchestrator = Arc::new(BuildOrchestrator::new(builder.clone()));
        let handle = Arc::downgrade(&orchestrator);
        // The first snapshot is published before any executor is running
        orchestrator.on_progress(move |_| {
            if let Some(orchestrator) = handle.upgrade() {
                orchestrator.cancel();
            }
            Ok(())
        });
        orchestrator.configure(config(Platform::ALL.to_vec())).unwrap();

        let execution = orchestrator.build(&Platform::ALL).await.unwrap();

        assert!(!execution.all_completed);
        assert!(execution.results.iter().all(BuildResult::is_cancelled));
        assert_eq!(builder.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_reset_returns_to_idle() {
        let orchestrator = BuildOrchestrator::new(FakeBuilder::new(None, 0));
        orchestrator.configure(config(vec![Platform::Web])).unwrap();
        orchestrator.build(&[Platform::Web]).await.unwrap();

        orchestrator.reset().unwrap();

        assert_eq!(orchestrator.get_status().phase, OrchestratorPhase::Idle);
        assert!(orchestrator.get_summary().is_none());
        assert!(orchestrator.config().is_none());
    }
}
