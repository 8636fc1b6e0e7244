//! Build progress tracking
//!
//! A [`ProgressTracker`] follows one build run. Each platform moves through
//! `initializing -> building -> (validating | packaging)* -> complete | failed`
//! and every mutation publishes a fresh [`ProgressSnapshot`] to the registered
//! subscribers. Subscribers are isolated from each other and from the tracker:
//! an error or a panic in one is logged and the rest still run.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use crate::core::executor::{millis, panic_message};
use crate::core::platform::Platform;
use crate::core::result::BuildResult;
use crate::error::TrackerError;

/// Phase of a platform build, or of the run as a whole
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildPhase {
    Initializing,
    Building,
    Validating,
    Packaging,
    Complete,
    Failed,
}

impl BuildPhase {
    /// Work is in flight
    pub fn is_active(self) -> bool {
        matches!(self, Self::Building | Self::Validating | Self::Packaging)
    }

    /// Terminal phase
    pub fn is_finished(self) -> bool {
        matches!(self, Self::Complete | Self::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Initializing => "initializing",
            Self::Building => "building",
            Self::Validating => "validating",
            Self::Packaging => "packaging",
            Self::Complete => "complete",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for BuildPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of one platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformStatus {
    pub phase: BuildPhase,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub duration_ms: Option<u64>,
    /// 0-100
    pub progress: u8,
    pub current_operation: Option<String>,
}

impl Default for PlatformStatus {
    fn default() -> Self {
        Self {
            phase: BuildPhase::Initializing,
            started_at: None,
            ended_at: None,
            duration_ms: None,
            progress: 0,
            current_operation: None,
        }
    }
}

/// Point-in-time view of a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSnapshot {
    /// Overall phase
    pub phase: BuildPhase,
    /// Per-platform status
    pub platforms: BTreeMap<Platform, PlatformStatus>,
    /// Mean of per-platform progress, rounded
    pub overall_progress: u8,
    /// Platforms building, validating or packaging
    pub active_count: usize,
    /// Platforms that completed successfully
    pub completed_count: usize,
    /// Platforms that failed
    pub failed_count: usize,
    /// Time since the run started
    pub elapsed_ms: u64,
    /// Estimated time remaining; `None` until a platform has finished
    pub eta_ms: Option<u64>,
}

/// Subscriber receiving a snapshot after every tracker mutation
pub type ProgressCallback = Box<dyn Fn(&ProgressSnapshot) -> anyhow::Result<()> + Send + Sync>;

type Subscriber = Arc<dyn Fn(&ProgressSnapshot) -> anyhow::Result<()> + Send + Sync>;

/// Overall outcome of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    Success,
    Failure,
    Partial,
}

/// Summary of a finished run
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionReport {
    pub status: ReportStatus,
    pub total_platforms: usize,
    pub successful: usize,
    pub failed: usize,
    pub cache_hits: usize,
    pub total_duration_ms: u64,
    /// Statistics over builds with a non-zero duration; zero when there are none
    pub average_build_time_ms: u64,
    pub fastest_build_time_ms: u64,
    pub slowest_build_time_ms: u64,
    pub summary: String,
    pub results: Vec<BuildResult>,
}

struct TrackerState {
    phase: BuildPhase,
    platforms: BTreeMap<Platform, PlatformStatus>,
    platform_started: BTreeMap<Platform, Instant>,
    started: Instant,
    ended: Option<Instant>,
}

impl TrackerState {
    fn status_mut(&mut self, platform: Platform) -> Result<&mut PlatformStatus, TrackerError> {
        self.platforms
            .get_mut(&platform)
            .ok_or(TrackerError::UnknownPlatform { platform })
    }

    fn elapsed_ms(&self) -> u64 {
        let end = self.ended.unwrap_or_else(Instant::now);
        millis(end.saturating_duration_since(self.started))
    }

    fn snapshot(&self) -> ProgressSnapshot {
        let total = self.platforms.len();
        let count = |f: fn(BuildPhase) -> bool| {
            self.platforms.values().filter(|s| f(s.phase)).count()
        };
        let active_count = count(BuildPhase::is_active);
        let completed_count = count(|p| p == BuildPhase::Complete);
        let failed_count = count(|p| p == BuildPhase::Failed);

        let progress_sum: usize = self.platforms.values().map(|s| usize::from(s.progress)).sum();
        let overall_progress = if total == 0 {
            0
        } else {
            u8::try_from((progress_sum + total / 2) / total).unwrap_or(100)
        };

        let elapsed_ms = self.elapsed_ms();
        let finished = completed_count + failed_count;
        let eta_ms = (finished > 0).then(|| {
            let remaining = (total - finished) as u64;
            elapsed_ms / finished as u64 * remaining
        });

        ProgressSnapshot {
            phase: self.phase,
            platforms: self.platforms.clone(),
            overall_progress,
            active_count,
            completed_count,
            failed_count,
            elapsed_ms,
            eta_ms,
        }
    }
}

/// Tracks the progress of one build run
pub struct ProgressTracker {
    state: Mutex<TrackerState>,
    callbacks: Mutex<Vec<Subscriber>>,
}

impl std::fmt::Debug for ProgressTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressTracker")
            .field("snapshot", &self.snapshot())
            .finish_non_exhaustive()
    }
}

impl ProgressTracker {
    /// Create a tracker for a fixed set of platforms
    pub fn new(platforms: &[Platform]) -> Self {
        let statuses = platforms
            .iter()
            .map(|&p| (p, PlatformStatus::default()))
            .collect();

        Self {
            state: Mutex::new(TrackerState {
                phase: BuildPhase::Initializing,
                platforms: statuses,
                platform_started: BTreeMap::new(),
                started: Instant::now(),
                ended: None,
            }),
            callbacks: Mutex::new(Vec::new()),
        }
    }

    fn state(&self) -> MutexGuard<'_, TrackerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn callbacks(&self) -> MutexGuard<'_, Vec<Subscriber>> {
        self.callbacks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a subscriber
    pub fn on_progress(&self, callback: ProgressCallback) {
        self.callbacks().push(Arc::from(callback));
    }

    /// Current overall phase
    pub fn phase(&self) -> BuildPhase {
        self.state().phase
    }

    /// Current snapshot
    pub fn snapshot(&self) -> ProgressSnapshot {
        self.state().snapshot()
    }

    /// Run every subscriber; the subscriber list is not locked while they run
    fn notify(&self, snapshot: &ProgressSnapshot) {
        let subscribers = self.callbacks().clone();
        for (index, callback) in subscribers.iter().enumerate() {
            match catch_unwind(AssertUnwindSafe(|| callback(snapshot))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::warn!("Progress subscriber {index} failed: {e:#}"),
                Err(payload) => tracing::warn!(
                    "Progress subscriber {index} panicked: {}",
                    panic_message(&*payload)
                ),
            }
        }
    }

    /// Apply a mutation and publish the resulting snapshot
    fn mutate<F>(&self, f: F) -> Result<(), TrackerError>
    where
        F: FnOnce(&mut TrackerState) -> Result<(), TrackerError>,
    {
        let snapshot = {
            let mut state = self.state();
            f(&mut state)?;
            state.snapshot()
        };
        self.notify(&snapshot);
        Ok(())
    }

    /// Mark the run as started
    pub fn start(&self) {
        // Infallible: touches no platform
        let _ = self.mutate(|state| {
            state.started = Instant::now();
            state.ended = None;
            state.phase = BuildPhase::Building;
            Ok(())
        });
    }

    /// Move a platform to `building`
    pub fn start_platform(&self, platform: Platform) -> Result<(), TrackerError> {
        self.mutate(|state| {
            let status = state.status_mut(platform)?;
            status.phase = BuildPhase::Building;
            status.started_at = Some(Utc::now());
            status.current_operation = Some("Building".to_string());
            state.platform_started.insert(platform, Instant::now());
            Ok(())
        })
    }

    /// Set a platform's phase, progress (clamped to 100) and current operation
    pub fn update_platform(
        &self,
        platform: Platform,
        phase: BuildPhase,
        progress: u32,
        operation: Option<&str>,
    ) -> Result<(), TrackerError> {
        self.mutate(|state| {
            let status = state.status_mut(platform)?;
            status.phase = phase;
            status.progress = u8::try_from(progress.min(100)).unwrap_or(100);
            status.current_operation = operation.map(str::to_string);
            Ok(())
        })
    }

    /// Finish a platform from its build result
    pub fn complete_platform(
        &self,
        platform: Platform,
        result: &BuildResult,
    ) -> Result<(), TrackerError> {
        self.mutate(|state| {
            let measured = state
                .platform_started
                .get(&platform)
                .map(|started| millis(started.elapsed()));
            let status = state.status_mut(platform)?;
            status.phase = if result.success {
                BuildPhase::Complete
            } else {
                BuildPhase::Failed
            };
            status.ended_at = Some(Utc::now());
            status.duration_ms = Some(if result.duration_ms > 0 {
                result.duration_ms
            } else {
                measured.unwrap_or(0)
            });
            status.progress = 100;
            status.current_operation = None;
            Ok(())
        })
    }

    /// Finish the run; `failed` if any platform failed
    pub fn complete(&self) {
        let _ = self.mutate(|state| {
            let any_failed = state
                .platforms
                .values()
                .any(|s| s.phase == BuildPhase::Failed);
            state.phase = if any_failed {
                BuildPhase::Failed
            } else {
                BuildPhase::Complete
            };
            state.ended = Some(Instant::now());
            Ok(())
        });
    }

    /// Summarize a finished run
    pub fn generate_report(&self, results: &[BuildResult]) -> CompletionReport {
        let total_duration_ms = self.state().elapsed_ms();
        build_report(results, total_duration_ms)
    }
}

/// Summarize a list of results
pub fn build_report(results: &[BuildResult], total_duration_ms: u64) -> CompletionReport {
    let successful = results.iter().filter(|r| r.success).count();
    let failed = results.len() - successful;
    let cache_hits = results.iter().filter(|r| r.cache_hit).count();

    let durations: Vec<u64> = results
        .iter()
        .map(|r| r.duration_ms)
        .filter(|&d| d > 0)
        .collect();
    let average_build_time_ms = if durations.is_empty() {
        0
    } else {
        durations.iter().sum::<u64>() / durations.len() as u64
    };

    let status = if failed == 0 {
        ReportStatus::Success
    } else if successful == 0 {
        ReportStatus::Failure
    } else {
        ReportStatus::Partial
    };

    #[allow(clippy::cast_precision_loss)]
    let seconds = total_duration_ms as f64 / 1000.0;
    let summary = match status {
        ReportStatus::Success => {
            format!("All {successful} platforms built successfully in {seconds:.1}s")
        }
        ReportStatus::Failure => format!("All {failed} platforms failed in {seconds:.1}s"),
        ReportStatus::Partial => format!(
            "{successful} of {} platforms built successfully, {failed} failed in {seconds:.1}s",
            results.len()
        ),
    };

    CompletionReport {
        status,
        total_platforms: results.len(),
        successful,
        failed,
        cache_hits,
        total_duration_ms,
        average_build_time_ms,
        fastest_build_time_ms: durations.iter().copied().min().unwrap_or(0),
        slowest_build_time_ms: durations.iter().copied().max().unwrap_or(0),
        summary,
        results: results.to_vec(),
    }
}
