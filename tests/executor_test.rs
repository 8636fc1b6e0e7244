//! Integration tests for the execution strategies
//!
//! Properties that must hold for any platform list:
//! - one result per executed platform, in input order
//! - an empty platform list is rejected without building
//! - concurrency never exceeds the configured limit

use proptest::prelude::*;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokenforge::config::defaults::MIN_PROPTEST_ITERATIONS;
use tokenforge::core::executor::{
    build_fn, BuildFn, ParallelExecutor, ParallelOptions, SequentialExecutor, SequentialOptions,
};
use tokenforge::core::platform::Platform;
use tokenforge::core::result::{BuildResult, ErrorCode};
use tokenforge::error::ExecutorError;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("Failed to build runtime")
}

/// Build function that fails, panics or succeeds per platform after a short delay
fn scripted_build(failing: HashSet<Platform>, panicking: HashSet<Platform>) -> BuildFn {
    let failing = Arc::new(failing);
    let panicking = Arc::new(panicking);
    build_fn(move |platform| {
        let failing = failing.clone();
        let panicking = panicking.clone();
        async move {
            let delay = match platform {
                Platform::Ios => 3,
                Platform::Android => 2,
                Platform::Web => 1,
            };
            tokio::time::sleep(Duration::from_millis(delay)).await;
            if panicking.contains(&platform) {
                panic!("generator panicked for {platform}");
            }
            if failing.contains(&platform) {
                anyhow::bail!("generator failed for {platform}");
            }
            Ok(BuildResult::success(platform, format!("dist/{platform}")))
        }
    })
}

fn platform_strategy() -> impl Strategy<Value = Vec<Platform>> {
    prop::collection::vec(prop::sample::select(Platform::ALL.to_vec()), 1..7)
}

fn subset_strategy() -> impl Strategy<Value = HashSet<Platform>> {
    prop::collection::hash_set(prop::sample::select(Platform::ALL.to_vec()), 0..3)
}

// ============================================
// Property Tests
// ============================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(MIN_PROPTEST_ITERATIONS))]

    /// Parallel results match the input list one to one, whatever fails
    #[test]
    fn prop_parallel_preserves_order(
        platforms in platform_strategy(),
        failing in subset_strategy(),
        panicking in subset_strategy(),
        max_concurrency in prop::option::of(1usize..4),
    ) {
        let options = ParallelOptions { max_concurrency, ..ParallelOptions::default() };
        let execution = runtime()
            .block_on(ParallelExecutor::new().execute(
                &platforms,
                scripted_build(failing.clone(), panicking.clone()),
                &options,
            ))
            .unwrap();

        prop_assert_eq!(execution.results.len(), platforms.len());
        for (result, platform) in execution.results.iter().zip(&platforms) {
            prop_assert_eq!(result.platform, *platform);
            let should_fail = failing.contains(platform) || panicking.contains(platform);
            prop_assert_eq!(result.success, !should_fail);
        }
        prop_assert_eq!(
            execution.success_count + execution.failure_count,
            platforms.len()
        );
        prop_assert!(execution.all_completed);
    }

    /// At most `max_concurrency` builds are ever in flight at once
    #[test]
    fn prop_parallel_respects_max_concurrency(
        platforms in platform_strategy(),
        max_concurrency in 1usize..4,
    ) {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let (in_flight_c, peak_c) = (in_flight.clone(), peak.clone());
        let build = build_fn(move |platform| {
            let in_flight = in_flight_c.clone();
            let peak = peak_c.clone();
            async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                Ok(BuildResult::success(platform, format!("dist/{platform}")))
            }
        });
        let options = ParallelOptions {
            max_concurrency: Some(max_concurrency),
            ..ParallelOptions::default()
        };

        let execution = runtime()
            .block_on(ParallelExecutor::new().execute(&platforms, build, &options))
            .unwrap();

        prop_assert_eq!(execution.success_count, platforms.len());
        prop_assert!(peak.load(Ordering::SeqCst) <= max_concurrency);
        prop_assert!(peak.load(Ordering::SeqCst) >= 1);
    }

    /// Sequential results are a prefix of the input list; the rest is skipped
    #[test]
    fn prop_sequential_preserves_order(
        platforms in platform_strategy(),
        failing in subset_strategy(),
        stop_on_failure in any::<bool>(),
    ) {
        let options = SequentialOptions { stop_on_failure, ..SequentialOptions::default() };
        let execution = runtime()
            .block_on(SequentialExecutor::new().execute(
                &platforms,
                scripted_build(failing.clone(), HashSet::new()),
                &options,
            ))
            .unwrap();

        let executed = execution.results.len();
        prop_assert_eq!(executed + execution.skipped_platforms.len(), platforms.len());
        for (result, platform) in execution.results.iter().zip(&platforms) {
            prop_assert_eq!(result.platform, *platform);
        }
        prop_assert_eq!(&execution.skipped_platforms[..], &platforms[executed..]);

        let first_failure = platforms.iter().position(|p| failing.contains(p));
        match (stop_on_failure, first_failure) {
            (true, Some(index)) => {
                prop_assert_eq!(executed, index + 1);
                prop_assert!(execution.stopped_on_failure);
            }
            _ => {
                prop_assert_eq!(executed, platforms.len());
                prop_assert!(!execution.stopped_on_failure);
            }
        }
    }
}

// ============================================
// Behaviour Tests
// ============================================

#[tokio::test]
async fn test_both_executors_reject_empty_input() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let build = build_fn(move |platform| {
        counter.fetch_add(1, Ordering::SeqCst);
        async move { Ok(BuildResult::success(platform, "out")) }
    });

    let parallel = ParallelExecutor::new()
        .execute(&[], build.clone(), &ParallelOptions::default())
        .await;
    let sequential = SequentialExecutor::new()
        .execute(&[], build, &SequentialOptions::default())
        .await;

    assert_eq!(parallel.unwrap_err(), ExecutorError::NoPlatforms);
    assert_eq!(sequential.unwrap_err(), ExecutorError::NoPlatforms);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_parallel_cancel_with_slow_builds() {
    let executor = Arc::new(ParallelExecutor::new());
    let canceller = executor.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        canceller.cancel();
    });
    let build = build_fn(|platform| async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        Ok(BuildResult::success(platform, "out"))
    });

    let execution = executor
        .execute(&Platform::ALL, build, &ParallelOptions::default())
        .await
        .unwrap();

    assert!(execution
        .results
        .iter()
        .any(|r| r.has_error_code(ErrorCode::BuildCancelled)));
    assert!(!execution.all_completed);
    assert!(executor.is_cancelled());
}

#[tokio::test]
async fn test_sequential_stop_on_failure_scenario() {
    let options = SequentialOptions {
        stop_on_failure: true,
        ..SequentialOptions::default()
    };
    let failing = HashSet::from([Platform::Ios]);

    let execution = SequentialExecutor::new()
        .execute(
            &[Platform::Web, Platform::Ios, Platform::Android],
            scripted_build(failing, HashSet::new()),
            &options,
        )
        .await
        .unwrap();

    let executed: Vec<Platform> = execution.results.iter().map(|r| r.platform).collect();
    assert_eq!(executed, vec![Platform::Web, Platform::Ios]);
    assert_eq!(execution.skipped_platforms, vec![Platform::Android]);
    assert!(execution.stopped_on_failure);
    assert!(execution.results[1].has_error_code(ErrorCode::BuildFailed));
}

#[tokio::test]
async fn test_execution_result_serializes_camel_case() {
    let execution = ParallelExecutor::new()
        .execute(
            &[Platform::Web],
            scripted_build(HashSet::new(), HashSet::new()),
            &ParallelOptions::default(),
        )
        .await
        .unwrap();

    let json = serde_json::to_value(&execution).unwrap();
    assert_eq!(json["successCount"], 1);
    assert_eq!(json["allCompleted"], true);
    assert_eq!(json["results"][0]["platform"], "web");
    assert_eq!(json["results"][0]["outputPath"], "dist/web");
}
