//! Error types for tokenforge
//!
//! Domain-specific error types using thiserror.
//!
//! Per-platform build failures are never Rust errors: they are recorded as
//! [`crate::core::result::BuildError`] values inside a failed `BuildResult`.
//! The types here cover the conditions that are allowed to reach a caller.

use std::path::PathBuf;
use thiserror::Error;

use crate::core::config::ConfigIssue;
use crate::core::platform::Platform;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file not found
    #[error("Config file not found at '{path}'")]
    NotFound { path: PathBuf },

    /// Config file could not be read
    #[error("Failed to read config file '{path}': {error}")]
    ReadError { path: PathBuf, error: String },

    /// Config file could not be parsed
    #[error("Failed to parse config: {error}")]
    ParseError { error: String },

    /// Unknown platform name
    #[error("Unknown platform '{name}' (expected one of: ios, android, web)")]
    UnknownPlatform { name: String },

    /// Unknown build mode
    #[error("Unknown build mode '{name}' (expected development or production)")]
    UnknownMode { name: String },

    /// Validation failed
    #[error("Invalid configuration: {}", issues.iter().map(ToString::to_string).collect::<Vec<_>>().join("; "))]
    Invalid { issues: Vec<ConfigIssue> },
}

/// Executor errors
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ExecutorError {
    /// Empty platform list
    #[error("No platforms specified")]
    NoPlatforms,
}

/// Progress tracker errors
#[derive(Error, Debug, PartialEq, Eq)]
pub enum TrackerError {
    /// Platform was not part of the tracked set
    #[error("Platform '{platform}' is not tracked by this build")]
    UnknownPlatform { platform: Platform },
}

/// Build cache errors
///
/// These are logged and swallowed by the incremental builder; they are public so
/// callers that use the persistence helpers directly can inspect them.
#[derive(Error, Debug)]
pub enum CacheError {
    /// IO error on the cache file
    #[error("IO error for '{path}': {error}")]
    IoError { path: PathBuf, error: String },

    /// Cache file contents could not be (de)serialized
    #[error("Corrupt cache file '{path}': {error}")]
    Corrupt { path: PathBuf, error: String },
}

/// Orchestrator errors
#[derive(Error, Debug)]
pub enum OrchestratorError {
    /// `build` called before `configure`
    #[error("Orchestrator is not configured. Call configure() first")]
    NotConfigured,

    /// Configuration rejected
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Requested platform is not part of the configured set
    #[error("Platform '{platform}' is not in the configured platform list")]
    PlatformNotConfigured { platform: Platform },

    /// A build is already running
    #[error("A build is already in progress")]
    BuildInProgress,

    /// Executor rejected the request
    #[error(transparent)]
    Executor(#[from] ExecutorError),
}
