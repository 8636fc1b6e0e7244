//! Build results and per-platform build errors
//!
//! A [`BuildResult`] is produced for every requested platform, whether the
//! build function succeeded, failed, timed out, or was cancelled. Failures are
//! described by [`BuildError`] records rather than propagated as Rust errors.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use crate::core::platform::Platform;

/// Remediation hints attached to every generic build failure
pub const BUILD_FAILURE_SUGGESTIONS: [&str; 3] = [
    "Check the build logs for detailed error information",
    "Verify the platform configuration is correct",
    "Ensure all required dependencies are installed",
];

/// Closed vocabulary of build error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// The build function returned an error or panicked
    BuildFailed,
    /// The build was cancelled before or while it ran
    BuildCancelled,
    /// The build did not finish within the configured timeout
    BuildTimeout,
    /// Generated artifacts were rejected by a validator
    ValidationFailed,
}

impl ErrorCode {
    /// Wire name of the code
    pub fn as_str(self) -> &'static str {
        match self {
            Self::BuildFailed => "BUILD_FAILED",
            Self::BuildCancelled => "BUILD_CANCELLED",
            Self::BuildTimeout => "BUILD_TIMEOUT",
            Self::ValidationFailed => "VALIDATION_FAILED",
        }
    }

    /// Whether the code describes a build that ran and failed
    pub fn is_failure(self) -> bool {
        matches!(self, Self::BuildFailed | Self::BuildTimeout)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How serious an error is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    Error,
    Warning,
}

/// Broad classification of an error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    Build,
    Timeout,
    Cancellation,
    Validation,
}

/// Why a build was cancelled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CancelReason {
    /// `cancel()` was called
    Requested,
    /// An earlier platform failed and the strategy does not continue on failure
    PriorFailure,
}

/// Diagnostic data carried by a [`BuildError`], one shape per error code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ErrorContext {
    /// No additional context
    None,
    /// Error chain of a failed build, outermost first
    Failure { cause_chain: Vec<String> },
    /// Timeout that was exceeded
    Timeout { timeout_ms: u64 },
    /// Reason for cancellation
    Cancelled { reason: CancelReason },
    /// Validator findings
    Validation { issues: Vec<String> },
}

/// A single build error for one platform
///
/// Immutable once constructed; use the constructors and `with_*` builders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildError {
    code: ErrorCode,
    message: String,
    severity: Severity,
    category: ErrorCategory,
    platform: Platform,
    context: ErrorContext,
    #[serde(default)]
    suggestions: Vec<String>,
}

impl BuildError {
    /// Create an error with severity and category derived from the code
    pub fn new(code: ErrorCode, platform: Platform, message: impl Into<String>) -> Self {
        let (severity, category) = match code {
            ErrorCode::BuildFailed => (Severity::Error, ErrorCategory::Build),
            ErrorCode::BuildTimeout => (Severity::Error, ErrorCategory::Timeout),
            ErrorCode::BuildCancelled => (Severity::Warning, ErrorCategory::Cancellation),
            ErrorCode::ValidationFailed => (Severity::Error, ErrorCategory::Validation),
        };
        Self {
            code,
            message: message.into(),
            severity,
            category,
            platform,
            context: ErrorContext::None,
            suggestions: Vec::new(),
        }
    }

    /// `BUILD_FAILED` from an error returned by a build function
    pub fn build_failed(platform: Platform, error: &anyhow::Error) -> Self {
        Self::new(ErrorCode::BuildFailed, platform, error.to_string())
            .with_context(ErrorContext::Failure {
                cause_chain: error.chain().map(ToString::to_string).collect(),
            })
            .with_suggestions(BUILD_FAILURE_SUGGESTIONS)
    }

    /// `BUILD_FAILED` from a panic or aborted build task
    pub fn panicked(platform: Platform, detail: impl Into<String>) -> Self {
        let detail = detail.into();
        Self::new(
            ErrorCode::BuildFailed,
            platform,
            format!("Build task for {platform} panicked: {detail}"),
        )
        .with_context(ErrorContext::Failure {
            cause_chain: vec![detail],
        })
        .with_suggestions(BUILD_FAILURE_SUGGESTIONS)
    }

    /// `BUILD_TIMEOUT`; the message keeps the word "timeout" for log scrapers
    pub fn timeout(platform: Platform, timeout_ms: u64) -> Self {
        Self::new(
            ErrorCode::BuildTimeout,
            platform,
            format!("Build timeout after {timeout_ms}ms for {platform}"),
        )
        .with_context(ErrorContext::Timeout { timeout_ms })
        .with_suggestions(BUILD_FAILURE_SUGGESTIONS)
    }

    /// `BUILD_CANCELLED`
    pub fn cancelled(platform: Platform, reason: CancelReason) -> Self {
        let message = match reason {
            CancelReason::Requested => format!("Build for {platform} was cancelled"),
            CancelReason::PriorFailure => {
                format!("Build for {platform} was cancelled after an earlier failure")
            }
        };
        Self::new(ErrorCode::BuildCancelled, platform, message)
            .with_context(ErrorContext::Cancelled { reason })
    }

    /// `VALIDATION_FAILED` with the validator's findings
    pub fn validation_failed(platform: Platform, issues: Vec<String>) -> Self {
        Self::new(
            ErrorCode::ValidationFailed,
            platform,
            format!("Output validation failed for {platform} ({} issues)", issues.len()),
        )
        .with_context(ErrorContext::Validation { issues })
    }

    #[must_use]
    pub fn with_context(mut self, context: ErrorContext) -> Self {
        self.context = context;
        self
    }

    #[must_use]
    pub fn with_suggestions<I, S>(mut self, suggestions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.suggestions = suggestions.into_iter().map(Into::into).collect();
        self
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn category(&self) -> ErrorCategory {
        self.category
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn context(&self) -> &ErrorContext {
        &self.context
    }

    pub fn suggestions(&self) -> &[String] {
        &self.suggestions
    }
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.code, self.platform, self.message)
    }
}

/// Outcome of building one platform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildResult {
    /// Platform that was built
    pub platform: Platform,

    /// Whether the build succeeded
    pub success: bool,

    /// Location of the generated artifact; `None` on failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_path: Option<PathBuf>,

    /// Wall-clock duration in milliseconds
    #[serde(rename = "duration")]
    pub duration_ms: u64,

    /// Non-fatal warnings
    #[serde(default)]
    pub warnings: Vec<String>,

    /// Errors; empty on success
    #[serde(default)]
    pub errors: Vec<BuildError>,

    /// Free-form metadata from the build function
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, serde_json::Value>,

    /// Whether this result was served from the incremental build cache
    #[serde(default)]
    pub cache_hit: bool,
}

impl BuildResult {
    /// Successful result with an output path
    pub fn success(platform: Platform, output_path: impl Into<PathBuf>) -> Self {
        Self {
            platform,
            success: true,
            output_path: Some(output_path.into()),
            duration_ms: 0,
            warnings: Vec::new(),
            errors: Vec::new(),
            metadata: BTreeMap::new(),
            cache_hit: false,
        }
    }

    /// Failed result carrying a single error
    pub fn failure(platform: Platform, error: BuildError) -> Self {
        Self {
            platform,
            success: false,
            output_path: None,
            duration_ms: 0,
            warnings: Vec::new(),
            errors: vec![error],
            metadata: BTreeMap::new(),
            cache_hit: false,
        }
    }

    /// Synthesized `BUILD_CANCELLED` result
    pub fn cancelled(platform: Platform, reason: CancelReason) -> Self {
        Self::failure(platform, BuildError::cancelled(platform, reason))
    }

    #[must_use]
    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    #[must_use]
    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }

    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Whether any error on this result has the given code
    pub fn has_error_code(&self, code: ErrorCode) -> bool {
        self.errors.iter().any(|e| e.code() == code)
    }

    /// Whether this result was synthesized by a cancellation
    pub fn is_cancelled(&self) -> bool {
        self.has_error_code(ErrorCode::BuildCancelled)
    }
}
