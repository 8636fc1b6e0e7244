//! Build configuration and validation
//!
//! A [`BuildConfig`] is immutable for the duration of one build run. It is
//! validated by [`validate_config`] before any execution begins; validation
//! never panics and reports every problem it finds rather than stopping at
//! the first one.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::OnceLock;

use crate::config::defaults;
use crate::core::platform::Platform;
use crate::error::ConfigError;

/// Build mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildMode {
    #[default]
    Development,
    Production,
}

impl BuildMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
        }
    }
}

impl fmt::Display for BuildMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BuildMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            _ => Err(ConfigError::UnknownMode {
                name: s.to_string(),
            }),
        }
    }
}

/// iOS-specific options
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IosOptions {
    /// Bundle identifier of the generated Swift package (reverse-DNS)
    #[serde(default)]
    pub bundle_id: String,

    /// Minimum iOS deployment target, e.g. "15.0"
    #[serde(default)]
    pub deployment_target: String,

    /// Swift language version
    #[serde(default)]
    pub swift_version: Option<String>,
}

/// Android-specific options
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AndroidOptions {
    /// Kotlin package name
    #[serde(default)]
    pub package_name: String,

    /// Minimum SDK level
    #[serde(default)]
    pub min_sdk_version: Option<u32>,

    /// Target SDK level
    #[serde(default)]
    pub target_sdk_version: Option<u32>,
}

/// Web-specific options
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebOptions {
    /// Output formats, e.g. "css", "scss", "ts"
    #[serde(default)]
    pub formats: Vec<String>,

    /// Prefix for generated CSS custom properties
    #[serde(default)]
    pub css_prefix: Option<String>,
}

/// Output validation toggles
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Run the attached artifact validator after building
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Treat validator findings as build failures instead of warnings
    #[serde(default)]
    pub strict: bool,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            strict: false,
        }
    }
}

/// Configuration for one build run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Platforms to build
    #[serde(default)]
    pub platforms: Vec<Platform>,

    /// Build mode
    #[serde(default)]
    pub mode: BuildMode,

    /// Root output directory
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Use the parallel strategy (otherwise sequential)
    #[serde(default = "default_true")]
    pub parallel: bool,

    /// Serve unchanged platforms from the incremental build cache
    #[serde(default = "default_true")]
    pub incremental: bool,

    /// Maximum number of simultaneous builds (parallel strategy only)
    #[serde(default)]
    pub max_concurrency: Option<usize>,

    /// Per-build timeout in milliseconds
    #[serde(default = "default_build_timeout")]
    pub build_timeout_ms: u64,

    /// Keep starting builds after a failure (parallel strategy)
    #[serde(default = "default_true")]
    pub continue_on_failure: bool,

    /// Skip remaining platforms after a failure (sequential strategy)
    #[serde(default)]
    pub stop_on_failure: bool,

    /// Incremental build cache directory
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    /// Source directories watched for changes
    #[serde(default = "default_source_dirs")]
    pub source_dirs: Vec<PathBuf>,

    /// Design token directories watched for changes
    #[serde(default = "default_token_dirs")]
    pub token_dirs: Vec<PathBuf>,

    /// Check that cached artifacts still exist before serving a cache hit
    #[serde(default = "default_true")]
    pub validate_cache: bool,

    /// Minify generated output
    #[serde(default = "default_true")]
    pub minify: bool,

    /// Emit source maps
    #[serde(default)]
    pub source_maps: bool,

    /// Output validation toggles
    #[serde(default)]
    pub validation: ValidationConfig,

    /// iOS options
    #[serde(default)]
    pub ios: Option<IosOptions>,

    /// Android options
    #[serde(default)]
    pub android: Option<AndroidOptions>,

    /// Web options
    #[serde(default)]
    pub web: Option<WebOptions>,

    /// Shell command per platform name, used by the script builder
    #[serde(default)]
    pub commands: BTreeMap<String, String>,
}

fn default_true() -> bool {
    true
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(defaults::OUTPUT_DIR)
}

fn default_build_timeout() -> u64 {
    defaults::BUILD_TIMEOUT_MS
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from(defaults::CACHE_DIR)
}

fn default_source_dirs() -> Vec<PathBuf> {
    defaults::SOURCE_DIRS.iter().map(PathBuf::from).collect()
}

fn default_token_dirs() -> Vec<PathBuf> {
    defaults::TOKEN_DIRS.iter().map(PathBuf::from).collect()
}

impl BuildConfig {
    /// Create a configuration for the given platforms with every other knob at its default
    pub fn new(platforms: Vec<Platform>) -> Self {
        Self {
            platforms,
            mode: BuildMode::default(),
            output_dir: default_output_dir(),
            parallel: true,
            incremental: true,
            max_concurrency: None,
            build_timeout_ms: default_build_timeout(),
            continue_on_failure: true,
            stop_on_failure: false,
            cache_dir: default_cache_dir(),
            source_dirs: default_source_dirs(),
            token_dirs: default_token_dirs(),
            validate_cache: true,
            minify: true,
            source_maps: false,
            validation: ValidationConfig::default(),
            ios: None,
            android: None,
            web: None,
            commands: BTreeMap::new(),
        }
    }

    /// Parse from TOML string
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError {
            error: e.to_string(),
        })
    }

    /// Load from a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;
        Self::from_toml(&content)
    }

    /// Resolve relative directories against `root`
    #[must_use]
    pub fn rooted_at(mut self, root: &Path) -> Self {
        let resolve = |p: &PathBuf| {
            if p.is_absolute() {
                p.clone()
            } else {
                root.join(p)
            }
        };
        self.output_dir = resolve(&self.output_dir);
        self.cache_dir = resolve(&self.cache_dir);
        self.source_dirs = self.source_dirs.iter().map(resolve).collect();
        self.token_dirs = self.token_dirs.iter().map(resolve).collect();
        self
    }

    /// Output directory for one platform
    pub fn platform_output_dir(&self, platform: Platform) -> PathBuf {
        self.output_dir.join(platform.as_str())
    }

    /// Shell command configured for a platform
    pub fn command_for(&self, platform: Platform) -> Option<&str> {
        self.commands.get(platform.as_str()).map(String::as_str)
    }

    /// Validate this configuration
    pub fn validate(&self) -> ConfigValidation {
        validate_config(self)
    }
}

/// A single configuration problem tied to a field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigIssue {
    /// Dotted field path, e.g. `android.min_sdk_version`
    pub field: String,
    /// Human readable message
    pub message: String,
}

impl ConfigIssue {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of configuration validation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigValidation {
    /// True when there are no errors
    pub valid: bool,
    /// Fatal problems
    pub errors: Vec<ConfigIssue>,
    /// Non-fatal problems
    pub warnings: Vec<String>,
}

impl ConfigValidation {
    /// Convert into a `Result`, keeping the errors
    pub fn into_result(self) -> Result<Vec<String>, ConfigError> {
        if self.valid {
            Ok(self.warnings)
        } else {
            Err(ConfigError::Invalid {
                issues: self.errors,
            })
        }
    }
}

fn bundle_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z][A-Za-z0-9-]*(\.[A-Za-z0-9-]+)+$").expect("Invalid bundle id regex")
    })
}

fn package_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[a-zA-Z][a-zA-Z0-9_]*(\.[a-zA-Z][a-zA-Z0-9_]*)+$")
            .expect("Invalid package name regex")
    })
}

/// Validate a build configuration
///
/// Pure function: reports every error and warning found. Platform option
/// blocks are only checked for selected platforms.
pub fn validate_config(config: &BuildConfig) -> ConfigValidation {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    if config.platforms.is_empty() {
        errors.push(ConfigIssue::new("platforms", "At least one platform is required"));
    }

    let mut seen = HashSet::new();
    for platform in &config.platforms {
        if !seen.insert(*platform) {
            errors.push(ConfigIssue::new(
                "platforms",
                format!("Platform '{platform}' is listed more than once"),
            ));
        }
    }

    if config.output_dir.as_os_str().is_empty() {
        errors.push(ConfigIssue::new("output_dir", "Output directory is required"));
    }

    if config.build_timeout_ms == 0 {
        errors.push(ConfigIssue::new(
            "build_timeout_ms",
            "Build timeout must be greater than zero",
        ));
    }

    if config.max_concurrency == Some(0) {
        errors.push(ConfigIssue::new(
            "max_concurrency",
            "Max concurrency must be at least 1 when set",
        ));
    }

    if seen.contains(&Platform::Ios) {
        if let Some(ios) = &config.ios {
            validate_ios(ios, &mut errors);
        }
    }
    if seen.contains(&Platform::Android) {
        if let Some(android) = &config.android {
            validate_android(android, &mut errors);
        }
    }
    if seen.contains(&Platform::Web) {
        if let Some(web) = &config.web {
            validate_web(web, &mut errors);
        }
    }

    if config.mode == BuildMode::Production {
        if config.source_maps {
            warnings.push("Source maps are enabled in production mode".to_string());
        }
        if !config.minify {
            warnings.push("Minification is disabled in production mode".to_string());
        }
    }

    if config.parallel && config.stop_on_failure {
        warnings.push(
            "stop_on_failure only applies to sequential builds; use continue_on_failure = false"
                .to_string(),
        );
    }

    ConfigValidation {
        valid: errors.is_empty(),
        errors,
        warnings,
    }
}

fn validate_ios(ios: &IosOptions, errors: &mut Vec<ConfigIssue>) {
    if ios.bundle_id.is_empty() {
        errors.push(ConfigIssue::new("ios.bundle_id", "Bundle identifier is required"));
    } else if !bundle_id_pattern().is_match(&ios.bundle_id) {
        errors.push(ConfigIssue::new(
            "ios.bundle_id",
            format!("'{}' is not a reverse-DNS bundle identifier", ios.bundle_id),
        ));
    }

    if ios.deployment_target.is_empty() {
        errors.push(ConfigIssue::new(
            "ios.deployment_target",
            "Deployment target is required",
        ));
    }
}

fn validate_android(android: &AndroidOptions, errors: &mut Vec<ConfigIssue>) {
    if android.package_name.is_empty() {
        errors.push(ConfigIssue::new(
            "android.package_name",
            "Package name is required",
        ));
    } else if !package_name_pattern().is_match(&android.package_name) {
        errors.push(ConfigIssue::new(
            "android.package_name",
            format!("'{}' is not a valid package name", android.package_name),
        ));
    }

    match (android.min_sdk_version, android.target_sdk_version) {
        (None, _) => errors.push(ConfigIssue::new(
            "android.min_sdk_version",
            "Minimum SDK version is required",
        )),
        (_, None) => errors.push(ConfigIssue::new(
            "android.target_sdk_version",
            "Target SDK version is required",
        )),
        (Some(min), Some(target)) if min > target => errors.push(ConfigIssue::new(
            "android.min_sdk_version",
            format!("Minimum SDK version ({min}) must not exceed target SDK version ({target})"),
        )),
        _ => {}
    }
}

fn validate_web(web: &WebOptions, errors: &mut Vec<ConfigIssue>) {
    if web.formats.is_empty() {
        errors.push(ConfigIssue::new(
            "web.formats",
            "At least one output format is required",
        ));
    }
    if web.formats.iter().any(|f| f.trim().is_empty()) {
        errors.push(ConfigIssue::new("web.formats", "Output formats cannot be empty"));
    }
}
