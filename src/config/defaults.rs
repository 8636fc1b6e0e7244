//! Default configuration values

/// Default per-build timeout (in milliseconds)
pub const BUILD_TIMEOUT_MS: u64 = 5 * 60 * 1000;

/// Maximum age of a build cache entry before it is considered stale (in seconds)
pub const CACHE_MAX_AGE_SECS: u64 = 7 * 24 * 60 * 60;

/// Name of the build cache file inside the cache directory
pub const CACHE_FILE_NAME: &str = "build-cache.json";

/// Prefix of every key in the build cache file
pub const CACHE_KEY_PREFIX: &str = "build-cache-";

/// Default cache directory, relative to the project root
pub const CACHE_DIR: &str = ".tokenforge/cache";

/// Default output directory, relative to the project root
pub const OUTPUT_DIR: &str = "dist";

/// Default config file name
pub const CONFIG_FILE_NAME: &str = "tokenforge.toml";

/// Default source directories watched for changes
pub const SOURCE_DIRS: &[&str] = &["src"];

/// Default design token directories watched for changes
pub const TOKEN_DIRS: &[&str] = &["tokens"];

/// Minimum proptest iterations
pub const MIN_PROPTEST_ITERATIONS: u32 = 64;
