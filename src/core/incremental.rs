//! Incremental builds
//!
//! Detects source and design-token changes by content hash and serves
//! unchanged platforms from a persisted build cache.
//!
//! The cache is a single JSON file (`{cache_dir}/build-cache.json`) mapping
//! `build-cache-{platform}` to a [`BuildCacheEntry`]. It is read once when the
//! builder is created and rewritten on every mutation. Cache I/O problems are
//! logged and never fail a build: a cache that cannot be loaded starts empty,
//! and a cache that cannot be saved keeps working in memory.
//!
//! One builder owns a cache directory at a time. Concurrent processes sharing
//! a cache directory are not coordinated; the last writer wins. Saves go
//! through a temporary file and a rename, so readers never observe a
//! partially written cache.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::config::defaults;
use crate::core::config::BuildConfig;
use crate::core::executor::BuildFn;
use crate::core::platform::Platform;
use crate::core::result::BuildResult;
use crate::error::CacheError;

/// Kind of file change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Added,
    Modified,
    Deleted,
}

/// A detected file change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChange {
    /// Changed file
    pub path: PathBuf,
    /// Kind of change
    pub kind: ChangeKind,
    /// SHA-256 of the new content; `None` for deletions
    pub hash: Option<String>,
    /// When the change was detected
    pub detected_at: DateTime<Utc>,
}

/// Persisted cache record for one platform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildCacheEntry {
    /// Platform the entry belongs to
    pub platform: Platform,
    /// Combined hash of every watched source file
    pub source_hash: String,
    /// Combined hash of every watched token file
    pub tokens_hash: String,
    /// Result of the build that produced this entry
    pub result: BuildResult,
    /// When the entry was written
    pub timestamp: DateTime<Utc>,
    /// Artifacts produced by the build
    #[serde(default)]
    pub artifacts: Vec<PathBuf>,
}

impl BuildCacheEntry {
    /// Time since the entry was written (zero if the clock went backwards)
    pub fn age(&self) -> Duration {
        (Utc::now() - self.timestamp).to_std().unwrap_or_default()
    }
}

/// Build cache statistics
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    /// Cache file location
    pub path: PathBuf,
    /// Number of entries
    pub entry_count: usize,
    /// Distinct platforms with an entry
    pub platforms: Vec<Platform>,
    /// Oldest entry timestamp
    pub oldest_entry: Option<DateTime<Utc>>,
    /// Newest entry timestamp
    pub newest_entry: Option<DateTime<Utc>>,
    /// Total on-disk size of cached artifacts in bytes
    pub total_size_bytes: u64,
}

impl CacheStats {
    /// Format size for display
    pub fn format_size(&self) -> String {
        format_size(self.total_size_bytes)
    }
}

/// Format a byte count for display
#[allow(clippy::cast_precision_loss)]
pub fn format_size(size_bytes: u64) -> String {
    if size_bytes == 0 {
        "0 bytes".to_string()
    } else if size_bytes < 1024 {
        format!("{size_bytes} bytes")
    } else if size_bytes < 1024 * 1024 {
        format!("{:.1} KB", size_bytes as f64 / 1024.0)
    } else if size_bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", size_bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.1} GB", size_bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

/// Cache key for a platform
pub fn cache_key(platform: Platform) -> String {
    format!("{}{platform}", defaults::CACHE_KEY_PREFIX)
}

/// Compute SHA256 checksum of data
pub fn compute_checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// SHA256 checksum of a file's contents
pub fn hash_file(path: &Path) -> std::io::Result<String> {
    Ok(compute_checksum(&std::fs::read(path)?))
}

/// Hash every file under `dirs`, keyed by path
///
/// Missing directories contribute nothing; unreadable files are skipped.
pub fn hash_files(dirs: &[PathBuf]) -> BTreeMap<PathBuf, String> {
    dirs.iter()
        .filter(|dir| dir.exists())
        .flat_map(|dir| walkdir::WalkDir::new(dir).sort_by_file_name())
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| match hash_file(e.path()) {
            Ok(hash) => Some((e.into_path(), hash)),
            Err(err) => {
                tracing::debug!("Skipping unreadable file {}: {err}", e.path().display());
                None
            }
        })
        .collect()
}

/// [`hash_files`] on the blocking thread pool
async fn hash_files_blocking(dirs: Vec<PathBuf>) -> BTreeMap<PathBuf, String> {
    tokio::task::spawn_blocking(move || hash_files(&dirs))
        .await
        .unwrap_or_else(|e| {
            tracing::warn!("File hashing task failed: {e}");
            BTreeMap::new()
        })
}

/// Single hash over a set of file hashes
pub fn combined_hash(files: &BTreeMap<PathBuf, String>) -> String {
    let mut hasher = Sha256::new();
    for (path, hash) in files {
        hasher.update(path.to_string_lossy().as_bytes());
        hasher.update(b"\0");
        hasher.update(hash.as_bytes());
        hasher.update(b"\0");
    }
    hex::encode(hasher.finalize())
}

/// On-disk size of a file or directory; missing paths count as zero
fn artifact_size(path: &Path) -> u64 {
    if !path.exists() {
        return 0;
    }

    walkdir::WalkDir::new(path)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| e.metadata().ok())
        .map(|m| m.len())
        .sum()
}

/// Load cache entries from a cache file
///
/// A missing file is an empty cache.
pub fn load_entries(path: &Path) -> Result<BTreeMap<String, BuildCacheEntry>, CacheError> {
    if !path.exists() {
        return Ok(BTreeMap::new());
    }
    let content = std::fs::read_to_string(path).map_err(|e| CacheError::IoError {
        path: path.to_path_buf(),
        error: e.to_string(),
    })?;
    let entries: BTreeMap<String, BuildCacheEntry> =
        serde_json::from_str(&content).map_err(|e| CacheError::Corrupt {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;
    Ok(entries
        .into_iter()
        .filter(|(key, _)| key.starts_with(defaults::CACHE_KEY_PREFIX))
        .collect())
}

/// Write cache entries to a cache file, replacing it atomically
pub fn save_entries(
    path: &Path,
    entries: &BTreeMap<String, BuildCacheEntry>,
) -> Result<(), CacheError> {
    let io_err = |p: &Path, e: std::io::Error| CacheError::IoError {
        path: p.to_path_buf(),
        error: e.to_string(),
    };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
    }
    let content = serde_json::to_string_pretty(entries).map_err(|e| CacheError::Corrupt {
        path: path.to_path_buf(),
        error: e.to_string(),
    })?;

    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, content).map_err(|e| io_err(&tmp, e))?;
    std::fs::rename(&tmp, path).map_err(|e| io_err(path, e))
}

struct CacheState {
    entries: BTreeMap<String, BuildCacheEntry>,
    snapshots: HashMap<Platform, BTreeMap<PathBuf, String>>,
    tokens_hash: String,
}

/// What the watched directories look like right now, relative to a platform's last look
struct Observation {
    changes: Vec<FileChange>,
    first_observation: bool,
    source_hash: String,
    tokens_hash: String,
}

/// Content-hash based incremental builder
pub struct IncrementalBuilder {
    cache_file: PathBuf,
    source_dirs: Vec<PathBuf>,
    token_dirs: Vec<PathBuf>,
    validate_cache: bool,
    max_age: Duration,
    state: Mutex<CacheState>,
    /// Serializes cache file writes
    save_lock: tokio::sync::Mutex<()>,
}

impl std::fmt::Debug for IncrementalBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IncrementalBuilder")
            .field("cache_file", &self.cache_file)
            .field("source_dirs", &self.source_dirs)
            .field("token_dirs", &self.token_dirs)
            .field("validate_cache", &self.validate_cache)
            .field("max_age", &self.max_age)
            .finish_non_exhaustive()
    }
}

impl IncrementalBuilder {
    /// Create a builder, loading any existing cache and hashing the token directories
    pub fn new(
        cache_dir: impl Into<PathBuf>,
        source_dirs: Vec<PathBuf>,
        token_dirs: Vec<PathBuf>,
        validate_cache: bool,
    ) -> Self {
        let cache_file = cache_dir.into().join(defaults::CACHE_FILE_NAME);
        let entries = match load_entries(&cache_file) {
            Ok(entries) => {
                tracing::debug!(
                    "Loaded {} cache entries from {}",
                    entries.len(),
                    cache_file.display()
                );
                entries
            }
            Err(e) => {
                tracing::warn!("Ignoring build cache: {e}");
                BTreeMap::new()
            }
        };
        let tokens_hash = combined_hash(&hash_files(&token_dirs));

        Self {
            cache_file,
            source_dirs,
            token_dirs,
            validate_cache,
            max_age: Duration::from_secs(defaults::CACHE_MAX_AGE_SECS),
            state: Mutex::new(CacheState {
                entries,
                snapshots: HashMap::new(),
                tokens_hash,
            }),
            save_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Create a builder from a build configuration
    pub fn from_config(config: &BuildConfig) -> Self {
        Self::new(
            &config.cache_dir,
            config.source_dirs.clone(),
            config.token_dirs.clone(),
            config.validate_cache,
        )
    }

    /// Set the maximum entry age
    #[must_use]
    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    /// Cache file location
    pub fn cache_file(&self) -> &Path {
        &self.cache_file
    }

    fn state(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn observe(&self, platform: Platform) -> Observation {
        let sources = hash_files(&self.source_dirs);
        let tokens = hash_files(&self.token_dirs);
        self.diff(platform, sources, tokens)
    }

    async fn observe_blocking(&self, platform: Platform) -> Observation {
        let sources = hash_files_blocking(self.source_dirs.clone()).await;
        let tokens = hash_files_blocking(self.token_dirs.clone()).await;
        self.diff(platform, sources, tokens)
    }

    /// Compare freshly hashed files with the platform's previous snapshot and replace it
    fn diff(
        &self,
        platform: Platform,
        sources: BTreeMap<PathBuf, String>,
        tokens: BTreeMap<PathBuf, String>,
    ) -> Observation {
        let source_hash = combined_hash(&sources);
        let tokens_hash = combined_hash(&tokens);

        let mut current = sources;
        current.extend(tokens);

        let now = Utc::now();
        let mut state = self.state();
        let first_observation = !state.snapshots.contains_key(&platform);
        let previous = state.snapshots.entry(platform).or_default();

        let mut changes: Vec<FileChange> = current
            .iter()
            .filter_map(|(path, hash)| {
                let kind = match previous.get(path) {
                    None => ChangeKind::Added,
                    Some(old) if old != hash => ChangeKind::Modified,
                    Some(_) => return None,
                };
                Some(FileChange {
                    path: path.clone(),
                    kind,
                    hash: Some(hash.clone()),
                    detected_at: now,
                })
            })
            .collect();

        changes.extend(
            previous
                .keys()
                .filter(|path| !current.contains_key(*path))
                .map(|path| FileChange {
                    path: path.clone(),
                    kind: ChangeKind::Deleted,
                    hash: None,
                    detected_at: now,
                }),
        );

        *previous = current;

        Observation {
            changes,
            first_observation,
            source_hash,
            tokens_hash,
        }
    }

    /// Files added, modified or deleted since the previous call for `platform`
    ///
    /// The first call for a platform reports every watched file as added.
    pub fn detect_changes(&self, platform: Platform) -> Vec<FileChange> {
        let changes = self.observe(platform).changes;
        if !changes.is_empty() {
            tracing::debug!("{} file changes detected for {platform}", changes.len());
        }
        changes
    }

    /// Whether the token directories changed since the last check
    ///
    /// The first check compares against the hash taken at construction.
    pub fn tokens_changed(&self) -> bool {
        self.record_tokens_hash(combined_hash(&hash_files(&self.token_dirs)))
    }

    fn record_tokens_hash(&self, current: String) -> bool {
        let mut state = self.state();
        if state.tokens_hash == current {
            false
        } else {
            state.tokens_hash = current;
            true
        }
    }

    /// Run `regenerate` if the design tokens changed; returns whether it ran
    pub async fn regenerate_tokens_if_needed<F, Fut>(&self, regenerate: F) -> anyhow::Result<bool>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<()>>,
    {
        let current = combined_hash(&hash_files_blocking(self.token_dirs.clone()).await);
        if !self.record_tokens_hash(current) {
            tracing::debug!("Design tokens unchanged; skipping regeneration");
            return Ok(false);
        }
        tracing::info!("Design tokens changed; regenerating");
        regenerate().await?;
        Ok(true)
    }

    fn entry_is_valid(&self, entry: &BuildCacheEntry) -> bool {
        if entry.age() >= self.max_age {
            tracing::debug!("Cache entry for {} expired", entry.platform);
            return false;
        }
        if self.validate_cache {
            if let Some(missing) = entry.artifacts.iter().find(|p| !p.exists()) {
                tracing::debug!(
                    "Cache entry for {} invalid: artifact {} missing",
                    entry.platform,
                    missing.display()
                );
                return false;
            }
        }
        true
    }

    fn cached_result(
        &self,
        platform: Platform,
        observation: &Observation,
        tokens_changed: bool,
    ) -> Option<BuildResult> {
        let state = self.state();
        let entry = state.entries.get(&cache_key(platform))?;

        let sources_match = entry.source_hash == observation.source_hash
            && entry.tokens_hash == observation.tokens_hash;
        let unchanged = observation.changes.is_empty() || observation.first_observation;

        (unchanged && sources_match && !tokens_changed && self.entry_is_valid(entry))
            .then(|| entry.result.clone())
    }

    fn persist(&self, state: &CacheState) {
        if let Err(e) = save_entries(&self.cache_file, &state.entries) {
            tracing::warn!("Failed to save build cache: {e}");
        }
    }

    /// Save the current entries from the blocking thread pool
    ///
    /// Entries are read after the save lock is taken, so the last save to
    /// finish always holds the newest state.
    async fn persist_blocking(&self) {
        let _saving = self.save_lock.lock().await;
        let entries = self.state().entries.clone();
        let path = self.cache_file.clone();
        match tokio::task::spawn_blocking(move || save_entries(&path, &entries)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!("Failed to save build cache: {e}"),
            Err(e) => tracing::warn!("Build cache save task failed: {e}"),
        }
    }

    /// Build `platform` unless an up-to-date cache entry exists
    ///
    /// On a hit the cached result is returned with `cache_hit` set and `build`
    /// is not called. On a miss `build` is called exactly once; a successful
    /// result replaces the cache entry and is persisted before returning, a
    /// failed one drops any previous entry.
    pub async fn build_incremental(
        &self,
        platform: Platform,
        build: &BuildFn,
    ) -> anyhow::Result<BuildResult> {
        let observation = self.observe_blocking(platform).await;
        let tokens_changed = self.record_tokens_hash(observation.tokens_hash.clone());

        if let Some(mut cached) = self.cached_result(platform, &observation, tokens_changed) {
            tracing::info!("{platform} is up to date, using cached build");
            cached.cache_hit = true;
            return Ok(cached);
        }

        tracing::info!(
            "Rebuilding {platform} ({} file changes, tokens changed: {tokens_changed})",
            observation.changes.len()
        );
        let result = build(platform).await?;

        {
            let mut state = self.state();
            if result.success {
                let entry = BuildCacheEntry {
                    platform,
                    source_hash: observation.source_hash,
                    tokens_hash: observation.tokens_hash,
                    result: result.clone(),
                    timestamp: Utc::now(),
                    artifacts: result.output_path.iter().cloned().collect(),
                };
                state.entries.insert(cache_key(platform), entry);
            } else {
                state.entries.remove(&cache_key(platform));
            }
        }
        self.persist_blocking().await;

        Ok(result)
    }

    /// Remove one platform's entry, or every entry
    pub fn clear_cache(&self, platform: Option<Platform>) {
        let mut state = self.state();
        match platform {
            Some(platform) => {
                state.entries.remove(&cache_key(platform));
                tracing::info!("Cleared build cache for {platform}");
            }
            None => {
                state.entries.clear();
                tracing::info!("Cleared build cache");
            }
        }
        self.persist(&state);
    }

    /// Current cache entry for a platform
    pub fn entry(&self, platform: Platform) -> Option<BuildCacheEntry> {
        self.state().entries.get(&cache_key(platform)).cloned()
    }

    /// Cache statistics
    pub fn get_cache_stats(&self) -> CacheStats {
        let state = self.state();
        let entries = state.entries.values();

        let platforms: BTreeSet<Platform> = entries.clone().map(|e| e.platform).collect();
        let total_size_bytes = entries
            .clone()
            .flat_map(|e| e.artifacts.iter())
            .map(|p| artifact_size(p))
            .sum();

        CacheStats {
            path: self.cache_file.clone(),
            entry_count: state.entries.len(),
            platforms: platforms.into_iter().collect(),
            oldest_entry: entries.clone().map(|e| e.timestamp).min(),
            newest_entry: entries.map(|e| e.timestamp).max(),
            total_size_bytes,
        }
    }
}
