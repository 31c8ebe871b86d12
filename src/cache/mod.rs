//! Content-validated result cache.
//!
//! [`ResultCache`] memoizes expensive derived results (the flattened
//! dependency graph being the main client) keyed by `(namespace, logical key)`.
//! Every entry records the fingerprint of the file it was derived from, so a
//! later `get` can detect that the file changed and refuse to serve stale data.
//!
//! # Validation on `get`
//!
//! An entry is a miss, and is evicted, when any of these hold:
//! - it is older than [`CacheOptions::max_age`]
//! - `check_file_changes` is on and the source file's current fingerprint
//!   differs from the stored one
//! - `check_file_changes` is on and the fingerprint cannot be computed
//!
//! # Concurrency
//!
//! The backing store is a [`DashMap`] shared by every clone of the cache, so
//! concurrent `get`/`set` calls from different tasks never observe a torn
//! entry. `get` copies the entry out of the shard lock before fingerprinting
//! and only evicts if the entry was not replaced in the meantime.
//!
//! # Reclamation
//!
//! [`ResultCache::cleanup`] drops old entries in one pass;
//! [`ResultCache::spawn_cleanup`] runs it on an interval in a background task
//! that is stopped through the returned [`CleanupTask`].
//!
//! # Examples
//!
//! ```rust,no_run
//! use codebase_mcp::cache::ResultCache;
//!
//! # async fn example() {
//! let cache: ResultCache<Vec<String>> = ResultCache::new("/home/user/project");
//! cache.set("src/index.ts", vec!["a".to_string()], Some("get-dependency-tree")).await;
//!
//! if let Some(hit) = cache.get("src/index.ts", Some("get-dependency-tree")).await {
//!     println!("cached: {hit:?}");
//! }
//! # }
//! ```

pub mod fingerprint;

pub use fingerprint::fingerprint;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use sha2::{Digest, Sha256};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::constants::{DEFAULT_CACHE_MAX_AGE, DEFAULT_CACHE_NAMESPACE, MAX_CLEANUP_INTERVAL};

/// Validation settings for a [`ResultCache`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheOptions {
    /// Entries older than this are treated as misses.
    pub max_age: Duration,
    /// Whether `get` re-fingerprints the source file.
    pub check_file_changes: bool,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            max_age: DEFAULT_CACHE_MAX_AGE,
            check_file_changes: true,
        }
    }
}

/// A cached value plus what is needed to validate it.
#[derive(Debug)]
pub struct CacheEntry<T> {
    /// The cached result.
    pub data: Arc<T>,
    /// When the entry was stored.
    pub created_at: Instant,
    /// Fingerprint of `source_path` at store time; empty if it could not be computed.
    pub fingerprint: String,
    /// The file the result was derived from.
    pub source_path: PathBuf,
}

impl<T> Clone for CacheEntry<T> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
            created_at: self.created_at,
            fingerprint: self.fingerprint.clone(),
            source_path: self.source_path.clone(),
        }
    }
}

/// Namespaced, fingerprint-validated memo store.
///
/// Logical keys are file paths; relative keys are resolved against the root
/// passed at construction when fingerprinting.
pub struct ResultCache<T> {
    root: Arc<PathBuf>,
    entries: Arc<DashMap<String, CacheEntry<T>>>,
    options: CacheOptions,
}

impl<T> Clone for ResultCache<T> {
    fn clone(&self) -> Self {
        Self {
            root: Arc::clone(&self.root),
            entries: Arc::clone(&self.entries),
            options: self.options,
        }
    }
}

/// Compute the storage key for a `(namespace, logical key)` pair.
///
/// Missing namespaces fall back to [`DEFAULT_CACHE_NAMESPACE`].
#[must_use]
pub fn cache_key(logical_key: &str, namespace: Option<&str>) -> String {
    let namespace = namespace.unwrap_or(DEFAULT_CACHE_NAMESPACE);
    let mut hasher = Sha256::new();
    hasher.update(format!("{namespace}:{logical_key}").as_bytes());
    hex::encode(hasher.finalize())
}

impl<T: Send + Sync + 'static> ResultCache<T> {
    /// Create a cache with default options.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_options(root, CacheOptions::default())
    }

    /// Create a cache with explicit options.
    pub fn with_options(root: impl Into<PathBuf>, options: CacheOptions) -> Self {
        Self {
            root: Arc::new(root.into()),
            entries: Arc::new(DashMap::new()),
            options,
        }
    }

    /// The validation options in effect.
    #[must_use]
    pub const fn options(&self) -> CacheOptions {
        self.options
    }

    /// Number of stored entries, including ones that would fail validation.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up a cached result, validating age and source file content.
    ///
    /// Returns `None` on a miss. Stale or invalidated entries are evicted.
    pub async fn get(&self, logical_key: &str, namespace: Option<&str>) -> Option<Arc<T>> {
        let key = cache_key(logical_key, namespace);
        let entry = self.entries.get(&key).map(|entry| entry.value().clone())?;

        if entry.created_at.elapsed() > self.options.max_age {
            debug!("Cache entry for {} expired", logical_key);
            self.evict(&key, &entry);
            return None;
        }

        if self.options.check_file_changes {
            match fingerprint(&entry.source_path).await {
                Ok(current) if current == entry.fingerprint => {}
                Ok(_) => {
                    debug!("Source {} changed since it was cached", entry.source_path.display());
                    self.evict(&key, &entry);
                    return None;
                }
                Err(e) => {
                    debug!("Cannot revalidate cache entry for {}: {}", logical_key, e);
                    self.evict(&key, &entry);
                    return None;
                }
            }
        }

        Some(entry.data)
    }

    /// Store `data` under `(namespace, logical_key)`, overwriting any previous entry.
    ///
    /// The source file's fingerprint is computed now. If that fails the entry
    /// is still stored with an empty fingerprint and a warning is logged, which
    /// makes every content-checked `get` of it a miss.
    ///
    /// Returns the shared handle to the stored data.
    pub async fn set(&self, logical_key: &str, data: T, namespace: Option<&str>) -> Arc<T> {
        let key = cache_key(logical_key, namespace);
        let source_path = self.root.join(logical_key);

        let fingerprint = match fingerprint(&source_path).await {
            Ok(fingerprint) => fingerprint,
            Err(e) => {
                warn!("Failed to fingerprint {}: {}", source_path.display(), e);
                String::new()
            }
        };

        let data = Arc::new(data);
        self.entries.insert(
            key,
            CacheEntry {
                data: Arc::clone(&data),
                created_at: Instant::now(),
                fingerprint,
                source_path,
            },
        );
        data
    }

    /// Remove every entry older than `max_age`. Returns how many were removed.
    pub fn cleanup(&self, max_age: Duration) -> usize {
        let mut removed = 0;
        self.entries.retain(|_, entry| {
            let keep = entry.created_at.elapsed() <= max_age;
            if !keep {
                removed += 1;
            }
            keep
        });
        removed
    }

    /// Run [`cleanup`](Self::cleanup) every `interval` on a background task.
    ///
    /// Must be called from within a tokio runtime. The task stops when the
    /// returned handle is shut down or dropped. `interval` is clamped to
    /// between one millisecond and [`MAX_CLEANUP_INTERVAL`].
    pub fn spawn_cleanup(&self, interval: Duration, max_age: Duration) -> CleanupTask {
        let cache = self.clone();
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();
        let interval = interval.clamp(Duration::from_millis(1), MAX_CLEANUP_INTERVAL);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick completes immediately
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    _ = ticker.tick() => {
                        let removed = cache.cleanup(max_age);
                        if removed > 0 {
                            debug!("Cache cleanup removed {} entries", removed);
                        }
                    }
                }
            }
        });

        CleanupTask {
            shutdown: Some(shutdown_tx),
            handle,
        }
    }

    fn evict(&self, key: &str, seen: &CacheEntry<T>) {
        self.entries
            .remove_if(key, |_, current| Arc::ptr_eq(&current.data, &seen.data));
    }
}

/// Handle to the background cleanup task started by [`ResultCache::spawn_cleanup`].
#[derive(Debug)]
pub struct CleanupTask {
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

impl CleanupTask {
    /// Stop the task and wait for it to finish.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        let _ = (&mut self.handle).await;
    }

    /// Whether the task has already exited.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for CleanupTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
