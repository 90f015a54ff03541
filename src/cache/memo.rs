//! File-per-key memoization for expensive remote calls.
//!
//! Each entry lives at `<root>/<key>.json`. Keys are caller-built strings and
//! may contain `/` to group entries (`papers/<id>`, `gpt-4o/<id>`). Entries
//! never expire: once a key is on disk the wrapped call is not made again for
//! it until the file is removed by hand (`reviewdesk cache remove`).

use std::future::Future;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::{Result, ReviewDeskError};

/// Version tag written into every record.
pub const RECORD_FORMAT: u32 = 1;

const RECORD_EXTENSION: &str = "json";
const RECORD_SUFFIX: &str = ".json";

/// Keyed durable storage with a compute-on-miss wrapper.
#[allow(async_fn_in_trait)]
pub trait Cache {
    /// Read the value stored under `key`, or `None` when no record exists.
    fn load<V: DeserializeOwned>(&self, key: &str) -> Result<Option<V>>;

    /// Persist `value` under `key`, replacing any previous record.
    fn store<V: Serialize>(&self, key: &str, value: &V) -> Result<()>;

    /// Return the stored value for `key`, or run `compute`, store its result
    /// and return it.
    ///
    /// Errors from `compute` propagate and nothing is stored. A record that
    /// exists but cannot be decoded is an error; `compute` is not run.
    async fn get_or_compute<V, F, Fut>(&self, key: &str, compute: F) -> Result<V>
    where
        V: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V>>,
    {
        if let Some(value) = self.load(key)? {
            return Ok(value);
        }
        let value = compute().await?;
        self.store(key, &value)?;
        Ok(value)
    }
}

#[derive(Serialize)]
struct RecordRef<'a, V> {
    format: u32,
    key: &'a str,
    value: &'a V,
}

#[derive(Deserialize)]
struct Record {
    format: u32,
    value: Value,
}

/// Disk-backed [`Cache`] rooted at a directory.
///
/// The root and any namespace directories are created on first write.
#[derive(Debug)]
pub struct MemoCache {
    root: PathBuf,
    hits: AtomicU64,
    misses: AtomicU64,
    writes: AtomicU64,
}

impl MemoCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            writes: AtomicU64::new(0),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Location of the record for `key`.
    ///
    /// Rejects empty keys, absolute keys and keys with `.`/`..` or empty
    /// segments so every record stays under the root. Namespace segments
    /// may not end in `.json`: `a.json/b` would need a directory where the
    /// record for `a` lives.
    pub fn entry_path(&self, key: &str) -> Result<PathBuf> {
        validate_key(key)?;
        Ok(self.root.join(format!("{key}.{RECORD_EXTENSION}")))
    }

    /// Returns `true` if a record exists for `key`.
    pub fn contains(&self, key: &str) -> Result<bool> {
        Ok(self.entry_path(key)?.is_file())
    }

    /// Delete the record for `key`. Returns `false` when there was none.
    pub fn remove(&self, key: &str) -> Result<bool> {
        let path = self.entry_path(key)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(storage_error("remove", &path, e)),
        }
    }

    /// Number of records currently under the root.
    pub fn entry_count(&self) -> Result<usize> {
        // The root is a literal path; only the suffix is a pattern.
        let root = glob::Pattern::escape(&self.root.to_string_lossy());
        let pattern = format!("{root}/**/*.{RECORD_EXTENSION}");
        let paths = glob::glob(&pattern).map_err(|e| {
            ReviewDeskError::Storage(format!("invalid cache root {}: {}", self.root.display(), e))
        })?;
        Ok(paths.filter_map(|p| p.ok()).filter(|p| p.is_file()).count())
    }

    /// Counters for this process.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
        }
    }

    fn write_atomic(&self, path: &Path, data: &[u8]) -> Result<()> {
        let parent = path.parent().unwrap_or(&self.root);
        std::fs::create_dir_all(parent).map_err(|e| storage_error("create", parent, e))?;

        let mut tmp = tempfile::NamedTempFile::new_in(parent)
            .map_err(|e| storage_error("create temp file in", parent, e))?;
        tmp.write_all(data)
            .map_err(|e| storage_error("write", tmp.path(), e))?;
        tmp.persist(path)
            .map_err(|e| storage_error("persist", path, e.error))?;
        Ok(())
    }
}

impl Cache for MemoCache {
    fn load<V: DeserializeOwned>(&self, key: &str) -> Result<Option<V>> {
        let path = self.entry_path(key)?;
        let data = match std::fs::read(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                debug!(key, "cache miss");
                return Ok(None);
            }
            Err(e) => return Err(storage_error("read", &path, e)),
        };

        let record: Record = serde_json::from_slice(&data).map_err(|e| {
            ReviewDeskError::Storage(format!("corrupt cache record {}: {}", path.display(), e))
        })?;
        if record.format != RECORD_FORMAT {
            return Err(ReviewDeskError::Storage(format!(
                "cache record {} has format {} (expected {})",
                path.display(),
                record.format,
                RECORD_FORMAT
            )));
        }
        let value = serde_json::from_value(record.value).map_err(|e| {
            ReviewDeskError::Storage(format!(
                "cache record {} does not match the requested type: {}",
                path.display(),
                e
            ))
        })?;

        self.hits.fetch_add(1, Ordering::Relaxed);
        debug!(key, "cache hit");
        Ok(Some(value))
    }

    fn store<V: Serialize>(&self, key: &str, value: &V) -> Result<()> {
        let path = self.entry_path(key)?;
        let record = RecordRef {
            format: RECORD_FORMAT,
            key,
            value,
        };
        let data = serde_json::to_vec_pretty(&record).map_err(|e| {
            ReviewDeskError::Storage(format!("failed to serialize value for {key}: {e}"))
        })?;
        self.write_atomic(&path, &data)?;
        self.writes.fetch_add(1, Ordering::Relaxed);
        debug!(key, path = %path.display(), "cache record written");
        Ok(())
    }
}

/// Per-process cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub writes: u64,
}

fn validate_key(key: &str) -> Result<()> {
    let invalid = |why: &str| ReviewDeskError::Storage(format!("invalid cache key {key:?}: {why}"));

    if key.is_empty() {
        return Err(invalid("empty"));
    }
    if Path::new(key).is_absolute() || key.starts_with('/') {
        return Err(invalid("absolute path"));
    }
    if key.contains('\\') {
        return Err(invalid("backslash"));
    }
    let mut segments = key.split('/').peekable();
    while let Some(segment) = segments.next() {
        match segment {
            "" => return Err(invalid("empty path segment")),
            "." | ".." => return Err(invalid("relative segment")),
            _ => {}
        }
        let is_namespace = segments.peek().is_some();
        if is_namespace && segment.ends_with(RECORD_SUFFIX) {
            return Err(invalid("namespace segment shadows a record file"));
        }
    }
    Ok(())
}

fn storage_error(op: &str, path: &Path, e: std::io::Error) -> ReviewDeskError {
    ReviewDeskError::Storage(format!("failed to {} {}: {}", op, path.display(), e))
}
