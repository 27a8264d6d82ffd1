//! Single-value cache: one file holds exactly one stored result
//!
//! Intended for crash-recovery of one expensive computation, not for speed:
//! the whole file is read on every call.

use crate::access::Access;
use crate::config::resolve_path;
use crate::error::{RememoError, RememoResult};
use crate::store::{decode_value, encode_value, load_blob, store_blob};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Caches one computation result in one file
///
/// Each [`cached`](SingleValueCache::cached) call runs the access decision
/// machine: read the file if permitted and return a hit immediately; on a
/// miss run the computation if permitted (otherwise fail); persist a freshly
/// computed value if permitted. At most one file write happens per call, and
/// only for a fresh computation.
///
/// ```no_run
/// use rememo::SingleValueCache;
///
/// fn a_heavy_function() -> u64 {
///     42
/// }
///
/// let cache = SingleValueCache::new("a_heavy_function.json");
/// let value = cache.cached(a_heavy_function)?;
/// // After a crash and restart, the same call returns the stored value
/// // without recomputing.
/// # Ok::<(), rememo::RememoError>(())
/// ```
#[derive(Debug, Clone)]
pub struct SingleValueCache {
    file_path: PathBuf,
    access: Access,
}

impl SingleValueCache {
    /// Create a cache with full `rew` access
    ///
    /// Relative paths and bare file names are resolved against the
    /// process-wide cache directory at construction time.
    pub fn new(file_path: impl AsRef<Path>) -> Self {
        Self::with_access(file_path, Access::default())
    }

    pub fn with_access(file_path: impl AsRef<Path>, access: Access) -> Self {
        Self {
            file_path: resolve_path(file_path),
            access,
        }
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    pub fn access(&self) -> Access {
        self.access
    }

    /// Return the cached value, computing and persisting it on a miss
    pub fn cached<T, F>(&self, compute: F) -> RememoResult<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> T,
    {
        self.try_cached(|| Ok(compute()))
    }

    /// Fallible-computation variant of [`cached`](SingleValueCache::cached)
    ///
    /// A computation error propagates as-is and nothing is written.
    pub fn try_cached<T, E, F>(&self, compute: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        E: From<RememoError>,
        F: FnOnce() -> Result<T, E>,
    {
        if self.access.read {
            if let Some(value) = load_blob(&self.file_path)? {
                info!("Using cached value from {}", self.file_path.display());
                return Ok(decode_value(&self.file_path, value)?);
            }
        }

        if !self.access.execute {
            return Err(RememoError::ExecutionNotPermitted {
                path: self.file_path.clone(),
                access: self.access.to_string(),
            }
            .into());
        }

        debug!("Cache miss for {}, executing", self.file_path.display());
        let value = compute()?;

        if self.access.write {
            store_blob(&self.file_path, &encode_value(&value)?)?;
            info!("Wrote cached value to {}", self.file_path.display());
        }
        Ok(value)
    }

    /// Read the stored value at `file_path` without computing anything
    pub fn peek<T: DeserializeOwned>(file_path: impl AsRef<Path>) -> RememoResult<Option<T>> {
        let path = resolve_path(file_path);
        match load_blob(&path)? {
            Some(value) => Ok(Some(decode_value(&path, value)?)),
            None => Ok(None),
        }
    }
}
