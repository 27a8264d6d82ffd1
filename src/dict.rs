//! Multi-entry cache: one file holds a key-value mapping
//!
//! Two forms share the file format. The scoped form loads the whole mapping,
//! hands it to the caller for the duration of a scope and flushes it back in
//! one write. The per-call form resolves a key for each call of a memoized
//! function and runs its own load/lookup/persist cycle, which is what makes
//! a restarted script pick up exactly where it crashed.

use crate::access::Access;
use crate::config::{resolve_path, DEFAULT_DICT_FILE_NAME};
use crate::error::{RememoError, RememoResult};
use crate::key::{resolve_key, CacheKey, CallContext, KeyPolicy};
use crate::store::{decode_value, encode_value, json_type_name, load_blob, store_blob};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// A dictionary-like cache backed by one file
///
/// ```no_run
/// use rememo::{CacheDict, CallContext, KeyPolicy};
///
/// let cache = CacheDict::new("transforms.json");
///
/// // Scoped form: read and write entries directly.
/// cache.scope(|session| {
///     let transposed: Option<Vec<Vec<i64>>> = session.get("x_T")?;
///     let transposed = match transposed {
///         Some(cached) => cached,
///         None => {
///             let fresh = vec![vec![1, 3], vec![2, 4]];
///             session.put("x_T", &fresh)?;
///             fresh
///         }
///     };
///     Ok(transposed)
/// })?;
///
/// // Per-call form: memoize a function, one entry per distinct key.
/// let square = |n: i64| n * n;
/// for n in 0..10 {
///     let ctx = CallContext::new("square").arg(&n)?;
///     cache.cached(&ctx, &KeyPolicy::Automatic, || square(n))?;
/// }
/// # Ok::<(), rememo::RememoError>(())
/// ```
#[derive(Debug, Clone)]
pub struct CacheDict {
    file_path: PathBuf,
    access: Access,
}

impl CacheDict {
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

    /// Run `f` against the live mapping for the duration of one scope
    ///
    /// The mapping is loaded up front if reading is permitted (empty
    /// otherwise) and flushed back in one write when the scope ends if
    /// writing is permitted, whether or not it changed. The flush also
    /// happens when `f` returns an error, matching the session lifecycle:
    /// whatever was put into the mapping before the failure survives.
    pub fn scope<T, F>(&self, f: F) -> RememoResult<T>
    where
        F: FnOnce(&mut CacheSession) -> RememoResult<T>,
    {
        let entries = if self.access.read {
            self.load_entries()?
        } else {
            Map::new()
        };
        let mut session = CacheSession {
            file_path: self.file_path.clone(),
            entries,
        };

        let result = f(&mut session);

        if self.access.write {
            store_blob(&self.file_path, &Value::Object(session.entries))?;
            info!("Flushed cache mapping to {}", self.file_path.display());
        }
        result
    }

    /// Return the cached value for this call, computing and persisting it on
    /// a miss
    ///
    /// The key is resolved under `policy` from `ctx`. Each call loads the
    /// mapping afresh and persists it as a whole after a fresh computation,
    /// so file I/O grows with call count; the payoff is that every finished
    /// call is durable immediately.
    pub fn cached<T, F>(&self, ctx: &CallContext, policy: &KeyPolicy, compute: F) -> RememoResult<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> T,
    {
        self.try_cached(ctx, policy, || Ok(compute()))
    }

    /// Fallible-computation variant of [`cached`](CacheDict::cached)
    ///
    /// A computation error propagates as-is and nothing is written.
    pub fn try_cached<T, E, F>(&self, ctx: &CallContext, policy: &KeyPolicy, compute: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        E: From<RememoError>,
        F: FnOnce() -> Result<T, E>,
    {
        if !self.access.read && !self.access.write {
            // No mapping to consult or persist; run the computation directly.
            if !self.access.execute {
                return Err(self.execution_not_permitted().into());
            }
            return compute();
        }

        let key = resolve_key(ctx, policy)?;

        let mut entries = if self.access.read {
            self.load_entries()?
        } else {
            Map::new()
        };

        if self.access.read {
            if let Some(value) = entries.get(key.as_str()) {
                info!("Found cached value for key {key}");
                return Ok(decode_value(&self.file_path, value.clone())?);
            }
        }

        if !self.access.execute {
            return Err(self.execution_not_permitted().into());
        }

        debug!("Cache miss for key {key}, executing");
        let value = compute()?;

        if self.access.write {
            entries.insert(key.into_string(), encode_value(&value)?);
            store_blob(&self.file_path, &Value::Object(entries))?;
            info!("Wrote cache mapping to {}", self.file_path.display());
        }
        Ok(value)
    }

    /// Read one stored entry without computing anything
    pub fn peek<T: DeserializeOwned>(&self, key: impl Into<CacheKey>) -> RememoResult<Option<T>> {
        let key = key.into();
        match self.load_entries()?.get(key.as_str()) {
            Some(value) => Ok(Some(decode_value(&self.file_path, value.clone())?)),
            None => Ok(None),
        }
    }

    /// Read the whole stored mapping without computing anything
    pub fn peek_all(&self) -> RememoResult<Map<String, Value>> {
        self.load_entries()
    }

    fn load_entries(&self) -> RememoResult<Map<String, Value>> {
        match load_blob(&self.file_path)? {
            Some(Value::Object(entries)) => Ok(entries),
            Some(other) => Err(RememoError::WrongBlobShape {
                path: self.file_path.clone(),
                found: json_type_name(&other),
            }),
            None => {
                debug!("Creating a new cache mapping for {}", self.file_path.display());
                Ok(Map::new())
            }
        }
    }

    fn execution_not_permitted(&self) -> RememoError {
        RememoError::ExecutionNotPermitted {
            path: self.file_path.clone(),
            access: self.access.to_string(),
        }
    }
}

impl Default for CacheDict {
    fn default() -> Self {
        Self::new(DEFAULT_DICT_FILE_NAME)
    }
}

/// The live mapping exposed inside [`CacheDict::scope`]
///
/// All mutation is in-memory; persistence happens once, at scope exit.
#[derive(Debug)]
pub struct CacheSession {
    file_path: PathBuf,
    entries: Map<String, Value>,
}

impl CacheSession {
    /// Look up a key; `None` means no entry exists, which is distinct from a
    /// stored null or falsy value
    pub fn get<T: DeserializeOwned>(&self, key: impl Into<CacheKey>) -> RememoResult<Option<T>> {
        let key = key.into();
        match self.entries.get(key.as_str()) {
            Some(value) => Ok(Some(decode_value(&self.file_path, value.clone())?)),
            None => Ok(None),
        }
    }

    /// Set a key to a value, in memory only
    pub fn put<T: Serialize + ?Sized>(
        &mut self,
        key: impl Into<CacheKey>,
        value: &T,
    ) -> RememoResult<()> {
        self.entries.insert(key.into().into_string(), encode_value(value)?);
        Ok(())
    }

    pub fn remove(&mut self, key: impl Into<CacheKey>) -> bool {
        self.entries.remove(key.into().as_str()).is_some()
    }

    pub fn contains(&self, key: impl Into<CacheKey>) -> bool {
        self.entries.contains_key(key.into().as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}
