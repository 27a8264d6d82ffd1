//! Process-wide cache directory configuration
//!
//! Relative cache file paths are resolved against a single configurable
//! directory, initialized to the OS-standard cache location. Resolution takes
//! a snapshot of the current value at call time; changing the directory never
//! retroactively moves already-resolved paths.

use std::path::{Path, PathBuf};
use std::sync::{LazyLock, PoisonError, RwLock};
use tracing::debug;

/// Default file name used by `CacheDict` when no path is given
pub const DEFAULT_DICT_FILE_NAME: &str = "comp_cache.json";

static CACHE_DIR: LazyLock<RwLock<PathBuf>> = LazyLock::new(|| RwLock::new(default_cache_dir()));

fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("rememo")
}

/// Get the current cache directory
pub fn get_cache_dir() -> PathBuf {
    CACHE_DIR
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

/// Replace the cache directory for all subsequent relative-path resolutions
pub fn set_cache_dir(path: impl Into<PathBuf>) {
    let path = path.into();
    debug!("Setting cache directory to {}", path.display());
    *CACHE_DIR.write().unwrap_or_else(PoisonError::into_inner) = path;
}

/// Resolve a cache file path
///
/// Absolute paths are used verbatim. Relative paths and bare file names are
/// joined onto the current cache directory, independent of the working
/// directory.
pub fn resolve_path(path: impl AsRef<Path>) -> PathBuf {
    let path = path.as_ref();
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        get_cache_dir().join(path)
    }
}
