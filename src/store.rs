//! Blob persistence
//!
//! One JSON blob per cache file. A missing file is the normal "nothing
//! cached yet" state and reads as `None`; a file that exists but cannot be
//! parsed is a loud [`RememoError::CacheCorruption`], never a silent miss.

use crate::error::{RememoError, RememoResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::io;
use std::path::Path;
use tracing::debug;

/// Load the blob at `path`, or `None` if no file exists there
pub fn load_blob(path: &Path) -> RememoResult<Option<Value>> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!("Cache file {} not found", path.display());
            return Ok(None);
        }
        Err(e) => {
            return Err(RememoError::io(
                format!("reading cache file {}", path.display()),
                e,
            ))
        }
    };

    let value = serde_json::from_str(&contents).map_err(|e| RememoError::CacheCorruption {
        path: path.to_path_buf(),
        source: e,
    })?;
    debug!("Loaded cache file {}", path.display());
    Ok(Some(value))
}

/// Write `blob` to `path` in one write, creating parent directories
pub fn store_blob(path: &Path, blob: &Value) -> RememoResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| RememoError::io(format!("creating directory {}", parent.display()), e))?;
    }

    let contents =
        serde_json::to_vec(blob).map_err(|e| RememoError::UnserializableValue { source: e })?;
    fs::write(path, contents)
        .map_err(|e| RememoError::io(format!("writing cache file {}", path.display()), e))?;
    debug!("Wrote cache file {}", path.display());
    Ok(())
}

pub(crate) fn encode_value<T: Serialize + ?Sized>(value: &T) -> RememoResult<Value> {
    serde_json::to_value(value).map_err(|e| RememoError::UnserializableValue { source: e })
}

pub(crate) fn decode_value<T: DeserializeOwned>(path: &Path, value: Value) -> RememoResult<T> {
    serde_json::from_value(value).map_err(|e| RememoError::CacheCorruption {
        path: path.to_path_buf(),
        source: e,
    })
}

pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
