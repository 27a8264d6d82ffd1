//! Cache access policy
//!
//! An access spec is a string of flags drawn from `r` (read the cache file),
//! `e` (execute the wrapped computation) and `w` (write the cache file), in
//! any order. A missing flag denies that permission.

use crate::error::{RememoError, RememoResult};
use std::fmt;
use std::str::FromStr;

/// Parsed read/execute/write permissions for a cache operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Access {
    pub read: bool,
    pub execute: bool,
    pub write: bool,
}

impl Access {
    /// Full access, equivalent to `"rew"`
    pub const FULL: Access = Access {
        read: true,
        execute: true,
        write: true,
    };

    /// Parse an access spec string
    ///
    /// Parsing is idempotent and order-independent: `"rew"`, `"wer"` and
    /// `"rrew"` all yield the same policy. Any character outside `{r,e,w}`
    /// is rejected.
    pub fn parse(spec: &str) -> RememoResult<Self> {
        let mut access = Access {
            read: false,
            execute: false,
            write: false,
        };
        for ch in spec.chars() {
            match ch {
                'r' => access.read = true,
                'e' => access.execute = true,
                'w' => access.write = true,
                other => {
                    return Err(RememoError::InvalidAccess {
                        spec: spec.to_string(),
                        offending: other,
                    })
                }
            }
        }
        Ok(access)
    }
}

impl Default for Access {
    fn default() -> Self {
        Self::FULL
    }
}

impl FromStr for Access {
    type Err = RememoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.read {
            write!(f, "r")?;
        }
        if self.execute {
            write!(f, "e")?;
        }
        if self.write {
            write!(f, "w")?;
        }
        Ok(())
    }
}
