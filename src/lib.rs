//! rememo - disk-persisted memoization for crash recovery
//!
//! Stores a computation's result on disk under a derived key so a
//! long-running script can be restarted after a crash and resume where it
//! left off instead of recomputing finished work. This is deliberately not a
//! performance layer: lookups read the whole cache file, so cost grows with
//! file size. The value is durability of expensive intermediate results.
//!
//! Two cache shapes:
//!
//! - [`SingleValueCache`] - one file, one stored value.
//! - [`CacheDict`] - one file, a key-value mapping, usable as a scoped
//!   mapping ([`CacheDict::scope`]) or as a per-call memoizer
//!   ([`CacheDict::cached`]).
//!
//! Every entry point takes an [`Access`] policy parsed from a string of
//! `r`/`e`/`w` flags (read the file, execute the computation, write the
//! file), defaulting to full `"rew"` access. A read-only replay run uses
//! `"r"`; a run that must not touch the disk uses `"e"`.
//!
//! Relative cache paths resolve against a process-wide cache directory
//! ([`get_cache_dir`]/[`set_cache_dir`]), initialized to the OS-standard
//! cache location.
//!
//! Concurrent writers to one cache file are not coordinated: the last write
//! wins. The intended use is a single restarted script, not shared state.

pub mod access;
pub mod config;
pub mod dict;
pub mod error;
pub mod key;
pub mod single;
pub mod store;

pub use access::Access;
pub use config::{get_cache_dir, resolve_path, set_cache_dir, DEFAULT_DICT_FILE_NAME};
pub use dict::{CacheDict, CacheSession};
pub use error::{RememoError, RememoResult};
pub use key::{resolve_key, CacheIdentity, CacheKey, CallContext, KeyFn, KeyPolicy};
pub use single::SingleValueCache;
