//! # oncecall
//!
//! Call-result cache: records the value or error a function produced for a
//! given set of arguments and replays it on later identical calls, instead of
//! running the function again. The cache can be saved to a file and restored
//! in a later run.
//!
//! ```
//! use std::cell::Cell;
//! use oncecall::{positional, CacheStore, CapturedError};
//!
//! let store = CacheStore::new();
//! let runs = Cell::new(0);
//! let slow_square = store.wrap(positional(|(x,): (u64,)| -> Result<u64, CapturedError> {
//!     runs.set(runs.get() + 1);
//!     Ok(x * x)
//! }));
//!
//! assert_eq!(slow_square.call((12,)).unwrap(), 144);
//! assert_eq!(slow_square.call((12,)).unwrap(), 144);
//! assert_eq!(runs.get(), 1);
//! ```
//!
//! ## Modules
//!
//! - [`call`] - Function identities and cache keys
//! - [`cache`] - The result store, its persistence and scoped file access
//! - [`memoize`] - Function wrappers and key policies
//! - [`cli`] - Command line interface for inspecting snapshots
//! - [`types`] - Configuration and errors

pub mod cache;
pub mod call;
#[cfg(feature = "cli")]
pub mod cli;
pub mod memoize;
pub mod types;

pub use cache::{
    with_store, CacheStats, CacheStore, CapturedError, Outcome, ReplayableError, ResultRecord,
    ScopeError, SnapshotFormat, StoreScope,
};
pub use call::{ArgValue, CallKey, Identity, Kwargs};
pub use memoize::{positional, Function, Invocable, KeyPolicy, KwargsOrder, Memoized, Redact};
pub use types::config::Config;
pub use types::errors::{CacheError, CacheResult};
