//! Result cache.
//!
//! [`CacheStore`] maps call keys to [`ResultRecord`]s. A store can be written
//! to and read from snapshots, or bound to a file for the duration of a unit
//! of work with [`StoreScope`] / [`with_store`].

mod persist;
mod record;
mod scope;
mod store;

pub use persist::SnapshotFormat;
pub use record::{CapturedError, Outcome, ReplayableError, ResultRecord};
pub use scope::{with_store, ScopeError, StoreScope};
pub use store::{CacheStats, CacheStore};
