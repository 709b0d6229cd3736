//! Memoizing wrappers over a shared [`CacheStore`](crate::CacheStore).
//!
//! Callables are adapted to [`Invocable`] (usually through [`Function`] or
//! [`positional`]) and wrapped with [`CacheStore::wrap`](crate::CacheStore::wrap).
//! The [`KeyPolicy`] decides which parts of a call form its cache key.
//! Several methods of one type can be memoized together with
//! [`memoize_methods!`](crate::memoize_methods).

mod invocable;
mod methods;
mod policy;
mod wrapper;

pub use invocable::{positional, Function, Invocable};
pub use policy::{KeyPolicy, KwargsOrder, Redact};
pub use wrapper::Memoized;
