//! In-memory store of call outcomes.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::record::{Outcome, ReplayableError, ResultRecord};
use crate::call::canonical::to_json;
use crate::call::CallKey;
use crate::CacheError;

/// Cache statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of recorded calls.
    pub entries: usize,

    /// Entries holding a returned value.
    pub values: usize,

    /// Entries holding a captured error.
    pub errors: usize,

    /// Calls answered from the cache since the store was created or loaded.
    pub hits: u64,

    /// Calls that had to run the underlying function.
    pub misses: u64,
}

impl CacheStats {
    /// Computes the hit rate.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Mapping from [`CallKey`] to [`ResultRecord`].
///
/// The store is shared by reference: any number of wrapped functions can
/// hold `&CacheStore` at once and each writes only under its own function
/// identity. Mutation goes through interior mutability, so the store is
/// neither `Sync` nor meant to be used from several threads.
///
/// Entries are never evicted or expired.
#[derive(Default)]
pub struct CacheStore {
    entries: RefCell<BTreeMap<CallKey, ResultRecord>>,
    hits: Cell<u64>,
    misses: Cell<u64>,
}

impl CacheStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding the given entries.
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (CallKey, ResultRecord)>,
    {
        Self {
            entries: RefCell::new(entries.into_iter().collect()),
            ..Self::default()
        }
    }

    /// Looks up the recorded outcome of a call.
    pub fn get(&self, key: &CallKey) -> Option<ResultRecord> {
        self.entries.borrow().get(key).cloned()
    }

    /// Records an outcome, replacing any previous one for the same call.
    pub fn put(&self, key: CallKey, record: ResultRecord) {
        self.entries.borrow_mut().insert(key, record);
    }

    pub fn contains(&self, key: &CallKey) -> bool {
        self.entries.borrow().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Snapshot of all entries in key order.
    pub fn entries(&self) -> Vec<(CallKey, ResultRecord)> {
        self.entries
            .borrow()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Consumes the store, returning its entries.
    pub fn into_entries(self) -> BTreeMap<CallKey, ResultRecord> {
        self.entries.into_inner()
    }

    pub(crate) fn with_entries<R>(&self, f: impl FnOnce(&BTreeMap<CallKey, ResultRecord>) -> R) -> R {
        f(&self.entries.borrow())
    }

    /// Returns cache statistics.
    pub fn stats(&self) -> CacheStats {
        let entries = self.entries.borrow();
        let errors = entries.values().filter(|r| r.is_error()).count();
        CacheStats {
            entries: entries.len(),
            values: entries.len() - errors,
            errors,
            hits: self.hits.get(),
            misses: self.misses.get(),
        }
    }

    /// Answers `key` from the cache, or runs `call` and records its outcome.
    ///
    /// On a hit the recorded error is replayed, or the recorded value decoded,
    /// without running `call`. On a miss both returned values and errors are
    /// recorded; errors are cached outcomes like any other and are not retried.
    /// A value that JSON cannot hold faithfully (a NaN or an infinity, a map
    /// with non-string keys) is returned but not recorded.
    pub fn memoize<O, E, F>(&self, key: CallKey, call: F) -> Result<O, E>
    where
        O: Serialize + DeserializeOwned,
        E: ReplayableError + From<CacheError>,
        F: FnOnce() -> Result<O, E>,
    {
        if let Some(record) = self.get(&key) {
            self.hits.set(self.hits.get() + 1);
            tracing::debug!(
                function = key.function(),
                fingerprint = %key.fingerprint(),
                error = record.is_error(),
                "Cache hit"
            );

            return match record.outcome {
                Outcome::Error(captured) => Err(E::replay(captured)),
                Outcome::Value(value) => serde_json::from_value(value).map_err(|e| {
                    CacheError::ValueMismatch {
                        function: key.function().to_string(),
                        reason: e.to_string(),
                    }
                    .into()
                }),
            };
        }

        self.misses.set(self.misses.get() + 1);
        tracing::debug!(
            function = key.function(),
            fingerprint = %key.fingerprint(),
            "Cache miss"
        );

        let result = call();
        match &result {
            Ok(value) => match to_json(value) {
                Ok(json) => self.put(key, ResultRecord::value(json)),
                Err(e) => tracing::warn!(
                    function = key.function(),
                    error = %e,
                    "Return value cannot be recorded, result not cached"
                ),
            },
            Err(err) => self.put(key, ResultRecord::error(err.capture())),
        }
        result
    }
}

impl fmt::Debug for CacheStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheStore")
            .field("entries", &self.len())
            .field("hits", &self.hits.get())
            .field("misses", &self.misses.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::cache::CapturedError;
    use crate::call::{Identity, Kwargs};
    use serde_json::json;

    fn key(name: &str, arg: i64) -> CallKey {
        CallKey::from_args(&Identity::named(name), &(arg,), &Kwargs::new()).unwrap()
    }

    #[test]
    fn test_store_starts_empty() {
        let store = CacheStore::new();
        assert!(store.is_empty());
        assert!(store.get(&key("f", 1)).is_none());
    }

    #[test]
    fn test_put_and_get() {
        let store = CacheStore::new();
        store.put(key("f", 1), ResultRecord::value(json!("one")));
        assert!(store.contains(&key("f", 1)));
        assert_eq!(store.get(&key("f", 1)).unwrap().returned(), Some(&json!("one")));
        assert!(store.get(&key("f", 2)).is_none());
    }

    #[test]
    fn test_put_overwrites() {
        let store = CacheStore::new();
        store.put(key("f", 1), ResultRecord::value(json!(1)));
        store.put(key("f", 1), ResultRecord::value(json!(2)));
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(&key("f", 1)).unwrap().returned(), Some(&json!(2)));
    }

    #[test]
    fn test_from_entries() {
        let store = CacheStore::from_entries(vec![
            (key("f", 1), ResultRecord::value(json!(1))),
            (key("g", 1), ResultRecord::error(CapturedError::new("E", "x"))),
        ]);
        let stats = store.stats();
        assert_eq!(stats.entries, 2);
        assert_eq!(stats.values, 1);
        assert_eq!(stats.errors, 1);
    }

    #[test]
    fn test_memoize_value_runs_once() {
        let store = CacheStore::new();
        let mut calls = 0;

        for _ in 0..3 {
            let result: Result<i64, CapturedError> = store.memoize(key("double", 21), || {
                calls += 1;
                Ok(42)
            });
            assert_eq!(result.unwrap(), 42);
        }

        assert_eq!(calls, 1);
        let stats = store.stats();
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
        assert!((stats.hit_rate() - 0.666).abs() < 0.01);
    }

    #[test]
    fn test_memoize_error_is_replayed() {
        let store = CacheStore::new();
        let mut calls = 0;

        for _ in 0..2 {
            let result: Result<i64, CapturedError> = store.memoize(key("parse", 1), || {
                calls += 1;
                Err(CapturedError::new("ValueError", "bad"))
            });
            let err = result.unwrap_err();
            assert_eq!(err.kind, "ValueError");
            assert_eq!(err.message, "bad");
        }

        assert_eq!(calls, 1);
        assert!(store.get(&key("parse", 1)).unwrap().is_error());
    }

    #[test]
    fn test_memoize_type_mismatch() {
        let store = CacheStore::new();
        store.put(key("f", 1), ResultRecord::value(json!("text")));

        let result: Result<i64, CapturedError> = store.memoize(key("f", 1), || Ok(1));
        let err = result.unwrap_err();
        assert_eq!(err.kind, "CacheError");
        assert!(err.message.contains("does not match the expected type"));
    }

    #[test]
    fn test_unrecordable_value_is_returned_uncached() {
        let store = CacheStore::new();
        let result: Result<HashMap<(u8, u8), u8>, CapturedError> =
            store.memoize(key("grid", 1), || Ok(HashMap::from([((0, 0), 1)])));
        assert_eq!(result.unwrap().len(), 1);
        assert!(store.is_empty());
    }

    #[test]
    fn test_non_finite_value_is_returned_uncached() {
        let store = CacheStore::new();
        let mut calls = 0;

        for _ in 0..2 {
            let result: Result<f64, CapturedError> = store.memoize(key("reciprocal", 0), || {
                calls += 1;
                Ok(1.0 / 0.0)
            });
            assert_eq!(result.unwrap(), f64::INFINITY);
        }

        assert_eq!(calls, 2);
        assert!(store.is_empty());
        assert_eq!(store.stats().misses, 2);
    }

    #[test]
    fn test_nan_inside_option_is_not_recorded_as_none() {
        let store = CacheStore::new();
        let result: Result<Option<f64>, CapturedError> =
            store.memoize(key("ratio", 0), || Ok(Some(f64::NAN)));
        assert!(result.unwrap().unwrap().is_nan());
        assert!(store.is_empty());
    }

    #[test]
    fn test_nested_memoize_on_same_store() {
        let store = CacheStore::new();
        let outer: Result<i64, CapturedError> = store.memoize(key("outer", 1), || {
            let inner: Result<i64, CapturedError> = store.memoize(key("inner", 1), || Ok(10));
            Ok(inner? + 1)
        });
        assert_eq!(outer.unwrap(), 11);
        assert_eq!(store.len(), 2);
    }
}
