//! Integration tests for memoized calls.

use std::cell::Cell;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use oncecall::{
    positional, CacheError, CacheStore, CallKey, CapturedError, Function, Identity, Kwargs,
    KwargsOrder, Redact, ReplayableError,
};

/// Error type of an application function, replayable from the cache.
#[derive(Debug, Error, PartialEq, Serialize, Deserialize)]
enum ParseError {
    #[error("bad value: {0}")]
    BadValue(String),

    #[error("out of range: {0}")]
    OutOfRange(i64),

    #[error("cache failure: {0}")]
    Cache(String),
}

impl From<CacheError> for ParseError {
    fn from(err: CacheError) -> Self {
        ParseError::Cache(err.to_string())
    }
}

impl ReplayableError for ParseError {
    fn capture(&self) -> CapturedError {
        CapturedError::from_serializable("ParseError", self)
    }

    fn replay(captured: CapturedError) -> Self {
        captured
            .payload_as()
            .unwrap_or(ParseError::Cache(captured.message))
    }
}

mod inventory {
    pub fn lookup((sku,): (String,)) -> Result<String, oncecall::CapturedError> {
        Ok(format!("inventory:{sku}"))
    }
}

mod pricing {
    pub fn lookup((sku,): (String,)) -> Result<String, oncecall::CapturedError> {
        Ok(format!("pricing:{sku}"))
    }
}

mod value_tests {
    use super::*;

    #[test]
    fn test_counter_function_runs_once() {
        let store = CacheStore::new();
        let counter = Cell::new(0u32);
        let next = store.wrap(positional(|(): ()| -> Result<u32, CapturedError> {
            counter.set(counter.get() + 1);
            Ok(counter.get())
        }));

        let results: Vec<u32> = (0..3).map(|_| next.call(()).unwrap()).collect();

        assert_eq!(counter.get(), 1);
        assert_eq!(results, vec![1, 1, 1]);
    }

    #[test]
    fn test_distinct_arguments_are_distinct_entries() {
        let store = CacheStore::new();
        let runs = Cell::new(0);
        let square = store.wrap(positional(|(x,): (i64,)| -> Result<i64, CapturedError> {
            runs.set(runs.get() + 1);
            Ok(x * x)
        }));

        assert_eq!(square.call((2,)).unwrap(), 4);
        assert_eq!(square.call((3,)).unwrap(), 9);
        assert_eq!(square.call((2,)).unwrap(), 4);
        assert_eq!(runs.get(), 2);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_structured_values_round_trip_through_cache() {
        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
        struct Report {
            name: String,
            scores: Vec<u8>,
        }

        let store = CacheStore::new();
        let build = store.wrap(positional(|(name,): (String,)| -> Result<Report, CapturedError> {
            Ok(Report {
                name,
                scores: vec![3, 1, 4],
            })
        }));

        let first = build.call(("weekly".to_string(),)).unwrap();
        let second = build.call(("weekly".to_string(),)).unwrap();
        assert_eq!(first, second);
        assert_eq!(store.stats().hits, 1);
    }
}

mod error_tests {
    use super::*;

    #[test]
    fn test_error_is_cached_and_replayed() {
        let store = CacheStore::new();
        let runs = Cell::new(0);
        let g = store.wrap(positional(|(x,): (i64,)| -> Result<i64, ParseError> {
            runs.set(runs.get() + 1);
            if x == 1 {
                Err(ParseError::BadValue("bad".to_string()))
            } else {
                Ok(x)
            }
        }));

        assert_eq!(g.call((1,)), Err(ParseError::BadValue("bad".to_string())));
        assert_eq!(g.call((1,)), Err(ParseError::BadValue("bad".to_string())));
        assert_eq!(runs.get(), 1);

        assert_eq!(g.call((2,)), Ok(2));
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn test_error_variant_and_payload_survive() {
        let store = CacheStore::new();
        let check = store.wrap(positional(|(x,): (i64,)| -> Result<i64, ParseError> {
            Err(ParseError::OutOfRange(x))
        }));

        check.call((99,)).unwrap_err();
        assert_eq!(check.call((99,)).unwrap_err(), ParseError::OutOfRange(99));

        let record = store.entries().pop().unwrap().1;
        let captured = record.raised().unwrap();
        assert_eq!(captured.kind, "ParseError");
        assert_eq!(captured.message, "out of range: 99");
    }

    #[test]
    fn test_unkeyable_argument_surfaces_as_function_error() {
        let store = CacheStore::new();
        let f = store.wrap(Function::new(
            |(_,): (std::collections::HashMap<Vec<u8>, u8>,), _: &Kwargs| -> Result<(), ParseError> {
                Ok(())
            },
        ));

        let arg = std::collections::HashMap::from([(vec![1u8], 1u8)]);
        match f.call((arg,)) {
            Err(ParseError::Cache(message)) => assert!(message.contains("cache key")),
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(store.is_empty());
    }
}

mod float_tests {
    use super::*;

    #[test]
    fn test_infinite_result_is_recomputed_not_misreplayed() {
        let store = CacheStore::new();
        let runs = Cell::new(0);
        let reciprocal = store.wrap(positional(|(x,): (f64,)| -> Result<f64, CapturedError> {
            runs.set(runs.get() + 1);
            Ok(1.0 / x)
        }));

        assert_eq!(reciprocal.call((0.0,)).unwrap(), f64::INFINITY);
        assert_eq!(reciprocal.call((0.0,)).unwrap(), f64::INFINITY);
        assert_eq!(runs.get(), 2);

        assert_eq!(reciprocal.call((4.0,)).unwrap(), 0.25);
        assert_eq!(reciprocal.call((4.0,)).unwrap(), 0.25);
        assert_eq!(runs.get(), 3);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_non_finite_arguments_do_not_share_a_key() {
        let store = CacheStore::new();
        let runs = Cell::new(0);
        let show = store.wrap(positional(|(x,): (f64,)| -> Result<String, CapturedError> {
            runs.set(runs.get() + 1);
            Ok(format!("{x}"))
        }));

        for bad in [f64::INFINITY, f64::NEG_INFINITY, f64::NAN] {
            let err = show.call((bad,)).unwrap_err();
            assert!(err.is_kind("CacheError"));
            assert!(err.message.contains("non-finite"));
        }
        assert_eq!(runs.get(), 0);
        assert!(store.is_empty());

        assert_eq!(show.call((1.5,)).unwrap(), "1.5");
        assert_eq!(show.call((-1.5,)).unwrap(), "-1.5");
        assert_eq!(store.len(), 2);
    }
}

mod identity_tests {
    use super::*;

    #[test]
    fn test_same_short_name_different_modules_do_not_collide() {
        let store = CacheStore::new();
        let stock = store.wrap(positional(inventory::lookup));
        let price = store.wrap(positional(pricing::lookup));

        assert_eq!(stock.name(), price.name());
        assert_ne!(stock.unique_name(), price.unique_name());

        assert_eq!(stock.call(("a1".to_string(),)).unwrap(), "inventory:a1");
        assert_eq!(price.call(("a1".to_string(),)).unwrap(), "pricing:a1");
        assert_eq!(store.len(), 2);

        let key_a = CallKey::from_args(stock.identity(), &("a1",), &Kwargs::new()).unwrap();
        let key_b = CallKey::from_args(price.identity(), &("a1",), &Kwargs::new()).unwrap();
        assert_ne!(key_a, key_b);
    }

    #[test]
    fn test_bare_closures_in_one_function_do_not_collide() {
        let store = CacheStore::new();
        let double = store.wrap(positional(|(x,): (i64,)| -> Result<i64, CapturedError> {
            Ok(x * 2)
        }));
        let triple = store.wrap(positional(|(x,): (i64,)| -> Result<i64, CapturedError> {
            Ok(x * 3)
        }));

        assert_ne!(double.unique_name(), triple.unique_name());
        assert!(double.unique_name().contains("@tests/memoize_integration.rs:"));

        assert_eq!(double.call((5,)).unwrap(), 10);
        assert_eq!(triple.call((5,)).unwrap(), 15);
        assert_eq!(double.call((5,)).unwrap(), 10);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_explicit_identity_overrides_location() {
        let store = CacheStore::new();
        let add = store.wrap(
            positional(|(a, b): (i64, i64)| -> Result<i64, CapturedError> { Ok(a + b) })
                .with_identity(Identity::qualified("math", "add")),
        );
        assert_eq!(add.unique_name(), "math::add");
    }
}

mod kwargs_tests {
    use super::*;

    fn scaled(
        runs: &Cell<u32>,
    ) -> impl Fn((), &Kwargs) -> Result<i64, CapturedError> + '_ {
        move |(): (), kw: &Kwargs| -> Result<i64, CapturedError> {
            runs.set(runs.get() + 1);
            let x: i64 = kw.get("x")?.unwrap_or(0);
            let y: i64 = kw.get("y")?.unwrap_or(0);
            Ok(x * 10 + y)
        }
    }

    fn xy() -> Kwargs {
        Kwargs::new().with("x", &1).unwrap().with("y", &2).unwrap()
    }

    fn yx() -> Kwargs {
        Kwargs::new().with("y", &2).unwrap().with("x", &1).unwrap()
    }

    #[test]
    fn test_default_policy_keyword_order_is_significant() {
        let store = CacheStore::new();
        let runs = Cell::new(0);
        let h = store.wrap(Function::new(scaled(&runs)));

        assert_eq!(h.call_with((), &xy()).unwrap(), 12);
        assert_eq!(h.call_with((), &yx()).unwrap(), 12);
        assert_eq!(runs.get(), 2);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_sorted_policy_keyword_order_is_ignored() {
        let store = CacheStore::new();
        let runs = Cell::new(0);
        let h = store.wrap_with_policy(Function::new(scaled(&runs)), KwargsOrder::Sorted);

        assert_eq!(h.call_with((), &xy()).unwrap(), 12);
        assert_eq!(h.call_with((), &yx()).unwrap(), 12);
        assert_eq!(runs.get(), 1);
    }

    #[test]
    fn test_redacted_kwarg_does_not_split_entries() {
        let store = CacheStore::new();
        let runs = Cell::new(0);
        let fetch = store.wrap_with_policy(
            Function::new(|(page,): (u32,), _: &Kwargs| -> Result<u32, CapturedError> {
                runs.set(runs.get() + 1);
                Ok(page * 100)
            }),
            Redact::kwargs(["trace_id"]),
        );

        let first = Kwargs::new().with("trace_id", &"abc").unwrap();
        let second = Kwargs::new().with("trace_id", &"def").unwrap();
        assert_eq!(fetch.call_with((1,), &first).unwrap(), 100);
        assert_eq!(fetch.call_with((1,), &second).unwrap(), 100);
        assert_eq!(runs.get(), 1);
    }

    #[test]
    fn test_closure_censor() {
        let store = CacheStore::new();
        let runs = Cell::new(0);
        let censor = |id: &Identity, args: &(String, u64), _: &Kwargs| {
            CallKey::from_args(id, &(args.0.to_lowercase(),), &Kwargs::new())
        };
        let greet = store.wrap_with_policy(
            positional(|(name, _now): (String, u64)| -> Result<String, CapturedError> {
                runs.set(runs.get() + 1);
                Ok(format!("hello {name}"))
            }),
            censor,
        );

        assert_eq!(greet.call(("Ada".to_string(), 1)).unwrap(), "hello Ada");
        assert_eq!(greet.call(("ADA".to_string(), 2)).unwrap(), "hello Ada");
        assert_eq!(runs.get(), 1);
    }
}

mod sharing_tests {
    use super::*;

    #[test]
    fn test_store_shared_between_wrappers() {
        let store = CacheStore::new();
        let add = store.wrap(
            positional(|(a, b): (i64, i64)| -> Result<i64, CapturedError> { Ok(a + b) })
                .with_identity(Identity::qualified("math", "add")),
        );
        let mul = store.wrap(
            positional(|(a, b): (i64, i64)| -> Result<i64, CapturedError> { Ok(a * b) })
                .with_identity(Identity::qualified("math", "mul")),
        );

        assert_eq!(add.call((3, 4)).unwrap(), 7);
        assert_eq!(mul.call((3, 4)).unwrap(), 12);
        assert_eq!(add.call((3, 4)).unwrap(), 7);

        let stats = store.stats();
        assert_eq!(stats.entries, 2);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 2);
    }

    #[test]
    fn test_recursive_memoization() {
        let store = CacheStore::new();
        let runs = Cell::new(0);

        fn fib(store: &CacheStore, runs: &Cell<u32>, n: u64) -> Result<u64, CapturedError> {
            let key = CallKey::from_args(&Identity::named("fib"), &(n,), &Kwargs::new())?;
            store.memoize(key, || {
                runs.set(runs.get() + 1);
                if n < 2 {
                    Ok(n)
                } else {
                    Ok(fib(store, runs, n - 1)? + fib(store, runs, n - 2)?)
                }
            })
        }

        assert_eq!(fib(&store, &runs, 30).unwrap(), 832040);
        assert_eq!(runs.get(), 31);
    }
}
