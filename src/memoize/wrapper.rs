//! The memoizing function wrapper.

use std::fmt;

use super::invocable::Invocable;
use super::policy::{KeyPolicy, KwargsOrder};
use crate::cache::CacheStore;
use crate::call::{Identity, Kwargs};

/// A function whose outcomes are recorded in, and replayed from, a [`CacheStore`].
///
/// Created by [`CacheStore::wrap`]. Formats (`Debug` and `Display`) exactly
/// like the wrapped function.
pub struct Memoized<'s, F, P = KwargsOrder> {
    store: &'s CacheStore,
    function: F,
    policy: P,
    identity: Identity,
}

impl CacheStore {
    /// Wraps `function` so its calls are cached in this store, keyed with
    /// keyword order preserved.
    pub fn wrap<F: Invocable>(&self, function: F) -> Memoized<'_, F> {
        self.wrap_with_policy(function, KwargsOrder::Preserve)
    }

    /// Wraps `function` with a custom key policy.
    pub fn wrap_with_policy<F, P>(&self, function: F, policy: P) -> Memoized<'_, F, P>
    where
        F: Invocable,
        P: KeyPolicy<F::Args>,
    {
        let identity = function.identity();
        tracing::debug!(function = %identity, "Wrapping function");
        Memoized {
            store: self,
            function,
            policy,
            identity,
        }
    }
}

impl<'s, F, P> Memoized<'s, F, P>
where
    F: Invocable,
    P: KeyPolicy<F::Args>,
{
    /// Calls with positional arguments only.
    pub fn call(&self, args: F::Args) -> Result<F::Output, F::Error> {
        self.call_with(args, &Kwargs::new())
    }

    /// Calls with positional and keyword arguments.
    ///
    /// A recorded outcome for the same key is returned (or its error raised)
    /// without running the function. Otherwise the function runs and its
    /// outcome, value or error, is recorded before being returned.
    pub fn call_with(&self, args: F::Args, kwargs: &Kwargs) -> Result<F::Output, F::Error> {
        let key = self.policy.call_key(&self.identity, &args, kwargs)?;
        self.store.memoize(key, || self.function.invoke(args, kwargs))
    }
}

impl<'s, F, P> Memoized<'s, F, P> {
    /// Identity of the wrapped function.
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Short name of the wrapped function.
    pub fn name(&self) -> &str {
        self.identity.display_name()
    }

    pub fn unique_name(&self) -> String {
        self.identity.unique_name()
    }

    /// The wrapped function.
    pub fn inner(&self) -> &F {
        &self.function
    }

    pub fn policy(&self) -> &P {
        &self.policy
    }

    pub fn store(&self) -> &'s CacheStore {
        self.store
    }
}

impl<F: fmt::Debug, P> fmt::Debug for Memoized<'_, F, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.function, f)
    }
}

impl<F: fmt::Display, P> fmt::Display for Memoized<'_, F, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.function, f)
    }
}
