//! Key policies: how a call becomes a [`CallKey`].

use serde::{Deserialize, Serialize};

use crate::call::{CallKey, Identity, Kwargs};
use crate::CacheResult;

/// Maps a call's identity and arguments to the key it is cached under.
///
/// Policies can normalize or drop arguments, for example to keep unstable
/// values (timestamps, request ids) out of the key, as long as the result is
/// a valid key. Any `Fn(&Identity, &A, &Kwargs) -> CacheResult<CallKey>` is a
/// policy.
pub trait KeyPolicy<A: ?Sized> {
    fn call_key(&self, function: &Identity, args: &A, kwargs: &Kwargs) -> CacheResult<CallKey>;
}

impl<A, F> KeyPolicy<A> for F
where
    A: ?Sized,
    F: Fn(&Identity, &A, &Kwargs) -> CacheResult<CallKey>,
{
    fn call_key(&self, function: &Identity, args: &A, kwargs: &Kwargs) -> CacheResult<CallKey> {
        self(function, args, kwargs)
    }
}

/// How keyword argument order affects the key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KwargsOrder {
    /// Keywords are compared as an ordered sequence: `h(x=1, y=2)` and
    /// `h(y=2, x=1)` are different calls.
    #[default]
    Preserve,
    /// Keywords are sorted by name before keying, so order is irrelevant.
    Sorted,
}

impl KwargsOrder {
    fn apply(self, key: CallKey) -> CallKey {
        match self {
            KwargsOrder::Preserve => key,
            KwargsOrder::Sorted => {
                let mut pairs = key.kwargs().to_vec();
                pairs.sort_by(|a, b| a.0.cmp(&b.0));
                key.with_kwargs(pairs)
            }
        }
    }
}

impl<A: Serialize + ?Sized> KeyPolicy<A> for KwargsOrder {
    fn call_key(&self, function: &Identity, args: &A, kwargs: &Kwargs) -> CacheResult<CallKey> {
        CallKey::from_args(function, args, kwargs).map(|key| self.apply(key))
    }
}

/// Leaves the named keyword arguments out of the key.
#[derive(Debug, Clone, Default)]
pub struct Redact {
    names: Vec<String>,
    order: KwargsOrder,
}

impl Redact {
    pub fn kwargs<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
            order: KwargsOrder::default(),
        }
    }

    /// Keyword ordering applied to the remaining arguments.
    pub fn with_order(mut self, order: KwargsOrder) -> Self {
        self.order = order;
        self
    }
}

impl<A: Serialize + ?Sized> KeyPolicy<A> for Redact {
    fn call_key(&self, function: &Identity, args: &A, kwargs: &Kwargs) -> CacheResult<CallKey> {
        let kept: Kwargs = kwargs
            .pairs()
            .iter()
            .filter(|(name, _)| !self.names.contains(name))
            .cloned()
            .collect();
        self.order.call_key(function, args, &kept)
    }
}
