//! Callables that can be memoized.

use std::fmt;
use std::marker::PhantomData;
use std::panic::Location;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::cache::ReplayableError;
use crate::call::{Identity, Kwargs};
use crate::CacheError;

/// A callable adapted for memoization.
///
/// `Args` is the positional argument tuple; it takes part in the cache key, so
/// it must serialize to plain data. Outputs are stored as JSON and decoded
/// again on a hit. Errors must be replayable and able to carry the cache's
/// own failures (such as an argument that cannot be keyed).
pub trait Invocable {
    /// Positional arguments, usually a tuple.
    type Args: Serialize;

    /// Value returned on success.
    type Output: Serialize + DeserializeOwned;

    /// Error returned on failure.
    type Error: ReplayableError + From<CacheError>;

    /// Identity used to tell this callable's entries apart from others in a shared store.
    fn identity(&self) -> Identity;

    /// Runs the callable.
    fn invoke(&self, args: Self::Args, kwargs: &Kwargs) -> Result<Self::Output, Self::Error>;
}

/// Adapter turning a closure or function item into an [`Invocable`].
///
/// The identity defaults to the type path of the function. Closures and
/// function pointers carry no path of their own, so theirs also records the
/// line they were adapted at. Adapting several of them from one line (in a
/// loop, say) still yields one identity; use [`Function::with_identity`]
/// there, and for entries persisted across refactors.
pub struct Function<F, A> {
    func: F,
    identity: Identity,
    _args: PhantomData<fn(A)>,
}

impl<F, A> Function<F, A> {
    /// Adapts a function taking positional and keyword arguments.
    #[track_caller]
    pub fn new<O, E>(func: F) -> Self
    where
        F: Fn(A, &Kwargs) -> Result<O, E>,
    {
        Self {
            identity: default_identity::<F>(Location::caller()),
            func,
            _args: PhantomData,
        }
    }

    /// Replaces the identity.
    pub fn with_identity(mut self, identity: Identity) -> Self {
        self.identity = identity;
        self
    }
}

fn default_identity<F>(caller: &Location<'_>) -> Identity {
    let identity = Identity::of::<F>();
    if identity.is_anonymous() {
        identity.at_location(caller)
    } else {
        identity
    }
}

/// Adapts a function that takes positional arguments only.
#[track_caller]
pub fn positional<F, A, O, E>(func: F) -> Function<impl Fn(A, &Kwargs) -> Result<O, E>, A>
where
    F: Fn(A) -> Result<O, E>,
{
    Function {
        identity: default_identity::<F>(Location::caller()),
        func: move |args: A, _: &Kwargs| func(args),
        _args: PhantomData,
    }
}

impl<F, A, O, E> Invocable for Function<F, A>
where
    F: Fn(A, &Kwargs) -> Result<O, E>,
    A: Serialize,
    O: Serialize + DeserializeOwned,
    E: ReplayableError + From<CacheError>,
{
    type Args = A;
    type Output = O;
    type Error = E;

    fn identity(&self) -> Identity {
        self.identity.clone()
    }

    fn invoke(&self, args: A, kwargs: &Kwargs) -> Result<O, E> {
        (self.func)(args, kwargs)
    }
}

impl<F, A> fmt::Debug for Function<F, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("identity", &self.identity.unique_name())
            .finish()
    }
}

impl<F, A> fmt::Display for Function<F, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fn {}", self.identity)
    }
}
