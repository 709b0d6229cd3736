//! Call identity and cache keys.
//!
//! A [`CallKey`] is built from the [`Identity`] of the called function plus
//! its positional and keyword arguments, each captured as an [`ArgValue`].
//! Only arguments that serialize to plain data can take part in a key; NaN
//! and infinities are refused rather than collapsed to `null`.

pub(crate) mod canonical;
mod identity;
mod key;

pub use identity::{unique_name, Identity};
pub use key::{ArgValue, CallKey, Kwargs};
