//! Hashable call keys.

use std::fmt;

use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use sha2::{Digest, Sha256};

use super::canonical::to_json;
use super::identity::Identity;
use crate::{CacheError, CacheResult};

/// A single argument value, held as canonical JSON.
///
/// Object keys are sorted, so two values that serialize to the same data
/// compare equal regardless of the map type they came from.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArgValue(String);

impl ArgValue {
    /// Captures `value` for use in a key.
    pub fn new<T: Serialize + ?Sized>(value: &T) -> CacheResult<Self> {
        Self::labelled(value, "value")
    }

    pub(crate) fn labelled<T: Serialize + ?Sized>(value: &T, label: &str) -> CacheResult<Self> {
        to_json(value)
            .map(|v| Self::from_json(&v))
            .map_err(|e| CacheError::key(label, e))
    }

    /// Captures an already-built JSON value.
    pub fn from_json(value: &Value) -> Self {
        Self(value.to_string())
    }

    /// Canonical JSON text.
    pub fn as_json(&self) -> &str {
        &self.0
    }

    /// Decodes the argument back into a concrete type.
    pub fn decode<T: DeserializeOwned>(&self) -> CacheResult<T> {
        serde_json::from_str(&self.0).map_err(CacheError::deserialization)
    }
}

impl fmt::Debug for ArgValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for ArgValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for ArgValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let value: Value = serde_json::from_str(&self.0).map_err(serde::ser::Error::custom)?;
        value.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ArgValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)
            .map_err(|e| D::Error::custom(format!("invalid argument value: {e}")))?;
        Ok(Self::from_json(&value))
    }
}

/// Keyword arguments in insertion order.
///
/// Inserting a name that is already present replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Kwargs {
    pairs: Vec<(String, ArgValue)>,
}

impl Kwargs {
    /// Creates an empty set of keyword arguments.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`Kwargs::insert`].
    pub fn with<T: Serialize + ?Sized>(mut self, name: &str, value: &T) -> CacheResult<Self> {
        self.insert(name, value)?;
        Ok(self)
    }

    /// Adds or replaces a keyword argument.
    pub fn insert<T: Serialize + ?Sized>(&mut self, name: &str, value: &T) -> CacheResult<()> {
        let value = ArgValue::labelled(value, name)?;
        self.insert_value(name, value);
        Ok(())
    }

    /// Adds or replaces a keyword argument that is already captured.
    pub fn insert_value(&mut self, name: &str, value: ArgValue) {
        match self.pairs.iter_mut().find(|(n, _)| n == name) {
            Some((_, slot)) => *slot = value,
            None => self.pairs.push((name.to_string(), value)),
        }
    }

    /// Decodes the named argument, `None` when absent.
    pub fn get<T: DeserializeOwned>(&self, name: &str) -> CacheResult<Option<T>> {
        self.get_raw(name).map(ArgValue::decode).transpose()
    }

    /// Captured value of the named argument.
    pub fn get_raw(&self, name: &str) -> Option<&ArgValue> {
        self.pairs.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Iterates `(name, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ArgValue)> {
        self.pairs.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Pairs in insertion order.
    pub fn pairs(&self) -> &[(String, ArgValue)] {
        &self.pairs
    }
}

impl FromIterator<(String, ArgValue)> for Kwargs {
    fn from_iter<I: IntoIterator<Item = (String, ArgValue)>>(iter: I) -> Self {
        let mut kwargs = Kwargs::new();
        for (name, value) in iter {
            kwargs.insert_value(&name, value);
        }
        kwargs
    }
}

/// Immutable description of one call: which function, with which arguments.
///
/// Two keys are equal when the function identity, the positional sequence and
/// the keyword pair sequence are equal element-wise. Keyword order matters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CallKey {
    function: String,
    args: Vec<ArgValue>,
    kwargs: Vec<(String, ArgValue)>,
}

impl CallKey {
    /// Creates a key from already-captured parts.
    pub fn new(
        function: impl Into<String>,
        args: Vec<ArgValue>,
        kwargs: Vec<(String, ArgValue)>,
    ) -> Self {
        Self {
            function: function.into(),
            args,
            kwargs,
        }
    }

    /// Builds the key for calling `function` with a positional tuple and keyword arguments.
    pub fn from_args<A: Serialize + ?Sized>(
        function: &Identity,
        args: &A,
        kwargs: &Kwargs,
    ) -> CacheResult<Self> {
        Ok(Self {
            function: function.unique_name(),
            args: Self::positional(args)?,
            kwargs: kwargs.pairs().to_vec(),
        })
    }

    /// Splits a positional tuple into individual arguments.
    ///
    /// `()` yields no arguments, a tuple or sequence yields its elements and
    /// any other value is a single argument. NaN and infinities are rejected.
    pub fn positional<A: Serialize + ?Sized>(args: &A) -> CacheResult<Vec<ArgValue>> {
        let value = to_json(args).map_err(|e| CacheError::key("positional arguments", e))?;
        Ok(match value {
            Value::Null => Vec::new(),
            Value::Array(items) => items.iter().map(ArgValue::from_json).collect(),
            single => vec![ArgValue::from_json(&single)],
        })
    }

    /// Same key with keyword pairs replaced.
    pub fn with_kwargs(mut self, kwargs: Vec<(String, ArgValue)>) -> Self {
        self.kwargs = kwargs;
        self
    }

    /// Unique name of the called function.
    pub fn function(&self) -> &str {
        &self.function
    }

    pub fn args(&self) -> &[ArgValue] {
        &self.args
    }

    pub fn kwargs(&self) -> &[(String, ArgValue)] {
        &self.kwargs
    }

    /// SHA256 hex digest of the key, for logs and listings.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.function.as_bytes());
        for arg in &self.args {
            hasher.update([0u8]);
            hasher.update(arg.as_json().as_bytes());
        }
        for (name, value) in &self.kwargs {
            hasher.update([1u8]);
            hasher.update(name.as_bytes());
            hasher.update([b'=']);
            hasher.update(value.as_json().as_bytes());
        }
        hex::encode(hasher.finalize())
    }
}

impl fmt::Display for CallKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.function)?;
        let mut first = true;
        for arg in &self.args {
            if !first {
                f.write_str(", ")?;
            }
            write!(f, "{arg}")?;
            first = false;
        }
        for (name, value) in &self.kwargs {
            if !first {
                f.write_str(", ")?;
            }
            write!(f, "{name}={value}")?;
            first = false;
        }
        f.write_str(")")
    }
}
