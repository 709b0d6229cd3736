//! Stable, human-readable names for callables.

use std::fmt;
use std::panic::Location;

use serde::{Deserialize, Serialize};

/// Identity-relevant attributes of a callable or value.
///
/// The rendered name prefers the qualified name, then the short name, then
/// the type name, prefixed by the declaring module when one is known.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    /// Declaring module path.
    pub module: Option<String>,

    /// Name qualified within its module (e.g. `Rect::area`).
    pub qualname: Option<String>,

    /// Short name.
    pub name: Option<String>,

    /// Full compiler type name, always present.
    pub type_name: String,
}

impl Identity {
    /// Identity derived from the type path of `T`.
    ///
    /// For function items this is the path of the function itself, for
    /// closures the enclosing function followed by `{{closure}}`.
    ///
    /// The path comes from [`std::any::type_name`], whose output is not
    /// guaranteed to be stable across compiler versions. Keys persisted under
    /// such an identity may stop matching after a toolchain upgrade; use
    /// [`Identity::qualified`] for entries that must outlive one.
    pub fn of<T: ?Sized>() -> Self {
        Self::from_type_path(std::any::type_name::<T>())
    }

    /// Identity derived from a `::`-separated type path.
    pub fn from_type_path(path: &str) -> Self {
        let (module, name) = if path.starts_with("fn(") {
            (None, path)
        } else {
            split_path(path)
        };
        Self {
            module: module.map(str::to_string),
            qualname: None,
            name: Some(name.to_string()),
            type_name: path.to_string(),
        }
    }

    /// Identity with an explicit module and qualified name.
    pub fn qualified(module: impl Into<String>, qualname: impl Into<String>) -> Self {
        let qualname = qualname.into();
        let name = qualname.rsplit("::").next().unwrap_or_default().to_string();
        Self {
            module: Some(module.into()),
            type_name: qualname.clone(),
            qualname: Some(qualname),
            name: Some(name),
        }
    }

    /// Identity with a bare name and no module.
    pub fn named(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            module: None,
            qualname: None,
            type_name: name.clone(),
            name: Some(name),
        }
    }

    /// Identity of `method` declared on type `T`.
    pub fn method<T: ?Sized>(method: &str) -> Self {
        let owner = Self::of::<T>();
        let owner_name = owner.name.as_deref().unwrap_or(owner.type_name.as_str());
        Self {
            qualname: Some(format!("{owner_name}::{method}")),
            name: Some(method.to_string()),
            ..owner
        }
    }

    /// Whether the type path names no single function: a closure or a
    /// function pointer.
    pub fn is_anonymous(&self) -> bool {
        self.type_name.contains("{{closure}}") || self.type_name.starts_with("fn(")
    }

    /// Pins the identity to a source location, as `name@file:line:col`.
    ///
    /// Two closures in one function, or two function pointers of one
    /// signature, share a type path; the place they were adapted at tells
    /// them apart. Moving that code changes the identity.
    pub fn at_location(mut self, location: &Location<'_>) -> Self {
        let base = self.display_name().to_string();
        self.qualname = Some(format!(
            "{base}@{}:{}:{}",
            location.file(),
            location.line(),
            location.column()
        ));
        self
    }

    /// Replaces the module path.
    pub fn with_module(mut self, module: impl Into<String>) -> Self {
        self.module = Some(module.into());
        self
    }

    /// Name shown to users: the qualified name, else the short name, else the type name.
    pub fn display_name(&self) -> &str {
        [self.qualname.as_deref(), self.name.as_deref()]
            .into_iter()
            .flatten()
            .find(|n| !n.is_empty())
            .unwrap_or(self.type_name.as_str())
    }

    /// Unique string used to disambiguate cache keys across callables.
    pub fn unique_name(&self) -> String {
        let name = self.display_name();
        match self.module.as_deref() {
            Some(module) if !module.is_empty() => format!("{module}::{name}"),
            _ => name.to_string(),
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.unique_name())
    }
}

/// Unique name of any value, derived from its type.
pub fn unique_name<T: ?Sized>(_value: &T) -> String {
    Identity::of::<T>().unique_name()
}

/// Splits `a::b::C<x::Y>` into `(Some("a::b"), "C<x::Y>")`, ignoring
/// separators nested inside generics, tuples or slices.
fn split_path(path: &str) -> (Option<&str>, &str) {
    let bytes = path.as_bytes();
    let mut depth = 0usize;
    let mut split_at = None;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'<' | b'(' | b'[' => depth += 1,
            b'>' | b')' | b']' => depth = depth.saturating_sub(1),
            b':' if depth == 0 && bytes.get(i + 1) == Some(&b':') => {
                split_at = Some(i);
                i += 1;
            }
            _ => {}
        }
        i += 1;
    }

    match split_at {
        Some(at) if at > 0 => (Some(&path[..at]), &path[at + 2..]),
        _ => (None, path),
    }
}
