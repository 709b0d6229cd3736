//! Memoizing several methods of a type at once.

/// Declares a wrapper type whose listed methods are memoized in one shared
/// [`CacheStore`](crate::CacheStore).
///
/// Each method is keyed by `Identity::method::<Target>(name)` plus the
/// receiver and the arguments, so the target type and every argument must be
/// `Serialize`. Method return types must be `Result<O, E>` with `O`
/// serializable and `E: ReplayableError + From<CacheError>`. Methods that are
/// not listed stay reachable through `Deref`.
///
/// # Example
/// ```
/// use oncecall::{memoize_methods, CacheStore, CapturedError};
/// use serde::Serialize;
///
/// #[derive(Serialize)]
/// pub struct Rect {
///     scale: u64,
/// }
///
/// impl Rect {
///     fn area(&self, w: u64, h: u64) -> Result<u64, CapturedError> {
///         Ok(self.scale * w * h)
///     }
/// }
///
/// memoize_methods! {
///     /// `Rect` with cached area.
///     pub struct CachedRect for Rect {
///         fn area(&self, w: u64, h: u64) -> Result<u64, CapturedError>;
///     }
/// }
///
/// let store = CacheStore::new();
/// let rect = CachedRect::new(Rect { scale: 2 }, &store);
/// assert_eq!(rect.area(3, 4).unwrap(), 24);
/// assert_eq!(store.len(), 1);
/// ```
#[macro_export]
macro_rules! memoize_methods {
    (
        $(#[$meta:meta])*
        $vis:vis struct $wrapper:ident for $target:ty {
            $(
                $(#[$method_meta:meta])*
                fn $method:ident(&self $(, $arg:ident : $arg_ty:ty)* $(,)?) -> $ret:ty;
            )+
        }
    ) => {
        $(#[$meta])*
        $vis struct $wrapper<'s> {
            inner: $target,
            store: &'s $crate::CacheStore,
        }

        #[allow(dead_code)]
        impl<'s> $wrapper<'s> {
            /// Names of the memoized methods.
            pub const METHODS: &'static [&'static str] = &[$(stringify!($method)),+];

            pub fn new(inner: $target, store: &'s $crate::CacheStore) -> Self {
                Self { inner, store }
            }

            pub fn inner(&self) -> &$target {
                &self.inner
            }

            pub fn into_inner(self) -> $target {
                self.inner
            }

            pub fn store(&self) -> &'s $crate::CacheStore {
                self.store
            }

            $(
                $(#[$method_meta])*
                pub fn $method(&self $(, $arg: $arg_ty)*) -> $ret {
                    let identity = $crate::call::Identity::method::<$target>(stringify!($method));
                    let key = match $crate::call::CallKey::from_args(
                        &identity,
                        &(&self.inner, $(&$arg,)*),
                        &$crate::call::Kwargs::new(),
                    ) {
                        Ok(key) => key,
                        Err(err) => return Err(err.into()),
                    };
                    self.store
                        .memoize(key, || <$target>::$method(&self.inner $(, $arg)*))
                }
            )+
        }

        impl<'s> ::core::ops::Deref for $wrapper<'s> {
            type Target = $target;

            fn deref(&self) -> &$target {
                &self.inner
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use serde::Serialize;

    use crate::{CacheStore, CapturedError};

    #[derive(Serialize)]
    struct Catalog {
        region: String,
        #[serde(skip)]
        lookups: Cell<u32>,
    }

    impl Catalog {
        fn new(region: &str) -> Self {
            Self {
                region: region.to_string(),
                lookups: Cell::new(0),
            }
        }

        fn price(&self, sku: &str) -> Result<u64, CapturedError> {
            self.lookups.set(self.lookups.get() + 1);
            match sku {
                "apple" => Ok(3),
                _ => Err(CapturedError::new("UnknownSku", format!("{sku} in {}", self.region))),
            }
        }

        fn stock(&self, sku: &str, warehouse: u8) -> Result<u64, CapturedError> {
            self.lookups.set(self.lookups.get() + 1);
            Ok(sku.len() as u64 * warehouse as u64)
        }

        fn label(&self) -> String {
            format!("catalog:{}", self.region)
        }
    }

    memoize_methods! {
        struct CachedCatalog for Catalog {
            fn price(&self, sku: &str) -> Result<u64, CapturedError>;
            fn stock(&self, sku: &str, warehouse: u8) -> Result<u64, CapturedError>;
        }
    }

    #[test]
    fn test_methods_share_one_store() {
        let store = CacheStore::new();
        let catalog = CachedCatalog::new(Catalog::new("eu"), &store);

        assert_eq!(catalog.price("apple").unwrap(), 3);
        assert_eq!(catalog.price("apple").unwrap(), 3);
        assert_eq!(catalog.stock("apple", 2).unwrap(), 10);
        assert_eq!(catalog.stock("apple", 2).unwrap(), 10);

        assert_eq!(catalog.inner().lookups.get(), 2);
        assert_eq!(store.len(), 2);
        assert_eq!(CachedCatalog::METHODS, &["price", "stock"]);
    }

    #[test]
    fn test_method_errors_are_replayed() {
        let store = CacheStore::new();
        let catalog = CachedCatalog::new(Catalog::new("us"), &store);

        let first = catalog.price("pear").unwrap_err();
        let second = catalog.price("pear").unwrap_err();
        assert_eq!(first, second);
        assert_eq!(first.message, "pear in us");
        assert_eq!(catalog.lookups.get(), 1);
    }

    #[test]
    fn test_receiver_is_part_of_the_key() {
        let store = CacheStore::new();
        let eu = CachedCatalog::new(Catalog::new("eu"), &store);
        let us = CachedCatalog::new(Catalog::new("us"), &store);

        eu.price("apple").unwrap();
        us.price("apple").unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(us.lookups.get(), 1);
    }

    #[test]
    fn test_unlisted_methods_through_deref() {
        let store = CacheStore::new();
        let catalog = CachedCatalog::new(Catalog::new("eu"), &store);
        assert_eq!(catalog.label(), "catalog:eu");
        assert!(store.is_empty());
    }
}
