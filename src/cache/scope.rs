//! Load-on-enter, save-on-exit access to a persisted store.

use std::ops::Deref;
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::persist::SnapshotFormat;
use super::store::CacheStore;
use crate::types::config::StoreConfig;
use crate::{CacheError, CacheResult};

/// A [`CacheStore`] tied to a file for the duration of a unit of work.
///
/// Entering loads the file, or starts empty when it does not exist. The store
/// is written back by [`StoreScope::close`], or on drop if the scope is left
/// any other way (early return, `?`, panic). Drop-time failures can only be
/// logged; use `close` to observe them.
///
/// There is no locking between load and save: two scopes over the same file
/// overwrite each other, last writer wins.
pub struct StoreScope {
    path: PathBuf,
    format: SnapshotFormat,
    store: CacheStore,
    closed: bool,
}

impl StoreScope {
    /// Opens the store at `path`, writing compact snapshots on exit.
    pub fn enter(path: impl Into<PathBuf>) -> CacheResult<Self> {
        Self::enter_as(path, SnapshotFormat::Compact)
    }

    /// Opens the store at `path`, writing snapshots in `format` on exit.
    ///
    /// Only a missing file is recovered from; malformed snapshots and other
    /// IO errors propagate.
    pub fn enter_as(path: impl Into<PathBuf>, format: SnapshotFormat) -> CacheResult<Self> {
        let path = path.into();
        let store = CacheStore::load_from_path(&path, true)?;
        tracing::debug!(path = %path.display(), entries = store.len(), "Store scope entered");
        Ok(Self {
            path,
            format,
            store,
            closed: false,
        })
    }

    /// Opens the store configured in `[store]`.
    pub fn enter_with_config(config: &StoreConfig) -> CacheResult<Self> {
        Self::enter_as(&config.path, config.format)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    /// Saves the store back to its file and ends the scope.
    pub fn close(mut self) -> CacheResult<()> {
        self.closed = true;
        self.store.save_to_path_as(&self.path, self.format)
    }
}

impl Deref for StoreScope {
    type Target = CacheStore;

    fn deref(&self) -> &CacheStore {
        &self.store
    }
}

impl Drop for StoreScope {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        if let Err(e) = self.store.save_to_path_as(&self.path, self.format) {
            tracing::error!(
                path = %self.path.display(),
                error = %e,
                "Failed to persist cache store on scope exit"
            );
        }
    }
}

/// Failure of [`with_store`].
#[derive(Debug, Error)]
pub enum ScopeError<E> {
    /// The store could not be loaded; the block did not run.
    #[error("Failed to open cache store: {0}")]
    Open(#[source] CacheError),

    /// The block failed; the store was saved.
    #[error("{0}")]
    Block(E),

    /// The block succeeded but saving the store failed.
    #[error("Failed to persist cache store: {0}")]
    Persist(#[source] CacheError),

    /// The block failed and saving the store during cleanup failed as well.
    #[error("{block} (persisting the cache store during cleanup also failed: {persist})")]
    BlockAndPersist {
        block: E,
        #[source]
        persist: CacheError,
    },
}

impl<E> ScopeError<E> {
    /// Error returned by the block, if it failed.
    pub fn block_error(&self) -> Option<&E> {
        match self {
            Self::Block(e) | Self::BlockAndPersist { block: e, .. } => Some(e),
            _ => None,
        }
    }

    /// Consumes the error, returning the block's error if it failed.
    pub fn into_block_error(self) -> Option<E> {
        match self {
            Self::Block(e) | Self::BlockAndPersist { block: e, .. } => Some(e),
            _ => None,
        }
    }

    /// Cache error raised while opening or persisting the store.
    pub fn cache_error(&self) -> Option<&CacheError> {
        match self {
            Self::Open(e) | Self::Persist(e) | Self::BlockAndPersist { persist: e, .. } => Some(e),
            Self::Block(_) => None,
        }
    }
}

/// Runs `block` against the store persisted at `path`.
///
/// The store is loaded (or started empty) before the block and saved after
/// it, whether the block succeeds or fails, so outcomes recorded before a
/// failure are kept.
pub fn with_store<T, E, F>(path: impl Into<PathBuf>, block: F) -> Result<T, ScopeError<E>>
where
    F: FnOnce(&CacheStore) -> Result<T, E>,
{
    let scope = StoreScope::enter(path).map_err(ScopeError::Open)?;
    let outcome = block(&scope);
    let persisted = scope.close();

    match (outcome, persisted) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(persist)) => Err(ScopeError::Persist(persist)),
        (Err(block), Ok(())) => Err(ScopeError::Block(block)),
        (Err(block), Err(persist)) => Err(ScopeError::BlockAndPersist { block, persist }),
    }
}
