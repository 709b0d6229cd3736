//! Snapshot persistence for [`CacheStore`].
//!
//! A snapshot is one JSON document holding every entry of the store. It is an
//! internal checkpoint format: readers reject documents with another format
//! tag or version, and no compatibility across versions is promised.

use std::fs::File;
use std::io::{BufReader, BufWriter, ErrorKind, Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::record::ResultRecord;
use super::store::CacheStore;
use crate::call::CallKey;
use crate::{CacheError, CacheResult};

const SNAPSHOT_FORMAT: &str = "oncecall";
const SNAPSHOT_VERSION: u32 = 1;

/// Layout of a written snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotFormat {
    /// Single line JSON.
    #[default]
    Compact,
    /// Indented JSON, easier to diff.
    Pretty,
}

#[derive(Serialize)]
struct SnapshotRef<'a> {
    format: &'a str,
    version: u32,
    entries: Vec<EntryRef<'a>>,
}

#[derive(Serialize)]
struct EntryRef<'a> {
    call: &'a CallKey,
    record: &'a ResultRecord,
}

#[derive(Deserialize)]
struct Snapshot {
    format: String,
    version: u32,
    entries: Vec<Entry>,
}

#[derive(Deserialize)]
struct Entry {
    call: CallKey,
    record: ResultRecord,
}

fn read_error(err: serde_json::Error) -> CacheError {
    if err.is_io() {
        CacheError::Io(err.into())
    } else {
        CacheError::deserialization(err)
    }
}

fn write_error(err: serde_json::Error) -> CacheError {
    if err.is_io() {
        CacheError::Io(err.into())
    } else {
        CacheError::other(format!("Failed to serialize cache store: {err}"))
    }
}

impl CacheStore {
    /// Reads a store from a snapshot produced by [`CacheStore::save`].
    pub fn load<R: Read>(reader: R) -> CacheResult<Self> {
        let snapshot: Snapshot =
            serde_json::from_reader(BufReader::new(reader)).map_err(read_error)?;

        if snapshot.format != SNAPSHOT_FORMAT {
            return Err(CacheError::deserialization(format!(
                "unknown snapshot format '{}'",
                snapshot.format
            )));
        }
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(CacheError::deserialization(format!(
                "unsupported snapshot version {} (expected {})",
                snapshot.version, SNAPSHOT_VERSION
            )));
        }

        Ok(Self::from_entries(
            snapshot.entries.into_iter().map(|e| (e.call, e.record)),
        ))
    }

    /// Reads a store from snapshot bytes.
    pub fn from_bytes(bytes: &[u8]) -> CacheResult<Self> {
        Self::load(bytes)
    }

    /// Reads a store from a file.
    ///
    /// A missing file yields an empty store when `allow_missing` is set and
    /// [`CacheError::NotFound`] otherwise.
    pub fn load_from_path(path: impl AsRef<Path>, allow_missing: bool) -> CacheResult<Self> {
        let path = path.as_ref();
        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                if allow_missing {
                    tracing::debug!(path = %path.display(), "No cache store on disk, starting empty");
                    return Ok(Self::new());
                }
                return Err(CacheError::NotFound(path.to_path_buf()));
            }
            Err(e) => return Err(e.into()),
        };

        let store = Self::load(file)?;
        tracing::info!(path = %path.display(), entries = store.len(), "Cache store loaded");
        Ok(store)
    }

    /// Writes a compact snapshot of the whole store.
    pub fn save<W: Write>(&self, writer: W) -> CacheResult<()> {
        self.save_as(writer, SnapshotFormat::Compact)
    }

    /// Writes a snapshot of the whole store in the given layout.
    pub fn save_as<W: Write>(&self, writer: W, format: SnapshotFormat) -> CacheResult<()> {
        self.with_entries(|entries| {
            let snapshot = SnapshotRef {
                format: SNAPSHOT_FORMAT,
                version: SNAPSHOT_VERSION,
                entries: entries
                    .iter()
                    .map(|(call, record)| EntryRef { call, record })
                    .collect(),
            };
            let written = match format {
                SnapshotFormat::Compact => serde_json::to_writer(writer, &snapshot),
                SnapshotFormat::Pretty => serde_json::to_writer_pretty(writer, &snapshot),
            };
            written.map_err(write_error)
        })
    }

    /// Compact snapshot as bytes.
    pub fn to_bytes(&self) -> CacheResult<Vec<u8>> {
        let mut bytes = Vec::new();
        self.save(&mut bytes)?;
        Ok(bytes)
    }

    /// Writes a compact snapshot to a file, replacing its contents.
    pub fn save_to_path(&self, path: impl AsRef<Path>) -> CacheResult<()> {
        self.save_to_path_as(path, SnapshotFormat::Compact)
    }

    /// Writes a snapshot to a file, replacing its contents.
    ///
    /// The write is not atomic; an interrupted save leaves a truncated file.
    pub fn save_to_path_as(&self, path: impl AsRef<Path>, format: SnapshotFormat) -> CacheResult<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut writer = BufWriter::new(File::create(path)?);
        self.save_as(&mut writer, format)?;
        writer.flush()?;

        tracing::info!(path = %path.display(), entries = self.len(), "Cache store saved");
        Ok(())
    }
}
