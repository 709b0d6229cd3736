//! Implementation of the oncecall CLI commands.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use crate::cache::{CacheStore, Outcome, SnapshotFormat};
use crate::types::config::Config;
use crate::{CacheError, CacheResult};

/// Resolves the snapshot a command works on.
fn store_path(file: Option<PathBuf>, config: &Config) -> PathBuf {
    file.unwrap_or_else(|| config.store.path.clone())
}

/// Initializes configuration and an empty store in the specified directory.
pub fn init(path: Option<PathBuf>) -> CacheResult<()> {
    let target_dir = path.unwrap_or_else(|| PathBuf::from("."));

    if !target_dir.exists() {
        std::fs::create_dir_all(&target_dir)?;
        tracing::info!("Directory created: {}", target_dir.display());
    }

    let config_path = target_dir.join("oncecall.toml");

    if config_path.exists() {
        println!("Configuration already exists at: {}", config_path.display());
        return Ok(());
    }

    let config = Config::default_config();
    config.save(&config_path)?;

    let store_path = target_dir.join(&config.store.path);
    if !store_path.exists() {
        CacheStore::new().save_to_path_as(&store_path, config.store.format)?;
    }

    ignore_store(&target_dir, &config.store.path)?;

    println!("oncecall initialized successfully!");
    println!("Configuration created at: {}", config_path.display());
    println!("Store: {}", store_path.display());

    Ok(())
}

/// `.gitignore` line covering a store path relative to the project root:
/// its top-level directory, or the file itself when it has none. `None` for
/// paths outside the project.
fn ignore_pattern(store_path: &Path) -> Option<String> {
    let mut parts = store_path
        .components()
        .skip_while(|c| matches!(c, Component::CurDir));
    let first = match parts.next()? {
        Component::Normal(name) => name.to_str()?,
        _ => return None,
    };
    Some(match parts.next() {
        Some(_) => format!("{first}/"),
        None => first.to_string(),
    })
}

/// Keeps the configured store out of version control. Returns whether
/// `.gitignore` was changed.
fn ignore_store(target_dir: &Path, store_path: &Path) -> CacheResult<bool> {
    let Some(pattern) = ignore_pattern(store_path) else {
        tracing::debug!(
            path = %store_path.display(),
            "Store lies outside the project, .gitignore untouched"
        );
        return Ok(false);
    };

    let gitignore = target_dir.join(".gitignore");
    let existing = match std::fs::read_to_string(&gitignore) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => String::new(),
        Err(e) => return Err(e.into()),
    };

    let bare = pattern.trim_end_matches('/');
    if existing.lines().map(str::trim).any(|line| line == pattern || line == bare) {
        tracing::debug!(pattern = %pattern, ".gitignore already covers the store");
        return Ok(false);
    }

    let mut updated = existing.trim_end().to_string();
    if !updated.is_empty() {
        updated.push_str("\n\n");
    }
    updated.push_str(&format!("# oncecall store\n{pattern}\n"));
    std::fs::write(&gitignore, updated)?;

    println!("Added {} to {}", pattern, gitignore.display());
    Ok(true)
}

/// Lists the entries of a store.
pub fn inspect(
    file: Option<PathBuf>,
    function: Option<&str>,
    limit: usize,
    config: &Config,
) -> CacheResult<()> {
    let path = store_path(file, config);
    let store = CacheStore::load_from_path(&path, false)?;

    let entries: Vec<_> = store
        .entries()
        .into_iter()
        .filter(|(key, _)| function.map_or(true, |f| key.function().contains(f)))
        .collect();

    println!("{} - {} entries", path.display(), entries.len());
    println!();

    for (key, record) in entries.iter().take(limit) {
        let fingerprint = key.fingerprint();
        match &record.outcome {
            Outcome::Value(value) => {
                println!("  ✓ [{}] {} -> {}", &fingerprint[..12], key, value);
            }
            Outcome::Error(error) => {
                println!("  ✗ [{}] {} raised {}", &fingerprint[..12], key, error);
            }
        }
        println!("      recorded: {}", record.recorded_at.to_rfc3339());
    }

    if entries.len() > limit {
        println!();
        println!("  ... {} more (use --limit)", entries.len() - limit);
    }

    Ok(())
}

/// Per-function entry counts.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FunctionCounts {
    pub values: usize,
    pub errors: usize,
}

/// Groups the entries of a store by function.
pub fn count_by_function(store: &CacheStore) -> BTreeMap<String, FunctionCounts> {
    let mut counts: BTreeMap<String, FunctionCounts> = BTreeMap::new();
    for (key, record) in store.entries() {
        let entry = counts.entry(key.function().to_string()).or_default();
        if record.is_error() {
            entry.errors += 1;
        } else {
            entry.values += 1;
        }
    }
    counts
}

/// Shows entry counts per function.
pub fn stats(file: Option<PathBuf>, config: &Config) -> CacheResult<()> {
    let path = store_path(file, config);
    let store = CacheStore::load_from_path(&path, false)?;
    let stats = store.stats();

    println!("Store: {}", path.display());
    println!("Entries: {}", stats.entries);
    println!("  values: {}", stats.values);
    println!("  errors: {}", stats.errors);

    let counts = count_by_function(&store);
    if !counts.is_empty() {
        println!();
        println!("By function:");
        for (function, c) in &counts {
            println!("  {}: {} values, {} errors", function, c.values, c.errors);
        }
    }

    Ok(())
}

/// Verifies that a snapshot exists and can be loaded.
pub fn check(file: Option<PathBuf>, config: &Config) -> CacheResult<()> {
    let path = store_path(file, config);

    match CacheStore::load_from_path(&path, false) {
        Ok(store) => {
            println!("✓ {} is valid ({} entries)", path.display(), store.len());
            Ok(())
        }
        Err(e) => {
            println!("✗ {}: {}", path.display(), e);
            Err(e)
        }
    }
}

/// Loads a snapshot and writes it back in the configured or requested format.
pub fn rewrite(file: Option<PathBuf>, pretty: bool, config: &Config) -> CacheResult<()> {
    let path = store_path(file, config);
    let store = CacheStore::load_from_path(&path, false)?;

    let format = if pretty {
        SnapshotFormat::Pretty
    } else {
        config.store.format
    };
    store.save_to_path_as(&path, format)?;

    println!(
        "Rewrote {} ({} entries, {:?})",
        path.display(),
        store.len(),
        format
    );
    Ok(())
}

/// Shows version.
pub fn version() {
    println!("oncecall {}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("Call-result cache with persistent snapshots");
}

/// Exit code for a failed command.
pub fn exit_code(err: &CacheError) -> i32 {
    match err {
        CacheError::NotFound(_) => 2,
        CacheError::Deserialization(_) => 3,
        _ => 1,
    }
}
