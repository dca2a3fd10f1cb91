//! # Config Store
//!
//! The single owner of the command tree, the history and the favorites. Hosts
//! build one `ConfigStore` at startup, call [`ConfigStore::initialize`] once and
//! pass the store to whatever needs it.
//!
//! Each document has its own cache behind its own lock. A cache is only replaced
//! after the matching write succeeded, so a failed save leaves both the file and
//! the cache as they were. Every write of the command tree is preceded by a
//! snapshot of the previous file in `backups/`.
//!
//! When an operation needs more than one document it locks the command tree
//! first and the favorites second.

use serde::Serialize;
use serde_json::Value;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;

use crate::constants::{BACKUP_PREFIX, BACKUP_SUFFIX, BUNDLED_CONFIG_DIR, PATH_SEPARATOR};
use crate::core::catalog::{self, CatalogItem};
use crate::core::clock::{self, Clock, SystemClock};
use crate::core::icon_resolver::IconResolver;
use crate::core::migration::{self, MigrationReport};
use crate::core::paths::{self, PathError};
use crate::core::reference_resolver::{self, FavoriteStatus, Resolution, UnresolvedReference};
use crate::core::settings::{EngineSettings, SettingsError};
use crate::core::validator::{self, ValidationError};
use crate::models::{
    BackupInfo, CommandTree, FavoriteEntry, Favorites, HistoryEntry, Reference, ResolvedCommand,
    normalize_history, push_history,
};
use crate::system::storage::{self, Document, Storage, StorageError, encode_pretty};

/// Snapshots taken within the same second get a `_<n>` suffix, up to this many.
const MAX_BACKUPS_PER_SECOND: u32 = 1000;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Invalid JSON in '{}': {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to encode document: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("Import would replace existing groups: {}", names.join(", "))]
    Conflict { names: Vec<String> },

    #[error("Group '{0}' does not exist")]
    GroupNotFound(String),

    #[error("Cannot import '{}': {reason}", path.display())]
    InvalidImport { path: PathBuf, reason: String },

    #[error(transparent)]
    Unresolved(#[from] UnresolvedReference),

    #[error("No command tree exists at '{}' and no defaults could be installed", path.display())]
    DefaultsUnavailable { path: PathBuf },

    #[error(transparent)]
    Path(#[from] PathError),

    #[error(transparent)]
    Settings(#[from] SettingsError),
}

type StoreResult<T> = Result<T, StoreError>;

/// Outcome of the snapshot taken before a write of the command tree.
///
/// A failed snapshot never blocks the write it was protecting, but it is
/// reported so the host can warn about the gap in the undo history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackupStatus {
    Created(PathBuf),
    /// There was no live file yet.
    NothingToBackUp,
    Failed(String),
}

impl BackupStatus {
    pub fn is_gap(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// Result of a successful import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportReport {
    pub imported: Vec<String>,
    /// Subset of `imported` that replaced an existing group.
    pub replaced: Vec<String>,
    pub backup: BackupStatus,
}

#[derive(Debug)]
pub struct ConfigStore {
    storage: Storage,
    base_dir: PathBuf,
    clock: Arc<dyn Clock>,
    icons: IconResolver,
    commands: Mutex<Option<CommandTree>>,
    history: Mutex<Option<Vec<HistoryEntry>>>,
    favorites: Mutex<Option<Favorites>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ConfigStore {
    /// Builds a store over `config_dir`, taking defaults and resources from `base_dir`.
    pub fn new(config_dir: impl Into<PathBuf>, base_dir: impl Into<PathBuf>, icons: IconResolver) -> Self {
        Self {
            storage: Storage::new(config_dir),
            base_dir: base_dir.into(),
            clock: Arc::new(SystemClock),
            icons,
            commands: Mutex::new(None),
            history: Mutex::new(None),
            favorites: Mutex::new(None),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Builds a store whose icon resolver is configured from `settings.toml`.
    ///
    /// # Errors
    /// Fails when the settings file cannot be read, created or parsed.
    pub fn open(config_dir: &Path, base_dir: &Path) -> StoreResult<Self> {
        let settings = EngineSettings::load_or_create(config_dir)?;
        let icons = IconResolver::new(
            settings.icon_cache_dir()?,
            paths::resource_roots(base_dir),
            settings.default_icon(base_dir)?,
        )
        .with_timeout(settings.download_timeout());
        Ok(Self::new(config_dir, base_dir, icons))
    }

    /// Builds a store over the user config directory and the detected bundle root.
    ///
    /// # Errors
    /// Fails when the config directory cannot be located or created, or when
    /// `settings.toml` is unusable.
    pub fn open_default() -> StoreResult<Self> {
        let config_dir = paths::get_config_dir()?;
        let base_dir = paths::get_base_dir();
        log::debug!(
            "Opening store: config dir '{}', base dir '{}'",
            config_dir.display(),
            base_dir.display()
        );
        Self::open(&config_dir, &base_dir)
    }

    pub fn config_dir(&self) -> &Path {
        self.storage.root()
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn commands_path(&self) -> PathBuf {
        self.storage.path_of(Document::Commands)
    }

    pub fn backups_dir(&self) -> PathBuf {
        self.storage.backups_dir()
    }

    /// One-time startup step: moves favorites embedded in the command tree by old
    /// installations into the favorites document.
    ///
    /// # Errors
    /// Fails when the command tree cannot be loaded or a migrated document
    /// cannot be written.
    pub fn initialize(&self) -> StoreResult<Option<MigrationReport>> {
        let mut commands = lock(&self.commands);
        let mut tree = self.ensure_commands(&mut commands, false)?.clone();

        let mut favorites_cache = lock(&self.favorites);
        let mut favorites = self.ensure_favorites(&mut favorites_cache).clone();

        let Some(report) = migration::migrate_legacy_favorites(&mut tree, &mut favorites) else {
            return Ok(None);
        };

        // Favorites are persisted before the tree drops them.
        self.write_document(Document::Favorites, &favorites)?;
        *favorites_cache = Some(favorites);
        self.write_commands_locked(&mut commands, tree)?;

        log::info!(
            "Migrated {} legacy favorites ({} upgraded to references)",
            report.migrated.len(),
            report.upgraded.len()
        );
        Ok(Some(report))
    }

    // --- COMMAND TREE ---

    /// Returns the command tree, from the cache unless `refresh` is set.
    ///
    /// On first run the bundled defaults are installed (or the built-in tree if
    /// there is no bundle) and loading is retried once.
    ///
    /// # Errors
    /// I/O failures, malformed JSON, validation failures, and failure to
    /// install defaults are all surfaced.
    pub fn get_commands(&self, refresh: bool) -> StoreResult<CommandTree> {
        let mut cache = lock(&self.commands);
        self.ensure_commands(&mut cache, refresh).cloned()
    }

    /// Validates and writes `tree`, snapshotting the previous file first.
    ///
    /// # Errors
    /// A validation failure refuses the write before any I/O. A write failure
    /// leaves the previous file and cache in place.
    pub fn save_commands(&self, tree: &CommandTree) -> StoreResult<BackupStatus> {
        let mut cache = lock(&self.commands);
        self.write_commands_locked(&mut cache, tree.clone())
    }

    fn ensure_commands<'a>(
        &self,
        cache: &'a mut Option<CommandTree>,
        refresh: bool,
    ) -> StoreResult<&'a mut CommandTree> {
        let tree = match cache.take() {
            Some(tree) if !refresh => {
                log::debug!("Command tree cache hit");
                tree
            }
            previous => match self.read_commands() {
                Ok(tree) => tree,
                Err(e) => {
                    *cache = previous;
                    return Err(e);
                }
            },
        };
        Ok(cache.insert(tree))
    }

    fn read_commands(&self) -> StoreResult<CommandTree> {
        let path = self.commands_path();
        let bytes = match self.storage.load(Document::Commands)? {
            Some(bytes) => bytes,
            None => {
                self.install_defaults()?;
                self.storage
                    .load(Document::Commands)?
                    .ok_or_else(|| StoreError::DefaultsUnavailable { path: path.clone() })?
            }
        };

        let tree = decode_tree(&path, &bytes)?;
        log::info!("Loaded {} command groups from '{}'", tree.groups.len(), path.display());
        Ok(tree)
    }

    /// Installs the bundled command tree verbatim, or the built-in one.
    fn install_defaults(&self) -> StoreResult<()> {
        let live = self.commands_path();
        let bundled = self
            .base_dir
            .join(BUNDLED_CONFIG_DIR)
            .join(Storage::commands_file_name());

        if bundled.is_file() {
            self.storage.copy(&bundled, &live)?;
            log::info!("Installed bundled defaults from '{}'", bundled.display());
        } else {
            self.write_document(Document::Commands, &CommandTree::builtin_default())?;
            log::info!("Installed the built-in default command tree");
        }
        Ok(())
    }

    fn write_commands_locked(
        &self,
        cache: &mut Option<CommandTree>,
        tree: CommandTree,
    ) -> StoreResult<BackupStatus> {
        validator::validate_tree(&tree)?;
        let bytes = encode_pretty(&tree).map_err(StoreError::Encode)?;

        let backup = self.backup_status();
        self.storage.save(Document::Commands, &bytes)?;
        *cache = Some(tree);

        log::info!("Saved command tree to '{}'", self.commands_path().display());
        Ok(backup)
    }

    // --- BACKUPS ---

    /// Snapshots the live command tree file. `Ok(None)` when there is no live
    /// file yet.
    ///
    /// # Errors
    /// Fails when the live file cannot be read or the snapshot cannot be written.
    pub fn backup_commands(&self) -> StoreResult<Option<PathBuf>> {
        let _guard = lock(&self.commands);
        self.snapshot()
    }

    fn backup_status(&self) -> BackupStatus {
        match self.snapshot() {
            Ok(Some(path)) => BackupStatus::Created(path),
            Ok(None) => BackupStatus::NothingToBackUp,
            Err(e) => {
                log::warn!("Backup failed, continuing without it: {}", e);
                BackupStatus::Failed(e.to_string())
            }
        }
    }

    fn snapshot(&self) -> StoreResult<Option<PathBuf>> {
        let Some(bytes) = self.storage.load(Document::Commands)? else {
            log::debug!("No command tree on disk yet, nothing to back up");
            return Ok(None);
        };

        let dir = self.storage.backups_dir();
        let stamp = self.clock.backup_stamp();
        for sequence in 0..MAX_BACKUPS_PER_SECOND {
            let target = dir.join(backup_file_name(&stamp, sequence));
            match storage::write_new(&target, &bytes) {
                Ok(()) => {
                    log::info!("Backed up command tree to '{}'", target.display());
                    return Ok(Some(target));
                }
                Err(e) if e.source.kind() == ErrorKind::AlreadyExists && target.exists() => continue,
                Err(e) => return Err(e.into()),
            }
        }

        let exhausted = io::Error::new(
            ErrorKind::AlreadyExists,
            format!("too many backups taken at {}", stamp),
        );
        Err(StorageError::new(dir, exhausted).into())
    }

    /// All snapshots, newest first.
    ///
    /// # Errors
    /// Fails when the backups directory exists but cannot be read.
    pub fn list_backups(&self) -> StoreResult<Vec<BackupInfo>> {
        let dir = self.storage.backups_dir();
        let files = self
            .storage
            .list(&dir, |name| parse_backup_name(name).is_some())?;

        let mut backups: Vec<BackupInfo> = files
            .into_iter()
            .filter_map(|path| {
                let name = path.file_name()?.to_str()?;
                let (stamp, sequence) = parse_backup_name(name)?;
                let display_date = clock::display_stamp(&stamp).unwrap_or_else(|| stamp.clone());
                Some(BackupInfo {
                    path,
                    stamp,
                    sequence,
                    display_date,
                })
            })
            .collect();

        backups.sort_by(|a, b| (&b.stamp, b.sequence).cmp(&(&a.stamp, a.sequence)));
        Ok(backups)
    }

    /// Replaces the live command tree with the snapshot at `path`.
    ///
    /// The snapshot is validated first, and the current state is itself backed
    /// up before being replaced. The snapshot file is never modified.
    ///
    /// # Errors
    /// Fails when the snapshot cannot be read or is not a valid tree, or when
    /// the live file cannot be written.
    pub fn restore_from_backup(&self, path: &Path) -> StoreResult<BackupStatus> {
        let bytes = storage::read_file(path)?;
        decode_tree(path, &bytes)?;

        let mut cache = lock(&self.commands);
        let backup = self.backup_status();
        self.storage.save(Document::Commands, &bytes)?;
        *cache = None;

        log::info!("Restored command tree from '{}'", path.display());
        Ok(backup)
    }

    // --- IMPORT / EXPORT ---

    /// Writes `{name: <group>}` to `dest` as a standalone document.
    ///
    /// # Errors
    /// `GroupNotFound` when `name` is not a top-level group; I/O failures.
    pub fn export_group(&self, name: &str, dest: &Path) -> StoreResult<()> {
        let mut cache = lock(&self.commands);
        let tree = self.ensure_commands(&mut cache, false)?;
        let group = tree
            .get(name)
            .ok_or_else(|| StoreError::GroupNotFound(name.to_string()))?;

        let mut document = CommandTree::default();
        document.groups.insert(name.to_string(), group.clone());
        let bytes = encode_pretty(&document).map_err(StoreError::Encode)?;
        storage::write_atomic(dest, &bytes)?;

        log::info!("Exported group '{}' to '{}'", name, dest.display());
        Ok(())
    }

    /// Imports every top-level group of the document at `src`.
    ///
    /// Without `overwrite`, any name clash rejects the whole import. With it,
    /// incoming groups replace same-named groups wholesale. The result is
    /// written in a single save.
    ///
    /// # Errors
    /// `InvalidImport` for unreadable or malformed documents, `Conflict` with
    /// the clashing names, and any error of [`ConfigStore::save_commands`].
    pub fn import_group(&self, src: &Path, overwrite: bool) -> StoreResult<ImportReport> {
        let invalid = |reason: String| StoreError::InvalidImport {
            path: src.to_path_buf(),
            reason,
        };
        let bytes = storage::read_file(src)?;
        let raw: Value = serde_json::from_slice(&bytes).map_err(|e| invalid(e.to_string()))?;
        let incoming = validator::parse_tree(&raw).map_err(|e| invalid(e.to_string()))?;
        if incoming.is_empty() {
            return Err(invalid("the document has no groups".to_string()));
        }

        let mut cache = lock(&self.commands);
        let mut merged = self.ensure_commands(&mut cache, false)?.clone();

        let conflicts: Vec<String> = incoming
            .groups
            .keys()
            .filter(|name| merged.contains_group(name))
            .cloned()
            .collect();
        if !conflicts.is_empty() && !overwrite {
            return Err(StoreError::Conflict { names: conflicts });
        }

        let imported: Vec<String> = incoming.groups.keys().cloned().collect();
        for (name, group) in incoming.groups {
            merged.groups.insert(name, group);
        }
        let backup = self.write_commands_locked(&mut cache, merged)?;

        log::info!(
            "Imported {} groups from '{}' ({} replaced)",
            imported.len(),
            src.display(),
            conflicts.len()
        );
        Ok(ImportReport {
            imported,
            replaced: conflicts,
            backup,
        })
    }

    // --- HISTORY ---

    /// Most recent first, from the cache unless `refresh` is set. Unreadable
    /// history reads as empty.
    pub fn get_history(&self, refresh: bool) -> Vec<HistoryEntry> {
        let mut cache = lock(&self.history);
        if refresh {
            *cache = None;
        }
        self.ensure_history(&mut cache).clone()
    }

    /// # Errors
    /// Fails when the history document cannot be written.
    pub fn add_history(&self, entry: HistoryEntry) -> StoreResult<()> {
        let mut cache = lock(&self.history);
        let mut updated = self.ensure_history(&mut cache).clone();
        push_history(&mut updated, entry);
        self.write_document(Document::History, &updated)?;
        *cache = Some(updated);
        Ok(())
    }

    /// Records an execution of `resolved` under `title`, stamped with the
    /// current time.
    ///
    /// # Errors
    /// Fails when the history document cannot be written.
    pub fn record_execution(&self, title: &str, resolved: &ResolvedCommand) -> StoreResult<HistoryEntry> {
        let entry = resolved.to_history_entry(title, self.clock.iso_timestamp());
        self.add_history(entry.clone())?;
        Ok(entry)
    }

    /// # Errors
    /// Fails when the history document cannot be written.
    pub fn clear_history(&self) -> StoreResult<()> {
        let mut cache = lock(&self.history);
        let empty: Vec<HistoryEntry> = Vec::new();
        self.write_document(Document::History, &empty)?;
        *cache = Some(empty);
        Ok(())
    }

    fn ensure_history<'a>(&self, cache: &'a mut Option<Vec<HistoryEntry>>) -> &'a mut Vec<HistoryEntry> {
        cache.get_or_insert_with(|| self.read_history())
    }

    fn read_history(&self) -> Vec<HistoryEntry> {
        let bytes = match self.storage.load(Document::History) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return Vec::new(),
            Err(e) => {
                log::warn!("Could not read history, starting empty: {}", e);
                return Vec::new();
            }
        };
        match serde_json::from_slice::<Vec<HistoryEntry>>(&bytes) {
            Ok(history) => normalize_history(history),
            Err(e) => {
                log::warn!("History document is malformed, starting empty: {}", e);
                Vec::new()
            }
        }
    }

    // --- FAVORITES ---

    /// From the cache unless `refresh` is set. Unreadable favorites read as empty.
    pub fn get_favorites(&self, refresh: bool) -> Favorites {
        let mut cache = lock(&self.favorites);
        if refresh {
            *cache = None;
        }
        self.ensure_favorites(&mut cache).clone()
    }

    /// Adds (or replaces) a favorite pointing at the command at `path`.
    ///
    /// The label defaults to the last segment of the path. Returns the label used.
    ///
    /// # Errors
    /// `Unresolved` when `path` does not name a live command; nothing is written
    /// in that case.
    pub fn add_favorite(&self, path: &str, label: Option<&str>) -> StoreResult<String> {
        let mut commands = lock(&self.commands);
        let tree = self.ensure_commands(&mut commands, false)?;
        reference_resolver::resolve_reference(tree, path)?;

        let label = label
            .map(str::trim)
            .filter(|label| !label.is_empty())
            .or_else(|| path.rsplit(PATH_SEPARATOR).next())
            .unwrap_or(path)
            .to_string();

        let mut cache = lock(&self.favorites);
        let mut updated = self.ensure_favorites(&mut cache).clone();
        updated
            .entries
            .insert(label.clone(), FavoriteEntry::Reference(Reference::new(path)));
        self.write_document(Document::Favorites, &updated)?;
        *cache = Some(updated);

        log::info!("Added favorite '{}' -> {}", label, path);
        Ok(label)
    }

    /// Removes the favorite `label`. Returns whether it existed.
    ///
    /// # Errors
    /// Fails when the favorites document cannot be written.
    pub fn remove_favorite(&self, label: &str) -> StoreResult<bool> {
        let mut cache = lock(&self.favorites);
        let favorites = self.ensure_favorites(&mut cache);
        if !favorites.entries.contains_key(label) {
            return Ok(false);
        }

        let mut updated = favorites.clone();
        updated.entries.shift_remove(label);
        self.write_document(Document::Favorites, &updated)?;
        *cache = Some(updated);

        log::info!("Removed favorite '{}'", label);
        Ok(true)
    }

    /// Every favorite with its status against the live tree, in menu order.
    ///
    /// # Errors
    /// Fails when the command tree cannot be loaded.
    pub fn resolve_favorites(&self) -> StoreResult<Vec<(String, FavoriteStatus)>> {
        let mut commands = lock(&self.commands);
        let tree = self.ensure_commands(&mut commands, false)?;
        let mut cache = lock(&self.favorites);
        let favorites = self.ensure_favorites(&mut cache);

        Ok(favorites
            .entries
            .iter()
            .map(|(label, entry)| {
                let status = reference_resolver::resolve_favorite(tree, label, entry);
                (label.clone(), status)
            })
            .collect())
    }

    fn ensure_favorites<'a>(&self, cache: &'a mut Option<Favorites>) -> &'a mut Favorites {
        cache.get_or_insert_with(|| self.read_favorites())
    }

    fn read_favorites(&self) -> Favorites {
        let bytes = match self.storage.load(Document::Favorites) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return Favorites::default(),
            Err(e) => {
                log::warn!("Could not read favorites, starting empty: {}", e);
                return Favorites::default();
            }
        };
        match serde_json::from_slice::<Value>(&bytes) {
            Ok(raw) => Favorites::from_value(raw),
            Err(e) => {
                log::warn!("Favorites document is malformed, starting empty: {}", e);
                Favorites::default()
            }
        }
    }

    // --- LOOKUPS ---

    /// Resolves a dotted command path against the live tree.
    ///
    /// # Errors
    /// The outer error is a failure to load the tree; an unresolvable path is
    /// the inner `Err`.
    pub fn resolve_reference(&self, path: &str) -> StoreResult<Resolution> {
        let mut cache = lock(&self.commands);
        let tree = self.ensure_commands(&mut cache, false)?;
        Ok(reference_resolver::resolve_reference(tree, path))
    }

    /// Resolves an icon specifier to a local file. Never fails.
    pub fn resolve_icon(&self, spec: Option<&str>) -> PathBuf {
        self.icons.resolve(spec)
    }

    /// Every runnable command, flattened.
    ///
    /// # Errors
    /// Fails when the command tree cannot be loaded.
    pub fn catalog(&self) -> StoreResult<Vec<CatalogItem>> {
        let mut cache = lock(&self.commands);
        Ok(catalog::flatten(self.ensure_commands(&mut cache, false)?))
    }

    /// # Errors
    /// Fails when the command tree cannot be loaded.
    pub fn search_commands(&self, query: &str) -> StoreResult<Vec<CatalogItem>> {
        let mut cache = lock(&self.commands);
        Ok(catalog::search(self.ensure_commands(&mut cache, false)?, query))
    }

    fn write_document<T: Serialize + ?Sized>(&self, document: Document, value: &T) -> StoreResult<()> {
        let bytes = encode_pretty(value).map_err(StoreError::Encode)?;
        self.storage.save(document, &bytes)?;
        log::info!("Saved '{}'", self.storage.path_of(document).display());
        Ok(())
    }
}

fn decode_tree(path: &Path, bytes: &[u8]) -> StoreResult<CommandTree> {
    let raw: Value = serde_json::from_slice(bytes).map_err(|source| StoreError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(validator::parse_tree(&raw)?)
}

fn backup_file_name(stamp: &str, sequence: u32) -> String {
    if sequence == 0 {
        format!("{}{}{}", BACKUP_PREFIX, stamp, BACKUP_SUFFIX)
    } else {
        format!("{}{}_{}{}", BACKUP_PREFIX, stamp, sequence, BACKUP_SUFFIX)
    }
}

/// Splits `commands_<YYYYMMDD_HHMMSS>[_<n>].json` into stamp and sequence.
fn parse_backup_name(name: &str) -> Option<(String, u32)> {
    let rest = name.strip_prefix(BACKUP_PREFIX)?.strip_suffix(BACKUP_SUFFIX)?;
    let stamp = rest.get(..15)?;
    let well_formed = stamp
        .char_indices()
        .all(|(i, c)| if i == 8 { c == '_' } else { c.is_ascii_digit() });
    if !well_formed {
        return None;
    }

    let sequence = match rest.get(15..)? {
        "" => 0,
        tail => tail.strip_prefix('_')?.parse().ok()?,
    };
    Some((stamp.to_string(), sequence))
}
