//! # Storage Backend
//!
//! Whole-document reads and writes under the user config directory. Every write
//! goes to a temporary file in the destination directory and is then renamed over
//! the target, so a crash leaves either the old or the new document, never a
//! truncated one.

use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use std::fs;
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;
use walkdir::WalkDir;

use crate::constants::{
    BACKUPS_DIR, COMMANDS_FILENAME, FAVORITES_FILENAME, HISTORY_FILENAME, WIN_COMMANDS_FILENAME,
};

/// An I/O failure on a specific file.
#[derive(Error, Debug)]
#[error("I/O error on '{}': {source}", path.display())]
pub struct StorageError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

impl StorageError {
    pub fn new(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self {
            path: path.into(),
            source,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.source.kind() == ErrorKind::NotFound
    }
}

type StorageResult<T> = Result<T, StorageError>;

/// The documents owned by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Document {
    Commands,
    History,
    Favorites,
}

/// File layout of the config directory.
#[derive(Debug, Clone)]
pub struct Storage {
    root: PathBuf,
}

impl Storage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The command tree file name for the host OS.
    pub fn commands_file_name() -> &'static str {
        if cfg!(target_os = "windows") {
            WIN_COMMANDS_FILENAME
        } else {
            COMMANDS_FILENAME
        }
    }

    pub fn path_of(&self, document: Document) -> PathBuf {
        let name = match document {
            Document::Commands => Self::commands_file_name(),
            Document::History => HISTORY_FILENAME,
            Document::Favorites => FAVORITES_FILENAME,
        };
        self.root.join(name)
    }

    pub fn backups_dir(&self) -> PathBuf {
        self.root.join(BACKUPS_DIR)
    }

    pub fn exists(&self, document: Document) -> bool {
        self.path_of(document).is_file()
    }

    /// Reads a whole document. `Ok(None)` means the document does not exist yet.
    pub fn load(&self, document: Document) -> StorageResult<Option<Vec<u8>>> {
        let path = self.path_of(document);
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::new(path, e)),
        }
    }

    /// Replaces a whole document atomically.
    pub fn save(&self, document: Document, bytes: &[u8]) -> StorageResult<()> {
        write_atomic(&self.path_of(document), bytes)
    }

    /// Copies `src` over `dst` atomically. Returns the number of bytes copied.
    pub fn copy(&self, src: &Path, dst: &Path) -> StorageResult<u64> {
        let bytes = read_file(src)?;
        write_atomic(dst, &bytes)?;
        Ok(bytes.len() as u64)
    }

    /// Lists the files directly inside `dir` whose file name satisfies `predicate`.
    /// A missing directory lists as empty.
    pub fn list<F>(&self, dir: &Path, predicate: F) -> StorageResult<Vec<PathBuf>>
    where
        F: Fn(&str) -> bool,
    {
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut found = Vec::new();
        for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
            let entry = entry.map_err(|e| {
                let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| dir.to_path_buf());
                StorageError::new(path, e.into())
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            if entry.file_name().to_str().is_some_and(&predicate) {
                found.push(entry.into_path());
            }
        }
        Ok(found)
    }
}

/// Reads an arbitrary file (imports, backups).
pub fn read_file(path: &Path) -> StorageResult<Vec<u8>> {
    fs::read(path).map_err(|e| StorageError::new(path, e))
}

/// Writes `bytes` to `path` through a sibling temporary file and a rename.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> StorageResult<()> {
    let temp = stage(path, bytes)?;
    temp.persist(path)
        .map_err(|e| StorageError::new(path, e.error))?;
    Ok(())
}

/// Like `write_atomic`, but fails with `AlreadyExists` instead of replacing an
/// existing file. Used for snapshots, which are never overwritten.
pub fn write_new(path: &Path, bytes: &[u8]) -> StorageResult<()> {
    let temp = stage(path, bytes)?;
    temp.persist_noclobber(path)
        .map_err(|e| StorageError::new(path, e.error))?;
    Ok(())
}

fn stage(path: &Path, bytes: &[u8]) -> StorageResult<NamedTempFile> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&parent).map_err(|e| StorageError::new(&parent, e))?;

    let mut temp = NamedTempFile::new_in(&parent).map_err(|e| StorageError::new(&parent, e))?;
    temp.write_all(bytes)
        .and_then(|_| temp.as_file().sync_all())
        .map_err(|e| StorageError::new(path, e))?;
    Ok(temp)
}

/// Serializes `value` as pretty JSON with four-space indentation.
pub fn encode_pretty<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, serde_json::Error> {
    let mut out = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    value.serialize(&mut serializer)?;
    out.push(b'\n');
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_load_missing_document_is_none() {
        let dir = TempDir::new().unwrap();
        let storage = Storage::new(dir.path());
        assert!(storage.load(Document::History).unwrap().is_none());
        assert!(!storage.exists(Document::History));
    }

    #[test]
    fn test_save_then_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let storage = Storage::new(dir.path().join("nested"));
        storage.save(Document::Favorites, b"{}").unwrap();
        assert_eq!(storage.load(Document::Favorites).unwrap().unwrap(), b"{}");

        storage.save(Document::Favorites, b"{\"a\": 1}").unwrap();
        assert_eq!(storage.load(Document::Favorites).unwrap().unwrap(), b"{\"a\": 1}");
    }

    #[test]
    fn test_save_leaves_no_temp_files_behind() {
        let dir = TempDir::new().unwrap();
        let storage = Storage::new(dir.path());
        storage.save(Document::History, b"[]").unwrap();

        let files = storage.list(dir.path(), |_| true).unwrap();
        assert_eq!(files, vec![storage.path_of(Document::History)]);
    }

    #[test]
    fn test_write_new_refuses_to_overwrite() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("snap.json");
        write_new(&path, b"first").unwrap();

        let err = write_new(&path, b"second").unwrap_err();
        assert_eq!(err.source.kind(), ErrorKind::AlreadyExists);
        assert_eq!(fs::read(&path).unwrap(), b"first");
    }

    #[test]
    fn test_list_filters_by_name_and_ignores_dirs() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("commands_1.json"), "{}").unwrap();
        fs::write(dir.path().join("other.txt"), "").unwrap();
        fs::create_dir(dir.path().join("commands_dir.json")).unwrap();

        let storage = Storage::new(dir.path());
        let found = storage.list(dir.path(), |name| name.starts_with("commands_")).unwrap();
        assert_eq!(found, vec![dir.path().join("commands_1.json")]);

        assert!(storage.list(&dir.path().join("missing"), |_| true).unwrap().is_empty());
    }

    #[test]
    fn test_copy_is_byte_identical() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("a.json");
        let dst = dir.path().join("b.json");
        fs::write(&src, "{ \"x\":   1 }").unwrap();

        let storage = Storage::new(dir.path());
        assert_eq!(storage.copy(&src, &dst).unwrap(), 12);
        assert_eq!(fs::read(&dst).unwrap(), fs::read(&src).unwrap());
    }

    #[test]
    fn test_read_file_error_carries_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nope.json");
        let err = read_file(&path).unwrap_err();
        assert_eq!(err.path, path);
        assert!(err.is_not_found());
    }

    #[test]
    fn test_encode_pretty_uses_four_spaces() {
        let bytes = encode_pretty(&json!({ "a": { "b": 1 } })).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.contains("\n    \"a\": {\n        \"b\": 1"));
        assert!(text.ends_with('\n'));
    }
}
