// src/core/paths.rs

use crate::constants::{APP_DIR_NAME, BUNDLED_CONFIG_DIR, ICON_CACHE_DIR_NAME};
use lazy_static::lazy_static;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use thiserror::Error;

lazy_static! {
    static ref CMDTRAY_CONFIG_DIR: Mutex<Option<PathBuf>> = Mutex::new(None);
}

#[derive(Error, Debug)]
pub enum PathError {
    #[error("Could not find system config directory.")]
    ConfigDirNotFound,
    #[error("Could not create config directory at '{path}': {source}")]
    ConfigDirCreation {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to expand path '{template}': {reason}")]
    Expansion { template: String, reason: String },
}

/// Returns the user config directory (`~/.config/cmdtray`), creating it if needed.
///
/// Memoized: only the first call touches the file system.
pub fn get_config_dir() -> Result<PathBuf, PathError> {
    let mut cached = CMDTRAY_CONFIG_DIR
        .lock()
        .unwrap_or_else(PoisonError::into_inner);

    if let Some(path) = &*cached {
        return Ok(path.clone());
    }

    let config_path = dirs::config_dir()
        .ok_or(PathError::ConfigDirNotFound)?
        .join(APP_DIR_NAME);
    ensure_dir(&config_path)?;

    *cached = Some(config_path.clone());
    Ok(config_path)
}

/// Creates `path` (and its parents) if it does not exist yet.
pub fn ensure_dir(path: &Path) -> Result<(), PathError> {
    if path.is_dir() {
        return Ok(());
    }
    fs::create_dir_all(path).map_err(|e| PathError::ConfigDirCreation {
        path: path.display().to_string(),
        source: e,
    })
}

/// Directory holding the running executable, canonicalized.
pub fn executable_dir() -> Option<PathBuf> {
    let exe = env::current_exe().ok()?;
    let exe = dunce::canonicalize(&exe).unwrap_or(exe);
    exe.parent().map(Path::to_path_buf)
}

/// Root of the source tree the crate was built from.
pub fn source_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
}

/// The bundle root: where default documents and resources ship.
///
/// A packaged install keeps `config/` or `resources/` next to the executable;
/// a development build falls back to the source tree.
pub fn get_base_dir() -> PathBuf {
    executable_dir()
        .filter(|dir| is_bundle_root(dir))
        .unwrap_or_else(source_dir)
}

fn is_bundle_root(dir: &Path) -> bool {
    dir.join(BUNDLED_CONFIG_DIR).is_dir() || dir.join("resources").is_dir()
}

/// Roots probed for relative icon specifiers, in order: the bundle, the
/// executable directory, the source tree. Duplicates are dropped.
pub fn resource_roots(base: &Path) -> Vec<PathBuf> {
    let mut roots = vec![base.to_path_buf()];
    for candidate in executable_dir().into_iter().chain([source_dir()]) {
        if !roots.contains(&candidate) {
            roots.push(candidate);
        }
    }
    roots
}

/// Default shared cache directory for decoded and downloaded icons.
pub fn default_icon_cache_dir() -> PathBuf {
    env::temp_dir().join(ICON_CACHE_DIR_NAME)
}

/// Expands `~` and environment variables in a user-supplied path.
///
/// # Errors
/// Returns `PathError::Expansion` when a referenced variable is not set.
pub fn expand_path(template: &str) -> Result<PathBuf, PathError> {
    let expanded = shellexpand::full(template).map_err(|e| PathError::Expansion {
        template: template.to_string(),
        reason: e.to_string(),
    })?;
    Ok(PathBuf::from(expanded.into_owned()))
}

/// Expands only a leading `~`. Never fails: unknown homes leave the text as is.
pub fn expand_tilde(spec: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(spec).into_owned())
}
