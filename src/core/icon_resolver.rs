//! # Icon Resolver
//!
//! Turns an icon specifier from the command tree into a file on disk. A specifier
//! can be empty, an inline `data:image/<ext>;base64,` URI, an `http(s)` URL, an
//! absolute or `~` path, or a path relative to the bundled resources.
//!
//! Resolution never fails outward: anything that cannot be resolved degrades to
//! the default icon. Decoded and downloaded icons are written to a shared cache
//! directory under a name derived from the MD5 of the specifier, so the same
//! specifier is decoded or downloaded at most once.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use url::Url;

use crate::constants::{ICON_DOWNLOAD_TIMEOUT_SECS, RESOURCE_SUBDIRS};
use crate::core::paths;
use crate::system::downloader::{HttpFetcher, IconFetcher};
use crate::system::storage;

lazy_static! {
    // `None` only if the literal pattern were invalid; data URIs then fall through
    // to the local path branch and degrade to the default icon.
    static ref DATA_URI_RE: Option<Regex> =
        Regex::new(r"(?s)^data:image/([A-Za-z0-9.+-]+);base64,(.*)$").ok();
}

const DEFAULT_REMOTE_EXTENSION: &str = "png";

/// What kind of specifier we are looking at.
#[derive(Debug, PartialEq, Eq)]
enum IconSource<'a> {
    Empty,
    Data { ext: String, payload: &'a str },
    Remote { ext: String },
    Local(PathBuf),
}

fn classify(spec: &str) -> IconSource<'_> {
    let trimmed = spec.trim();
    if trimmed.is_empty() {
        return IconSource::Empty;
    }

    if let Some(caps) = DATA_URI_RE.as_ref().and_then(|re| re.captures(trimmed)) {
        let subtype = caps.get(1).map_or("", |m| m.as_str());
        let payload = caps.get(2).map_or("", |m| m.as_str());
        // `svg+xml` is stored as `.svg`.
        let ext = subtype.split('+').next().unwrap_or(subtype).to_ascii_lowercase();
        return IconSource::Data { ext, payload };
    }

    let lower = trimmed.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        return IconSource::Remote {
            ext: remote_extension(trimmed),
        };
    }

    IconSource::Local(paths::expand_tilde(trimmed))
}

/// Extension taken from the last segment of the URL path, `png` if none usable.
fn remote_extension(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|parsed| {
            let last = parsed.path_segments()?.next_back()?.to_string();
            let ext = Path::new(&last).extension()?.to_str()?.to_ascii_lowercase();
            let usable = !ext.is_empty()
                && ext.len() <= 5
                && ext.chars().all(|c| c.is_ascii_alphanumeric());
            usable.then_some(ext)
        })
        .unwrap_or_else(|| DEFAULT_REMOTE_EXTENSION.to_string())
}

fn cache_key(spec: &str) -> String {
    hex::encode(md5::compute(spec.as_bytes()).0)
}

#[derive(Debug)]
pub struct IconResolver {
    cache_dir: PathBuf,
    search_roots: Vec<PathBuf>,
    default_icon: PathBuf,
    timeout: Duration,
    fetcher: Box<dyn IconFetcher>,
    /// Specifier -> cached file, for decoded and downloaded icons. `None`
    /// records a specifier that could not be obtained.
    memo: Mutex<HashMap<String, Option<PathBuf>>>,
}

impl IconResolver {
    /// # Arguments
    /// * `cache_dir` - Where decoded/downloaded icons are stored.
    /// * `search_roots` - Roots probed (under `resources/icons`, then `resources`)
    ///   for relative specifiers, in order.
    /// * `default_icon` - Returned whenever nothing else resolves.
    pub fn new(cache_dir: PathBuf, search_roots: Vec<PathBuf>, default_icon: PathBuf) -> Self {
        Self {
            cache_dir,
            search_roots,
            default_icon,
            timeout: Duration::from_secs(ICON_DOWNLOAD_TIMEOUT_SECS),
            fetcher: Box::new(HttpFetcher),
            memo: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_fetcher(mut self, fetcher: Box<dyn IconFetcher>) -> Self {
        self.fetcher = fetcher;
        self
    }

    /// Sets the download timeout. It can only be shortened, never raised past
    /// the hard limit.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout.min(Duration::from_secs(ICON_DOWNLOAD_TIMEOUT_SECS));
        self
    }

    pub fn default_icon(&self) -> &Path {
        &self.default_icon
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Resolves `spec` to a local file. Always returns a path.
    pub fn resolve(&self, spec: Option<&str>) -> PathBuf {
        let Some(spec) = spec else {
            return self.default_icon.clone();
        };

        match classify(spec) {
            IconSource::Empty => self.default_icon.clone(),
            IconSource::Data { ext, payload } => {
                self.cached(spec, &ext, || STANDARD.decode(payload.trim()).map_err(|e| e.to_string()))
            }
            IconSource::Remote { ext } => {
                let url = spec.trim();
                self.cached(url, &ext, || {
                    self.fetcher.fetch(url, self.timeout).map_err(|e| e.to_string())
                })
            }
            IconSource::Local(path) => self.resolve_local(spec, &path),
        }
    }

    /// Returns the cache file for `key`, producing it with `produce` only when it
    /// is neither memoized nor already on disk. A failure is memoized too, so a
    /// dead URL or bad payload is tried once per resolver.
    ///
    /// The memo lock is not held while `produce` runs.
    fn cached<F>(&self, key: &str, ext: &str, produce: F) -> PathBuf
    where
        F: FnOnce() -> Result<Vec<u8>, String>,
    {
        match self.lock_memo().get(key) {
            Some(Some(path)) if path.is_file() => {
                log::debug!("Icon memo hit: {}", path.display());
                return path.clone();
            }
            Some(None) => {
                log::debug!("Icon '{}' failed earlier, using the default icon", preview(key));
                return self.default_icon.clone();
            }
            _ => {}
        }

        let target = self.cache_dir.join(format!("{}.{}", cache_key(key), ext));
        if target.is_file() {
            log::debug!("Reusing cached icon {}", target.display());
            self.lock_memo().insert(key.to_string(), Some(target.clone()));
            return target;
        }

        let outcome = match produce() {
            Ok(bytes) => match storage::write_atomic(&target, &bytes) {
                Ok(()) => {
                    log::debug!("Cached icon at {}", target.display());
                    Some(target)
                }
                Err(e) => {
                    log::warn!("Could not cache icon: {}. Using the default icon.", e);
                    None
                }
            },
            Err(reason) => {
                log::warn!(
                    "Could not obtain icon '{}': {}. Using the default icon.",
                    preview(key),
                    reason
                );
                None
            }
        };

        self.lock_memo().insert(key.to_string(), outcome.clone());
        outcome.unwrap_or_else(|| self.default_icon.clone())
    }

    fn lock_memo(&self) -> MutexGuard<'_, HashMap<String, Option<PathBuf>>> {
        self.memo.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn resolve_local(&self, spec: &str, path: &Path) -> PathBuf {
        if path.is_absolute() {
            if path.exists() {
                return path.to_path_buf();
            }
            log::warn!("Icon '{}' does not exist. Using the default icon.", spec);
            return self.default_icon.clone();
        }

        for root in &self.search_roots {
            for sub in RESOURCE_SUBDIRS {
                let candidate = root.join(sub).join(path);
                log::debug!("Probing icon path {}", candidate.display());
                if candidate.exists() {
                    return candidate;
                }
            }
        }

        log::warn!("Icon '{}' not found in any resource directory. Using the default icon.", spec);
        self.default_icon.clone()
    }
}

/// Data URIs can be huge; only log their head.
fn preview(spec: &str) -> String {
    const MAX: usize = 48;
    match spec.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", spec.get(..idx).unwrap_or(spec)),
        None => spec.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::downloader::FetchError;
    use std::fs;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    #[derive(Debug, Default)]
    struct CountingFetcher {
        calls: Arc<AtomicUsize>,
        fail: bool,
    }

    impl IconFetcher for CountingFetcher {
        fn fetch(&self, url: &str, _timeout: Duration) -> Result<Vec<u8>, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(FetchError::Timeout {
                    url: url.to_string(),
                });
            }
            Ok(b"PNGDATA".to_vec())
        }
    }

    struct Fixture {
        _dir: TempDir,
        root: PathBuf,
        resolver: IconResolver,
        calls: Arc<AtomicUsize>,
    }

    fn fixture(fail: bool) -> Fixture {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("bundle");
        fs::create_dir_all(root.join("resources/icons")).unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let fetcher = CountingFetcher {
            calls: Arc::clone(&calls),
            fail,
        };
        let resolver = IconResolver::new(
            dir.path().join("cache"),
            vec![root.clone()],
            root.join("resources/icons/icon.png"),
        )
        .with_fetcher(Box::new(fetcher));
        Fixture {
            _dir: dir,
            root,
            resolver,
            calls,
        }
    }

    #[test]
    fn test_empty_and_absent_give_default() {
        let f = fixture(false);
        assert_eq!(f.resolver.resolve(None), f.resolver.default_icon());
        assert_eq!(f.resolver.resolve(Some("   ")), f.resolver.default_icon());
    }

    #[test]
    fn test_data_uri_is_decoded_once() {
        let f = fixture(false);
        let spec = format!("data:image/svg+xml;base64,{}", STANDARD.encode("<svg/>"));

        let first = f.resolver.resolve(Some(&spec));
        assert_eq!(first.extension().unwrap(), "svg");
        assert_eq!(first.file_stem().unwrap().to_str().unwrap(), cache_key(&spec));
        assert_eq!(fs::read(&first).unwrap(), b"<svg/>");

        let second = f.resolver.resolve(Some(&spec));
        assert_eq!(first, second);
    }

    #[test]
    fn test_bad_base64_gives_default() {
        let f = fixture(false);
        let path = f.resolver.resolve(Some("data:image/png;base64,!!!not base64!!!"));
        assert_eq!(path, f.resolver.default_icon());
    }

    #[test]
    fn test_url_downloaded_at_most_once() {
        let f = fixture(false);
        let url = "https://example.com/assets/logo.JPG?size=32";

        let first = f.resolver.resolve(Some(url));
        let second = f.resolver.resolve(Some(url));
        assert_eq!(first, second);
        assert_eq!(first.extension().unwrap(), "jpg");
        assert_eq!(f.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_url_cache_survives_new_resolver() {
        let f = fixture(false);
        let url = "http://example.com/icon";
        let first = f.resolver.resolve(Some(url));
        assert_eq!(first.extension().unwrap(), "png");

        let calls = Arc::new(AtomicUsize::new(0));
        let fresh = IconResolver::new(
            f.resolver.cache_dir().to_path_buf(),
            vec![],
            PathBuf::from("/default.png"),
        )
        .with_fetcher(Box::new(CountingFetcher {
            calls: Arc::clone(&calls),
            fail: false,
        }));
        assert_eq!(fresh.resolve(Some(url)), first);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_failed_download_gives_default() {
        let f = fixture(true);
        let path = f.resolver.resolve(Some("https://example.com/a.png"));
        assert_eq!(path, f.resolver.default_icon());
    }

    #[test]
    fn test_failed_download_is_not_retried() {
        let f = fixture(true);
        let url = "https://dead.example/a.png";
        for _ in 0..3 {
            assert_eq!(f.resolver.resolve(Some(url)), f.resolver.default_icon());
        }
        assert_eq!(f.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_memo_is_free_while_downloading() {
        #[derive(Debug)]
        struct ReentrantFetcher {
            peer: Arc<Mutex<Option<Arc<IconResolver>>>>,
            local: PathBuf,
        }

        impl IconFetcher for ReentrantFetcher {
            fn fetch(&self, _url: &str, _timeout: Duration) -> Result<Vec<u8>, FetchError> {
                // Resolving from inside a download would deadlock if the memo were held.
                let peer = self.peer.lock().unwrap().clone().unwrap();
                let spec = format!("data:image/png;base64,{}", STANDARD.encode("inner"));
                assert_ne!(peer.resolve(Some(&spec)), peer.default_icon());
                assert_eq!(peer.resolve(Some(self.local.to_str().unwrap())), self.local);
                Ok(b"outer".to_vec())
            }
        }

        let dir = TempDir::new().unwrap();
        let local = dir.path().join("local.png");
        fs::write(&local, "x").unwrap();
        let peer = Arc::new(Mutex::new(None));
        let resolver = Arc::new(
            IconResolver::new(dir.path().join("cache"), vec![], dir.path().join("default.png"))
                .with_fetcher(Box::new(ReentrantFetcher {
                    peer: Arc::clone(&peer),
                    local,
                })),
        );
        *peer.lock().unwrap() = Some(Arc::clone(&resolver));

        let path = resolver.resolve(Some("https://example.com/outer.png"));
        assert_eq!(fs::read(path).unwrap(), b"outer");
        // Break the cycle.
        peer.lock().unwrap().take();
    }

    #[test]
    fn test_bad_data_uri_is_decoded_once() {
        let f = fixture(false);
        let spec = "data:image/png;base64,!!!";
        assert_eq!(f.resolver.resolve(Some(spec)), f.resolver.default_icon());
        // The failure is remembered: the memo entry is `None`.
        assert_eq!(f.resolver.lock_memo().get(spec), Some(&None));
    }

    #[test]
    fn test_absolute_path_returned_when_present() {
        let f = fixture(false);
        let icon = f.root.join("custom.png");
        fs::write(&icon, "x").unwrap();
        assert_eq!(f.resolver.resolve(Some(icon.to_str().unwrap())), icon);

        let missing = f.root.join("missing.png");
        assert_eq!(
            f.resolver.resolve(Some(missing.to_str().unwrap())),
            f.resolver.default_icon()
        );
    }

    #[test]
    fn test_relative_prefers_icons_over_resources() {
        let f = fixture(false);
        fs::write(f.root.join("resources/term.png"), "r").unwrap();
        assert_eq!(
            f.resolver.resolve(Some("term.png")),
            f.root.join("resources/term.png")
        );

        fs::write(f.root.join("resources/icons/term.png"), "i").unwrap();
        assert_eq!(
            f.resolver.resolve(Some("term.png")),
            f.root.join("resources/icons/term.png")
        );

        assert_eq!(f.resolver.resolve(Some("nope.png")), f.resolver.default_icon());
    }

    #[test]
    fn test_classify_shapes() {
        assert_eq!(classify(""), IconSource::Empty);
        assert!(matches!(classify("data:image/png;base64,AAAA"), IconSource::Data { ref ext, .. } if ext == "png"));
        assert!(matches!(classify("HTTPS://x.org/a.ico"), IconSource::Remote { ref ext } if ext == "ico"));
        assert!(matches!(classify("icons/a.png"), IconSource::Local(_)));
    }

    #[test]
    fn test_preview_truncates_long_specs() {
        let long = "a".repeat(100);
        assert_eq!(preview(&long).len(), 51);
        assert_eq!(preview("short"), "short");
    }
}
