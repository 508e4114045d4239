use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::Context as _;

use crate::foundation::error::{CollabError, CollabResult};

/// Source of raw logo bytes.
///
/// Implementations are called from worker threads, one call per logo, in no particular order.
pub trait LogoFetcher: Send + Sync {
    fn fetch(&self, source: &str) -> CollabResult<Vec<u8>>;
}

/// Reads logos from files below a root directory.
#[derive(Clone, Debug)]
pub struct FsFetcher {
    root: PathBuf,
}

impl FsFetcher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl LogoFetcher for FsFetcher {
    fn fetch(&self, source: &str) -> CollabResult<Vec<u8>> {
        if is_remote(source) {
            return Err(CollabError::image_load(
                source,
                "remote sources need the `http` feature",
            ));
        }
        let norm = normalize_rel_path(source)?;
        let path = self.root.join(Path::new(&norm));
        std::fs::read(&path)
            .with_context(|| format!("read logo bytes from '{}'", path.display()))
            .map_err(|e| CollabError::image_load(source, format!("{e:#}")))
    }
}

/// Return `true` for `http://` and `https://` sources.
pub fn is_remote(source: &str) -> bool {
    let lower = source.trim_start().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Normalize and validate catalog-relative logo paths.
///
/// The result uses `/` separators, drops `.` segments, and rejects absolute paths or parent
/// traversals (`..`).
pub fn normalize_rel_path(source: &str) -> CollabResult<String> {
    let s = source.replace('\\', "/");
    if s.is_empty() {
        return Err(CollabError::validation("logo path must be non-empty"));
    }
    if s.starts_with('/') {
        return Err(CollabError::validation("logo paths must be relative"));
    }

    let mut out = Vec::<&str>::new();
    for part in s.split('/') {
        if part.is_empty() || part == "." {
            continue;
        }
        if part == ".." {
            return Err(CollabError::validation("logo paths must not contain '..'"));
        }
        out.push(part);
    }

    if out.is_empty() {
        return Err(CollabError::validation("logo path must contain a file name"));
    }

    Ok(out.join("/"))
}

#[derive(Clone, Debug)]
enum MemoryItem {
    Bytes(Vec<u8>),
    Fail(String),
}

/// In-memory fetcher with optional per-source latency.
#[derive(Clone, Debug, Default)]
pub struct MemoryFetcher {
    items: HashMap<String, (MemoryItem, Duration)>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bytes(mut self, source: impl Into<String>, bytes: Vec<u8>) -> Self {
        self.items
            .insert(source.into(), (MemoryItem::Bytes(bytes), Duration::ZERO));
        self
    }

    pub fn with_failure(mut self, source: impl Into<String>, reason: impl Into<String>) -> Self {
        self.items.insert(
            source.into(),
            (MemoryItem::Fail(reason.into()), Duration::ZERO),
        );
        self
    }

    /// Delay every fetch of `source` by `delay` before answering.
    pub fn with_delay(mut self, source: &str, delay: Duration) -> Self {
        if let Some(item) = self.items.get_mut(source) {
            item.1 = delay;
        }
        self
    }
}

impl LogoFetcher for MemoryFetcher {
    fn fetch(&self, source: &str) -> CollabResult<Vec<u8>> {
        let Some((item, delay)) = self.items.get(source) else {
            return Err(CollabError::image_load(source, "not found"));
        };
        if !delay.is_zero() {
            std::thread::sleep(*delay);
        }
        match item {
            MemoryItem::Bytes(b) => Ok(b.clone()),
            MemoryItem::Fail(reason) => Err(CollabError::image_load(source, reason.clone())),
        }
    }
}

/// Fetches remote logos over HTTP(S); relative sources fall back to the filesystem.
#[cfg(feature = "http")]
#[derive(Debug)]
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
    local: FsFetcher,
}

#[cfg(feature = "http")]
impl HttpFetcher {
    pub fn new(local_root: impl Into<PathBuf>, timeout: Duration) -> CollabResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("collabbar/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("build http client")?;
        Ok(Self {
            client,
            local: FsFetcher::new(local_root),
        })
    }
}

#[cfg(feature = "http")]
impl LogoFetcher for HttpFetcher {
    fn fetch(&self, source: &str) -> CollabResult<Vec<u8>> {
        if !is_remote(source) {
            return self.local.fetch(source);
        }
        let resp = self
            .client
            .get(source)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| CollabError::image_load(source, e.to_string()))?;
        let bytes = resp
            .bytes()
            .map_err(|e| CollabError::image_load(source, e.to_string()))?;
        Ok(bytes.to_vec())
    }
}
