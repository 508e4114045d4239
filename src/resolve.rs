use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
        mpsc,
    },
    time::{Duration, Instant},
};

use crate::{
    assets::{LogoFetcher, NaturalSize, natural_size},
    catalog::{LogoCatalog, LogoEntry},
    config::BarConfig,
    foundation::{
        core::check_positive,
        error::{CollabError, CollabResult},
    },
};

/// How often a waiting resolve re-checks its cancel flag.
const CANCEL_POLL: Duration = Duration::from_millis(20);

/// A logo whose display size is known.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct ResolvedLogoEntry {
    #[serde(flatten)]
    pub entry: LogoEntry,
    /// Display width: `height * natural.width / natural.height`.
    pub width: f64,
    /// Display height, always the configured target height.
    pub height: f64,
    pub natural: NaturalSize,
}

impl ResolvedLogoEntry {
    pub fn from_natural(
        entry: LogoEntry,
        natural: NaturalSize,
        target_height: f64,
    ) -> CollabResult<Self> {
        check_positive("target_height", target_height)?;
        check_positive("natural width", natural.width)?;
        check_positive("natural height", natural.height)?;
        Ok(Self {
            entry,
            width: target_height * natural.width / natural.height,
            height: target_height,
            natural,
        })
    }

    pub fn source(&self) -> &str {
        &self.entry.source
    }

    pub fn href(&self) -> &str {
        &self.entry.href
    }
}

/// A logo that was left out of the resolved set.
#[derive(Debug)]
pub struct LoadFailure {
    /// Position in the catalog.
    pub index: usize,
    pub error: CollabError,
}

/// Outcome of settling every logo load.
#[derive(Debug, Default)]
pub struct Resolution {
    /// Successfully measured logos, in catalog order.
    pub entries: Arc<[ResolvedLogoEntry]>,
    pub failures: Vec<LoadFailure>,
}

impl Resolution {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Loads every catalog image in parallel and measures it.
///
/// Each load is bounded by the configured timeout. Slow or broken logos are reported as
/// failures and left out; the remaining logos are published together.
pub struct DimensionResolver {
    fetcher: Arc<dyn LogoFetcher>,
    target_height: f64,
    timeout: Duration,
    cache: Mutex<HashMap<String, NaturalSize>>,
    fetch_count: Arc<AtomicUsize>,
}

impl std::fmt::Debug for DimensionResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DimensionResolver")
            .field("target_height", &self.target_height)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl DimensionResolver {
    pub fn new(fetcher: Arc<dyn LogoFetcher>, config: &BarConfig) -> Self {
        Self {
            fetcher,
            target_height: config.target_height,
            timeout: config.load_timeout(),
            cache: Mutex::new(HashMap::new()),
            fetch_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Number of fetches issued so far. Cached sources are not refetched.
    pub fn fetch_count(&self) -> usize {
        self.fetch_count.load(Ordering::Relaxed)
    }

    pub fn resolve(&self, catalog: &LogoCatalog) -> Resolution {
        self.resolve_until(catalog, &AtomicBool::new(false))
    }

    /// Like [`resolve`](Self::resolve), but stops waiting once `cancel` is set.
    ///
    /// Loads still in flight keep running on their worker threads; their results are discarded.
    #[tracing::instrument(skip(self, catalog, cancel), fields(logos = catalog.len()))]
    pub fn resolve_until(&self, catalog: &LogoCatalog, cancel: &AtomicBool) -> Resolution {
        let entries = catalog.entries();
        let deadline = Instant::now() + self.timeout;
        let mut slots: Vec<Option<CollabResult<NaturalSize>>> =
            (0..entries.len()).map(|_| None).collect();

        let (tx, rx) = mpsc::channel::<(usize, CollabResult<NaturalSize>)>();
        let mut pending = 0usize;
        {
            let cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
            for (i, entry) in entries.iter().enumerate() {
                if let Some(size) = cache.get(&entry.source) {
                    slots[i] = Some(Ok(*size));
                    continue;
                }
                match self.spawn_load(i, entry.source.clone(), tx.clone()) {
                    Ok(()) => pending += 1,
                    Err(e) => slots[i] = Some(Err(e)),
                }
            }
        }
        drop(tx);

        let mut cancelled = false;
        while pending > 0 {
            if cancel.load(Ordering::Acquire) {
                cancelled = true;
                break;
            }
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            match rx.recv_timeout((deadline - now).min(CANCEL_POLL)) {
                Ok((i, res)) => {
                    slots[i] = Some(res);
                    pending -= 1;
                }
                Err(mpsc::RecvTimeoutError::Timeout) => {}
                Err(mpsc::RecvTimeoutError::Disconnected) => break,
            }
        }

        self.settle(entries, slots, cancelled)
    }

    fn spawn_load(
        &self,
        index: usize,
        source: String,
        tx: mpsc::Sender<(usize, CollabResult<NaturalSize>)>,
    ) -> CollabResult<()> {
        let fetcher = Arc::clone(&self.fetcher);
        let fetch_count = Arc::clone(&self.fetch_count);
        let source_url = source.clone();
        std::thread::Builder::new()
            .name(format!("collabbar-load-{index}"))
            .spawn(move || {
                fetch_count.fetch_add(1, Ordering::Relaxed);
                let res = fetcher.fetch(&source).and_then(|bytes| {
                    natural_size(&bytes).map_err(|e| CollabError::image_load(&source, e.to_string()))
                });
                // The receiver is gone once the resolve timed out or was cancelled.
                let _ = tx.send((index, res));
            })
            .map(|_| ())
            .map_err(|e| spawn_failure(source_url, &e))
    }

    fn settle(
        &self,
        entries: &[LogoEntry],
        slots: Vec<Option<CollabResult<NaturalSize>>>,
        cancelled: bool,
    ) -> Resolution {
        let mut resolved = Vec::with_capacity(entries.len());
        let mut failures = Vec::new();
        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());

        for (index, (entry, slot)) in entries.iter().zip(slots).enumerate() {
            let outcome = match slot {
                Some(Ok(size)) => {
                    cache.insert(entry.source.clone(), size);
                    ResolvedLogoEntry::from_natural(entry.clone(), size, self.target_height)
                }
                Some(Err(e)) => Err(e),
                None if cancelled => Err(CollabError::Cancelled(entry.source.clone())),
                None => Err(CollabError::Timeout(entry.source.clone())),
            };
            match outcome {
                Ok(r) => resolved.push(r),
                Err(error) => {
                    tracing::warn!(index, source = %entry.source, %error, "logo excluded");
                    failures.push(LoadFailure { index, error });
                }
            }
        }

        tracing::info!(
            resolved = resolved.len(),
            failed = failures.len(),
            "logo dimensions settled"
        );
        Resolution {
            entries: resolved.into(),
            failures,
        }
    }
}

fn spawn_failure(source: String, err: &std::io::Error) -> CollabError {
    CollabError::image_load(source, format!("spawn loader thread: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spawn_failure_names_the_logo_source() {
        let err = spawn_failure(
            "logos/acme.svg".to_owned(),
            &std::io::Error::new(std::io::ErrorKind::OutOfMemory, "no threads left"),
        );
        match &err {
            CollabError::ImageLoad { source_url, reason } => {
                assert_eq!(source_url, "logos/acme.svg");
                assert!(reason.contains("no threads left"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.is_load_failure());
    }

    #[test]
    fn width_follows_natural_aspect_ratio() {
        let r = ResolvedLogoEntry::from_natural(
            LogoEntry::new("a.png", "https://a/"),
            NaturalSize {
                width: 400.0,
                height: 100.0,
            },
            36.0,
        )
        .unwrap();
        assert_eq!(r.height, 36.0);
        assert_eq!(r.width, 144.0);
        assert_eq!(r.source(), "a.png");
        assert_eq!(r.href(), "https://a/");
    }

    #[test]
    fn degenerate_natural_size_is_rejected() {
        let e = LogoEntry::new("a", "b");
        let zero = NaturalSize {
            width: 10.0,
            height: 0.0,
        };
        assert!(ResolvedLogoEntry::from_natural(e.clone(), zero, 36.0).is_err());
        let ok = NaturalSize {
            width: 10.0,
            height: 10.0,
        };
        assert!(ResolvedLogoEntry::from_natural(e, ok, 0.0).is_err());
    }

    #[test]
    fn resolved_entry_serializes_flat() {
        let r = ResolvedLogoEntry::from_natural(
            LogoEntry::new("a.png", "https://a/"),
            NaturalSize {
                width: 2.0,
                height: 1.0,
            },
            36.0,
        )
        .unwrap();
        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(v["source"], "a.png");
        assert_eq!(v["width"], 72.0);
    }
}
