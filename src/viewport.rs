use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex, mpsc},
};

use crate::foundation::{core::check_non_negative, error::CollabResult};

#[derive(Debug)]
struct Inner {
    width: f64,
    next_id: u64,
    subscribers: BTreeMap<u64, mpsc::Sender<f64>>,
}

/// Explicit source of the viewport width.
///
/// The host pushes widths with [`set_width`](Self::set_width); components hold a
/// [`ViewportSubscription`] and are unsubscribed when it drops.
#[derive(Clone, Debug)]
pub struct ViewportBus {
    inner: Arc<Mutex<Inner>>,
}

impl ViewportBus {
    pub fn new(width: f64) -> CollabResult<Self> {
        check_non_negative("viewport width", width)?;
        Ok(Self {
            inner: Arc::new(Mutex::new(Inner {
                width,
                next_id: 0,
                subscribers: BTreeMap::new(),
            })),
        })
    }

    pub fn width(&self) -> f64 {
        self.lock().width
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().subscribers.len()
    }

    pub fn subscribe(&self) -> ViewportSubscription {
        let (tx, rx) = mpsc::channel();
        let mut inner = self.lock();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.subscribers.insert(id, tx);
        ViewportSubscription {
            id,
            width: inner.width,
            rx,
            bus: Arc::downgrade(&self.inner),
        }
    }

    /// Record a resize and notify every live subscriber.
    pub fn set_width(&self, width: f64) -> CollabResult<()> {
        check_non_negative("viewport width", width)?;
        let mut inner = self.lock();
        inner.width = width;
        inner.subscribers.retain(|_, tx| tx.send(width).is_ok());
        tracing::trace!(width, subscribers = inner.subscribers.len(), "viewport resized");
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// A scoped viewport listener. Dropping it removes it from the bus.
#[derive(Debug)]
pub struct ViewportSubscription {
    id: u64,
    width: f64,
    rx: mpsc::Receiver<f64>,
    bus: std::sync::Weak<Mutex<Inner>>,
}

impl ViewportSubscription {
    /// Width at subscription time or the latest one already drained.
    pub fn width(&self) -> f64 {
        self.width
    }

    /// Drain pending resizes. Returns the newest width if any arrived since the last call.
    pub fn latest(&mut self) -> Option<f64> {
        let mut newest = None;
        while let Ok(w) = self.rx.try_recv() {
            newest = Some(w);
        }
        if let Some(w) = newest {
            self.width = w;
        }
        newest
    }
}

impl Drop for ViewportSubscription {
    fn drop(&mut self) {
        if let Some(inner) = self.bus.upgrade() {
            let mut inner = inner.lock().unwrap_or_else(|e| e.into_inner());
            inner.subscribers.remove(&self.id);
        }
    }
}
