//! Byte-level progress tracking shared by downloads and archive extraction.

use std::io::{self, Write};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;

/// Receives progress notifications from a [`Tracker`].
pub trait ProgressObserver: Send + Sync {
    /// A new tracked operation started.
    fn on_reset(&self, label: &str);

    /// Fraction of the current operation completed, in `0.0..=1.0`.
    fn on_progress(&self, fraction: f64);

    /// Free-form status message.
    fn on_info(&self, _message: &str) {}
}

/// Observer that discards everything.
pub struct Silent;

impl ProgressObserver for Silent {
    fn on_reset(&self, _label: &str) {}
    fn on_progress(&self, _fraction: f64) {}
}

/// Messages pushed from a background job to the foreground renderer.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Reset(String),
    Progress(f64),
    Info(String),
}

impl ProgressObserver for Sender<Event> {
    fn on_reset(&self, label: &str) {
        // the renderer may already be gone
        let _ = self.send(Event::Reset(label.to_string()));
    }

    fn on_progress(&self, fraction: f64) {
        let _ = self.send(Event::Progress(fraction));
    }

    fn on_info(&self, message: &str) {
        let _ = self.send(Event::Info(message.to_string()));
    }
}

#[derive(Clone)]
pub struct Tracker {
    total: Arc<AtomicU64>,
    written: Arc<AtomicU64>,
    observer: Arc<dyn ProgressObserver>,
}

impl Tracker {
    pub fn new(observer: Arc<dyn ProgressObserver>) -> Self {
        Self {
            total: Arc::new(AtomicU64::new(0)),
            written: Arc::new(AtomicU64::new(0)),
            observer,
        }
    }

    pub fn silent() -> Self {
        Self::new(Arc::new(Silent))
    }

    /// Starts a new tracked operation, zeroing both counters.
    pub fn reset(&self, label: &str) {
        self.total.store(0, Ordering::SeqCst);
        self.written.store(0, Ordering::SeqCst);
        self.observer.on_reset(label);
    }

    pub fn set_size(&self, total: u64) {
        self.total.store(total, Ordering::SeqCst);
    }

    pub fn info(&self, message: &str) {
        self.observer.on_info(message);
    }

    pub fn advance(&self, n: u64) {
        let written = self.written.fetch_add(n, Ordering::SeqCst) + n;
        let total = self.total.load(Ordering::SeqCst);
        if total > 0 {
            self.observer.on_progress(written as f64 / total as f64);
        }
    }

    pub fn written(&self) -> u64 {
        self.written.load(Ordering::SeqCst)
    }

    pub fn total(&self) -> u64 {
        self.total.load(Ordering::SeqCst)
    }

    /// Wraps `inner` so every byte written through it is counted.
    pub fn writer<W: Write>(&self, inner: W) -> TrackedWriter<'_, W> {
        TrackedWriter {
            inner,
            tracker: self,
        }
    }
}

pub struct TrackedWriter<'a, W> {
    inner: W,
    tracker: &'a Tracker,
}

impl<W: Write> Write for TrackedWriter<'_, W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.tracker.advance(n as u64);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Formats a byte count the way progress labels show it: `512 B`, `1.5 KB`, `12 MB`.
pub fn format_size(size: u64) -> String {
    const KB: u64 = 1 << 10;
    const MB: u64 = 1 << 20;

    let (value, unit) = if size >= MB {
        (size as f64 / MB as f64, "MB")
    } else if size >= KB {
        (size as f64 / KB as f64, "KB")
    } else {
        (size as f64, "B")
    };

    let formatted = format!("{value:.1}");
    let formatted = formatted.strip_suffix(".0").unwrap_or(&formatted);
    format!("{formatted} {unit}")
}
