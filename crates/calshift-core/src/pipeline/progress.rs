use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::mpsc::{Receiver, Sender, channel};

use tracing::{debug, info};

/// Receiver of scan progress
///
/// Percent values are monotonically non-decreasing within one run and end
/// at 100 for a completed run.
pub trait ProgressSink {
    fn percent(&self, value: u8);

    fn status(&self, _message: &str) {}
}

/// Discards all progress
#[derive(Debug, Clone, Copy, Default)]
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn percent(&self, _value: u8) {}
}

/// Reports progress through `tracing`
#[derive(Debug, Default)]
pub struct LogProgress {
    last: AtomicU8,
}

impl ProgressSink for LogProgress {
    fn percent(&self, value: u8) {
        // Log every tenth percent only
        let previous = self.last.swap(value, Ordering::Relaxed);
        if value / 10 != previous / 10 || value == 100 {
            info!("Scan progress: {}%", value);
        }
    }

    fn status(&self, message: &str) {
        debug!("{}", message);
    }
}

/// Maps a nested stage's 0-100 onto `[from, to]` of the outer sink
pub(crate) struct ScaledProgress<'a> {
    inner: &'a dyn ProgressSink,
    from: u8,
    to: u8,
}

impl<'a> ScaledProgress<'a> {
    pub(crate) fn new(inner: &'a dyn ProgressSink, from: u8, to: u8) -> Self {
        Self { inner, from, to }
    }
}

impl ProgressSink for ScaledProgress<'_> {
    fn percent(&self, value: u8) {
        let span = self.to.saturating_sub(self.from) as usize;
        let scaled = self.from as usize + value.min(100) as usize * span / 100;
        self.inner.percent(scaled as u8);
    }

    fn status(&self, message: &str) {
        self.inner.status(message);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    Percent(u8),
    Status(String),
}

/// Forwards progress to another thread over a channel.
///
/// Repeated percent values are coalesced. A dropped receiver is ignored so a
/// listener that goes away never aborts the scan.
#[derive(Debug)]
pub struct ChannelProgress {
    sender: Sender<ProgressEvent>,
    last: AtomicU8,
}

impl ChannelProgress {
    pub fn channel() -> (Self, Receiver<ProgressEvent>) {
        let (sender, receiver) = channel();
        let sink = Self {
            sender,
            last: AtomicU8::new(u8::MAX),
        };
        (sink, receiver)
    }
}

impl ProgressSink for ChannelProgress {
    fn percent(&self, value: u8) {
        if self.last.swap(value, Ordering::Relaxed) != value {
            let _ = self.sender.send(ProgressEvent::Percent(value));
        }
    }

    fn status(&self, message: &str) {
        let _ = self.sender.send(ProgressEvent::Status(message.to_string()));
    }
}
