use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

/// Receives upload percentages from a transfer channel.
pub trait ProgressSink: Send + Sync {
    fn report(&self, percent: u32);
}

/// Sink that clamps to `0..=100`, drops values that would move backwards,
/// and goes silent once closed.
pub struct ProgressReporter {
    last: AtomicU8,
    started: AtomicBool,
    closed: AtomicBool,
    forward: Box<dyn Fn(u8) + Send + Sync>,
}

impl ProgressReporter {
    pub fn new(forward: impl Fn(u8) + Send + Sync + 'static) -> Self {
        Self {
            last: AtomicU8::new(0),
            started: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            forward: Box::new(forward),
        }
    }

    /// Highest value forwarded so far, if any.
    pub fn last(&self) -> Option<u8> {
        self.started
            .load(Ordering::Acquire)
            .then(|| self.last.load(Ordering::Acquire))
    }

    /// Stop forwarding. Called once the transfer has produced its result.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

impl ProgressSink for ProgressReporter {
    fn report(&self, percent: u32) {
        if self.is_closed() {
            return;
        }
        let percent = percent.min(100) as u8;
        let first = !self.started.swap(true, Ordering::AcqRel);
        let previous = self.last.fetch_max(percent, Ordering::AcqRel);
        if first || percent > previous {
            (self.forward)(percent);
        }
    }
}
