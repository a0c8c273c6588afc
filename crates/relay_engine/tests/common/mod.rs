#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use relay_core::{JobId, RemoteStatus};
use relay_engine::{
    Artifact, Clock, PollError, PollErrorKind, ProgressSink, StatusChannel, SubmitOptions,
    TransferChannel, TransferError,
};
use tokio::sync::Notify;
use tokio::time::Instant;

pub fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(relay_logging::initialize_for_tests);
}

/// Virtual clock: sleeping advances time instantly and is recorded.
pub struct ManualClock {
    base: Instant,
    offset: Mutex<Duration>,
    sleeps: Mutex<Vec<Duration>>,
}

impl ManualClock {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            base: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
            sleeps: Mutex::new(Vec::new()),
        })
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }

    pub fn elapsed(&self) -> Duration {
        *self.offset.lock().unwrap()
    }
}

#[async_trait::async_trait]
impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.base + *self.offset.lock().unwrap()
    }

    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
        *self.offset.lock().unwrap() += duration;
        tokio::task::yield_now().await;
    }
}

pub fn transient() -> Result<RemoteStatus, PollError> {
    Err(PollError::new(PollErrorKind::Network, "connection reset"))
}

/// Replays a fixed script of replies, then keeps answering `Processing`.
pub struct ScriptedStatus {
    script: Mutex<VecDeque<Result<RemoteStatus, PollError>>>,
    calls: AtomicUsize,
}

impl ScriptedStatus {
    pub fn new(script: Vec<Result<RemoteStatus, PollError>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl StatusChannel for ScriptedStatus {
    async fn poll(&self, _job_id: &JobId) -> Result<RemoteStatus, PollError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(RemoteStatus::Processing))
    }
}

/// Every poll signals `started`, then waits for `release` before answering.
pub struct GatedStatus {
    pub started: Notify,
    pub release: Notify,
    reply: RemoteStatus,
    calls: AtomicUsize,
}

impl GatedStatus {
    pub fn new(reply: RemoteStatus) -> Arc<Self> {
        Arc::new(Self {
            started: Notify::new(),
            release: Notify::new(),
            reply,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl StatusChannel for GatedStatus {
    async fn poll(&self, _job_id: &JobId) -> Result<RemoteStatus, PollError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.started.notify_one();
        self.release.notified().await;
        Ok(self.reply.clone())
    }
}

/// Reports the given percentages, optionally waits for a gate, then returns
/// the scripted outcome.
pub struct ScriptedTransfer {
    steps: Vec<u32>,
    outcome: Result<JobId, TransferError>,
    gate: Option<Arc<Notify>>,
    calls: AtomicUsize,
    seen: Mutex<Vec<(String, String)>>,
}

impl ScriptedTransfer {
    pub fn succeeding(steps: Vec<u32>, job_id: &str) -> Arc<Self> {
        Arc::new(Self {
            steps,
            outcome: Ok(JobId::new(job_id)),
            gate: None,
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(steps: Vec<u32>, error: TransferError) -> Arc<Self> {
        Arc::new(Self {
            steps,
            outcome: Err(error),
            gate: None,
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        })
    }

    /// Transfer that reports `steps` and then hangs until `gate` is notified.
    pub fn gated(steps: Vec<u32>, job_id: &str, gate: Arc<Notify>) -> Arc<Self> {
        Arc::new(Self {
            steps,
            outcome: Ok(JobId::new(job_id)),
            gate: Some(gate),
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// `(artifact name, target language)` per call.
    pub fn seen(&self) -> Vec<(String, String)> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl TransferChannel for ScriptedTransfer {
    async fn send(
        &self,
        artifact: &Artifact,
        options: &SubmitOptions,
        progress: &dyn ProgressSink,
    ) -> Result<JobId, TransferError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen
            .lock()
            .unwrap()
            .push((artifact.name().to_string(), options.target_language.clone()));
        for step in &self.steps {
            progress.report(*step);
            tokio::task::yield_now().await;
        }
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.outcome.clone()
    }
}
