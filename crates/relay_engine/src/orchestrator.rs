use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_util::Stream;
use relay_core::{update, Effect, Generation, Job, JobId, JobSnapshot, Msg};
use relay_logging::{relay_debug, relay_info, relay_warn};
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use crate::scheduler::{PollOutcome, PollScheduler};
use crate::{
    Artifact, Clock, PolicyError, PollPolicy, ProgressReporter, StatusChannel, SubmitOptions,
    TokioClock, TransferChannel,
};

enum Command {
    Submit {
        artifact: Artifact,
        options: SubmitOptions,
        subscriber: mpsc::UnboundedSender<JobSnapshot>,
    },
    Subscribe {
        subscriber: mpsc::UnboundedSender<JobSnapshot>,
    },
    Cancel,
    Current {
        reply: oneshot::Sender<Option<JobSnapshot>>,
    },
}

/// Ordered, lossless stream of job snapshots.
///
/// A subscription returned by [`Orchestrator::submit`] ends after its job's
/// terminal snapshot; one from [`Orchestrator::subscribe`] ends when the
/// orchestrator is dropped.
pub struct Subscription {
    rx: mpsc::UnboundedReceiver<JobSnapshot>,
}

impl Subscription {
    pub async fn next(&mut self) -> Option<JobSnapshot> {
        self.rx.recv().await
    }

    /// Next snapshot if one is already queued.
    pub fn try_next(&mut self) -> Option<JobSnapshot> {
        self.rx.try_recv().ok()
    }

    /// Drain until a terminal snapshot arrives or the stream ends.
    pub async fn terminal(&mut self) -> Option<JobSnapshot> {
        while let Some(snapshot) = self.rx.recv().await {
            if snapshot.is_terminal() {
                return Some(snapshot);
            }
        }
        None
    }
}

impl Stream for Subscription {
    type Item = JobSnapshot;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

/// Public entry point: runs one job at a time through transfer and polling.
///
/// All job state lives in a single actor task; every outcome, including
/// failures, reaches callers as a [`JobSnapshot`]. Must be created inside a
/// tokio runtime.
pub struct Orchestrator {
    cmd_tx: mpsc::UnboundedSender<Command>,
}

impl Orchestrator {
    pub fn new(
        transfer: Arc<dyn TransferChannel>,
        status: Arc<dyn StatusChannel>,
        policy: PollPolicy,
    ) -> Result<Self, PolicyError> {
        Self::with_clock(transfer, status, policy, Arc::new(TokioClock))
    }

    pub fn with_clock(
        transfer: Arc<dyn TransferChannel>,
        status: Arc<dyn StatusChannel>,
        policy: PollPolicy,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, PolicyError> {
        let scheduler = Arc::new(PollScheduler::new(status, clock, policy)?);
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let actor = Actor {
            transfer,
            scheduler,
            job: Job::new(),
            next_generation: 1,
            pending: None,
            active: None,
            subscribers: Vec::new(),
            event_tx,
        };
        tokio::spawn(actor.run(cmd_rx, event_rx));

        Ok(Self { cmd_tx })
    }

    /// Start a new job, superseding any job still in flight.
    pub fn submit(&self, artifact: Artifact, options: SubmitOptions) -> Subscription {
        let (subscriber, rx) = mpsc::unbounded_channel();
        let _ = self.cmd_tx.send(Command::Submit {
            artifact,
            options,
            subscriber,
        });
        Subscription { rx }
    }

    /// Receive every snapshot of every job submitted from now on.
    pub fn subscribe(&self) -> Subscription {
        let (subscriber, rx) = mpsc::unbounded_channel();
        let _ = self.cmd_tx.send(Command::Subscribe { subscriber });
        Subscription { rx }
    }

    /// Abort the current job if it is still uploading or processing.
    pub fn cancel(&self) {
        let _ = self.cmd_tx.send(Command::Cancel);
    }

    /// Latest snapshot, or `None` before the first submission.
    pub async fn current(&self) -> Option<JobSnapshot> {
        let (reply, rx) = oneshot::channel();
        self.cmd_tx.send(Command::Current { reply }).ok()?;
        rx.await.ok().flatten()
    }
}

struct Subscriber {
    /// `None` follows every job; `Some` follows one generation only.
    generation: Option<Generation>,
    tx: mpsc::UnboundedSender<JobSnapshot>,
}

struct Actor {
    transfer: Arc<dyn TransferChannel>,
    scheduler: Arc<PollScheduler>,
    job: Job,
    next_generation: Generation,
    pending: Option<(Generation, Artifact, SubmitOptions)>,
    active: Option<(Generation, CancellationToken)>,
    subscribers: Vec<Subscriber>,
    event_tx: mpsc::UnboundedSender<Msg>,
}

impl Actor {
    async fn run(
        mut self,
        mut cmd_rx: mpsc::UnboundedReceiver<Command>,
        mut event_rx: mpsc::UnboundedReceiver<Msg>,
    ) {
        loop {
            tokio::select! {
                biased;
                command = cmd_rx.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => break,
                },
                Some(msg) = event_rx.recv() => self.dispatch(msg),
            }
        }
        // Subscribers outlive the handle; they still get a terminal snapshot.
        let generation = self.job.generation();
        self.dispatch(Msg::CancelRequested { generation });
        self.stop_active();
        relay_debug!("Orchestrator stopped");
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Submit {
                artifact,
                options,
                subscriber,
            } => {
                let generation = self.next_generation;
                self.next_generation += 1;
                relay_info!(
                    "Submitting {} (gen={}, language={})",
                    artifact.name(),
                    generation,
                    options.target_language
                );
                self.subscribers.push(Subscriber {
                    generation: Some(generation),
                    tx: subscriber,
                });
                let name = artifact.name().to_string();
                self.pending = Some((generation, artifact, options));
                self.dispatch(Msg::Submitted {
                    generation,
                    artifact: name,
                });
            }
            Command::Subscribe { subscriber } => self.subscribers.push(Subscriber {
                generation: None,
                tx: subscriber,
            }),
            Command::Cancel => {
                let generation = self.job.generation();
                self.dispatch(Msg::CancelRequested { generation });
            }
            Command::Current { reply } => {
                let current = (self.job.generation() > 0).then(|| self.job.snapshot());
                let _ = reply.send(current);
            }
        }
    }

    fn dispatch(&mut self, msg: Msg) {
        let job = std::mem::take(&mut self.job);
        let (job, effects) = update(job, msg);
        self.job = job;
        for effect in effects {
            self.run_effect(effect);
        }
    }

    fn run_effect(&mut self, effect: Effect) {
        match effect {
            Effect::StartTransfer { generation } => self.start_transfer(generation),
            Effect::BeginPolling { generation, job_id } => self.begin_polling(generation, job_id),
            Effect::StopActivity { generation } => {
                if matches!(&self.active, Some((active, _)) if *active == generation) {
                    self.stop_active();
                }
            }
            Effect::Publish(snapshot) => self.publish(snapshot),
        }
    }

    fn start_transfer(&mut self, generation: Generation) {
        let Some((_, artifact, options)) = self
            .pending
            .take()
            .filter(|(pending, _, _)| *pending == generation)
        else {
            relay_warn!("No artifact pending for gen={}", generation);
            return;
        };

        self.stop_active();
        let token = CancellationToken::new();
        self.active = Some((generation, token.clone()));

        let transfer = Arc::clone(&self.transfer);
        let events = self.event_tx.clone();
        tokio::spawn(async move {
            let reporter = {
                let events = events.clone();
                ProgressReporter::new(move |percent| {
                    let _ = events.send(Msg::TransferProgress {
                        generation,
                        percent,
                    });
                })
            };

            let result = tokio::select! {
                biased;
                _ = token.cancelled() => None,
                result = transfer.send(&artifact, &options, &reporter) => Some(result),
            };
            reporter.close();

            let msg = match result {
                None => {
                    relay_debug!("Transfer for gen={} cancelled", generation);
                    return;
                }
                Some(Ok(job_id)) => {
                    relay_info!("Transfer for gen={} accepted as job {}", generation, job_id);
                    Msg::TransferSucceeded { generation, job_id }
                }
                Some(Err(err)) => {
                    relay_warn!("Transfer for gen={} failed: {}", generation, err);
                    Msg::TransferFailed { generation }
                }
            };
            let _ = events.send(msg);
        });
    }

    fn begin_polling(&mut self, generation: Generation, job_id: JobId) {
        let token = match &self.active {
            Some((active, token)) if *active == generation => token.clone(),
            _ => {
                self.stop_active();
                let token = CancellationToken::new();
                self.active = Some((generation, token.clone()));
                token
            }
        };

        let scheduler = Arc::clone(&self.scheduler);
        let events = self.event_tx.clone();
        tokio::spawn(async move {
            let msg = match scheduler.run(generation, &job_id, &token).await {
                PollOutcome::Finished(status) => Msg::StatusReported { generation, status },
                PollOutcome::Exhausted { .. } => Msg::PollExhausted { generation },
                PollOutcome::Cancelled => return,
            };
            let _ = events.send(msg);
        });
    }

    fn publish(&mut self, snapshot: JobSnapshot) {
        relay_debug!(
            "gen={} -> {} (progress {:?})",
            snapshot.generation,
            snapshot.phase,
            snapshot.progress
        );
        let terminal = snapshot.is_terminal();
        if terminal {
            if matches!(&self.active, Some((active, _)) if *active == snapshot.generation) {
                self.active = None;
            }
            match snapshot.failure {
                Some(reason) => relay_info!("gen={} failed: {}", snapshot.generation, reason),
                None => relay_info!("gen={} complete", snapshot.generation),
            }
        }

        self.subscribers.retain(|subscriber| {
            if subscriber
                .generation
                .is_some_and(|generation| generation != snapshot.generation)
            {
                return !subscriber.tx.is_closed();
            }
            if subscriber.tx.send(snapshot.clone()).is_err() {
                return false;
            }
            !(terminal && subscriber.generation.is_some())
        });
    }

    fn stop_active(&mut self) {
        if let Some((generation, token)) = self.active.take() {
            relay_debug!("Stopping activity for gen={}", generation);
            token.cancel();
        }
    }
}
