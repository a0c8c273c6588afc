//! Relay engine: async execution of transfer, polling and job orchestration.
mod channel;
mod clock;
mod http;
mod orchestrator;
mod policy;
mod progress;
mod scheduler;
mod types;

pub use channel::{StatusChannel, TransferChannel};
pub use clock::{Clock, TokioClock};
pub use http::{HttpSettings, HttpStatusChannel, HttpTransferChannel};
pub use orchestrator::{Orchestrator, Subscription};
pub use policy::{PolicyError, PollPolicy};
pub use progress::{ProgressReporter, ProgressSink};
pub use scheduler::{PollOutcome, PollScheduler};
pub use types::{
    Artifact, PollError, PollErrorKind, SubmitOptions, TransferError, TransferFailureKind,
};
