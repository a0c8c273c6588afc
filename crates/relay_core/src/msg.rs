use crate::{Generation, JobId, JobResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// Caller handed over a new artifact. Supersedes the current job.
    Submitted {
        generation: Generation,
        artifact: String,
    },
    /// Transfer channel reported upload progress.
    TransferProgress { generation: Generation, percent: u8 },
    /// Transfer finished and the remote side issued an id.
    TransferSucceeded {
        generation: Generation,
        job_id: JobId,
    },
    /// Transfer ended with an error.
    TransferFailed { generation: Generation },
    /// Status channel answered a poll.
    StatusReported {
        generation: Generation,
        status: RemoteStatus,
    },
    /// Poll budget ran out before a terminal status was seen.
    PollExhausted { generation: Generation },
    /// Caller asked to abort the job.
    CancelRequested { generation: Generation },
}

impl Msg {
    pub fn generation(&self) -> Generation {
        match self {
            Msg::Submitted { generation, .. }
            | Msg::TransferProgress { generation, .. }
            | Msg::TransferSucceeded { generation, .. }
            | Msg::TransferFailed { generation }
            | Msg::StatusReported { generation, .. }
            | Msg::PollExhausted { generation }
            | Msg::CancelRequested { generation } => *generation,
        }
    }
}

/// Phase reported by the remote system for a job it has accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteStatus {
    Processing,
    Complete(JobResult),
    Failed,
}

impl RemoteStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RemoteStatus::Processing)
    }
}
