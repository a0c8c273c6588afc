use crate::{Generation, JobId, JobSnapshot};

/// Work the engine must carry out after a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Start moving the artifact of `generation` to the remote side.
    StartTransfer { generation: Generation },
    /// Start polling the remote side for `job_id`.
    BeginPolling {
        generation: Generation,
        job_id: JobId,
    },
    /// Abort any transfer or polling still running for `generation`.
    StopActivity { generation: Generation },
    /// Deliver a snapshot to subscribers.
    Publish(JobSnapshot),
}
