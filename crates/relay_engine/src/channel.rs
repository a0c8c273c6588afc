use relay_core::{JobId, RemoteStatus};

use crate::{Artifact, PollError, ProgressSink, SubmitOptions, TransferError};

/// Moves an artifact to the remote side.
///
/// Implementations report non-decreasing percentages through `progress`,
/// reaching 100 before returning `Ok`, and must not report anything after
/// returning.
#[async_trait::async_trait]
pub trait TransferChannel: Send + Sync {
    async fn send(
        &self,
        artifact: &Artifact,
        options: &SubmitOptions,
        progress: &dyn ProgressSink,
    ) -> Result<JobId, TransferError>;
}

/// Asks the remote side where a job stands.
///
/// `Err` means the question could not be answered this time; a remote
/// failure is reported as `Ok(RemoteStatus::Failed)`.
#[async_trait::async_trait]
pub trait StatusChannel: Send + Sync {
    async fn poll(&self, job_id: &JobId) -> Result<RemoteStatus, PollError>;
}
