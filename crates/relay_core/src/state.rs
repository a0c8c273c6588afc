use std::fmt;

use serde::{Deserialize, Serialize};

/// Sequence number handed out per submission. Events carrying a generation
/// other than the current job's are stale and get dropped.
pub type Generation = u64;

/// Server-issued job identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for JobId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Idle,
    Uploading,
    Processing,
    Complete,
    Failed,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Uploading => "uploading",
            Phase::Processing => "processing",
            Phase::Complete => "complete",
            Phase::Failed => "failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Complete | Phase::Failed)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output references of a finished job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobResult {
    /// Primary output artifact (e.g. the rendered video).
    pub primary: String,
    /// Optional side artifact (e.g. a subtitle track).
    pub auxiliary: Option<String>,
}

impl JobResult {
    pub fn new(primary: impl Into<String>) -> Self {
        Self {
            primary: primary.into(),
            auxiliary: None,
        }
    }

    pub fn with_auxiliary(mut self, auxiliary: impl Into<String>) -> Self {
        self.auxiliary = Some(auxiliary.into());
        self
    }
}

/// Why a job ended in [`Phase::Failed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// The artifact never reached the remote system.
    TransferFailed,
    /// No terminal status within the poll budget.
    PollExhausted,
    /// The remote system reported the job as failed.
    RemoteFailed,
    /// Aborted by the caller, directly or by submitting another artifact.
    Cancelled,
}

impl FailureReason {
    /// Stable token handed to presentation code.
    pub fn token(self) -> &'static str {
        match self {
            FailureReason::TransferFailed => "transfer_failed",
            FailureReason::PollExhausted => "poll_exhausted",
            FailureReason::RemoteFailed => "remote_failed",
            FailureReason::Cancelled => "cancelled",
        }
    }

    pub fn describe(self) -> &'static str {
        match self {
            FailureReason::TransferFailed => "The video could not be uploaded.",
            FailureReason::PollExhausted => "The server did not finish in time.",
            FailureReason::RemoteFailed => "The server could not process the video.",
            FailureReason::Cancelled => "The job was cancelled.",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Lifecycle of one job. Each variant carries exactly the data that is
/// meaningful in that phase, so a result can never coexist with a failure.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum JobState {
    #[default]
    Idle,
    Uploading {
        progress: u8,
    },
    Processing {
        id: JobId,
    },
    Complete {
        id: JobId,
        result: JobResult,
    },
    Failed {
        id: Option<JobId>,
        reason: FailureReason,
    },
}

impl JobState {
    pub fn phase(&self) -> Phase {
        match self {
            JobState::Idle => Phase::Idle,
            JobState::Uploading { .. } => Phase::Uploading,
            JobState::Processing { .. } => Phase::Processing,
            JobState::Complete { .. } => Phase::Complete,
            JobState::Failed { .. } => Phase::Failed,
        }
    }
}

/// The single tracked unit of work. Only [`crate::update`] mutates it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Job {
    generation: Generation,
    artifact: String,
    state: JobState,
}

impl Job {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn fresh(generation: Generation, artifact: String) -> Self {
        Self {
            generation,
            artifact,
            state: JobState::Idle,
        }
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn artifact(&self) -> &str {
        &self.artifact
    }

    pub fn state(&self) -> &JobState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.state.phase()
    }

    pub fn id(&self) -> Option<&JobId> {
        match &self.state {
            JobState::Processing { id } | JobState::Complete { id, .. } => Some(id),
            JobState::Failed { id, .. } => id.as_ref(),
            JobState::Idle | JobState::Uploading { .. } => None,
        }
    }

    /// Upload percentage; only meaningful while uploading.
    pub fn progress(&self) -> Option<u8> {
        match self.state {
            JobState::Uploading { progress } => Some(progress),
            _ => None,
        }
    }

    pub fn result(&self) -> Option<&JobResult> {
        match &self.state {
            JobState::Complete { result, .. } => Some(result),
            _ => None,
        }
    }

    pub fn failure_reason(&self) -> Option<FailureReason> {
        match self.state {
            JobState::Failed { reason, .. } => Some(reason),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.phase().is_terminal()
    }

    /// True while a transfer or polling may be running for this job.
    pub fn is_active(&self) -> bool {
        matches!(self.phase(), Phase::Uploading | Phase::Processing)
    }

    pub fn snapshot(&self) -> JobSnapshot {
        JobSnapshot {
            generation: self.generation,
            artifact: self.artifact.clone(),
            phase: self.phase(),
            progress: self.progress(),
            job_id: self.id().cloned(),
            result: self.result().cloned(),
            failure: self.failure_reason(),
        }
    }

    pub(crate) fn set_state(&mut self, state: JobState) {
        self.state = state;
    }
}

/// Immutable copy of a job handed to subscribers after each transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSnapshot {
    pub generation: Generation,
    pub artifact: String,
    pub phase: Phase,
    pub progress: Option<u8>,
    pub job_id: Option<JobId>,
    pub result: Option<JobResult>,
    pub failure: Option<FailureReason>,
}

impl JobSnapshot {
    pub fn is_terminal(&self) -> bool {
        self.phase.is_terminal()
    }
}
