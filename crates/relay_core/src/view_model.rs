use crate::{FailureReason, JobSnapshot, Phase};

/// Presentation-neutral reading of a snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobView {
    pub phase: Phase,
    pub progress: Option<u8>,
    pub failure: Option<FailureReason>,
    pub primary_output: Option<String>,
    pub auxiliary_output: Option<String>,
}

impl JobView {
    pub fn status_message(&self) -> String {
        match self.phase {
            Phase::Idle => "Upload a video to begin.".to_string(),
            Phase::Uploading => format!("Uploading... {}%", self.progress.unwrap_or(0)),
            Phase::Processing => "Processing video... This may take a few moments.".to_string(),
            Phase::Complete => "Translation complete!".to_string(),
            Phase::Failed => "Translation failed. Please try again.".to_string(),
        }
    }

    /// Failure-specific explanation, if the job failed.
    pub fn detail(&self) -> Option<&'static str> {
        self.failure.map(FailureReason::describe)
    }

    /// A new submission is pointless while this is true.
    pub fn is_busy(&self) -> bool {
        matches!(self.phase, Phase::Uploading | Phase::Processing)
    }

    /// Bar fill level; the bar stays full while the remote side works.
    pub fn progress_bar(&self) -> Option<u8> {
        match self.phase {
            Phase::Uploading => Some(self.progress.unwrap_or(0)),
            Phase::Processing => Some(100),
            Phase::Idle | Phase::Complete | Phase::Failed => None,
        }
    }
}

impl From<&JobSnapshot> for JobView {
    fn from(snapshot: &JobSnapshot) -> Self {
        let (primary_output, auxiliary_output) = match &snapshot.result {
            Some(result) => (Some(result.primary.clone()), result.auxiliary.clone()),
            None => (None, None),
        };
        Self {
            phase: snapshot.phase,
            progress: snapshot.progress,
            failure: snapshot.failure,
            primary_output,
            auxiliary_output,
        }
    }
}
