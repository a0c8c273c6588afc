use crate::{Effect, FailureReason, Generation, Job, JobId, JobState, Msg, RemoteStatus};

/// Pure update function: applies a message to the job and returns any effects.
///
/// Messages that do not fit the current phase, or that belong to a superseded
/// generation, leave the job untouched and produce no effects.
pub fn update(mut job: Job, msg: Msg) -> (Job, Vec<Effect>) {
    let generation = msg.generation();
    if let Msg::Submitted { artifact, .. } = msg {
        return submit(job, generation, artifact);
    }
    if generation != job.generation() {
        return (job, Vec::new());
    }

    let mut effects = Vec::new();
    match (job.state().clone(), msg) {
        (JobState::Uploading { progress }, Msg::TransferProgress { percent, .. }) => {
            let percent = percent.min(100);
            if percent > progress {
                transition(&mut job, JobState::Uploading { progress: percent }, &mut effects);
            }
        }
        (JobState::Uploading { progress }, Msg::TransferSucceeded { job_id, .. }) => {
            // Subscribers always see the upload reach 100 before processing starts.
            if progress < 100 {
                transition(&mut job, JobState::Uploading { progress: 100 }, &mut effects);
            }
            transition(
                &mut job,
                JobState::Processing { id: job_id.clone() },
                &mut effects,
            );
            effects.push(Effect::BeginPolling { generation, job_id });
        }
        (JobState::Uploading { .. }, Msg::TransferFailed { .. }) => {
            let failed = JobState::Failed {
                id: None,
                reason: FailureReason::TransferFailed,
            };
            transition(&mut job, failed, &mut effects);
        }
        (JobState::Processing { id }, Msg::StatusReported { status, .. }) => {
            match status {
                RemoteStatus::Processing => {}
                RemoteStatus::Complete(result) => {
                    transition(&mut job, JobState::Complete { id, result }, &mut effects);
                }
                RemoteStatus::Failed => {
                    let failed = failed_with(Some(id), FailureReason::RemoteFailed);
                    transition(&mut job, failed, &mut effects);
                }
            }
        }
        (JobState::Processing { id }, Msg::PollExhausted { .. }) => {
            let failed = failed_with(Some(id), FailureReason::PollExhausted);
            transition(&mut job, failed, &mut effects);
        }
        (JobState::Uploading { .. } | JobState::Processing { .. }, Msg::CancelRequested { .. }) => {
            cancel(&mut job, &mut effects);
        }
        _ => {}
    }

    (job, effects)
}

fn submit(mut job: Job, generation: Generation, artifact: String) -> (Job, Vec<Effect>) {
    if generation <= job.generation() {
        return (job, Vec::new());
    }

    let mut effects = Vec::with_capacity(4);
    if job.is_active() {
        cancel(&mut job, &mut effects);
    }

    // A new submission never reuses the previous job value.
    let mut job = Job::fresh(generation, artifact);
    transition(&mut job, JobState::Uploading { progress: 0 }, &mut effects);
    effects.push(Effect::StartTransfer { generation });
    (job, effects)
}

fn cancel(job: &mut Job, effects: &mut Vec<Effect>) {
    let id = job.id().cloned();
    effects.push(Effect::StopActivity {
        generation: job.generation(),
    });
    transition(job, failed_with(id, FailureReason::Cancelled), effects);
}

fn failed_with(id: Option<JobId>, reason: FailureReason) -> JobState {
    JobState::Failed { id, reason }
}

fn transition(job: &mut Job, next: JobState, effects: &mut Vec<Effect>) {
    job.set_state(next);
    effects.push(Effect::Publish(job.snapshot()));
}
