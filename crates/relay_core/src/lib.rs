//! Relay core: pure job state machine and view-model helpers.
mod effect;
mod msg;
mod state;
mod update;
mod view_model;

pub use effect::Effect;
pub use msg::{Msg, RemoteStatus};
pub use state::{
    FailureReason, Generation, Job, JobId, JobResult, JobSnapshot, JobState, Phase,
};
pub use update::update;
pub use view_model::JobView;
