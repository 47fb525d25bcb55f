#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Drive the claimed job from the queue stage to a terminal state.
    RunJob { job_id: crate::JobId, input: String },
}
