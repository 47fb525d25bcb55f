//! Job lifecycle as an explicit finite-state machine.
//!
//! `Pending → Queued → Scraping → Analyzing → Saving → Done(Success)`, with
//! `Done(Failure)` reachable from any non-terminal phase. The machine knows
//! nothing about timers or tasks; whoever drives it decides when to call
//! [`advance`].

use crate::state::{JobStatus, Stage};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Pending,
    Queued,
    Scraping,
    Analyzing,
    Saving,
    Done(Outcome),
}

/// Result of the work done in the current phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Proceed,
    Fail,
}

/// Next phase after `step` completes in `phase`.
pub fn advance(phase: Phase, step: Step) -> Phase {
    phase.advance(step)
}

impl Phase {
    pub fn advance(self, step: Step) -> Phase {
        match (self, step) {
            (Phase::Done(outcome), _) => Phase::Done(outcome),
            (_, Step::Fail) => Phase::Done(Outcome::Failure),
            (Phase::Pending, Step::Proceed) => Phase::Queued,
            (Phase::Queued, Step::Proceed) => Phase::Scraping,
            (Phase::Scraping, Step::Proceed) => Phase::Analyzing,
            (Phase::Analyzing, Step::Proceed) => Phase::Saving,
            (Phase::Saving, Step::Proceed) => Phase::Done(Outcome::Success),
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Done(_))
    }

    /// Phases that only wait out the simulated delay.
    pub fn is_simulated(self) -> bool {
        matches!(self, Phase::Queued | Phase::Scraping | Phase::Saving)
    }

    pub fn status(self) -> JobStatus {
        match self {
            Phase::Pending => JobStatus::Pending,
            Phase::Queued | Phase::Scraping | Phase::Analyzing | Phase::Saving => {
                JobStatus::Processing
            }
            Phase::Done(Outcome::Success) => JobStatus::Completed,
            Phase::Done(Outcome::Failure) => JobStatus::Failed,
        }
    }

    /// Stage as stored on the job record. A pending job sits in `Queued`.
    pub fn stage(self) -> Stage {
        match self {
            Phase::Pending | Phase::Queued => Stage::Queued,
            Phase::Scraping => Stage::Scraping,
            Phase::Analyzing => Stage::AiAnalysis,
            Phase::Saving => Stage::Saving,
            Phase::Done(_) => Stage::Done,
        }
    }

    /// Rebuilds the phase from a stored status/stage pair.
    pub fn from_record(status: JobStatus, stage: Stage) -> Phase {
        match (status, stage) {
            (JobStatus::Pending, _) => Phase::Pending,
            (JobStatus::Completed, _) => Phase::Done(Outcome::Success),
            (JobStatus::Failed, _) => Phase::Done(Outcome::Failure),
            (JobStatus::Processing, Stage::Queued) => Phase::Queued,
            (JobStatus::Processing, Stage::Scraping) => Phase::Scraping,
            (JobStatus::Processing, Stage::AiAnalysis) => Phase::Analyzing,
            (JobStatus::Processing, Stage::Saving | Stage::Done) => Phase::Saving,
        }
    }
}
