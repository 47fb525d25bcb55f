use std::collections::HashMap;

use crate::state::{Job, JobId, JobStatus, Millis, Stage};

/// In-memory job records keyed by id, iterated in submission order.
///
/// Jobs are never removed. Every change replaces the stored record with an
/// updated copy, and a record in a terminal status is never replaced again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobStore {
    jobs: HashMap<JobId, Job>,
    order: Vec<JobId>,
    next_id: JobId,
}

impl Default for JobStore {
    fn default() -> Self {
        Self {
            jobs: HashMap::new(),
            order: Vec::new(),
            next_id: 1,
        }
    }
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a pending job for `input`. Blank input creates nothing.
    pub fn submit(&mut self, input: &str, at: Millis) -> Option<JobId> {
        if input.trim().is_empty() {
            return None;
        }
        let id = self.next_id;
        self.next_id += 1;
        self.jobs.insert(id, Job::new(id, input.to_string(), at));
        self.order.push(id);
        Some(id)
    }

    pub fn get(&self, id: JobId) -> Option<&Job> {
        self.jobs.get(&id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Job> + '_ {
        self.order.iter().filter_map(|id| self.jobs.get(id))
    }

    pub fn first_pending(&self) -> Option<&Job> {
        self.iter().find(|job| job.status == JobStatus::Pending)
    }

    pub fn count_with_status(&self, status: JobStatus) -> usize {
        self.jobs.values().filter(|job| job.status == status).count()
    }

    /// Sets status and stage. Unknown ids and terminal jobs are left alone.
    pub fn transition(&mut self, id: JobId, status: JobStatus, stage: Stage) -> bool {
        self.replace(id, |job| Job {
            status,
            stage,
            ..job.clone()
        })
    }

    pub fn complete(&mut self, id: JobId, result: String, at: Millis) -> bool {
        self.replace(id, |job| Job {
            status: JobStatus::Completed,
            stage: Stage::Done,
            result: Some(result),
            error: None,
            completed_at: Some(at),
            ..job.clone()
        })
    }

    pub fn fail(&mut self, id: JobId, reason: String) -> bool {
        self.replace(id, |job| Job {
            status: JobStatus::Failed,
            stage: Stage::Done,
            result: None,
            error: Some(reason),
            ..job.clone()
        })
    }

    fn replace(&mut self, id: JobId, update: impl FnOnce(&Job) -> Job) -> bool {
        match self.jobs.get(&id) {
            Some(job) if !job.is_terminal() => {
                let updated = update(job);
                self.jobs.insert(id, updated);
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submit_assigns_increasing_ids_in_order() {
        let mut store = JobStore::new();
        let a = store.submit("b topic", 10).unwrap();
        let b = store.submit("a topic", 11).unwrap();
        assert!(a < b);
        let inputs: Vec<_> = store.iter().map(|job| job.input.as_str()).collect();
        assert_eq!(inputs, vec!["b topic", "a topic"]);
    }

    #[test]
    fn blank_input_is_ignored() {
        let mut store = JobStore::new();
        assert_eq!(store.submit("", 0), None);
        assert_eq!(store.submit(" \t\n ", 0), None);
        assert!(store.is_empty());
    }

    #[test]
    fn input_is_kept_verbatim() {
        let mut store = JobStore::new();
        let id = store.submit("  padded topic ", 0).unwrap();
        assert_eq!(store.get(id).unwrap().input, "  padded topic ");
    }

    #[test]
    fn transition_of_unknown_id_is_noop() {
        let mut store = JobStore::new();
        store.submit("x", 0);
        let before = store.clone();
        assert!(!store.transition(99, JobStatus::Processing, Stage::Scraping));
        assert_eq!(store, before);
    }

    #[test]
    fn terminal_jobs_are_never_reopened() {
        let mut store = JobStore::new();
        let id = store.submit("x", 0).unwrap();
        assert!(store.complete(id, "done".to_string(), 5));

        assert!(!store.transition(id, JobStatus::Processing, Stage::Saving));
        assert!(!store.fail(id, "late".to_string()));
        assert!(!store.complete(id, "again".to_string(), 9));

        let job = store.get(id).unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.result.as_deref(), Some("done"));
        assert_eq!(job.completed_at, Some(5));
    }

    #[test]
    fn fail_clears_result_and_keeps_reason() {
        let mut store = JobStore::new();
        let id = store.submit("x", 0).unwrap();
        assert!(store.fail(id, "boom".to_string()));
        let job = store.get(id).unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.stage, Stage::Done);
        assert_eq!(job.result, None);
        assert_eq!(job.error.as_deref(), Some("boom"));
        assert_eq!(job.completed_at, None);
    }
}
