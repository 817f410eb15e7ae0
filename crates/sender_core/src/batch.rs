use serde::{Deserialize, Serialize};

use crate::Job;

/// Ordered jobs of one run plus a cursor to the next job to start.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Batch {
    jobs: Vec<Job>,
    next: usize,
}

impl Batch {
    pub fn new(jobs: Vec<Job>) -> Self {
        Self { jobs, next: 0 }
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Takes the next job with its zero-based index.
    pub fn next_job(&mut self) -> Option<(usize, &Job)> {
        let index = self.next;
        let job = self.jobs.get(index)?;
        self.next += 1;
        Some((index, job))
    }

    /// Jobs not yet started, in original order.
    pub fn pending(&self) -> &[Job] {
        &self.jobs[self.next..]
    }

    pub fn started(&self) -> usize {
        self.next
    }
}

/// Running counters of one batch. Only the worker owns and mutates a tally.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Tally {
    scheduled: usize,
    success: usize,
    failure: usize,
    failed_numbers: Vec<String>,
}

impl Tally {
    pub fn new(scheduled: usize) -> Self {
        Self {
            scheduled,
            ..Self::default()
        }
    }

    pub fn record_success(&mut self) {
        debug_assert!(self.processed() < self.scheduled, "tally overflow");
        self.success += 1;
    }

    pub fn record_failure(&mut self, number: impl Into<String>) {
        debug_assert!(self.processed() < self.scheduled, "tally overflow");
        self.failure += 1;
        self.failed_numbers.push(number.into());
    }

    pub fn success(&self) -> usize {
        self.success
    }

    pub fn failure(&self) -> usize {
        self.failure
    }

    pub fn failed_numbers(&self) -> &[String] {
        &self.failed_numbers
    }

    pub fn processed(&self) -> usize {
        self.success + self.failure
    }

    pub fn scheduled(&self) -> usize {
        self.scheduled
    }

    pub fn progress(&self) -> ProgressSnapshot {
        let current = self.processed();
        let percentage = if self.scheduled > 0 {
            (current * 100 / self.scheduled) as u8
        } else {
            0
        };
        ProgressSnapshot {
            current,
            total: self.scheduled,
            percentage,
            success: self.success,
            failed: self.failure,
        }
    }

    pub fn finish(self, outcome: RunOutcome) -> BatchResult {
        BatchResult {
            total: self.processed(),
            scheduled: self.scheduled,
            success: self.success,
            failed: self.failure,
            failed_numbers: self.failed_numbers,
            outcome,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub current: usize,
    pub total: usize,
    pub percentage: u8,
    pub success: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    Completed,
    Stopped,
    Failed { reason: String },
}

/// Terminal summary of a run, produced exactly once per run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResult {
    /// Jobs actually processed; less than `scheduled` when stopped early.
    pub total: usize,
    pub scheduled: usize,
    pub success: usize,
    pub failed: usize,
    pub failed_numbers: Vec<String>,
    pub outcome: RunOutcome,
}

impl BatchResult {
    /// Result of a run that ended before any job was read.
    pub fn failed(reason: impl Into<String>) -> Self {
        Tally::default().finish(RunOutcome::Failed {
            reason: reason.into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jobs(n: usize) -> Vec<Job> {
        (0..n)
            .map(|i| Job::new(format!("{i}"), format!("msg {i}"), None))
            .collect()
    }

    #[test]
    fn cursor_yields_jobs_in_order_once() {
        let mut batch = Batch::new(jobs(3));
        let seen: Vec<usize> = std::iter::from_fn(|| batch.next_job().map(|(i, _)| i)).collect();
        assert_eq!(seen, vec![0, 1, 2]);
        assert!(batch.pending().is_empty());
        assert_eq!(batch.started(), 3);
        assert!(batch.next_job().is_none());
    }

    #[test]
    fn progress_percentage_rounds_down() {
        let mut tally = Tally::new(3);
        tally.record_success();
        let progress = tally.progress();
        assert_eq!(progress.current, 1);
        assert_eq!(progress.percentage, 33);
        tally.record_failure("+911");
        tally.record_success();
        assert_eq!(tally.progress().percentage, 100);
    }

    #[test]
    fn empty_tally_reports_zero_percent() {
        assert_eq!(Tally::new(0).progress().percentage, 0);
    }

    #[test]
    fn finish_keeps_failed_numbers_in_order() {
        let mut tally = Tally::new(4);
        tally.record_failure("+911");
        tally.record_success();
        tally.record_failure("+912");
        let result = tally.finish(RunOutcome::Stopped);
        assert_eq!(result.total, 3);
        assert_eq!(result.scheduled, 4);
        assert_eq!(result.failed, result.failed_numbers.len());
        assert_eq!(result.failed_numbers, vec!["+911", "+912"]);
    }

    #[test]
    fn failed_result_has_zero_counters() {
        let result = BatchResult::failed("unreadable");
        assert_eq!(result.total, 0);
        assert_eq!(result.success + result.failed, 0);
        assert!(matches!(result.outcome, RunOutcome::Failed { .. }));
    }
}
