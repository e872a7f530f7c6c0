//! Bounded worker pool for per-user batch work.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::config::BatchSettings;
use crate::error::{EngineError, EngineResult, ErrorKind};

/// One user's failed unit of work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobFailure {
    /// The user the unit was for.
    pub user_id: String,
    /// Taxonomy of the failure.
    pub kind: ErrorKind,
    /// Error text.
    pub message: String,
}

impl JobFailure {
    fn from_error(user_id: &str, error: &EngineError) -> Self {
        Self {
            user_id: user_id.to_string(),
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}

/// Per-user results of a batch, both halves ordered by user id.
#[derive(Debug, Clone, Serialize)]
pub struct JobReport<T> {
    /// Units that completed.
    pub succeeded: Vec<(String, T)>,
    /// Units that failed or timed out.
    pub failed: Vec<JobFailure>,
}

impl<T> JobReport<T> {
    /// Number of units the batch ran.
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }
}

/// Runs a synchronous per-user closure for many users on the blocking pool.
///
/// At most `max_workers` units run at once. A unit that exceeds
/// `per_user_timeout` is reported as failed, but its blocking task is
/// detached rather than stopped: it keeps its worker slot until it returns
/// and may still commit. A rerun repeats such a commit idempotently.
#[derive(Debug, Clone, Copy)]
pub struct JobRunner {
    max_workers: usize,
    per_user_timeout: Duration,
}

impl JobRunner {
    /// Creates a runner. A zero worker count is raised to one.
    pub fn new(max_workers: usize, per_user_timeout: Duration) -> Self {
        Self {
            max_workers: max_workers.max(1),
            per_user_timeout,
        }
    }

    /// Creates a runner from resolved batch settings.
    pub fn from_settings(settings: &BatchSettings) -> Self {
        Self::new(settings.max_workers, settings.per_user_timeout())
    }

    /// Runs `work` once per user id and collects the outcomes.
    pub async fn run<T, F>(&self, operation: &str, user_ids: Vec<String>, work: F) -> JobReport<T>
    where
        T: Send + 'static,
        F: Fn(&str) -> EngineResult<T> + Send + Sync + 'static,
    {
        let started = Instant::now();
        let semaphore = Arc::new(Semaphore::new(self.max_workers));
        let work = Arc::new(work);
        let timeout = self.per_user_timeout;
        let mut set = JoinSet::new();

        info!(
            operation,
            users = user_ids.len(),
            max_workers = self.max_workers,
            "Batch started"
        );

        for user_id in user_ids {
            let semaphore = semaphore.clone();
            let work = work.clone();
            let operation = operation.to_string();
            set.spawn(async move {
                let outcome = match semaphore.acquire_owned().await {
                    Ok(permit) => {
                        let task_user = user_id.clone();
                        let task = tokio::task::spawn_blocking(move || {
                            let _permit = permit;
                            work(&task_user)
                        });
                        match tokio::time::timeout(timeout, task).await {
                            Ok(Ok(Ok(value))) => Ok(value),
                            Ok(Ok(Err(err))) => Err(JobFailure::from_error(&user_id, &err)),
                            Ok(Err(join_error)) => Err(JobFailure::from_error(
                                &user_id,
                                &EngineError::store(format!("worker aborted: {}", join_error)),
                            )),
                            Err(_) => Err(JobFailure::from_error(
                                &user_id,
                                &EngineError::Timeout {
                                    operation,
                                    millis: timeout.as_millis() as u64,
                                },
                            )),
                        }
                    }
                    Err(_) => Err(JobFailure::from_error(
                        &user_id,
                        &EngineError::store("worker pool closed"),
                    )),
                };
                (user_id, outcome)
            });
        }

        let mut succeeded = Vec::new();
        let mut failed = Vec::new();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((user_id, Ok(value))) => {
                    debug!(user_id = %user_id, "Unit succeeded");
                    succeeded.push((user_id, value));
                }
                Ok((_, Err(failure))) => {
                    warn!(
                        user_id = %failure.user_id,
                        kind = ?failure.kind,
                        error = %failure.message,
                        "Unit failed"
                    );
                    failed.push(failure);
                }
                Err(join_error) => error!(error = %join_error, "Batch task panicked"),
            }
        }
        succeeded.sort_by(|a, b| a.0.cmp(&b.0));
        failed.sort_by(|a, b| a.user_id.cmp(&b.user_id));

        info!(
            operation,
            succeeded = succeeded.len(),
            failed = failed.len(),
            duration_us = started.elapsed().as_micros(),
            "Batch finished"
        );
        JobReport { succeeded, failed }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn users(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("emp_{:03}", i)).collect()
    }

    #[tokio::test]
    async fn test_failures_are_collected_not_raised() {
        let runner = JobRunner::new(4, Duration::from_secs(5));
        let report = runner
            .run("test", users(10), |user_id| {
                if user_id.ends_with('3') {
                    Err(EngineError::SalaryStructureNotFound {
                        user_id: user_id.to_string(),
                        date: chrono::NaiveDate::from_ymd_opt(2025, 8, 31).unwrap(),
                    })
                } else {
                    Ok(user_id.len())
                }
            })
            .await;

        assert_eq!(report.total(), 10);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].user_id, "emp_003");
        assert_eq!(report.failed[0].kind, ErrorKind::DependencyMissing);
        let ids: Vec<&str> = report.succeeded.iter().map(|(u, _)| u.as_str()).collect();
        assert_eq!(ids.first(), Some(&"emp_000"));
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let (r, p) = (running.clone(), peak.clone());

        let runner = JobRunner::new(2, Duration::from_secs(5));
        let report = runner
            .run("test", users(8), move |_| {
                let now = r.fetch_add(1, Ordering::SeqCst) + 1;
                p.fetch_max(now, Ordering::SeqCst);
                std::thread::sleep(Duration::from_millis(20));
                r.fetch_sub(1, Ordering::SeqCst);
                Ok(())
            })
            .await;

        assert_eq!(report.succeeded.len(), 8);
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_slow_unit_times_out() {
        let runner = JobRunner::new(2, Duration::from_millis(20));
        let report = runner
            .run("test", vec!["slow".to_string()], |_| {
                std::thread::sleep(Duration::from_millis(200));
                Ok(())
            })
            .await;

        assert!(report.succeeded.is_empty());
        assert_eq!(report.failed[0].kind, ErrorKind::Infrastructure);
        assert!(report.failed[0].message.contains("test"));
    }

    #[tokio::test]
    async fn test_timed_out_unit_keeps_its_worker_slot() {
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let (r, p) = (running.clone(), peak.clone());

        let runner = JobRunner::new(1, Duration::from_millis(20));
        let report = runner
            .run("test", users(4), move |_| {
                let now = r.fetch_add(1, Ordering::SeqCst) + 1;
                p.fetch_max(now, Ordering::SeqCst);
                std::thread::sleep(Duration::from_millis(60));
                r.fetch_sub(1, Ordering::SeqCst);
                Ok(())
            })
            .await;

        assert_eq!(report.failed.len(), 4);
        assert_eq!(peak.load(Ordering::SeqCst), 1);
    }
}
