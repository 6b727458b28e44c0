//! Scheduled extraction of the patient table to CSV.
//!
//! One job, one connection, one file write per run. Runs never overlap: the
//! schedule awaits each run (including retries) before waiting for the next
//! tick, and ticks missed while a run was in progress are skipped.

use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use hospital_records_core::export::{ExportError, ExportReport, SnapshotExporter};
use thiserror::Error;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use crate::config::AppConfig;

/// Extraction job errors.
#[derive(Debug, Error)]
pub enum JobError {
    #[error(transparent)]
    Export(#[from] ExportError),

    #[error("Extraction task aborted: {0}")]
    Aborted(String),
}

/// How a failed run is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first failed attempt
    pub retries: u32,
    /// Wait before each retry
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 1,
            delay: Duration::from_secs(5 * 60),
        }
    }
}

/// The extraction unit of work: database file in, CSV file out.
#[derive(Debug, Clone)]
pub struct ExtractionJob {
    database: PathBuf,
    output: PathBuf,
    retry: RetryPolicy,
}

impl ExtractionJob {
    pub fn new(database: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            database: database.into(),
            output: output.into(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(&config.database.path, &config.export.output_path)
            .with_retry(config.export.retry_policy())
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Run a single attempt on the blocking pool.
    pub async fn run_once(&self) -> Result<ExportReport, JobError> {
        let database = self.database.clone();
        let output = self.output.clone();

        let report = tokio::task::spawn_blocking(move || {
            SnapshotExporter::new().export(&database, &output)
        })
        .await
        .map_err(|e| JobError::Aborted(e.to_string()))??;

        Ok(report)
    }

    /// Run, retrying failed attempts per the policy. Returns the last error
    /// once retries are exhausted.
    pub async fn run_with_retry(&self) -> Result<ExportReport, JobError> {
        let mut attempt: u32 = 0;
        loop {
            match self.run_once().await {
                Ok(report) => {
                    info!(rows = report.rows, attempt, "extraction succeeded");
                    return Ok(report);
                }
                Err(e) if attempt < self.retry.retries => {
                    attempt += 1;
                    warn!(
                        error = %e,
                        attempt,
                        delay_secs = self.retry.delay.as_secs(),
                        "extraction failed, retrying"
                    );
                    tokio::time::sleep(self.retry.delay).await;
                }
                Err(e) => {
                    error!(error = %e, attempts = attempt + 1, "extraction failed");
                    return Err(e);
                }
            }
        }
    }
}

/// Fixed-interval schedule for an [`ExtractionJob`].
#[derive(Debug, Clone)]
pub struct ExportSchedule {
    job: ExtractionJob,
    interval: Duration,
}

impl ExportSchedule {
    pub fn new(job: ExtractionJob, interval: Duration) -> Self {
        Self {
            job,
            interval: interval.max(Duration::from_millis(1)),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(ExtractionJob::from_config(config), config.export.interval())
    }

    /// Run the job now and then once per interval until `shutdown` resolves.
    pub async fn run_until<F>(self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        info!(interval_secs = self.interval.as_secs(), "export schedule started");
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = ticker.tick() => {}
            }

            tokio::select! {
                _ = &mut shutdown => break,
                result = self.job.run_with_retry() => {
                    if let Err(e) = result {
                        error!(error = %e, "scheduled extraction gave up until next run");
                    }
                }
            }
        }
        info!("export schedule stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hospital_records_core::PatientRecords;
    use serde_json::json;

    fn seed(path: &std::path::Path, count: usize) {
        let records = PatientRecords::open(path).unwrap();
        for i in 0..count {
            let body = json!({
                "name": format!("Patient {i}"),
                "age": 40,
                "gender": "M",
                "blood_type": "B+",
                "medical_condition": "Diabetes",
                "date_of_admission": "2024-02-01",
                "doctor": "Dr. Kim",
                "hospital": "County",
                "insurance_provider": "Aetna",
                "billing_amount": 300,
                "room_number": 7,
                "admission_type": "Urgent",
                "medication": "Insulin",
                "test_results": "Abnormal"
            });
            records.create(body.as_object().unwrap()).unwrap();
        }
    }

    fn quick_retry() -> RetryPolicy {
        RetryPolicy {
            retries: 1,
            delay: Duration::from_millis(10),
        }
    }

    #[test]
    fn test_default_retry_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.retries, 1);
        assert_eq!(policy.delay, Duration::from_secs(300));
    }

    #[tokio::test]
    async fn test_run_once_writes_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("hospital.db");
        let out = dir.path().join("out.csv");
        seed(&db, 3);

        let report = ExtractionJob::new(&db, &out).run_once().await.unwrap();
        assert_eq!(report.rows, 3);
        assert_eq!(std::fs::read_to_string(&out).unwrap().lines().count(), 4);
    }

    #[tokio::test]
    async fn test_gives_up_after_retries() {
        let dir = tempfile::tempdir().unwrap();
        let job = ExtractionJob::new(dir.path().join("missing.db"), dir.path().join("out.csv"))
            .with_retry(quick_retry());

        let err = job.run_with_retry().await.unwrap_err();
        assert!(matches!(err, JobError::Export(ExportError::Database(_))));
        assert!(!dir.path().join("out.csv").exists());
    }

    #[tokio::test]
    async fn test_retry_recovers() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("hospital.db");
        let out = dir.path().join("out.csv");
        let job = ExtractionJob::new(&db, &out).with_retry(RetryPolicy {
            retries: 1,
            delay: Duration::from_millis(500),
        });

        // The database appears while the job waits to retry.
        let seed_path = db.clone();
        let seeder = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            tokio::task::spawn_blocking(move || seed(&seed_path, 2))
                .await
                .unwrap();
        });

        let report = job.run_with_retry().await.unwrap();
        seeder.await.unwrap();
        assert_eq!(report.rows, 2);
    }

    #[tokio::test]
    async fn test_schedule_runs_until_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("hospital.db");
        let out = dir.path().join("out.csv");
        seed(&db, 1);

        let schedule = ExportSchedule::new(
            ExtractionJob::new(&db, &out).with_retry(quick_retry()),
            Duration::from_millis(50),
        );
        schedule
            .run_until(tokio::time::sleep(Duration::from_millis(200)))
            .await;

        assert_eq!(std::fs::read_to_string(&out).unwrap().lines().count(), 2);
    }
}
