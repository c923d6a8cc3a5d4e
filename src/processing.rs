use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Semaphore};
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::{MuxerError, Result};
use crate::matcher::MuxJob;
use crate::muxer::{JobOutcome, JobResult, MuxInvoker};

/// Progress snapshot for one batch run. Owned by the dispatcher and shared
/// as an `Arc` so the presentation layer can poll it; counters only ever
/// move forward while a batch is running.
#[derive(Debug, Default)]
pub struct BatchState {
    total: AtomicUsize,
    completed: AtomicUsize,
    running: AtomicBool,
}

impl BatchState {
    pub fn total(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Claim the state for a new batch. Returns false if a batch is already
    /// running; counters are only reset on a successful claim.
    fn begin(&self, total: usize) -> bool {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return false;
        }
        self.total.store(total, Ordering::SeqCst);
        self.completed.store(0, Ordering::SeqCst);
        true
    }

    fn record_completion(&self) -> usize {
        self.completed.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn finish(&self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

/// Aggregated outcome of one batch run, also serialized into the JSON
/// report written next to the output files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSummary {
    pub started_at: DateTime<Utc>,
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub total_time: Duration,
    pub results: Vec<JobResult>,
}

/// Dispatches mux jobs to a bounded pool of concurrent workers and
/// aggregates their results through a single consumer.
pub struct BatchProcessor {
    invoker: MuxInvoker,
    output_dir: PathBuf,
    report_filename: String,
    worker_override: usize,
    state: Arc<BatchState>,
}

impl BatchProcessor {
    pub fn new(config: &Config, invoker: MuxInvoker, output_dir: PathBuf) -> Self {
        Self {
            invoker,
            output_dir,
            report_filename: config.output.report_filename.clone(),
            worker_override: config.performance.max_workers,
            state: Arc::new(BatchState::default()),
        }
    }

    /// Shared progress state, for polling while a batch is in flight
    pub fn state(&self) -> Arc<BatchState> {
        Arc::clone(&self.state)
    }

    /// Number of concurrent workers used for `job_count` jobs: twice the
    /// hardware parallelism (or the configured override), never more than
    /// the job count, never less than one.
    pub fn worker_count(&self, job_count: usize) -> usize {
        let base = if self.worker_override > 0 {
            self.worker_override
        } else {
            num_cpus::get() * 2
        };
        base.min(job_count).max(1)
    }

    /// Run every job to completion, bounded by the worker pool. Individual
    /// failures are reported through `on_job_error` and never abort the
    /// batch; both callbacks are invoked from a single consumer, in
    /// completion order. At most one batch may run at a time.
    pub async fn run_batch<P, E>(
        &self,
        jobs: Vec<MuxJob>,
        mut on_progress: P,
        mut on_job_error: E,
    ) -> Result<BatchSummary>
    where
        P: FnMut(usize, usize),
        E: FnMut(&str, &str),
    {
        if jobs.is_empty() {
            return Err(MuxerError::Configuration(
                "no matched pairs to process".to_string(),
            ));
        }

        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|e| {
                MuxerError::Configuration(format!(
                    "output directory {}: {}",
                    self.output_dir.display(),
                    e
                ))
            })?;

        let total = jobs.len();
        if !self.state.begin(total) {
            return Err(MuxerError::BatchInProgress);
        }

        let started_at = Utc::now();
        let start = Instant::now();
        let workers = self.worker_count(total);
        let semaphore = Arc::new(Semaphore::new(workers));
        let (tx, mut rx) = mpsc::channel(workers);

        info!("🚀 Starting batch of {} jobs with {} workers", total, workers);

        for job in jobs {
            let invoker = self.invoker.clone();
            let output_dir = self.output_dir.clone();
            let tx = tx.clone();
            let semaphore = Arc::clone(&semaphore);

            tokio::spawn(async move {
                let _permit = semaphore.acquire().await.unwrap();
                let result = invoker.invoke(&job, &output_dir).await;
                if let Err(e) = tx.send(result).await {
                    error!("Failed to send result: {}", e);
                }
            });
        }

        // Close the channel once every worker has sent its result
        drop(tx);

        let mut results = Vec::with_capacity(total);
        while let Some(result) = rx.recv().await {
            let completed = self.state.record_completion();
            on_progress(completed, total);

            if let JobOutcome::Failure(ref message) = result.outcome {
                warn!("❌ Failed: {} - {}", result.output_name, message.trim());
                on_job_error(&result.output_name, message);
            }
            results.push(result);
        }

        let successful = results.iter().filter(|r| r.is_success()).count();
        let summary = BatchSummary {
            started_at,
            total,
            successful,
            failed: total - successful,
            total_time: start.elapsed(),
            results,
        };

        self.state.finish();
        self.write_report(&summary).await?;

        Ok(summary)
    }

    /// Persist the batch summary as pretty-printed JSON in the output folder
    async fn write_report(&self, summary: &BatchSummary) -> Result<()> {
        let report_path = self.output_dir.join(&self.report_filename);
        let json_data = serde_json::to_string_pretty(summary)
            .map_err(|e| MuxerError::Configuration(format!("report serialization: {}", e)))?;
        tokio::fs::write(&report_path, json_data).await?;
        info!("💾 Report saved to: {}", report_path.display());
        Ok(())
    }
}
