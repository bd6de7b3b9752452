/*!
 * Parallel upload fan-out
 *
 * One named OS thread per worker, all started before any is joined. There
 * is no admission limit beyond the worker count, and a worker that fails,
 * panics or cannot be spawned only affects its own outcome.
 */

use std::path::Path;
use std::thread;
use std::time::Instant;

use tracing::{error, info};

use crate::config::ServerAddress;
use crate::core::worker::{Connector, TcpConnector, UploadOutcome, UploadTask, UploadWorker};
use crate::error::UplinkError;
use crate::stats::RunSummary;

/// Spawns `num_workers` concurrent attempts and tallies them
pub struct UploadOrchestrator<C = TcpConnector> {
    worker: UploadWorker<C>,
}

impl UploadOrchestrator<TcpConnector> {
    pub fn new() -> Self {
        Self::with_worker(UploadWorker::new())
    }
}

impl Default for UploadOrchestrator<TcpConnector> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Connector> UploadOrchestrator<C> {
    pub fn with_worker(worker: UploadWorker<C>) -> Self {
        Self { worker }
    }

    pub fn worker(&self) -> &UploadWorker<C> {
        &self.worker
    }

    /// Upload `source` from `num_workers` threads and wait for all of them
    pub fn run(&self, source: &Path, num_workers: usize, address: &ServerAddress) -> RunSummary {
        info!(
            workers = num_workers,
            target = %address,
            "Starting {} parallel uploads of {}",
            num_workers,
            source.display()
        );

        let started = Instant::now();
        let tasks: Vec<UploadTask> = (0..num_workers)
            .map(|index| UploadTask::new(source, index, address.clone()))
            .collect();

        let outcomes = thread::scope(|scope| {
            let handles: Vec<_> = tasks
                .iter()
                .map(|task| {
                    let handle = thread::Builder::new()
                        .name(format!("upload-{}", task.worker_index))
                        .spawn_scoped(scope, move || self.worker.run(task));
                    (task, handle)
                })
                .collect();

            handles
                .into_iter()
                .map(|(task, handle)| {
                    let joined = match handle {
                        Ok(handle) => handle.join().ok(),
                        Err(e) => {
                            error!(worker = task.worker_index, "Failed to spawn worker: {}", e);
                            None
                        }
                    };
                    joined.unwrap_or_else(|| {
                        let err = UplinkError::WorkerPanicked(task.worker_index);
                        error!(worker = task.worker_index, category = %err.category(), "{}", err);
                        UploadOutcome::failed(task.worker_index, task.logical_filename(), &err)
                    })
                })
                .collect::<Vec<_>>()
        });

        let summary = RunSummary::from_outcomes(outcomes, started.elapsed());
        info!(
            successful = summary.successful,
            total = summary.total,
            "Run finished"
        );
        summary
    }
}

/// Upload `file_path` from `num_workers` TCP workers; returns (successes, total)
pub fn run(file_path: &Path, num_workers: usize, host: &str, port: u16) -> (usize, usize) {
    let summary =
        UploadOrchestrator::new().run(file_path, num_workers, &ServerAddress::new(host, port));
    (summary.successful, summary.total)
}
