use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::queue::JobQueue;
use crate::verifier::{VerifyError, Verifier};

pub async fn worker(
    id: usize,
    verifier: Arc<Verifier>,
    queue: Arc<JobQueue>,
    token: CancellationToken,
) -> anyhow::Result<()> {
    log::info!("Worker {id} initialized");

    loop {
        tokio::select! {
            _ = token.cancelled() => {
                log::info!("Worker {id} received shutdown signal, stopping");
                break;
            }

            job = queue.pop() => {
                let job_id = job.id;

                // 1. Skip requests whose client already went away
                if job.cancel.is_cancelled() {
                    log::info!("Job {job_id} was cancelled while queued, skipped");
                    continue;
                }
                log::info!("Worker {id} got job {job_id} from queue");

                // 2. Verify, abandoning the run on shutdown
                let result = tokio::select! {
                    _ = token.cancelled() => {
                        job.cancel.cancel();
                        Err(VerifyError::Cancelled)
                    }
                    result = verifier.verify_request(&job.request, &job.cancel) => result,
                };

                match &result {
                    Ok(report) => log::info!(
                        "Job {job_id} finished on worker {id}: {}/{} passed",
                        report.passed,
                        report.total
                    ),
                    Err(VerifyError::Cancelled) => log::info!("Job {job_id} cancelled on worker {id}"),
                    Err(e) => log::warn!("Job {job_id} rejected on worker {id}: {e}"),
                }

                // 3. Hand the result back to the waiting handler
                if job.responder.send(result).is_err() {
                    log::warn!("Failed to send job {job_id} result back to server");
                } else {
                    log::debug!("Job {job_id} result sent back from worker {id}");
                }
            }
        };
    }

    log::info!("Worker {id} has shut down gracefully");
    Ok(())
}
