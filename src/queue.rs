use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::sync::{Notify, oneshot};
use tokio_util::sync::CancellationToken;

use crate::verifier::{VerificationReport, VerifyError, VerifyRequest};

pub type JobResponder = oneshot::Sender<Result<VerificationReport, VerifyError>>;

/// A queued verification with the channel its result goes back on
pub struct VerifyJob {
    pub id: u64,
    pub request: VerifyRequest,
    pub cancel: CancellationToken,
    pub responder: JobResponder,
}

/// FIFO of pending verifications shared by the HTTP handlers and workers
pub struct JobQueue {
    queue: Mutex<VecDeque<VerifyJob>>,
    notify: Notify,
    next_id: AtomicU64,
}

impl Default for JobQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl JobQueue {
    pub fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            notify: Notify::new(),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    pub fn push(&self, job: VerifyJob) {
        self.queue.lock().push_back(job);
        self.notify.notify_one();
    }

    pub async fn pop(&self) -> VerifyJob {
        loop {
            // The guard must be gone before awaiting
            let (job, remaining) = {
                let mut queue = self.queue.lock();
                let job = queue.pop_front();
                (job, queue.len())
            };
            if let Some(job) = job {
                // Notify stores a single permit, so pass the wakeup on to the
                // next idle worker while jobs remain
                if remaining > 0 {
                    self.notify.notify_one();
                }
                return job;
            }
            self.notify.notified().await;
        }
    }

    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }

    /// Drops queued jobs whose requests were cancelled, returning how many
    pub fn purge_cancelled(&self) -> usize {
        let mut queue = self.queue.lock();
        let before_len = queue.len();
        queue.retain(|job| !job.cancel.is_cancelled());
        before_len - queue.len()
    }
}
