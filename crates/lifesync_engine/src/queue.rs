//! Bounded background queue for fire-and-forget remote work.

use std::fmt::Display;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

type Job = Pin<Box<dyn Future<Output = Result<(), String>> + Send>>;

enum Message {
    Job { label: String, job: Job },
    Flush(oneshot::Sender<()>),
}

#[derive(Debug, Default)]
struct Counters {
    submitted: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
    dropped: AtomicU64,
}

/// Snapshot of queue activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
    /// Jobs handed to [`BackgroundQueue::submit`].
    pub submitted: u64,
    /// Jobs that returned `Ok`.
    pub completed: u64,
    /// Jobs that returned `Err` or panicked.
    pub failed: u64,
    /// Jobs rejected because the queue was full or closed.
    pub dropped: u64,
}

impl QueueStats {
    /// Jobs submitted but not yet finished.
    pub fn in_flight(&self) -> u64 {
        self.submitted
            .saturating_sub(self.completed + self.failed + self.dropped)
    }
}

/// A bounded channel drained by one worker task.
///
/// Jobs run one at a time in submission order. A job's error is logged and
/// counted, never returned to whoever submitted it. When the channel is
/// full the job is dropped with a warning; the pending-push set and
/// tombstones make the next full sync pick the work up again.
///
/// [`BackgroundQueue::flush`] must not be awaited from inside a job.
#[derive(Clone)]
pub struct BackgroundQueue {
    sender: mpsc::Sender<Message>,
    counters: Arc<Counters>,
}

impl std::fmt::Debug for BackgroundQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackgroundQueue")
            .field("stats", &self.stats())
            .finish()
    }
}

impl BackgroundQueue {
    /// Spawns the worker on the current tokio runtime.
    pub fn start(capacity: usize) -> Self {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let counters = Arc::new(Counters::default());
        tokio::spawn(run_worker(receiver, Arc::clone(&counters)));
        Self { sender, counters }
    }

    /// Queues `job` under `label`. Returns false if the job was dropped.
    pub fn submit<F, E>(&self, label: impl Into<String>, job: F) -> bool
    where
        F: Future<Output = Result<(), E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        let label = label.into();
        self.counters.submitted.fetch_add(1, Ordering::SeqCst);
        let job: Job = Box::pin(async move { job.await.map_err(|e| e.to_string()) });
        match self.sender.try_send(Message::Job { label, job }) {
            Ok(()) => true,
            Err(err) => {
                self.counters.dropped.fetch_add(1, Ordering::SeqCst);
                let (reason, label) = match err {
                    mpsc::error::TrySendError::Full(Message::Job { label, .. }) => ("full", label),
                    mpsc::error::TrySendError::Closed(Message::Job { label, .. }) => {
                        ("closed", label)
                    }
                    _ => ("unavailable", String::new()),
                };
                tracing::warn!(job = %label, reason, "background queue rejected job");
                false
            }
        }
    }

    /// Waits until every job submitted so far, and every job those jobs
    /// submitted, has finished.
    pub async fn flush(&self) {
        loop {
            let (tx, rx) = oneshot::channel();
            if self.sender.send(Message::Flush(tx)).await.is_err() {
                return;
            }
            if rx.await.is_err() {
                return;
            }
            if self.stats().in_flight() == 0 {
                return;
            }
        }
    }

    /// Returns a snapshot of the counters.
    pub fn stats(&self) -> QueueStats {
        QueueStats {
            submitted: self.counters.submitted.load(Ordering::SeqCst),
            completed: self.counters.completed.load(Ordering::SeqCst),
            failed: self.counters.failed.load(Ordering::SeqCst),
            dropped: self.counters.dropped.load(Ordering::SeqCst),
        }
    }
}

async fn run_worker(mut receiver: mpsc::Receiver<Message>, counters: Arc<Counters>) {
    while let Some(message) = receiver.recv().await {
        match message {
            Message::Job { label, job } => match tokio::spawn(job).await {
                Ok(Ok(())) => {
                    counters.completed.fetch_add(1, Ordering::SeqCst);
                    tracing::trace!(job = %label, "background job completed");
                }
                Ok(Err(error)) => {
                    counters.failed.fetch_add(1, Ordering::SeqCst);
                    tracing::warn!(job = %label, %error, "background job failed");
                }
                Err(join) => {
                    counters.failed.fetch_add(1, Ordering::SeqCst);
                    tracing::warn!(job = %label, error = %join, "background job panicked");
                }
            },
            Message::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
    tracing::debug!("background queue closed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[tokio::test]
    async fn runs_jobs_in_order() {
        let queue = BackgroundQueue::start(8);
        let seen = Arc::new(Mutex::new(Vec::new()));
        for i in 0..5 {
            let seen = Arc::clone(&seen);
            queue.submit(format!("job{i}"), async move {
                seen.lock().push(i);
                Ok::<(), String>(())
            });
        }
        queue.flush().await;
        assert_eq!(*seen.lock(), vec![0, 1, 2, 3, 4]);
        assert_eq!(queue.stats().completed, 5);
    }

    #[tokio::test]
    async fn failures_are_counted_not_returned() {
        let queue = BackgroundQueue::start(8);
        assert!(queue.submit("bad", async { Err::<(), _>("remote down") }));
        assert!(queue.submit("panics", async {
            if true {
                panic!("boom");
            }
            Ok::<(), String>(())
        }));
        queue.flush().await;
        let stats = queue.stats();
        assert_eq!(stats.failed, 2);
        assert_eq!(stats.in_flight(), 0);
    }

    #[tokio::test]
    async fn full_queue_drops_jobs() {
        let queue = BackgroundQueue::start(1);
        let (release_tx, release_rx) = oneshot::channel::<()>();
        let (started_tx, started_rx) = oneshot::channel::<()>();
        queue.submit("blocker", async move {
            let _ = started_tx.send(());
            let _ = release_rx.await;
            Ok::<(), String>(())
        });
        started_rx.await.unwrap();

        assert!(queue.submit("fills", async { Ok::<(), String>(()) }));
        assert!(!queue.submit("overflow", async { Ok::<(), String>(()) }));

        release_tx.send(()).unwrap();
        queue.flush().await;
        let stats = queue.stats();
        assert_eq!(stats.dropped, 1);
        assert_eq!(stats.completed, 2);
    }

    #[tokio::test]
    async fn flush_waits_for_nested_jobs() {
        let queue = BackgroundQueue::start(8);
        let hits = Arc::new(AtomicU64::new(0));
        let inner_queue = queue.clone();
        let inner_hits = Arc::clone(&hits);
        queue.submit("outer", async move {
            inner_queue.submit("inner", async move {
                inner_hits.fetch_add(1, Ordering::SeqCst);
                Ok::<(), String>(())
            });
            Ok::<(), String>(())
        });
        queue.flush().await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
