//! Bounded fire-and-forget execution for distributed cache writes.

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;

use crate::metrics;

/// Runs detached write tasks with a cap on how many may be in flight.
///
/// Submission never waits: when every permit is taken the write is dropped
/// and counted. A dropped write only costs a future cache miss.
#[derive(Clone)]
pub struct BackgroundWriter {
    permits: Arc<Semaphore>,
    max_in_flight: usize,
}

impl BackgroundWriter {
    pub fn new(max_in_flight: usize) -> Self {
        let max_in_flight = max_in_flight.max(1);
        Self {
            permits: Arc::new(Semaphore::new(max_in_flight)),
            max_in_flight,
        }
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight
    }

    /// Number of writes currently running.
    pub fn in_flight(&self) -> usize {
        self.max_in_flight - self.permits.available_permits()
    }

    /// Spawn `write` if a slot is free. Returns `false` if it was dropped.
    pub fn submit<F, E>(&self, label: &'static str, write: F) -> bool
    where
        F: Future<Output = Result<(), E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        let permit = match Arc::clone(&self.permits).try_acquire_owned() {
            Ok(permit) => permit,
            Err(_) => {
                tracing::warn!(
                    label,
                    max_in_flight = self.max_in_flight,
                    "background write queue full, dropping write"
                );
                metrics::record_background_dropped(label);
                return false;
            }
        };

        tokio::spawn(async move {
            let _permit = permit;
            if let Err(e) = write.await {
                tracing::warn!(label, error = %e, "background cache write failed");
                metrics::record_background_failed(label);
            }
        });
        true
    }

    /// Wait until every submitted write has finished.
    ///
    /// Writes submitted while flushing may or may not be waited for.
    pub async fn flush(&self) {
        let all = u32::try_from(self.max_in_flight).unwrap_or(u32::MAX);
        if let Ok(permits) = self.permits.acquire_many(all).await {
            drop(permits);
        }
    }
}

impl Default for BackgroundWriter {
    fn default() -> Self {
        Self::new(64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_submit_runs_and_flush_waits() {
        let writer = BackgroundWriter::new(4);
        let done = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let done = done.clone();
            assert!(writer.submit("test", async move {
                tokio::time::sleep(Duration::from_millis(10)).await;
                done.fetch_add(1, Ordering::SeqCst);
                Ok::<_, String>(())
            }));
        }

        writer.flush().await;
        assert_eq!(done.load(Ordering::SeqCst), 3);
        assert_eq!(writer.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_full_writer_drops() {
        let writer = BackgroundWriter::new(1);
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();

        assert!(writer.submit("blocker", async move {
            let _ = rx.await;
            Ok::<_, String>(())
        }));
        assert_eq!(writer.in_flight(), 1);

        let ran = Arc::new(AtomicUsize::new(0));
        let ran_clone = ran.clone();
        let accepted = writer.submit("dropped", async move {
            ran_clone.fetch_add(1, Ordering::SeqCst);
            Ok::<_, String>(())
        });
        assert!(!accepted);

        tx.send(()).unwrap();
        writer.flush().await;
        assert_eq!(ran.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failed_write_releases_permit() {
        let writer = BackgroundWriter::new(1);

        assert!(writer.submit("failing", async { Err::<(), _>("boom") }));
        writer.flush().await;

        assert_eq!(writer.in_flight(), 0);
        assert!(writer.submit("next", async { Ok::<(), String>(()) }));
        writer.flush().await;
    }
}
