//! Parallel consumption of a sequence.
//!
//! Pulling stays on the calling thread; only the consumer callback fans out,
//! onto a dedicated rayon pool of
//! `available_parallelism × config::worker_multiplier()` threads. Dispatch
//! never waits on the consumer: each element is queued on the pool as soon as
//! it is pulled, so the timeout bounds the wait for every queued call.

use crate::config;
use crate::error::{Result, SeqError};
use crate::sequence::Sequence;
use crossbeam_channel::{unbounded, RecvTimeoutError, Sender};
use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Outcome of [`Sequence::for_each_parallel`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ParallelReport {
    /// Elements pulled and handed to the pool
    pub submitted: usize,
    /// Consumer invocations that returned normally
    pub completed: usize,
    /// Consumer invocations that panicked
    pub failed: usize,
    /// The deadline passed before all work finished
    pub timed_out: bool,
}

impl ParallelReport {
    /// Work neither completed nor failed when the call returned.
    pub fn pending(&self) -> usize {
        self.submitted - self.completed - self.failed
    }
}

impl std::fmt::Display for ParallelReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Submitted: {}, Completed: {}, Failed: {}, Pending: {}, Timed out: {}",
            self.submitted,
            self.completed,
            self.failed,
            self.pending(),
            self.timed_out
        )
    }
}

/// Moved into a running task. Dropping it reports the outcome, including
/// when the consumer unwinds.
struct TaskSlot {
    done: Sender<bool>,
    ok: bool,
}

impl Drop for TaskSlot {
    fn drop(&mut self) {
        let _ = self.done.send(self.ok);
    }
}

impl<T: Send + 'static> Sequence<T> {
    /// Drain the sequence, running `consumer` on a worker pool.
    ///
    /// Blocks until every submitted invocation finished or `timeout` (counted
    /// from the end of dispatch) elapsed. On timeout the remaining work is
    /// abandoned, not cancelled: it keeps running in the background and the
    /// report says how much was pending. A panicking consumer is counted in
    /// [`ParallelReport::failed`].
    ///
    /// Invocations run in no particular order; `consumer` must synchronize any
    /// shared state itself.
    ///
    /// # Example
    ///
    /// ```
    /// use pullseq::Sequence;
    /// use std::sync::atomic::{AtomicU64, Ordering};
    /// use std::sync::Arc;
    ///
    /// let total = Arc::new(AtomicU64::new(0));
    /// let sink = Arc::clone(&total);
    /// let report = Sequence::from_iter(1..=100u64)
    ///     .for_each_parallel(move |n| { sink.fetch_add(n, Ordering::Relaxed); }, None)
    ///     .unwrap();
    /// assert_eq!(report.completed, 100);
    /// assert_eq!(total.load(Ordering::Relaxed), 5050);
    /// ```
    pub fn for_each_parallel<F>(
        self,
        consumer: F,
        timeout: Option<Duration>,
    ) -> Result<ParallelReport>
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        let workers = config::worker_pool_size();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("pullseq-worker-{}", i))
            .panic_handler(|_| tracing::warn!("parallel consumer panicked"))
            .build()
            .map_err(|e| SeqError::Io(io::Error::other(e)))?;

        let consumer = Arc::new(consumer);
        let (done_tx, done_rx) = unbounded::<bool>();
        let mut report = ParallelReport::default();

        for item in self {
            let consumer = Arc::clone(&consumer);
            let slot = TaskSlot {
                done: done_tx.clone(),
                ok: false,
            };
            pool.spawn(move || {
                // Bind the whole guard so it drops here, after the consumer.
                let mut slot = slot;
                consumer(item);
                slot.ok = true;
            });
            report.submitted += 1;
        }
        drop(done_tx);

        let deadline = timeout.map(|t| Instant::now() + t);
        while report.completed + report.failed < report.submitted {
            let outcome = match deadline {
                Some(deadline) => match done_rx.recv_deadline(deadline) {
                    Ok(ok) => ok,
                    Err(RecvTimeoutError::Timeout) => {
                        report.timed_out = true;
                        break;
                    }
                    Err(RecvTimeoutError::Disconnected) => break,
                },
                None => match done_rx.recv() {
                    Ok(ok) => ok,
                    Err(_) => break,
                },
            };
            if outcome {
                report.completed += 1;
            } else {
                report.failed += 1;
            }
        }

        if report.timed_out {
            tracing::warn!(
                pending = report.pending(),
                submitted = report.submitted,
                "parallel consumer timed out, abandoning pending work"
            );
        }
        // Dropping the pool lets queued work finish in the background.
        drop(pool);
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[test]
    fn test_every_element_consumed() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let report = Sequence::from_iter(0..200)
            .for_each_parallel(move |x| sink.lock().unwrap().push(x), None)
            .unwrap();

        assert_eq!(report.submitted, 200);
        assert_eq!(report.completed, 200);
        assert_eq!(report.pending(), 0);
        assert!(!report.timed_out);

        let mut seen = seen.lock().unwrap().clone();
        seen.sort();
        assert_eq!(seen, (0..200).collect::<Vec<_>>());
    }

    #[test]
    fn test_empty_sequence() {
        let report = Sequence::<u8>::empty()
            .for_each_parallel(|_| {}, Some(Duration::from_millis(10)))
            .unwrap();
        assert_eq!(report, ParallelReport::default());
    }

    #[test]
    fn test_timeout_reports_pending() {
        let report = Sequence::from_iter(0..4)
            .for_each_parallel(
                |_| std::thread::sleep(Duration::from_millis(500)),
                Some(Duration::from_millis(20)),
            )
            .unwrap();

        assert!(report.timed_out);
        assert_eq!(report.submitted, 4);
        assert!(report.pending() > 0);
    }

    #[test]
    fn test_returns_after_every_call_finished() {
        let finished = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&finished);
        let report = Sequence::from_iter(0..16)
            .for_each_parallel(
                move |_| {
                    std::thread::sleep(Duration::from_millis(20));
                    counter.fetch_add(1, Ordering::SeqCst);
                },
                None,
            )
            .unwrap();

        assert_eq!(finished.load(Ordering::SeqCst), 16);
        assert_eq!(report.completed, 16);
        assert_eq!(report.failed, 0);
    }

    #[test]
    fn test_timeout_bounds_backlog_larger_than_pool() {
        let n = config::worker_pool_size() * 2 + 5;
        let start = Instant::now();
        let report = Sequence::from_iter(0..n)
            .for_each_parallel(
                |_| std::thread::sleep(Duration::from_secs(2)),
                Some(Duration::from_millis(50)),
            )
            .unwrap();

        assert!(start.elapsed() < Duration::from_secs(1));
        assert!(report.timed_out);
        assert_eq!(report.submitted, n);
        assert!(report.pending() > 0);
    }

    #[test]
    fn test_panicking_consumer_counted() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let report = Sequence::from_iter(0..10)
            .for_each_parallel(
                move |x| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    if x == 3 {
                        panic!("bad element");
                    }
                },
                None,
            )
            .unwrap();

        assert_eq!(report.submitted, 10);
        assert_eq!(report.completed, 9);
        assert_eq!(report.failed, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 10);
    }

    #[test]
    fn test_report_display() {
        let report = ParallelReport {
            submitted: 3,
            completed: 2,
            failed: 0,
            timed_out: true,
        };
        assert_eq!(
            report.to_string(),
            "Submitted: 3, Completed: 2, Failed: 0, Pending: 1, Timed out: true"
        );
    }
}
