//! Fixed-size worker pool fed through a channel.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use crossbeam_channel::{unbounded, Receiver};
use log::{debug, error};

/// Shared stop flag, tripped once by the interrupt handler
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Runs one closure per work item on a fixed number of threads
#[derive(Debug, Clone, Copy)]
pub struct WorkerPool {
    threads: usize,
}

impl WorkerPool {
    pub fn new(threads: usize) -> Self {
        Self { threads }
    }

    pub fn threads(&self) -> usize {
        self.threads
    }

    /// Process every item; with one thread or fewer, in the calling thread and
    /// in order. Items not yet started when `token` trips are dropped.
    pub fn run<T, R, F>(&self, items: Vec<T>, token: &CancellationToken, work: F) -> Vec<R>
    where
        T: Send,
        R: Send,
        F: Fn(T) -> R + Sync,
    {
        if self.threads <= 1 {
            let mut results = Vec::with_capacity(items.len());
            for item in items {
                if token.is_cancelled() {
                    break;
                }
                results.push(work(item));
            }
            return results;
        }

        let (sender, receiver) = unbounded();
        for item in items {
            if sender.send(item).is_err() {
                break;
            }
        }
        drop(sender);
        self.run_stream(receiver, token, work)
    }

    /// Process items from `jobs` until the channel is closed and drained, or
    /// `token` trips. Results arrive in completion order.
    pub fn run_stream<T, R, F>(&self, jobs: Receiver<T>, token: &CancellationToken, work: F) -> Vec<R>
    where
        T: Send,
        R: Send,
        F: Fn(T) -> R + Sync,
    {
        let (sender, results) = unbounded();
        let work = &work;
        thread::scope(|scope| {
            let mut spawned = 0;
            for worker in 0..self.threads.max(1) {
                let jobs = jobs.clone();
                let sender = sender.clone();
                let token = token.clone();
                let spawn = thread::Builder::new()
                    .name(format!("poreshrink-worker-{}", worker))
                    .spawn_scoped(scope, move || {
                        for job in jobs.iter() {
                            if token.is_cancelled() {
                                break;
                            }
                            if sender.send(work(job)).is_err() {
                                break;
                            }
                        }
                    });
                match spawn {
                    Ok(_) => spawned += 1,
                    Err(e) => error!("Failed to spawn worker {}: {}", worker, e),
                }
            }
            debug!("Started {} workers", spawned);
            if spawned == 0 {
                for job in jobs.iter() {
                    if token.is_cancelled() {
                        break;
                    }
                    let _ = sender.send(work(job));
                }
            }
            drop(sender);
            results.iter().collect()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_sequential_keeps_order() {
        let pool = WorkerPool::new(1);
        let results = pool.run(vec![1, 2, 3], &CancellationToken::new(), |x| x * 10);
        assert_eq!(results, vec![10, 20, 30]);
    }

    #[test]
    fn test_parallel_processes_everything() {
        let pool = WorkerPool::new(4);
        let mut results = pool.run((0..100).collect(), &CancellationToken::new(), |x: u32| x + 1);
        results.sort();
        assert_eq!(results, (1..101).collect::<Vec<_>>());
    }

    #[test]
    fn test_cancelled_token_stops_dispatch() {
        let token = CancellationToken::new();
        token.cancel();
        let calls = AtomicUsize::new(0);
        for threads in [1, 3] {
            let results = WorkerPool::new(threads).run(vec![1, 2, 3], &token, |x| {
                calls.fetch_add(1, Ordering::SeqCst);
                x
            });
            assert!(results.is_empty());
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_stream_runs_until_closed() {
        let (sender, receiver) = unbounded();
        let producer = thread::spawn(move || {
            for i in 0..10 {
                sender.send(i).unwrap();
            }
        });
        let results = WorkerPool::new(2).run_stream(receiver, &CancellationToken::new(), |x: i32| x * 2);
        producer.join().unwrap();
        assert_eq!(results.iter().sum::<i32>(), 90);
    }
}
