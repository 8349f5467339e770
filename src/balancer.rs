//! Purpose: Round-robin job assignment and a channel-fed worker pool.
//! Exports: `Assignment`, `round_robin`, `WorkerPool`.
//! Role: Demonstration machine driven by the `rspl balance` command.
//! Invariants: `seq` starts at 1 and increases by one per job; workers cycle in order.
//! Invariants: `WorkerPool::finish` returns handler results ordered by `seq`.
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Sender, bounded};
use serde::Serialize;

use crate::combinators;
use crate::error::{Error, ErrorKind};
use crate::processor::StreamProcessor;

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Assignment<T> {
    pub seq: u64,
    pub worker: usize,
    pub job: T,
}

/// Assign each input job to the next worker in turn.
pub fn round_robin<'a, T: 'a>(workers: NonZeroUsize) -> StreamProcessor<'a, T, Assignment<T>> {
    let workers = workers.get() as u64;
    combinators::scan(0u64, move |seq, job| {
        let seq = seq + 1;
        let worker = ((seq - 1) % workers) as usize;
        (seq, Assignment { seq, worker, job })
    })
}

/// Worker threads, each draining its own bounded channel of assignments.
pub struct WorkerPool<T, R> {
    senders: Vec<Sender<Assignment<T>>>,
    handles: Vec<JoinHandle<Vec<(u64, R)>>>,
}

impl<T, R> WorkerPool<T, R>
where
    T: Send + 'static,
    R: Send + 'static,
{
    pub fn spawn<H>(
        workers: NonZeroUsize,
        capacity: NonZeroUsize,
        handler: H,
    ) -> Result<Self, Error>
    where
        H: Fn(Assignment<T>) -> R + Send + Sync + 'static,
    {
        let handler = Arc::new(handler);
        let mut senders = Vec::with_capacity(workers.get());
        let mut handles = Vec::with_capacity(workers.get());

        for worker in 0..workers.get() {
            let (tx, rx) = bounded::<Assignment<T>>(capacity.get());
            let handler = Arc::clone(&handler);
            let handle = thread::Builder::new()
                .name(format!("rspl-worker-{worker}"))
                .spawn(move || {
                    let mut results = Vec::new();
                    for assignment in rx.iter() {
                        let seq = assignment.seq;
                        tracing::debug!(worker, seq, "job started");
                        results.push((seq, handler(assignment)));
                    }
                    results
                })
                .map_err(|err| {
                    Error::new(ErrorKind::Io)
                        .with_message("failed to spawn worker thread")
                        .with_source(err)
                })?;
            senders.push(tx);
            handles.push(handle);
        }

        Ok(Self { senders, handles })
    }

    pub fn workers(&self) -> usize {
        self.senders.len()
    }

    /// Hand `assignment` to the worker it names. Blocks while that worker's channel is full.
    pub fn submit(&self, assignment: Assignment<T>) -> Result<(), Error> {
        let worker = assignment.worker;
        let sender = self.senders.get(worker).ok_or_else(|| {
            Error::new(ErrorKind::Usage).with_message(format!(
                "no worker {worker} (pool has {})",
                self.senders.len()
            ))
        })?;
        sender.send(assignment).map_err(|_| {
            Error::new(ErrorKind::Internal).with_message(format!("worker {worker} has stopped"))
        })
    }

    /// Close all channels, wait for the workers, and collect results in `seq` order.
    pub fn finish(self) -> Result<Vec<R>, Error> {
        drop(self.senders);
        let mut results = Vec::new();
        for (worker, handle) in self.handles.into_iter().enumerate() {
            let part = handle.join().map_err(|_| {
                Error::new(ErrorKind::Internal).with_message(format!("worker {worker} panicked"))
            })?;
            results.extend(part);
        }
        results.sort_by_key(|(seq, _)| *seq);
        Ok(results.into_iter().map(|(_, result)| result).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::streams::{InfiniteList, Stream};

    fn nz(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).expect("non-zero")
    }

    #[test]
    fn round_robin_cycles_workers() {
        let jobs = InfiniteList::iterate('a', |c| (*c as u8 + 1) as char);
        let out = round_robin(nz(3)).eval(jobs).expect("eval");
        let assignments = out.take(5).expect("take");
        let workers: Vec<_> = assignments.iter().map(|a| a.worker).collect();
        let seqs: Vec<_> = assignments.iter().map(|a| a.seq).collect();
        assert_eq!(workers, vec![0, 1, 2, 0, 1]);
        assert_eq!(seqs, vec![1, 2, 3, 4, 5]);
        assert_eq!(assignments[4].job, 'e');
    }

    #[test]
    fn single_worker_gets_everything() {
        let out = round_robin(nz(1))
            .eval(InfiniteList::constant(()))
            .expect("eval");
        assert!(out.take(4).expect("take").iter().all(|a| a.worker == 0));
    }

    #[test]
    fn pool_returns_results_in_seq_order() {
        let pool = WorkerPool::spawn(nz(3), nz(2), |assignment: Assignment<u64>| {
            (assignment.worker, assignment.job * 10)
        })
        .expect("spawn");
        assert_eq!(pool.workers(), 3);

        let jobs = InfiniteList::iterate(1u64, |n| n + 1);
        let assignments = round_robin(nz(3)).eval(jobs).expect("eval");
        for assignment in assignments.take(7).expect("take") {
            pool.submit(assignment).expect("submit");
        }

        let results = pool.finish().expect("finish");
        assert_eq!(
            results,
            vec![(0, 10), (1, 20), (2, 30), (0, 40), (1, 50), (2, 60), (0, 70)]
        );
    }

    #[test]
    fn submit_to_unknown_worker_is_usage_error() {
        let pool = WorkerPool::spawn(nz(2), nz(1), |assignment: Assignment<()>| assignment.seq)
            .expect("spawn");
        let err = pool
            .submit(Assignment {
                seq: 1,
                worker: 5,
                job: (),
            })
            .expect_err("out of range");
        assert_eq!(err.kind(), ErrorKind::Usage);
        assert!(pool.finish().expect("finish").is_empty());
    }
}
