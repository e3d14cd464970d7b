//! Bounded worker pool that grows the trees of one fold.
//!
//! Every job is queued before the workers start and nothing is queued
//! afterwards. Workers pop jobs until the queue is empty and send each
//! finished tree back over a channel; the caller drains exactly one result
//! per job.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, mpsc::channel};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use crate::dataset::{Row, Schema};
use crate::error::ForestError;
use crate::forest::bootstrap_sample;
use crate::tree::{DecisionTree, TreeParams};

/// One tree to grow: its position in the fold and its private seed.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TreeJob {
    pub(crate) job: usize,
    pub(crate) seed: u64,
}

/// Data shared read-only by every job of a fold.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TreeTask<'a> {
    pub(crate) rows: &'a [Row],
    pub(crate) train: &'a [usize],
    pub(crate) schema: Schema,
    pub(crate) params: TreeParams,
    pub(crate) draw_count: usize,
}

impl TreeTask<'_> {
    fn run(&self, job: TreeJob) -> Result<DecisionTree, ForestError> {
        let mut rng = ChaCha8Rng::seed_from_u64(job.seed);
        let sample = bootstrap_sample(self.train, self.draw_count, &mut rng);
        DecisionTree::grow(self.rows, &sample, self.schema, &self.params, &mut rng)
    }
}

/// Number of workers for one fold's pool.
///
/// Defaults to `max(2, cores / n_folds)`; always capped at the job count.
pub(crate) fn worker_count(n_folds: usize, n_jobs: usize, requested: Option<usize>) -> usize {
    let count = requested.unwrap_or_else(|| {
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        (cores / n_folds.max(1)).max(2)
    });
    count.min(n_jobs).max(1)
}

/// Grow one tree per job and return them in job order.
///
/// # Errors
///
/// Returns the first tree build error, or [`ForestError::WorkerPool`] when
/// the workers stop before every job has reported.
pub(crate) fn grow_trees(
    fold: usize,
    jobs: Vec<TreeJob>,
    workers: usize,
    task: TreeTask<'_>,
) -> Result<Vec<DecisionTree>, ForestError> {
    let n_jobs = jobs.len();
    debug!(fold, n_jobs, workers, "starting tree pool");

    let queue = Arc::new(Mutex::new(VecDeque::from(jobs)));
    let (tx, rx) = channel::<(usize, Result<DecisionTree, ForestError>)>();

    std::thread::scope(|scope| {
        for _ in 0..workers {
            let queue = Arc::clone(&queue);
            let tx = tx.clone();
            scope.spawn(move || {
                loop {
                    let job = {
                        let Ok(mut guard) = queue.lock() else {
                            return;
                        };
                        guard.pop_front()
                    };
                    let Some(job) = job else {
                        break;
                    };
                    if tx.send((job.job, task.run(job))).is_err() {
                        return;
                    }
                }
            });
        }
        drop(tx);

        let mut slots: Vec<Option<DecisionTree>> = vec![None; n_jobs];
        for received in 0..n_jobs {
            let outcome = match rx.recv() {
                Ok((job, Ok(tree))) => {
                    slots[job] = Some(tree);
                    Ok(())
                }
                Ok((_, Err(err))) => Err(err),
                Err(_) => Err(ForestError::WorkerPool {
                    fold,
                    reason: format!("workers stopped after {received} of {n_jobs} trees"),
                }),
            };
            if let Err(err) = outcome {
                // Let the remaining workers exit after their current job.
                if let Ok(mut guard) = queue.lock() {
                    guard.clear();
                }
                return Err(err);
            }
        }

        slots
            .into_iter()
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| ForestError::WorkerPool {
                fold,
                reason: "a job reported more than once".to_string(),
            })
    })
}
