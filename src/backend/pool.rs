//! Scoring Worker Pool
//!
//! Resident worker threads, optionally pinned to CPU cores, that score
//! row ranges sent over a bounded crossbeam queue.

use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::Mutex;
use std::ops::Range;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};

use crate::error::BackendError;
use crate::vector::{check_shape, magnitude, score_range, EmbeddingMatrix};

/// Worker pool configuration
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Number of worker threads (0 = auto-detect)
    pub num_workers: usize,
    /// Whether to pin workers to CPU cores
    pub pin_to_cores: bool,
    /// Job queue capacity
    pub queue_capacity: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            num_workers: num_cpus::get(),
            pin_to_cores: false,
            queue_capacity: 1024,
        }
    }
}

/// A range of rows to score, sent to one worker
struct ScoreJob {
    part: usize,
    rows: Range<usize>,
    query: Arc<[f32]>,
    query_norm: f64,
    matrix: Arc<EmbeddingMatrix>,
    response_tx: Sender<ScoreReply>,
}

/// Worker reply for one job
struct ScoreReply {
    part: usize,
    scores: Result<Vec<f32>, BackendError>,
}

/// Decrements the live-worker count when a worker exits, panicking or not
struct LiveGuard(Arc<AtomicUsize>);

impl Drop for LiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Resident scoring pool
pub struct ScoringPool {
    sender: Mutex<Option<Sender<ScoreJob>>>,
    handles: Mutex<Vec<JoinHandle<()>>>,
    live: Arc<AtomicUsize>,
    num_workers: usize,
}

impl ScoringPool {
    /// Spawn the worker threads
    pub fn start(config: PoolConfig) -> std::io::Result<Self> {
        let num_workers = if config.num_workers == 0 {
            num_cpus::get()
        } else {
            config.num_workers
        };

        info!("Starting {} scoring workers", num_workers);

        let core_ids = if config.pin_to_cores {
            core_affinity::get_core_ids().unwrap_or_default()
        } else {
            Vec::new()
        };

        let (sender, receiver) = channel::bounded(config.queue_capacity.max(1));
        let live = Arc::new(AtomicUsize::new(0));
        let mut handles = Vec::with_capacity(num_workers);

        for i in 0..num_workers {
            let worker_rx = receiver.clone();
            let core_id = core_ids.get(i).copied();
            let guard = LiveGuard(live.clone());
            live.fetch_add(1, Ordering::SeqCst);

            let spawned = thread::Builder::new()
                .name(format!("semsearch-worker-{}", i))
                .spawn(move || {
                    let _guard = guard;
                    // Pin to core if configured
                    if let Some(core) = core_id {
                        if core_affinity::set_for_current(core) {
                            debug!("Worker {} pinned to core {:?}", i, core);
                        }
                    }
                    debug!("Worker {} started", i);
                    Self::worker_loop(i, worker_rx);
                    debug!("Worker {} stopped", i);
                });

            match spawned {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    // Closing both queue ends stops the workers already spawned.
                    drop(sender);
                    drop(receiver);
                    for handle in handles {
                        let _ = handle.join();
                    }
                    return Err(e);
                }
            }
        }

        Ok(Self {
            sender: Mutex::new(Some(sender)),
            handles: Mutex::new(handles),
            live,
            num_workers,
        })
    }

    /// Worker main loop
    fn worker_loop(worker_id: usize, receiver: Receiver<ScoreJob>) {
        while let Ok(job) = receiver.recv() {
            let ScoreJob {
                part,
                rows,
                query,
                query_norm,
                matrix,
                response_tx,
            } = job;

            let scores = panic::catch_unwind(AssertUnwindSafe(|| {
                score_range(&query, query_norm, &matrix, rows)
            }))
            .map_err(|_| BackendError::WorkerPanicked(worker_id));

            if response_tx.send(ScoreReply { part, scores }).is_err() {
                debug!("Worker {}: reply channel closed", worker_id);
            }
        }
    }

    /// Score every row of `matrix`, split across the workers
    pub fn cosine_scores(
        &self,
        query: &[f32],
        matrix: &Arc<EmbeddingMatrix>,
    ) -> Result<Vec<f32>, BackendError> {
        check_shape(query, matrix)?;
        let sender = self.sender.lock().clone().ok_or(BackendError::Disconnected)?;

        let query: Arc<[f32]> = Arc::from(query);
        let query_norm = magnitude(&query);
        let ranges = matrix.partition(self.num_workers);
        let parts = ranges.len();

        let (reply_tx, reply_rx) = channel::bounded(parts.max(1));
        for (part, rows) in ranges.into_iter().enumerate() {
            let job = ScoreJob {
                part,
                rows,
                query: query.clone(),
                query_norm,
                matrix: matrix.clone(),
                response_tx: reply_tx.clone(),
            };
            sender.send(job).map_err(|_| BackendError::Disconnected)?;
        }
        drop(reply_tx);

        let mut partials: Vec<Option<Vec<f32>>> = vec![None; parts];
        let mut received = 0;
        while received < parts {
            let reply = reply_rx.recv().map_err(|_| BackendError::IncompleteScores {
                expected: matrix.rows(),
                actual: partials.iter().flatten().map(Vec::len).sum(),
            })?;
            partials[reply.part] = Some(reply.scores?);
            received += 1;
        }

        Ok(partials.into_iter().flatten().flatten().collect())
    }

    /// Configured worker count
    pub fn num_workers(&self) -> usize {
        self.num_workers
    }

    /// Workers still running
    pub fn live_workers(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    /// Whether the pool accepts jobs and has at least one live worker
    pub fn is_running(&self) -> bool {
        self.sender.lock().is_some() && self.live_workers() > 0
    }

    /// Close the job queue and wait for the workers to exit
    pub fn shutdown(&self) {
        if self.sender.lock().take().is_none() {
            return;
        }
        let handles: Vec<_> = self.handles.lock().drain(..).collect();
        for handle in handles {
            if handle.join().is_err() {
                warn!("Scoring worker exited with a panic");
            }
        }
        info!("Scoring pool stopped");
    }
}

impl Drop for ScoringPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for ScoringPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScoringPool")
            .field("num_workers", &self.num_workers)
            .field("live_workers", &self.live_workers())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::CpuBackend;

    fn pool(workers: usize) -> ScoringPool {
        ScoringPool::start(PoolConfig {
            num_workers: workers,
            pin_to_cores: false,
            queue_capacity: 16,
        })
        .unwrap()
    }

    fn matrix(rows: usize) -> Arc<EmbeddingMatrix> {
        let rows: Vec<Vec<f32>> = (0..rows)
            .map(|i| (0..8).map(|j| ((i + 1) * (j + 2) % 13) as f32 - 6.0).collect())
            .collect();
        Arc::new(EmbeddingMatrix::from_rows(&rows).unwrap())
    }

    #[test]
    fn test_matches_cpu_in_row_order() {
        let pool = pool(3);
        let m = matrix(101);
        let query = [0.5, -1.0, 2.0, 0.0, 1.0, 1.0, -0.5, 3.0];

        let scores = pool.cosine_scores(&query, &m).unwrap();
        assert_eq!(scores, CpuBackend.cosine_scores(&query, &m));
    }

    #[test]
    fn test_fewer_rows_than_workers() {
        let pool = pool(4);
        let m = matrix(2);
        let scores = pool.cosine_scores(&[1.0; 8], &m).unwrap();
        assert_eq!(scores.len(), 2);
    }

    #[test]
    fn test_shutdown() {
        let pool = pool(2);
        assert!(pool.is_running());
        assert_eq!(pool.live_workers(), 2);

        pool.shutdown();
        assert!(!pool.is_running());
        assert_eq!(pool.live_workers(), 0);
        assert!(matches!(
            pool.cosine_scores(&[1.0; 8], &matrix(4)),
            Err(BackendError::Disconnected)
        ));

        // Idempotent
        pool.shutdown();
    }

    #[test]
    fn test_workers_exit_on_drop() {
        let pool = pool(4);
        let live = pool.live.clone();
        assert_eq!(live.load(Ordering::SeqCst), 4);
        assert!(pool.cosine_scores(&[1.0; 8], &matrix(40)).is_ok());

        drop(pool);
        assert_eq!(live.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_zero_norm_rows_and_query() {
        let pool = pool(2);
        let m = Arc::new(
            EmbeddingMatrix::from_rows(&[vec![1.0, 0.0], vec![0.0, 0.0], vec![0.0, 1.0]]).unwrap(),
        );
        assert_eq!(pool.cosine_scores(&[1.0, 0.0], &m).unwrap(), vec![1.0, 0.0, 0.0]);
        assert_eq!(pool.cosine_scores(&[0.0, 0.0], &m).unwrap(), vec![0.0; 3]);
    }
}
