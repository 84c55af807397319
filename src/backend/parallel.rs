//! Rayon Backend
//!
//! Scores rows in parallel on a dedicated rayon thread pool.

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuildError, ThreadPoolBuilder};

use crate::error::BackendError;
use crate::vector::{check_shape, magnitude, score_range, EmbeddingMatrix};

/// Rows handed to a rayon task at minimum
const MIN_ROWS_PER_TASK: usize = 64;

/// Upper bound on tasks per pool thread
const TASKS_PER_THREAD: usize = 4;

/// Data-parallel scoring backend
pub struct RayonBackend {
    pool: ThreadPool,
}

impl RayonBackend {
    /// Build a pool with `threads` workers (0 = one per CPU)
    pub fn new(threads: usize) -> Result<Self, ThreadPoolBuildError> {
        let threads = if threads == 0 { num_cpus::get() } else { threads };
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("semsearch-rayon-{}", i))
            .build()?;
        Ok(Self { pool })
    }

    /// Number of threads in the pool
    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    pub fn cosine_scores(
        &self,
        query: &[f32],
        matrix: &EmbeddingMatrix,
    ) -> Result<Vec<f32>, BackendError> {
        check_shape(query, matrix)?;
        let query_norm = magnitude(query);

        let max_parts = self.threads() * TASKS_PER_THREAD;
        let parts = (matrix.rows() / MIN_ROWS_PER_TASK).clamp(1, max_parts);
        let partials: Vec<Vec<f32>> = self.pool.install(|| {
            matrix
                .partition(parts)
                .into_par_iter()
                .map(|rows| score_range(query, query_norm, matrix, rows))
                .collect()
        });
        Ok(partials.concat())
    }
}

impl std::fmt::Debug for RayonBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RayonBackend")
            .field("threads", &self.threads())
            .finish()
    }
}
