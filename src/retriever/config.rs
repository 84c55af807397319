//! Retriever Configuration

use crate::backend::{Backend, PoolConfig};

/// Retriever configuration
#[derive(Debug, Clone)]
pub struct RetrieverConfig {
    /// Results returned by `search` when no `top_k` is given
    pub default_top_k: usize,

    /// Threshold used by `search`
    pub default_score_threshold: f32,

    /// Scoring pool workers (0 = pool backend disabled)
    pub pool_workers: usize,

    /// Pin pool workers to CPU cores
    pub pin_to_cores: bool,

    /// Pool job queue capacity
    pub queue_capacity: usize,

    /// Rayon threads (0 = one per CPU)
    pub rayon_threads: usize,

    /// Probe order for automatic selection
    pub priority: Vec<Backend>,
}

impl Default for RetrieverConfig {
    fn default() -> Self {
        Self {
            default_top_k: 3,
            default_score_threshold: 0.0,
            pool_workers: 0,
            pin_to_cores: false,
            queue_capacity: 1024,
            rayon_threads: 0,
            priority: Backend::PRIORITY.to_vec(),
        }
    }
}

impl RetrieverConfig {
    /// Config whose only backend is the CPU fallback
    pub fn cpu_only() -> Self {
        Self::default()
            .with_rayon_threads(1)
            .with_priority(vec![Backend::Cpu])
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.default_top_k = top_k;
        self
    }

    pub fn with_score_threshold(mut self, threshold: f32) -> Self {
        self.default_score_threshold = threshold;
        self
    }

    /// Enable the worker pool backend with `workers` threads
    pub fn with_pool_workers(mut self, workers: usize) -> Self {
        self.pool_workers = workers;
        self
    }

    pub fn with_pin_to_cores(mut self, pin: bool) -> Self {
        self.pin_to_cores = pin;
        self
    }

    pub fn with_rayon_threads(mut self, threads: usize) -> Self {
        self.rayon_threads = threads;
        self
    }

    /// Set the probe order; `Cpu` is appended when missing
    pub fn with_priority(mut self, priority: Vec<Backend>) -> Self {
        self.priority = priority;
        self
    }

    /// Probe order with duplicates removed and `Cpu` guaranteed last-resort
    pub fn effective_priority(&self) -> Vec<Backend> {
        let mut order: Vec<Backend> = Vec::with_capacity(Backend::PRIORITY.len());
        for backend in &self.priority {
            if !order.contains(backend) {
                order.push(*backend);
            }
        }
        if !order.contains(&Backend::Cpu) {
            order.push(Backend::Cpu);
        }
        order
    }

    /// Worker pool settings, if the pool backend is enabled
    pub fn pool_config(&self) -> Option<PoolConfig> {
        (self.pool_workers > 0).then(|| PoolConfig {
            num_workers: self.pool_workers,
            pin_to_cores: self.pin_to_cores,
            queue_capacity: self.queue_capacity,
        })
    }
}
