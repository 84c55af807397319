//! Backend Selector
//!
//! Picks a backend for each search and runs the kernel with fallback.

use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

use super::{Backend, CpuBackend, RayonBackend, ScoringPool};
use crate::error::BackendError;
use crate::retriever::RetrieverConfig;
use crate::vector::EmbeddingMatrix;

/// Availability report for one backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackendStatus {
    pub backend: Backend,
    pub available: bool,
    /// Threads the backend scores on
    pub workers: usize,
    /// Why the backend is unavailable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Scores produced by a kernel run
#[derive(Debug, Clone)]
pub struct Scored {
    pub scores: Vec<f32>,
    /// Backend that actually produced the scores
    pub backend: Backend,
    /// Backends that failed before `backend` succeeded
    pub fallbacks: usize,
}

/// Chooses and runs scoring backends
#[derive(Debug)]
pub struct BackendSelector {
    priority: Vec<Backend>,
    cpu: CpuBackend,
    rayon: Option<RayonBackend>,
    pool: Option<ScoringPool>,
}

impl BackendSelector {
    /// Build every backend the config enables. Backends that fail to start
    /// are left out and reported as unavailable.
    pub fn new(config: &RetrieverConfig) -> Self {
        let rayon = match RayonBackend::new(config.rayon_threads) {
            Ok(backend) => Some(backend),
            Err(e) => {
                debug!(error = %e, "Rayon backend unavailable");
                None
            }
        };

        let pool = config.pool_config().and_then(|pool_config| {
            match ScoringPool::start(pool_config) {
                Ok(pool) => Some(pool),
                Err(e) => {
                    debug!(error = %e, "Scoring pool unavailable");
                    None
                }
            }
        });

        Self {
            priority: config.effective_priority(),
            cpu: CpuBackend,
            rayon,
            pool,
        }
    }

    /// Selector with only the CPU backend
    pub fn cpu_only() -> Self {
        Self {
            priority: vec![Backend::Cpu],
            cpu: CpuBackend,
            rayon: None,
            pool: None,
        }
    }

    /// Probe order used for automatic selection
    pub fn priority(&self) -> &[Backend] {
        &self.priority
    }

    /// The scoring pool, when enabled
    pub fn pool(&self) -> Option<&ScoringPool> {
        self.pool.as_ref()
    }

    fn check(&self, backend: Backend) -> Result<usize, String> {
        match backend {
            Backend::Cpu => Ok(1),
            Backend::Rayon => match &self.rayon {
                None => Err("rayon thread pool could not be built".to_string()),
                Some(r) if r.threads() < 2 => Err("rayon pool has a single thread".to_string()),
                Some(r) => Ok(r.threads()),
            },
            Backend::Pool => match &self.pool {
                None => Err("scoring pool not configured".to_string()),
                Some(p) if !p.is_running() => Err("scoring pool is shut down".to_string()),
                Some(p) => Ok(p.live_workers()),
            },
        }
    }

    /// Whether `backend` can run right now
    pub fn is_available(&self, backend: Backend) -> bool {
        self.check(backend).is_ok()
    }

    /// Availability of every backend, in priority order followed by the rest
    pub fn probe(&self) -> Vec<BackendStatus> {
        let mut order = self.priority.clone();
        order.extend(Backend::PRIORITY.iter().filter(|b| !self.priority.contains(b)));

        order
            .into_iter()
            .map(|backend| match self.check(backend) {
                Ok(workers) => BackendStatus {
                    backend,
                    available: true,
                    workers,
                    reason: None,
                },
                Err(reason) => BackendStatus {
                    backend,
                    available: false,
                    workers: 0,
                    reason: Some(reason),
                },
            })
            .collect()
    }

    /// Choose a backend for a query.
    ///
    /// A known, available preference wins. Anything else (`None`, `"auto"`,
    /// an unknown name, an unavailable backend) probes the priority list.
    /// Never fails: `Cpu` is always available.
    pub fn select(&self, query: &[f32], preference: Option<&str>) -> Backend {
        let requested = preference
            .map(str::trim)
            .filter(|p| !p.is_empty() && !p.eq_ignore_ascii_case("auto"));

        if let Some(name) = requested {
            match name.parse::<Backend>() {
                Ok(backend) => match self.check(backend) {
                    Ok(_) => return backend,
                    Err(reason) => {
                        debug!(%backend, %reason, "Preferred backend unavailable, probing")
                    }
                },
                Err(e) => debug!(error = %e, "Ignoring backend preference"),
            }
        }

        self.auto_select(query)
    }

    fn auto_select(&self, query: &[f32]) -> Backend {
        for &backend in &self.priority {
            match self.check(backend) {
                Ok(_) => {
                    debug!(%backend, dim = query.len(), "Selected backend");
                    return backend;
                }
                Err(reason) => debug!(%backend, %reason, "Skipping backend"),
            }
        }
        Backend::Cpu
    }

    fn run(
        &self,
        backend: Backend,
        query: &[f32],
        matrix: &Arc<EmbeddingMatrix>,
    ) -> Result<Vec<f32>, BackendError> {
        let scores = match backend {
            Backend::Cpu => Ok(self.cpu.cosine_scores(query, matrix)),
            Backend::Rayon => self
                .rayon
                .as_ref()
                .ok_or(BackendError::Unavailable(Backend::Rayon))?
                .cosine_scores(query, matrix),
            Backend::Pool => self
                .pool
                .as_ref()
                .ok_or(BackendError::Unavailable(Backend::Pool))?
                .cosine_scores(query, matrix),
        }?;

        if scores.len() != matrix.rows() {
            return Err(BackendError::IncompleteScores {
                expected: matrix.rows(),
                actual: scores.len(),
            });
        }
        Ok(scores)
    }

    /// Score `matrix` on `backend`, falling back down the priority list if
    /// the backend fails. The CPU backend ends every fallback chain.
    pub fn score(&self, backend: Backend, query: &[f32], matrix: &Arc<EmbeddingMatrix>) -> Scored {
        let start = self
            .priority
            .iter()
            .position(|b| *b == backend)
            .map_or(0, |i| i + 1);
        let fallbacks = self.priority[start..]
            .iter()
            .copied()
            .filter(|b| *b != backend && self.is_available(*b));

        let mut failed = 0;
        for candidate in std::iter::once(backend).chain(fallbacks) {
            match self.run(candidate, query, matrix) {
                Ok(scores) => {
                    return Scored {
                        scores,
                        backend: candidate,
                        fallbacks: failed,
                    }
                }
                Err(e) => {
                    warn!(backend = %candidate, error = %e, "Scoring backend failed, falling back");
                    failed += 1;
                }
            }
        }

        Scored {
            scores: self.cpu.cosine_scores(query, matrix),
            backend: Backend::Cpu,
            fallbacks: failed,
        }
    }
}
