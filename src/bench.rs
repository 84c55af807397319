//! Search Benchmarks
//!
//! Timed search runs per backend over synthetic corpora.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::{Duration, Instant};

use crate::backend::Backend;
use crate::corpus::{KnowledgeBase, KnowledgeChunk};
use crate::error::Result;
use crate::retriever::SemanticRetriever;
use crate::vector::normalize_vector;

/// Random unit vector of `dim` components
pub fn random_unit_vector(rng: &mut impl Rng, dim: usize) -> Vec<f32> {
    let mut v: Vec<f32> = (0..dim).map(|_| rng.gen_range(-1.0f32..1.0)).collect();
    normalize_vector(&mut v);
    v
}

/// Knowledge base of `num_chunks` normalized random embeddings, plus a
/// normalized random query. The same seed yields the same corpus.
///
/// Fails with [`crate::Error::EmptyEmbedding`] when `dim` is 0 and `num_chunks` is not.
pub fn synthetic_corpus(
    num_chunks: usize,
    dim: usize,
    seed: u64,
) -> Result<(KnowledgeBase, Vec<f32>)> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut kb = KnowledgeBase::new("Benchmark KB")
        .with_description("Knowledge base for benchmarking");

    for i in 0..num_chunks {
        let chunk = KnowledgeChunk::new(
            format!("Test content {}", i),
            format!("test_source_{}.txt", i / 100),
        )
        .with_embedding(random_unit_vector(&mut rng, dim));
        kb.add_chunk(chunk)?;
    }

    let query = random_unit_vector(&mut rng, dim);
    Ok((kb, query))
}

/// Latency statistics for a benchmark run
#[derive(Debug, Clone)]
pub struct BenchmarkStats {
    pub completed: u64,
    pub duration: Duration,
    pub avg_latency: Duration,
    pub p99_latency: Duration,
    pub searches_per_sec: f64,
}

impl BenchmarkStats {
    pub fn from_latencies(latencies: &[Duration], duration: Duration) -> Self {
        if latencies.is_empty() {
            return Self {
                completed: 0,
                duration,
                avg_latency: Duration::ZERO,
                p99_latency: Duration::ZERO,
                searches_per_sec: 0.0,
            };
        }
        let mut sorted = latencies.to_vec();
        sorted.sort();
        let sum: Duration = latencies.iter().sum();
        let avg = sum / latencies.len() as u32;
        let p99_idx = (latencies.len() as f64 * 0.99) as usize;
        let secs = duration.as_secs_f64();
        Self {
            completed: latencies.len() as u64,
            duration,
            avg_latency: avg,
            p99_latency: sorted[p99_idx.min(sorted.len() - 1)],
            searches_per_sec: if secs > 0.0 { latencies.len() as f64 / secs } else { 0.0 },
        }
    }

    pub fn report(&self) -> String {
        format!(
            "Completed: {}, Searches/s: {:.0}, Avg: {:.3}ms, P99: {:.3}ms",
            self.completed,
            self.searches_per_sec,
            self.avg_latency.as_secs_f64() * 1000.0,
            self.p99_latency.as_secs_f64() * 1000.0
        )
    }
}

/// Result of benchmarking one backend preference
#[derive(Debug, Clone)]
pub struct BenchmarkResult {
    pub name: String,
    /// Backend that served the timed searches
    pub backend: Backend,
    pub stats: BenchmarkStats,
}

impl BenchmarkResult {
    pub fn report(&self) -> String {
        format!("{} [{}]: {}", self.name, self.backend, self.stats.report())
    }
}

/// Repeated searches with warmup
pub struct Benchmark {
    name: String,
    warmup: u64,
    iterations: u64,
    top_k: usize,
}

impl Benchmark {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            warmup: 2,
            iterations: 5,
            top_k: 3,
        }
    }

    pub fn warmup(mut self, n: u64) -> Self {
        self.warmup = n;
        self
    }

    pub fn iterations(mut self, n: u64) -> Self {
        self.iterations = n;
        self
    }

    pub fn top_k(mut self, k: usize) -> Self {
        self.top_k = k;
        self
    }

    /// Time `iterations` searches on `preference` after `warmup` untimed ones
    pub fn run(
        &self,
        retriever: &SemanticRetriever,
        query: &[f32],
        preference: Option<&str>,
    ) -> Result<BenchmarkResult> {
        let mut backend = Backend::Cpu;
        for _ in 0..self.warmup {
            backend = retriever.semantic_search(query, self.top_k, -1.0, preference)?.backend;
        }

        let start = Instant::now();
        let mut latencies = Vec::with_capacity(self.iterations as usize);
        for _ in 0..self.iterations {
            let t = Instant::now();
            backend = retriever.semantic_search(query, self.top_k, -1.0, preference)?.backend;
            latencies.push(t.elapsed());
        }

        Ok(BenchmarkResult {
            name: self.name.clone(),
            backend,
            stats: BenchmarkStats::from_latencies(&latencies, start.elapsed()),
        })
    }
}
