//! SEMSEARCH Benchmark Binary
//!
//! Builds a synthetic knowledge base and compares search latency across
//! every available scoring backend.

use anyhow::Context;
use clap::Parser;
use semsearch::bench::{synthetic_corpus, Benchmark};
use semsearch::{Backend, RetrieverConfig, SemanticRetriever};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

/// SEMSEARCH Bench - Backend Comparison
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Number of chunks in the synthetic knowledge base
    #[arg(short, long, default_value_t = 1000)]
    chunks: usize,

    /// Embedding dimension
    #[arg(short, long, default_value_t = 768)]
    dim: usize,

    /// Results per search
    #[arg(short = 'k', long, default_value_t = 3)]
    top_k: usize,

    /// Untimed searches before measuring
    #[arg(long, default_value_t = 2)]
    warmup: u64,

    /// Timed searches per backend
    #[arg(short, long, default_value_t = 5)]
    repeat: u64,

    /// Scoring pool workers (0 = disable the pool backend)
    #[arg(long, default_value_t = num_cpus::get())]
    pool_workers: usize,

    /// Rayon threads (0 = auto-detect based on CPU cores)
    #[arg(long, default_value_t = 0)]
    rayon_threads: usize,

    /// Pin pool workers to CPU cores
    #[arg(long, default_value_t = false)]
    pin: bool,

    /// Only benchmark this backend (cpu, numpy, rayon, pool, auto)
    #[arg(short, long)]
    backend: Option<String>,

    /// Seed for the synthetic corpus
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Abort a backend run that takes longer than this many milliseconds
    #[arg(long, default_value_t = 30_000)]
    timeout_ms: u64,

    /// Print one search outcome as JSON after the comparison
    #[arg(long, default_value_t = false)]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("semsearch=info".parse()?))
        .init();

    let args = Args::parse();
    if args.chunks == 0 || args.dim == 0 {
        anyhow::bail!("--chunks and --dim must be positive");
    }
    if args.top_k == 0 {
        anyhow::bail!("--top-k must be positive");
    }

    let config = RetrieverConfig::default()
        .with_top_k(args.top_k)
        .with_pool_workers(args.pool_workers)
        .with_rayon_threads(args.rayon_threads)
        .with_pin_to_cores(args.pin);

    info!(
        "Building synthetic knowledge base: {} chunks x {} dims (seed {})",
        args.chunks, args.dim, args.seed
    );
    let (kb, query) = synthetic_corpus(args.chunks, args.dim, args.seed)
        .context("failed to build synthetic knowledge base")?;
    let retriever = Arc::new(SemanticRetriever::with_config(kb.into_shared(), config));
    let query: Arc<[f32]> = query.into();

    println!("Backends:");
    for status in retriever.selector().probe() {
        match &status.reason {
            None => println!("  {:<6} available ({} workers)", status.backend, status.workers),
            Some(reason) => println!("  {:<6} unavailable: {}", status.backend, reason),
        }
    }

    let preferences: Vec<String> = match &args.backend {
        Some(name) => vec![name.clone()],
        None => Backend::PRIORITY
            .iter()
            .filter(|b| retriever.selector().is_available(**b))
            .map(|b| b.to_string())
            .collect(),
    };

    println!("\nBackend Performance Comparison (lower is better):");
    let timeout = Duration::from_millis(args.timeout_ms);
    for preference in preferences {
        let retriever = retriever.clone();
        let query = query.clone();
        let bench = Benchmark::new(&preference)
            .warmup(args.warmup)
            .iterations(args.repeat)
            .top_k(args.top_k);

        let task = tokio::task::spawn_blocking(move || {
            bench.run(&retriever, &query, Some(preference.as_str()))
        });

        match tokio::time::timeout(timeout, task).await {
            Ok(joined) => {
                let result = joined.context("benchmark task panicked")??;
                println!("  {}", result.report());
            }
            Err(_) => warn!("Benchmark exceeded {}ms, skipping", args.timeout_ms),
        }
    }

    if args.json {
        let outcome = retriever.semantic_search(&query, args.top_k, -1.0, args.backend.as_deref())?;
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    }

    println!("\n{}", retriever.metrics().summary());
    Ok(())
}
