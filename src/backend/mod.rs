//! Scoring Backends
//!
//! Interchangeable engines that run the cosine kernel over an embedding
//! matrix, and the selector that chooses between them.
//!
//! | Backend | Identifier | Runs on |
//! |---------|------------|---------|
//! | `Pool`  | `pool`     | resident worker threads fed over crossbeam channels |
//! | `Rayon` | `rayon`    | dedicated rayon thread pool |
//! | `Cpu`   | `cpu`      | the calling thread, always available |

mod cpu;
mod parallel;
mod pool;
mod selector;

pub use cpu::CpuBackend;
pub use parallel::RayonBackend;
pub use pool::{PoolConfig, ScoringPool};
pub use selector::{BackendSelector, BackendStatus, Scored};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Scoring backend identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Resident worker pool
    Pool,
    /// Rayon work-stealing pool
    Rayon,
    /// Single-threaded unrolled loops, the guaranteed fallback
    Cpu,
}

impl Backend {
    /// Default probe order
    pub const PRIORITY: [Backend; 3] = [Backend::Pool, Backend::Rayon, Backend::Cpu];

    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Pool => "pool",
            Backend::Rayon => "rayon",
            Backend::Cpu => "cpu",
        }
    }

    /// Whether this backend offloads work from the calling thread
    pub fn is_accelerated(&self) -> bool {
        !matches!(self, Backend::Cpu)
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Backend name that matches no known backend
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown backend: {0}")]
pub struct UnknownBackend(pub String);

impl FromStr for Backend {
    type Err = UnknownBackend;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cpu" | "numpy" | "vectorized" => Ok(Backend::Cpu),
            "rayon" | "parallel" => Ok(Backend::Rayon),
            "pool" | "threads" => Ok(Backend::Pool),
            _ => Err(UnknownBackend(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_aliases() {
        assert_eq!("numpy".parse::<Backend>(), Ok(Backend::Cpu));
        assert_eq!("CPU".parse::<Backend>(), Ok(Backend::Cpu));
        assert_eq!(" rayon ".parse::<Backend>(), Ok(Backend::Rayon));
        assert_eq!("threads".parse::<Backend>(), Ok(Backend::Pool));
        assert_eq!("mlx".parse::<Backend>(), Err(UnknownBackend("mlx".to_string())));
    }

    #[test]
    fn test_display_round_trips_identifier() {
        for backend in Backend::PRIORITY {
            assert_eq!(backend.to_string().parse::<Backend>(), Ok(backend));
        }
        assert!(!Backend::Cpu.is_accelerated());
        assert!(Backend::Pool.is_accelerated());
    }
}
