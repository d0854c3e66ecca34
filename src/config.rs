use crate::algorithm::DEFAULT_MAX_ITERATIONS;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// User-supplied constraints on the clustering.
///
/// Fields are signed so that non-positive values coming from a document can
/// be reported instead of silently wrapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusteringParams {
    /// Smallest candidate cluster count
    pub min_clusters: i64,

    /// Largest candidate cluster count (inclusive)
    pub max_clusters: i64,

    /// Clusters with fewer members than this are discarded
    pub min_cluster_size: i64,
}

impl ClusteringParams {
    pub fn new(min_clusters: i64, max_clusters: i64, min_cluster_size: i64) -> Self {
        Self {
            min_clusters,
            max_clusters,
            min_cluster_size,
        }
    }
}

/// Configuration for the search engine
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Maximum number of local-search iterations per candidate k
    pub max_iterations: usize,

    /// Random seed for medoid initialization, lost-medoid recovery and refill.
    /// Each candidate k draws from its own stream of this seed.
    pub seed: u64,

    /// Number of worker threads for the per-k trials.
    /// Set to None to use rayon's global pool.
    pub n_threads: Option<usize>,

    /// Wall-clock budget for a whole search. Trials that have not finished
    /// when it expires are reported as not evaluated.
    pub timeout: Option<Duration>,

    /// Log per-trial and per-iteration progress at info level instead of debug
    pub verbose: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            seed: 0,
            n_threads: None,
            timeout: None,
            verbose: false,
        }
    }
}

impl SearchConfig {
    /// Create a new configuration with the specified seed
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            ..Default::default()
        }
    }

    /// Set the maximum number of iterations
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Set the random seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Bound the worker pool to `n_threads` threads
    pub fn with_n_threads(mut self, n_threads: Option<usize>) -> Self {
        self.n_threads = n_threads;
        self
    }

    /// Set the wall-clock budget
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set verbose mode
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}
