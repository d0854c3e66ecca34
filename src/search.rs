use crate::algorithm::{partition_with_cancel, Cluster, Partition};
use crate::cancel::CancelToken;
use crate::config::{ClusteringParams, SearchConfig};
use crate::distance::{DistanceOracle, UNKNOWN_DISTANCE};
use crate::error::ClusteringError;
use crate::validation::validate_params;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Serialize, Serializer};
use std::time::Instant;
use tracing::{debug, info};

/// Quality of the best partition found for one candidate cluster count
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterMetric {
    pub k: usize,

    /// Infinite when no cluster of this k met the minimum size; serialized as null
    #[serde(serialize_with = "serialize_distance")]
    pub total_intra_cluster_distance: f64,

    pub number_of_valid_clusters: usize,
}

impl ClusterMetric {
    fn infeasible(k: usize) -> Self {
        Self {
            k,
            total_intra_cluster_distance: UNKNOWN_DISTANCE,
            number_of_valid_clusters: 0,
        }
    }

    fn from_partition(k: usize, partition: &Partition) -> Self {
        Self {
            k,
            total_intra_cluster_distance: partition.total_intra_cluster_distance,
            number_of_valid_clusters: partition.clusters.len(),
        }
    }

    /// True when this k produced at least one valid cluster
    pub fn is_feasible(&self) -> bool {
        self.number_of_valid_clusters > 0 && self.total_intra_cluster_distance.is_finite()
    }
}

fn serialize_distance<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if value.is_finite() {
        serializer.serialize_f64(*value)
    } else {
        serializer.serialize_none()
    }
}

/// Result of searching a range of cluster counts
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome {
    pub chosen_clusters: Option<Vec<Cluster>>,
    pub chosen_k: Option<usize>,

    /// One row per candidate k, ascending
    pub all_metrics: Vec<ClusterMetric>,

    pub warning: Option<String>,
}

enum TrialOutcome {
    /// k is larger than the node set allows; no partition attempted
    Skipped,
    Cancelled,
    Ran(Partition),
}

struct Trial {
    k: usize,
    outcome: TrialOutcome,
}

impl Trial {
    fn metric(&self) -> ClusterMetric {
        match &self.outcome {
            TrialOutcome::Ran(partition) => ClusterMetric::from_partition(self.k, partition),
            TrialOutcome::Skipped | TrialOutcome::Cancelled => ClusterMetric::infeasible(self.k),
        }
    }
}

/// Partition the oracle's nodes for every k in the requested range and keep
/// the best result.
///
/// Trials run in parallel, each with its own generator seeded from
/// `config.seed` on stream `k`, so the outcome does not depend on the order
/// in which trials finish. The winner is the feasible k with the strictly
/// lowest total intra-cluster distance; ties go to the lower k.
pub fn search(
    oracle: &DistanceOracle,
    params: &ClusteringParams,
    config: &SearchConfig,
    cancel: &CancelToken,
) -> Result<SearchOutcome, ClusteringError> {
    validate_params(params)?;

    let min_k = to_usize(params.min_clusters, "minClusters")?;
    let max_k = to_usize(params.max_clusters, "maxClusters")?;
    let min_cluster_size = to_usize(params.min_cluster_size, "minClusterSize")?;

    let cancel = match config.timeout {
        Some(timeout) => cancel.with_timeout(timeout),
        None => cancel.clone(),
    };

    let start = Instant::now();
    if config.verbose {
        info!(
            n_nodes = oracle.len(),
            min_k, max_k, min_cluster_size, "Searching cluster counts"
        );
    }

    // Only k up to the node count can produce clusters; the rest are
    // filled in as skipped rows without touching the pool.
    let last_runnable = max_k.min(oracle.len());
    let ks: Vec<usize> = (min_k..=last_runnable).collect();
    let run_all = || -> Vec<Trial> {
        ks.par_iter()
            .map(|&k| run_trial(k, oracle, min_cluster_size, config, &cancel))
            .collect()
    };

    let mut trials = match config.n_threads {
        Some(n_threads) => rayon::ThreadPoolBuilder::new()
            .num_threads(n_threads)
            .build()
            .map_err(|e| ClusteringError::ThreadPool(e.to_string()))?
            .install(run_all),
        None => run_all(),
    };
    trials.extend(
        (min_k.max(last_runnable + 1)..=max_k).map(|k| Trial {
            k,
            outcome: TrialOutcome::Skipped,
        }),
    );

    let all_metrics: Vec<ClusterMetric> = trials.iter().map(Trial::metric).collect();

    let mut warnings = Vec::new();

    let cancelled: Vec<String> = trials
        .iter()
        .filter(|t| matches!(t.outcome, TrialOutcome::Cancelled))
        .map(|t| t.k.to_string())
        .collect();
    if !cancelled.is_empty() {
        warnings.push(format!(
            "Search was cancelled before k = {} could be evaluated.",
            cancelled.join(", ")
        ));
    }

    let best = select_best(&trials);

    let outcome = match best {
        None => {
            warnings.push(format!(
                "No valid clustering found for any k from {} to {} with a minimum cluster size of {}.",
                min_k, max_k, min_cluster_size
            ));
            SearchOutcome {
                chosen_clusters: None,
                chosen_k: None,
                all_metrics,
                warning: None,
            }
        }
        Some((k, partition)) => {
            if partition.clusters.len() < min_k {
                warnings.push(format!(
                    "Best solution (k = {}) has only {} clusters with at least {} members, \
                     fewer than the requested minimum of {}.",
                    k,
                    partition.clusters.len(),
                    min_cluster_size,
                    min_k
                ));
            }
            SearchOutcome {
                chosen_clusters: Some(partition.clusters.clone()),
                chosen_k: Some(k),
                all_metrics,
                warning: None,
            }
        }
    };

    let elapsed = start.elapsed().as_secs_f64();
    if config.verbose {
        info!(chosen_k = ?outcome.chosen_k, elapsed, "Search finished");
    } else {
        debug!(chosen_k = ?outcome.chosen_k, elapsed, "Search finished");
    }

    Ok(SearchOutcome {
        warning: join_warnings(warnings),
        ..outcome
    })
}

fn to_usize(value: i64, name: &str) -> Result<usize, ClusteringError> {
    usize::try_from(value).map_err(|_| {
        ClusteringError::InvalidParameter(format!(
            "{} ({}) does not fit this platform's address space",
            name, value
        ))
    })
}

fn run_trial(
    k: usize,
    oracle: &DistanceOracle,
    min_cluster_size: usize,
    config: &SearchConfig,
    cancel: &CancelToken,
) -> Trial {
    let n_nodes = oracle.len();
    let fits = k <= n_nodes
        && k.checked_mul(min_cluster_size)
            .is_some_and(|required| required <= n_nodes);

    if !fits {
        debug!(k, n_nodes, min_cluster_size, "Skipping infeasible k");
        return Trial {
            k,
            outcome: TrialOutcome::Skipped,
        };
    }

    if cancel.is_cancelled() {
        return Trial {
            k,
            outcome: TrialOutcome::Cancelled,
        };
    }

    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    rng.set_stream(k as u64);

    let trial_start = Instant::now();
    let partition = partition_with_cancel(
        k,
        oracle,
        min_cluster_size,
        config.max_iterations,
        &mut rng,
        cancel,
    );

    if partition.cancelled {
        return Trial {
            k,
            outcome: TrialOutcome::Cancelled,
        };
    }

    let elapsed = trial_start.elapsed().as_secs_f64();
    let total = partition.total_intra_cluster_distance;
    let valid = partition.clusters.len();
    let iterations = partition.n_iterations;
    if config.verbose {
        info!(k, total, valid, iterations, elapsed, "Trial finished");
    } else {
        debug!(k, total, valid, iterations, elapsed, "Trial finished");
    }

    Trial {
        k,
        outcome: TrialOutcome::Ran(partition),
    }
}

/// Walk trials in ascending k and keep the strictly lowest finite total
fn select_best(trials: &[Trial]) -> Option<(usize, &Partition)> {
    let mut best: Option<(usize, &Partition)> = None;
    for trial in trials {
        let TrialOutcome::Ran(partition) = &trial.outcome else {
            continue;
        };
        if !partition.is_feasible() || !partition.total_intra_cluster_distance.is_finite() {
            continue;
        }
        let better = match best {
            None => true,
            Some((_, current)) => {
                partition.total_intra_cluster_distance < current.total_intra_cluster_distance
            }
        };
        if better {
            best = Some((trial.k, partition));
        }
    }
    best
}

fn join_warnings(warnings: Vec<String>) -> Option<String> {
    if warnings.is_empty() {
        None
    } else {
        Some(warnings.join(" "))
    }
}
