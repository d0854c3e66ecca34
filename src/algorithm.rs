use crate::cancel::CancelToken;
use crate::distance::{DistanceOracle, UNKNOWN_DISTANCE};
use crate::input::NodeId;
use rand::seq::SliceRandom;
use rand::Rng;
use rayon::prelude::*;
use serde::Serialize;
use tracing::debug;

/// Default cap on local-search iterations for a single candidate k
pub const DEFAULT_MAX_ITERATIONS: usize = 10;

/// A group of nodes sharing the same medoid
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cluster {
    /// Position of the cluster in its result, in ascending medoid order
    pub id: usize,

    /// Representative member
    #[serde(skip)]
    pub medoid: NodeId,

    /// Member ids, ascending
    pub members: Vec<NodeId>,
}

/// Outcome of one partitioning trial
#[derive(Debug, Clone, PartialEq)]
pub struct Partition {
    /// Clusters that met the minimum size; empty when the trial is infeasible
    pub clusters: Vec<Cluster>,

    /// Final medoid ids, ascending; empty when the trial was abandoned
    pub medoids: Vec<NodeId>,

    /// Sum over surviving clusters of the distance from the medoid to every
    /// other member, or [`UNKNOWN_DISTANCE`] when nothing survived
    pub total_intra_cluster_distance: f64,

    /// Local-search iterations run before convergence, cancellation or the cap
    pub n_iterations: usize,

    /// The trial stopped at a cancellation checkpoint
    pub cancelled: bool,
}

impl Partition {
    fn infeasible(n_iterations: usize) -> Self {
        Self {
            clusters: Vec::new(),
            medoids: Vec::new(),
            total_intra_cluster_distance: UNKNOWN_DISTANCE,
            n_iterations,
            cancelled: false,
        }
    }

    fn cancelled(n_iterations: usize) -> Self {
        Self {
            cancelled: true,
            ..Self::infeasible(n_iterations)
        }
    }

    /// True when at least one cluster met the minimum size
    pub fn is_feasible(&self) -> bool {
        !self.clusters.is_empty()
    }
}

/// Partition every node of `oracle` around `k` medoids.
///
/// See [`partition_with_cancel`]; this variant never stops early.
pub fn partition<R: Rng + ?Sized>(
    k: usize,
    oracle: &DistanceOracle,
    min_cluster_size: usize,
    max_iterations: usize,
    rng: &mut R,
) -> Partition {
    partition_with_cancel(
        k,
        oracle,
        min_cluster_size,
        max_iterations,
        rng,
        &CancelToken::new(),
    )
}

/// Medoid-based local search for a fixed cluster count.
///
/// Starting from `k` random medoids, alternates nearest-medoid assignment
/// with a per-cluster medoid update until the medoid set stops changing or
/// `max_iterations` is reached. Clusters smaller than `min_cluster_size` are
/// dropped from the result; their members are not redistributed.
///
/// All randomness (initial medoids, recovery of medoids whose cluster went
/// empty, refill after deduplication) is drawn from `rng`, so a seeded
/// generator makes the trial reproducible. `cancel` is polled once per
/// iteration.
pub fn partition_with_cancel<R: Rng + ?Sized>(
    k: usize,
    oracle: &DistanceOracle,
    min_cluster_size: usize,
    max_iterations: usize,
    rng: &mut R,
    cancel: &CancelToken,
) -> Partition {
    let n_nodes = oracle.len();

    if k == 0 || k > n_nodes {
        return Partition::infeasible(0);
    }

    let mut medoids = initialize_medoids(n_nodes, k, rng);
    if medoids.len() < k {
        return Partition::infeasible(0);
    }

    let mut n_iterations = 0;

    for iteration in 0..max_iterations {
        if cancel.is_cancelled() {
            debug!(k, iteration, "partition cancelled");
            return Partition::cancelled(iteration);
        }
        n_iterations = iteration + 1;

        let assignment = assign_to_medoids(oracle, &medoids);
        let groups = group_by_medoid(&assignment, medoids.len());

        let Some((next_medoids, recovered)) = next_medoid_set(oracle, &groups, k, rng) else {
            debug!(k, iteration, "unable to refill medoid set, abandoning trial");
            return Partition::infeasible(n_iterations);
        };

        let converged = next_medoids == medoids;
        medoids = next_medoids;

        debug!(k, iteration = iteration + 1, recovered, converged, "partition iteration");

        if converged {
            break;
        }
    }

    let assignment = assign_to_medoids(oracle, &medoids);
    let groups = group_by_medoid(&assignment, medoids.len());

    let mut clusters = Vec::new();
    let mut total_intra_cluster_distance = 0.0;

    for (&medoid, group) in medoids.iter().zip(&groups) {
        if group.is_empty() || group.len() < min_cluster_size {
            continue;
        }

        total_intra_cluster_distance += group
            .iter()
            .filter(|&&member| member != medoid)
            .map(|&member| oracle.distance_by_rank(medoid, member))
            .sum::<f64>();

        clusters.push(Cluster {
            id: clusters.len(),
            medoid: oracle.node_at(medoid),
            members: group.iter().map(|&rank| oracle.node_at(rank)).collect(),
        });
    }

    if clusters.is_empty() {
        return Partition::infeasible(n_iterations);
    }

    Partition {
        clusters,
        medoids: medoids.iter().map(|&rank| oracle.node_at(rank)).collect(),
        total_intra_cluster_distance,
        n_iterations,
        cancelled: false,
    }
}

/// Draw `k` distinct ranks uniformly at random, returned ascending
fn initialize_medoids<R: Rng + ?Sized>(n_nodes: usize, k: usize, rng: &mut R) -> Vec<usize> {
    let ranks: Vec<usize> = (0..n_nodes).collect();
    let mut selected: Vec<usize> = ranks.choose_multiple(rng, k).cloned().collect();
    selected.sort_unstable();
    selected
}

/// Index (into `medoids`) of the nearest medoid for every node.
///
/// `medoids` must be ascending, which makes the strict comparison prefer the
/// lower identifier on ties. Nodes with no known distance to any medoid are
/// left unassigned.
fn assign_to_medoids(oracle: &DistanceOracle, medoids: &[usize]) -> Vec<Option<usize>> {
    (0..oracle.len())
        .into_par_iter()
        .map(|node| {
            let mut best = None;
            let mut best_dist = UNKNOWN_DISTANCE;
            for (idx, &medoid) in medoids.iter().enumerate() {
                let dist = oracle.distance_by_rank(node, medoid);
                if dist < best_dist {
                    best_dist = dist;
                    best = Some(idx);
                }
            }
            best
        })
        .collect()
}

/// Medoid update for one iteration: the best member of every non-empty
/// group, a random node for every empty one, then deduplicated and refilled
/// up to `k`. Returns the sorted set and the number of recovered medoids, or
/// None when `k` distinct medoids cannot be formed.
fn next_medoid_set<R: Rng + ?Sized>(
    oracle: &DistanceOracle,
    groups: &[Vec<usize>],
    k: usize,
    rng: &mut R,
) -> Option<(Vec<usize>, usize)> {
    let n_nodes = oracle.len();
    let mut medoids = Vec::with_capacity(k);
    let mut recovered = 0;

    for group in groups {
        if group.is_empty() {
            // Lost medoid: replace from the full node set
            medoids.push(rng.gen_range(0..n_nodes));
            recovered += 1;
        } else {
            medoids.push(best_medoid(oracle, group));
        }
    }

    medoids.sort_unstable();
    medoids.dedup();

    if refill_medoids(&mut medoids, n_nodes, k, rng) {
        Some((medoids, recovered))
    } else {
        None
    }
}

/// Member ranks of each medoid's cluster, each list ascending
fn group_by_medoid(assignment: &[Option<usize>], n_medoids: usize) -> Vec<Vec<usize>> {
    let mut groups = vec![Vec::new(); n_medoids];
    for (node, label) in assignment.iter().enumerate() {
        if let Some(idx) = label {
            groups[*idx].push(node);
        }
    }
    groups
}

/// Member minimizing the summed distance to the rest of its cluster.
/// `members` must be non-empty and ascending; ties go to the lower id.
fn best_medoid(oracle: &DistanceOracle, members: &[usize]) -> usize {
    let cost = |candidate: usize| -> f64 {
        members
            .iter()
            .map(|&other| oracle.distance_by_rank(candidate, other))
            .sum()
    };

    let mut best = members[0];
    let mut best_cost = cost(best);
    for &candidate in &members[1..] {
        let candidate_cost = cost(candidate);
        if candidate_cost < best_cost {
            best = candidate;
            best_cost = candidate_cost;
        }
    }
    best
}

/// Top `medoids` (sorted, distinct) back up to `k` with random unused ranks.
/// Returns false when the node set cannot supply enough of them.
fn refill_medoids<R: Rng + ?Sized>(
    medoids: &mut Vec<usize>,
    n_nodes: usize,
    k: usize,
    rng: &mut R,
) -> bool {
    if medoids.len() >= k {
        return true;
    }

    let unused: Vec<usize> = (0..n_nodes)
        .filter(|rank| medoids.binary_search(rank).is_err())
        .collect();
    let needed = k - medoids.len();
    if unused.len() < needed {
        return false;
    }

    medoids.extend(unused.choose_multiple(rng, needed).cloned());
    medoids.sort_unstable();
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::DistanceEntry;
    use approx::assert_relative_eq;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    /// {0,1} and {2,3} close together, the two pairs far apart
    fn two_pairs() -> DistanceOracle {
        DistanceOracle::from_entries(&[
            DistanceEntry::new(0, 1, 1.0),
            DistanceEntry::new(2, 3, 1.0),
            DistanceEntry::new(0, 2, 10.0),
            DistanceEntry::new(0, 3, 10.0),
            DistanceEntry::new(1, 2, 10.0),
            DistanceEntry::new(1, 3, 10.0),
        ])
    }

    #[test]
    fn test_infeasible_k() {
        let oracle = two_pairs();
        let mut rng = ChaCha8Rng::seed_from_u64(42);

        for k in [0, 5] {
            let result = partition(k, &oracle, 1, DEFAULT_MAX_ITERATIONS, &mut rng);
            assert!(result.clusters.is_empty());
            assert_eq!(result.total_intra_cluster_distance, UNKNOWN_DISTANCE);
            assert_eq!(result.n_iterations, 0);
        }
    }

    #[test]
    fn test_two_pairs_found_for_every_seed() {
        let oracle = two_pairs();

        for seed in 0..20 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let result = partition(2, &oracle, 2, DEFAULT_MAX_ITERATIONS, &mut rng);

            let members: Vec<Vec<NodeId>> =
                result.clusters.iter().map(|c| c.members.clone()).collect();
            assert_eq!(members, vec![vec![0, 1], vec![2, 3]], "seed {}", seed);
            assert_relative_eq!(result.total_intra_cluster_distance, 2.0);
            assert_eq!(result.medoids, vec![0, 2]);
        }
    }

    #[test]
    fn test_same_seed_same_partition() {
        let entries: Vec<DistanceEntry> = (0..12)
            .flat_map(|a| {
                (a + 1..12).map(move |b| DistanceEntry::new(a, b, ((a * 7 + b * 3) % 11) as f64))
            })
            .collect();
        let oracle = DistanceOracle::from_entries(&entries);

        let mut rng1 = ChaCha8Rng::seed_from_u64(9);
        let mut rng2 = ChaCha8Rng::seed_from_u64(9);
        let first = partition(3, &oracle, 1, DEFAULT_MAX_ITERATIONS, &mut rng1);
        let second = partition(3, &oracle, 1, DEFAULT_MAX_ITERATIONS, &mut rng2);

        assert_eq!(first, second);
    }

    #[test]
    fn test_small_clusters_are_dropped() {
        // Node 4 is far from everything
        let mut entries = vec![
            DistanceEntry::new(0, 1, 1.0),
            DistanceEntry::new(0, 2, 1.0),
            DistanceEntry::new(1, 2, 1.0),
        ];
        for a in 0..3 {
            entries.push(DistanceEntry::new(a, 4, 50.0));
        }
        let oracle = DistanceOracle::from_entries(&entries);

        for seed in 0..10 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let result = partition(2, &oracle, 2, DEFAULT_MAX_ITERATIONS, &mut rng);
            assert!(result.is_feasible());

            let mut seen = Vec::new();
            for cluster in &result.clusters {
                assert!(cluster.members.len() >= 2);
                seen.extend(cluster.members.iter().copied());
            }
            let total = seen.len();
            seen.sort_unstable();
            seen.dedup();
            assert_eq!(seen.len(), total, "clusters overlap for seed {}", seed);
        }
    }

    #[test]
    fn test_nothing_survives_min_size() {
        let oracle = two_pairs();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let result = partition(2, &oracle, 3, DEFAULT_MAX_ITERATIONS, &mut rng);

        assert!(!result.is_feasible());
        assert_eq!(result.total_intra_cluster_distance, UNKNOWN_DISTANCE);
    }

    #[test]
    fn test_unreachable_nodes_stay_unassigned() {
        let oracle = DistanceOracle::from_entries(&[
            DistanceEntry::new(0, 1, 1.0),
            DistanceEntry::new(2, 3, 1.0),
        ]);
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let result = partition(1, &oracle, 1, DEFAULT_MAX_ITERATIONS, &mut rng);

        assert_eq!(result.clusters.len(), 1);
        assert_eq!(result.clusters[0].members.len(), 2);
        assert!(result.total_intra_cluster_distance.is_finite());
    }

    #[test]
    fn test_assignment_ties_prefer_lower_id() {
        // Node 1 is equally far from medoids 0 and 2
        let oracle = DistanceOracle::from_entries(&[
            DistanceEntry::new(0, 1, 5.0),
            DistanceEntry::new(1, 2, 5.0),
            DistanceEntry::new(0, 2, 9.0),
        ]);
        let assignment = assign_to_medoids(&oracle, &[0, 2]);
        assert_eq!(assignment, vec![Some(0), Some(0), Some(1)]);
    }

    #[test]
    fn test_best_medoid_minimizes_summed_distance() {
        let oracle = DistanceOracle::from_entries(&[
            DistanceEntry::new(0, 1, 1.0),
            DistanceEntry::new(1, 2, 1.0),
            DistanceEntry::new(0, 2, 2.0),
        ]);
        assert_eq!(best_medoid(&oracle, &[0, 1, 2]), 1);
        assert_eq!(best_medoid(&oracle, &[0, 2]), 0);
    }

    #[test]
    fn test_refill_medoids() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);

        let mut medoids = vec![1];
        assert!(refill_medoids(&mut medoids, 4, 3, &mut rng));
        assert_eq!(medoids.len(), 3);
        assert!(medoids.windows(2).all(|w| w[0] < w[1]));
        assert!(medoids.contains(&1));

        let mut medoids = vec![0];
        assert!(!refill_medoids(&mut medoids, 2, 3, &mut rng));
    }

    /// {0,1} and {2,3} are duplicate points, the pairs far apart
    fn duplicate_pairs() -> DistanceOracle {
        DistanceOracle::from_entries(&[
            DistanceEntry::new(0, 1, 0.0),
            DistanceEntry::new(2, 3, 0.0),
            DistanceEntry::new(0, 2, 10.0),
            DistanceEntry::new(0, 3, 10.0),
            DistanceEntry::new(1, 2, 10.0),
            DistanceEntry::new(1, 3, 10.0),
        ])
    }

    #[test]
    fn test_duplicate_medoid_loses_its_cluster() {
        // Medoid 1 sits on top of medoid 0, which takes every tie
        let oracle = duplicate_pairs();
        let assignment = assign_to_medoids(&oracle, &[0, 1]);
        let groups = group_by_medoid(&assignment, 2);
        assert_eq!(groups, vec![vec![0, 1, 2, 3], vec![]]);
    }

    #[test]
    fn test_lost_medoid_is_recovered_and_refilled() {
        let oracle = duplicate_pairs();
        let groups = vec![vec![0, 1, 2, 3], vec![]];

        for seed in 0..20 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let (medoids, recovered) = next_medoid_set(&oracle, &groups, 2, &mut rng).unwrap();

            assert_eq!(recovered, 1);
            assert_eq!(medoids.len(), 2, "seed {}", seed);
            assert!(medoids.windows(2).all(|w| w[0] < w[1]));
            assert!(medoids.contains(&0));
        }
    }

    #[test]
    fn test_medoid_set_cannot_exceed_node_count() {
        let oracle = duplicate_pairs();
        let groups = vec![vec![0, 1, 2, 3], vec![], vec![], vec![], vec![]];
        let mut rng = ChaCha8Rng::seed_from_u64(0);

        assert!(next_medoid_set(&oracle, &groups, 5, &mut rng).is_none());
    }

    #[test]
    fn test_partition_with_duplicate_points() {
        let oracle = duplicate_pairs();
        let mut found_split = false;

        for seed in 0..20 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let result = partition(2, &oracle, 2, DEFAULT_MAX_ITERATIONS, &mut rng);

            assert!(result.is_feasible(), "seed {}", seed);
            assert_eq!(result.medoids.len(), 2);

            let mut seen: Vec<NodeId> = result
                .clusters
                .iter()
                .flat_map(|c| c.members.iter().copied())
                .collect();
            let total = seen.len();
            seen.sort_unstable();
            seen.dedup();
            assert_eq!(seen.len(), total);

            let members: Vec<Vec<NodeId>> =
                result.clusters.iter().map(|c| c.members.clone()).collect();
            if members == vec![vec![0, 1], vec![2, 3]] {
                assert_relative_eq!(result.total_intra_cluster_distance, 0.0);
                found_split = true;
            }
        }

        assert!(found_split);
    }

    #[test]
    fn test_cancelled_before_first_iteration() {
        let oracle = two_pairs();
        let token = CancelToken::new();
        token.cancel();
        let mut rng = ChaCha8Rng::seed_from_u64(0);

        let result = partition_with_cancel(2, &oracle, 1, DEFAULT_MAX_ITERATIONS, &mut rng, &token);
        assert!(result.cancelled);
        assert!(!result.is_feasible());
    }

    #[test]
    fn test_zero_iterations_uses_initial_medoids() {
        let oracle = two_pairs();
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let result = partition(4, &oracle, 1, 0, &mut rng);

        assert_eq!(result.clusters.len(), 4);
        assert_relative_eq!(result.total_intra_cluster_distance, 0.0);
    }
}
