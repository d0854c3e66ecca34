use crate::config::ClusteringParams;
use crate::error::ClusteringError;

/// Upper bound on `maxClusters`. One metric row is kept per candidate k, so
/// the range has to stay small enough to materialize.
pub const MAX_CLUSTERS_LIMIT: i64 = 1 << 20;

/// Checks cluster constraints before any distance work is done.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ConstraintValidator<'a> {
    params: &'a ClusteringParams,
}

impl<'a> ConstraintValidator<'a> {
    pub(crate) fn new(params: &'a ClusteringParams) -> Self {
        Self { params }
    }

    pub(crate) fn validate_params(&self) -> Result<(), ClusteringError> {
        let p = self.params;
        if p.min_clusters <= 0 {
            return Err(ClusteringError::InvalidParameter(format!(
                "minClusters must be positive, got {}",
                p.min_clusters
            )));
        }
        if p.max_clusters <= 0 {
            return Err(ClusteringError::InvalidParameter(format!(
                "maxClusters must be positive, got {}",
                p.max_clusters
            )));
        }
        if p.max_clusters > MAX_CLUSTERS_LIMIT {
            return Err(ClusteringError::InvalidParameter(format!(
                "maxClusters must not exceed {}, got {}",
                MAX_CLUSTERS_LIMIT, p.max_clusters
            )));
        }
        if p.min_clusters > p.max_clusters {
            return Err(ClusteringError::InvalidParameter(format!(
                "minClusters ({}) must not exceed maxClusters ({})",
                p.min_clusters, p.max_clusters
            )));
        }
        if p.min_cluster_size <= 0 {
            return Err(ClusteringError::InvalidParameter(format!(
                "minClusterSize must be positive, got {}",
                p.min_cluster_size
            )));
        }
        Ok(())
    }

    /// Describe why the constraints look unsatisfiable for `n_nodes` points,
    /// or None when they look satisfiable.
    pub(crate) fn feasibility_warning(&self, n_nodes: usize) -> Option<String> {
        let p = self.params;
        let n = n_nodes as i64;
        let mut findings = Vec::new();

        if n < p.min_clusters {
            findings.push(format!(
                "{} clusters cannot be formed from {} points",
                p.min_clusters, n
            ));
        }
        if n < p.min_cluster_size {
            findings.push(format!(
                "a cluster of at least {} points cannot be formed from {} points",
                p.min_cluster_size, n
            ));
        }
        let required = p.min_clusters.saturating_mul(p.min_cluster_size);
        if n < required {
            findings.push(format!(
                "{} clusters of at least {} points need {} points, but only {} are available",
                p.min_clusters, p.min_cluster_size, required, n
            ));
        }

        if findings.is_empty() {
            None
        } else {
            Some(format!("{}.", findings.join("; ")))
        }
    }
}

/// Reject non-positive or inverted parameters
pub fn validate_params(params: &ClusteringParams) -> Result<(), ClusteringError> {
    ConstraintValidator::new(params).validate_params()
}

/// Warn when `unique_node_count` points cannot satisfy `params`.
/// Never fails: the search still runs and reports its best effort.
pub fn validate_feasibility(unique_node_count: usize, params: &ClusteringParams) -> Option<String> {
    ConstraintValidator::new(params).feasibility_warning(unique_node_count)
}
