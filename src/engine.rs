use crate::algorithm::Cluster;
use crate::cancel::CancelToken;
use crate::config::{ClusteringParams, SearchConfig};
use crate::distance::DistanceOracle;
use crate::error::ClusteringError;
use crate::input::{parse_distance_matrix, validate_entries, DistanceEntry};
use crate::search::{search, ClusterMetric, SearchOutcome};
use crate::validation::{validate_feasibility, validate_params};
use serde::Serialize;
use tracing::{debug, warn};

/// Warning returned when the distance table has no entries
pub const NO_DATA_WARNING: &str = "no data";

/// Structured outcome of one clustering request.
///
/// Either `error` is set and nothing else is, or the remaining fields carry
/// a (possibly empty) best-effort result with an optional `warning`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusteringResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chosen_clusters: Option<Vec<Cluster>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub chosen_k: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub all_metrics: Option<Vec<ClusterMetric>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ClusteringResult {
    fn from_error(err: ClusteringError) -> Self {
        Self {
            error: Some(err.to_string()),
            ..Default::default()
        }
    }

    fn no_data() -> Self {
        Self {
            warning: Some(NO_DATA_WARNING.to_string()),
            ..Default::default()
        }
    }
}

impl From<SearchOutcome> for ClusteringResult {
    fn from(outcome: SearchOutcome) -> Self {
        Self {
            chosen_clusters: outcome.chosen_clusters,
            chosen_k: outcome.chosen_k,
            all_metrics: Some(outcome.all_metrics),
            warning: outcome.warning,
            error: None,
        }
    }
}

/// k-medoids clustering over a sparse distance table, choosing the cluster
/// count automatically.
///
/// # Example
///
/// ```
/// use kmedoids_search::{ClusteringParams, DistanceEntry, KMedoidsSearch};
///
/// let entries = vec![
///     DistanceEntry::new(0, 1, 1.0),
///     DistanceEntry::new(2, 3, 1.0),
///     DistanceEntry::new(0, 2, 9.0),
///     DistanceEntry::new(0, 3, 9.0),
///     DistanceEntry::new(1, 2, 9.0),
///     DistanceEntry::new(1, 3, 9.0),
/// ];
///
/// let engine = KMedoidsSearch::new();
/// let result = engine.cluster(&entries, &ClusteringParams::new(2, 2, 2));
///
/// assert_eq!(result.chosen_k, Some(2));
/// ```
#[derive(Debug, Clone, Default)]
pub struct KMedoidsSearch {
    config: SearchConfig,
}

impl KMedoidsSearch {
    /// Create an engine with the default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an engine with a custom configuration
    pub fn with_config(config: SearchConfig) -> Self {
        Self { config }
    }

    /// Typed entry point: validate, build the distance oracle and search.
    ///
    /// # Errors
    ///
    /// Returns `MalformedInput` when an entry has a negative or non-finite
    /// distance, and `InvalidParameter` when `params` are non-positive or
    /// inverted. Both are reported before any distance work is done.
    pub fn run(
        &self,
        entries: &[DistanceEntry],
        params: &ClusteringParams,
    ) -> Result<SearchOutcome, ClusteringError> {
        self.run_with_cancel(entries, params, &CancelToken::new())
    }

    /// Like [`run`](Self::run), stopping at the next checkpoint once
    /// `cancel` is cancelled. The token only affects this run.
    pub fn run_with_cancel(
        &self,
        entries: &[DistanceEntry],
        params: &ClusteringParams,
        cancel: &CancelToken,
    ) -> Result<SearchOutcome, ClusteringError> {
        validate_entries(entries)?;
        validate_params(params)?;

        let oracle = DistanceOracle::from_entries(entries);
        debug!(
            n_entries = entries.len(),
            n_nodes = oracle.len(),
            missing_pairs = oracle.missing_pairs(),
            "Built distance oracle"
        );

        let feasibility = validate_feasibility(oracle.len(), params);
        if let Some(message) = &feasibility {
            warn!("{}", message);
        }

        let outcome = search(&oracle, params, &self.config, cancel)?;

        let warning = match (feasibility, outcome.warning.clone()) {
            (Some(a), Some(b)) => Some(format!("{} {}", a, b)),
            (a, b) => a.or(b),
        };

        Ok(SearchOutcome { warning, ..outcome })
    }

    /// Cluster an already parsed distance table
    pub fn cluster(&self, entries: &[DistanceEntry], params: &ClusteringParams) -> ClusteringResult {
        self.cluster_with_cancel(entries, params, &CancelToken::new())
    }

    /// Like [`cluster`](Self::cluster) with a caller-owned cancellation token
    pub fn cluster_with_cancel(
        &self,
        entries: &[DistanceEntry],
        params: &ClusteringParams,
        cancel: &CancelToken,
    ) -> ClusteringResult {
        if entries.is_empty() {
            return ClusteringResult::no_data();
        }

        match self.run_with_cancel(entries, params, cancel) {
            Ok(outcome) => outcome.into(),
            Err(err) => {
                warn!(kind = err.kind(), "{}", err);
                ClusteringResult::from_error(err)
            }
        }
    }

    /// Cluster a distance-matrix JSON document
    pub fn cluster_document(&self, document: &str, params: &ClusteringParams) -> ClusteringResult {
        match parse_distance_matrix(document) {
            Ok(entries) => self.cluster(&entries, params),
            Err(err) => {
                warn!(kind = err.kind(), "{}", err);
                ClusteringResult::from_error(err)
            }
        }
    }

    /// Get the configuration.
    pub fn config(&self) -> &SearchConfig {
        &self.config
    }
}
