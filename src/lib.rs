//! # kmedoids-search
//!
//! k-medoids clustering over a sparse pairwise distance table, with automatic
//! selection of the number of clusters.
//!
//! Items are only related through a list of `{from, to, distance}` entries.
//! For every candidate cluster count in a requested range the crate runs a
//! PAM-style medoid local search, drops clusters below a minimum size, and
//! keeps the candidate with the lowest total intra-cluster distance.
//!
//! ## Features
//!
//! - **Dense distance oracle**: node ids are ranked once and distances stored
//!   in an `ndarray` matrix; missing pairs are an explicit infinite sentinel
//! - **Parallel search**: candidate cluster counts run concurrently with rayon
//!   and are reduced in ascending k order
//! - **Reproducible**: all randomness comes from a seeded ChaCha generator,
//!   one stream per candidate k
//! - **Cooperative cancellation**: a [`CancelToken`] or a timeout stops the
//!   search between iterations
//!
//! ## Example
//!
//! ```rust
//! use kmedoids_search::{ClusteringParams, KMedoidsSearch, SearchConfig};
//!
//! let document = r#"[
//!     {"from": 0, "to": 1, "distance": 1.0},
//!     {"from": 2, "to": 3, "distance": 1.5},
//!     {"from": 0, "to": 2, "distance": 20.0},
//!     {"from": 1, "to": 3, "distance": 20.0}
//! ]"#;
//!
//! let engine = KMedoidsSearch::with_config(SearchConfig::new(42));
//! let result = engine.cluster_document(document, &ClusteringParams::new(1, 3, 2));
//!
//! assert!(result.error.is_none());
//! println!("{}", serde_json::to_string(&result).unwrap());
//! ```
//!
//! ## Scaling
//!
//! The oracle holds the full `n x n` matrix, so memory grows quadratically
//! with the number of distinct nodes.

mod algorithm;
mod cancel;
mod config;
mod distance;
mod engine;
mod error;
mod input;
mod search;
mod validation;

pub use algorithm::{partition, partition_with_cancel, Cluster, Partition, DEFAULT_MAX_ITERATIONS};
pub use cancel::CancelToken;
pub use config::{ClusteringParams, SearchConfig};
pub use distance::{DistanceOracle, UNKNOWN_DISTANCE};
pub use engine::{ClusteringResult, KMedoidsSearch, NO_DATA_WARNING};
pub use error::ClusteringError;
pub use input::{parse_distance_matrix, validate_entries, DistanceEntry, NodeId};
pub use search::{search, ClusterMetric, SearchOutcome};
pub use validation::{validate_feasibility, validate_params, MAX_CLUSTERS_LIMIT};
