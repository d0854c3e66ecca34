//! Binary for clustering a distance-matrix document from the command line
//!
//! Reads a JSON array of `{from, to, distance}` entries, searches the given
//! range of cluster counts and prints the result as JSON on stdout.
//! Set `RUST_LOG=debug` for per-trial progress on stderr.
//!
//! Usage: `cluster-matrix <matrix.json> <min_clusters> <max_clusters> <min_cluster_size> [seed]`

use kmedoids_search::{ClusteringParams, KMedoidsSearch, SearchConfig};
use std::env;
use std::fs;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();

    if args.len() != 5 && args.len() != 6 {
        eprintln!(
            "Usage: {} <matrix.json> <min_clusters> <max_clusters> <min_cluster_size> [seed]",
            args[0]
        );
        std::process::exit(1);
    }

    let input_path = &args[1];
    let min_clusters: i64 = args[2].parse()?;
    let max_clusters: i64 = args[3].parse()?;
    let min_cluster_size: i64 = args[4].parse()?;
    let seed: u64 = match args.get(5) {
        Some(seed) => seed.parse()?,
        None => 0,
    };

    let document = fs::read_to_string(input_path)?;

    let params = ClusteringParams::new(min_clusters, max_clusters, min_cluster_size);
    let engine = KMedoidsSearch::with_config(SearchConfig::new(seed));
    let result = engine.cluster_document(&document, &params);

    println!("{}", serde_json::to_string_pretty(&result)?);

    if result.error.is_some() {
        std::process::exit(1);
    }

    Ok(())
}
