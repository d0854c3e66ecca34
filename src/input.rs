use crate::error::ClusteringError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Identifier of a node in the distance table
pub type NodeId = i64;

/// One record of the distance-matrix document: an unordered pair of nodes and
/// the non-negative distance between them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DistanceEntry {
    pub from: NodeId,
    pub to: NodeId,
    pub distance: f64,
}

impl DistanceEntry {
    pub fn new(from: NodeId, to: NodeId, distance: f64) -> Self {
        Self { from, to, distance }
    }
}

/// Parse and validate a distance-matrix document.
///
/// The document must be a JSON array of `{from, to, distance}` objects where
/// `from` and `to` are integers and `distance` is a finite, non-negative
/// number. The first violation is reported with its entry index and field.
pub fn parse_distance_matrix(document: &str) -> Result<Vec<DistanceEntry>, ClusteringError> {
    let value: Value = serde_json::from_str(document)
        .map_err(|e| ClusteringError::MalformedInput(format!("invalid JSON: {}", e)))?;

    let records = value.as_array().ok_or_else(|| {
        ClusteringError::MalformedInput(
            "document must be an array of distance entries".to_string(),
        )
    })?;

    records
        .iter()
        .enumerate()
        .map(|(index, record)| parse_entry(index, record))
        .collect()
}

fn parse_entry(index: usize, record: &Value) -> Result<DistanceEntry, ClusteringError> {
    let object = record.as_object().ok_or_else(|| {
        ClusteringError::MalformedInput(format!("entry {}: expected an object", index))
    })?;

    let from = node_field(object, index, "from")?;
    let to = node_field(object, index, "to")?;

    let distance = field(object, index, "distance")?
        .as_f64()
        .ok_or_else(|| invalid_distance(index))
        .and_then(|d| check_distance(index, d))?;

    Ok(DistanceEntry { from, to, distance })
}

/// Check already-typed entries against the same rules as the document:
/// every distance finite and non-negative.
pub fn validate_entries(entries: &[DistanceEntry]) -> Result<(), ClusteringError> {
    entries
        .iter()
        .enumerate()
        .try_for_each(|(index, entry)| check_distance(index, entry.distance).map(|_| ()))
}

fn check_distance(index: usize, distance: f64) -> Result<f64, ClusteringError> {
    if distance.is_finite() && distance >= 0.0 {
        Ok(distance)
    } else {
        Err(invalid_distance(index))
    }
}

fn invalid_distance(index: usize) -> ClusteringError {
    ClusteringError::MalformedInput(format!(
        "entry {}: field `distance` must be a non-negative number",
        index
    ))
}

fn field<'a>(
    object: &'a Map<String, Value>,
    index: usize,
    name: &str,
) -> Result<&'a Value, ClusteringError> {
    object.get(name).ok_or_else(|| {
        ClusteringError::MalformedInput(format!("entry {}: missing field `{}`", index, name))
    })
}

fn node_field(
    object: &Map<String, Value>,
    index: usize,
    name: &str,
) -> Result<NodeId, ClusteringError> {
    field(object, index, name)?.as_i64().ok_or_else(|| {
        ClusteringError::MalformedInput(format!(
            "entry {}: field `{}` must be an integer",
            index, name
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(err: ClusteringError) -> String {
        match err {
            ClusteringError::MalformedInput(msg) => msg,
            other => panic!("expected MalformedInput, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_valid_document() {
        let doc = r#"[{"from": 0, "to": 1, "distance": 2.5}, {"from": 1, "to": 2, "distance": 0}]"#;
        let entries = parse_distance_matrix(doc).unwrap();
        assert_eq!(
            entries,
            vec![DistanceEntry::new(0, 1, 2.5), DistanceEntry::new(1, 2, 0.0)]
        );
    }

    #[test]
    fn test_parse_empty_array() {
        assert!(parse_distance_matrix("[]").unwrap().is_empty());
    }

    #[test]
    fn test_invalid_json() {
        let msg = message(parse_distance_matrix("[{").unwrap_err());
        assert!(msg.starts_with("invalid JSON"), "{}", msg);
    }

    #[test]
    fn test_not_an_array() {
        let msg = message(parse_distance_matrix(r#"{"from": 0}"#).unwrap_err());
        assert!(msg.contains("array"), "{}", msg);
    }

    #[test]
    fn test_missing_field_is_named() {
        let doc = r#"[{"from": 0, "to": 1, "distance": 1}, {"from": 0, "distance": 1}]"#;
        let msg = message(parse_distance_matrix(doc).unwrap_err());
        assert_eq!(msg, "entry 1: missing field `to`");
    }

    #[test]
    fn test_non_integer_node() {
        let doc = r#"[{"from": 0.5, "to": 1, "distance": 1}]"#;
        let msg = message(parse_distance_matrix(doc).unwrap_err());
        assert_eq!(msg, "entry 0: field `from` must be an integer");
    }

    #[test]
    fn test_negative_distance() {
        let doc = r#"[{"from": 0, "to": 1, "distance": -3}]"#;
        let msg = message(parse_distance_matrix(doc).unwrap_err());
        assert_eq!(msg, "entry 0: field `distance` must be a non-negative number");
    }

    #[test]
    fn test_validate_typed_entries() {
        assert!(validate_entries(&[DistanceEntry::new(0, 1, 0.0)]).is_ok());

        let cases = [
            (-1.0, "entry 1"),
            (f64::NAN, "entry 1"),
            (f64::INFINITY, "entry 1"),
        ];
        for (distance, prefix) in cases {
            let entries = [DistanceEntry::new(0, 1, 2.0), DistanceEntry::new(1, 2, distance)];
            let msg = message(validate_entries(&entries).unwrap_err());
            assert!(msg.starts_with(prefix), "{}", msg);
            assert!(msg.contains("`distance`"), "{}", msg);
        }
    }

    #[test]
    fn test_string_distance() {
        let doc = r#"[{"from": 0, "to": 1, "distance": "far"}]"#;
        assert!(parse_distance_matrix(doc).is_err());
    }
}
