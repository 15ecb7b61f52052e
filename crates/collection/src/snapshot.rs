//! Portable snapshot codec
//!
//! A collection encodes to a JSON document with two members: `fields`,
//! the slot-ordered field name array, and `rows`, one row per item in
//! id-ascending order. Each row carries the id, the object's byte
//! encoding (base64 on the wire) and the item's field values; empty
//! value vectors are omitted.
//!
//! Decode replays the document through `replace_or_insert` row by row.
//! The first bad row aborts with an error and leaves the rows already
//! applied in place; discarding the partially-restored collection is
//! the caller's decision.

use serde::{Deserialize, Serialize};
use serde_with::base64::Base64;
use serde_with::serde_as;
use thiserror::Error;
use tracing::{debug, warn};

use geodex_core::{GeomError, Object};

use crate::collection::Collection;

/// Result type alias for snapshot operations
pub type SnapshotResult<T> = std::result::Result<T, SnapshotError>;

/// Errors produced while encoding or decoding a snapshot
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// Decode was handed an empty document
    #[error("empty snapshot input")]
    EmptyInput,

    /// The document is not valid snapshot JSON (this includes a
    /// missing `fields` array)
    #[error("malformed snapshot document: {0}")]
    Json(#[from] serde_json::Error),

    /// A row's object bytes failed to parse; earlier rows are already
    /// applied
    #[error("snapshot row {row} ({id:?}): {source}")]
    Row {
        /// Index of the offending row
        row: usize,
        /// Id carried by the offending row
        id: String,
        /// The underlying parse error
        #[source]
        source: GeomError,
    },
}

/// One item of a portable snapshot
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Row {
    /// The item id
    pub id: String,
    /// The object's byte encoding, base64 on the wire
    #[serde_as(as = "Base64")]
    pub obj: Vec<u8>,
    /// Field values by slot; empty vectors are omitted from the wire
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<f64>,
}

/// The portable snapshot document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// Field names ordered by slot
    pub fields: Vec<String>,
    /// Items in id-ascending order
    #[serde(default)]
    pub rows: Vec<Row>,
}

impl Collection {
    /// Build the portable document for this collection
    ///
    /// Rows come out in id-ascending order. The row array is
    /// pre-allocated to `count()` and guarded against overrun.
    pub fn to_snapshot(&self) -> Snapshot {
        let count = self.count();
        let mut rows = Vec::with_capacity(count);
        self.scan(0, false, |id, object, values| {
            if rows.len() < count {
                rows.push(Row {
                    id: id.to_string(),
                    obj: object.to_json_bytes(),
                    values: values.to_vec(),
                });
                true
            } else {
                false
            }
        });
        Snapshot {
            fields: self.field_arr().to_vec(),
            rows,
        }
    }

    /// Encode the collection as snapshot JSON bytes
    pub fn encode_snapshot(&self) -> SnapshotResult<Vec<u8>> {
        let snapshot = self.to_snapshot();
        debug!(
            rows = snapshot.rows.len(),
            fields = snapshot.fields.len(),
            "encoding collection snapshot"
        );
        Ok(serde_json::to_vec(&snapshot)?)
    }

    /// Decode snapshot JSON bytes into this collection
    ///
    /// Every row runs through `replace_or_insert` with the snapshot's
    /// full field-name array. On the first bad row the decode aborts;
    /// rows already applied stay in the collection.
    pub fn decode_snapshot(&mut self, bytes: &[u8]) -> SnapshotResult<()> {
        if bytes.is_empty() {
            return Err(SnapshotError::EmptyInput);
        }
        let snapshot: Snapshot = serde_json::from_slice(bytes)?;
        // seed the registry up front so slot order follows the
        // snapshot even when no row exercises a trailing field
        for name in &snapshot.fields {
            self.fields.slot(name);
        }
        let names: Vec<&str> = snapshot.fields.iter().map(String::as_str).collect();
        for (at, row) in snapshot.rows.iter().enumerate() {
            let object = match Object::from_bytes(&row.obj) {
                Ok(object) => object,
                Err(source) => {
                    warn!(
                        row = at,
                        id = %row.id,
                        applied = at,
                        "snapshot decode aborted, partial state retained"
                    );
                    return Err(SnapshotError::Row {
                        row: at,
                        id: row.id.clone(),
                        source,
                    });
                }
            };
            self.replace_or_insert(&row.id, object, &names, &row.values);
        }
        debug!(rows = snapshot.rows.len(), "collection snapshot decoded");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geodex_core::Position;

    fn sample() -> Collection {
        let mut col = Collection::new();
        col.replace_or_insert(
            "truck1",
            Object::Point(Position::new(-112.2693, 33.5123, 0.0)),
            &[],
            &[],
        );
        col.replace_or_insert("note", Object::String("plain value".to_string()), &[], &[]);
        col.replace_or_insert(
            "zone",
            Object::Polygon(vec![vec![
                Position::new(0.0, 0.0, 0.0),
                Position::new(1.0, 0.0, 0.0),
                Position::new(1.0, 1.0, 0.0),
                Position::new(0.0, 0.0, 0.0),
            ]]),
            &[],
            &[],
        );
        col.set_field("truck1", "speed", 55.0);
        col.set_field("truck1", "fuel", 0.7);
        col
    }

    fn assert_equivalent(a: &Collection, b: &Collection) {
        assert_eq!(a.count(), b.count());
        assert_eq!(a.point_count(), b.point_count());
        assert_eq!(a.total_weight(), b.total_weight());
        assert_eq!(a.field_arr(), b.field_arr());
        a.scan(0, false, |id, object, fields| {
            let (other_object, other_fields) = b.get(id).unwrap();
            assert_eq!(object.to_json_bytes(), other_object.to_json_bytes());
            // vectors compare equal once zero-padded to a common length
            let width = fields.len().max(other_fields.len());
            let pad = |v: &[f64]| {
                let mut v = v.to_vec();
                v.resize(width, 0.0);
                v
            };
            assert_eq!(pad(fields), pad(other_fields));
            true
        });
    }

    #[test]
    fn test_snapshot_round_trip() {
        let original = sample();
        let bytes = original.encode_snapshot().unwrap();
        let mut restored = Collection::new();
        restored.decode_snapshot(&bytes).unwrap();
        assert_equivalent(&original, &restored);
    }

    #[test]
    fn test_snapshot_rows_are_id_ordered() {
        let col = sample();
        let snapshot = col.to_snapshot();
        let ids: Vec<&str> = snapshot.rows.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["note", "truck1", "zone"]);
        assert_eq!(snapshot.fields, ["speed", "fuel"]);
    }

    #[test]
    fn test_obj_bytes_travel_as_base64() {
        let col = sample();
        let bytes = col.encode_snapshot().unwrap();
        let doc: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        let obj = &doc["rows"][0]["obj"];
        assert!(obj.is_string(), "obj must be a base64 string, got {obj}");
        assert!(!obj.as_str().unwrap().contains('{'));
    }

    #[test]
    fn test_empty_values_are_omitted() {
        let col = sample();
        let bytes = col.encode_snapshot().unwrap();
        let doc: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        // "note" carries no fields
        assert!(doc["rows"][0].get("values").is_none());
        assert!(doc["rows"][1].get("values").is_some());
    }

    #[test]
    fn test_decode_empty_input_is_an_error() {
        let mut col = Collection::new();
        assert!(matches!(
            col.decode_snapshot(b""),
            Err(SnapshotError::EmptyInput)
        ));
    }

    #[test]
    fn test_decode_missing_fields_is_an_error() {
        let mut col = Collection::new();
        assert!(matches!(
            col.decode_snapshot(br#"{"rows":[]}"#),
            Err(SnapshotError::Json(_))
        ));
    }

    #[test]
    fn test_decode_bad_row_keeps_partial_state() {
        // row 0 is fine, row 1 carries unparseable object bytes
        let snapshot = Snapshot {
            fields: Vec::new(),
            rows: vec![
                Row {
                    id: "good".to_string(),
                    obj: br#"{"type":"Point","coordinates":[1,2]}"#.to_vec(),
                    values: Vec::new(),
                },
                Row {
                    id: "bad".to_string(),
                    obj: b"{not json".to_vec(),
                    values: Vec::new(),
                },
            ],
        };
        let bytes = serde_json::to_vec(&snapshot).unwrap();
        let mut col = Collection::new();
        let err = col.decode_snapshot(&bytes).unwrap_err();
        match err {
            SnapshotError::Row { row, id, .. } => {
                assert_eq!(row, 1);
                assert_eq!(id, "bad");
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert_eq!(col.count(), 1);
        assert!(col.get("good").is_some());
    }

    #[test]
    fn test_decode_preserves_field_name_order() {
        // no row exercises "c", yet a re-encode keeps it in place
        let snapshot = Snapshot {
            fields: vec!["a".to_string(), "b".to_string(), "c".to_string()],
            rows: vec![Row {
                id: "x".to_string(),
                obj: br#"{"type":"Point","coordinates":[0,0]}"#.to_vec(),
                values: vec![1.0, 2.0],
            }],
        };
        let bytes = serde_json::to_vec(&snapshot).unwrap();
        let mut col = Collection::new();
        col.decode_snapshot(&bytes).unwrap();
        assert_eq!(col.field_arr(), ["a", "b", "c"]);
        let (_, fields) = col.get("x").unwrap();
        assert_eq!(fields, [1.0, 2.0]);
    }
}
