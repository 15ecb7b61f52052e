//! GeoJSON parsing and encoding
//!
//! The auto-typed reader behind [`Object::from_bytes`]: input that
//! starts with `{` must parse as a GeoJSON object, anything else is a
//! plain string value. Encoding is the reverse: geometry variants emit
//! compact GeoJSON, string objects emit their raw bytes.
//!
//! Re-encoded output is normalized (member order, whitespace) and may
//! differ byte-for-byte from the original input; positions, declared
//! bboxes and properties are preserved exactly.

use serde_json::{json, Map, Value};

use crate::error::{GeomError, Result};
use crate::object::{Feature, Object};
use crate::position::{BBox, Position};

/// Parse raw bytes into an object, auto-detecting the type
pub(crate) fn parse_bytes(bytes: &[u8]) -> Result<Object> {
    let trimmed = trim_leading_ws(bytes);
    if trimmed.is_empty() {
        return Err(GeomError::EmptyInput);
    }
    if trimmed[0] == b'{' {
        let value: Value = serde_json::from_slice(trimmed)?;
        parse_value(&value)
    } else {
        Ok(Object::String(String::from_utf8_lossy(bytes).into_owned()))
    }
}

fn trim_leading_ws(bytes: &[u8]) -> &[u8] {
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    &bytes[start..]
}

/// Parse a decoded JSON value into an object
pub(crate) fn parse_value(value: &Value) -> Result<Object> {
    let map = value.as_object().ok_or(GeomError::MissingType)?;
    let kind = map
        .get("type")
        .and_then(Value::as_str)
        .ok_or(GeomError::MissingType)?;
    match kind {
        "Point" => Ok(Object::Point(parse_position(
            member(map, "Point", "coordinates")?,
            "Point",
        )?)),
        "MultiPoint" => Ok(Object::MultiPoint(parse_positions(
            member(map, "MultiPoint", "coordinates")?,
            "MultiPoint",
        )?)),
        "LineString" => Ok(Object::LineString(parse_positions(
            member(map, "LineString", "coordinates")?,
            "LineString",
        )?)),
        "MultiLineString" => Ok(Object::MultiLineString(parse_lines(
            member(map, "MultiLineString", "coordinates")?,
            "MultiLineString",
        )?)),
        "Polygon" => Ok(Object::Polygon(parse_lines(
            member(map, "Polygon", "coordinates")?,
            "Polygon",
        )?)),
        "MultiPolygon" => Ok(Object::MultiPolygon(parse_polygons(
            member(map, "MultiPolygon", "coordinates")?,
            "MultiPolygon",
        )?)),
        "Feature" => parse_feature(map),
        "FeatureCollection" => parse_feature_collection(map),
        other => Err(GeomError::UnknownType(other.to_string())),
    }
}

fn member<'a>(
    map: &'a Map<String, Value>,
    kind: &'static str,
    name: &'static str,
) -> Result<&'a Value> {
    map.get(name).ok_or_else(|| GeomError::member(kind, name))
}

fn parse_position(value: &Value, kind: &'static str) -> Result<Position> {
    let arr = value
        .as_array()
        .ok_or(GeomError::InvalidPosition { kind })?;
    if arr.len() < 2 {
        return Err(GeomError::InvalidPosition { kind });
    }
    let num = |i: usize| -> Result<f64> {
        arr.get(i)
            .and_then(Value::as_f64)
            .ok_or(GeomError::InvalidPosition { kind })
    };
    let z = if arr.len() > 2 { num(2)? } else { 0.0 };
    Ok(Position::new(num(0)?, num(1)?, z))
}

fn parse_positions(value: &Value, kind: &'static str) -> Result<Vec<Position>> {
    value
        .as_array()
        .ok_or(GeomError::member(kind, "coordinates"))?
        .iter()
        .map(|v| parse_position(v, kind))
        .collect()
}

fn parse_lines(value: &Value, kind: &'static str) -> Result<Vec<Vec<Position>>> {
    value
        .as_array()
        .ok_or(GeomError::member(kind, "coordinates"))?
        .iter()
        .map(|v| parse_positions(v, kind))
        .collect()
}

fn parse_polygons(value: &Value, kind: &'static str) -> Result<Vec<Vec<Vec<Position>>>> {
    value
        .as_array()
        .ok_or(GeomError::member(kind, "coordinates"))?
        .iter()
        .map(|v| parse_lines(v, kind))
        .collect()
}

fn parse_feature(map: &Map<String, Value>) -> Result<Object> {
    let geometry = match map.get("geometry") {
        None | Some(Value::Null) => None,
        Some(value @ Value::Object(_)) => Some(Box::new(parse_value(value)?)),
        Some(_) => return Err(GeomError::member("Feature", "geometry")),
    };
    let bbox = match map.get("bbox") {
        None | Some(Value::Null) => None,
        Some(value) => Some(parse_bbox(value)?),
    };
    let properties = match map.get("properties") {
        None | Some(Value::Null) => None,
        Some(value @ (Value::Object(_) | Value::Array(_))) => {
            Some(serde_json::to_string(value)?)
        }
        Some(_) => return Err(GeomError::member("Feature", "properties")),
    };
    Ok(Object::Feature(Feature {
        geometry,
        bbox,
        properties,
    }))
}

fn parse_feature_collection(map: &Map<String, Value>) -> Result<Object> {
    let members = map
        .get("features")
        .and_then(Value::as_array)
        .ok_or(GeomError::member("FeatureCollection", "features"))?
        .iter()
        .map(parse_value)
        .collect::<Result<Vec<_>>>()?;
    Ok(Object::FeatureCollection(members))
}

fn parse_bbox(value: &Value) -> Result<BBox> {
    const KIND: &str = "Feature";
    let arr = value.as_array().ok_or(GeomError::member(KIND, "bbox"))?;
    let num = |i: usize| -> Result<f64> {
        arr.get(i)
            .and_then(Value::as_f64)
            .ok_or(GeomError::member(KIND, "bbox"))
    };
    match arr.len() {
        4 => Ok(BBox::new(
            Position::new(num(0)?, num(1)?, 0.0),
            Position::new(num(2)?, num(3)?, 0.0),
        )),
        6 => Ok(BBox::new(
            Position::new(num(0)?, num(1)?, num(2)?),
            Position::new(num(3)?, num(4)?, num(5)?),
        )),
        _ => Err(GeomError::member(KIND, "bbox")),
    }
}

/// Encode an object as a JSON value (geometry variants only produce
/// GeoJSON; string objects become a bare JSON string)
pub(crate) fn encode(object: &Object) -> Value {
    match object {
        Object::String(value) => Value::String(value.clone()),
        Object::Point(pos) => json!({"type": "Point", "coordinates": position_value(*pos)}),
        Object::MultiPoint(positions) => {
            json!({"type": "MultiPoint", "coordinates": positions_value(positions)})
        }
        Object::LineString(positions) => {
            json!({"type": "LineString", "coordinates": positions_value(positions)})
        }
        Object::MultiLineString(lines) => {
            json!({"type": "MultiLineString", "coordinates": lines_value(lines)})
        }
        Object::Polygon(rings) => {
            json!({"type": "Polygon", "coordinates": lines_value(rings)})
        }
        Object::MultiPolygon(polygons) => json!({
            "type": "MultiPolygon",
            "coordinates": polygons.iter().map(|rings| lines_value(rings)).collect::<Vec<_>>(),
        }),
        Object::Feature(feat) => {
            let mut map = Map::new();
            map.insert("type".to_string(), Value::String("Feature".to_string()));
            map.insert(
                "geometry".to_string(),
                feat.geometry.as_ref().map_or(Value::Null, |g| encode(g)),
            );
            if let Some(bbox) = feat.bbox {
                map.insert("bbox".to_string(), bbox_value(bbox));
            }
            if let Some(properties) = &feat.properties {
                map.insert(
                    "properties".to_string(),
                    serde_json::from_str(properties).unwrap_or(Value::Null),
                );
            }
            Value::Object(map)
        }
        Object::FeatureCollection(members) => json!({
            "type": "FeatureCollection",
            "features": members.iter().map(encode).collect::<Vec<_>>(),
        }),
    }
}

fn position_value(pos: Position) -> Value {
    if pos.z == 0.0 {
        json!([pos.x, pos.y])
    } else {
        json!([pos.x, pos.y, pos.z])
    }
}

fn positions_value(positions: &[Position]) -> Value {
    Value::Array(positions.iter().map(|p| position_value(*p)).collect())
}

fn lines_value(lines: &[Vec<Position>]) -> Value {
    Value::Array(lines.iter().map(|l| positions_value(l)).collect())
}

fn bbox_value(bbox: BBox) -> Value {
    if bbox.min.z == 0.0 && bbox.max.z == 0.0 {
        json!([bbox.min.x, bbox.min.y, bbox.max.x, bbox.max.y])
    } else {
        json!([
            bbox.min.x, bbox.min.y, bbox.min.z, bbox.max.x, bbox.max.y, bbox.max.z
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_point() {
        let obj = Object::from_bytes(br#"{"type":"Point","coordinates":[10.0,20.0]}"#).unwrap();
        assert_eq!(obj, Object::Point(Position::new(10.0, 20.0, 0.0)));
    }

    #[test]
    fn test_parse_point_with_elevation() {
        let obj = Object::from_bytes(br#"{"type":"Point","coordinates":[1,2,3]}"#).unwrap();
        assert_eq!(obj, Object::Point(Position::new(1.0, 2.0, 3.0)));
    }

    #[test]
    fn test_parse_polygon() {
        let obj = Object::from_bytes(
            br#"{"type":"Polygon","coordinates":[[[0,0],[1,0],[1,1],[0,1],[0,0]]]}"#,
        )
        .unwrap();
        match &obj {
            Object::Polygon(rings) => {
                assert_eq!(rings.len(), 1);
                assert_eq!(rings[0].len(), 5);
            }
            other => panic!("expected polygon, got {other:?}"),
        }
    }

    #[test]
    fn test_plain_text_is_a_string_object() {
        let obj = Object::from_bytes(b"downtown").unwrap();
        assert_eq!(obj, Object::String("downtown".to_string()));
    }

    #[test]
    fn test_empty_input_is_an_error() {
        assert!(matches!(
            Object::from_bytes(b""),
            Err(GeomError::EmptyInput)
        ));
        assert!(matches!(
            Object::from_bytes(b"   "),
            Err(GeomError::EmptyInput)
        ));
    }

    #[test]
    fn test_malformed_json_is_an_error() {
        assert!(matches!(
            Object::from_bytes(b"{\"type\":"),
            Err(GeomError::InvalidJson(_))
        ));
    }

    #[test]
    fn test_unknown_type_is_an_error() {
        assert!(matches!(
            Object::from_bytes(br#"{"type":"Blob","coordinates":[]}"#),
            Err(GeomError::UnknownType(_))
        ));
    }

    #[test]
    fn test_missing_coordinates_is_an_error() {
        assert!(matches!(
            Object::from_bytes(br#"{"type":"Point"}"#),
            Err(GeomError::InvalidMember { .. })
        ));
    }

    #[test]
    fn test_feature_round_trip() {
        let text = br#"{"type":"Feature","geometry":{"type":"Point","coordinates":[5,6]},"bbox":[0,0,10,10],"properties":{"name":"hq"}}"#;
        let obj = Object::from_bytes(text).unwrap();
        match &obj {
            Object::Feature(feat) => {
                assert!(feat.geometry.is_some());
                assert!(feat.bbox.is_some());
                assert_eq!(feat.properties.as_deref(), Some(r#"{"name":"hq"}"#));
            }
            other => panic!("expected feature, got {other:?}"),
        }
        let reparsed = Object::from_bytes(&obj.to_json_bytes()).unwrap();
        assert_eq!(reparsed, obj);
    }

    #[test]
    fn test_feature_with_null_geometry() {
        let obj =
            Object::from_bytes(br#"{"type":"Feature","geometry":null,"properties":null}"#).unwrap();
        assert!(!obj.is_geometry());
    }

    #[test]
    fn test_feature_collection_round_trip() {
        let text = br#"{"type":"FeatureCollection","features":[{"type":"Point","coordinates":[1,2]},{"type":"Point","coordinates":[3,4]}]}"#;
        let obj = Object::from_bytes(text).unwrap();
        match &obj {
            Object::FeatureCollection(members) => assert_eq!(members.len(), 2),
            other => panic!("expected feature collection, got {other:?}"),
        }
        let reparsed = Object::from_bytes(&obj.to_json_bytes()).unwrap();
        assert_eq!(reparsed, obj);
    }

    #[test]
    fn test_geometry_round_trip_all_variants() {
        let texts: &[&[u8]] = &[
            br#"{"type":"MultiPoint","coordinates":[[1,2],[3,4]]}"#,
            br#"{"type":"LineString","coordinates":[[0,0],[5,5]]}"#,
            br#"{"type":"MultiLineString","coordinates":[[[0,0],[5,5]],[[1,1],[2,2]]]}"#,
            br#"{"type":"MultiPolygon","coordinates":[[[[0,0],[1,0],[1,1],[0,0]]]]}"#,
        ];
        for text in texts {
            let obj = Object::from_bytes(text).unwrap();
            let reparsed = Object::from_bytes(&obj.to_json_bytes()).unwrap();
            assert_eq!(reparsed, obj);
        }
    }

    #[test]
    fn test_string_object_bytes_round_trip() {
        let obj = Object::String("plain value".to_string());
        let reparsed = Object::from_bytes(&obj.to_json_bytes()).unwrap();
        assert_eq!(reparsed, obj);
    }
}
