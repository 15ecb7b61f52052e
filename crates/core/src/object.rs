//! The GeoJSON object variant and its capability set
//!
//! `Object` is the unit the collection stores. Variants split into two
//! regimes selected by [`Object::is_geometry`]:
//! - geometry objects (Point, MultiPoint, LineString, MultiLineString,
//!   Polygon, MultiPolygon, Feature-with-geometry, FeatureCollection)
//!   are spatially indexed by their calculated bounding box;
//! - non-geometry objects (plain String, Feature without a geometry
//!   member) are indexed by their string form.
//!
//! Containment and intersection between geometries delegate to the
//! `geo` crate on the 2D projection; nearby is a Haversine position
//! walk. Weight is byte-level accounting: 24 bytes per position (three
//! f64) plus raw property text, matching what the collection charges
//! against its memory counter.

use std::fmt;

use geo::{Distance, Haversine, Intersects, Within};
use geo_types::{
    Coord, Geometry, LineString, MultiLineString, MultiPoint, MultiPolygon, Polygon, Rect,
};

use crate::error::Result;
use crate::geojson;
use crate::position::{BBox, Position};

/// Byte cost of one stored position (three f64 coordinates)
const SIZEOF_POSITION: usize = 24;

/// A GeoJSON feature: a geometry wrapper carrying optional declared
/// bounds and raw properties
///
/// A declared `bbox` member overrides the computed bounds and adds two
/// positions to the object's count. `properties` is the compact raw
/// JSON text, carried through encode untouched. A feature without a
/// geometry member is a non-geometry object and lands in the value
/// index.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    /// The wrapped geometry, absent when the member was null or missing
    pub geometry: Option<Box<Object>>,
    /// Declared bounds from the `bbox` member
    pub bbox: Option<BBox>,
    /// Compact raw JSON of the `properties` member
    pub properties: Option<String>,
}

/// A stored object: a GeoJSON geometry or a plain string value
#[derive(Debug, Clone, PartialEq)]
pub enum Object {
    /// A plain (non-geometry) string value
    String(String),
    /// A single position
    Point(Position),
    /// A set of positions
    MultiPoint(Vec<Position>),
    /// A polyline
    LineString(Vec<Position>),
    /// A set of polylines
    MultiLineString(Vec<Vec<Position>>),
    /// A polygon as rings: exterior first, then holes
    Polygon(Vec<Vec<Position>>),
    /// A set of polygons
    MultiPolygon(Vec<Vec<Vec<Position>>>),
    /// A feature wrapper
    Feature(Feature),
    /// A collection of features or geometries
    FeatureCollection(Vec<Object>),
}

impl Object {
    /// Parse bytes into an object, auto-detecting the type
    ///
    /// Input starting with `{` must be valid GeoJSON; anything else is
    /// taken as a plain string value. Empty input is an error.
    pub fn from_bytes(bytes: &[u8]) -> Result<Object> {
        geojson::parse_bytes(bytes)
    }

    /// Whether this object belongs in the spatial index
    pub fn is_geometry(&self) -> bool {
        match self {
            Object::String(_) => false,
            Object::Feature(feat) => feat.geometry.is_some(),
            _ => true,
        }
    }

    /// Whether the object contributes any coordinate positions
    pub fn has_positions(&self) -> bool {
        if let Object::Feature(feat) = self {
            if feat.bbox.is_some() {
                return true;
            }
        }
        let mut any = false;
        self.each_position(&mut |_| any = true);
        any
    }

    /// Number of coordinate positions; a declared feature bbox adds two
    pub fn position_count(&self) -> usize {
        match self {
            Object::String(_) => 0,
            Object::Feature(feat) => {
                let base = feat.geometry.as_ref().map_or(0, |g| g.position_count());
                if feat.bbox.is_some() {
                    base + 2
                } else {
                    base
                }
            }
            Object::FeatureCollection(members) => {
                members.iter().map(|m| m.position_count()).sum()
            }
            _ => {
                let mut n = 0;
                self.each_position(&mut |_| n += 1);
                n
            }
        }
    }

    /// Byte cost of the object itself (ids and field vectors are
    /// charged separately by the collection)
    pub fn weight(&self) -> usize {
        match self {
            Object::String(value) => value.len(),
            Object::Feature(feat) => {
                self.position_count() * SIZEOF_POSITION
                    + feat.properties.as_ref().map_or(0, |p| p.len())
            }
            Object::FeatureCollection(members) => members.iter().map(|m| m.weight()).sum(),
            _ => self.position_count() * SIZEOF_POSITION,
        }
    }

    /// The 3D axis-aligned bounds over all positions
    ///
    /// A feature's declared bbox wins over the computed one. Objects
    /// with no positions report a zero box.
    pub fn calculated_bbox(&self) -> BBox {
        if let Object::Feature(feat) = self {
            if let Some(bbox) = feat.bbox {
                return bbox;
            }
        }
        let mut bbox: Option<BBox> = None;
        self.each_position(&mut |pos| {
            bbox = Some(match bbox.take() {
                Some(mut b) => {
                    b.expand_position(pos);
                    b
                }
                None => BBox::at(pos),
            });
        });
        bbox.unwrap_or_default()
    }

    /// A single point standing in for the object: the bbox center
    pub fn calculated_point(&self) -> Position {
        self.calculated_bbox().center()
    }

    /// The GeoJSON text for geometry objects, the raw string otherwise
    pub fn json(&self) -> String {
        match self {
            Object::String(value) => value.clone(),
            _ => geojson::encode(self).to_string(),
        }
    }

    /// The byte encoding used by the snapshot codec
    pub fn to_json_bytes(&self) -> Vec<u8> {
        self.json().into_bytes()
    }

    /// Whether any position lies within `meters` of `center` by
    /// Haversine distance
    pub fn nearby(&self, center: Position, meters: f64) -> bool {
        match self {
            Object::String(_) => false,
            Object::Feature(feat) => feat
                .geometry
                .as_ref()
                .is_some_and(|g| g.nearby(center, meters)),
            Object::FeatureCollection(members) => {
                members.iter().any(|m| m.nearby(center, meters))
            }
            _ => {
                let target = center.point();
                let mut hit = false;
                self.each_position(&mut |pos| {
                    if !hit && Haversine::distance(pos.point(), target) <= meters {
                        hit = true;
                    }
                });
                hit
            }
        }
    }

    /// Whether the object lies entirely inside `bbox` (x, y and z)
    pub fn within_bbox(&self, bbox: BBox) -> bool {
        match self {
            Object::String(_) => false,
            Object::Feature(feat) => {
                if feat.bbox.is_some() {
                    bbox.contains_bbox(&self.calculated_bbox())
                } else {
                    feat.geometry.as_ref().is_some_and(|g| g.within_bbox(bbox))
                }
            }
            Object::FeatureCollection(members) => {
                !members.is_empty() && members.iter().all(|m| m.within_bbox(bbox))
            }
            _ => {
                if !self.has_positions() {
                    return false;
                }
                let mut inside = true;
                self.each_position(&mut |pos| {
                    if !bbox.contains_position(pos) {
                        inside = false;
                    }
                });
                inside
            }
        }
    }

    /// Whether the object intersects `bbox` (2D overlap plus Z-interval
    /// overlap)
    pub fn intersects_bbox(&self, bbox: BBox) -> bool {
        match self {
            Object::String(_) => false,
            Object::Feature(feat) => {
                if feat.bbox.is_some() {
                    self.calculated_bbox().intersects(&bbox)
                } else {
                    feat.geometry
                        .as_ref()
                        .is_some_and(|g| g.intersects_bbox(bbox))
                }
            }
            Object::FeatureCollection(members) => {
                members.iter().any(|m| m.intersects_bbox(bbox))
            }
            _ => {
                // cheap reject also settles the Z axis, which the 2D
                // polygon test below cannot see
                if !self.has_positions() || !self.calculated_bbox().intersects(&bbox) {
                    return false;
                }
                match self.to_geo() {
                    Some(geom) => bbox_polygon(bbox).intersects(&geom),
                    None => false,
                }
            }
        }
    }

    /// Whether the object lies entirely inside `other`
    pub fn within(&self, other: &Object) -> bool {
        match other {
            Object::String(_) => false,
            Object::Feature(feat) => feat.geometry.as_ref().is_some_and(|g| self.within(g)),
            Object::FeatureCollection(members) => members.iter().any(|m| self.within(m)),
            _ => match self {
                Object::String(_) => false,
                Object::Feature(feat) => {
                    feat.geometry.as_ref().is_some_and(|g| g.within(other))
                }
                Object::FeatureCollection(members) => {
                    !members.is_empty() && members.iter().all(|m| m.within(other))
                }
                _ => match (self.to_geo(), other.to_geo()) {
                    (Some(a), Some(b)) => a.is_within(&b),
                    _ => false,
                },
            },
        }
    }

    /// Whether the object intersects `other`
    pub fn intersects(&self, other: &Object) -> bool {
        match other {
            Object::String(_) => false,
            Object::Feature(feat) => feat.geometry.as_ref().is_some_and(|g| self.intersects(g)),
            Object::FeatureCollection(members) => members.iter().any(|m| self.intersects(m)),
            _ => match self {
                Object::String(_) => false,
                Object::Feature(feat) => {
                    feat.geometry.as_ref().is_some_and(|g| g.intersects(other))
                }
                Object::FeatureCollection(members) => {
                    members.iter().any(|m| m.intersects(other))
                }
                _ => match (self.to_geo(), other.to_geo()) {
                    (Some(a), Some(b)) => a.intersects(&b),
                    _ => false,
                },
            },
        }
    }

    /// Walk every coordinate position in document order
    fn each_position(&self, f: &mut dyn FnMut(Position)) {
        match self {
            Object::String(_) => {}
            Object::Point(pos) => f(*pos),
            Object::MultiPoint(positions) | Object::LineString(positions) => {
                for pos in positions {
                    f(*pos);
                }
            }
            Object::MultiLineString(lines) | Object::Polygon(lines) => {
                for line in lines {
                    for pos in line {
                        f(*pos);
                    }
                }
            }
            Object::MultiPolygon(polygons) => {
                for rings in polygons {
                    for ring in rings {
                        for pos in ring {
                            f(*pos);
                        }
                    }
                }
            }
            Object::Feature(feat) => {
                if let Some(geometry) = &feat.geometry {
                    geometry.each_position(f);
                }
            }
            Object::FeatureCollection(members) => {
                for member in members {
                    member.each_position(f);
                }
            }
        }
    }

    /// The 2D projection of simple geometry variants
    fn to_geo(&self) -> Option<Geometry<f64>> {
        Some(match self {
            Object::Point(pos) => Geometry::Point(pos.point()),
            Object::MultiPoint(positions) => Geometry::MultiPoint(MultiPoint::new(
                positions.iter().map(|p| p.point()).collect(),
            )),
            Object::LineString(positions) => {
                Geometry::LineString(LineString::new(coords(positions)))
            }
            Object::MultiLineString(lines) => Geometry::MultiLineString(MultiLineString::new(
                lines.iter().map(|l| LineString::new(coords(l))).collect(),
            )),
            Object::Polygon(rings) => Geometry::Polygon(polygon_from_rings(rings)),
            Object::MultiPolygon(polygons) => Geometry::MultiPolygon(MultiPolygon::new(
                polygons.iter().map(|rings| polygon_from_rings(rings)).collect(),
            )),
            _ => return None,
        })
    }
}

impl fmt::Display for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Object::String(value) => f.write_str(value),
            _ => f.write_str(&self.json()),
        }
    }
}

fn coords(positions: &[Position]) -> Vec<Coord<f64>> {
    positions.iter().map(|p| Coord { x: p.x, y: p.y }).collect()
}

fn polygon_from_rings(rings: &[Vec<Position>]) -> Polygon<f64> {
    let mut iter = rings.iter();
    let exterior = LineString::new(iter.next().map(|r| coords(r)).unwrap_or_default());
    let interiors = iter.map(|r| LineString::new(coords(r))).collect();
    Polygon::new(exterior, interiors)
}

fn bbox_polygon(bbox: BBox) -> Polygon<f64> {
    Rect::new(
        Coord {
            x: bbox.min.x,
            y: bbox.min.y,
        },
        Coord {
            x: bbox.max.x,
            y: bbox.max.y,
        },
    )
    .to_polygon()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(min: f64, max: f64) -> Object {
        Object::Polygon(vec![vec![
            Position::new(min, min, 0.0),
            Position::new(max, min, 0.0),
            Position::new(max, max, 0.0),
            Position::new(min, max, 0.0),
            Position::new(min, min, 0.0),
        ]])
    }

    #[test]
    fn test_string_is_not_geometry() {
        let obj = Object::String("hello".to_string());
        assert!(!obj.is_geometry());
        assert_eq!(obj.position_count(), 0);
        assert_eq!(obj.weight(), 5);
        assert_eq!(obj.to_string(), "hello");
    }

    #[test]
    fn test_feature_without_geometry_is_not_geometry() {
        let obj = Object::Feature(Feature {
            geometry: None,
            bbox: None,
            properties: Some("{\"name\":\"x\"}".to_string()),
        });
        assert!(!obj.is_geometry());
        assert!(!obj.has_positions());
    }

    #[test]
    fn test_point_bbox_and_weight() {
        let obj = Object::Point(Position::new(10.0, 20.0, 0.0));
        assert!(obj.is_geometry());
        assert_eq!(obj.position_count(), 1);
        assert_eq!(obj.weight(), 24);
        let bbox = obj.calculated_bbox();
        assert_eq!(bbox.min, Position::new(10.0, 20.0, 0.0));
        assert_eq!(bbox.max, Position::new(10.0, 20.0, 0.0));
    }

    #[test]
    fn test_polygon_bbox_spans_all_rings() {
        let obj = Object::Polygon(vec![
            vec![
                Position::new(0.0, 0.0, 0.0),
                Position::new(4.0, 0.0, 0.0),
                Position::new(4.0, 4.0, 0.0),
                Position::new(0.0, 4.0, 0.0),
                Position::new(0.0, 0.0, 0.0),
            ],
            vec![
                Position::new(1.0, 1.0, 0.0),
                Position::new(2.0, 1.0, 0.0),
                Position::new(2.0, 2.0, 0.0),
                Position::new(1.0, 1.0, 0.0),
            ],
        ]);
        let bbox = obj.calculated_bbox();
        assert_eq!(bbox.min, Position::new(0.0, 0.0, 0.0));
        assert_eq!(bbox.max, Position::new(4.0, 4.0, 0.0));
        assert_eq!(obj.position_count(), 9);
    }

    #[test]
    fn test_declared_feature_bbox_overrides() {
        let declared = BBox::new(Position::new(-1.0, -1.0, 0.0), Position::new(9.0, 9.0, 0.0));
        let obj = Object::Feature(Feature {
            geometry: Some(Box::new(Object::Point(Position::new(1.0, 1.0, 0.0)))),
            bbox: Some(declared),
            properties: None,
        });
        assert_eq!(obj.calculated_bbox(), declared);
        // one geometry position plus two for the declared box
        assert_eq!(obj.position_count(), 3);
    }

    #[test]
    fn test_within_bbox_is_inclusive() {
        let obj = square(0.0, 1.0);
        let exact = BBox::new(Position::new(0.0, 0.0, 0.0), Position::new(1.0, 1.0, 0.0));
        let smaller = BBox::new(Position::new(0.1, 0.1, 0.0), Position::new(0.9, 0.9, 0.0));
        assert!(obj.within_bbox(exact));
        assert!(!obj.within_bbox(smaller));
    }

    #[test]
    fn test_intersects_bbox_partial_overlap() {
        let obj = square(0.0, 1.0);
        let inner = BBox::new(Position::new(0.1, 0.1, 0.0), Position::new(0.9, 0.9, 0.0));
        let outside = BBox::new(Position::new(5.0, 5.0, 0.0), Position::new(6.0, 6.0, 0.0));
        assert!(obj.intersects_bbox(inner));
        assert!(!obj.intersects_bbox(outside));
    }

    #[test]
    fn test_intersects_bbox_z_separation() {
        let obj = Object::Point(Position::new(0.5, 0.5, 10.0));
        let low = BBox::new(Position::new(0.0, 0.0, 0.0), Position::new(1.0, 1.0, 1.0));
        assert!(!obj.intersects_bbox(low));
    }

    #[test]
    fn test_within_and_intersects_objects() {
        let small = square(0.25, 0.75);
        let big = square(0.0, 1.0);
        let far = square(10.0, 11.0);
        assert!(small.within(&big));
        assert!(!big.within(&small));
        assert!(small.intersects(&big));
        assert!(!small.intersects(&far));
    }

    #[test]
    fn test_nearby_haversine() {
        let sf = Object::Point(Position::new(-122.4194, 37.7749, 0.0));
        let center = Position::new(-122.4194, 37.7749, 0.0);
        assert!(sf.nearby(center, 100.0));
        // roughly one kilometer north
        let away = Object::Point(Position::new(-122.4194, 37.7839, 0.0));
        assert!(!away.nearby(center, 100.0));
        assert!(away.nearby(center, 2000.0));
    }

    #[test]
    fn test_feature_collection_aggregates() {
        let fc = Object::FeatureCollection(vec![
            Object::Point(Position::new(0.0, 0.0, 0.0)),
            Object::Point(Position::new(2.0, 2.0, 0.0)),
        ]);
        assert!(fc.is_geometry());
        assert_eq!(fc.position_count(), 2);
        assert_eq!(fc.weight(), 48);
        let bbox = fc.calculated_bbox();
        assert_eq!(bbox.max, Position::new(2.0, 2.0, 0.0));
        let cover = BBox::new(Position::new(-1.0, -1.0, 0.0), Position::new(3.0, 3.0, 0.0));
        assert!(fc.within_bbox(cover));
    }
}
