//! Positions and bounding boxes
//!
//! `Position` is a 3D coordinate in (x = longitude, y = latitude,
//! z = elevation) order. `BBox` is the axis-aligned box over positions
//! that drives the spatial index and the query planner: it can be built
//! around a center point with a great-circle radius, split into a sparse
//! tile grid, and tested for containment and overlap.

use geo::{Destination, Haversine};
use geo_types::Point;

/// A 3D coordinate: x = longitude, y = latitude, z = elevation
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Position {
    /// Longitude in degrees
    pub x: f64,
    /// Latitude in degrees
    pub y: f64,
    /// Elevation; zero for 2D data
    pub z: f64,
}

impl Position {
    /// Create a position from longitude, latitude and elevation
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Position { x, y, z }
    }

    /// The 2D projection as a `geo` point
    pub(crate) fn point(&self) -> Point<f64> {
        Point::new(self.x, self.y)
    }
}

/// A 3D axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BBox {
    /// Minimum corner
    pub min: Position,
    /// Maximum corner
    pub max: Position,
}

impl BBox {
    /// Create a bbox from two corners
    pub fn new(min: Position, max: Position) -> Self {
        BBox { min, max }
    }

    /// A degenerate bbox at a single position
    pub fn at(pos: Position) -> Self {
        BBox { min: pos, max: pos }
    }

    /// Build a box around a center point whose sides lie `meters` away
    /// along the four cardinal great-circle bearings. Z spans zero.
    pub fn from_center(lat: f64, lon: f64, meters: f64) -> Self {
        let center = Point::new(lon, lat);
        let north = Haversine::destination(center, 0.0, meters);
        let east = Haversine::destination(center, 90.0, meters);
        let south = Haversine::destination(center, 180.0, meters);
        let west = Haversine::destination(center, 270.0, meters);
        BBox {
            min: Position::new(west.x(), south.y(), 0.0),
            max: Position::new(east.x(), north.y(), 0.0),
        }
    }

    /// The center of the box
    pub fn center(&self) -> Position {
        Position::new(
            (self.min.x + self.max.x) / 2.0,
            (self.min.y + self.max.y) / 2.0,
            (self.min.z + self.max.z) / 2.0,
        )
    }

    /// Grow the box to cover `other`
    pub fn expand(&mut self, other: &BBox) {
        self.min.x = self.min.x.min(other.min.x);
        self.min.y = self.min.y.min(other.min.y);
        self.min.z = self.min.z.min(other.min.z);
        self.max.x = self.max.x.max(other.max.x);
        self.max.y = self.max.y.max(other.max.y);
        self.max.z = self.max.z.max(other.max.z);
    }

    /// Grow the box to cover a position
    pub fn expand_position(&mut self, pos: Position) {
        self.expand(&BBox::at(pos));
    }

    /// Whether the boxes overlap in all three axes
    pub fn intersects(&self, other: &BBox) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }

    /// Whether `pos` lies inside the box (inclusive)
    pub fn contains_position(&self, pos: Position) -> bool {
        pos.x >= self.min.x
            && pos.x <= self.max.x
            && pos.y >= self.min.y
            && pos.y <= self.max.y
            && pos.z >= self.min.z
            && pos.z <= self.max.z
    }

    /// Whether `other` lies entirely inside the box (inclusive)
    pub fn contains_bbox(&self, other: &BBox) -> bool {
        self.contains_position(other.min) && self.contains_position(other.max)
    }

    /// Split the box into a `2^level x 2^level` grid of equal tiles in
    /// the X/Y plane. Z extents carry through unchanged. Level 0 is the
    /// box itself.
    pub fn sparse(&self, level: u8) -> Vec<BBox> {
        if level == 0 {
            return vec![*self];
        }
        let split = 1usize << level;
        let dx = (self.max.x - self.min.x) / split as f64;
        let dy = (self.max.y - self.min.y) / split as f64;
        let mut tiles = Vec::with_capacity(split * split);
        for iy in 0..split {
            for ix in 0..split {
                let min = Position::new(
                    self.min.x + dx * ix as f64,
                    self.min.y + dy * iy as f64,
                    self.min.z,
                );
                let max = Position::new(min.x + dx, min.y + dy, self.max.z);
                tiles.push(BBox::new(min, max));
            }
        }
        tiles
    }
}
