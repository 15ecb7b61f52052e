//! Spatial queries
//!
//! Nearby, Within and Intersects share one skeleton: build a query
//! bbox, run the R-tree over it (or over a tile grid in sparse mode)
//! and refine candidates with the object predicate before they reach
//! the visitor.
//!
//! Sparse mode (`sparse > 0`) cuts the query box into a
//! `2^sparse x 2^sparse` grid and searches each tile independently
//! with cursor 0; sparse queries are not resumable and always return
//! cursor 0. The visitor contract flips in sparse mode: a visitor
//! returning `true` halts the whole query, which is how callers sample
//! one hit per area. Non-sparse queries keep the usual
//! false-stops-iteration contract and return the R-tree cursor.
//!
//! Nearby derives its tiles from the query box itself
//! ([`BBox::sparse`]); Within and Intersects subdivide latitude and
//! longitude directly here. The two tilings are intentionally distinct.

use geodex_core::{BBox, Object, Position};

use crate::collection::Collection;

fn subdivide(bbox: &BBox, sparse: u8, min_z: f64, max_z: f64) -> Vec<BBox> {
    let split = 1usize << sparse;
    let dx = (bbox.max.x - bbox.min.x) / split as f64;
    let dy = (bbox.max.y - bbox.min.y) / split as f64;
    let mut tiles = Vec::with_capacity(split * split);
    for iy in 0..split {
        for ix in 0..split {
            let min = Position::new(
                bbox.min.x + dx * ix as f64,
                bbox.min.y + dy * iy as f64,
                min_z,
            );
            let max = Position::new(min.x + dx, min.y + dy, max_z);
            tiles.push(BBox::new(min, max));
        }
    }
    tiles
}

#[allow(clippy::too_many_arguments)]
fn explicit_bbox(
    target: Option<&Object>,
    min_lat: f64,
    min_lon: f64,
    max_lat: f64,
    max_lon: f64,
    min_z: f64,
    max_z: f64,
) -> BBox {
    match target {
        Some(target) => target.calculated_bbox(),
        None => BBox::new(
            Position::new(min_lon, min_lat, min_z),
            Position::new(max_lon, max_lat, max_z),
        ),
    }
}

impl Collection {
    fn geo_search<F>(&self, cursor: u64, bbox: BBox, mut visit: F) -> u64
    where
        F: FnMut(&str, &Object, &[f64]) -> bool,
    {
        self.index.search(cursor, bbox, |item_id| {
            let item = self.item(item_id);
            visit(&item.id, &item.object, &item.fields)
        })
    }

    /// Query objects near a center point
    ///
    /// The query box spans `meters` in every direction around
    /// `(lat, lon)`; candidates are kept when any of their positions
    /// lies within `meters` great-circle distance of the center.
    #[allow(clippy::too_many_arguments)]
    pub fn nearby<F>(
        &self,
        cursor: u64,
        sparse: u8,
        lat: f64,
        lon: f64,
        meters: f64,
        min_z: f64,
        max_z: f64,
        mut visit: F,
    ) -> u64
    where
        F: FnMut(&str, &Object, &[f64]) -> bool,
    {
        let center = Position::new(lon, lat, 0.0);
        let mut bbox = BBox::from_center(lat, lon, meters);
        if sparse > 0 {
            let mut halted = false;
            for mut tile in bbox.sparse(sparse) {
                tile.min.z = min_z;
                tile.max.z = max_z;
                self.geo_search(0, tile, |id, object, fields| {
                    if object.nearby(center, meters) && visit(id, object, fields) {
                        halted = true;
                        return false;
                    }
                    true
                });
                if halted {
                    break;
                }
            }
            return 0;
        }
        bbox.min.z = min_z;
        bbox.max.z = max_z;
        self.geo_search(cursor, bbox, |id, object, fields| {
            if object.nearby(center, meters) {
                visit(id, object, fields)
            } else {
                true
            }
        })
    }

    /// Query objects fully contained in a target object or bbox
    ///
    /// With a `target`, the query box is the target's calculated bbox
    /// and candidates refine through `object.within(target)`; without
    /// one, the explicit box applies and candidates refine through
    /// `object.within_bbox` (against the tile in sparse mode).
    #[allow(clippy::too_many_arguments)]
    pub fn within<F>(
        &self,
        cursor: u64,
        sparse: u8,
        target: Option<&Object>,
        min_lat: f64,
        min_lon: f64,
        max_lat: f64,
        max_lon: f64,
        min_z: f64,
        max_z: f64,
        mut visit: F,
    ) -> u64
    where
        F: FnMut(&str, &Object, &[f64]) -> bool,
    {
        let bbox = explicit_bbox(target, min_lat, min_lon, max_lat, max_lon, min_z, max_z);
        if sparse > 0 {
            let mut halted = false;
            for tile in subdivide(&bbox, sparse, min_z, max_z) {
                self.geo_search(0, tile, |id, object, fields| {
                    let keep = match target {
                        Some(target) => object.within(target),
                        None => object.within_bbox(tile),
                    };
                    if keep && visit(id, object, fields) {
                        halted = true;
                        return false;
                    }
                    true
                });
                if halted {
                    break;
                }
            }
            return 0;
        }
        self.geo_search(cursor, bbox, |id, object, fields| {
            let keep = match target {
                Some(target) => object.within(target),
                None => object.within_bbox(bbox),
            };
            if keep {
                visit(id, object, fields)
            } else {
                true
            }
        })
    }

    /// Query objects intersecting a target object or bbox
    ///
    /// Box selection mirrors [`Collection::within`]; refinement uses
    /// the intersects predicates instead.
    #[allow(clippy::too_many_arguments)]
    pub fn intersects<F>(
        &self,
        cursor: u64,
        sparse: u8,
        target: Option<&Object>,
        min_lat: f64,
        min_lon: f64,
        max_lat: f64,
        max_lon: f64,
        min_z: f64,
        max_z: f64,
        mut visit: F,
    ) -> u64
    where
        F: FnMut(&str, &Object, &[f64]) -> bool,
    {
        let bbox = explicit_bbox(target, min_lat, min_lon, max_lat, max_lon, min_z, max_z);
        if sparse > 0 {
            let mut halted = false;
            for tile in subdivide(&bbox, sparse, min_z, max_z) {
                self.geo_search(0, tile, |id, object, fields| {
                    let keep = match target {
                        Some(target) => object.intersects(target),
                        None => object.intersects_bbox(tile),
                    };
                    if keep && visit(id, object, fields) {
                        halted = true;
                        return false;
                    }
                    true
                });
                if halted {
                    break;
                }
            }
            return 0;
        }
        self.geo_search(cursor, bbox, |id, object, fields| {
            let keep = match target {
                Some(target) => object.intersects(target),
                None => object.intersects_bbox(bbox),
            };
            if keep {
                visit(id, object, fields)
            } else {
                true
            }
        })
    }
}
