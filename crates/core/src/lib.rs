//! Geometry object model for geodex
//!
//! This crate defines the foundational geometry types consumed by the
//! collection layer:
//! - `Position`: a 3D coordinate (x = longitude, y = latitude, z = elevation)
//! - `BBox`: a 3D axis-aligned bounding box with great-circle construction
//!   and sparse tiling
//! - `Object`: the tagged GeoJSON variant (Point, LineString, Polygon,
//!   Feature, plain String, ...) with the capability set the collection
//!   relies on: geometry/non-geometry classification, bounds, weight
//!   accounting, textual encodings, and spatial predicates
//! - `GeomError`: parse errors for the auto-typed GeoJSON reader
//!
//! Polygon containment and intersection delegate to the `geo` crate;
//! great-circle distance and destination use its Haversine measures.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
mod geojson;
pub mod object;
pub mod position;

pub use error::{GeomError, Result};
pub use object::{Feature, Object};
pub use position::{BBox, Position};
