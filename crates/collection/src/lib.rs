//! In-memory geospatial collection
//!
//! A `Collection` stores geometry and string objects keyed by string
//! id, keeping three coordinated indexes in lockstep:
//! - an id-ordered index for point lookups and directional id scans,
//! - a value-ordered index over non-geometry objects for value scans,
//! - a 3D R-tree over geometry objects for spatial queries
//!   (nearby / within / intersects, with optional sparse tiling).
//!
//! Each item carries an open-ended vector of numeric fields whose names
//! share a collection-wide name→slot registry. The whole collection
//! round-trips through a portable JSON snapshot document.
//!
//! The collection is not thread-safe: mutation and iteration assume
//! external serialization by the caller.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod collection;
pub mod fields;
pub mod snapshot;
mod spatial;

pub use collection::Collection;
pub use fields::FieldRegistry;
pub use snapshot::{Row, Snapshot, SnapshotError, SnapshotResult};

pub use geodex_core::{BBox, Feature, GeomError, Object, Position};
