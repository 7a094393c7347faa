//! ADQL regions and their SQL Server `geography` representation.
//!
//! The archive stores sky footprints in SQL Server `geography` columns. SQL Server works in
//! latitude/longitude, where ADQL works in RA/Dec over the J2000 frame, with RA = 180 - longitude
//! and Dec = latitude. Every coordinate crossing the boundary goes through
//! [`transform::complement_longitude`].
//!
//! This crate owns the mapping between the two worlds:
//!
//! - [`Region`], the value type handed to and received from the rest of the TAP service,
//! - [`codec::decode`] and [`codec::encode`], the only way to turn `geography` bytes into a
//!   [`Region`] and back,
//! - [`region_to_wkt`], the WKT rendering used both when encoding and when the SQL translator
//!   inlines a region literal.
//!
//! Only the geometries present in the archive are supported: points, polygons and geometry
//! collections of polygons. The byte layout is described in [MS-SSCLRT] (the "CLR"
//! serialization); see [`geography`] for the parts we read and write.
//!
//! [MS-SSCLRT]: https://learn.microsoft.com/en-us/openspecs/sql_server_protocols/ms-ssclrt
use thiserror::Error;

pub mod codec;
pub mod geography;
mod region;
mod stcs;
pub mod transform;
mod wkt_writer;

pub use codec::{decode, encode};
pub use region::{CoordinateSystem, Frame, Point, ReferencePosition, Region, RegionKind, Shape};
pub use wkt_writer::region_to_wkt;

/// The only spatial reference identifier stored in the archive's `geography` columns.
pub const SRID: i32 = 104001;

/// Error type for the adql-geography crate.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GeographyError {
    /// The value was serialized with a spatial reference we do not support.
    #[error("Wrong coordinate system {0}, expected {SRID}")]
    CoordinateSystem(i32),
    /// The region has no `geography` representation.
    #[error("Unsupported Region {0}")]
    UnsupportedRegion(RegionKind),
    /// Building a `geography` value from a region failed.
    #[error("Could not construct geography: {0}")]
    Construction(String),
    /// Invalid input data (malformed bytes, wrong length, etc.)
    #[error("{0}")]
    InvalidInput(String),
}

pub type Result<T> = std::result::Result<T, GeographyError>;
