//! Coordinate conversions between ADQL and SQL Server.

/// SQL Server longitudes are measured from the opposite meridian: `lon = 180 - ra`.
pub const LONGITUDE_ORIGIN: f64 = 180.0;

/// Converts a right ascension into a SQL Server longitude, and back.
///
/// The conversion is its own inverse.
#[inline]
pub fn complement_longitude(lon: f64) -> f64 {
    LONGITUDE_ORIGIN - lon
}

#[inline]
pub fn degrees_to_radians(degrees: f64) -> f64 {
    degrees.to_radians()
}

#[inline]
pub fn radians_to_degrees(radians: f64) -> f64 {
    radians.to_degrees()
}

/// Solid angle in square degrees, as computed by the archive's `AREA()`.
///
/// One radian-to-degree factor per dimension, i.e. `sr * (180/π)²`.
#[inline]
pub fn steradians_to_square_degrees(steradians: f64) -> f64 {
    radians_to_degrees(radians_to_degrees(steradians))
}
