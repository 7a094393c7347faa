//! Conversion between [`Region`]s and SQL Server `geography` bytes.
//!
//! This is the only place that knows how ADQL regions are laid out in the archive's
//! `geography` columns. Only three kinds of stored values are understood: points, polygons and
//! geometry collections of polygons.
use tracing::{debug, trace, warn};

use crate::geography::{
    FIGURE_INTERIOR_RING, Geography, OpenGisType, PROPERTIES_OFFSET, SerializationProperties,
    read_srid,
};
use crate::region::{CoordinateSystem, Point, Region, Shape};
use crate::transform::complement_longitude;
use crate::{GeographyError, Result, SRID, region_to_wkt};

/// Properties byte of every point stored in the archive.
///
/// The generic constructors do not validate geometries and therefore leave
/// [`SerializationProperties::IS_VALID`] unset, while the archive's rows (and the queries
/// comparing against them) carry it. The byte at [`PROPERTIES_OFFSET`] is overwritten after
/// serialization.
pub const LEGACY_POINT_PROPERTIES: SerializationProperties =
    SerializationProperties::IS_VALID.union(SerializationProperties::IS_SINGLE_POINT);

/// Properties byte of every polygon and geometry collection stored in the archive.
///
/// See [`LEGACY_POINT_PROPERTIES`].
pub const LEGACY_SHAPE_PROPERTIES: SerializationProperties = SerializationProperties::IS_VALID;

/// Decode a `geography` value.
///
/// Returns `Ok(None)` when the value is of a kind regions are never stored as (line strings,
/// multi-geometries, curves, empty values). Unlike a wrong SRID this is not an error.
pub fn decode(bytes: &[u8]) -> Result<Option<Region>> {
    let srid = read_srid(bytes)?;
    if srid != SRID {
        return Err(GeographyError::CoordinateSystem(srid));
    }

    let geography = Geography::parse(bytes)?;
    match geography.geography_type() {
        Some(OpenGisType::Point) => Ok(decode_point(&geography)),
        Some(OpenGisType::Polygon) => decode_polygon(&geography).map(Some),
        Some(OpenGisType::GeometryCollection) => decode_collection(&geography).map(Some),
        other => {
            debug!(
                geography_type = other.map(OpenGisType::name),
                shape_type = geography.shapes().first().map(|s| s.open_gis_type),
                "No region for geography type"
            );
            Ok(None)
        }
    }
}

fn decode_point(geography: &Geography) -> Option<Region> {
    let (&lat, &lon) = geography
        .latitudes()
        .first()
        .zip(geography.longitudes().first())?;
    Some(Region::new(
        CoordinateSystem::J2000,
        Shape::Position(Point::new(complement_longitude(lon), lat)),
    ))
}

/// Only the exterior ring is read.
///
/// Holes are not supported for polygons: the points of any further figure are discarded. Holes
/// in geometry collections are decoded, see [`decode_collection`].
fn decode_polygon(geography: &Geography) -> Result<Region> {
    let last = match geography.figures() {
        [_, second, rest @ ..] => {
            warn!(
                interior_rings = 1 + rest.len(),
                "Discarding interior rings of polygon"
            );
            second.point_offset
        }
        _ => geography.num_points(),
    };
    polygon(extract_points(geography, 0, last))
}

/// One region per figure, interior rings wrapped in a complement.
///
/// A single figure is returned as is, without a union around it.
fn decode_collection(geography: &Geography) -> Result<Region> {
    if geography.figures().is_empty() {
        return Err(GeographyError::InvalidInput(
            "Geometry collection without figures".into(),
        ));
    }
    let num_points = geography.num_points();
    let mut regions = Vec::with_capacity(geography.figures().len());
    // walk backwards, each figure ends where the next one starts
    let mut next_first = num_points;
    for figure in geography.figures().iter().rev() {
        let first = figure.point_offset;
        let last = next_first.min(num_points);
        next_first = first;

        let region = figure_region(geography, first, last)?;
        if figure.attribute == FIGURE_INTERIOR_RING {
            regions.push(Region::complement(region));
        } else {
            regions.push(region);
        }
    }
    regions.reverse();

    if regions.len() == 1 {
        Ok(regions.remove(0))
    } else {
        Ok(Region::union(regions))
    }
}

fn figure_region(geography: &Geography, first: usize, last: usize) -> Result<Region> {
    if last.saturating_sub(first) == 1 {
        let lat = geography.latitudes()[first];
        let lon = geography.longitudes()[first];
        return Ok(Region::position(complement_longitude(lon), lat));
    }
    polygon(extract_points(geography, first, last))
}

/// A ring needs at least three vertices once the closing point is dropped.
fn polygon(points: Vec<Point>) -> Result<Region> {
    if points.len() < 3 {
        return Err(GeographyError::InvalidInput(format!(
            "Polygon with {} vertices, expected at least 3",
            points.len()
        )));
    }
    Ok(Region::new(CoordinateSystem::J2000, Shape::Polygon(points)))
}

/// The points in `[first, last)` but the last one, which closes the ring.
fn extract_points(geography: &Geography, first: usize, last: usize) -> Vec<Point> {
    let end = last.saturating_sub(1).min(geography.num_points());
    (first..end)
        .map(|i| {
            Point::new(
                complement_longitude(geography.longitudes()[i]),
                geography.latitudes()[i],
            )
        })
        .collect()
}

fn patch_properties(mut bytes: Vec<u8>, properties: SerializationProperties) -> Vec<u8> {
    trace!(
        from = bytes[PROPERTIES_OFFSET],
        to = properties.bits(),
        "Patching geography properties"
    );
    bytes[PROPERTIES_OFFSET] = properties.bits();
    bytes
}

/// Encode a region as a `geography` value.
///
/// Positions, polygons of at least three vertices and unions of such polygons are supported.
/// Anything else fails with [`GeographyError::UnsupportedRegion`].
pub fn encode(region: &Region) -> Result<Vec<u8>> {
    match &region.shape {
        Shape::Position(point) => {
            let geography = Geography::point(point.lat, complement_longitude(point.lon), SRID)?;
            Ok(patch_properties(
                geography.serialize(),
                LEGACY_POINT_PROPERTIES,
            ))
        }
        Shape::Polygon(_) | Shape::Union(_) => {
            let wkt = region_to_wkt(region)
                .ok_or(GeographyError::UnsupportedRegion(region.kind()))?;
            let geography = Geography::from_wkt(&wkt, SRID)?;
            Ok(patch_properties(
                geography.serialize(),
                LEGACY_SHAPE_PROPERTIES,
            ))
        }
        Shape::Complement(_) => Err(GeographyError::UnsupportedRegion(region.kind())),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::RegionKind;
    use crate::geography::{FIGURE_EXTERIOR_RING, FIGURE_STROKE};

    /// Builds a general layout value by hand: points are (lon, lat) in SQL Server convention.
    fn make_geography_bytes(
        srid: i32,
        points: &[(f64, f64)],
        figures: &[(u8, i32)],
        shapes: &[(i32, i32, u8)],
    ) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&srid.to_le_bytes());
        bytes.push(1);
        bytes.push(SerializationProperties::IS_VALID.bits());
        bytes.extend_from_slice(&(points.len() as u32).to_le_bytes());
        for (lon, lat) in points {
            bytes.extend_from_slice(&lat.to_le_bytes());
            bytes.extend_from_slice(&lon.to_le_bytes());
        }
        bytes.extend_from_slice(&(figures.len() as u32).to_le_bytes());
        for (attribute, offset) in figures {
            bytes.push(*attribute);
            bytes.extend_from_slice(&offset.to_le_bytes());
        }
        bytes.extend_from_slice(&(shapes.len() as u32).to_le_bytes());
        for (parent, figure, ty) in shapes {
            bytes.extend_from_slice(&parent.to_le_bytes());
            bytes.extend_from_slice(&figure.to_le_bytes());
            bytes.push(*ty);
        }
        bytes
    }

    fn square(lon: f64, lat: f64) -> Vec<(f64, f64)> {
        vec![
            (lon, lat),
            (lon + 1.0, lat),
            (lon + 1.0, lat + 1.0),
            (lon, lat + 1.0),
            (lon, lat),
        ]
    }

    const POLYGON: u8 = OpenGisType::Polygon as u8;
    const COLLECTION: u8 = OpenGisType::GeometryCollection as u8;

    #[test]
    fn encode_position() {
        let bytes = encode(&Region::position(10.0, 20.0)).unwrap();

        assert_eq!(bytes.len(), 22);
        assert_eq!(&bytes[0..4], &SRID.to_le_bytes());
        assert_eq!(bytes[PROPERTIES_OFFSET], 12);
        assert_eq!(&bytes[6..14], &20.0f64.to_le_bytes());
        assert_eq!(&bytes[14..22], &170.0f64.to_le_bytes());
    }

    #[test]
    fn encode_polygon_patches_properties() {
        let region = Region::polygon([(10.0, 20.0), (11.0, 20.0), (11.0, 21.0)]);
        let bytes = encode(&region).unwrap();

        assert_eq!(bytes[PROPERTIES_OFFSET], 4);
        let geography = Geography::parse(&bytes).unwrap();
        assert_eq!(geography.num_points(), 4);
        assert_eq!(geography.longitudes(), &[170.0, 169.0, 169.0, 170.0]);
        assert_eq!(geography.latitudes(), &[20.0, 20.0, 21.0, 20.0]);
    }

    #[test]
    fn encode_union_patches_properties() {
        let region = Region::union(vec![
            Region::polygon([(10.0, 20.0), (11.0, 20.0), (11.0, 21.0)]),
            Region::polygon([(30.0, 20.0), (31.0, 20.0), (31.0, 21.0)]),
        ]);
        let bytes = encode(&region).unwrap();

        assert_eq!(bytes[PROPERTIES_OFFSET], 4);
        let geography = Geography::parse(&bytes).unwrap();
        assert_eq!(
            geography.geography_type(),
            Some(OpenGisType::GeometryCollection)
        );
        assert_eq!(geography.figures().len(), 2);
    }

    #[test]
    fn encode_complement_is_unsupported() {
        let region = Region::complement(Region::polygon([(1.0, 2.0), (3.0, 4.0), (5.0, 6.0)]));
        assert_eq!(
            encode(&region),
            Err(GeographyError::UnsupportedRegion(RegionKind::Complement))
        );
    }

    #[test]
    fn encode_union_with_position_is_unsupported() {
        let region = Region::union(vec![Region::position(1.0, 2.0)]);
        assert_eq!(
            encode(&region),
            Err(GeographyError::UnsupportedRegion(RegionKind::Union))
        );
    }

    #[test]
    fn encode_construction_failure() {
        let region = Region::polygon([(10.0, 20.0), (11.0, 95.0), (11.0, 21.0)]);
        assert!(matches!(
            encode(&region),
            Err(GeographyError::Construction(_))
        ));
        assert!(matches!(
            encode(&Region::position(0.0, f64::NAN)),
            Err(GeographyError::Construction(_))
        ));
    }

    #[test]
    fn decode_wrong_srid() {
        let bytes = make_geography_bytes(4326, &square(0.0, 0.0), &[(2, 0)], &[(-1, 0, POLYGON)]);
        assert_eq!(decode(&bytes), Err(GeographyError::CoordinateSystem(4326)));
    }

    #[test]
    fn decode_wrong_srid_before_parsing_body() {
        let mut bytes = 4326i32.to_le_bytes().to_vec();
        bytes.push(42);
        assert_eq!(decode(&bytes), Err(GeographyError::CoordinateSystem(4326)));
    }

    #[test]
    fn decode_point() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&SRID.to_le_bytes());
        bytes.push(1);
        bytes.push(LEGACY_POINT_PROPERTIES.bits());
        bytes.extend_from_slice(&(-30.0f64).to_le_bytes());
        bytes.extend_from_slice(&100.0f64.to_le_bytes());

        assert_eq!(decode(&bytes), Ok(Some(Region::position(80.0, -30.0))));
    }

    #[test]
    fn decode_polygon_drops_closing_point() {
        let bytes = make_geography_bytes(
            SRID,
            &square(170.0, 20.0),
            &[(FIGURE_EXTERIOR_RING, 0)],
            &[(-1, 0, POLYGON)],
        );
        assert_eq!(
            decode(&bytes).unwrap(),
            Some(Region::polygon([
                (10.0, 20.0),
                (9.0, 20.0),
                (9.0, 21.0),
                (10.0, 21.0)
            ]))
        );
    }

    #[test]
    fn decode_polygon_ignores_interior_rings() {
        adql_logging::init_test_logging();
        // Holes are not decoded for polygons, only the exterior ring is kept
        let mut points = square(170.0, 20.0);
        points.extend([
            (170.2, 20.2),
            (170.2, 20.8),
            (170.8, 20.8),
            (170.8, 20.2),
            (170.2, 20.2),
        ]);
        let bytes = make_geography_bytes(
            SRID,
            &points,
            &[(FIGURE_EXTERIOR_RING, 0), (FIGURE_INTERIOR_RING, 5)],
            &[(-1, 0, POLYGON)],
        );
        let region = decode(&bytes).unwrap().unwrap();
        assert_eq!(region.kind(), RegionKind::Polygon);
        assert_eq!(region.points().len(), 4);
        assert_eq!(region.points()[0], Point::new(10.0, 20.0));
    }

    #[test]
    fn decode_collection_with_one_figure_is_not_a_union() {
        let bytes = make_geography_bytes(
            SRID,
            &square(170.0, 20.0),
            &[(FIGURE_EXTERIOR_RING, 0)],
            &[(-1, 0, COLLECTION), (0, 0, POLYGON)],
        );
        let region = decode(&bytes).unwrap().unwrap();
        assert_eq!(region.kind(), RegionKind::Polygon);
        assert_eq!(region.points().len(), 4);
    }

    #[test]
    fn decode_collection_keeps_figure_order() {
        let mut points = square(170.0, 20.0);
        points.extend(square(100.0, -10.0));
        let bytes = make_geography_bytes(
            SRID,
            &points,
            &[(FIGURE_EXTERIOR_RING, 0), (FIGURE_EXTERIOR_RING, 5)],
            &[(-1, 0, COLLECTION), (0, 0, POLYGON), (0, 1, POLYGON)],
        );
        let region = decode(&bytes).unwrap().unwrap();

        assert_eq!(region.kind(), RegionKind::Union);
        let members = region.members();
        assert_eq!(members.len(), 2);
        assert_eq!(members[0].points()[0], Point::new(10.0, 20.0));
        assert_eq!(members[1].points()[0], Point::new(80.0, -10.0));
        assert!(members.iter().all(|m| m.points().len() == 4));
    }

    #[test]
    fn decode_collection_interior_ring_is_complement() {
        let mut points = square(170.0, 20.0);
        points.extend(square(170.2, 20.2));
        let bytes = make_geography_bytes(
            SRID,
            &points,
            &[(FIGURE_EXTERIOR_RING, 0), (FIGURE_INTERIOR_RING, 5)],
            &[(-1, 0, COLLECTION), (0, 0, POLYGON)],
        );
        let region = decode(&bytes).unwrap().unwrap();

        let members = region.members();
        assert_eq!(members[0].kind(), RegionKind::Polygon);
        assert_eq!(members[1].kind(), RegionKind::Complement);
        let Shape::Complement(hole) = &members[1].shape else {
            panic!("expected a complement, got {:?}", members[1]);
        };
        assert_eq!(hole.points().len(), 4);
    }

    #[test]
    fn decode_collection_point_figure() {
        let mut points = square(170.0, 20.0);
        points.push((100.0, 5.0));
        let bytes = make_geography_bytes(
            SRID,
            &points,
            &[(FIGURE_EXTERIOR_RING, 0), (FIGURE_STROKE, 5)],
            &[(-1, 0, COLLECTION), (0, 0, POLYGON), (0, 1, 1)],
        );
        let region = decode(&bytes).unwrap().unwrap();
        assert_eq!(region.members()[1], Region::position(80.0, 5.0));
    }

    #[test]
    fn decode_collection_without_figures() {
        let bytes = make_geography_bytes(SRID, &[], &[], &[(-1, -1, COLLECTION)]);
        assert!(matches!(
            decode(&bytes),
            Err(GeographyError::InvalidInput(_))
        ));
    }

    #[test]
    fn decode_collection_two_point_figure() {
        let mut points = square(170.0, 20.0);
        points.extend([(5.0, 5.0), (6.0, 6.0)]);
        let bytes = make_geography_bytes(
            SRID,
            &points,
            &[(FIGURE_EXTERIOR_RING, 0), (FIGURE_STROKE, 5)],
            &[(-1, 0, COLLECTION), (0, 0, POLYGON), (0, 1, 2)],
        );
        assert!(matches!(
            decode(&bytes),
            Err(GeographyError::InvalidInput(_))
        ));
    }

    #[test]
    fn decode_degenerate_polygon() {
        // a closed ring over two vertices
        let bytes = make_geography_bytes(
            SRID,
            &[(170.0, 20.0), (169.0, 20.0), (170.0, 20.0)],
            &[(FIGURE_EXTERIOR_RING, 0)],
            &[(-1, 0, POLYGON)],
        );
        assert!(matches!(
            decode(&bytes),
            Err(GeographyError::InvalidInput(_))
        ));

        let empty_ring = make_geography_bytes(
            SRID,
            &[],
            &[(FIGURE_EXTERIOR_RING, 0)],
            &[(-1, 0, POLYGON)],
        );
        assert!(matches!(
            decode(&empty_ring),
            Err(GeographyError::InvalidInput(_))
        ));
    }

    #[test]
    fn encode_degenerate_polygon_is_unsupported() {
        assert_eq!(
            encode(&Region::polygon([(1.0, 2.0)])),
            Err(GeographyError::UnsupportedRegion(RegionKind::Polygon))
        );
        assert_eq!(
            encode(&Region::polygon([(1.0, 2.0), (3.0, 4.0)])),
            Err(GeographyError::UnsupportedRegion(RegionKind::Polygon))
        );
        let union = Region::union(vec![
            Region::polygon([(10.0, 20.0), (11.0, 20.0), (11.0, 21.0)]),
            Region::polygon([(1.0, 2.0)]),
        ]);
        assert_eq!(
            encode(&union),
            Err(GeographyError::UnsupportedRegion(RegionKind::Union))
        );
    }

    #[test]
    fn decode_unrecognized_type_returns_no_region() {
        let line = make_geography_bytes(
            SRID,
            &[(0.0, 0.0), (1.0, 1.0), (2.0, 0.0)],
            &[(FIGURE_STROKE, 0)],
            &[(-1, 0, OpenGisType::LineString as u8)],
        );
        assert_eq!(decode(&line), Ok(None));

        let multi = make_geography_bytes(
            SRID,
            &square(170.0, 20.0),
            &[(FIGURE_EXTERIOR_RING, 0)],
            &[(-1, 0, OpenGisType::MultiPolygon as u8), (0, 0, POLYGON)],
        );
        assert_eq!(decode(&multi), Ok(None));

        let unknown = make_geography_bytes(SRID, &square(0.0, 0.0), &[(2, 0)], &[(-1, 0, 99)]);
        assert_eq!(decode(&unknown), Ok(None));

        let empty = make_geography_bytes(SRID, &[], &[], &[]);
        assert_eq!(decode(&empty), Ok(None));
    }

    #[test]
    fn decode_truncated_input() {
        let bytes = make_geography_bytes(
            SRID,
            &square(170.0, 20.0),
            &[(FIGURE_EXTERIOR_RING, 0)],
            &[(-1, 0, POLYGON)],
        );
        assert!(matches!(
            decode(&bytes[..bytes.len() - 3]),
            Err(GeographyError::InvalidInput(_))
        ));
        assert!(matches!(
            decode(&[0x01, 0x02]),
            Err(GeographyError::InvalidInput(_))
        ));
    }
}
