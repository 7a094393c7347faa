use itertools::Itertools;

use crate::region::{Point, Region, Shape};
use crate::transform::complement_longitude;

fn format_vertex(point: &Point) -> String {
    format!("{} {}", complement_longitude(point.lon), point.lat)
}

/// Render a region as WKT in SQL Server's longitude convention.
///
/// Returns `None` for regions WKT cannot express here: positions, complements, polygons with
/// fewer than three vertices, and unions containing any of them. Callers turn that into an
/// error; there is no partial output.
pub fn region_to_wkt(region: &Region) -> Option<String> {
    match &region.shape {
        Shape::Polygon(points) if points.len() < 3 => None,
        Shape::Polygon(points) => {
            let first = &points[0];
            // SQL Server rings have to be closed, so the first vertex goes in again
            let ring = points.iter().chain(Some(first)).map(format_vertex).join(",");
            Some(format!("POLYGON(({ring}))"))
        }
        Shape::Union(members) => {
            let members = members
                .iter()
                .map(region_to_wkt)
                .collect::<Option<Vec<_>>>()?;
            Some(format!("GEOMETRYCOLLECTION({})", members.join(",")))
        }
        Shape::Position(_) | Shape::Complement(_) => None,
    }
}
