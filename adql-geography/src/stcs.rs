//! STC-S rendering of regions, as returned to TAP clients.
use std::fmt;

use crate::region::{CoordinateSystem, Point, Region, Shape};

impl fmt::Display for CoordinateSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.frame)?;
        if let Some(equinox) = &self.equinox {
            write!(f, " {equinox}")?;
        }
        if let Some(reference_position) = self.reference_position {
            write!(f, " {reference_position}")?;
        }
        Ok(())
    }
}

fn write_points(f: &mut fmt::Formatter<'_>, points: &[Point]) -> fmt::Result {
    for point in points {
        write!(f, " {} {}", point.lon, point.lat)?;
    }
    Ok(())
}

/// Members of a union or complement inherit the coordinate system of the outermost region.
fn write_region(f: &mut fmt::Formatter<'_>, region: &Region, with_frame: bool) -> fmt::Result {
    let kind = region.kind();
    match &region.shape {
        Shape::Complement(inner) => {
            write!(f, "{kind} (")?;
            write_region(f, inner, with_frame)?;
            return write!(f, ")");
        }
        _ => write!(f, "{kind}")?,
    }
    if with_frame {
        write!(f, " {}", region.coordinate_system)?;
    }
    match &region.shape {
        Shape::Position(point) => write_points(f, std::slice::from_ref(point)),
        Shape::Polygon(points) => write_points(f, points),
        Shape::Union(members) => {
            write!(f, " (")?;
            for (i, member) in members.iter().enumerate() {
                if i > 0 {
                    write!(f, " ")?;
                }
                write_region(f, member, false)?;
            }
            write!(f, ")")
        }
        Shape::Complement(_) => Ok(()),
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_region(f, self, true)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::{CoordinateSystem, Frame, ReferencePosition, Region};

    #[test]
    fn position() {
        assert_eq!(
            Region::position(10.5, -20.0).to_string(),
            "POSITION J2000 10.5 -20"
        );
    }

    #[test]
    fn polygon() {
        assert_eq!(
            Region::polygon([(1.0, 2.0), (3.0, 4.0), (5.0, 6.0)]).to_string(),
            "POLYGON J2000 1 2 3 4 5 6"
        );
    }

    #[test]
    fn union_with_hole() {
        let region = Region::union(vec![
            Region::polygon([(1.0, 2.0), (3.0, 4.0), (5.0, 6.0)]),
            Region::complement(Region::polygon([(2.0, 3.0), (3.0, 3.0), (3.0, 4.0)])),
        ]);
        assert_eq!(
            region.to_string(),
            "UNION J2000 (POLYGON 1 2 3 4 5 6 NOT (POLYGON 2 3 3 3 3 4))"
        );
    }

    #[test]
    fn coordinate_system() {
        let cs = CoordinateSystem {
            frame: Frame::Fk4,
            equinox: Some("B1950".into()),
            reference_position: Some(ReferencePosition::Geocenter),
        };
        assert_eq!(cs.to_string(), "FK4 B1950 GEOCENTER");
        assert_eq!(CoordinateSystem::J2000.to_string(), "J2000");
    }
}
