use std::fmt;

use serde::{Deserialize, Serialize};

/// A coordinate on the celestial sphere, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Right ascension
    pub lon: f64,
    /// Declination
    pub lat: f64,
}

impl Point {
    pub const fn new(lon: f64, lat: f64) -> Self {
        Point { lon, lat }
    }

    fn approx_eq(&self, other: &Point, tolerance: f64) -> bool {
        (self.lon - other.lon).abs() <= tolerance && (self.lat - other.lat).abs() <= tolerance
    }
}

impl From<(f64, f64)> for Point {
    fn from((lon, lat): (f64, f64)) -> Self {
        Point { lon, lat }
    }
}

/// Reference frames that can appear in an STC-S coordinate system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Frame {
    Icrs,
    Fk4,
    Fk5,
    #[default]
    J2000,
    Galactic,
    Ecliptic,
    #[serde(rename = "UNKNOWNFRAME")]
    Unknown,
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Frame::Icrs => "ICRS",
            Frame::Fk4 => "FK4",
            Frame::Fk5 => "FK5",
            Frame::J2000 => "J2000",
            Frame::Galactic => "GALACTIC",
            Frame::Ecliptic => "ECLIPTIC",
            Frame::Unknown => "UNKNOWNFRAME",
        })
    }
}

/// Origin of the coordinate system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ReferencePosition {
    Barycenter,
    Geocenter,
    Heliocenter,
    Lsr,
    Topocenter,
    Relocatable,
    #[serde(rename = "UNKNOWNREFPOS")]
    Unknown,
}

impl fmt::Display for ReferencePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ReferencePosition::Barycenter => "BARYCENTER",
            ReferencePosition::Geocenter => "GEOCENTER",
            ReferencePosition::Heliocenter => "HELIOCENTER",
            ReferencePosition::Lsr => "LSR",
            ReferencePosition::Topocenter => "TOPOCENTER",
            ReferencePosition::Relocatable => "RELOCATABLE",
            ReferencePosition::Unknown => "UNKNOWNREFPOS",
        })
    }
}

/// The coordinate system a [`Region`] is expressed in.
///
/// Every region built by this crate uses [`CoordinateSystem::J2000`], the frame the archive's
/// `geography` columns are stored in.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CoordinateSystem {
    pub frame: Frame,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equinox: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_position: Option<ReferencePosition>,
}

impl CoordinateSystem {
    pub const J2000: CoordinateSystem = CoordinateSystem {
        frame: Frame::J2000,
        equinox: None,
        reference_position: None,
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionKind {
    Position,
    Polygon,
    Union,
    Complement,
}

impl fmt::Display for RegionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RegionKind::Position => "POSITION",
            RegionKind::Polygon => "POLYGON",
            RegionKind::Union => "UNION",
            RegionKind::Complement => "NOT",
        })
    }
}

/// The geometry of a [`Region`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Shape {
    Position(Point),
    /// An open ring: at least three vertices, the first one is not repeated at the end.
    Polygon(Vec<Point>),
    Union(Vec<Region>),
    /// Everything but the wrapped region. Only produced when decoding interior rings.
    Complement(Box<Region>),
}

/// A region of the celestial sphere.
///
/// Regions are plain values: they are built once (by the codec or by the caller) and never
/// mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    #[serde(default)]
    pub coordinate_system: CoordinateSystem,
    pub shape: Shape,
}

impl Region {
    pub fn new(coordinate_system: CoordinateSystem, shape: Shape) -> Self {
        Region {
            coordinate_system,
            shape,
        }
    }

    pub fn position(lon: f64, lat: f64) -> Self {
        Self::new(CoordinateSystem::J2000, Shape::Position(Point { lon, lat }))
    }

    pub fn polygon<P: Into<Point>>(points: impl IntoIterator<Item = P>) -> Self {
        Self::new(
            CoordinateSystem::J2000,
            Shape::Polygon(points.into_iter().map(Into::into).collect()),
        )
    }

    pub fn union(members: Vec<Region>) -> Self {
        Self::new(CoordinateSystem::J2000, Shape::Union(members))
    }

    pub fn complement(region: Region) -> Self {
        Self::new(CoordinateSystem::J2000, Shape::Complement(Box::new(region)))
    }

    pub fn kind(&self) -> RegionKind {
        match self.shape {
            Shape::Position(_) => RegionKind::Position,
            Shape::Polygon(_) => RegionKind::Polygon,
            Shape::Union(_) => RegionKind::Union,
            Shape::Complement(_) => RegionKind::Complement,
        }
    }

    /// The vertices of a position or polygon; empty for the other kinds.
    pub fn points(&self) -> &[Point] {
        match &self.shape {
            Shape::Position(point) => std::slice::from_ref(point),
            Shape::Polygon(points) => points,
            Shape::Union(_) | Shape::Complement(_) => &[],
        }
    }

    /// The members of a union; empty for the other kinds.
    pub fn members(&self) -> &[Region] {
        match &self.shape {
            Shape::Union(members) => members,
            _ => &[],
        }
    }

    /// Structural equality with every coordinate compared up to `tolerance` degrees.
    ///
    /// Values that went through the longitude complement twice are rarely bit-identical to the
    /// original, so this is the comparison to use after a round trip through the codec.
    pub fn approx_eq(&self, other: &Region, tolerance: f64) -> bool {
        if self.coordinate_system != other.coordinate_system {
            return false;
        }
        match (&self.shape, &other.shape) {
            (Shape::Position(a), Shape::Position(b)) => a.approx_eq(b, tolerance),
            (Shape::Polygon(a), Shape::Polygon(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(a, b)| a.approx_eq(b, tolerance))
            }
            (Shape::Union(a), Shape::Union(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(a, b)| a.approx_eq(b, tolerance))
            }
            (Shape::Complement(a), Shape::Complement(b)) => a.approx_eq(b, tolerance),
            _ => false,
        }
    }
}
