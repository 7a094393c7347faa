//! SQL Server `geography` values in their CLR serialization.
//!
//! A [`Geography`] is a parsed view over the bytes SQL Server returns for a `geography` column:
//! the header, the flattened coordinate arrays, the figure table and the shape table. It knows
//! nothing about ADQL; [`crate::codec`] interprets it.
//!
//! # Format (all integers little endian)
//!
//! - 4 bytes: SRID
//! - 1 byte: version (1, or 2 when the value contains arcs)
//! - 1 byte: serialization properties, see [`SerializationProperties`]
//! - single point: 8 bytes latitude + 8 bytes longitude
//! - single line segment: two such points
//! - otherwise:
//!   - 4 bytes: number of points, then for each point 8 bytes latitude + 8 bytes longitude
//!   - Z values then M values (8 bytes per point each), when flagged
//!   - 4 bytes: number of figures, then for each figure 1 byte attribute + 4 bytes point offset
//!   - 4 bytes: number of shapes, then for each shape 4 bytes parent offset + 4 bytes figure
//!     offset + 1 byte OpenGIS type
//!   - version 2 only: 4 bytes number of segments, then 1 byte per segment
//!
//! Reference: <https://learn.microsoft.com/en-us/openspecs/sql_server_protocols/ms-ssclrt>
use std::str::FromStr;

use bitflags::bitflags;
use geo_types::{Coord, Geometry};
use tracing::trace;

use crate::{GeographyError, Result};

pub const SRID_OFFSET: usize = 0;
pub const VERSION_OFFSET: usize = 4;
pub const PROPERTIES_OFFSET: usize = 5;
pub const PAYLOAD_OFFSET: usize = 6;

const NUM_OF_BYTES_U8: usize = std::mem::size_of::<u8>();
const NUM_OF_BYTES_U32: usize = std::mem::size_of::<u32>();
const NUM_OF_BYTES_F64: usize = std::mem::size_of::<f64>();
const NUM_OF_BYTES_POINT: usize = 2 * NUM_OF_BYTES_F64;
const NUM_OF_BYTES_FIGURE: usize = NUM_OF_BYTES_U8 + NUM_OF_BYTES_U32;
const NUM_OF_BYTES_SHAPE: usize = 2 * NUM_OF_BYTES_U32 + NUM_OF_BYTES_U8;

/// Figure attribute of a hole in a polygon (version 1 values).
pub const FIGURE_INTERIOR_RING: u8 = 0;
/// Figure attribute of a point or line string.
pub const FIGURE_STROKE: u8 = 1;
/// Figure attribute of the outer ring of a polygon.
pub const FIGURE_EXTERIOR_RING: u8 = 2;

const NO_PARENT: i32 = -1;
const NO_FIGURE: i32 = -1;

bitflags! {
    /// The serialization properties byte, at [`PROPERTIES_OFFSET`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SerializationProperties: u8 {
        const HAS_Z = 0x01;
        const HAS_M = 0x02;
        const IS_VALID = 0x04;
        const IS_SINGLE_POINT = 0x08;
        const IS_SINGLE_LINE_SEGMENT = 0x10;
        const IS_LARGER_THAN_A_HEMISPHERE = 0x20;
    }
}

/// OpenGIS geometry types, as stored in the shape table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OpenGisType {
    Point = 1,
    LineString = 2,
    Polygon = 3,
    MultiPoint = 4,
    MultiLineString = 5,
    MultiPolygon = 6,
    GeometryCollection = 7,
    CircularString = 8,
    CompoundCurve = 9,
    CurvePolygon = 10,
    FullGlobe = 11,
}

impl OpenGisType {
    pub fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            1 => Self::Point,
            2 => Self::LineString,
            3 => Self::Polygon,
            4 => Self::MultiPoint,
            5 => Self::MultiLineString,
            6 => Self::MultiPolygon,
            7 => Self::GeometryCollection,
            8 => Self::CircularString,
            9 => Self::CompoundCurve,
            10 => Self::CurvePolygon,
            11 => Self::FullGlobe,
            _ => return None,
        })
    }

    /// The name returned by `STGeometryType()`.
    pub fn name(self) -> &'static str {
        match self {
            Self::Point => "Point",
            Self::LineString => "LineString",
            Self::Polygon => "Polygon",
            Self::MultiPoint => "MultiPoint",
            Self::MultiLineString => "MultiLineString",
            Self::MultiPolygon => "MultiPolygon",
            Self::GeometryCollection => "GeometryCollection",
            Self::CircularString => "CircularString",
            Self::CompoundCurve => "CompoundCurve",
            Self::CurvePolygon => "CurvePolygon",
            Self::FullGlobe => "FullGlobe",
        }
    }
}

/// A sub-path: a run of points starting at `point_offset` and ending where the next figure
/// starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Figure {
    pub attribute: u8,
    pub point_offset: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShapeRecord {
    /// Index of the enclosing shape, -1 for the root.
    pub parent_offset: i32,
    /// Index of the first figure of this shape, -1 when the shape is empty.
    pub figure_offset: i32,
    /// Raw OpenGIS type code; see [`OpenGisType::from_code`].
    pub open_gis_type: u8,
}

/// Cursor over a byte slice that fails, rather than panics, on truncated input.
struct Reader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Reader { bytes, offset: 0 }
    }

    fn take<const N: usize>(&mut self, what: &str) -> Result<[u8; N]> {
        let end = self.offset + N;
        let arr: [u8; N] = self
            .bytes
            .get(self.offset..end)
            .ok_or_else(|| {
                GeographyError::InvalidInput(format!(
                    "Insufficient bytes for {} at offset {}",
                    what, self.offset
                ))
            })?
            .try_into()
            .map_err(|_| GeographyError::InvalidInput(format!("Invalid byte slice for {what}")))?;
        self.offset = end;
        Ok(arr)
    }

    fn read_u8(&mut self, what: &str) -> Result<u8> {
        Ok(self.take::<1>(what)?[0])
    }

    fn read_i32(&mut self, what: &str) -> Result<i32> {
        Ok(i32::from_le_bytes(self.take(what)?))
    }

    fn read_f64(&mut self, what: &str) -> Result<f64> {
        Ok(f64::from_le_bytes(self.take(what)?))
    }

    /// Reads an element count and checks that the buffer can hold that many elements.
    fn read_count(&mut self, what: &str, element_size: usize) -> Result<usize> {
        let count = u32::from_le_bytes(self.take(what)?) as usize;
        if count.saturating_mul(element_size) > self.remaining() {
            return Err(GeographyError::InvalidInput(format!(
                "{} {} do not fit in the remaining {} bytes",
                count,
                what,
                self.remaining()
            )));
        }
        Ok(count)
    }

    fn skip(&mut self, len: usize, what: &str) -> Result<()> {
        if len > self.remaining() {
            return Err(GeographyError::InvalidInput(format!(
                "Insufficient bytes for {} at offset {}",
                what, self.offset
            )));
        }
        self.offset += len;
        Ok(())
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.offset
    }
}

/// Reads the SRID without parsing the rest of the value.
pub fn read_srid(bytes: &[u8]) -> Result<i32> {
    Reader::new(bytes).read_i32("SRID")
}

/// A parsed `geography` value.
///
/// Z and M values are skipped while parsing and never written back, the archive only stores two
/// dimensional values.
#[derive(Debug, Clone, PartialEq)]
pub struct Geography {
    srid: i32,
    version: u8,
    properties: SerializationProperties,
    latitudes: Vec<f64>,
    longitudes: Vec<f64>,
    figures: Vec<Figure>,
    shapes: Vec<ShapeRecord>,
    segments: Vec<u8>,
}

impl Geography {
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let mut reader = Reader::new(bytes);
        let srid = reader.read_i32("SRID")?;
        let version = reader.read_u8("version")?;
        if version != 1 && version != 2 {
            return Err(GeographyError::InvalidInput(format!(
                "Unsupported geography serialization version {version}"
            )));
        }
        let mut properties =
            SerializationProperties::from_bits_retain(reader.read_u8("properties")?);

        let mut geography = Geography {
            srid,
            version,
            properties,
            latitudes: vec![],
            longitudes: vec![],
            figures: vec![],
            shapes: vec![],
            segments: vec![],
        };

        let (num_points, open_gis_type) =
            if properties.contains(SerializationProperties::IS_SINGLE_POINT) {
                (1, Some(OpenGisType::Point))
            } else if properties.contains(SerializationProperties::IS_SINGLE_LINE_SEGMENT) {
                (2, Some(OpenGisType::LineString))
            } else {
                (reader.read_count("points", NUM_OF_BYTES_POINT)?, None)
            };

        for _ in 0..num_points {
            geography.latitudes.push(reader.read_f64("latitude")?);
            geography.longitudes.push(reader.read_f64("longitude")?);
        }
        if properties.contains(SerializationProperties::HAS_Z) {
            reader.skip(num_points * NUM_OF_BYTES_F64, "Z values")?;
        }
        if properties.contains(SerializationProperties::HAS_M) {
            reader.skip(num_points * NUM_OF_BYTES_F64, "M values")?;
        }
        properties.remove(SerializationProperties::HAS_Z | SerializationProperties::HAS_M);
        geography.properties = properties;

        if let Some(open_gis_type) = open_gis_type {
            // The short layouts imply a single stroke figure and a single shape
            geography.figures.push(Figure {
                attribute: FIGURE_STROKE,
                point_offset: 0,
            });
            geography.shapes.push(ShapeRecord {
                parent_offset: NO_PARENT,
                figure_offset: 0,
                open_gis_type: open_gis_type as u8,
            });
        } else {
            let num_figures = reader.read_count("figures", NUM_OF_BYTES_FIGURE)?;
            for _ in 0..num_figures {
                let attribute = reader.read_u8("figure attribute")?;
                let point_offset = reader.read_i32("figure point offset")?;
                let point_offset = usize::try_from(point_offset)
                    .ok()
                    .filter(|offset| *offset <= num_points)
                    .ok_or_else(|| {
                        GeographyError::InvalidInput(format!(
                            "Figure point offset {point_offset} out of range for {num_points} points"
                        ))
                    })?;
                geography.figures.push(Figure {
                    attribute,
                    point_offset,
                });
            }

            let num_shapes = reader.read_count("shapes", NUM_OF_BYTES_SHAPE)?;
            for _ in 0..num_shapes {
                geography.shapes.push(ShapeRecord {
                    parent_offset: reader.read_i32("shape parent offset")?,
                    figure_offset: reader.read_i32("shape figure offset")?,
                    open_gis_type: reader.read_u8("shape type")?,
                });
            }

            if version == 2 {
                let num_segments = reader.read_count("segments", NUM_OF_BYTES_U8)?;
                for _ in 0..num_segments {
                    geography.segments.push(reader.read_u8("segment")?);
                }
            }
        }

        if reader.remaining() != 0 {
            return Err(GeographyError::InvalidInput(format!(
                "Unexpected {} trailing bytes",
                reader.remaining()
            )));
        }

        Ok(geography)
    }

    /// Builds a single point value, like `geography::Point(lat, lon, srid)`.
    pub fn point(lat: f64, lon: f64, srid: i32) -> Result<Self> {
        let mut builder = Builder::default();
        builder.add_geometry(&Geometry::Point(geo_types::Point::new(lon, lat)), NO_PARENT)?;
        Ok(builder.finish(srid))
    }

    /// Builds a value from WKT in `longitude latitude` order, like `geography::STGeomFromText`.
    pub fn from_wkt(wkt: &str, srid: i32) -> Result<Self> {
        let parsed = wkt::Wkt::<f64>::from_str(wkt)
            .map_err(|e| GeographyError::Construction(format!("WKT parse error: {e:?}")))?;
        let geometry = Geometry::<f64>::try_from(parsed)
            .map_err(|e| GeographyError::Construction(format!("WKT conversion error: {e:?}")))?;
        let mut builder = Builder::default();
        builder.add_geometry(&geometry, NO_PARENT)?;
        trace!(%wkt, shapes = builder.shapes.len(), "built geography from WKT");
        Ok(builder.finish(srid))
    }

    pub fn srid(&self) -> i32 {
        self.srid
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    pub fn properties(&self) -> SerializationProperties {
        self.properties
    }

    pub fn num_points(&self) -> usize {
        self.latitudes.len()
    }

    pub fn latitudes(&self) -> &[f64] {
        &self.latitudes
    }

    pub fn longitudes(&self) -> &[f64] {
        &self.longitudes
    }

    pub fn figures(&self) -> &[Figure] {
        &self.figures
    }

    pub fn shapes(&self) -> &[ShapeRecord] {
        &self.shapes
    }

    /// The type of the root shape, as reported by `STGeometryType()`.
    ///
    /// `None` when there are no shapes or the root shape has an unknown type code.
    pub fn geography_type(&self) -> Option<OpenGisType> {
        self.shapes
            .first()
            .and_then(|shape| OpenGisType::from_code(shape.open_gis_type))
    }

    fn serialized_len(&self) -> usize {
        let header = PAYLOAD_OFFSET;
        if self.is_single_point() {
            return header + NUM_OF_BYTES_POINT;
        }
        let segments = if self.version == 2 {
            NUM_OF_BYTES_U32 + self.segments.len()
        } else {
            0
        };
        header
            + NUM_OF_BYTES_U32
            + self.num_points() * NUM_OF_BYTES_POINT
            + NUM_OF_BYTES_U32
            + self.figures.len() * NUM_OF_BYTES_FIGURE
            + NUM_OF_BYTES_U32
            + self.shapes.len() * NUM_OF_BYTES_SHAPE
            + segments
    }

    fn is_single_point(&self) -> bool {
        self.properties
            .contains(SerializationProperties::IS_SINGLE_POINT)
            && self.num_points() == 1
    }

    /// Writes the value in the CLR layout.
    ///
    /// Single line segments are written in the general layout; the flag is cleared accordingly.
    pub fn serialize(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.serialized_len());
        let mut properties = self.properties;
        properties.remove(SerializationProperties::IS_SINGLE_LINE_SEGMENT);
        if !self.is_single_point() {
            properties.remove(SerializationProperties::IS_SINGLE_POINT);
        }

        bytes.extend_from_slice(&self.srid.to_le_bytes());
        bytes.push(self.version);
        bytes.push(properties.bits());

        if self.is_single_point() {
            bytes.extend_from_slice(&self.latitudes[0].to_le_bytes());
            bytes.extend_from_slice(&self.longitudes[0].to_le_bytes());
            return bytes;
        }

        bytes.extend_from_slice(&(self.num_points() as u32).to_le_bytes());
        for (lat, lon) in self.latitudes.iter().zip(&self.longitudes) {
            bytes.extend_from_slice(&lat.to_le_bytes());
            bytes.extend_from_slice(&lon.to_le_bytes());
        }

        bytes.extend_from_slice(&(self.figures.len() as u32).to_le_bytes());
        for figure in &self.figures {
            bytes.push(figure.attribute);
            bytes.extend_from_slice(&(figure.point_offset as i32).to_le_bytes());
        }

        bytes.extend_from_slice(&(self.shapes.len() as u32).to_le_bytes());
        for shape in &self.shapes {
            bytes.extend_from_slice(&shape.parent_offset.to_le_bytes());
            bytes.extend_from_slice(&shape.figure_offset.to_le_bytes());
            bytes.push(shape.open_gis_type);
        }

        if self.version == 2 {
            bytes.extend_from_slice(&(self.segments.len() as u32).to_le_bytes());
            bytes.extend_from_slice(&self.segments);
        }

        bytes
    }
}

/// Flattens a `geo-types` geometry into the point, figure and shape tables.
///
/// Nothing is validated beyond coordinate ranges, so the result never carries
/// [`SerializationProperties::IS_VALID`].
#[derive(Default)]
struct Builder {
    latitudes: Vec<f64>,
    longitudes: Vec<f64>,
    figures: Vec<Figure>,
    shapes: Vec<ShapeRecord>,
}

impl Builder {
    fn open_gis_type(geometry: &Geometry<f64>) -> Result<OpenGisType> {
        Ok(match geometry {
            Geometry::Point(_) => OpenGisType::Point,
            Geometry::LineString(_) => OpenGisType::LineString,
            Geometry::Polygon(_) => OpenGisType::Polygon,
            Geometry::MultiPoint(_) => OpenGisType::MultiPoint,
            Geometry::MultiLineString(_) => OpenGisType::MultiLineString,
            Geometry::MultiPolygon(_) => OpenGisType::MultiPolygon,
            Geometry::GeometryCollection(_) => OpenGisType::GeometryCollection,
            _ => {
                return Err(GeographyError::Construction(
                    "Unsupported geometry type".into(),
                ));
            }
        })
    }

    /// Shapes are pushed before their members, so that members can point at their parent.
    fn add_geometry(&mut self, geometry: &Geometry<f64>, parent_offset: i32) -> Result<()> {
        let shape_index = self.shapes.len();
        let first_figure = self.figures.len();
        self.shapes.push(ShapeRecord {
            parent_offset,
            figure_offset: NO_FIGURE,
            open_gis_type: Self::open_gis_type(geometry)? as u8,
        });
        let parent = shape_index as i32;

        match geometry {
            Geometry::Point(point) => self.add_figure(FIGURE_STROKE, [point.0])?,
            Geometry::LineString(line) => self.add_figure(FIGURE_STROKE, line.coords().copied())?,
            Geometry::Polygon(polygon) => {
                if !polygon.exterior().0.is_empty() {
                    self.add_figure(FIGURE_EXTERIOR_RING, polygon.exterior().coords().copied())?;
                    for hole in polygon.interiors() {
                        self.add_figure(FIGURE_INTERIOR_RING, hole.coords().copied())?;
                    }
                }
            }
            Geometry::MultiPoint(points) => {
                for point in points {
                    self.add_geometry(&Geometry::Point(*point), parent)?;
                }
            }
            Geometry::MultiLineString(lines) => {
                for line in lines {
                    self.add_geometry(&Geometry::LineString(line.clone()), parent)?;
                }
            }
            Geometry::MultiPolygon(polygons) => {
                for polygon in polygons {
                    self.add_geometry(&Geometry::Polygon(polygon.clone()), parent)?;
                }
            }
            Geometry::GeometryCollection(collection) => {
                for member in collection {
                    self.add_geometry(member, parent)?;
                }
            }
            _ => {}
        }

        if self.figures.len() > first_figure {
            self.shapes[shape_index].figure_offset = first_figure as i32;
        }
        Ok(())
    }

    fn add_figure(
        &mut self,
        attribute: u8,
        coords: impl IntoIterator<Item = Coord<f64>>,
    ) -> Result<()> {
        self.figures.push(Figure {
            attribute,
            point_offset: self.latitudes.len(),
        });
        for Coord { x: lon, y: lat } in coords {
            if !lat.is_finite() || !lon.is_finite() {
                return Err(GeographyError::Construction(format!(
                    "Non-finite coordinate ({lon}, {lat})"
                )));
            }
            if !(-90.0..=90.0).contains(&lat) {
                return Err(GeographyError::Construction(format!(
                    "Latitude values must be between -90 and 90 degrees, was {lat}"
                )));
            }
            self.latitudes.push(lat);
            self.longitudes.push(lon);
        }
        Ok(())
    }

    fn finish(self, srid: i32) -> Geography {
        let single_point = self.latitudes.len() == 1
            && matches!(
                self.shapes.as_slice(),
                [ShapeRecord { open_gis_type, .. }] if *open_gis_type == OpenGisType::Point as u8
            );
        let properties = if single_point {
            SerializationProperties::IS_SINGLE_POINT
        } else {
            SerializationProperties::empty()
        };
        Geography {
            srid,
            version: 1,
            properties,
            latitudes: self.latitudes,
            longitudes: self.longitudes,
            figures: self.figures,
            shapes: self.shapes,
            segments: vec![],
        }
    }
}
