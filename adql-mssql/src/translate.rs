use adql_geography::{SRID, region_to_wkt};
use itertools::Itertools;
use tracing::trace;

use crate::ast::{Operand, SpatialFunction};
use crate::{Result, TranslationError};

/// Length and decimals passed to `str()` when formatting coordinates into WKT. Without them
/// `str()` rounds to integers.
const STR_PRECISION: &str = "11, 7";

/// Translation of an AST node into a T-SQL fragment.
pub trait Translate {
    fn translate(&self) -> Result<String>;
}

/// Translate a geometry function into a T-SQL fragment.
pub fn translate(function: &SpatialFunction) -> Result<String> {
    let sql = function.translate()?;
    trace!(function = function.name(), %sql, "Translated geometry function");
    Ok(sql)
}

impl Translate for Operand {
    fn translate(&self) -> Result<String> {
        match self {
            Operand::Column(column) => Ok(column.to_string()),
            Operand::Literal(literal) => Ok(literal.to_string()),
            Operand::Function(function) => function.translate(),
            Operand::Region(region) => {
                let wkt = region_to_wkt(region)
                    .ok_or(TranslationError::UnsupportedRegion(region.kind()))?;
                Ok(geography_from_text(&wkt))
            }
            Operand::Sql(sql) => Ok(sql.clone()),
        }
    }
}

fn geography_from_text(wkt_literal: &str) -> String {
    format!("geography::STGeomFromText('{wkt_literal}', {SRID})")
}

/// One `lon lat` pair of a WKT string literal assembled by SQL Server.
///
/// The coordinates may be arbitrary expressions, so the complement and the formatting are done
/// by the generated SQL. The result closes the enclosing string literal and reopens it, e.g.
/// `'+str(180 - (ra), 11, 7)+' '+str(dec, 11, 7)+'`.
fn wkt_vertex(coord1: &Operand, coord2: &Operand) -> Result<String> {
    Ok(format!(
        "'+str(180 - ({}), {STR_PRECISION})+' '+str({}, {STR_PRECISION})+'",
        coord1.translate()?,
        coord2.translate()?
    ))
}

fn translate_point(coord1: &Operand, coord2: &Operand) -> Result<String> {
    Ok(geography_from_text(&format!(
        "POINT({})",
        wkt_vertex(coord1, coord2)?
    )))
}

fn translate_polygon(vertices: &[(Operand, Operand)]) -> Result<String> {
    if vertices.len() < 3 {
        return Err(TranslationError::InvalidArguments {
            operator: "POLYGON",
            reason: format!("expected at least 3 vertices, got {}", vertices.len()),
        });
    }
    let mut ring: Vec<String> = vertices
        .iter()
        .map(|(coord1, coord2)| wkt_vertex(coord1, coord2))
        .try_collect()?;
    // SQL Server polygons have to be closed, so the first vertex goes in again
    ring.push(ring[0].clone());
    Ok(geography_from_text(&format!(
        "POLYGON(({}))",
        ring.join(",")
    )))
}

impl Translate for SpatialFunction {
    fn translate(&self) -> Result<String> {
        match self {
            // STArea() is in steradians
            SpatialFunction::Area(geometry) => {
                Ok(format!("degrees(degrees(({}).STArea()))", geometry.translate()?))
            }
            // The center of the bounding envelope, not the area weighted centroid
            SpatialFunction::Centroid(geometry) => {
                Ok(format!("({}).EnvelopeCenter()", geometry.translate()?))
            }
            SpatialFunction::Distance(p1, p2) => Ok(format!(
                "degrees(({}).STDistance({}))",
                p1.translate()?,
                p2.translate()?
            )),
            // CONTAINS(a, b) is true when a is inside b. A column goes first so that SQL Server
            // can use its spatial index, which relies on STWithin and STContains being inverses.
            SpatialFunction::Contains(left, right) => {
                if left.is_column() {
                    Ok(format!(
                        "({}).STWithin({})",
                        left.translate()?,
                        right.translate()?
                    ))
                } else {
                    Ok(format!(
                        "({}).STContains({})",
                        right.translate()?,
                        left.translate()?
                    ))
                }
            }
            // Symmetric, a column goes first for the index
            SpatialFunction::Intersects(left, right) => {
                let (receiver, argument) = if right.is_column() {
                    (right, left)
                } else {
                    (left, right)
                };
                Ok(format!(
                    "({}).STIntersects({})",
                    receiver.translate()?,
                    argument.translate()?
                ))
            }
            SpatialFunction::Point { coord1, coord2 } => translate_point(coord1, coord2),
            SpatialFunction::Circle {
                coord1,
                coord2,
                radius,
            } => Ok(format!(
                "({}).STBuffer(radians(cast({} as double precision)))",
                translate_point(coord1, coord2)?,
                radius.translate()?
            )),
            SpatialFunction::Polygon(vertices) => translate_polygon(vertices),
            SpatialFunction::Box { .. } | SpatialFunction::Region(_) => {
                Err(TranslationError::Unsupported {
                    operator: self.name(),
                    reason: "is currently not implemented",
                })
            }
            SpatialFunction::Coord1(_) | SpatialFunction::Coord2(_) => {
                Err(TranslationError::Unsupported {
                    operator: self.name(),
                    reason: "is not supported",
                })
            }
            SpatialFunction::CoordSys(_) => Err(TranslationError::Unsupported {
                operator: self.name(),
                reason: "has been deprecated and is not supported",
            }),
        }
    }
}
