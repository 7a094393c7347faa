//! Geometry functions and their operands, as produced by the ADQL parser.
use std::fmt;

use adql_geography::Region;
use serde::{Deserialize, Serialize};

use crate::escape_identifier;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identifier {
    pub name: String,
    /// Delimited in the ADQL query, and therefore to be matched case sensitively
    #[serde(default)]
    pub case_sensitive: bool,
}

impl Identifier {
    pub fn new(name: impl Into<String>) -> Self {
        Identifier {
            name: name.into(),
            case_sensitive: false,
        }
    }

    pub fn case_sensitive(name: impl Into<String>) -> Self {
        Identifier {
            name: name.into(),
            case_sensitive: true,
        }
    }
}

impl From<&str> for Identifier {
    fn from(name: &str) -> Self {
        Identifier::new(name)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&escape_identifier(&self.name, self.case_sensitive))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Column {
    pub name: Identifier,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<Identifier>,
}

impl From<Identifier> for Column {
    fn from(name: Identifier) -> Self {
        Column { name, table: None }
    }
}

impl From<&str> for Column {
    fn from(c: &str) -> Column {
        match c.split_once('.') {
            None => Column {
                name: c.into(),
                table: None,
            },
            Some((table_name, col_name)) => Column {
                name: col_name.into(),
                table: Some(table_name.into()),
            },
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(table) = &self.table {
            write!(f, "{table}.")?;
        }
        write!(f, "{}", self.name)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Literal {
    Integer(i64),
    Double(f64),
    String(String),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Integer(i) => write!(f, "{i}"),
            Literal::Double(d) => write!(f, "{d}"),
            Literal::String(s) => write!(f, "'{}'", s.replace('\'', "''")),
        }
    }
}

/// An argument of a geometry function.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operand {
    /// A bare column reference. Geometry columns are what SQL Server can use a spatial index on.
    Column(Column),
    Literal(Literal),
    Function(Box<SpatialFunction>),
    /// A region value, e.g. bound from an upload table
    Region(Region),
    /// Any other expression, already translated by the surrounding query builder
    Sql(String),
}

impl Operand {
    pub fn column(c: &str) -> Self {
        Operand::Column(c.into())
    }

    pub fn is_column(&self) -> bool {
        matches!(self, Operand::Column(_))
    }
}

impl From<f64> for Operand {
    fn from(value: f64) -> Self {
        Operand::Literal(Literal::Double(value))
    }
}

impl From<i64> for Operand {
    fn from(value: i64) -> Self {
        Operand::Literal(Literal::Integer(value))
    }
}

impl From<SpatialFunction> for Operand {
    fn from(function: SpatialFunction) -> Self {
        Operand::Function(Box::new(function))
    }
}

impl From<Region> for Operand {
    fn from(region: Region) -> Self {
        Operand::Region(region)
    }
}

/// The ADQL geometry functions.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpatialFunction {
    Area(Operand),
    Centroid(Operand),
    Distance(Operand, Operand),
    /// `CONTAINS(a, b)`: whether `a` is contained in `b`
    Contains(Operand, Operand),
    Intersects(Operand, Operand),
    Point {
        coord1: Operand,
        coord2: Operand,
    },
    Circle {
        coord1: Operand,
        coord2: Operand,
        radius: Operand,
    },
    /// Vertices as (coord1, coord2) pairs, in order, without repeating the first one
    Polygon(Vec<(Operand, Operand)>),
    Box {
        coord1: Operand,
        coord2: Operand,
        width: Operand,
        height: Operand,
    },
    Region(Operand),
    Coord1(Operand),
    Coord2(Operand),
    CoordSys(Operand),
}

impl SpatialFunction {
    /// The ADQL name of the function
    pub fn name(&self) -> &'static str {
        match self {
            SpatialFunction::Area(_) => "AREA",
            SpatialFunction::Centroid(_) => "CENTROID",
            SpatialFunction::Distance(..) => "DISTANCE",
            SpatialFunction::Contains(..) => "CONTAINS",
            SpatialFunction::Intersects(..) => "INTERSECTS",
            SpatialFunction::Point { .. } => "POINT",
            SpatialFunction::Circle { .. } => "CIRCLE",
            SpatialFunction::Polygon(_) => "POLYGON",
            SpatialFunction::Box { .. } => "BOX",
            SpatialFunction::Region(_) => "REGION",
            SpatialFunction::Coord1(_) => "COORD1",
            SpatialFunction::Coord2(_) => "COORD2",
            SpatialFunction::CoordSys(_) => "COORDSYS",
        }
    }
}
