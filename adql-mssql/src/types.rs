//! Mapping between ADQL column types and SQL Server type names.
use std::fmt;

use serde::{Deserialize, Serialize};

/// The column types ADQL knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AdqlType {
    Smallint,
    Integer,
    Bigint,
    Real,
    Double,
    Char,
    Varchar,
    Binary,
    Varbinary,
    Blob,
    Clob,
    Timestamp,
    Point,
    Region,
    Unknown,
}

impl fmt::Display for AdqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AdqlType::Smallint => "SMALLINT",
            AdqlType::Integer => "INTEGER",
            AdqlType::Bigint => "BIGINT",
            AdqlType::Real => "REAL",
            AdqlType::Double => "DOUBLE",
            AdqlType::Char => "CHAR",
            AdqlType::Varchar => "VARCHAR",
            AdqlType::Binary => "BINARY",
            AdqlType::Varbinary => "VARBINARY",
            AdqlType::Blob => "BLOB",
            AdqlType::Clob => "CLOB",
            AdqlType::Timestamp => "TIMESTAMP",
            AdqlType::Point => "POINT",
            AdqlType::Region => "REGION",
            AdqlType::Unknown => "UNKNOWN",
        };
        f.write_str(name)
    }
}

/// Conversion of column types between the database and ADQL.
pub trait TypeMapping {
    /// The ADQL type of a column declared with the given (lowercase) database type name
    fn type_from_db(&self, db_type: &str) -> AdqlType;

    /// The database type name to declare a column of the given ADQL type with
    fn type_to_db(&self, adql_type: AdqlType) -> String;
}

/// The SQL Server types for the ADQL scalar types.
///
/// Geometries have no native representation here, use [`GeographyTypeMapping`] for those.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultTypeMapping;

impl TypeMapping for DefaultTypeMapping {
    fn type_from_db(&self, db_type: &str) -> AdqlType {
        match db_type.to_ascii_lowercase().as_str() {
            "smallint" | "tinyint" | "bit" => AdqlType::Smallint,
            "int" | "integer" => AdqlType::Integer,
            "bigint" => AdqlType::Bigint,
            "real" => AdqlType::Real,
            "float" | "double precision" | "decimal" | "numeric" | "money" => AdqlType::Double,
            "char" | "nchar" => AdqlType::Char,
            "varchar" | "nvarchar" => AdqlType::Varchar,
            "binary" => AdqlType::Binary,
            "varbinary" => AdqlType::Varbinary,
            "image" => AdqlType::Blob,
            "text" | "ntext" => AdqlType::Clob,
            "date" | "time" | "datetime" | "datetime2" | "smalldatetime" | "datetimeoffset" => {
                AdqlType::Timestamp
            }
            _ => AdqlType::Unknown,
        }
    }

    fn type_to_db(&self, adql_type: AdqlType) -> String {
        match adql_type {
            AdqlType::Smallint => "smallint",
            AdqlType::Integer => "int",
            AdqlType::Bigint => "bigint",
            AdqlType::Real => "real",
            AdqlType::Double => "float",
            AdqlType::Char => "char",
            AdqlType::Varchar | AdqlType::Unknown => "varchar",
            AdqlType::Binary => "binary",
            AdqlType::Varbinary => "varbinary",
            AdqlType::Blob => "varbinary(max)",
            AdqlType::Clob => "varchar(max)",
            AdqlType::Timestamp => "datetime2",
            AdqlType::Point | AdqlType::Region => "varchar",
        }
        .to_owned()
    }
}

/// Stores points and regions as `geography`, delegating every other type to `fallback`.
#[derive(Debug, Clone, Copy, Default)]
pub struct GeographyTypeMapping<M = DefaultTypeMapping> {
    pub fallback: M,
}

impl<M: TypeMapping> GeographyTypeMapping<M> {
    pub fn new(fallback: M) -> Self {
        GeographyTypeMapping { fallback }
    }
}

impl<M: TypeMapping> TypeMapping for GeographyTypeMapping<M> {
    fn type_from_db(&self, db_type: &str) -> AdqlType {
        if db_type == "geography" {
            AdqlType::Region
        } else {
            self.fallback.type_from_db(db_type)
        }
    }

    fn type_to_db(&self, adql_type: AdqlType) -> String {
        match adql_type {
            AdqlType::Point | AdqlType::Region => "geography".to_owned(),
            other => self.fallback.type_to_db(other),
        }
    }
}
