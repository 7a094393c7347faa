//! Translation of ADQL geometry functions into SQL Server T-SQL.
//!
//! SQL Server uses latitude and longitude instead of RA and Dec, where RA = 180 - longitude and
//! Dec = latitude. Every coordinate that ends up in a `geography` value is complemented, either
//! here at translation time (region literals) or by the generated SQL at evaluation time
//! (`POINT`, `CIRCLE` and `POLYGON` arguments, which may be arbitrary expressions).
//!
//! The ADQL parser is not part of this crate: its output is modelled by the small [`ast`] of
//! geometry functions and their operands. Everything that is not a geometry function reaches us
//! as an already translated [`ast::Operand::Sql`] fragment.
//!
//! `BOX` and `REGION` are not implemented, and the coordinate extraction functions are not
//! supported.
use thiserror::Error;

pub mod ast;
mod identifier;
mod translate;
pub mod types;

use adql_geography::RegionKind;

pub use identifier::escape_identifier;
pub use translate::{Translate, translate};
pub use types::{AdqlType, DefaultTypeMapping, GeographyTypeMapping, TypeMapping};

/// Errors that can occur when translating a geometry function
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TranslationError {
    /// The function cannot be translated for SQL Server
    #[error("{operator} {reason}")]
    Unsupported {
        operator: &'static str,
        reason: &'static str,
    },
    /// The function was called with arguments it cannot be translated with
    #[error("Invalid arguments to {operator}: {reason}")]
    InvalidArguments {
        operator: &'static str,
        reason: String,
    },
    /// A region literal that has no WKT representation
    #[error("Unsupported Region {0}")]
    UnsupportedRegion(RegionKind),
}

pub type Result<T> = std::result::Result<T, TranslationError>;
