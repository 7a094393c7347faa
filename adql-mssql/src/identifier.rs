use std::borrow::Cow;

fn is_double_quoted(id: &str) -> bool {
    id.len() >= 2
        && id.starts_with('"')
        && id.ends_with('"')
        && !id[1..id.len() - 1].contains('"')
}

/// Escapes an identifier for SQL Server.
///
/// Case sensitive identifiers are wrapped in square brackets, unless they are already delimited
/// with double quotes. Everything else is emitted as is.
///
/// A `]` inside a bracketed identifier is doubled, as T-SQL requires. Plain bracket wrapping
/// would end the identifier early.
pub fn escape_identifier(id: &str, case_sensitive: bool) -> Cow<'_, str> {
    if case_sensitive && !is_double_quoted(id) {
        Cow::Owned(format!("[{}]", id.replace(']', "]]")))
    } else {
        Cow::Borrowed(id)
    }
}
