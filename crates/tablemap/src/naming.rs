//! Identifier case folding for table and column names.
//!
//! Type identifiers become table names and field identifiers become column
//! names by the same snake-casing rule: an `_` is inserted before every ASCII
//! uppercase letter that follows a non-uppercase character, then the whole
//! string is lower-cased.
//!
//! ```ignore
//! use tablemap::naming::{column_name_for, table_name_for};
//!
//! assert_eq!(table_name_for("my_app::models::FooBarHoge"), "foo_bar_hoge");
//! assert_eq!(column_name_for("createdAt"), "created_at");
//! ```

/// Derive a table name from a (possibly qualified) type identifier.
///
/// Generic arguments are ignored and only the final path segment is kept;
/// both `::` and `.` are treated as qualifier separators.
pub fn table_name_for(type_identifier: &str) -> String {
    let base = type_identifier
        .split('<')
        .next()
        .unwrap_or(type_identifier)
        .trim_start_matches('&');
    let bare = base
        .rsplit("::")
        .next()
        .and_then(|s| s.rsplit('.').next())
        .unwrap_or(base);
    snake_case(bare)
}

/// Derive a column name from a field identifier.
pub fn column_name_for(field_identifier: &str) -> String {
    snake_case(field_identifier)
}

fn snake_case(ident: &str) -> String {
    let mut out = String::with_capacity(ident.len() + 4);
    let mut prev: Option<char> = None;
    for c in ident.chars() {
        if c.is_ascii_uppercase() && prev.is_some_and(|p| !p.is_ascii_uppercase()) {
            out.push('_');
        }
        out.push(c);
        prev = Some(c);
    }
    out.to_lowercase()
}
