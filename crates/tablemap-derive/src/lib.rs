//! Derive macros for tablemap
//!
//! Provides `#[derive(Entity)]`.

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod entity;

/// Derive `Entity` for a struct with named fields.
///
/// # Example
///
/// ```ignore
/// use tablemap::Entity;
///
/// #[derive(Debug, Default, Entity)]
/// #[orm(table = "accounts")]
/// struct User {
///     #[orm(pk)]
///     id: u64,
///     #[orm(column = "display_name")]
///     name: String,
///     #[orm(skip)]
///     cached_score: Vec<u8>,
/// }
/// ```
///
/// # Attributes
///
/// - `#[orm(table = "name")]` - Override the derived table name
/// - `#[orm(pk)]` / `#[orm(id)]` - Mark field as primary key
/// - `#[orm(column = "name")]` - Map field to a different column name
/// - `#[orm(skip)]` - Leave the field out of the mapping. Rows collected by
///   `select` hold `Default` there; `select_one` keeps the record's existing
///   value
///
/// Every mapped field type must implement `tablemap::SqlField`.
#[proc_macro_derive(Entity, attributes(orm))]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    entity::expand(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}
