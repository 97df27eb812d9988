//! Attribute parsing for the Entity derive macro.
//!
//! Handles struct-level `#[orm(table = "...")]` and field-level
//! `#[orm(pk | id, column = "...", skip)]`.

use syn::{DeriveInput, Result};

/// Parsed field-level `#[orm(...)]` options.
#[derive(Default)]
pub(super) struct FieldAttr {
    pub primary_key: bool,
    pub column: Option<String>,
    pub skip: bool,
}

impl syn::parse::Parse for FieldAttr {
    fn parse(input: syn::parse::ParseStream) -> Result<Self> {
        let mut attr = FieldAttr::default();

        while !input.is_empty() {
            let ident: syn::Ident = input.parse()?;
            if ident == "pk" || ident == "id" {
                attr.primary_key = true;
            } else if ident == "skip" {
                attr.skip = true;
            } else if ident == "column" {
                let _: syn::Token![=] = input.parse()?;
                let value: syn::LitStr = input.parse()?;
                if value.value().is_empty() {
                    return Err(syn::Error::new_spanned(value, "column name must not be empty"));
                }
                attr.column = Some(value.value());
            } else {
                return Err(syn::Error::new_spanned(
                    &ident,
                    format!(
                        "unknown field attribute `{ident}`, \
                         expected `pk`, `id`, `column` or `skip`"
                    ),
                ));
            }

            if input.is_empty() {
                break;
            }
            let _: syn::Token![,] = input.parse()?;
        }

        Ok(attr)
    }
}

/// Merge every `#[orm(...)]` on a field.
pub(super) fn field_attr(field: &syn::Field) -> Result<FieldAttr> {
    let mut out = FieldAttr::default();
    for attr in &field.attrs {
        if !attr.path().is_ident("orm") {
            continue;
        }
        let parsed: FieldAttr = attr.parse_args()?;
        out.primary_key |= parsed.primary_key;
        out.skip |= parsed.skip;
        if parsed.column.is_some() {
            out.column = parsed.column;
        }
    }
    if out.skip && (out.primary_key || out.column.is_some()) {
        return Err(syn::Error::new_spanned(
            field,
            "`skip` cannot be combined with `pk` or `column`",
        ));
    }
    Ok(out)
}

/// Table override from struct-level `#[orm(table = "...")]`, if any.
pub(super) fn table_override(input: &DeriveInput) -> Result<Option<String>> {
    let mut table = None;
    for attr in &input.attrs {
        if !attr.path().is_ident("orm") {
            continue;
        }
        let nested = attr.parse_args::<syn::MetaNameValue>()?;
        if !nested.path.is_ident("table") {
            return Err(syn::Error::new_spanned(
                &nested.path,
                "unknown struct attribute, expected `table = \"...\"`",
            ));
        }
        match &nested.value {
            syn::Expr::Lit(syn::ExprLit {
                lit: syn::Lit::Str(lit),
                ..
            }) if !lit.value().is_empty() => table = Some(lit.value()),
            other => {
                return Err(syn::Error::new_spanned(
                    other,
                    "`table` expects a non-empty string literal",
                ));
            }
        }
    }
    Ok(table)
}
