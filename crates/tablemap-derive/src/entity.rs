//! Entity derive macro implementation

mod attrs;

use proc_macro2::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Fields, Result};

pub fn expand(input: DeriveInput) -> Result<TokenStream> {
    let name = &input.ident;
    let name_str = name.to_string();

    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "Entity cannot be derived for generic types",
        ));
    }

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    &input,
                    "Entity can only be derived for structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                &input,
                "Entity can only be derived for structs",
            ));
        }
    };

    let table = match attrs::table_override(&input)? {
        Some(table) => quote! { ::core::option::Option::Some(#table) },
        None => quote! { ::core::option::Option::None },
    };

    let mut defs = Vec::new();
    let mut getters = Vec::new();
    let mut setters = Vec::new();

    for field in fields {
        let attr = attrs::field_attr(field)?;
        if attr.skip {
            continue;
        }
        let Some(ident) = field.ident.as_ref() else {
            continue;
        };
        let ty = &field.ty;
        let index = defs.len();
        let field_name = ident.to_string();
        let primary_key = attr.primary_key;
        let column = match &attr.column {
            Some(column) => quote! { ::core::option::Option::Some(#column) },
            None => quote! { ::core::option::Option::None },
        };
        let column_label = attr.column.clone().unwrap_or_else(|| field_name.clone());

        defs.push(quote! {
            ::tablemap::FieldDef {
                name: #field_name,
                column: #column,
                primary_key: #primary_key,
                kind: <#ty as ::tablemap::SqlField>::KIND,
            }
        });
        getters.push(quote! {
            #index => ::tablemap::SqlField::to_param(&self.#ident)
                .map_err(|e| e.at_field(#name_str, #field_name)),
        });
        setters.push(quote! {
            #index => {
                self.#ident = <#ty as ::tablemap::SqlField>::from_column(value, #column_label)
                    .map_err(|e| e.at_field(#name_str, #field_name))?;
                ::core::result::Result::Ok(())
            }
        });
    }

    Ok(quote! {
        impl ::tablemap::Entity for #name {
            const TABLE: ::core::option::Option<&'static str> = #table;

            fn type_identifier() -> &'static str {
                #name_str
            }

            fn fields() -> &'static [::tablemap::FieldDef] {
                const FIELDS: &[::tablemap::FieldDef] = &[#(#defs),*];
                FIELDS
            }

            fn field_value(&self, index: usize) -> ::tablemap::OrmResult<::tablemap::Value> {
                match index {
                    #(#getters)*
                    _ => ::core::result::Result::Err(::tablemap::OrmError::Other(
                        ::std::format!("{} has no field at index {}", #name_str, index),
                    )),
                }
            }

            fn set_field(
                &mut self,
                index: usize,
                value: ::tablemap::Value,
            ) -> ::tablemap::OrmResult<()> {
                match index {
                    #(#setters)*
                    _ => {
                        let _ = value;
                        ::core::result::Result::Err(::tablemap::OrmError::Other(
                            ::std::format!("{} has no field at index {}", #name_str, index),
                        ))
                    }
                }
            }
        }

        impl ::tablemap::RowElement for #name {
            type Entity = Self;

            fn from_entity(entity: Self) -> Self {
                entity
            }
        }
    })
}
