//! Derive macro for table metadata.
//!
//! `#[derive(Table)]` implements `wlib_orm::TableMeta`: the table name, the
//! primary-key column and the optional timestamp columns that enable
//! auto-fill and soft delete.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{parse_macro_input, Attribute, Data, DeriveInput, Expr, Fields, Ident, Lit, Meta};

/// Derives `wlib_orm::TableMeta` for a struct.
///
/// # Struct Attributes
///
/// - `#[table(name = "post")]` - SQL table name (defaults to the snake_case
///   struct name)
/// - `#[table(primary_key = "post_id")]` - primary-key column (defaults to `id`)
/// - `#[table(created_at = "..", updated_at = "..", deleted_at = "..")]` -
///   timestamp columns
///
/// # Field Attributes
///
/// - `#[column(primary_key)]`, `#[column(created_at)]`,
///   `#[column(updated_at)]`, `#[column(deleted_at)]` - mark the field's column
/// - `#[column(name = "column_name")]` - column name (defaults to the field name)
///
/// Every name must match `[A-Za-z0-9_]+`; anything else is a compile error.
///
/// # Example
///
/// ```ignore
/// use wlib_orm::{Model, Table};
///
/// #[derive(Table)]
/// #[table(name = "post", created_at = "created_at", updated_at = "updated_at")]
/// struct Post {
///     #[column(primary_key)]
///     id: i64,
///     title: String,
///     #[column(deleted_at)]
///     deleted_at: Option<String>,
/// }
///
/// impl Model for Post {}
/// ```
#[proc_macro_derive(Table, attributes(table, column))]
pub fn derive_table(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    derive_table_impl(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}

#[derive(Default)]
struct TableAttrs {
    name: Option<String>,
    primary_key: Option<String>,
    created_at: Option<String>,
    updated_at: Option<String>,
    deleted_at: Option<String>,
}

#[derive(Default)]
struct ColumnAttrs {
    name: Option<String>,
    primary_key: bool,
    created_at: bool,
    updated_at: bool,
    deleted_at: bool,
}

fn derive_table_impl(input: DeriveInput) -> syn::Result<TokenStream2> {
    let struct_name = &input.ident;
    let mut table = parse_table_attrs(&input.attrs)?;

    let fields = match &input.data {
        Data::Struct(data) => &data.fields,
        _ => {
            return Err(syn::Error::new_spanned(
                &input,
                "Table derive only supports structs",
            ));
        }
    };

    if let Fields::Named(named) = fields {
        for field in &named.named {
            let attrs = parse_column_attrs(&field.attrs)?;
            let column = match (attrs.name, &field.ident) {
                (Some(name), _) => name,
                (None, Some(ident)) => ident.to_string(),
                (None, None) => continue,
            };
            for (marked, slot, what) in [
                (attrs.primary_key, &mut table.primary_key, "primary_key"),
                (attrs.created_at, &mut table.created_at, "created_at"),
                (attrs.updated_at, &mut table.updated_at, "updated_at"),
                (attrs.deleted_at, &mut table.deleted_at, "deleted_at"),
            ] {
                if !marked {
                    continue;
                }
                if slot.is_some() {
                    return Err(syn::Error::new_spanned(
                        field,
                        format!("{what} column is declared more than once"),
                    ));
                }
                *slot = Some(column.clone());
            }
        }
    }

    let name = table
        .name
        .unwrap_or_else(|| to_snake_case(&struct_name.to_string()));
    let primary_key = table.primary_key.unwrap_or_else(|| String::from("id"));
    for identifier in [Some(&name), Some(&primary_key)]
        .into_iter()
        .chain([&table.created_at, &table.updated_at, &table.deleted_at].map(Option::as_ref))
        .flatten()
    {
        check_identifier(identifier, struct_name)?;
    }

    let created_at = optional(table.created_at.as_deref());
    let updated_at = optional(table.updated_at.as_deref());
    let deleted_at = optional(table.deleted_at.as_deref());
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics ::wlib_orm::TableMeta for #struct_name #ty_generics #where_clause {
            const NAME: &'static str = #name;
            const PRIMARY_KEY: &'static str = #primary_key;
            const CREATED_AT: ::core::option::Option<&'static str> = #created_at;
            const UPDATED_AT: ::core::option::Option<&'static str> = #updated_at;
            const DELETED_AT: ::core::option::Option<&'static str> = #deleted_at;
        }
    })
}

fn optional(column: Option<&str>) -> TokenStream2 {
    match column {
        Some(column) => quote! { ::core::option::Option::Some(#column) },
        None => quote! { ::core::option::Option::None },
    }
}

fn check_identifier(name: &str, span: &Ident) -> syn::Result<()> {
    if !name.is_empty() && name.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_') {
        Ok(())
    } else {
        Err(syn::Error::new_spanned(
            span,
            format!("invalid SQL identifier {name:?}: expected [A-Za-z0-9_]+"),
        ))
    }
}

fn string_value(meta: &syn::meta::ParseNestedMeta<'_>) -> syn::Result<String> {
    let value: Expr = meta.value()?.parse()?;
    if let Expr::Lit(lit) = &value {
        if let Lit::Str(s) = &lit.lit {
            return Ok(s.value());
        }
    }
    Err(syn::Error::new_spanned(value, "expected a string literal"))
}

fn parse_table_attrs(attrs: &[Attribute]) -> syn::Result<TableAttrs> {
    let mut result = TableAttrs::default();
    for attr in attrs {
        if attr.path().is_ident("table") {
            attr.parse_nested_meta(|meta| {
                let slot = if meta.path.is_ident("name") {
                    &mut result.name
                } else if meta.path.is_ident("primary_key") {
                    &mut result.primary_key
                } else if meta.path.is_ident("created_at") {
                    &mut result.created_at
                } else if meta.path.is_ident("updated_at") {
                    &mut result.updated_at
                } else if meta.path.is_ident("deleted_at") {
                    &mut result.deleted_at
                } else {
                    return Err(meta.error("unknown table attribute"));
                };
                *slot = Some(string_value(&meta)?);
                Ok(())
            })?;
        }
    }
    Ok(result)
}

fn parse_column_attrs(attrs: &[Attribute]) -> syn::Result<ColumnAttrs> {
    let mut result = ColumnAttrs::default();
    for attr in attrs {
        if attr.path().is_ident("column") {
            // Handle empty attribute like #[column]
            if matches!(attr.meta, Meta::Path(_)) {
                continue;
            }

            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("primary_key") {
                    result.primary_key = true;
                } else if meta.path.is_ident("created_at") {
                    result.created_at = true;
                } else if meta.path.is_ident("updated_at") {
                    result.updated_at = true;
                } else if meta.path.is_ident("deleted_at") {
                    result.deleted_at = true;
                } else if meta.path.is_ident("name") {
                    result.name = Some(string_value(&meta)?);
                } else {
                    return Err(meta.error("unknown column attribute"));
                }
                Ok(())
            })?;
        }
    }
    Ok(result)
}

fn to_snake_case(s: &str) -> String {
    let mut result = String::new();
    for (i, c) in s.chars().enumerate() {
        if c.is_uppercase() {
            if i > 0 {
                result.push('_');
            }
            result.push(c.to_ascii_lowercase());
        } else {
            result.push(c);
        }
    }
    result
}
