//! Parsing utilities for record and field attributes
//!
//! This module handles `#[record(...)]` on the struct and the `#[id]`,
//! `#[created_at]`, `#[updated_at]` and `#[index]` field markers. Table and
//! index names go through the same resolver and validation as at runtime.

use proc_macro2::{Span, TokenTree};
use record_object::naming::table_name_for;
use record_object::validation::{ValidatedIndexName, ValidatedTableName};
use record_object::PRIMARY_KEY;
use syn::{Attribute, Data, Error, Field, Fields, Ident, LitStr, Meta, Result};

#[derive(Debug)]
pub struct RecordInfo {
    pub table_name: String,
    /// Whether `LifecycleHooks` is implemented by hand
    pub hooks: bool,
}

#[derive(Debug)]
pub struct FieldInfo {
    pub id_field: Ident,
    pub created_at_field: Ident,
    pub updated_at_field: Ident,
    pub indexes: Vec<String>, // serialized names of #[index] fields
}

/// Validate table name and return syn::Error for better proc macro error handling
pub fn validate_table_name_syn(name: &str, span: Span) -> Result<()> {
    ValidatedTableName::new(name)
        .map(|_| ())
        .map_err(|e| Error::new(span, format!("Invalid table name '{}': {}", name, e)))
}

/// Validate index name and return syn::Error for better proc macro error handling
pub fn validate_index_name_syn(name: &str, span: Span) -> Result<()> {
    ValidatedIndexName::new(name)
        .map(|_| ())
        .map_err(|e| Error::new(span, format!("Invalid index name '{}': {}", name, e)))
}

pub fn parse_record_attributes(attrs: &[Attribute], ident: &Ident) -> Result<RecordInfo> {
    let mut table_name = None;
    let mut hooks = false;

    for attr in attrs {
        if !attr.path().is_ident("record") {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("table") {
                let lit: LitStr = meta.value()?.parse()?;
                validate_table_name_syn(&lit.value(), lit.span())?;
                table_name = Some(lit.value());
                Ok(())
            } else if meta.path.is_ident("hooks") {
                hooks = true;
                Ok(())
            } else {
                Err(meta.error("unsupported record attribute, expected `table = \"...\"` or `hooks`"))
            }
        })?;
    }

    let table_name = match table_name {
        Some(name) => name,
        None => {
            let name = table_name_for(&ident.to_string());
            validate_table_name_syn(&name, ident.span())?;
            name
        }
    };

    Ok(RecordInfo { table_name, hooks })
}

pub fn parse_field_attributes(data: &Data) -> Result<FieldInfo> {
    let fields_named = match data {
        Data::Struct(data_struct) => match &data_struct.fields {
            Fields::Named(fields_named) => fields_named,
            _ => return Err(named_fields_error()),
        },
        _ => return Err(named_fields_error()),
    };

    let fields: Vec<&Field> = fields_named.named.iter().collect();

    let id_field = select_field(&fields, "id")?;
    let created_at_field = select_field(&fields, "created_at")?;
    let updated_at_field = select_field(&fields, "updated_at")?;

    // The identity is the store primary key, so it must land on that key
    let id_key = serialized_name(&fields, &id_field);
    if id_key != PRIMARY_KEY {
        return Err(Error::new(
            id_field.span(),
            format!(
                "identity field '{}' serializes as '{}', but must serialize as '{}': add #[serde(rename = \"{}\")]",
                id_field, id_key, PRIMARY_KEY, PRIMARY_KEY
            ),
        ));
    }

    let mut indexes = Vec::new();
    for field in &fields {
        if !has_attribute(&field.attrs, "index") {
            continue;
        }
        let ident = field_ident(field)?;
        let name = serde_rename(&field.attrs).unwrap_or_else(|| ident.to_string());
        validate_index_name_syn(&name, ident.span())?;
        if indexes.contains(&name) {
            return Err(Error::new(ident.span(), format!("duplicate index '{}'", name)));
        }
        indexes.push(name);
    }

    Ok(FieldInfo {
        id_field,
        created_at_field,
        updated_at_field,
        indexes,
    })
}

fn named_fields_error() -> Error {
    Error::new(
        Span::call_site(),
        "Record can only be derived for structs with named fields",
    )
}

fn field_ident(field: &Field) -> Result<&Ident> {
    field
        .ident
        .as_ref()
        .ok_or_else(|| Error::new_spanned(field, "Field must have a name"))
}

/// Pick the field marked `#[marker]`, falling back to the field named `marker`
fn select_field(fields: &[&Field], marker: &str) -> Result<Ident> {
    let mut marked = None;
    for field in fields {
        if has_attribute(&field.attrs, marker) {
            let ident = field_ident(field)?;
            if marked.is_some() {
                return Err(Error::new(
                    ident.span(),
                    format!("#[{}] can only be used on one field", marker),
                ));
            }
            marked = Some(ident.clone());
        }
    }
    if let Some(ident) = marked {
        return Ok(ident);
    }

    for field in fields {
        let ident = field_ident(field)?;
        if ident == marker {
            return Ok(ident.clone());
        }
    }

    Err(Error::new(
        Span::call_site(),
        format!(
            "Record requires a `{}` field: add one or mark a field with #[{}]",
            marker, marker
        ),
    ))
}

/// Document key the field serializes under
fn serialized_name(fields: &[&Field], ident: &Ident) -> String {
    fields
        .iter()
        .find(|field| field.ident.as_ref() == Some(ident))
        .and_then(|field| serde_rename(&field.attrs))
        .unwrap_or_else(|| ident.to_string())
}

pub fn has_attribute(attrs: &[Attribute], name: &str) -> bool {
    attrs.iter().any(|attr| attr.path().is_ident(name))
}

/// Find `rename = "..."` inside a field's `#[serde(...)]` attributes
pub fn serde_rename(attrs: &[Attribute]) -> Option<String> {
    for attr in attrs {
        if !attr.path().is_ident("serde") {
            continue;
        }
        let Meta::List(meta_list) = &attr.meta else {
            continue;
        };

        let mut tokens = meta_list.tokens.clone().into_iter().peekable();
        while let Some(token) = tokens.next() {
            let TokenTree::Ident(key) = token else {
                continue;
            };
            if key != "rename" {
                continue;
            }

            // Only the plain form; `rename(serialize = ...)` is a group
            if let Some(TokenTree::Punct(punct)) = tokens.peek() {
                if punct.as_char() == '=' {
                    tokens.next(); // consume '='
                    if let Some(TokenTree::Literal(lit)) = tokens.next() {
                        return Some(lit.to_string().trim_matches('"').to_string());
                    }
                }
            }
        }
    }

    None
}
