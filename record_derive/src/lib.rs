//! Procedural macros for document records
//!
//! This crate provides the `#[model]` macro and the `Record` derive, which
//! generate the `record_object::Record`, `Destination` and (by default)
//! `LifecycleHooks` implementations for a struct.

use proc_macro::TokenStream;
use syn::{parse_macro_input, DeriveInput};

mod code_generation;
mod model_macro;
mod parsing;

use code_generation::{generate_destination_impl, generate_hooks_impl, generate_record_impl};
use model_macro::model_attribute;
use parsing::{parse_field_attributes, parse_record_attributes};

/// Derive macro for the `Record` trait
///
/// Note: It's recommended to use the `#[model]` attribute macro instead,
/// which automatically includes this derive along with the serde derives.
///
/// Manual usage:
/// ```ignore
/// #[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize, Record)]
/// #[record(table = "people", hooks)]
/// pub struct Person {
///     pub id: String,
///
///     #[index]
///     pub email: String,
///
///     #[created_at]
///     pub joined_at: DateTime<Utc>,
///
///     pub updated_at: DateTime<Utc>,
/// }
/// ```
///
/// The table name defaults to the pluralized, lower-cased struct name. The
/// identity and timestamp fields default to `id`, `created_at` and
/// `updated_at`; the identity must serialize under the document key `id`.
#[proc_macro_derive(Record, attributes(record, id, created_at, updated_at, index))]
pub fn derive_record(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    let record_info = match parse_record_attributes(&input.attrs, &input.ident) {
        Ok(info) => info,
        Err(e) => return e.to_compile_error().into(),
    };

    let field_info = match parse_field_attributes(&input.data) {
        Ok(info) => info,
        Err(e) => return e.to_compile_error().into(),
    };

    let record_impl = generate_record_impl(&input, &record_info, &field_info);
    let destination_impl = generate_destination_impl(&input);
    let hooks_impl = generate_hooks_impl(&input, &record_info);

    let expanded = quote::quote! {
        #record_impl
        #destination_impl
        #hooks_impl
    };

    TokenStream::from(expanded)
}

/// Convenience attribute macro that adds all necessary derives for a record
///
/// Usage:
/// ```ignore
/// #[model]
/// pub struct Node {
///     pub id: String,
///     pub name: String,
///     pub created_at: DateTime<Utc>,
///     pub updated_at: DateTime<Utc>,
/// }
/// ```
#[proc_macro_attribute]
pub fn model(attr: TokenStream, item: TokenStream) -> TokenStream {
    model_attribute(attr, item)
}
