//! Code generation for record trait implementations

use proc_macro2::TokenStream;
use quote::quote;
use syn::DeriveInput;

use crate::parsing::{FieldInfo, RecordInfo};

pub fn generate_record_impl(
    input: &DeriveInput,
    record_info: &RecordInfo,
    field_info: &FieldInfo,
) -> TokenStream {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let type_name = name.to_string();
    let table_name = &record_info.table_name;
    let indexes = &field_info.indexes;

    let id = &field_info.id_field;
    let created_at = &field_info.created_at_field;
    let updated_at = &field_info.updated_at_field;

    quote! {
        impl #impl_generics record_object::Record for #name #ty_generics #where_clause {
            fn type_name() -> &'static str {
                #type_name
            }

            fn table_name() -> String {
                #table_name.to_string()
            }

            fn indexes() -> Vec<&'static str> {
                vec![#(#indexes),*]
            }

            fn id(&self) -> &str {
                &self.#id
            }

            fn set_id(&mut self, id: String) {
                self.#id = id;
            }

            fn created_at(&self) -> record_object::chrono::DateTime<record_object::chrono::Utc> {
                self.#created_at
            }

            fn set_created_at(&mut self, at: record_object::chrono::DateTime<record_object::chrono::Utc>) {
                self.#created_at = at;
            }

            fn updated_at(&self) -> record_object::chrono::DateTime<record_object::chrono::Utc> {
                self.#updated_at
            }

            fn set_updated_at(&mut self, at: record_object::chrono::DateTime<record_object::chrono::Utc>) {
                self.#updated_at = at;
            }
        }
    }
}

pub fn generate_destination_impl(input: &DeriveInput) -> TokenStream {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    quote! {
        impl #impl_generics record_object::Destination for #name #ty_generics #where_clause {}
    }
}

/// Empty hooks impl, unless the record implements them by hand
pub fn generate_hooks_impl(input: &DeriveInput, record_info: &RecordInfo) -> TokenStream {
    if record_info.hooks {
        return TokenStream::new();
    }

    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    quote! {
        impl #impl_generics record_object::LifecycleHooks for #name #ty_generics #where_clause {}
    }
}
