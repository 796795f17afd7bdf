#![recursion_limit = "256"]

extern crate proc_macro;

use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, Data, DeriveInput, Field, Fields};

/// Implements `tree_hash::TreeHash` for a struct: the container root is the
/// merkleization of the field roots in declaration order.
#[proc_macro_derive(TreeHash)]
pub fn tree_hash_derive(input: TokenStream) -> TokenStream {
    let ast = parse_macro_input!(input as DeriveInput);

    let name = &ast.ident;
    let (impl_generics, ty_generics, where_clause) = ast.generics.split_for_impl();
    let idents = field_idents(&ast.data);
    let leaf_capacity = idents.len() * 32;

    let generated = quote! {
        impl #impl_generics tree_hash::TreeHash for #name #ty_generics #where_clause {
            fn tree_hash_type() -> tree_hash::TreeHashType {
                tree_hash::TreeHashType::Container
            }

            fn tree_hash_packed_encoding(&self) -> Vec<u8> {
                unreachable!("containers should never be packed")
            }

            fn tree_hash_packing_factor() -> usize {
                unreachable!("containers should never be packed")
            }

            fn tree_hash_root(&self) -> Vec<u8> {
                let mut leaves = Vec::with_capacity(#leaf_capacity);
                #(
                    leaves.append(&mut tree_hash::TreeHash::tree_hash_root(&self.#idents));
                )*
                tree_hash::merkleize_padded(&leaves, 0)
            }
        }
    };

    generated.into()
}

/// Implements `tree_hash::SignedRoot` for a struct: the signed root elides
/// the struct's final field, which by convention is the signature.
#[proc_macro_derive(SignedRoot)]
pub fn signed_root_derive(input: TokenStream) -> TokenStream {
    let ast = parse_macro_input!(input as DeriveInput);

    let name = &ast.ident;
    let (impl_generics, ty_generics, where_clause) = ast.generics.split_for_impl();
    let mut idents = field_idents(&ast.data);
    assert!(
        idents.len() > 1,
        "SignedRoot requires at least one field besides the signature"
    );
    idents.pop();
    let leaf_capacity = idents.len() * 32;

    let generated = quote! {
        impl #impl_generics tree_hash::SignedRoot for #name #ty_generics #where_clause {
            fn signed_root(&self) -> Vec<u8> {
                let mut leaves = Vec::with_capacity(#leaf_capacity);
                #(
                    leaves.append(&mut tree_hash::TreeHash::tree_hash_root(&self.#idents));
                )*
                tree_hash::merkleize_padded(&leaves, 0)
            }
        }
    };

    generated.into()
}

fn field_idents(data: &Data) -> Vec<&syn::Ident> {
    let fields = match data {
        Data::Struct(data) => &data.fields,
        _ => panic!("tree hash derives only support structs"),
    };

    match fields {
        Fields::Named(fields) => fields
            .named
            .iter()
            .map(|field: &Field| field.ident.as_ref().expect("named fields only"))
            .collect(),
        _ => panic!("tree hash derives only support named fields"),
    }
}
