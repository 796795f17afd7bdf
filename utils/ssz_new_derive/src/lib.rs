#![recursion_limit = "256"]

extern crate proc_macro;

use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, Data, DeriveInput, Field, Fields};

/// Implements `ssz_new::SszEncode` for a struct. Fields are written in
/// declaration order; variable-size fields leave an offset in the fixed
/// region and append their payload to the heap.
#[proc_macro_derive(SszEncode, attributes(ssz))]
pub fn encode_derive(input: TokenStream) -> TokenStream {
    let ast = parse_macro_input!(input as DeriveInput);

    let name = &ast.ident;
    let (impl_generics, ty_generics, where_clause) = ast.generics.split_for_impl();
    let fields = serializable_fields(&ast.data);

    let field_count = fields.len();

    let mut part_pushes = Vec::with_capacity(field_count);
    let mut fixed_len_terms = Vec::with_capacity(field_count);
    for field in &fields {
        let ty = &field.ty;
        let ident = field.ident.as_ref().expect("named fields only");

        part_pushes.push(quote! {
            if <#ty as ssz_new::SszEncode>::is_ssz_fixed_len() {
                fixed_parts.push(Some(ssz_new::SszEncode::as_ssz_bytes(&self.#ident)));
                variable_parts.push(vec![]);
            } else {
                fixed_parts.push(None);
                variable_parts.push(ssz_new::SszEncode::as_ssz_bytes(&self.#ident));
            }
        });

        fixed_len_terms.push(quote! {
            <#ty as ssz_new::SszEncode>::is_ssz_fixed_len()
        });
    }

    let generated = quote! {
        impl #impl_generics ssz_new::SszEncode for #name #ty_generics #where_clause {
            fn as_ssz_bytes(&self) -> Vec<u8> {
                let mut fixed_parts = Vec::with_capacity(#field_count);
                let mut variable_parts = Vec::with_capacity(#field_count);

                #(
                    #part_pushes
                )*

                ssz_new::encode_items_from_parts(&fixed_parts, &variable_parts)
            }

            fn is_ssz_fixed_len() -> bool {
                #(
                    #fixed_len_terms &&
                )*
                    true
            }
        }
    };

    generated.into()
}

/// Implements `ssz_new::SszDecode` for a struct through `ssz_new::Decoder`:
/// every field type is registered first so the offset table is known, then
/// values are read back in declaration order.
#[proc_macro_derive(SszDecode, attributes(ssz))]
pub fn decode_derive(input: TokenStream) -> TokenStream {
    let ast = parse_macro_input!(input as DeriveInput);

    let name = &ast.ident;
    let (impl_generics, ty_generics, where_clause) = ast.generics.split_for_impl();
    let fields = deserializable_fields(&ast.data);

    let field_count = fields.len();

    let mut registrations = Vec::with_capacity(field_count);
    let mut initializers = Vec::with_capacity(field_count);
    let mut fixed_len_terms = Vec::with_capacity(field_count);
    let mut fixed_len_sums = Vec::with_capacity(field_count);
    for field in &fields {
        let ty = &field.ty;
        let ident = field.ident.as_ref().expect("named fields only");

        if skipped_on_decode(field) {
            initializers.push(quote! {
                #ident: <_>::default()
            });
            continue;
        }

        registrations.push(quote! {
            decoder.next_type::<#ty>()?
        });
        initializers.push(quote! {
            #ident: decoder.deserialize_next::<#ty>()?
        });
        fixed_len_terms.push(quote! {
            <#ty as ssz_new::SszDecode>::is_ssz_fixed_len()
        });
        fixed_len_sums.push(quote! {
            <#ty as ssz_new::SszDecode>::ssz_fixed_len()
        });
    }

    let generated = quote! {
        impl #impl_generics ssz_new::SszDecode for #name #ty_generics #where_clause {
            fn from_ssz_bytes(bytes: &[u8]) -> Result<Self, ssz_new::SszDecodeError> {
                let mut decoder = ssz_new::Decoder::for_bytes(bytes);

                #(
                    #registrations;
                )*

                Ok(Self {
                    #(
                        #initializers,
                    )*
                })
            }

            fn is_ssz_fixed_len() -> bool {
                #(
                    #fixed_len_terms &&
                )*
                    true
            }

            fn ssz_fixed_len() -> usize {
                if <Self as ssz_new::SszDecode>::is_ssz_fixed_len() {
                    #(
                        #fixed_len_sums +
                    )*
                    0
                } else {
                    ssz_new::BYTES_PER_LENGTH_OFFSET
                }
            }
        }
    };

    generated.into()
}

fn serializable_fields(data: &Data) -> Vec<&Field> {
    struct_fields(data)
        .iter()
        .filter(|field| !has_ssz_marker(field, "skip_serializing"))
        .collect()
}

fn deserializable_fields(data: &Data) -> Vec<&Field> {
    struct_fields(data).iter().collect()
}

fn skipped_on_decode(field: &Field) -> bool {
    has_ssz_marker(field, "skip_deserializing")
}

fn has_ssz_marker(field: &Field, marker: &str) -> bool {
    field.attrs.iter().any(|attr| {
        attr.path.is_ident("ssz")
            && attr
                .tokens
                .to_string()
                .replace(' ', "")
                .contains(&format!("({})", marker))
    })
}

fn struct_fields(data: &Data) -> &Fields {
    match data {
        Data::Struct(data) => &data.fields,
        _ => panic!("SSZ derives only support structs"),
    }
}
