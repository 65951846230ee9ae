extern crate proc_macro;

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;

/// Derives `rdl::tbin::Marshal`.
///
/// * Named structs encode as typed structs, fields in declaration order.
///   `Option<T>` fields are optional unless marked `#[tbin(required)]`;
///   `#[tbin(name = "...")]` sets the field name used on the wire. An
///   optional field's shape is defined ahead of the struct, except when `T`
///   refers back to the struct itself.
/// * Single-field tuple structs are transparent.
/// * Enums of unit variants encode as enums; enums whose every variant
///   holds one value encode as unions.
#[proc_macro_derive(Marshal, attributes(tbin))]
pub fn marshal_derive(input: TokenStream) -> TokenStream {
    let ast = syn::parse_macro_input!(input as syn::DeriveInput);

    impl_marshal(&ast)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

#[derive(Default)]
struct Attrs {
    name: Option<String>,
    required: bool,
}

fn tbin_attrs(attrs: &[syn::Attribute]) -> syn::Result<Attrs> {
    let mut out = Attrs::default();
    for attr in attrs.iter().filter(|attr| attr.path().is_ident("tbin")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                let lit: syn::LitStr = meta.value()?.parse()?;
                out.name = Some(lit.value());
                Ok(())
            } else if meta.path.is_ident("required") {
                out.required = true;
                Ok(())
            } else {
                Err(meta.error("expected `name = \"...\"` or `required`"))
            }
        })?;
    }
    Ok(out)
}

fn option_inner(ty: &syn::Type) -> Option<&syn::Type> {
    let syn::Type::Path(syn::TypePath { qself: None, path }) = ty else {
        return None;
    };
    let last = path.segments.last()?;
    if last.ident != "Option" {
        return None;
    }
    match &last.arguments {
        syn::PathArguments::AngleBracketed(args) => match args.args.first()? {
            syn::GenericArgument::Type(inner) => Some(inner),
            _ => None,
        },
        _ => None,
    }
}

/// Whether `ty` names `ident` or `Self` anywhere inside it.
fn refers_to(ty: &syn::Type, ident: &syn::Ident) -> bool {
    fn scan(tokens: TokenStream2, ident: &syn::Ident) -> bool {
        tokens.into_iter().any(|tt| match tt {
            proc_macro2::TokenTree::Ident(id) => id == *ident || id == "Self",
            proc_macro2::TokenTree::Group(group) => scan(group.stream(), ident),
            _ => false,
        })
    }
    scan(quote! { #ty }, ident)
}

fn impl_marshal(ast: &syn::DeriveInput) -> syn::Result<TokenStream2> {
    let marshal_trait = quote! { ::rdl::tbin::Marshal };
    let target_trait = quote! { ::rdl::tbin::Target };
    let encoder_type = quote! { ::rdl::tbin::Encoder };
    let signature_type = quote! { ::rdl::tbin::Signature };
    let field_type = quote! { ::rdl::tbin::FieldSignature };
    let result_type = quote! { ::rdl::tbin::EncodeResult };

    let name = &ast.ident;
    let type_name = name.to_string();
    let (impl_generics, ty_generics, where_clause) = ast.generics.split_for_impl();

    let (signature, body, marshal) = match &ast.data {
        syn::Data::Struct(syn::DataStruct { fields, .. }) => match fields {
            syn::Fields::Named(syn::FieldsNamed { named, .. }) => {
                let mut sig_fields = Vec::with_capacity(named.len());
                let mut writes = Vec::with_capacity(named.len());
                for field in named {
                    let attrs = tbin_attrs(&field.attrs)?;
                    let ident = &field.ident;
                    let wire = attrs
                        .name
                        .unwrap_or_else(|| ident.as_ref().map(ToString::to_string).unwrap_or_default());
                    let ty = &field.ty;
                    match (option_inner(ty), attrs.required) {
                        (Some(inner), true) => {
                            sig_fields.push(quote! {
                                #field_type::new(#wire, <#inner as #marshal_trait>::signature())
                            });
                            writes.push(quote! {
                                match &self.#ident {
                                    ::core::option::Option::Some(value) => #marshal_trait::marshal_value(value, enc)?,
                                    ::core::option::Option::None => {
                                        return ::core::result::Result::Err(enc.fail(
                                            ::rdl::tbin::EncodeError::MissingField {
                                                ty: ::std::string::String::from(#type_name),
                                                field: ::std::string::String::from(#wire),
                                            },
                                        ));
                                    }
                                }
                            });
                        }
                        (Some(inner), false) if refers_to(inner, name) => {
                            sig_fields.push(quote! { #field_type::optional(#wire) });
                            writes.push(quote! { #marshal_trait::marshal(&self.#ident, enc)?; });
                        }
                        (Some(inner), false) => {
                            sig_fields.push(quote! {
                                #field_type::optional_of(#wire, <#inner as #marshal_trait>::signature())
                            });
                            writes.push(quote! { #marshal_trait::marshal(&self.#ident, enc)?; });
                        }
                        (None, true) => {
                            return Err(syn::Error::new_spanned(
                                ty,
                                "`#[tbin(required)]` only applies to `Option` fields",
                            ));
                        }
                        (None, false) => {
                            sig_fields.push(quote! {
                                #field_type::new(#wire, <#ty as #marshal_trait>::signature())
                            });
                            writes.push(quote! { #marshal_trait::marshal_value(&self.#ident, enc)?; });
                        }
                    }
                }
                (
                    quote! { #signature_type::structure(::std::vec![#(#sig_fields),*]) },
                    quote! {
                        #(#writes)*
                        ::core::result::Result::Ok(())
                    },
                    None,
                )
            }
            syn::Fields::Unnamed(syn::FieldsUnnamed { unnamed, .. }) if unnamed.len() == 1 => {
                let ty = &unnamed[0].ty;
                (
                    quote! { <#ty as #marshal_trait>::signature() },
                    quote! { #marshal_trait::marshal_value(&self.0, enc) },
                    Some(quote! {
                        fn marshal<__U: #target_trait>(&self, enc: &mut #encoder_type<'_, __U>) -> #result_type<()> {
                            #marshal_trait::marshal(&self.0, enc)
                        }
                    }),
                )
            }
            _ => {
                return Err(syn::Error::new_spanned(
                    &ast.ident,
                    "`Marshal` can only be derived for structs with named fields or a single unnamed field",
                ))
            }
        },
        syn::Data::Enum(syn::DataEnum { variants, .. }) => {
            if variants.is_empty() {
                return Err(syn::Error::new_spanned(&ast.ident, "`Marshal` cannot be derived for empty enums"));
            }
            let ident: Vec<&syn::Ident> = variants.iter().map(|v| &v.ident).collect();
            if variants.iter().all(|v| matches!(v.fields, syn::Fields::Unit)) {
                let mut symbols = Vec::with_capacity(variants.len());
                for v in variants {
                    let attrs = tbin_attrs(&v.attrs)?;
                    symbols.push(attrs.name.unwrap_or_else(|| v.ident.to_string()));
                }
                let index = (1..=variants.len()).map(|i| i as i32);
                (
                    quote! { #signature_type::enumeration([#(#symbols),*]) },
                    quote! {
                        let index: i32 = match self {
                            #( Self::#ident => #index, )*
                        };
                        enc.write_int32(index)
                    },
                    None,
                )
            } else if variants.iter().all(|v| v.fields.len() == 1 && !matches!(v.fields, syn::Fields::Named(_))) {
                let ty = variants.iter().filter_map(|v| v.fields.iter().next().map(|f| &f.ty));
                let index = (1..=variants.len()).map(|i| i as u64);
                (
                    quote! { #signature_type::union(::std::vec![#( <#ty as #marshal_trait>::signature() ),*]) },
                    quote! {
                        match self {
                            #(
                                Self::#ident(value) => {
                                    enc.write_uvarint(#index)?;
                                    #marshal_trait::marshal_value(value, enc)
                                }
                            )*
                        }
                    },
                    None,
                )
            } else {
                return Err(syn::Error::new_spanned(
                    &ast.ident,
                    "`Marshal` requires enum variants to be either all unit or all single-valued",
                ));
            }
        }
        syn::Data::Union(_) => {
            return Err(syn::Error::new_spanned(&ast.ident, "`Marshal` cannot be derived for unions"))
        }
    };

    Ok(quote! {
        impl #impl_generics #marshal_trait for #name #ty_generics #where_clause {
            fn signature() -> #signature_type {
                #signature
            }

            fn marshal_value<__U: #target_trait>(&self, enc: &mut #encoder_type<'_, __U>) -> #result_type<()> {
                #body
            }

            #marshal
        }
    })
}
