extern crate proc_macro;

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;

/// Derives `rdl::tbin::Unmarshal`, for the same shapes of types as
/// `Marshal`.
///
/// Structs with named fields must implement `Default`: fields are matched
/// by wire name regardless of ASCII case, and those the stream does not
/// carry keep their default values (in strict mode, a missing non-`Option`
/// or `#[tbin(required)]` field is an error instead).
#[proc_macro_derive(Unmarshal, attributes(tbin))]
pub fn unmarshal_derive(input: TokenStream) -> TokenStream {
    let ast = syn::parse_macro_input!(input as syn::DeriveInput);

    impl_unmarshal(&ast)
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

fn is_option(ty: &syn::Type) -> bool {
    match ty {
        syn::Type::Path(syn::TypePath { qself: None, path }) => {
            path.segments.last().map_or(false, |seg| seg.ident == "Option")
        }
        _ => false,
    }
}

fn impl_unmarshal(ast: &syn::DeriveInput) -> syn::Result<TokenStream2> {
    let unmarshal_trait = quote! { ::rdl::tbin::Unmarshal };
    let parser_trait = quote! { ::rdl::tbin::Parser };
    let decoder_type = quote! { ::rdl::tbin::Decoder };
    let signature_type = quote! { ::rdl::tbin::Signature };
    let error_type = quote! { ::rdl::tbin::DecodeError };
    let result_type = quote! { ::rdl::tbin::DecodeResult };

    let name = &ast.ident;
    let type_name = name.to_string();
    let (impl_generics, ty_generics, where_clause) = ast.generics.split_for_impl();

    let indirect = quote! {
        if let ::core::option::Option::Some(value) = dec.read_indirect::<Self>(sig, #type_name)? {
            return ::core::result::Result::Ok(value);
        }
    };

    let (body, unmarshal_null) = match &ast.data {
        syn::Data::Struct(syn::DataStruct { fields, .. }) => match fields {
            syn::Fields::Named(syn::FieldsNamed { named, .. }) => {
                let n = named.len();
                let mut visits = Vec::with_capacity(n);
                let mut checks = Vec::new();
                for (i, field) in named.iter().enumerate() {
                    let attrs = tbin_attrs(&field.attrs)?;
                    let ident = &field.ident;
                    let wire = attrs
                        .name
                        .unwrap_or_else(|| ident.as_ref().map(ToString::to_string).unwrap_or_default());
                    visits.push(quote! {
                        if name.eq_ignore_ascii_case(#wire) {
                            if let ::core::option::Option::Some(value) = dec.read_field(ty)? {
                                out.#ident = value;
                                seen[#i] = true;
                            }
                            return ::core::result::Result::Ok(true);
                        }
                    });
                    if attrs.required || !is_option(&field.ty) {
                        checks.push(quote! {
                            if !seen[#i] {
                                return ::core::result::Result::Err(dec.fail(#error_type::MissingField {
                                    ty: ::std::string::String::from(#type_name),
                                    field: ::std::string::String::from(#wire),
                                }));
                            }
                        });
                    }
                }
                (
                    quote! {
                        #indirect
                        let mut out = <Self as ::core::default::Default>::default();
                        let mut seen = [false; #n];
                        dec.read_fields(sig, #type_name, |dec, name, ty| {
                            #(#visits)*
                            ::core::result::Result::Ok(false)
                        })?;
                        if dec.is_strict() {
                            #(#checks)*
                        }
                        ::core::result::Result::Ok(out)
                    },
                    None,
                )
            }
            syn::Fields::Unnamed(syn::FieldsUnnamed { unnamed, .. }) if unnamed.len() == 1 => {
                let ty = &unnamed[0].ty;
                (
                    quote! {
                        <#ty as #unmarshal_trait>::unmarshal_value(dec, sig).map(Self)
                    },
                    Some(quote! {
                        fn unmarshal_null() -> ::core::option::Option<Self> {
                            <#ty as #unmarshal_trait>::unmarshal_null().map(Self)
                        }
                    }),
                )
            }
            _ => {
                return Err(syn::Error::new_spanned(
                    &ast.ident,
                    "`Unmarshal` can only be derived for structs with named fields or a single unnamed field",
                ))
            }
        },
        syn::Data::Enum(syn::DataEnum { variants, .. }) => {
            if variants.is_empty() {
                return Err(syn::Error::new_spanned(&ast.ident, "`Unmarshal` cannot be derived for empty enums"));
            }
            let ident: Vec<&syn::Ident> = variants.iter().map(|v| &v.ident).collect();
            if variants.iter().all(|v| matches!(v.fields, syn::Fields::Unit)) {
                let mut symbols = Vec::with_capacity(variants.len());
                for v in variants {
                    let attrs = tbin_attrs(&v.attrs)?;
                    symbols.push(attrs.name.unwrap_or_else(|| v.ident.to_string()));
                }
                (
                    quote! {
                        #indirect
                        let symbol = dec.read_text(sig, #type_name)?;
                        let found = match symbol.as_str() {
                            #( #symbols => ::core::option::Option::Some(Self::#ident), )*
                            _ => ::core::option::Option::None,
                        };
                        match found {
                            ::core::option::Option::Some(value) => ::core::result::Result::Ok(value),
                            ::core::option::Option::None => ::core::result::Result::Err(dec.fail(
                                #error_type::UnknownSymbol {
                                    ty: ::std::string::String::from(#type_name),
                                    symbol,
                                },
                            )),
                        }
                    },
                    None,
                )
            } else if variants.iter().all(|v| v.fields.len() == 1 && !matches!(v.fields, syn::Fields::Named(_))) {
                let ty = variants.iter().filter_map(|v| v.fields.iter().next().map(|f| &f.ty));
                let index = 0..variants.len();
                let len = variants.len();
                (
                    quote! {
                        #indirect
                        let (index, variant) = dec.read_variant(sig, #type_name)?;
                        match index {
                            #( #index => <#ty as #unmarshal_trait>::unmarshal_value(dec, &variant).map(Self::#ident), )*
                            _ => ::core::result::Result::Err(dec.fail(#error_type::IndexOutOfRange {
                                what: "union variant",
                                index: index as i64 + 1,
                                len: #len,
                            })),
                        }
                    },
                    None,
                )
            } else {
                return Err(syn::Error::new_spanned(
                    &ast.ident,
                    "`Unmarshal` requires enum variants to be either all unit or all single-valued",
                ));
            }
        }
        syn::Data::Union(_) => {
            return Err(syn::Error::new_spanned(&ast.ident, "`Unmarshal` cannot be derived for unions"))
        }
    };

    Ok(quote! {
        impl #impl_generics #unmarshal_trait for #name #ty_generics #where_clause {
            #[allow(unused_mut, unused_variables)]
            fn unmarshal_value<__P: #parser_trait>(
                dec: &mut #decoder_type<'_, __P>,
                sig: &#signature_type,
            ) -> #result_type<Self> {
                #body
            }

            #unmarshal_null
        }
    })
}
