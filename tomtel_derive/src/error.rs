//! Derive macro for error types.
//!
//! Generates `std::fmt::Display` and `std::error::Error` implementations for
//! error enums. Replacement for the `thiserror` crate, restricted to the
//! shapes this project actually uses: unit variants and variants with named
//! fields.
//!
//! # Usage
//!
//! ```ignore
//! use tomtel_derive::Error;
//!
//! #[derive(Debug, Error)]
//! pub enum MyError {
//!     #[error("unknown opcode {opcode:#04x} at pc={pc:#x}")]
//!     UnknownOpcode { opcode: u8, pc: u32 },
//!
//!     #[error("nothing to do")]
//!     Empty,
//! }
//! ```

use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, Data, DeriveInput, Fields, Lit, Meta};

/// Derives `Display` and `Error` for an enum.
///
/// Each variant must carry an `#[error("...")]` attribute with the display
/// message. Named fields interpolate as `{field_name}` and accept the usual
/// format specs (e.g. `{opcode:#04x}`).
pub fn derive_error(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match expand(&input) {
        Ok(tokens) => TokenStream::from(tokens),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let name = &input.ident;

    let Data::Enum(data_enum) = &input.data else {
        return Err(syn::Error::new_spanned(
            input,
            "Error derive only supports enums",
        ));
    };

    let display_arms = data_enum
        .variants
        .iter()
        .map(|variant| {
            let variant_name = &variant.ident;
            let message = error_message(variant)?;

            match &variant.fields {
                Fields::Unit => Ok(quote! {
                    Self::#variant_name => write!(f, #message),
                }),
                Fields::Named(fields) => {
                    let field_names: Vec<_> =
                        fields.named.iter().map(|f| &f.ident).collect();
                    Ok(quote! {
                        Self::#variant_name { #(#field_names),* } =>
                            write!(f, #message, #(#field_names = #field_names),*),
                    })
                }
                Fields::Unnamed(_) => Err(syn::Error::new_spanned(
                    variant,
                    "Error derive does not support tuple variants; use named fields",
                )),
            }
        })
        .collect::<syn::Result<Vec<_>>>()?;

    Ok(quote! {
        impl ::std::fmt::Display for #name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                match self {
                    #(#display_arms)*
                }
            }
        }

        impl ::std::error::Error for #name {}
    })
}

/// Extracts the message from a variant's `#[error("...")]` attribute.
fn error_message(variant: &syn::Variant) -> syn::Result<String> {
    for attr in &variant.attrs {
        if !attr.path().is_ident("error") {
            continue;
        }

        let Meta::List(meta_list) = &attr.meta else {
            return Err(syn::Error::new_spanned(
                &attr.meta,
                "invalid #[error] attribute; use #[error(\"message\")]",
            ));
        };

        let lit = syn::parse2::<Lit>(meta_list.tokens.clone()).map_err(|_| {
            syn::Error::new_spanned(
                &attr.meta,
                "failed to parse #[error] attribute; expected a string literal like #[error(\"unknown opcode {opcode:#04x}\")]",
            )
        })?;

        if let Lit::Str(lit_str) = lit {
            return Ok(lit_str.value());
        }

        return Err(syn::Error::new_spanned(
            &attr.meta,
            "invalid #[error] attribute: message must be a string literal",
        ));
    }

    Err(syn::Error::new_spanned(
        variant,
        format!(
            "missing #[error(\"...\")] attribute on variant `{}`; every error variant must declare a display message",
            variant.ident
        ),
    ))
}
