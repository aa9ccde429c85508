/*
 * Copyright (c) 2024. Govcraft
 *
 * Licensed under either of
 *   * Apache License, Version 2.0 (the "License");
 *     you may not use this file except in compliance with the License.
 *     You may obtain a copy of the License at http://www.apache.org/licenses/LICENSE-2.0
 *   * MIT license: http://opensource.org/licenses/MIT
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the applicable License for the specific language governing permissions and
 * limitations under that License.
 */
#![forbid(unsafe_code)]

//! Parley Macro Library
//!
//! Procedural macros for the Parley messaging crates.
//!
//! # Message Macro
//!
//! [`parley_message`] turns a struct into a typed message that can travel inside
//! an envelope:
//!
//! ```ignore
//! #[parley_message(tag = "ProcessTimeoutRequest")]
//! pub struct ProcessTimeoutRequest {
//!     pub milliseconds_timeout: u64,
//!     pub process_name: String,
//! }
//!
//! // Fault-injected message: the named field supplies the fault specification.
//! #[parley_message(tag = "ExceptionMessage", fault = fault)]
//! pub struct ExceptionMessage {
//!     #[serde(flatten)]
//!     pub fault: FaultSpecification,
//! }
//! ```
//!
//! # Main Entry Point
//!
//! [`parley_main`] wraps an `async fn main` in a Tokio runtime.

use proc_macro::TokenStream;

use quote::quote;
use syn::{parse_macro_input, DeriveInput, Ident, ItemFn, LitStr};

fn has_derive(input: &DeriveInput, trait_name: &str) -> bool {
    input.attrs.iter().any(|attr| {
        if attr.path().is_ident("derive") {
            let mut found = false;
            let _ = attr.parse_nested_meta(|meta| {
                if meta.path.is_ident(trait_name) || meta.path.segments.last().is_some_and(|s| s.ident == trait_name) {
                    found = true;
                }
                Ok(())
            });
            found
        } else {
            false
        }
    })
}

/// Options parsed from `#[parley_message(...)]`.
#[derive(Default)]
struct MessageConfig {
    /// Wire type tag; defaults to the struct name.
    tag: Option<LitStr>,
    /// Field holding the `FaultSpecification`, if the message is fault-injected.
    fault: Option<Ident>,
}

impl MessageConfig {
    fn parse(attr: TokenStream) -> syn::Result<Self> {
        let mut config = Self::default();
        if attr.is_empty() {
            return Ok(config);
        }
        let parser = syn::meta::parser(|meta| {
            if meta.path.is_ident("tag") {
                config.tag = Some(meta.value()?.parse()?);
                Ok(())
            } else if meta.path.is_ident("fault") {
                config.fault = Some(meta.value()?.parse()?);
                Ok(())
            } else {
                Err(meta.error("unsupported parley_message option; expected `tag` or `fault`"))
            }
        });
        syn::parse::Parser::parse(parser, attr)?;
        Ok(config)
    }
}

/// Declares a typed Parley message.
///
/// Expands to:
/// - `#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]` for any of
///   those traits not already derived
/// - an implementation of `parley_reactive::traits::ParleyMessage` whose
///   `TYPE_TAG` is the `tag` option (or the struct name)
/// - when `fault = field` is given, a `fault()` accessor returning that field
///
/// `serde` must be in scope at the use site.
#[proc_macro_attribute]
pub fn parley_message(attr: TokenStream, item: TokenStream) -> TokenStream {
    let config = match MessageConfig::parse(attr) {
        Ok(config) => config,
        Err(err) => return err.to_compile_error().into(),
    };

    let input = parse_macro_input!(item as DeriveInput);

    let name = &input.ident;
    let generics = &input.generics;
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let derives = {
        let mut traits = Vec::new();
        if !has_derive(&input, "Clone") {
            traits.push(quote!(Clone));
        }
        if !has_derive(&input, "Debug") {
            traits.push(quote!(Debug));
        }
        if !has_derive(&input, "Serialize") {
            traits.push(quote!(serde::Serialize));
        }
        if !has_derive(&input, "Deserialize") {
            traits.push(quote!(serde::Deserialize));
        }
        if traits.is_empty() {
            quote!()
        } else {
            quote!(#[derive(#(#traits),*)])
        }
    };

    let tag = config
        .tag
        .unwrap_or_else(|| LitStr::new(&name.to_string(), name.span()));

    let fault_fn = config.fault.map(|field| {
        quote! {
            fn fault(&self) -> ::core::option::Option<&::parley_reactive::message::FaultSpecification> {
                ::core::option::Option::Some(&self.#field)
            }
        }
    });

    let expanded = quote! {
        #derives
        #input

        impl #impl_generics ::parley_reactive::traits::ParleyMessage for #name #ty_generics #where_clause {
            const TYPE_TAG: &'static str = #tag;
            #fault_fn
        }
    };

    TokenStream::from(expanded)
}

/// Entry point macro for Parley applications.
///
/// ```ignore
/// #[parley_main]
/// async fn main() -> anyhow::Result<()> {
///     let runtime = ParleyApp::launch_async(transport).await;
///     // ...
///     runtime.shutdown_all().await
/// }
/// ```
///
/// `flavor = "current_thread"` and `worker_threads = N` adjust the runtime.
#[proc_macro_attribute]
pub fn parley_main(attr: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemFn);

    let attrs = &input.attrs;
    let vis = &input.vis;
    let sig = &input.sig;
    let body = &input.block;

    if sig.asyncness.is_none() {
        return syn::Error::new_spanned(
            sig.fn_token,
            "the async keyword is missing from the function declaration",
        )
        .to_compile_error()
        .into();
    }

    if sig.ident != "main" {
        return syn::Error::new_spanned(
            &sig.ident,
            "parley_main can only be applied to the main function",
        )
        .to_compile_error()
        .into();
    }

    let attr_string = attr.to_string();
    let use_current_thread = attr_string.contains("current_thread");

    let worker_threads: Option<usize> = attr_string
        .split(',')
        .find(|s| s.contains("worker_threads"))
        .and_then(|s| s.split('=').nth(1).and_then(|v| v.trim().parse().ok()));

    let runtime_builder = if use_current_thread {
        quote! {
            ::parley_reactive::prelude::tokio::runtime::Builder::new_current_thread()
        }
    } else if let Some(threads) = worker_threads {
        quote! {
            ::parley_reactive::prelude::tokio::runtime::Builder::new_multi_thread()
                .worker_threads(#threads)
        }
    } else {
        quote! {
            ::parley_reactive::prelude::tokio::runtime::Builder::new_multi_thread()
        }
    };

    let fn_name = &sig.ident;
    let fn_inputs = &sig.inputs;
    let fn_output = &sig.output;

    let expanded = quote! {
        #(#attrs)*
        #vis fn #fn_name(#fn_inputs) #fn_output {
            #runtime_builder
                .enable_all()
                .build()
                .expect("Failed to build Parley runtime")
                .block_on(async #body)
        }
    };

    TokenStream::from(expanded)
}
