//! Derive macro for declaring static SPARQL endpoint profiles.
//!
//! This crate provides `#[derive(EndpointProfile)]`, which turns a unit
//! struct annotated with `#[endpoint(...)]` into a constructor for an
//! [`EndpointDescriptor`](../sparql_gateway/config/struct.EndpointDescriptor.html).
//! It exists so callers with a fixed roster of known endpoints (a
//! Wikidata mirror, an internal triple store, ...) can declare them as
//! types instead of hand-assembling builders at every call site.
//!
//! # Example
//!
//! ```ignore
//! use sparql_gateway::EndpointProfile;
//!
//! #[derive(EndpointProfile)]
//! #[endpoint(
//!     url = "https://query.wikidata.org/sparql",
//!     name = "wikidata",
//!     timeout_secs = 30,
//!     rate_limit = "5/10",
//! )]
//! struct Wikidata;
//!
//! let descriptor = Wikidata::descriptor();
//! assert_eq!(descriptor.url(), "https://query.wikidata.org/sparql");
//! ```

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{parse_macro_input, DeriveInput, Error, LitStr};

#[proc_macro_derive(EndpointProfile, attributes(endpoint))]
pub fn derive_endpoint_profile(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match derive_impl(input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

#[derive(Default)]
struct EndpointAttrs {
    url: Option<String>,
    name: Option<String>,
    timeout_secs: Option<u64>,
    rate_limit: Option<String>,
    default_graph: Option<String>,
}

fn derive_impl(input: DeriveInput) -> Result<TokenStream2, Error> {
    let ident = &input.ident;
    let attrs = parse_endpoint_attrs(&input)?;

    let url = attrs.url.ok_or_else(|| {
        Error::new(
            ident.span(),
            "missing #[endpoint(url = \"...\")] attribute",
        )
    })?;

    let name_tokens = match attrs.name {
        Some(name) => quote! { .with_name(#name) },
        None => quote! {},
    };
    let timeout_tokens = match attrs.timeout_secs {
        Some(secs) => quote! { .with_timeout_secs(#secs) },
        None => quote! {},
    };
    let graph_tokens = match attrs.default_graph {
        Some(graph) => quote! { .with_default_graph(#graph) },
        None => quote! {},
    };
    let rate_limit_tokens = match attrs.rate_limit {
        Some(spec) => {
            let (rate, burst) = parse_rate_limit(&spec).map_err(|msg| Error::new(ident.span(), msg))?;
            quote! { .with_rate_limit(#rate, #burst) }
        }
        None => quote! {},
    };

    Ok(quote! {
        impl #ident {
            /// Build the static [`EndpointDescriptor`] declared by this type's
            /// `#[endpoint(...)]` attribute.
            pub fn descriptor() -> ::sparql_gateway::config::EndpointDescriptor {
                ::sparql_gateway::config::EndpointDescriptor::new(#url)
                    #name_tokens
                    #timeout_tokens
                    #graph_tokens
                    #rate_limit_tokens
            }
        }
    })
}

fn parse_endpoint_attrs(input: &DeriveInput) -> Result<EndpointAttrs, Error> {
    let mut result = EndpointAttrs::default();

    for attr in &input.attrs {
        if !attr.path().is_ident("endpoint") {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("url") {
                result.url = Some(meta.value()?.parse::<LitStr>()?.value());
            } else if meta.path.is_ident("name") {
                result.name = Some(meta.value()?.parse::<LitStr>()?.value());
            } else if meta.path.is_ident("default_graph") {
                result.default_graph = Some(meta.value()?.parse::<LitStr>()?.value());
            } else if meta.path.is_ident("rate_limit") {
                result.rate_limit = Some(meta.value()?.parse::<LitStr>()?.value());
            } else if meta.path.is_ident("timeout_secs") {
                let value: syn::LitInt = meta.value()?.parse()?;
                result.timeout_secs = Some(value.base10_parse()?);
            } else {
                return Err(meta.error("unknown endpoint attribute"));
            }
            Ok(())
        })?;
    }

    Ok(result)
}

/// Parse a `"rate/burst"` shorthand (e.g. `"5/10"`) into `(rate, burst)`.
fn parse_rate_limit(spec: &str) -> Result<(f64, u32), String> {
    let (rate_str, burst_str) = spec
        .split_once('/')
        .ok_or_else(|| format!("rate_limit must be \"rate/burst\", got {:?}", spec))?;
    let rate: f64 = rate_str
        .trim()
        .parse()
        .map_err(|_| format!("invalid rate in rate_limit {:?}", spec))?;
    let burst: u32 = burst_str
        .trim()
        .parse()
        .map_err(|_| format!("invalid burst in rate_limit {:?}", spec))?;
    Ok((rate, burst))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rate_limit_shorthand() {
        assert_eq!(parse_rate_limit("5/10").unwrap(), (5.0, 10));
        assert_eq!(parse_rate_limit("2.5/3").unwrap(), (2.5, 3));
        assert!(parse_rate_limit("bad").is_err());
        assert!(parse_rate_limit("5/bad").is_err());
    }
}
