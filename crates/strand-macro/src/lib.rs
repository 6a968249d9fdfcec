extern crate proc_macro;

use proc_macro::TokenStream;
use quote::{format_ident, quote};
use syn::{parse_macro_input, ItemFn, LitInt};

/// Wrap an `async fn main` so it runs on the thread's event loop.
#[proc_macro_attribute]
pub fn main(_attr: TokenStream, item: TokenStream) -> TokenStream {
    format!(
        "fn main() -> impl ::std::process::Termination {{ {item} strand::block_on(main()) }}"
    )
    .parse()
    .unwrap()
}

/// Run a test body N times in a row. Useful for tests whose failures
/// depend on kernel scheduling.
#[proc_macro_attribute]
pub fn test_repeat(attr: TokenStream, item: TokenStream) -> TokenStream {
    let count = parse_macro_input!(attr as LitInt)
        .base10_parse::<usize>()
        .expect("expected a repeat count");

    let mut inner = parse_macro_input!(item as ItemFn);
    let name = inner.sig.ident.clone();
    inner.sig.ident = format_ident!("__{}_once", name);
    let inner_name = inner.sig.ident.clone();
    let attrs = std::mem::take(&mut inner.attrs);

    quote! {
        #(#attrs)*
        fn #name() {
            #inner

            for _ in 0..#count {
                #inner_name();
            }
        }
    }
    .into()
}
