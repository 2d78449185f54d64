use proc_macro::TokenStream;
use quote::quote;
use syn::{ItemFn, parse_macro_input};

/// Marks a function as a test which runs `sniff_test::setup_test()` first,
/// installing tracing and precept exactly once per process.
#[proc_macro_attribute]
pub fn test(_args: TokenStream, input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as ItemFn);
    let ItemFn { attrs, vis, sig, block } = input;

    if let Some(asyncness) = sig.asyncness {
        return syn::Error::new_spanned(asyncness, "sniff tests must be synchronous")
            .into_compile_error()
            .into();
    }

    let statements = block.stmts;

    quote!(
        #(#attrs)*
        #[test]
        #vis #sig {
            sniff_test::setup_test();
            #(#statements)*
        }
    )
    .into()
}
