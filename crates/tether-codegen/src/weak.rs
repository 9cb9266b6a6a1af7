//! Expansion of the `#[weak_subscriber]` attribute.

use proc_macro2::{Span, TokenStream};
use quote::{quote, quote_spanned};
use syn::ItemImpl;

use crate::emit::{EmitOptions, parse_runtime_arg};
use crate::generator::Generator;
use crate::scan::{scan_impl, strip_markers, type_string};
use crate::validate::Diagnostic;

/// Expand `#[weak_subscriber]` on `item`.
///
/// Emits the `impl` block with its markers removed, followed by the proxy
/// type when the declaration is valid. Errors become `compile_error!`
/// invocations and warnings become deprecation warnings, each pointing at
/// the offending method.
#[must_use]
pub fn expand_weak_subscriber(args: TokenStream, item: TokenStream) -> TokenStream {
    let mut item: ItemImpl = match syn::parse2(item) {
        Ok(item) => item,
        Err(e) => return e.to_compile_error(),
    };

    let scanned = parse_runtime_arg(args).and_then(|runtime| {
        let scanned = scan_impl(&item)?;
        Ok((runtime, scanned))
    });
    let (runtime, scanned) = match scanned {
        Ok(ok) => ok,
        Err(e) => {
            strip_markers(&mut item);
            let errors = e.to_compile_error();
            return quote! {
                #item
                #errors
            };
        }
    };

    let options = EmitOptions::module().with_runtime_path(type_string(&runtime));
    let report = Generator::new(options).generate_class(&scanned.decl);
    strip_markers(&mut item);

    let proxy = report.proxy.map(|p| p.tokens);
    let diagnostics = report
        .diagnostics
        .iter()
        .map(|d| diagnostic_tokens(d, scanned.span_of(d.method.as_deref())));

    quote! {
        #item
        #proxy
        #(#diagnostics)*
    }
}

fn diagnostic_tokens(diagnostic: &Diagnostic, span: Span) -> TokenStream {
    if diagnostic.is_error() {
        return syn::Error::new(span, diagnostic.message()).to_compile_error();
    }

    let note = diagnostic.message();
    quote_spanned! {span=>
        const _: () = {
            #[deprecated(note = #note)]
            #[allow(non_upper_case_globals)]
            const concurrency_marker_misuse: () = ();
            concurrency_marker_misuse
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expand(item: TokenStream) -> String {
        expand_weak_subscriber(TokenStream::new(), item).to_string()
    }

    #[test]
    fn test_expands_br_one() {
        let out = expand(quote! {
            impl BrOne {
                #[weak_subscribe]
                fn m_one1(&self, ev: &i64) {}

                #[weak_subscribe]
                #[weak_allow_concurrent_events]
                fn m_one2(&self, ev: &String) {}
            }
        });

        assert!(out.contains("struct WeakProxy_BrOne"));
        assert!(out.contains("impl :: tether :: WeakProxy for WeakProxy_BrOne"));
        assert!(!out.contains("weak_subscribe"));
        assert!(!out.contains("compile_error"));
        assert!(out.contains(":: tether :: __private :: WeakSubscriberOnly for BrOne"));
        assert!(syn::parse_str::<syn::File>(&out).is_ok());
    }

    #[test]
    fn test_value_returning_method_is_an_error() {
        let out = expand(quote! {
            impl BrOne {
                #[weak_subscribe]
                fn m_one1(&self, ev: &i64) -> Result<(), String> {
                    Ok(())
                }
            }
        });

        assert!(out.contains("compile_error"));
        assert!(out.contains("must return `()`"));
        assert!(!out.contains("WeakProxy_BrOne"));
    }

    #[test]
    fn test_mixed_markers_emit_error_and_no_proxy() {
        let out = expand(quote! {
            impl BrOne {
                #[weak_subscribe]
                fn m_one1(&self, ev: &i64) {}

                #[subscribe]
                fn m_one2(&self, ev: &String) {}
            }
        });

        assert!(out.contains("compile_error"));
        assert!(out.contains("cannot be mixed"));
        assert!(!out.contains("WeakProxy_BrOne"));
        // The block itself is still emitted, without markers.
        assert!(out.contains("impl BrOne"));
        assert!(!out.contains("# [subscribe]"));
    }

    #[test]
    fn test_concurrency_misuse_is_a_warning() {
        let out = expand(quote! {
            impl BrOne {
                #[weak_subscribe]
                fn m_one1(&self, ev: &i64) {}

                #[weak_allow_concurrent_events]
                fn m_one2(&self, ev: &String) {}
            }
        });

        assert!(!out.contains("compile_error"));
        assert!(out.contains("deprecated"));
        assert!(out.contains("WeakProxy_BrOne"));
        assert!(!out.contains("fn m_one2 (& self , event"));
    }

    #[test]
    fn test_scan_errors_keep_item() {
        let out = expand(quote! {
            impl<T> Holder<T> {
                #[weak_subscribe]
                fn on(&self, e: &u8) {}
            }
        });
        assert!(out.contains("compile_error"));
        assert!(out.contains("impl < T > Holder < T >"));
    }
}
