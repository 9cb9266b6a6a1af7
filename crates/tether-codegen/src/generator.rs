//! Proxy generation over batches of declarations.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::fs;
use std::path::{Path, PathBuf};

use proc_macro2::TokenStream;
use tracing::{debug, warn};

use crate::emit::{EmitOptions, emit_proxy};
use crate::error::{GenerateError, GenerateResult};
use crate::model::{ProxyTypeDescriptor, SubscriberClassDecl};
use crate::validate::{Diagnostic, InvalidDeclaration, validate_class};

/// One generated proxy.
#[derive(Debug, Clone)]
pub struct GeneratedProxy {
    /// What was generated.
    pub descriptor: ProxyTypeDescriptor,
    /// Emitted tokens.
    pub tokens: TokenStream,
    /// Rendered source file contents.
    pub source: String,
}

impl GeneratedProxy {
    /// File path of the proxy relative to an output directory:
    /// one directory per package segment, then `<Name>.rs`.
    #[must_use]
    pub fn relative_path(&self) -> PathBuf {
        let mut path: PathBuf = self
            .descriptor
            .class
            .package
            .split("::")
            .flat_map(|seg| seg.split('.'))
            .filter(|seg| !matches!(*seg, "" | "crate" | "self" | "super"))
            .collect();
        path.push(format!("{}.rs", self.descriptor.name));
        path
    }
}

/// Outcome for a single declaration.
#[derive(Debug, Clone, Default)]
pub struct ClassReport {
    /// The proxy, unless an error occurred or no method qualified.
    pub proxy: Option<GeneratedProxy>,
    /// Everything reported for the declaration.
    pub diagnostics: Vec<Diagnostic>,
}

/// Outcome for a batch of declarations.
#[derive(Debug, Clone, Default)]
pub struct GenerationReport {
    /// Generated proxies keyed by qualified proxy name.
    pub proxies: BTreeMap<String, GeneratedProxy>,
    /// Diagnostics in qualified-name order of their types.
    pub diagnostics: Vec<Diagnostic>,
}

impl GenerationReport {
    /// `true` when no error was reported.
    #[must_use]
    pub fn is_success(&self) -> bool {
        !self.diagnostics.iter().any(Diagnostic::is_error)
    }

    /// Error diagnostics.
    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.is_error())
    }

    /// Warning diagnostics.
    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| !d.is_error())
    }

    /// Write every proxy below `out_dir`, creating directories as needed.
    ///
    /// Returns the written paths in proxy-name order.
    ///
    /// # Errors
    ///
    /// Returns [`GenerateError::Io`] if a directory or file cannot be
    /// written.
    pub fn write_to(&self, out_dir: &Path) -> GenerateResult<Vec<PathBuf>> {
        let mut written = Vec::with_capacity(self.proxies.len());
        for proxy in self.proxies.values() {
            let path = out_dir.join(proxy.relative_path());
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).map_err(|e| GenerateError::io(parent, e))?;
            }
            fs::write(&path, &proxy.source).map_err(|e| GenerateError::io(&path, e))?;
            debug!(path = %path.display(), proxy = %proxy.descriptor.name, "Wrote weak proxy");
            written.push(path);
        }
        Ok(written)
    }
}

/// Pure generator from declarations to proxies.
#[derive(Debug, Clone, Default)]
pub struct Generator {
    options: EmitOptions,
}

impl Generator {
    /// Generator emitting with `options`.
    #[must_use]
    pub fn new(options: EmitOptions) -> Self {
        Self { options }
    }

    /// Emit options in use.
    #[must_use]
    pub fn options(&self) -> &EmitOptions {
        &self.options
    }

    /// Generate proxies for a batch.
    ///
    /// The result does not depend on input order. A type declared more
    /// than once gets no proxy.
    pub fn generate<I>(&self, decls: I) -> GenerationReport
    where
        I: IntoIterator<Item = SubscriberClassDecl>,
    {
        let mut decls: Vec<SubscriberClassDecl> = decls.into_iter().collect();
        decls.sort_by(|a, b| a.qualified_name.cmp(&b.qualified_name));

        let mut report = GenerationReport::default();
        for group in decls.chunk_by(|a, b| a.qualified_name == b.qualified_name) {
            let [decl] = group else {
                if let Some(first) = group.first() {
                    report.diagnostics.push(Diagnostic::error(
                        &first.qualified_name,
                        None,
                        InvalidDeclaration::DuplicateClass,
                    ));
                }
                continue;
            };

            let class = self.generate_class(decl);
            report.diagnostics.extend(class.diagnostics);
            let Some(proxy) = class.proxy else {
                continue;
            };

            match report.proxies.entry(proxy.descriptor.qualified_name()) {
                Entry::Vacant(slot) => {
                    slot.insert(proxy);
                },
                Entry::Occupied(taken) => report.diagnostics.push(Diagnostic::error(
                    &decl.qualified_name,
                    None,
                    InvalidDeclaration::DuplicateProxy(taken.key().clone()),
                )),
            }
        }

        debug!(
            proxies = report.proxies.len(),
            diagnostics = report.diagnostics.len(),
            "Generation finished"
        );
        report
    }

    /// Decode a JSON array of declarations and generate proxies for it.
    ///
    /// # Errors
    ///
    /// Returns [`GenerateError::Decode`] if `json` is not a valid
    /// declaration array.
    pub fn generate_json(&self, json: &str) -> GenerateResult<GenerationReport> {
        let decls: Vec<SubscriberClassDecl> = serde_json::from_str(json)?;
        Ok(self.generate(decls))
    }

    /// Generate the proxy for one declaration.
    #[must_use]
    pub fn generate_class(&self, decl: &SubscriberClassDecl) -> ClassReport {
        let validated = validate_class(decl, self.options.placement);
        let has_errors = validated.has_errors();
        let mut report = ClassReport {
            proxy: None,
            diagnostics: validated.diagnostics,
        };

        let Some(name) = validated.proxy_name.filter(|_| !has_errors) else {
            return report;
        };
        if validated.methods.is_empty() {
            debug!(class = %decl.qualified_name, "No subscribe methods, no proxy generated");
            return report;
        }

        let descriptor = ProxyTypeDescriptor {
            name,
            class: decl.clone(),
            methods: validated.methods,
            placement: self.options.placement,
        };

        match emit_proxy(&descriptor, &self.options) {
            Ok(tokens) => {
                debug!(
                    class = %decl.qualified_name,
                    proxy = %descriptor.name,
                    methods = descriptor.methods.len(),
                    "Generated weak proxy"
                );
                let source = render_source(&descriptor, &tokens);
                report.proxy = Some(GeneratedProxy {
                    descriptor,
                    tokens,
                    source,
                });
            },
            Err(diagnostic) => report.diagnostics.push(diagnostic),
        }
        report
    }
}

fn render_source(descriptor: &ProxyTypeDescriptor, tokens: &TokenStream) -> String {
    let class = descriptor.class.qualified_name.as_str();
    let body = match syn::parse2::<syn::File>(tokens.clone()) {
        Ok(file) => prettyplease::unparse(&file),
        Err(e) => {
            warn!(class, error = %e, "Emitted proxy is not a valid file, writing raw tokens");
            format!("{tokens}\n")
        },
    };
    format!("// @generated by tether-gen for `{class}`. Do not edit.\n\n{body}")
}
