//! Per-method validation of subscriber declarations.
//!
//! Every rule is checked and every violation reported; validation never
//! stops at the first problem. Errors keep the whole type from getting a
//! proxy, warnings only drop the offending method.

use std::fmt;

use thiserror::Error;

use crate::model::{ParamKind, Placement, Receiver, SubscriberClassDecl, SubscriberMethod};
use crate::naming::{NamingError, proxy_name};

/// How serious a diagnostic is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    /// The method is skipped, generation continues.
    Warning,
    /// No proxy is produced for the type.
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Warning => f.write_str("warning"),
            Self::Error => f.write_str("error"),
        }
    }
}

/// Rules a declaration can break. Each one is fatal to its type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidDeclaration {
    /// Not exactly one parameter besides the receiver.
    #[error("method must take exactly one parameter")]
    Arity,

    /// The parameter is not a reference to a named event type.
    #[error("parameter must be an object type")]
    NotObject,

    /// The proxy would not be able to call the method.
    #[error("subscriber method must be callable from the generated proxy ({reason})")]
    NotForwardable {
        /// What prevents the call.
        reason: &'static str,
    },

    /// Weak and native subscriber markers on one type.
    #[error("weak subscriber markers cannot be mixed with native subscriber markers")]
    MixedMarkers,

    /// The method is declared on another type.
    #[error("method belongs to '{owner}'")]
    ForeignMethod {
        /// Declared owner.
        owner: String,
    },

    /// No proxy name can be derived.
    #[error(transparent)]
    Naming(#[from] NamingError),

    /// The same type appears more than once in one batch.
    #[error("type is declared more than once")]
    DuplicateClass,

    /// Two types in one package map to the same proxy name.
    #[error("proxy name '{0}' is already used by another type")]
    DuplicateProxy(String),

    /// A type name is not valid Rust syntax.
    #[error("cannot parse '{0}' as a Rust type")]
    Unparseable(String),
}

/// What a diagnostic is about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// A rule was broken; the type gets no proxy.
    Invalid(InvalidDeclaration),
    /// A concurrency marker without a subscribe marker; the method is
    /// ignored.
    ConcurrencyMarkerMisuse,
}

/// One violated rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Error or warning.
    pub severity: Severity,
    /// Qualified name of the type.
    pub class: String,
    /// Method name, when the problem is specific to one method.
    pub method: Option<String>,
    /// The rule.
    pub kind: DiagnosticKind,
}

impl Diagnostic {
    /// Error diagnostic.
    pub fn error(
        class: impl Into<String>,
        method: Option<&str>,
        reason: InvalidDeclaration,
    ) -> Self {
        Self {
            severity: Severity::Error,
            class: class.into(),
            method: method.map(str::to_string),
            kind: DiagnosticKind::Invalid(reason),
        }
    }

    /// Warning for a concurrency marker without a subscribe marker.
    pub fn concurrency_marker_misuse(class: impl Into<String>, method: &str) -> Self {
        Self {
            severity: Severity::Warning,
            class: class.into(),
            method: Some(method.to_string()),
            kind: DiagnosticKind::ConcurrencyMarkerMisuse,
        }
    }

    /// Whether this diagnostic prevents generation.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    /// Human-readable description of the rule.
    #[must_use]
    pub fn message(&self) -> String {
        match &self.kind {
            DiagnosticKind::Invalid(reason) => reason.to_string(),
            DiagnosticKind::ConcurrencyMarkerMisuse => {
                "concurrency marker without subscribe marker is ignored".to_string()
            }
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.method {
            Some(method) => write!(
                f,
                "{}: {}::{}: {}",
                self.severity,
                self.class,
                method,
                self.message()
            ),
            None => write!(f, "{}: {}: {}", self.severity, self.class, self.message()),
        }
    }
}

/// Result of validating one type.
#[derive(Debug, Clone, Default)]
pub struct ValidatedClass {
    /// Proxy name, if one could be derived.
    pub proxy_name: Option<String>,
    /// Methods that passed every rule, in declaration order.
    pub methods: Vec<SubscriberMethod>,
    /// Everything that was reported.
    pub diagnostics: Vec<Diagnostic>,
}

impl ValidatedClass {
    /// Whether any error was reported.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }
}

/// Validate one declaration for a proxy placed at `placement`.
#[must_use]
pub fn validate_class(decl: &SubscriberClassDecl, placement: Placement) -> ValidatedClass {
    let class = decl.qualified_name.as_str();
    let mut out = ValidatedClass::default();

    match proxy_name(class, &decl.package) {
        Ok(name) => out.proxy_name = Some(name),
        Err(e) => out.diagnostics.push(Diagnostic::error(class, None, e.into())),
    }

    for method in &decl.methods {
        let errors_before = out.diagnostics.len();
        let name = Some(method.name.as_str());

        if method.owner != decl.qualified_name {
            out.diagnostics.push(Diagnostic::error(
                class,
                name,
                InvalidDeclaration::ForeignMethod {
                    owner: method.owner.clone(),
                },
            ));
            continue;
        }

        if method.markers.has_native() {
            out.diagnostics.push(Diagnostic::error(
                class,
                name,
                InvalidDeclaration::MixedMarkers,
            ));
        }

        if !method.markers.weak_subscribe {
            if method.markers.weak_concurrent {
                out.diagnostics
                    .push(Diagnostic::concurrency_marker_misuse(class, &method.name));
            }
            continue;
        }

        match method.params.as_slice() {
            [param] if param.kind == ParamKind::Object => {}
            [_] => out.diagnostics.push(Diagnostic::error(
                class,
                name,
                InvalidDeclaration::NotObject,
            )),
            _ => out
                .diagnostics
                .push(Diagnostic::error(class, name, InvalidDeclaration::Arity)),
        }

        for reason in forwarding_obstacles(method, placement) {
            out.diagnostics.push(Diagnostic::error(
                class,
                name,
                InvalidDeclaration::NotForwardable { reason },
            ));
        }

        if out.diagnostics.len() == errors_before {
            out.methods.push(method.clone());
        }
    }

    out
}

fn forwarding_obstacles(method: &SubscriberMethod, placement: Placement) -> Vec<&'static str> {
    let mut obstacles = Vec::new();
    match method.receiver {
        Receiver::Shared => {}
        Receiver::Arc => obstacles.push("receiver must be `&self`, not `self: Arc<Self>`"),
        Receiver::Exclusive => obstacles.push("receiver must be `&self`, not `&mut self`"),
        Receiver::Owned => obstacles.push("receiver must be `&self`, not `self`"),
        Receiver::None => obstacles.push("method has no `self` receiver"),
    }
    if method.is_async {
        obstacles.push("method must not be `async`");
    }
    if method.is_generic {
        obstacles.push("method must not be generic");
    }
    if method.returns_value {
        obstacles.push("method must return `()`");
    }
    if !placement.reaches(method.visibility) {
        obstacles.push("method must be `pub` or `pub(crate)`");
    }
    obstacles
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Markers, Param, Visibility};

    const CLASS: &str = "crate::user::BrOne";

    fn decl() -> SubscriberClassDecl {
        SubscriberClassDecl::new(CLASS, "crate::user")
    }

    fn method(name: &str, markers: Markers) -> SubscriberMethod {
        SubscriberMethod::new(CLASS, name, "i64", markers)
    }

    fn errors(v: &ValidatedClass) -> Vec<&InvalidDeclaration> {
        v.diagnostics
            .iter()
            .filter_map(|d| match &d.kind {
                DiagnosticKind::Invalid(r) => Some(r),
                DiagnosticKind::ConcurrencyMarkerMisuse => None,
            })
            .collect()
    }

    #[test]
    fn test_valid_methods_keep_order() {
        let decl = decl()
            .with_method("m_one1", "i64", Markers::weak())
            .with_method("m_one2", "String", Markers::weak_concurrent());

        let v = validate_class(&decl, Placement::Module);
        assert!(v.diagnostics.is_empty());
        assert_eq!(v.proxy_name.as_deref(), Some("WeakProxy_BrOne"));
        let names: Vec<_> = v.methods.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, ["m_one1", "m_one2"]);
    }

    #[test]
    fn test_concurrency_without_subscribe_warns_once() {
        let decl = decl()
            .with_method("kept", "i64", Markers::weak())
            .with_method(
                "dropped",
                "i64",
                Markers {
                    weak_concurrent: true,
                    ..Markers::default()
                },
            );

        let v = validate_class(&decl, Placement::Module);
        assert!(!v.has_errors());
        assert_eq!(v.diagnostics.len(), 1);
        assert_eq!(v.diagnostics[0].kind, DiagnosticKind::ConcurrencyMarkerMisuse);
        assert_eq!(v.diagnostics[0].method.as_deref(), Some("dropped"));
        assert_eq!(v.methods.len(), 1);
        assert_eq!(v.methods[0].name, "kept");
    }

    #[test]
    fn test_arity() {
        let mut none = method("none", Markers::weak());
        none.params.clear();
        let mut two = method("two", Markers::weak());
        two.params.push(Param::object("u8"));

        let mut decl = decl();
        decl.methods = vec![none, two];

        let v = validate_class(&decl, Placement::Module);
        assert_eq!(
            errors(&v),
            [&InvalidDeclaration::Arity, &InvalidDeclaration::Arity]
        );
        assert!(v.methods.is_empty());
    }

    #[test]
    fn test_primitive_parameter() {
        let mut m = method("by_value", Markers::weak());
        m.params = vec![Param::primitive("i64")];
        let mut decl = decl();
        decl.methods.push(m);

        let v = validate_class(&decl, Placement::Module);
        assert_eq!(errors(&v), [&InvalidDeclaration::NotObject]);
        assert!(v.diagnostics[0].to_string().contains("object type"));
    }

    #[test]
    fn test_every_obstacle_reported() {
        let mut m = method("m", Markers::weak());
        m.receiver = Receiver::Exclusive;
        m.is_async = true;
        m.is_generic = true;
        m.returns_value = true;
        let mut decl = decl();
        decl.methods.push(m);

        let v = validate_class(&decl, Placement::Crate);
        assert_eq!(v.diagnostics.len(), 5);
        assert!(v.diagnostics.iter().all(|d| {
            matches!(
                d.kind,
                DiagnosticKind::Invalid(InvalidDeclaration::NotForwardable { .. })
            )
        }));
        assert!(
            v.diagnostics[0]
                .to_string()
                .contains("callable from the generated proxy")
        );
    }

    #[test]
    fn test_return_value_is_rejected() {
        let mut m = method("verdict", Markers::weak());
        m.returns_value = true;
        let mut decl = decl();
        decl.methods.push(m);

        let v = validate_class(&decl, Placement::Module);
        assert!(v.has_errors());
        assert!(v.methods.is_empty());
        assert!(v.diagnostics[0].to_string().contains("must return `()`"));
    }

    #[test]
    fn test_visibility_depends_on_placement() {
        let mut private = method("private", Markers::weak());
        private.visibility = Visibility::Private;
        let mut crate_vis = method("crate_vis", Markers::weak());
        crate_vis.visibility = Visibility::Crate;
        let mut decl = decl();
        decl.methods = vec![private, crate_vis];

        assert!(!validate_class(&decl, Placement::Module).has_errors());

        let v = validate_class(&decl, Placement::Crate);
        assert_eq!(v.diagnostics.len(), 1);
        assert_eq!(v.diagnostics[0].method.as_deref(), Some("private"));
    }

    #[test]
    fn test_mixed_markers() {
        let mixed = Markers {
            native_subscribe: true,
            ..Markers::default()
        };
        let decl = decl()
            .with_method("weak", "i64", Markers::weak())
            .with_method("native", "String", mixed);

        let v = validate_class(&decl, Placement::Module);
        assert!(v.has_errors());
        assert_eq!(errors(&v), [&InvalidDeclaration::MixedMarkers]);
    }

    #[test]
    fn test_foreign_method() {
        let mut decl = decl();
        decl.methods
            .push(SubscriberMethod::new("crate::user::Other", "m", "i64", Markers::weak()));

        let v = validate_class(&decl, Placement::Module);
        assert!(matches!(
            errors(&v).as_slice(),
            [InvalidDeclaration::ForeignMethod { .. }]
        ));
    }

    #[test]
    fn test_bad_package_is_class_error() {
        let decl = SubscriberClassDecl::new("crate::a::B", "crate::z").with_method(
            "m",
            "i64",
            Markers::weak(),
        );

        let v = validate_class(&decl, Placement::Module);
        assert!(v.has_errors());
        assert!(v.proxy_name.is_none());
        assert_eq!(v.diagnostics[0].method, None);
    }
}
