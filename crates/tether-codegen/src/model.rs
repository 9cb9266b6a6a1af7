//! Subscriber declaration model.
//!
//! These types are what a scanner hands to the generator. They are plain
//! data and serialize to JSON so an external scanner can drive the
//! `tether-gen` tool.

use serde::{Deserialize, Serialize};

/// Whether a parameter type is something the dispatch engine can route on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKind {
    /// A shared reference to a named, sized event type (`&E`).
    Object,
    /// Anything else: by-value, `&mut`, `&str`, slices, trait objects,
    /// tuples, arrays, pointers, `impl Trait`.
    Primitive,
}

/// One method parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Param {
    /// For [`ParamKind::Object`], the event type `E` without the reference.
    /// Otherwise the parameter type as written.
    pub ty: String,
    /// Kind of the parameter.
    pub kind: ParamKind,
}

impl Param {
    /// Object parameter accepting events of type `ty`.
    pub fn object(ty: impl Into<String>) -> Self {
        Self {
            ty: ty.into(),
            kind: ParamKind::Object,
        }
    }

    /// Parameter of a type the engine cannot route on.
    pub fn primitive(ty: impl Into<String>) -> Self {
        Self {
            ty: ty.into(),
            kind: ParamKind::Primitive,
        }
    }
}

/// How a method takes `self`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Receiver {
    /// `&self`
    #[default]
    Shared,
    /// `self: Arc<Self>`
    Arc,
    /// `&mut self`
    Exclusive,
    /// `self` or any other owned receiver
    Owned,
    /// Associated function without a receiver.
    None,
}

/// Visibility of a method.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    /// `pub`
    Public,
    /// `pub(crate)`
    Crate,
    /// `pub(super)`, `pub(in path)` or `pub(self)`
    Restricted,
    /// No visibility qualifier.
    #[default]
    Private,
}

/// Subscriber markers present on a method.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
#[allow(clippy::struct_excessive_bools)]
pub struct Markers {
    /// `#[weak_subscribe]`
    pub weak_subscribe: bool,
    /// `#[weak_allow_concurrent_events]`
    pub weak_concurrent: bool,
    /// Native `#[subscribe]`
    pub native_subscribe: bool,
    /// Native `#[allow_concurrent_events]`
    pub native_concurrent: bool,
}

impl Markers {
    /// Weak subscribe marker only.
    #[must_use]
    pub const fn weak() -> Self {
        Self {
            weak_subscribe: true,
            weak_concurrent: false,
            native_subscribe: false,
            native_concurrent: false,
        }
    }

    /// Weak subscribe marker plus the concurrency marker.
    #[must_use]
    pub const fn weak_concurrent() -> Self {
        Self {
            weak_concurrent: true,
            ..Self::weak()
        }
    }

    /// Whether any weak marker is present.
    #[must_use]
    pub const fn has_weak(&self) -> bool {
        self.weak_subscribe || self.weak_concurrent
    }

    /// Whether any native engine marker is present.
    #[must_use]
    pub const fn has_native(&self) -> bool {
        self.native_subscribe || self.native_concurrent
    }
}

/// A method of a subscriber type carrying at least one subscriber marker.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriberMethod {
    /// Qualified name of the type the method is declared on.
    pub owner: String,
    /// Method name.
    pub name: String,
    /// Parameters, excluding the receiver.
    pub params: Vec<Param>,
    /// Receiver form.
    #[serde(default)]
    pub receiver: Receiver,
    /// Declared visibility.
    #[serde(default)]
    pub visibility: Visibility,
    /// Subscriber markers.
    #[serde(default)]
    pub markers: Markers,
    /// `async fn`
    #[serde(default)]
    pub is_async: bool,
    /// Method has its own generic parameters.
    #[serde(default)]
    pub is_generic: bool,
    /// Method declares a return type other than `()`.
    #[serde(default)]
    pub returns_value: bool,
}

impl SubscriberMethod {
    /// A `&self` method taking one `&E` parameter, with the given markers.
    pub fn new(
        owner: impl Into<String>,
        name: impl Into<String>,
        event_type: impl Into<String>,
        markers: Markers,
    ) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
            params: vec![Param::object(event_type)],
            receiver: Receiver::Shared,
            visibility: Visibility::Private,
            markers,
            is_async: false,
            is_generic: false,
            returns_value: false,
        }
    }

    /// Event type of the single parameter, if there is exactly one.
    #[must_use]
    pub fn event_type(&self) -> Option<&str> {
        match self.params.as_slice() {
            [param] => Some(&param.ty),
            _ => None,
        }
    }

    /// Whether deliveries to this method may run concurrently.
    #[must_use]
    pub const fn is_concurrent(&self) -> bool {
        self.markers.weak_concurrent
    }
}

/// A subscriber type and its marked methods, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriberClassDecl {
    /// Fully-qualified type path, e.g. `crate::audio::Mixer`.
    pub qualified_name: String,
    /// Module path containing the type, e.g. `crate::audio`. Empty when
    /// the type is named relative to the current module.
    #[serde(default)]
    pub package: String,
    /// Marked methods.
    pub methods: Vec<SubscriberMethod>,
}

impl SubscriberClassDecl {
    /// Declaration with no methods.
    pub fn new(qualified_name: impl Into<String>, package: impl Into<String>) -> Self {
        Self {
            qualified_name: qualified_name.into(),
            package: package.into(),
            methods: Vec::new(),
        }
    }

    /// Append a method owned by this type.
    #[must_use]
    pub fn with_method(
        mut self,
        name: impl Into<String>,
        event_type: impl Into<String>,
        markers: Markers,
    ) -> Self {
        let method = SubscriberMethod::new(self.qualified_name.clone(), name, event_type, markers);
        self.methods.push(method);
        self
    }
}

/// Where generated proxies are placed relative to the subscriber type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Placement {
    /// In the same module as the `impl` block (attribute macro).
    #[default]
    Module,
    /// Anywhere in the same crate (`tether-gen` output included by the
    /// build). Only `pub` and `pub(crate)` methods are reachable.
    Crate,
}

impl Placement {
    /// Whether a method with `visibility` can be called from a proxy placed
    /// here.
    #[must_use]
    pub const fn reaches(self, visibility: Visibility) -> bool {
        match self {
            Self::Module => true,
            Self::Crate => matches!(visibility, Visibility::Public | Visibility::Crate),
        }
    }
}

/// Everything needed to emit one proxy type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyTypeDescriptor {
    /// Proxy type name, e.g. `WeakProxy_Mixer`.
    pub name: String,
    /// The subscriber type the proxy forwards to.
    pub class: SubscriberClassDecl,
    /// Valid subscribe methods, in declaration order.
    pub methods: Vec<SubscriberMethod>,
    /// Where the proxy will live.
    pub placement: Placement,
}

impl ProxyTypeDescriptor {
    /// Path of the proxy within its package, e.g. `crate::audio::WeakProxy_Mixer`.
    #[must_use]
    pub fn qualified_name(&self) -> String {
        if self.class.package.is_empty() {
            self.name.clone()
        } else {
            format!("{}::{}", self.class.package, self.name)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decl_json_defaults() {
        let json = r#"{
            "qualified_name": "crate::audio::Mixer",
            "package": "crate::audio",
            "methods": [{
                "owner": "crate::audio::Mixer",
                "name": "on_volume",
                "params": [{ "ty": "Volume", "kind": "object" }],
                "markers": { "weak_subscribe": true }
            }]
        }"#;

        let decl: SubscriberClassDecl = serde_json::from_str(json).unwrap();
        let method = &decl.methods[0];
        assert_eq!(method.receiver, Receiver::Shared);
        assert_eq!(method.visibility, Visibility::Private);
        assert!(method.markers.weak_subscribe);
        assert!(!method.is_concurrent());
        assert_eq!(method.event_type(), Some("Volume"));
    }

    #[test]
    fn test_event_type_requires_single_param() {
        let mut method = SubscriberMethod::new("T", "m", "E", Markers::weak());
        method.params.push(Param::object("F"));
        assert_eq!(method.event_type(), None);

        method.params.clear();
        assert_eq!(method.event_type(), None);
    }

    #[test]
    fn test_placement_reach() {
        assert!(Placement::Module.reaches(Visibility::Private));
        assert!(Placement::Crate.reaches(Visibility::Crate));
        assert!(Placement::Crate.reaches(Visibility::Public));
        assert!(!Placement::Crate.reaches(Visibility::Restricted));
        assert!(!Placement::Crate.reaches(Visibility::Private));
    }

    #[test]
    fn test_with_method_sets_owner() {
        let decl = SubscriberClassDecl::new("crate::a::B", "crate::a").with_method(
            "on_tick",
            "Tick",
            Markers::weak_concurrent(),
        );
        assert_eq!(decl.methods[0].owner, "crate::a::B");
        assert!(decl.methods[0].is_concurrent());
    }
}
