//! Catalog of generated proxy types, keyed by the subscriber type they wrap.

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::{Arc, OnceLock};

use dashmap::DashMap;
use tether_events::Subscriber;
use tracing::{trace, warn};

use crate::proxy::WeakProxy;

/// Builds a proxy from a type-erased `&Arc<Target>`.
type BuildFn = fn(&dyn Any) -> Option<Arc<dyn Subscriber>>;

/// How to build the proxy for one subscriber type.
#[derive(Debug, Clone, Copy)]
pub struct ProxyEntry {
    subscriber_type: TypeId,
    subscriber_name: &'static str,
    proxy_name: &'static str,
    build: BuildFn,
}

impl ProxyEntry {
    /// Entry for the proxy type `P`.
    #[must_use]
    pub fn of<P: WeakProxy>() -> Self {
        Self {
            subscriber_type: TypeId::of::<P::Target>(),
            subscriber_name: std::any::type_name::<P::Target>(),
            proxy_name: P::NAME,
            build: build_proxy::<P>,
        }
    }

    /// `TypeId` of the wrapped subscriber type.
    #[must_use]
    pub const fn subscriber_type(&self) -> TypeId {
        self.subscriber_type
    }

    /// Type name of the wrapped subscriber type.
    #[must_use]
    pub const fn subscriber_name(&self) -> &'static str {
        self.subscriber_name
    }

    /// Name of the proxy type.
    #[must_use]
    pub const fn proxy_name(&self) -> &'static str {
        self.proxy_name
    }

    /// Build a proxy for `target`, which must be an `&Arc<Target>`.
    ///
    /// Returns `None` when `target` has another type.
    #[must_use]
    pub fn instantiate(&self, target: &dyn Any) -> Option<Arc<dyn Subscriber>> {
        (self.build)(target)
    }
}

fn build_proxy<P: WeakProxy>(target: &dyn Any) -> Option<Arc<dyn Subscriber>> {
    let target = target.downcast_ref::<Arc<P::Target>>()?;
    Some(Arc::new(P::wrap(target)))
}

/// Registry of proxy types available at run time.
///
/// Every `#[weak_subscriber]` impl installs its proxy in
/// [`ProxyCatalog::global`] before `main` runs. Tests and embedders can
/// build a private catalog and hand it to
/// [`WeakRegistry::with_catalog`](crate::WeakRegistry::with_catalog).
#[derive(Default)]
pub struct ProxyCatalog {
    by_type: DashMap<TypeId, ProxyEntry>,
    by_name: DashMap<&'static str, TypeId>,
}

static GLOBAL: OnceLock<ProxyCatalog> = OnceLock::new();

impl ProxyCatalog {
    /// Create an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide catalog filled by generated proxies.
    pub fn global() -> &'static Self {
        GLOBAL.get_or_init(Self::new)
    }

    /// Install `entry`, returning the entry it replaced for the same
    /// subscriber type.
    pub fn install(&self, entry: ProxyEntry) -> Option<ProxyEntry> {
        self.by_name.insert(entry.proxy_name, entry.subscriber_type);
        let previous = self.by_type.insert(entry.subscriber_type, entry);

        match previous {
            Some(old) if old.proxy_name != entry.proxy_name => {
                warn!(
                    subscriber = entry.subscriber_name,
                    old_proxy = old.proxy_name,
                    new_proxy = entry.proxy_name,
                    "Proxy replaced for subscriber type"
                );
                self.by_name
                    .remove_if(old.proxy_name, |_, ty| *ty == old.subscriber_type);
            },
            Some(_) => {},
            None => trace!(
                subscriber = entry.subscriber_name,
                proxy = entry.proxy_name,
                "Proxy installed"
            ),
        }
        previous
    }

    /// Entry for the subscriber type with `TypeId` `ty`.
    #[must_use]
    pub fn get(&self, ty: TypeId) -> Option<ProxyEntry> {
        self.by_type.get(&ty).map(|entry| *entry)
    }

    /// Entry for subscriber type `T`.
    #[must_use]
    pub fn get_for<T: Any>(&self) -> Option<ProxyEntry> {
        self.get(TypeId::of::<T>())
    }

    /// Entry whose proxy type is called `name`.
    ///
    /// Proxy names are only unique within a module; when two installed
    /// proxies share a name, the later one wins.
    #[must_use]
    pub fn by_proxy_name(&self, name: &str) -> Option<ProxyEntry> {
        let ty = *self.by_name.get(name)?;
        self.get(ty)
    }

    /// Number of installed proxies.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_type.len()
    }

    /// Whether no proxy is installed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_type.is_empty()
    }
}

impl fmt::Debug for ProxyCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&'static str> = self.by_type.iter().map(|e| e.proxy_name).collect();
        names.sort_unstable();
        f.debug_struct("ProxyCatalog")
            .field("proxies", &names)
            .finish()
    }
}
