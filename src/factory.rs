//! Factory descriptors and the factory table
//!
//! A factory bundles a producer with the capability bindings it satisfies and,
//! for persistent factories, the component stack that should receive its
//! results. Producers are statically tagged as immediate or deferred at
//! registration time, so resolution never has to sniff a return value to
//! decide whether to await it.

use crate::component::{Capability, ErasedComponent, erase, unerase};
use crate::storage::ComponentStack;
use ahash::RandomState;
use dashmap::DashMap;
use std::any::TypeId;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

#[cfg(feature = "logging")]
use tracing::trace;

/// Type-erased immediate producer function
type ImmediateFn = Arc<dyn Fn() -> ErasedComponent + Send + Sync>;

/// Boxed future yielding a produced component cell
pub(crate) type ProducedFuture = Pin<Box<dyn Future<Output = ErasedComponent> + Send>>;

/// Type-erased deferred producer function
type DeferredFn = Arc<dyn Fn() -> ProducedFuture + Send + Sync>;

/// A component producer, tagged once at registration.
///
/// The tag is what lets `get_component` reject deferred factories up front
/// instead of discovering a pending value mid-resolution.
pub(crate) enum Producer {
    /// Produces the component synchronously
    Immediate(ImmediateFn),
    /// Produces a future that must be awaited for the component
    Deferred(DeferredFn),
}

impl Producer {
    /// Wrap a plain constructor returning `T`.
    pub(crate) fn immediate<T, F>(make: F) -> Self
    where
        T: Capability,
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self::Immediate(Arc::new(move || erase(Arc::new(make()))))
    }

    /// Wrap a constructor returning a future of `T`.
    pub(crate) fn deferred<T, F, Fut>(make: F) -> Self
    where
        T: Capability,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = T> + Send + 'static,
    {
        Self::Deferred(Arc::new(move || {
            let fut = make();
            Box::pin(async move { erase(Arc::new(fut.await)) })
        }))
    }

    /// Wrap an already-constructed instance.
    ///
    /// Every invocation hands back the same `Arc`, so a directly registered
    /// component keeps its identity even if its cache entry is tombstoned and
    /// re-resolved later.
    pub(crate) fn of_instance(cell: ErasedComponent) -> Self {
        Self::Immediate(Arc::new(move || cell.clone()))
    }

    /// Whether this producer must be awaited.
    #[inline]
    pub(crate) fn is_deferred(&self) -> bool {
        matches!(self, Self::Deferred(_))
    }
}

/// Projection from the produced concrete cell to the entry stored under one
/// capability key.
type ProjectFn = Arc<dyn Fn(&ErasedComponent) -> ErasedComponent + Send + Sync>;

/// One capability a factory satisfies: the key plus how to view the produced
/// component under that key.
pub(crate) struct Binding {
    pub(crate) key: TypeId,
    pub(crate) type_name: &'static str,
    project: ProjectFn,
}

impl Binding {
    /// The binding for the producer's own concrete type. The produced cell
    /// already holds `Arc<T>`, so the projection is a clone.
    pub(crate) fn primary<T: Capability>() -> Self {
        Self {
            key: T::key(),
            type_name: T::name(),
            project: Arc::new(ErasedComponent::clone),
        }
    }

    /// A declared capability binding with its coercion from the concrete
    /// component, e.g. `Arc<Gadget> -> Arc<dyn Gizmo>`.
    pub(crate) fn capability<T, K, F>(coerce: F) -> Self
    where
        T: Capability,
        K: ?Sized + Capability,
        F: Fn(Arc<T>) -> Arc<K> + Send + Sync + 'static,
    {
        Self {
            key: K::key(),
            type_name: K::name(),
            project: Arc::new(move |cell| erase(coerce(unerase::<T>(cell)))),
        }
    }

    /// View a produced cell through this binding.
    #[inline]
    pub(crate) fn view(&self, produced: &ErasedComponent) -> ErasedComponent {
        (self.project)(produced)
    }
}

impl std::fmt::Debug for Binding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Binding")
            .field("type_name", &self.type_name)
            .finish()
    }
}

/// A registered factory: producer, the capabilities it resolves, and where
/// its results are cached.
pub(crate) struct Factory {
    producer: Producer,
    /// Applied bindings; always contains the primary binding.
    bindings: Vec<Binding>,
    /// Target stack for persistent caching; `None` means "the stack active at
    /// resolution time".
    home: Option<ComponentStack>,
}

impl Factory {
    pub(crate) fn new(producer: Producer, bindings: Vec<Binding>, home: Option<ComponentStack>) -> Self {
        Self {
            producer,
            bindings,
            home,
        }
    }

    #[inline]
    pub(crate) fn producer(&self) -> &Producer {
        &self.producer
    }

    #[inline]
    pub(crate) fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    #[inline]
    pub(crate) fn home(&self) -> Option<&ComponentStack> {
        self.home.as_ref()
    }

    /// Invoke the producer through the immediate path.
    ///
    /// Returns `None` for a deferred producer; the caller turns that into a
    /// usage error.
    pub(crate) fn produce_now(&self) -> Option<ErasedComponent> {
        match &self.producer {
            Producer::Immediate(make) => {
                #[cfg(feature = "logging")]
                trace!(
                    target: "component_injector",
                    component = self.bindings[0].type_name,
                    "Invoking immediate producer"
                );
                Some(make())
            }
            Producer::Deferred(_) => None,
        }
    }

    /// Invoke the producer through the asynchronous path, awaiting a deferred
    /// result.
    pub(crate) async fn produce(&self) -> ErasedComponent {
        match &self.producer {
            Producer::Immediate(make) => make(),
            Producer::Deferred(make) => {
                #[cfg(feature = "logging")]
                trace!(
                    target: "component_injector",
                    component = self.bindings[0].type_name,
                    "Awaiting deferred producer"
                );
                make().await
            }
        }
    }

    /// The stored view of `produced` for one of this factory's keys.
    pub(crate) fn view_as(&self, key: &TypeId, produced: &ErasedComponent) -> Option<ErasedComponent> {
        self.bindings
            .iter()
            .find(|b| b.key == *key)
            .map(|b| b.view(produced))
    }
}

/// Flat map from capability key to factory, shallow-copied on scope entry.
///
/// Cloning shares the map; [`FactoryTable::shallow_copy`] is the scope-entry
/// operation that duplicates the entries (the `Arc<Factory>` values are
/// shared) so inner registrations cannot leak outward.
#[derive(Clone)]
pub(crate) struct FactoryTable {
    inner: Arc<DashMap<TypeId, Arc<Factory>, RandomState>>,
}

impl FactoryTable {
    pub(crate) fn new() -> Self {
        Self {
            inner: Arc::new(DashMap::with_capacity_and_hasher_and_shard_amount(
                0,
                RandomState::new(),
                8,
            )),
        }
    }

    /// Duplicate the table for a newly entered scope.
    pub(crate) fn shallow_copy(&self) -> Self {
        let copy = Self::new();
        for entry in self.inner.iter() {
            copy.inner.insert(*entry.key(), Arc::clone(entry.value()));
        }
        copy
    }

    #[inline]
    pub(crate) fn bind(&self, key: TypeId, factory: Arc<Factory>) {
        self.inner.insert(key, factory);
    }

    #[inline]
    pub(crate) fn lookup(&self, key: &TypeId) -> Option<Arc<Factory>> {
        self.inner.get(key).map(|f| Arc::clone(f.value()))
    }

    #[inline]
    pub(crate) fn contains(&self, key: &TypeId) -> bool {
        self.inner.contains_key(key)
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.inner.len()
    }
}

impl std::fmt::Debug for FactoryTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FactoryTable")
            .field("count", &self.len())
            .finish()
    }
}
