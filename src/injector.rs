//! The injector façade
//!
//! The `Injector` owns a factory table and a layered component store and
//! exposes the four public operations: registration (instances and
//! factories), synchronous and asynchronous resolution, and scoping.
//!
//! State is carried by explicit handles rather than ambient task-local
//! storage: cloning an injector shares its context view, while
//! [`Injector::fork`] derives the independent view a concurrently scheduled
//! task should own.

use crate::component::{Capability, ErasedComponent, erase, unerase};
use crate::error::{InjectError, Result};
use crate::factory::{Binding, Factory, Producer};
use crate::scope::{ContextState, Scope, StateCell, read_state};
use crate::storage::ComponentStack;
use std::any::TypeId;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::{Arc, RwLock};

#[cfg(feature = "logging")]
use tracing::{debug, trace};

/// Component registry with capability-keyed resolution and nested scoping.
///
/// Registration writes into the factory table and the innermost component
/// layer of the current scope; resolution reads the component store first and
/// falls back to invoking a factory, caching the result per the factory's
/// persistence rule.
///
/// # Examples
///
/// ```rust
/// use component_injector::Injector;
///
/// struct Database {
///     url: String,
/// }
///
/// let injector = Injector::new();
/// injector
///     .register(Database { url: "postgres://localhost".into() })
///     .finish()
///     .unwrap();
///
/// let db = injector.get_component::<Database>().unwrap();
/// assert_eq!(db.url, "postgres://localhost");
/// ```
///
/// # Handles
///
/// `Clone` produces another handle onto the *same* context: a scope entered
/// through one clone is visible through the others. [`Injector::fork`]
/// produces an independent handle that inherits the state present at the
/// point of forking; a scope entered in a fork is invisible to its siblings.
#[derive(Clone)]
pub struct Injector {
    current: StateCell,
}

impl Injector {
    /// Create a new injector with an empty registry.
    pub fn new() -> Self {
        #[cfg(feature = "logging")]
        debug!(
            target: "component_injector",
            "Creating new injector"
        );

        Self {
            current: Arc::new(RwLock::new(ContextState::new())),
        }
    }

    /// Derive an independent handle for a concurrently scheduled task.
    ///
    /// The fork starts from the state current at this moment. Until either
    /// side enters a scope the underlying registries are shared, so root-level
    /// registration stays visible everywhere; once a fork enters a scope its
    /// mutations are its own.
    pub fn fork(&self) -> Self {
        Self {
            current: Arc::new(RwLock::new(self.state())),
        }
    }

    /// Create a reusable scope handle bound to this injector's context.
    ///
    /// Entering the returned scope installs a shallow copy of the factory
    /// table plus one fresh component layer; dropping the guard restores the
    /// exact pre-entry state. See [`Scope`].
    pub fn scope(&self) -> Scope {
        Scope::new(Arc::clone(&self.current))
    }

    /// Snapshot of the current context state.
    fn state(&self) -> ContextState {
        read_state(&self.current)
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Register an already-constructed component.
    ///
    /// The instance is written directly into the current scope under its own
    /// type and every declared capability; there is no laziness to preserve,
    /// so direct registrations are always persistent. Returns a builder;
    /// nothing happens until [`finish`](Registration::finish).
    ///
    /// # Examples
    ///
    /// ```rust
    /// use component_injector::Injector;
    ///
    /// trait Greeter: Send + Sync {
    ///     fn greeting(&self) -> String;
    /// }
    ///
    /// struct English;
    /// impl Greeter for English {
    ///     fn greeting(&self) -> String {
    ///         "hello".into()
    ///     }
    /// }
    ///
    /// let injector = Injector::new();
    /// injector
    ///     .register(English)
    ///     .satisfies::<dyn Greeter>(|g| g)
    ///     .finish()
    ///     .unwrap();
    ///
    /// let greeter = injector.get_component::<dyn Greeter>().unwrap();
    /// assert_eq!(greeter.greeting(), "hello");
    /// ```
    #[must_use = "registration only takes effect on finish()"]
    pub fn register<T: Capability>(&self, component: T) -> Registration<'_, T> {
        Registration {
            injector: self,
            cell: erase(Arc::new(component)),
            capabilities: Vec::new(),
            overwrite: true,
            _component: PhantomData,
        }
    }

    /// Register a factory invoked lazily on first resolution.
    ///
    /// Returns a builder; nothing happens until
    /// [`finish`](FactoryRegistration::finish).
    ///
    /// # Examples
    ///
    /// ```rust
    /// use component_injector::Injector;
    ///
    /// struct Expensive {
    ///     data: Vec<u8>,
    /// }
    ///
    /// let injector = Injector::new();
    /// injector
    ///     .register_factory(|| Expensive { data: vec![0; 1024] })
    ///     .finish()
    ///     .unwrap();
    ///
    /// // Only constructed here, on first access.
    /// let service = injector.get_component::<Expensive>().unwrap();
    /// assert_eq!(service.data.len(), 1024);
    /// ```
    #[must_use = "registration only takes effect on finish()"]
    pub fn register_factory<T, F>(&self, make: F) -> FactoryRegistration<'_, T>
    where
        T: Capability,
        F: Fn() -> T + Send + Sync + 'static,
    {
        FactoryRegistration {
            injector: self,
            producer: Producer::immediate(make),
            capabilities: Vec::new(),
            overwrite: true,
            persistent: false,
            _component: PhantomData,
        }
    }

    /// Register a deferred factory whose future is awaited on resolution.
    ///
    /// Components from deferred factories can only be resolved through
    /// [`get_component_async`](Injector::get_component_async); the synchronous
    /// path reports a usage error.
    #[must_use = "registration only takes effect on finish()"]
    pub fn register_factory_async<T, F, Fut>(&self, make: F) -> FactoryRegistration<'_, T>
    where
        T: Capability,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = T> + Send + 'static,
    {
        FactoryRegistration {
            injector: self,
            producer: Producer::deferred(make),
            capabilities: Vec::new(),
            overwrite: true,
            persistent: false,
            _component: PhantomData,
        }
    }

    /// Commit a registration: bind the factory table, tombstone stale cache
    /// entries, and (for direct registrations) write the instance through.
    fn commit<T: Capability>(
        &self,
        producer: Producer,
        capabilities: Vec<Binding>,
        overwrite: bool,
        persistent: bool,
        instance: Option<ErasedComponent>,
    ) -> Result<()> {
        let state = self.state();

        let mut applied = Vec::with_capacity(capabilities.len() + 1);
        applied.push(Binding::primary::<T>());
        for binding in capabilities {
            if applied.iter().any(|b| b.key == binding.key) {
                return Err(InjectError::configuration(format!(
                    "capability {} declared twice for {}",
                    binding.type_name,
                    T::name(),
                )));
            }
            // An already-bound capability is left alone unless overwriting;
            // it then also stays out of this factory's resolved set.
            if overwrite || !state.factories.contains(&binding.key) {
                applied.push(binding);
            }
        }

        #[cfg(feature = "logging")]
        debug!(
            target: "component_injector",
            component = T::name(),
            capabilities = applied.len(),
            overwrite,
            persistent,
            depth = state.depth(),
            "Registering component"
        );

        let home = persistent.then(|| state.components.clone());
        let factory = Arc::new(Factory::new(producer, applied, home));

        for binding in factory.bindings() {
            state.factories.bind(binding.key, Arc::clone(&factory));
            if overwrite {
                // Invalidate any stale cached value so the next resolution
                // goes through this factory.
                state.components.remove(binding.key);
            }
        }

        if let Some(cell) = instance {
            for binding in factory.bindings() {
                state.components.set(binding.key, binding.view(&cell));
            }
        }

        Ok(())
    }

    // =========================================================================
    // Resolution
    // =========================================================================

    /// Resolve a component synchronously.
    ///
    /// Looks the capability up in the component store first; on a miss,
    /// invokes the registered factory and caches the result into the
    /// factory's home scope (persistent) or the current scope.
    ///
    /// Two tasks racing to resolve the same never-cached capability may both
    /// invoke the producer; the last write wins in the cache and the earlier
    /// caller keeps its own instance. This is accepted behavior, not a bug.
    ///
    /// # Errors
    ///
    /// [`InjectError::Unregistered`] when neither a cached value nor a
    /// factory exists for the capability; [`InjectError::Usage`] when the
    /// factory is deferred.
    pub fn get_component<K: ?Sized + Capability>(&self) -> Result<Arc<K>> {
        let key = K::key();
        let state = self.state();

        if let Some(cell) = state.components.get(&key) {
            #[cfg(feature = "logging")]
            trace!(
                target: "component_injector",
                component = K::name(),
                depth = state.depth(),
                "Resolved from component store"
            );
            return Ok(unerase(&cell));
        }

        let factory = self.factory_for::<K>(&state, &key)?;
        let produced = factory
            .produce_now()
            .ok_or_else(InjectError::deferred_in_sync::<K>)?;

        self.finish_resolution::<K>(&state, &key, &factory, produced)
    }

    /// Resolve a component, awaiting its factory when deferred.
    ///
    /// Identical to [`get_component`](Injector::get_component) except that a
    /// deferred producer is awaited instead of rejected. Awaiting the
    /// producer is the only suspension point; the cache never holds a
    /// pending value.
    pub async fn get_component_async<K: ?Sized + Capability>(&self) -> Result<Arc<K>> {
        let key = K::key();
        let state = self.state();

        if let Some(cell) = state.components.get(&key) {
            #[cfg(feature = "logging")]
            trace!(
                target: "component_injector",
                component = K::name(),
                depth = state.depth(),
                "Resolved from component store"
            );
            return Ok(unerase(&cell));
        }

        let factory = self.factory_for::<K>(&state, &key)?;
        let produced = factory.produce().await;

        self.finish_resolution::<K>(&state, &key, &factory, produced)
    }

    /// Resolve a component, returning `None` instead of an error.
    ///
    /// A deferred factory still reports `None` here; probe with
    /// [`get_component_async`](Injector::get_component_async) for those.
    #[inline]
    pub fn try_get<K: ?Sized + Capability>(&self) -> Option<Arc<K>> {
        self.get_component::<K>().ok()
    }

    /// Check whether a capability is resolvable: cached, or backed by a
    /// factory in the current scope chain.
    pub fn contains<K: ?Sized + Capability>(&self) -> bool {
        let key = K::key();
        let state = self.state();
        state.components.contains(&key) || state.factories.contains(&key)
    }

    fn factory_for<K: ?Sized + Capability>(
        &self,
        state: &ContextState,
        key: &TypeId,
    ) -> Result<Arc<Factory>> {
        state.factories.lookup(key).ok_or_else(|| {
            #[cfg(feature = "logging")]
            debug!(
                target: "component_injector",
                component = K::name(),
                depth = state.depth(),
                "Component not registered"
            );
            InjectError::unregistered::<K>()
        })
    }

    /// Cache a produced component under every key its factory resolves, into
    /// the store selected by the persistence rule, and hand back the caller's
    /// view of it.
    fn finish_resolution<K: ?Sized + Capability>(
        &self,
        state: &ContextState,
        key: &TypeId,
        factory: &Factory,
        produced: ErasedComponent,
    ) -> Result<Arc<K>> {
        let target: &ComponentStack = factory.home().unwrap_or(&state.components);
        for binding in factory.bindings() {
            target.set(binding.key, binding.view(&produced));
        }

        #[cfg(feature = "logging")]
        trace!(
            target: "component_injector",
            component = K::name(),
            keys = factory.bindings().len(),
            persistent = factory.home().is_some(),
            "Materialized component"
        );

        let cell = factory
            .view_as(key, &produced)
            .ok_or_else(InjectError::unregistered::<K>)?;
        Ok(unerase(&cell))
    }
}

impl Default for Injector {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Injector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state();
        f.debug_struct("Injector")
            .field("depth", &state.depth())
            .field("factories", &state.factories)
            .finish()
    }
}

/// Builder for a direct instance registration.
///
/// Created by [`Injector::register`]; committed by
/// [`finish`](Registration::finish).
#[must_use = "registration only takes effect on finish()"]
pub struct Registration<'a, T> {
    injector: &'a Injector,
    cell: ErasedComponent,
    capabilities: Vec<Binding>,
    overwrite: bool,
    _component: PhantomData<fn() -> T>,
}

impl<T: Capability> Registration<'_, T> {
    /// Declare an additional capability this component satisfies, with the
    /// coercion from the concrete component, e.g.
    /// `.satisfies::<dyn Greeter>(|g| g)`.
    pub fn satisfies<K: ?Sized + Capability>(
        mut self,
        coerce: impl Fn(Arc<T>) -> Arc<K> + Send + Sync + 'static,
    ) -> Self {
        self.capabilities.push(Binding::capability::<T, K, _>(coerce));
        self
    }

    /// Whether declared capabilities supersede existing bindings and
    /// invalidate their cached values. Defaults to `true`.
    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Commit the registration.
    ///
    /// # Errors
    ///
    /// [`InjectError::Configuration`] when the same capability is declared
    /// twice.
    pub fn finish(self) -> Result<()> {
        let producer = Producer::of_instance(self.cell.clone());
        self.injector.commit::<T>(
            producer,
            self.capabilities,
            self.overwrite,
            true,
            Some(self.cell),
        )
    }
}

/// Builder for a factory registration (immediate or deferred).
///
/// Created by [`Injector::register_factory`] or
/// [`Injector::register_factory_async`]; committed by
/// [`finish`](FactoryRegistration::finish).
#[must_use = "registration only takes effect on finish()"]
pub struct FactoryRegistration<'a, T> {
    injector: &'a Injector,
    producer: Producer,
    capabilities: Vec<Binding>,
    overwrite: bool,
    persistent: bool,
    _component: PhantomData<fn() -> T>,
}

impl<T: Capability> FactoryRegistration<'_, T> {
    /// Declare an additional capability the produced component satisfies,
    /// with the coercion from the concrete component.
    pub fn satisfies<K: ?Sized + Capability>(
        mut self,
        coerce: impl Fn(Arc<T>) -> Arc<K> + Send + Sync + 'static,
    ) -> Self {
        self.capabilities.push(Binding::capability::<T, K, _>(coerce));
        self
    }

    /// Whether declared capabilities supersede existing bindings and
    /// invalidate their cached values. Defaults to `true`.
    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Cache produced components into the scope where this factory is being
    /// registered instead of the scope active at resolution time. Defaults to
    /// `false`.
    pub fn persistent(mut self, persistent: bool) -> Self {
        self.persistent = persistent;
        self
    }

    /// Commit the registration.
    ///
    /// # Errors
    ///
    /// [`InjectError::Configuration`] when the same capability is declared
    /// twice.
    pub fn finish(self) -> Result<()> {
        self.injector.commit::<T>(
            self.producer,
            self.capabilities,
            self.overwrite,
            self.persistent,
            None,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct Database {
        url: String,
    }

    trait Greeter: Send + Sync {
        fn greeting(&self) -> String;
    }

    struct English;
    impl Greeter for English {
        fn greeting(&self) -> String {
            "hello".into()
        }
    }

    struct Spanish;
    impl Greeter for Spanish {
        fn greeting(&self) -> String {
            "hola".into()
        }
    }

    #[test]
    fn unregistered_component_reports_an_error() {
        let injector = Injector::new();
        let result = injector.get_component::<Database>();
        assert!(matches!(result, Err(InjectError::Unregistered { .. })));
    }

    #[test]
    fn direct_registration_resolves_to_the_same_instance() {
        let injector = Injector::new();
        injector
            .register(Database { url: "test".into() })
            .finish()
            .unwrap();

        let first = injector.get_component::<Database>().unwrap();
        let second = injector.get_component::<Database>().unwrap();
        assert_eq!(first.url, "test");
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn factory_is_lazy_and_caches_its_result() {
        static BUILT: AtomicU32 = AtomicU32::new(0);

        let injector = Injector::new();
        injector
            .register_factory(|| {
                BUILT.fetch_add(1, Ordering::SeqCst);
                Database { url: "lazy".into() }
            })
            .finish()
            .unwrap();
        assert_eq!(BUILT.load(Ordering::SeqCst), 0);

        let first = injector.get_component::<Database>().unwrap();
        let second = injector.get_component::<Database>().unwrap();
        assert_eq!(BUILT.load(Ordering::SeqCst), 1);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn capability_resolution_returns_the_concrete_component() {
        let injector = Injector::new();
        injector
            .register(English)
            .satisfies::<dyn Greeter>(|g| g)
            .finish()
            .unwrap();

        let greeter = injector.get_component::<dyn Greeter>().unwrap();
        assert_eq!(greeter.greeting(), "hello");
    }

    #[test]
    fn undeclared_capability_stays_unresolvable() {
        let injector = Injector::new();
        injector.register(English).finish().unwrap();

        assert!(injector.get_component::<English>().is_ok());
        let result = injector.get_component::<dyn Greeter>();
        assert!(matches!(result, Err(InjectError::Unregistered { .. })));
    }

    #[test]
    fn overwrite_invalidates_the_stale_capability_cache() {
        let injector = Injector::new();
        injector
            .register(English)
            .satisfies::<dyn Greeter>(|g| g)
            .finish()
            .unwrap();
        assert_eq!(
            injector.get_component::<dyn Greeter>().unwrap().greeting(),
            "hello"
        );

        injector
            .register(Spanish)
            .satisfies::<dyn Greeter>(|g| g)
            .finish()
            .unwrap();
        assert_eq!(
            injector.get_component::<dyn Greeter>().unwrap().greeting(),
            "hola"
        );
    }

    #[test]
    fn without_overwrite_the_existing_binding_wins() {
        let injector = Injector::new();
        injector
            .register(English)
            .satisfies::<dyn Greeter>(|g| g)
            .finish()
            .unwrap();

        injector
            .register(Spanish)
            .satisfies::<dyn Greeter>(|g| g)
            .overwrite(false)
            .finish()
            .unwrap();

        // The capability still resolves to the first registration; the
        // concrete type resolves to the new one.
        assert_eq!(
            injector.get_component::<dyn Greeter>().unwrap().greeting(),
            "hello"
        );
        assert_eq!(
            injector.get_component::<Spanish>().unwrap().greeting(),
            "hola"
        );
    }

    #[test]
    fn duplicate_capability_is_a_configuration_error() {
        let injector = Injector::new();
        let result = injector
            .register(English)
            .satisfies::<dyn Greeter>(|g| g)
            .satisfies::<dyn Greeter>(|g| g)
            .finish();
        assert!(matches!(result, Err(InjectError::Configuration { .. })));
    }

    #[test]
    fn scoped_registration_shadows_and_restores() {
        let injector = Injector::new();
        injector
            .register(Database { url: "outer".into() })
            .finish()
            .unwrap();

        let scope = injector.scope();
        {
            let _guard = scope.enter();
            injector
                .register(Database { url: "inner".into() })
                .finish()
                .unwrap();
            assert_eq!(injector.get_component::<Database>().unwrap().url, "inner");
        }
        assert_eq!(injector.get_component::<Database>().unwrap().url, "outer");
    }

    #[test]
    fn factories_registered_in_a_scope_do_not_leak_out() {
        let injector = Injector::new();

        let scope = injector.scope();
        {
            let _guard = scope.enter();
            injector
                .register_factory(|| Database { url: "scoped".into() })
                .finish()
                .unwrap();
            assert!(injector.contains::<Database>());
        }
        assert!(!injector.contains::<Database>());
    }

    #[test]
    fn persistent_factory_caches_into_its_registration_scope() {
        static BUILT: AtomicU32 = AtomicU32::new(0);

        let injector = Injector::new();
        injector
            .register_factory(|| {
                BUILT.fetch_add(1, Ordering::SeqCst);
                Database { url: "kept".into() }
            })
            .persistent(true)
            .finish()
            .unwrap();

        let scope = injector.scope();
        let inside = {
            let _guard = scope.enter();
            injector.get_component::<Database>().unwrap()
        };

        // The result was cached into the root layer, so it survives the scope.
        let outside = injector.get_component::<Database>().unwrap();
        assert_eq!(BUILT.load(Ordering::SeqCst), 1);
        assert!(Arc::ptr_eq(&inside, &outside));
    }

    #[test]
    fn non_persistent_factory_caches_into_the_resolving_scope() {
        static BUILT: AtomicU32 = AtomicU32::new(0);

        let injector = Injector::new();
        injector
            .register_factory(|| {
                BUILT.fetch_add(1, Ordering::SeqCst);
                Database { url: "scoped".into() }
            })
            .finish()
            .unwrap();

        let scope = injector.scope();
        {
            let _guard = scope.enter();
            let _ = injector.get_component::<Database>().unwrap();
        }

        // The cache died with the scope; resolving again reconstructs.
        let _ = injector.get_component::<Database>().unwrap();
        assert_eq!(BUILT.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn deferred_factory_rejects_the_sync_path() {
        let injector = Injector::new();
        injector
            .register_factory_async(|| async { Database { url: "later".into() } })
            .finish()
            .unwrap();

        let result = injector.get_component::<Database>();
        assert!(matches!(result, Err(InjectError::Usage { .. })));
    }

    #[tokio::test]
    async fn deferred_factory_resolves_asynchronously() {
        let injector = Injector::new();
        injector
            .register_factory_async(|| async { Database { url: "later".into() } })
            .finish()
            .unwrap();

        let db = injector.get_component_async::<Database>().await.unwrap();
        assert_eq!(db.url, "later");

        // Once materialized, the cached value serves the sync path too.
        let cached = injector.get_component::<Database>().unwrap();
        assert!(Arc::ptr_eq(&db, &cached));
    }

    #[tokio::test]
    async fn async_path_also_serves_immediate_factories() {
        let injector = Injector::new();
        injector
            .register_factory(|| Database { url: "now".into() })
            .finish()
            .unwrap();

        let db = injector.get_component_async::<Database>().await.unwrap();
        assert_eq!(db.url, "now");
    }

    #[test]
    fn fork_inherits_but_scopes_stay_private() {
        let injector = Injector::new();
        injector
            .register(Database { url: "root".into() })
            .finish()
            .unwrap();

        let fork = injector.fork();
        assert_eq!(fork.get_component::<Database>().unwrap().url, "root");

        let scope = fork.scope();
        let _guard = scope.enter();
        fork.register(Database { url: "forked".into() })
            .finish()
            .unwrap();

        assert_eq!(fork.get_component::<Database>().unwrap().url, "forked");
        // The sibling handle never sees the fork's scope.
        assert_eq!(injector.get_component::<Database>().unwrap().url, "root");
    }

    #[test]
    fn clones_share_the_context_view() {
        let injector = Injector::new();
        let alias = injector.clone();

        let scope = injector.scope();
        let _guard = scope.enter();
        injector
            .register(Database { url: "shared".into() })
            .finish()
            .unwrap();

        // The clone looks through the same context, scope included.
        assert_eq!(alias.get_component::<Database>().unwrap().url, "shared");
    }
}
