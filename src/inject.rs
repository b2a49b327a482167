//! Argument-binding wrapper
//!
//! [`Injector::inject`] and [`Injector::inject_async`] wrap a function so
//! that, at call time, its trailing [`Inject<K>`] parameters are filled from
//! the registry while the leading parameters are supplied by the caller. The
//! synchronous/asynchronous resolution path is chosen once, at wrap time, by
//! which constructor is used, never re-decided per call.
//!
//! # Example
//!
//! ```rust
//! use component_injector::{Inject, Injector};
//!
//! trait Greeter: Send + Sync {
//!     fn greeting(&self) -> String;
//! }
//!
//! struct English;
//! impl Greeter for English {
//!     fn greeting(&self) -> String {
//!         "Hello, world!".into()
//!     }
//! }
//!
//! let injector = Injector::new();
//! injector
//!     .register(English)
//!     .satisfies::<dyn Greeter>(|g| g)
//!     .finish()
//!     .unwrap();
//!
//! let consumer = injector.inject(|prefix: String, g: Inject<dyn Greeter>| {
//!     format!("{prefix} {}", g.greeting())
//! });
//!
//! assert_eq!(consumer.call(("OG".into(),)).unwrap(), "OG Hello, world!");
//! ```

use crate::component::Capability;
use crate::error::Result;
use crate::injector::Injector;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

/// Per-parameter descriptor for an injected argument.
///
/// A wrapped function declares each registry-filled parameter as
/// `Inject<K>`; the wrapper resolves the capability `K` through the live
/// injector when the function is called. Derefs to `K`.
pub struct Inject<K: ?Sized>(pub Arc<K>);

impl<K: ?Sized> Inject<K> {
    /// Create from an already-resolved component.
    pub fn new(inner: Arc<K>) -> Self {
        Self(inner)
    }

    /// Consume the descriptor and return the inner `Arc`.
    pub fn into_inner(self) -> Arc<K> {
        self.0
    }
}

impl<K: ?Sized> Clone for Inject<K> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<K: ?Sized> std::ops::Deref for Inject<K> {
    type Target = K;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<K: ?Sized + std::fmt::Debug> std::fmt::Debug for Inject<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Inject").field(&self.0).finish()
    }
}

/// An argument resolvable from the injector at call time.
pub trait Resolve: Sized {
    /// Resolve through the synchronous path.
    fn resolve(injector: &Injector) -> Result<Self>;

    /// Resolve through the asynchronous path, awaiting deferred factories.
    fn resolve_async(injector: &Injector) -> impl Future<Output = Result<Self>>;
}

impl<K: ?Sized + Capability> Resolve for Inject<K> {
    fn resolve(injector: &Injector) -> Result<Self> {
        injector.get_component::<K>().map(Inject)
    }

    fn resolve_async(injector: &Injector) -> impl Future<Output = Result<Self>> {
        async move { injector.get_component_async::<K>().await.map(Inject) }
    }
}

/// A tuple of injected arguments, resolved left to right.
pub trait ResolveSet: Sized {
    /// Resolve every element through the synchronous path.
    fn resolve_set(injector: &Injector) -> Result<Self>;

    /// Resolve every element through the asynchronous path.
    fn resolve_set_async(injector: &Injector) -> impl Future<Output = Result<Self>>;
}

macro_rules! impl_resolve_set {
    ( $($dep:ident),+ ) => {
        impl<$($dep: Resolve,)+> ResolveSet for ($($dep,)+) {
            fn resolve_set(injector: &Injector) -> Result<Self> {
                Ok(($($dep::resolve(injector)?,)+))
            }

            fn resolve_set_async(injector: &Injector) -> impl Future<Output = Result<Self>> {
                async move { Ok(($($dep::resolve_async(injector).await?,)+)) }
            }
        }
    };
}

impl_resolve_set!(D1);
impl_resolve_set!(D1, D2);
impl_resolve_set!(D1, D2, D3);
impl_resolve_set!(D1, D2, D3, D4);

/// A function callable with a tuple of caller-supplied arguments plus a tuple
/// of injected arguments.
///
/// Implemented for `Fn` types whose trailing parameters implement
/// [`Resolve`]; the leading parameters form `Given`, the trailing ones
/// `Deps`.
pub trait InjectFn<Given, Deps> {
    type Output;

    /// Invoke with the completed argument list.
    fn invoke(&self, given: Given, deps: Deps) -> Self::Output;
}

macro_rules! impl_inject_fn {
    ( ($($given:ident),*), ($($dep:ident),+) ) => {
        impl<Func, Out, $($given,)* $($dep,)+> InjectFn<($($given,)*), ($($dep,)+)> for Func
        where
            Func: Fn($($given,)* $($dep,)+) -> Out,
            $($dep: Resolve,)+
        {
            type Output = Out;

            #[allow(non_snake_case)]
            fn invoke(&self, ($($given,)*): ($($given,)*), ($($dep,)+): ($($dep,)+)) -> Out {
                (self)($($given,)* $($dep,)+)
            }
        }
    };
}

impl_inject_fn!((), (D1));
impl_inject_fn!((), (D1, D2));
impl_inject_fn!((), (D1, D2, D3));
impl_inject_fn!((G1), (D1));
impl_inject_fn!((G1), (D1, D2));
impl_inject_fn!((G1), (D1, D2, D3));
impl_inject_fn!((G1, G2), (D1));
impl_inject_fn!((G1, G2), (D1, D2));
impl_inject_fn!((G1, G2), (D1, D2, D3));
impl_inject_fn!((G1, G2, G3), (D1));
impl_inject_fn!((G1, G2, G3), (D1, D2));
impl_inject_fn!((G1, G2, G3), (D1, D2, D3));

/// A synchronously wrapped function with injected trailing parameters.
///
/// Created by [`Injector::inject`]. Holds a handle onto the injector's live
/// context, so scopes entered after wrapping are honored at call time.
pub struct Injected<F, Given, Deps> {
    injector: Injector,
    f: F,
    _marker: PhantomData<fn(Given, Deps)>,
}

impl<F, Given, Deps> Injected<F, Given, Deps>
where
    F: InjectFn<Given, Deps>,
    Deps: ResolveSet,
{
    /// Call the wrapped function, filling injected parameters from the
    /// registry.
    ///
    /// # Errors
    ///
    /// Any resolution failure for an injected parameter; the function's own
    /// output is returned untouched otherwise.
    pub fn call(&self, given: Given) -> Result<F::Output> {
        let deps = Deps::resolve_set(&self.injector)?;
        Ok(self.f.invoke(given, deps))
    }
}

/// An asynchronously wrapped function with injected trailing parameters.
///
/// Created by [`Injector::inject_async`]. Injected parameters are resolved
/// through the asynchronous path, so deferred factories are awaited, and the
/// wrapped function's future is awaited in turn.
pub struct InjectedAsync<F, Given, Deps> {
    injector: Injector,
    f: F,
    _marker: PhantomData<fn(Given, Deps)>,
}

impl<F, Given, Deps> InjectedAsync<F, Given, Deps>
where
    F: InjectFn<Given, Deps>,
    F::Output: Future,
    Deps: ResolveSet,
{
    /// Call the wrapped function, filling injected parameters from the
    /// registry and awaiting the result.
    pub async fn call(&self, given: Given) -> Result<<F::Output as Future>::Output> {
        let deps = Deps::resolve_set_async(&self.injector).await?;
        Ok(self.f.invoke(given, deps).await)
    }
}

impl Injector {
    /// Wrap a synchronous function for argument injection.
    ///
    /// Trailing [`Inject<K>`] parameters are resolved through the synchronous
    /// path on every call; the leading parameters are passed to
    /// [`call`](Injected::call) as a tuple.
    pub fn inject<F, Given, Deps>(&self, f: F) -> Injected<F, Given, Deps>
    where
        F: InjectFn<Given, Deps>,
        Deps: ResolveSet,
    {
        Injected {
            injector: self.clone(),
            f,
            _marker: PhantomData,
        }
    }

    /// Wrap an asynchronous function for argument injection.
    ///
    /// Trailing [`Inject<K>`] parameters are resolved through the
    /// asynchronous path, so the wrapped function may depend on deferred
    /// factories.
    pub fn inject_async<F, Given, Deps>(&self, f: F) -> InjectedAsync<F, Given, Deps>
    where
        F: InjectFn<Given, Deps>,
        F::Output: Future,
        Deps: ResolveSet,
    {
        InjectedAsync {
            injector: self.clone(),
            f,
            _marker: PhantomData,
        }
    }
}
