//! # Component Injector - Scoped Capability Resolution for Rust
//!
//! An in-process component registry that resolves dependencies by declared
//! capability type, with lazy construction, nested scoping, and both
//! immediate and deferred (asynchronous) factories.
//!
//! ## Features
//!
//! - 🔑 **Capability-keyed** - Resolve by concrete type or by `dyn Trait`
//!   capability, declared explicitly at registration
//! - 🔄 **Nested scopes** - Registrations and cached components are bounded
//!   by reusable, re-enterable scopes that restore exactly on exit
//! - 🏭 **Lazy factories** - Components materialize on first resolution
//! - ⏳ **Deferred factories** - Async producers awaited through
//!   `get_component_async`
//! - 💉 **Argument injection** - Wrap a function once and have its trailing
//!   parameters filled from the registry at call time
//! - 🧵 **Explicit handles** - Fork a handle per task; isolation follows the
//!   handle, not a global
//! - 📊 **Observable** - Optional tracing integration with JSON or pretty
//!   output
//!
//! ## Quick Start
//!
//! ```rust
//! use component_injector::{Inject, Injector};
//!
//! trait Gizmo: Send + Sync {
//!     fn greeting(&self) -> String;
//! }
//!
//! struct OriginalGizmo;
//! impl Gizmo for OriginalGizmo {
//!     fn greeting(&self) -> String {
//!         "Hello, world!".into()
//!     }
//! }
//!
//! let injector = Injector::new();
//!
//! // Register the component and the capability it satisfies.
//! injector
//!     .register(OriginalGizmo)
//!     .satisfies::<dyn Gizmo>(|g| g)
//!     .finish()
//!     .unwrap();
//!
//! // Resolve by capability - returns Arc<dyn Gizmo>.
//! let gizmo = injector.get_component::<dyn Gizmo>().unwrap();
//! assert_eq!(gizmo.greeting(), "Hello, world!");
//!
//! // Or wrap a consumer and let the injector fill its parameters.
//! let consumer = injector.inject(|g: Inject<dyn Gizmo>| g.greeting());
//! assert_eq!(consumer.call(()).unwrap(), "Hello, world!");
//! ```
//!
//! ## Scopes
//!
//! ```rust
//! use component_injector::Injector;
//!
//! struct Config {
//!     name: &'static str,
//! }
//!
//! let injector = Injector::new();
//! injector.register(Config { name: "app" }).finish().unwrap();
//!
//! let scope = injector.scope();
//! {
//!     let _guard = scope.enter();
//!     injector.register(Config { name: "request" }).finish().unwrap();
//!     assert_eq!(injector.get_component::<Config>().unwrap().name, "request");
//! }
//! // Everything registered inside the scope is forgotten on exit.
//! assert_eq!(injector.get_component::<Config>().unwrap().name, "app");
//! ```
//!
//! ## Concurrency
//!
//! State travels through explicit handles. Clones of an `Injector` share one
//! context view; [`Injector::fork`] derives the independent view a spawned
//! task should own, so a scope entered inside one task is never observable
//! from a sibling. Two tasks racing to resolve the same never-cached
//! capability may both run the producer - the last write wins in the cache
//! and the earlier caller keeps its own instance; this is documented
//! behavior, not a bug.

mod component;
mod error;
mod factory;
mod inject;
mod injector;
#[cfg(feature = "logging")]
pub mod logging;
mod scope;
mod storage;

pub use component::Capability;
pub use error::{InjectError, Result};
pub use inject::{Inject, InjectFn, Injected, InjectedAsync, Resolve, ResolveSet};
pub use injector::{FactoryRegistration, Injector, Registration};
pub use scope::{Scope, ScopeGuard, ScopeId};

// Re-export tracing macros for convenience when logging feature is enabled
#[cfg(feature = "logging")]
pub use tracing::{debug, error, info, trace, warn};

// Re-export for convenience
pub use std::sync::Arc;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{Capability, Inject, InjectError, Injector, Result, Scope};
    pub use std::sync::Arc;
}
