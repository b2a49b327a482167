//! Scope lifecycle
//!
//! A scope bounds the visibility of registrations and cached components.
//! Entering snapshots the current factory table and component stack, then
//! installs a shallow factory-table copy plus one fresh component layer.
//! Exiting restores the snapshot exactly, whatever happened inside,
//! including panic unwinds, since restoration runs in `Drop`.

use crate::factory::FactoryTable;
use crate::storage::ComponentStack;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

#[cfg(feature = "logging")]
use tracing::debug;

/// The pair of registries a scope snapshots and restores.
#[derive(Clone)]
pub(crate) struct ContextState {
    pub(crate) factories: FactoryTable,
    pub(crate) components: ComponentStack,
}

impl ContextState {
    pub(crate) fn new() -> Self {
        Self {
            factories: FactoryTable::new(),
            components: ComponentStack::new(),
        }
    }

    /// The state installed on scope entry: shallow-copied factory table,
    /// component stack with one new empty innermost layer.
    pub(crate) fn stacked(&self) -> Self {
        Self {
            factories: self.factories.shallow_copy(),
            components: self.components.stacked(),
        }
    }

    #[inline]
    pub(crate) fn depth(&self) -> usize {
        self.components.depth()
    }
}

/// The shared cell holding an injector handle's current state.
pub(crate) type StateCell = Arc<RwLock<ContextState>>;

/// Read a state cell, recovering from poisoning.
///
/// A panic can never leave the state half-swapped (swaps are single
/// assignments), so a poisoned cell is still structurally sound and scope
/// unwinding must keep working through it.
pub(crate) fn read_state(cell: &StateCell) -> ContextState {
    cell.read().unwrap_or_else(PoisonError::into_inner).clone()
}

/// Unique scope identifier.
///
/// Each scope handle gets an ID for tracking and log correlation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(u64);

impl ScopeId {
    /// Generate a new unique scope ID.
    #[inline]
    pub(crate) fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    #[inline]
    pub fn id(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ScopeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "scope-{}", self.0)
    }
}

/// A reusable scope handle.
///
/// Created by [`Injector::scope`](crate::Injector::scope). Each
/// [`enter`](Scope::enter) is relative to whatever state is current at that
/// moment (scopes are dynamically relative, not fixed to the state they were
/// created under), so one handle can be entered many times, sequentially or
/// nested.
///
/// # Examples
///
/// ```rust
/// use component_injector::Injector;
///
/// #[derive(Debug)]
/// struct Flag(bool);
///
/// let injector = Injector::new();
/// injector.register(Flag(false)).finish().unwrap();
///
/// let scope = injector.scope();
/// {
///     let _guard = scope.enter();
///     injector.register(Flag(true)).finish().unwrap();
///     assert!(injector.get_component::<Flag>().unwrap().0);
/// }
/// // Everything registered inside is forgotten on exit.
/// assert!(!injector.get_component::<Flag>().unwrap().0);
/// ```
pub struct Scope {
    cell: StateCell,
    id: ScopeId,
}

impl Scope {
    pub(crate) fn new(cell: StateCell) -> Self {
        Self {
            cell,
            id: ScopeId::next(),
        }
    }

    /// This scope's identifier.
    #[inline]
    pub fn id(&self) -> ScopeId {
        self.id
    }

    /// Enter the scope: snapshot the current state and install the stacked
    /// copy. The returned guard restores the snapshot when dropped.
    pub fn enter(&self) -> ScopeGuard<'_> {
        let saved = {
            let mut current = self.cell.write().unwrap_or_else(PoisonError::into_inner);
            let saved = current.clone();
            *current = saved.stacked();
            saved
        };

        #[cfg(feature = "logging")]
        debug!(
            target: "component_injector",
            scope = %self.id,
            depth = saved.depth() + 1,
            "Entered scope"
        );

        ScopeGuard {
            scope: self,
            saved: Some(saved),
        }
    }
}

impl std::fmt::Debug for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scope").field("id", &self.id).finish()
    }
}

/// Guard for an entered scope; restores the pre-entry state on drop.
///
/// Restoration is exact and total: no registration or cached component from
/// inside the scope survives, on any exit path.
#[must_use = "dropping the guard immediately exits the scope"]
pub struct ScopeGuard<'a> {
    scope: &'a Scope,
    saved: Option<ContextState>,
}

impl Drop for ScopeGuard<'_> {
    fn drop(&mut self) {
        if let Some(saved) = self.saved.take() {
            #[cfg(feature = "logging")]
            let depth = saved.depth();

            let mut current = self
                .scope
                .cell
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            *current = saved;
            drop(current);

            #[cfg(feature = "logging")]
            debug!(
                target: "component_injector",
                scope = %self.scope.id,
                depth = depth,
                "Exited scope"
            );
        }
    }
}
