//! Capability types and component type erasure
//!
//! A capability is the key a component is registered and resolved under. Any
//! `Send + Sync + 'static` type works, sized or not, so both concrete structs
//! and `dyn Trait` objects can serve as resolution keys.

use std::any::{Any, TypeId};
use std::sync::Arc;

/// Marker trait for types usable as capability keys and component values.
///
/// Automatically implemented for every `?Sized + Send + Sync + 'static` type.
/// You never need to implement this manually.
///
/// # Examples
///
/// ```rust
/// trait Greeter: Send + Sync {
///     fn greeting(&self) -> String;
/// }
///
/// struct English;
/// impl Greeter for English {
///     fn greeting(&self) -> String { "hello".into() }
/// }
///
/// // Both `English` and `dyn Greeter` are capabilities.
/// ```
pub trait Capability: Send + Sync + 'static {
    /// Returns the TypeId used as this capability's resolution key
    #[inline]
    fn key() -> TypeId {
        TypeId::of::<Self>()
    }

    /// Returns the type name for diagnostics
    #[inline]
    fn name() -> &'static str {
        std::any::type_name::<Self>()
    }
}

impl<T: ?Sized + Send + Sync + 'static> Capability for T {}

/// A type-erased component cell.
///
/// The cell always holds an `Arc<K>` for some capability `K` (note: the
/// `Arc<K>` itself, not `K` directly; this is what lets unsized keys such as
/// `dyn Trait` ride inside `dyn Any`).
pub(crate) type ErasedComponent = Arc<dyn Any + Send + Sync>;

/// Erase an `Arc<K>` into a storable component cell.
#[inline]
pub(crate) fn erase<K: ?Sized + Capability>(component: Arc<K>) -> ErasedComponent {
    Arc::new(component)
}

/// Recover the `Arc<K>` held by a component cell.
///
/// The store and the factory table are keyed by `TypeId::of::<K>()`, and every
/// write under that key goes through [`erase`] with the same `K`, so a cell
/// looked up under `K` always holds an `Arc<K>`.
#[inline]
pub(crate) fn unerase<K: ?Sized + Capability>(cell: &ErasedComponent) -> Arc<K> {
    cell.downcast_ref::<Arc<K>>()
        .expect("component cell holds the Arc<K> of the key it was stored under")
        .clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Speaks: Send + Sync {
        fn word(&self) -> &'static str;
    }

    struct Dog;
    impl Speaks for Dog {
        fn word(&self) -> &'static str {
            "woof"
        }
    }

    #[test]
    fn erase_round_trips_concrete_types() {
        let cell = erase(Arc::new(Dog));
        let dog: Arc<Dog> = unerase(&cell);
        assert_eq!(dog.word(), "woof");
    }

    #[test]
    fn erase_round_trips_trait_objects() {
        let spoken: Arc<dyn Speaks> = Arc::new(Dog);
        let cell = erase(spoken);
        let back: Arc<dyn Speaks> = unerase(&cell);
        assert_eq!(back.word(), "woof");
    }

    #[test]
    fn capability_key_is_stable() {
        assert_eq!(<dyn Speaks>::key(), TypeId::of::<dyn Speaks>());
        assert_eq!(Dog::key(), TypeId::of::<Dog>());
        assert_ne!(<dyn Speaks>::key(), Dog::key());
    }
}
