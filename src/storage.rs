//! Layered component store
//!
//! Resolved components live in a stack of layers, innermost first. Lookups
//! scan outward and stop at the first layer containing the key; writes only
//! ever touch the innermost layer. A deletion writes a tombstone, which
//! shadows any outer binding until the layer is discarded.

use crate::component::ErasedComponent;
use ahash::RandomState;
use dashmap::DashMap;
use std::any::TypeId;
use std::sync::Arc;

/// A single slot in a layer.
///
/// A tombstone counts as a lookup hit that yields nothing: it stops the
/// outward scan instead of letting an outer binding show through.
pub(crate) enum Slot {
    Value(ErasedComponent),
    Tombstone,
}

type Layer = DashMap<TypeId, Slot, RandomState>;

/// Create a layer map with a modest shard count.
///
/// Default DashMap sharding (num_cpus * 4) is oversized for a store that
/// typically holds well under 50 entries; 8 shards keeps layer creation cheap
/// without serializing concurrent readers.
#[inline]
fn new_layer() -> Arc<Layer> {
    Arc::new(DashMap::with_capacity_and_hasher_and_shard_amount(
        0,
        RandomState::new(),
        8,
    ))
}

/// Stack of component layers, innermost first.
///
/// Cloning shares every layer by reference; [`ComponentStack::stacked`] is the
/// scope-entry operation that adds one fresh innermost layer on top of the
/// shared tail.
#[derive(Clone)]
pub(crate) struct ComponentStack {
    layers: Vec<Arc<Layer>>,
}

impl ComponentStack {
    /// Create a store with a single empty layer.
    pub(crate) fn new() -> Self {
        Self {
            layers: vec![new_layer()],
        }
    }

    /// Derive the store for a newly entered scope: one fresh innermost layer,
    /// all existing layers shared by reference.
    pub(crate) fn stacked(&self) -> Self {
        let mut layers = Vec::with_capacity(self.layers.len() + 1);
        layers.push(new_layer());
        layers.extend(self.layers.iter().cloned());
        Self { layers }
    }

    /// Look a key up, scanning outward.
    ///
    /// The first layer containing the key is authoritative: a tombstone there
    /// yields `None` without consulting outer layers.
    pub(crate) fn get(&self, key: &TypeId) -> Option<ErasedComponent> {
        for layer in &self.layers {
            if let Some(slot) = layer.get(key) {
                return match &*slot {
                    Slot::Value(cell) => Some(cell.clone()),
                    Slot::Tombstone => None,
                };
            }
        }
        None
    }

    /// Write a component into the innermost layer.
    #[inline]
    pub(crate) fn set(&self, key: TypeId, cell: ErasedComponent) {
        self.layers[0].insert(key, Slot::Value(cell));
    }

    /// Tombstone a key in the innermost layer.
    ///
    /// Outer bindings are untouched; they reappear once this layer is
    /// discarded.
    #[inline]
    pub(crate) fn remove(&self, key: TypeId) {
        self.layers[0].insert(key, Slot::Tombstone);
    }

    /// Check whether a key currently resolves to a value.
    #[inline]
    pub(crate) fn contains(&self, key: &TypeId) -> bool {
        self.get(key).is_some()
    }

    /// Number of layers (1 = root, +1 per entered scope).
    #[inline]
    pub(crate) fn depth(&self) -> usize {
        self.layers.len()
    }

    /// Whether two stacks share the same innermost layer.
    #[cfg(test)]
    pub(crate) fn same_innermost(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.layers[0], &other.layers[0])
    }
}

impl std::fmt::Debug for ComponentStack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentStack")
            .field("depth", &self.depth())
            .field("innermost", &self.layers[0].len())
            .finish()
    }
}
