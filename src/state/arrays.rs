//! Array descriptors and the per-element dedup cache.
//!
//! Tracks array creation (shape, base type, storage class) and decides, for
//! every element write, whether the write actually changes anything worth
//! emitting. The traced program may rewrite the same element with the same
//! value many times (a loop re-deriving a constant); such repeats carry no
//! visualizable change and are suppressed here.
//!
//! # Identity Keying
//!
//! The dedup cache is keyed by [`ArrayId`], a process-unique identity minted
//! at creation time, not by array name. Two same-named arrays in different
//! scopes therefore never collide in the cache: an `array_create` for the
//! inner one mints a fresh id that shadows the outer one for name lookups
//! until its owning frame is popped.
//!
//! # Shape Handling
//!
//! Shapes are 1-3 dimensions. Unused trailing index slots are carried as the
//! [`UNUSED_INDEX`] sentinel internally and omitted from the wire. Indices
//! beyond the declared shape are recorded verbatim; the engine does not
//! bounds-check the traced program.

use std::collections::HashMap;

use crate::event::StorageClass;

/// Sentinel marking an unused index or dimension slot.
pub const UNUSED_INDEX: i32 = -1;

/// Maximum number of dimensions a traced array can carry.
pub const MAX_DIMS: usize = 3;

/// Process-unique identity of one traced array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArrayId(u64);

/// Descriptor of one traced array.
#[derive(Debug, Clone)]
pub struct ArrayDescriptor {
    /// Identity minted at creation.
    pub id: ArrayId,
    /// Array name as reported by the probe.
    pub name: String,
    /// Element base type as reported by the probe.
    pub base_type: String,
    /// Declared dimensions, 1-3 entries; empty for implicit descriptors.
    pub dims: Vec<u32>,
    /// Stack or heap placement.
    pub storage: StorageClass,
    /// Call depth of the owning frame for stack arrays.
    pub depth: u32,
}

/// Composite dedup key: array identity plus up to three indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementKey {
    array: ArrayId,
    indices: [i32; MAX_DIMS],
}

impl ElementKey {
    /// Builds a key from indices in source order, padding unused trailing
    /// slots with the sentinel. Extra indices beyond [`MAX_DIMS`] are
    /// ignored, matching the probe surface which cannot express them.
    #[must_use]
    pub fn new(array: ArrayId, indices: &[i32]) -> Self {
        let mut padded = [UNUSED_INDEX; MAX_DIMS];
        for (slot, &index) in padded.iter_mut().zip(indices.iter()) {
            *slot = index;
        }
        ElementKey {
            array,
            indices: padded,
        }
    }
}

/// Registry of array descriptors plus the element dedup cache.
///
/// Name lookups resolve to the most recently created live descriptor, so
/// shadowing follows creation order the same way pointer bindings do. No
/// internal synchronization; mutation happens only under the recorder's
/// critical section.
#[derive(Debug, Default)]
pub struct ArrayRegistry {
    next_id: u64,
    descriptors: HashMap<ArrayId, ArrayDescriptor>,
    by_name: HashMap<String, Vec<ArrayId>>,
    cache: HashMap<ElementKey, i64>,
}

impl ArrayRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        ArrayRegistry::default()
    }

    fn mint(&mut self) -> ArrayId {
        let id = ArrayId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Registers a new array and returns its identity.
    ///
    /// Zero or negative dimensions are kept verbatim in the descriptor's
    /// reported shape; the registry is not a validator of the traced
    /// program's semantics.
    pub fn create(
        &mut self,
        name: &str,
        base_type: &str,
        dims: &[u32],
        storage: StorageClass,
        depth: u32,
    ) -> ArrayId {
        let id = self.mint();
        self.descriptors.insert(
            id,
            ArrayDescriptor {
                id,
                name: name.to_string(),
                base_type: base_type.to_string(),
                dims: dims.iter().take(MAX_DIMS).copied().collect(),
                storage,
                depth,
            },
        );
        self.by_name.entry(name.to_string()).or_default().push(id);
        id
    }

    /// Resolves a name to the most recently created live array of that name.
    #[must_use]
    pub fn resolve(&self, name: &str) -> Option<ArrayId> {
        self.by_name.get(name).and_then(|ids| ids.last().copied())
    }

    /// Resolves a name, minting an implicit descriptor when the array was
    /// never declared (partially instrumented source). Dedup still works for
    /// such arrays; only the shape is unknown.
    pub fn resolve_or_intern(&mut self, name: &str, depth: u32) -> ArrayId {
        if let Some(id) = self.resolve(name) {
            return id;
        }
        self.create(name, "unknown", &[], StorageClass::Stack, depth)
    }

    /// Descriptor lookup by identity.
    #[must_use]
    pub fn descriptor(&self, id: ArrayId) -> Option<&ArrayDescriptor> {
        self.descriptors.get(&id)
    }

    /// Records an element write; returns `true` if the value changed and an
    /// event should be emitted, `false` for a suppressed no-op rewrite.
    pub fn record_write(&mut self, id: ArrayId, indices: &[i32], value: i64) -> bool {
        let key = ElementKey::new(id, indices);
        match self.cache.insert(key, value) {
            Some(previous) => previous != value,
            None => true,
        }
    }

    /// Seeds the cache with a known element value without emission logic.
    ///
    /// Used by bulk and string-literal initialization, which emit their own
    /// events unconditionally but must prime the cache so a later explicit
    /// rewrite of the same value is suppressed.
    pub fn seed(&mut self, id: ArrayId, indices: &[i32], value: i64) {
        self.cache.insert(ElementKey::new(id, indices), value);
    }

    /// Retires stack arrays owned by a popped frame.
    ///
    /// Their descriptors leave the name chain (un-shadowing any outer array
    /// of the same name) and their cache entries are purged, so a later
    /// same-named array starts with a cold cache.
    pub fn retire_frame(&mut self, depth: u32) {
        let retired: Vec<ArrayId> = self
            .descriptors
            .values()
            .filter(|d| d.storage == StorageClass::Stack && d.depth >= depth)
            .map(|d| d.id)
            .collect();

        for id in retired {
            if let Some(descriptor) = self.descriptors.remove(&id) {
                if let Some(ids) = self.by_name.get_mut(&descriptor.name) {
                    ids.retain(|candidate| *candidate != id);
                    if ids.is_empty() {
                        self.by_name.remove(&descriptor.name);
                    }
                }
            }
            self.cache.retain(|key, _| key.array != id);
        }
    }

    /// Number of live descriptors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// Returns `true` if no array is currently tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        event::StorageClass,
        state::arrays::{ArrayRegistry, ElementKey, MAX_DIMS, UNUSED_INDEX},
    };

    #[test]
    fn test_dedup_suppresses_identical_rewrite() {
        let mut arrays = ArrayRegistry::new();
        let id = arrays.create("arr", "int", &[10], StorageClass::Stack, 1);

        assert!(arrays.record_write(id, &[2], 5));
        assert!(!arrays.record_write(id, &[2], 5));
        assert!(arrays.record_write(id, &[2], 6));
        // Going back to an old value is still a change.
        assert!(arrays.record_write(id, &[2], 5));
    }

    #[test]
    fn test_distinct_indices_do_not_collide() {
        let mut arrays = ArrayRegistry::new();
        let id = arrays.create("m", "int", &[4, 4], StorageClass::Stack, 1);

        assert!(arrays.record_write(id, &[1, 2], 7));
        assert!(arrays.record_write(id, &[2, 1], 7));
        assert!(!arrays.record_write(id, &[1, 2], 7));
    }

    #[test]
    fn test_same_name_different_scope_gets_fresh_cache() {
        let mut arrays = ArrayRegistry::new();
        let outer = arrays.create("buf", "int", &[8], StorageClass::Stack, 1);
        arrays.record_write(outer, &[0], 9);

        // Inner scope declares its own `buf`; the write of 9 to index 0 is
        // a change for the inner array even though the outer saw it already.
        let inner = arrays.create("buf", "int", &[8], StorageClass::Stack, 2);
        assert_eq!(arrays.resolve("buf"), Some(inner));
        assert!(arrays.record_write(inner, &[0], 9));

        // Popping the inner frame un-shadows the outer array.
        arrays.retire_frame(2);
        assert_eq!(arrays.resolve("buf"), Some(outer));
        assert!(!arrays.record_write(outer, &[0], 9));
    }

    #[test]
    fn test_seed_primes_cache() {
        let mut arrays = ArrayRegistry::new();
        let id = arrays.create("arr", "int", &[3], StorageClass::Stack, 1);
        arrays.seed(id, &[1], 42);

        assert!(!arrays.record_write(id, &[1], 42));
        assert!(arrays.record_write(id, &[1], 43));
    }

    #[test]
    fn test_resolve_or_intern_mints_implicit_descriptor() {
        let mut arrays = ArrayRegistry::new();
        let id = arrays.resolve_or_intern("ghost", 1);
        assert_eq!(arrays.resolve_or_intern("ghost", 1), id);

        let descriptor = arrays.descriptor(id).unwrap();
        assert_eq!(descriptor.base_type, "unknown");
        assert!(descriptor.dims.is_empty());
    }

    #[test]
    fn test_retire_frame_purges_cache_and_names() {
        let mut arrays = ArrayRegistry::new();
        let heap = arrays.create("h", "int", &[4], StorageClass::Heap, 1);
        let stack = arrays.create("s", "int", &[4], StorageClass::Stack, 1);
        arrays.record_write(stack, &[0], 1);

        arrays.retire_frame(1);
        assert!(arrays.resolve("s").is_none());
        // Heap arrays outlive the frame that created them.
        assert_eq!(arrays.resolve("h"), Some(heap));
        assert_eq!(arrays.len(), 1);
    }

    #[test]
    fn test_element_key_padding() {
        let mut arrays = ArrayRegistry::new();
        let id = arrays.create("arr", "int", &[4], StorageClass::Stack, 1);

        // A 1-d write and its explicitly padded spelling are the same key.
        let short = ElementKey::new(id, &[2]);
        let padded = ElementKey::new(id, &[2, UNUSED_INDEX, UNUSED_INDEX]);
        assert_eq!(short, padded);

        // Extra indices beyond the supported rank are ignored.
        let oversized = ElementKey::new(id, &[2, UNUSED_INDEX, UNUSED_INDEX, 9]);
        assert_eq!(short, oversized);
        assert_eq!(MAX_DIMS, 3);
    }
}
