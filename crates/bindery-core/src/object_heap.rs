//! Generational table of constructed native objects.
//!
//! Each live object sits in its own [`ObjectCell`] so that a native call can
//! hold one object borrowed while re-entrant calls use the table or other
//! objects. When an object is freed its slot's generation is bumped, so every
//! outstanding [`ObjectHandle`] to it goes stale and can be detected instead of
//! reaching a reused slot.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::TypeHash;

/// Storage cell of a single native object.
pub type ObjectCell = Rc<RefCell<Box<dyn Any>>>;

/// Handle to an object in the [`ObjectHeap`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ObjectHandle {
    /// Index into the slot table.
    pub index: u32,
    /// Generation at allocation time, for use-after-free detection.
    pub generation: u32,
}

impl ObjectHandle {
    pub fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }
}

struct HeapSlot {
    generation: u32,
    value: Option<ObjectCell>,
    /// Allocated (most-derived) type of the object.
    type_hash: TypeHash,
    /// Owning references: proxies that own or share the object, plus pins.
    ref_count: u32,
}

/// Heap storage for native objects with generational indices.
pub struct ObjectHeap {
    slots: Vec<HeapSlot>,
    free_list: Vec<u32>,
}

impl ObjectHeap {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free_list: Vec::new(),
        }
    }

    /// Allocate an object of registered type `type_hash` with one reference.
    pub fn allocate(&mut self, type_hash: TypeHash, value: Box<dyn Any>) -> ObjectHandle {
        let cell = Rc::new(RefCell::new(value));

        if let Some(index) = self.free_list.pop() {
            let slot = &mut self.slots[index as usize];
            slot.value = Some(cell);
            slot.type_hash = type_hash;
            slot.ref_count = 1;
            ObjectHandle::new(index, slot.generation)
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(HeapSlot {
                generation: 0,
                value: Some(cell),
                type_hash,
                ref_count: 1,
            });
            ObjectHandle::new(index, 0)
        }
    }

    fn live_slot(&self, handle: ObjectHandle) -> Option<&HeapSlot> {
        let slot = self.slots.get(handle.index as usize)?;
        (slot.generation == handle.generation && slot.value.is_some()).then_some(slot)
    }

    /// Whether the handle still refers to a live object.
    pub fn is_live(&self, handle: ObjectHandle) -> bool {
        self.live_slot(handle).is_some()
    }

    /// Get the object's cell. `None` if the handle is stale.
    pub fn get(&self, handle: ObjectHandle) -> Option<ObjectCell> {
        self.live_slot(handle).and_then(|s| s.value.clone())
    }

    /// Allocated type of a live object.
    pub fn type_of(&self, handle: ObjectHandle) -> Option<TypeHash> {
        self.live_slot(handle).map(|s| s.type_hash)
    }

    /// Increment reference count.
    pub fn add_ref(&mut self, handle: ObjectHandle) -> bool {
        if let Some(slot) = self.slots.get_mut(handle.index as usize)
            && slot.generation == handle.generation
            && slot.value.is_some()
        {
            slot.ref_count = slot.ref_count.saturating_add(1);
            return true;
        }
        false
    }

    /// Decrement reference count; frees the slot at zero.
    ///
    /// Returns the object's cell when this call freed it, so the caller can run
    /// its destructor outside any borrow of the heap.
    pub fn release(&mut self, handle: ObjectHandle) -> Option<ObjectCell> {
        let slot = self.slots.get_mut(handle.index as usize)?;
        if slot.generation != handle.generation || slot.value.is_none() {
            return None;
        }
        slot.ref_count = slot.ref_count.saturating_sub(1);
        if slot.ref_count == 0 {
            self.take(handle.index)
        } else {
            None
        }
    }

    /// Free the object regardless of its reference count.
    pub fn free(&mut self, handle: ObjectHandle) -> Option<ObjectCell> {
        let slot = self.slots.get(handle.index as usize)?;
        if slot.generation != handle.generation || slot.value.is_none() {
            return None;
        }
        self.take(handle.index)
    }

    fn take(&mut self, index: u32) -> Option<ObjectCell> {
        let slot = &mut self.slots[index as usize];
        let cell = slot.value.take();
        slot.ref_count = 0;
        slot.generation = slot.generation.wrapping_add(1);
        self.free_list.push(index);
        cell
    }

    /// Reference count of a live object.
    pub fn ref_count(&self, handle: ObjectHandle) -> Option<u32> {
        self.live_slot(handle).map(|s| s.ref_count)
    }

    /// Handles of every live object, in slot order.
    pub fn live_handles(&self) -> Vec<ObjectHandle> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.value.is_some())
            .map(|(i, s)| ObjectHandle::new(i as u32, s.generation))
            .collect()
    }

    /// Number of live objects.
    pub fn live_count(&self) -> usize {
        self.slots.iter().filter(|s| s.value.is_some()).count()
    }
}

impl Default for ObjectHeap {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ObjectHeap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectHeap")
            .field("slot_count", &self.slots.len())
            .field("free_count", &self.free_list.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T: TypeHash = TypeHash::from_name("T");

    #[test]
    fn allocate_and_get() {
        let mut heap = ObjectHeap::new();
        let handle = heap.allocate(T, Box::new(42i32));

        let cell = heap.get(handle).unwrap();
        assert_eq!(cell.borrow().downcast_ref::<i32>(), Some(&42));
        assert_eq!(heap.type_of(handle), Some(T));
    }

    #[test]
    fn release_frees_at_zero() {
        let mut heap = ObjectHeap::new();
        let handle = heap.allocate(T, Box::new(1i32));
        assert!(heap.add_ref(handle));
        assert_eq!(heap.ref_count(handle), Some(2));

        assert!(heap.release(handle).is_none());
        assert!(heap.release(handle).is_some());
        assert!(!heap.is_live(handle));
        // Releasing a stale handle never frees twice.
        assert!(heap.release(handle).is_none());
    }

    #[test]
    fn stale_handle_after_reuse() {
        let mut heap = ObjectHeap::new();
        let old = heap.allocate(T, Box::new(1i32));
        heap.free(old);

        let new = heap.allocate(T, Box::new(2i32));
        assert_eq!(old.index, new.index);
        assert_ne!(old.generation, new.generation);
        assert!(heap.get(old).is_none());
        assert!(heap.get(new).is_some());
    }

    #[test]
    fn free_ignores_ref_count() {
        let mut heap = ObjectHeap::new();
        let handle = heap.allocate(T, Box::new(1i32));
        heap.add_ref(handle);
        assert!(heap.free(handle).is_some());
        assert!(heap.free(handle).is_none());
    }

    #[test]
    fn live_handles_lists_only_live() {
        let mut heap = ObjectHeap::new();
        let a = heap.allocate(T, Box::new(1i32));
        let b = heap.allocate(T, Box::new(2i32));
        heap.free(a);
        assert_eq!(heap.live_handles(), vec![b]);
        assert_eq!(heap.live_count(), 1);
    }
}
