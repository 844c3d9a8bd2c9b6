// This module implements the generic handle pool: a growable, index-addressable
// mapping from small integer handles to native opaque values, one pool per
// object kind. Slots below the kind's volatile offset are reserved for
// predefined objects registered once at initialization; allocation scans from
// the volatile offset, reusing freed slots first and doubling the backing
// array when the pool is full. Slot occupancy is an explicit sum type rather
// than a sentinel comparison, so a native value can never collide with the
// "free" marker. Handles stay valid across growth because addressing is by
// index, never by pointer.

//! Growable handle pools with slot reuse.

use log::debug;

use super::constants::HandleKind;
use super::error::{ShimError, ShimResult};

/// Initial slot count for most pools.
pub const DEFAULT_POOL_CAPACITY: usize = 100;

/// Occupancy state of one pool slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot<T> {
    /// Slot is available for allocation.
    Free,
    /// Slot holds a native value.
    Bound(T),
}

/// Handle pool for one object kind.
///
/// Maps `i32` handles to native values of type `T`. Handle 0 and the rest of
/// the static range `0..volatile_offset` belong to predefined objects; the
/// dynamic path never touches them.
#[derive(Debug)]
pub struct HandlePool<T> {
    kind: HandleKind,
    slots: Vec<Slot<T>>,
    volatile_offset: usize,
    /// Volatile slots currently bound.
    in_use: usize,
    /// Number of growth events, for diagnostics.
    growths: u32,
}

impl<T: Copy> HandlePool<T> {
    /// Create an empty pool with all slots free.
    ///
    /// `initial_capacity` must exceed the static range so the first dynamic
    /// allocation has somewhere to land.
    pub fn new(kind: HandleKind, volatile_offset: usize, initial_capacity: usize) -> Self {
        assert!(
            initial_capacity > volatile_offset,
            "pool capacity must exceed the static handle range"
        );
        let mut slots = Vec::with_capacity(initial_capacity);
        slots.resize_with(initial_capacity, || Slot::Free);
        Self {
            kind,
            slots,
            volatile_offset,
            in_use: 0,
            growths: 0,
        }
    }

    /// Bind a predefined object to a handle in the static range.
    ///
    /// Called once per well-known handle during initialization. Misuse is a
    /// startup programming error, not a runtime condition.
    pub fn register_static(&mut self, handle: i32, native: T) {
        let idx = handle as usize;
        assert!(
            handle >= 0 && idx < self.volatile_offset,
            "static {} handle {} outside the reserved range",
            self.kind,
            handle
        );
        assert!(
            matches!(self.slots[idx], Slot::Free),
            "static {} handle {} registered twice",
            self.kind,
            handle
        );
        self.slots[idx] = Slot::Bound(native);
    }

    /// Native value bound to `handle`.
    pub fn lookup(&self, handle: i32) -> ShimResult<T> {
        match self.slot(handle)? {
            Slot::Bound(native) => Ok(native),
            Slot::Free => Err(self.invalid(handle)),
        }
    }

    /// Rebind an already-bound handle to a new native value.
    ///
    /// Used when the native layer mutates an object in place (requests during
    /// completion calls).
    pub fn update(&mut self, handle: i32, native: T) -> ShimResult<()> {
        let idx = self.bound_index(handle)?;
        self.slots[idx] = Slot::Bound(native);
        Ok(())
    }

    /// Bind `native` to the first free volatile slot, growing if needed.
    ///
    /// Previously issued handles remain valid and unchanged after growth.
    pub fn allocate(&mut self, native: T) -> i32 {
        let free = self.slots[self.volatile_offset..]
            .iter()
            .position(|s| matches!(s, Slot::Free));
        let slot = match free {
            Some(offset) => self.volatile_offset + offset,
            None => self.grow(),
        };
        self.slots[slot] = Slot::Bound(native);
        self.in_use += 1;
        slot as i32
    }

    /// Release a volatile handle back to the pool.
    ///
    /// The caller must already have released the corresponding native value.
    /// Releasing a static handle or a slot that is already free is an error.
    pub fn release(&mut self, handle: i32) -> ShimResult<()> {
        if handle >= 0 && (handle as usize) < self.volatile_offset {
            return Err(ShimError::StaticHandle {
                kind: self.kind,
                handle,
            });
        }
        let idx = self.bound_index(handle)?;
        self.slots[idx] = Slot::Free;
        self.in_use -= 1;
        Ok(())
    }

    /// Whether `handle` currently holds a native value.
    pub fn is_bound(&self, handle: i32) -> bool {
        matches!(self.slot(handle), Ok(Slot::Bound(_)))
    }

    /// Whether `handle` lies in the reserved static range.
    pub fn is_static(&self, handle: i32) -> bool {
        handle >= 0 && (handle as usize) < self.volatile_offset
    }

    /// Reject handles in the static range before a destructive operation.
    pub fn ensure_volatile(&self, handle: i32) -> ShimResult<()> {
        if self.is_static(handle) {
            return Err(ShimError::StaticHandle {
                kind: self.kind,
                handle,
            });
        }
        Ok(())
    }

    /// Current slot count.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Volatile slots currently bound.
    pub fn in_use(&self) -> usize {
        self.in_use
    }

    /// Number of times the pool has grown.
    pub fn growth_count(&self) -> u32 {
        self.growths
    }

    /// Double the slot array, returning the first newly added index.
    fn grow(&mut self) -> usize {
        let old = self.slots.len();
        self.slots.resize_with(old * 2, || Slot::Free);
        self.growths += 1;
        debug!(
            "{} pool grown from {} to {} slots",
            self.kind,
            old,
            self.slots.len()
        );
        old
    }

    fn slot(&self, handle: i32) -> ShimResult<Slot<T>> {
        if handle < 0 {
            return Err(self.invalid(handle));
        }
        self.slots
            .get(handle as usize)
            .copied()
            .ok_or_else(|| self.invalid(handle))
    }

    fn bound_index(&self, handle: i32) -> ShimResult<usize> {
        match self.slot(handle)? {
            Slot::Bound(_) => Ok(handle as usize),
            Slot::Free => Err(self.invalid(handle)),
        }
    }

    fn invalid(&self, handle: i32) -> ShimError {
        ShimError::InvalidHandle {
            kind: self.kind,
            handle,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool() -> HandlePool<u64> {
        HandlePool::new(HandleKind::Datatype, 4, 8)
    }

    #[test]
    fn test_allocate_starts_at_volatile_offset() {
        let mut p = pool();
        assert_eq!(p.allocate(100), 4);
        assert_eq!(p.allocate(200), 5);
        assert_eq!(p.lookup(4).unwrap(), 100);
        assert_eq!(p.lookup(5).unwrap(), 200);
    }

    #[test]
    fn test_allocate_reuses_freed_slot() {
        let mut p = pool();
        let a = p.allocate(1);
        let b = p.allocate(2);
        let c = p.allocate(3);
        p.release(b).unwrap();
        // The freed middle slot is reused before the pool extends.
        assert_eq!(p.allocate(4), b);
        assert_eq!(p.lookup(a).unwrap(), 1);
        assert_eq!(p.lookup(c).unwrap(), 3);
    }

    #[test]
    fn test_handles_unique_while_in_use() {
        let mut p = pool();
        let mut live = Vec::new();
        for i in 0..20 {
            live.push(p.allocate(i));
        }
        let mut sorted = live.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), live.len());
    }

    #[test]
    fn test_growth_preserves_existing_handles() {
        let mut p = pool();
        let handles: Vec<i32> = (0..4).map(|i| p.allocate(i as u64 * 11)).collect();
        assert_eq!(p.capacity(), 8);
        // Pool is full; next allocation must grow.
        let extra = p.allocate(999);
        assert_eq!(p.capacity(), 16);
        assert_eq!(p.growth_count(), 1);
        assert_eq!(extra, 8);
        for (i, &h) in handles.iter().enumerate() {
            assert_eq!(p.lookup(h).unwrap(), i as u64 * 11);
        }
    }

    #[test]
    fn test_lookup_free_slot_is_invalid() {
        let p = pool();
        assert_eq!(
            p.lookup(5),
            Err(ShimError::InvalidHandle {
                kind: HandleKind::Datatype,
                handle: 5
            })
        );
    }

    #[test]
    fn test_lookup_out_of_range_is_invalid() {
        let p = pool();
        assert!(p.lookup(-1).is_err());
        assert!(p.lookup(1000).is_err());
    }

    #[test]
    fn test_double_release_is_invalid() {
        let mut p = pool();
        let h = p.allocate(7);
        p.release(h).unwrap();
        assert!(p.release(h).is_err());
    }

    #[test]
    fn test_release_static_is_rejected() {
        let mut p = pool();
        p.register_static(1, 42);
        assert_eq!(
            p.release(1),
            Err(ShimError::StaticHandle {
                kind: HandleKind::Datatype,
                handle: 1
            })
        );
    }

    #[test]
    fn test_static_registration_and_lookup() {
        let mut p = pool();
        p.register_static(0, 0);
        p.register_static(2, 77);
        assert_eq!(p.lookup(2).unwrap(), 77);
        // Static slots never participate in allocation.
        assert_eq!(p.allocate(5), 4);
    }

    #[test]
    #[should_panic]
    fn test_static_double_registration_panics() {
        let mut p = pool();
        p.register_static(1, 1);
        p.register_static(1, 2);
    }
}
