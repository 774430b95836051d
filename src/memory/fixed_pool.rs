//! Fixed-size object pool
//!
//! Preallocated slots with an index free list. Acquire and release never
//! touch the heap after construction.

use std::fmt;
use std::marker::PhantomData;

/// Handle to an occupied pool slot
///
/// Typed by the pooled record so a handle from a `FixedSizePool<A, _>`
/// cannot be released into a `FixedSizePool<B, _>`.
pub struct PoolHandle<T> {
    index: u32,
    _marker: PhantomData<fn() -> T>,
}

impl<T> PoolHandle<T> {
    fn new(index: u32) -> Self {
        Self {
            index,
            _marker: PhantomData,
        }
    }

    /// Slot index inside the pool
    pub fn index(&self) -> u32 {
        self.index
    }
}

// Manual impls: derives would require T: Clone/PartialEq/Debug
impl<T> Clone for PoolHandle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for PoolHandle<T> {}

impl<T> PartialEq for PoolHandle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
    }
}

impl<T> Eq for PoolHandle<T> {}

impl<T> fmt::Debug for PoolHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PoolHandle({})", self.index)
    }
}

/// Pool of `N` preallocated `T` slots
///
/// Invariant: `allocated_count() + free_count() == N`.
pub struct FixedSizePool<T, const N: usize> {
    slots: Box<[T]>,
    /// Stack of free slot indices (top = next to hand out)
    free: Vec<u32>,
    occupied: Box<[bool]>,
}

impl<T: Default + Clone, const N: usize> FixedSizePool<T, N> {
    /// Create a pool with all `N` slots free
    pub fn new() -> Self {
        assert!(N <= u32::MAX as usize, "pool capacity must fit in u32");

        // Reverse so slot 0 is handed out first
        let free: Vec<u32> = (0..N as u32).rev().collect();

        Self {
            slots: vec![T::default(); N].into_boxed_slice(),
            free,
            occupied: vec![false; N].into_boxed_slice(),
        }
    }
}

impl<T: Default + Clone, const N: usize> Default for FixedSizePool<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, const N: usize> FixedSizePool<T, N> {
    /// Take a free slot, or `None` when every slot is in use
    pub fn acquire(&mut self) -> Option<PoolHandle<T>> {
        let index = self.free.pop()?;
        self.occupied[index as usize] = true;
        Some(PoolHandle::new(index))
    }

    /// Take a free slot and store `value` in it
    pub fn acquire_with(&mut self, value: T) -> Option<PoolHandle<T>> {
        let handle = self.acquire()?;
        self.slots[handle.index as usize] = value;
        Some(handle)
    }

    /// Return a slot to the free list
    ///
    /// Returns `false` (and changes nothing) if the slot is not allocated,
    /// which catches double releases.
    pub fn release(&mut self, handle: PoolHandle<T>) -> bool {
        let index = handle.index as usize;
        if index >= N || !self.occupied[index] {
            return false;
        }

        self.occupied[index] = false;
        self.free.push(handle.index);
        true
    }

    /// Rebuild a handle for a slot index stored elsewhere (e.g. a cold record)
    pub fn handle_at(&self, index: u32) -> Option<PoolHandle<T>> {
        if (index as usize) < N && self.occupied[index as usize] {
            Some(PoolHandle::new(index))
        } else {
            None
        }
    }

    pub fn get(&self, handle: PoolHandle<T>) -> Option<&T> {
        if self.is_allocated(handle.index) {
            self.slots.get(handle.index as usize)
        } else {
            None
        }
    }

    pub fn get_mut(&mut self, handle: PoolHandle<T>) -> Option<&mut T> {
        if self.is_allocated(handle.index) {
            self.slots.get_mut(handle.index as usize)
        } else {
            None
        }
    }

    /// Iterate over `(index, record)` for every allocated slot
    pub fn iter_allocated(&self) -> impl Iterator<Item = (u32, &T)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(move |(i, _)| self.occupied[*i])
            .map(|(i, slot)| (i as u32, slot))
    }

    /// Mark every slot free again
    pub fn reset(&mut self) {
        self.free.clear();
        self.free.extend((0..N as u32).rev());
        self.occupied.iter_mut().for_each(|o| *o = false);
    }

    fn is_allocated(&self, index: u32) -> bool {
        (index as usize) < N && self.occupied[index as usize]
    }

    pub fn capacity(&self) -> usize {
        N
    }

    pub fn free_count(&self) -> usize {
        self.free.len()
    }

    pub fn allocated_count(&self) -> usize {
        N - self.free.len()
    }

    pub fn is_full(&self) -> bool {
        self.free.is_empty()
    }
}

impl<T, const N: usize> fmt::Debug for FixedSizePool<T, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FixedSizePool")
            .field("capacity", &N)
            .field("allocated", &self.allocated_count())
            .finish()
    }
}
