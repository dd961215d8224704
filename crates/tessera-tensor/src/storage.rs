//! Arc-based storage management for zero-copy views and efficient sharing.
//!
//! This module provides the buffer shared by every handle of a tensor. `Arc`
//! reference counting makes handle clones cheap and lets sub-spaces point at a
//! window of the same memory.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::TensorError;

/// Acquires a read guard, recovering the data if a writer panicked.
pub(crate) fn read_lock<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

/// Acquires a write guard, recovering the data if a writer panicked.
pub(crate) fn write_lock<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

/// A contiguous sub-range of the shared buffer, in elements.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Window {
    offset: usize,
    len: usize,
}

/// Arc-based tensor storage enabling zero-copy views and efficient sharing.
///
/// Cloning a `TensorStorage` only increments a reference count: both clones
/// read and write the same elements. A storage created with
/// [`TensorStorage::view`] covers a fixed window of its parent buffer and can
/// not be resized.
///
/// # Thread Safety
///
/// The buffer sits behind a `RwLock` so that shared handles can be read from
/// several worker threads at once. The lock does not make multi-step updates
/// atomic: callers must not mutate a buffer through one handle while iterating
/// it through another.
pub struct TensorStorage<T> {
    /// Reference-counted buffer.
    inner: Arc<RwLock<Vec<T>>>,
    /// The window of `inner` visible through this handle, if any.
    window: Option<Window>,
}

impl<T> TensorStorage<T> {
    /// Creates a new storage owning the given vector.
    pub fn from_vec(data: Vec<T>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(data)),
            window: None,
        }
    }

    /// Returns the number of elements visible from this handle.
    pub fn len(&self) -> usize {
        match self.window {
            Some(w) => w.len,
            None => read_lock(&self.inner).len(),
        }
    }

    /// Returns true if no elements are visible from this handle.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the offset of this handle into the shared buffer, in elements.
    #[inline]
    pub fn offset(&self) -> usize {
        self.window.map_or(0, |w| w.offset)
    }

    /// Returns true if this storage is a fixed window into another buffer.
    #[inline]
    pub fn is_view(&self) -> bool {
        self.window.is_some()
    }

    /// Returns true if no other handle references the buffer.
    #[inline]
    pub fn is_unique(&self) -> bool {
        Arc::strong_count(&self.inner) == 1
    }

    /// Returns true if both handles reference the same buffer.
    #[inline]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Runs `f` with the visible elements as a slice.
    ///
    /// # Panics
    ///
    /// Panics if the parent buffer shrank below this handle's window.
    pub fn read<R>(&self, f: impl FnOnce(&[T]) -> R) -> R {
        let guard = read_lock(&self.inner);
        match self.window {
            Some(w) => f(&guard[w.offset..w.offset + w.len]),
            None => f(&guard),
        }
    }

    /// Runs `f` with the visible elements as a mutable slice.
    ///
    /// # Panics
    ///
    /// Panics if the parent buffer shrank below this handle's window.
    pub fn write<R>(&self, f: impl FnOnce(&mut [T]) -> R) -> R {
        let mut guard = write_lock(&self.inner);
        match self.window {
            Some(w) => f(&mut guard[w.offset..w.offset + w.len]),
            None => f(&mut guard),
        }
    }

    /// Resizes the buffer to `len` elements, filling new slots with `fill`.
    ///
    /// Existing elements are kept, and the allocation is kept when shrinking so
    /// that repeatedly shrinking and regrowing does not reallocate.
    ///
    /// A call that keeps the current length is a no-op, also on a window.
    ///
    /// # Panics
    ///
    /// Panics if this storage is a window into another buffer and `len`
    /// differs from the window length.
    pub fn resize_with(&self, len: usize, fill: impl FnMut() -> T) {
        if len == self.len() {
            return;
        }
        assert!(
            self.window.is_none(),
            "cannot resize a sub-space view; materialize it with clone_values() first"
        );
        write_lock(&self.inner).resize_with(len, fill);
    }

    /// Creates a new view into this storage with the specified offset and length.
    ///
    /// This is a zero-copy operation that creates a new `TensorStorage` pointing
    /// to a subset of the underlying memory.
    ///
    /// # Arguments
    ///
    /// * `offset` - Offset in elements, relative to this handle.
    /// * `len` - Length in elements.
    ///
    /// # Errors
    ///
    /// Returns an error if `offset + len` exceeds the visible elements.
    pub fn view(&self, offset: usize, len: usize) -> Result<Self, TensorError> {
        let visible = self.len();
        let end = offset + len;
        if end > visible {
            return Err(TensorError::index_out_of_bounds(end, visible));
        }
        Ok(Self {
            inner: Arc::clone(&self.inner),
            window: Some(Window {
                offset: self.offset() + offset,
                len,
            }),
        })
    }
}

impl<T: Clone> TensorStorage<T> {
    /// Returns the element at flat index `i`.
    ///
    /// # Panics
    ///
    /// Panics if `i` is out of range.
    #[inline]
    pub fn get(&self, i: usize) -> T {
        self.read(|s| s[i].clone())
    }

    /// Sets the element at flat index `i`.
    ///
    /// # Panics
    ///
    /// Panics if `i` is out of range.
    #[inline]
    pub fn set(&self, i: usize, value: T) {
        self.write(|s| s[i] = value)
    }

    /// Copies the visible elements into a new vector.
    pub fn to_vec(&self) -> Vec<T> {
        self.read(|s| s.to_vec())
    }

    /// Copies the range `[from, from + n)` into a new vector.
    pub fn range_to_vec(&self, from: usize, n: usize) -> Vec<T> {
        self.read(|s| s[from..from + n].to_vec())
    }

    /// Creates a storage with its own buffer holding a copy of the visible elements.
    pub fn deep_clone(&self) -> Self {
        Self::from_vec(self.to_vec())
    }
}

impl<T> Clone for TensorStorage<T> {
    /// Creates a cheap clone by incrementing the Arc reference count.
    ///
    /// This is a O(1) operation that doesn't copy the underlying data.
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            window: self.window,
        }
    }
}

impl<T> std::fmt::Debug for TensorStorage<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TensorStorage")
            .field("len", &self.len())
            .field("offset", &self.offset())
            .field("is_view", &self.is_view())
            .field("is_unique", &self.is_unique())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_from_vec() {
        let storage = TensorStorage::from_vec(vec![1, 2, 3, 4, 5]);
        assert_eq!(storage.len(), 5);
        assert!(!storage.is_empty());
        assert!(storage.is_unique());
        assert_eq!(storage.to_vec(), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_storage_cheap_clone_shares_data() {
        let storage1 = TensorStorage::from_vec(vec![1, 2, 3]);
        let storage2 = storage1.clone();
        assert!(!storage1.is_unique());
        assert!(storage1.ptr_eq(&storage2));

        storage2.set(0, 10);
        assert_eq!(storage1.get(0), 10);
    }

    #[test]
    fn test_storage_view() -> Result<(), TensorError> {
        let storage = TensorStorage::from_vec(vec![1, 2, 3, 4, 5]);
        let view = storage.view(1, 3)?;
        assert_eq!(view.to_vec(), vec![2, 3, 4]);
        assert_eq!(view.offset(), 1);
        assert!(view.is_view());

        view.set(0, 20);
        assert_eq!(storage.get(1), 20);

        let nested = view.view(1, 2)?;
        assert_eq!(nested.offset(), 2);
        assert_eq!(nested.to_vec(), vec![3, 4]);
        Ok(())
    }

    #[test]
    fn test_storage_view_same_len_resize() -> Result<(), TensorError> {
        let storage = TensorStorage::from_vec(vec![1, 2, 3, 4]);
        let view = storage.view(2, 2)?;
        view.resize_with(2, || 0);
        assert_eq!(view.to_vec(), vec![3, 4]);
        assert_eq!(storage.len(), 4);
        Ok(())
    }

    #[test]
    #[should_panic(expected = "cannot resize a sub-space view")]
    fn test_storage_view_grow_panics() {
        let storage = TensorStorage::from_vec(vec![1, 2, 3, 4]);
        if let Ok(view) = storage.view(2, 2) {
            view.resize_with(3, || 0);
        }
    }

    #[test]
    fn test_storage_view_out_of_bounds() {
        let storage = TensorStorage::from_vec(vec![1, 2, 3]);
        let res = storage.view(2, 2);
        assert_eq!(res.err(), Some(TensorError::index_out_of_bounds(4, 3)));
    }

    #[test]
    fn test_storage_resize_keeps_data() {
        let storage = TensorStorage::from_vec(vec![1, 2, 3]);
        storage.resize_with(5, || 0);
        assert_eq!(storage.to_vec(), vec![1, 2, 3, 0, 0]);
        storage.resize_with(0, || 0);
        assert!(storage.is_empty());
        storage.resize_with(2, || 7);
        assert_eq!(storage.to_vec(), vec![7, 7]);
    }

    #[test]
    #[should_panic(expected = "cannot resize a sub-space")]
    fn test_storage_resize_view_panics() {
        let storage = TensorStorage::from_vec(vec![1, 2, 3]);
        if let Ok(view) = storage.view(0, 2) {
            view.resize_with(4, || 0);
        }
    }
}
