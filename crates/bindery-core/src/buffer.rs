//! Shared byte storage aliased across the boundary.

use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

/// A view into shared byte storage.
///
/// Models both a whole buffer (`ArrayBuffer`, Node `Buffer`) and a typed-array
/// view over part of one (`new Uint8Array(buf, 2, 12)`, `view.subarray(2, 12)`).
/// Cloning a view shares the storage; native code receiving a view mutates the
/// caller's bytes in place.
#[derive(Clone)]
pub struct BufferView {
    storage: Rc<RefCell<Vec<u8>>>,
    offset: usize,
    len: usize,
}

impl BufferView {
    /// Allocate a zeroed buffer of `len` bytes.
    pub fn new(len: usize) -> Self {
        Self::from_vec(vec![0; len])
    }

    /// Take ownership of existing bytes as a whole-buffer view.
    pub fn from_vec(bytes: Vec<u8>) -> Self {
        let len = bytes.len();
        Self {
            storage: Rc::new(RefCell::new(bytes)),
            offset: 0,
            len,
        }
    }

    /// A view of `len` bytes starting at `offset` into this view.
    ///
    /// Out-of-range requests are clamped to the end of this view.
    pub fn view(&self, offset: usize, len: usize) -> Self {
        let offset = offset.min(self.len);
        let len = len.min(self.len - offset);
        Self {
            storage: Rc::clone(&self.storage),
            offset: self.offset + offset,
            len,
        }
    }

    /// A view of `[start, end)` within this view (typed-array `subarray`).
    pub fn subarray(&self, start: usize, end: usize) -> Self {
        self.view(start, end.saturating_sub(start))
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Borrow the viewed bytes.
    ///
    /// # Panics
    ///
    /// Panics if the storage is mutably borrowed.
    pub fn bytes(&self) -> Ref<'_, [u8]> {
        Ref::map(self.storage.borrow(), |v| &v[self.offset..self.offset + self.len])
    }

    /// Mutably borrow the viewed bytes, or `None` if the storage is in use.
    pub fn try_bytes_mut(&self) -> Option<RefMut<'_, [u8]>> {
        let guard = self.storage.try_borrow_mut().ok()?;
        let (start, end) = (self.offset, self.offset + self.len);
        Some(RefMut::map(guard, |v| &mut v[start..end]))
    }

    /// Copy the viewed bytes out.
    pub fn to_vec(&self) -> Vec<u8> {
        self.bytes().to_vec()
    }

    /// Whether two views share backing storage.
    pub fn shares_storage(&self, other: &BufferView) -> bool {
        Rc::ptr_eq(&self.storage, &other.storage)
    }
}

impl fmt::Debug for BufferView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferView")
            .field("offset", &self.offset)
            .field("len", &self.len)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counting(len: u8) -> BufferView {
        BufferView::from_vec((0..len).collect())
    }

    #[test]
    fn subarray_and_view_offsets() {
        let buf = counting(16);
        let sub = buf.subarray(2, 12);
        assert_eq!(sub.len(), 10);
        assert_eq!(sub.bytes().iter().map(|&b| b as u32).sum::<u32>(), 65);

        let view = buf.view(2, 12);
        assert_eq!(view.bytes().iter().map(|&b| b as u32).sum::<u32>(), 90);
    }

    #[test]
    fn mutation_through_view_is_shared() {
        let buf = counting(4);
        let view = buf.view(1, 2);
        for b in view.try_bytes_mut().unwrap().iter_mut() {
            *b *= 10;
        }
        assert_eq!(buf.to_vec(), vec![0, 10, 20, 3]);
        assert!(view.shares_storage(&buf));
    }

    #[test]
    fn out_of_range_views_clamp() {
        let buf = counting(4);
        assert_eq!(buf.view(3, 10).len(), 1);
        assert!(buf.view(9, 1).is_empty());
        assert!(buf.subarray(3, 1).is_empty());
    }

    #[test]
    fn nested_view_is_relative() {
        let buf = counting(10);
        let nested = buf.view(2, 6).view(1, 2);
        assert_eq!(nested.offset(), 3);
        assert_eq!(nested.to_vec(), vec![3, 4]);
    }
}
