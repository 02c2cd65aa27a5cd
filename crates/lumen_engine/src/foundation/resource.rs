//! RAII ownership for opaque native handles
//!
//! Vulkan hands out raw handles (`vk::Pipeline`, `vk::SurfaceKHR`, ...) that
//! must be destroyed exactly once, against the right device, before that
//! device goes away. [`ManagedResource`] pairs such a handle with its destroy
//! closure so cleanup happens on drop and cannot happen twice.

/// Single-owner wrapper around an opaque native handle.
///
/// Holds the handle, a designated "invalid" sentinel, and a cleanup closure.
/// Cleanup runs on drop or [`reset`](Self::reset) iff the handle differs from
/// the sentinel. Moves transfer ownership; there is no `Clone`.
pub struct ManagedResource<T: Copy + PartialEq> {
    value: T,
    invalid: T,
    cleanup: Option<Box<dyn FnMut(T)>>,
}

impl<T: Copy + PartialEq> ManagedResource<T> {
    /// Take ownership of `value`, destroying it with `cleanup` later.
    pub fn new(value: T, invalid: T, cleanup: impl FnMut(T) + 'static) -> Self {
        Self {
            value,
            invalid,
            cleanup: Some(Box::new(cleanup)),
        }
    }

    /// An empty wrapper holding only the invalid sentinel. Dropping it does
    /// nothing.
    pub fn empty(invalid: T) -> Self {
        Self {
            value: invalid,
            invalid,
            cleanup: None,
        }
    }

    /// The raw handle, for passing to native calls.
    ///
    /// The returned copy must not be used to extend the resource's lifetime.
    pub fn get(&self) -> T {
        self.value
    }

    /// True if a live resource is currently held.
    pub fn is_valid(&self) -> bool {
        self.value != self.invalid
    }

    /// Destroy the held resource now, if any. Safe to call repeatedly;
    /// cleanup runs at most once.
    pub fn reset(&mut self) {
        if let Some(mut cleanup) = self.cleanup.take() {
            if self.value != self.invalid {
                cleanup(self.value);
            }
        }
        self.value = self.invalid;
    }

    /// Hand ownership of the raw handle to the caller without cleanup.
    pub fn release(&mut self) -> T {
        let value = self.value;
        self.value = self.invalid;
        self.cleanup = None;
        value
    }
}

impl<T: Copy + PartialEq> Drop for ManagedResource<T> {
    fn drop(&mut self) {
        self.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    fn counting(counter: &Rc<Cell<u32>>) -> impl FnMut(u64) + 'static {
        let counter = Rc::clone(counter);
        move |_| counter.set(counter.get() + 1)
    }

    #[test]
    fn drop_invokes_cleanup_once() {
        let calls = Rc::new(Cell::new(0));
        {
            let _res = ManagedResource::new(7u64, 0, counting(&calls));
        }
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn reset_twice_cleans_up_at_most_once() {
        let calls = Rc::new(Cell::new(0));
        let mut res = ManagedResource::new(7u64, 0, counting(&calls));

        res.reset();
        res.reset();
        drop(res);

        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn invalid_sentinel_suppresses_cleanup() {
        let calls = Rc::new(Cell::new(0));
        {
            let _res = ManagedResource::new(0u64, 0, counting(&calls));
        }
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn release_skips_cleanup() {
        let calls = Rc::new(Cell::new(0));
        let mut res = ManagedResource::new(7u64, 0, counting(&calls));

        assert_eq!(res.release(), 7);
        assert!(!res.is_valid());
        drop(res);

        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn move_assign_destroys_destination_exactly_once() {
        let dst_calls = Rc::new(Cell::new(0));
        let src_calls = Rc::new(Cell::new(0));

        let mut slot = ManagedResource::new(1u64, 0, counting(&dst_calls));
        slot = ManagedResource::new(2u64, 0, counting(&src_calls));

        assert_eq!(dst_calls.get(), 1);
        assert_eq!(src_calls.get(), 0);
        assert_eq!(slot.get(), 2);

        drop(slot);
        assert_eq!(src_calls.get(), 1);
    }

    #[test]
    fn empty_holds_sentinel() {
        let res = ManagedResource::empty(u64::MAX);
        assert!(!res.is_valid());
        assert_eq!(res.get(), u64::MAX);
    }
}
