// This module tracks request handles across the lifetime of non-blocking
// operations. A handle is allocated when an operation starts and must be
// reset to the null handle the moment the native layer reports completion by
// writing its null request into the slot, including per-element inside the
// array-valued wait/test calls where only a subset completes. A native
// completion that is not reflected here would leave a stale handle aliasing
// recycled native state, which is the one failure mode this component exists
// to prevent.

//! Request lifecycle tracking.

use log::trace;

use super::constants::{HandleKind, Request, REQUEST_NULL, REQUEST_VOLATILE_OFFSET};
use super::error::ShimResult;
use super::pool::{HandlePool, DEFAULT_POOL_CAPACITY};

/// Pool of request handles with completion-driven invalidation.
#[derive(Debug)]
pub struct RequestTracker<Q: Copy + PartialEq> {
    pool: HandlePool<Q>,
    null: Q,
}

impl<Q: Copy + PartialEq> RequestTracker<Q> {
    /// Create the tracker; `null` is the native null-request value.
    pub fn new(null: Q) -> Self {
        let mut pool = HandlePool::new(
            HandleKind::Request,
            REQUEST_VOLATILE_OFFSET,
            DEFAULT_POOL_CAPACITY,
        );
        pool.register_static(REQUEST_NULL, null);
        Self { pool, null }
    }

    /// Allocate a handle for a freshly initiated operation.
    pub fn start(&mut self, native: Q) -> Request {
        let handle = self.pool.allocate(native);
        trace!("request {handle} started");
        handle
    }

    /// Native value currently bound to `handle`.
    ///
    /// The null handle maps to the native null request.
    pub fn lookup(&self, handle: Request) -> ShimResult<Q> {
        self.pool.lookup(handle)
    }

    /// Native values for a whole handle array.
    pub fn lookup_array(&self, handles: &[Request]) -> ShimResult<Vec<Q>> {
        handles.iter().map(|&h| self.lookup(h)).collect()
    }

    /// Write back a native value mutated in place (persistent-request start).
    pub fn update(&mut self, handle: Request, native: Q) -> ShimResult<()> {
        self.pool.update(handle, native)
    }

    /// Reflect the outcome of a single-request native wait/test call.
    ///
    /// If the native layer nulled the request, the slot is freed and the
    /// handle reset to [`REQUEST_NULL`]; otherwise the (possibly mutated)
    /// native value is written back and the handle stays bound. Completing an
    /// already-null handle is a no-op.
    pub fn complete_one(&mut self, handle: &mut Request, native_after: Q) -> ShimResult<()> {
        if *handle == REQUEST_NULL {
            return Ok(());
        }
        if native_after == self.null {
            self.pool.release(*handle)?;
            trace!("request {} completed, handle reset", *handle);
            *handle = REQUEST_NULL;
        } else {
            self.pool.update(*handle, native_after)?;
        }
        Ok(())
    }

    /// Reflect a waitall/testall-style outcome across a whole array.
    pub fn complete_array(&mut self, handles: &mut [Request], natives_after: &[Q]) -> ShimResult<()> {
        debug_assert_eq!(handles.len(), natives_after.len());
        for (handle, &native) in handles.iter_mut().zip(natives_after) {
            self.complete_one(handle, native)?;
        }
        Ok(())
    }

    /// Reflect a waitsome/testsome-style outcome.
    ///
    /// Only the elements named by `indices` may have completed; all other
    /// handles keep their existing binding untouched.
    pub fn complete_indexed(
        &mut self,
        handles: &mut [Request],
        natives_after: &[Q],
        indices: &[i32],
    ) -> ShimResult<()> {
        for &i in indices {
            let i = i as usize;
            self.complete_one(&mut handles[i], natives_after[i])?;
        }
        Ok(())
    }

    /// Explicitly drop a request handle (request-free semantics).
    ///
    /// The caller has already released the native request.
    pub fn invalidate(&mut self, handle: &mut Request) -> ShimResult<()> {
        self.pool.release(*handle)?;
        *handle = REQUEST_NULL;
        Ok(())
    }

    /// Requests currently outstanding.
    pub fn outstanding(&self) -> usize {
        self.pool.in_use()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NULL: u64 = 0;

    #[test]
    fn test_complete_one_resets_on_null_transition() {
        let mut t = RequestTracker::new(NULL);
        let mut h = t.start(50);
        t.complete_one(&mut h, NULL).unwrap();
        assert_eq!(h, REQUEST_NULL);
        assert_eq!(t.outstanding(), 0);
    }

    #[test]
    fn test_complete_one_keeps_binding_when_incomplete() {
        let mut t = RequestTracker::new(NULL);
        let mut h = t.start(50);
        // Native layer mutated the request in place but did not complete it.
        t.complete_one(&mut h, 51).unwrap();
        assert_ne!(h, REQUEST_NULL);
        assert_eq!(t.lookup(h).unwrap(), 51);
    }

    #[test]
    fn test_complete_null_handle_is_noop() {
        let mut t = RequestTracker::new(NULL);
        let mut h = REQUEST_NULL;
        t.complete_one(&mut h, NULL).unwrap();
        assert_eq!(h, REQUEST_NULL);
    }

    #[test]
    fn test_partial_array_completion() {
        let mut t = RequestTracker::new(NULL);
        let mut handles = [t.start(10), t.start(11), t.start(12)];
        let kept = handles[1];
        // Only the first and last completed.
        let after = [NULL, 11, NULL];
        t.complete_array(&mut handles, &after).unwrap();
        assert_eq!(handles[0], REQUEST_NULL);
        assert_eq!(handles[1], kept);
        assert_eq!(handles[2], REQUEST_NULL);
        assert_eq!(t.outstanding(), 1);
        assert_eq!(t.lookup(kept).unwrap(), 11);
    }

    #[test]
    fn test_indexed_completion_leaves_others_untouched() {
        let mut t = RequestTracker::new(NULL);
        let mut handles = [t.start(10), t.start(11), t.start(12)];
        let mut after = [10, 11, 12];
        after[2] = NULL;
        t.complete_indexed(&mut handles, &after, &[2]).unwrap();
        assert_ne!(handles[0], REQUEST_NULL);
        assert_ne!(handles[1], REQUEST_NULL);
        assert_eq!(handles[2], REQUEST_NULL);
    }

    #[test]
    fn test_null_lookup_gives_native_null() {
        let t = RequestTracker::new(NULL);
        assert_eq!(t.lookup(REQUEST_NULL).unwrap(), NULL);
    }

    #[test]
    fn test_invalidate_frees_slot_for_reuse() {
        let mut t = RequestTracker::new(NULL);
        let mut h = t.start(10);
        let slot = h;
        t.invalidate(&mut h).unwrap();
        assert_eq!(h, REQUEST_NULL);
        assert_eq!(t.start(20), slot);
    }
}
