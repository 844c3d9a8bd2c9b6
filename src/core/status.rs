// This module implements the status translator: bit-exact conversion between
// the native runtime's status record and the shim's fixed-layout one. The shim
// record exposes source, tag and error to the caller and carries the complete
// native byte image in an opaque region, so calls that re-submit a status to
// the native layer (count queries and the like) recover the original record
// exactly. The opaque capacity is validated against the native status size
// once, at session initialization.

//! Status-record translation between the two ABIs.

use std::mem;
use std::ptr;

use super::constants::STATUS_OPAQUE_BYTES;
use super::error::{ShimError, ShimResult};
use crate::runtime::NativeRuntime;

/// The shim's fixed-layout status record.
///
/// Layout is ABI-stable for the whole process lifetime: three named `i32`
/// fields followed by an opaque region sized by
/// [`STATUS_OPAQUE_BYTES`](crate::core::constants::STATUS_OPAQUE_BYTES). The
/// opaque region is never interpreted by the shim itself.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct Status {
    pub source: i32,
    pub tag: i32,
    pub error: i32,
    opaque: [u8; STATUS_OPAQUE_BYTES],
}

impl Status {
    /// A zeroed status, used before the native layer fills one in.
    pub fn empty() -> Self {
        Self {
            source: 0,
            tag: 0,
            error: 0,
            opaque: [0; STATUS_OPAQUE_BYTES],
        }
    }
}

impl Default for Status {
    fn default() -> Self {
        Self::empty()
    }
}

impl std::fmt::Debug for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Status")
            .field("source", &self.source)
            .field("tag", &self.tag)
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}

/// Verify the opaque region can hold a native status of `native_size` bytes.
///
/// Called once at session initialization. Failure is a configuration defect
/// of the build against this runtime, not a runtime condition.
pub fn check_capacity(native_size: usize) -> ShimResult<()> {
    if native_size > STATUS_OPAQUE_BYTES {
        return Err(ShimError::StatusCapacity {
            native: native_size,
            capacity: STATUS_OPAQUE_BYTES,
        });
    }
    Ok(())
}

/// Convert a native status into a shim status.
///
/// The three named fields are copied through the runtime's accessors and the
/// full native record is retained byte-for-byte in the opaque region.
pub fn to_shim<R: NativeRuntime>(native: &R::Status) -> Status {
    let mut out = Status::empty();
    out.source = R::status_source(native);
    out.tag = R::status_tag(native);
    out.error = R::status_error(native);
    let size = mem::size_of::<R::Status>();
    debug_assert!(size <= STATUS_OPAQUE_BYTES);
    // SAFETY: capacity was checked at initialization; R::Status is plain old
    // data per the NativeRuntime contract, so a raw byte copy of the whole
    // record is well defined.
    unsafe {
        ptr::copy_nonoverlapping(
            (native as *const R::Status).cast::<u8>(),
            out.opaque.as_mut_ptr(),
            size,
        );
    }
    out
}

/// Recover the native status held in a shim status's opaque region.
///
/// Always a byte-for-byte copy; there is no aliasing shortcut here because the
/// shim record owns its opaque bytes.
pub fn to_native<R: NativeRuntime>(status: &Status) -> R::Status {
    debug_assert!(mem::size_of::<R::Status>() <= STATUS_OPAQUE_BYTES);
    // SAFETY: the opaque region is at least as large as R::Status (checked at
    // initialization) and R::Status is plain old data, so every bit pattern,
    // including a never-filled zeroed region, is a valid value.
    unsafe { ptr::read_unaligned(status.opaque.as_ptr().cast::<R::Status>()) }
}

/// Element-wise [`to_shim`] over a sequence.
///
/// Each element converts independently; `out` and `natives` must be the same
/// length.
pub fn to_shim_array<R: NativeRuntime>(natives: &[R::Status], out: &mut [Status]) {
    debug_assert_eq!(natives.len(), out.len());
    for (dst, src) in out.iter_mut().zip(natives) {
        *dst = to_shim::<R>(src);
    }
}

/// Element-wise [`to_native`] over a sequence.
pub fn to_native_array<R: NativeRuntime>(statuses: &[Status]) -> Vec<R::Status> {
    statuses.iter().map(to_native::<R>).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::mock::{MockRuntime, MockStatus};

    #[test]
    fn test_capacity_check() {
        assert!(check_capacity(STATUS_OPAQUE_BYTES).is_ok());
        assert_eq!(
            check_capacity(STATUS_OPAQUE_BYTES + 1),
            Err(ShimError::StatusCapacity {
                native: STATUS_OPAQUE_BYTES + 1,
                capacity: STATUS_OPAQUE_BYTES,
            })
        );
    }

    #[test]
    fn test_round_trip_preserves_named_fields_and_native_image() {
        let native = MockStatus {
            source: 3,
            tag: 1001,
            error: 0,
            stamp: 0xDEADBEEF,
        };
        let shim = to_shim::<MockRuntime>(&native);
        assert_eq!(shim.source, 3);
        assert_eq!(shim.tag, 1001);
        assert_eq!(shim.error, 0);

        let back: MockStatus = to_native::<MockRuntime>(&shim);
        assert_eq!(back, native);
    }

    #[test]
    fn test_array_conversion_is_element_independent() {
        let natives: Vec<MockStatus> = (0..4)
            .map(|i| MockStatus {
                source: i,
                tag: 100 + i,
                error: 0,
                stamp: i as u32,
            })
            .collect();
        let mut shims = vec![Status::empty(); 4];
        to_shim_array::<MockRuntime>(&natives, &mut shims);
        let back = to_native_array::<MockRuntime>(&shims);
        assert_eq!(back, natives);
    }

    #[test]
    fn test_empty_status_recovers_zeroed_native() {
        let shim = Status::empty();
        let native: MockStatus = to_native::<MockRuntime>(&shim);
        assert_eq!(native, MockStatus::default());
    }
}
