//! The guest export table as seen by the marshaling layer.

use crate::error::{MarshalError, MarshalResult};

/// An unsigned 32-bit offset into guest linear memory.
pub type Pointer = u32;

/// Default name of the guest's linear memory export.
pub const MEMORY_EXPORT: &str = "memory";

/// Default name of the guest's allocator export.
pub const ALLOC_EXPORT: &str = "alloc";

/// Everything the marshaling layer needs from an instantiated guest.
///
/// Implementations wrap a concrete runtime instance. The slice returned by
/// [`GuestExports::memory`] borrows `self` mutably, so it cannot outlive the
/// next [`GuestExports::call`]; a guest call may grow (and move) the memory
/// buffer, and this way every access goes through a freshly acquired view.
pub trait GuestExports {
    /// Check whether the guest exports something called `name`.
    fn has_export(&self, name: &str) -> bool;

    /// Invoke a numeric export with 32-bit integer arguments.
    ///
    /// Returns `None` when the export produces no value.
    fn call(&mut self, name: &str, args: &[i32]) -> MarshalResult<Option<i32>>;

    /// The guest's current linear memory.
    fn memory(&mut self) -> MarshalResult<&mut [u8]>;

    /// Name of the allocator export. Defaults to [`ALLOC_EXPORT`].
    fn alloc_export(&self) -> &str {
        ALLOC_EXPORT
    }

    /// Ask the guest allocator for `size` fresh bytes.
    ///
    /// The host never frees what it allocates here.
    fn alloc(&mut self, size: u32) -> MarshalResult<Pointer> {
        let export = self.alloc_export().to_string();
        match self.call(&export, &[size as i32])? {
            Some(ptr) => Ok(ptr as Pointer),
            None => Err(MarshalError::type_mismatch(
                format!("a pointer from `{export}`"),
                "no value",
            )),
        }
    }
}
