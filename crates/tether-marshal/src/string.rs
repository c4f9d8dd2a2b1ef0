//! String codecs.
//!
//! Two layouts that are never mixed:
//!
//! - **C strings**: UTF-8 bytes followed by a single `0`, passed as a bare
//!   pointer.
//! - **Length-prefixed strings** (`&str`, `String`): UTF-8 bytes described by
//!   a slice descriptor, exactly like `&[u8]`.
//!
//! No normalization happens in either direction; bytes round-trip as-is.

use crate::error::{MarshalError, MarshalResult, MemoryAccess};
use crate::exports::{GuestExports, Pointer};
use crate::memory::MemoryView;
use crate::slice;

/// Copy `s` into guest memory as a NUL-terminated string.
///
/// Strings containing an interior NUL are rejected: the guest would see a
/// truncated value.
pub fn encode_cstr<E: GuestExports + ?Sized>(exports: &mut E, s: &str) -> MarshalResult<Pointer> {
    if s.as_bytes().contains(&0) {
        return Err(MarshalError::type_mismatch(
            "a string without NUL bytes for `CStr`",
            "a string containing NUL",
        ));
    }
    let mut bytes = Vec::with_capacity(s.len() + 1);
    bytes.extend_from_slice(s.as_bytes());
    bytes.push(0);

    let ptr = exports.alloc(slice::guest_len(bytes.len())?)?;
    MemoryView::acquire(exports)?.write_range(ptr, &bytes)?;
    Ok(ptr)
}

/// Read a NUL-terminated UTF-8 string starting at `ptr`.
///
/// Fails with `OutOfBounds` if the end of memory is reached before the
/// terminator.
pub fn decode_cstr<E: GuestExports + ?Sized>(exports: &mut E, ptr: Pointer) -> MarshalResult<String> {
    let view = MemoryView::acquire(exports)?;
    let tail = view.read_tail(ptr)?;
    let end = tail
        .iter()
        .position(|&b| b == 0)
        .ok_or(MarshalError::OutOfBounds {
            access: MemoryAccess::Read,
            offset: u64::from(ptr),
            len: tail.len() as u64 + 1,
            memory_size: view.len(),
        })?;
    Ok(String::from_utf8(tail[..end].to_vec())?)
}

/// Copy `s` into guest memory behind a slice descriptor.
pub fn encode_str<E: GuestExports + ?Sized>(exports: &mut E, s: &str) -> MarshalResult<Pointer> {
    slice::encode(exports, s.as_bytes())
}

/// Read the UTF-8 string described at `descriptor`.
///
/// Any capacity word following the descriptor (owned strings) is ignored.
pub fn decode_str<E: GuestExports + ?Sized>(
    exports: &mut E,
    descriptor: Pointer,
) -> MarshalResult<String> {
    Ok(String::from_utf8(slice::decode(exports, descriptor)?)?)
}
