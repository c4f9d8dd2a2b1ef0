//! Bounds-checked byte access to guest linear memory.
//!
//! All multi-byte values crossing the boundary are little-endian and every
//! pointer-sized word is [`WORD_BYTES`] wide. Both are fixed for the whole
//! bridge; codecs use the constants here instead of literals.

use std::ops::Range;

use crate::error::{MarshalError, MarshalResult, MemoryAccess};
use crate::exports::{GuestExports, Pointer};

/// Width in bytes of a guest pointer or length word.
pub const WORD_BYTES: u32 = 4;

/// A view over the guest's memory buffer as it is right now.
///
/// Acquire a new view after every guest call; growth reallocates the
/// backing buffer and the borrow checker will not let an old view survive
/// a call anyway.
pub struct MemoryView<'a> {
    bytes: &'a mut [u8],
}

impl<'a> MemoryView<'a> {
    /// Wrap a raw memory slice.
    pub fn new(bytes: &'a mut [u8]) -> Self {
        Self { bytes }
    }

    /// Acquire a view over the guest's current memory.
    pub fn acquire<E: GuestExports + ?Sized>(exports: &'a mut E) -> MarshalResult<Self> {
        Ok(Self::new(exports.memory()?))
    }

    /// Current size of the buffer in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    fn checked_range(
        &self,
        ptr: Pointer,
        len: u64,
        access: MemoryAccess,
    ) -> MarshalResult<Range<usize>> {
        let start = u64::from(ptr);
        let end = start + len;
        if end > self.bytes.len() as u64 {
            return Err(MarshalError::OutOfBounds {
                access,
                offset: start,
                len,
                memory_size: self.bytes.len(),
            });
        }
        Ok(start as usize..end as usize)
    }

    /// Read one byte.
    pub fn read_byte(&self, ptr: Pointer) -> MarshalResult<u8> {
        let range = self.checked_range(ptr, 1, MemoryAccess::Read)?;
        Ok(self.bytes[range.start])
    }

    /// Borrow `len` bytes starting at `ptr`.
    pub fn read_range(&self, ptr: Pointer, len: u32) -> MarshalResult<&[u8]> {
        let range = self.checked_range(ptr, u64::from(len), MemoryAccess::Read)?;
        Ok(&self.bytes[range])
    }

    /// Borrow every byte from `ptr` to the end of the buffer.
    pub fn read_tail(&self, ptr: Pointer) -> MarshalResult<&[u8]> {
        let range = self.checked_range(ptr, 0, MemoryAccess::Read)?;
        Ok(&self.bytes[range.start..])
    }

    /// Copy `data` into memory starting at `ptr`.
    pub fn write_range(&mut self, ptr: Pointer, data: &[u8]) -> MarshalResult<()> {
        let range = self.checked_range(ptr, data.len() as u64, MemoryAccess::Write)?;
        self.bytes[range].copy_from_slice(data);
        Ok(())
    }

    /// Read a little-endian `u32` word.
    pub fn read_u32_le(&self, ptr: Pointer) -> MarshalResult<u32> {
        let word: [u8; WORD_BYTES as usize] = self
            .read_range(ptr, WORD_BYTES)?
            .try_into()
            .map_err(|_| MarshalError::OutOfBounds {
                access: MemoryAccess::Read,
                offset: u64::from(ptr),
                len: u64::from(WORD_BYTES),
                memory_size: self.bytes.len(),
            })?;
        Ok(u32::from_le_bytes(word))
    }

    /// Write a little-endian `u32` word.
    pub fn write_u32_le(&mut self, ptr: Pointer, value: u32) -> MarshalResult<()> {
        self.write_range(ptr, &value.to_le_bytes())
    }
}

impl std::fmt::Debug for MemoryView<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryView")
            .field("len", &self.bytes.len())
            .finish()
    }
}
