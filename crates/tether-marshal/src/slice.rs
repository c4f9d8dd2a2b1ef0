//! `(pointer, length)` slice descriptors in guest memory.
//!
//! A descriptor is two consecutive little-endian words, `[data, len]`.
//! `len` counts elements; the element width comes from the surrounding type,
//! never from the descriptor.

use crate::error::{MarshalError, MarshalResult, MemoryAccess};
use crate::exports::{GuestExports, Pointer};
use crate::memory::{MemoryView, WORD_BYTES};

/// Number of words in a slice descriptor.
pub const DESCRIPTOR_WORDS: u32 = 2;

/// Size in bytes of a slice descriptor.
pub const DESCRIPTOR_BYTES: u32 = DESCRIPTOR_WORDS * WORD_BYTES;

/// The `[data, len]` pair found at some guest address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SliceDescriptor {
    /// Address of the first element.
    pub data: Pointer,
    /// Number of elements.
    pub len: u32,
}

impl SliceDescriptor {
    /// Read the descriptor stored at `at`.
    pub fn read(view: &MemoryView<'_>, at: Pointer) -> MarshalResult<Self> {
        let data = view.read_u32_le(at)?;
        let len_at = at.checked_add(WORD_BYTES).ok_or(MarshalError::OutOfBounds {
            access: MemoryAccess::Read,
            offset: u64::from(at),
            len: u64::from(DESCRIPTOR_BYTES),
            memory_size: view.len(),
        })?;
        let len = view.read_u32_le(len_at)?;
        Ok(Self { data, len })
    }

    /// Store the descriptor at `at`.
    pub fn write(&self, view: &mut MemoryView<'_>, at: Pointer) -> MarshalResult<()> {
        let mut bytes = [0u8; DESCRIPTOR_BYTES as usize];
        let (data, len) = bytes.split_at_mut(WORD_BYTES as usize);
        data.copy_from_slice(&self.data.to_le_bytes());
        len.copy_from_slice(&self.len.to_le_bytes());
        view.write_range(at, &bytes)
    }

    /// Byte length of the described data for elements `width` bytes wide.
    pub fn byte_len(&self, width: u32) -> Option<u32> {
        self.len.checked_mul(width)
    }
}

pub(crate) fn guest_len(len: usize) -> MarshalResult<u32> {
    u32::try_from(len).map_err(|_| MarshalError::PayloadTooLarge(len))
}

/// Copy `payload` into fresh guest memory and describe it as `element_count`
/// elements. Returns the descriptor's address.
pub fn encode_raw<E: GuestExports + ?Sized>(
    exports: &mut E,
    payload: &[u8],
    element_count: u32,
) -> MarshalResult<Pointer> {
    let data = exports.alloc(guest_len(payload.len())?)?;
    MemoryView::acquire(exports)?.write_range(data, payload)?;

    let descriptor = exports.alloc(DESCRIPTOR_BYTES)?;
    let mut view = MemoryView::acquire(exports)?;
    SliceDescriptor {
        data,
        len: element_count,
    }
    .write(&mut view, descriptor)?;

    Ok(descriptor)
}

/// Read the descriptor at `descriptor` and copy out `len * width` bytes.
pub fn decode_raw<E: GuestExports + ?Sized>(
    exports: &mut E,
    descriptor: Pointer,
    width: u32,
) -> MarshalResult<Vec<u8>> {
    let view = MemoryView::acquire(exports)?;
    let slice = SliceDescriptor::read(&view, descriptor)?;
    let byte_len = slice.byte_len(width).ok_or(MarshalError::OutOfBounds {
        access: MemoryAccess::Read,
        offset: u64::from(slice.data),
        len: u64::from(slice.len) * u64::from(width),
        memory_size: view.len(),
    })?;
    Ok(view.read_range(slice.data, byte_len)?.to_vec())
}

/// Encode a byte buffer; returns the descriptor's address.
pub fn encode<E: GuestExports + ?Sized>(exports: &mut E, bytes: &[u8]) -> MarshalResult<Pointer> {
    encode_raw(exports, bytes, guest_len(bytes.len())?)
}

/// Decode the byte buffer described at `descriptor`.
pub fn decode<E: GuestExports + ?Sized>(
    exports: &mut E,
    descriptor: Pointer,
) -> MarshalResult<Vec<u8>> {
    decode_raw(exports, descriptor, 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeGuest;

    #[test]
    fn test_slice_roundtrip() {
        let mut guest = FakeGuest::new();
        let ptr = encode(&mut guest, &[1, 2, 3, 4]).unwrap();

        let data = guest.heap.read_u32(ptr);
        assert_eq!(guest.heap.read_u32(ptr + 4), 4);
        assert_eq!(guest.heap.read(data, 4), &[1, 2, 3, 4]);

        assert_eq!(decode(&mut guest, ptr).unwrap(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_descriptor_words_layout() {
        let mut buf = vec![0xaau8; DESCRIPTOR_BYTES as usize + 4];
        let mut view = MemoryView::new(&mut buf);
        let desc = SliceDescriptor {
            data: 0x0403_0201,
            len: 0x0807_0605,
        };

        desc.write(&mut view, 2).unwrap();
        assert_eq!(view.read_u32_le(2).unwrap(), desc.data);
        assert_eq!(view.read_u32_le(2 + WORD_BYTES).unwrap(), desc.len);
        assert_eq!(SliceDescriptor::read(&view, 2).unwrap(), desc);
        // Bytes on either side are untouched.
        assert_eq!(view.read_byte(1).unwrap(), 0xaa);
        assert_eq!(view.read_byte(2 + DESCRIPTOR_BYTES).unwrap(), 0xaa);
        assert!(matches!(
            desc.write(&mut view, 8),
            Err(MarshalError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn test_encode_allocates_payload_then_descriptor() {
        let mut guest = FakeGuest::new();
        encode(&mut guest, &[9; 10]).unwrap();

        let sizes: Vec<i32> = guest.calls.iter().map(|(_, args)| args[0]).collect();
        assert_eq!(sizes, vec![10, DESCRIPTOR_BYTES as i32]);
    }

    #[test]
    fn test_empty_slice_roundtrip() {
        let mut guest = FakeGuest::new();
        let ptr = encode(&mut guest, &[]).unwrap();

        assert_eq!(guest.heap.read_u32(ptr + 4), 0);
        assert!(decode(&mut guest, ptr).unwrap().is_empty());
    }

    #[test]
    fn test_decode_only_trusts_length() {
        let mut guest = FakeGuest::new();
        let data = guest.heap.store(&[5, 6, 7, 8, 9, 10]);
        let desc = guest.heap.alloc(12);
        guest.heap.write_pair(desc, data, 3);
        // A trailing capacity word must be ignored.
        guest.heap.write_u32(desc + 8, 6);

        assert_eq!(decode(&mut guest, desc).unwrap(), vec![5, 6, 7]);
    }

    #[test]
    fn test_decode_corrupt_descriptor_is_out_of_bounds() {
        let mut guest = FakeGuest::new();
        let desc = guest.heap.alloc(8);
        guest.heap.write_pair(desc, 60_000, 10_000);

        assert!(matches!(
            decode(&mut guest, desc),
            Err(MarshalError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn test_decode_descriptor_outside_memory() {
        let mut guest = FakeGuest::new();
        assert!(matches!(
            decode(&mut guest, u32::MAX - 2),
            Err(MarshalError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn test_encode_survives_memory_growth() {
        let mut guest = FakeGuest::new();
        let payload: Vec<u8> = (0..100_000u32).map(|i| (i % 251) as u8).collect();

        let ptr = encode(&mut guest, &payload).unwrap();

        assert!(guest.heap.grow_calls > 0);
        assert_eq!(decode(&mut guest, ptr).unwrap(), payload);
    }

    #[test]
    fn test_encode_without_alloc_export() {
        let mut guest = FakeGuest::new().without_alloc();
        assert!(matches!(
            encode(&mut guest, &[1]),
            Err(MarshalError::MissingExport(name)) if name == "alloc"
        ));
    }

    #[test]
    fn test_decode_without_memory_export() {
        let mut guest = FakeGuest::new().without_memory();
        assert!(matches!(
            decode(&mut guest, 1024),
            Err(MarshalError::MissingExport(name)) if name == "memory"
        ));
    }
}
