//! Typed numeric vectors.
//!
//! Same wire layout as a byte slice, but the descriptor's length counts
//! elements of a fixed width. The layout does not record the width, so the
//! decoder must be told the same element type the encoder used.

use crate::error::MarshalResult;
use crate::exports::{GuestExports, Pointer};
use crate::slice;
use crate::types::ElementKind;

/// A numeric element stored little-endian in guest memory.
pub trait Element: Copy + Sized {
    /// Which element kind this is.
    const KIND: ElementKind;

    /// Append the little-endian encoding of `self`.
    fn put_le(self, out: &mut Vec<u8>);

    /// Decode from exactly `KIND.width()` little-endian bytes.
    fn from_le(bytes: &[u8]) -> Self;
}

macro_rules! impl_element {
    ($ty:ty, $kind:expr) => {
        impl Element for $ty {
            const KIND: ElementKind = $kind;

            fn put_le(self, out: &mut Vec<u8>) {
                out.extend_from_slice(&self.to_le_bytes());
            }

            fn from_le(bytes: &[u8]) -> Self {
                let mut buf = [0u8; std::mem::size_of::<$ty>()];
                buf.copy_from_slice(bytes);
                <$ty>::from_le_bytes(buf)
            }
        }
    };
}

impl_element!(u8, ElementKind::U8);
impl_element!(u16, ElementKind::U16);
impl_element!(u32, ElementKind::U32);
impl_element!(f32, ElementKind::F32);

/// Copy `items` into guest memory; returns the descriptor's address.
pub fn encode<T: Element, E: GuestExports + ?Sized>(
    exports: &mut E,
    items: &[T],
) -> MarshalResult<Pointer> {
    let mut bytes = Vec::with_capacity(items.len() * T::KIND.width() as usize);
    for item in items {
        item.put_le(&mut bytes);
    }
    slice::encode_raw(exports, &bytes, slice::guest_len(items.len())?)
}

/// Read the vector of `T` described at `descriptor`.
pub fn decode<T: Element, E: GuestExports + ?Sized>(
    exports: &mut E,
    descriptor: Pointer,
) -> MarshalResult<Vec<T>> {
    let width = T::KIND.width();
    let bytes = slice::decode_raw(exports, descriptor, width)?;
    Ok(bytes.chunks_exact(width as usize).map(T::from_le).collect())
}
