//! Tether Marshaling
//!
//! This crate moves values across the boundary between a host and a
//! WebAssembly guest that only understands 32-bit integers and a linear
//! byte buffer. It knows nothing about any particular wasm runtime; a
//! runtime plugs in by implementing [`GuestExports`].
//!
//! - [`MemoryView`]: bounds-checked little-endian access to guest memory
//! - [`slice`], [`string`], [`vector`]: the codecs
//! - [`TypeRegistry`] / [`TypeTag`]: the closed set of marshaling strategies
//! - [`wrap`]: binds an export and a [`Signature`] into a [`WrappedFunction`]
//!
//! # Guest contract
//!
//! The guest exports `memory`, `alloc(size) -> ptr`, and functions taking
//! and returning 32-bit integers. Pointer-valued types are passed as the
//! address of a `[data, len]` descriptor; returns of those types go through
//! an out-parameter the host allocates. Nothing the host allocates is ever
//! freed.

pub mod convert;
pub mod error;
pub mod exports;
pub mod memory;
pub mod slice;
pub mod string;
pub mod types;
pub mod value;
pub mod vector;
pub mod wrap;

#[cfg(test)]
mod testing;

// Re-export main types
pub use convert::RawReturn;
pub use error::{MarshalError, MarshalResult, MemoryAccess};
pub use exports::{ALLOC_EXPORT, GuestExports, MEMORY_EXPORT, Pointer};
pub use memory::{MemoryView, WORD_BYTES};
pub use slice::SliceDescriptor;
pub use types::{Capability, ElementKind, TypeRegistry, TypeTag};
pub use value::Value;
pub use vector::Element;
pub use wrap::{OutParamPosition, Signature, WrapOptions, WrappedFunction, wrap};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::error::{MarshalError, MarshalResult};
    pub use crate::exports::GuestExports;
    pub use crate::types::{TypeRegistry, TypeTag};
    pub use crate::value::Value;
    pub use crate::wrap::{OutParamPosition, Signature, WrapOptions, WrappedFunction, wrap};
}
