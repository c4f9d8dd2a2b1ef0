//! In-memory guest used by the unit tests.

use std::collections::HashMap;

use crate::error::{MarshalError, MarshalResult};
use crate::exports::{ALLOC_EXPORT, GuestExports, MEMORY_EXPORT, Pointer};

const PAGE: usize = 64 * 1024;

/// Linear memory plus a bump allocator that never frees.
pub struct FakeHeap {
    pub bytes: Vec<u8>,
    next: u32,
    pub alloc_calls: usize,
    pub grow_calls: usize,
}

impl FakeHeap {
    fn new(pages: usize) -> Self {
        Self {
            bytes: vec![0; pages * PAGE],
            // Keep the null page region unused so a 0 pointer is never valid data.
            next: 1024,
            alloc_calls: 0,
            grow_calls: 0,
        }
    }

    pub fn alloc(&mut self, size: u32) -> Pointer {
        self.alloc_calls += 1;
        let ptr = self.next;
        let end = (ptr + size) as usize;
        if end > self.bytes.len() {
            let pages = (end - self.bytes.len()).div_ceil(PAGE);
            // A fresh Vec models the buffer moving on growth.
            let mut grown = vec![0; self.bytes.len() + pages * PAGE];
            grown[..self.bytes.len()].copy_from_slice(&self.bytes);
            self.bytes = grown;
            self.grow_calls += 1;
        }
        self.next = end as u32;
        ptr
    }

    pub fn write(&mut self, ptr: Pointer, data: &[u8]) {
        let start = ptr as usize;
        self.bytes[start..start + data.len()].copy_from_slice(data);
    }

    pub fn read(&self, ptr: Pointer, len: u32) -> &[u8] {
        &self.bytes[ptr as usize..(ptr + len) as usize]
    }

    pub fn read_u32(&self, ptr: Pointer) -> u32 {
        let b = self.read(ptr, 4);
        u32::from_le_bytes([b[0], b[1], b[2], b[3]])
    }

    pub fn write_u32(&mut self, ptr: Pointer, value: u32) {
        self.write(ptr, &value.to_le_bytes());
    }

    /// Write `[data, len]` at `out`, the way a guest fills an out-parameter.
    pub fn write_pair(&mut self, out: Pointer, data: Pointer, len: u32) {
        self.write_u32(out, data);
        self.write_u32(out + 4, len);
    }

    /// Allocate and fill a payload, returning its address.
    pub fn store(&mut self, data: &[u8]) -> Pointer {
        let ptr = self.alloc(data.len() as u32);
        self.write(ptr, data);
        ptr
    }
}

type GuestFn = Box<dyn FnMut(&mut FakeHeap, &[i32]) -> Option<i32>>;

/// A scripted guest: host closures stand in for compiled exports.
pub struct FakeGuest {
    pub heap: FakeHeap,
    functions: HashMap<String, GuestFn>,
    with_memory: bool,
    with_alloc: bool,
    pub calls: Vec<(String, Vec<i32>)>,
}

impl FakeGuest {
    pub fn new() -> Self {
        Self {
            heap: FakeHeap::new(1),
            functions: HashMap::new(),
            with_memory: true,
            with_alloc: true,
            calls: Vec::new(),
        }
    }

    pub fn without_memory(mut self) -> Self {
        self.with_memory = false;
        self
    }

    pub fn without_alloc(mut self) -> Self {
        self.with_alloc = false;
        self
    }

    pub fn export(
        mut self,
        name: &str,
        func: impl FnMut(&mut FakeHeap, &[i32]) -> Option<i32> + 'static,
    ) -> Self {
        self.functions.insert(name.to_string(), Box::new(func));
        self
    }

    /// Calls made to exports other than `alloc`.
    pub fn function_calls(&self) -> Vec<&(String, Vec<i32>)> {
        self.calls.iter().filter(|(n, _)| n != ALLOC_EXPORT).collect()
    }
}

impl GuestExports for FakeGuest {
    fn has_export(&self, name: &str) -> bool {
        (name == MEMORY_EXPORT && self.with_memory)
            || (name == ALLOC_EXPORT && self.with_alloc)
            || self.functions.contains_key(name)
    }

    fn call(&mut self, name: &str, args: &[i32]) -> MarshalResult<Option<i32>> {
        self.calls.push((name.to_string(), args.to_vec()));
        if name == ALLOC_EXPORT && self.with_alloc {
            return Ok(Some(self.heap.alloc(args[0] as u32) as i32));
        }
        let func = self
            .functions
            .get_mut(name)
            .ok_or_else(|| MarshalError::MissingExport(name.to_string()))?;
        Ok(func(&mut self.heap, args))
    }

    fn memory(&mut self) -> MarshalResult<&mut [u8]> {
        if !self.with_memory {
            return Err(MarshalError::MissingExport(MEMORY_EXPORT.to_string()));
        }
        Ok(&mut self.heap.bytes)
    }
}
