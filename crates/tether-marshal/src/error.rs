//! Error types for the marshaling layer.

use thiserror::Error;

/// Whether a failed memory access was a read or a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryAccess {
    /// Reading from guest memory.
    Read,
    /// Writing to guest memory.
    Write,
}

impl std::fmt::Display for MemoryAccess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MemoryAccess::Read => f.write_str("read"),
            MemoryAccess::Write => f.write_str("write"),
        }
    }
}

/// Errors raised while moving values across the host/guest boundary.
#[derive(Debug, Error)]
pub enum MarshalError {
    /// The requested export does not exist on the guest.
    #[error("Missing export: '{0}'")]
    MissingExport(String),

    /// A type tag that the registry does not know.
    #[error("Unsupported type: '{0}'")]
    UnsupportedType(String),

    /// Supplied argument count differs from the declared signature.
    #[error("Arity mismatch calling '{function}': expected {expected} arguments, got {actual}")]
    ArityMismatch {
        /// The export being called.
        function: String,
        /// Declared argument count.
        expected: usize,
        /// Supplied argument count.
        actual: usize,
    },

    /// A guest memory access fell outside the current buffer.
    #[error(
        "Guest memory {access} out of bounds: offset={offset}, len={len}, memory_size={memory_size}"
    )]
    OutOfBounds {
        /// Read or write.
        access: MemoryAccess,
        /// The offset attempted.
        offset: u64,
        /// The length attempted.
        len: u64,
        /// The memory size at the time of the access.
        memory_size: usize,
    },

    /// A host value does not have the shape its type tag requires.
    #[error("Type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        /// What the type tag needed.
        expected: String,
        /// What was supplied.
        actual: String,
    },

    /// A declared but unsupported combination.
    #[error("Unimplemented: {0}")]
    Unimplemented(String),

    /// Guest bytes that should have been UTF-8 were not.
    #[error("Invalid UTF-8 in guest string: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    /// A host payload does not fit the guest's 32-bit lengths.
    #[error("Payload of {0} bytes does not fit in guest memory")]
    PayloadTooLarge(usize),

    /// The guest call itself failed (trap, signature mismatch, ...).
    #[error("Guest call to '{export}' failed: {source}")]
    Guest {
        /// The export being called.
        export: String,
        /// The runtime's error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },
}

impl MarshalError {
    /// Build a [`MarshalError::TypeMismatch`].
    pub fn type_mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::TypeMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }
}

/// Result type for marshaling operations.
pub type MarshalResult<T> = std::result::Result<T, MarshalError>;
