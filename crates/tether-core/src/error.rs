//! Core error types for Tether.
//!
//! Errors are split by where they happen: building the engine, loading a
//! module, instantiating it, or reading configuration. Errors raised while
//! marshaling a call live in `tether_marshal`.

use std::path::PathBuf;

use tether_marshal::MarshalError;
use thiserror::Error;

/// Errors during engine creation and configuration.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Invalid engine configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Underlying Wasmtime error.
    #[error("Wasmtime error: {0}")]
    Wasmtime(#[from] wasmtime::Error),
}

/// Errors during module loading and validation.
#[derive(Debug, Error)]
pub enum ModuleError {
    /// The WASM module is invalid or malformed.
    #[error("Invalid WASM module: {0}")]
    Invalid(String),

    /// IO error reading the module.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Underlying Wasmtime error.
    #[error("Wasmtime error: {0}")]
    Wasmtime(#[from] wasmtime::Error),
}

/// Errors while turning a module into a running guest.
#[derive(Debug, Error)]
pub enum InstanceError {
    /// The module imports something; guests must be self-contained.
    #[error("Unresolved import: module='{module}', name='{name}'")]
    UnresolvedImport {
        /// The import module name.
        module: String,
        /// The import name.
        name: String,
    },

    /// Underlying Wasmtime error.
    #[error("Wasmtime error: {0}")]
    Wasmtime(#[from] wasmtime::Error),
}

/// Errors reading bridge configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("Failed to read '{path}': {source}")]
    Io {
        /// The file that was read.
        path: PathBuf,
        /// The IO error.
        #[source]
        source: std::io::Error,
    },

    /// The TOML did not parse or had the wrong shape.
    #[error("Invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// An alias points at a type the registry cannot resolve.
    #[error("Alias '{alias}' has an unsupported target: {source}")]
    InvalidAlias {
        /// The alias being defined.
        alias: String,
        /// Why the target did not resolve.
        #[source]
        source: MarshalError,
    },
}

/// Result type alias for engine operations.
pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// Result type alias for module operations.
pub type ModuleResult<T> = std::result::Result<T, ModuleError>;

/// Result type alias for instance operations.
pub type InstanceResult<T> = std::result::Result<T, InstanceError>;

/// Result type alias for configuration.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
