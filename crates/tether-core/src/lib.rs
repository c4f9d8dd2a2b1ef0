//! Tether Core - Wasmtime host for the marshaling bridge
//!
//! This crate compiles and instantiates guests so that `tether-marshal` has
//! something to talk to:
//!
//! - [`TetherEngine`]: the Wasmtime engine guests are compiled with
//! - [`ModuleLoader`]: loading modules from bytes, files, or WAT
//! - [`GuestInstance`]: a running guest, implementing [`GuestExports`]
//! - [`BridgeConfig`] / [`EngineConfig`]: configuration
//!
//! # Quick Start
//!
//! ```ignore
//! use tether_core::prelude::*;
//! use tether_marshal::{wrap, Value, WrapOptions};
//!
//! let engine = TetherEngine::default_engine()?.into_shared();
//! let loader = ModuleLoader::new(engine.clone());
//! let module = loader.load_file(Path::new("guest.wasm"))?;
//!
//! let mut guest = GuestInstance::new(&engine, &module)?;
//! let echo = wrap(&guest, "echo_str", "&str -> &str".parse()?, WrapOptions::default())?;
//! let out = echo.call(&mut guest, &[Value::from("Banana")])?;
//! ```
//!
//! [`GuestExports`]: tether_marshal::GuestExports

pub mod config;
pub mod engine;
pub mod error;
pub mod instance;
pub mod module;

// Re-export main types at crate root
pub use config::{BridgeConfig, EngineConfig, ExportNames};
pub use engine::{IntoShared, SharedEngine, TetherEngine};
pub use error::{
    ConfigError, ConfigResult, EngineError, EngineResult, InstanceError, InstanceResult,
    ModuleError, ModuleResult,
};
pub use instance::{GuestInstance, InstanceId};
pub use module::{ExportInfo, ImportInfo, ItemKind, MemoryInfo, ModuleLoader, ModuleMetadata, ValidatedModule};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::config::{BridgeConfig, EngineConfig};
    pub use crate::engine::{IntoShared, SharedEngine, TetherEngine};
    pub use crate::error::{ConfigError, EngineError, InstanceError, ModuleError};
    pub use crate::instance::GuestInstance;
    pub use crate::module::{ModuleLoader, ValidatedModule};
}
