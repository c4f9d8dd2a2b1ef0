//! # Tether - rich host types for WebAssembly guests
//!
//! Tether lets a host call functions exported by a WebAssembly guest using
//! strings, byte arrays and typed numeric arrays, even though the guest
//! itself only speaks 32-bit integers and a linear byte buffer.
//!
//! ## Quick Start
//!
//! ```ignore
//! use tether::prelude::*;
//!
//! let runtime = Tether::builder()
//!     .with_out_param_position(OutParamPosition::Prepend)
//!     .build()?;
//!
//! let module = runtime.load_file("guest.wasm")?;
//! let mut bridge = runtime.instantiate(&module)?;
//!
//! let out = bridge.call("echo_str", "&str -> &str", &[Value::from("Banana")])?;
//! assert_eq!(out.as_str(), Some("Banana"));
//! ```
//!
//! ## Guest contract
//!
//! The guest exports `memory`, an `alloc(size) -> ptr` that never fails,
//! and the functions to call. Strings and arrays are passed as a pointer to
//! a `[data, len]` descriptor; returning one goes through an out-parameter
//! the host allocates. The host never frees guest memory.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                    Your Application                     │
//! ├─────────────────────────────────────────────────────────┤
//! │                    tether (facade)                      │
//! │           Tether builder · runtime · Bridge             │
//! ├──────────────────┬──────────────────┬───────────────────┤
//! │  tether-core     │  tether-marshal  │  tether-observe   │
//! │  (engine,        │  (codecs, types, │  (logging port)   │
//! │   guest instance)│   wrapping)      │                   │
//! ├──────────────────┴──────────────────┴───────────────────┤
//! │                       Wasmtime                          │
//! └─────────────────────────────────────────────────────────┘
//! ```

use std::path::Path;
use std::sync::Arc;

use tether_core::{
    BridgeConfig, EngineConfig, GuestInstance, ModuleLoader, SharedEngine, TetherEngine,
    ValidatedModule,
};
use tether_marshal::{OutParamPosition, TypeRegistry};
use tether_observe::{LogLevel, Logger};

mod bridge;

pub use bridge::Bridge;

// Re-export from sub-crates
pub use tether_core;
pub use tether_marshal;
pub use tether_observe;

/// Main entry point for Tether.
pub struct Tether;

impl Tether {
    /// Create a new runtime builder.
    pub fn builder() -> TetherBuilder {
        TetherBuilder::new()
    }

    /// Create a runtime with default configuration.
    pub fn with_defaults() -> Result<TetherRuntime, TetherError> {
        TetherBuilder::new().build()
    }
}

/// Builder for configuring the runtime.
pub struct TetherBuilder {
    engine_config: EngineConfig,
    bridge_config: BridgeConfig,
    logger: Option<Logger>,
}

impl TetherBuilder {
    /// Create a new builder with default configuration.
    pub fn new() -> Self {
        Self {
            engine_config: EngineConfig::default(),
            bridge_config: BridgeConfig::default(),
            logger: None,
        }
    }

    // Engine configuration

    /// Enable or disable debug info.
    pub fn with_debug_info(mut self, enabled: bool) -> Self {
        self.engine_config.debug_info = enabled;
        self
    }

    /// Set the maximum WASM stack size.
    pub fn with_max_wasm_stack(mut self, bytes: usize) -> Self {
        self.engine_config.max_wasm_stack = bytes;
        self
    }

    /// Replace the whole engine configuration.
    pub fn with_engine_config(mut self, config: EngineConfig) -> Self {
        self.engine_config = config;
        self
    }

    // Bridge configuration

    /// Replace the whole bridge configuration.
    pub fn with_bridge_config(mut self, config: BridgeConfig) -> Self {
        self.bridge_config = config;
        self
    }

    /// Set where out-parameter pointers go.
    pub fn with_out_param_position(mut self, position: OutParamPosition) -> Self {
        self.bridge_config.out_param_position = position;
        self
    }

    /// Set the minimum log level of the default logger.
    pub fn with_min_log_level(mut self, level: LogLevel) -> Self {
        self.bridge_config.min_log_level = level;
        self
    }

    /// Add a type alias, e.g. `("bytes", "&[u8]")`.
    pub fn with_alias(mut self, alias: impl Into<String>, target: impl Into<String>) -> Self {
        self.bridge_config = self.bridge_config.with_alias(alias, target);
        self
    }

    // Observability

    /// Log through `logger` instead of `tracing` at the configured level.
    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Build the runtime.
    pub fn build(self) -> Result<TetherRuntime, TetherError> {
        let engine = TetherEngine::new(self.engine_config)?;
        let registry = self.bridge_config.registry()?;
        let logger = self
            .logger
            .unwrap_or_else(|| self.bridge_config.logger());

        Ok(TetherRuntime {
            engine: Arc::new(engine),
            bridge_config: self.bridge_config,
            registry,
            logger,
        })
    }
}

impl Default for TetherBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A configured runtime: compiles guests and turns them into [`Bridge`]s.
pub struct TetherRuntime {
    engine: SharedEngine,
    bridge_config: BridgeConfig,
    registry: TypeRegistry,
    logger: Logger,
}

impl TetherRuntime {
    /// Get a reference to the engine.
    pub fn engine(&self) -> &SharedEngine {
        &self.engine
    }

    /// Get the bridge configuration.
    pub fn bridge_config(&self) -> &BridgeConfig {
        &self.bridge_config
    }

    /// Get the type registry, including configured aliases.
    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// Create a module loader.
    pub fn loader(&self) -> ModuleLoader {
        ModuleLoader::new(Arc::clone(&self.engine))
    }

    /// Load a module from bytes.
    pub fn load_bytes(&self, bytes: &[u8]) -> Result<ValidatedModule, TetherError> {
        Ok(self.loader().load_bytes(bytes)?)
    }

    /// Load a module from a `.wasm` or `.wat` file.
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<ValidatedModule, TetherError> {
        Ok(self.loader().load_file(path.as_ref())?)
    }

    /// Load a module from WAT text format.
    pub fn load_wat(&self, wat: &str) -> Result<ValidatedModule, TetherError> {
        Ok(self.loader().load_wat(wat)?)
    }

    /// Instantiate a module and wrap it in a [`Bridge`].
    pub fn instantiate(&self, module: &ValidatedModule) -> Result<Bridge, TetherError> {
        let guest = GuestInstance::with_export_names(
            &self.engine,
            module,
            self.bridge_config.export_names(),
        )?;
        Ok(Bridge::new(
            guest,
            self.registry.clone(),
            self.bridge_config.wrap_options(self.logger.clone()),
        ))
    }
}

impl std::fmt::Debug for TetherRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TetherRuntime")
            .field("bridge_config", &self.bridge_config)
            .field("logger", &self.logger)
            .finish()
    }
}

/// Errors from the Tether runtime.
#[derive(Debug, thiserror::Error)]
pub enum TetherError {
    /// Engine error.
    #[error("Engine error: {0}")]
    Engine(#[from] tether_core::EngineError),

    /// Module error.
    #[error("Module error: {0}")]
    Module(#[from] tether_core::ModuleError),

    /// Instantiation error.
    #[error("Instance error: {0}")]
    Instance(#[from] tether_core::InstanceError),

    /// Configuration error.
    #[error("Config error: {0}")]
    Config(#[from] tether_core::ConfigError),

    /// Marshaling or call error.
    #[error("Marshal error: {0}")]
    Marshal(#[from] tether_marshal::MarshalError),
}

/// Prelude module for convenient imports.
pub mod prelude {
    // Main types
    pub use crate::{Bridge, Tether, TetherBuilder, TetherError, TetherRuntime};

    // Core types
    pub use tether_core::{BridgeConfig, EngineConfig, GuestInstance, ModuleLoader, ValidatedModule};

    // Marshaling types
    pub use tether_marshal::{
        GuestExports, MarshalError, OutParamPosition, Signature, TypeRegistry, TypeTag, Value,
        WrappedFunction,
    };

    // Logging types
    pub use tether_observe::{LogLevel, Logger};

    // Common std types
    pub use std::sync::Arc;
}
