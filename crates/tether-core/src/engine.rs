//! Wasmtime engine wrapper for Tether.
//!
//! This module provides the `TetherEngine` type, which wraps the Wasmtime
//! engine with the configuration guests are compiled under.

use std::sync::Arc;

use tracing::info;
use wasmtime::{Config, Engine};

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};

/// The engine every guest module is compiled with.
///
/// # Example
///
/// ```
/// use tether_core::{EngineConfig, TetherEngine};
///
/// let engine = TetherEngine::new(EngineConfig::default()).unwrap();
/// assert!(!engine.config().debug_info);
/// ```
pub struct TetherEngine {
    /// The underlying Wasmtime engine.
    inner: Engine,
    /// Configuration used to create this engine.
    config: EngineConfig,
}

impl TetherEngine {
    /// Create a new engine with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is rejected, either here or by
    /// Wasmtime.
    pub fn new(config: EngineConfig) -> EngineResult<Self> {
        if config.max_wasm_stack == 0 {
            return Err(EngineError::InvalidConfig(
                "max_wasm_stack must be non-zero".to_string(),
            ));
        }

        let mut wasmtime_config = Config::new();
        wasmtime_config.max_wasm_stack(config.max_wasm_stack);
        wasmtime_config.debug_info(config.debug_info);

        // Guests compiled by current toolchains use these freely.
        wasmtime_config.wasm_bulk_memory(true);
        wasmtime_config.wasm_multi_value(true);

        let inner = Engine::new(&wasmtime_config)?;

        info!(
            max_wasm_stack = config.max_wasm_stack,
            debug_info = config.debug_info,
            "Created Tether engine"
        );

        Ok(Self { inner, config })
    }

    /// Create a new engine with default configuration.
    pub fn default_engine() -> EngineResult<Self> {
        Self::new(EngineConfig::default())
    }

    /// Get a reference to the underlying Wasmtime engine.
    pub fn inner(&self) -> &Engine {
        &self.inner
    }

    /// Get the configuration used to create this engine.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

impl std::fmt::Debug for TetherEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TetherEngine")
            .field("config", &self.config)
            .finish()
    }
}

/// A shared reference to a Tether engine.
pub type SharedEngine = Arc<TetherEngine>;

/// Extension trait for creating shared engines.
pub trait IntoShared {
    /// Convert into a shared engine reference.
    fn into_shared(self) -> SharedEngine;
}

impl IntoShared for TetherEngine {
    fn into_shared(self) -> SharedEngine {
        Arc::new(self)
    }
}
