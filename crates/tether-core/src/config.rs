//! Configuration types for the Tether runtime.
//!
//! [`EngineConfig`] controls how Wasmtime compiles guests. [`BridgeConfig`]
//! controls how calls are marshaled and can be loaded from TOML:
//!
//! ```toml
//! out_param_position = "append"
//! min_log_level = "debug"
//! alloc_export = "__alloc"
//!
//! [aliases]
//! bytes = "&[u8]"
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tether_marshal::{ALLOC_EXPORT, MEMORY_EXPORT, OutParamPosition, TypeRegistry, WrapOptions};
use tether_observe::{LogLevel, Logger};

use crate::error::{ConfigError, ConfigResult};

/// Configuration for the Tether engine.
///
/// This controls how the underlying Wasmtime engine is configured.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Maximum WASM stack size in bytes.
    ///
    /// Defaults to 1MB.
    pub max_wasm_stack: usize,

    /// Enable debug information in compiled code.
    ///
    /// This increases compilation time and memory usage but provides
    /// better backtraces when a guest traps.
    pub debug_info: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_wasm_stack: 1024 * 1024, // 1MB
            debug_info: false,
        }
    }
}

impl EngineConfig {
    /// Create a new engine configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum WASM stack size.
    pub fn with_max_wasm_stack(mut self, bytes: usize) -> Self {
        self.max_wasm_stack = bytes;
        self
    }

    /// Enable debug information.
    pub fn with_debug_info(mut self, enabled: bool) -> Self {
        self.debug_info = enabled;
        self
    }

    /// A configuration for developing guests: debug info and a larger stack.
    pub fn development() -> Self {
        Self {
            max_wasm_stack: 2 * 1024 * 1024, // 2MB
            debug_info: true,
        }
    }
}

/// Names of the exports every guest must provide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportNames {
    /// The linear memory.
    pub memory: String,
    /// The allocator, `alloc(size) -> ptr`.
    pub alloc: String,
}

impl Default for ExportNames {
    fn default() -> Self {
        Self {
            memory: MEMORY_EXPORT.to_string(),
            alloc: ALLOC_EXPORT.to_string(),
        }
    }
}

/// Configuration for marshaling calls into a guest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BridgeConfig {
    /// Where out-parameter pointers go in the argument list.
    pub out_param_position: OutParamPosition,

    /// Minimum level the bridge logs at.
    pub min_log_level: LogLevel,

    /// Name of the guest's memory export.
    pub memory_export: String,

    /// Name of the guest's allocator export.
    pub alloc_export: String,

    /// Extra type names, mapped to a name the registry already knows.
    pub aliases: BTreeMap<String, String>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        let names = ExportNames::default();
        Self {
            out_param_position: OutParamPosition::default(),
            min_log_level: LogLevel::default(),
            memory_export: names.memory,
            alloc_export: names.alloc,
            aliases: BTreeMap::new(),
        }
    }
}

impl BridgeConfig {
    /// Create a new bridge configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a configuration from TOML text. Missing keys keep their defaults.
    pub fn from_toml_str(text: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Read and parse a TOML configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Set the out-parameter position.
    pub fn with_out_param_position(mut self, position: OutParamPosition) -> Self {
        self.out_param_position = position;
        self
    }

    /// Set the minimum log level.
    pub fn with_min_log_level(mut self, level: LogLevel) -> Self {
        self.min_log_level = level;
        self
    }

    /// Set the allocator export name.
    pub fn with_alloc_export(mut self, name: impl Into<String>) -> Self {
        self.alloc_export = name.into();
        self
    }

    /// Set the memory export name.
    pub fn with_memory_export(mut self, name: impl Into<String>) -> Self {
        self.memory_export = name.into();
        self
    }

    /// Add a type alias.
    pub fn with_alias(mut self, alias: impl Into<String>, target: impl Into<String>) -> Self {
        self.aliases.insert(alias.into(), target.into());
        self
    }

    /// The export names guests are expected to provide.
    pub fn export_names(&self) -> ExportNames {
        ExportNames {
            memory: self.memory_export.clone(),
            alloc: self.alloc_export.clone(),
        }
    }

    /// Build the type registry, with the configured aliases on top of the
    /// built-in names.
    ///
    /// Alias targets resolve against the built-in names only, so aliases
    /// cannot refer to each other.
    pub fn registry(&self) -> ConfigResult<TypeRegistry> {
        let builtin = TypeRegistry::new();
        let mut registry = builtin.clone();
        for (alias, target) in &self.aliases {
            let tag = builtin
                .resolve(target)
                .map_err(|source| ConfigError::InvalidAlias {
                    alias: alias.clone(),
                    source,
                })?;
            registry.register_alias(alias, tag);
        }
        Ok(registry)
    }

    /// A logger that forwards to `tracing` at the configured threshold.
    pub fn logger(&self) -> Logger {
        Logger::tracing(self.min_log_level)
    }

    /// Wrapper options for this configuration, logging through `logger`.
    pub fn wrap_options(&self, logger: Logger) -> WrapOptions {
        WrapOptions::default()
            .with_out_param_position(self.out_param_position)
            .with_logger(logger)
    }
}
