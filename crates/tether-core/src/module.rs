//! Guest module loading and validation.
//!
//! Modules are compiled once and can be instantiated many times. Loading
//! also records what the module exports, which is what the bridge checks
//! before wrapping a function.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info};
use wasmtime::{ExternType, FuncType, Module};

use crate::engine::TetherEngine;
use crate::error::{ModuleError, ModuleResult};

/// A compiled WebAssembly module ready for instantiation.
#[derive(Clone)]
pub struct ValidatedModule {
    /// The underlying Wasmtime module.
    inner: Module,
    /// Metadata extracted from the module.
    metadata: ModuleMetadata,
}

impl ValidatedModule {
    /// Get a reference to the underlying Wasmtime module.
    pub fn inner(&self) -> &Module {
        &self.inner
    }

    /// Get the module metadata.
    pub fn metadata(&self) -> &ModuleMetadata {
        &self.metadata
    }

    /// Get the module name, if set.
    pub fn name(&self) -> Option<&str> {
        self.metadata.name.as_deref()
    }

    /// Get the list of exports.
    pub fn exports(&self) -> &[ExportInfo] {
        &self.metadata.exports
    }

    /// Get the list of imports.
    pub fn imports(&self) -> &[ImportInfo] {
        &self.metadata.imports
    }

    /// Check if the module has a specific export.
    pub fn has_export(&self, name: &str) -> bool {
        self.metadata.exports.iter().any(|e| e.name == name)
    }

    /// Look up an export by name.
    pub fn export(&self, name: &str) -> Option<&ExportInfo> {
        self.metadata.exports.iter().find(|e| e.name == name)
    }

    /// Exported functions, in declaration order.
    pub fn functions(&self) -> impl Iterator<Item = &ExportInfo> {
        self.metadata
            .exports
            .iter()
            .filter(|e| matches!(e.kind, ItemKind::Function { .. }))
    }
}

impl std::fmt::Debug for ValidatedModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidatedModule")
            .field("name", &self.metadata.name)
            .field("exports", &self.metadata.exports.len())
            .field("imports", &self.metadata.imports.len())
            .finish()
    }
}

/// Metadata extracted from a module.
#[derive(Debug, Clone, Default)]
pub struct ModuleMetadata {
    /// Module name, if specified.
    pub name: Option<String>,
    /// Exported items.
    pub exports: Vec<ExportInfo>,
    /// Required imports.
    pub imports: Vec<ImportInfo>,
    /// Exported memories.
    pub memories: Vec<MemoryInfo>,
}

/// An exported item.
#[derive(Debug, Clone)]
pub struct ExportInfo {
    /// Export name.
    pub name: String,
    /// What it is.
    pub kind: ItemKind,
}

/// A required import.
#[derive(Debug, Clone)]
pub struct ImportInfo {
    /// Import module name.
    pub module: String,
    /// Import name.
    pub name: String,
    /// What it is.
    pub kind: ItemKind,
}

/// The kind of an import or export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemKind {
    /// A function, with its core wasm parameter and result types.
    Function {
        /// Parameter types, e.g. `["i32", "i32"]`.
        params: Vec<String>,
        /// Result types.
        results: Vec<String>,
    },
    /// A memory.
    Memory,
    /// A global.
    Global,
    /// A table.
    Table,
}

impl std::fmt::Display for ItemKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ItemKind::Function { params, results } => {
                write!(f, "func({})", params.join(", "))?;
                if !results.is_empty() {
                    write!(f, " -> {}", results.join(", "))?;
                }
                Ok(())
            }
            ItemKind::Memory => f.write_str("memory"),
            ItemKind::Global => f.write_str("global"),
            ItemKind::Table => f.write_str("table"),
        }
    }
}

/// Information about an exported memory.
#[derive(Debug, Clone)]
pub struct MemoryInfo {
    /// Export name.
    pub name: String,
    /// Minimum size in pages (64KB each).
    pub min_pages: u64,
    /// Maximum size in pages, if specified.
    pub max_pages: Option<u64>,
    /// Whether this is a 64-bit memory.
    pub memory64: bool,
}

/// Loader for guest modules.
pub struct ModuleLoader {
    /// Reference to the engine used for compilation.
    engine: Arc<TetherEngine>,
}

impl ModuleLoader {
    /// Create a new module loader with the given engine.
    pub fn new(engine: Arc<TetherEngine>) -> Self {
        Self { engine }
    }

    /// Compile a module from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are not a valid WASM module.
    pub fn load_bytes(&self, bytes: &[u8]) -> ModuleResult<ValidatedModule> {
        debug!(size = bytes.len(), "Loading WASM module from bytes");

        let module = Module::new(self.engine.inner(), bytes)?;
        let metadata = extract_metadata(&module);

        info!(
            name = ?metadata.name,
            exports = metadata.exports.len(),
            imports = metadata.imports.len(),
            "Loaded WASM module"
        );

        Ok(ValidatedModule {
            inner: module,
            metadata,
        })
    }

    /// Compile a module from a file.
    ///
    /// Files ending in `.wat` are parsed as text; anything else must be a
    /// binary module.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or does not compile.
    pub fn load_file(&self, path: &Path) -> ModuleResult<ValidatedModule> {
        debug!(path = %path.display(), "Loading WASM module from file");

        let bytes = std::fs::read(path)?;
        if path.extension().is_some_and(|ext| ext == "wat") {
            let text = String::from_utf8(bytes).map_err(|e| ModuleError::Invalid(e.to_string()))?;
            return self.load_wat(&text);
        }
        self.load_bytes(&bytes)
    }

    /// Compile a module from WAT (WebAssembly Text) format.
    ///
    /// This is primarily useful for testing and development.
    ///
    /// # Errors
    ///
    /// Returns an error if the WAT is invalid.
    pub fn load_wat(&self, wat: &str) -> ModuleResult<ValidatedModule> {
        debug!(size = wat.len(), "Loading WASM module from WAT");

        let wasm = wat::parse_str(wat).map_err(|e| ModuleError::Invalid(e.to_string()))?;
        self.load_bytes(&wasm)
    }
}

fn extract_metadata(module: &Module) -> ModuleMetadata {
    let name = module.name().map(String::from);

    let exports = module
        .exports()
        .map(|export| ExportInfo {
            name: export.name().to_string(),
            kind: item_kind(export.ty()),
        })
        .collect();

    let imports = module
        .imports()
        .map(|import| ImportInfo {
            module: import.module().to_string(),
            name: import.name().to_string(),
            kind: item_kind(import.ty()),
        })
        .collect();

    let memories = module
        .exports()
        .filter_map(|export| match export.ty() {
            ExternType::Memory(mem) => Some(MemoryInfo {
                name: export.name().to_string(),
                min_pages: mem.minimum(),
                max_pages: mem.maximum(),
                memory64: mem.is_64(),
            }),
            _ => None,
        })
        .collect();

    ModuleMetadata {
        name,
        exports,
        imports,
        memories,
    }
}

fn item_kind(ty: ExternType) -> ItemKind {
    match ty {
        ExternType::Func(func) => function_kind(&func),
        ExternType::Memory(_) => ItemKind::Memory,
        ExternType::Global(_) => ItemKind::Global,
        ExternType::Table(_) => ItemKind::Table,
    }
}

fn function_kind(func: &FuncType) -> ItemKind {
    ItemKind::Function {
        params: func.params().map(|p| p.to_string()).collect(),
        results: func.results().map(|r| r.to_string()).collect(),
    }
}
