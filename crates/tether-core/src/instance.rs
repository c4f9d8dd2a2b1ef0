//! Running guest instances.
//!
//! A [`GuestInstance`] owns the Wasmtime store and instance for one guest
//! and is the runtime side of [`GuestExports`]: everything the marshaling
//! layer does to a guest goes through it.

use tether_marshal::{GuestExports, MarshalError, MarshalResult};
use tracing::{debug, info, warn};
use uuid::Uuid;
use wasmtime::{FuncType, Instance, Linker, Memory, Store, Val};

use crate::config::ExportNames;
use crate::engine::SharedEngine;
use crate::error::{InstanceError, InstanceResult};
use crate::module::ValidatedModule;

/// Unique identifier for a guest instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InstanceId(Uuid);

impl InstanceId {
    /// Create a new random instance ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for InstanceId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for InstanceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An instantiated guest module.
///
/// Guests must be self-contained: no host functions are linked, so a module
/// with imports is rejected.
pub struct GuestInstance {
    id: InstanceId,
    store: Store<()>,
    instance: Instance,
    /// Looked up once; the handle stays valid as the memory grows.
    memory: Option<Memory>,
    module: ValidatedModule,
    names: ExportNames,
}

impl GuestInstance {
    /// Instantiate `module` expecting the default export names.
    pub fn new(engine: &SharedEngine, module: &ValidatedModule) -> InstanceResult<Self> {
        Self::with_export_names(engine, module, ExportNames::default())
    }

    /// Instantiate `module` with custom memory and allocator export names.
    pub fn with_export_names(
        engine: &SharedEngine,
        module: &ValidatedModule,
        names: ExportNames,
    ) -> InstanceResult<Self> {
        if let Some(import) = module.imports().first() {
            return Err(InstanceError::UnresolvedImport {
                module: import.module.clone(),
                name: import.name.clone(),
            });
        }

        let id = InstanceId::new();
        let mut store = Store::new(engine.inner(), ());
        let linker = Linker::new(engine.inner());
        let instance = linker.instantiate(&mut store, module.inner())?;

        let memory = instance.get_memory(&mut store, &names.memory);
        if memory.is_none() {
            warn!(
                instance_id = %id,
                memory_export = %names.memory,
                "Guest has no memory export; only integer signatures will work"
            );
        }

        info!(
            instance_id = %id,
            module_name = ?module.name(),
            "Instantiated guest"
        );

        Ok(Self {
            id,
            store,
            instance,
            memory,
            module: module.clone(),
            names,
        })
    }

    /// Get the instance ID.
    pub fn id(&self) -> InstanceId {
        self.id
    }

    /// The module this instance was created from.
    pub fn module(&self) -> &ValidatedModule {
        &self.module
    }

    /// The export names this instance uses.
    pub fn export_names(&self) -> &ExportNames {
        &self.names
    }

    /// Current size of the guest memory in bytes, `0` without one.
    pub fn memory_size(&self) -> usize {
        self.memory
            .map(|memory| memory.data_size(&self.store))
            .unwrap_or(0)
    }

    /// The core wasm type of an exported function.
    pub fn func_type(&mut self, name: &str) -> Option<FuncType> {
        let func = self.instance.get_func(&mut self.store, name)?;
        Some(func.ty(&self.store))
    }
}

impl GuestExports for GuestInstance {
    fn has_export(&self, name: &str) -> bool {
        self.module.has_export(name)
    }

    fn call(&mut self, name: &str, args: &[i32]) -> MarshalResult<Option<i32>> {
        let func = self
            .instance
            .get_func(&mut self.store, name)
            .ok_or_else(|| MarshalError::MissingExport(name.to_string()))?;

        let result_count = func.ty(&self.store).results().len();
        let params: Vec<Val> = args.iter().map(|&arg| Val::I32(arg)).collect();
        let mut results = vec![Val::I32(0); result_count];

        debug!(instance_id = %self.id, function = name, ?args, "Calling guest export");

        if let Err(err) = func.call(&mut self.store, &params, &mut results) {
            if let Some(trap) = err.downcast_ref::<wasmtime::Trap>() {
                warn!(instance_id = %self.id, function = name, trap = ?trap, "Guest trapped");
            }
            return Err(MarshalError::Guest {
                export: name.to_string(),
                source: err.into(),
            });
        }

        match results.as_slice() {
            [] => Ok(None),
            [Val::I32(value)] => Ok(Some(*value)),
            other => Err(MarshalError::type_mismatch(
                format!("at most one i32 result from `{name}`"),
                format!("{other:?}"),
            )),
        }
    }

    fn memory(&mut self) -> MarshalResult<&mut [u8]> {
        let memory = self
            .memory
            .ok_or_else(|| MarshalError::MissingExport(self.names.memory.clone()))?;
        Ok(memory.data_mut(&mut self.store))
    }

    fn alloc_export(&self) -> &str {
        &self.names.alloc
    }
}

impl std::fmt::Debug for GuestInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuestInstance")
            .field("id", &self.id)
            .field("module", &self.module)
            .field("memory_size", &self.memory_size())
            .finish()
    }
}
