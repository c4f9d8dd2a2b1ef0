//! A guest instance bundled with everything needed to call it.

use std::collections::HashMap;
use std::sync::Arc;

use tether_core::GuestInstance;
use tether_marshal::{Signature, TypeRegistry, Value, WrapOptions, WrappedFunction, wrap};
use tracing::debug;

use crate::TetherError;

/// A guest plus its type registry, wrapper options, and the functions
/// already wrapped for it.
///
/// Wrapping is done once per `(name, signature)`; later requests for the
/// same pair get the cached wrapper.
pub struct Bridge {
    guest: GuestInstance,
    registry: TypeRegistry,
    options: WrapOptions,
    cache: HashMap<(String, Signature), Arc<WrappedFunction>>,
}

impl Bridge {
    /// Bundle a guest with a registry and options.
    pub fn new(guest: GuestInstance, registry: TypeRegistry, options: WrapOptions) -> Self {
        Self {
            guest,
            registry,
            options,
            cache: HashMap::new(),
        }
    }

    /// The guest instance.
    pub fn guest(&self) -> &GuestInstance {
        &self.guest
    }

    /// The guest instance, mutably. Raw calls through it bypass marshaling.
    pub fn guest_mut(&mut self) -> &mut GuestInstance {
        &mut self.guest
    }

    /// The registry used to resolve type names.
    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// Parse a signature such as `"&str, bool -> bool"` with this bridge's
    /// registry.
    pub fn signature(&self, text: &str) -> Result<Signature, TetherError> {
        Ok(Signature::parse_str(&self.registry, text)?)
    }

    /// Wrap `name` with argument and return type names.
    pub fn wrap(
        &mut self,
        name: &str,
        args: &[&str],
        ret: &str,
    ) -> Result<Arc<WrappedFunction>, TetherError> {
        let signature = Signature::parse(&self.registry, args, ret)?;
        self.wrap_signature(name, signature)
    }

    /// Wrap `name` with a resolved signature.
    pub fn wrap_signature(
        &mut self,
        name: &str,
        signature: Signature,
    ) -> Result<Arc<WrappedFunction>, TetherError> {
        let key = (name.to_string(), signature);
        if let Some(function) = self.cache.get(&key) {
            return Ok(Arc::clone(function));
        }

        let function = Arc::new(wrap(&self.guest, name, key.1.clone(), self.options.clone())?);
        debug!(
            instance_id = %self.guest.id(),
            function = name,
            direct = function.is_direct(),
            "Cached wrapped function"
        );
        self.cache.insert(key, Arc::clone(&function));
        Ok(function)
    }

    /// Call a function wrapped by this bridge.
    pub fn call_wrapped(
        &mut self,
        function: &WrappedFunction,
        args: &[Value],
    ) -> Result<Value, TetherError> {
        Ok(function.call(&mut self.guest, args)?)
    }

    /// Wrap (or reuse) `name` with a textual signature and call it.
    pub fn call(
        &mut self,
        name: &str,
        signature: &str,
        args: &[Value],
    ) -> Result<Value, TetherError> {
        let signature = self.signature(signature)?;
        let function = self.wrap_signature(name, signature)?;
        self.call_wrapped(&function, args)
    }

    /// Number of cached wrappers.
    pub fn cached_functions(&self) -> usize {
        self.cache.len()
    }
}

impl std::fmt::Debug for Bridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bridge")
            .field("guest", &self.guest)
            .field("cached_functions", &self.cache.len())
            .finish()
    }
}
