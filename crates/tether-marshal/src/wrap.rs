//! Function wrapping: turning a named guest export plus a signature into a
//! host-callable function.
//!
//! A signature whose arguments and return are all simple produces a direct
//! wrapper that hands values straight to the export. Anything else goes
//! through the marshaled pipeline:
//!
//! 1. check arity
//! 2. encode each argument, left to right
//! 3. allocate the return type's out-parameter and insert it into the
//!    argument list at the configured [`OutParamPosition`]
//! 4. invoke the export
//! 5. decode the out-parameter, or the raw result
//!
//! Guest memory allocated along the way is never freed.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tether_observe::Logger;

use crate::convert::RawReturn;
use crate::error::{MarshalError, MarshalResult};
use crate::exports::GuestExports;
use crate::types::{TypeRegistry, TypeTag};
use crate::value::Value;

const TARGET: &str = "tether_marshal::wrap";

/// Where the out-parameter pointer goes in the guest argument list.
///
/// This is part of the guest ABI: the host and the guest must agree on it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutParamPosition {
    /// Before the first argument.
    #[default]
    Prepend,
    /// After the last argument.
    Append,
}

impl fmt::Display for OutParamPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutParamPosition::Prepend => f.write_str("prepend"),
            OutParamPosition::Append => f.write_str("append"),
        }
    }
}

/// Argument and return types of a guest export.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Signature {
    /// Argument types, in call order.
    pub args: Vec<TypeTag>,
    /// Return type.
    pub ret: TypeTag,
}

impl Signature {
    /// Create a signature from resolved tags.
    pub fn new(args: Vec<TypeTag>, ret: TypeTag) -> Self {
        Self { args, ret }
    }

    /// Resolve textual type names through `registry`.
    pub fn parse(registry: &TypeRegistry, args: &[&str], ret: &str) -> MarshalResult<Self> {
        let args = args
            .iter()
            .map(|name| registry.resolve(name))
            .collect::<MarshalResult<Vec<_>>>()?;
        Ok(Self {
            args,
            ret: registry.resolve(ret)?,
        })
    }

    /// Parse the textual form `"&str, bool -> bool"`.
    ///
    /// The argument list may be wrapped in parentheses; `"-> i32"` and
    /// `"() -> i32"` both declare no arguments.
    pub fn parse_str(registry: &TypeRegistry, text: &str) -> MarshalResult<Self> {
        let (args, ret) = text.rsplit_once("->").ok_or_else(|| {
            MarshalError::type_mismatch("a signature of the form `args -> ret`", text)
        })?;
        let mut args = args.trim();
        if let Some(inner) = args.strip_prefix('(').and_then(|a| a.strip_suffix(')')) {
            args = inner.trim();
        }
        let names: Vec<&str> = if args.is_empty() {
            Vec::new()
        } else {
            args.split(',').map(str::trim).collect()
        };
        Self::parse(registry, &names, ret.trim())
    }

    /// Whether calls can skip marshaling entirely.
    pub fn is_simple(&self) -> bool {
        self.args.iter().all(TypeTag::is_simple_arg) && self.ret.is_simple_return()
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{arg}")?;
        }
        write!(f, ") -> {}", self.ret)
    }
}

impl FromStr for Signature {
    type Err = MarshalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_str(&TypeRegistry::new(), s)
    }
}

/// Options for [`wrap`].
#[derive(Debug, Clone, Default)]
pub struct WrapOptions {
    /// ABI convention for out-parameters.
    pub out_param_position: OutParamPosition,
    /// Where wrapper diagnostics go.
    pub logger: Logger,
}

impl WrapOptions {
    /// Set the out-parameter position.
    pub fn with_out_param_position(mut self, position: OutParamPosition) -> Self {
        self.out_param_position = position;
        self
    }

    /// Set the logger.
    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = logger;
        self
    }
}

/// A guest export bound to a signature.
///
/// The wrapper does not own the guest; it is handed the exports on every
/// call, so one wrapper can be reused for the life of the instance.
#[derive(Debug, Clone)]
pub struct WrappedFunction {
    name: String,
    signature: Signature,
    direct: bool,
    options: WrapOptions,
}

/// Wrap the export `name` of `exports` with `signature`.
///
/// Fails with `MissingExport` if the guest does not export `name`.
pub fn wrap<E: GuestExports + ?Sized>(
    exports: &E,
    name: &str,
    signature: Signature,
    options: WrapOptions,
) -> MarshalResult<WrappedFunction> {
    if !exports.has_export(name) {
        return Err(MarshalError::MissingExport(name.to_string()));
    }
    let direct = signature.is_simple();
    options.logger.debug(
        TARGET,
        format_args!(
            "wrapped `{name}` {signature} ({})",
            if direct { "direct" } else { "marshaled" }
        ),
    );
    Ok(WrappedFunction {
        name: name.to_string(),
        signature,
        direct,
        options,
    })
}

impl WrappedFunction {
    /// The export this wrapper calls.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The declared signature.
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Whether calls bypass marshaling.
    pub fn is_direct(&self) -> bool {
        self.direct
    }

    /// Call the export with host values.
    pub fn call<E: GuestExports + ?Sized>(
        &self,
        exports: &mut E,
        args: &[Value],
    ) -> MarshalResult<Value> {
        if args.len() != self.signature.args.len() {
            return Err(MarshalError::ArityMismatch {
                function: self.name.clone(),
                expected: self.signature.args.len(),
                actual: args.len(),
            });
        }
        if self.direct {
            self.call_direct(exports, args)
        } else {
            self.call_marshaled(exports, args)
        }
    }

    fn call_direct<E: GuestExports + ?Sized>(
        &self,
        exports: &mut E,
        args: &[Value],
    ) -> MarshalResult<Value> {
        let words = self
            .signature
            .args
            .iter()
            .zip(args)
            .map(|(tag, value)| tag.encode_arg(value, exports))
            .collect::<MarshalResult<Vec<i32>>>()?;
        let result = exports.call(&self.name, &words)?;
        self.signature
            .ret
            .decode_return(RawReturn::Register(result), exports)
    }

    fn call_marshaled<E: GuestExports + ?Sized>(
        &self,
        exports: &mut E,
        args: &[Value],
    ) -> MarshalResult<Value> {
        let logger = &self.options.logger;

        let mut words = Vec::with_capacity(args.len() + 1);
        for (tag, value) in self.signature.args.iter().zip(args) {
            let word = tag.encode_arg(value, exports)?;
            logger.trace(TARGET, format_args!("`{}`: {tag} arg -> {word}", self.name));
            words.push(word);
        }

        let out_param = self.signature.ret.allocate_out_param(exports)?;
        if let Some(ptr) = out_param {
            logger.trace(
                TARGET,
                format_args!(
                    "`{}`: out-parameter at {ptr} ({})",
                    self.name, self.options.out_param_position
                ),
            );
            match self.options.out_param_position {
                OutParamPosition::Prepend => words.insert(0, ptr as i32),
                OutParamPosition::Append => words.push(ptr as i32),
            }
        }

        logger.debug(TARGET, format_args!("calling `{}` with {words:?}", self.name));
        let result = exports.call(&self.name, &words)?;

        let raw = match out_param {
            Some(ptr) => RawReturn::OutParam(ptr),
            None => RawReturn::Register(result),
        };
        self.signature.ret.decode_return(raw, exports)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tether_observe::{CollectingSink, LogLevel, LogSink};

    use super::*;
    use crate::exports::Pointer;
    use crate::testing::{FakeGuest, FakeHeap};
    use crate::types::ElementKind;

    fn sig(text: &str) -> Signature {
        text.parse().unwrap()
    }

    fn quiet() -> WrapOptions {
        WrapOptions::default().with_logger(Logger::disabled())
    }

    /// `&str` argument descriptor -> (data, len).
    fn str_arg(heap: &FakeHeap, descriptor: i32) -> String {
        let descriptor = descriptor as Pointer;
        let data = heap.read_u32(descriptor);
        let len = heap.read_u32(descriptor + 4);
        String::from_utf8(heap.read(data, len).to_vec()).unwrap()
    }

    fn echo_guest() -> FakeGuest {
        // echo_str(ret_ptr, arg_ptr): copy the argument descriptor into ret_ptr.
        FakeGuest::new().export("echo_str", |heap, args| {
            let (out, arg) = (args[0] as Pointer, args[1] as Pointer);
            let (data, len) = (heap.read_u32(arg), heap.read_u32(arg + 4));
            heap.write_pair(out, data, len);
            None
        })
    }

    #[test]
    fn test_signature_text() {
        let signature = sig("&str, bool -> bool");
        assert_eq!(signature.args, vec![TypeTag::StrSlice, TypeTag::Bool]);
        assert_eq!(signature.ret, TypeTag::Bool);
        assert_eq!(signature.to_string(), "(&str, bool) -> bool");
        assert_eq!(sig(&signature.to_string()), signature);

        assert!(sig("-> i32").args.is_empty());
        assert!(sig("() -> i32").args.is_empty());
        assert_eq!(sig("I32, I32 -> void").ret, TypeTag::Unit);
    }

    #[test]
    fn test_signature_errors() {
        assert!(matches!(
            "i32, i32".parse::<Signature>(),
            Err(MarshalError::TypeMismatch { .. })
        ));
        assert!(matches!(
            "i64 -> i32".parse::<Signature>(),
            Err(MarshalError::UnsupportedType(name)) if name == "i64"
        ));
        assert!(matches!(
            "i32 -> Option<i32>".parse::<Signature>(),
            Err(MarshalError::UnsupportedType(_))
        ));
    }

    #[test]
    fn test_missing_export() {
        let guest = FakeGuest::new();
        let err = wrap(&guest, "nope", sig("i32 -> i32"), quiet()).unwrap_err();
        assert!(matches!(err, MarshalError::MissingExport(name) if name == "nope"));
    }

    #[test]
    fn test_add_direct_path() {
        let mut guest = FakeGuest::new().export("add", |_, _| Some(42));
        let add = wrap(&guest, "add", sig("i32, i32 -> i32"), quiet()).unwrap();
        assert!(add.is_direct());

        let a = add.call(&mut guest, &[2.into(), 2.into()]).unwrap();
        let b = add.call(&mut guest, &[1.1.into(), 1.1.into()]).unwrap();
        assert_eq!(a, Value::I32(42));
        assert_eq!(b, Value::I32(42));

        assert_eq!(guest.heap.alloc_calls, 0);
        let calls = guest.function_calls();
        assert_eq!(calls[0].1, vec![2, 2]);
        assert_eq!(calls[1].1, vec![1, 1]);
    }

    #[test]
    fn test_direct_matches_raw_call() {
        let mut guest = FakeGuest::new().export("sub", |_, args| Some(args[0] - args[1]));
        let sub = wrap(&guest, "sub", sig("i32, i32 -> i32"), quiet()).unwrap();

        let raw = guest.call("sub", &[10, 3]).unwrap();
        let wrapped = sub.call(&mut guest, &[10.into(), 3.into()]).unwrap();
        assert_eq!(Value::I32(raw.unwrap()), wrapped);
        assert_eq!(guest.heap.alloc_calls, 0);
    }

    #[test]
    fn test_unit_return_is_direct() {
        let mut guest = FakeGuest::new().export("tick", |_, _| None);
        let tick = wrap(&guest, "tick", sig("i32 -> ()"), quiet()).unwrap();
        assert!(tick.is_direct());
        assert_eq!(tick.call(&mut guest, &[5.into()]).unwrap(), Value::Unit);
    }

    #[test]
    fn test_echo_str_prepend() {
        let mut guest = echo_guest();
        let echo = wrap(&guest, "echo_str", sig("&str -> &str"), quiet()).unwrap();
        assert!(!echo.is_direct());

        for input in ["Banana", ""] {
            let out = echo.call(&mut guest, &[input.into()]).unwrap();
            assert_eq!(out, Value::Str(input.to_string()));
        }
    }

    #[test]
    fn test_echo_str_append() {
        // Same guest with the out-parameter as the trailing argument.
        let mut guest = FakeGuest::new().export("echo_str", |heap, args| {
            let (arg, out) = (args[0] as Pointer, args[1] as Pointer);
            let (data, len) = (heap.read_u32(arg), heap.read_u32(arg + 4));
            heap.write_pair(out, data, len);
            None
        });
        let options = quiet().with_out_param_position(OutParamPosition::Append);
        let echo = wrap(&guest, "echo_str", sig("&str -> &str"), options).unwrap();

        let out = echo.call(&mut guest, &["Banana".into()]).unwrap();
        assert_eq!(out.as_str(), Some("Banana"));
    }

    #[test]
    fn test_out_param_position_is_observable() {
        let mut guest = echo_guest();
        let prepend = wrap(&guest, "echo_str", sig("&str -> &str"), quiet()).unwrap();
        prepend.call(&mut guest, &["x".into()]).unwrap();

        // Allocation order: arg data, arg descriptor, then the out-parameter.
        let (_, args) = guest.function_calls()[0].clone();
        assert!(args[0] > args[1]);
    }

    #[test]
    fn test_is_fancy() {
        let mut guest = FakeGuest::new().export("is_fancy", |heap, args| {
            let name = str_arg(heap, args[0]);
            Some(i32::from(args[1] == 1 && name.chars().count() > 4))
        });
        let is_fancy = wrap(&guest, "is_fancy", sig("&str, bool -> bool"), quiet()).unwrap();

        let cases = [("Banana", true, true), ("Apple", false, false), ("N/A", true, false)];
        for (name, expected, fancy) in cases {
            let out = is_fancy
                .call(&mut guest, &[name.into(), expected.into()])
                .unwrap();
            assert_eq!(out, Value::Bool(fancy), "{name}");
        }
    }

    #[test]
    fn test_digest_bytes() {
        let mut guest = FakeGuest::new().export("digest_bytes", |heap, args| {
            let out = args[0] as Pointer;
            let data = heap.store(&[13, 37, 42, 42]);
            heap.write_pair(out, data, 4);
            heap.write_u32(out + 8, 4);
            None
        });
        let digest = wrap(&guest, "digest_bytes", sig("&[u8] -> Vec<u8>"), quiet()).unwrap();

        let out = digest
            .call(&mut guest, &[vec![1u8, 2, 3, 4].into()])
            .unwrap();
        assert_eq!(out, Value::Bytes(vec![13, 37, 42, 42]));
        // payload + descriptor + 3-word out-parameter + guest's own result
        assert_eq!(guest.heap.alloc_calls, 4);
    }

    #[test]
    fn test_vector_returns() {
        let mut guest = FakeGuest::new()
            .export("wide", |heap, args| {
                let out = args[0] as Pointer;
                let mut bytes = Vec::new();
                for v in [0u16, 1, 65500, u16::MAX] {
                    bytes.extend_from_slice(&v.to_le_bytes());
                }
                let data = heap.store(&bytes);
                heap.write_pair(out, data, 4);
                None
            })
            .export("floats", |heap, args| {
                let out = args[0] as Pointer;
                let data = heap.store(&1.5f32.to_le_bytes());
                heap.write_pair(out, data, 1);
                None
            });

        let wide = wrap(&guest, "wide", sig("-> Vec<u16>"), quiet()).unwrap();
        let floats = wrap(&guest, "floats", sig("-> Vec<f32>"), quiet()).unwrap();

        assert_eq!(
            wide.call(&mut guest, &[]).unwrap(),
            Value::U16s(vec![0, 1, 65500, u16::MAX])
        );
        assert_eq!(floats.call(&mut guest, &[]).unwrap(), Value::F32s(vec![1.5]));
        assert_eq!(
            wide.signature().ret,
            TypeTag::Vector(ElementKind::U16)
        );
    }

    #[test]
    fn test_cstr_in_and_out() {
        let mut guest = FakeGuest::new()
            .export("time", |heap, _| Some(heap.store(b"12:00\0") as i32))
            .export("cstrlen", |heap, args| {
                let start = args[0] as usize;
                let len = heap.bytes[start..].iter().position(|&b| b == 0).unwrap();
                Some(len as i32)
            });

        let time = wrap(&guest, "time", sig("-> CStr"), quiet()).unwrap();
        assert_eq!(time.call(&mut guest, &[]).unwrap(), Value::Str("12:00".into()));

        let cstrlen = wrap(&guest, "cstrlen", sig("CStr -> i32"), quiet()).unwrap();
        assert_eq!(
            cstrlen.call(&mut guest, &["fünf".into()]).unwrap(),
            Value::I32(5)
        );
    }

    #[test]
    fn test_arity_mismatch_touches_nothing() {
        let mut guest = echo_guest().export("add", |_, _| Some(42));
        let echo = wrap(&guest, "echo_str", sig("&str -> &str"), quiet()).unwrap();
        let add = wrap(&guest, "add", sig("i32, i32 -> i32"), quiet()).unwrap();
        let before = guest.heap.bytes.clone();

        let err = echo
            .call(&mut guest, &["a".into(), "b".into()])
            .unwrap_err();
        assert!(matches!(
            err,
            MarshalError::ArityMismatch { expected: 1, actual: 2, .. }
        ));
        let err = add.call(&mut guest, &[1.into()]).unwrap_err();
        assert!(matches!(
            err,
            MarshalError::ArityMismatch { ref function, expected: 2, actual: 1 } if function == "add"
        ));

        assert!(guest.calls.is_empty());
        assert_eq!(guest.heap.bytes, before);
    }

    #[test]
    fn test_argument_errors() {
        let mut guest = FakeGuest::new()
            .export("takes_unit", |_, _| Some(0))
            .export("takes_str", |_, _| Some(0));

        let unit = wrap(&guest, "takes_unit", sig("() , i32 -> i32"), quiet());
        // `() , i32` is not wrapped in one pair of parens, so `()` is an argument.
        let unit = unit.unwrap();
        assert!(matches!(
            unit.call(&mut guest, &[Value::Unit, 1.into()]),
            Err(MarshalError::Unimplemented(_))
        ));

        let takes_str = wrap(&guest, "takes_str", sig("&str -> i32"), quiet()).unwrap();
        assert!(matches!(
            takes_str.call(&mut guest, &[7.into()]),
            Err(MarshalError::TypeMismatch { .. })
        ));
        assert!(guest.function_calls().is_empty());
    }

    #[test]
    fn test_logging_through_injected_logger() {
        let sink = Arc::new(CollectingSink::new(100));
        let logger = Logger::new(Arc::clone(&sink) as Arc<dyn LogSink>, LogLevel::Debug);
        let options = WrapOptions::default().with_logger(logger);

        let mut guest = echo_guest();
        let echo = wrap(&guest, "echo_str", sig("&str -> &str"), options).unwrap();
        echo.call(&mut guest, &["Banana".into()]).unwrap();

        let debug = sink.messages_at(LogLevel::Debug);
        assert!(debug.iter().any(|m| m.contains("marshaled")));
        assert!(debug.iter().any(|m| m.starts_with("calling `echo_str`")));
        // Trace is below the threshold.
        assert!(sink.messages_at(LogLevel::Trace).is_empty());
    }
}
