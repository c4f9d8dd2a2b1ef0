//! Host-side values passed to and returned from wrapped functions.

use serde::Serialize;

use crate::error::{MarshalError, MarshalResult};
use crate::types::{ElementKind, TypeTag};

/// A host-native value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    /// A 32-bit integer.
    I32(i32),
    /// A float. Accepted where `i32` is expected, truncated toward zero.
    Number(f64),
    /// A boolean.
    Bool(bool),
    /// A UTF-8 string.
    Str(String),
    /// A byte array.
    Bytes(Vec<u8>),
    /// A 16-bit unsigned integer array.
    U16s(Vec<u16>),
    /// A 32-bit unsigned integer array.
    U32s(Vec<u32>),
    /// A 32-bit float array.
    F32s(Vec<f32>),
    /// No value.
    Unit,
}

impl Value {
    /// Short name of the value's shape, for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::I32(_) => "i32",
            Value::Number(_) => "number",
            Value::Bool(_) => "bool",
            Value::Str(_) => "string",
            Value::Bytes(_) => "byte array",
            Value::U16s(_) => "u16 array",
            Value::U32s(_) => "u32 array",
            Value::F32s(_) => "f32 array",
            Value::Unit => "unit",
        }
    }

    /// Get the integer, if this is one.
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Value::I32(v) => Some(*v),
            _ => None,
        }
    }

    /// Get the boolean, if this is one.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Get the string, if this is one.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Get the bytes, if this is a byte array.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Take the string out, if this is one.
    pub fn into_string(self) -> Option<String> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Take the bytes out, if this is a byte array.
    pub fn into_bytes(self) -> Option<Vec<u8>> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Whether this is [`Value::Unit`].
    pub fn is_unit(&self) -> bool {
        matches!(self, Value::Unit)
    }

    /// Parse command-line text into the value a tag expects.
    ///
    /// Arrays are comma separated, optionally wrapped in brackets
    /// (`"1,2,3"` or `"[1, 2, 3]"`).
    pub fn parse_as(tag: TypeTag, text: &str) -> MarshalResult<Value> {
        let bad = |what: &str| MarshalError::type_mismatch(format!("{what} for `{tag}`"), text);
        match tag {
            TypeTag::I32 => {
                let trimmed = text.trim();
                trimmed
                    .parse::<i32>()
                    .map(Value::I32)
                    .or_else(|_| trimmed.parse::<f64>().map(Value::Number))
                    .map_err(|_| bad("a number"))
            }
            TypeTag::Bool => match text.trim() {
                "true" | "1" => Ok(Value::Bool(true)),
                "false" | "0" => Ok(Value::Bool(false)),
                _ => Err(bad("true or false")),
            },
            TypeTag::CStr | TypeTag::StrSlice | TypeTag::OwnedString => {
                Ok(Value::Str(text.to_string()))
            }
            TypeTag::ByteSlice | TypeTag::Vector(ElementKind::U8) => {
                parse_list(text).map(Value::Bytes).map_err(|_| bad("bytes"))
            }
            TypeTag::Vector(ElementKind::U16) => {
                parse_list(text).map(Value::U16s).map_err(|_| bad("u16 values"))
            }
            TypeTag::Vector(ElementKind::U32) => {
                parse_list(text).map(Value::U32s).map_err(|_| bad("u32 values"))
            }
            TypeTag::Vector(ElementKind::F32) => {
                parse_list(text).map(Value::F32s).map_err(|_| bad("f32 values"))
            }
            TypeTag::Unit => Err(MarshalError::Unimplemented(
                "unit type `()` in argument position".to_string(),
            )),
        }
    }
}

fn parse_list<T: std::str::FromStr>(text: &str) -> Result<Vec<T>, T::Err> {
    let inner = text
        .trim()
        .trim_start_matches('[')
        .trim_end_matches(']')
        .trim();
    if inner.is_empty() {
        return Ok(Vec::new());
    }
    inner.split(',').map(|item| item.trim().parse()).collect()
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::I32(v) => write!(f, "{v}"),
            Value::Number(v) => write!(f, "{v}"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Str(s) => f.write_str(s),
            Value::Bytes(v) => write!(f, "{v:?}"),
            Value::U16s(v) => write!(f, "{v:?}"),
            Value::U32s(v) => write!(f, "{v:?}"),
            Value::F32s(v) => write!(f, "{v:?}"),
            Value::Unit => f.write_str("()"),
        }
    }
}

macro_rules! impl_from {
    ($ty:ty, $variant:ident) => {
        impl From<$ty> for Value {
            fn from(v: $ty) -> Self {
                Value::$variant(v)
            }
        }
    };
}

impl_from!(i32, I32);
impl_from!(f64, Number);
impl_from!(bool, Bool);
impl_from!(String, Str);
impl_from!(Vec<u8>, Bytes);
impl_from!(Vec<u16>, U16s);
impl_from!(Vec<u32>, U32s);
impl_from!(Vec<f32>, F32s);

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<&[u8]> for Value {
    fn from(b: &[u8]) -> Self {
        Value::Bytes(b.to_vec())
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Unit
    }
}
