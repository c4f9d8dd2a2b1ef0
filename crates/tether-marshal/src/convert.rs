//! Per-tag conversion between [`Value`]s and guest words.
//!
//! Every codec call re-acquires the memory view, so nothing here caches a
//! byte slice across a guest call.

use crate::error::{MarshalError, MarshalResult};
use crate::exports::{GuestExports, Pointer};
use crate::memory::WORD_BYTES;
use crate::types::{ElementKind, TypeTag};
use crate::value::Value;
use crate::{slice, string, vector};

/// What a guest call handed back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawReturn {
    /// The call's own result register.
    Register(Option<i32>),
    /// Scratch space the guest filled in.
    OutParam(Pointer),
}

impl TypeTag {
    /// Turn a host value into the single guest word this tag passes.
    ///
    /// Pointer-based tags allocate and write guest memory.
    pub fn encode_arg<E: GuestExports + ?Sized>(
        &self,
        value: &Value,
        exports: &mut E,
    ) -> MarshalResult<i32> {
        let ptr = match (self, value) {
            (TypeTag::I32, Value::I32(v)) => return Ok(*v),
            // `as` truncates toward zero and saturates, NaN becomes 0.
            (TypeTag::I32, Value::Number(v)) => return Ok(*v as i32),
            (TypeTag::Bool, Value::Bool(v)) => return Ok(i32::from(*v)),
            (TypeTag::Unit, _) => {
                return Err(MarshalError::Unimplemented(
                    "unit type `()` in argument position".to_string(),
                ));
            }
            (TypeTag::CStr, Value::Str(s)) => string::encode_cstr(exports, s)?,
            (TypeTag::StrSlice | TypeTag::OwnedString, Value::Str(s)) => {
                string::encode_str(exports, s)?
            }
            (TypeTag::ByteSlice | TypeTag::Vector(ElementKind::U8), Value::Bytes(b)) => {
                slice::encode(exports, b)?
            }
            (TypeTag::Vector(ElementKind::U16), Value::U16s(v)) => vector::encode(exports, v)?,
            (TypeTag::Vector(ElementKind::U32), Value::U32s(v)) => vector::encode(exports, v)?,
            (TypeTag::Vector(ElementKind::F32), Value::F32s(v)) => vector::encode(exports, v)?,
            (tag, value) => {
                return Err(MarshalError::type_mismatch(
                    format!("a value for `{tag}`"),
                    value.kind(),
                ));
            }
        };
        Ok(ptr as i32)
    }

    /// Allocate the scratch space this tag needs as a return type, if any.
    pub fn allocate_out_param<E: GuestExports + ?Sized>(
        &self,
        exports: &mut E,
    ) -> MarshalResult<Option<Pointer>> {
        match self.out_param_words() {
            Some(words) => Ok(Some(exports.alloc(words * WORD_BYTES)?)),
            None => Ok(None),
        }
    }

    /// Turn what the guest handed back into a host value.
    pub fn decode_return<E: GuestExports + ?Sized>(
        &self,
        raw: RawReturn,
        exports: &mut E,
    ) -> MarshalResult<Value> {
        match raw {
            RawReturn::OutParam(ptr) => self.decode_out_param(ptr, exports),
            RawReturn::Register(word) => self.decode_register(word, exports),
        }
    }

    fn decode_out_param<E: GuestExports + ?Sized>(
        &self,
        ptr: Pointer,
        exports: &mut E,
    ) -> MarshalResult<Value> {
        Ok(match self {
            TypeTag::StrSlice | TypeTag::OwnedString => Value::Str(string::decode_str(exports, ptr)?),
            TypeTag::ByteSlice | TypeTag::Vector(ElementKind::U8) => {
                Value::Bytes(slice::decode(exports, ptr)?)
            }
            TypeTag::Vector(ElementKind::U16) => Value::U16s(vector::decode(exports, ptr)?),
            TypeTag::Vector(ElementKind::U32) => Value::U32s(vector::decode(exports, ptr)?),
            TypeTag::Vector(ElementKind::F32) => Value::F32s(vector::decode(exports, ptr)?),
            TypeTag::I32 | TypeTag::Bool | TypeTag::CStr | TypeTag::Unit => {
                return Err(MarshalError::Unimplemented(format!(
                    "`{self}` returned through an out-parameter"
                )));
            }
        })
    }

    fn decode_register<E: GuestExports + ?Sized>(
        &self,
        word: Option<i32>,
        exports: &mut E,
    ) -> MarshalResult<Value> {
        if *self == TypeTag::Unit {
            return Ok(Value::Unit);
        }
        let word = word.ok_or_else(|| {
            MarshalError::type_mismatch(format!("a `{self}` result"), "no value")
        })?;
        match self {
            TypeTag::I32 => Ok(Value::I32(word)),
            TypeTag::Bool => Ok(Value::Bool(word == 1)),
            TypeTag::CStr => Ok(Value::Str(string::decode_cstr(exports, word as Pointer)?)),
            _ => Err(MarshalError::Unimplemented(format!(
                "`{self}` returned without an out-parameter"
            ))),
        }
    }
}
