//! Type tags and the registry that resolves them.
//!
//! The set of marshaling strategies is closed: every [`TypeTag`] variant
//! has a fixed [`Capability`] record. The [`TypeRegistry`] only maps
//! textual names (as written in a signature) onto those variants.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{MarshalError, MarshalResult};
use crate::slice::DESCRIPTOR_WORDS;

/// Element kinds supported by typed vectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    /// Unsigned 8-bit integers.
    U8,
    /// Unsigned 16-bit integers.
    U16,
    /// Unsigned 32-bit integers.
    U32,
    /// 32-bit IEEE floats.
    F32,
}

impl ElementKind {
    /// Width of one element in bytes.
    pub fn width(&self) -> u32 {
        match self {
            ElementKind::U8 => 1,
            ElementKind::U16 => 2,
            ElementKind::U32 | ElementKind::F32 => 4,
        }
    }

    /// Rust spelling of the element type.
    pub fn as_str(&self) -> &'static str {
        match self {
            ElementKind::U8 => "u8",
            ElementKind::U16 => "u16",
            ElementKind::U32 => "u32",
            ElementKind::F32 => "f32",
        }
    }
}

/// One marshaling strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeTag {
    /// `i32`, passed through unchanged.
    I32,
    /// `bool`, as integer `1`/`0`.
    Bool,
    /// NUL-terminated UTF-8 string.
    CStr,
    /// `&str`, a length-prefixed UTF-8 string.
    StrSlice,
    /// `String`, a length-prefixed UTF-8 string with an owned layout.
    OwnedString,
    /// `&[u8]`.
    ByteSlice,
    /// `Vec<T>` for a numeric element type.
    Vector(ElementKind),
    /// `()`, no value.
    Unit,
}

/// What a type tag can do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capability {
    /// Usable as an argument register with no transformation.
    pub simple_arg: bool,
    /// Usable as a return register with no transformation.
    pub simple_return: bool,
    /// Words of scratch space the guest fills in when this is the return type.
    pub out_param_words: Option<u32>,
}

impl TypeTag {
    /// Every tag, with `Vec<_>` expanded per element kind.
    pub const ALL: [TypeTag; 11] = [
        TypeTag::I32,
        TypeTag::Bool,
        TypeTag::CStr,
        TypeTag::StrSlice,
        TypeTag::OwnedString,
        TypeTag::ByteSlice,
        TypeTag::Vector(ElementKind::U8),
        TypeTag::Vector(ElementKind::U16),
        TypeTag::Vector(ElementKind::U32),
        TypeTag::Vector(ElementKind::F32),
        TypeTag::Unit,
    ];

    /// Canonical name, as written in Rust signatures.
    pub fn name(&self) -> &'static str {
        match self {
            TypeTag::I32 => "i32",
            TypeTag::Bool => "bool",
            TypeTag::CStr => "CStr",
            TypeTag::StrSlice => "&str",
            TypeTag::OwnedString => "String",
            TypeTag::ByteSlice => "&[u8]",
            TypeTag::Vector(ElementKind::U8) => "Vec<u8>",
            TypeTag::Vector(ElementKind::U16) => "Vec<u16>",
            TypeTag::Vector(ElementKind::U32) => "Vec<u32>",
            TypeTag::Vector(ElementKind::F32) => "Vec<f32>",
            TypeTag::Unit => "()",
        }
    }

    /// The capability record for this tag.
    pub fn capability(&self) -> Capability {
        match self {
            TypeTag::I32 => Capability {
                simple_arg: true,
                simple_return: true,
                out_param_words: None,
            },
            TypeTag::Unit => Capability {
                simple_arg: false,
                simple_return: true,
                out_param_words: None,
            },
            TypeTag::Bool | TypeTag::CStr => Capability {
                simple_arg: false,
                simple_return: false,
                out_param_words: None,
            },
            TypeTag::StrSlice | TypeTag::ByteSlice => Capability {
                simple_arg: false,
                simple_return: false,
                out_param_words: Some(DESCRIPTOR_WORDS),
            },
            // Owned layouts carry a trailing capacity word the host never reads.
            TypeTag::OwnedString | TypeTag::Vector(_) => Capability {
                simple_arg: false,
                simple_return: false,
                out_param_words: Some(DESCRIPTOR_WORDS + 1),
            },
        }
    }

    /// Shorthand for `capability().simple_arg`.
    pub fn is_simple_arg(&self) -> bool {
        self.capability().simple_arg
    }

    /// Shorthand for `capability().simple_return`.
    pub fn is_simple_return(&self) -> bool {
        self.capability().simple_return
    }

    /// Shorthand for `capability().out_param_words`.
    pub fn out_param_words(&self) -> Option<u32> {
        self.capability().out_param_words
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn normalize(name: &str) -> String {
    name.chars().filter(|c| !c.is_whitespace()).collect()
}

impl FromStr for TypeTag {
    type Err = MarshalError;

    /// Parse a canonical tag name. Aliases need a [`TypeRegistry`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = normalize(s);
        TypeTag::ALL
            .iter()
            .copied()
            .find(|tag| tag.name() == wanted)
            .ok_or_else(|| MarshalError::UnsupportedType(s.to_string()))
    }
}

/// Resolves textual type names to tags.
///
/// Starts out with every canonical name plus a few aliases (`I32`, `void`,
/// `string`); more aliases can be added, but the set of strategies behind
/// them stays closed.
#[derive(Debug, Clone)]
pub struct TypeRegistry {
    names: HashMap<String, TypeTag>,
}

impl TypeRegistry {
    /// Create a registry with the canonical names and built-in aliases.
    pub fn new() -> Self {
        let mut names: HashMap<String, TypeTag> = TypeTag::ALL
            .iter()
            .map(|tag| (tag.name().to_string(), *tag))
            .collect();
        names.insert("I32".to_string(), TypeTag::I32);
        names.insert("void".to_string(), TypeTag::Unit);
        names.insert("string".to_string(), TypeTag::CStr);
        Self { names }
    }

    /// Add an alias, builder style.
    pub fn with_alias(mut self, name: &str, tag: TypeTag) -> Self {
        self.register_alias(name, tag);
        self
    }

    /// Add an alias. Replaces any previous mapping for `name`.
    pub fn register_alias(&mut self, name: &str, tag: TypeTag) {
        self.names.insert(normalize(name), tag);
    }

    /// Look up a tag by name.
    pub fn resolve(&self, name: &str) -> MarshalResult<TypeTag> {
        self.names
            .get(&normalize(name))
            .copied()
            .ok_or_else(|| MarshalError::UnsupportedType(name.to_string()))
    }

    /// Look up the capability record behind a name.
    pub fn capability(&self, name: &str) -> MarshalResult<Capability> {
        Ok(self.resolve(name)?.capability())
    }

    /// Whether `name` resolves.
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains_key(&normalize(name))
    }

    /// All registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.names.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}
