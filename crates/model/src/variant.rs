//! Typed values carried by menu attributes, action parameters and action state.

use std::fmt;

/// Type tag of a [`Variant`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VariantType {
    Bool,
    Int32,
    UInt32,
    Int64,
    Double,
    Str,
    Array,
    Tuple,
}

impl fmt::Display for VariantType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            VariantType::Bool => "b",
            VariantType::Int32 => "i",
            VariantType::UInt32 => "u",
            VariantType::Int64 => "x",
            VariantType::Double => "d",
            VariantType::Str => "s",
            VariantType::Array => "a*",
            VariantType::Tuple => "r",
        };
        f.write_str(s)
    }
}

/// A dynamically typed value.
#[derive(Debug, Clone, PartialEq)]
pub enum Variant {
    Bool(bool),
    Int32(i32),
    UInt32(u32),
    Int64(i64),
    Double(f64),
    Str(String),
    Array(Vec<Variant>),
    Tuple(Vec<Variant>),
}

impl Variant {
    /// Returns the type tag of this value.
    pub fn variant_type(&self) -> VariantType {
        match self {
            Variant::Bool(_) => VariantType::Bool,
            Variant::Int32(_) => VariantType::Int32,
            Variant::UInt32(_) => VariantType::UInt32,
            Variant::Int64(_) => VariantType::Int64,
            Variant::Double(_) => VariantType::Double,
            Variant::Str(_) => VariantType::Str,
            Variant::Array(_) => VariantType::Array,
            Variant::Tuple(_) => VariantType::Tuple,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Variant::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Variant::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_slice(&self) -> Option<&[Variant]> {
        match self {
            Variant::Array(items) | Variant::Tuple(items) => Some(items),
            _ => None,
        }
    }
}

impl From<bool> for Variant {
    fn from(v: bool) -> Self {
        Variant::Bool(v)
    }
}

impl From<i32> for Variant {
    fn from(v: i32) -> Self {
        Variant::Int32(v)
    }
}

impl From<u32> for Variant {
    fn from(v: u32) -> Self {
        Variant::UInt32(v)
    }
}

impl From<i64> for Variant {
    fn from(v: i64) -> Self {
        Variant::Int64(v)
    }
}

impl From<f64> for Variant {
    fn from(v: f64) -> Self {
        Variant::Double(v)
    }
}

impl From<&str> for Variant {
    fn from(v: &str) -> Self {
        Variant::Str(v.to_string())
    }
}

impl From<String> for Variant {
    fn from(v: String) -> Self {
        Variant::Str(v)
    }
}

/// Text form close to the GVariant text format, used in log output.
impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variant::Bool(b) => write!(f, "{b}"),
            Variant::Int32(n) => write!(f, "{n}"),
            Variant::UInt32(n) => write!(f, "uint32 {n}"),
            Variant::Int64(n) => write!(f, "int64 {n}"),
            Variant::Double(n) => write!(f, "{n:?}"),
            Variant::Str(s) => write!(f, "'{}'", s.replace('\'', "\\'")),
            Variant::Array(items) => write_seq(f, '[', ']', items),
            Variant::Tuple(items) => write_seq(f, '(', ')', items),
        }
    }
}

fn write_seq(f: &mut fmt::Formatter<'_>, open: char, close: char, items: &[Variant]) -> fmt::Result {
    write!(f, "{open}")?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    write!(f, "{close}")
}
