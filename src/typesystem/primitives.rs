//! Built-in types of the core library and constant values of their kinds.

use std::fmt;

use widestring::U16Str;

use crate::{file::parser::Parser, metadata::signatures::ELEMENT_TYPE, Result};

/// A built-in type with a dedicated element type code
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    /// System.Void
    Void,
    /// System.Boolean
    Boolean,
    /// System.Char
    Char,
    /// System.SByte
    I1,
    /// System.Byte
    U1,
    /// System.Int16
    I2,
    /// System.UInt16
    U2,
    /// System.Int32
    I4,
    /// System.UInt32
    U4,
    /// System.Int64
    I8,
    /// System.UInt64
    U8,
    /// System.Single
    R4,
    /// System.Double
    R8,
    /// System.IntPtr
    I,
    /// System.UIntPtr
    U,
    /// System.Object
    Object,
    /// System.String
    String,
    /// System.TypedReference
    TypedReference,
}

const PRIMITIVES: [(PrimitiveKind, &str, u8); 18] = [
    (PrimitiveKind::Void, "System.Void", ELEMENT_TYPE::VOID),
    (PrimitiveKind::Boolean, "System.Boolean", ELEMENT_TYPE::BOOLEAN),
    (PrimitiveKind::Char, "System.Char", ELEMENT_TYPE::CHAR),
    (PrimitiveKind::I1, "System.SByte", ELEMENT_TYPE::I1),
    (PrimitiveKind::U1, "System.Byte", ELEMENT_TYPE::U1),
    (PrimitiveKind::I2, "System.Int16", ELEMENT_TYPE::I2),
    (PrimitiveKind::U2, "System.UInt16", ELEMENT_TYPE::U2),
    (PrimitiveKind::I4, "System.Int32", ELEMENT_TYPE::I4),
    (PrimitiveKind::U4, "System.UInt32", ELEMENT_TYPE::U4),
    (PrimitiveKind::I8, "System.Int64", ELEMENT_TYPE::I8),
    (PrimitiveKind::U8, "System.UInt64", ELEMENT_TYPE::U8),
    (PrimitiveKind::R4, "System.Single", ELEMENT_TYPE::R4),
    (PrimitiveKind::R8, "System.Double", ELEMENT_TYPE::R8),
    (PrimitiveKind::I, "System.IntPtr", ELEMENT_TYPE::I),
    (PrimitiveKind::U, "System.UIntPtr", ELEMENT_TYPE::U),
    (PrimitiveKind::Object, "System.Object", ELEMENT_TYPE::OBJECT),
    (PrimitiveKind::String, "System.String", ELEMENT_TYPE::STRING),
    (PrimitiveKind::TypedReference, "System.TypedReference", ELEMENT_TYPE::TYPEDBYREF),
];

impl PrimitiveKind {
    /// Maps a full type name to its kind
    #[must_use]
    pub fn from_full_name(full_name: &str) -> Option<Self> {
        PRIMITIVES
            .iter()
            .find(|(_, name, _)| *name == full_name)
            .map(|(kind, _, _)| *kind)
    }

    /// Maps an element type byte to its kind
    #[must_use]
    pub fn from_element_type(element_type: u8) -> Option<Self> {
        PRIMITIVES
            .iter()
            .find(|(_, _, code)| *code == element_type)
            .map(|(kind, _, _)| *kind)
    }

    /// The full name of the core library type
    #[must_use]
    pub fn full_name(self) -> &'static str {
        PRIMITIVES
            .iter()
            .find(|(kind, _, _)| *kind == self)
            .map_or("System.Object", |(_, name, _)| name)
    }

    /// The element type byte
    #[must_use]
    pub fn element_type(self) -> u8 {
        PRIMITIVES
            .iter()
            .find(|(kind, _, _)| *kind == self)
            .map_or(ELEMENT_TYPE::OBJECT, |(_, _, code)| *code)
    }
}

/// A value of the `Constant` table
#[derive(Clone, Debug, PartialEq)]
pub enum ConstantValue {
    /// bool
    Boolean(bool),
    /// char, stored as a UTF-16 code unit
    Char(u16),
    /// i8
    I1(i8),
    /// u8
    U1(u8),
    /// i16
    I2(i16),
    /// u16
    U2(u16),
    /// i32
    I4(i32),
    /// u32
    U4(u32),
    /// i64
    I8(i64),
    /// u64
    U8(u64),
    /// f32
    R4(f32),
    /// f64
    R8(f64),
    /// string
    String(String),
    /// The null reference of a class-typed constant
    Null,
}

impl ConstantValue {
    /// Decodes the blob of a `Constant` row with the given element type
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] for short blobs and [`crate::Error::Malformed`]
    /// for unknown element types or invalid UTF-16.
    pub fn decode(element_type: u8, blob: &[u8]) -> Result<Self> {
        let mut parser = Parser::new(blob);

        Ok(match element_type {
            ELEMENT_TYPE::BOOLEAN => ConstantValue::Boolean(parser.read_le::<u8>()? != 0),
            ELEMENT_TYPE::CHAR => ConstantValue::Char(parser.read_le::<u16>()?),
            ELEMENT_TYPE::I1 => ConstantValue::I1(parser.read_le::<i8>()?),
            ELEMENT_TYPE::U1 => ConstantValue::U1(parser.read_le::<u8>()?),
            ELEMENT_TYPE::I2 => ConstantValue::I2(parser.read_le::<i16>()?),
            ELEMENT_TYPE::U2 => ConstantValue::U2(parser.read_le::<u16>()?),
            ELEMENT_TYPE::I4 => ConstantValue::I4(parser.read_le::<i32>()?),
            ELEMENT_TYPE::U4 => ConstantValue::U4(parser.read_le::<u32>()?),
            ELEMENT_TYPE::I8 => ConstantValue::I8(parser.read_le::<i64>()?),
            ELEMENT_TYPE::U8 => ConstantValue::U8(parser.read_le::<u64>()?),
            ELEMENT_TYPE::R4 => ConstantValue::R4(parser.read_le::<f32>()?),
            ELEMENT_TYPE::R8 => ConstantValue::R8(parser.read_le::<f64>()?),
            ELEMENT_TYPE::STRING => {
                if blob.len() % 2 != 0 {
                    return Err(malformed_error!(
                        "String constant has odd length {}",
                        blob.len()
                    ));
                }

                let units: Vec<u16> = blob
                    .chunks_exact(2)
                    .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
                    .collect();

                let value = U16Str::from_slice(&units)
                    .to_string()
                    .map_err(|e| malformed_error!("Invalid UTF-16 string constant: {}", e))?;
                ConstantValue::String(value)
            }
            ELEMENT_TYPE::CLASS => ConstantValue::Null,
            other => {
                return Err(malformed_error!(
                    "Invalid constant element type 0x{:02X}",
                    other
                ))
            }
        })
    }
}

impl fmt::Display for ConstantValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstantValue::Boolean(value) => write!(f, "{value}"),
            ConstantValue::Char(value) => match char::from_u32(u32::from(*value)) {
                Some(c) => write!(f, "'{c}'"),
                None => write!(f, "'\\u{value:04x}'"),
            },
            ConstantValue::I1(value) => write!(f, "{value}"),
            ConstantValue::U1(value) => write!(f, "{value}"),
            ConstantValue::I2(value) => write!(f, "{value}"),
            ConstantValue::U2(value) => write!(f, "{value}"),
            ConstantValue::I4(value) => write!(f, "{value}"),
            ConstantValue::U4(value) => write!(f, "{value}"),
            ConstantValue::I8(value) => write!(f, "{value}"),
            ConstantValue::U8(value) => write!(f, "{value}"),
            ConstantValue::R4(value) => write!(f, "{value}"),
            ConstantValue::R8(value) => write!(f, "{value}"),
            ConstantValue::String(value) => write!(f, "\"{value}\""),
            ConstantValue::Null => write!(f, "null"),
        }
    }
}
