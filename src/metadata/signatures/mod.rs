//! Signature blob parsing and encoding (ECMA-335 II.23.2).
//!
//! Signatures encode types, method parameters, generic instantiations and calling conventions
//! in a compressed binary format. Parsing produces a [`TypeSignature`] tree whose type
//! references are still raw `TypeDefOrRefOrSpec` tokens; turning them into type descriptors is
//! the job of [`crate::resolver::Resolver`], which needs the generic context and the registry.
//!
//! # Signature kinds
//!
//! - **Method** (`MethodDefSig`, `MethodRefSig`) - calling convention, return and parameter types
//! - **Field** (`0x06`) - the field type with its custom modifiers
//! - **Property** (`0x08`) - the property type and its index parameters
//! - **Local variables** (`0x07`) - the locals of a method body
//! - **TypeSpec** - a single type, usually a generic instantiation or an array
//! - **MethodSpec** (`0x0A`) - the arguments of a generic method instantiation
//!
//! # Examples
//!
//! ```rust
//! use dotreflect::metadata::signatures::{parse_method_signature, TypeSignature};
//!
//! // instance string M(int32)
//! let signature = parse_method_signature(&[0x20, 0x01, 0x0E, 0x08])?;
//! assert!(signature.has_this);
//! assert_eq!(signature.return_type.base, TypeSignature::String);
//! assert_eq!(signature.params[0].base, TypeSignature::I4);
//! # Ok::<(), dotreflect::Error>(())
//! ```

mod encoders;
mod parser;
mod types;

pub use encoders::*;
pub use parser::*;
pub use types::*;

use crate::Result;

#[allow(non_snake_case, dead_code, missing_docs)]
/// Element type bytes of signature blobs
pub mod ELEMENT_TYPE {
    pub const END: u8 = 0x00;
    pub const VOID: u8 = 0x01;
    pub const BOOLEAN: u8 = 0x02;
    pub const CHAR: u8 = 0x03;
    pub const I1: u8 = 0x04;
    pub const U1: u8 = 0x05;
    pub const I2: u8 = 0x06;
    pub const U2: u8 = 0x07;
    pub const I4: u8 = 0x08;
    pub const U4: u8 = 0x09;
    pub const I8: u8 = 0x0a;
    pub const U8: u8 = 0x0b;
    pub const R4: u8 = 0x0c;
    pub const R8: u8 = 0x0d;
    pub const STRING: u8 = 0x0e;
    // Followed by type
    pub const PTR: u8 = 0x0f;
    // Followed by type
    pub const BYREF: u8 = 0x10;
    // Followed by TypeDef or TypeRef token
    pub const VALUETYPE: u8 = 0x11;
    // Followed by TypeDef or TypeRef token
    pub const CLASS: u8 = 0x12;
    // Generic parameter in a generic type definition, represented as number
    pub const VAR: u8 = 0x13;
    // type rank boundsCount bound1 … loCount lo1 …
    pub const ARRAY: u8 = 0x14;
    // Generic type instantiation. Followed by type type-arg-count type-1 ... type-n
    pub const GENERICINST: u8 = 0x15;
    pub const TYPEDBYREF: u8 = 0x16;
    // System.IntPtr
    pub const I: u8 = 0x18;
    // System.UIntPtr
    pub const U: u8 = 0x19;
    // Followed by full method signature
    pub const FNPTR: u8 = 0x1b;
    // System.Object
    pub const OBJECT: u8 = 0x1c;
    // Single-dim array with 0 lower bound
    pub const SZARRAY: u8 = 0x1d;
    // Generic parameter in a generic method definition, represented as number
    pub const MVAR: u8 = 0x1e;
    // Required modifier : followed by a TypeDef or TypeRef token
    pub const CMOD_REQD: u8 = 0x1f;
    // Optional modifier : followed by a TypeDef or TypeRef token
    pub const CMOD_OPT: u8 = 0x20;
    // Sentinel for vararg method signature
    pub const SENTINEL: u8 = 0x41;
    // Denotes a local variable that points at a pinned object
    pub const PINNED: u8 = 0x45;
}

#[allow(non_snake_case, dead_code, missing_docs)]
/// Additional element types of custom attribute blobs (II.23.3)
pub mod SERIALIZATION_TYPE {
    // System.Type argument, serialized as a type name
    pub const TYPE: u8 = 0x50;
    // Boxed object argument, followed by its own element type
    pub const TAGGED_OBJECT: u8 = 0x51;
    // Named argument targets a field
    pub const FIELD: u8 = 0x53;
    // Named argument targets a property
    pub const PROPERTY: u8 = 0x54;
    // Enum argument, followed by the serialized enum type name
    pub const ENUM: u8 = 0x55;
}

#[allow(non_snake_case, dead_code, missing_docs)]
/// Leading bytes of non-method signatures
pub mod SIGNATURE_HEADER {
    pub const FIELD: u8 = 0x06;
    pub const LOCAL_SIG: u8 = 0x07;
    pub const PROPERTY: u8 = 0x08;
    pub const METHOD_SPEC: u8 = 0x0A;
}

#[allow(non_snake_case, dead_code, missing_docs)]
/// Calling convention bits of method signatures
pub mod CALLING_CONVENTION {
    pub const DEFAULT: u8 = 0x00;
    pub const C: u8 = 0x01;
    pub const STDCALL: u8 = 0x02;
    pub const THISCALL: u8 = 0x03;
    pub const FASTCALL: u8 = 0x04;
    pub const VARARG: u8 = 0x05;
    pub const KIND_MASK: u8 = 0x0F;
    pub const GENERIC: u8 = 0x10;
    pub const HASTHIS: u8 = 0x20;
    pub const EXPLICITTHIS: u8 = 0x40;
}

/// Parses a method signature blob
///
/// # Errors
/// Returns an error for truncated or malformed blobs.
pub fn parse_method_signature(data: &[u8]) -> Result<SignatureMethod> {
    let mut parser = SignatureParser::new(data);
    parser.parse_method_signature()
}

/// Parses a field signature blob
///
/// # Errors
/// Returns an error for truncated or malformed blobs.
pub fn parse_field_signature(data: &[u8]) -> Result<SignatureField> {
    let mut parser = SignatureParser::new(data);
    parser.parse_field_signature()
}

/// Parses a property signature blob
///
/// # Errors
/// Returns an error for truncated or malformed blobs.
pub fn parse_property_signature(data: &[u8]) -> Result<SignatureProperty> {
    let mut parser = SignatureParser::new(data);
    parser.parse_property_signature()
}

/// Parses a local variable signature blob
///
/// # Errors
/// Returns an error for truncated or malformed blobs.
pub fn parse_local_var_signature(data: &[u8]) -> Result<SignatureLocalVariables> {
    let mut parser = SignatureParser::new(data);
    parser.parse_local_var_signature()
}

/// Parses a type specification blob
///
/// # Errors
/// Returns an error for truncated or malformed blobs.
pub fn parse_type_spec_signature(data: &[u8]) -> Result<SignatureTypeSpec> {
    let mut parser = SignatureParser::new(data);
    parser.parse_type_spec_signature()
}

/// Parses a method specification blob
///
/// # Errors
/// Returns an error for truncated or malformed blobs.
pub fn parse_method_spec_signature(data: &[u8]) -> Result<SignatureMethodSpec> {
    let mut parser = SignatureParser::new(data);
    parser.parse_method_spec_signature()
}
