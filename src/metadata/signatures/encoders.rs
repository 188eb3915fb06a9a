//! Signature blob encoding, the inverse of [`crate::metadata::signatures::SignatureParser`].
//!
//! Used by [`crate::metadata::builder::ImageBuilder`] to emit the blobs of generated images.

use crate::{
    metadata::{
        signatures::{
            CustomModifier, SignatureField, SignatureLocalVariables, SignatureMethod,
            SignatureMethodSpec, SignatureParameter, SignatureProperty, TypeSignature,
            CALLING_CONVENTION, ELEMENT_TYPE, SIGNATURE_HEADER,
        },
        tables::{CodedIndex, CodedIndexType},
        token::Token,
    },
    Result,
};

/// Appends `value` as a compressed unsigned integer (II.23.2)
///
/// # Errors
/// Returns [`crate::Error::Malformed`] for values above `0x1FFF_FFFF`.
pub fn write_compressed_uint(value: u32, buffer: &mut Vec<u8>) -> Result<()> {
    #[allow(clippy::cast_possible_truncation)]
    match value {
        0..=0x7F => buffer.push(value as u8),
        0x80..=0x3FFF => {
            buffer.push(((value >> 8) as u8) | 0x80);
            buffer.push(value as u8);
        }
        0x4000..=0x1FFF_FFFF => {
            buffer.push(((value >> 24) as u8) | 0xC0);
            buffer.push((value >> 16) as u8);
            buffer.push((value >> 8) as u8);
            buffer.push(value as u8);
        }
        _ => {
            return Err(malformed_error!(
                "Value {} is too large for a compressed integer",
                value
            ))
        }
    }

    Ok(())
}

/// Appends `token` as a compressed `TypeDefOrRefOrSpecEncoded` value
///
/// # Errors
/// Returns [`crate::Error::Malformed`] if `token` is not a `TypeDef`, `TypeRef` or `TypeSpec`.
pub fn write_compressed_token(token: Token, buffer: &mut Vec<u8>) -> Result<()> {
    if token.is_null() {
        return Err(malformed_error!("Cannot encode the nil token {}", token));
    }

    let coded = CodedIndex::encode(token, CodedIndexType::TypeDefOrRef)?;
    write_compressed_uint(coded, buffer)
}

fn encode_count(count: usize, buffer: &mut Vec<u8>) -> Result<()> {
    let count = u32::try_from(count)
        .map_err(|_| malformed_error!("Too many signature elements: {}", count))?;
    write_compressed_uint(count, buffer)
}

fn encode_custom_modifier(modifier: &CustomModifier, buffer: &mut Vec<u8>) -> Result<()> {
    buffer.push(if modifier.is_required {
        ELEMENT_TYPE::CMOD_REQD
    } else {
        ELEMENT_TYPE::CMOD_OPT
    });

    write_compressed_token(modifier.modifier_type, buffer)
}

/// Appends the encoding of `signature` to `buffer`
///
/// # Errors
/// Returns [`crate::Error::Malformed`] for tokens that cannot be encoded.
pub fn encode_type(signature: &TypeSignature, buffer: &mut Vec<u8>) -> Result<()> {
    match signature {
        TypeSignature::Void => buffer.push(ELEMENT_TYPE::VOID),
        TypeSignature::Boolean => buffer.push(ELEMENT_TYPE::BOOLEAN),
        TypeSignature::Char => buffer.push(ELEMENT_TYPE::CHAR),
        TypeSignature::I1 => buffer.push(ELEMENT_TYPE::I1),
        TypeSignature::U1 => buffer.push(ELEMENT_TYPE::U1),
        TypeSignature::I2 => buffer.push(ELEMENT_TYPE::I2),
        TypeSignature::U2 => buffer.push(ELEMENT_TYPE::U2),
        TypeSignature::I4 => buffer.push(ELEMENT_TYPE::I4),
        TypeSignature::U4 => buffer.push(ELEMENT_TYPE::U4),
        TypeSignature::I8 => buffer.push(ELEMENT_TYPE::I8),
        TypeSignature::U8 => buffer.push(ELEMENT_TYPE::U8),
        TypeSignature::R4 => buffer.push(ELEMENT_TYPE::R4),
        TypeSignature::R8 => buffer.push(ELEMENT_TYPE::R8),
        TypeSignature::String => buffer.push(ELEMENT_TYPE::STRING),
        TypeSignature::TypedByRef => buffer.push(ELEMENT_TYPE::TYPEDBYREF),
        TypeSignature::I => buffer.push(ELEMENT_TYPE::I),
        TypeSignature::U => buffer.push(ELEMENT_TYPE::U),
        TypeSignature::Object => buffer.push(ELEMENT_TYPE::OBJECT),
        TypeSignature::Ptr(base) => {
            buffer.push(ELEMENT_TYPE::PTR);
            encode_type(base, buffer)?;
        }
        TypeSignature::ByRef(base) => {
            buffer.push(ELEMENT_TYPE::BYREF);
            encode_type(base, buffer)?;
        }
        TypeSignature::Pinned(base) => {
            buffer.push(ELEMENT_TYPE::PINNED);
            encode_type(base, buffer)?;
        }
        TypeSignature::SzArray(base) => {
            buffer.push(ELEMENT_TYPE::SZARRAY);
            encode_type(base, buffer)?;
        }
        TypeSignature::ValueType(token) => {
            buffer.push(ELEMENT_TYPE::VALUETYPE);
            write_compressed_token(*token, buffer)?;
        }
        TypeSignature::Class(token) => {
            buffer.push(ELEMENT_TYPE::CLASS);
            write_compressed_token(*token, buffer)?;
        }
        TypeSignature::GenericParamType(index) => {
            buffer.push(ELEMENT_TYPE::VAR);
            write_compressed_uint(*index, buffer)?;
        }
        TypeSignature::GenericParamMethod(index) => {
            buffer.push(ELEMENT_TYPE::MVAR);
            write_compressed_uint(*index, buffer)?;
        }
        TypeSignature::Array(array) => {
            buffer.push(ELEMENT_TYPE::ARRAY);
            encode_type(&array.base, buffer)?;
            write_compressed_uint(array.rank, buffer)?;
            encode_count(array.sizes.len(), buffer)?;
            for size in &array.sizes {
                write_compressed_uint(*size, buffer)?;
            }
            encode_count(array.lower_bounds.len(), buffer)?;
            for bound in &array.lower_bounds {
                write_compressed_int(*bound, buffer)?;
            }
        }
        TypeSignature::GenericInst(base, args) => {
            buffer.push(ELEMENT_TYPE::GENERICINST);
            encode_type(base, buffer)?;
            encode_count(args.len(), buffer)?;
            for arg in args {
                encode_type(arg, buffer)?;
            }
        }
        TypeSignature::FnPtr(method) => {
            buffer.push(ELEMENT_TYPE::FNPTR);
            buffer.extend(encode_method_signature(method)?);
        }
        TypeSignature::Modified(modifier, base) => {
            encode_custom_modifier(modifier, buffer)?;
            encode_type(base, buffer)?;
        }
    }

    Ok(())
}

/// Appends `value` as a compressed signed integer (II.23.2)
///
/// # Errors
/// Returns [`crate::Error::Malformed`] if `value` needs more than 29 bits.
pub fn write_compressed_int(value: i32, buffer: &mut Vec<u8>) -> Result<()> {
    let (bits, limit) = if (-0x40..0x40).contains(&value) {
        (7, 0x7F)
    } else if (-0x2000..0x2000).contains(&value) {
        (14, 0x3FFF)
    } else if (-0x1000_0000..0x1000_0000).contains(&value) {
        (29, 0x1FFF_FFFF)
    } else {
        return Err(malformed_error!(
            "Value {} is too large for a compressed integer",
            value
        ));
    };

    #[allow(clippy::cast_sign_loss)]
    let rotated = (((value as u32) << 1) | u32::from(value < 0)) & limit;
    debug_assert!(bits <= 29);
    match bits {
        7 => write_compressed_uint(rotated, buffer),
        14 => {
            #[allow(clippy::cast_possible_truncation)]
            buffer.extend([((rotated >> 8) as u8) | 0x80, rotated as u8]);
            Ok(())
        }
        _ => {
            #[allow(clippy::cast_possible_truncation)]
            buffer.extend([
                ((rotated >> 24) as u8) | 0xC0,
                (rotated >> 16) as u8,
                (rotated >> 8) as u8,
                rotated as u8,
            ]);
            Ok(())
        }
    }
}

fn encode_parameter(parameter: &SignatureParameter, buffer: &mut Vec<u8>) -> Result<()> {
    for modifier in &parameter.modifiers {
        encode_custom_modifier(modifier, buffer)?;
    }

    if parameter.by_ref {
        buffer.push(ELEMENT_TYPE::BYREF);
    }

    encode_type(&parameter.base, buffer)
}

/// Encodes a method signature
///
/// # Errors
/// Returns [`crate::Error::Malformed`] for tokens that cannot be encoded.
pub fn encode_method_signature(signature: &SignatureMethod) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();

    let mut calling_convention = if signature.vararg {
        CALLING_CONVENTION::VARARG
    } else if signature.fastcall {
        CALLING_CONVENTION::FASTCALL
    } else if signature.thiscall {
        CALLING_CONVENTION::THISCALL
    } else if signature.stdcall {
        CALLING_CONVENTION::STDCALL
    } else if signature.cdecl {
        CALLING_CONVENTION::C
    } else {
        CALLING_CONVENTION::DEFAULT
    };

    if signature.has_this {
        calling_convention |= CALLING_CONVENTION::HASTHIS;
    }
    if signature.explicit_this {
        calling_convention |= CALLING_CONVENTION::EXPLICITTHIS;
    }
    if signature.param_count_generic > 0 {
        calling_convention |= CALLING_CONVENTION::GENERIC;
    }

    buffer.push(calling_convention);
    if signature.param_count_generic > 0 {
        write_compressed_uint(signature.param_count_generic, &mut buffer)?;
    }

    encode_count(signature.params.len() + signature.varargs.len(), &mut buffer)?;
    encode_parameter(&signature.return_type, &mut buffer)?;
    for param in &signature.params {
        encode_parameter(param, &mut buffer)?;
    }

    if !signature.varargs.is_empty() {
        buffer.push(ELEMENT_TYPE::SENTINEL);
        for param in &signature.varargs {
            encode_parameter(param, &mut buffer)?;
        }
    }

    Ok(buffer)
}

/// Encodes a field signature
///
/// # Errors
/// Returns [`crate::Error::Malformed`] for tokens that cannot be encoded.
pub fn encode_field_signature(signature: &SignatureField) -> Result<Vec<u8>> {
    let mut buffer = vec![SIGNATURE_HEADER::FIELD];
    for modifier in &signature.modifiers {
        encode_custom_modifier(modifier, &mut buffer)?;
    }

    encode_type(&signature.base, &mut buffer)?;
    Ok(buffer)
}

/// Encodes a property signature
///
/// # Errors
/// Returns [`crate::Error::Malformed`] for tokens that cannot be encoded.
pub fn encode_property_signature(signature: &SignatureProperty) -> Result<Vec<u8>> {
    let mut prolog = SIGNATURE_HEADER::PROPERTY;
    if signature.has_this {
        prolog |= CALLING_CONVENTION::HASTHIS;
    }

    let mut buffer = vec![prolog];
    encode_count(signature.params.len(), &mut buffer)?;
    for modifier in &signature.modifiers {
        encode_custom_modifier(modifier, &mut buffer)?;
    }

    encode_type(&signature.base, &mut buffer)?;
    for param in &signature.params {
        encode_parameter(param, &mut buffer)?;
    }

    Ok(buffer)
}

/// Encodes a local variable signature
///
/// # Errors
/// Returns [`crate::Error::Malformed`] for tokens that cannot be encoded.
pub fn encode_local_var_signature(signature: &SignatureLocalVariables) -> Result<Vec<u8>> {
    let mut buffer = vec![SIGNATURE_HEADER::LOCAL_SIG];
    encode_count(signature.locals.len(), &mut buffer)?;

    for local in &signature.locals {
        for modifier in &local.modifiers {
            encode_custom_modifier(modifier, &mut buffer)?;
        }
        if local.is_pinned {
            buffer.push(ELEMENT_TYPE::PINNED);
        }
        if local.is_byref {
            buffer.push(ELEMENT_TYPE::BYREF);
        }

        encode_type(&local.base, &mut buffer)?;
    }

    Ok(buffer)
}

/// Encodes a type specification
///
/// # Errors
/// Returns [`crate::Error::Malformed`] for tokens that cannot be encoded.
pub fn encode_typespec_signature(signature: &TypeSignature) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    encode_type(signature, &mut buffer)?;
    Ok(buffer)
}

/// Encodes a method specification
///
/// # Errors
/// Returns [`crate::Error::Malformed`] for tokens that cannot be encoded.
pub fn encode_method_spec_signature(signature: &SignatureMethodSpec) -> Result<Vec<u8>> {
    let mut buffer = vec![SIGNATURE_HEADER::METHOD_SPEC];
    encode_count(signature.generic_args.len(), &mut buffer)?;
    for arg in &signature.generic_args {
        encode_type(arg, &mut buffer)?;
    }

    Ok(buffer)
}
