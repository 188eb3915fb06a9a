//! Turns signature trees into type descriptors.
//!
//! A [`TypeSignature`] still refers to types by `TypeDefOrRefOrSpec` tokens and to generic
//! parameters by position. The [`Resolver`] maps built-in element types to the core library,
//! resolves tokens through the owning module, and substitutes `!n` / `!!n` from a
//! [`GenericContext`].

use crate::{
    members::MethodRc,
    metadata::signatures::{SignatureParameter, TypeSignature},
    module::Module,
    typesystem::{PrimitiveKind, TypeRc},
    Error::{RecursionLimit, UnsupportedOperation},
    Result,
};

/// Generic arguments substituted for `!n` (type) and `!!n` (method) while resolving
#[derive(Clone, Debug, Default)]
pub struct GenericContext {
    /// Substitutes for the declaring type's parameters
    pub type_arguments: Vec<TypeRc>,
    /// Substitutes for the method's parameters
    pub method_arguments: Vec<TypeRc>,
}

impl GenericContext {
    /// A context with explicit arguments
    #[must_use]
    pub fn new(type_arguments: Vec<TypeRc>, method_arguments: Vec<TypeRc>) -> Self {
        GenericContext {
            type_arguments,
            method_arguments,
        }
    }

    /// The context inside `ty`: its generic parameters, or its arguments when constructed
    ///
    /// # Errors
    /// Returns an error if the generic parameters of `ty` cannot be loaded.
    pub fn for_type(ty: &TypeRc) -> Result<Self> {
        Ok(GenericContext {
            type_arguments: ty.generic_arguments()?,
            method_arguments: Vec::new(),
        })
    }

    /// The context inside `method`, including its declaring type's context
    ///
    /// # Errors
    /// Returns an error if the declaring type has been dropped or a generic parameter cannot be
    /// loaded.
    pub fn for_method(method: &MethodRc) -> Result<Self> {
        Ok(GenericContext {
            type_arguments: method.declaring_type()?.generic_arguments()?,
            method_arguments: method.generic_arguments()?,
        })
    }
}

/// Resolves the signatures of one module within one generic context
pub struct Resolver<'a> {
    module: &'a Module,
    context: &'a GenericContext,
    depth: usize,
}

impl<'a> Resolver<'a> {
    /// A resolver for signatures of `module`
    #[must_use]
    pub fn new(module: &'a Module, context: &'a GenericContext) -> Self {
        Resolver {
            module,
            context,
            depth: 0,
        }
    }

    /// Continues a resolution that is already `depth` levels deep
    #[must_use]
    pub(crate) fn with_depth(mut self, depth: usize) -> Self {
        self.depth = depth;
        self
    }

    /// Resolves a signature type
    ///
    /// # Errors
    /// Returns an error if:
    /// - a referenced type or module cannot be found
    /// - a generic parameter lies outside the context
    /// - the signature holds a function pointer
    /// - resolution nests deeper than the configured limit
    pub fn resolve(&self, signature: &TypeSignature) -> Result<TypeRc> {
        self.resolve_with_depth(signature, self.depth)
    }

    /// Resolves a parameter or return type, wrapping by-ref parameters
    ///
    /// # Errors
    /// See [`Resolver::resolve`].
    pub fn resolve_parameter(&self, parameter: &SignatureParameter) -> Result<TypeRc> {
        let base = self.resolve(&parameter.base)?;
        if parameter.by_ref {
            Ok(base.make_by_ref())
        } else {
            Ok(base)
        }
    }

    fn resolve_with_depth(&self, signature: &TypeSignature, depth: usize) -> Result<TypeRc> {
        let limit = self.module.max_depth();
        if depth > limit {
            return Err(RecursionLimit(limit));
        }

        if let Some(kind) = primitive_of(signature) {
            return self.module.registry()?.core_type(kind.full_name());
        }

        match signature {
            TypeSignature::ValueType(token) | TypeSignature::Class(token) => {
                self.module
                    .resolve_type_token(*token, self.context, depth + 1)
            }
            TypeSignature::GenericParamType(position) => self
                .context
                .type_arguments
                .get(*position as usize)
                .cloned()
                .ok_or_else(|| {
                    malformed_error!("Type parameter !{} is outside the generic context", position)
                }),
            TypeSignature::GenericParamMethod(position) => self
                .context
                .method_arguments
                .get(*position as usize)
                .cloned()
                .ok_or_else(|| {
                    malformed_error!(
                        "Method parameter !!{} is outside the generic context",
                        position
                    )
                }),
            TypeSignature::Ptr(inner) => Ok(self.resolve_with_depth(inner, depth + 1)?.make_pointer()),
            TypeSignature::ByRef(inner) => Ok(self.resolve_with_depth(inner, depth + 1)?.make_by_ref()),
            TypeSignature::SzArray(inner) => {
                Ok(self.resolve_with_depth(inner, depth + 1)?.make_array(1))
            }
            TypeSignature::Array(array) => Ok(self
                .resolve_with_depth(&array.base, depth + 1)?
                .make_array(array.rank)),
            TypeSignature::GenericInst(definition, arguments) => {
                let definition = self.resolve_with_depth(definition, depth + 1)?;
                let arguments = arguments
                    .iter()
                    .map(|argument| self.resolve_with_depth(argument, depth + 1))
                    .collect::<Result<Vec<_>>>()?;

                definition.construct(&arguments)
            }
            TypeSignature::Modified(_, inner) | TypeSignature::Pinned(inner) => {
                self.resolve_with_depth(inner, depth)
            }
            TypeSignature::FnPtr(_) => Err(UnsupportedOperation("function pointer types")),
            _ => Err(malformed_error!("Unexpected signature type {:?}", signature)),
        }
    }
}

/// The built-in kind of a signature element type
fn primitive_of(signature: &TypeSignature) -> Option<PrimitiveKind> {
    Some(match signature {
        TypeSignature::Void => PrimitiveKind::Void,
        TypeSignature::Boolean => PrimitiveKind::Boolean,
        TypeSignature::Char => PrimitiveKind::Char,
        TypeSignature::I1 => PrimitiveKind::I1,
        TypeSignature::U1 => PrimitiveKind::U1,
        TypeSignature::I2 => PrimitiveKind::I2,
        TypeSignature::U2 => PrimitiveKind::U2,
        TypeSignature::I4 => PrimitiveKind::I4,
        TypeSignature::U4 => PrimitiveKind::U4,
        TypeSignature::I8 => PrimitiveKind::I8,
        TypeSignature::U8 => PrimitiveKind::U8,
        TypeSignature::R4 => PrimitiveKind::R4,
        TypeSignature::R8 => PrimitiveKind::R8,
        TypeSignature::I => PrimitiveKind::I,
        TypeSignature::U => PrimitiveKind::U,
        TypeSignature::Object => PrimitiveKind::Object,
        TypeSignature::String => PrimitiveKind::String,
        TypeSignature::TypedByRef => PrimitiveKind::TypedReference,
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{signatures::SignatureArray, token::Token};

    #[test]
    fn primitive_mapping() {
        assert_eq!(primitive_of(&TypeSignature::I4), Some(PrimitiveKind::I4));
        assert_eq!(
            primitive_of(&TypeSignature::TypedByRef),
            Some(PrimitiveKind::TypedReference)
        );
        assert_eq!(primitive_of(&TypeSignature::Class(Token::new(0x0100_0001))), None);
        assert_eq!(
            primitive_of(&TypeSignature::Array(SignatureArray {
                base: Box::new(TypeSignature::I4),
                rank: 2,
                sizes: Vec::new(),
                lower_bounds: Vec::new(),
            })),
            None
        );
    }

    #[test]
    fn empty_context() {
        let context = GenericContext::default();
        assert!(context.type_arguments.is_empty());
        assert!(context.method_arguments.is_empty());
    }
}
