use std::sync::{Arc, OnceLock, Weak};

use crate::{
    members::{Method, MethodRc},
    metadata::{
        tables::{GenericParamAttributes, GenericParamRow},
        token::{Token, TokenKind},
    },
    module::{Module, ModuleRc},
    resolver::GenericContext,
    typesystem::{TypeDescriptor, TypeRc},
    Error, Result,
};

/// The definition a generic parameter belongs to
#[derive(Clone, Debug)]
pub enum GenericOwner {
    /// A parameter of a generic type definition (`!n`)
    Type(Weak<TypeDescriptor>),
    /// A parameter of a generic method definition (`!!n`)
    Method(Weak<Method>),
}

/// A generic parameter of a type or method definition
pub struct GenericParameter {
    pub(crate) module: Weak<Module>,
    pub(crate) registry_id: u64,
    pub(crate) token: Token,
    pub(crate) row: GenericParamRow,
    pub(crate) name: String,
    pub(crate) owner: GenericOwner,
    pub(crate) constraints: OnceLock<Vec<TypeRc>>,
}

impl GenericParameter {
    pub(crate) fn create(module: &Module, row: GenericParamRow, owner: GenericOwner) -> Result<TypeRc> {
        let name = module.view().string(row.name)?.to_string();

        Ok(Arc::new(TypeDescriptor::GenericParameter(GenericParameter {
            module: module.weak(),
            registry_id: module.registry_id(),
            token: TokenKind::GenericParam.token(row.rid),
            row,
            name,
            owner,
            constraints: OnceLock::new(),
        })))
    }

    /// The parameter name, e.g. `T`
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Position in the owner's parameter list
    #[must_use]
    pub fn position(&self) -> u32 {
        u32::from(self.row.number)
    }

    /// `GenericParamAttributes` of the row
    #[must_use]
    pub fn flags(&self) -> u16 {
        self.row.flags
    }

    /// True for method parameters
    #[must_use]
    pub fn is_method_parameter(&self) -> bool {
        matches!(self.owner, GenericOwner::Method(_))
    }

    /// True if the parameter is declared covariant (`out`)
    #[must_use]
    pub fn is_covariant(&self) -> bool {
        self.row.flags & GenericParamAttributes::VARIANCE_MASK == GenericParamAttributes::COVARIANT
    }

    /// True if the parameter is declared contravariant (`in`)
    #[must_use]
    pub fn is_contravariant(&self) -> bool {
        self.row.flags & GenericParamAttributes::VARIANCE_MASK
            == GenericParamAttributes::CONTRAVARIANT
    }

    /// The declaring type, or for method parameters the method's declaring type
    ///
    /// # Errors
    /// Returns [`Error::Released`] if the owner has been dropped.
    pub fn declaring_type(&self) -> Result<TypeRc> {
        match &self.owner {
            GenericOwner::Type(owner) => owner.upgrade().ok_or(Error::Released),
            GenericOwner::Method(owner) => owner.upgrade().ok_or(Error::Released)?.declaring_type(),
        }
    }

    /// The declaring method of a method parameter
    #[must_use]
    pub fn declaring_method(&self) -> Option<MethodRc> {
        match &self.owner {
            GenericOwner::Type(_) => None,
            GenericOwner::Method(owner) => owner.upgrade(),
        }
    }

    pub(crate) fn constraints(&self) -> Result<&[TypeRc]> {
        let constraints = cached!(self.constraints, || {
            let module = self.module.upgrade().ok_or(Error::Released)?;
            let context = match &self.owner {
                GenericOwner::Type(owner) => {
                    GenericContext::for_type(&owner.upgrade().ok_or(Error::Released)?)?
                }
                GenericOwner::Method(owner) => {
                    GenericContext::for_method(&owner.upgrade().ok_or(Error::Released)?)?
                }
            };

            module
                .generic_param_constraints(self.row.rid)?
                .into_iter()
                .map(|constraint| module.resolve_type_token(constraint, &context, 0))
                .collect::<Result<Vec<_>>>()
        });

        Ok(constraints.as_slice())
    }

    pub(crate) fn module(&self) -> Result<ModuleRc> {
        self.module.upgrade().ok_or(Error::Released)
    }
}
