use std::sync::{Arc, OnceLock, Weak};

use crate::{
    customattributes::CustomAttributeRc,
    metadata::{
        tables::{TypeAttributes, TypeDefRow},
        token::{Token, TokenKind},
    },
    module::{Module, ModuleRc},
    typesystem::{
        generic::{GenericOwner, GenericParameter},
        MemberCollections, TypeDescriptor, TypeRc,
    },
    Error, Result,
};

/// A type backed by a row of the `TypeDef` table
pub struct DefinedType {
    pub(crate) module: Weak<Module>,
    pub(crate) registry_id: u64,
    pub(crate) token: Token,
    pub(crate) row: TypeDefRow,
    pub(crate) name: String,
    pub(crate) namespace: String,
    pub(crate) full_name: String,
    pub(crate) assembly: Arc<str>,
    pub(crate) enclosing: Option<u32>,
    pub(crate) generic_parameter_count: usize,
    pub(crate) base: OnceLock<Option<TypeRc>>,
    pub(crate) generic_parameters: OnceLock<Vec<TypeRc>>,
    pub(crate) interfaces: OnceLock<Vec<TypeRc>>,
    pub(crate) nested_types: OnceLock<Vec<TypeRc>>,
    pub(crate) members: MemberCollections,
    pub(crate) custom_attributes: OnceLock<Vec<CustomAttributeRc>>,
}

/// Names and nesting of a `TypeDef` row, computed by the module when it enumerates its types
pub(crate) struct TypeDefNames {
    pub name: String,
    pub namespace: String,
    pub full_name: String,
    pub enclosing: Option<u32>,
}

impl DefinedType {
    pub(crate) fn create(
        module: &Module,
        row: TypeDefRow,
        names: TypeDefNames,
        generic_parameter_count: usize,
        assembly: Arc<str>,
    ) -> TypeRc {
        Arc::new(TypeDescriptor::Defined(DefinedType {
            module: module.weak(),
            registry_id: module.registry_id(),
            token: TokenKind::TypeDef.token(row.rid),
            row,
            name: names.name,
            namespace: names.namespace,
            full_name: names.full_name,
            assembly,
            enclosing: names.enclosing,
            generic_parameter_count,
            base: OnceLock::new(),
            generic_parameters: OnceLock::new(),
            interfaces: OnceLock::new(),
            nested_types: OnceLock::new(),
            members: MemberCollections::default(),
            custom_attributes: OnceLock::new(),
        }))
    }

    /// The raw `TypeDef` row
    #[must_use]
    pub fn row(&self) -> &TypeDefRow {
        &self.row
    }

    /// The defining module
    ///
    /// # Errors
    /// Returns [`Error::Released`] if the module has been dropped.
    pub fn module(&self) -> Result<ModuleRc> {
        self.module.upgrade().ok_or(Error::Released)
    }

    pub(crate) fn is_interface(&self) -> bool {
        self.row.flags & TypeAttributes::CLASS_SEMANTICS_MASK == TypeAttributes::INTERFACE
    }

    pub(crate) fn visibility(&self) -> u32 {
        self.row.flags & TypeAttributes::VISIBILITY_MASK
    }

    /// Creates the generic parameter descriptors of this definition, owned by `owner`
    pub(crate) fn generic_parameters(&self, owner: &TypeRc) -> Result<&[TypeRc]> {
        if self.generic_parameter_count == 0 {
            return Ok(&[]);
        }

        let parameters = cached!(self.generic_parameters, || {
            let module = self.module()?;
            module
                .generic_params(self.token)?
                .into_iter()
                .map(|row| {
                    GenericParameter::create(&module, row, GenericOwner::Type(Arc::downgrade(owner)))
                })
                .collect::<Result<Vec<_>>>()
        });

        Ok(parameters.as_slice())
    }

    pub(crate) fn nested_types(&self) -> Result<&[TypeRc]> {
        let nested = cached!(self.nested_types, || {
            let module = self.module()?;
            let types = module.types()?;

            let nested: Vec<TypeRc> = module
                .nested_type_rids(self.row.rid)?
                .into_iter()
                .filter_map(|rid| rid.checked_sub(1).and_then(|index| types.get(index as usize)))
                .cloned()
                .collect();
            log::trace!("{} nested types loaded for {}", nested.len(), self.full_name);
            Ok(nested)
        });

        Ok(nested.as_slice())
    }

    pub(crate) fn custom_attributes(&self) -> Result<&[CustomAttributeRc]> {
        let attributes = cached!(self.custom_attributes, || self
            .module()?
            .custom_attributes_of(self.token));
        Ok(attributes.as_slice())
    }
}
