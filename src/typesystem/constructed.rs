use std::sync::OnceLock;

use crate::{
    typesystem::{DefinedType, MemberCollections, TypeDescriptor, TypeRc},
    Error, Result,
};

/// A generic type definition instantiated with type arguments, e.g. `List<int>`
///
/// Keeps its own member caches, so member signatures decode with the arguments substituted.
pub struct ConstructedType {
    pub(crate) definition: TypeRc,
    pub(crate) arguments: Vec<TypeRc>,
    pub(crate) full_name: String,
    pub(crate) base: OnceLock<Option<TypeRc>>,
    pub(crate) interfaces: OnceLock<Vec<TypeRc>>,
    pub(crate) members: MemberCollections,
}

impl ConstructedType {
    pub(crate) fn new(definition: TypeRc, arguments: Vec<TypeRc>, full_name: String) -> Self {
        ConstructedType {
            definition,
            arguments,
            full_name,
            base: OnceLock::new(),
            interfaces: OnceLock::new(),
            members: MemberCollections::default(),
        }
    }

    /// The generic type definition
    #[must_use]
    pub fn definition(&self) -> &TypeRc {
        &self.definition
    }

    /// The type arguments, in parameter order
    #[must_use]
    pub fn arguments(&self) -> &[TypeRc] {
        &self.arguments
    }

    pub(crate) fn defined(&self) -> Result<&DefinedType> {
        match self.definition.as_ref() {
            TypeDescriptor::Defined(definition) => Ok(definition),
            other => Err(Error::NotGenericDefinition(other.full_name())),
        }
    }
}
