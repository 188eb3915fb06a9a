//! The lazily computed type graph of the open modules.
//!
//! Every type the engine hands out is a [`TypeDescriptor`] behind an [`Arc`] ([`TypeRc`]). A
//! descriptor is one of:
//!
//! - [`TypeDescriptor::Defined`] - a row of a module's `TypeDef` table
//! - [`TypeDescriptor::Array`], [`TypeDescriptor::Pointer`], [`TypeDescriptor::ByRef`] - wrappers
//!   around an element type
//! - [`TypeDescriptor::GenericParameter`] - `!n` of a generic type or `!!n` of a generic method
//! - [`TypeDescriptor::ConstructedGeneric`] - a generic definition with its type arguments
//!
//! Defined and constructed descriptors load their members on first use: methods and
//! constructors, fields, properties, events and nested types each move from unloaded to loaded
//! exactly once and are shared afterwards. Member queries filter with a [`VisibilityMask`].
//!
//! Two descriptors are equal when their assembly-qualified names are equal; pointer identity
//! is never relied upon.
//!
//! # Examples
//!
//! ```rust,no_run
//! use dotreflect::{typesystem::VisibilityMask, Registry, RegistryConfig};
//!
//! let registry = Registry::new(RegistryConfig::default());
//! let module = registry.open("Library.dll")?;
//!
//! if let Some(ty) = module.type_by_name("Library.Widget", false)? {
//!     for method in ty.methods(VisibilityMask::PUBLIC_MEMBERS)? {
//!         println!("{method}");
//!     }
//! }
//! # Ok::<(), dotreflect::Error>(())
//! ```

mod collections;
mod constructed;
mod defined;
mod generic;
mod primitives;
mod visibility;

use std::{
    fmt,
    hash::{Hash, Hasher},
    sync::Arc,
};

pub(crate) use collections::MemberCollections;
pub use constructed::ConstructedType;
pub use defined::DefinedType;
pub(crate) use defined::TypeDefNames;
pub use generic::{GenericOwner, GenericParameter};
pub use primitives::{ConstantValue, PrimitiveKind};
pub use visibility::VisibilityMask;

use crate::{
    customattributes::CustomAttributeRc,
    members::MethodRc,
    metadata::{
        tables::TypeAttributes,
        token::{Token, TokenKind},
    },
    module::ModuleRc,
    resolver::GenericContext,
    utils::names_equal,
    Error, Result,
};

/// Reference to a [`TypeDescriptor`]
pub type TypeRc = Arc<TypeDescriptor>;

/// A type of the reflection graph
pub enum TypeDescriptor {
    /// A `TypeDef` row
    Defined(DefinedType),
    /// An array of `element` with `rank` dimensions
    Array {
        /// The element type
        element: TypeRc,
        /// Number of dimensions, at least 1
        rank: u32,
    },
    /// An unmanaged pointer to the element type
    Pointer(TypeRc),
    /// A managed reference to the element type
    ByRef(TypeRc),
    /// A generic parameter of a type or method definition
    GenericParameter(GenericParameter),
    /// A generic definition instantiated with type arguments
    ConstructedGeneric(ConstructedType),
}

fn array_suffix(rank: u32) -> String {
    format!("[{}]", ",".repeat(rank.saturating_sub(1) as usize))
}

fn constructed_name(definition: &str, arguments: &[TypeRc]) -> String {
    let arguments: Vec<String> = arguments
        .iter()
        .map(|argument| format!("[{}]", argument.qualified_name()))
        .collect();

    format!("{definition}[{}]", arguments.join(","))
}

fn resolve_extends(owner: &TypeRc, definition: &DefinedType) -> Result<Option<TypeRc>> {
    if definition.row.extends.is_null() {
        return Ok(None);
    }

    let module = definition.module()?;
    let context = GenericContext::for_type(owner)?;
    module
        .resolve_type_token(definition.row.extends, &context, 0)
        .map(Some)
}

fn resolve_interfaces(owner: &TypeRc, definition: &DefinedType) -> Result<Vec<TypeRc>> {
    let module = definition.module()?;
    let context = GenericContext::for_type(owner)?;

    module
        .interface_tokens(definition.row.rid)?
        .into_iter()
        .map(|interface| module.resolve_type_token(interface, &context, 0))
        .collect()
}

impl TypeDescriptor {
    /// The simple name; wrappers append `[]`, `*` or `&`
    #[must_use]
    pub fn name(&self) -> String {
        match self {
            TypeDescriptor::Defined(definition) => definition.name.clone(),
            TypeDescriptor::Array { element, rank } => {
                format!("{}{}", element.name(), array_suffix(*rank))
            }
            TypeDescriptor::Pointer(element) => format!("{}*", element.name()),
            TypeDescriptor::ByRef(element) => format!("{}&", element.name()),
            TypeDescriptor::GenericParameter(parameter) => parameter.name.clone(),
            TypeDescriptor::ConstructedGeneric(constructed) => constructed.definition.name(),
        }
    }

    /// The namespace; nested types report the namespace of their outermost declaring type
    #[must_use]
    pub fn namespace(&self) -> String {
        match self {
            TypeDescriptor::Defined(definition) => definition.namespace.clone(),
            TypeDescriptor::Array { element, .. }
            | TypeDescriptor::Pointer(element)
            | TypeDescriptor::ByRef(element) => element.namespace(),
            TypeDescriptor::GenericParameter(_) => String::new(),
            TypeDescriptor::ConstructedGeneric(constructed) => constructed.definition.namespace(),
        }
    }

    /// The full name: `Namespace.Name`, `Outer+Inner`, `T[]`, `T*`, `T&`, or
    /// `Definition[[Argument, Assembly],...]`
    #[must_use]
    pub fn full_name(&self) -> String {
        match self {
            TypeDescriptor::Defined(definition) => definition.full_name.clone(),
            TypeDescriptor::Array { element, rank } => {
                format!("{}{}", element.full_name(), array_suffix(*rank))
            }
            TypeDescriptor::Pointer(element) => format!("{}*", element.full_name()),
            TypeDescriptor::ByRef(element) => format!("{}&", element.full_name()),
            TypeDescriptor::GenericParameter(parameter) => parameter.name.clone(),
            TypeDescriptor::ConstructedGeneric(constructed) => constructed.full_name.clone(),
        }
    }

    /// The full name followed by the display name of the defining assembly
    ///
    /// Generic parameters have no assembly and are named by position: `!n` for type
    /// parameters and `!!n` for method parameters.
    #[must_use]
    pub fn qualified_name(&self) -> String {
        match self {
            TypeDescriptor::GenericParameter(parameter) => {
                if parameter.is_method_parameter() {
                    format!("!!{}", parameter.position())
                } else {
                    format!("!{}", parameter.position())
                }
            }
            TypeDescriptor::Array { element, .. }
            | TypeDescriptor::Pointer(element)
            | TypeDescriptor::ByRef(element)
                if self.assembly().is_none() =>
            {
                format!("{}{}", element.qualified_name(), self.suffix())
            }
            _ => match self.assembly() {
                Some(assembly) => format!("{}, {}", self.full_name(), assembly),
                None => self.full_name(),
            },
        }
    }

    fn suffix(&self) -> String {
        match self {
            TypeDescriptor::Array { rank, .. } => array_suffix(*rank),
            TypeDescriptor::Pointer(_) => "*".to_string(),
            TypeDescriptor::ByRef(_) => "&".to_string(),
            _ => String::new(),
        }
    }

    fn assembly(&self) -> Option<Arc<str>> {
        match self {
            TypeDescriptor::Defined(definition) => Some(definition.assembly.clone()),
            TypeDescriptor::Array { element, .. }
            | TypeDescriptor::Pointer(element)
            | TypeDescriptor::ByRef(element) => element.assembly(),
            TypeDescriptor::GenericParameter(_) => None,
            TypeDescriptor::ConstructedGeneric(constructed) => constructed.definition.assembly(),
        }
    }

    /// The module defining this type (for wrappers: the element's module)
    ///
    /// # Errors
    /// Returns [`Error::Released`] if the module has been dropped.
    pub fn module(&self) -> Result<ModuleRc> {
        match self {
            TypeDescriptor::Defined(definition) => definition.module(),
            TypeDescriptor::Array { element, .. }
            | TypeDescriptor::Pointer(element)
            | TypeDescriptor::ByRef(element) => element.module(),
            TypeDescriptor::GenericParameter(parameter) => parameter.module(),
            TypeDescriptor::ConstructedGeneric(constructed) => constructed.definition.module(),
        }
    }

    /// The `TypeDef` token (`GenericParam` token for generic parameters, nil `TypeDef` for
    /// wrappers)
    #[must_use]
    pub fn token(&self) -> Token {
        match self {
            TypeDescriptor::Defined(definition) => definition.token,
            TypeDescriptor::GenericParameter(parameter) => parameter.token,
            TypeDescriptor::ConstructedGeneric(constructed) => constructed.definition.token(),
            _ => TokenKind::TypeDef.token(0),
        }
    }

    /// `TypeAttributes` of the definition, 0 for wrappers and generic parameters
    #[must_use]
    pub fn flags(&self) -> u32 {
        match self {
            TypeDescriptor::Defined(definition) => definition.row.flags,
            TypeDescriptor::ConstructedGeneric(constructed) => constructed.definition.flags(),
            _ => 0,
        }
    }

    /// Identifies the registry that produced this descriptor
    #[must_use]
    pub fn registry_id(&self) -> u64 {
        match self {
            TypeDescriptor::Defined(definition) => definition.registry_id,
            TypeDescriptor::Array { element, .. }
            | TypeDescriptor::Pointer(element)
            | TypeDescriptor::ByRef(element) => element.registry_id(),
            TypeDescriptor::GenericParameter(parameter) => parameter.registry_id,
            TypeDescriptor::ConstructedGeneric(constructed) => constructed.definition.registry_id(),
        }
    }

    /// True for arrays
    #[must_use]
    pub fn is_array(&self) -> bool {
        matches!(self, TypeDescriptor::Array { .. })
    }

    /// True for unmanaged pointers
    #[must_use]
    pub fn is_pointer(&self) -> bool {
        matches!(self, TypeDescriptor::Pointer(_))
    }

    /// True for managed references
    #[must_use]
    pub fn is_by_ref(&self) -> bool {
        matches!(self, TypeDescriptor::ByRef(_))
    }

    /// True for generic parameters
    #[must_use]
    pub fn is_generic_parameter(&self) -> bool {
        matches!(self, TypeDescriptor::GenericParameter(_))
    }

    /// The element type of arrays, pointers and by-refs
    #[must_use]
    pub fn element_type(&self) -> Option<TypeRc> {
        match self {
            TypeDescriptor::Array { element, .. }
            | TypeDescriptor::Pointer(element)
            | TypeDescriptor::ByRef(element) => Some(element.clone()),
            _ => None,
        }
    }

    /// The number of dimensions of an array
    #[must_use]
    pub fn rank(&self) -> Option<u32> {
        match self {
            TypeDescriptor::Array { rank, .. } => Some(*rank),
            _ => None,
        }
    }

    /// True if the type is declared inside another type
    #[must_use]
    pub fn is_nested(&self) -> bool {
        match self {
            TypeDescriptor::Defined(definition) => definition.enclosing.is_some(),
            TypeDescriptor::ConstructedGeneric(constructed) => constructed.definition.is_nested(),
            _ => false,
        }
    }

    /// True for interfaces
    #[must_use]
    pub fn is_interface(&self) -> bool {
        match self {
            TypeDescriptor::Defined(definition) => definition.is_interface(),
            TypeDescriptor::ConstructedGeneric(constructed) => constructed.definition.is_interface(),
            _ => false,
        }
    }

    /// True for top-level public types
    #[must_use]
    pub fn is_public(&self) -> bool {
        match self {
            TypeDescriptor::Defined(definition) => {
                definition.visibility() == TypeAttributes::PUBLIC
            }
            TypeDescriptor::ConstructedGeneric(constructed) => constructed.definition.is_public(),
            TypeDescriptor::Array { element, .. }
            | TypeDescriptor::Pointer(element)
            | TypeDescriptor::ByRef(element) => element.is_public(),
            TypeDescriptor::GenericParameter(_) => false,
        }
    }

    /// True for nested types with public visibility
    #[must_use]
    pub fn is_nested_public(&self) -> bool {
        match self {
            TypeDescriptor::Defined(definition) => {
                definition.enclosing.is_some()
                    && definition.visibility() == TypeAttributes::NESTED_PUBLIC
            }
            TypeDescriptor::ConstructedGeneric(constructed) => {
                constructed.definition.is_nested_public()
            }
            _ => false,
        }
    }

    /// The built-in kind of a core library type such as `System.Int32`
    #[must_use]
    pub fn primitive_kind(&self) -> Option<PrimitiveKind> {
        match self {
            TypeDescriptor::Defined(definition) if definition.enclosing.is_none() => {
                PrimitiveKind::from_full_name(&definition.full_name)
            }
            _ => None,
        }
    }

    /// True if the type maps to a built-in element type
    #[must_use]
    pub fn is_primitive(&self) -> bool {
        self.primitive_kind().is_some()
    }

    /// True for definitions with generic parameters and for constructed generics
    #[must_use]
    pub fn is_generic_type(&self) -> bool {
        match self {
            TypeDescriptor::Defined(definition) => definition.generic_parameter_count > 0,
            TypeDescriptor::ConstructedGeneric(_) => true,
            _ => false,
        }
    }

    /// True for definitions with generic parameters
    #[must_use]
    pub fn is_generic_type_definition(&self) -> bool {
        matches!(self, TypeDescriptor::Defined(definition) if definition.generic_parameter_count > 0)
    }

    /// True for definitions instantiated with type arguments
    #[must_use]
    pub fn is_constructed_generic_type(&self) -> bool {
        matches!(self, TypeDescriptor::ConstructedGeneric(_))
    }

    /// The generic parameter behind this descriptor
    #[must_use]
    pub fn as_generic_parameter(&self) -> Option<&GenericParameter> {
        match self {
            TypeDescriptor::GenericParameter(parameter) => Some(parameter),
            _ => None,
        }
    }

    /// Position of a generic parameter in its owner's parameter list
    #[must_use]
    pub fn generic_parameter_position(&self) -> Option<u32> {
        self.as_generic_parameter().map(GenericParameter::position)
    }

    /// The constraints of a generic parameter; empty for every other descriptor
    ///
    /// # Errors
    /// Returns an error if a constraint cannot be resolved.
    pub fn generic_parameter_constraints(&self) -> Result<Vec<TypeRc>> {
        match self {
            TypeDescriptor::GenericParameter(parameter) => {
                parameter.constraints().map(<[TypeRc]>::to_vec)
            }
            _ => Ok(Vec::new()),
        }
    }

    /// The declaring type of nested types and generic parameters
    ///
    /// # Errors
    /// Returns [`Error::Released`] if the module or owner has been dropped.
    pub fn declaring_type(&self) -> Result<Option<TypeRc>> {
        match self {
            TypeDescriptor::Defined(definition) => match definition.enclosing {
                Some(rid) => definition
                    .module()?
                    .type_by_token(TokenKind::TypeDef.token(rid))
                    .map(Some),
                None => Ok(None),
            },
            TypeDescriptor::ConstructedGeneric(constructed) => constructed.definition.declaring_type(),
            TypeDescriptor::GenericParameter(parameter) => parameter.declaring_type().map(Some),
            _ => Ok(None),
        }
    }

    /// The declaring method of a generic method parameter
    #[must_use]
    pub fn declaring_method(&self) -> Option<MethodRc> {
        self.as_generic_parameter()
            .and_then(GenericParameter::declaring_method)
    }

    /// The generic parameters of a definition, or the arguments of a constructed type
    ///
    /// # Errors
    /// Returns an error if the `GenericParam` rows cannot be read.
    pub fn generic_arguments(self: &Arc<Self>) -> Result<Vec<TypeRc>> {
        match self.as_ref() {
            TypeDescriptor::Defined(definition) => {
                Ok(definition.generic_parameters(self)?.to_vec())
            }
            TypeDescriptor::ConstructedGeneric(constructed) => Ok(constructed.arguments.clone()),
            _ => Ok(Vec::new()),
        }
    }

    /// The generic definition of a constructed type; a generic definition returns itself
    #[must_use]
    pub fn generic_definition(self: &Arc<Self>) -> Option<TypeRc> {
        match self.as_ref() {
            TypeDescriptor::Defined(definition) if definition.generic_parameter_count > 0 => {
                Some(self.clone())
            }
            TypeDescriptor::ConstructedGeneric(constructed) => Some(constructed.definition.clone()),
            _ => None,
        }
    }

    /// The base type; `None` for `System.Object`, interfaces, pointers, by-refs and generic
    /// parameters. Arrays derive from `System.Array`.
    ///
    /// # Errors
    /// Returns an error if the `extends` reference cannot be resolved.
    pub fn base_type(self: &Arc<Self>) -> Result<Option<TypeRc>> {
        match self.as_ref() {
            TypeDescriptor::Defined(definition) => {
                Ok(cached!(definition.base, || resolve_extends(self, definition)).clone())
            }
            TypeDescriptor::ConstructedGeneric(constructed) => Ok(cached!(constructed.base, || {
                resolve_extends(self, constructed.defined()?)
            })
            .clone()),
            TypeDescriptor::Array { .. } => Ok(Some(
                self.module()?.registry()?.core_type("System.Array")?,
            )),
            _ => Ok(None),
        }
    }

    /// True if the base type is `System.Enum`
    ///
    /// # Errors
    /// Returns an error if the base type cannot be resolved.
    pub fn is_enum(self: &Arc<Self>) -> Result<bool> {
        if !matches!(
            self.as_ref(),
            TypeDescriptor::Defined(_) | TypeDescriptor::ConstructedGeneric(_)
        ) {
            return Ok(false);
        }

        Ok(self
            .base_type()?
            .is_some_and(|base| base.full_name() == "System.Enum"))
    }

    /// True for types deriving from `System.ValueType` that are not enums
    ///
    /// # Errors
    /// Returns an error if a type of the hierarchy cannot be resolved, or
    /// [`Error::RecursionLimit`] for a cyclic hierarchy.
    pub fn is_value_type(self: &Arc<Self>) -> Result<bool> {
        if self.is_enum()? {
            return Ok(false);
        }

        let limit = self.module()?.max_depth();
        let mut current = self.base_type()?;
        let mut depth = 0;
        while let Some(ty) = current {
            if ty.full_name() == "System.ValueType" {
                return Ok(true);
            }

            depth += 1;
            if depth > limit {
                return Err(Error::RecursionLimit(limit));
            }
            current = ty.base_type()?;
        }

        Ok(false)
    }

    /// The interfaces listed in the `InterfaceImpl` table for this type
    ///
    /// # Errors
    /// Returns an error if an interface reference cannot be resolved.
    pub fn interfaces(self: &Arc<Self>) -> Result<Vec<TypeRc>> {
        match self.as_ref() {
            TypeDescriptor::Defined(definition) => Ok(cached!(definition.interfaces, || {
                resolve_interfaces(self, definition)
            })
            .clone()),
            TypeDescriptor::ConstructedGeneric(constructed) => {
                Ok(cached!(constructed.interfaces, || {
                    resolve_interfaces(self, constructed.defined()?)
                })
                .clone())
            }
            _ => Ok(Vec::new()),
        }
    }

    /// The first interface whose full name or simple name equals `name`
    ///
    /// # Errors
    /// Returns an error if an interface reference cannot be resolved.
    pub fn interface(self: &Arc<Self>, name: &str, ignore_case: bool) -> Result<Option<TypeRc>> {
        Ok(self.interfaces()?.into_iter().find(|interface| {
            names_equal(name, &interface.full_name(), ignore_case)
                || names_equal(name, &interface.name(), ignore_case)
        }))
    }

    /// The type of the `value__` instance field of an enum
    ///
    /// # Errors
    /// Returns [`Error::NotAnEnum`] for other types, [`Error::MissingEnumBackingField`] if the
    /// field is absent and [`Error::NotPrimitive`] if its type is not a built-in type.
    pub fn enum_underlying_type(self: &Arc<Self>) -> Result<TypeRc> {
        if !self.is_enum()? {
            return Err(Error::NotAnEnum(self.full_name()));
        }

        let field = self
            .field(
                "value__",
                VisibilityMask::INSTANCE | VisibilityMask::PUBLIC | VisibilityMask::NON_PUBLIC,
            )?
            .ok_or_else(|| Error::MissingEnumBackingField(self.full_name()))?;

        let underlying = field.field_type()?;
        if underlying.primitive_kind().is_none() {
            return Err(Error::NotPrimitive(underlying.full_name()));
        }

        Ok(underlying)
    }

    /// The names of the static fields of an enum, in declaration order
    ///
    /// # Errors
    /// Returns [`Error::NotAnEnum`] for other types.
    pub fn enum_names(self: &Arc<Self>) -> Result<Vec<String>> {
        if !self.is_enum()? {
            return Err(Error::NotAnEnum(self.full_name()));
        }

        Ok(self
            .fields(VisibilityMask::STATIC | VisibilityMask::PUBLIC | VisibilityMask::NON_PUBLIC)?
            .iter()
            .map(|field| field.name().to_string())
            .collect())
    }

    /// The names and constant values of the static fields of an enum
    ///
    /// # Errors
    /// Returns [`Error::NotAnEnum`] for other types, or an error for undecodable constants.
    pub fn enum_values(self: &Arc<Self>) -> Result<Vec<(String, ConstantValue)>> {
        if !self.is_enum()? {
            return Err(Error::NotAnEnum(self.full_name()));
        }

        let mut values = Vec::new();
        for field in
            self.fields(VisibilityMask::STATIC | VisibilityMask::PUBLIC | VisibilityMask::NON_PUBLIC)?
        {
            if let Some(value) = field.constant_value()? {
                values.push((field.name().to_string(), value));
            }
        }

        Ok(values)
    }

    /// The custom attributes applied to the definition
    ///
    /// # Errors
    /// Returns an error if the `CustomAttribute` table cannot be read.
    pub fn custom_attributes(&self) -> Result<Vec<CustomAttributeRc>> {
        match self {
            TypeDescriptor::Defined(definition) => {
                definition.custom_attributes().map(<[CustomAttributeRc]>::to_vec)
            }
            TypeDescriptor::ConstructedGeneric(constructed) => {
                constructed.definition.custom_attributes()
            }
            _ => Ok(Vec::new()),
        }
    }

    /// Instantiates a generic definition with `arguments`
    ///
    /// Constructed types are interned per definition module: constructing the same definition
    /// with equal arguments twice returns the same descriptor.
    ///
    /// # Errors
    /// Returns [`Error::NotGenericDefinition`] if this is not a generic definition,
    /// [`Error::ArityMismatch`] if the argument count differs from the parameter count and
    /// [`Error::ForeignTypeArgument`] for arguments of another registry.
    pub fn construct(self: &Arc<Self>, arguments: &[TypeRc]) -> Result<TypeRc> {
        let TypeDescriptor::Defined(definition) = self.as_ref() else {
            return Err(Error::NotGenericDefinition(self.full_name()));
        };

        if definition.generic_parameter_count == 0 {
            return Err(Error::NotGenericDefinition(self.full_name()));
        }

        if arguments.len() != definition.generic_parameter_count {
            return Err(Error::ArityMismatch {
                expected: definition.generic_parameter_count,
                actual: arguments.len(),
            });
        }

        if let Some(foreign) = arguments
            .iter()
            .find(|argument| argument.registry_id() != definition.registry_id)
        {
            return Err(Error::ForeignTypeArgument(foreign.full_name()));
        }

        let full_name = constructed_name(&definition.full_name, arguments);
        definition
            .module()?
            .intern_constructed(full_name.clone(), || {
                Ok(Arc::new(TypeDescriptor::ConstructedGeneric(
                    ConstructedType::new(self.clone(), arguments.to_vec(), full_name),
                )))
            })
    }

    /// A new array type of this element type; a rank of 0 is treated as 1
    #[must_use]
    pub fn make_array(self: &Arc<Self>, rank: u32) -> TypeRc {
        Arc::new(TypeDescriptor::Array {
            element: self.clone(),
            rank: rank.max(1),
        })
    }

    /// A new pointer type to this type
    #[must_use]
    pub fn make_pointer(self: &Arc<Self>) -> TypeRc {
        Arc::new(TypeDescriptor::Pointer(self.clone()))
    }

    /// A new by-ref type of this type
    #[must_use]
    pub fn make_by_ref(self: &Arc<Self>) -> TypeRc {
        Arc::new(TypeDescriptor::ByRef(self.clone()))
    }
}

impl PartialEq for TypeDescriptor {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self, other) || self.qualified_name() == other.qualified_name()
    }
}

impl Eq for TypeDescriptor {}

impl Hash for TypeDescriptor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.qualified_name().hash(state);
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeDescriptor::ConstructedGeneric(constructed) => {
                write!(f, "{}[", constructed.definition.full_name())?;
                for (index, argument) in constructed.arguments.iter().enumerate() {
                    if index > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{argument}")?;
                }
                write!(f, "]")
            }
            other => write!(f, "{}", other.full_name()),
        }
    }
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeDescriptor({})", self.qualified_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::Fixture;

    #[test]
    fn type_by_token_round_trips() {
        let fixture = Fixture::new();

        for ty in fixture.library.types().unwrap() {
            let found = fixture.library.type_by_token(ty.token()).unwrap();
            assert!(Arc::ptr_eq(ty, &found));
        }
    }

    #[test]
    fn names_of_nested_types() {
        let fixture = Fixture::new();
        let part = fixture.library.type_by_token(fixture.tokens.widget_part).unwrap();

        assert_eq!(part.name(), "Part");
        assert_eq!(part.namespace(), "Library");
        assert_eq!(part.full_name(), "Library.Widget+Part");
        assert!(part.is_nested());
        assert!(part.is_nested_public());
        assert!(!part.is_public());

        let declaring = part.declaring_type().unwrap().unwrap();
        assert!(Arc::ptr_eq(&declaring, &fixture.widget()));
    }

    #[test]
    fn primitives_come_from_the_core_library() {
        let fixture = Fixture::new();
        let int32 = fixture.core_type("System.Int32");

        assert_eq!(int32.primitive_kind(), Some(PrimitiveKind::I4));
        assert!(int32.is_value_type().unwrap());
        assert!(!fixture.core_type("System.Type").is_primitive());
        assert_eq!(int32.token(), fixture.core.int32);
    }

    #[test]
    fn value_types_and_enums() {
        let fixture = Fixture::new();
        let point = fixture.library.type_by_token(fixture.tokens.point).unwrap();
        let color = fixture.library.type_by_token(fixture.tokens.color).unwrap();

        assert!(point.is_value_type().unwrap());
        assert!(!point.is_enum().unwrap());
        assert!(color.is_enum().unwrap());
        assert!(!fixture.widget().is_value_type().unwrap());
        assert!(!fixture.widget().is_enum().unwrap());
    }

    #[test]
    fn enum_members() {
        let fixture = Fixture::new();
        let color = fixture.library.type_by_token(fixture.tokens.color).unwrap();

        let underlying = color.enum_underlying_type().unwrap();
        assert_eq!(underlying.full_name(), "System.Int32");
        assert_eq!(color.enum_names().unwrap(), vec!["Red", "Green", "Blue"]);
        assert_eq!(
            color.enum_values().unwrap(),
            vec![
                ("Red".to_string(), ConstantValue::I4(0)),
                ("Green".to_string(), ConstantValue::I4(1)),
                ("Blue".to_string(), ConstantValue::I4(2)),
            ]
        );
    }

    #[test]
    fn enum_without_backing_field() {
        let fixture = Fixture::new();
        let broken = fixture.library.type_by_token(fixture.tokens.broken).unwrap();

        assert!(broken.is_enum().unwrap());
        assert!(matches!(
            broken.enum_underlying_type(),
            Err(Error::MissingEnumBackingField(name)) if name == "Library.Broken"
        ));
        assert!(matches!(
            fixture.widget().enum_underlying_type(),
            Err(Error::NotAnEnum(_))
        ));
    }

    #[test]
    fn construct_checks_arity() {
        let fixture = Fixture::new();
        let list = fixture.corlib.type_by_token(fixture.core.list).unwrap();
        let int32 = fixture.core_type("System.Int32");
        let string = fixture.core_type("System.String");

        assert!(matches!(
            list.construct(&[]),
            Err(Error::ArityMismatch { expected: 1, actual: 0 })
        ));
        assert!(matches!(
            list.construct(&[int32.clone(), string]),
            Err(Error::ArityMismatch { expected: 1, actual: 2 })
        ));
        assert!(matches!(
            int32.construct(&[list.clone()]),
            Err(Error::NotGenericDefinition(_))
        ));

        let constructed = list.construct(&[int32.clone()]).unwrap();
        assert!(constructed.is_constructed_generic_type());
        assert!(!constructed.is_generic_type_definition());
        assert_eq!(
            constructed.to_string(),
            "System.Collections.Generic.List`1[System.Int32]"
        );
        assert!(Arc::ptr_eq(&constructed.generic_definition().unwrap(), &list));
        assert_eq!(constructed.generic_arguments().unwrap(), vec![int32.clone()]);

        let again = list.construct(&[int32]).unwrap();
        assert!(Arc::ptr_eq(&constructed, &again));
    }

    #[test]
    fn construct_rejects_foreign_arguments() {
        let fixture = Fixture::new();
        let other = Fixture::new();
        let list = fixture.corlib.type_by_token(fixture.core.list).unwrap();

        assert!(matches!(
            list.construct(&[other.core_type("System.Int32")]),
            Err(Error::ForeignTypeArgument(name)) if name == "System.Int32"
        ));
    }

    #[test]
    fn arrays_pointers_and_references() {
        let fixture = Fixture::new();
        let int32 = fixture.core_type("System.Int32");

        let vector = int32.make_array(1);
        assert!(vector.is_array());
        assert_eq!(vector.rank(), Some(1));
        assert!(Arc::ptr_eq(&vector.element_type().unwrap(), &int32));
        assert_eq!(vector.full_name(), "System.Int32[]");
        assert_eq!(
            vector.base_type().unwrap().unwrap().full_name(),
            "System.Array"
        );

        assert_eq!(int32.make_array(0).rank(), Some(1));
        assert_eq!(int32.make_array(2).full_name(), "System.Int32[,]");
        assert_eq!(int32.make_pointer().name(), "Int32*");
        assert!(int32.make_by_ref().is_by_ref());
        assert_eq!(int32.make_array(1), vector);
    }

    #[test]
    fn generic_parameters_and_constraints() {
        let fixture = Fixture::new();
        let boxed = fixture.library.type_by_token(fixture.tokens.boxed).unwrap();

        assert!(boxed.is_generic_type_definition());
        let parameters = boxed.generic_arguments().unwrap();
        assert_eq!(parameters.len(), 1);

        let parameter = &parameters[0];
        assert!(parameter.is_generic_parameter());
        assert_eq!(parameter.name(), "T");
        assert_eq!(parameter.generic_parameter_position(), Some(0));
        assert!(parameter.declaring_method().is_none());

        let constraints = parameter.generic_parameter_constraints().unwrap();
        assert_eq!(constraints.len(), 1);
        assert_eq!(constraints[0].full_name(), "System.IDisposable");
    }

    #[test]
    fn base_types_and_interfaces() {
        let fixture = Fixture::new();
        let widget = fixture.widget();

        let base = widget.base_type().unwrap().unwrap();
        assert_eq!(base.full_name(), "System.Object");
        assert!(base.base_type().unwrap().is_none());

        let disposable = widget.interface("System.IDisposable", false).unwrap().unwrap();
        assert!(disposable.is_interface());
        assert!(widget.interface("idisposable", true).unwrap().is_some());
        assert!(widget.interface("IShape", false).unwrap().is_none());
        assert_eq!(widget.interfaces().unwrap().len(), 1);
    }

    #[test]
    fn constructed_members_substitute_arguments() {
        let fixture = Fixture::new();
        let items = fixture
            .widget()
            .field("Items", VisibilityMask::PUBLIC_MEMBERS)
            .unwrap()
            .unwrap();

        let list_of_int = items.field_type().unwrap();
        assert!(list_of_int.is_constructed_generic_type());

        let add = list_of_int
            .method("Add", VisibilityMask::PUBLIC_MEMBERS)
            .unwrap()
            .unwrap();
        assert_eq!(add.parameter_types().unwrap()[0].full_name(), "System.Int32");

        let item = list_of_int
            .property("Item", VisibilityMask::PUBLIC_MEMBERS)
            .unwrap()
            .unwrap();
        assert_eq!(item.property_type().unwrap().full_name(), "System.Int32");
    }
}
