use std::sync::{Arc, OnceLock, Weak};

use crate::{
    customattributes::CustomAttributeRc,
    members::{accessor, has_accessor, MemberInfo, MemberType, MethodRc, Parameter, PropertyRc},
    metadata::{
        signatures::{parse_property_signature, SignatureProperty},
        tables::{MethodSemanticsAttributes, PropertyRow},
        token::{Token, TokenKind},
    },
    module::{Module, ModuleRc},
    resolver::{GenericContext, Resolver},
    typesystem::{ConstantValue, TypeDescriptor, TypeRc, VisibilityMask},
    Error, Result,
};

struct ResolvedProperty {
    property_type: TypeRc,
    index_types: Vec<TypeRc>,
}

/// A property backed by a `Property` row
///
/// Visibility and storage come from the accessors: the getter, or the setter of a write-only
/// property.
pub struct Property {
    declaring: Weak<TypeDescriptor>,
    module: Weak<Module>,
    token: Token,
    row: PropertyRow,
    name: String,
    signature: OnceLock<SignatureProperty>,
    resolved: OnceLock<ResolvedProperty>,
    custom_attributes: OnceLock<Vec<CustomAttributeRc>>,
}

impl Property {
    pub(crate) fn create(owner: &TypeRc, module: &Module, row: PropertyRow) -> Result<PropertyRc> {
        Ok(Arc::new(Property {
            declaring: Arc::downgrade(owner),
            module: module.weak(),
            token: TokenKind::Property.token(row.rid),
            name: module.view().string(row.name)?.to_string(),
            row,
            signature: OnceLock::new(),
            resolved: OnceLock::new(),
            custom_attributes: OnceLock::new(),
        }))
    }

    /// The property name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The `Property` token
    #[must_use]
    pub fn token(&self) -> Token {
        self.token
    }

    /// `PropertyAttributes` of the row
    #[must_use]
    pub fn flags(&self) -> u16 {
        self.row.flags
    }

    /// The declaring type
    ///
    /// # Errors
    /// Returns [`Error::Released`] if the type has been dropped.
    pub fn declaring_type(&self) -> Result<TypeRc> {
        self.declaring.upgrade().ok_or(Error::Released)
    }

    /// The defining module
    ///
    /// # Errors
    /// Returns [`Error::Released`] if the module has been dropped.
    pub fn module(&self) -> Result<ModuleRc> {
        self.module.upgrade().ok_or(Error::Released)
    }

    /// The decoded signature blob
    ///
    /// # Errors
    /// Returns an error for a malformed blob.
    pub fn signature(&self) -> Result<&SignatureProperty> {
        Ok(cached!(self.signature, || {
            let module = self.module()?;
            parse_property_signature(module.view().blob(self.row.signature)?)
        }))
    }

    fn resolved(&self) -> Result<&ResolvedProperty> {
        Ok(cached!(self.resolved, || {
            let module = self.module()?;
            let context = GenericContext::for_type(&self.declaring_type()?)?;
            let signature = self.signature()?;

            let resolver = Resolver::new(&module, &context);
            Ok(ResolvedProperty {
                property_type: resolver.resolve(&signature.base)?,
                index_types: signature
                    .params
                    .iter()
                    .map(|parameter| resolver.resolve_parameter(parameter))
                    .collect::<Result<Vec<_>>>()?,
            })
        }))
    }

    /// The property type
    ///
    /// # Errors
    /// Returns an error if the signature cannot be decoded or resolved.
    pub fn property_type(&self) -> Result<TypeRc> {
        Ok(self.resolved()?.property_type.clone())
    }

    /// The types of the index parameters from the property signature
    ///
    /// # Errors
    /// Returns an error if the signature cannot be decoded or resolved.
    pub fn index_parameter_types(&self) -> Result<Vec<TypeRc>> {
        Ok(self.resolved()?.index_types.clone())
    }

    /// The index parameters: those of the getter, or of the setter without its value parameter
    ///
    /// # Errors
    /// Returns an error if an accessor cannot be loaded.
    pub fn index_parameters(&self) -> Result<Vec<Parameter>> {
        if let Some(getter) = self.getter(true)? {
            return getter.parameters();
        }

        match self.setter(true)? {
            Some(setter) => {
                let mut parameters = setter.parameters()?;
                parameters.pop();
                Ok(parameters)
            }
            None => Ok(Vec::new()),
        }
    }

    /// True if the property has a getter of any visibility
    ///
    /// # Errors
    /// Returns an error if the `MethodSemantics` table cannot be read.
    pub fn can_read(&self) -> Result<bool> {
        has_accessor(
            &self.declaring_type()?,
            self.token,
            MethodSemanticsAttributes::GETTER,
        )
    }

    /// True if the property has a setter of any visibility
    ///
    /// # Errors
    /// Returns an error if the `MethodSemantics` table cannot be read.
    pub fn can_write(&self) -> Result<bool> {
        has_accessor(
            &self.declaring_type()?,
            self.token,
            MethodSemanticsAttributes::SETTER,
        )
    }

    /// The getter; non-public getters only with `non_public`
    ///
    /// # Errors
    /// Returns an error if the accessor cannot be loaded.
    pub fn getter(&self, non_public: bool) -> Result<Option<MethodRc>> {
        accessor(
            &self.declaring_type()?,
            self.token,
            MethodSemanticsAttributes::GETTER,
            non_public,
        )
    }

    /// The setter; non-public setters only with `non_public`
    ///
    /// # Errors
    /// Returns an error if the accessor cannot be loaded.
    pub fn setter(&self, non_public: bool) -> Result<Option<MethodRc>> {
        accessor(
            &self.declaring_type()?,
            self.token,
            MethodSemanticsAttributes::SETTER,
            non_public,
        )
    }

    pub(crate) fn accepted_by(&self, mask: VisibilityMask) -> Result<bool> {
        let accessor = match self.getter(true)? {
            Some(getter) => Some(getter),
            None => self.setter(true)?,
        };

        Ok(accessor.is_some_and(|method| mask.accepts(method.is_static(), method.is_public())))
    }

    /// The custom attributes applied to this property
    ///
    /// # Errors
    /// Returns an error if the `CustomAttribute` table cannot be read.
    pub fn custom_attributes(&self) -> Result<Vec<CustomAttributeRc>> {
        Ok(cached!(self.custom_attributes, || self
            .module()?
            .custom_attributes_of(self.token))
        .clone())
    }

    /// Always fails: a reflection-only module has no instances to read from
    ///
    /// # Errors
    /// Returns [`Error::UnsupportedOperation`].
    pub fn get_value(
        &self,
        _target: Option<&ConstantValue>,
        _index: &[ConstantValue],
    ) -> Result<ConstantValue> {
        Err(Error::UnsupportedOperation(
            "properties of a reflection-only module cannot be read",
        ))
    }

    /// Always fails: a reflection-only module has no instances to write to
    ///
    /// # Errors
    /// Returns [`Error::UnsupportedOperation`].
    pub fn set_value(
        &self,
        _target: Option<&ConstantValue>,
        _value: ConstantValue,
        _index: &[ConstantValue],
    ) -> Result<()> {
        Err(Error::UnsupportedOperation(
            "properties of a reflection-only module cannot be written",
        ))
    }
}

impl MemberInfo for Property {
    fn name(&self) -> &str {
        &self.name
    }

    fn token(&self) -> Token {
        self.token
    }

    fn member_type(&self) -> MemberType {
        MemberType::Property
    }

    fn declaring_type(&self) -> Result<TypeRc> {
        Property::declaring_type(self)
    }

    fn module(&self) -> Result<ModuleRc> {
        Property::module(self)
    }

    fn custom_attributes(&self) -> Result<Vec<CustomAttributeRc>> {
        Property::custom_attributes(self)
    }
}
