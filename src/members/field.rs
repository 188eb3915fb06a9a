use std::{
    fmt,
    sync::{Arc, OnceLock, Weak},
};

use crate::{
    customattributes::CustomAttributeRc,
    members::{FieldRc, MemberInfo, MemberType},
    metadata::{
        signatures::{parse_field_signature, SignatureField},
        tables::{FieldAttributes, FieldRow},
        token::{Token, TokenKind},
    },
    module::{Module, ModuleRc},
    resolver::{GenericContext, Resolver},
    typesystem::{ConstantValue, TypeDescriptor, TypeRc},
    Error, Result,
};

/// A field backed by a `Field` row
pub struct Field {
    declaring: Weak<TypeDescriptor>,
    module: Weak<Module>,
    token: Token,
    row: FieldRow,
    name: String,
    signature: OnceLock<SignatureField>,
    field_type: OnceLock<TypeRc>,
    custom_attributes: OnceLock<Vec<CustomAttributeRc>>,
}

impl Field {
    pub(crate) fn create(owner: &TypeRc, module: &Module, row: FieldRow) -> Result<FieldRc> {
        Ok(Arc::new(Field {
            declaring: Arc::downgrade(owner),
            module: module.weak(),
            token: TokenKind::Field.token(row.rid),
            name: module.view().string(row.name)?.to_string(),
            row,
            signature: OnceLock::new(),
            field_type: OnceLock::new(),
            custom_attributes: OnceLock::new(),
        }))
    }

    /// The field name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The `Field` token
    #[must_use]
    pub fn token(&self) -> Token {
        self.token
    }

    /// `FieldAttributes` of the row
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

    /// True for static fields
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.row.flags & FieldAttributes::STATIC != 0
    }

    /// True for public fields
    #[must_use]
    pub fn is_public(&self) -> bool {
        self.row.flags & FieldAttributes::FIELD_ACCESS_MASK == FieldAttributes::PUBLIC
    }

    /// True for compile-time constants
    #[must_use]
    pub fn is_literal(&self) -> bool {
        self.row.flags & FieldAttributes::LITERAL != 0
    }

    /// True for fields only assignable in a constructor
    #[must_use]
    pub fn is_init_only(&self) -> bool {
        self.row.flags & FieldAttributes::INIT_ONLY != 0
    }

    /// The decoded signature blob
    ///
    /// # Errors
    /// Returns an error for a malformed blob.
    pub fn signature(&self) -> Result<&SignatureField> {
        Ok(cached!(self.signature, || {
            let module = self.module()?;
            parse_field_signature(module.view().blob(self.row.signature)?)
        }))
    }

    /// The field type, with the declaring type's generic arguments substituted
    ///
    /// # Errors
    /// Returns an error if the signature cannot be decoded or resolved.
    pub fn field_type(&self) -> Result<TypeRc> {
        Ok(cached!(self.field_type, || {
            let module = self.module()?;
            let context = GenericContext::for_type(&self.declaring_type()?)?;
            Resolver::new(&module, &context).resolve(&self.signature()?.base)
        })
        .clone())
    }

    /// The value stored in the `Constant` table for literal fields
    ///
    /// # Errors
    /// Returns an error if the constant blob cannot be decoded.
    pub fn constant_value(&self) -> Result<Option<ConstantValue>> {
        let module = self.module()?;
        match module.constant(self.token)? {
            Some(constant) => Ok(Some(ConstantValue::decode(
                constant.element_type,
                module.view().blob(constant.value)?,
            )?)),
            None => Ok(None),
        }
    }

    /// The custom attributes applied to this field
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
    pub fn get_value(&self, _target: Option<&ConstantValue>) -> Result<ConstantValue> {
        Err(Error::UnsupportedOperation(
            "fields of a reflection-only module cannot be read",
        ))
    }

    /// Always fails: a reflection-only module has no instances to write to
    ///
    /// # Errors
    /// Returns [`Error::UnsupportedOperation`].
    pub fn set_value(&self, _target: Option<&ConstantValue>, _value: ConstantValue) -> Result<()> {
        Err(Error::UnsupportedOperation(
            "fields of a reflection-only module cannot be written",
        ))
    }
}

impl MemberInfo for Field {
    fn name(&self) -> &str {
        &self.name
    }

    fn token(&self) -> Token {
        self.token
    }

    fn member_type(&self) -> MemberType {
        MemberType::Field
    }

    fn declaring_type(&self) -> Result<TypeRc> {
        Field::declaring_type(self)
    }

    fn module(&self) -> Result<ModuleRc> {
        Field::module(self)
    }

    fn custom_attributes(&self) -> Result<Vec<CustomAttributeRc>> {
        Field::custom_attributes(self)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.field_type() {
            Ok(field_type) => write!(f, "{} {}", field_type.name(), self.name),
            Err(_) => write!(f, "{}", self.name),
        }
    }
}
