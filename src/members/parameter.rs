use std::sync::Weak;

use crate::{
    customattributes::CustomAttributeRc,
    members::{Method, MethodRc},
    metadata::{
        tables::{ParamAttributes, ParamRow},
        token::{Token, TokenKind},
    },
    module::{Module, ModuleRc},
    typesystem::{ConstantValue, TypeRc},
    Error, Result,
};

/// A parameter or return value of a method
///
/// Built on request from the method signature and the matching `Param` row. The row is optional:
/// compilers omit it for unnamed parameters without attributes.
#[derive(Clone)]
pub struct Parameter {
    method: Weak<Method>,
    module: Weak<Module>,
    row: Option<ParamRow>,
    name: String,
    position: i32,
    parameter_type: TypeRc,
}

impl Parameter {
    pub(crate) fn new(
        module: &Module,
        method: Weak<Method>,
        row: Option<ParamRow>,
        position: i32,
        parameter_type: TypeRc,
    ) -> Result<Self> {
        let name = match &row {
            Some(row) => module.view().string(row.name)?.to_string(),
            None => String::new(),
        };

        Ok(Parameter {
            method,
            module: module.weak(),
            row,
            name,
            position,
            parameter_type,
        })
    }

    /// The parameter name, empty if the `Param` row is missing
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Zero-based position; -1 for the return parameter
    #[must_use]
    pub fn position(&self) -> i32 {
        self.position
    }

    /// The parameter type
    #[must_use]
    pub fn parameter_type(&self) -> &TypeRc {
        &self.parameter_type
    }

    /// The `Param` token, if the parameter has a row
    #[must_use]
    pub fn token(&self) -> Option<Token> {
        self.row.map(|row| TokenKind::Param.token(row.rid))
    }

    /// `ParamAttributes` of the row, 0 without a row
    #[must_use]
    pub fn flags(&self) -> u16 {
        self.row.map_or(0, |row| row.flags)
    }

    /// True for `[In]` parameters
    #[must_use]
    pub fn is_in(&self) -> bool {
        self.flags() & ParamAttributes::IN != 0
    }

    /// True for `[Out]` parameters
    #[must_use]
    pub fn is_out(&self) -> bool {
        self.flags() & ParamAttributes::OUT != 0
    }

    /// True for optional parameters
    #[must_use]
    pub fn is_optional(&self) -> bool {
        self.flags() & ParamAttributes::OPTIONAL != 0
    }

    /// True if the `Constant` table holds a default for this parameter
    #[must_use]
    pub fn has_default_value(&self) -> bool {
        self.flags() & ParamAttributes::HAS_DEFAULT != 0
    }

    /// The declaring method
    ///
    /// # Errors
    /// Returns [`Error::Released`] if the method has been dropped.
    pub fn member(&self) -> Result<MethodRc> {
        self.method.upgrade().ok_or(Error::Released)
    }

    fn module(&self) -> Result<ModuleRc> {
        self.module.upgrade().ok_or(Error::Released)
    }

    /// The default value from the `Constant` table
    ///
    /// # Errors
    /// Returns an error if the constant blob cannot be decoded.
    pub fn default_value(&self) -> Result<Option<ConstantValue>> {
        let Some(token) = self.token() else {
            return Ok(None);
        };
        if !self.has_default_value() {
            return Ok(None);
        }

        let module = self.module()?;
        match module.constant(token)? {
            Some(constant) => Ok(Some(ConstantValue::decode(
                constant.element_type,
                module.view().blob(constant.value)?,
            )?)),
            None => Ok(None),
        }
    }

    /// The custom attributes applied to this parameter
    ///
    /// # Errors
    /// Returns an error if the `CustomAttribute` table cannot be read.
    pub fn custom_attributes(&self) -> Result<Vec<CustomAttributeRc>> {
        match self.token() {
            Some(token) => self.module()?.custom_attributes_of(token),
            None => Ok(Vec::new()),
        }
    }
}

impl std::fmt::Display for Parameter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.parameter_type.name(), self.name)
    }
}
