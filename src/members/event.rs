use std::sync::{Arc, OnceLock, Weak};

use crate::{
    customattributes::CustomAttributeRc,
    members::{accessor, EventRc, MemberInfo, MemberType, MethodRc},
    metadata::{
        tables::{EventRow, MethodSemanticsAttributes},
        token::{Token, TokenKind},
    },
    module::{Module, ModuleRc},
    resolver::GenericContext,
    typesystem::{TypeDescriptor, TypeRc, VisibilityMask},
    Error, Result,
};

/// An event backed by an `Event` row
pub struct Event {
    declaring: Weak<TypeDescriptor>,
    module: Weak<Module>,
    token: Token,
    row: EventRow,
    name: String,
    event_type: OnceLock<TypeRc>,
    custom_attributes: OnceLock<Vec<CustomAttributeRc>>,
}

impl Event {
    pub(crate) fn create(owner: &TypeRc, module: &Module, row: EventRow) -> Result<EventRc> {
        Ok(Arc::new(Event {
            declaring: Arc::downgrade(owner),
            module: module.weak(),
            token: TokenKind::Event.token(row.rid),
            name: module.view().string(row.name)?.to_string(),
            row,
            event_type: OnceLock::new(),
            custom_attributes: OnceLock::new(),
        }))
    }

    /// The event name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The `Event` token
    #[must_use]
    pub fn token(&self) -> Token {
        self.token
    }

    /// `EventAttributes` of the row
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

    /// The delegate type named by the `Event` row
    ///
    /// # Errors
    /// Returns an error if the type reference cannot be resolved.
    pub fn event_type(&self) -> Result<TypeRc> {
        Ok(cached!(self.event_type, || {
            let module = self.module()?;
            let context = GenericContext::for_type(&self.declaring_type()?)?;
            module.resolve_type_token(self.row.event_type, &context, 0)
        })
        .clone())
    }

    /// The type of the first parameter of the add accessor
    ///
    /// # Errors
    /// Returns an error if the add accessor cannot be loaded, or
    /// [`crate::Error::Malformed`] if it has no parameter.
    pub fn handler_type(&self) -> Result<Option<TypeRc>> {
        let Some(add) = self.add_method(true)? else {
            return Ok(None);
        };

        match add.parameter_types()?.first() {
            Some(handler) => Ok(Some(handler.clone())),
            None => Err(malformed_error!(
                "Add accessor of event {} has no parameter",
                self.name
            )),
        }
    }

    /// The add accessor; non-public accessors only with `non_public`
    ///
    /// # Errors
    /// Returns an error if the accessor cannot be loaded.
    pub fn add_method(&self, non_public: bool) -> Result<Option<MethodRc>> {
        accessor(
            &self.declaring_type()?,
            self.token,
            MethodSemanticsAttributes::ADD_ON,
            non_public,
        )
    }

    /// The remove accessor; non-public accessors only with `non_public`
    ///
    /// # Errors
    /// Returns an error if the accessor cannot be loaded.
    pub fn remove_method(&self, non_public: bool) -> Result<Option<MethodRc>> {
        accessor(
            &self.declaring_type()?,
            self.token,
            MethodSemanticsAttributes::REMOVE_ON,
            non_public,
        )
    }

    /// The raise accessor; non-public accessors only with `non_public`
    ///
    /// # Errors
    /// Returns an error if the accessor cannot be loaded.
    pub fn raise_method(&self, non_public: bool) -> Result<Option<MethodRc>> {
        accessor(
            &self.declaring_type()?,
            self.token,
            MethodSemanticsAttributes::FIRE,
            non_public,
        )
    }

    pub(crate) fn accepted_by(&self, mask: VisibilityMask) -> Result<bool> {
        Ok(self
            .add_method(true)?
            .is_some_and(|add| mask.accepts(add.is_static(), add.is_public())))
    }

    /// The custom attributes applied to this event
    ///
    /// # Errors
    /// Returns an error if the `CustomAttribute` table cannot be read.
    pub fn custom_attributes(&self) -> Result<Vec<CustomAttributeRc>> {
        Ok(cached!(self.custom_attributes, || self
            .module()?
            .custom_attributes_of(self.token))
        .clone())
    }
}

impl MemberInfo for Event {
    fn name(&self) -> &str {
        &self.name
    }

    fn token(&self) -> Token {
        self.token
    }

    fn member_type(&self) -> MemberType {
        MemberType::Event
    }

    fn declaring_type(&self) -> Result<TypeRc> {
        Event::declaring_type(self)
    }

    fn module(&self) -> Result<ModuleRc> {
        Event::module(self)
    }

    fn custom_attributes(&self) -> Result<Vec<CustomAttributeRc>> {
        Event::custom_attributes(self)
    }
}
