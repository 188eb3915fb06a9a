//! Member descriptors: methods, fields, properties, events and parameters.
//!
//! Members are created when their declaring type loads the corresponding collection and are
//! shared through [`Arc`] afterwards. Each one keeps a weak reference to its declaring type and
//! module; signatures and resolved types are decoded on first use and memoized.
//!
//! The capabilities shared by all member kinds are exposed through the [`MemberInfo`] trait,
//! and heterogeneous queries such as [`crate::typesystem::TypeDescriptor::members`] return the
//! [`Member`] sum type.
//!
//! Reflection-only: [`Method::invoke`], [`Field::get_value`], [`Property::set_value`] and
//! friends always fail with [`crate::Error::UnsupportedOperation`].

mod event;
mod field;
mod method;
mod parameter;
mod property;

use std::{fmt, sync::Arc};

use bitflags::bitflags;
use strum::Display;

pub use event::Event;
pub use field::Field;
pub use method::Method;
pub use parameter::Parameter;
pub use property::Property;

use crate::{
    customattributes::CustomAttributeRc,
    metadata::token::{Token, TokenKind},
    module::ModuleRc,
    typesystem::{TypeRc, VisibilityMask},
    Result,
};

/// Reference to a [`Method`]
pub type MethodRc = Arc<Method>;
/// Reference to a [`Field`]
pub type FieldRc = Arc<Field>;
/// Reference to a [`Property`]
pub type PropertyRc = Arc<Property>;
/// Reference to an [`Event`]
pub type EventRc = Arc<Event>;

bitflags! {
    /// Calling convention of a method signature
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct CallingConventions: u32 {
        /// Managed default convention
        const STANDARD = 0x01;
        /// Variable argument list
        const VAR_ARGS = 0x02;
        /// Either convention
        const ANY = Self::STANDARD.bits() | Self::VAR_ARGS.bits();
        /// Instance method
        const HAS_THIS = 0x20;
        /// `this` is the first declared parameter
        const EXPLICIT_THIS = 0x40;
    }
}

/// The kind of a member
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display)]
pub enum MemberType {
    /// An instance or type constructor
    Constructor,
    /// An event
    Event,
    /// A field
    Field,
    /// A method
    Method,
    /// A property
    Property,
    /// A nested type
    NestedType,
}

/// Capabilities shared by every member descriptor
pub trait MemberInfo {
    /// The member name
    fn name(&self) -> &str;

    /// The metadata token of the member
    fn token(&self) -> Token;

    /// The kind of member
    fn member_type(&self) -> MemberType;

    /// The type declaring this member
    ///
    /// # Errors
    /// Returns [`crate::Error::Released`] if the type has been dropped.
    fn declaring_type(&self) -> Result<TypeRc>;

    /// The module defining this member
    ///
    /// # Errors
    /// Returns [`crate::Error::Released`] if the module has been dropped.
    fn module(&self) -> Result<ModuleRc>;

    /// The custom attributes applied to this member
    ///
    /// # Errors
    /// Returns an error if the `CustomAttribute` table cannot be read.
    fn custom_attributes(&self) -> Result<Vec<CustomAttributeRc>>;
}

/// A member of any kind
#[derive(Clone)]
pub enum Member {
    /// A method or constructor
    Method(MethodRc),
    /// A field
    Field(FieldRc),
    /// A property
    Property(PropertyRc),
    /// An event
    Event(EventRc),
    /// A nested type
    Type(TypeRc),
}

impl Member {
    /// The member name
    #[must_use]
    pub fn name(&self) -> String {
        match self {
            Member::Method(method) => method.name().to_string(),
            Member::Field(field) => field.name().to_string(),
            Member::Property(property) => property.name().to_string(),
            Member::Event(event) => event.name().to_string(),
            Member::Type(ty) => ty.name(),
        }
    }

    /// The metadata token
    #[must_use]
    pub fn token(&self) -> Token {
        match self {
            Member::Method(method) => method.token(),
            Member::Field(field) => field.token(),
            Member::Property(property) => property.token(),
            Member::Event(event) => event.token(),
            Member::Type(ty) => ty.token(),
        }
    }

    /// The kind of member
    #[must_use]
    pub fn member_type(&self) -> MemberType {
        match self {
            Member::Method(method) => MemberInfo::member_type(method.as_ref()),
            Member::Field(_) => MemberType::Field,
            Member::Property(_) => MemberType::Property,
            Member::Event(_) => MemberType::Event,
            Member::Type(_) => MemberType::NestedType,
        }
    }

    /// The method, if this is one
    #[must_use]
    pub fn as_method(&self) -> Option<&MethodRc> {
        match self {
            Member::Method(method) => Some(method),
            _ => None,
        }
    }

    /// The field, if this is one
    #[must_use]
    pub fn as_field(&self) -> Option<&FieldRc> {
        match self {
            Member::Field(field) => Some(field),
            _ => None,
        }
    }

    /// The property, if this is one
    #[must_use]
    pub fn as_property(&self) -> Option<&PropertyRc> {
        match self {
            Member::Property(property) => Some(property),
            _ => None,
        }
    }

    /// The event, if this is one
    #[must_use]
    pub fn as_event(&self) -> Option<&EventRc> {
        match self {
            Member::Event(event) => Some(event),
            _ => None,
        }
    }

    /// The nested type, if this is one
    #[must_use]
    pub fn as_type(&self) -> Option<&TypeRc> {
        match self {
            Member::Type(ty) => Some(ty),
            _ => None,
        }
    }
}

impl fmt::Debug for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({} {})", self.member_type(), self.name(), self.token())
    }
}

/// Finds the accessor of `association` with the given `MethodSemantics` flag
///
/// The accessor is looked up by token on the declaring type and filtered with
/// `INSTANCE | STATIC | PUBLIC`, plus `NON_PUBLIC` when `non_public` is set.
pub(crate) fn accessor(
    declaring: &TypeRc,
    association: Token,
    semantics: u16,
    non_public: bool,
) -> Result<Option<MethodRc>> {
    let module = declaring.module()?;
    let Some(row) = module
        .semantics(association)?
        .into_iter()
        .find(|row| row.semantics & semantics != 0)
    else {
        return Ok(None);
    };

    let token = TokenKind::MethodDef.token(row.method);
    let Some(method) = declaring.method_by_token(token)? else {
        log::warn!(
            "Accessor {} of {} is not declared by {}",
            token,
            association,
            declaring.full_name()
        );
        return Ok(None);
    };

    let mut mask = VisibilityMask::INSTANCE | VisibilityMask::STATIC | VisibilityMask::PUBLIC;
    if non_public {
        mask |= VisibilityMask::NON_PUBLIC;
    }

    if mask.accepts(method.is_static(), method.is_public()) {
        Ok(Some(method))
    } else {
        Ok(None)
    }
}

/// True if `association` has any accessor with the given `MethodSemantics` flag
pub(crate) fn has_accessor(declaring: &TypeRc, association: Token, semantics: u16) -> Result<bool> {
    Ok(declaring
        .module()?
        .semantics(association)?
        .iter()
        .any(|row| row.semantics & semantics != 0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{test::Fixture, typesystem::ConstantValue, Error};

    #[test]
    fn methods_by_mask() {
        let fixture = Fixture::new();
        let widget = fixture.widget();

        let public_instance = widget
            .methods(VisibilityMask::PUBLIC | VisibilityMask::INSTANCE)
            .unwrap();
        let names: Vec<&str> = public_instance.iter().map(|method| method.name()).collect();
        assert_eq!(
            names,
            vec![
                "Dispose",
                "get_Size",
                "add_Changed",
                "remove_Changed",
                "Resize",
                "Resize",
                "Describe"
            ]
        );

        let statics = widget
            .methods(VisibilityMask::PUBLIC | VisibilityMask::STATIC)
            .unwrap();
        assert_eq!(statics.len(), 1);
        assert_eq!(statics[0].name(), "Swap");

        assert_eq!(widget.constructors(VisibilityMask::ALL).unwrap().len(), 3);
        assert!(widget
            .method("set_Size", VisibilityMask::PUBLIC_MEMBERS)
            .unwrap()
            .is_none());
        assert!(widget
            .method("SET_SIZE", VisibilityMask::ALL | VisibilityMask::IGNORE_CASE)
            .unwrap()
            .is_some());
    }

    #[test]
    fn overloads_by_parameter_types() {
        let fixture = Fixture::new();
        let widget = fixture.widget();
        let int32 = fixture.core_type("System.Int32");
        let double = fixture.core_type("System.Double");

        let by_size = widget
            .method_with_parameters(
                "Resize",
                VisibilityMask::PUBLIC_MEMBERS,
                &[int32.clone(), int32.clone()],
            )
            .unwrap()
            .unwrap();
        assert_eq!(by_size.token(), fixture.tokens.widget_resize);

        let by_factor = widget
            .method_with_parameters("Resize", VisibilityMask::PUBLIC_MEMBERS, &[double])
            .unwrap()
            .unwrap();
        assert_ne!(by_factor.token(), fixture.tokens.widget_resize);

        let counted = widget
            .constructor(VisibilityMask::PUBLIC_MEMBERS, &[int32])
            .unwrap()
            .unwrap();
        assert!(counted.is_constructor());
        assert_eq!(counted.parameters().unwrap()[0].name(), "count");
    }

    #[test]
    fn method_tokens() {
        let fixture = Fixture::new();
        let widget = fixture.widget();

        let resize = widget
            .method_by_token(fixture.tokens.widget_resize)
            .unwrap()
            .unwrap();
        assert_eq!(resize.name(), "Resize");
        assert!(widget
            .method_by_token(fixture.tokens.widget_ctor)
            .unwrap()
            .is_none());

        let ctor = widget
            .constructor_by_token(fixture.tokens.widget_ctor)
            .unwrap()
            .unwrap();
        assert_eq!(ctor.member_type(), MemberType::Constructor);
        assert_eq!(resize.member_type(), MemberType::Method);
    }

    #[test]
    fn parameters_and_defaults() {
        let fixture = Fixture::new();
        let widget = fixture.widget();

        let resize = widget
            .method_by_token(fixture.tokens.widget_resize)
            .unwrap()
            .unwrap();
        let parameters = resize.parameters().unwrap();
        assert_eq!(parameters.len(), 2);
        assert_eq!(parameters[0].name(), "width");
        assert_eq!(parameters[1].name(), "height");
        assert_eq!(parameters[1].position(), 1);
        assert_eq!(parameters[1].parameter_type().full_name(), "System.Int32");
        assert!(parameters[0].default_value().unwrap().is_none());

        let describe = widget
            .method_by_token(fixture.tokens.widget_describe)
            .unwrap()
            .unwrap();
        let prefix = &describe.parameters().unwrap()[0];
        assert!(prefix.is_optional());
        assert!(prefix.has_default_value());
        assert_eq!(
            prefix.default_value().unwrap(),
            Some(ConstantValue::String("w".to_string()))
        );
        assert_eq!(prefix.custom_attributes().unwrap().len(), 1);
        assert!(Arc::ptr_eq(&prefix.member().unwrap(), &describe));

        let returned = describe.return_parameter().unwrap();
        assert_eq!(returned.position(), -1);
        assert_eq!(returned.parameter_type().full_name(), "System.String");
    }

    #[test]
    fn property_accessors() {
        let fixture = Fixture::new();
        let widget = fixture.widget();
        let size = widget
            .property("Size", VisibilityMask::PUBLIC_MEMBERS)
            .unwrap()
            .unwrap();

        assert_eq!(size.token(), fixture.tokens.widget_size);
        assert_eq!(size.property_type().unwrap().full_name(), "System.Int32");
        assert_eq!(size.getter(false).unwrap().unwrap().name(), "get_Size");
        assert!(size.setter(false).unwrap().is_none());
        assert_eq!(size.setter(true).unwrap().unwrap().name(), "set_Size");
        assert!(size.can_read().unwrap());
        assert!(size.can_write().unwrap());
        assert!(size.index_parameters().unwrap().is_empty());
    }

    #[test]
    fn indexed_property() {
        let fixture = Fixture::new();
        let list = fixture.corlib.type_by_token(fixture.core.list).unwrap();
        let item = list
            .property("Item", VisibilityMask::PUBLIC_MEMBERS)
            .unwrap()
            .unwrap();

        assert!(item.property_type().unwrap().is_generic_parameter());
        let index = item.index_parameters().unwrap();
        assert_eq!(index.len(), 1);
        assert_eq!(index[0].name(), "index");
        assert!(!item.can_write().unwrap());
    }

    #[test]
    fn event_accessors() {
        let fixture = Fixture::new();
        let changed = fixture
            .widget()
            .event("Changed", VisibilityMask::PUBLIC_MEMBERS)
            .unwrap()
            .unwrap();

        assert_eq!(changed.token(), fixture.tokens.widget_changed);
        assert_eq!(changed.event_type().unwrap().full_name(), "System.EventHandler");
        assert_eq!(
            changed.handler_type().unwrap().unwrap().full_name(),
            "System.EventHandler"
        );
        assert_eq!(changed.add_method(false).unwrap().unwrap().name(), "add_Changed");
        assert_eq!(
            changed.remove_method(false).unwrap().unwrap().name(),
            "remove_Changed"
        );
        assert!(changed.raise_method(true).unwrap().is_none());
    }

    #[test]
    fn fields_and_constants() {
        let fixture = Fixture::new();
        let widget = fixture.widget();

        let count = widget.field_by_token(fixture.tokens.widget_count).unwrap();
        assert_eq!(count.name(), "_count");
        assert!(!count.is_public());
        assert!(widget
            .field("_count", VisibilityMask::PUBLIC_MEMBERS)
            .unwrap()
            .is_none());

        let default = widget
            .field("Default", VisibilityMask::PUBLIC | VisibilityMask::STATIC)
            .unwrap()
            .unwrap();
        assert!(default.is_static());
        assert!(Arc::ptr_eq(&default.field_type().unwrap(), &widget));

        let color = fixture.library.type_by_token(fixture.tokens.color).unwrap();
        let blue = color
            .field("Blue", VisibilityMask::PUBLIC | VisibilityMask::STATIC)
            .unwrap()
            .unwrap();
        assert!(blue.is_literal());
        assert_eq!(blue.constant_value().unwrap(), Some(ConstantValue::I4(2)));
    }

    #[test]
    fn generic_methods() {
        let fixture = Fixture::new();
        let widget = fixture.widget();
        let int32 = fixture.core_type("System.Int32");

        let swap = widget
            .method_by_token(fixture.tokens.widget_swap)
            .unwrap()
            .unwrap();
        assert!(swap.is_generic_method_definition().unwrap());

        let definition_parameters = swap.parameter_types().unwrap();
        assert!(definition_parameters[0].is_by_ref());
        assert!(definition_parameters[0]
            .element_type()
            .unwrap()
            .declaring_method()
            .is_some());

        let constructed = swap.make_generic_method(&[int32.clone()]).unwrap();
        assert!(constructed.is_constructed_generic_method());
        assert!(!constructed.is_generic_method_definition().unwrap());
        assert_eq!(constructed.generic_arguments().unwrap(), vec![int32.clone()]);
        assert_eq!(
            constructed.parameter_types().unwrap()[0].full_name(),
            "System.Int32&"
        );
        assert!(Arc::ptr_eq(
            &constructed.generic_method_definition().unwrap().unwrap(),
            &swap
        ));

        assert!(matches!(
            constructed.make_generic_method(&[int32]),
            Err(Error::NotGenericDefinition(_))
        ));
    }

    #[test]
    fn members_of_a_type() {
        let fixture = Fixture::new();
        let widget = fixture.widget();

        let members = widget.members(VisibilityMask::PUBLIC_MEMBERS).unwrap();
        assert_eq!(members[0].member_type(), MemberType::Event);
        assert!(members
            .iter()
            .any(|member| member.as_property().is_some_and(|p| p.name() == "Size")));

        let part = widget
            .member_by_token(fixture.tokens.widget_part)
            .unwrap();
        assert_eq!(part.member_type(), MemberType::NestedType);
        assert_eq!(part.name(), "Part");

        let nested = widget.nested_types(VisibilityMask::PUBLIC).unwrap();
        assert_eq!(nested.len(), 1);
        assert_eq!(nested[0].full_name(), "Library.Widget+Part");
        assert_eq!(widget.nested_types(VisibilityMask::ALL).unwrap().len(), 2);
    }

    #[test]
    fn execution_is_unsupported() {
        let fixture = Fixture::new();
        let widget = fixture.widget();
        let resize = widget
            .method_by_token(fixture.tokens.widget_resize)
            .unwrap()
            .unwrap();
        let size = widget
            .property("Size", VisibilityMask::PUBLIC_MEMBERS)
            .unwrap()
            .unwrap();
        let count = widget.field_by_token(fixture.tokens.widget_count).unwrap();

        assert!(matches!(
            resize.invoke(None, &[ConstantValue::I4(1), ConstantValue::I4(2)]),
            Err(Error::UnsupportedOperation(_))
        ));
        assert!(matches!(
            size.get_value(None, &[]),
            Err(Error::UnsupportedOperation(_))
        ));
        assert!(matches!(
            count.set_value(None, ConstantValue::I4(3)),
            Err(Error::UnsupportedOperation(_))
        ));
    }
}
