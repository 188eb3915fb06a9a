//! Custom attributes applied to assemblies, types, members and parameters.
//!
//! A [`CustomAttributeData`] wraps one `CustomAttribute` row. Its constructor and the decoded
//! arguments are resolved on first access: the value blob (ECMA-335 II.23.3) is read against the
//! resolved parameter types of the constructor, so enum arguments use the underlying type of the
//! enum and `System.Type` arguments come back as type descriptors.
//!
//! # Examples
//!
//! ```rust,no_run
//! use dotreflect::{Registry, RegistryConfig};
//!
//! let registry = Registry::new(RegistryConfig::default());
//! let module = registry.open("Library.dll")?;
//!
//! for attribute in module.custom_attributes()? {
//!     println!("{}", attribute.attribute_type()?.full_name());
//!     for argument in attribute.constructor_arguments()? {
//!         println!("  {argument}");
//!     }
//! }
//! # Ok::<(), dotreflect::Error>(())
//! ```

mod decoder;

use std::{
    fmt,
    sync::{Arc, OnceLock, Weak},
};

use decoder::AttributeDecoder;

use crate::{
    members::{Member, MethodRc},
    metadata::{
        tables::{CustomAttributeRow, MemberRefRow},
        token::{Token, TokenKind},
    },
    module::{Module, ModuleRc},
    resolver::GenericContext,
    typesystem::{ConstantValue, TypeRc},
    Error, Result,
};

/// Reference to a [`CustomAttributeData`]
pub type CustomAttributeRc = Arc<CustomAttributeData>;

/// The value of a decoded attribute argument
#[derive(Clone, Debug)]
pub enum AttributeValue {
    /// A primitive, string or enum value; enums hold their underlying value
    Constant(ConstantValue),
    /// A `System.Type` argument; `None` for a null type
    Type(Option<TypeRc>),
    /// A single-dimensional array; `None` for a null array
    Array(Option<Vec<CustomAttributeTypedArgument>>),
}

/// A decoded argument together with its type
#[derive(Clone, Debug)]
pub struct CustomAttributeTypedArgument {
    /// The declared type, or the actual type of a boxed `object` argument
    pub argument_type: TypeRc,
    /// The value
    pub value: AttributeValue,
}

/// A field or property assignment of an attribute
#[derive(Clone, Debug)]
pub struct CustomAttributeNamedArgument {
    /// True for fields, false for properties
    pub is_field: bool,
    /// The field or property name
    pub name: String,
    /// The assigned field or property, found on the attribute type or one of its base types
    pub member: Member,
    /// The assigned value
    pub value: CustomAttributeTypedArgument,
}

struct DecodedArguments {
    fixed: Vec<CustomAttributeTypedArgument>,
    named: Vec<CustomAttributeNamedArgument>,
}

/// One `CustomAttribute` row
pub struct CustomAttributeData {
    module: Weak<Module>,
    token: Token,
    row: CustomAttributeRow,
    constructor: OnceLock<MethodRc>,
    arguments: OnceLock<DecodedArguments>,
}

impl CustomAttributeData {
    pub(crate) fn new(module: &Module, row: CustomAttributeRow) -> CustomAttributeRc {
        Arc::new(CustomAttributeData {
            module: module.weak(),
            token: TokenKind::CustomAttribute.token(row.rid),
            row,
            constructor: OnceLock::new(),
            arguments: OnceLock::new(),
        })
    }

    /// The `CustomAttribute` token
    #[must_use]
    pub fn token(&self) -> Token {
        self.token
    }

    /// The token of the entity the attribute is applied to
    #[must_use]
    pub fn parent(&self) -> Token {
        self.row.parent
    }

    fn module(&self) -> Result<ModuleRc> {
        self.module.upgrade().ok_or(Error::Released)
    }

    /// The attribute constructor
    ///
    /// # Errors
    /// Returns an error if the `MethodDef` or `MemberRef` cannot be resolved.
    pub fn constructor(&self) -> Result<MethodRc> {
        Ok(cached!(self.constructor, || {
            let module = self.module()?;
            let token = self.row.constructor;

            let constructor = match token.kind() {
                Some(TokenKind::MethodDef) => module.resolve_method(token, &[], &[])?,
                Some(TokenKind::MemberRef) => {
                    let row = module
                        .view()
                        .tables()
                        .table::<MemberRefRow>()
                        .get(token.row())?;
                    module.resolve_member_ref_method(&row, &GenericContext::default(), 0)?
                }
                _ => {
                    return Err(Error::InvalidToken {
                        token,
                        expected: "MethodDef or MemberRef",
                    })
                }
            };

            if !constructor.is_constructor() {
                return Err(malformed_error!(
                    "Custom attribute {} does not reference a constructor",
                    self.token
                ));
            }

            log::trace!("Resolved constructor of custom attribute {}", self.token);
            Ok(constructor)
        })
        .clone())
    }

    /// The type declaring the constructor
    ///
    /// # Errors
    /// Returns an error if the constructor cannot be resolved.
    pub fn attribute_type(&self) -> Result<TypeRc> {
        self.constructor()?.declaring_type()
    }

    fn arguments(&self) -> Result<&DecodedArguments> {
        Ok(cached!(self.arguments, || {
            let module = self.module()?;
            let constructor = self.constructor()?;
            let blob = module.view().blob(self.row.value)?;

            let (fixed, named) = AttributeDecoder::new(&module, blob)
                .decode(constructor.parameter_types()?, &constructor.declaring_type()?)?;
            Ok(DecodedArguments { fixed, named })
        }))
    }

    /// The positional arguments, one per constructor parameter
    ///
    /// # Errors
    /// Returns an error if the constructor cannot be resolved or the blob is malformed.
    pub fn constructor_arguments(&self) -> Result<Vec<CustomAttributeTypedArgument>> {
        Ok(self.arguments()?.fixed.clone())
    }

    /// The field and property assignments
    ///
    /// # Errors
    /// Returns an error if the constructor cannot be resolved, the blob is malformed, or a named
    /// field or property does not exist on the attribute type ([`Error::UnresolvedType`]).
    pub fn named_arguments(&self) -> Result<Vec<CustomAttributeNamedArgument>> {
        Ok(self.arguments()?.named.clone())
    }
}

impl fmt::Debug for CustomAttributeData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomAttributeData")
            .field("token", &self.token)
            .field("parent", &self.row.parent)
            .field("constructor", &self.row.constructor)
            .finish()
    }
}

impl fmt::Display for CustomAttributeTypedArgument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            AttributeValue::Constant(value) => write!(f, "{value}"),
            AttributeValue::Type(Some(ty)) => write!(f, "typeof({})", ty.full_name()),
            AttributeValue::Type(None) | AttributeValue::Array(None) => write!(f, "null"),
            AttributeValue::Array(Some(elements)) => {
                write!(f, "new {}{{", self.argument_type.name())?;
                for (index, element) in elements.iter().enumerate() {
                    if index > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{element}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

impl fmt::Display for CustomAttributeNamedArgument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.name, self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::Fixture;

    fn constant(argument: &CustomAttributeTypedArgument) -> &ConstantValue {
        match &argument.value {
            AttributeValue::Constant(value) => value,
            other => panic!("expected a constant, got {other:?}"),
        }
    }

    #[test]
    fn string_constructor_argument() {
        let fixture = Fixture::new();
        let attributes = fixture.widget().custom_attributes().unwrap();
        assert_eq!(attributes.len(), 1);

        let obsolete = &attributes[0];
        assert_eq!(obsolete.parent(), fixture.tokens.widget);
        assert_eq!(
            obsolete.attribute_type().unwrap().full_name(),
            "System.ObsoleteAttribute"
        );
        assert!(obsolete.constructor().unwrap().is_constructor());

        let arguments = obsolete.constructor_arguments().unwrap();
        assert_eq!(arguments.len(), 1);
        assert_eq!(
            constant(&arguments[0]),
            &ConstantValue::String("Use Gadget".to_string())
        );
        assert_eq!(arguments[0].argument_type.full_name(), "System.String");
        assert!(obsolete.named_arguments().unwrap().is_empty());
    }

    #[test]
    fn type_enum_and_array_arguments() {
        let fixture = Fixture::new();
        let boxed = fixture.library.type_by_token(fixture.tokens.boxed).unwrap();
        let attributes = boxed.custom_attributes().unwrap();
        assert_eq!(attributes.len(), 1);

        let marker = &attributes[0];
        assert_eq!(
            marker.constructor().unwrap().token(),
            fixture.tokens.marker_ctor
        );

        let arguments = marker.constructor_arguments().unwrap();
        assert_eq!(arguments.len(), 3);

        match &arguments[0].value {
            AttributeValue::Type(Some(ty)) => assert_eq!(ty.full_name(), "System.Int32"),
            other => panic!("expected a type, got {other:?}"),
        }

        assert_eq!(arguments[1].argument_type.full_name(), "Library.Color");
        assert_eq!(constant(&arguments[1]), &ConstantValue::I4(2));

        match &arguments[2].value {
            AttributeValue::Array(Some(elements)) => {
                let values: Vec<&ConstantValue> = elements.iter().map(constant).collect();
                assert_eq!(values, vec![&ConstantValue::I4(1), &ConstantValue::I4(2)]);
            }
            other => panic!("expected an array, got {other:?}"),
        }
        assert_eq!(arguments[2].to_string(), "new Int32[]{1, 2}");
    }

    #[test]
    fn named_arguments() {
        let fixture = Fixture::new();
        let boxed = fixture.library.type_by_token(fixture.tokens.boxed).unwrap();
        let named = boxed.custom_attributes().unwrap()[0]
            .named_arguments()
            .unwrap();
        assert_eq!(named.len(), 3);

        assert!(named[0].is_field);
        assert_eq!(named[0].name, "Note");
        let note = named[0].member.as_field().unwrap();
        assert_eq!(note.declaring_type().unwrap().full_name(), "Library.MarkerAttribute");
        assert_eq!(note.field_type().unwrap().full_name(), "System.String");
        assert_eq!(
            constant(&named[0].value),
            &ConstantValue::String("hi".to_string())
        );

        assert!(!named[1].is_field);
        assert_eq!(named[1].name, "Level");
        let level = named[1].member.as_property().unwrap();
        assert_eq!(level.name(), "Level");
        assert!(level.can_write().unwrap());
        assert_eq!(constant(&named[1].value), &ConstantValue::I4(7));

        assert_eq!(named[2].name, "Tint");
        let tint = named[2].member.as_field().unwrap();
        assert_eq!(tint.field_type().unwrap().full_name(), "Library.Color");
        assert_eq!(named[2].value.argument_type.full_name(), "Library.Color");
        assert_eq!(constant(&named[2].value), &ConstantValue::I4(1));
    }

    #[test]
    fn assembly_attributes() {
        let fixture = Fixture::new();
        let attributes = fixture.library.custom_attributes().unwrap();
        assert_eq!(attributes.len(), 1);
        assert_eq!(attributes[0].parent(), TokenKind::Assembly.token(1));
        assert!(attributes[0].constructor_arguments().unwrap().is_empty());

        let again = fixture.library.custom_attributes().unwrap();
        assert!(Arc::ptr_eq(&attributes[0], &again[0]));
    }
}
