use crate::{
    customattributes::{AttributeValue, CustomAttributeNamedArgument, CustomAttributeTypedArgument},
    file::parser::Parser,
    members::Member,
    metadata::{
        identity::AssemblyIdentity,
        signatures::{ELEMENT_TYPE, SERIALIZATION_TYPE},
    },
    module::Module,
    registry::split_assembly_qualified,
    typesystem::{ConstantValue, PrimitiveKind, TypeRc, VisibilityMask},
    Error, Result,
};

const PROLOG: u16 = 0x0001;
const NULL_ARRAY: u32 = 0xFFFF_FFFF;

/// Decodes a `CustomAttribute` value blob (ECMA-335 II.23.3) against resolved parameter types
pub(crate) struct AttributeDecoder<'a> {
    parser: Parser<'a>,
    module: &'a Module,
    depth: usize,
}

impl<'a> AttributeDecoder<'a> {
    pub(crate) fn new(module: &'a Module, blob: &'a [u8]) -> Self {
        AttributeDecoder {
            parser: Parser::new(blob),
            module,
            depth: 0,
        }
    }

    /// Reads the prolog, one fixed argument per parameter type, then the named arguments
    ///
    /// Named arguments are bound to the fields and properties of `attribute_type`.
    pub(crate) fn decode(
        mut self,
        parameter_types: &[TypeRc],
        attribute_type: &TypeRc,
    ) -> Result<(
        Vec<CustomAttributeTypedArgument>,
        Vec<CustomAttributeNamedArgument>,
    )> {
        if self.parser.is_empty() {
            if parameter_types.is_empty() {
                return Ok((Vec::new(), Vec::new()));
            }
            return Err(malformed_error!(
                "Empty custom attribute blob for {} constructor arguments",
                parameter_types.len()
            ));
        }

        let prolog = self.parser.read_le::<u16>()?;
        if prolog != PROLOG {
            return Err(malformed_error!(
                "Invalid custom attribute prolog 0x{:04X}",
                prolog
            ));
        }

        let mut fixed = Vec::with_capacity(parameter_types.len());
        for parameter_type in parameter_types {
            fixed.push(self.read_fixed(parameter_type)?);
        }

        let mut named = Vec::new();
        if self.parser.remaining() >= 2 {
            let count = self.parser.read_le::<u16>()?;
            for _ in 0..count {
                named.push(self.read_named(attribute_type)?);
            }
        }

        Ok((fixed, named))
    }

    fn read_named(&mut self, attribute_type: &TypeRc) -> Result<CustomAttributeNamedArgument> {
        let is_field = match self.parser.read_le::<u8>()? {
            SERIALIZATION_TYPE::FIELD => true,
            SERIALIZATION_TYPE::PROPERTY => false,
            other => {
                return Err(malformed_error!(
                    "Invalid named argument kind 0x{:02X}",
                    other
                ))
            }
        };

        let declared = self.read_field_or_prop_type()?;
        let name = self
            .parser
            .read_ser_string()?
            .ok_or_else(|| malformed_error!("Named argument without a name"))?;
        let value = self.read_fixed(&declared)?;
        let member = self.named_member(attribute_type, is_field, &name)?;

        Ok(CustomAttributeNamedArgument {
            is_field,
            name,
            member,
            value,
        })
    }

    /// The field or property `name` of `attribute_type` or the nearest base type declaring it
    fn named_member(&self, attribute_type: &TypeRc, is_field: bool, name: &str) -> Result<Member> {
        let limit = self.module.max_depth();
        let mut current = Some(attribute_type.clone());
        let mut depth = 0;

        while let Some(ty) = current {
            let found = if is_field {
                ty.field(name, VisibilityMask::ALL)?.map(Member::Field)
            } else {
                ty.property(name, VisibilityMask::ALL)?.map(Member::Property)
            };
            if let Some(member) = found {
                return Ok(member);
            }

            depth += 1;
            if depth > limit {
                return Err(Error::RecursionLimit(limit));
            }
            current = ty.base_type()?;
        }

        Err(Error::UnresolvedType(format!(
            "{}::{}",
            attribute_type.full_name(),
            name
        )))
    }

    /// Reads a `FieldOrPropType` and resolves it to a type descriptor
    fn read_field_or_prop_type(&mut self) -> Result<TypeRc> {
        let tag = self.parser.read_le::<u8>()?;
        match tag {
            ELEMENT_TYPE::BOOLEAN..=ELEMENT_TYPE::STRING => {
                let kind = PrimitiveKind::from_element_type(tag)
                    .ok_or_else(|| malformed_error!("Invalid element type 0x{:02X}", tag))?;
                self.core_type(kind.full_name())
            }
            ELEMENT_TYPE::SZARRAY => {
                self.enter()?;
                let element = self.read_field_or_prop_type()?;
                self.depth -= 1;
                Ok(element.make_array(1))
            }
            SERIALIZATION_TYPE::TYPE => self.core_type("System.Type"),
            SERIALIZATION_TYPE::TAGGED_OBJECT => self.core_type("System.Object"),
            SERIALIZATION_TYPE::ENUM => {
                let name = self
                    .parser
                    .read_ser_string()?
                    .ok_or_else(|| malformed_error!("Enum argument without a type name"))?;
                self.resolve_type_name(&name)
            }
            other => Err(malformed_error!(
                "Unsupported custom attribute element type 0x{:02X}",
                other
            )),
        }
    }

    fn read_fixed(&mut self, declared: &TypeRc) -> Result<CustomAttributeTypedArgument> {
        self.enter()?;
        let argument = self.read_fixed_inner(declared);
        self.depth -= 1;
        argument
    }

    fn read_fixed_inner(&mut self, declared: &TypeRc) -> Result<CustomAttributeTypedArgument> {
        if declared.rank() == Some(1) {
            let element = declared
                .element_type()
                .ok_or_else(|| malformed_error!("Array without element type"))?;
            return self.read_array(declared, &element);
        }

        if let Some(kind) = declared.primitive_kind() {
            if kind == PrimitiveKind::Object {
                // A boxed value carries its own type.
                let actual = self.read_field_or_prop_type()?;
                return self.read_fixed(&actual);
            }

            return Ok(CustomAttributeTypedArgument {
                argument_type: declared.clone(),
                value: AttributeValue::Constant(self.read_primitive(kind)?),
            });
        }

        if declared.full_name() == "System.Type" {
            let value = match self.parser.read_ser_string()? {
                Some(name) => Some(self.resolve_type_name(&name)?),
                None => None,
            };
            return Ok(CustomAttributeTypedArgument {
                argument_type: declared.clone(),
                value: AttributeValue::Type(value),
            });
        }

        if declared.is_enum()? {
            let underlying = declared.enum_underlying_type()?;
            let kind = underlying
                .primitive_kind()
                .ok_or_else(|| Error::NotPrimitive(underlying.full_name()))?;
            return Ok(CustomAttributeTypedArgument {
                argument_type: declared.clone(),
                value: AttributeValue::Constant(self.read_primitive(kind)?),
            });
        }

        Err(malformed_error!(
            "Type {} cannot be a custom attribute argument",
            declared.full_name()
        ))
    }

    fn read_array(
        &mut self,
        declared: &TypeRc,
        element: &TypeRc,
    ) -> Result<CustomAttributeTypedArgument> {
        let length = self.parser.read_le::<u32>()?;
        if length == NULL_ARRAY {
            return Ok(CustomAttributeTypedArgument {
                argument_type: declared.clone(),
                value: AttributeValue::Array(None),
            });
        }

        if length as usize > self.parser.remaining() {
            return Err(malformed_error!(
                "Array length {} exceeds the remaining {} bytes",
                length,
                self.parser.remaining()
            ));
        }

        let mut elements = Vec::with_capacity(length as usize);
        for _ in 0..length {
            elements.push(self.read_fixed(element)?);
        }

        Ok(CustomAttributeTypedArgument {
            argument_type: declared.clone(),
            value: AttributeValue::Array(Some(elements)),
        })
    }

    fn read_primitive(&mut self, kind: PrimitiveKind) -> Result<ConstantValue> {
        let parser = &mut self.parser;
        Ok(match kind {
            PrimitiveKind::Boolean => ConstantValue::Boolean(parser.read_le::<u8>()? != 0),
            PrimitiveKind::Char => ConstantValue::Char(parser.read_le::<u16>()?),
            PrimitiveKind::I1 => ConstantValue::I1(parser.read_le::<i8>()?),
            PrimitiveKind::U1 => ConstantValue::U1(parser.read_le::<u8>()?),
            PrimitiveKind::I2 => ConstantValue::I2(parser.read_le::<i16>()?),
            PrimitiveKind::U2 => ConstantValue::U2(parser.read_le::<u16>()?),
            PrimitiveKind::I4 => ConstantValue::I4(parser.read_le::<i32>()?),
            PrimitiveKind::U4 => ConstantValue::U4(parser.read_le::<u32>()?),
            PrimitiveKind::I8 => ConstantValue::I8(parser.read_le::<i64>()?),
            PrimitiveKind::U8 => ConstantValue::U8(parser.read_le::<u64>()?),
            PrimitiveKind::R4 => ConstantValue::R4(parser.read_le::<f32>()?),
            PrimitiveKind::R8 => ConstantValue::R8(parser.read_le::<f64>()?),
            PrimitiveKind::String => match parser.read_ser_string()? {
                Some(value) => ConstantValue::String(value),
                None => ConstantValue::Null,
            },
            other => {
                return Err(malformed_error!(
                    "{} cannot be a custom attribute argument",
                    other.full_name()
                ))
            }
        })
    }

    fn enter(&mut self) -> Result<()> {
        let limit = self.module.max_depth();
        if self.depth >= limit {
            return Err(Error::RecursionLimit(limit));
        }
        self.depth += 1;
        Ok(())
    }

    fn core_type(&self, full_name: &str) -> Result<TypeRc> {
        self.module.registry()?.core_type(full_name)
    }

    /// Resolves a serialized type name, e.g. `Lib.Widget+Part[], Lib, Version=1.0.0.0`
    ///
    /// Names without an assembly are looked up in the current module, then the core library.
    fn resolve_type_name(&mut self, name: &str) -> Result<TypeRc> {
        self.enter()?;
        let resolved = self.resolve_type_name_inner(name);
        self.depth -= 1;
        resolved
    }

    fn resolve_type_name_inner(&mut self, name: &str) -> Result<TypeRc> {
        let (type_name, assembly) = split_assembly_qualified(name);

        if let Some(element) = type_name.strip_suffix("[]") {
            let element = match assembly {
                Some(assembly) => format!("{element}, {assembly}"),
                None => element.to_string(),
            };
            return Ok(self.resolve_type_name(&element)?.make_array(1));
        }

        let (definition_name, arguments) = match type_name.find("[[") {
            Some(start) if type_name.ends_with("]]") => (
                &type_name[..start],
                split_generic_arguments(&type_name[start + 1..type_name.len() - 1]),
            ),
            _ => (type_name, Vec::new()),
        };

        let definition = match assembly {
            Some(assembly) => {
                let identity = AssemblyIdentity::parse(assembly)?;
                self.module
                    .registry()?
                    .resolve_module(&identity)?
                    .type_by_name(definition_name, false)?
            }
            None => match self.module.type_by_name(definition_name, false)? {
                Some(found) => Some(found),
                None => self
                    .module
                    .registry()?
                    .core_library()?
                    .type_by_name(definition_name, false)?,
            },
        }
        .ok_or_else(|| Error::UnresolvedType(definition_name.to_string()))?;

        if arguments.is_empty() {
            return Ok(definition);
        }

        let arguments = arguments
            .into_iter()
            .map(|argument| self.resolve_type_name(argument))
            .collect::<Result<Vec<_>>>()?;
        definition.construct(&arguments)
    }
}

/// Splits `[A, Asm],[B]` into `A, Asm` and `B`
fn split_generic_arguments(list: &str) -> Vec<&str> {
    let mut arguments = Vec::new();
    let mut depth = 0_usize;
    let mut start = 0;

    for (index, c) in list.char_indices() {
        match c {
            '[' => {
                if depth == 0 {
                    start = index + 1;
                }
                depth += 1;
            }
            ']' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    arguments.push(list[start..index].trim());
                }
            }
            _ => {}
        }
    }

    arguments
}
