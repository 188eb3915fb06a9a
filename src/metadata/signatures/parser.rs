use crate::{
    file::parser::Parser,
    metadata::signatures::{
        CustomModifier, SignatureArray, SignatureField, SignatureLocalVariable,
        SignatureLocalVariables, SignatureMethod, SignatureMethodSpec, SignatureParameter,
        SignatureProperty, SignatureTypeSpec, TypeSignature, CALLING_CONVENTION, ELEMENT_TYPE,
        SIGNATURE_HEADER,
    },
    Error::RecursionLimit,
    Result,
};

/// Maximum nesting of types inside one signature
pub const MAX_SIGNATURE_DEPTH: usize = 50;

/// Parser for the signature blobs of ECMA-335 II.23.2
pub struct SignatureParser<'a> {
    parser: Parser<'a>,
    depth: usize,
}

impl<'a> SignatureParser<'a> {
    /// Creates a parser over a signature blob
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        SignatureParser {
            parser: Parser::new(data),
            depth: 0,
        }
    }

    /// Parses a single type
    ///
    /// # Errors
    /// Returns [`crate::Error::RecursionLimit`] if types nest deeper than
    /// [`MAX_SIGNATURE_DEPTH`] and [`crate::Error::Malformed`] for unknown element types.
    pub fn parse_type(&mut self) -> Result<TypeSignature> {
        self.depth += 1;
        if self.depth > MAX_SIGNATURE_DEPTH {
            return Err(RecursionLimit(MAX_SIGNATURE_DEPTH));
        }

        let result = self.parse_type_inner();
        self.depth -= 1;
        result
    }

    fn parse_type_inner(&mut self) -> Result<TypeSignature> {
        let current_byte = self.parser.read_le::<u8>()?;
        match current_byte {
            ELEMENT_TYPE::VOID => Ok(TypeSignature::Void),
            ELEMENT_TYPE::BOOLEAN => Ok(TypeSignature::Boolean),
            ELEMENT_TYPE::CHAR => Ok(TypeSignature::Char),
            ELEMENT_TYPE::I1 => Ok(TypeSignature::I1),
            ELEMENT_TYPE::U1 => Ok(TypeSignature::U1),
            ELEMENT_TYPE::I2 => Ok(TypeSignature::I2),
            ELEMENT_TYPE::U2 => Ok(TypeSignature::U2),
            ELEMENT_TYPE::I4 => Ok(TypeSignature::I4),
            ELEMENT_TYPE::U4 => Ok(TypeSignature::U4),
            ELEMENT_TYPE::I8 => Ok(TypeSignature::I8),
            ELEMENT_TYPE::U8 => Ok(TypeSignature::U8),
            ELEMENT_TYPE::R4 => Ok(TypeSignature::R4),
            ELEMENT_TYPE::R8 => Ok(TypeSignature::R8),
            ELEMENT_TYPE::STRING => Ok(TypeSignature::String),
            ELEMENT_TYPE::PTR => Ok(TypeSignature::Ptr(Box::new(self.parse_type()?))),
            ELEMENT_TYPE::BYREF => Ok(TypeSignature::ByRef(Box::new(self.parse_type()?))),
            ELEMENT_TYPE::VALUETYPE => Ok(TypeSignature::ValueType(
                self.parser.read_compressed_token()?,
            )),
            ELEMENT_TYPE::CLASS => Ok(TypeSignature::Class(self.parser.read_compressed_token()?)),
            ELEMENT_TYPE::VAR => Ok(TypeSignature::GenericParamType(
                self.parser.read_compressed_uint()?,
            )),
            ELEMENT_TYPE::MVAR => Ok(TypeSignature::GenericParamMethod(
                self.parser.read_compressed_uint()?,
            )),
            ELEMENT_TYPE::ARRAY => {
                let base = self.parse_type()?;
                let rank = self.parser.read_compressed_uint()?;

                let num_sizes = self.parser.read_compressed_uint()?;
                let mut sizes = Vec::with_capacity(num_sizes.min(rank) as usize);
                for _ in 0..num_sizes {
                    sizes.push(self.parser.read_compressed_uint()?);
                }

                let num_lo_bounds = self.parser.read_compressed_uint()?;
                let mut lower_bounds = Vec::with_capacity(num_lo_bounds.min(rank) as usize);
                for _ in 0..num_lo_bounds {
                    lower_bounds.push(self.parser.read_compressed_int()?);
                }

                Ok(TypeSignature::Array(SignatureArray {
                    base: Box::new(base),
                    rank,
                    sizes,
                    lower_bounds,
                }))
            }
            ELEMENT_TYPE::GENERICINST => {
                let peek_byte = self.parser.peek_byte()?;
                if peek_byte != ELEMENT_TYPE::CLASS && peek_byte != ELEMENT_TYPE::VALUETYPE {
                    return Err(malformed_error!(
                        "GENERICINST - Next byte is not TYPE_CLASS or TYPE_VALUE - {}",
                        peek_byte
                    ));
                }

                let base_type = self.parse_type()?;
                let arg_count = self.parser.read_compressed_uint()?;

                let mut type_args = Vec::with_capacity(arg_count.min(64) as usize);
                for _ in 0..arg_count {
                    type_args.push(self.parse_type()?);
                }

                Ok(TypeSignature::GenericInst(Box::new(base_type), type_args))
            }
            ELEMENT_TYPE::TYPEDBYREF => Ok(TypeSignature::TypedByRef),
            ELEMENT_TYPE::I => Ok(TypeSignature::I),
            ELEMENT_TYPE::U => Ok(TypeSignature::U),
            ELEMENT_TYPE::FNPTR => Ok(TypeSignature::FnPtr(Box::new(
                self.parse_method_signature()?,
            ))),
            ELEMENT_TYPE::OBJECT => Ok(TypeSignature::Object),
            ELEMENT_TYPE::SZARRAY => Ok(TypeSignature::SzArray(Box::new(self.parse_type()?))),
            ELEMENT_TYPE::CMOD_REQD | ELEMENT_TYPE::CMOD_OPT => {
                let modifier = CustomModifier {
                    is_required: current_byte == ELEMENT_TYPE::CMOD_REQD,
                    modifier_type: self.parser.read_compressed_token()?,
                };

                Ok(TypeSignature::Modified(modifier, Box::new(self.parse_type()?)))
            }
            ELEMENT_TYPE::PINNED => Ok(TypeSignature::Pinned(Box::new(self.parse_type()?))),
            _ => Err(malformed_error!(
                "Unsupported ELEMENT_TYPE - {}",
                current_byte
            )),
        }
    }

    fn parse_custom_mods(&mut self) -> Result<Vec<CustomModifier>> {
        let mut mods = Vec::new();

        while self.parser.has_more_data() {
            let next_byte = self.parser.peek_byte()?;
            if next_byte != ELEMENT_TYPE::CMOD_OPT && next_byte != ELEMENT_TYPE::CMOD_REQD {
                break;
            }

            self.parser.advance_by(1)?;
            mods.push(CustomModifier {
                is_required: next_byte == ELEMENT_TYPE::CMOD_REQD,
                modifier_type: self.parser.read_compressed_token()?,
            });
        }

        Ok(mods)
    }

    fn parse_param(&mut self) -> Result<SignatureParameter> {
        let modifiers = self.parse_custom_mods()?;

        let mut by_ref = false;
        if self.parser.peek_byte()? == ELEMENT_TYPE::BYREF {
            self.parser.advance_by(1)?;
            by_ref = true;
        }

        Ok(SignatureParameter {
            modifiers,
            by_ref,
            base: self.parse_type()?,
        })
    }

    /// Parses a `MethodDefSig`, `MethodRefSig` or `StandAloneMethodSig`
    ///
    /// # Errors
    /// Returns an error for truncated or malformed blobs.
    pub fn parse_method_signature(&mut self) -> Result<SignatureMethod> {
        let convention_byte = self.parser.read_le::<u8>()?;
        let kind = convention_byte & CALLING_CONVENTION::KIND_MASK;
        if kind > CALLING_CONVENTION::VARARG {
            return Err(malformed_error!(
                "Invalid method calling convention - {}",
                convention_byte
            ));
        }

        let param_count_generic = if convention_byte & CALLING_CONVENTION::GENERIC != 0 {
            self.parser.read_compressed_uint()?
        } else {
            0
        };
        let param_count = self.parser.read_compressed_uint()?;

        let mut method = SignatureMethod {
            has_this: convention_byte & CALLING_CONVENTION::HASTHIS != 0,
            explicit_this: convention_byte & CALLING_CONVENTION::EXPLICITTHIS != 0,
            default: kind == CALLING_CONVENTION::DEFAULT,
            vararg: kind == CALLING_CONVENTION::VARARG,
            cdecl: kind == CALLING_CONVENTION::C,
            stdcall: kind == CALLING_CONVENTION::STDCALL,
            thiscall: kind == CALLING_CONVENTION::THISCALL,
            fastcall: kind == CALLING_CONVENTION::FASTCALL,
            param_count_generic,
            return_type: self.parse_param()?,
            params: Vec::with_capacity(param_count.min(64) as usize),
            varargs: Vec::new(),
        };

        let mut after_sentinel = false;
        for _ in 0..param_count {
            if !after_sentinel && self.parser.peek_byte()? == ELEMENT_TYPE::SENTINEL {
                self.parser.advance_by(1)?;
                after_sentinel = true;
            }

            let param = self.parse_param()?;
            if after_sentinel {
                method.varargs.push(param);
            } else {
                method.params.push(param);
            }
        }

        Ok(method)
    }

    /// Parses a `FieldSig`
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the blob does not start with `FIELD`.
    pub fn parse_field_signature(&mut self) -> Result<SignatureField> {
        let head_byte = self.parser.read_le::<u8>()?;
        if head_byte != SIGNATURE_HEADER::FIELD {
            return Err(malformed_error!(
                "SignatureField - invalid start - {}",
                head_byte
            ));
        }

        let modifiers = self.parse_custom_mods()?;
        let base = self.parse_type()?;

        Ok(SignatureField { modifiers, base })
    }

    /// Parses a `PropertySig`
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the blob does not start with `PROPERTY`.
    pub fn parse_property_signature(&mut self) -> Result<SignatureProperty> {
        let head_byte = self.parser.read_le::<u8>()?;
        if (head_byte & 0x0F) != SIGNATURE_HEADER::PROPERTY {
            return Err(malformed_error!(
                "SignatureProperty - invalid start - {}",
                head_byte
            ));
        }

        let has_this = (head_byte & CALLING_CONVENTION::HASTHIS) != 0;

        let param_count = self.parser.read_compressed_uint()?;
        let modifiers = self.parse_custom_mods()?;
        let base = self.parse_type()?;

        let mut params = Vec::with_capacity(param_count.min(64) as usize);
        for _ in 0..param_count {
            params.push(self.parse_param()?);
        }

        Ok(SignatureProperty {
            has_this,
            modifiers,
            base,
            params,
        })
    }

    /// Parses a `LocalVarSig`
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the blob does not start with `LOCAL_SIG`.
    pub fn parse_local_var_signature(&mut self) -> Result<SignatureLocalVariables> {
        let head_byte = self.parser.read_le::<u8>()?;
        if head_byte != SIGNATURE_HEADER::LOCAL_SIG {
            return Err(malformed_error!(
                "SignatureLocalVar - invalid start - {}",
                head_byte
            ));
        }

        let count = self.parser.read_compressed_uint()?;

        let mut locals = Vec::with_capacity(count.min(256) as usize);
        for _ in 0..count {
            if self.parser.peek_byte()? == ELEMENT_TYPE::TYPEDBYREF {
                self.parser.advance_by(1)?;
                locals.push(SignatureLocalVariable {
                    modifiers: Vec::new(),
                    is_byref: false,
                    is_pinned: false,
                    base: TypeSignature::TypedByRef,
                });

                continue;
            }

            // Custom modifiers and the pinned constraint may interleave
            let mut modifiers = Vec::new();
            let mut is_pinned = false;
            while self.parser.has_more_data() {
                match self.parser.peek_byte()? {
                    ELEMENT_TYPE::CMOD_OPT | ELEMENT_TYPE::CMOD_REQD => {
                        modifiers.extend(self.parse_custom_mods()?);
                    }
                    ELEMENT_TYPE::PINNED => {
                        self.parser.advance_by(1)?;
                        is_pinned = true;
                    }
                    _ => break,
                }
            }

            let is_byref = if self.parser.peek_byte()? == ELEMENT_TYPE::BYREF {
                self.parser.advance_by(1)?;
                true
            } else {
                false
            };

            locals.push(SignatureLocalVariable {
                modifiers,
                is_byref,
                is_pinned,
                base: self.parse_type()?,
            });
        }

        Ok(SignatureLocalVariables { locals })
    }

    /// Parses a `TypeSpec` blob
    ///
    /// # Errors
    /// Returns an error for truncated or malformed blobs.
    pub fn parse_type_spec_signature(&mut self) -> Result<SignatureTypeSpec> {
        let base = self.parse_type()?;
        Ok(SignatureTypeSpec { base })
    }

    /// Parses a `MethodSpec` instantiation blob
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the blob does not start with `GENERICINST`.
    pub fn parse_method_spec_signature(&mut self) -> Result<SignatureMethodSpec> {
        let head_byte = self.parser.read_le::<u8>()?;
        if head_byte != SIGNATURE_HEADER::METHOD_SPEC {
            return Err(malformed_error!(
                "SignatureMethodSpec - invalid start - {}",
                head_byte
            ));
        }

        let arg_count = self.parser.read_compressed_uint()?;
        let mut generic_args = Vec::with_capacity(arg_count.min(64) as usize);
        for _ in 0..arg_count {
            generic_args.push(self.parse_type()?);
        }

        Ok(SignatureMethodSpec { generic_args })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::token::Token;

    #[test]
    fn primitive_types() {
        let test_cases = [
            (vec![0x01], TypeSignature::Void),
            (vec![0x02], TypeSignature::Boolean),
            (vec![0x03], TypeSignature::Char),
            (vec![0x04], TypeSignature::I1),
            (vec![0x05], TypeSignature::U1),
            (vec![0x06], TypeSignature::I2),
            (vec![0x07], TypeSignature::U2),
            (vec![0x08], TypeSignature::I4),
            (vec![0x09], TypeSignature::U4),
            (vec![0x0A], TypeSignature::I8),
            (vec![0x0B], TypeSignature::U8),
            (vec![0x0C], TypeSignature::R4),
            (vec![0x0D], TypeSignature::R8),
            (vec![0x0E], TypeSignature::String),
            (vec![0x16], TypeSignature::TypedByRef),
            (vec![0x18], TypeSignature::I),
            (vec![0x19], TypeSignature::U),
            (vec![0x1C], TypeSignature::Object),
        ];

        for (bytes, expected_type) in test_cases {
            let mut parser = SignatureParser::new(&bytes);
            assert_eq!(parser.parse_type().unwrap(), expected_type);
        }
    }

    #[test]
    fn class_and_valuetype() {
        let mut parser = SignatureParser::new(&[0x12, 0x42]);
        assert_eq!(
            parser.parse_type().unwrap(),
            TypeSignature::Class(Token::new(0x1B00_0010))
        );

        let mut parser = SignatureParser::new(&[0x11, 0x35]);
        assert_eq!(
            parser.parse_type().unwrap(),
            TypeSignature::ValueType(Token::new(0x0100_000D))
        );

        let mut parser = SignatureParser::new(&[0x13, 0x03]);
        assert_eq!(
            parser.parse_type().unwrap(),
            TypeSignature::GenericParamType(3)
        );

        let mut parser = SignatureParser::new(&[0x1E, 0x00]);
        assert_eq!(
            parser.parse_type().unwrap(),
            TypeSignature::GenericParamMethod(0)
        );
    }

    #[test]
    fn arrays() {
        let mut parser = SignatureParser::new(&[0x1D, 0x08]);
        assert_eq!(
            parser.parse_type().unwrap(),
            TypeSignature::SzArray(Box::new(TypeSignature::I4))
        );

        // int32[0..4, 0..]
        #[rustfmt::skip]
        let mut parser = SignatureParser::new(&[
            0x14, 0x08, // ARRAY I4
            0x02,       // rank
            0x01, 0x05, // one size: 5
            0x02, 0x00, 0x7B, // two lower bounds: 0, -3
        ]);
        let TypeSignature::Array(array) = parser.parse_type().unwrap() else {
            panic!("expected an array");
        };
        assert_eq!(*array.base, TypeSignature::I4);
        assert_eq!(array.rank, 2);
        assert_eq!(array.sizes, vec![5]);
        assert_eq!(array.lower_bounds, vec![0, -3]);
    }

    #[test]
    fn generic_instance() {
        // List<int32> with List`1 as TypeRef 1
        let mut parser = SignatureParser::new(&[0x15, 0x12, 0x05, 0x01, 0x08]);
        assert_eq!(
            parser.parse_type().unwrap(),
            TypeSignature::GenericInst(
                Box::new(TypeSignature::Class(Token::new(0x0100_0001))),
                vec![TypeSignature::I4]
            )
        );

        let mut parser = SignatureParser::new(&[0x15, 0x08, 0x01, 0x08]);
        assert!(parser.parse_type().is_err());
    }

    #[test]
    fn modified_types_keep_their_base() {
        // modreq(TypeRef 2) int32
        let mut parser = SignatureParser::new(&[0x1F, 0x09, 0x08]);
        let parsed = parser.parse_type().unwrap();

        assert_eq!(parsed.unmodified(), &TypeSignature::I4);
        assert!(matches!(
            parsed,
            TypeSignature::Modified(
                CustomModifier {
                    is_required: true,
                    ..
                },
                _
            )
        ));
    }

    #[test]
    fn method_signatures() {
        let method = SignatureParser::new(&[0x00, 0x00, 0x01])
            .parse_method_signature()
            .unwrap();
        assert!(method.default);
        assert!(!method.has_this);
        assert!(method.params.is_empty());
        assert_eq!(method.return_type.base, TypeSignature::Void);

        // instance int32 M(string, ref int32[])
        let method = SignatureParser::new(&[0x20, 0x02, 0x08, 0x0E, 0x10, 0x1D, 0x08])
            .parse_method_signature()
            .unwrap();
        assert!(method.has_this);
        assert_eq!(method.params.len(), 2);
        assert_eq!(method.params[0].base, TypeSignature::String);
        assert!(method.params[1].by_ref);
        assert_eq!(
            method.params[1].full_type(),
            TypeSignature::ByRef(Box::new(TypeSignature::SzArray(Box::new(TypeSignature::I4))))
        );

        // generic T M<T>(T)
        let method = SignatureParser::new(&[0x10, 0x01, 0x01, 0x1E, 0x00, 0x1E, 0x00])
            .parse_method_signature()
            .unwrap();
        assert_eq!(method.param_count_generic, 1);
        assert_eq!(method.return_type.base, TypeSignature::GenericParamMethod(0));

        // vararg void M(int32, ..., string)
        let method = SignatureParser::new(&[0x05, 0x02, 0x01, 0x08, 0x41, 0x0E])
            .parse_method_signature()
            .unwrap();
        assert!(method.vararg);
        assert_eq!(method.params.len(), 1);
        assert_eq!(method.varargs.len(), 1);
        assert_eq!(method.varargs[0].base, TypeSignature::String);
    }

    #[test]
    fn field_property_and_locals() {
        let field = SignatureParser::new(&[0x06, 0x0E])
            .parse_field_signature()
            .unwrap();
        assert_eq!(field.base, TypeSignature::String);
        assert!(SignatureParser::new(&[0x07, 0x0E])
            .parse_field_signature()
            .is_err());

        // instance int32 Item[string]
        let property = SignatureParser::new(&[0x28, 0x01, 0x08, 0x0E])
            .parse_property_signature()
            .unwrap();
        assert!(property.has_this);
        assert_eq!(property.base, TypeSignature::I4);
        assert_eq!(property.params[0].base, TypeSignature::String);

        // int32, pinned string&
        let locals = SignatureParser::new(&[0x07, 0x02, 0x08, 0x45, 0x10, 0x0E])
            .parse_local_var_signature()
            .unwrap();
        assert_eq!(locals.locals.len(), 2);
        assert!(locals.locals[1].is_pinned);
        assert!(locals.locals[1].is_byref);
        assert_eq!(locals.locals[1].base, TypeSignature::String);
    }

    #[test]
    fn method_spec() {
        let spec = SignatureParser::new(&[0x0A, 0x02, 0x08, 0x0E])
            .parse_method_spec_signature()
            .unwrap();
        assert_eq!(spec.generic_args, vec![TypeSignature::I4, TypeSignature::String]);
    }

    #[test]
    fn depth_limit() {
        let mut nested = vec![0x1D; MAX_SIGNATURE_DEPTH + 1];
        nested.push(0x08);
        assert!(matches!(
            SignatureParser::new(&nested).parse_type(),
            Err(RecursionLimit(_))
        ));

        let mut nested = vec![0x1D; MAX_SIGNATURE_DEPTH - 1];
        nested.push(0x08);
        assert!(SignatureParser::new(&nested).parse_type().is_ok());
    }
}
