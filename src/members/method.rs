use std::{
    fmt,
    sync::{Arc, OnceLock, Weak},
};

use crate::{
    customattributes::CustomAttributeRc,
    members::{CallingConventions, MemberInfo, MemberType, MethodRc, Parameter},
    metadata::{
        signatures::{parse_method_signature, SignatureMethod},
        tables::{MethodAttributes, MethodDefRow},
        token::{Token, TokenKind},
    },
    module::{Module, ModuleRc},
    resolver::{GenericContext, Resolver},
    typesystem::{ConstantValue, GenericOwner, GenericParameter, TypeDescriptor, TypeRc},
    Error, Result,
};

struct ResolvedSignature {
    return_type: TypeRc,
    parameter_types: Vec<TypeRc>,
}

/// A generic method definition bound to method arguments
struct Instantiation {
    definition: MethodRc,
    arguments: Vec<TypeRc>,
}

/// A method or constructor backed by a `MethodDef` row
///
/// Methods of constructed generic types share the row of the definition but resolve their
/// signature with the type arguments of the constructed declaring type. Instantiations created
/// with [`Method::make_generic_method`] additionally bind the method's own parameters.
pub struct Method {
    me: Weak<Method>,
    declaring: Weak<TypeDescriptor>,
    module: Weak<Module>,
    token: Token,
    row: MethodDefRow,
    name: String,
    signature: OnceLock<SignatureMethod>,
    generic_parameters: OnceLock<Vec<TypeRc>>,
    resolved: OnceLock<ResolvedSignature>,
    instantiation: Option<Instantiation>,
    custom_attributes: OnceLock<Vec<CustomAttributeRc>>,
}

impl Method {
    pub(crate) fn create(owner: &TypeRc, module: &Module, row: MethodDefRow) -> Result<MethodRc> {
        let name = module.view().string(row.name)?.to_string();

        Ok(Arc::new_cyclic(|me| Method {
            me: me.clone(),
            declaring: Arc::downgrade(owner),
            module: module.weak(),
            token: TokenKind::MethodDef.token(row.rid),
            row,
            name,
            signature: OnceLock::new(),
            generic_parameters: OnceLock::new(),
            resolved: OnceLock::new(),
            instantiation: None,
            custom_attributes: OnceLock::new(),
        }))
    }

    /// The method name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The `MethodDef` token
    #[must_use]
    pub fn token(&self) -> Token {
        self.token
    }

    /// The raw `MethodDef` row
    #[must_use]
    pub fn row(&self) -> &MethodDefRow {
        &self.row
    }

    /// `MethodAttributes` of the row
    #[must_use]
    pub fn flags(&self) -> u16 {
        self.row.flags
    }

    /// `MethodImplAttributes` of the row
    #[must_use]
    pub fn impl_flags(&self) -> u16 {
        self.row.impl_flags
    }

    /// The RVA of the body, 0 for abstract and runtime-implemented methods
    #[must_use]
    pub fn rva(&self) -> u32 {
        self.row.rva
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

    /// True for `.ctor` and `.cctor`
    #[must_use]
    pub fn is_constructor(&self) -> bool {
        self.name == ".ctor" || self.name == ".cctor"
    }

    /// True for static methods
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.row.flags & MethodAttributes::STATIC != 0
    }

    /// True for public methods
    #[must_use]
    pub fn is_public(&self) -> bool {
        self.row.flags & MethodAttributes::MEMBER_ACCESS_MASK == MethodAttributes::PUBLIC
    }

    /// True for private methods
    #[must_use]
    pub fn is_private(&self) -> bool {
        self.row.flags & MethodAttributes::MEMBER_ACCESS_MASK == MethodAttributes::PRIVATE
    }

    /// True for virtual methods
    #[must_use]
    pub fn is_virtual(&self) -> bool {
        self.row.flags & MethodAttributes::VIRTUAL != 0
    }

    /// True for abstract methods
    #[must_use]
    pub fn is_abstract(&self) -> bool {
        self.row.flags & MethodAttributes::ABSTRACT != 0
    }

    /// True for sealed virtual methods
    #[must_use]
    pub fn is_final(&self) -> bool {
        self.row.flags & MethodAttributes::FINAL != 0
    }

    /// True for accessors, operators and other specially named methods
    #[must_use]
    pub fn is_special_name(&self) -> bool {
        self.row.flags & MethodAttributes::SPECIAL_NAME != 0
    }

    /// The decoded signature blob
    ///
    /// # Errors
    /// Returns an error for a malformed blob.
    pub fn signature(&self) -> Result<&SignatureMethod> {
        if let Some(instantiation) = &self.instantiation {
            return instantiation.definition.signature();
        }

        Ok(cached!(self.signature, || {
            let module = self.module()?;
            parse_method_signature(module.view().blob(self.row.signature)?)
        }))
    }

    /// The calling convention bits of the signature
    ///
    /// # Errors
    /// Returns an error for a malformed signature blob.
    pub fn calling_convention(&self) -> Result<CallingConventions> {
        let signature = self.signature()?;

        let mut conventions = if signature.vararg {
            CallingConventions::VAR_ARGS
        } else {
            CallingConventions::STANDARD
        };
        if signature.has_this {
            conventions |= CallingConventions::HAS_THIS;
        }
        if signature.explicit_this {
            conventions |= CallingConventions::EXPLICIT_THIS;
        }

        Ok(conventions)
    }

    /// True if the method declares generic parameters
    ///
    /// # Errors
    /// Returns an error for a malformed signature blob.
    pub fn is_generic_method(&self) -> Result<bool> {
        Ok(self.signature()?.param_count_generic > 0)
    }

    /// True for generic methods that are not bound to arguments
    ///
    /// # Errors
    /// Returns an error for a malformed signature blob.
    pub fn is_generic_method_definition(&self) -> Result<bool> {
        Ok(self.instantiation.is_none() && self.is_generic_method()?)
    }

    /// True for instantiations created with [`Method::make_generic_method`]
    #[must_use]
    pub fn is_constructed_generic_method(&self) -> bool {
        self.instantiation.is_some()
    }

    fn generic_parameters(&self) -> Result<&[TypeRc]> {
        if let Some(instantiation) = &self.instantiation {
            return instantiation.definition.generic_parameters();
        }

        let parameters = cached!(self.generic_parameters, || {
            let module = self.module()?;
            module
                .generic_params(self.token)?
                .into_iter()
                .map(|row| {
                    GenericParameter::create(&module, row, GenericOwner::Method(self.me.clone()))
                })
                .collect::<Result<Vec<_>>>()
        });

        Ok(parameters.as_slice())
    }

    /// The generic parameters of a definition, or the arguments of an instantiation
    ///
    /// # Errors
    /// Returns an error if the `GenericParam` rows cannot be read.
    pub fn generic_arguments(&self) -> Result<Vec<TypeRc>> {
        match &self.instantiation {
            Some(instantiation) => Ok(instantiation.arguments.clone()),
            None => Ok(self.generic_parameters()?.to_vec()),
        }
    }

    /// The generic method definition of an instantiation; a definition returns itself
    ///
    /// # Errors
    /// Returns an error for a malformed signature blob.
    pub fn generic_method_definition(&self) -> Result<Option<MethodRc>> {
        if let Some(instantiation) = &self.instantiation {
            return Ok(Some(instantiation.definition.clone()));
        }

        if self.is_generic_method()? {
            Ok(self.me.upgrade())
        } else {
            Ok(None)
        }
    }

    /// Binds the generic parameters of this method definition to `arguments`
    ///
    /// # Errors
    /// Returns [`Error::NotGenericDefinition`] if this is not a generic method definition,
    /// [`Error::ArityMismatch`] for a wrong argument count and [`Error::ForeignTypeArgument`]
    /// for arguments of another registry.
    pub fn make_generic_method(&self, arguments: &[TypeRc]) -> Result<MethodRc> {
        if !self.is_generic_method_definition()? {
            return Err(Error::NotGenericDefinition(self.name.clone()));
        }

        let expected = self.signature()?.param_count_generic as usize;
        if arguments.len() != expected {
            return Err(Error::ArityMismatch {
                expected,
                actual: arguments.len(),
            });
        }

        let registry_id = self.module()?.registry_id();
        if let Some(foreign) = arguments
            .iter()
            .find(|argument| argument.registry_id() != registry_id)
        {
            return Err(Error::ForeignTypeArgument(foreign.full_name()));
        }

        let definition = self.me.upgrade().ok_or(Error::Released)?;
        Ok(Arc::new_cyclic(|me| Method {
            me: me.clone(),
            declaring: self.declaring.clone(),
            module: self.module.clone(),
            token: self.token,
            row: self.row,
            name: self.name.clone(),
            signature: OnceLock::new(),
            generic_parameters: OnceLock::new(),
            resolved: OnceLock::new(),
            instantiation: Some(Instantiation {
                definition,
                arguments: arguments.to_vec(),
            }),
            custom_attributes: OnceLock::new(),
        }))
    }

    fn resolved(&self) -> Result<&ResolvedSignature> {
        Ok(cached!(self.resolved, || {
            let module = self.module()?;
            let me = self.me.upgrade().ok_or(Error::Released)?;
            let context = GenericContext::for_method(&me)?;
            let signature = self.signature()?;

            let resolver = Resolver::new(&module, &context);
            let parameter_types = signature
                .params
                .iter()
                .map(|parameter| resolver.resolve_parameter(parameter))
                .collect::<Result<Vec<_>>>()?;

            Ok(ResolvedSignature {
                return_type: resolver.resolve_parameter(&signature.return_type)?,
                parameter_types,
            })
        }))
    }

    /// The return type
    ///
    /// # Errors
    /// Returns an error if the signature cannot be decoded or resolved.
    pub fn return_type(&self) -> Result<TypeRc> {
        Ok(self.resolved()?.return_type.clone())
    }

    /// The types of the declared parameters, in order
    ///
    /// # Errors
    /// Returns an error if the signature cannot be decoded or resolved.
    pub fn parameter_types(&self) -> Result<&[TypeRc]> {
        Ok(self.resolved()?.parameter_types.as_slice())
    }

    /// The declared parameters, matched to their `Param` rows by sequence number
    ///
    /// Parameters without a `Param` row get an empty name and no flags.
    ///
    /// # Errors
    /// Returns an error if the signature cannot be resolved or a `Param` row cannot be read.
    pub fn parameters(&self) -> Result<Vec<Parameter>> {
        let types = self.parameter_types()?;
        let module = self.module()?;
        let rows = module.param_rows(self.row.rid)?;

        let mut parameters = Vec::with_capacity(types.len());
        for (index, parameter_type) in types.iter().enumerate() {
            let row = rows
                .iter()
                .find(|row| usize::from(row.sequence) == index + 1)
                .copied();
            parameters.push(Parameter::new(
                &module,
                self.me.clone(),
                row,
                i32::try_from(index).unwrap_or(i32::MAX),
                parameter_type.clone(),
            )?);
        }

        Ok(parameters)
    }

    /// The return parameter (sequence 0), carrying attributes applied to the return value
    ///
    /// # Errors
    /// Returns an error if the signature cannot be resolved or a `Param` row cannot be read.
    pub fn return_parameter(&self) -> Result<Parameter> {
        let return_type = self.return_type()?;
        let module = self.module()?;
        let row = module
            .param_rows(self.row.rid)?
            .into_iter()
            .find(|row| row.sequence == 0);

        Parameter::new(&module, self.me.clone(), row, -1, return_type)
    }

    /// The custom attributes applied to this method
    ///
    /// # Errors
    /// Returns an error if the `CustomAttribute` table cannot be read.
    pub fn custom_attributes(&self) -> Result<Vec<CustomAttributeRc>> {
        Ok(cached!(self.custom_attributes, || self
            .module()?
            .custom_attributes_of(self.token))
        .clone())
    }

    /// Always fails: methods of a reflection-only type graph cannot be executed
    ///
    /// # Errors
    /// Returns [`Error::UnsupportedOperation`].
    pub fn invoke(
        &self,
        _target: Option<&ConstantValue>,
        _arguments: &[ConstantValue],
    ) -> Result<ConstantValue> {
        Err(Error::UnsupportedOperation(
            "methods of a reflection-only module cannot be invoked",
        ))
    }
}

impl MemberInfo for Method {
    fn name(&self) -> &str {
        &self.name
    }

    fn token(&self) -> Token {
        self.token
    }

    fn member_type(&self) -> MemberType {
        if self.is_constructor() {
            MemberType::Constructor
        } else {
            MemberType::Method
        }
    }

    fn declaring_type(&self) -> Result<TypeRc> {
        Method::declaring_type(self)
    }

    fn module(&self) -> Result<ModuleRc> {
        Method::module(self)
    }

    fn custom_attributes(&self) -> Result<Vec<CustomAttributeRc>> {
        Method::custom_attributes(self)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Ok(resolved) = self.resolved() else {
            return write!(f, "{}", self.name);
        };

        write!(f, "{} {}", resolved.return_type.name(), self.name)?;
        if let Ok(arguments) = self.generic_arguments() {
            if !arguments.is_empty() {
                let names: Vec<String> = arguments.iter().map(|argument| argument.name()).collect();
                write!(f, "[{}]", names.join(","))?;
            }
        }

        let parameters: Vec<String> = resolved
            .parameter_types
            .iter()
            .map(|parameter| parameter.name())
            .collect();
        write!(f, "({})", parameters.join(", "))
    }
}

impl fmt::Debug for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Method({} {})", self.token, self.name)
    }
}
