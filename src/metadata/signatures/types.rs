use crate::metadata::token::Token;

/// A parsed type in a signature (ECMA-335 II.23.2.12)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeSignature {
    /// void
    Void,
    /// bool
    Boolean,
    /// char
    Char,
    /// signed 8bit integer
    I1,
    /// unsigned 8bit integer
    U1,
    /// signed 16bit integer
    I2,
    /// unsigned 16bit integer
    U2,
    /// signed 32bit integer
    I4,
    /// unsigned 32bit integer
    U4,
    /// signed 64bit integer
    I8,
    /// unsigned 64bit integer
    U8,
    /// 32bit floating-point
    R4,
    /// 64bit floating-point
    R8,
    /// System.String
    String,
    /// An unmanaged pointer to a type
    Ptr(Box<TypeSignature>),
    /// A managed reference to a type
    ByRef(Box<TypeSignature>),
    /// A value type - `TypeDefOrRefOrSpecEncoded`
    ValueType(Token),
    /// A reference type - `TypeDefOrRefOrSpecEncoded`
    Class(Token),
    /// Generic parameter of the enclosing type, by position
    GenericParamType(u32),
    /// Generic parameter of the enclosing method, by position
    GenericParamMethod(u32),
    /// A general array
    Array(SignatureArray),
    /// A single dimension, zero-based array
    SzArray(Box<TypeSignature>),
    /// A generic type and its arguments
    GenericInst(Box<TypeSignature>, Vec<TypeSignature>),
    /// System.TypedReference
    TypedByRef,
    /// signed integer, sized to executing platform
    I,
    /// unsigned integer, sized to executing platform
    U,
    /// System.Object
    Object,
    /// Function pointer
    FnPtr(Box<SignatureMethod>),
    /// A type carrying a `modreq` or `modopt`
    Modified(CustomModifier, Box<TypeSignature>),
    /// A pinned local
    Pinned(Box<TypeSignature>),
}

impl TypeSignature {
    /// Strips custom modifiers and `pinned`
    #[must_use]
    pub fn unmodified(&self) -> &TypeSignature {
        match self {
            TypeSignature::Modified(_, base) | TypeSignature::Pinned(base) => base.unmodified(),
            other => other,
        }
    }
}

/// A `modreq` or `modopt` custom modifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CustomModifier {
    /// `modreq` if set, `modopt` otherwise
    pub is_required: bool,
    /// The modifier type - `TypeDefOrRefOrSpecEncoded`
    pub modifier_type: Token,
}

/// Shape of a general array (II.23.2.13)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureArray {
    /// The element type
    pub base: Box<TypeSignature>,
    /// The number of dimensions
    pub rank: u32,
    /// Sizes of the leading dimensions
    pub sizes: Vec<u32>,
    /// Lower bounds of the leading dimensions
    pub lower_bounds: Vec<i32>,
}

/// Parameter or return type with optional custom modifiers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureParameter {
    /// Custom modifiers of the parameter
    pub modifiers: Vec<CustomModifier>,
    /// Parameter is passed by reference
    pub by_ref: bool,
    /// The type of the parameter
    pub base: TypeSignature,
}

impl SignatureParameter {
    /// A plain parameter of type `base`
    #[must_use]
    pub fn new(base: TypeSignature) -> Self {
        SignatureParameter {
            modifiers: Vec::new(),
            by_ref: false,
            base,
        }
    }

    /// The parameter type with `by_ref` folded in
    #[must_use]
    pub fn full_type(&self) -> TypeSignature {
        if self.by_ref {
            TypeSignature::ByRef(Box::new(self.base.clone()))
        } else {
            self.base.clone()
        }
    }
}

/// Method definition or reference signature (II.23.2.1 - II.23.2.3)
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct SignatureMethod {
    /// Instance method, `this` is passed implicitly
    pub has_this: bool,
    /// `this` is the first explicit parameter
    pub explicit_this: bool,
    /// Managed default calling convention
    pub default: bool,
    /// Variable argument list
    pub vararg: bool,
    /// Native `cdecl`
    pub cdecl: bool,
    /// Native `stdcall`
    pub stdcall: bool,
    /// Native `thiscall`
    pub thiscall: bool,
    /// Native `fastcall`
    pub fastcall: bool,
    /// Number of generic parameters, 0 for non-generic methods
    pub param_count_generic: u32,
    /// The return type
    pub return_type: SignatureParameter,
    /// The fixed parameters
    pub params: Vec<SignatureParameter>,
    /// Parameters after the vararg sentinel
    pub varargs: Vec<SignatureParameter>,
}

impl SignatureMethod {
    /// A default convention static method signature
    #[must_use]
    pub fn new(return_type: TypeSignature, params: Vec<TypeSignature>) -> Self {
        SignatureMethod {
            has_this: false,
            explicit_this: false,
            default: true,
            vararg: false,
            cdecl: false,
            stdcall: false,
            thiscall: false,
            fastcall: false,
            param_count_generic: 0,
            return_type: SignatureParameter::new(return_type),
            params: params.into_iter().map(SignatureParameter::new).collect(),
            varargs: Vec::new(),
        }
    }

    /// Marks the signature as an instance method
    #[must_use]
    pub fn instance(mut self) -> Self {
        self.has_this = true;
        self
    }

    /// Marks the signature as a generic method with `count` parameters
    #[must_use]
    pub fn generic(mut self, count: u32) -> Self {
        self.param_count_generic = count;
        self
    }
}

/// Field signature (II.23.2.4)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureField {
    /// Custom modifiers of the field
    pub modifiers: Vec<CustomModifier>,
    /// The field type
    pub base: TypeSignature,
}

/// Property signature (II.23.2.5)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureProperty {
    /// Instance property
    pub has_this: bool,
    /// Custom modifiers of the property type
    pub modifiers: Vec<CustomModifier>,
    /// The property type
    pub base: TypeSignature,
    /// Index parameters
    pub params: Vec<SignatureParameter>,
}

/// Local variable signature (II.23.2.6)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureLocalVariables {
    /// The local variables
    pub locals: Vec<SignatureLocalVariable>,
}

/// One local variable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureLocalVariable {
    /// Custom modifiers
    pub modifiers: Vec<CustomModifier>,
    /// Is a managed reference
    pub is_byref: bool,
    /// Is pinned
    pub is_pinned: bool,
    /// The variable type
    pub base: TypeSignature,
}

/// Type specification signature (II.23.2.14)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureTypeSpec {
    /// The specified type
    pub base: TypeSignature,
}

/// Generic method instantiation (II.23.2.15)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureMethodSpec {
    /// The generic arguments
    pub generic_args: Vec<TypeSignature>,
}
