//! Flag values of the `Flags` columns (ECMA-335 II.23.1).
#![allow(non_snake_case)]

/// Flags of `TypeDef` rows (II.23.1.15)
pub mod TypeAttributes {
    /// Mask for the 3 visibility bits
    pub const VISIBILITY_MASK: u32 = 0x0000_0007;
    /// Top-level type, not visible outside its assembly
    pub const NOT_PUBLIC: u32 = 0x0000_0000;
    /// Top-level type, visible outside its assembly
    pub const PUBLIC: u32 = 0x0000_0001;
    /// Nested type with public visibility
    pub const NESTED_PUBLIC: u32 = 0x0000_0002;
    /// Nested type with private visibility
    pub const NESTED_PRIVATE: u32 = 0x0000_0003;
    /// Nested type with family visibility
    pub const NESTED_FAMILY: u32 = 0x0000_0004;
    /// Nested type with assembly visibility
    pub const NESTED_ASSEMBLY: u32 = 0x0000_0005;
    /// Nested type with family and assembly visibility
    pub const NESTED_FAM_AND_ASSEM: u32 = 0x0000_0006;
    /// Nested type with family or assembly visibility
    pub const NESTED_FAM_OR_ASSEM: u32 = 0x0000_0007;
    /// Class semantics mask
    pub const CLASS_SEMANTICS_MASK: u32 = 0x0000_0020;
    /// Type is a class
    pub const CLASS: u32 = 0x0000_0000;
    /// Type is an interface
    pub const INTERFACE: u32 = 0x0000_0020;
    /// Type is abstract
    pub const ABSTRACT: u32 = 0x0000_0080;
    /// Type cannot be derived from
    pub const SEALED: u32 = 0x0000_0100;
    /// Name is special
    pub const SPECIAL_NAME: u32 = 0x0000_0400;
}

/// Flags of `MethodDef` rows (II.23.1.10)
pub mod MethodAttributes {
    /// Mask for the 3 member access bits
    pub const MEMBER_ACCESS_MASK: u16 = 0x0007;
    /// Member not referenceable
    pub const COMPILER_CONTROLLED: u16 = 0x0000;
    /// Accessible only by the parent type
    pub const PRIVATE: u16 = 0x0001;
    /// Accessible by sub-types only in this assembly
    pub const FAM_AND_ASSEM: u16 = 0x0002;
    /// Accessible by anyone in the assembly
    pub const ASSEMBLY: u16 = 0x0003;
    /// Accessible only by type and sub-types
    pub const FAMILY: u16 = 0x0004;
    /// Accessible by sub-types anywhere, plus anyone in the assembly
    pub const FAM_OR_ASSEM: u16 = 0x0005;
    /// Accessible by anyone who has visibility to this scope
    pub const PUBLIC: u16 = 0x0006;
    /// Defined on type, else per instance
    pub const STATIC: u16 = 0x0010;
    /// Method cannot be overridden
    pub const FINAL: u16 = 0x0020;
    /// Method is virtual
    pub const VIRTUAL: u16 = 0x0040;
    /// Method hides by name and signature, else just by name
    pub const HIDE_BY_SIG: u16 = 0x0080;
    /// Method always gets a new slot in the vtable
    pub const NEW_SLOT: u16 = 0x0100;
    /// Method does not provide an implementation
    pub const ABSTRACT: u16 = 0x0400;
    /// Method is special
    pub const SPECIAL_NAME: u16 = 0x0800;
    /// CLI provides special behavior, depending upon the name of the method
    pub const RT_SPECIAL_NAME: u16 = 0x1000;
}

/// Flags of `Field` rows (II.23.1.5)
pub mod FieldAttributes {
    /// Mask for the 3 field access bits
    pub const FIELD_ACCESS_MASK: u16 = 0x0007;
    /// Accessible only by the parent type
    pub const PRIVATE: u16 = 0x0001;
    /// Accessible by anyone in the assembly
    pub const ASSEMBLY: u16 = 0x0003;
    /// Accessible by anyone who has visibility to this scope
    pub const PUBLIC: u16 = 0x0006;
    /// Defined on type, else per instance
    pub const STATIC: u16 = 0x0010;
    /// Field can only be initialized, not written to after init
    pub const INIT_ONLY: u16 = 0x0020;
    /// Value is compile time constant
    pub const LITERAL: u16 = 0x0040;
    /// Field is special
    pub const SPECIAL_NAME: u16 = 0x0200;
    /// CLI provides special behavior, depending upon the name of the field
    pub const RT_SPECIAL_NAME: u16 = 0x0400;
    /// Field has a default value in the `Constant` table
    pub const HAS_DEFAULT: u16 = 0x8000;
}

/// Flags of `Param` rows (II.23.1.13)
pub mod ParamAttributes {
    /// Parameter is `[In]`
    pub const IN: u16 = 0x0001;
    /// Parameter is `[Out]`
    pub const OUT: u16 = 0x0002;
    /// Parameter is optional
    pub const OPTIONAL: u16 = 0x0010;
    /// Parameter has a default value in the `Constant` table
    pub const HAS_DEFAULT: u16 = 0x1000;
    /// Parameter has marshalling information
    pub const HAS_FIELD_MARSHAL: u16 = 0x2000;
}

/// Flags of `MethodSemantics` rows (II.23.1.12)
pub mod MethodSemanticsAttributes {
    /// Property setter
    pub const SETTER: u16 = 0x0001;
    /// Property getter
    pub const GETTER: u16 = 0x0002;
    /// Other method for property or event
    pub const OTHER: u16 = 0x0004;
    /// Event add method
    pub const ADD_ON: u16 = 0x0008;
    /// Event remove method
    pub const REMOVE_ON: u16 = 0x0010;
    /// Event fire method
    pub const FIRE: u16 = 0x0020;
}

/// Flags of `GenericParam` rows (II.23.1.7)
pub mod GenericParamAttributes {
    /// Mask for the variance bits
    pub const VARIANCE_MASK: u16 = 0x0003;
    /// Parameter is covariant
    pub const COVARIANT: u16 = 0x0001;
    /// Parameter is contravariant
    pub const CONTRAVARIANT: u16 = 0x0002;
    /// Mask for the special constraint bits
    pub const SPECIAL_CONSTRAINT_MASK: u16 = 0x001C;
    /// Argument must be a reference type
    pub const REFERENCE_TYPE_CONSTRAINT: u16 = 0x0004;
    /// Argument must be a non-nullable value type
    pub const NOT_NULLABLE_VALUE_TYPE_CONSTRAINT: u16 = 0x0008;
    /// Argument must have a public default constructor
    pub const DEFAULT_CONSTRUCTOR_CONSTRAINT: u16 = 0x0010;
}
