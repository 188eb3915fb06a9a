//! # dotreflect Prelude
//!
//! The types needed for most reflection work over .NET modules: the registry and its
//! configuration, modules, type descriptors and members.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all dotreflect operations
pub use crate::Error;

/// The result type used throughout dotreflect
pub use crate::Result;

// ================================================================================================
// Main Entry Points
// ================================================================================================

/// Module cache, identity resolution and resolution policy
pub use crate::registry::{
    Registry, RegistryConfig, RegistryRc, ResolutionMode, ResolveHook,
    DEFAULT_MAX_RESOLUTION_DEPTH,
};

/// One opened module
pub use crate::module::{Module, ModuleRc};

/// Low-level file parsing utilities
pub use crate::{File, Parser};

// ================================================================================================
// Metadata
// ================================================================================================

/// Metadata token type for referencing table entries
pub use crate::metadata::token::{Token, TokenKind};

/// Assembly names and versions
pub use crate::metadata::identity::{AssemblyIdentity, AssemblyVersion, StrongName};

/// Parsed metadata of one image
pub use crate::metadata::view::MetadataView;

/// Signature trees as stored in the blob heap
pub use crate::metadata::signatures::{SignatureMethod, SignatureParameter, TypeSignature};

// ================================================================================================
// Type System
// ================================================================================================

/// Type descriptors and their variants
pub use crate::typesystem::{
    ConstantValue, ConstructedType, DefinedType, GenericOwner, GenericParameter, PrimitiveKind,
    TypeDescriptor, TypeRc, VisibilityMask,
};

/// Signature resolution
pub use crate::resolver::GenericContext;

// ================================================================================================
// Members
// ================================================================================================

/// Methods, fields, properties, events and parameters
pub use crate::members::{
    Event, EventRc, Field, FieldRc, Member, MemberInfo, MemberType, Method, MethodRc, Parameter,
    Property, PropertyRc,
};

/// Custom attributes and their decoded arguments
pub use crate::customattributes::{
    AttributeValue, CustomAttributeData, CustomAttributeNamedArgument, CustomAttributeRc,
    CustomAttributeTypedArgument,
};
