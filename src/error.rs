use thiserror::Error;

use crate::metadata::token::Token;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

macro_rules! out_of_bounds_error {
    () => {
        crate::Error::OutOfBounds
    };
}

/// The error type returned by every fallible operation of this library.
///
/// The variants fall into three groups:
///
/// ## Resolution errors
/// - [`Error::InvalidToken`] - A token of the wrong kind was passed to a lookup
/// - [`Error::TokenOutOfRange`] - A token or generic position outside its collection
/// - [`Error::UnresolvedType`] - A type reference could not be found in its scope
/// - [`Error::UnresolvableModule`] - No module matches a requested assembly identity
/// - [`Error::ArityMismatch`] - Wrong number of generic arguments
/// - [`Error::ForeignTypeArgument`] - A generic argument produced by a different registry
/// - [`Error::UnsupportedOperation`] - An operation that needs a live runtime
///
/// ## Decoding errors
/// - [`Error::Malformed`] - Corrupted or invalid metadata
/// - [`Error::OutOfBounds`] - A read beyond the end of a buffer
/// - [`Error::NotSupported`] - A valid but unsupported format (e.g. uncompressed `#-` tables)
/// - [`Error::RecursionLimit`] - A signature or resolution nested too deeply
///
/// ## Type system errors
/// - [`Error::NotGenericDefinition`], [`Error::NotAnEnum`], [`Error::MissingEnumBackingField`],
///   [`Error::NotPrimitive`]
/// - [`Error::Released`] - The module or registry behind a descriptor has been dropped
///
/// # Examples
///
/// ```rust,no_run
/// use dotreflect::{Error, Registry, RegistryConfig};
///
/// let registry = Registry::new(RegistryConfig::default());
/// match registry.open("Library.dll") {
///     Ok(module) => println!("opened {}", module.name()),
///     Err(Error::FileError(io_err)) => eprintln!("I/O error: {io_err}"),
///     Err(Error::Malformed { message, file, line }) => {
///         eprintln!("Malformed module: {message} ({file}:{line})");
///     }
///     Err(e) => eprintln!("Other error: {e}"),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// A token does not belong to the table the lookup expects.
    #[error("Token {token} is not a valid {expected} token")]
    InvalidToken {
        /// The offending token
        token: Token,
        /// The expected token kind
        expected: &'static str,
    },

    /// A token (or generic parameter position) lies outside the collection it addresses.
    #[error("Token {0} is out of range")]
    TokenOutOfRange(Token),

    /// A type reference could not be resolved within its resolution scope.
    #[error("Unable to resolve type - {0}")]
    UnresolvedType(String),

    /// No open module, runtime probe or hook produced a module for this identity.
    #[error("Cannot resolve assembly {0}. Automatic resolution can be enabled with Registry::set_resolution_mode")]
    UnresolvableModule(String),

    /// The number of generic arguments does not equal the arity of the definition.
    #[error("Expected {expected} generic argument(s), but {actual} were provided")]
    ArityMismatch {
        /// Number of generic parameters on the definition
        expected: usize,
        /// Number of arguments supplied
        actual: usize,
    },

    /// A generic argument was produced by a different registry.
    #[error("The type argument '{0}' belongs to a different registry")]
    ForeignTypeArgument(String),

    /// The operation needs a live runtime (invocation, field access).
    #[error("Unsupported operation - {0}")]
    UnsupportedOperation(&'static str),

    /// The metadata is damaged and could not be parsed.
    ///
    /// Carries the source location where the malformation was detected.
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// An out of bound access was attempted while parsing.
    #[error("Out of Bound read would have occurred!")]
    OutOfBounds,

    /// This file type or metadata layout is not supported.
    #[error("This file type is not supported")]
    NotSupported,

    /// Provided input was empty.
    #[error("Provided input was empty")]
    Empty,

    /// File I/O error.
    #[error("{0}")]
    FileError(#[from] std::io::Error),

    /// Error from the goblin crate during PE parsing.
    #[error("{0}")]
    GoblinErr(#[from] goblin::error::Error),

    /// Recursion limit reached while parsing or resolving a signature.
    ///
    /// The associated value is the limit that was exceeded.
    #[error("Reach the maximum recursion level allowed - {0}")]
    RecursionLimit(usize),

    /// Failed to lock target.
    #[error("Failed to lock target")]
    LockError,

    /// `construct` or `make_generic_method` was called on a non-generic definition.
    #[error("{0} is not a generic definition")]
    NotGenericDefinition(String),

    /// An enum-only query was made on a type that is not an enum.
    #[error("{0} is not an enum")]
    NotAnEnum(String),

    /// The enum has no `value__` instance field.
    #[error("Enum {0} has no value__ backing field")]
    MissingEnumBackingField(String),

    /// The type maps to no primitive type code.
    #[error("{0} is not a primitive type")]
    NotPrimitive(String),

    /// The module or registry a descriptor points back to has been dropped.
    #[error("The owning module or registry has been released")]
    Released,
}
