// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
//#![deny(unsafe_code)]
// - 'file/physical.rs' uses mmap to map a file into memory

//! # dotreflect
//!
//! A reflection-only type system for ECMA-335 (.NET) modules. `dotreflect` opens module images
//! without loading or executing them and answers the questions a runtime reflection API would:
//! which types a module defines, what they derive from, which members they declare, and what
//! the signatures of those members resolve to across module boundaries.
//!
//! ## Features
//!
//! - **Lazy type graph** - types, members and signatures are materialized on first use and
//!   cached afterwards
//! - **Cross-module resolution** - `TypeRef`s are followed into other modules through a
//!   [`Registry`], with runtime directory probing and a pluggable resolve hook
//! - **Generics** - constructed types and methods, generic parameters and their constraints
//! - **Custom attributes** - constructor and named arguments decoded against resolved types
//! - **No execution** - invocation and field access fail with
//!   [`Error::UnsupportedOperation`]
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use dotreflect::prelude::*;
//!
//! let registry = Registry::new(RegistryConfig::search_runtime(["/usr/share/dotnet/shared"]));
//! let module = registry.open("Library.dll")?;
//!
//! for ty in module.types()? {
//!     println!("{}", ty.full_name());
//!     for method in ty.methods(VisibilityMask::PUBLIC_MEMBERS)? {
//!         println!("    {method}");
//!     }
//! }
//! # Ok::<(), dotreflect::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - [`metadata`] - the parsed image: streams, tables, signatures, tokens and identities
//! - [`registry`] - opened modules, identity resolution and the resolution policy
//! - [`module`] - one module and its token lookups
//! - [`typesystem`] - the [`TypeDescriptor`] graph
//! - [`members`] - methods, fields, properties, events and parameters
//! - [`customattributes`] - attribute constructors and decoded arguments
//! - [`resolver`] - signature resolution in a generic context
//!
//! ## Ownership
//!
//! The [`Registry`] owns its modules, a module owns its type descriptors, and descriptors point
//! back up through weak references. Dropping the registry releases everything; a descriptor
//! that outlives its module answers [`Error::Released`] where it needs the module.

#[macro_use]
pub(crate) mod macros;

#[macro_use]
pub(crate) mod error;
pub(crate) mod file;
pub(crate) mod utils;

/// Shared functionality which is used in unit- and integration-tests
#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types.
///
/// ```rust,no_run
/// use dotreflect::prelude::*;
///
/// let registry = Registry::new(RegistryConfig::default());
/// let module = registry.open("Library.dll")?;
/// println!("{} defines {} types", module.identity().display_name(), module.types()?.len());
/// # Ok::<(), dotreflect::Error>(())
/// ```
pub mod prelude;

/// Definitions, parsing and emission of CIL metadata based on ECMA-335
pub mod metadata;

pub mod customattributes;
pub mod members;
pub mod module;
pub mod registry;
pub mod resolver;
pub mod typesystem;

/// `dotreflect` Result type
///
/// A type alias for [`std::result::Result<T, Error>`] where the error type is always [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// `dotreflect` Error type
///
/// # Examples
///
/// ```rust,no_run
/// use dotreflect::{Error, Registry, RegistryConfig};
///
/// let registry = Registry::new(RegistryConfig::default());
/// match registry.open("Library.dll").and_then(|module| module.types().map(<[_]>::len)) {
///     Ok(count) => println!("{count} types"),
///     Err(Error::UnresolvableModule(name)) => println!("missing dependency {name}"),
///     Err(e) => println!("Error: {e}"),
/// }
/// ```
pub use error::Error;

pub use customattributes::{CustomAttributeData, CustomAttributeRc};
pub use file::{parser::Parser, File};
pub use members::{Event, Field, Member, MemberInfo, Method, Parameter, Property};
pub use metadata::{identity::AssemblyIdentity, token::Token};
pub use module::{Module, ModuleRc};
pub use registry::{Registry, RegistryConfig, RegistryRc, ResolutionMode, ResolveHook};
pub use typesystem::{TypeDescriptor, TypeRc, VisibilityMask};
