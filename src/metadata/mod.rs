//! Metadata parsing for ECMA-335 module images.
//!
//! This module holds everything below the type system: the metadata root and its streams, the
//! raw table decoder, signature blobs, tokens and assembly identities. The type system in
//! [`crate::typesystem`] only ever reads metadata through a [`view::MetadataView`].
//!
//! # Key Components
//!
//! - [`view`] - self-referencing owner of an image and its parsed streams
//! - [`tables`] - table schemas, index widths and typed rows
//! - [`signatures`] - signature blob parsing and encoding
//! - [`token`] - metadata tokens and token kinds
//! - [`identity`] - assembly names, versions and public key tokens
//! - [`builder`] - emits metadata-only images
//!
//! # Examples
//!
//! ```rust
//! use dotreflect::metadata::{builder::ImageBuilder, tables::TableId, view::MetadataView};
//!
//! let view = MetadataView::from_mem(ImageBuilder::new("Sample").build()?)?;
//! assert_eq!(view.runtime_version(), "v4.0.30319");
//! assert_eq!(view.tables().row_count(TableId::TypeDef), 1);
//! # Ok::<(), dotreflect::Error>(())
//! ```

/// Builder for metadata-only images
pub mod builder;
/// Implementation of the Header of CIL
pub mod cor20header;
/// Assembly names and strong name tokens
pub mod identity;
/// Implementation of the root metadata structure
pub mod root;
/// Implementation of method and type signatures
pub mod signatures;
/// Implementation of all metadata streams (tables, heaps, etc.)
pub mod streams;
/// Implementation of the .NET metadata tables
pub mod tables;
/// Commonly used metadata token type
pub mod token;
/// Parsed view over the metadata of one image
pub mod view;
