//! Raw decoding of the metadata tables in the `#~` stream.
//!
//! The tables stream stores rows of fixed width per table. Column widths vary per image: heap
//! indexes are 2 or 4 bytes depending on the `HeapSizes` flags, and row and coded indexes are
//! 2 or 4 bytes depending on the row counts of the referenced tables. [`TableInfo`] computes
//! these widths once, [`TableId::columns`] describes every table layout, and the typed rows in
//! [`rows`] read the columns the resolution engine needs.
//!
//! # Key Types
//! - [`TableId`] - the table kinds by their bit in the valid vector
//! - [`TableInfo`] - row counts and derived index widths
//! - [`CodedIndex`] / [`CodedIndexType`] - tagged multi-table references
//! - [`MetadataTable`] - random access and iteration over typed rows
//!
//! # Examples
//!
//! ```rust
//! use dotreflect::metadata::tables::{TableId, TableInfo};
//!
//! let info = TableInfo::from_row_counts(&[(TableId::TypeDef, 4)], 0);
//! assert_eq!(info.row_size(TableId::Field), 6);
//! ```

mod attributes;
mod codedindex;
mod rows;
mod table;
mod tableid;
mod tableinfo;

pub use attributes::*;
pub use codedindex::{CodedIndex, CodedIndexType};
pub use rows::*;
pub use table::{MetadataTable, RowReadable, TableIterator};
pub use tableid::{Column, TableId};
pub use tableinfo::{TableInfo, TableRowInfo};

/// The largest number of columns of any table (`Assembly`, `AssemblyRef`)
pub const MAX_COLUMNS: usize = 9;
