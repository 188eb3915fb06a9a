//! The metadata streams of a module.
//!
//! - [`StreamHeader`] - name, offset and size of one stream inside the metadata root
//! - [`Strings`] - the `#Strings` heap of identifier names
//! - [`Blob`] - the `#Blob` heap of signatures, constants and custom attribute values
//! - [`Guid`] - the `#GUID` heap holding the module version id
//! - [`TablesHeader`] - the compressed `#~` table stream

mod blob;
mod guid;
mod streamheader;
mod strings;
mod tablesheader;

pub use blob::Blob;
pub use guid::Guid;
pub use streamheader::StreamHeader;
pub use strings::Strings;
pub use tablesheader::TablesHeader;
