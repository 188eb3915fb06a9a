//! Byte-level access to module images.
//!
//! A [`File`] owns the bytes of one module, either memory-mapped from disk ([`physical`]) or
//! held in memory ([`memory`]), and knows where its metadata root lives. Two layouts are
//! recognized:
//!
//! - **PE images** (`MZ` signature), parsed with `goblin`. The metadata root is located through
//!   the CLR runtime header data directory and the COR20 header.
//! - **Raw metadata images**, which start directly with the `BSJB` metadata root. These are what
//!   [`crate::metadata::builder::ImageBuilder`] produces and what reflection-only tooling often
//!   extracts from larger containers.
//!
//! The parsed PE borrows from the backing bytes, so [`File`] is a self-referencing struct built
//! with `ouroboros`.

pub mod io;
pub mod parser;

mod memory;
mod physical;

use std::path::Path;

use goblin::pe::{data_directories::DataDirectoryType, PE};
use memory::Memory;
use ouroboros::self_referencing;
use physical::Physical;

use crate::{
    file::io::read_le_at,
    metadata::{cor20header::Cor20Header, root::CIL_HEADER_MAGIC},
    Error::{Empty, GoblinErr},
    Result,
};

/// Provides the raw bytes of a module image
pub trait Backend: Send + Sync {
    /// Returns `len` bytes starting at `offset`
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the range passes the end of the data.
    fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]>;

    /// Returns all bytes
    fn data(&self) -> &[u8];

    /// Returns the byte length
    fn len(&self) -> usize;
}

/// The container format of an image
pub enum Layout<'a> {
    /// A PE/COFF image with a CLR runtime header
    Pe(Box<PE<'a>>),
    /// A bare metadata root (`BSJB` at offset 0)
    Metadata,
}

/// A loaded module image.
#[self_referencing]
pub struct File {
    data: Box<dyn Backend>,
    #[borrows(data)]
    #[not_covariant]
    layout: Layout<'this>,
}

impl File {
    /// Maps the file at `file` and detects its layout
    ///
    /// # Errors
    /// Returns [`crate::Error::FileError`] if the file cannot be read, [`crate::Error::Empty`]
    /// for an empty file, and [`crate::Error::Malformed`] / [`crate::Error::GoblinErr`] when
    /// the bytes are neither a managed PE image nor a metadata image.
    pub fn from_file(file: &Path) -> Result<File> {
        let input = Physical::new(file)?;

        Self::load(input)
    }

    /// Takes ownership of `data` and detects its layout
    ///
    /// # Errors
    /// Same as [`File::from_file`], minus the I/O errors.
    pub fn from_mem(data: Vec<u8>) -> Result<File> {
        let input = Memory::new(data);

        Self::load(input)
    }

    fn load<T: Backend + 'static>(data: T) -> Result<File> {
        if data.len() == 0 {
            return Err(Empty);
        }

        let data = Box::new(data);

        File::try_new(data, |data| {
            let data = data.data();
            let mut offset = 0;
            if data.len() >= 4 && read_le_at::<u32>(data, &mut offset)? == CIL_HEADER_MAGIC {
                return Ok(Layout::Metadata);
            }

            match PE::parse(data) {
                Ok(pe) => match pe.header.optional_header {
                    Some(optional_header) => {
                        if optional_header
                            .data_directories
                            .get_clr_runtime_header()
                            .is_none()
                        {
                            Err(malformed_error!(
                                "File does not have a CLR runtime header directory"
                            ))
                        } else {
                            Ok(Layout::Pe(Box::new(pe)))
                        }
                    }
                    None => Err(malformed_error!("File does not have an OptionalHeader")),
                },
                Err(error) => Err(GoblinErr(error)),
            }
        })
    }

    /// Returns the size of the image in bytes
    #[must_use]
    pub fn len(&self) -> usize {
        self.data().len()
    }

    /// Returns true if the image has no bytes
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true for PE images, false for raw metadata images
    #[must_use]
    pub fn is_pe(&self) -> bool {
        self.with_layout(|layout| matches!(layout, Layout::Pe(_)))
    }

    /// Returns all bytes of the image
    #[must_use]
    pub fn data(&self) -> &[u8] {
        self.with_data(|data| data.data())
    }

    /// Returns `len` bytes starting at `offset`
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the range passes the end of the image.
    pub fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]> {
        self.with_data(|data| data.data_slice(offset, len))
    }

    /// Returns the RVA and size of the CLR runtime header, or `None` for raw metadata images
    #[must_use]
    pub fn clr(&self) -> Option<(usize, usize)> {
        self.with_layout(|layout| match layout {
            Layout::Pe(pe) => pe
                .header
                .optional_header?
                .data_directories
                .dirs()
                .find(|(directory_type, _)| *directory_type == DataDirectoryType::ClrRuntimeHeader)
                .map(|(_, directory)| (directory.virtual_address as usize, directory.size as usize)),
            Layout::Metadata => None,
        })
    }

    /// Translates a relative virtual address into a file offset
    ///
    /// Raw metadata images have no sections; there the RVA is the offset.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if no section contains `rva`.
    pub fn rva_to_offset(&self, rva: usize) -> Result<usize> {
        self.with_layout(|layout| {
            let Layout::Pe(pe) = layout else {
                return Ok(rva);
            };

            let rva_u32 =
                u32::try_from(rva).map_err(|_| malformed_error!("RVA too large to fit in u32: {}", rva))?;

            for section in &pe.sections {
                let Some(section_max) = section.virtual_address.checked_add(section.virtual_size)
                else {
                    return Err(malformed_error!(
                        "Section malformed, causing integer overflow - {} + {}",
                        section.virtual_address,
                        section.virtual_size
                    ));
                };

                if section.virtual_address <= rva_u32 && section_max > rva_u32 {
                    return Ok((rva - section.virtual_address as usize)
                        + section.pointer_to_raw_data as usize);
                }
            }

            Err(malformed_error!(
                "RVA could not be converted to offset - {}",
                rva
            ))
        })
    }

    /// Reads the COR20 header of a PE image. Raw metadata images have none.
    ///
    /// # Errors
    /// Returns an error if the header lies outside the image or is malformed.
    pub fn cor20header(&self) -> Result<Option<Cor20Header>> {
        let Some((clr_rva, clr_size)) = self.clr() else {
            return Ok(None);
        };

        let clr_offset = self.rva_to_offset(clr_rva)?;
        let header = Cor20Header::read(self.data_slice(clr_offset, clr_size)?)?;
        Ok(Some(header))
    }

    /// Returns the file offset and length of the metadata root
    ///
    /// # Errors
    /// Returns an error if the COR20 header is malformed or points outside the image.
    pub fn metadata_range(&self) -> Result<(usize, usize)> {
        match self.cor20header()? {
            Some(header) => {
                let offset = self.rva_to_offset(header.meta_data_rva as usize)?;
                let size = header.meta_data_size as usize;
                // Validate the range up front so later slicing cannot fail.
                self.data_slice(offset, size)?;
                Ok((offset, size))
            }
            None => Ok((0, self.len())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{metadata::builder::ImageBuilder, Error};

    #[test]
    fn raw_metadata_layout() {
        let image = ImageBuilder::new("Layout").build().unwrap();
        let length = image.len();
        let file = File::from_mem(image).unwrap();

        assert!(!file.is_pe());
        assert!(file.clr().is_none());
        assert_eq!(file.metadata_range().unwrap(), (0, length));
        assert_eq!(file.rva_to_offset(0x40).unwrap(), 0x40);
    }

    #[test]
    fn empty_input() {
        assert!(matches!(File::from_mem(Vec::new()), Err(Error::Empty)));
    }

    #[test]
    fn garbage_input() {
        let result = File::from_mem(vec![0xAB; 256]);
        assert!(result.is_err());
    }

    #[test]
    fn from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Disk.dll");
        std::fs::write(&path, ImageBuilder::new("Disk").build().unwrap()).unwrap();

        let file = File::from_file(&path).unwrap();
        assert!(!file.is_pe());
        assert!(file.len() > 0);
    }
}
