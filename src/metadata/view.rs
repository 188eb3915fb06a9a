//! Read-only view over the metadata of one module image.
//!
//! [`MetadataView`] owns the [`File`] and the streams parsed from it. The streams borrow the
//! file bytes, so the view is a self-referencing struct built with `ouroboros`. The view is the
//! only place the engine touches raw bytes: every descriptor goes through its heap accessors and
//! typed tables.
//!
//! # Examples
//!
//! ```rust
//! use dotreflect::metadata::{builder::ImageBuilder, tables::TypeDefRow, view::MetadataView};
//!
//! let mut builder = ImageBuilder::new("Sample");
//! builder.type_def(0x1, "Sample", "Widget", None);
//! let view = MetadataView::from_mem(builder.build()?)?;
//!
//! let widget = view.tables().table::<TypeDefRow>().get(1)?;
//! assert_eq!(view.string(widget.name)?, "Widget");
//! # Ok::<(), dotreflect::Error>(())
//! ```

use std::{path::Path, sync::Arc};

use ouroboros::self_referencing;

use crate::{
    file::File,
    metadata::{
        cor20header::Cor20Header,
        root::Root,
        streams::{Blob, Guid, Strings, TablesHeader},
        tables::TableId,
    },
    Error, Result,
};

/// The streams of a module, borrowing the bytes of its [`File`]
pub struct MetadataViewData<'a> {
    /// The COR20 header, `None` for raw metadata images
    pub cor20header: Option<Cor20Header>,
    /// The metadata root
    pub metadata_root: Root,
    /// The `#~` stream
    pub tables: TablesHeader<'a>,
    /// The `#Strings` heap
    pub strings: Strings<'a>,
    /// The `#Blob` heap
    pub blobs: Option<Blob<'a>>,
    /// The `#GUID` heap
    pub guids: Option<Guid<'a>>,
}

impl<'a> MetadataViewData<'a> {
    /// Locates the metadata root in `file` and parses its streams
    ///
    /// # Errors
    /// Returns an error if the root or a stream is malformed, or if the `#~` or `#Strings`
    /// streams are missing. Images that use the `*Ptr` indirection tables give
    /// [`Error::NotSupported`].
    pub fn from_file(file: &'a File) -> Result<Self> {
        let cor20header = file.cor20header()?;
        let (metadata_offset, metadata_size) = file.metadata_range()?;
        let metadata_slice = file.data_slice(metadata_offset, metadata_size)?;
        let metadata_root = Root::read(metadata_slice)?;

        let mut tables = None;
        let mut strings = None;
        let mut blobs = None;
        let mut guids = None;

        for stream in &metadata_root.stream_headers {
            let start = stream.offset as usize;
            let end = start + stream.size as usize;
            if end > metadata_slice.len() {
                return Err(out_of_bounds_error!());
            }

            let stream_data = &metadata_slice[start..end];
            match stream.name.as_str() {
                "#~" | "#-" => tables = Some(TablesHeader::from(stream_data)?),
                "#Strings" => strings = Some(Strings::from(stream_data)?),
                "#Blob" => blobs = Some(Blob::from(stream_data)?),
                "#GUID" => guids = Some(Guid::from(stream_data)?),
                _ => {}
            }
        }

        let Some(tables) = tables else {
            return Err(malformed_error!("Metadata has no tables stream"));
        };
        let Some(strings) = strings else {
            return Err(malformed_error!("Metadata has no #Strings heap"));
        };

        // Member ranges index the member tables directly; indirection tables are not followed
        if [
            TableId::FieldPtr,
            TableId::MethodPtr,
            TableId::ParamPtr,
            TableId::EventPtr,
            TableId::PropertyPtr,
        ]
        .into_iter()
        .any(|table| tables.row_count(table) > 0)
        {
            return Err(Error::NotSupported);
        }

        Ok(MetadataViewData {
            cor20header,
            metadata_root,
            tables,
            strings,
            blobs,
            guids,
        })
    }
}

/// A loaded module image with its parsed metadata streams
#[self_referencing]
pub struct MetadataView {
    file: Arc<File>,

    #[borrows(file)]
    #[not_covariant]
    data: MetadataViewData<'this>,
}

impl MetadataView {
    /// Maps `path` and parses its metadata
    ///
    /// # Errors
    /// Returns [`crate::Error::FileError`] if the file cannot be read, or any parse error.
    pub fn from_file(path: &Path) -> Result<Self> {
        Self::load(Arc::new(File::from_file(path)?))
    }

    /// Parses the metadata of the image held in `data`
    ///
    /// # Errors
    /// Returns any parse error of the image.
    pub fn from_mem(data: Vec<u8>) -> Result<Self> {
        Self::load(Arc::new(File::from_mem(data)?))
    }

    fn load(file: Arc<File>) -> Result<Self> {
        MetadataView::try_new(file, |file| MetadataViewData::from_file(file))
    }

    /// The COR20 header, `None` for raw metadata images
    #[must_use]
    pub fn cor20header(&self) -> Option<&Cor20Header> {
        self.with_data(|data| data.cor20header.as_ref())
    }

    /// The metadata root
    #[must_use]
    pub fn metadata_root(&self) -> &Root {
        self.with_data(|data| &data.metadata_root)
    }

    /// The runtime version string of the metadata root
    #[must_use]
    pub fn runtime_version(&self) -> &str {
        self.with_data(|data| data.metadata_root.version.as_str())
    }

    /// The tables stream
    #[must_use]
    pub fn tables(&self) -> &TablesHeader<'_> {
        self.with_data(|data| &data.tables)
    }

    /// The `#Strings` heap
    #[must_use]
    pub fn strings(&self) -> &Strings<'_> {
        self.with_data(|data| &data.strings)
    }

    /// The `#Blob` heap, if present
    #[must_use]
    pub fn blobs(&self) -> Option<&Blob<'_>> {
        self.with_data(|data| data.blobs.as_ref())
    }

    /// The `#GUID` heap, if present
    #[must_use]
    pub fn guids(&self) -> Option<&Guid<'_>> {
        self.with_data(|data| data.guids.as_ref())
    }

    /// The underlying file
    #[must_use]
    pub fn file(&self) -> &Arc<File> {
        self.borrow_file()
    }

    /// Reads the string at `index` of the `#Strings` heap
    ///
    /// # Errors
    /// Returns an error if `index` is out of range or the string is not valid UTF-8.
    pub fn string(&self, index: u32) -> Result<&str> {
        self.strings().get(index as usize)
    }

    /// Reads the blob at `index` of the `#Blob` heap
    ///
    /// # Errors
    /// Returns an error if the heap is missing or `index` is invalid.
    pub fn blob(&self, index: u32) -> Result<&[u8]> {
        match self.blobs() {
            Some(blobs) => blobs.get(index as usize),
            None if index == 0 => Ok(&[]),
            None => Err(malformed_error!("Metadata has no #Blob heap")),
        }
    }

    /// Reads the 1-based GUID `index` of the `#GUID` heap; index 0 is the nil GUID
    ///
    /// # Errors
    /// Returns an error if the heap is missing or `index` is invalid.
    pub fn guid(&self, index: u32) -> Result<uguid::Guid> {
        if index == 0 {
            return Ok(uguid::Guid::ZERO);
        }

        match self.guids() {
            Some(guids) => guids.get(index as usize),
            None => Err(malformed_error!("Metadata has no #GUID heap")),
        }
    }
}
