use std::marker::PhantomData;

use crate::{
    metadata::tables::{TableId, TableInfo},
    Result,
};

/// A typed row that can be read from a table stream
pub trait RowReadable: Sized + Send {
    /// The table holding rows of this type
    const TABLE: TableId;

    /// Returns the byte width of one row
    #[must_use]
    fn row_size(sizes: &TableInfo) -> usize {
        sizes.row_size(Self::TABLE)
    }

    /// Reads the row `rid` at `offset` and advances `offset` past it
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] for truncated data or an invalid coded index.
    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfo) -> Result<Self>;
}

/// Random access to the rows of one metadata table
pub struct MetadataTable<'a, T> {
    data: &'a [u8],
    row_count: u32,
    row_size: usize,
    sizes: &'a TableInfo,
    _phantom: PhantomData<T>,
}

impl<'a, T: RowReadable> MetadataTable<'a, T> {
    /// Creates a table over `data`, which starts at the first row
    #[must_use]
    pub fn new(data: &'a [u8], row_count: u32, sizes: &'a TableInfo) -> Self {
        MetadataTable {
            data,
            row_count,
            row_size: T::row_size(sizes),
            sizes,
            _phantom: PhantomData,
        }
    }

    /// Returns the byte size of the table
    #[must_use]
    pub fn size(&self) -> usize {
        self.row_count as usize * self.row_size
    }

    /// Returns the byte width of one row
    #[must_use]
    pub fn row_size(&self) -> usize {
        self.row_size
    }

    /// Returns the number of rows
    #[must_use]
    pub fn row_count(&self) -> u32 {
        self.row_count
    }

    /// Reads the 1-based row `rid`
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if `rid` is 0 or past the last row.
    pub fn get(&self, rid: u32) -> Result<T> {
        if rid == 0 || rid > self.row_count {
            return Err(out_of_bounds_error!());
        }

        let mut offset = (rid as usize - 1) * self.row_size;
        T::row_read(self.data, &mut offset, rid, self.sizes)
    }

    /// Iterates all rows in order
    #[must_use]
    pub fn iter(&self) -> TableIterator<'_, 'a, T> {
        TableIterator {
            table: self,
            current_row: 0,
        }
    }
}

/// Iterator over the rows of a [`MetadataTable`]
pub struct TableIterator<'t, 'a, T> {
    table: &'t MetadataTable<'a, T>,
    current_row: u32,
}

impl<T: RowReadable> Iterator for TableIterator<'_, '_, T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current_row >= self.table.row_count {
            return None;
        }

        self.current_row += 1;
        Some(self.table.get(self.current_row))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.table.row_count - self.current_row) as usize;
        (remaining, Some(remaining))
    }
}
