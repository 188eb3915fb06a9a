//! The `#~` tables stream header (ECMA-335 II.24.2.6).
//!
//! The header carries the schema version, the heap size flags, the bit vectors of present and
//! sorted tables and one row count per present table. The rows of all present tables follow
//! back to back in table order.

use strum::{EnumCount, IntoEnumIterator};

use crate::{
    file::io::{read_le, read_le_at},
    metadata::tables::{MetadataTable, RowReadable, TableId, TableInfo},
    Result,
};

/// The parsed tables stream
pub struct TablesHeader<'a> {
    /// Schema major version, 2
    pub major_version: u8,
    /// Schema minor version, 0
    pub minor_version: u8,
    /// Bit vector of present tables
    pub valid: u64,
    /// Bit vector of sorted tables
    pub sorted: u64,
    /// Row counts and index widths
    pub info: TableInfo,
    data: &'a [u8],
    table_offsets: Vec<usize>,
}

impl<'a> TablesHeader<'a> {
    /// Parses the tables stream in `data`
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the header or the rows are truncated and
    /// [`crate::Error::Malformed`] if no table is present.
    pub fn from(data: &'a [u8]) -> Result<TablesHeader<'a>> {
        if data.len() < 24 {
            return Err(out_of_bounds_error!());
        }

        let valid = read_le::<u64>(&data[8..])?;
        if valid == 0 {
            return Err(malformed_error!("No valid rows in any of the tables"));
        }

        let heap_sizes = read_le::<u8>(&data[6..])?;
        let mut offset = 24_usize;
        let mut row_counts = vec![0_u32; TableId::COUNT];
        for bit in 0..64_usize {
            if valid & (1 << bit) == 0 {
                continue;
            }

            let rows = read_le_at::<u32>(data, &mut offset)?;
            if let Some(count) = row_counts.get_mut(bit) {
                *count = rows;
            }
        }

        // Extra data flag of unoptimized streams
        if heap_sizes & 0x40 != 0 {
            offset += 4;
        }

        let info = TableInfo::new(&row_counts, heap_sizes);
        let mut table_offsets = vec![0_usize; TableId::COUNT];
        for table in TableId::iter() {
            table_offsets[table as usize] = offset;
            let size = info.row_size(table) * info.row_count(table) as usize;
            offset = offset
                .checked_add(size)
                .ok_or_else(|| malformed_error!("Table {:?} overflows the stream", table))?;
        }

        if offset > data.len() {
            return Err(out_of_bounds_error!());
        }

        Ok(TablesHeader {
            major_version: read_le::<u8>(&data[4..])?,
            minor_version: read_le::<u8>(&data[5..])?,
            valid,
            sorted: read_le::<u64>(&data[16..])?,
            info,
            data,
            table_offsets,
        })
    }

    /// Returns the number of present tables
    #[must_use]
    pub fn table_count(&self) -> u32 {
        self.valid.count_ones()
    }

    /// Returns the number of rows of `table`
    #[must_use]
    pub fn row_count(&self, table: TableId) -> u32 {
        self.info.row_count(table)
    }

    /// True if `table` holds at least one row
    #[must_use]
    pub fn has_table(&self, table: TableId) -> bool {
        self.row_count(table) > 0
    }

    /// Returns typed access to the rows of `T::TABLE`; absent tables have no rows
    #[must_use]
    pub fn table<T: RowReadable>(&self) -> MetadataTable<'_, T> {
        let start = self.table_offsets[T::TABLE as usize];
        MetadataTable::new(&self.data[start..], self.row_count(T::TABLE), &self.info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::tables::{FieldRow, ModuleRow, TypeDefRow};

    #[test]
    #[rustfmt::skip]
    fn crafted() {
        let data = [
            0x00, 0x00, 0x00, 0x00,                         // reserved
            0x02, 0x00,                                     // version 2.0
            0x00,                                           // heap sizes
            0x01,                                           // reserved
            0x15, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // valid: Module, TypeDef, Field
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // sorted
            0x01, 0x00, 0x00, 0x00,                         // Module rows
            0x01, 0x00, 0x00, 0x00,                         // TypeDef rows
            0x02, 0x00, 0x00, 0x00,                         // Field rows
            // Module
            0x00, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00,
            // TypeDef
            0x00, 0x00, 0x00, 0x00, 0x0A, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0x01, 0x00,
            // Field
            0x06, 0x00, 0x10, 0x00, 0x01, 0x00,
            0x11, 0x00, 0x14, 0x00, 0x04, 0x00,
        ];

        let header = TablesHeader::from(&data).unwrap();

        assert_eq!(header.major_version, 2);
        assert_eq!(header.table_count(), 3);
        assert_eq!(header.row_count(TableId::Field), 2);
        assert!(!header.has_table(TableId::MethodDef));

        let module = header.table::<ModuleRow>().get(1).unwrap();
        assert_eq!(module.name, 1);
        assert_eq!(module.mvid, 1);

        let typedef = header.table::<TypeDefRow>().get(1).unwrap();
        assert_eq!(typedef.name, 10);
        assert_eq!(typedef.field_list, 1);

        let fields: Vec<FieldRow> = header
            .table::<FieldRow>()
            .iter()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[1].flags, 0x11);
        assert_eq!(fields[1].name, 0x14);
        assert_eq!(fields[1].signature, 4);

        assert!(header.table::<FieldRow>().get(3).is_err());
        assert_eq!(header.table::<TypeDefRow>().iter().count(), 1);
    }

    #[test]
    fn truncated_rows() {
        let mut data = vec![0_u8; 28];
        data[8] = 0x01;
        data[24] = 0x05;

        assert!(TablesHeader::from(&data).is_err());
    }

    #[test]
    fn no_tables() {
        assert!(TablesHeader::from(&[0_u8; 24]).is_err());
    }
}
