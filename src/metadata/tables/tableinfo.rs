use strum::{EnumCount, IntoEnumIterator};

use crate::metadata::tables::{CodedIndexType, Column, TableId};

/// Row count and index width of one table
#[derive(Clone, Copy, Default, PartialEq, Debug)]
pub struct TableRowInfo {
    /// Number of rows
    pub rows: u32,
    /// Bits needed to address every row
    pub bits: u8,
    /// True if indexes into this table take 4 bytes
    pub is_large: bool,
}

impl TableRowInfo {
    /// Computes the index width for a table with `rows` rows
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn new(rows: u32) -> Self {
        let bits = if rows == 0 {
            1
        } else {
            (32 - rows.leading_zeros()) as u8
        };

        Self {
            rows,
            bits,
            is_large: rows > u32::from(u16::MAX),
        }
    }
}

/// Row counts and index widths of all tables of one `#~` stream.
///
/// Column widths depend on the heap size flags (2 or 4 byte heap indexes) and on the row counts
/// of the referenced tables, so every row size is derived from this structure.
#[derive(Clone, Debug)]
pub struct TableInfo {
    rows: Vec<TableRowInfo>,
    coded_indexes: Vec<u8>,
    is_large_index_str: bool,
    is_large_index_guid: bool,
    is_large_index_blob: bool,
}

impl TableInfo {
    /// Builds the index widths for `row_counts` (indexed by [`TableId`]) and the `HeapSizes`
    /// byte of the tables header
    #[must_use]
    pub fn new(row_counts: &[u32], heap_size_flags: u8) -> Self {
        let rows = TableId::iter()
            .map(|table| TableRowInfo::new(row_counts.get(table as usize).copied().unwrap_or(0)))
            .collect();

        let mut table_info = TableInfo {
            rows,
            coded_indexes: vec![0; CodedIndexType::COUNT],
            is_large_index_str: heap_size_flags & 1 == 1,
            is_large_index_guid: heap_size_flags & 2 == 2,
            is_large_index_blob: heap_size_flags & 4 == 4,
        };

        table_info.calculate_coded_index_bits();
        table_info
    }

    /// Builds the index widths from `(table, rows)` pairs
    #[must_use]
    pub fn from_row_counts(counts: &[(TableId, u32)], heap_size_flags: u8) -> Self {
        let mut row_counts = vec![0_u32; TableId::COUNT];
        for (table, rows) in counts {
            row_counts[*table as usize] = *rows;
        }

        Self::new(&row_counts, heap_size_flags)
    }

    /// Returns the row information of `table`
    #[must_use]
    pub fn get(&self, table: TableId) -> &TableRowInfo {
        &self.rows[table as usize]
    }

    /// Returns the number of rows of `table`
    #[must_use]
    pub fn row_count(&self, table: TableId) -> u32 {
        self.rows[table as usize].rows
    }

    /// True if indexes into `table` take 4 bytes
    #[must_use]
    pub fn is_large(&self, table: TableId) -> bool {
        self.rows[table as usize].is_large
    }

    /// True if `#Strings` indexes take 4 bytes
    #[must_use]
    pub fn is_large_str(&self) -> bool {
        self.is_large_index_str
    }

    /// True if `#GUID` indexes take 4 bytes
    #[must_use]
    pub fn is_large_guid(&self) -> bool {
        self.is_large_index_guid
    }

    /// True if `#Blob` indexes take 4 bytes
    #[must_use]
    pub fn is_large_blob(&self) -> bool {
        self.is_large_index_blob
    }

    /// The `HeapSizes` byte describing the heap index widths
    #[must_use]
    pub fn heap_size_flags(&self) -> u8 {
        u8::from(self.is_large_index_str)
            | (u8::from(self.is_large_index_guid) << 1)
            | (u8::from(self.is_large_index_blob) << 2)
    }

    /// Returns the number of bits a coded index of `coded_index_type` needs
    #[must_use]
    pub fn coded_index_bits(&self, coded_index_type: CodedIndexType) -> u8 {
        self.coded_indexes[coded_index_type as usize]
    }

    /// True if a coded index of `coded_index_type` takes 4 bytes
    #[must_use]
    pub fn is_large_coded(&self, coded_index_type: CodedIndexType) -> bool {
        self.coded_index_bits(coded_index_type) > 16
    }

    /// Returns the byte width of `column`
    #[must_use]
    pub fn column_size(&self, column: Column) -> usize {
        let is_large = match column {
            Column::U16 => false,
            Column::U32 => true,
            Column::Str => self.is_large_index_str,
            Column::Guid => self.is_large_index_guid,
            Column::Blob => self.is_large_index_blob,
            Column::Index(table) => self.is_large(table),
            Column::Coded(coded) => self.is_large_coded(coded),
        };

        if is_large {
            4
        } else {
            2
        }
    }

    /// Returns the byte width of one row of `table`
    #[must_use]
    pub fn row_size(&self, table: TableId) -> usize {
        table
            .columns()
            .iter()
            .map(|column| self.column_size(*column))
            .sum()
    }

    #[allow(clippy::cast_possible_truncation)]
    fn calculate_coded_index_bits(&mut self) {
        for coded_index in CodedIndexType::iter() {
            let max_bits = coded_index
                .tables()
                .iter()
                .map(|table| self.rows[*table as usize].bits)
                .max()
                .unwrap_or(1);

            self.coded_indexes[coded_index as usize] = max_bits + coded_index.tag_bits() as u8;
        }
    }
}
