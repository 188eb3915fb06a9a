//! Little-endian primitive reads over byte slices.
//!
//! Every metadata structure (root, stream headers, table rows, signature blobs) is stored
//! little-endian. [`CilIO`] abstracts over the primitive widths so a single generic
//! [`read_le_at`] covers them all, and [`read_le_at_dyn`] handles the 2-or-4 byte heap and
//! table indexes whose width depends on the heap size flags and row counts.
//!
//! All reads are bounds-checked and return [`crate::Error::OutOfBounds`] instead of panicking.

use crate::{Error::OutOfBounds, Result};

/// A primitive that can be decoded from (and encoded to) a fixed number of little-endian bytes.
pub trait CilIO: Sized {
    /// The byte array type of this primitive, e.g. `[u8; 4]` for `u32`
    type Bytes: Sized + for<'a> TryFrom<&'a [u8]>;

    /// Builds the value from little-endian bytes
    fn from_le_bytes(bytes: Self::Bytes) -> Self;

    /// Encodes the value as little-endian bytes
    fn to_le_bytes(self) -> Self::Bytes;
}

macro_rules! impl_cil_io {
    ($($ty:ty => $len:literal),* $(,)?) => {
        $(
            impl CilIO for $ty {
                type Bytes = [u8; $len];

                fn from_le_bytes(bytes: Self::Bytes) -> Self {
                    <$ty>::from_le_bytes(bytes)
                }

                fn to_le_bytes(self) -> Self::Bytes {
                    <$ty>::to_le_bytes(self)
                }
            }
        )*
    };
}

impl_cil_io!(
    u8 => 1, i8 => 1,
    u16 => 2, i16 => 2,
    u32 => 4, i32 => 4,
    u64 => 8, i64 => 8,
    f32 => 4, f64 => 8,
);

/// Reads a `T` from the start of `data`.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if `data` is shorter than `T`.
pub fn read_le<T: CilIO>(data: &[u8]) -> Result<T> {
    let mut offset = 0_usize;
    read_le_at(data, &mut offset)
}

/// Reads a `T` at `offset` and advances `offset` past it.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if the read would pass the end of `data`.
pub fn read_le_at<T: CilIO>(data: &[u8], offset: &mut usize) -> Result<T> {
    let type_len = std::mem::size_of::<T>();
    let Some(end) = offset.checked_add(type_len) else {
        return Err(OutOfBounds);
    };

    if end > data.len() {
        return Err(OutOfBounds);
    }

    let Ok(bytes) = data[*offset..end].try_into() else {
        return Err(OutOfBounds);
    };

    *offset = end;
    Ok(T::from_le_bytes(bytes))
}

/// Reads a 4 byte value when `is_large` is set and a 2 byte value otherwise.
///
/// Heap indexes and table indexes are stored in either width depending on the heap sizes
/// and row counts of the image.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if the read would pass the end of `data`.
pub fn read_le_at_dyn(data: &[u8], offset: &mut usize, is_large: bool) -> Result<u32> {
    if is_large {
        read_le_at::<u32>(data, offset)
    } else {
        Ok(u32::from(read_le_at::<u16>(data, offset)?))
    }
}

/// Appends `value` as little-endian bytes to `buffer`.
pub fn write_le<T: CilIO>(buffer: &mut Vec<u8>, value: T)
where
    T::Bytes: AsRef<[u8]>,
{
    buffer.extend_from_slice(value.to_le_bytes().as_ref());
}

/// Appends `value` with 4 bytes when `is_large` is set and 2 bytes otherwise.
///
/// # Errors
/// Returns [`crate::Error::Malformed`] if a small index does not fit into 2 bytes.
pub fn write_le_dyn(buffer: &mut Vec<u8>, value: u32, is_large: bool) -> Result<()> {
    if is_large {
        write_le(buffer, value);
    } else {
        let narrow = u16::try_from(value)
            .map_err(|_| malformed_error!("Index {} does not fit a 2 byte column", value))?;
        write_le(buffer, narrow);
    }

    Ok(())
}
