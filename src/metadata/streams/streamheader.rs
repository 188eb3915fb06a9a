use crate::{file::io::read_le, Result};

/// Names a stream header may carry. `#-` is the uncompressed table stream, which is recognized
/// here so the view can report it as unsupported instead of as a corrupted root.
const VALID_STREAM_NAMES: [&str; 6] = ["#Strings", "#US", "#Blob", "#GUID", "#~", "#-"];

/// The header of a stream, indicating location, size and name
pub struct StreamHeader {
    /// Offset of the stream relative to the metadata root
    pub offset: u32,
    /// Size of the stream in bytes
    pub size: u32,
    /// Name of the stream
    pub name: String,
}

impl StreamHeader {
    /// Reads a stream header from the start of `data`
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] for short input and [`crate::Error::Malformed`]
    /// for an unknown stream name.
    pub fn from(data: &[u8]) -> Result<StreamHeader> {
        if data.len() < 9 {
            return Err(out_of_bounds_error!());
        }

        let name_bytes = &data[8..std::cmp::min(data.len(), 8 + 32)];
        let terminator = name_bytes
            .iter()
            .position(|byte| *byte == 0)
            .ok_or_else(|| malformed_error!("Unterminated stream header name"))?;
        let name = String::from_utf8_lossy(&name_bytes[..terminator]).into_owned();

        if !VALID_STREAM_NAMES.contains(&name.as_str()) {
            return Err(malformed_error!("Invalid stream header name - {}", name));
        }

        Ok(StreamHeader {
            offset: read_le::<u32>(data)?,
            size: read_le::<u32>(&data[4..])?,
            name,
        })
    }
}
