use std::ffi::CStr;

use crate::Result;

/// The `#Strings` heap: null-terminated UTF-8 identifiers addressed by byte offset.
///
/// Offset 0 is always the empty string.
pub struct Strings<'a> {
    data: &'a [u8],
}

impl<'a> Strings<'a> {
    /// Wraps the heap bytes
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the heap does not start with the empty string.
    pub fn from(data: &'a [u8]) -> Result<Strings<'a>> {
        if data.is_empty() || data[0] != 0 {
            return Err(malformed_error!("Provided #String heap is empty"));
        }

        Ok(Strings { data })
    }

    /// Returns the string at byte offset `index`
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] past the heap end and [`crate::Error::Malformed`]
    /// for unterminated or non UTF-8 data.
    pub fn get(&self, index: usize) -> Result<&'a str> {
        if index >= self.data.len() {
            return Err(out_of_bounds_error!());
        }

        CStr::from_bytes_until_nul(&self.data[index..])
            .map_err(|_| malformed_error!("Unterminated string at index - {}", index))?
            .to_str()
            .map_err(|_| malformed_error!("Invalid string at index - {}", index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crafted() {
        let data = b"\0<Module>\0System.Runtime\0List`1\0";
        let strings = Strings::from(data).unwrap();

        assert_eq!(strings.get(0).unwrap(), "");
        assert_eq!(strings.get(1).unwrap(), "<Module>");
        assert_eq!(strings.get(10).unwrap(), "System.Runtime");
        // Offsets into the middle of a string are valid and yield its suffix
        assert_eq!(strings.get(17).unwrap(), "Runtime");
        assert_eq!(strings.get(25).unwrap(), "List`1");
        assert!(strings.get(data.len()).is_err());
    }

    #[test]
    fn invalid_heap() {
        assert!(Strings::from(b"abc\0").is_err());
        assert!(Strings::from(b"").is_err());
        assert!(Strings::from(b"\0abc").unwrap().get(1).is_err());
    }
}
