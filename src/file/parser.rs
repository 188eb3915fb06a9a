//! Cursor-based parser for metadata blobs.
//!
//! [`Parser`] walks a byte slice and provides the ECMA-335 encodings used by signature and
//! custom attribute blobs:
//!
//! - little-endian primitives ([`Parser::read_le`])
//! - compressed unsigned and signed integers (II.23.2)
//! - compressed `TypeDefOrRefOrSpec` tokens
//! - null-terminated and length-prefixed UTF-8 strings
//!
//! # Examples
//!
//! ```rust
//! use dotreflect::Parser;
//!
//! let data = [0x81, 0x00, 0x03, b'a', b'b', b'c'];
//! let mut parser = Parser::new(&data);
//!
//! assert_eq!(parser.read_compressed_uint()?, 0x100);
//! assert_eq!(parser.read_compressed_string_utf8()?, "abc");
//! # Ok::<(), dotreflect::Error>(())
//! ```

use crate::{
    file::io::{read_le_at, CilIO},
    metadata::token::Token,
    Result,
};

/// A forward-only reader over a borrowed byte slice.
pub struct Parser<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> Parser<'a> {
    /// Create a new `Parser` over `data`, positioned at its start
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Parser { data, position: 0 }
    }

    /// Returns the total length of the underlying data
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the underlying data is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns true while unread bytes remain
    #[must_use]
    pub fn has_more_data(&self) -> bool {
        self.position < self.data.len()
    }

    /// Moves the cursor to `pos`
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if `pos` is past the end of the data.
    pub fn seek(&mut self, pos: usize) -> Result<()> {
        if pos > self.data.len() {
            return Err(out_of_bounds_error!());
        }

        self.position = pos;
        Ok(())
    }

    /// Skips `step` bytes
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if fewer than `step` bytes remain.
    pub fn advance_by(&mut self, step: usize) -> Result<()> {
        let end = self.calc_end_position(step)?;
        self.position = end;
        Ok(())
    }

    /// Returns the current cursor position
    #[must_use]
    pub fn pos(&self) -> usize {
        self.position
    }

    /// Returns the number of unread bytes
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.position)
    }

    /// Returns the next byte without consuming it
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] at the end of the data.
    pub fn peek_byte(&self) -> Result<u8> {
        self.data
            .get(self.position)
            .copied()
            .ok_or(out_of_bounds_error!())
    }

    /// Reads a little-endian primitive and advances past it
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if not enough bytes remain.
    pub fn read_le<T: CilIO>(&mut self) -> Result<T> {
        read_le_at::<T>(self.data, &mut self.position)
    }

    /// Reads a compressed unsigned integer (ECMA-335 II.23.2).
    ///
    /// | Pattern | Bytes | Range |
    /// |---------|-------|-------|
    /// | `0xxxxxxx` | 1 | 0 to 0x7F |
    /// | `10xxxxxx` | 2 | 0x80 to 0x3FFF |
    /// | `110xxxxx` | 4 | 0x4000 to 0x1FFF_FFFF |
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for an invalid lead byte and
    /// [`crate::Error::OutOfBounds`] for truncated data.
    pub fn read_compressed_uint(&mut self) -> Result<u32> {
        let first_byte = self.read_le::<u8>()?;

        if (first_byte & 0x80) == 0 {
            return Ok(u32::from(first_byte));
        }

        if (first_byte & 0xC0) == 0x80 {
            let second_byte = self.read_le::<u8>()?;
            return Ok(((u32::from(first_byte) & 0x3F) << 8) | u32::from(second_byte));
        }

        if (first_byte & 0xE0) == 0xC0 {
            let b1 = u32::from(self.read_le::<u8>()?);
            let b2 = u32::from(self.read_le::<u8>()?);
            let b3 = u32::from(self.read_le::<u8>()?);
            return Ok(((u32::from(first_byte) & 0x1F) << 24) | (b1 << 16) | (b2 << 8) | b3);
        }

        Err(malformed_error!("Invalid compressed uint - {}", first_byte))
    }

    /// Reads a compressed signed integer (rotated sign bit, ECMA-335 II.23.2)
    ///
    /// # Errors
    /// Propagates the errors of [`Parser::read_compressed_uint`].
    pub fn read_compressed_int(&mut self) -> Result<i32> {
        let start = self.position;
        let unsigned = self.read_compressed_uint()?;
        let width = self.position - start;

        let payload_bits = match width {
            1 => 7,
            2 => 14,
            _ => 29,
        };

        let magnitude = unsigned >> 1;
        if unsigned & 1 == 0 {
            return i32::try_from(magnitude)
                .map_err(|_| malformed_error!("Compressed int overflow - {}", unsigned));
        }

        // Negative values carry the sign in bit 0 and are stored in two's complement of the
        // payload width.
        let sign_extension = !0_u32 << (payload_bits - 1);
        #[allow(clippy::cast_possible_wrap)]
        let signed = (magnitude | sign_extension) as i32;
        Ok(signed)
    }

    /// Reads a compressed `TypeDefOrRefOrSpecEncoded` token (ECMA-335 II.23.2.8)
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the tag bits do not name a valid table.
    pub fn read_compressed_token(&mut self) -> Result<Token> {
        let compressed_token = self.read_compressed_uint()?;

        let table: u32 = match compressed_token & 0x3 {
            0x0 => 0x0200_0000,
            0x1 => 0x0100_0000,
            0x2 => 0x1B00_0000,
            _ => {
                return Err(malformed_error!(
                    "Invalid compressed token - {}",
                    compressed_token
                ))
            }
        };

        Ok(Token::new(table | (compressed_token >> 2)))
    }

    /// Reads a null-terminated UTF-8 string; a missing terminator ends the string at the end of
    /// the data
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the bytes are not valid UTF-8.
    pub fn read_string_utf8(&mut self) -> Result<String> {
        let start = self.position;
        let end = self.data[start..]
            .iter()
            .position(|byte| *byte == 0)
            .map_or(self.data.len(), |nul| start + nul);

        self.position = if end < self.data.len() { end + 1 } else { end };

        std::str::from_utf8(&self.data[start..end])
            .map(str::to_string)
            .map_err(|e| malformed_error!("Invalid UTF-8 string at offset {}-{}: {}", start, end, e))
    }

    /// Reads a string prefixed by its compressed byte length
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] for truncated data and
    /// [`crate::Error::Malformed`] for invalid UTF-8.
    pub fn read_compressed_string_utf8(&mut self) -> Result<String> {
        let length = self.read_compressed_uint()? as usize;
        let bytes = self.read_bytes(length)?;

        std::str::from_utf8(bytes).map(str::to_string).map_err(|e| {
            malformed_error!(
                "Invalid UTF-8 compressed string at offset {}: {}",
                self.position - length,
                e
            )
        })
    }

    /// Reads a `SerString` as used in custom attribute blobs. A single `0xFF` byte encodes
    /// the null string.
    ///
    /// # Errors
    /// Same as [`Parser::read_compressed_string_utf8`].
    pub fn read_ser_string(&mut self) -> Result<Option<String>> {
        if self.peek_byte()? == 0xFF {
            self.position += 1;
            return Ok(None);
        }

        self.read_compressed_string_utf8().map(Some)
    }

    /// Returns the next `length` bytes and advances past them
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if fewer than `length` bytes remain.
    pub fn read_bytes(&mut self, length: usize) -> Result<&'a [u8]> {
        let end = self.calc_end_position(length)?;
        let bytes = &self.data[self.position..end];
        self.position = end;
        Ok(bytes)
    }

    fn calc_end_position(&self, length: usize) -> Result<usize> {
        let end = self
            .position
            .checked_add(length)
            .ok_or(out_of_bounds_error!())?;

        if end > self.data.len() {
            return Err(out_of_bounds_error!());
        }

        Ok(end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn read_compressed_uint() {
        let test_cases = vec![
            (vec![0x03], 3),
            (vec![0x7F], 0x7F),
            (vec![0x80, 0x80], 0x80),
            (vec![0xAE, 0x57], 0x2E57),
            (vec![0xBF, 0xFF], 0x3FFF),
            (vec![0xC0, 0x00, 0x40, 0x00], 0x4000),
            (vec![0xDF, 0xFF, 0xFF, 0xFF], 0x1FFF_FFFF),
        ];

        for (input, expected) in test_cases {
            let mut parser = Parser::new(&input);
            let result = parser.read_compressed_uint().unwrap();

            assert_eq!(result, expected, "Failed for input: {input:?}");
            assert!(!parser.has_more_data());
        }
    }

    #[test]
    fn read_compressed_int() {
        // Samples from ECMA-335 II.23.2
        let test_cases = vec![
            (vec![0x06], 3),
            (vec![0x7B], -3),
            (vec![0x80, 0x80], 64),
            (vec![0x01], -64),
            (vec![0xC0, 0x00, 0x40, 0x00], 8192),
            (vec![0x80, 0x01], -8192),
            (vec![0xDF, 0xFF, 0xFF, 0xFE], 268_435_455),
            (vec![0xC0, 0x00, 0x00, 0x01], -268_435_456),
        ];

        for (input, expected) in test_cases {
            let mut parser = Parser::new(&input);
            assert_eq!(parser.read_compressed_int().unwrap(), expected, "input {input:?}");
        }
    }

    #[test]
    fn read_compressed_token() {
        let mut parser = Parser::new(&[0x49]);
        assert_eq!(parser.read_compressed_token().unwrap(), Token::new(0x0100_0012));

        let mut parser = Parser::new(&[0x08]);
        assert_eq!(parser.read_compressed_token().unwrap(), Token::new(0x0200_0002));

        let mut parser = Parser::new(&[0x0A]);
        assert_eq!(parser.read_compressed_token().unwrap(), Token::new(0x1B00_0002));

        let mut parser = Parser::new(&[0x0B]);
        assert!(matches!(
            parser.read_compressed_token(),
            Err(Error::Malformed { .. })
        ));
    }

    #[test]
    fn strings() {
        let data = b"abc\0\x02hi\xFF";
        let mut parser = Parser::new(data);

        assert_eq!(parser.read_string_utf8().unwrap(), "abc");
        assert_eq!(parser.read_ser_string().unwrap().as_deref(), Some("hi"));
        assert_eq!(parser.read_ser_string().unwrap(), None);
        assert!(!parser.has_more_data());
    }

    #[test]
    fn bounds() {
        let mut parser = Parser::new(&[0x01, 0x02]);

        assert!(matches!(parser.read_le::<u32>(), Err(Error::OutOfBounds)));
        assert!(matches!(parser.read_bytes(3), Err(Error::OutOfBounds)));
        assert_eq!(parser.read_bytes(2).unwrap(), &[0x01, 0x02]);
        assert!(matches!(parser.peek_byte(), Err(Error::OutOfBounds)));
    }
}
