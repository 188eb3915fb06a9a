//! Metadata tokens and their table kinds.
//!
//! A token is a 32-bit value identifying one row in one metadata table: the top byte selects the
//! table ([`TokenKind`]) and the lower 24 bits carry the 1-based row. Member collections of a
//! type are contiguous runs of rows, so lookups translate the absolute row into an index relative
//! to the first row of the collection ([`Token::row_offset`], [`index_in_collection`]).
//!
//! # Examples
//!
//! ```rust
//! use dotreflect::metadata::token::{Token, TokenKind};
//!
//! let token = Token::new(0x0600_0003);
//! assert_eq!(token.kind(), Some(TokenKind::MethodDef));
//! assert_eq!(token.row(), 3);
//! assert_eq!(token.row_offset(2), Some(1));
//! ```

use std::fmt;
use std::hash::{Hash, Hasher};

use strum::{EnumCount, EnumIter, IntoEnumIterator};

use crate::{Error, Result};

/// The kind of a token, given by its top byte
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, EnumIter, EnumCount)]
#[repr(u8)]
pub enum TokenKind {
    /// `Module` table
    Module = 0x00,
    /// `TypeRef` table
    TypeRef = 0x01,
    /// `TypeDef` table
    TypeDef = 0x02,
    /// `Field` table
    Field = 0x04,
    /// `MethodDef` table
    MethodDef = 0x06,
    /// `Param` table
    Param = 0x08,
    /// `InterfaceImpl` table
    InterfaceImpl = 0x09,
    /// `MemberRef` table
    MemberRef = 0x0A,
    /// `CustomAttribute` table
    CustomAttribute = 0x0C,
    /// `DeclSecurity` table
    Permission = 0x0E,
    /// `StandAloneSig` table
    Signature = 0x11,
    /// `Event` table
    Event = 0x14,
    /// `Property` table
    Property = 0x17,
    /// `ModuleRef` table
    ModuleRef = 0x1A,
    /// `TypeSpec` table
    TypeSpec = 0x1B,
    /// `Assembly` table
    Assembly = 0x20,
    /// `AssemblyRef` table
    AssemblyRef = 0x23,
    /// `File` table
    File = 0x26,
    /// `ExportedType` table
    ExportedType = 0x27,
    /// `ManifestResource` table
    ManifestResource = 0x28,
    /// `GenericParam` table
    GenericParam = 0x2A,
    /// `MethodSpec` table
    MethodSpec = 0x2B,
    /// `GenericParamConstraint` table
    GenericParamConstraint = 0x2C,
    /// `#US` heap offsets (`ldstr` operands)
    String = 0x70,
    /// `#Strings` heap offsets
    Name = 0x71,
    /// Built-in base types
    BaseType = 0x72,
}

impl TokenKind {
    /// Returns the kind whose table byte is `table`
    #[must_use]
    pub fn from_table(table: u8) -> Option<TokenKind> {
        TokenKind::iter().find(|kind| *kind as u8 == table)
    }

    /// Returns the token with this kind and `row`
    #[must_use]
    pub fn token(self, row: u32) -> Token {
        Token::new((u32::from(self as u8) << 24) | (row & 0x00FF_FFFF))
    }
}

/// A metadata token
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Token(pub u32);

impl Token {
    /// Wraps a raw token value
    #[must_use]
    pub fn new(value: u32) -> Self {
        Token(value)
    }

    /// The raw token value
    #[must_use]
    pub fn value(&self) -> u32 {
        self.0
    }

    /// The table byte
    #[must_use]
    pub fn table(&self) -> u8 {
        (self.0 >> 24) as u8
    }

    /// The 1-based row
    #[must_use]
    pub fn row(&self) -> u32 {
        self.0 & 0x00FF_FFFF
    }

    /// The kind of the token, `None` for unknown table bytes
    #[must_use]
    pub fn kind(&self) -> Option<TokenKind> {
        TokenKind::from_table(self.table())
    }

    /// True for the nil token of any table
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.row() == 0
    }

    /// Returns the row of this token relative to `starting_row`, `None` if it lies before it
    #[must_use]
    pub fn row_offset(&self, starting_row: u32) -> Option<usize> {
        self.row().checked_sub(starting_row).map(|offset| offset as usize)
    }
}

/// Translates `token` into an index of a collection holding `len` rows starting at
/// `starting_row`.
///
/// # Errors
/// Returns [`Error::InvalidToken`] if `token` is not of `expected` kind and
/// [`Error::TokenOutOfRange`] if its row lies outside the collection.
pub fn index_in_collection(
    token: Token,
    expected: TokenKind,
    starting_row: u32,
    len: usize,
) -> Result<usize> {
    if token.kind() != Some(expected) {
        return Err(Error::InvalidToken {
            token,
            expected: kind_name(expected),
        });
    }

    match token.row_offset(starting_row) {
        Some(offset) if offset < len => Ok(offset),
        _ => Err(Error::TokenOutOfRange(token)),
    }
}

fn kind_name(kind: TokenKind) -> &'static str {
    match kind {
        TokenKind::Module => "Module",
        TokenKind::TypeRef => "TypeRef",
        TokenKind::TypeDef => "TypeDef",
        TokenKind::Field => "Field",
        TokenKind::MethodDef => "MethodDef",
        TokenKind::Param => "Param",
        TokenKind::InterfaceImpl => "InterfaceImpl",
        TokenKind::MemberRef => "MemberRef",
        TokenKind::CustomAttribute => "CustomAttribute",
        TokenKind::Permission => "Permission",
        TokenKind::Signature => "Signature",
        TokenKind::Event => "Event",
        TokenKind::Property => "Property",
        TokenKind::ModuleRef => "ModuleRef",
        TokenKind::TypeSpec => "TypeSpec",
        TokenKind::Assembly => "Assembly",
        TokenKind::AssemblyRef => "AssemblyRef",
        TokenKind::File => "File",
        TokenKind::ExportedType => "ExportedType",
        TokenKind::ManifestResource => "ManifestResource",
        TokenKind::GenericParam => "GenericParam",
        TokenKind::MethodSpec => "MethodSpec",
        TokenKind::GenericParamConstraint => "GenericParamConstraint",
        TokenKind::String => "String",
        TokenKind::Name => "Name",
        TokenKind::BaseType => "BaseType",
    }
}

impl From<u32> for Token {
    fn from(value: u32) -> Self {
        Token(value)
    }
}

impl From<Token> for u32 {
    fn from(token: Token) -> Self {
        token.0
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Token(0x{:08x}, table: 0x{:02x}, row: {})",
            self.0,
            self.table(),
            self.row()
        )
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", self.0)
    }
}

impl Hash for Token {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parts() {
        let token = Token::new(0x0200_0012);

        assert_eq!(token.table(), 0x02);
        assert_eq!(token.row(), 0x12);
        assert_eq!(token.kind(), Some(TokenKind::TypeDef));
        assert!(!token.is_null());
        assert!(Token::new(0x0100_0000).is_null());
        assert_eq!(Token::new(0x0500_0001).kind(), None);
        assert_eq!(TokenKind::Field.token(7), Token::new(0x0400_0007));
    }

    #[test]
    fn formatting() {
        let token = Token::new(0x0600_0001);

        assert_eq!(format!("{token}"), "0x06000001");
        assert_eq!(
            format!("{token:?}"),
            "Token(0x06000001, table: 0x06, row: 1)"
        );
    }

    #[test]
    fn collection_index() {
        let token = Token::new(0x0400_0005);

        assert_eq!(index_in_collection(token, TokenKind::Field, 3, 4).unwrap(), 2);
        assert!(matches!(
            index_in_collection(token, TokenKind::Field, 3, 2),
            Err(Error::TokenOutOfRange(_))
        ));
        assert!(matches!(
            index_in_collection(token, TokenKind::Field, 6, 4),
            Err(Error::TokenOutOfRange(_))
        ));
        assert!(matches!(
            index_in_collection(token, TokenKind::MethodDef, 3, 4),
            Err(Error::InvalidToken { expected: "MethodDef", .. })
        ));
    }
}
