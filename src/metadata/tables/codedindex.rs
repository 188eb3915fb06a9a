use strum::{EnumCount, EnumIter};

use crate::{
    file::io::read_le_at_dyn,
    metadata::{
        tables::{TableId, TableInfo},
        token::Token,
    },
    Result,
};

/// The coded index kinds of ECMA-335 II.24.2.6
///
/// A coded index packs a table tag into its low bits and the row into the remaining ones, so a
/// single column can reference rows of several tables.
#[derive(Debug, Hash, Eq, PartialEq, Clone, Copy, EnumIter, EnumCount)]
#[repr(usize)]
pub enum CodedIndexType {
    /// `TypeDef`, `TypeRef`, `TypeSpec`
    TypeDefOrRef,
    /// `Field`, `Param`, `Property`
    HasConstant,
    /// Anything that can carry a custom attribute
    HasCustomAttribute,
    /// `Field`, `Param`
    HasFieldMarshal,
    /// `TypeDef`, `MethodDef`, `Assembly`
    HasDeclSecurity,
    /// `TypeDef`, `TypeRef`, `ModuleRef`, `MethodDef`, `TypeSpec`
    MemberRefParent,
    /// `Event`, `Property`
    HasSemantics,
    /// `MethodDef`, `MemberRef`
    MethodDefOrRef,
    /// `Field`, `MethodDef`
    MemberForwarded,
    /// `File`, `AssemblyRef`, `ExportedType`
    Implementation,
    /// `MethodDef` (tag 2), `MemberRef` (tag 3)
    CustomAttributeType,
    /// `Module`, `ModuleRef`, `AssemblyRef`, `TypeRef`
    ResolutionScope,
    /// `TypeDef`, `MethodDef`
    TypeOrMethodDef,
}

impl CodedIndexType {
    /// The tables addressed by this coded index, in tag order
    #[must_use]
    pub fn tables(&self) -> &'static [TableId] {
        match self {
            CodedIndexType::TypeDefOrRef => {
                &[TableId::TypeDef, TableId::TypeRef, TableId::TypeSpec]
            }
            CodedIndexType::HasConstant => &[TableId::Field, TableId::Param, TableId::Property],
            CodedIndexType::HasCustomAttribute => &[
                TableId::MethodDef,
                TableId::Field,
                TableId::TypeRef,
                TableId::TypeDef,
                TableId::Param,
                TableId::InterfaceImpl,
                TableId::MemberRef,
                TableId::Module,
                TableId::DeclSecurity,
                TableId::Property,
                TableId::Event,
                TableId::StandAloneSig,
                TableId::ModuleRef,
                TableId::TypeSpec,
                TableId::Assembly,
                TableId::AssemblyRef,
                TableId::File,
                TableId::ExportedType,
                TableId::ManifestResource,
                TableId::GenericParam,
                TableId::GenericParamConstraint,
                TableId::MethodSpec,
            ],
            CodedIndexType::HasFieldMarshal => &[TableId::Field, TableId::Param],
            CodedIndexType::HasDeclSecurity => {
                &[TableId::TypeDef, TableId::MethodDef, TableId::Assembly]
            }
            CodedIndexType::MemberRefParent => &[
                TableId::TypeDef,
                TableId::TypeRef,
                TableId::ModuleRef,
                TableId::MethodDef,
                TableId::TypeSpec,
            ],
            CodedIndexType::HasSemantics => &[TableId::Event, TableId::Property],
            CodedIndexType::MethodDefOrRef => &[TableId::MethodDef, TableId::MemberRef],
            CodedIndexType::MemberForwarded => &[TableId::Field, TableId::MethodDef],
            CodedIndexType::Implementation => {
                &[TableId::File, TableId::AssemblyRef, TableId::ExportedType]
            }
            // Tags 0, 1 and 4 are unused; they only widen the tag to 3 bits.
            CodedIndexType::CustomAttributeType => &[
                TableId::MethodDef,
                TableId::MethodDef,
                TableId::MethodDef,
                TableId::MemberRef,
                TableId::MemberRef,
            ],
            CodedIndexType::ResolutionScope => &[
                TableId::Module,
                TableId::ModuleRef,
                TableId::AssemblyRef,
                TableId::TypeRef,
            ],
            CodedIndexType::TypeOrMethodDef => &[TableId::TypeDef, TableId::MethodDef],
        }
    }

    /// The number of low bits holding the table tag
    #[must_use]
    pub fn tag_bits(&self) -> u32 {
        let count = self.tables().len();
        usize::BITS - (count - 1).leading_zeros()
    }

    /// Returns the tag of `table` in this coded index
    #[must_use]
    pub fn tag_of(&self, table: TableId) -> Option<u32> {
        if *self == CodedIndexType::CustomAttributeType {
            return match table {
                TableId::MethodDef => Some(2),
                TableId::MemberRef => Some(3),
                _ => None,
            };
        }

        self.tables()
            .iter()
            .position(|candidate| *candidate == table)
            .and_then(|tag| u32::try_from(tag).ok())
    }
}

/// A decoded coded index
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CodedIndex {
    /// The referenced table
    pub tag: TableId,
    /// The referenced row, 0 for nil
    pub row: u32,
    /// The token of the referenced row
    pub token: Token,
}

impl CodedIndex {
    /// Reads a coded index of `ci_type` at `offset` and advances past it
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] for truncated data or an unknown tag.
    pub fn read(
        data: &[u8],
        offset: &mut usize,
        info: &TableInfo,
        ci_type: CodedIndexType,
    ) -> Result<Self> {
        let value = read_le_at_dyn(data, offset, info.is_large_coded(ci_type))?;
        Self::decode(value, ci_type)
    }

    /// Splits an encoded value into its table and row
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the tag names no table.
    pub fn decode(value: u32, ci_type: CodedIndexType) -> Result<Self> {
        let tag_bits = ci_type.tag_bits();
        let tag = value & ((1 << tag_bits) - 1);
        let row = value >> tag_bits;

        match ci_type.tables().get(tag as usize) {
            Some(table) => Ok(CodedIndex::new(*table, row)),
            None => Err(out_of_bounds_error!()),
        }
    }

    /// Encodes `token` as a coded index of `ci_type`; the nil token encodes as 0
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the table of `token` is not addressable by
    /// `ci_type`.
    pub fn encode(token: Token, ci_type: CodedIndexType) -> Result<u32> {
        if token.value() == 0 {
            return Ok(0);
        }

        let tag = TableId::from_id(token.table())
            .and_then(|table| ci_type.tag_of(table))
            .ok_or_else(|| {
                malformed_error!("Token {} cannot be encoded as {:?}", token, ci_type)
            })?;

        Ok((token.row() << ci_type.tag_bits()) | tag)
    }

    /// Creates a coded index for `row` of `tag`
    #[must_use]
    pub fn new(tag: TableId, row: u32) -> CodedIndex {
        CodedIndex {
            tag,
            row,
            token: Token::new(tag.token_base() | row),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_bits() {
        assert_eq!(CodedIndexType::TypeDefOrRef.tag_bits(), 2);
        assert_eq!(CodedIndexType::HasConstant.tag_bits(), 2);
        assert_eq!(CodedIndexType::HasCustomAttribute.tag_bits(), 5);
        assert_eq!(CodedIndexType::HasFieldMarshal.tag_bits(), 1);
        assert_eq!(CodedIndexType::MemberRefParent.tag_bits(), 3);
        assert_eq!(CodedIndexType::CustomAttributeType.tag_bits(), 3);
        assert_eq!(CodedIndexType::ResolutionScope.tag_bits(), 2);
    }

    #[test]
    fn decode() {
        // TypeRef row 3
        let index = CodedIndex::decode(0b1101, CodedIndexType::TypeDefOrRef).unwrap();
        assert_eq!(index.tag, TableId::TypeRef);
        assert_eq!(index.row, 3);
        assert_eq!(index.token, Token::new(0x0100_0003));

        // Tag 3 is not used by TypeDefOrRef
        assert!(CodedIndex::decode(0b111, CodedIndexType::TypeDefOrRef).is_err());
    }

    #[test]
    fn custom_attribute_constructor_tags() {
        let method = CodedIndex::encode(Token::new(0x0600_0002), CodedIndexType::CustomAttributeType)
            .unwrap();
        assert_eq!(method, (2 << 3) | 2);

        let member = CodedIndex::encode(Token::new(0x0A00_0001), CodedIndexType::CustomAttributeType)
            .unwrap();
        assert_eq!(
            CodedIndex::decode(member, CodedIndexType::CustomAttributeType)
                .unwrap()
                .token,
            Token::new(0x0A00_0001)
        );
        assert_eq!(
            CodedIndex::decode(method, CodedIndexType::CustomAttributeType)
                .unwrap()
                .tag,
            TableId::MethodDef
        );
    }

    #[test]
    fn encode_rejects_foreign_table() {
        assert!(CodedIndex::encode(Token::new(0x0400_0001), CodedIndexType::TypeDefOrRef).is_err());
        assert_eq!(
            CodedIndex::encode(Token::new(0), CodedIndexType::TypeDefOrRef).unwrap(),
            0
        );
    }
}
