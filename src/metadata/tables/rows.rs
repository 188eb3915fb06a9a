//! Typed rows of the tables the resolution engine reads.
//!
//! Heap columns keep their raw index (resolved through the view's heaps on demand), row index
//! columns keep their raw 1-based row, and coded index columns are decoded into tokens.

use crate::{
    file::io::{read_le_at, read_le_at_dyn},
    metadata::{
        tables::{CodedIndex, CodedIndexType, RowReadable, TableId, TableInfo},
        token::Token,
    },
    Result,
};

fn read_str(data: &[u8], offset: &mut usize, sizes: &TableInfo) -> Result<u32> {
    read_le_at_dyn(data, offset, sizes.is_large_str())
}

fn read_guid(data: &[u8], offset: &mut usize, sizes: &TableInfo) -> Result<u32> {
    read_le_at_dyn(data, offset, sizes.is_large_guid())
}

fn read_blob(data: &[u8], offset: &mut usize, sizes: &TableInfo) -> Result<u32> {
    read_le_at_dyn(data, offset, sizes.is_large_blob())
}

fn read_index(data: &[u8], offset: &mut usize, sizes: &TableInfo, table: TableId) -> Result<u32> {
    read_le_at_dyn(data, offset, sizes.is_large(table))
}

fn read_coded(
    data: &[u8],
    offset: &mut usize,
    sizes: &TableInfo,
    coded: CodedIndexType,
) -> Result<Token> {
    Ok(CodedIndex::read(data, offset, sizes, coded)?.token)
}

/// `Module` (0x00)
#[derive(Clone, Copy, Debug)]
pub struct ModuleRow {
    /// Row id
    pub rid: u32,
    /// Reserved, 0
    pub generation: u16,
    /// `#Strings` index of the module name
    pub name: u32,
    /// `#GUID` index of the module version id
    pub mvid: u32,
}

impl RowReadable for ModuleRow {
    const TABLE: TableId = TableId::Module;

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfo) -> Result<Self> {
        let row = ModuleRow {
            rid,
            generation: read_le_at::<u16>(data, offset)?,
            name: read_str(data, offset, sizes)?,
            mvid: read_guid(data, offset, sizes)?,
        };

        // EncId, EncBaseId
        read_guid(data, offset, sizes)?;
        read_guid(data, offset, sizes)?;
        Ok(row)
    }
}

/// `TypeRef` (0x01)
#[derive(Clone, Copy, Debug)]
pub struct TypeRefRow {
    /// Row id
    pub rid: u32,
    /// `Module`, `ModuleRef`, `AssemblyRef` or `TypeRef` (for nested types)
    pub resolution_scope: Token,
    /// `#Strings` index of the name
    pub name: u32,
    /// `#Strings` index of the namespace
    pub namespace: u32,
}

impl RowReadable for TypeRefRow {
    const TABLE: TableId = TableId::TypeRef;

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfo) -> Result<Self> {
        Ok(TypeRefRow {
            rid,
            resolution_scope: read_coded(data, offset, sizes, CodedIndexType::ResolutionScope)?,
            name: read_str(data, offset, sizes)?,
            namespace: read_str(data, offset, sizes)?,
        })
    }
}

/// `TypeDef` (0x02)
#[derive(Clone, Copy, Debug)]
pub struct TypeDefRow {
    /// Row id
    pub rid: u32,
    /// `TypeAttributes`
    pub flags: u32,
    /// `#Strings` index of the name
    pub name: u32,
    /// `#Strings` index of the namespace
    pub namespace: u32,
    /// Base type, nil for interfaces and `System.Object`
    pub extends: Token,
    /// First row of the field run owned by this type
    pub field_list: u32,
    /// First row of the method run owned by this type
    pub method_list: u32,
}

impl RowReadable for TypeDefRow {
    const TABLE: TableId = TableId::TypeDef;

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfo) -> Result<Self> {
        Ok(TypeDefRow {
            rid,
            flags: read_le_at::<u32>(data, offset)?,
            name: read_str(data, offset, sizes)?,
            namespace: read_str(data, offset, sizes)?,
            extends: read_coded(data, offset, sizes, CodedIndexType::TypeDefOrRef)?,
            field_list: read_index(data, offset, sizes, TableId::Field)?,
            method_list: read_index(data, offset, sizes, TableId::MethodDef)?,
        })
    }
}

/// `Field` (0x04)
#[derive(Clone, Copy, Debug)]
pub struct FieldRow {
    /// Row id
    pub rid: u32,
    /// `FieldAttributes`
    pub flags: u16,
    /// `#Strings` index of the name
    pub name: u32,
    /// `#Blob` index of the field signature
    pub signature: u32,
}

impl RowReadable for FieldRow {
    const TABLE: TableId = TableId::Field;

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfo) -> Result<Self> {
        Ok(FieldRow {
            rid,
            flags: read_le_at::<u16>(data, offset)?,
            name: read_str(data, offset, sizes)?,
            signature: read_blob(data, offset, sizes)?,
        })
    }
}

/// `MethodDef` (0x06)
#[derive(Clone, Copy, Debug)]
pub struct MethodDefRow {
    /// Row id
    pub rid: u32,
    /// RVA of the method body, 0 for abstract and runtime methods
    pub rva: u32,
    /// `MethodImplAttributes`
    pub impl_flags: u16,
    /// `MethodAttributes`
    pub flags: u16,
    /// `#Strings` index of the name
    pub name: u32,
    /// `#Blob` index of the method signature
    pub signature: u32,
    /// First row of the parameter run owned by this method
    pub param_list: u32,
}

impl RowReadable for MethodDefRow {
    const TABLE: TableId = TableId::MethodDef;

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfo) -> Result<Self> {
        Ok(MethodDefRow {
            rid,
            rva: read_le_at::<u32>(data, offset)?,
            impl_flags: read_le_at::<u16>(data, offset)?,
            flags: read_le_at::<u16>(data, offset)?,
            name: read_str(data, offset, sizes)?,
            signature: read_blob(data, offset, sizes)?,
            param_list: read_index(data, offset, sizes, TableId::Param)?,
        })
    }
}

/// `Param` (0x08)
#[derive(Clone, Copy, Debug)]
pub struct ParamRow {
    /// Row id
    pub rid: u32,
    /// `ParamAttributes`
    pub flags: u16,
    /// 0 for the return value, 1-based position otherwise
    pub sequence: u16,
    /// `#Strings` index of the name
    pub name: u32,
}

impl RowReadable for ParamRow {
    const TABLE: TableId = TableId::Param;

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfo) -> Result<Self> {
        Ok(ParamRow {
            rid,
            flags: read_le_at::<u16>(data, offset)?,
            sequence: read_le_at::<u16>(data, offset)?,
            name: read_str(data, offset, sizes)?,
        })
    }
}

/// `InterfaceImpl` (0x09)
#[derive(Clone, Copy, Debug)]
pub struct InterfaceImplRow {
    /// Row id
    pub rid: u32,
    /// `TypeDef` row of the implementing type
    pub class: u32,
    /// The implemented interface
    pub interface: Token,
}

impl RowReadable for InterfaceImplRow {
    const TABLE: TableId = TableId::InterfaceImpl;

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfo) -> Result<Self> {
        Ok(InterfaceImplRow {
            rid,
            class: read_index(data, offset, sizes, TableId::TypeDef)?,
            interface: read_coded(data, offset, sizes, CodedIndexType::TypeDefOrRef)?,
        })
    }
}

/// `MemberRef` (0x0A)
#[derive(Clone, Copy, Debug)]
pub struct MemberRefRow {
    /// Row id
    pub rid: u32,
    /// The declaring type, module or method
    pub class: Token,
    /// `#Strings` index of the name
    pub name: u32,
    /// `#Blob` index of the method or field signature
    pub signature: u32,
}

impl RowReadable for MemberRefRow {
    const TABLE: TableId = TableId::MemberRef;

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfo) -> Result<Self> {
        Ok(MemberRefRow {
            rid,
            class: read_coded(data, offset, sizes, CodedIndexType::MemberRefParent)?,
            name: read_str(data, offset, sizes)?,
            signature: read_blob(data, offset, sizes)?,
        })
    }
}

/// `Constant` (0x0B)
#[derive(Clone, Copy, Debug)]
pub struct ConstantRow {
    /// Row id
    pub rid: u32,
    /// Element type of the value
    pub element_type: u8,
    /// The owning field, parameter or property
    pub parent: Token,
    /// `#Blob` index of the value
    pub value: u32,
}

impl RowReadable for ConstantRow {
    const TABLE: TableId = TableId::Constant;

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfo) -> Result<Self> {
        let element_type = read_le_at::<u8>(data, offset)?;
        // Padding
        read_le_at::<u8>(data, offset)?;

        Ok(ConstantRow {
            rid,
            element_type,
            parent: read_coded(data, offset, sizes, CodedIndexType::HasConstant)?,
            value: read_blob(data, offset, sizes)?,
        })
    }
}

/// `CustomAttribute` (0x0C)
#[derive(Clone, Copy, Debug)]
pub struct CustomAttributeRow {
    /// Row id
    pub rid: u32,
    /// The entity carrying the attribute
    pub parent: Token,
    /// The attribute constructor, a `MethodDef` or `MemberRef`
    pub constructor: Token,
    /// `#Blob` index of the argument blob
    pub value: u32,
}

impl RowReadable for CustomAttributeRow {
    const TABLE: TableId = TableId::CustomAttribute;

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfo) -> Result<Self> {
        Ok(CustomAttributeRow {
            rid,
            parent: read_coded(data, offset, sizes, CodedIndexType::HasCustomAttribute)?,
            constructor: read_coded(data, offset, sizes, CodedIndexType::CustomAttributeType)?,
            value: read_blob(data, offset, sizes)?,
        })
    }
}

/// `EventMap` (0x12)
#[derive(Clone, Copy, Debug)]
pub struct EventMapRow {
    /// Row id
    pub rid: u32,
    /// `TypeDef` row of the owner
    pub parent: u32,
    /// First row of the event run
    pub event_list: u32,
}

impl RowReadable for EventMapRow {
    const TABLE: TableId = TableId::EventMap;

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfo) -> Result<Self> {
        Ok(EventMapRow {
            rid,
            parent: read_index(data, offset, sizes, TableId::TypeDef)?,
            event_list: read_index(data, offset, sizes, TableId::Event)?,
        })
    }
}

/// `Event` (0x14)
#[derive(Clone, Copy, Debug)]
pub struct EventRow {
    /// Row id
    pub rid: u32,
    /// `EventAttributes`
    pub flags: u16,
    /// `#Strings` index of the name
    pub name: u32,
    /// The delegate type of the event
    pub event_type: Token,
}

impl RowReadable for EventRow {
    const TABLE: TableId = TableId::Event;

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfo) -> Result<Self> {
        Ok(EventRow {
            rid,
            flags: read_le_at::<u16>(data, offset)?,
            name: read_str(data, offset, sizes)?,
            event_type: read_coded(data, offset, sizes, CodedIndexType::TypeDefOrRef)?,
        })
    }
}

/// `PropertyMap` (0x15)
#[derive(Clone, Copy, Debug)]
pub struct PropertyMapRow {
    /// Row id
    pub rid: u32,
    /// `TypeDef` row of the owner
    pub parent: u32,
    /// First row of the property run
    pub property_list: u32,
}

impl RowReadable for PropertyMapRow {
    const TABLE: TableId = TableId::PropertyMap;

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfo) -> Result<Self> {
        Ok(PropertyMapRow {
            rid,
            parent: read_index(data, offset, sizes, TableId::TypeDef)?,
            property_list: read_index(data, offset, sizes, TableId::Property)?,
        })
    }
}

/// `Property` (0x17)
#[derive(Clone, Copy, Debug)]
pub struct PropertyRow {
    /// Row id
    pub rid: u32,
    /// `PropertyAttributes`
    pub flags: u16,
    /// `#Strings` index of the name
    pub name: u32,
    /// `#Blob` index of the property signature
    pub signature: u32,
}

impl RowReadable for PropertyRow {
    const TABLE: TableId = TableId::Property;

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfo) -> Result<Self> {
        Ok(PropertyRow {
            rid,
            flags: read_le_at::<u16>(data, offset)?,
            name: read_str(data, offset, sizes)?,
            signature: read_blob(data, offset, sizes)?,
        })
    }
}

/// `MethodSemantics` (0x18)
#[derive(Clone, Copy, Debug)]
pub struct MethodSemanticsRow {
    /// Row id
    pub rid: u32,
    /// `MethodSemanticsAttributes`
    pub semantics: u16,
    /// `MethodDef` row of the accessor
    pub method: u32,
    /// The owning event or property
    pub association: Token,
}

impl RowReadable for MethodSemanticsRow {
    const TABLE: TableId = TableId::MethodSemantics;

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfo) -> Result<Self> {
        Ok(MethodSemanticsRow {
            rid,
            semantics: read_le_at::<u16>(data, offset)?,
            method: read_index(data, offset, sizes, TableId::MethodDef)?,
            association: read_coded(data, offset, sizes, CodedIndexType::HasSemantics)?,
        })
    }
}

/// `ModuleRef` (0x1A)
#[derive(Clone, Copy, Debug)]
pub struct ModuleRefRow {
    /// Row id
    pub rid: u32,
    /// `#Strings` index of the module file name
    pub name: u32,
}

impl RowReadable for ModuleRefRow {
    const TABLE: TableId = TableId::ModuleRef;

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfo) -> Result<Self> {
        Ok(ModuleRefRow {
            rid,
            name: read_str(data, offset, sizes)?,
        })
    }
}

/// `TypeSpec` (0x1B)
#[derive(Clone, Copy, Debug)]
pub struct TypeSpecRow {
    /// Row id
    pub rid: u32,
    /// `#Blob` index of the type signature
    pub signature: u32,
}

impl RowReadable for TypeSpecRow {
    const TABLE: TableId = TableId::TypeSpec;

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfo) -> Result<Self> {
        Ok(TypeSpecRow {
            rid,
            signature: read_blob(data, offset, sizes)?,
        })
    }
}

/// `Assembly` (0x20)
#[derive(Clone, Copy, Debug)]
pub struct AssemblyRow {
    /// Row id
    pub rid: u32,
    /// `AssemblyHashAlgorithm`
    pub hash_alg_id: u32,
    /// Version major
    pub major_version: u16,
    /// Version minor
    pub minor_version: u16,
    /// Version build
    pub build_number: u16,
    /// Version revision
    pub revision_number: u16,
    /// `AssemblyFlags`
    pub flags: u32,
    /// `#Blob` index of the public key
    pub public_key: u32,
    /// `#Strings` index of the name
    pub name: u32,
    /// `#Strings` index of the culture
    pub culture: u32,
}

impl RowReadable for AssemblyRow {
    const TABLE: TableId = TableId::Assembly;

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfo) -> Result<Self> {
        Ok(AssemblyRow {
            rid,
            hash_alg_id: read_le_at::<u32>(data, offset)?,
            major_version: read_le_at::<u16>(data, offset)?,
            minor_version: read_le_at::<u16>(data, offset)?,
            build_number: read_le_at::<u16>(data, offset)?,
            revision_number: read_le_at::<u16>(data, offset)?,
            flags: read_le_at::<u32>(data, offset)?,
            public_key: read_blob(data, offset, sizes)?,
            name: read_str(data, offset, sizes)?,
            culture: read_str(data, offset, sizes)?,
        })
    }
}

/// `AssemblyRef` (0x23)
#[derive(Clone, Copy, Debug)]
pub struct AssemblyRefRow {
    /// Row id
    pub rid: u32,
    /// Version major
    pub major_version: u16,
    /// Version minor
    pub minor_version: u16,
    /// Version build
    pub build_number: u16,
    /// Version revision
    pub revision_number: u16,
    /// `AssemblyFlags`, bit 0 marks a full public key
    pub flags: u32,
    /// `#Blob` index of the public key or its token
    pub public_key_or_token: u32,
    /// `#Strings` index of the name
    pub name: u32,
    /// `#Strings` index of the culture
    pub culture: u32,
    /// `#Blob` index of the hash value
    pub hash_value: u32,
}

impl RowReadable for AssemblyRefRow {
    const TABLE: TableId = TableId::AssemblyRef;

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfo) -> Result<Self> {
        Ok(AssemblyRefRow {
            rid,
            major_version: read_le_at::<u16>(data, offset)?,
            minor_version: read_le_at::<u16>(data, offset)?,
            build_number: read_le_at::<u16>(data, offset)?,
            revision_number: read_le_at::<u16>(data, offset)?,
            flags: read_le_at::<u32>(data, offset)?,
            public_key_or_token: read_blob(data, offset, sizes)?,
            name: read_str(data, offset, sizes)?,
            culture: read_str(data, offset, sizes)?,
            hash_value: read_blob(data, offset, sizes)?,
        })
    }
}

/// `NestedClass` (0x29)
#[derive(Clone, Copy, Debug)]
pub struct NestedClassRow {
    /// Row id
    pub rid: u32,
    /// `TypeDef` row of the nested type
    pub nested_class: u32,
    /// `TypeDef` row of the declaring type
    pub enclosing_class: u32,
}

impl RowReadable for NestedClassRow {
    const TABLE: TableId = TableId::NestedClass;

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfo) -> Result<Self> {
        Ok(NestedClassRow {
            rid,
            nested_class: read_index(data, offset, sizes, TableId::TypeDef)?,
            enclosing_class: read_index(data, offset, sizes, TableId::TypeDef)?,
        })
    }
}

/// `GenericParam` (0x2A)
#[derive(Clone, Copy, Debug)]
pub struct GenericParamRow {
    /// Row id
    pub rid: u32,
    /// 0-based position in the owner's parameter list
    pub number: u16,
    /// `GenericParamAttributes`
    pub flags: u16,
    /// The declaring `TypeDef` or `MethodDef`
    pub owner: Token,
    /// `#Strings` index of the name
    pub name: u32,
}

impl RowReadable for GenericParamRow {
    const TABLE: TableId = TableId::GenericParam;

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfo) -> Result<Self> {
        Ok(GenericParamRow {
            rid,
            number: read_le_at::<u16>(data, offset)?,
            flags: read_le_at::<u16>(data, offset)?,
            owner: read_coded(data, offset, sizes, CodedIndexType::TypeOrMethodDef)?,
            name: read_str(data, offset, sizes)?,
        })
    }
}

/// `MethodSpec` (0x2B)
#[derive(Clone, Copy, Debug)]
pub struct MethodSpecRow {
    /// Row id
    pub rid: u32,
    /// The generic method definition
    pub method: Token,
    /// `#Blob` index of the instantiation signature
    pub instantiation: u32,
}

impl RowReadable for MethodSpecRow {
    const TABLE: TableId = TableId::MethodSpec;

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfo) -> Result<Self> {
        Ok(MethodSpecRow {
            rid,
            method: read_coded(data, offset, sizes, CodedIndexType::MethodDefOrRef)?,
            instantiation: read_blob(data, offset, sizes)?,
        })
    }
}

/// `GenericParamConstraint` (0x2C)
#[derive(Clone, Copy, Debug)]
pub struct GenericParamConstraintRow {
    /// Row id
    pub rid: u32,
    /// `GenericParam` row of the constrained parameter
    pub owner: u32,
    /// The constraint type
    pub constraint: Token,
}

impl RowReadable for GenericParamConstraintRow {
    const TABLE: TableId = TableId::GenericParamConstraint;

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfo) -> Result<Self> {
        Ok(GenericParamConstraintRow {
            rid,
            owner: read_index(data, offset, sizes, TableId::GenericParam)?,
            constraint: read_coded(data, offset, sizes, CodedIndexType::TypeDefOrRef)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn consumed<T: RowReadable>(sizes: &TableInfo) -> usize {
        let data = [0_u8; 64];
        let mut offset = 0;
        T::row_read(&data, &mut offset, 1, sizes).unwrap();
        offset
    }

    fn check_all(sizes: &TableInfo) {
        assert_eq!(consumed::<ModuleRow>(sizes), ModuleRow::row_size(sizes));
        assert_eq!(consumed::<TypeRefRow>(sizes), TypeRefRow::row_size(sizes));
        assert_eq!(consumed::<TypeDefRow>(sizes), TypeDefRow::row_size(sizes));
        assert_eq!(consumed::<FieldRow>(sizes), FieldRow::row_size(sizes));
        assert_eq!(consumed::<MethodDefRow>(sizes), MethodDefRow::row_size(sizes));
        assert_eq!(consumed::<ParamRow>(sizes), ParamRow::row_size(sizes));
        assert_eq!(consumed::<InterfaceImplRow>(sizes), InterfaceImplRow::row_size(sizes));
        assert_eq!(consumed::<MemberRefRow>(sizes), MemberRefRow::row_size(sizes));
        assert_eq!(consumed::<ConstantRow>(sizes), ConstantRow::row_size(sizes));
        assert_eq!(consumed::<CustomAttributeRow>(sizes), CustomAttributeRow::row_size(sizes));
        assert_eq!(consumed::<EventMapRow>(sizes), EventMapRow::row_size(sizes));
        assert_eq!(consumed::<EventRow>(sizes), EventRow::row_size(sizes));
        assert_eq!(consumed::<PropertyMapRow>(sizes), PropertyMapRow::row_size(sizes));
        assert_eq!(consumed::<PropertyRow>(sizes), PropertyRow::row_size(sizes));
        assert_eq!(consumed::<MethodSemanticsRow>(sizes), MethodSemanticsRow::row_size(sizes));
        assert_eq!(consumed::<ModuleRefRow>(sizes), ModuleRefRow::row_size(sizes));
        assert_eq!(consumed::<TypeSpecRow>(sizes), TypeSpecRow::row_size(sizes));
        assert_eq!(consumed::<AssemblyRow>(sizes), AssemblyRow::row_size(sizes));
        assert_eq!(consumed::<AssemblyRefRow>(sizes), AssemblyRefRow::row_size(sizes));
        assert_eq!(consumed::<NestedClassRow>(sizes), NestedClassRow::row_size(sizes));
        assert_eq!(consumed::<GenericParamRow>(sizes), GenericParamRow::row_size(sizes));
        assert_eq!(consumed::<MethodSpecRow>(sizes), MethodSpecRow::row_size(sizes));
        assert_eq!(
            consumed::<GenericParamConstraintRow>(sizes),
            GenericParamConstraintRow::row_size(sizes)
        );
    }

    #[test]
    fn readers_match_column_layout() {
        check_all(&TableInfo::from_row_counts(&[(TableId::TypeDef, 2)], 0));
        check_all(&TableInfo::from_row_counts(
            &[
                (TableId::TypeDef, 0x2_0000),
                (TableId::MethodDef, 0x1_0000),
                (TableId::GenericParam, 0x1_0000),
                (TableId::TypeRef, 0x8000),
            ],
            0b111,
        ));
    }

    #[test]
    #[rustfmt::skip]
    fn typedef_row() {
        let sizes = TableInfo::from_row_counts(&[(TableId::TypeDef, 2), (TableId::TypeRef, 1)], 0);
        let data = [
            0x01, 0x00, 0x10, 0x00,     // flags
            0x05, 0x00,                 // name
            0x0A, 0x00,                 // namespace
            0x05, 0x00,                 // extends: TypeRef 1
            0x01, 0x00,                 // field list
            0x02, 0x00,                 // method list
        ];

        let mut offset = 0;
        let row = TypeDefRow::row_read(&data, &mut offset, 1, &sizes).unwrap();

        assert_eq!(row.flags, 0x0010_0001);
        assert_eq!(row.name, 5);
        assert_eq!(row.namespace, 10);
        assert_eq!(row.extends, Token::new(0x0100_0001));
        assert_eq!(row.field_list, 1);
        assert_eq!(row.method_list, 2);
        assert_eq!(offset, 14);
    }
}
