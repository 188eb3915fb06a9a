//! Emits metadata-only module images.
//!
//! [`ImageBuilder`] collects table rows and heap entries and lays them out as a raw metadata
//! image: the `BSJB` root followed by the `#~`, `#Strings`, `#US`, `#GUID` and `#Blob`
//! streams. [`crate::file::File`] loads such images directly, which makes the builder the
//! source of every crafted module in the test suites and a convenient way to produce reference
//! stubs for tooling.
//!
//! Rows are appended in declaration order. Like a compiler, the builder assigns member runs
//! implicitly: fields and methods belong to the most recent [`ImageBuilder::type_def`],
//! parameters to the most recent [`ImageBuilder::method`], and properties and events create
//! the `PropertyMap` / `EventMap` rows of the current type on first use.
//!
//! # Examples
//!
//! ```rust
//! use dotreflect::metadata::{
//!     builder::ImageBuilder,
//!     signatures::{SignatureField, TypeSignature},
//! };
//!
//! let mut builder = ImageBuilder::new("Sample");
//! let object = builder.type_ref(ImageBuilder::MODULE, "System", "Object");
//! builder.type_def(0x0010_0001, "Sample", "Point", Some(object));
//! builder.field(0x0006, "X", &SignatureField { modifiers: vec![], base: TypeSignature::I4 })?;
//!
//! let image = builder.build()?;
//! assert_eq!(&image[..4], b"BSJB");
//! # Ok::<(), dotreflect::Error>(())
//! ```

use std::collections::HashMap;

use sha1::{Digest, Sha1};
use strum::{EnumCount, IntoEnumIterator};

use crate::{
    file::io::{write_le, write_le_dyn},
    metadata::{
        identity::{AssemblyIdentity, StrongName, ASSEMBLY_FLAG_PUBLIC_KEY},
        root::CIL_HEADER_MAGIC,
        signatures::{
            encode_field_signature, encode_method_signature, encode_method_spec_signature,
            encode_property_signature, encode_typespec_signature, write_compressed_uint,
            SignatureField, SignatureMethod, SignatureMethodSpec, SignatureProperty,
            TypeSignature,
        },
        tables::{CodedIndex, Column, TableId, TableInfo, MAX_COLUMNS},
        token::Token,
    },
    Result,
};

/// Runtime version written into the metadata root by default
pub const DEFAULT_RUNTIME_VERSION: &str = "v4.0.30319";

/// `CALG_SHA1`, the hash algorithm of the `Assembly` row
const HASH_ALGORITHM_SHA1: u32 = 0x8004;

type Row = [u32; MAX_COLUMNS];

/// The `#Strings` heap under construction
struct StringHeap {
    data: Vec<u8>,
    offsets: HashMap<String, u32>,
}

impl StringHeap {
    fn new() -> Self {
        StringHeap {
            data: vec![0],
            offsets: HashMap::new(),
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    fn intern(&mut self, value: &str) -> u32 {
        if value.is_empty() {
            return 0;
        }

        if let Some(offset) = self.offsets.get(value) {
            return *offset;
        }

        let offset = self.data.len() as u32;
        self.data.extend_from_slice(value.as_bytes());
        self.data.push(0);
        self.offsets.insert(value.to_string(), offset);
        offset
    }
}

/// The `#Blob` heap under construction
struct BlobHeap {
    data: Vec<u8>,
    offsets: HashMap<Vec<u8>, u32>,
}

impl BlobHeap {
    fn new() -> Self {
        BlobHeap {
            data: vec![0],
            offsets: HashMap::new(),
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    fn intern(&mut self, value: &[u8]) -> Result<u32> {
        if value.is_empty() {
            return Ok(0);
        }

        if let Some(offset) = self.offsets.get(value) {
            return Ok(*offset);
        }

        let offset = self.data.len() as u32;
        write_compressed_uint(value.len() as u32, &mut self.data)?;
        self.data.extend_from_slice(value);
        self.offsets.insert(value.to_vec(), offset);
        Ok(offset)
    }
}

/// Builds raw metadata images row by row
pub struct ImageBuilder {
    runtime_version: String,
    strings: StringHeap,
    blobs: BlobHeap,
    guids: Vec<uguid::Guid>,
    tables: Vec<Vec<Row>>,
}

impl ImageBuilder {
    /// The token of the `Module` row, a resolution scope for types of the module itself
    pub const MODULE: Token = Token(0x0000_0001);

    /// Starts an image for the assembly `name`, version 1.0.0.0
    ///
    /// The image holds a `Module` row named `{name}.dll` with an MVID derived from `name`, the
    /// `<Module>` type and an `Assembly` row.
    #[must_use]
    pub fn new(name: &str) -> Self {
        let mut builder = ImageBuilder {
            runtime_version: DEFAULT_RUNTIME_VERSION.to_string(),
            strings: StringHeap::new(),
            blobs: BlobHeap::new(),
            guids: Vec::new(),
            tables: vec![Vec::new(); TableId::COUNT],
        };

        let hash = Sha1::digest(name.as_bytes());
        let mut mvid = [0_u8; 16];
        mvid.copy_from_slice(&hash[..16]);
        builder.guids.push(uguid::Guid::from_bytes(mvid));

        let module_name = builder.strings.intern(&format!("{name}.dll"));
        builder.push(TableId::Module, &[0, module_name, 1, 0, 0]);
        builder.type_def(0, "", "<Module>", None);

        let assembly_name = builder.strings.intern(name);
        builder.push(
            TableId::Assembly,
            &[HASH_ALGORITHM_SHA1, 1, 0, 0, 0, 0, 0, assembly_name, 0],
        );

        builder
    }

    /// Overrides the runtime version string of the metadata root
    pub fn runtime_version(&mut self, version: &str) -> &mut Self {
        self.runtime_version = version.to_string();
        self
    }

    /// Renames the `Module` row
    pub fn module_name(&mut self, name: &str) -> &mut Self {
        let name = self.strings.intern(name);
        self.tables[TableId::Module as usize][0][1] = name;
        self
    }

    /// Replaces the identity stored in the `Assembly` row
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the public key blob cannot be encoded.
    pub fn identity(&mut self, identity: &AssemblyIdentity) -> Result<&mut Self> {
        let (flags, public_key) = match &identity.strong_name {
            Some(StrongName::PublicKey(key)) => (ASSEMBLY_FLAG_PUBLIC_KEY, self.blobs.intern(key)?),
            Some(StrongName::Token(_)) | None => (0, 0),
        };

        let row = [
            HASH_ALGORITHM_SHA1,
            u32::from(identity.version.major),
            u32::from(identity.version.minor),
            u32::from(identity.version.build),
            u32::from(identity.version.revision),
            flags,
            public_key,
            self.strings.intern(&identity.name),
            self.strings.intern(identity.culture.as_deref().unwrap_or_default()),
        ];
        self.tables[TableId::Assembly as usize][0][..row.len()].copy_from_slice(&row);
        Ok(self)
    }

    /// Adds an `AssemblyRef` row for `identity`
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the public key blob cannot be encoded.
    pub fn assembly_ref(&mut self, identity: &AssemblyIdentity) -> Result<Token> {
        let (flags, public_key_or_token) = match &identity.strong_name {
            Some(StrongName::PublicKey(key)) => (ASSEMBLY_FLAG_PUBLIC_KEY, self.blobs.intern(key)?),
            Some(StrongName::Token(token)) => (0, self.blobs.intern(token)?),
            None => (0, 0),
        };

        let name = self.strings.intern(&identity.name);
        let culture = self
            .strings
            .intern(identity.culture.as_deref().unwrap_or_default());

        Ok(self.push(
            TableId::AssemblyRef,
            &[
                u32::from(identity.version.major),
                u32::from(identity.version.minor),
                u32::from(identity.version.build),
                u32::from(identity.version.revision),
                flags,
                public_key_or_token,
                name,
                culture,
                0,
            ],
        ))
    }

    /// Adds a `ModuleRef` row
    pub fn module_ref(&mut self, name: &str) -> Token {
        let name = self.strings.intern(name);
        self.push(TableId::ModuleRef, &[name])
    }

    /// Adds a `TypeRef` row; `scope` is a `Module`, `ModuleRef`, `AssemblyRef` or `TypeRef`
    pub fn type_ref(&mut self, scope: Token, namespace: &str, name: &str) -> Token {
        let name = self.strings.intern(name);
        let namespace = self.strings.intern(namespace);
        self.push(TableId::TypeRef, &[scope.value(), name, namespace])
    }

    /// Adds a `TypeDef` row; fields and methods added afterwards belong to it
    pub fn type_def(
        &mut self,
        flags: u32,
        namespace: &str,
        name: &str,
        extends: Option<Token>,
    ) -> Token {
        let name = self.strings.intern(name);
        let namespace = self.strings.intern(namespace);
        let field_list = self.next_rid(TableId::Field);
        let method_list = self.next_rid(TableId::MethodDef);

        self.push(
            TableId::TypeDef,
            &[
                flags,
                name,
                namespace,
                extends.map_or(0, |token| token.value()),
                field_list,
                method_list,
            ],
        )
    }

    /// Adds a `Field` row to the current type
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the signature cannot be encoded.
    pub fn field(&mut self, flags: u16, name: &str, signature: &SignatureField) -> Result<Token> {
        let signature = self.blobs.intern(&encode_field_signature(signature)?)?;
        let name = self.strings.intern(name);
        Ok(self.push(TableId::Field, &[u32::from(flags), name, signature]))
    }

    /// Adds a `MethodDef` row to the current type; parameters added afterwards belong to it
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the signature cannot be encoded.
    pub fn method(
        &mut self,
        flags: u16,
        impl_flags: u16,
        name: &str,
        signature: &SignatureMethod,
    ) -> Result<Token> {
        let signature = self.blobs.intern(&encode_method_signature(signature)?)?;
        let name = self.strings.intern(name);
        let param_list = self.next_rid(TableId::Param);

        Ok(self.push(
            TableId::MethodDef,
            &[
                0,
                u32::from(impl_flags),
                u32::from(flags),
                name,
                signature,
                param_list,
            ],
        ))
    }

    /// Adds a `Param` row to the current method; sequence 0 is the return value
    pub fn param(&mut self, flags: u16, sequence: u16, name: &str) -> Token {
        let name = self.strings.intern(name);
        self.push(
            TableId::Param,
            &[u32::from(flags), u32::from(sequence), name],
        )
    }

    /// Adds a `Property` row to the current type
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the signature cannot be encoded.
    pub fn property(
        &mut self,
        flags: u16,
        name: &str,
        signature: &SignatureProperty,
    ) -> Result<Token> {
        let signature = self.blobs.intern(&encode_property_signature(signature)?)?;
        let name = self.strings.intern(name);
        self.open_map(TableId::PropertyMap, TableId::Property);
        Ok(self.push(TableId::Property, &[u32::from(flags), name, signature]))
    }

    /// Adds an `Event` row of delegate type `event_type` to the current type
    pub fn event(&mut self, flags: u16, name: &str, event_type: Token) -> Token {
        let name = self.strings.intern(name);
        self.open_map(TableId::EventMap, TableId::Event);
        self.push(
            TableId::Event,
            &[u32::from(flags), name, event_type.value()],
        )
    }

    /// Links `method` to a property or event as accessor
    pub fn method_semantics(&mut self, semantics: u16, method: Token, association: Token) -> Token {
        self.push(
            TableId::MethodSemantics,
            &[u32::from(semantics), method.row(), association.value()],
        )
    }

    /// Nests the type `nested` into `enclosing`
    pub fn nested_class(&mut self, nested: Token, enclosing: Token) -> Token {
        self.push(TableId::NestedClass, &[nested.row(), enclosing.row()])
    }

    /// Adds a generic parameter to the `TypeDef` or `MethodDef` `owner`
    pub fn generic_param(&mut self, number: u16, flags: u16, owner: Token, name: &str) -> Token {
        let name = self.strings.intern(name);
        self.push(
            TableId::GenericParam,
            &[u32::from(number), u32::from(flags), owner.value(), name],
        )
    }

    /// Constrains the generic parameter `owner` to `constraint`
    pub fn generic_param_constraint(&mut self, owner: Token, constraint: Token) -> Token {
        self.push(
            TableId::GenericParamConstraint,
            &[owner.row(), constraint.value()],
        )
    }

    /// Records that `class` implements `interface`
    pub fn interface_impl(&mut self, class: Token, interface: Token) -> Token {
        self.push(TableId::InterfaceImpl, &[class.row(), interface.value()])
    }

    /// Adds a method reference to a member of `class`
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the signature cannot be encoded.
    pub fn member_ref(
        &mut self,
        class: Token,
        name: &str,
        signature: &SignatureMethod,
    ) -> Result<Token> {
        let signature = self.blobs.intern(&encode_method_signature(signature)?)?;
        let name = self.strings.intern(name);
        Ok(self.push(TableId::MemberRef, &[class.value(), name, signature]))
    }

    /// Adds a field reference to a member of `class`
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the signature cannot be encoded.
    pub fn field_ref(
        &mut self,
        class: Token,
        name: &str,
        signature: &SignatureField,
    ) -> Result<Token> {
        let signature = self.blobs.intern(&encode_field_signature(signature)?)?;
        let name = self.strings.intern(name);
        Ok(self.push(TableId::MemberRef, &[class.value(), name, signature]))
    }

    /// Adds a `TypeSpec` row
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the signature cannot be encoded.
    pub fn type_spec(&mut self, signature: &TypeSignature) -> Result<Token> {
        let signature = self.blobs.intern(&encode_typespec_signature(signature)?)?;
        Ok(self.push(TableId::TypeSpec, &[signature]))
    }

    /// Adds a `MethodSpec` row instantiating `method` with `generic_args`
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the signature cannot be encoded.
    pub fn method_spec(&mut self, method: Token, generic_args: &[TypeSignature]) -> Result<Token> {
        let signature = encode_method_spec_signature(&SignatureMethodSpec {
            generic_args: generic_args.to_vec(),
        })?;
        let signature = self.blobs.intern(&signature)?;
        Ok(self.push(TableId::MethodSpec, &[method.value(), signature]))
    }

    /// Attaches a custom attribute with the serialized `value` to `parent`
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the value blob cannot be encoded.
    pub fn custom_attribute(
        &mut self,
        parent: Token,
        constructor: Token,
        value: &[u8],
    ) -> Result<Token> {
        let value = self.blobs.intern(value)?;
        Ok(self.push(
            TableId::CustomAttribute,
            &[parent.value(), constructor.value(), value],
        ))
    }

    /// Attaches a constant of `element_type` to a field, parameter or property
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the value blob cannot be encoded.
    pub fn constant(&mut self, parent: Token, element_type: u8, value: &[u8]) -> Result<Token> {
        let value = self.blobs.intern(value)?;
        Ok(self.push(
            TableId::Constant,
            &[u32::from(element_type), parent.value(), value],
        ))
    }

    /// Lays out the image
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if a row references a table its column cannot
    /// address, or a value does not fit its column.
    pub fn build(&self) -> Result<Vec<u8>> {
        let tables = self.tables_stream()?;

        let mut strings = self.strings.data.clone();
        align(&mut strings);
        let mut blobs = self.blobs.data.clone();
        align(&mut blobs);
        let guids: Vec<u8> = self.guids.iter().flat_map(|guid| guid.to_bytes()).collect();
        let user_strings = vec![0_u8; 4];

        let streams: [(&str, &[u8]); 5] = [
            ("#~", &tables),
            ("#Strings", &strings),
            ("#US", &user_strings),
            ("#GUID", &guids),
            ("#Blob", &blobs),
        ];

        let mut version = self.runtime_version.as_bytes().to_vec();
        version.push(0);
        align(&mut version);

        let headers_size: usize = streams
            .iter()
            .map(|(name, _)| 8 + ((name.len() + 1 + 3) & !3))
            .sum();
        let mut offset = 16 + version.len() + 4 + headers_size;

        let mut image = Vec::new();
        write_le(&mut image, CIL_HEADER_MAGIC);
        write_le(&mut image, 1_u16);
        write_le(&mut image, 1_u16);
        write_le(&mut image, 0_u32);
        write_le(&mut image, to_u32(version.len())?);
        image.extend_from_slice(&version);
        write_le(&mut image, 0_u16);
        write_le(&mut image, to_u16(streams.len())?);

        for (name, data) in &streams {
            write_le(&mut image, to_u32(offset)?);
            write_le(&mut image, to_u32(data.len())?);
            let mut name = name.as_bytes().to_vec();
            name.push(0);
            align(&mut name);
            image.extend_from_slice(&name);
            offset += data.len();
        }

        for (_, data) in &streams {
            image.extend_from_slice(data);
        }

        Ok(image)
    }

    fn tables_stream(&self) -> Result<Vec<u8>> {
        let mut heap_sizes = 0_u8;
        if self.strings.data.len() > 0xFFFF {
            heap_sizes |= 0x01;
        }
        if self.guids.len() > 0xFFFF {
            heap_sizes |= 0x02;
        }
        if self.blobs.data.len() > 0xFFFF {
            heap_sizes |= 0x04;
        }

        let mut row_counts = vec![0_u32; TableId::COUNT];
        let mut valid = 0_u64;
        let mut sorted = 0_u64;
        for table in TableId::iter() {
            row_counts[table as usize] = to_u32(self.tables[table as usize].len())?;
            if !self.tables[table as usize].is_empty() {
                valid |= 1 << (table as u64);
            }
            if sort_key_column(table).is_some() {
                sorted |= 1 << (table as u64);
            }
        }

        let info = TableInfo::new(&row_counts, heap_sizes);

        let mut stream = Vec::new();
        write_le(&mut stream, 0_u32);
        write_le(&mut stream, 2_u8);
        write_le(&mut stream, 0_u8);
        write_le(&mut stream, heap_sizes);
        write_le(&mut stream, 1_u8);
        write_le(&mut stream, valid);
        write_le(&mut stream, sorted);

        for table in TableId::iter() {
            if valid & (1 << (table as u64)) != 0 {
                write_le(&mut stream, row_counts[table as usize]);
            }
        }

        for table in TableId::iter() {
            for row in self.sorted_rows(table)? {
                write_row(&mut stream, table, &row, &info)?;
            }
        }

        align(&mut stream);
        Ok(stream)
    }

    /// The rows of `table` in on-disk order, stably sorted by their primary key if required
    fn sorted_rows(&self, table: TableId) -> Result<Vec<Row>> {
        let rows = &self.tables[table as usize];
        let Some(column) = sort_key_column(table) else {
            return Ok(rows.clone());
        };

        let mut keyed = Vec::with_capacity(rows.len());
        for row in rows {
            let key = match table.columns()[column] {
                Column::Coded(coded) => CodedIndex::encode(Token::new(row[column]), coded)?,
                _ => row[column],
            };
            keyed.push((key, *row));
        }

        keyed.sort_by_key(|(key, _)| *key);
        Ok(keyed.into_iter().map(|(_, row)| row).collect())
    }

    fn push(&mut self, table: TableId, values: &[u32]) -> Token {
        let mut row = [0_u32; MAX_COLUMNS];
        row[..values.len()].copy_from_slice(values);

        let rows = &mut self.tables[table as usize];
        rows.push(row);

        #[allow(clippy::cast_possible_truncation)]
        Token::new(table.token_base() | rows.len() as u32)
    }

    #[allow(clippy::cast_possible_truncation)]
    fn next_rid(&self, table: TableId) -> u32 {
        self.tables[table as usize].len() as u32 + 1
    }

    /// Starts a `PropertyMap` / `EventMap` run for the current type unless one is open
    #[allow(clippy::cast_possible_truncation)]
    fn open_map(&mut self, map: TableId, members: TableId) {
        let current_type = self.tables[TableId::TypeDef as usize].len() as u32;
        let is_open = self.tables[map as usize]
            .last()
            .is_some_and(|row| row[0] == current_type);

        if !is_open {
            let first = self.next_rid(members);
            self.push(map, &[current_type, first]);
        }
    }
}

/// Column holding the primary key of tables that must be sorted
fn sort_key_column(table: TableId) -> Option<usize> {
    match table {
        TableId::InterfaceImpl
        | TableId::CustomAttribute
        | TableId::NestedClass
        | TableId::GenericParamConstraint => Some(0),
        TableId::Constant => Some(1),
        TableId::MethodSemantics => Some(2),
        _ => None,
    }
}

fn write_row(buffer: &mut Vec<u8>, table: TableId, row: &Row, info: &TableInfo) -> Result<()> {
    for (column, value) in table.columns().iter().zip(row.iter()) {
        match column {
            Column::U16 => write_le_dyn(buffer, *value, false)?,
            Column::U32 => write_le(buffer, *value),
            Column::Str => write_le_dyn(buffer, *value, info.is_large_str())?,
            Column::Guid => write_le_dyn(buffer, *value, info.is_large_guid())?,
            Column::Blob => write_le_dyn(buffer, *value, info.is_large_blob())?,
            Column::Index(target) => write_le_dyn(buffer, *value, info.is_large(*target))?,
            Column::Coded(coded) => write_le_dyn(
                buffer,
                CodedIndex::encode(Token::new(*value), *coded)?,
                info.is_large_coded(*coded),
            )?,
        }
    }

    Ok(())
}

fn align(buffer: &mut Vec<u8>) {
    while buffer.len() % 4 != 0 {
        buffer.push(0);
    }
}

fn to_u32(value: usize) -> Result<u32> {
    u32::try_from(value).map_err(|_| malformed_error!("Value {} exceeds 32 bits", value))
}

fn to_u16(value: usize) -> Result<u16> {
    u16::try_from(value).map_err(|_| malformed_error!("Value {} exceeds 16 bits", value))
}
