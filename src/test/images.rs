// Miniature module images shared by the unit tests and the integration tests.
//
// The file is compiled twice: as `crate::test::images` and as `common::images` in `tests/`.
// Both parents provide the same names through their `deps` module.

#![allow(dead_code)]

use super::deps::{
    AssemblyIdentity, AssemblyVersion, FieldAttributes, ImageBuilder, MethodAttributes,
    MethodSemanticsAttributes, ModuleRc, ParamAttributes, Registry, RegistryConfig, RegistryRc,
    Result, SignatureField, SignatureMethod, SignatureParameter, SignatureProperty, Token,
    TypeAttributes, TypeRc, TypeSignature, ELEMENT_TYPE,
};

pub const CORLIB_PUBLIC_KEY_TOKEN: &str = "b77a5c561934e089";

const PUBLIC_CLASS: u32 = TypeAttributes::PUBLIC;
const PUBLIC_SEALED: u32 = TypeAttributes::PUBLIC | TypeAttributes::SEALED;
const PUBLIC_ABSTRACT: u32 = TypeAttributes::PUBLIC | TypeAttributes::ABSTRACT;
const PUBLIC_INTERFACE: u32 =
    TypeAttributes::PUBLIC | TypeAttributes::INTERFACE | TypeAttributes::ABSTRACT;

const CTOR: u16 = MethodAttributes::PUBLIC
    | MethodAttributes::HIDE_BY_SIG
    | MethodAttributes::SPECIAL_NAME
    | MethodAttributes::RT_SPECIAL_NAME;
const CCTOR: u16 = MethodAttributes::PRIVATE
    | MethodAttributes::STATIC
    | MethodAttributes::HIDE_BY_SIG
    | MethodAttributes::SPECIAL_NAME
    | MethodAttributes::RT_SPECIAL_NAME;
const PUBLIC_METHOD: u16 = MethodAttributes::PUBLIC | MethodAttributes::HIDE_BY_SIG;
const PUBLIC_STATIC: u16 = PUBLIC_METHOD | MethodAttributes::STATIC;
const PUBLIC_VIRTUAL: u16 = PUBLIC_METHOD | MethodAttributes::VIRTUAL;
const PUBLIC_ABSTRACT_METHOD: u16 = PUBLIC_VIRTUAL
    | MethodAttributes::NEW_SLOT
    | MethodAttributes::ABSTRACT;
const PUBLIC_ACCESSOR: u16 = PUBLIC_METHOD | MethodAttributes::SPECIAL_NAME;
const PRIVATE_ACCESSOR: u16 =
    MethodAttributes::PRIVATE | MethodAttributes::HIDE_BY_SIG | MethodAttributes::SPECIAL_NAME;

const ENUM_VALUE_FIELD: u16 =
    FieldAttributes::PUBLIC | FieldAttributes::SPECIAL_NAME | FieldAttributes::RT_SPECIAL_NAME;
const ENUM_LITERAL: u16 = FieldAttributes::PUBLIC
    | FieldAttributes::STATIC
    | FieldAttributes::LITERAL
    | FieldAttributes::HAS_DEFAULT;

/// Tokens of interesting rows of [`corlib_image`]
#[derive(Clone, Copy, Debug)]
pub struct CorlibTokens {
    pub object: Token,
    pub value_type: Token,
    pub int32: Token,
    pub list: Token,
    pub list_add: Token,
    pub list_cast: Token,
    pub obsolete: Token,
}

/// Tokens of interesting rows of [`library_image`]
#[derive(Clone, Copy, Debug)]
pub struct LibraryTokens {
    pub widget: Token,
    pub widget_part: Token,
    pub widget_hidden: Token,
    pub widget_count: Token,
    pub widget_items: Token,
    pub widget_ctor: Token,
    pub widget_resize: Token,
    pub widget_swap: Token,
    pub widget_describe: Token,
    pub widget_size: Token,
    pub widget_changed: Token,
    pub color: Token,
    pub broken: Token,
    pub point: Token,
    pub boxed: Token,
    pub boxed_value: Token,
    pub marker: Token,
    pub marker_ctor: Token,
    pub shape: Token,
    pub part_ref: Token,
    pub missing_nested_ref: Token,
    pub ghost_ref: Token,
    pub missing_system_ref: Token,
    pub unresolvable_ref: Token,
    pub list_of_int_add: Token,
    pub swap_of_int: Token,
    pub boxed_of_int_value: Token,
}

pub fn corlib_identity() -> Result<AssemblyIdentity> {
    AssemblyIdentity::parse(&format!(
        "mscorlib, Version=4.0.0.0, Culture=neutral, PublicKeyToken={CORLIB_PUBLIC_KEY_TOKEN}"
    ))
}

pub fn library_identity() -> AssemblyIdentity {
    AssemblyIdentity::new("Library", AssemblyVersion::new(1, 0, 0, 0))
}

pub fn other_identity() -> AssemblyIdentity {
    AssemblyIdentity::new("Other", AssemblyVersion::new(2, 0, 0, 0))
}

fn field(base: TypeSignature) -> SignatureField {
    SignatureField {
        modifiers: vec![],
        base,
    }
}

fn instance(ret: TypeSignature, params: Vec<TypeSignature>) -> SignatureMethod {
    SignatureMethod::new(ret, params).instance()
}

fn by_ref(base: TypeSignature) -> SignatureParameter {
    SignatureParameter {
        modifiers: vec![],
        by_ref: true,
        base,
    }
}

/// Appends a `SerString`; names in these images are shorter than 128 bytes
fn ser_string(blob: &mut Vec<u8>, value: &str) {
    blob.push(u8::try_from(value.len()).unwrap_or(0x7F));
    blob.extend_from_slice(value.as_bytes());
}

/// A core library with the built-in types, a few attributes, a delegate and `List<T>`
pub fn corlib_image() -> Result<(Vec<u8>, CorlibTokens)> {
    let mut builder = ImageBuilder::new("mscorlib");
    builder.identity(&corlib_identity()?)?;

    let object = builder.type_def(PUBLIC_CLASS, "System", "Object", None);
    builder.method(CTOR, 0, ".ctor", &instance(TypeSignature::Void, vec![]))?;
    builder.method(PUBLIC_VIRTUAL, 0, "ToString", &instance(TypeSignature::String, vec![]))?;
    builder.method(PUBLIC_VIRTUAL, 0, "GetHashCode", &instance(TypeSignature::I4, vec![]))?;
    builder.method(
        PUBLIC_VIRTUAL,
        0,
        "Equals",
        &instance(TypeSignature::Boolean, vec![TypeSignature::Object]),
    )?;
    builder.param(0, 1, "obj");

    let value_type = builder.type_def(PUBLIC_ABSTRACT, "System", "ValueType", Some(object));
    builder.type_def(PUBLIC_ABSTRACT, "System", "Enum", Some(value_type));
    builder.type_def(PUBLIC_ABSTRACT, "System", "Array", Some(object));
    builder.type_def(PUBLIC_ABSTRACT, "System", "Type", Some(object));
    builder.type_def(PUBLIC_SEALED, "System", "String", Some(object));

    let mut int32 = Token::new(0);
    for name in [
        "Void", "Boolean", "Char", "SByte", "Byte", "Int16", "UInt16", "Int32", "UInt32", "Int64",
        "UInt64", "Single", "Double", "IntPtr", "UIntPtr", "TypedReference",
    ] {
        let token = builder.type_def(PUBLIC_SEALED, "System", name, Some(value_type));
        if name == "Int32" {
            int32 = token;
        }
    }

    let attribute = builder.type_def(PUBLIC_ABSTRACT, "System", "Attribute", Some(object));
    builder.method(
        MethodAttributes::FAMILY
            | MethodAttributes::HIDE_BY_SIG
            | MethodAttributes::SPECIAL_NAME
            | MethodAttributes::RT_SPECIAL_NAME,
        0,
        ".ctor",
        &instance(TypeSignature::Void, vec![]),
    )?;

    let obsolete = builder.type_def(PUBLIC_SEALED, "System", "ObsoleteAttribute", Some(attribute));
    builder.method(CTOR, 0, ".ctor", &instance(TypeSignature::Void, vec![]))?;
    builder.method(
        CTOR,
        0,
        ".ctor",
        &instance(TypeSignature::Void, vec![TypeSignature::String]),
    )?;
    builder.param(0, 1, "message");

    let delegate = builder.type_def(PUBLIC_ABSTRACT, "System", "Delegate", Some(object));
    let multicast =
        builder.type_def(PUBLIC_ABSTRACT, "System", "MulticastDelegate", Some(delegate));
    let event_args = builder.type_def(PUBLIC_CLASS, "System", "EventArgs", Some(object));
    builder.type_def(PUBLIC_SEALED, "System", "EventHandler", Some(multicast));
    builder.method(
        CTOR,
        0,
        ".ctor",
        &instance(TypeSignature::Void, vec![TypeSignature::Object, TypeSignature::I]),
    )?;
    builder.method(
        PUBLIC_VIRTUAL,
        0,
        "Invoke",
        &instance(
            TypeSignature::Void,
            vec![TypeSignature::Object, TypeSignature::Class(event_args)],
        ),
    )?;

    builder.type_def(PUBLIC_INTERFACE, "System", "IDisposable", None);
    builder.method(
        PUBLIC_ABSTRACT_METHOD,
        0,
        "Dispose",
        &instance(TypeSignature::Void, vec![]),
    )?;

    let list = builder.type_def(PUBLIC_CLASS, "System.Collections.Generic", "List`1", Some(object));
    builder.field(
        FieldAttributes::PRIVATE,
        "_items",
        &field(TypeSignature::SzArray(Box::new(TypeSignature::GenericParamType(0)))),
    )?;
    builder.method(CTOR, 0, ".ctor", &instance(TypeSignature::Void, vec![]))?;
    let list_add = builder.method(
        PUBLIC_METHOD,
        0,
        "Add",
        &instance(TypeSignature::Void, vec![TypeSignature::GenericParamType(0)]),
    )?;
    builder.param(0, 1, "item");
    let get_item = builder.method(
        PUBLIC_ACCESSOR,
        0,
        "get_Item",
        &instance(TypeSignature::GenericParamType(0), vec![TypeSignature::I4]),
    )?;
    builder.param(0, 1, "index");
    let list_cast = builder.method(
        PUBLIC_METHOD,
        0,
        "Cast",
        &instance(
            TypeSignature::GenericInst(
                Box::new(TypeSignature::Class(list)),
                vec![TypeSignature::GenericParamMethod(0)],
            ),
            vec![],
        )
        .generic(1),
    )?;
    let item = builder.property(
        0,
        "Item",
        &SignatureProperty {
            has_this: true,
            modifiers: vec![],
            base: TypeSignature::GenericParamType(0),
            params: vec![SignatureParameter::new(TypeSignature::I4)],
        },
    )?;
    builder.method_semantics(MethodSemanticsAttributes::GETTER, get_item, item);
    builder.generic_param(0, 0, list, "T");
    builder.generic_param(0, 0, list_cast, "TResult");

    let image = builder.build()?;
    Ok((
        image,
        CorlibTokens {
            object,
            value_type,
            int32,
            list,
            list_add,
            list_cast,
            obsolete,
        },
    ))
}

/// A library referencing the core library through `mscorlib` and `System.Runtime`
pub fn library_image() -> Result<(Vec<u8>, LibraryTokens)> {
    let mut builder = ImageBuilder::new("Library");
    builder.identity(&library_identity())?;

    let corlib = builder.assembly_ref(&corlib_identity()?)?;
    let runtime = builder.assembly_ref(&AssemblyIdentity::new(
        "System.Runtime",
        AssemblyVersion::new(4, 2, 0, 0),
    ))?;
    let other = builder.assembly_ref(&other_identity())?;

    let object = builder.type_ref(runtime, "System", "Object");
    let enum_ref = builder.type_ref(corlib, "System", "Enum");
    let value_type = builder.type_ref(corlib, "System", "ValueType");
    let attribute = builder.type_ref(corlib, "System", "Attribute");
    let obsolete = builder.type_ref(corlib, "System", "ObsoleteAttribute");
    let disposable = builder.type_ref(corlib, "System", "IDisposable");
    let event_handler = builder.type_ref(corlib, "System", "EventHandler");
    let system_type = builder.type_ref(corlib, "System", "Type");
    let list = builder.type_ref(corlib, "System.Collections.Generic", "List`1");
    let ghost_ref = builder.type_ref(corlib, "Library", "Ghost");
    let missing_system_ref = builder.type_ref(corlib, "System", "Missing");
    let unresolvable_ref = builder.type_ref(other, "Other", "Thing");
    let widget_ref = builder.type_ref(ImageBuilder::MODULE, "Library", "Widget");
    let part_ref = builder.type_ref(widget_ref, "", "Part");
    let missing_nested_ref = builder.type_ref(widget_ref, "", "Missing");

    let list_of_int = TypeSignature::GenericInst(
        Box::new(TypeSignature::Class(list)),
        vec![TypeSignature::I4],
    );

    // Widget
    let widget = builder.type_def(PUBLIC_CLASS, "Library", "Widget", Some(object));
    let widget_count = builder.field(FieldAttributes::PRIVATE, "_count", &field(TypeSignature::I4))?;
    builder.field(
        FieldAttributes::PUBLIC | FieldAttributes::STATIC,
        "Default",
        &field(TypeSignature::Class(widget)),
    )?;
    let widget_items =
        builder.field(FieldAttributes::PUBLIC, "Items", &field(list_of_int.clone()))?;

    let widget_ctor = builder.method(CTOR, 0, ".ctor", &instance(TypeSignature::Void, vec![]))?;
    builder.method(
        CTOR,
        0,
        ".ctor",
        &instance(TypeSignature::Void, vec![TypeSignature::I4]),
    )?;
    builder.param(0, 1, "count");
    builder.method(CCTOR, 0, ".cctor", &SignatureMethod::new(TypeSignature::Void, vec![]))?;
    builder.method(
        PUBLIC_VIRTUAL | MethodAttributes::FINAL | MethodAttributes::NEW_SLOT,
        0,
        "Dispose",
        &instance(TypeSignature::Void, vec![]),
    )?;
    let get_size = builder.method(
        PUBLIC_ACCESSOR,
        0,
        "get_Size",
        &instance(TypeSignature::I4, vec![]),
    )?;
    let set_size = builder.method(
        PRIVATE_ACCESSOR,
        0,
        "set_Size",
        &instance(TypeSignature::Void, vec![TypeSignature::I4]),
    )?;
    builder.param(0, 1, "value");
    let add_changed = builder.method(
        PUBLIC_ACCESSOR,
        0,
        "add_Changed",
        &instance(TypeSignature::Void, vec![TypeSignature::Class(event_handler)]),
    )?;
    builder.param(0, 1, "value");
    let remove_changed = builder.method(
        PUBLIC_ACCESSOR,
        0,
        "remove_Changed",
        &instance(TypeSignature::Void, vec![TypeSignature::Class(event_handler)]),
    )?;
    builder.param(0, 1, "value");
    let widget_resize = builder.method(
        PUBLIC_METHOD,
        0,
        "Resize",
        &instance(TypeSignature::Void, vec![TypeSignature::I4, TypeSignature::I4]),
    )?;
    builder.param(0, 1, "width");
    builder.param(0, 2, "height");
    builder.method(
        PUBLIC_METHOD,
        0,
        "Resize",
        &instance(TypeSignature::Void, vec![TypeSignature::R8]),
    )?;
    builder.param(0, 1, "factor");
    let mut swap = SignatureMethod::new(TypeSignature::Void, vec![]).generic(1);
    swap.params = vec![
        by_ref(TypeSignature::GenericParamMethod(0)),
        by_ref(TypeSignature::GenericParamMethod(0)),
    ];
    let widget_swap = builder.method(PUBLIC_STATIC, 0, "Swap", &swap)?;
    builder.param(0, 1, "left");
    builder.param(0, 2, "right");
    let widget_describe = builder.method(
        PUBLIC_METHOD,
        0,
        "Describe",
        &instance(TypeSignature::String, vec![TypeSignature::String]),
    )?;
    builder.param(0, 0, "");
    let prefix = builder.param(
        ParamAttributes::OPTIONAL | ParamAttributes::HAS_DEFAULT,
        1,
        "prefix",
    );
    builder.constant(prefix, ELEMENT_TYPE::STRING, &[b'w', 0])?;

    let widget_size = builder.property(
        0,
        "Size",
        &SignatureProperty {
            has_this: true,
            modifiers: vec![],
            base: TypeSignature::I4,
            params: vec![],
        },
    )?;
    builder.method_semantics(MethodSemanticsAttributes::GETTER, get_size, widget_size);
    builder.method_semantics(MethodSemanticsAttributes::SETTER, set_size, widget_size);

    let widget_changed = builder.event(0, "Changed", event_handler);
    builder.method_semantics(MethodSemanticsAttributes::ADD_ON, add_changed, widget_changed);
    builder.method_semantics(
        MethodSemanticsAttributes::REMOVE_ON,
        remove_changed,
        widget_changed,
    );

    builder.interface_impl(widget, disposable);
    builder.generic_param(0, 0, widget_swap, "T");

    let widget_part = builder.type_def(TypeAttributes::NESTED_PUBLIC, "", "Part", Some(object));
    builder.nested_class(widget_part, widget);
    let widget_hidden =
        builder.type_def(TypeAttributes::NESTED_PRIVATE, "", "Hidden", Some(object));
    builder.nested_class(widget_hidden, widget);

    // Color
    let color = builder.type_def(PUBLIC_SEALED, "Library", "Color", Some(enum_ref));
    builder.field(ENUM_VALUE_FIELD, "value__", &field(TypeSignature::I4))?;
    for (value, name) in [(0_i32, "Red"), (1, "Green"), (2, "Blue")] {
        let literal = builder.field(ENUM_LITERAL, name, &field(TypeSignature::ValueType(color)))?;
        builder.constant(literal, ELEMENT_TYPE::I4, &value.to_le_bytes())?;
    }

    // An enum without a backing field
    let broken = builder.type_def(PUBLIC_SEALED, "Library", "Broken", Some(enum_ref));
    let only = builder.field(ENUM_LITERAL, "Only", &field(TypeSignature::ValueType(broken)))?;
    builder.constant(only, ELEMENT_TYPE::I4, &0_i32.to_le_bytes())?;

    // Point
    let point = builder.type_def(PUBLIC_SEALED, "Library", "Point", Some(value_type));
    builder.field(FieldAttributes::PUBLIC, "X", &field(TypeSignature::I4))?;
    builder.field(FieldAttributes::PUBLIC, "Y", &field(TypeSignature::I4))?;

    // Box<T> where T : IDisposable
    let boxed = builder.type_def(PUBLIC_CLASS, "Library", "Box`1", Some(object));
    let boxed_value = builder.field(
        FieldAttributes::PUBLIC,
        "Value",
        &field(TypeSignature::GenericParamType(0)),
    )?;
    builder.method(CTOR, 0, ".ctor", &instance(TypeSignature::Void, vec![]))?;
    builder.method(
        PUBLIC_METHOD,
        0,
        "Get",
        &instance(TypeSignature::GenericParamType(0), vec![]),
    )?;
    let boxed_t = builder.generic_param(0, 0, boxed, "T");
    builder.generic_param_constraint(boxed_t, disposable);

    // MarkerAttribute
    let marker = builder.type_def(PUBLIC_SEALED, "Library", "MarkerAttribute", Some(attribute));
    builder.field(FieldAttributes::PUBLIC, "Note", &field(TypeSignature::String))?;
    builder.field(FieldAttributes::PUBLIC, "Tint", &field(TypeSignature::ValueType(color)))?;
    let marker_ctor = builder.method(
        CTOR,
        0,
        ".ctor",
        &instance(
            TypeSignature::Void,
            vec![
                TypeSignature::Class(system_type),
                TypeSignature::ValueType(color),
                TypeSignature::SzArray(Box::new(TypeSignature::I4)),
            ],
        ),
    )?;
    let get_level = builder.method(
        PUBLIC_ACCESSOR,
        0,
        "get_Level",
        &instance(TypeSignature::I4, vec![]),
    )?;
    let set_level = builder.method(
        PUBLIC_ACCESSOR,
        0,
        "set_Level",
        &instance(TypeSignature::Void, vec![TypeSignature::I4]),
    )?;
    let level = builder.property(
        0,
        "Level",
        &SignatureProperty {
            has_this: true,
            modifiers: vec![],
            base: TypeSignature::I4,
            params: vec![],
        },
    )?;
    builder.method_semantics(MethodSemanticsAttributes::GETTER, get_level, level);
    builder.method_semantics(MethodSemanticsAttributes::SETTER, set_level, level);

    // IShape
    let shape = builder.type_def(PUBLIC_INTERFACE, "Library", "IShape", None);
    builder.method(
        PUBLIC_ABSTRACT_METHOD,
        0,
        "Area",
        &instance(TypeSignature::R8, vec![]),
    )?;

    // References
    let list_of_int_spec = builder.type_spec(&list_of_int)?;
    let list_of_int_add = builder.member_ref(
        list_of_int_spec,
        "Add",
        &instance(TypeSignature::Void, vec![TypeSignature::GenericParamType(0)]),
    )?;
    let swap_of_int = builder.method_spec(widget_swap, &[TypeSignature::I4])?;
    let boxed_of_int = builder.type_spec(&TypeSignature::GenericInst(
        Box::new(TypeSignature::Class(boxed)),
        vec![TypeSignature::I4],
    ))?;
    let boxed_of_int_value =
        builder.field_ref(boxed_of_int, "Value", &field(TypeSignature::GenericParamType(0)))?;

    // Attributes
    let obsolete_default = builder.member_ref(
        obsolete,
        ".ctor",
        &instance(TypeSignature::Void, vec![]),
    )?;
    let obsolete_message = builder.member_ref(
        obsolete,
        ".ctor",
        &instance(TypeSignature::Void, vec![TypeSignature::String]),
    )?;
    builder.custom_attribute(Token::new(0x2000_0001), obsolete_default, &[0x01, 0x00, 0x00, 0x00])?;

    let mut message = vec![0x01, 0x00];
    ser_string(&mut message, "Use Gadget");
    message.extend_from_slice(&[0x00, 0x00]);
    builder.custom_attribute(widget, obsolete_message, &message)?;

    builder.custom_attribute(boxed, marker_ctor, &marker_blob())?;
    builder.custom_attribute(prefix, obsolete_default, &[0x01, 0x00, 0x00, 0x00])?;

    let image = builder.build()?;
    Ok((
        image,
        LibraryTokens {
            widget,
            widget_part,
            widget_hidden,
            widget_count,
            widget_items,
            widget_ctor,
            widget_resize,
            widget_swap,
            widget_describe,
            widget_size,
            widget_changed,
            color,
            broken,
            point,
            boxed,
            boxed_value,
            marker,
            marker_ctor,
            shape,
            part_ref,
            missing_nested_ref,
            ghost_ref,
            missing_system_ref,
            unresolvable_ref,
            list_of_int_add,
            swap_of_int,
            boxed_of_int_value,
        },
    ))
}

/// `[Marker(typeof(int), Color.Blue, new[] { 1, 2 }, Note = "hi", Level = 7, Tint = Color.Green)]`
pub fn marker_blob() -> Vec<u8> {
    let mut blob = vec![0x01, 0x00];
    ser_string(&mut blob, "System.Int32");
    blob.extend_from_slice(&2_i32.to_le_bytes());
    blob.extend_from_slice(&2_u32.to_le_bytes());
    blob.extend_from_slice(&1_i32.to_le_bytes());
    blob.extend_from_slice(&2_i32.to_le_bytes());

    blob.extend_from_slice(&3_u16.to_le_bytes());
    blob.extend_from_slice(&[0x53, ELEMENT_TYPE::STRING]);
    ser_string(&mut blob, "Note");
    ser_string(&mut blob, "hi");
    blob.extend_from_slice(&[0x54, ELEMENT_TYPE::I4]);
    ser_string(&mut blob, "Level");
    blob.extend_from_slice(&7_i32.to_le_bytes());
    blob.push(0x53);
    blob.push(0x55);
    ser_string(&mut blob, "Library.Color");
    ser_string(&mut blob, "Tint");
    blob.extend_from_slice(&1_i32.to_le_bytes());
    blob
}

/// An assembly that only the resolve hook knows about
pub fn other_image() -> Result<Vec<u8>> {
    let mut builder = ImageBuilder::new("Other");
    builder.identity(&other_identity())?;
    builder.type_def(PUBLIC_CLASS, "Other", "Thing", None);
    builder.build()
}

/// A registry with the core library and the library opened from memory
pub struct Fixture {
    pub registry: RegistryRc,
    pub corlib: ModuleRc,
    pub library: ModuleRc,
    pub core: CorlibTokens,
    pub tokens: LibraryTokens,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    pub fn with_config(config: RegistryConfig) -> Self {
        let (corlib_data, core) = corlib_image().unwrap();
        let (library_data, tokens) = library_image().unwrap();

        let registry = Registry::new(config);
        let corlib = registry
            .open_from_memory("/fixtures/mscorlib.dll", corlib_data)
            .unwrap();
        let library = registry
            .open_from_memory("/fixtures/Library.dll", library_data)
            .unwrap();

        Fixture {
            registry,
            corlib,
            library,
            core,
            tokens,
        }
    }

    pub fn library_type(&self, full_name: &str) -> TypeRc {
        self.library
            .type_by_name(full_name, false)
            .unwrap()
            .unwrap_or_else(|| panic!("{full_name} is not defined"))
    }

    pub fn core_type(&self, full_name: &str) -> TypeRc {
        self.registry.core_type(full_name).unwrap()
    }

    pub fn widget(&self) -> TypeRc {
        self.library.type_by_token(self.tokens.widget).unwrap()
    }
}
