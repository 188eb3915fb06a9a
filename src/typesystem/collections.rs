use std::sync::{Arc, OnceLock};

use crate::{
    members::{
        Event, EventRc, Field, FieldRc, Member, Method, MethodRc, Property, PropertyRc,
    },
    metadata::{
        tables::{EventRow, FieldRow, MethodDefRow, PropertyRow},
        token::{index_in_collection, Token, TokenKind},
    },
    typesystem::{DefinedType, TypeDescriptor, TypeRc, VisibilityMask},
    Error, Result,
};

/// Methods and constructors of a type, split from one run of `MethodDef` rows
#[derive(Default)]
pub(crate) struct MethodCollection {
    pub methods: Vec<MethodRc>,
    pub constructors: Vec<MethodRc>,
    tokens: OnceLock<MethodTokens>,
}

/// Tokens of the loaded methods and constructors, parallel to their collections
struct MethodTokens {
    methods: Vec<Token>,
    constructors: Vec<Token>,
}

/// A run of rows of one member table
pub(crate) struct Run<T> {
    pub start: u32,
    pub items: Vec<T>,
}

/// The lazily loaded member collections of a defined or constructed type
#[derive(Default)]
pub(crate) struct MemberCollections {
    methods: OnceLock<MethodCollection>,
    fields: OnceLock<Run<FieldRc>>,
    properties: OnceLock<Run<PropertyRc>>,
    events: OnceLock<Run<EventRc>>,
}

impl MemberCollections {
    /// Loads methods and constructors; with `cache_tokens` also their token arrays
    pub(crate) fn load_methods(
        &self,
        owner: &TypeRc,
        definition: &DefinedType,
        cache_tokens: bool,
    ) -> Result<&MethodCollection> {
        let collection = cached!(self.methods, || {
            let module = definition.module()?;
            let table = module.view().tables().table::<MethodDefRow>();

            let mut collection = MethodCollection::default();
            for rid in module.method_range(definition.row.rid)? {
                let method = Method::create(owner, &module, table.get(rid)?)?;
                if method.is_constructor() {
                    collection.constructors.push(method);
                } else {
                    collection.methods.push(method);
                }
            }

            log::trace!(
                "Loaded {} methods and {} constructors of {}",
                collection.methods.len(),
                collection.constructors.len(),
                definition.full_name
            );
            Ok(collection)
        });

        if cache_tokens {
            collection.tokens.get_or_init(|| MethodTokens {
                methods: collection.methods.iter().map(|m| m.token()).collect(),
                constructors: collection.constructors.iter().map(|m| m.token()).collect(),
            });
        }

        Ok(collection)
    }

    pub(crate) fn fields(&self, owner: &TypeRc, definition: &DefinedType) -> Result<&Run<FieldRc>> {
        Ok(cached!(self.fields, || {
            let module = definition.module()?;
            let table = module.view().tables().table::<FieldRow>();
            let range = module.field_range(definition.row.rid)?;

            let mut run = Run {
                start: range.start,
                items: Vec::with_capacity(range.len()),
            };
            for rid in range {
                run.items.push(Field::create(owner, &module, table.get(rid)?)?);
            }
            Ok(run)
        }))
    }

    pub(crate) fn properties(
        &self,
        owner: &TypeRc,
        definition: &DefinedType,
    ) -> Result<&Run<PropertyRc>> {
        Ok(cached!(self.properties, || {
            let module = definition.module()?;
            let table = module.view().tables().table::<PropertyRow>();
            let range = module.property_range(definition.row.rid)?;

            let mut run = Run {
                start: range.start,
                items: Vec::with_capacity(range.len()),
            };
            for rid in range {
                run.items.push(Property::create(owner, &module, table.get(rid)?)?);
            }
            Ok(run)
        }))
    }

    pub(crate) fn events(&self, owner: &TypeRc, definition: &DefinedType) -> Result<&Run<EventRc>> {
        Ok(cached!(self.events, || {
            let module = definition.module()?;
            let table = module.view().tables().table::<EventRow>();
            let range = module.event_range(definition.row.rid)?;

            let mut run = Run {
                start: range.start,
                items: Vec::with_capacity(range.len()),
            };
            for rid in range {
                run.items.push(Event::create(owner, &module, table.get(rid)?)?);
            }
            Ok(run)
        }))
    }
}

fn find_by_token<T: Clone>(run: &Run<T>, token: Token, kind: TokenKind) -> Result<T> {
    let index = index_in_collection(token, kind, run.start, run.items.len())?;
    run.items
        .get(index)
        .cloned()
        .ok_or(Error::TokenOutOfRange(token))
}

fn parameters_match(method: &MethodRc, types: &[TypeRc]) -> Result<bool> {
    let parameters = method.parameter_types()?;
    Ok(parameters.len() == types.len()
        && parameters.iter().zip(types).all(|(left, right)| left == right))
}

impl TypeDescriptor {
    fn member_source(&self) -> Option<(&MemberCollections, &DefinedType)> {
        match self {
            TypeDescriptor::Defined(definition) => Some((&definition.members, definition)),
            TypeDescriptor::ConstructedGeneric(constructed) => constructed
                .defined()
                .ok()
                .map(|definition| (&constructed.members, definition)),
            _ => None,
        }
    }

    /// Loads the methods and constructors of this type
    ///
    /// With `cache_tokens`, also builds the token arrays used by [`Self::method_by_token`] and
    /// [`Self::constructor_by_token`]. Both happen at most once per type.
    ///
    /// # Errors
    /// Returns an error if a `MethodDef` row cannot be read.
    pub fn load_methods(self: &Arc<Self>, cache_tokens: bool) -> Result<()> {
        if let Some((members, definition)) = self.member_source() {
            members.load_methods(self, definition, cache_tokens)?;
        }
        Ok(())
    }

    fn method_collection(self: &Arc<Self>, cache_tokens: bool) -> Result<Option<&MethodCollection>> {
        match self.member_source() {
            Some((members, definition)) => members
                .load_methods(self, definition, cache_tokens)
                .map(Some),
            None => Ok(None),
        }
    }

    fn field_run(self: &Arc<Self>) -> Result<Option<&Run<FieldRc>>> {
        match self.member_source() {
            Some((members, definition)) => members.fields(self, definition).map(Some),
            None => Ok(None),
        }
    }

    fn property_run(self: &Arc<Self>) -> Result<Option<&Run<PropertyRc>>> {
        match self.member_source() {
            Some((members, definition)) => members.properties(self, definition).map(Some),
            None => Ok(None),
        }
    }

    fn event_run(self: &Arc<Self>) -> Result<Option<&Run<EventRc>>> {
        match self.member_source() {
            Some((members, definition)) => members.events(self, definition).map(Some),
            None => Ok(None),
        }
    }

    /// The methods accepted by `mask`, constructors excluded
    ///
    /// # Errors
    /// Returns an error if the methods cannot be loaded.
    pub fn methods(self: &Arc<Self>, mask: VisibilityMask) -> Result<Vec<MethodRc>> {
        let Some(collection) = self.method_collection(false)? else {
            return Ok(Vec::new());
        };

        Ok(collection
            .methods
            .iter()
            .filter(|method| mask.accepts(method.is_static(), method.is_public()))
            .cloned()
            .collect())
    }

    /// The constructors (`.ctor` and `.cctor`) accepted by `mask`
    ///
    /// # Errors
    /// Returns an error if the methods cannot be loaded.
    pub fn constructors(self: &Arc<Self>, mask: VisibilityMask) -> Result<Vec<MethodRc>> {
        let Some(collection) = self.method_collection(false)? else {
            return Ok(Vec::new());
        };

        Ok(collection
            .constructors
            .iter()
            .filter(|method| mask.accepts(method.is_static(), method.is_public()))
            .cloned()
            .collect())
    }

    /// The fields accepted by `mask`
    ///
    /// # Errors
    /// Returns an error if the fields cannot be loaded.
    pub fn fields(self: &Arc<Self>, mask: VisibilityMask) -> Result<Vec<FieldRc>> {
        let Some(run) = self.field_run()? else {
            return Ok(Vec::new());
        };

        Ok(run
            .items
            .iter()
            .filter(|field| mask.accepts(field.is_static(), field.is_public()))
            .cloned()
            .collect())
    }

    /// The properties whose getter (or setter, for write-only properties) is accepted by `mask`
    ///
    /// # Errors
    /// Returns an error if the properties or their accessors cannot be loaded.
    pub fn properties(self: &Arc<Self>, mask: VisibilityMask) -> Result<Vec<PropertyRc>> {
        let Some(run) = self.property_run()? else {
            return Ok(Vec::new());
        };

        let mut properties = Vec::new();
        for property in &run.items {
            if property.accepted_by(mask)? {
                properties.push(property.clone());
            }
        }
        Ok(properties)
    }

    /// The events whose add accessor is accepted by `mask`
    ///
    /// # Errors
    /// Returns an error if the events or their accessors cannot be loaded.
    pub fn events(self: &Arc<Self>, mask: VisibilityMask) -> Result<Vec<EventRc>> {
        let Some(run) = self.event_run()? else {
            return Ok(Vec::new());
        };

        let mut events = Vec::new();
        for event in &run.items {
            if event.accepted_by(mask)? {
                events.push(event.clone());
            }
        }
        Ok(events)
    }

    /// The nested types, tested for public or non-public visibility only
    ///
    /// # Errors
    /// Returns an error if the `NestedClass` table cannot be read.
    pub fn nested_types(self: &Arc<Self>, mask: VisibilityMask) -> Result<Vec<TypeRc>> {
        let Some((_, definition)) = self.member_source() else {
            return Ok(Vec::new());
        };

        Ok(definition
            .nested_types()?
            .iter()
            .filter(|nested| {
                mask.accepts_visibility(nested.is_public() || nested.is_nested_public())
            })
            .cloned()
            .collect())
    }

    /// All members accepted by `mask`: events, fields, methods, constructors, properties
    ///
    /// # Errors
    /// Returns an error if a member collection cannot be loaded.
    pub fn members(self: &Arc<Self>, mask: VisibilityMask) -> Result<Vec<Member>> {
        let mut members: Vec<Member> = Vec::new();
        members.extend(self.events(mask)?.into_iter().map(Member::Event));
        members.extend(self.fields(mask)?.into_iter().map(Member::Field));
        members.extend(self.methods(mask)?.into_iter().map(Member::Method));
        members.extend(self.constructors(mask)?.into_iter().map(Member::Method));
        members.extend(self.properties(mask)?.into_iter().map(Member::Property));
        Ok(members)
    }

    /// The first member named `name`, in the order of [`Self::members`]
    ///
    /// # Errors
    /// Returns an error if a member collection cannot be loaded.
    pub fn member(self: &Arc<Self>, name: &str, mask: VisibilityMask) -> Result<Option<Member>> {
        Ok(self
            .members(mask)?
            .into_iter()
            .find(|member| mask.names_match(name, &member.name())))
    }

    /// The first method named `name`
    ///
    /// # Errors
    /// Returns an error if the methods cannot be loaded.
    pub fn method(self: &Arc<Self>, name: &str, mask: VisibilityMask) -> Result<Option<MethodRc>> {
        Ok(self
            .methods(mask)?
            .into_iter()
            .find(|method| mask.names_match(name, method.name())))
    }

    /// The method named `name` whose parameter types equal `types`
    ///
    /// # Errors
    /// Returns an error if the methods or their signatures cannot be loaded.
    pub fn method_with_parameters(
        self: &Arc<Self>,
        name: &str,
        mask: VisibilityMask,
        types: &[TypeRc],
    ) -> Result<Option<MethodRc>> {
        for method in self.methods(mask)? {
            if mask.names_match(name, method.name()) && parameters_match(&method, types)? {
                return Ok(Some(method));
            }
        }
        Ok(None)
    }

    /// The constructor whose parameter types equal `types`
    ///
    /// # Errors
    /// Returns an error if the constructors or their signatures cannot be loaded.
    pub fn constructor(
        self: &Arc<Self>,
        mask: VisibilityMask,
        types: &[TypeRc],
    ) -> Result<Option<MethodRc>> {
        for constructor in self.constructors(mask)? {
            if parameters_match(&constructor, types)? {
                return Ok(Some(constructor));
            }
        }
        Ok(None)
    }

    /// The first field named `name`
    ///
    /// # Errors
    /// Returns an error if the fields cannot be loaded.
    pub fn field(self: &Arc<Self>, name: &str, mask: VisibilityMask) -> Result<Option<FieldRc>> {
        Ok(self
            .fields(mask)?
            .into_iter()
            .find(|field| mask.names_match(name, field.name())))
    }

    /// The first property named `name`
    ///
    /// # Errors
    /// Returns an error if the properties cannot be loaded.
    pub fn property(
        self: &Arc<Self>,
        name: &str,
        mask: VisibilityMask,
    ) -> Result<Option<PropertyRc>> {
        Ok(self
            .properties(mask)?
            .into_iter()
            .find(|property| mask.names_match(name, property.name())))
    }

    /// The property named `name` with the given type (if any) and index parameter types
    ///
    /// # Errors
    /// Returns an error if the properties or their signatures cannot be loaded.
    pub fn property_with_signature(
        self: &Arc<Self>,
        name: &str,
        mask: VisibilityMask,
        return_type: Option<&TypeRc>,
        types: &[TypeRc],
    ) -> Result<Option<PropertyRc>> {
        for property in self.properties(mask)? {
            if !mask.names_match(name, property.name()) {
                continue;
            }

            if let Some(expected) = return_type {
                if property.property_type()? != *expected {
                    continue;
                }
            }

            let parameters = property.index_parameter_types()?;
            if parameters.len() == types.len()
                && parameters.iter().zip(types).all(|(left, right)| left == right)
            {
                return Ok(Some(property));
            }
        }
        Ok(None)
    }

    /// The first event named `name`
    ///
    /// # Errors
    /// Returns an error if the events cannot be loaded.
    pub fn event(self: &Arc<Self>, name: &str, mask: VisibilityMask) -> Result<Option<EventRc>> {
        Ok(self
            .events(mask)?
            .into_iter()
            .find(|event| mask.names_match(name, event.name())))
    }

    /// The first nested type named `name`
    ///
    /// # Errors
    /// Returns an error if the nested types cannot be loaded.
    pub fn nested_type(self: &Arc<Self>, name: &str, mask: VisibilityMask) -> Result<Option<TypeRc>> {
        Ok(self
            .nested_types(mask)?
            .into_iter()
            .find(|nested| mask.names_match(name, &nested.name())))
    }

    /// The method (constructors excluded) with `token`
    ///
    /// # Errors
    /// Returns [`Error::InvalidToken`] for tokens of other tables.
    pub fn method_by_token(self: &Arc<Self>, token: Token) -> Result<Option<MethodRc>> {
        self.method_or_constructor_by_token(token, false)
    }

    /// The constructor with `token`
    ///
    /// # Errors
    /// Returns [`Error::InvalidToken`] for tokens of other tables.
    pub fn constructor_by_token(self: &Arc<Self>, token: Token) -> Result<Option<MethodRc>> {
        self.method_or_constructor_by_token(token, true)
    }

    fn method_or_constructor_by_token(
        self: &Arc<Self>,
        token: Token,
        constructor: bool,
    ) -> Result<Option<MethodRc>> {
        if token.kind() != Some(TokenKind::MethodDef) {
            return Err(Error::InvalidToken {
                token,
                expected: "MethodDef",
            });
        }

        let Some(collection) = self.method_collection(true)? else {
            return Ok(None);
        };
        let Some(tokens) = collection.tokens.get() else {
            return Ok(None);
        };

        let (tokens, items) = if constructor {
            (&tokens.constructors, &collection.constructors)
        } else {
            (&tokens.methods, &collection.methods)
        };

        Ok(tokens
            .iter()
            .position(|candidate| *candidate == token)
            .and_then(|index| items.get(index))
            .cloned())
    }

    /// The field with `token`
    ///
    /// # Errors
    /// Returns [`Error::InvalidToken`] for tokens of other tables and
    /// [`Error::TokenOutOfRange`] for fields of other types.
    pub fn field_by_token(self: &Arc<Self>, token: Token) -> Result<FieldRc> {
        match self.field_run()? {
            Some(run) => find_by_token(run, token, TokenKind::Field),
            None => Err(Error::TokenOutOfRange(token)),
        }
    }

    /// The property with `token`
    ///
    /// # Errors
    /// Returns [`Error::InvalidToken`] for tokens of other tables and
    /// [`Error::TokenOutOfRange`] for properties of other types.
    pub fn property_by_token(self: &Arc<Self>, token: Token) -> Result<PropertyRc> {
        match self.property_run()? {
            Some(run) => find_by_token(run, token, TokenKind::Property),
            None => Err(Error::TokenOutOfRange(token)),
        }
    }

    /// The event with `token`
    ///
    /// # Errors
    /// Returns [`Error::InvalidToken`] for tokens of other tables and
    /// [`Error::TokenOutOfRange`] for events of other types.
    pub fn event_by_token(self: &Arc<Self>, token: Token) -> Result<EventRc> {
        match self.event_run()? {
            Some(run) => find_by_token(run, token, TokenKind::Event),
            None => Err(Error::TokenOutOfRange(token)),
        }
    }

    /// The nested type with `token`
    ///
    /// # Errors
    /// Returns [`Error::InvalidToken`] for tokens of other tables and
    /// [`Error::TokenOutOfRange`] if no nested type has this token.
    pub fn nested_type_by_token(self: &Arc<Self>, token: Token) -> Result<TypeRc> {
        if token.kind() != Some(TokenKind::TypeDef) {
            return Err(Error::InvalidToken {
                token,
                expected: "TypeDef",
            });
        }

        self.nested_types(VisibilityMask::ALL)?
            .into_iter()
            .find(|nested| nested.token() == token)
            .ok_or(Error::TokenOutOfRange(token))
    }

    /// The member of this type with `token`, dispatched on the token's table
    ///
    /// # Errors
    /// Returns [`Error::InvalidToken`] for tables without members and
    /// [`Error::TokenOutOfRange`] for members of other types.
    pub fn member_by_token(self: &Arc<Self>, token: Token) -> Result<Member> {
        match token.kind() {
            Some(TokenKind::MethodDef) => {
                if let Some(method) = self.method_by_token(token)? {
                    return Ok(Member::Method(method));
                }
                self.constructor_by_token(token)?
                    .map(Member::Method)
                    .ok_or(Error::TokenOutOfRange(token))
            }
            Some(TokenKind::Field) => self.field_by_token(token).map(Member::Field),
            Some(TokenKind::Property) => self.property_by_token(token).map(Member::Property),
            Some(TokenKind::Event) => self.event_by_token(token).map(Member::Event),
            Some(TokenKind::TypeDef) => self.nested_type_by_token(token).map(Member::Type),
            _ => Err(Error::InvalidToken {
                token,
                expected: "MethodDef, Field, Property, Event or TypeDef",
            }),
        }
    }
}
