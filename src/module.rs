//! One opened module and its token-level lookups.
//!
//! A [`Module`] owns the parsed [`MetadataView`] of one image. It enumerates the `TypeDef`
//! table into [`TypeDescriptor`]s on first use, resolves `TypeDef`, `TypeRef` and `TypeSpec`
//! tokens, and answers the row-range queries the descriptors use to load their members.
//!
//! Modules are created and cached by a [`Registry`]; they keep a weak reference back to it and
//! go through it whenever a reference leaves the module.

use std::{
    collections::HashMap,
    fmt,
    hash::Hash,
    ops::Range,
    path::{Path, PathBuf},
    sync::{Arc, OnceLock, Weak},
};

use dashmap::DashMap;
use uguid::Guid;

use crate::{
    customattributes::{CustomAttributeData, CustomAttributeRc},
    members::{FieldRc, Member, MethodRc},
    metadata::{
        identity::{AssemblyIdentity, AssemblyVersion},
        signatures::{
            parse_field_signature, parse_method_signature, parse_method_spec_signature,
            parse_type_spec_signature, SIGNATURE_HEADER,
        },
        tables::{
            AssemblyRefRow, AssemblyRow, ConstantRow, CustomAttributeRow, EventMapRow,
            GenericParamConstraintRow, GenericParamRow, InterfaceImplRow, MemberRefRow,
            MethodDefRow, MethodSemanticsRow, MethodSpecRow, ModuleRefRow, ModuleRow,
            NestedClassRow, ParamRow, PropertyMapRow, RowReadable, TableId, TypeDefRow,
            TypeRefRow, TypeSpecRow,
        },
        token::{index_in_collection, Token, TokenKind},
        view::MetadataView,
    },
    registry::{Registry, RegistryRc},
    resolver::{GenericContext, Resolver},
    typesystem::{DefinedType, TypeDefNames, TypeRc, VisibilityMask},
    utils::names_equal,
    Error, Result,
};

/// Reference to a [`Module`]
pub type ModuleRc = Arc<Module>;

/// An opened module image
pub struct Module {
    me: Weak<Module>,
    registry: Weak<Registry>,
    registry_id: u64,
    max_depth: usize,
    location: PathBuf,
    view: MetadataView,
    name: String,
    mvid: Guid,
    identity: AssemblyIdentity,
    assembly_display: Arc<str>,
    types: OnceLock<Vec<TypeRc>>,
    type_refs: DashMap<u32, TypeRc>,
    constructed: DashMap<String, TypeRc>,
    custom_attributes: OnceLock<Vec<CustomAttributeRc>>,
    index: RowIndex,
}

/// Owner lookups over the child tables, each built on first use
#[derive(Default)]
struct RowIndex {
    field_lists: OnceLock<Vec<u32>>,
    method_lists: OnceLock<Vec<u32>>,
    param_lists: OnceLock<Vec<u32>>,
    property_maps: OnceLock<MapRuns>,
    event_maps: OnceLock<MapRuns>,
    nested_types: OnceLock<HashMap<u32, Vec<u32>>>,
    generic_params: OnceLock<HashMap<Token, Vec<GenericParamRow>>>,
    constraints: OnceLock<HashMap<u32, Vec<Token>>>,
    interfaces: OnceLock<HashMap<u32, Vec<Token>>>,
    semantics: OnceLock<HashMap<Token, Vec<MethodSemanticsRow>>>,
    constants: OnceLock<HashMap<Token, ConstantRow>>,
    attributes: OnceLock<HashMap<Token, Vec<CustomAttributeRow>>>,
}

/// The list column of a `PropertyMap` or `EventMap` table and the row of each parent
struct MapRuns {
    lists: Vec<u32>,
    positions: HashMap<u32, usize>,
}

impl MapRuns {
    fn new(rows: impl Iterator<Item = (u32, u32)>) -> Self {
        let mut lists = Vec::new();
        let mut positions = HashMap::new();
        for (index, (parent, list)) in rows.enumerate() {
            lists.push(list);
            positions.entry(parent).or_insert(index);
        }
        MapRuns { lists, positions }
    }

    fn run(&self, parent: u32, child_count: u32) -> Range<u32> {
        match self.positions.get(&parent) {
            Some(&index) => child_run(&self.lists, index, child_count),
            None => 0..0,
        }
    }
}

/// Groups `rows` by owner, keeping table order within each group
fn group_by_owner<R, K, V>(rows: Vec<R>, split: impl Fn(R) -> (K, V)) -> HashMap<K, Vec<V>>
where
    K: Eq + Hash,
{
    let mut groups: HashMap<K, Vec<V>> = HashMap::new();
    for row in rows {
        let (owner, value) = split(row);
        groups.entry(owner).or_default().push(value);
    }
    groups
}

/// The run of rows of a child table owned by `index`, given the list column of every owner
fn child_run(lists: &[u32], index: usize, child_count: u32) -> Range<u32> {
    let Some(&start) = lists.get(index) else {
        return 0..0;
    };

    let end = lists.get(index + 1).copied().unwrap_or(child_count + 1);
    let start = start.clamp(1, child_count + 1);
    let end = end.clamp(start, child_count + 1);
    start..end
}

impl Module {
    pub(crate) fn load(
        registry: &RegistryRc,
        location: PathBuf,
        view: MetadataView,
    ) -> Result<ModuleRc> {
        let tables = view.tables();

        let module_row = tables.table::<ModuleRow>().get(1)?;
        let name = view.string(module_row.name)?.to_string();
        let mvid = view.guid(module_row.mvid)?;

        let identity = if tables.has_table(TableId::Assembly) {
            let assembly = tables.table::<AssemblyRow>().get(1)?;
            AssemblyIdentity::from_assembly_row(&view, &assembly)?
        } else {
            let simple = Path::new(&name)
                .file_stem()
                .map_or_else(|| name.clone(), |stem| stem.to_string_lossy().into_owned());
            AssemblyIdentity::new(simple, AssemblyVersion::default())
        };
        let assembly_display: Arc<str> = Arc::from(identity.display_name());

        log::debug!("Loaded module {} ({})", name, assembly_display);

        Ok(Arc::new_cyclic(|me| Module {
            me: me.clone(),
            registry: Arc::downgrade(registry),
            registry_id: registry.id(),
            max_depth: registry.config().max_resolution_depth,
            location,
            view,
            name,
            mvid,
            identity,
            assembly_display,
            types: OnceLock::new(),
            type_refs: DashMap::new(),
            constructed: DashMap::new(),
            custom_attributes: OnceLock::new(),
            index: RowIndex::default(),
        }))
    }

    /// The module name from the `Module` table, e.g. `Library.dll`
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The module version id
    #[must_use]
    pub fn mvid(&self) -> Guid {
        self.mvid
    }

    /// The runtime version string of the metadata root
    #[must_use]
    pub fn runtime_version(&self) -> &str {
        self.view.runtime_version()
    }

    /// The path the module was opened from
    #[must_use]
    pub fn location(&self) -> &Path {
        &self.location
    }

    /// The identity of the assembly this module defines
    ///
    /// Modules without an `Assembly` row get their module name without extension and version
    /// `0.0.0.0`.
    #[must_use]
    pub fn identity(&self) -> &AssemblyIdentity {
        &self.identity
    }

    /// The parsed metadata
    #[must_use]
    pub fn view(&self) -> &MetadataView {
        &self.view
    }

    /// The registry that opened this module
    ///
    /// # Errors
    /// Returns [`Error::Released`] if the registry has been dropped.
    pub fn registry(&self) -> Result<RegistryRc> {
        self.registry.upgrade().ok_or(Error::Released)
    }

    /// Identifies the registry that opened this module
    #[must_use]
    pub fn registry_id(&self) -> u64 {
        self.registry_id
    }

    pub(crate) fn weak(&self) -> Weak<Module> {
        self.me.clone()
    }

    pub(crate) fn max_depth(&self) -> usize {
        self.max_depth
    }

    fn rows<T: RowReadable>(&self) -> Result<Vec<T>> {
        self.view.tables().table::<T>().iter().collect()
    }

    /// Every type defined in this module, in `TypeDef` row order
    ///
    /// # Errors
    /// Returns an error if the `TypeDef` or `NestedClass` tables cannot be read, or
    /// [`Error::Malformed`] for cyclic nesting.
    pub fn types(&self) -> Result<&[TypeRc]> {
        let types = cached!(self.types, || {
            let rows = self.rows::<TypeDefRow>()?;

            let enclosing: HashMap<u32, u32> = self
                .rows::<NestedClassRow>()?
                .into_iter()
                .map(|row| (row.nested_class, row.enclosing_class))
                .collect();

            let mut parameter_counts: HashMap<u32, usize> = HashMap::new();
            for row in self.rows::<GenericParamRow>()? {
                if row.owner.kind() == Some(TokenKind::TypeDef) {
                    *parameter_counts.entry(row.owner.row()).or_default() += 1;
                }
            }

            let mut types = Vec::with_capacity(rows.len());
            for row in &rows {
                let names = self.type_def_names(&rows, &enclosing, row)?;
                let count = parameter_counts.get(&row.rid).copied().unwrap_or(0);
                types.push(DefinedType::create(
                    self,
                    *row,
                    names,
                    count,
                    self.assembly_display.clone(),
                ));
            }

            log::trace!("Loaded {} types of {}", types.len(), self.name);
            Ok(types)
        });

        Ok(types.as_slice())
    }

    fn type_def_names(
        &self,
        rows: &[TypeDefRow],
        enclosing: &HashMap<u32, u32>,
        row: &TypeDefRow,
    ) -> Result<TypeDefNames> {
        let name = self.view.string(row.name)?.to_string();

        let mut path = vec![name.clone()];
        let mut outermost = *row;
        while let Some(&outer) = enclosing.get(&outermost.rid) {
            if path.len() > rows.len() {
                return Err(malformed_error!(
                    "Cyclic nesting of TypeDef row {}",
                    row.rid
                ));
            }

            outermost = *outer
                .checked_sub(1)
                .and_then(|index| rows.get(index as usize))
                .ok_or_else(|| malformed_error!("Invalid enclosing class row {}", outer))?;
            path.push(self.view.string(outermost.name)?.to_string());
        }

        path.reverse();
        let namespace = self.view.string(outermost.namespace)?.to_string();
        let nested_name = path.join("+");
        let full_name = if namespace.is_empty() {
            nested_name
        } else {
            format!("{namespace}.{nested_name}")
        };

        Ok(TypeDefNames {
            name,
            namespace,
            full_name,
            enclosing: enclosing.get(&row.rid).copied(),
        })
    }

    /// The type with the given full name (`Namespace.Outer+Inner`)
    ///
    /// # Errors
    /// Returns an error if the types cannot be enumerated.
    pub fn type_by_name(&self, full_name: &str, ignore_case: bool) -> Result<Option<TypeRc>> {
        Ok(self
            .types()?
            .iter()
            .find(|ty| names_equal(full_name, &ty.full_name(), ignore_case))
            .cloned())
    }

    /// The type defined by a `TypeDef` token
    ///
    /// # Errors
    /// Returns [`Error::InvalidToken`] for other tables and [`Error::TokenOutOfRange`] for rows
    /// past the table.
    pub fn type_by_token(&self, token: Token) -> Result<TypeRc> {
        let types = self.types()?;
        let index = index_in_collection(token, TokenKind::TypeDef, 1, types.len())?;
        types.get(index).cloned().ok_or(Error::TokenOutOfRange(token))
    }

    /// Resolves a `TypeDef`, `TypeRef` or `TypeSpec` token
    ///
    /// `type_arguments` and `method_arguments` substitute generic parameters of `TypeSpec`
    /// signatures; a generic `TypeDef` with type arguments is constructed with them.
    ///
    /// # Errors
    /// Returns [`Error::InvalidToken`] for other tables, or any resolution error.
    pub fn resolve_type(
        &self,
        token: Token,
        type_arguments: &[TypeRc],
        method_arguments: &[TypeRc],
    ) -> Result<TypeRc> {
        let context = GenericContext::new(type_arguments.to_vec(), method_arguments.to_vec());
        let resolved = self.resolve_type_token(token, &context, 0)?;

        if token.kind() == Some(TokenKind::TypeDef)
            && !type_arguments.is_empty()
            && resolved.is_generic_type_definition()
        {
            return resolved.construct(type_arguments);
        }

        Ok(resolved)
    }

    pub(crate) fn resolve_type_token(
        &self,
        token: Token,
        context: &GenericContext,
        depth: usize,
    ) -> Result<TypeRc> {
        if depth > self.max_depth {
            return Err(Error::RecursionLimit(self.max_depth));
        }

        match token.kind() {
            Some(TokenKind::TypeDef) => self.type_by_token(token),
            Some(TokenKind::TypeRef) => self.resolve_type_ref(token, depth),
            Some(TokenKind::TypeSpec) => {
                let row = self.row::<TypeSpecRow>(token)?;
                let signature = parse_type_spec_signature(self.view.blob(row.signature)?)?;
                Resolver::new(self, context)
                    .with_depth(depth + 1)
                    .resolve(&signature.base)
            }
            _ => Err(Error::InvalidToken {
                token,
                expected: "TypeDef, TypeRef or TypeSpec",
            }),
        }
    }

    fn row<T: RowReadable>(&self, token: Token) -> Result<T> {
        let table = self.view.tables().table::<T>();
        if token.is_null() || token.row() > table.row_count() {
            return Err(Error::TokenOutOfRange(token));
        }
        table.get(token.row())
    }

    fn resolve_type_ref(&self, token: Token, depth: usize) -> Result<TypeRc> {
        if let Some(cached) = self.type_refs.get(&token.row()) {
            return Ok(cached.value().clone());
        }

        if depth > self.max_depth {
            return Err(Error::RecursionLimit(self.max_depth));
        }

        let row = self.row::<TypeRefRow>(token)?;
        let name = self.view.string(row.name)?;
        let namespace = self.view.string(row.namespace)?;
        let full_name = if namespace.is_empty() {
            name.to_string()
        } else {
            format!("{namespace}.{name}")
        };

        let scope = row.resolution_scope;
        let found = match scope.kind() {
            Some(TokenKind::TypeRef) if !scope.is_null() => {
                let parent = self.resolve_type_ref(scope, depth + 1)?;
                let nested = parent.nested_type(&full_name, VisibilityMask::ALL)?;
                if nested.is_none() {
                    return Err(Error::UnresolvedType(format!(
                        "{}+{}",
                        parent.full_name(),
                        full_name
                    )));
                }
                nested
            }
            Some(TokenKind::AssemblyRef) if !scope.is_null() => {
                let identity = self.assembly_ref(scope.row())?;
                log::debug!("Resolving {} in {}", full_name, identity.display_name());
                self.registry()?
                    .resolve_module(&identity)?
                    .type_by_name(&full_name, false)?
            }
            Some(TokenKind::ModuleRef) if !scope.is_null() => {
                let module_name = self.view.string(self.row::<ModuleRefRow>(scope)?.name)?;
                let mut found = None;
                for module in self.registry()?.modules() {
                    if module.name().eq_ignore_ascii_case(module_name) {
                        found = module.type_by_name(&full_name, false)?;
                        if found.is_some() {
                            break;
                        }
                    }
                }
                found
            }
            _ => self.type_by_name(&full_name, false)?,
        };

        let resolved = match found {
            Some(resolved) => resolved,
            None if full_name.starts_with("System.") => {
                log::warn!(
                    "{} not found in its resolution scope, falling back to the core library",
                    full_name
                );
                self.registry()?.core_type(&full_name)?
            }
            None => return Err(Error::UnresolvedType(full_name)),
        };

        Ok(self
            .type_refs
            .entry(token.row())
            .or_insert(resolved)
            .value()
            .clone())
    }

    pub(crate) fn intern_constructed<F>(&self, key: String, build: F) -> Result<TypeRc>
    where
        F: FnOnce() -> Result<TypeRc>,
    {
        if let Some(existing) = self.constructed.get(&key) {
            return Ok(existing.value().clone());
        }

        let built = build()?;
        Ok(self.constructed.entry(key).or_insert(built).value().clone())
    }

    fn assembly_ref(&self, rid: u32) -> Result<AssemblyIdentity> {
        let row = self.row::<AssemblyRefRow>(TokenKind::AssemblyRef.token(rid))?;
        AssemblyIdentity::from_assembly_ref_row(&self.view, &row)
    }

    /// The identities named by the `AssemblyRef` table
    ///
    /// # Errors
    /// Returns an error if an `AssemblyRef` row cannot be read.
    pub fn referenced_assemblies(&self) -> Result<Vec<AssemblyIdentity>> {
        self.rows::<AssemblyRefRow>()?
            .iter()
            .map(|row| AssemblyIdentity::from_assembly_ref_row(&self.view, row))
            .collect()
    }

    /// The custom attributes applied to the assembly
    ///
    /// # Errors
    /// Returns an error if the `CustomAttribute` table cannot be read.
    pub fn custom_attributes(&self) -> Result<Vec<CustomAttributeRc>> {
        Ok(cached!(self.custom_attributes, || self
            .custom_attributes_of(TokenKind::Assembly.token(1)))
        .clone())
    }

    /// Resolves a `Field` or field `MemberRef` token
    ///
    /// # Errors
    /// Returns [`Error::InvalidToken`] for other tables, or any resolution error.
    pub fn resolve_field(
        &self,
        token: Token,
        type_arguments: &[TypeRc],
        method_arguments: &[TypeRc],
    ) -> Result<FieldRc> {
        let context = GenericContext::new(type_arguments.to_vec(), method_arguments.to_vec());

        match token.kind() {
            Some(TokenKind::Field) => {
                let mut declaring =
                    self.declaring_type_of(token, self.field_lists()?, TableId::Field)?;
                if !type_arguments.is_empty() && declaring.is_generic_type_definition() {
                    declaring = declaring.construct(type_arguments)?;
                }
                declaring.field_by_token(token)
            }
            Some(TokenKind::MemberRef) => {
                let row = self.row::<MemberRefRow>(token)?;
                let blob = self.view.blob(row.signature)?;
                if blob.first() != Some(&SIGNATURE_HEADER::FIELD) {
                    return Err(Error::InvalidToken {
                        token,
                        expected: "field MemberRef",
                    });
                }
                parse_field_signature(blob)?;

                let parent = self.resolve_type_token(row.class, &context, 0)?;
                let name = self.view.string(row.name)?;
                parent
                    .field(name, VisibilityMask::ALL)?
                    .ok_or_else(|| Error::UnresolvedType(format!("{}::{}", parent.full_name(), name)))
            }
            _ => Err(Error::InvalidToken {
                token,
                expected: "Field or MemberRef",
            }),
        }
    }

    /// Resolves a `MethodDef`, method `MemberRef` or `MethodSpec` token
    ///
    /// Type arguments construct a generic declaring type; method arguments instantiate a generic
    /// method definition.
    ///
    /// # Errors
    /// Returns [`Error::InvalidToken`] for other tables, or any resolution error.
    pub fn resolve_method(
        &self,
        token: Token,
        type_arguments: &[TypeRc],
        method_arguments: &[TypeRc],
    ) -> Result<MethodRc> {
        let context = GenericContext::new(type_arguments.to_vec(), method_arguments.to_vec());

        let method = match token.kind() {
            Some(TokenKind::MethodDef) => {
                let mut declaring =
                    self.declaring_type_of(token, self.method_lists()?, TableId::MethodDef)?;
                if !type_arguments.is_empty() && declaring.is_generic_type_definition() {
                    declaring = declaring.construct(type_arguments)?;
                }

                match declaring.method_by_token(token)? {
                    Some(method) => method,
                    None => declaring
                        .constructor_by_token(token)?
                        .ok_or(Error::TokenOutOfRange(token))?,
                }
            }
            Some(TokenKind::MemberRef) => {
                let row = self.row::<MemberRefRow>(token)?;
                if self.view.blob(row.signature)?.first() == Some(&SIGNATURE_HEADER::FIELD) {
                    return Err(Error::InvalidToken {
                        token,
                        expected: "method MemberRef",
                    });
                }
                return self.resolve_member_ref_method(&row, &context, 0);
            }
            Some(TokenKind::MethodSpec) => {
                let row = self.row::<MethodSpecRow>(token)?;
                let definition = self.resolve_method(row.method, type_arguments, &[])?;
                let instantiation =
                    parse_method_spec_signature(self.view.blob(row.instantiation)?)?;

                let resolver = Resolver::new(self, &context);
                let arguments = instantiation
                    .generic_args
                    .iter()
                    .map(|argument| resolver.resolve(argument))
                    .collect::<Result<Vec<_>>>()?;
                return definition.make_generic_method(&arguments);
            }
            _ => {
                return Err(Error::InvalidToken {
                    token,
                    expected: "MethodDef, MemberRef or MethodSpec",
                })
            }
        };

        if method_arguments.is_empty() || !method.is_generic_method_definition()? {
            Ok(method)
        } else {
            method.make_generic_method(method_arguments)
        }
    }

    /// Finds the method a `MemberRef` row refers to on its resolved parent
    ///
    /// Candidates are matched by name and by parameter types, with `!!n` of the reference
    /// bound to each candidate's own generic parameters.
    pub(crate) fn resolve_member_ref_method(
        &self,
        row: &MemberRefRow,
        context: &GenericContext,
        depth: usize,
    ) -> Result<MethodRc> {
        let parent = match row.class.kind() {
            Some(TokenKind::MethodDef) => {
                return self.resolve_method(row.class, &context.type_arguments, &[]);
            }
            _ => self.resolve_type_token(row.class, context, depth + 1)?,
        };

        let name = self.view.string(row.name)?;
        let signature = parse_method_signature(self.view.blob(row.signature)?)?;
        let type_arguments = parent.generic_arguments()?;

        let candidates = if name == ".ctor" || name == ".cctor" {
            parent.constructors(VisibilityMask::ALL)?
        } else {
            parent.methods(VisibilityMask::ALL)?
        };

        for candidate in candidates {
            if candidate.name() != name {
                continue;
            }

            let declared = candidate.signature()?;
            if declared.params.len() != signature.params.len()
                || declared.param_count_generic != signature.param_count_generic
                || declared.has_this != signature.has_this
            {
                continue;
            }

            let candidate_context =
                GenericContext::new(type_arguments.clone(), candidate.generic_arguments()?);
            let resolver = Resolver::new(self, &candidate_context).with_depth(depth + 1);
            let referenced = signature
                .params
                .iter()
                .map(|parameter| resolver.resolve_parameter(parameter))
                .collect::<Result<Vec<_>>>()?;

            if referenced.as_slice() == candidate.parameter_types()? {
                return Ok(candidate);
            }
        }

        Err(Error::UnresolvedType(format!(
            "{}::{}",
            parent.full_name(),
            name
        )))
    }

    /// Resolves any member token: as a method, then as a field, then as a type
    ///
    /// The table of `token` (and for a `MemberRef`, its signature kind) picks the
    /// interpretation; errors of that interpretation are returned unchanged.
    ///
    /// # Errors
    /// Returns [`Error::TokenOutOfRange`] if the token names no method, field or type table,
    /// or any resolution error.
    pub fn resolve_member(
        &self,
        token: Token,
        type_arguments: &[TypeRc],
        method_arguments: &[TypeRc],
    ) -> Result<Member> {
        let is_field_ref = match token.kind() {
            Some(TokenKind::MemberRef) => {
                let row = self.row::<MemberRefRow>(token)?;
                self.view.blob(row.signature)?.first() == Some(&SIGNATURE_HEADER::FIELD)
            }
            _ => false,
        };

        match token.kind() {
            Some(TokenKind::MethodDef | TokenKind::MethodSpec) => self
                .resolve_method(token, type_arguments, method_arguments)
                .map(Member::Method),
            Some(TokenKind::MemberRef) if !is_field_ref => self
                .resolve_method(token, type_arguments, method_arguments)
                .map(Member::Method),
            Some(TokenKind::Field | TokenKind::MemberRef) => self
                .resolve_field(token, type_arguments, method_arguments)
                .map(Member::Field),
            Some(TokenKind::TypeDef | TokenKind::TypeRef | TokenKind::TypeSpec) => self
                .resolve_type(token, type_arguments, method_arguments)
                .map(Member::Type),
            _ => Err(Error::TokenOutOfRange(token)),
        }
    }

    /// The type whose member run contains the row of `token`
    fn declaring_type_of(
        &self,
        token: Token,
        lists: &[u32],
        children: TableId,
    ) -> Result<TypeRc> {
        let count = self.view.tables().row_count(children);

        let index = (0..lists.len())
            .find(|&index| child_run(lists, index, count).contains(&token.row()))
            .ok_or(Error::TokenOutOfRange(token))?;
        self.types()?
            .get(index)
            .cloned()
            .ok_or(Error::TokenOutOfRange(token))
    }

    fn field_lists(&self) -> Result<&[u32]> {
        Ok(cached!(self.index.field_lists, || Ok(self
            .rows::<TypeDefRow>()?
            .iter()
            .map(|row| row.field_list)
            .collect()))
        .as_slice())
    }

    fn method_lists(&self) -> Result<&[u32]> {
        Ok(cached!(self.index.method_lists, || Ok(self
            .rows::<TypeDefRow>()?
            .iter()
            .map(|row| row.method_list)
            .collect()))
        .as_slice())
    }

    pub(crate) fn field_range(&self, type_rid: u32) -> Result<Range<u32>> {
        Ok(child_run(
            self.field_lists()?,
            type_rid.saturating_sub(1) as usize,
            self.view.tables().row_count(TableId::Field),
        ))
    }

    pub(crate) fn method_range(&self, type_rid: u32) -> Result<Range<u32>> {
        Ok(child_run(
            self.method_lists()?,
            type_rid.saturating_sub(1) as usize,
            self.view.tables().row_count(TableId::MethodDef),
        ))
    }

    pub(crate) fn param_rows(&self, method_rid: u32) -> Result<Vec<ParamRow>> {
        let tables = self.view.tables();
        let lists = cached!(self.index.param_lists, || Ok(self
            .rows::<MethodDefRow>()?
            .iter()
            .map(|row| row.param_list)
            .collect::<Vec<u32>>()));
        let range = child_run(
            lists,
            method_rid.saturating_sub(1) as usize,
            tables.row_count(TableId::Param),
        );

        let table = tables.table::<ParamRow>();
        range.map(|rid| table.get(rid)).collect()
    }

    pub(crate) fn property_range(&self, type_rid: u32) -> Result<Range<u32>> {
        let maps = cached!(self.index.property_maps, || Ok(MapRuns::new(
            self.rows::<PropertyMapRow>()?
                .into_iter()
                .map(|map| (map.parent, map.property_list))
        )));
        Ok(maps.run(type_rid, self.view.tables().row_count(TableId::Property)))
    }

    pub(crate) fn event_range(&self, type_rid: u32) -> Result<Range<u32>> {
        let maps = cached!(self.index.event_maps, || Ok(MapRuns::new(
            self.rows::<EventMapRow>()?
                .into_iter()
                .map(|map| (map.parent, map.event_list))
        )));
        Ok(maps.run(type_rid, self.view.tables().row_count(TableId::Event)))
    }

    pub(crate) fn nested_type_rids(&self, enclosing_rid: u32) -> Result<Vec<u32>> {
        let nested = cached!(self.index.nested_types, || Ok(group_by_owner(
            self.rows::<NestedClassRow>()?,
            |row| (row.enclosing_class, row.nested_class)
        )));
        Ok(nested.get(&enclosing_rid).cloned().unwrap_or_default())
    }

    pub(crate) fn generic_params(&self, owner: Token) -> Result<Vec<GenericParamRow>> {
        let params = cached!(self.index.generic_params, || {
            let mut params =
                group_by_owner(self.rows::<GenericParamRow>()?, |row| (row.owner, row));
            for group in params.values_mut() {
                group.sort_by_key(|row| row.number);
            }
            Ok(params)
        });
        Ok(params.get(&owner).cloned().unwrap_or_default())
    }

    pub(crate) fn generic_param_constraints(&self, param_rid: u32) -> Result<Vec<Token>> {
        let constraints = cached!(self.index.constraints, || Ok(group_by_owner(
            self.rows::<GenericParamConstraintRow>()?,
            |row| (row.owner, row.constraint)
        )));
        Ok(constraints.get(&param_rid).cloned().unwrap_or_default())
    }

    pub(crate) fn interface_tokens(&self, type_rid: u32) -> Result<Vec<Token>> {
        let interfaces = cached!(self.index.interfaces, || Ok(group_by_owner(
            self.rows::<InterfaceImplRow>()?,
            |row| (row.class, row.interface)
        )));
        Ok(interfaces.get(&type_rid).cloned().unwrap_or_default())
    }

    pub(crate) fn semantics(&self, association: Token) -> Result<Vec<MethodSemanticsRow>> {
        let semantics = cached!(self.index.semantics, || Ok(group_by_owner(
            self.rows::<MethodSemanticsRow>()?,
            |row| (row.association, row)
        )));
        Ok(semantics.get(&association).cloned().unwrap_or_default())
    }

    pub(crate) fn constant(&self, parent: Token) -> Result<Option<ConstantRow>> {
        let constants = cached!(self.index.constants, || {
            let mut constants = HashMap::new();
            for row in self.rows::<ConstantRow>()? {
                constants.entry(row.parent).or_insert(row);
            }
            Ok(constants)
        });
        Ok(constants.get(&parent).copied())
    }

    pub(crate) fn custom_attributes_of(&self, parent: Token) -> Result<Vec<CustomAttributeRc>> {
        let attributes = cached!(self.index.attributes, || Ok(group_by_owner(
            self.rows::<CustomAttributeRow>()?,
            |row| (row.parent, row)
        )));
        Ok(attributes
            .get(&parent)
            .map(|rows| {
                rows.iter()
                    .map(|row| CustomAttributeData::new(self, *row))
                    .collect()
            })
            .unwrap_or_default())
    }
}

impl fmt::Debug for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Module")
            .field("name", &self.name)
            .field("identity", &self.assembly_display)
            .field("location", &self.location)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn child_runs() {
        // Three owners over five children: [1, 3), [3, 3), [3, 6)
        let lists = [1, 3, 3];
        assert_eq!(child_run(&lists, 0, 5), 1..3);
        assert_eq!(child_run(&lists, 1, 5), 3..3);
        assert_eq!(child_run(&lists, 2, 5), 3..6);
        assert_eq!(child_run(&lists, 3, 5), 0..0);
    }

    #[test]
    fn child_runs_clamp_invalid_lists() {
        assert_eq!(child_run(&[0, 9], 0, 2), 1..3);
        assert_eq!(child_run(&[9], 0, 2), 3..3);
    }

    #[test]
    fn map_runs_by_parent() {
        // Parents 4 and 2 own properties [1, 3) and [3, 5); 4 appears twice
        let maps = MapRuns::new([(4, 1), (2, 3), (4, 5)].into_iter());
        assert_eq!(maps.run(4, 4), 1..3);
        assert_eq!(maps.run(2, 4), 3..5);
        assert_eq!(maps.run(7, 4), 0..0);
    }

    #[test]
    fn owner_groups_keep_table_order() {
        let groups = group_by_owner(vec![(1, 'a'), (2, 'b'), (1, 'c')], |row| row);
        assert_eq!(groups[&1], vec!['a', 'c']);
        assert_eq!(groups[&2], vec!['b']);
        assert!(!groups.contains_key(&3));
    }

    #[test]
    fn child_table_indexes_are_built_once() {
        let fixture = crate::test::Fixture::new();
        let library = &fixture.library;
        assert!(library.index.semantics.get().is_none());
        assert!(library.index.param_lists.get().is_none());

        let size = library.semantics(fixture.tokens.widget_size).unwrap();
        assert_eq!(size.len(), 2);
        let built: *const _ = library.index.semantics.get().unwrap();

        for property in fixture.widget().properties(VisibilityMask::ALL).unwrap() {
            property.can_read().unwrap();
        }
        assert!(std::ptr::eq(built, library.index.semantics.get().unwrap()));
        assert_eq!(library.semantics(fixture.tokens.widget_size).unwrap().len(), 2);

        let resize = library.resolve_method(fixture.tokens.widget_resize, &[], &[]).unwrap();
        let first = resize.parameters().unwrap().len();
        let lists: *const _ = library.index.param_lists.get().unwrap();
        assert_eq!(resize.parameters().unwrap().len(), first);
        assert!(std::ptr::eq(lists, library.index.param_lists.get().unwrap()));
    }

    mod resolution {
        use super::super::*;
        use crate::test::Fixture;

        #[test]
        fn type_refs_across_modules() {
            let fixture = Fixture::new();
            let widget = fixture.widget();

            let object = widget.base_type().unwrap().unwrap();
            assert!(Arc::ptr_eq(
                &object,
                &fixture.corlib.type_by_token(fixture.core.object).unwrap()
            ));
            assert_eq!(object.module().unwrap().name(), fixture.corlib.name());
        }

        #[test]
        fn nested_type_refs() {
            let fixture = Fixture::new();

            let part = fixture
                .library
                .resolve_type(fixture.tokens.part_ref, &[], &[])
                .unwrap();
            assert!(Arc::ptr_eq(
                &part,
                &fixture.library.type_by_token(fixture.tokens.widget_part).unwrap()
            ));

            assert!(matches!(
                fixture.library.resolve_type(fixture.tokens.missing_nested_ref, &[], &[]),
                Err(Error::UnresolvedType(name)) if name == "Library.Widget+Missing"
            ));
        }

        #[test]
        fn missing_types() {
            let fixture = Fixture::new();

            assert!(matches!(
                fixture.library.resolve_type(fixture.tokens.ghost_ref, &[], &[]),
                Err(Error::UnresolvedType(name)) if name == "Library.Ghost"
            ));
            assert!(matches!(
                fixture.library.resolve_type(fixture.tokens.missing_system_ref, &[], &[]),
                Err(Error::UnresolvedType(name)) if name == "System.Missing"
            ));
            assert!(matches!(
                fixture.library.resolve_type(fixture.tokens.unresolvable_ref, &[], &[]),
                Err(Error::UnresolvableModule(name)) if name.starts_with("Other, Version=2.0.0.0")
            ));
        }

        #[test]
        fn generic_type_definitions_with_arguments() {
            let fixture = Fixture::new();
            let int32 = fixture.core_type("System.Int32");

            let boxed = fixture
                .library
                .resolve_type(fixture.tokens.boxed, &[int32.clone()], &[])
                .unwrap();
            assert!(boxed.is_constructed_generic_type());
            assert_eq!(boxed.generic_arguments().unwrap(), vec![int32]);
        }

        #[test]
        fn member_ref_on_constructed_type() {
            let fixture = Fixture::new();

            let add = fixture
                .library
                .resolve_method(fixture.tokens.list_of_int_add, &[], &[])
                .unwrap();
            assert_eq!(add.name(), "Add");
            assert_eq!(add.token(), fixture.core.list_add);

            let declaring = add.declaring_type().unwrap();
            assert!(declaring.is_constructed_generic_type());
            assert_eq!(
                declaring.to_string(),
                "System.Collections.Generic.List`1[System.Int32]"
            );
            assert_eq!(add.parameter_types().unwrap()[0].full_name(), "System.Int32");
        }

        #[test]
        fn method_specs() {
            let fixture = Fixture::new();

            let swap = fixture
                .library
                .resolve_method(fixture.tokens.swap_of_int, &[], &[])
                .unwrap();
            assert!(swap.is_constructed_generic_method());
            assert_eq!(swap.to_string(), "Void Swap[Int32](Int32&, Int32&)");
        }

        #[test]
        fn field_refs() {
            let fixture = Fixture::new();

            let value = fixture
                .library
                .resolve_field(fixture.tokens.boxed_of_int_value, &[], &[])
                .unwrap();
            assert_eq!(value.name(), "Value");
            assert_eq!(value.field_type().unwrap().full_name(), "System.Int32");

            let definition = fixture
                .library
                .resolve_field(fixture.tokens.boxed_value, &[], &[])
                .unwrap();
            assert!(definition.field_type().unwrap().is_generic_parameter());

            assert!(matches!(
                fixture.library.resolve_field(fixture.tokens.list_of_int_add, &[], &[]),
                Err(Error::InvalidToken { .. })
            ));
        }

        #[test]
        fn members_by_token() {
            let fixture = Fixture::new();

            let method = fixture
                .library
                .resolve_member(fixture.tokens.widget_resize, &[], &[])
                .unwrap();
            assert!(method.as_method().is_some());

            let field = fixture
                .library
                .resolve_member(fixture.tokens.widget_count, &[], &[])
                .unwrap();
            assert_eq!(field.name(), "_count");

            let ty = fixture
                .library
                .resolve_member(fixture.tokens.shape, &[], &[])
                .unwrap();
            assert!(ty.as_type().is_some_and(|ty| ty.is_interface()));

            assert!(matches!(
                fixture.library.resolve_member(Token::new(0x0600_0FFF), &[], &[]),
                Err(Error::TokenOutOfRange(_))
            ));
            assert!(matches!(
                fixture.library.resolve_member(TokenKind::Param.token(1), &[], &[]),
                Err(Error::TokenOutOfRange(_))
            ));
        }

        #[test]
        fn member_resolution_errors_propagate() {
            let fixture = Fixture::new();

            assert!(matches!(
                fixture
                    .library
                    .resolve_member(fixture.tokens.unresolvable_ref, &[], &[]),
                Err(Error::UnresolvableModule(name)) if name.starts_with("Other")
            ));
            assert!(matches!(
                fixture
                    .library
                    .resolve_member(fixture.tokens.missing_nested_ref, &[], &[]),
                Err(Error::UnresolvedType(_))
            ));
        }

        #[test]
        fn field_member_refs_resolve_as_fields() {
            let fixture = Fixture::new();

            let member = fixture
                .library
                .resolve_member(fixture.tokens.boxed_of_int_value, &[], &[])
                .unwrap();
            let field = member.as_field().unwrap();
            assert_eq!(field.name(), "Value");
            assert_eq!(field.field_type().unwrap().full_name(), "System.Int32");

            assert!(matches!(
                fixture
                    .library
                    .resolve_method(fixture.tokens.boxed_of_int_value, &[], &[]),
                Err(Error::InvalidToken { .. })
            ));
        }

        #[test]
        fn invalid_tokens() {
            let fixture = Fixture::new();

            assert!(matches!(
                fixture.library.type_by_token(fixture.tokens.widget_count),
                Err(Error::InvalidToken { .. })
            ));
            assert!(matches!(
                fixture.library.type_by_token(Token::new(0x0200_0FFF)),
                Err(Error::TokenOutOfRange(_))
            ));
            assert!(matches!(
                fixture.library.resolve_type(fixture.tokens.widget_resize, &[], &[]),
                Err(Error::InvalidToken { .. })
            ));
        }

        #[test]
        fn module_identity() {
            let fixture = Fixture::new();

            assert_eq!(fixture.library.name(), "Library.dll");
            assert_eq!(fixture.library.identity().name, "Library");
            assert_eq!(
                fixture.library.location(),
                std::path::Path::new("/fixtures/Library.dll")
            );
            assert_ne!(fixture.library.mvid(), fixture.corlib.mvid());

            let referenced: Vec<String> = fixture
                .library
                .referenced_assemblies()
                .unwrap()
                .into_iter()
                .map(|identity| identity.name)
                .collect();
            assert_eq!(referenced, vec!["mscorlib", "System.Runtime", "Other"]);

            assert!(fixture
                .library
                .type_by_name("library.widget", true)
                .unwrap()
                .is_some());
            assert!(fixture
                .library
                .type_by_name("library.widget", false)
                .unwrap()
                .is_none());
        }
    }
}
