//! The registry of opened modules and cross-module resolution.
//!
//! A [`Registry`] is the explicit context every descriptor ultimately belongs to. It caches the
//! modules it opened by canonical path, resolves assembly identities to modules, and owns the
//! resolution policy: the [`ResolutionMode`] switch and an optional resolve hook that is asked
//! for assemblies nothing else can provide.
//!
//! # Resolution of an identity
//!
//! 1. `System.Runtime` and `netstandard` are redirected to the configured core library
//! 2. an open module whose identity matches (name, then culture, then version) is returned
//! 3. in [`ResolutionMode::SearchActiveRuntime`], `<name>.dll` is probed in the runtime directories
//! 4. the resolve hook is asked; it may open a module or decline
//! 5. otherwise the resolution fails with [`crate::Error::UnresolvableModule`]
//!
//! # Examples
//!
//! ```rust,no_run
//! use dotreflect::{Registry, RegistryConfig, ResolutionMode};
//!
//! let registry = Registry::new(RegistryConfig::default());
//! registry.set_resolve_hook(|registry, identity| {
//!     let path = format!("/opt/lib/{}.dll", identity.name);
//!     Ok(Some(registry.open(path)?))
//! })?;
//!
//! let module = registry.open("Consumer.dll")?;
//! for ty in module.types()? {
//!     println!("{} : {:?}", ty.full_name(), ty.base_type()?);
//! }
//! # Ok::<(), dotreflect::Error>(())
//! ```

mod config;

pub use config::{RegistryConfig, ResolutionMode, DEFAULT_MAX_RESOLUTION_DEPTH};

use std::{
    fmt,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicU64, AtomicU8, Ordering},
        Arc, RwLock, Weak,
    },
};

use dashmap::DashMap;

use crate::{
    metadata::{identity::AssemblyIdentity, view::MetadataView},
    module::{Module, ModuleRc},
    typesystem::TypeRc,
    Error, Result,
};

/// Reference to a [`Registry`]
pub type RegistryRc = Arc<Registry>;

/// Callback asked for assemblies that no open module or runtime probe provides
///
/// Returning `Ok(None)` declines the request.
pub type ResolveHook =
    Arc<dyn Fn(&Registry, &AssemblyIdentity) -> Result<Option<ModuleRc>> + Send + Sync>;

static NEXT_REGISTRY_ID: AtomicU64 = AtomicU64::new(1);

/// Splits `Namespace.Type, Assembly, Version=...` at the first comma outside of brackets
pub(crate) fn split_assembly_qualified(name: &str) -> (&str, Option<&str>) {
    let mut depth = 0_usize;
    for (index, c) in name.char_indices() {
        match c {
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                return (name[..index].trim(), Some(name[index + 1..].trim()));
            }
            _ => {}
        }
    }

    (name.trim(), None)
}

/// Owner of opened modules and the resolution policy
pub struct Registry {
    me: Weak<Registry>,
    id: u64,
    config: RegistryConfig,
    mode: AtomicU8,
    modules: DashMap<PathBuf, ModuleRc>,
    hook: RwLock<Option<ResolveHook>>,
}

impl Registry {
    /// Creates an empty registry
    #[must_use]
    pub fn new(config: RegistryConfig) -> RegistryRc {
        Arc::new_cyclic(|me| Registry {
            me: me.clone(),
            id: NEXT_REGISTRY_ID.fetch_add(1, Ordering::Relaxed),
            mode: AtomicU8::new(config.resolution_mode as u8),
            config,
            modules: DashMap::new(),
            hook: RwLock::new(None),
        })
    }

    /// Unique id of this registry, shared by every descriptor it produced
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// The configuration the registry was created with
    #[must_use]
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Opens the module at `path`, or returns it if it is already open
    ///
    /// # Errors
    /// Returns [`Error::FileError`] if the path cannot be read, or a parse error for images that
    /// are neither PE files nor raw metadata.
    pub fn open(&self, path: impl AsRef<Path>) -> Result<ModuleRc> {
        let location = std::fs::canonicalize(path.as_ref())?;
        if let Some(module) = self.modules.get(&location) {
            return Ok(module.value().clone());
        }

        let view = MetadataView::from_file(&location)?;
        self.register(location, view)
    }

    /// Opens a module from an in-memory image, registered under `path`
    ///
    /// # Errors
    /// Returns a parse error for images that are neither PE files nor raw metadata.
    pub fn open_from_memory(&self, path: impl Into<PathBuf>, data: Vec<u8>) -> Result<ModuleRc> {
        let location = path.into();
        if let Some(module) = self.modules.get(&location) {
            return Ok(module.value().clone());
        }

        let view = MetadataView::from_mem(data)?;
        self.register(location, view)
    }

    fn register(&self, location: PathBuf, view: MetadataView) -> Result<ModuleRc> {
        let registry = self.me.upgrade().ok_or(Error::Released)?;
        let module = Module::load(&registry, location.clone(), view)?;
        log::debug!(
            "Opened {} from {}",
            module.identity().display_name(),
            location.display()
        );

        Ok(self
            .modules
            .entry(location)
            .or_insert(module)
            .value()
            .clone())
    }

    /// Removes the module opened from `path`
    ///
    /// Descriptors handed out earlier stay usable as long as they are held, but the registry
    /// will open the file again on the next request.
    pub fn evict(&self, path: impl AsRef<Path>) -> Option<ModuleRc> {
        let path = path.as_ref();
        let location = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        self.modules.remove(&location).map(|(_, module)| module)
    }

    /// Every open module, in no particular order
    #[must_use]
    pub fn modules(&self) -> Vec<ModuleRc> {
        self.modules
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// The open module whose identity satisfies `identity`
    #[must_use]
    pub fn module_by_identity(&self, identity: &AssemblyIdentity) -> Option<ModuleRc> {
        self.modules
            .iter()
            .find(|entry| entry.value().identity().matches(identity))
            .map(|entry| entry.value().clone())
    }

    /// Resolves an assembly identity to a module
    ///
    /// # Errors
    /// Returns [`Error::UnresolvableModule`] if no step of the resolution order produces a
    /// module, or the error returned by the resolve hook.
    pub fn resolve_module(&self, identity: &AssemblyIdentity) -> Result<ModuleRc> {
        let requested = if identity.is_core_library_alias() {
            log::debug!(
                "Redirecting {} to {}",
                identity.name,
                self.config.core_library.name
            );
            &self.config.core_library
        } else {
            identity
        };

        if let Some(module) = self.module_by_identity(requested) {
            return Ok(module);
        }

        if self.resolution_mode() == ResolutionMode::SearchActiveRuntime {
            if let Some(module) = self.probe_runtime(requested) {
                return Ok(module);
            }
        }

        let hook = read_lock!(self.hook).clone();
        if let Some(hook) = hook {
            match hook(self, requested)? {
                Some(module) => return Ok(module),
                None => log::warn!("Resolve hook declined {}", requested.display_name()),
            }
        }

        Err(Error::UnresolvableModule(requested.display_name()))
    }

    fn probe_runtime(&self, identity: &AssemblyIdentity) -> Option<ModuleRc> {
        let file_name = format!("{}.dll", identity.name);

        for directory in &self.config.runtime_directories {
            let candidate = directory.join(&file_name);
            if !candidate.is_file() {
                continue;
            }

            let was_open = std::fs::canonicalize(&candidate)
                .is_ok_and(|location| self.modules.contains_key(&location));

            match self.open(&candidate) {
                Ok(module) if module.identity().matches(identity) => return Some(module),
                Ok(module) => {
                    log::debug!(
                        "{} is {}, not {}",
                        candidate.display(),
                        module.identity().display_name(),
                        identity.display_name()
                    );
                    if !was_open {
                        self.evict(&candidate);
                    }
                }
                Err(error) => log::debug!("Skipping {}: {}", candidate.display(), error),
            }
        }

        None
    }

    /// Switches how unopened assemblies are found
    pub fn set_resolution_mode(&self, mode: ResolutionMode) {
        self.mode.store(mode as u8, Ordering::Release);
    }

    /// The current resolution mode
    #[must_use]
    pub fn resolution_mode(&self) -> ResolutionMode {
        ResolutionMode::from_repr(self.mode.load(Ordering::Acquire)).unwrap_or_default()
    }

    /// Installs the resolve hook, replacing any previous one
    ///
    /// # Errors
    /// Returns [`Error::LockError`] if the hook lock is poisoned.
    pub fn set_resolve_hook<F>(&self, hook: F) -> Result<()>
    where
        F: Fn(&Registry, &AssemblyIdentity) -> Result<Option<ModuleRc>> + Send + Sync + 'static,
    {
        *write_lock!(self.hook) = Some(Arc::new(hook));
        Ok(())
    }

    /// Removes the resolve hook
    ///
    /// # Errors
    /// Returns [`Error::LockError`] if the hook lock is poisoned.
    pub fn clear_resolve_hook(&self) -> Result<()> {
        *write_lock!(self.hook) = None;
        Ok(())
    }

    /// The module of the configured core library
    ///
    /// # Errors
    /// Returns [`Error::UnresolvableModule`] if the core library cannot be resolved.
    pub fn core_library(&self) -> Result<ModuleRc> {
        self.resolve_module(&self.config.core_library)
    }

    /// A type of the core library by full name, e.g. `System.Int32`
    ///
    /// # Errors
    /// Returns [`Error::UnresolvedType`] if the core library does not define the type.
    pub fn core_type(&self, full_name: &str) -> Result<TypeRc> {
        self.core_library()?
            .type_by_name(full_name, false)?
            .ok_or_else(|| Error::UnresolvedType(full_name.to_string()))
    }

    /// Looks a type up across the open modules
    ///
    /// An assembly-qualified name (`Type, Assembly, Version=...`) is looked up in the resolved
    /// assembly only.
    ///
    /// # Errors
    /// Returns an error if the assembly part cannot be parsed or resolved.
    pub fn type_by_name(&self, name: &str) -> Result<Option<TypeRc>> {
        let (type_name, assembly) = split_assembly_qualified(name);
        if let Some(assembly) = assembly {
            let identity = AssemblyIdentity::parse(assembly)?;
            return self.resolve_module(&identity)?.type_by_name(type_name, false);
        }

        for module in self.modules() {
            if let Some(found) = module.type_by_name(type_name, false)? {
                return Ok(Some(found));
            }
        }

        Ok(None)
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("id", &self.id)
            .field("mode", &self.resolution_mode())
            .field("modules", &self.modules.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_names() {
        assert_eq!(split_assembly_qualified("System.Int32"), ("System.Int32", None));
        assert_eq!(
            split_assembly_qualified("Lib.Widget, Lib, Version=1.0.0.0"),
            ("Lib.Widget", Some("Lib, Version=1.0.0.0"))
        );
        assert_eq!(
            split_assembly_qualified("List`1[[System.Int32, mscorlib]], mscorlib"),
            ("List`1[[System.Int32, mscorlib]]", Some("mscorlib"))
        );
    }

    #[test]
    fn registries_have_distinct_ids() {
        let first = Registry::new(RegistryConfig::default());
        let second = Registry::new(RegistryConfig::default());
        assert_ne!(first.id(), second.id());
    }

    #[test]
    fn resolution_mode_switch() {
        let registry = Registry::new(RegistryConfig::manual());
        assert_eq!(registry.resolution_mode(), ResolutionMode::Manual);

        registry.set_resolution_mode(ResolutionMode::SearchActiveRuntime);
        assert_eq!(
            registry.resolution_mode(),
            ResolutionMode::SearchActiveRuntime
        );
    }

    #[test]
    fn unresolvable_without_hook() {
        let registry = Registry::new(RegistryConfig::default());
        let identity = AssemblyIdentity::parse("Missing, Version=1.0.0.0").unwrap();

        assert!(matches!(
            registry.resolve_module(&identity),
            Err(Error::UnresolvableModule(name)) if name.starts_with("Missing, Version=1.0.0.0")
        ));
    }

    #[test]
    fn declining_hook() {
        let registry = Registry::new(RegistryConfig::default());
        registry.set_resolve_hook(|_, _| Ok(None)).unwrap();

        let identity = AssemblyIdentity::parse("Missing").unwrap();
        assert!(registry.resolve_module(&identity).is_err());

        registry.clear_resolve_hook().unwrap();
        assert!(registry.modules().is_empty());
    }

    #[test]
    fn open_missing_file() {
        let registry = Registry::new(RegistryConfig::default());
        assert!(matches!(
            registry.open("/nonexistent/Library.dll"),
            Err(Error::FileError(_))
        ));
    }

    mod with_modules {
        use std::sync::atomic::AtomicUsize;

        use super::super::*;
        use crate::test::{other_identity, other_image, Fixture};

        #[test]
        fn core_library_aliases_skip_the_hook() {
            let fixture = Fixture::new();
            let calls = Arc::new(AtomicUsize::new(0));
            let counter = calls.clone();
            fixture
                .registry
                .set_resolve_hook(move |_, _| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(None)
                })
                .unwrap();

            let runtime = AssemblyIdentity::parse("System.Runtime, Version=4.2.0.0").unwrap();
            let resolved = fixture.registry.resolve_module(&runtime).unwrap();
            assert!(Arc::ptr_eq(&resolved, &fixture.corlib));

            let object = fixture.widget().base_type().unwrap().unwrap();
            assert_eq!(object.full_name(), "System.Object");
            assert_eq!(calls.load(Ordering::SeqCst), 0);
        }

        #[test]
        fn hook_provides_missing_modules() {
            let fixture = Fixture::new();
            fixture
                .registry
                .set_resolve_hook(|registry, identity| {
                    assert_eq!(identity.name, "Other");
                    Ok(Some(registry.open_from_memory(
                        "/fixtures/Other.dll",
                        other_image()?,
                    )?))
                })
                .unwrap();

            let thing = fixture
                .library
                .resolve_type(fixture.tokens.unresolvable_ref, &[], &[])
                .unwrap();
            assert_eq!(thing.full_name(), "Other.Thing");
            assert!(fixture.registry.module_by_identity(&other_identity()).is_some());
            assert_eq!(fixture.registry.modules().len(), 3);
        }

        #[test]
        fn hook_errors_propagate() {
            let fixture = Fixture::new();
            fixture
                .registry
                .set_resolve_hook(|_, identity| Err(Error::UnresolvableModule(identity.name.clone())))
                .unwrap();

            assert!(matches!(
                fixture.registry.resolve_module(&other_identity()),
                Err(Error::UnresolvableModule(name)) if name == "Other"
            ));
        }

        #[test]
        fn open_modules_are_shared() {
            let fixture = Fixture::new();
            let again = fixture
                .registry
                .open_from_memory("/fixtures/Library.dll", Vec::new())
                .unwrap();
            assert!(Arc::ptr_eq(&again, &fixture.library));
            assert_eq!(fixture.library.registry_id(), fixture.registry.id());
        }

        #[test]
        fn core_types_and_qualified_names() {
            let fixture = Fixture::new();

            let int32 = fixture.registry.core_type("System.Int32").unwrap();
            assert_eq!(int32.token(), fixture.core.int32);
            assert!(matches!(
                fixture.registry.core_type("System.Missing"),
                Err(Error::UnresolvedType(_))
            ));

            let widget = fixture
                .registry
                .type_by_name("Library.Widget, Library, Version=1.0.0.0")
                .unwrap()
                .unwrap();
            assert!(Arc::ptr_eq(&widget, &fixture.widget()));
            assert!(fixture
                .registry
                .type_by_name("Library.Widget, mscorlib, Version=4.0.0.0")
                .unwrap()
                .is_none());
        }

        #[test]
        fn eviction() {
            let fixture = Fixture::new();
            let widget = fixture.widget();

            let evicted = fixture.registry.evict("/fixtures/Library.dll").unwrap();
            assert!(Arc::ptr_eq(&evicted, &fixture.library));
            assert_eq!(fixture.registry.modules().len(), 1);
            assert_eq!(widget.full_name(), "Library.Widget");
            assert!(fixture.registry.evict("/fixtures/Library.dll").is_none());
        }
    }
}
