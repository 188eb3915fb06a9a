//! Registry configuration
//!
//! [`RegistryConfig`] decides which assembly stands in for the core library, whether references
//! to unopened assemblies are probed on disk, and how deep a single resolution may recurse.

use std::path::PathBuf;

use crate::metadata::identity::{AssemblyIdentity, AssemblyVersion, StrongName};

/// Token of the ECMA standard public key, carried by `mscorlib`
const ECMA_PUBLIC_KEY_TOKEN: [u8; 8] = [0xb7, 0x7a, 0x5c, 0x56, 0x19, 0x34, 0xe0, 0x89];

/// Default bound on nested resolutions (signature nesting, `TypeRef` chains, base types)
pub const DEFAULT_MAX_RESOLUTION_DEPTH: usize = 100;

/// How references to assemblies that are not open get resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum::Display, strum::FromRepr)]
#[repr(u8)]
pub enum ResolutionMode {
    /// Only already opened modules and the resolve hook are consulted
    #[default]
    Manual = 0,
    /// `<name>.dll` is probed in the configured runtime directories before the hook fires
    SearchActiveRuntime = 1,
}

/// Configuration of a [`crate::Registry`]
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// The identity that `System.Runtime`, `netstandard` and the `System.` fallback resolve to
    pub core_library: AssemblyIdentity,

    /// Initial resolution mode, changeable later through `Registry::set_resolution_mode`
    pub resolution_mode: ResolutionMode,

    /// Directories probed in [`ResolutionMode::SearchActiveRuntime`]
    pub runtime_directories: Vec<PathBuf>,

    /// Maximum recursion depth of one resolution (default: 100)
    pub max_resolution_depth: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            core_library: AssemblyIdentity::new("mscorlib", AssemblyVersion::new(4, 0, 0, 0))
                .with_strong_name(StrongName::Token(ECMA_PUBLIC_KEY_TOKEN)),
            resolution_mode: ResolutionMode::Manual,
            runtime_directories: Vec::new(),
            max_resolution_depth: DEFAULT_MAX_RESOLUTION_DEPTH,
        }
    }
}

impl RegistryConfig {
    /// Only opened modules and the hook resolve references
    #[must_use]
    pub fn manual() -> Self {
        Self::default()
    }

    /// Probes `directories` for referenced assemblies that are not open yet
    #[must_use]
    pub fn search_runtime<I, P>(directories: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            resolution_mode: ResolutionMode::SearchActiveRuntime,
            runtime_directories: directories.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Replaces the core library identity
    #[must_use]
    pub fn with_core_library(mut self, identity: AssemblyIdentity) -> Self {
        self.core_library = identity;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_core_library() {
        let config = RegistryConfig::default();
        assert_eq!(
            config.core_library.display_name(),
            "mscorlib, Version=4.0.0.0, Culture=neutral, PublicKeyToken=b77a5c561934e089"
        );
        assert_eq!(config.resolution_mode, ResolutionMode::Manual);
        assert_eq!(config.max_resolution_depth, 100);
    }

    #[test]
    fn presets() {
        let core = AssemblyIdentity::new("System.Private.CoreLib", AssemblyVersion::new(8, 0, 0, 0));
        let config = RegistryConfig::search_runtime(["/usr/share/dotnet"]).with_core_library(core);

        assert_eq!(config.resolution_mode, ResolutionMode::SearchActiveRuntime);
        assert_eq!(
            config.runtime_directories,
            vec![PathBuf::from("/usr/share/dotnet")]
        );
        assert_eq!(config.core_library.name, "System.Private.CoreLib");
    }

    #[test]
    fn mode_round_trips_through_repr() {
        assert_eq!(
            ResolutionMode::from_repr(1),
            Some(ResolutionMode::SearchActiveRuntime)
        );
        assert_eq!(ResolutionMode::from_repr(7), None);
    }
}
