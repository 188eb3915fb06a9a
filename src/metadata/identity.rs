//! Assembly identities (ECMA-335 II.6.1, II.22.2, II.22.5).
//!
//! An [`AssemblyIdentity`] names an assembly by its simple name, four-part version, culture,
//! strong name and processor architecture. Identities are read from the `Assembly` row of a
//! module and from its `AssemblyRef` rows, parsed from display names, and compared when the
//! registry looks for the module behind a reference.
//!
//! # Examples
//!
//! ```rust
//! use dotreflect::metadata::identity::AssemblyIdentity;
//!
//! let mscorlib = AssemblyIdentity::parse(
//!     "mscorlib, Version=4.0.0.0, Culture=neutral, PublicKeyToken=b77a5c561934e089",
//! )?;
//! assert_eq!(mscorlib.name, "mscorlib");
//! assert_eq!(mscorlib.version.to_string(), "4.0.0.0");
//! assert!(mscorlib.culture.is_none());
//! # Ok::<(), dotreflect::Error>(())
//! ```

use std::{fmt, fmt::Write as _, str::FromStr};

use sha1::{Digest, Sha1};

use crate::{
    metadata::{
        tables::{AssemblyRefRow, AssemblyRow},
        view::MetadataView,
    },
    Result,
};

/// `AssemblyFlags.PublicKey`: the blob holds the full public key, not its token
pub const ASSEMBLY_FLAG_PUBLIC_KEY: u32 = 0x0001;

/// Simple names that stand in for the core library
const CORE_LIBRARY_ALIASES: [&str; 2] = ["System.Runtime", "netstandard"];

/// Four-part assembly version
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct AssemblyVersion {
    /// Major version
    pub major: u16,
    /// Minor version
    pub minor: u16,
    /// Build number
    pub build: u16,
    /// Revision number
    pub revision: u16,
}

impl AssemblyVersion {
    /// Creates a version from its four parts
    #[must_use]
    pub const fn new(major: u16, minor: u16, build: u16, revision: u16) -> Self {
        AssemblyVersion {
            major,
            minor,
            build,
            revision,
        }
    }

    /// Parses `major.minor[.build[.revision]]`; missing parts are 0
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for non-numeric parts or more than four parts.
    pub fn parse(version: &str) -> Result<Self> {
        let mut parts = [0_u16; 4];
        let mut count = 0;

        for part in version.trim().split('.') {
            if count == 4 {
                return Err(malformed_error!("Too many version parts in '{}'", version));
            }

            parts[count] = part
                .parse::<u16>()
                .map_err(|_| malformed_error!("Invalid version part '{}' in '{}'", part, version))?;
            count += 1;
        }

        if count < 2 {
            return Err(malformed_error!("Version '{}' needs at least two parts", version));
        }

        Ok(AssemblyVersion::new(parts[0], parts[1], parts[2], parts[3]))
    }
}

impl fmt::Display for AssemblyVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}",
            self.major, self.minor, self.build, self.revision
        )
    }
}

/// Processor architecture an assembly targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProcessorArchitecture {
    /// Architecture neutral IL
    MSIL,
    /// 32bit x86
    X86,
    /// Itanium
    IA64,
    /// x86-64
    AMD64,
    /// 32bit ARM
    ARM,
}

impl ProcessorArchitecture {
    /// Reads the `PA_*` bits (0x0070) of `AssemblyFlags`
    #[must_use]
    pub fn from_flags(flags: u32) -> Option<Self> {
        match (flags & 0x0070) >> 4 {
            1 => Some(ProcessorArchitecture::MSIL),
            2 => Some(ProcessorArchitecture::X86),
            3 => Some(ProcessorArchitecture::IA64),
            4 => Some(ProcessorArchitecture::AMD64),
            5 => Some(ProcessorArchitecture::ARM),
            _ => None,
        }
    }

    /// Parses the display name form, case-insensitively
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for unknown architectures.
    pub fn parse(value: &str) -> Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "msil" => Ok(ProcessorArchitecture::MSIL),
            "x86" => Ok(ProcessorArchitecture::X86),
            "ia64" => Ok(ProcessorArchitecture::IA64),
            "amd64" | "x64" => Ok(ProcessorArchitecture::AMD64),
            "arm" => Ok(ProcessorArchitecture::ARM),
            _ => Err(malformed_error!("Unknown processor architecture '{}'", value)),
        }
    }
}

impl fmt::Display for ProcessorArchitecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProcessorArchitecture::MSIL => "MSIL",
            ProcessorArchitecture::X86 => "X86",
            ProcessorArchitecture::IA64 => "IA64",
            ProcessorArchitecture::AMD64 => "AMD64",
            ProcessorArchitecture::ARM => "Arm",
        };

        f.write_str(name)
    }
}

/// The strong name of an assembly
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StrongName {
    /// The full public key
    PublicKey(Vec<u8>),
    /// The 8 byte public key token
    Token([u8; 8]),
}

impl StrongName {
    /// Reads a `PublicKey` / `PublicKeyOrToken` blob; an empty blob means no strong name
    #[must_use]
    pub fn from_blob(blob: &[u8], is_public_key: bool) -> Option<Self> {
        if blob.is_empty() {
            return None;
        }

        if !is_public_key && blob.len() == 8 {
            let mut token = [0_u8; 8];
            token.copy_from_slice(blob);
            return Some(StrongName::Token(token));
        }

        Some(StrongName::PublicKey(blob.to_vec()))
    }

    /// The public key token: the last 8 bytes of the SHA-1 of the key, reversed
    #[must_use]
    pub fn token(&self) -> [u8; 8] {
        match self {
            StrongName::Token(token) => *token,
            StrongName::PublicKey(key) => {
                let hash = Sha1::digest(key);
                let mut token = [0_u8; 8];
                for (target, source) in token.iter_mut().zip(hash.iter().rev()) {
                    *target = *source;
                }
                token
            }
        }
    }
}

/// The identity of an assembly
///
/// Equality and hashing ignore the strong name, so a reference carrying a token matches a
/// definition carrying the full key.
#[derive(Debug, Clone)]
pub struct AssemblyIdentity {
    /// Simple name, e.g. `mscorlib`
    pub name: String,
    /// Four-part version
    pub version: AssemblyVersion,
    /// Culture, `None` for culture-neutral assemblies
    pub culture: Option<String>,
    /// Public key or token
    pub strong_name: Option<StrongName>,
    /// Target architecture
    pub processor_architecture: Option<ProcessorArchitecture>,
}

impl AssemblyIdentity {
    /// A culture-neutral identity without strong name
    #[must_use]
    pub fn new(name: impl Into<String>, version: AssemblyVersion) -> Self {
        AssemblyIdentity {
            name: name.into(),
            version,
            culture: None,
            strong_name: None,
            processor_architecture: None,
        }
    }

    /// Sets the culture; `neutral` and the empty string clear it
    #[must_use]
    pub fn with_culture(mut self, culture: &str) -> Self {
        self.culture = normalize_culture(culture);
        self
    }

    /// Sets the strong name
    #[must_use]
    pub fn with_strong_name(mut self, strong_name: StrongName) -> Self {
        self.strong_name = Some(strong_name);
        self
    }

    /// Reads the identity of the `Assembly` row of `view`
    ///
    /// # Errors
    /// Returns an error if a heap index of the row is invalid.
    pub fn from_assembly_row(view: &MetadataView, row: &AssemblyRow) -> Result<Self> {
        Ok(AssemblyIdentity {
            name: view.string(row.name)?.to_string(),
            version: AssemblyVersion::new(
                row.major_version,
                row.minor_version,
                row.build_number,
                row.revision_number,
            ),
            culture: normalize_culture(view.string(row.culture)?),
            strong_name: StrongName::from_blob(view.blob(row.public_key)?, true),
            processor_architecture: ProcessorArchitecture::from_flags(row.flags),
        })
    }

    /// Reads the identity named by an `AssemblyRef` row of `view`
    ///
    /// # Errors
    /// Returns an error if a heap index of the row is invalid.
    pub fn from_assembly_ref_row(view: &MetadataView, row: &AssemblyRefRow) -> Result<Self> {
        Ok(AssemblyIdentity {
            name: view.string(row.name)?.to_string(),
            version: AssemblyVersion::new(
                row.major_version,
                row.minor_version,
                row.build_number,
                row.revision_number,
            ),
            culture: normalize_culture(view.string(row.culture)?),
            strong_name: StrongName::from_blob(
                view.blob(row.public_key_or_token)?,
                row.flags & ASSEMBLY_FLAG_PUBLIC_KEY != 0,
            ),
            processor_architecture: ProcessorArchitecture::from_flags(row.flags),
        })
    }

    /// Parses a display name such as `Name, Version=1.0.0.0, Culture=neutral, PublicKeyToken=null`
    ///
    /// Unknown attributes are ignored.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for an empty name or invalid attribute values.
    pub fn parse(display_name: &str) -> Result<Self> {
        let mut parts = display_name.split(',').map(str::trim);

        let name = parts.next().unwrap_or_default();
        if name.is_empty() {
            return Err(malformed_error!("Assembly name cannot be empty"));
        }

        let mut identity = AssemblyIdentity::new(name, AssemblyVersion::default());
        for part in parts {
            let Some((key, value)) = part.split_once('=') else {
                return Err(malformed_error!("Invalid assembly name attribute '{}'", part));
            };

            let value = value.trim();
            match key.trim() {
                "Version" => identity.version = AssemblyVersion::parse(value)?,
                "Culture" => identity.culture = normalize_culture(value),
                "PublicKeyToken" if value.eq_ignore_ascii_case("null") || value.is_empty() => {}
                "PublicKeyToken" => {
                    let bytes = hex::decode(value).map_err(|error| {
                        malformed_error!("Invalid PublicKeyToken '{}' - {}", value, error)
                    })?;
                    let token: [u8; 8] = bytes.try_into().map_err(|_| {
                        malformed_error!("PublicKeyToken '{}' is not 8 bytes", value)
                    })?;
                    identity.strong_name = Some(StrongName::Token(token));
                }
                "PublicKey" => {
                    let key = hex::decode(value).map_err(|error| {
                        malformed_error!("Invalid PublicKey '{}' - {}", value, error)
                    })?;
                    identity.strong_name = StrongName::from_blob(&key, true);
                }
                "ProcessorArchitecture" => {
                    identity.processor_architecture = Some(ProcessorArchitecture::parse(value)?);
                }
                _ => {}
            }
        }

        Ok(identity)
    }

    /// The public key token, if the assembly is strong named
    #[must_use]
    pub fn public_key_token(&self) -> Option<[u8; 8]> {
        self.strong_name.as_ref().map(StrongName::token)
    }

    /// The display name: `Name, Version=a.b.c.d, Culture=neutral, PublicKeyToken=xxxxxxxxxxxxxxxx`
    #[must_use]
    pub fn display_name(&self) -> String {
        let mut result = String::with_capacity(self.name.len() + 72);
        result.push_str(&self.name);

        let _ = write!(result, ", Version={}", self.version);
        let _ = write!(
            result,
            ", Culture={}",
            self.culture.as_deref().unwrap_or("neutral")
        );

        result.push_str(", PublicKeyToken=");
        match self.public_key_token() {
            Some(token) => result.push_str(&hex::encode(token)),
            None => result.push_str("null"),
        }

        result
    }

    /// True if `self` satisfies a request for `requested`
    ///
    /// Names compare ordinally, then the culture must be equal, then the version.
    #[must_use]
    pub fn matches(&self, requested: &AssemblyIdentity) -> bool {
        self.name == requested.name
            && self.culture == requested.culture
            && self.version == requested.version
    }

    /// True for the facade names that forward to the core library
    #[must_use]
    pub fn is_core_library_alias(&self) -> bool {
        CORE_LIBRARY_ALIASES.contains(&self.name.as_str())
    }
}

fn normalize_culture(culture: &str) -> Option<String> {
    if culture.is_empty() || culture.eq_ignore_ascii_case("neutral") {
        None
    } else {
        Some(culture.to_string())
    }
}

impl PartialEq for AssemblyIdentity {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.version == other.version
            && self.culture == other.culture
            && self.processor_architecture == other.processor_architecture
    }
}

impl Eq for AssemblyIdentity {}

impl std::hash::Hash for AssemblyIdentity {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.version.hash(state);
        self.culture.hash(state);
        self.processor_architecture.hash(state);
    }
}

impl fmt::Display for AssemblyIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_name())
    }
}

impl FromStr for AssemblyIdentity {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self> {
        AssemblyIdentity::parse(s)
    }
}
