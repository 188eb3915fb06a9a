//! Helpers shared by the integration tests
//!
//! The module images come from the same source file the unit tests use.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use dotreflect::Result;

#[path = "../../src/test/images.rs"]
mod images;

pub use images::*;

mod deps {
    pub use dotreflect::{
        metadata::{
            builder::ImageBuilder,
            identity::{AssemblyIdentity, AssemblyVersion},
            signatures::{
                SignatureField, SignatureMethod, SignatureParameter, SignatureProperty,
                TypeSignature, ELEMENT_TYPE,
            },
            tables::{
                FieldAttributes, MethodAttributes, MethodSemanticsAttributes, ParamAttributes,
                TypeAttributes,
            },
            token::Token,
        },
        ModuleRc, Registry, RegistryConfig, RegistryRc, Result, TypeRc,
    };
}

/// Writes `data` as `directory/file_name` and returns the path
pub fn write_image(directory: &Path, file_name: &str, data: &[u8]) -> Result<PathBuf> {
    let path = directory.join(file_name);
    std::fs::write(&path, data)?;
    Ok(path)
}

/// Routes the crate's log output through the test harness, once per process
pub fn init_logging() {
    let _ = env_logger::Builder::new()
        .filter_level(log::LevelFilter::Debug)
        .is_test(true)
        .try_init();
}

/// Writes the core library and the library into `directory`
pub fn write_fixture(directory: &Path) -> Result<(PathBuf, PathBuf)> {
    init_logging();
    let (corlib, _) = corlib_image()?;
    let (library, _) = library_image()?;
    Ok((
        write_image(directory, "mscorlib.dll", &corlib)?,
        write_image(directory, "Library.dll", &library)?,
    ))
}
