//! Module images and helpers shared by the unit tests
//!
//! `images.rs` is also compiled into the integration tests through `tests/common`, so it only
//! names items through [`deps`].

mod images;

pub(crate) use images::*;

mod deps {
    pub(crate) use crate::{
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
        module::ModuleRc,
        registry::{Registry, RegistryConfig, RegistryRc},
        typesystem::TypeRc,
        Result,
    };
}
