//! Identifier minification for JVM programs.
//!
//! Given a [`Program`] (classes, interfaces, their members and the references code makes to
//! them), a pass assigns short replacement names to classes, packages, methods and fields while
//! keeping every name that something outside the program depends on. The result is a
//! [`NamingLens`] that answers "what is this called now?" for every original identifier.
//!
//! Names are allocated deterministically: the same program and configuration always produce the
//! same lens.

#![forbid(unsafe_code)]

mod classes;
mod config;
mod diagnostics;
mod error;
mod fields;
mod fixup;
mod lens;
mod methods;
mod minifier;
mod naming;
mod program;
mod seed;
mod strategy;
mod union_find;

pub use crate::config::{json_schema, MinifyConfig, OverloadKey, PackageObfuscation};
pub use crate::diagnostics::{
    Diagnostic, Severity, AMBIGUOUS_REFERENCE, MALFORMED_SIGNATURE, MISSING_MAPPING_TARGET,
};
pub use crate::error::{MinifyError, Result};
pub use crate::lens::{ClassNaming, GenericSignature, NamingLens, SignatureOwner};
pub use crate::minifier::{minify, Minifier};
pub use crate::program::{
    AccessFlags, CallSite, CallSiteId, ClassDef, ClassOrigin, ClassSpec, FieldDef, FieldRef,
    FieldSpec, InnerClass, Items, MethodDef, MethodRef, MethodResolution, MethodSpec, ParamsId,
    Program, ProgramBuilder, Proto, ProtoId, Symbol, TypeId, CLASS_INITIALIZER_NAME,
    CONSTRUCTOR_NAME, OBJECT_DESCRIPTOR,
};
pub use crate::seed::{ClassMapping, MemberMapping, MemberSignature, ResolvedSeed, SeedMapping};
pub use crate::strategy::{ApplyMappingStrategy, KeepRules, MinificationStrategy, NamingStrategy};
