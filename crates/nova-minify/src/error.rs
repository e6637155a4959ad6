use thiserror::Error;

/// Hard failures that stop a renaming pass.
///
/// Recoverable per-item problems are reported as [`crate::Diagnostic`]s on the resulting lens
/// instead.
#[derive(Debug, Error)]
pub enum MinifyError {
    #[error("classes {first} and {second} are both named {name}")]
    ConflictingClassName {
        name: String,
        first: String,
        second: String,
    },
    #[error("members {first} and {second} are both forced to the name {name}")]
    ConflictingMemberName {
        name: String,
        first: String,
        second: String,
    },
    #[error("no available name for {item} after {attempts} candidates")]
    NameSpaceExhausted { item: String, attempts: u32 },
    #[error("duplicate definition of {0}")]
    DuplicateDefinition(String),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error(transparent)]
    Descriptor(#[from] nova_classfile::Error),
}

pub type Result<T, E = MinifyError> = std::result::Result<T, E>;
