use std::fmt;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    UnexpectedEof,
    InvalidDescriptor(String),
    InvalidSignature(String),
    InvalidBinaryName(String),
    /// A nested class segment in a signature cannot be expressed relative to its renamed outer
    /// class.
    DetachedInnerClass {
        outer: String,
        inner: String,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::UnexpectedEof => write!(f, "unexpected end of input"),
            Error::InvalidDescriptor(desc) => write!(f, "invalid descriptor: {desc}"),
            Error::InvalidSignature(sig) => write!(f, "invalid signature: {sig}"),
            Error::InvalidBinaryName(name) => write!(f, "invalid binary name: {name}"),
            Error::DetachedInnerClass { outer, inner } => write!(
                f,
                "renamed inner class {inner} is not nested in renamed outer class {outer}"
            ),
        }
    }
}

impl std::error::Error for Error {}
