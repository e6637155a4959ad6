//! Conversions between class descriptors (`Lcom/example/Foo;`), internal binary names
//! (`com/example/Foo`) and package names (`com/example`).

use crate::error::{Error, Result};

pub const PACKAGE_SEPARATOR: char = '/';
pub const INNER_CLASS_SEPARATOR: char = '$';

/// `Lcom/example/Foo;` -> `com/example/Foo`.
pub fn descriptor_to_binary_name(descriptor: &str) -> Result<&str> {
    descriptor
        .strip_prefix('L')
        .and_then(|rest| rest.strip_suffix(';'))
        .filter(|name| !name.is_empty() && !name.contains(';'))
        .ok_or_else(|| Error::InvalidDescriptor(descriptor.to_string()))
}

/// `com/example/Foo` -> `Lcom/example/Foo;`.
pub fn binary_name_to_descriptor(binary_name: &str) -> String {
    let mut out = String::with_capacity(binary_name.len() + 2);
    out.push('L');
    out.push_str(binary_name);
    out.push(';');
    out
}

/// `com/example/Foo` -> `com.example.Foo`.
pub fn binary_name_to_java_name(binary_name: &str) -> String {
    binary_name.replace(PACKAGE_SEPARATOR, ".")
}

/// `com/example/Foo` -> `com/example`; the default package is the empty string.
pub fn package_of_binary_name(binary_name: &str) -> &str {
    match binary_name.rfind(PACKAGE_SEPARATOR) {
        Some(idx) => &binary_name[..idx],
        None => "",
    }
}

/// `com/example` -> `com`, `com` -> ``.
pub fn parent_package(package: &str) -> &str {
    package_of_binary_name(package)
}

/// `com/example/Foo` -> `Foo`.
pub fn simple_binary_name(binary_name: &str) -> &str {
    match binary_name.rfind(PACKAGE_SEPARATOR) {
        Some(idx) => &binary_name[idx + 1..],
        None => binary_name,
    }
}

/// Number of leading `[` in a descriptor.
pub fn array_dimensions(descriptor: &str) -> usize {
    descriptor.bytes().take_while(|b| *b == b'[').count()
}

/// Separator used between `outer` and the simple name of `inner` in `inner`'s binary name.
///
/// `Outer` / `Outer$Inner` / `Inner` yields `$`; javac sometimes emits `$$` or `$1$` for
/// synthesized members. Returns `None` when `inner` is not textually nested in `outer`.
pub fn inner_class_separator<'a>(
    outer: &str,
    inner: &'a str,
    inner_name: Option<&str>,
) -> Option<&'a str> {
    let rest = inner.strip_prefix(outer)?;
    if !rest.starts_with(INNER_CLASS_SEPARATOR) {
        return None;
    }
    let Some(inner_name) = inner_name else {
        return Some(&rest[..1]);
    };
    let separator = rest.strip_suffix(inner_name)?;
    if separator.is_empty() {
        return None;
    }
    Some(separator)
}
