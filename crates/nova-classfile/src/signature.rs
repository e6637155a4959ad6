//! Generic signatures (JVMS 4.7.9.1): parsing, printing and class-name substitution.

use std::fmt;

use crate::descriptor::BaseType;
use crate::error::{Error, Result};
use crate::names::{INNER_CLASS_SEPARATOR, PACKAGE_SEPARATOR};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassSignature {
    pub type_parameters: Vec<TypeParameter>,
    pub super_class: ClassTypeSignature,
    pub interfaces: Vec<ClassTypeSignature>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodSignature {
    pub type_parameters: Vec<TypeParameter>,
    pub params: Vec<TypeSignature>,
    /// `None` for `void`.
    pub return_type: Option<TypeSignature>,
    pub throws: Vec<TypeSignature>,
}

/// Field signatures are reference type signatures.
pub type FieldTypeSignature = TypeSignature;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeParameter {
    pub name: String,
    pub class_bound: Option<TypeSignature>,
    pub interface_bounds: Vec<TypeSignature>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeSignature {
    Base(BaseType),
    Array(Box<TypeSignature>),
    Class(ClassTypeSignature),
    TypeVariable(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeArgument {
    Any,
    Exact(TypeSignature),
    Extends(TypeSignature),
    Super(TypeSignature),
}

/// `Lpkg/Outer<TT;>.Inner<*>;`: the package plus the outer segment and one segment per nested
/// class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassTypeSignature {
    /// Internal package name without trailing separator; empty for the default package.
    pub package: String,
    pub segments: Vec<SimpleClassTypeSignature>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimpleClassTypeSignature {
    pub name: String,
    pub type_arguments: Vec<TypeArgument>,
}

impl ClassTypeSignature {
    /// Internal name of the outermost class, e.g. `pkg/Outer`.
    pub fn outer_internal_name(&self) -> String {
        let first = self.segments.first().map(|s| s.name.as_str()).unwrap_or_default();
        if self.package.is_empty() {
            first.to_string()
        } else {
            format!("{}{PACKAGE_SEPARATOR}{first}", self.package)
        }
    }

    /// Internal name of the innermost class, e.g. `pkg/Outer$Inner`.
    pub fn internal_name(&self) -> String {
        let mut name = self.outer_internal_name();
        for segment in self.segments.iter().skip(1) {
            name.push(INNER_CLASS_SEPARATOR);
            name.push_str(&segment.name);
        }
        name
    }

    /// Substitutes class names. `rename` maps an internal name to its new internal name, or
    /// `None` to keep it.
    ///
    /// Nested segments are renamed through their full binary name (`Outer$Inner`); the new name
    /// must still be nested in the renamed outer class to be expressible as `.Inner`.
    pub fn rename_classes(&self, rename: &mut dyn FnMut(&str) -> Option<String>) -> Result<Self> {
        let original_outer = self.outer_internal_name();
        let renamed_outer = rename(&original_outer).unwrap_or_else(|| original_outer.clone());
        let (package, outer_name) = match renamed_outer.rfind(PACKAGE_SEPARATOR) {
            Some(idx) => (
                renamed_outer[..idx].to_string(),
                renamed_outer[idx + 1..].to_string(),
            ),
            None => (String::new(), renamed_outer.clone()),
        };

        let mut segments = Vec::with_capacity(self.segments.len());
        let mut original_prev = original_outer;
        let mut renamed_prev = renamed_outer;
        for (idx, segment) in self.segments.iter().enumerate() {
            let type_arguments = segment
                .type_arguments
                .iter()
                .map(|arg| arg.rename_classes(rename))
                .collect::<Result<Vec<_>>>()?;
            if idx == 0 {
                segments.push(SimpleClassTypeSignature {
                    name: outer_name.clone(),
                    type_arguments,
                });
                continue;
            }

            let original_full = format!("{original_prev}{INNER_CLASS_SEPARATOR}{}", segment.name);
            let renamed_full = rename(&original_full).unwrap_or_else(|| original_full.clone());
            let inner_name = renamed_full
                .strip_prefix(renamed_prev.as_str())
                .and_then(|rest| rest.strip_prefix(INNER_CLASS_SEPARATOR))
                .filter(|rest| !rest.is_empty())
                .ok_or_else(|| Error::DetachedInnerClass {
                    outer: renamed_prev.clone(),
                    inner: renamed_full.clone(),
                })?
                .to_string();
            segments.push(SimpleClassTypeSignature {
                name: inner_name,
                type_arguments,
            });
            original_prev = original_full;
            renamed_prev = renamed_full;
        }

        Ok(ClassTypeSignature { package, segments })
    }
}

impl TypeSignature {
    pub fn rename_classes(&self, rename: &mut dyn FnMut(&str) -> Option<String>) -> Result<Self> {
        Ok(match self {
            TypeSignature::Base(base) => TypeSignature::Base(*base),
            TypeSignature::Array(component) => {
                TypeSignature::Array(Box::new(component.rename_classes(rename)?))
            }
            TypeSignature::Class(class) => TypeSignature::Class(class.rename_classes(rename)?),
            TypeSignature::TypeVariable(name) => TypeSignature::TypeVariable(name.clone()),
        })
    }
}

impl TypeArgument {
    pub fn rename_classes(&self, rename: &mut dyn FnMut(&str) -> Option<String>) -> Result<Self> {
        Ok(match self {
            TypeArgument::Any => TypeArgument::Any,
            TypeArgument::Exact(ty) => TypeArgument::Exact(ty.rename_classes(rename)?),
            TypeArgument::Extends(ty) => TypeArgument::Extends(ty.rename_classes(rename)?),
            TypeArgument::Super(ty) => TypeArgument::Super(ty.rename_classes(rename)?),
        })
    }
}

impl TypeParameter {
    pub fn rename_classes(&self, rename: &mut dyn FnMut(&str) -> Option<String>) -> Result<Self> {
        Ok(TypeParameter {
            name: self.name.clone(),
            class_bound: self
                .class_bound
                .as_ref()
                .map(|bound| bound.rename_classes(rename))
                .transpose()?,
            interface_bounds: self
                .interface_bounds
                .iter()
                .map(|bound| bound.rename_classes(rename))
                .collect::<Result<_>>()?,
        })
    }
}

impl ClassSignature {
    pub fn rename_classes(&self, rename: &mut dyn FnMut(&str) -> Option<String>) -> Result<Self> {
        Ok(ClassSignature {
            type_parameters: rename_type_parameters(&self.type_parameters, rename)?,
            super_class: self.super_class.rename_classes(rename)?,
            interfaces: self
                .interfaces
                .iter()
                .map(|iface| iface.rename_classes(rename))
                .collect::<Result<_>>()?,
        })
    }
}

impl MethodSignature {
    pub fn rename_classes(&self, rename: &mut dyn FnMut(&str) -> Option<String>) -> Result<Self> {
        Ok(MethodSignature {
            type_parameters: rename_type_parameters(&self.type_parameters, rename)?,
            params: self
                .params
                .iter()
                .map(|param| param.rename_classes(rename))
                .collect::<Result<_>>()?,
            return_type: self
                .return_type
                .as_ref()
                .map(|ty| ty.rename_classes(rename))
                .transpose()?,
            throws: self
                .throws
                .iter()
                .map(|ty| ty.rename_classes(rename))
                .collect::<Result<_>>()?,
        })
    }
}

fn rename_type_parameters(
    params: &[TypeParameter],
    rename: &mut dyn FnMut(&str) -> Option<String>,
) -> Result<Vec<TypeParameter>> {
    params.iter().map(|tp| tp.rename_classes(rename)).collect()
}

// ---------------------------------------------------------------------------------------------
// Printing

fn write_type_parameters(f: &mut fmt::Formatter<'_>, params: &[TypeParameter]) -> fmt::Result {
    if params.is_empty() {
        return Ok(());
    }
    f.write_str("<")?;
    for param in params {
        write!(f, "{param}")?;
    }
    f.write_str(">")
}

impl fmt::Display for TypeParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.name)?;
        if let Some(bound) = &self.class_bound {
            write!(f, "{bound}")?;
        }
        for bound in &self.interface_bounds {
            write!(f, ":{bound}")?;
        }
        Ok(())
    }
}

impl fmt::Display for TypeArgument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeArgument::Any => f.write_str("*"),
            TypeArgument::Exact(ty) => write!(f, "{ty}"),
            TypeArgument::Extends(ty) => write!(f, "+{ty}"),
            TypeArgument::Super(ty) => write!(f, "-{ty}"),
        }
    }
}

impl fmt::Display for SimpleClassTypeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if !self.type_arguments.is_empty() {
            f.write_str("<")?;
            for arg in &self.type_arguments {
                write!(f, "{arg}")?;
            }
            f.write_str(">")?;
        }
        Ok(())
    }
}

impl fmt::Display for ClassTypeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("L")?;
        if !self.package.is_empty() {
            write!(f, "{}{PACKAGE_SEPARATOR}", self.package)?;
        }
        for (idx, segment) in self.segments.iter().enumerate() {
            if idx > 0 {
                f.write_str(".")?;
            }
            write!(f, "{segment}")?;
        }
        f.write_str(";")
    }
}

impl fmt::Display for TypeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeSignature::Base(base) => write!(f, "{}", base.as_char()),
            TypeSignature::Array(component) => write!(f, "[{component}"),
            TypeSignature::Class(class) => write!(f, "{class}"),
            TypeSignature::TypeVariable(name) => write!(f, "T{name};"),
        }
    }
}

impl fmt::Display for ClassSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_type_parameters(f, &self.type_parameters)?;
        write!(f, "{}", self.super_class)?;
        for iface in &self.interfaces {
            write!(f, "{iface}")?;
        }
        Ok(())
    }
}

impl fmt::Display for MethodSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_type_parameters(f, &self.type_parameters)?;
        f.write_str("(")?;
        for param in &self.params {
            write!(f, "{param}")?;
        }
        f.write_str(")")?;
        match &self.return_type {
            Some(ty) => write!(f, "{ty}")?,
            None => f.write_str("V")?,
        }
        for ty in &self.throws {
            write!(f, "^{ty}")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------------------------
// Parsing

pub fn parse_class_signature(sig: &str) -> Result<ClassSignature> {
    let mut parser = Parser::new(sig);
    let type_parameters = parser.type_parameters()?;
    let super_class = parser.class_type()?;
    let mut interfaces = Vec::new();
    while !parser.at_end() {
        interfaces.push(parser.class_type()?);
    }
    Ok(ClassSignature {
        type_parameters,
        super_class,
        interfaces,
    })
}

pub fn parse_method_signature(sig: &str) -> Result<MethodSignature> {
    let mut parser = Parser::new(sig);
    let type_parameters = parser.type_parameters()?;
    parser.expect('(')?;
    let mut params = Vec::new();
    while parser.peek() != Some(')') {
        params.push(parser.java_type()?);
    }
    parser.expect(')')?;
    let return_type = if parser.eat('V') {
        None
    } else {
        Some(parser.java_type()?)
    };
    let mut throws = Vec::new();
    while parser.eat('^') {
        let ty = parser.reference_type()?;
        if matches!(ty, TypeSignature::Array(_)) {
            return Err(parser.error());
        }
        throws.push(ty);
    }
    if !parser.at_end() {
        return Err(parser.error());
    }
    Ok(MethodSignature {
        type_parameters,
        params,
        return_type,
        throws,
    })
}

pub fn parse_field_signature(sig: &str) -> Result<FieldTypeSignature> {
    let mut parser = Parser::new(sig);
    let ty = parser.reference_type()?;
    if !parser.at_end() {
        return Err(parser.error());
    }
    Ok(ty)
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn error(&self) -> Error {
        Error::InvalidSignature(self.input.to_string())
    }

    fn at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += expected.len_utf8();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: char) -> Result<()> {
        if self.eat(expected) {
            Ok(())
        } else if self.at_end() {
            Err(Error::UnexpectedEof)
        } else {
            Err(self.error())
        }
    }

    /// Reads an identifier, stopping at any of the signature punctuation characters.
    /// `allow_slash` admits package separators (outer class names only).
    fn identifier(&mut self, allow_slash: bool) -> Result<&'a str> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            let stop = matches!(c, '.' | ';' | '[' | '<' | '>' | ':')
                || (c == PACKAGE_SEPARATOR && !allow_slash);
            if stop {
                break;
            }
            self.pos += c.len_utf8();
        }
        let ident = &self.input[start..self.pos];
        if ident.is_empty() || ident.starts_with(PACKAGE_SEPARATOR) || ident.ends_with(PACKAGE_SEPARATOR)
        {
            return Err(self.error());
        }
        Ok(ident)
    }

    fn type_parameters(&mut self) -> Result<Vec<TypeParameter>> {
        let mut params = Vec::new();
        if !self.eat('<') {
            return Ok(params);
        }
        loop {
            let name = self.identifier(false)?.to_string();
            self.expect(':')?;
            let class_bound = match self.peek() {
                Some(':') => None,
                Some('L' | 'T' | '[') => Some(self.reference_type()?),
                Some(_) => None,
                None => return Err(Error::UnexpectedEof),
            };
            let mut interface_bounds = Vec::new();
            while self.eat(':') {
                interface_bounds.push(self.reference_type()?);
            }
            params.push(TypeParameter {
                name,
                class_bound,
                interface_bounds,
            });
            if self.eat('>') {
                break;
            }
            if self.at_end() {
                return Err(Error::UnexpectedEof);
            }
        }
        Ok(params)
    }

    fn java_type(&mut self) -> Result<TypeSignature> {
        match self.peek() {
            Some(c) => match BaseType::from_char(c) {
                Some(base) => {
                    self.bump();
                    Ok(TypeSignature::Base(base))
                }
                None => self.reference_type(),
            },
            None => Err(Error::UnexpectedEof),
        }
    }

    fn reference_type(&mut self) -> Result<TypeSignature> {
        match self.peek() {
            Some('L') => Ok(TypeSignature::Class(self.class_type()?)),
            Some('T') => {
                self.bump();
                let name = self.identifier(false)?.to_string();
                self.expect(';')?;
                Ok(TypeSignature::TypeVariable(name))
            }
            Some('[') => {
                self.bump();
                Ok(TypeSignature::Array(Box::new(self.java_type()?)))
            }
            Some(_) => Err(self.error()),
            None => Err(Error::UnexpectedEof),
        }
    }

    fn class_type(&mut self) -> Result<ClassTypeSignature> {
        self.expect('L')?;
        let qualified = self.identifier(true)?;
        let (package, outer) = match qualified.rfind(PACKAGE_SEPARATOR) {
            Some(idx) => (qualified[..idx].to_string(), qualified[idx + 1..].to_string()),
            None => (String::new(), qualified.to_string()),
        };
        let mut segments = vec![SimpleClassTypeSignature {
            name: outer,
            type_arguments: self.type_arguments()?,
        }];
        while self.eat('.') {
            let name = self.identifier(false)?.to_string();
            segments.push(SimpleClassTypeSignature {
                name,
                type_arguments: self.type_arguments()?,
            });
        }
        self.expect(';')?;
        Ok(ClassTypeSignature { package, segments })
    }

    fn type_arguments(&mut self) -> Result<Vec<TypeArgument>> {
        let mut args = Vec::new();
        if !self.eat('<') {
            return Ok(args);
        }
        loop {
            let arg = match self.peek() {
                Some('*') => {
                    self.bump();
                    TypeArgument::Any
                }
                Some('+') => {
                    self.bump();
                    TypeArgument::Extends(self.reference_type()?)
                }
                Some('-') => {
                    self.bump();
                    TypeArgument::Super(self.reference_type()?)
                }
                Some(_) => TypeArgument::Exact(self.reference_type()?),
                None => return Err(Error::UnexpectedEof),
            };
            args.push(arg);
            if self.eat('>') {
                break;
            }
        }
        Ok(args)
    }
}
