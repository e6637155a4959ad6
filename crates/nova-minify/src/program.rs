//! The typed program graph a renaming pass runs over.
//!
//! All identifiers are interned once by [`ProgramBuilder`]; the frozen [`Items`] table is shared
//! with the resulting [`crate::NamingLens`] so original names stay resolvable after the pass.

use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::ops::BitOr;
use std::sync::Arc;

use indexmap::IndexSet;
use lasso::{Key, Rodeo, RodeoReader, Spur};
use nova_classfile::names;
use nova_classfile::{parse_field_descriptor, parse_method_descriptor, FieldType, ReturnType};

use crate::error::{MinifyError, Result};

pub const OBJECT_DESCRIPTOR: &str = "Ljava/lang/Object;";
pub const CONSTRUCTOR_NAME: &str = "<init>";
pub const CLASS_INITIALIZER_NAME: &str = "<clinit>";

/// An interned identifier string.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Symbol(Spur);

impl Symbol {
    fn idx(self) -> usize {
        self.0.into_usize()
    }
}

impl PartialOrd for Symbol {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Symbol {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.idx().cmp(&other.idx())
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({})", self.idx())
    }
}

macro_rules! item_id {
    ($name:ident) => {
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(u32);

        impl $name {
            fn from_idx(idx: usize) -> Self {
                $name(idx as u32)
            }

            #[must_use]
            pub fn idx(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.0)
            }
        }
    };
}

item_id!(TypeId);
item_id!(ParamsId);
item_id!(ProtoId);
item_id!(CallSiteId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Proto {
    pub return_type: TypeId,
    pub params: ParamsId,
}

/// A method reference: holder type, name and prototype. Equality is structural.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MethodRef {
    pub holder: TypeId,
    pub name: Symbol,
    pub proto: ProtoId,
}

impl MethodRef {
    #[must_use]
    pub fn with_holder(self, holder: TypeId) -> Self {
        MethodRef { holder, ..self }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldRef {
    pub holder: TypeId,
    pub name: Symbol,
    pub ty: TypeId,
}

impl FieldRef {
    #[must_use]
    pub fn with_holder(self, holder: TypeId) -> Self {
        FieldRef { holder, ..self }
    }
}

/// Interned strings, types, parameter lists and prototypes.
pub struct Items {
    strings: RodeoReader,
    types: IndexSet<Symbol>,
    params: IndexSet<Box<[TypeId]>>,
    protos: IndexSet<Proto>,
}

impl fmt::Debug for Items {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Items")
            .field("strings", &self.strings.len())
            .field("types", &self.types.len())
            .field("params", &self.params.len())
            .field("protos", &self.protos.len())
            .finish()
    }
}

impl Items {
    pub fn str(&self, symbol: Symbol) -> &str {
        self.strings.resolve(&symbol.0)
    }

    pub fn symbol(&self, text: &str) -> Option<Symbol> {
        self.strings.get(text).map(Symbol)
    }

    pub fn descriptor(&self, ty: TypeId) -> &str {
        self.str(self.types[ty.idx()])
    }

    pub fn params(&self, params: ParamsId) -> &[TypeId] {
        &self.params[params.idx()]
    }

    pub fn proto(&self, proto: ProtoId) -> Proto {
        self.protos[proto.idx()]
    }

    pub fn types(&self) -> impl Iterator<Item = TypeId> + '_ {
        (0..self.types.len()).map(TypeId::from_idx)
    }

    pub fn lookup_type(&self, descriptor: &str) -> Option<TypeId> {
        let symbol = self.symbol(descriptor)?;
        self.types.get_index_of(&symbol).map(TypeId::from_idx)
    }

    /// Finds an already interned prototype; `None` if any component was never seen.
    pub fn lookup_proto(&self, descriptor: &str) -> Option<ProtoId> {
        let parsed = parse_method_descriptor(descriptor).ok()?;
        let params = parsed
            .params
            .iter()
            .map(|param| self.lookup_type(&param.to_string()))
            .collect::<Option<Vec<_>>>()?;
        let return_type = self.lookup_type(&parsed.return_type.to_string())?;
        let params = ParamsId::from_idx(self.params.get_index_of(params.as_slice())?);
        self.protos
            .get_index_of(&Proto {
                return_type,
                params,
            })
            .map(ProtoId::from_idx)
    }

    pub fn params_descriptor(&self, params: ParamsId) -> String {
        let mut out = String::from("(");
        for ty in self.params(params) {
            out.push_str(self.descriptor(*ty));
        }
        out.push(')');
        out
    }

    pub fn proto_descriptor(&self, proto: ProtoId) -> String {
        let proto = self.proto(proto);
        let mut out = self.params_descriptor(proto.params);
        out.push_str(self.descriptor(proto.return_type));
        out
    }

    /// The element type and dimension count of an array type.
    pub fn array_element(&self, ty: TypeId) -> Option<(TypeId, usize)> {
        let descriptor = self.descriptor(ty);
        let dimensions = names::array_dimensions(descriptor);
        if dimensions == 0 {
            return None;
        }
        self.lookup_type(&descriptor[dimensions..])
            .map(|element| (element, dimensions))
    }

    pub fn is_class_type(&self, ty: TypeId) -> bool {
        self.descriptor(ty).starts_with('L')
    }

    /// `Lcom/example/Foo;` -> `com/example/Foo`; array and primitive descriptors are returned
    /// unchanged.
    pub fn binary_name(&self, ty: TypeId) -> &str {
        let descriptor = self.descriptor(ty);
        names::descriptor_to_binary_name(descriptor).unwrap_or(descriptor)
    }

    pub fn method_to_string(&self, method: MethodRef) -> String {
        format!(
            "{}->{}{}",
            self.descriptor(method.holder),
            self.str(method.name),
            self.proto_descriptor(method.proto)
        )
    }

    pub fn field_to_string(&self, field: FieldRef) -> String {
        format!(
            "{}->{}:{}",
            self.descriptor(field.holder),
            self.str(field.name),
            self.descriptor(field.ty)
        )
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct AccessFlags(u16);

impl AccessFlags {
    pub const PUBLIC: AccessFlags = AccessFlags(0x0001);
    pub const PRIVATE: AccessFlags = AccessFlags(0x0002);
    pub const PROTECTED: AccessFlags = AccessFlags(0x0004);
    pub const STATIC: AccessFlags = AccessFlags(0x0008);
    pub const FINAL: AccessFlags = AccessFlags(0x0010);
    pub const BRIDGE: AccessFlags = AccessFlags(0x0040);
    pub const INTERFACE: AccessFlags = AccessFlags(0x0200);
    pub const ABSTRACT: AccessFlags = AccessFlags(0x0400);
    pub const SYNTHETIC: AccessFlags = AccessFlags(0x1000);
    pub const ANNOTATION: AccessFlags = AccessFlags(0x2000);

    pub const fn empty() -> Self {
        AccessFlags(0)
    }

    pub const fn from_bits(bits: u16) -> Self {
        AccessFlags(bits)
    }

    pub const fn bits(self) -> u16 {
        self.0
    }

    pub const fn contains(self, other: AccessFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn is_private(self) -> bool {
        self.contains(Self::PRIVATE)
    }

    pub const fn is_static(self) -> bool {
        self.contains(Self::STATIC)
    }

    pub const fn is_abstract(self) -> bool {
        self.contains(Self::ABSTRACT)
    }
}

impl BitOr for AccessFlags {
    type Output = AccessFlags;

    fn bitor(self, rhs: AccessFlags) -> AccessFlags {
        AccessFlags(self.0 | rhs.0)
    }
}

impl fmt::Debug for AccessFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccessFlags({:#06x})", self.0)
    }
}

/// Where a class definition comes from. Only program classes are renamed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClassOrigin {
    Program,
    Classpath,
    Library,
}

#[derive(Debug, Clone)]
pub struct MethodDef {
    pub reference: MethodRef,
    pub access_flags: AccessFlags,
    pub signature: Option<String>,
    /// For bridges: the method the bridge forwards to, in the same class.
    pub bridge_target: Option<MethodRef>,
    initializer: bool,
}

impl MethodDef {
    /// `<init>` or `<clinit>`.
    pub fn is_initializer(&self) -> bool {
        self.initializer
    }

    /// Private, static and initializer methods are dispatched directly.
    pub fn is_direct(&self) -> bool {
        self.initializer || self.access_flags.is_private() || self.access_flags.is_static()
    }
}

#[derive(Debug, Clone)]
pub struct FieldDef {
    pub reference: FieldRef,
    pub access_flags: AccessFlags,
    pub signature: Option<String>,
}

/// The `InnerClasses` entry describing a class itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InnerClass {
    pub outer: Option<TypeId>,
    pub inner_name: Option<Symbol>,
}

#[derive(Debug, Clone)]
pub struct ClassDef {
    pub ty: TypeId,
    pub origin: ClassOrigin,
    pub access_flags: AccessFlags,
    pub super_type: Option<TypeId>,
    pub interfaces: Vec<TypeId>,
    /// Sorted by name, then descriptor.
    pub methods: Vec<MethodDef>,
    /// Sorted by name, then descriptor.
    pub fields: Vec<FieldDef>,
    pub signature: Option<String>,
    pub inner_class: Option<InnerClass>,
    /// Local and anonymous classes carry an `EnclosingMethod` attribute.
    pub enclosing_method: bool,
}

impl ClassDef {
    pub fn is_program(&self) -> bool {
        self.origin == ClassOrigin::Program
    }

    pub fn is_interface(&self) -> bool {
        self.access_flags.contains(AccessFlags::INTERFACE)
    }

    pub fn is_annotation(&self) -> bool {
        self.access_flags.contains(AccessFlags::ANNOTATION)
    }

    pub fn method(&self, name: Symbol, proto: ProtoId) -> Option<&MethodDef> {
        self.methods
            .iter()
            .find(|method| method.reference.name == name && method.reference.proto == proto)
    }

    pub fn field(&self, name: Symbol, ty: TypeId) -> Option<&FieldDef> {
        self.fields
            .iter()
            .find(|field| field.reference.name == name && field.reference.ty == ty)
    }

    pub fn virtual_methods(&self) -> impl Iterator<Item = &MethodDef> {
        self.methods.iter().filter(|method| !method.is_direct())
    }

    pub fn direct_methods(&self) -> impl Iterator<Item = &MethodDef> {
        self.methods.iter().filter(|method| method.is_direct())
    }
}

/// A lambda / functional-interface call site. The first interface is the functional interface,
/// the rest are marker interfaces of an intersection type.
#[derive(Debug, Clone)]
pub struct CallSite {
    pub name: Symbol,
    pub proto: ProtoId,
    pub interfaces: Vec<TypeId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MethodResolution {
    Resolved(MethodRef),
    /// No unique target; carries every maximally specific candidate (possibly none).
    Failed(Vec<MethodRef>),
}

#[derive(Debug, Clone)]
pub struct MethodSpec {
    name: String,
    descriptor: String,
    access_flags: AccessFlags,
    signature: Option<String>,
    bridge_target: Option<(String, String)>,
}

impl MethodSpec {
    pub fn new(name: impl Into<String>, descriptor: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            descriptor: descriptor.into(),
            access_flags: AccessFlags::PUBLIC,
            signature: None,
            bridge_target: None,
        }
    }

    pub fn abstract_method(name: impl Into<String>, descriptor: impl Into<String>) -> Self {
        Self::new(name, descriptor).access(AccessFlags::PUBLIC | AccessFlags::ABSTRACT)
    }

    pub fn access(mut self, access_flags: AccessFlags) -> Self {
        self.access_flags = access_flags;
        self
    }

    pub fn private(self) -> Self {
        self.access(AccessFlags::PRIVATE)
    }

    pub fn signature(mut self, signature: impl Into<String>) -> Self {
        self.signature = Some(signature.into());
        self
    }

    pub fn bridge_to(mut self, name: impl Into<String>, descriptor: impl Into<String>) -> Self {
        self.access_flags = self.access_flags | AccessFlags::BRIDGE | AccessFlags::SYNTHETIC;
        self.bridge_target = Some((name.into(), descriptor.into()));
        self
    }
}

#[derive(Debug, Clone)]
pub struct FieldSpec {
    name: String,
    descriptor: String,
    access_flags: AccessFlags,
    signature: Option<String>,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, descriptor: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            descriptor: descriptor.into(),
            access_flags: AccessFlags::PUBLIC,
            signature: None,
        }
    }

    pub fn access(mut self, access_flags: AccessFlags) -> Self {
        self.access_flags = access_flags;
        self
    }

    pub fn private(self) -> Self {
        self.access(AccessFlags::PRIVATE)
    }

    pub fn signature(mut self, signature: impl Into<String>) -> Self {
        self.signature = Some(signature.into());
        self
    }
}

/// Description of a class handed to [`ProgramBuilder::add_class`]. Types are given as
/// descriptors (`Lcom/example/Foo;`).
#[derive(Debug, Clone)]
pub struct ClassSpec {
    descriptor: String,
    origin: ClassOrigin,
    access_flags: AccessFlags,
    super_type: Option<String>,
    interfaces: Vec<String>,
    methods: Vec<MethodSpec>,
    fields: Vec<FieldSpec>,
    signature: Option<String>,
    inner_class: Option<(Option<String>, Option<String>)>,
    enclosing_method: bool,
}

impl ClassSpec {
    fn new(descriptor: String, origin: ClassOrigin) -> Self {
        Self {
            descriptor,
            origin,
            access_flags: AccessFlags::PUBLIC,
            super_type: None,
            interfaces: Vec::new(),
            methods: Vec::new(),
            fields: Vec::new(),
            signature: None,
            inner_class: None,
            enclosing_method: false,
        }
    }

    pub fn program(descriptor: impl Into<String>) -> Self {
        Self::new(descriptor.into(), ClassOrigin::Program)
    }

    pub fn library(descriptor: impl Into<String>) -> Self {
        Self::new(descriptor.into(), ClassOrigin::Library)
    }

    pub fn classpath(descriptor: impl Into<String>) -> Self {
        Self::new(descriptor.into(), ClassOrigin::Classpath)
    }

    pub fn access(mut self, access_flags: AccessFlags) -> Self {
        self.access_flags = access_flags;
        self
    }

    pub fn interface(mut self) -> Self {
        self.access_flags = self.access_flags | AccessFlags::INTERFACE | AccessFlags::ABSTRACT;
        self
    }

    pub fn annotation(self) -> Self {
        let mut spec = self.interface();
        spec.access_flags = spec.access_flags | AccessFlags::ANNOTATION;
        spec
    }

    pub fn extends(mut self, descriptor: impl Into<String>) -> Self {
        self.super_type = Some(descriptor.into());
        self
    }

    pub fn implements(mut self, descriptor: impl Into<String>) -> Self {
        self.interfaces.push(descriptor.into());
        self
    }

    pub fn method(mut self, method: MethodSpec) -> Self {
        self.methods.push(method);
        self
    }

    pub fn field(mut self, field: FieldSpec) -> Self {
        self.fields.push(field);
        self
    }

    pub fn signature(mut self, signature: impl Into<String>) -> Self {
        self.signature = Some(signature.into());
        self
    }

    /// Marks this class as the member class `inner_name` of `outer`.
    pub fn inner_class_of(
        mut self,
        outer: impl Into<String>,
        inner_name: impl Into<String>,
    ) -> Self {
        self.inner_class = Some((Some(outer.into()), Some(inner_name.into())));
        self
    }

    /// Marks this class as an anonymous class declared inside a method.
    pub fn anonymous(mut self) -> Self {
        self.inner_class = Some((None, None));
        self.enclosing_method = true;
        self
    }
}

pub struct ProgramBuilder {
    strings: Rodeo,
    types: IndexSet<Symbol>,
    params: IndexSet<Box<[TypeId]>>,
    protos: IndexSet<Proto>,
    classes: Vec<ClassDef>,
    defined: HashSet<TypeId>,
    call_sites: Vec<CallSite>,
    method_references: IndexSet<MethodRef>,
    field_references: IndexSet<FieldRef>,
    pruned_types: HashSet<TypeId>,
    object: TypeId,
}

impl Default for ProgramBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgramBuilder {
    pub fn new() -> Self {
        let mut strings = Rodeo::default();
        let mut types = IndexSet::new();
        let (object_idx, _) = types.insert_full(Symbol(strings.get_or_intern(OBJECT_DESCRIPTOR)));
        Self {
            strings,
            types,
            params: IndexSet::new(),
            protos: IndexSet::new(),
            classes: Vec::new(),
            defined: HashSet::new(),
            call_sites: Vec::new(),
            method_references: IndexSet::new(),
            field_references: IndexSet::new(),
            pruned_types: HashSet::new(),
            object: TypeId::from_idx(object_idx),
        }
    }

    fn intern_str(&mut self, text: &str) -> Symbol {
        Symbol(self.strings.get_or_intern(text))
    }

    /// Interns a field type or `V`. Array element types are interned alongside.
    pub fn intern_type(&mut self, descriptor: &str) -> Result<TypeId> {
        if descriptor != "V" {
            let parsed = parse_field_descriptor(descriptor)?;
            if let FieldType::Array(_) = parsed {
                self.intern_type(&parsed.element_type().to_string())?;
            }
        }
        let symbol = self.intern_str(descriptor);
        let (idx, _) = self.types.insert_full(symbol);
        Ok(TypeId::from_idx(idx))
    }

    fn intern_class_type(&mut self, descriptor: &str) -> Result<TypeId> {
        names::descriptor_to_binary_name(descriptor)?;
        self.intern_type(descriptor)
    }

    pub fn intern_proto(&mut self, descriptor: &str) -> Result<ProtoId> {
        let parsed = parse_method_descriptor(descriptor)?;
        let params = parsed
            .params
            .iter()
            .map(|param| self.intern_type(&param.to_string()))
            .collect::<Result<Vec<_>>>()?;
        let return_type = match &parsed.return_type {
            ReturnType::Void => self.intern_type("V")?,
            ReturnType::Type(ty) => self.intern_type(&ty.to_string())?,
        };
        let (params_idx, _) = self.params.insert_full(params.into_boxed_slice());
        let (proto_idx, _) = self.protos.insert_full(Proto {
            return_type,
            params: ParamsId::from_idx(params_idx),
        });
        Ok(ProtoId::from_idx(proto_idx))
    }

    fn method_ref(&mut self, holder: TypeId, name: &str, descriptor: &str) -> Result<MethodRef> {
        Ok(MethodRef {
            holder,
            name: self.intern_str(name),
            proto: self.intern_proto(descriptor)?,
        })
    }

    fn field_ref(&mut self, holder: TypeId, name: &str, descriptor: &str) -> Result<FieldRef> {
        if descriptor == "V" {
            return Err(nova_classfile::Error::InvalidDescriptor(descriptor.to_string()).into());
        }
        let ty = self.intern_type(descriptor)?;
        Ok(FieldRef {
            holder,
            name: self.intern_str(name),
            ty,
        })
    }

    pub fn add_class(&mut self, spec: ClassSpec) -> Result<TypeId> {
        let ty = self.intern_class_type(&spec.descriptor)?;
        if !self.defined.insert(ty) {
            return Err(MinifyError::DuplicateDefinition(spec.descriptor));
        }

        let super_type = match &spec.super_type {
            Some(descriptor) => Some(self.intern_class_type(descriptor)?),
            None if ty == self.object => None,
            None => Some(self.object),
        };
        let interfaces = spec
            .interfaces
            .iter()
            .map(|descriptor| self.intern_class_type(descriptor))
            .collect::<Result<Vec<_>>>()?;

        let mut methods = Vec::with_capacity(spec.methods.len());
        for method in &spec.methods {
            let reference = self.method_ref(ty, &method.name, &method.descriptor)?;
            let bridge_target = match &method.bridge_target {
                Some((name, descriptor)) => Some(self.method_ref(ty, name, descriptor)?),
                None => None,
            };
            methods.push(MethodDef {
                reference,
                access_flags: method.access_flags,
                signature: method.signature.clone(),
                bridge_target,
                initializer: method.name == CONSTRUCTOR_NAME
                    || method.name == CLASS_INITIALIZER_NAME,
            });
        }
        let mut fields = Vec::with_capacity(spec.fields.len());
        for field in &spec.fields {
            fields.push(FieldDef {
                reference: self.field_ref(ty, &field.name, &field.descriptor)?,
                access_flags: field.access_flags,
                signature: field.signature.clone(),
            });
        }

        let inner_class = match &spec.inner_class {
            Some((outer, inner_name)) => Some(InnerClass {
                outer: match outer {
                    Some(outer) => Some(self.intern_class_type(outer)?),
                    None => None,
                },
                inner_name: inner_name.as_deref().map(|name| self.intern_str(name)),
            }),
            None => None,
        };

        let mut class = ClassDef {
            ty,
            origin: spec.origin,
            access_flags: spec.access_flags,
            super_type,
            interfaces,
            methods,
            fields,
            signature: spec.signature,
            inner_class,
            enclosing_method: spec.enclosing_method,
        };
        self.sort_members(&mut class);
        self.classes.push(class);
        Ok(ty)
    }

    fn sort_members(&self, class: &mut ClassDef) {
        let strings = &self.strings;
        let types = &self.types;
        let protos = &self.protos;
        let params = &self.params;
        let type_descriptor = move |ty: TypeId| strings.resolve(&types[ty.idx()].0);
        let proto_key = move |proto: ProtoId| {
            let proto = protos[proto.idx()];
            let mut key: Vec<&str> = params[proto.params.idx()]
                .iter()
                .map(|ty| type_descriptor(*ty))
                .collect();
            key.push(type_descriptor(proto.return_type));
            key
        };
        class.methods.sort_by(|a, b| {
            let a_name = strings.resolve(&a.reference.name.0);
            let b_name = strings.resolve(&b.reference.name.0);
            a_name
                .cmp(b_name)
                .then_with(|| proto_key(a.reference.proto).cmp(&proto_key(b.reference.proto)))
        });
        class.fields.sort_by(|a, b| {
            strings
                .resolve(&a.reference.name.0)
                .cmp(strings.resolve(&b.reference.name.0))
                .then_with(|| type_descriptor(a.reference.ty).cmp(type_descriptor(b.reference.ty)))
        });
    }

    /// Records a lambda call site implementing `name` with `descriptor` for `interfaces`.
    pub fn add_call_site(
        &mut self,
        name: &str,
        descriptor: &str,
        interfaces: &[&str],
    ) -> Result<CallSiteId> {
        let call_site = CallSite {
            name: self.intern_str(name),
            proto: self.intern_proto(descriptor)?,
            interfaces: interfaces
                .iter()
                .map(|iface| self.intern_class_type(iface))
                .collect::<Result<_>>()?,
        };
        self.call_sites.push(call_site);
        Ok(CallSiteId::from_idx(self.call_sites.len() - 1))
    }

    /// Records a method reference made by program code.
    pub fn add_method_reference(
        &mut self,
        holder: &str,
        name: &str,
        descriptor: &str,
    ) -> Result<MethodRef> {
        let holder = self.intern_class_type(holder)?;
        let reference = self.method_ref(holder, name, descriptor)?;
        self.method_references.insert(reference);
        Ok(reference)
    }

    /// Records a field reference made by program code.
    pub fn add_field_reference(
        &mut self,
        holder: &str,
        name: &str,
        descriptor: &str,
    ) -> Result<FieldRef> {
        let holder = self.intern_class_type(holder)?;
        let reference = self.field_ref(holder, name, descriptor)?;
        self.field_references.insert(reference);
        Ok(reference)
    }

    /// Marks a type as removed by shrinking. It may still appear in member signatures.
    pub fn add_pruned_type(&mut self, descriptor: &str) -> Result<TypeId> {
        let ty = self.intern_class_type(descriptor)?;
        self.pruned_types.insert(ty);
        Ok(ty)
    }

    pub fn build(self) -> Program {
        let items = Items {
            strings: self.strings.into_reader(),
            types: self.types,
            params: self.params,
            protos: self.protos,
        };

        let mut classes = self.classes;
        classes.sort_by(|a, b| items.descriptor(a.ty).cmp(items.descriptor(b.ty)));
        let by_type: HashMap<TypeId, usize> = classes
            .iter()
            .enumerate()
            .map(|(idx, class)| (class.ty, idx))
            .collect();

        let mut extends_subtypes: HashMap<TypeId, Vec<TypeId>> = HashMap::new();
        let mut implementors: HashMap<TypeId, Vec<TypeId>> = HashMap::new();
        for class in &classes {
            for iface in &class.interfaces {
                implementors.entry(*iface).or_default().push(class.ty);
            }
            if class.is_interface() {
                continue;
            }
            let Some(super_type) = class.super_type else {
                continue;
            };
            extends_subtypes.entry(super_type).or_default().push(class.ty);
            // Missing supertypes hang off `java/lang/Object`.
            if super_type != self.object && !by_type.contains_key(&super_type) {
                let roots = extends_subtypes.entry(self.object).or_default();
                if !roots.contains(&super_type) {
                    roots.push(super_type);
                }
            }
        }
        for subtypes in extends_subtypes.values_mut().chain(implementors.values_mut()) {
            subtypes.sort_by(|a, b| items.descriptor(*a).cmp(items.descriptor(*b)));
        }

        Program {
            items: Arc::new(items),
            classes,
            by_type,
            extends_subtypes,
            implementors,
            call_sites: self.call_sites,
            method_references: self.method_references.into_iter().collect(),
            field_references: self.field_references.into_iter().collect(),
            pruned_types: self.pruned_types,
            object: self.object,
        }
    }
}

/// An immutable program graph with subtyping and resolution queries.
#[derive(Debug)]
pub struct Program {
    items: Arc<Items>,
    classes: Vec<ClassDef>,
    by_type: HashMap<TypeId, usize>,
    extends_subtypes: HashMap<TypeId, Vec<TypeId>>,
    implementors: HashMap<TypeId, Vec<TypeId>>,
    call_sites: Vec<CallSite>,
    method_references: Vec<MethodRef>,
    field_references: Vec<FieldRef>,
    pruned_types: HashSet<TypeId>,
    object: TypeId,
}

impl Program {
    pub fn items(&self) -> &Items {
        &self.items
    }

    pub fn shared_items(&self) -> Arc<Items> {
        Arc::clone(&self.items)
    }

    pub fn object_type(&self) -> TypeId {
        self.object
    }

    /// Every class definition, sorted by descriptor.
    pub fn classes(&self) -> &[ClassDef] {
        &self.classes
    }

    pub fn interfaces(&self) -> impl Iterator<Item = &ClassDef> {
        self.classes.iter().filter(|class| class.is_interface())
    }

    pub fn definition_for(&self, ty: TypeId) -> Option<&ClassDef> {
        self.by_type.get(&ty).map(|idx| &self.classes[*idx])
    }

    pub fn is_interface(&self, ty: TypeId) -> bool {
        self.definition_for(ty).is_some_and(ClassDef::is_interface)
    }

    pub fn method_definition(&self, method: MethodRef) -> Option<&MethodDef> {
        self.definition_for(method.holder)?
            .method(method.name, method.proto)
    }

    pub fn field_definition(&self, field: FieldRef) -> Option<&FieldDef> {
        self.definition_for(field.holder)?.field(field.name, field.ty)
    }

    /// Non-interface types whose superclass is `ty`, sorted by descriptor.
    pub fn extends_subtypes(&self, ty: TypeId) -> &[TypeId] {
        self.extends_subtypes
            .get(&ty)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Classes and interfaces that list `iface` among their direct interfaces.
    pub fn direct_implementors(&self, iface: TypeId) -> &[TypeId] {
        self.implementors
            .get(&iface)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn super_interfaces(&self, ty: TypeId) -> &[TypeId] {
        self.definition_for(ty)
            .map(|class| class.interfaces.as_slice())
            .unwrap_or_default()
    }

    /// Every strict subtype of `ty`, classes and interfaces, sorted by descriptor.
    pub fn all_subtypes(&self, ty: TypeId) -> Vec<TypeId> {
        let mut seen = HashSet::new();
        let mut result = Vec::new();
        let mut worklist: VecDeque<TypeId> = self
            .extends_subtypes(ty)
            .iter()
            .chain(self.direct_implementors(ty))
            .copied()
            .collect();
        while let Some(sub) = worklist.pop_front() {
            if !seen.insert(sub) {
                continue;
            }
            result.push(sub);
            worklist.extend(self.extends_subtypes(sub).iter().copied());
            worklist.extend(self.direct_implementors(sub).iter().copied());
        }
        result.sort_by(|a, b| self.items.descriptor(*a).cmp(self.items.descriptor(*b)));
        result
    }

    /// All non-interface classes that are (transitively) subtypes of `iface`, sorted by
    /// descriptor.
    pub fn implementing_classes(&self, iface: TypeId) -> Vec<TypeId> {
        let mut classes = self.all_subtypes(iface);
        classes.retain(|ty| !self.is_interface(*ty));
        classes
    }

    /// Reflexive subtype test over the superclass chain and superinterfaces.
    pub fn is_subtype_of(&self, sub: TypeId, sup: TypeId) -> bool {
        let mut seen = HashSet::new();
        let mut worklist = vec![sub];
        while let Some(ty) = worklist.pop() {
            if ty == sup {
                return true;
            }
            if !seen.insert(ty) {
                continue;
            }
            if let Some(class) = self.definition_for(ty) {
                worklist.extend(class.super_type);
                worklist.extend(class.interfaces.iter().copied());
            }
        }
        false
    }

    pub fn is_related(&self, a: TypeId, b: TypeId) -> bool {
        self.is_subtype_of(a, b) || self.is_subtype_of(b, a)
    }

    /// Whether some type (either of the two included) is a subtype of both `a` and `b`.
    pub fn have_common_subtype(&self, a: TypeId, b: TypeId) -> bool {
        if self.is_related(a, b) {
            return true;
        }
        let below_a: HashSet<TypeId> = self.all_subtypes(a).into_iter().collect();
        self.all_subtypes(b).iter().any(|ty| below_a.contains(ty))
    }

    pub fn was_pruned(&self, ty: TypeId) -> bool {
        self.pruned_types.contains(&ty)
    }

    pub fn call_sites(&self) -> impl Iterator<Item = (CallSiteId, &CallSite)> {
        self.call_sites
            .iter()
            .enumerate()
            .map(|(idx, call_site)| (CallSiteId::from_idx(idx), call_site))
    }

    pub fn call_site(&self, id: CallSiteId) -> &CallSite {
        &self.call_sites[id.idx()]
    }

    pub fn method_references(&self) -> &[MethodRef] {
        &self.method_references
    }

    pub fn field_references(&self) -> &[FieldRef] {
        &self.field_references
    }

    pub fn lookup_type(&self, descriptor: &str) -> Option<TypeId> {
        self.items.lookup_type(descriptor)
    }

    /// The interned reference `holder->name descriptor`, whether or not it is defined.
    pub fn lookup_method(&self, holder: &str, name: &str, descriptor: &str) -> Option<MethodRef> {
        Some(MethodRef {
            holder: self.items.lookup_type(holder)?,
            name: self.items.symbol(name)?,
            proto: self.items.lookup_proto(descriptor)?,
        })
    }

    pub fn lookup_field(&self, holder: &str, name: &str, descriptor: &str) -> Option<FieldRef> {
        Some(FieldRef {
            holder: self.items.lookup_type(holder)?,
            name: self.items.symbol(name)?,
            ty: self.items.lookup_type(descriptor)?,
        })
    }

    /// JVM method resolution: the superclass chain first, then the maximally specific
    /// superinterface methods.
    pub fn resolve_method(&self, method: MethodRef) -> MethodResolution {
        let Some(holder) = self.definition_for(method.holder) else {
            return MethodResolution::Failed(Vec::new());
        };

        let mut chain = Vec::new();
        if holder.is_interface() {
            if holder.method(method.name, method.proto).is_some() {
                return MethodResolution::Resolved(method);
            }
            chain.push(holder.ty);
        } else {
            let mut current = Some(holder.ty);
            while let Some(class) = current.and_then(|ty| self.definition_for(ty)) {
                if let Some(found) = class.method(method.name, method.proto) {
                    return MethodResolution::Resolved(found.reference);
                }
                chain.push(class.ty);
                current = class.super_type;
            }
        }

        let mut seen = HashSet::new();
        let mut worklist: VecDeque<TypeId> = chain
            .iter()
            .flat_map(|ty| self.super_interfaces(*ty).iter().copied())
            .collect();
        let mut candidates = Vec::new();
        while let Some(iface) = worklist.pop_front() {
            if !seen.insert(iface) {
                continue;
            }
            let Some(class) = self.definition_for(iface) else {
                continue;
            };
            if let Some(found) = class.method(method.name, method.proto) {
                if !found.access_flags.is_static() && !found.access_flags.is_private() {
                    candidates.push(found.reference);
                }
            }
            worklist.extend(class.interfaces.iter().copied());
        }

        let maximally_specific: Vec<MethodRef> = candidates
            .iter()
            .copied()
            .filter(|candidate| {
                !candidates.iter().any(|other| {
                    other.holder != candidate.holder
                        && self.is_subtype_of(other.holder, candidate.holder)
                })
            })
            .collect();
        match maximally_specific.as_slice() {
            [single] => MethodResolution::Resolved(*single),
            _ => MethodResolution::Failed(maximally_specific),
        }
    }

    /// JVM field resolution: the holder, then its superinterfaces, then its superclass.
    pub fn resolve_field(&self, field: FieldRef) -> Option<FieldRef> {
        let class = self.definition_for(field.holder)?;
        if let Some(found) = class.field(field.name, field.ty) {
            return Some(found.reference);
        }
        for iface in &class.interfaces {
            if let Some(found) = self.resolve_field(field.with_holder(*iface)) {
                return Some(found);
            }
        }
        let super_type = class.super_type?;
        self.resolve_field(field.with_holder(super_type))
    }

    /// Abstract interface methods a lambda call site implements: every abstract method named
    /// like the call site in its interfaces and their superinterfaces.
    pub fn lambda_implemented_methods(&self, call_site: CallSiteId) -> Vec<MethodRef> {
        let call_site = self.call_site(call_site);
        let mut result = Vec::new();
        let mut seen = HashSet::new();
        let mut worklist: VecDeque<TypeId> = call_site.interfaces.iter().copied().collect();
        while let Some(iface) = worklist.pop_front() {
            if !seen.insert(iface) {
                continue;
            }
            let Some(class) = self.definition_for(iface) else {
                continue;
            };
            for method in &class.methods {
                if method.reference.name == call_site.name
                    && method.access_flags.is_abstract()
                    && !result.contains(&method.reference)
                {
                    result.push(method.reference);
                }
            }
            worklist.extend(class.interfaces.iter().copied());
        }
        result
    }

    /// Whether a (strict) supertype outside the program declares an overridable method with the
    /// same name and prototype.
    pub fn overrides_non_program_method(&self, method: MethodRef) -> bool {
        let Some(holder) = self.definition_for(method.holder) else {
            return false;
        };
        let mut seen = HashSet::new();
        let mut worklist: Vec<TypeId> = holder.super_type.into_iter().collect();
        worklist.extend(holder.interfaces.iter().copied());
        while let Some(ty) = worklist.pop() {
            if !seen.insert(ty) {
                continue;
            }
            let Some(class) = self.definition_for(ty) else {
                continue;
            };
            if !class.is_program() {
                let overridden = class.method(method.name, method.proto).is_some_and(|def| {
                    !def.is_direct()
                });
                if overridden {
                    return true;
                }
            }
            worklist.extend(class.super_type);
            worklist.extend(class.interfaces.iter().copied());
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn program() -> Program {
        let mut builder = ProgramBuilder::new();
        builder
            .add_class(
                ClassSpec::library(OBJECT_DESCRIPTOR)
                    .method(MethodSpec::new("toString", "()Ljava/lang/String;")),
            )
            .unwrap();
        builder
            .add_class(
                ClassSpec::program("Lapp/I;")
                    .interface()
                    .method(MethodSpec::abstract_method("run", "()V")),
            )
            .unwrap();
        builder
            .add_class(
                ClassSpec::program("Lapp/Base;")
                    .implements("Lapp/I;")
                    .method(MethodSpec::new("run", "()V"))
                    .method(MethodSpec::new("toString", "()Ljava/lang/String;"))
                    .field(FieldSpec::new("count", "I")),
            )
            .unwrap();
        builder
            .add_class(ClassSpec::program("Lapp/Sub;").extends("Lapp/Base;"))
            .unwrap();
        builder
            .add_class(ClassSpec::program("Lapp/Orphan;").extends("Lmissing/Parent;"))
            .unwrap();
        builder.build()
    }

    #[test]
    fn hierarchy_queries() {
        let program = program();
        let object = program.object_type();
        let base = program.lookup_type("Lapp/Base;").unwrap();
        let sub = program.lookup_type("Lapp/Sub;").unwrap();
        let iface = program.lookup_type("Lapp/I;").unwrap();
        let missing = program.lookup_type("Lmissing/Parent;").unwrap();

        assert_eq!(program.extends_subtypes(object), &[base, missing]);
        assert_eq!(program.extends_subtypes(base), &[sub]);
        assert_eq!(program.implementing_classes(iface), vec![base, sub]);
        assert!(program.is_subtype_of(sub, iface));
        assert!(!program.is_subtype_of(iface, sub));
    }

    #[test]
    fn unrelated_interfaces_meet_in_a_common_implementor() {
        let mut builder = ProgramBuilder::new();
        builder.add_class(ClassSpec::library(OBJECT_DESCRIPTOR)).unwrap();
        let i = builder.add_class(ClassSpec::program("LI;").interface()).unwrap();
        let j = builder.add_class(ClassSpec::program("LJ;").interface()).unwrap();
        let k = builder.add_class(ClassSpec::program("LK;").interface()).unwrap();
        builder
            .add_class(ClassSpec::program("LC;").implements("LI;").implements("LJ;"))
            .unwrap();
        let d = builder
            .add_class(ClassSpec::program("LD;").implements("LK;"))
            .unwrap();
        let program = builder.build();

        assert!(!program.is_related(i, j));
        assert!(program.have_common_subtype(i, j));
        assert!(!program.have_common_subtype(i, k));
        assert!(program.have_common_subtype(d, k));
        assert!(!program.have_common_subtype(d, i));
    }

    #[test]
    fn method_resolution_walks_superclasses() {
        let program = program();
        let on_sub = program.lookup_method("Lapp/Sub;", "run", "()V").unwrap();
        let on_base = program.lookup_method("Lapp/Base;", "run", "()V").unwrap();
        assert_eq!(program.resolve_method(on_sub), MethodResolution::Resolved(on_base));

        let to_string = program
            .lookup_method("Lapp/Base;", "toString", "()Ljava/lang/String;")
            .unwrap();
        assert!(program.overrides_non_program_method(to_string));
        assert!(!program.overrides_non_program_method(on_base));
    }

    #[test]
    fn field_resolution_and_unknown_holders() {
        let program = program();
        let on_sub = program.lookup_field("Lapp/Sub;", "count", "I").unwrap();
        let on_base = program.lookup_field("Lapp/Base;", "count", "I").unwrap();
        assert_eq!(program.resolve_field(on_sub), Some(on_base));

        let on_missing = on_sub.with_holder(program.lookup_type("Lmissing/Parent;").unwrap());
        assert_eq!(program.resolve_field(on_missing), None);
    }

    #[test]
    fn members_are_sorted_and_duplicates_rejected() {
        let mut builder = ProgramBuilder::new();
        builder
            .add_class(
                ClassSpec::program("LA;")
                    .method(MethodSpec::new("b", "()V"))
                    .method(MethodSpec::new("a", "(I)V"))
                    .method(MethodSpec::new("a", "()V")),
            )
            .unwrap();
        assert!(matches!(
            builder.add_class(ClassSpec::program("LA;")),
            Err(MinifyError::DuplicateDefinition(_))
        ));
        assert!(builder.add_class(ClassSpec::program("NotADescriptor")).is_err());
        let program = builder.build();
        let class = program.definition_for(program.lookup_type("LA;").unwrap()).unwrap();
        let order: Vec<String> = class
            .methods
            .iter()
            .map(|method| program.items().method_to_string(method.reference))
            .collect();
        assert_eq!(order, vec!["LA;->a()V", "LA;->a(I)V", "LA;->b()V"]);
    }
}
