//! The result of a renaming pass.

use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;
use nova_classfile::names;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::classes::ClassRenaming;
use crate::diagnostics::{Diagnostic, Severity};
use crate::methods::MethodRenaming;
use crate::program::{CallSiteId, FieldRef, Items, MethodRef, Program, ProtoId, TypeId};
use crate::seed::{ClassMapping, MemberMapping, MemberSignature, SeedMapping};

/// The item a generic signature is attached to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SignatureOwner {
    Class(TypeId),
    Method(MethodRef),
    Field(FieldRef),
}

impl SignatureOwner {
    pub fn display(&self, items: &Items) -> String {
        match self {
            SignatureOwner::Class(ty) => items.descriptor(*ty).to_string(),
            SignatureOwner::Method(method) => items.method_to_string(*method),
            SignatureOwner::Field(field) => items.field_to_string(*field),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GenericSignature<'a> {
    /// No signature, or one that mentions no renamed class.
    Unchanged,
    Rewritten(&'a str),
    /// The signature could not be parsed and must be removed from the output.
    Dropped,
}

/// Original and renamed binary names of one program class, with all of its members.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassNaming {
    pub original: String,
    pub renamed: String,
    pub methods: Vec<MemberMapping>,
    pub fields: Vec<MemberMapping>,
}

/// Immutable mapping from original to renamed identifiers.
///
/// Every lookup falls back to the original identifier when nothing was recorded for it.
#[derive(Debug)]
pub struct NamingLens {
    items: Arc<Items>,
    classes: HashMap<TypeId, String>,
    packages: IndexMap<String, String>,
    methods: HashMap<MethodRef, SmolStr>,
    fields: HashMap<FieldRef, SmolStr>,
    call_sites: HashMap<CallSiteId, SmolStr>,
    signatures: HashMap<SignatureOwner, Option<String>>,
    class_namings: Vec<ClassNaming>,
    diagnostics: Vec<Diagnostic>,
}

impl NamingLens {
    pub(crate) fn new(
        program: &Program,
        classes: ClassRenaming,
        methods: MethodRenaming,
        fields: HashMap<FieldRef, SmolStr>,
        diagnostics: Vec<Diagnostic>,
    ) -> Self {
        let mut lens = NamingLens {
            items: program.shared_items(),
            classes: classes.classes,
            packages: classes.packages,
            methods: methods.methods,
            fields,
            call_sites: methods.call_sites,
            signatures: classes.signatures,
            class_namings: Vec::new(),
            diagnostics,
        };
        lens.class_namings = lens.collect_class_namings(program);
        lens
    }

    fn collect_class_namings(&self, program: &Program) -> Vec<ClassNaming> {
        let items = program.items();
        program
            .classes()
            .iter()
            .filter(|class| class.is_program())
            .map(|class| ClassNaming {
                original: items.binary_name(class.ty).to_string(),
                renamed: self.lookup_binary_name(class.ty).to_string(),
                methods: class
                    .methods
                    .iter()
                    .filter(|method| !method.is_initializer())
                    .map(|method| MemberMapping {
                        original: MemberSignature {
                            name: items.str(method.reference.name).to_string(),
                            descriptor: items.proto_descriptor(method.reference.proto),
                        },
                        renamed: self.lookup_method_name(method.reference).to_string(),
                    })
                    .collect(),
                fields: class
                    .fields
                    .iter()
                    .map(|field| MemberMapping {
                        original: MemberSignature {
                            name: items.str(field.reference.name).to_string(),
                            descriptor: items.descriptor(field.reference.ty).to_string(),
                        },
                        renamed: self.lookup_field_name(field.reference).to_string(),
                    })
                    .collect(),
            })
            .collect()
    }

    pub(crate) fn add_method_names(&mut self, names: impl IntoIterator<Item = (MethodRef, SmolStr)>) {
        for (method, name) in names {
            self.methods.entry(method).or_insert(name);
        }
    }

    pub(crate) fn add_field_names(&mut self, names: impl IntoIterator<Item = (FieldRef, SmolStr)>) {
        for (field, name) in names {
            self.fields.entry(field).or_insert(name);
        }
    }

    pub fn items(&self) -> &Items {
        &self.items
    }

    /// The renamed descriptor of a class or array type; primitives map to themselves.
    pub fn lookup_descriptor(&self, ty: TypeId) -> &str {
        self.classes
            .get(&ty)
            .map(String::as_str)
            .unwrap_or_else(|| self.items.descriptor(ty))
    }

    /// The renamed binary name (`a/b`) of a class type.
    pub fn lookup_binary_name(&self, ty: TypeId) -> &str {
        let descriptor = self.lookup_descriptor(ty);
        names::descriptor_to_binary_name(descriptor).unwrap_or(descriptor)
    }

    pub fn lookup_method_name(&self, method: MethodRef) -> &str {
        self.methods
            .get(&method)
            .map(SmolStr::as_str)
            .unwrap_or_else(|| self.items.str(method.name))
    }

    pub fn lookup_field_name(&self, field: FieldRef) -> &str {
        self.fields
            .get(&field)
            .map(SmolStr::as_str)
            .unwrap_or_else(|| self.items.str(field.name))
    }

    /// The renamed form of a binary package name (`com/example`).
    pub fn lookup_package_name<'a>(&'a self, package: &'a str) -> &'a str {
        self.packages
            .get(package)
            .map(String::as_str)
            .unwrap_or(package)
    }

    /// The method name a lambda call site binds to, `None` for unknown call sites.
    pub fn lookup_call_site_name(&self, call_site: CallSiteId) -> Option<&str> {
        self.call_sites.get(&call_site).map(SmolStr::as_str)
    }

    /// `proto` with every class type replaced by its renamed descriptor.
    pub fn lookup_proto_descriptor(&self, proto: ProtoId) -> String {
        let proto = self.items.proto(proto);
        let mut out = String::from("(");
        for param in self.items.params(proto.params) {
            out.push_str(self.lookup_descriptor(*param));
        }
        out.push(')');
        out.push_str(self.lookup_descriptor(proto.return_type));
        out
    }

    pub fn lookup_generic_signature(&self, owner: SignatureOwner) -> GenericSignature<'_> {
        match self.signatures.get(&owner) {
            None => GenericSignature::Unchanged,
            Some(Some(signature)) => GenericSignature::Rewritten(signature),
            Some(None) => GenericSignature::Dropped,
        }
    }

    /// Program classes in descriptor order.
    pub fn class_namings(&self) -> &[ClassNaming] {
        &self.class_namings
    }

    /// This result as a seed for a later pass over an evolved program.
    pub fn to_seed_mapping(&self) -> SeedMapping {
        SeedMapping {
            packages: self.packages.clone(),
            classes: self
                .class_namings
                .iter()
                .map(|naming| {
                    let mapping = ClassMapping {
                        renamed: naming.renamed.clone(),
                        methods: naming.methods.clone(),
                        fields: naming.fields.clone(),
                    };
                    (naming.original.clone(), mapping)
                })
                .collect(),
        }
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|diagnostic| diagnostic.severity == Severity::Error)
    }
}
