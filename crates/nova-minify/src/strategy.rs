//! Decides which items keep (or are forced to) a particular name.

use std::collections::HashSet;

use nova_classfile::names;
use smol_str::SmolStr;

use crate::config::MinifyConfig;
use crate::program::{ClassDef, FieldDef, FieldRef, MethodDef, MethodRef, Program, TypeId};
use crate::seed::ResolvedSeed;

/// Source of externally forced names.
///
/// `None` means "free to rename"; `Some(name)` forces the item to `name`, which is usually its
/// original name.
pub trait NamingStrategy {
    /// The descriptor a class must end up with.
    fn reserved_class_descriptor(&self, class: &ClassDef) -> Option<String>;

    fn reserved_method_name(&self, method: &MethodDef, holder: &ClassDef) -> Option<SmolStr>;

    fn reserved_field_name(&self, field: &FieldDef, holder: &ClassDef) -> Option<SmolStr>;

    fn allow_member_renaming(&self, holder: &ClassDef) -> bool;
}

/// Items that must keep their original names, given as descriptors.
#[derive(Clone, Debug, Default)]
pub struct KeepRules {
    classes: Vec<String>,
    methods: Vec<(String, String, String)>,
    fields: Vec<(String, String, String)>,
}

impl KeepRules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn keep_class(mut self, descriptor: impl Into<String>) -> Self {
        self.classes.push(descriptor.into());
        self
    }

    pub fn keep_method(
        mut self,
        holder: impl Into<String>,
        name: impl Into<String>,
        descriptor: impl Into<String>,
    ) -> Self {
        self.methods
            .push((holder.into(), name.into(), descriptor.into()));
        self
    }

    pub fn keep_field(
        mut self,
        holder: impl Into<String>,
        name: impl Into<String>,
        descriptor: impl Into<String>,
    ) -> Self {
        self.fields
            .push((holder.into(), name.into(), descriptor.into()));
        self
    }
}

/// Keep rules resolved against a program. Rules naming unknown items are ignored.
#[derive(Debug, Default)]
struct KeptItems {
    classes: HashSet<TypeId>,
    methods: HashSet<MethodRef>,
    fields: HashSet<FieldRef>,
}

impl KeptItems {
    fn resolve(rules: &KeepRules, program: &Program) -> Self {
        Self {
            classes: rules
                .classes
                .iter()
                .filter_map(|descriptor| program.lookup_type(descriptor))
                .collect(),
            methods: rules
                .methods
                .iter()
                .filter_map(|(holder, name, descriptor)| {
                    program.lookup_method(holder, name, descriptor)
                })
                .collect(),
            fields: rules
                .fields
                .iter()
                .filter_map(|(holder, name, descriptor)| {
                    program.lookup_field(holder, name, descriptor)
                })
                .collect(),
        }
    }
}

/// The default strategy: library code, initializers, annotation members, kept items and
/// library overrides keep their names; everything else may be renamed.
pub struct MinificationStrategy<'a> {
    program: &'a Program,
    config: &'a MinifyConfig,
    kept: KeptItems,
}

impl<'a> MinificationStrategy<'a> {
    pub fn new(program: &'a Program, config: &'a MinifyConfig, keep_rules: &KeepRules) -> Self {
        Self {
            program,
            config,
            kept: KeptItems::resolve(keep_rules, program),
        }
    }

    fn original_name(&self, symbol: crate::program::Symbol) -> SmolStr {
        SmolStr::new(self.program.items().str(symbol))
    }
}

impl NamingStrategy for MinificationStrategy<'_> {
    fn reserved_class_descriptor(&self, class: &ClassDef) -> Option<String> {
        let keep = !self.config.minify || !class.is_program() || self.kept.classes.contains(&class.ty);
        keep.then(|| self.program.items().descriptor(class.ty).to_string())
    }

    fn reserved_method_name(&self, method: &MethodDef, holder: &ClassDef) -> Option<SmolStr> {
        let reference = method.reference;
        let keep = !self.allow_member_renaming(holder)
            || method.is_initializer()
            || self.kept.methods.contains(&reference)
            || (!method.is_direct() && self.program.overrides_non_program_method(reference));
        keep.then(|| self.original_name(reference.name))
    }

    fn reserved_field_name(&self, field: &FieldDef, holder: &ClassDef) -> Option<SmolStr> {
        let keep = !self.allow_member_renaming(holder) || self.kept.fields.contains(&field.reference);
        keep.then(|| self.original_name(field.reference.name))
    }

    fn allow_member_renaming(&self, holder: &ClassDef) -> bool {
        self.config.minify && holder.is_program() && !holder.is_annotation()
    }
}

/// Answers from a previous mapping first, falling back to `inner`.
pub struct ApplyMappingStrategy<'a, S> {
    seed: &'a ResolvedSeed,
    inner: S,
}

impl<'a, S: NamingStrategy> ApplyMappingStrategy<'a, S> {
    pub fn new(seed: &'a ResolvedSeed, inner: S) -> Self {
        Self { seed, inner }
    }
}

impl<S: NamingStrategy> NamingStrategy for ApplyMappingStrategy<'_, S> {
    fn reserved_class_descriptor(&self, class: &ClassDef) -> Option<String> {
        self.seed
            .class_descriptor(class.ty)
            .map(str::to_string)
            .or_else(|| self.inner.reserved_class_descriptor(class))
    }

    fn reserved_method_name(&self, method: &MethodDef, holder: &ClassDef) -> Option<SmolStr> {
        self.seed
            .method_name(method.reference)
            .cloned()
            .or_else(|| self.inner.reserved_method_name(method, holder))
    }

    fn reserved_field_name(&self, field: &FieldDef, holder: &ClassDef) -> Option<SmolStr> {
        self.seed
            .field_name(field.reference)
            .cloned()
            .or_else(|| self.inner.reserved_field_name(field, holder))
    }

    fn allow_member_renaming(&self, holder: &ClassDef) -> bool {
        self.inner.allow_member_renaming(holder)
    }
}

/// The binary package name of a class descriptor.
pub(crate) fn package_of_descriptor(descriptor: &str) -> &str {
    names::descriptor_to_binary_name(descriptor)
        .map(names::package_of_binary_name)
        .unwrap_or_default()
}
