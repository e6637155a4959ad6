//! Class and package renaming.

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use nova_classfile::names;
use nova_classfile::{parse_class_signature, parse_field_signature, parse_method_signature};

use crate::config::{MinifyConfig, PackageObfuscation};
use crate::diagnostics::{Diagnostic, MALFORMED_SIGNATURE};
use crate::error::{MinifyError, Result};
use crate::lens::SignatureOwner;
use crate::naming::{CounterKind, NameCounter, NameGenerator};
use crate::program::{Program, TypeId};
use crate::strategy::{package_of_descriptor, NamingStrategy};

/// Allocator of class and sub-package names inside one package or outer class.
#[derive(Debug)]
struct Namespace {
    package_name: String,
    /// `L`, `La/b/` or `La/b/C$`.
    prefix: String,
    classes: NameCounter,
    packages: NameCounter,
}

pub(crate) struct ClassRenaming {
    /// New descriptor of every class that has one, identity entries included.
    pub classes: HashMap<TypeId, String>,
    /// Original package -> renamed package, binary form, changed entries only.
    pub packages: IndexMap<String, String>,
    /// Rewritten (`Some`) or dropped (`None`) generic signatures.
    pub signatures: HashMap<SignatureOwner, Option<String>>,
    pub diagnostics: Vec<Diagnostic>,
}

pub(crate) struct ClassRenamer<'a> {
    program: &'a Program,
    config: &'a MinifyConfig,
    strategy: &'a dyn NamingStrategy,
    class_names: NameGenerator,
    package_names: NameGenerator,
    namespaces: Vec<Namespace>,
    /// Original package -> namespace.
    states: IndexMap<String, usize>,
    /// Original outer class binary name -> namespace.
    outer_states: HashMap<String, usize>,
    no_obfuscation_prefixes: HashSet<String>,
    used_package_prefixes: HashSet<String>,
    used_type_names: HashSet<String>,
    renaming: HashMap<TypeId, String>,
    reserved_by: HashMap<String, TypeId>,
    signatures: HashMap<SignatureOwner, Option<String>>,
    diagnostics: Vec<Diagnostic>,
}

const TOP_LEVEL: usize = 0;

impl<'a> ClassRenamer<'a> {
    pub fn new(
        program: &'a Program,
        config: &'a MinifyConfig,
        strategy: &'a dyn NamingStrategy,
    ) -> Self {
        let max_attempts = config.max_name_attempts;
        let mut renamer = Self {
            program,
            config,
            strategy,
            class_names: NameGenerator::new(
                &config.class_dictionary,
                config.mixed_case_class_names,
                max_attempts,
            ),
            package_names: NameGenerator::new(
                &config.package_dictionary,
                config.mixed_case_class_names,
                max_attempts,
            ),
            namespaces: Vec::new(),
            states: IndexMap::new(),
            outer_states: HashMap::new(),
            no_obfuscation_prefixes: HashSet::new(),
            used_package_prefixes: HashSet::new(),
            used_type_names: HashSet::new(),
            renaming: HashMap::new(),
            reserved_by: HashMap::new(),
            signatures: HashMap::new(),
            diagnostics: Vec::new(),
        };
        let top_level = renamer.new_namespace(config.package_prefix_binary(), "/");
        debug_assert_eq!(top_level, TOP_LEVEL);
        renamer.states.insert(String::new(), top_level);
        renamer
    }

    /// Pins original packages to names chosen by an earlier pass.
    pub fn with_seed_packages<'p>(
        mut self,
        packages: impl IntoIterator<Item = (&'p str, &'p str)>,
    ) -> Self {
        for (original, renamed) in packages {
            if original.is_empty() || self.states.contains_key(original) {
                continue;
            }
            self.register_package_prefixes_as_used(renamed, false);
            let namespace = self.new_namespace(renamed.to_string(), "/");
            self.states.insert(original.to_string(), namespace);
        }
        self
    }

    fn new_namespace(&mut self, package_name: String, separator: &str) -> usize {
        let prefix = if package_name.is_empty() {
            "L".to_string()
        } else {
            format!("L{package_name}{separator}")
        };
        for reserved in &self.config.reserved_class_names {
            self.used_type_names.insert(format!("{prefix}{reserved};"));
        }
        self.namespaces.push(Namespace {
            package_name,
            prefix,
            classes: NameCounter::default(),
            packages: NameCounter::default(),
        });
        self.namespaces.len() - 1
    }

    pub fn run(mut self) -> Result<ClassRenaming> {
        let program = self.program;
        {
            let _span =
                tracing::debug_span!(target: "nova.minify", "phase", name = "reserve-classes")
                    .entered();
            for class in program.classes() {
                let Some(descriptor) = self.strategy.reserved_class_descriptor(class) else {
                    continue;
                };
                if let Some(first) = self.reserved_by.get(&descriptor) {
                    return Err(MinifyError::ConflictingClassName {
                        name: descriptor,
                        first: program.items().descriptor(*first).to_string(),
                        second: program.items().descriptor(class.ty).to_string(),
                    });
                }
                self.reserved_by.insert(descriptor.clone(), class.ty);
                self.register_class_as_used(class.ty, descriptor);
            }
        }

        {
            let _span =
                tracing::debug_span!(target: "nova.minify", "phase", name = "rename-classes")
                    .entered();
            for class in program.classes() {
                if !class.is_program() || self.renaming.contains_key(&class.ty) {
                    continue;
                }
                let renamed = self.compute_name(class.ty)?;
                tracing::trace!(
                    target: "nova.minify",
                    class = program.items().descriptor(class.ty),
                    renamed = %renamed,
                    "renamed class"
                );
                self.renaming.insert(class.ty, renamed);
            }
        }

        self.rename_dangling_types()?;
        self.rename_generic_signatures();
        self.rename_array_types();

        let mut packages = IndexMap::new();
        for (original, namespace) in &self.states {
            let renamed = &self.namespaces[*namespace].package_name;
            if renamed != original {
                packages.insert(original.clone(), renamed.clone());
            }
        }
        packages.sort_keys();

        Ok(ClassRenaming {
            classes: self.renaming,
            packages,
            signatures: self.signatures,
            diagnostics: self.diagnostics,
        })
    }

    fn register_class_as_used(&mut self, ty: TypeId, descriptor: String) {
        let identity = descriptor == self.program.items().descriptor(ty);
        let package = package_of_descriptor(&descriptor).to_string();
        self.register_package_prefixes_as_used(&package, identity);
        self.used_type_names.insert(descriptor.clone());
        self.renaming.insert(ty, descriptor);

        if self.config.keep_inner_class_structure {
            if let Some(outer) = self.outer_class_for(ty) {
                let outer_reserved = self
                    .program
                    .definition_for(outer)
                    .and_then(|class| self.strategy.reserved_class_descriptor(class))
                    .is_some();
                if !self.renaming.contains_key(&outer) && !outer_reserved {
                    // Keeping a member class keeps its outer class.
                    let outer_descriptor = self.program.items().descriptor(outer).to_string();
                    self.register_class_as_used(outer, outer_descriptor);
                }
            }
        }
    }

    fn register_package_prefixes_as_used(&mut self, package: &str, identity: bool) {
        if identity && !self.config.allow_access_modification {
            self.no_obfuscation_prefixes.insert(package.to_string());
        }
        let mut prefix = package;
        while !prefix.is_empty() {
            self.used_package_prefixes.insert(prefix.to_string());
            prefix = names::parent_package(prefix);
        }
    }

    /// The outer class of a member class. Local and anonymous classes have none.
    fn outer_class_for(&self, ty: TypeId) -> Option<TypeId> {
        let class = self.program.definition_for(ty)?;
        if class.enclosing_method {
            return None;
        }
        class.inner_class?.outer
    }

    fn compute_name(&mut self, ty: TypeId) -> Result<String> {
        if self.config.keep_inner_class_structure {
            if let Some(outer) = self.outer_class_for(ty) {
                let items = self.program.items();
                let inner_name = self
                    .program
                    .definition_for(ty)
                    .and_then(|class| class.inner_class)
                    .and_then(|inner| inner.inner_name)
                    .map(|name| items.str(name));
                let separator = names::inner_class_separator(
                    items.binary_name(outer),
                    items.binary_name(ty),
                    inner_name,
                )
                .unwrap_or("$")
                .to_string();
                let namespace = self.state_for_outer_class(outer, &separator)?;
                return self.next_type_name(namespace, ty);
            }
        }
        let namespace = self.state_for_class(ty)?;
        self.next_type_name(namespace, ty)
    }

    fn state_for_class(&mut self, ty: TypeId) -> Result<usize> {
        let package = package_of_descriptor(self.program.items().descriptor(ty)).to_string();
        if self.no_obfuscation_prefixes.contains(&package)
            || self.config.keeps_package_name(&package)
        {
            return Ok(self.state_for_kept_package(&package));
        }
        match self.config.package_obfuscation {
            PackageObfuscation::None => self.state_for_package_prefix(&package),
            PackageObfuscation::Repackage => Ok(TOP_LEVEL),
            PackageObfuscation::Flatten => {
                if let Some(namespace) = self.states.get(&package) {
                    return Ok(*namespace);
                }
                let renamed = self.next_package_prefix(TOP_LEVEL, &package)?;
                let namespace = self.new_namespace(renamed, "/");
                self.states.insert(package, namespace);
                Ok(namespace)
            }
        }
    }

    fn state_for_kept_package(&mut self, package: &str) -> usize {
        if let Some(namespace) = self.states.get(package) {
            return *namespace;
        }
        let namespace = self.new_namespace(package.to_string(), "/");
        self.states.insert(package.to_string(), namespace);
        namespace
    }

    fn state_for_package_prefix(&mut self, package: &str) -> Result<usize> {
        if let Some(namespace) = self.states.get(package) {
            return Ok(*namespace);
        }
        let parent = names::parent_package(package);
        let parent_state = if self.no_obfuscation_prefixes.contains(parent) {
            self.state_for_kept_package(parent)
        } else {
            self.state_for_package_prefix(parent)?
        };
        let renamed = self.next_package_prefix(parent_state, package)?;
        let namespace = self.new_namespace(renamed, "/");
        self.states.insert(package.to_string(), namespace);
        Ok(namespace)
    }

    fn state_for_outer_class(&mut self, outer: TypeId, separator: &str) -> Result<usize> {
        let key = self.program.items().binary_name(outer).to_string();
        if let Some(namespace) = self.outer_states.get(&key) {
            return Ok(*namespace);
        }
        let renamed = match self.renaming.get(&outer) {
            Some(renamed) => renamed.clone(),
            None => {
                // The outer class may be pruned; it still gets a name to nest under.
                let renamed = self.compute_name(outer)?;
                self.renaming.insert(outer, renamed.clone());
                renamed
            }
        };
        let binary_name = names::descriptor_to_binary_name(&renamed)?.to_string();
        let namespace = self.new_namespace(binary_name, separator);
        self.outer_states.insert(key, namespace);
        Ok(namespace)
    }

    fn next_type_name(&mut self, namespace: usize, ty: TypeId) -> Result<String> {
        let mut counter = self.namespaces[namespace].classes;
        let prefix = &self.namespaces[namespace].prefix;
        let used = &self.used_type_names;
        let simple = self
            .class_names
            .next_name(&mut counter, CounterKind::Virtual, |candidate| {
                !used.contains(&format!("{prefix}{candidate};"))
            })
            .ok_or_else(|| MinifyError::NameSpaceExhausted {
                item: self.program.items().descriptor(ty).to_string(),
                attempts: self.class_names.max_attempts(),
            })?;
        let descriptor = format!("{prefix}{simple};");
        self.namespaces[namespace].classes = counter;
        self.used_type_names.insert(descriptor.clone());
        Ok(descriptor)
    }

    fn next_package_prefix(&mut self, namespace: usize, package: &str) -> Result<String> {
        let mut counter = self.namespaces[namespace].packages;
        let parent = &self.namespaces[namespace].prefix[1..];
        let used = &self.used_package_prefixes;
        let simple = self
            .package_names
            .next_name(&mut counter, CounterKind::Virtual, |candidate| {
                !used.contains(&format!("{parent}{candidate}"))
            })
            .ok_or_else(|| MinifyError::NameSpaceExhausted {
                item: format!("package {package}"),
                attempts: self.package_names.max_attempts(),
            })?;
        let renamed = format!("{parent}{simple}");
        self.namespaces[namespace].packages = counter;
        self.used_package_prefixes.insert(renamed.clone());
        Ok(renamed)
    }

    /// Pruned types still mentioned by member signatures get a unique top-level name.
    fn rename_dangling_types(&mut self) -> Result<()> {
        let program = self.program;
        let items = program.items();
        for class in program.classes() {
            let method_types = class.methods.iter().flat_map(|method| {
                let proto = items.proto(method.reference.proto);
                items
                    .params(proto.params)
                    .iter()
                    .copied()
                    .chain(std::iter::once(proto.return_type))
            });
            let field_types = class.fields.iter().map(|field| field.reference.ty);
            let mentioned: Vec<TypeId> = method_types.chain(field_types).collect();
            for ty in mentioned {
                let ty = items.array_element(ty).map_or(ty, |(element, _)| element);
                if program.was_pruned(ty)
                    && !self.renaming.contains_key(&ty)
                    && program.definition_for(ty).is_none()
                {
                    let renamed = self.next_type_name(TOP_LEVEL, ty)?;
                    self.renaming.insert(ty, renamed);
                }
            }
        }
        Ok(())
    }

    fn rename_array_types(&mut self) {
        let items = self.program.items();
        for ty in items.types() {
            let Some((element, dimensions)) = items.array_element(ty) else {
                continue;
            };
            if let Some(renamed) = self.renaming.get(&element) {
                let descriptor = format!("{}{renamed}", "[".repeat(dimensions));
                self.renaming.insert(ty, descriptor);
            }
        }
    }

    fn rename_generic_signatures(&mut self) {
        let _span =
            tracing::debug_span!(target: "nova.minify", "phase", name = "rename-generic").entered();
        let program = self.program;
        let items = program.items();
        let renaming = &self.renaming;
        let mut rename = |binary_name: &str| -> Option<String> {
            let ty = items.lookup_type(&names::binary_name_to_descriptor(binary_name))?;
            let renamed = renaming.get(&ty)?;
            names::descriptor_to_binary_name(renamed)
                .ok()
                .map(str::to_string)
        };

        let mut rewritten = Vec::new();
        for class in program.classes().iter().filter(|class| class.is_program()) {
            if let Some(signature) = &class.signature {
                let result = parse_class_signature(signature)
                    .and_then(|parsed| parsed.rename_classes(&mut rename))
                    .map(|renamed| renamed.to_string());
                rewritten.push((SignatureOwner::Class(class.ty), signature, result));
            }
            for method in &class.methods {
                if let Some(signature) = &method.signature {
                    let result = parse_method_signature(signature)
                        .and_then(|parsed| parsed.rename_classes(&mut rename))
                        .map(|renamed| renamed.to_string());
                    rewritten.push((SignatureOwner::Method(method.reference), signature, result));
                }
            }
            for field in &class.fields {
                if let Some(signature) = &field.signature {
                    let result = parse_field_signature(signature)
                        .and_then(|parsed| parsed.rename_classes(&mut rename))
                        .map(|renamed| renamed.to_string());
                    rewritten.push((SignatureOwner::Field(field.reference), signature, result));
                }
            }
        }

        for (owner, original, result) in rewritten {
            match result {
                Ok(renamed) if &renamed == original => {}
                Ok(renamed) => {
                    self.signatures.insert(owner, Some(renamed));
                }
                Err(err) => {
                    let message = format!(
                        "dropping generic signature {original:?} of {}: {err}",
                        owner.display(items)
                    );
                    tracing::warn!(target: "nova.minify", "{message}");
                    self.signatures.insert(owner, None);
                    self.diagnostics
                        .push(Diagnostic::warning(MALFORMED_SIGNATURE, message));
                }
            }
        }
    }
}
