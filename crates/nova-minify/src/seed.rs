//! Apply-mapping seeds: a previous renaming replayed onto a new program.

use std::collections::HashMap;

use indexmap::IndexMap;
use nova_classfile::names;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::diagnostics::{Diagnostic, MISSING_MAPPING_TARGET};
use crate::error::{MinifyError, Result};
use crate::program::{FieldRef, MethodRef, Program, TypeId};

/// Original name and descriptor of a member, e.g. `run` / `(I)V` or `count` / `I`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MemberSignature {
    pub name: String,
    pub descriptor: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberMapping {
    pub original: MemberSignature,
    pub renamed: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassMapping {
    /// Renamed binary name (`a/b`).
    pub renamed: String,
    #[serde(default)]
    pub methods: Vec<MemberMapping>,
    #[serde(default)]
    pub fields: Vec<MemberMapping>,
}

/// A class and member rename table keyed by original binary names.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedMapping {
    /// Original package -> renamed package, binary form.
    #[serde(default)]
    pub packages: IndexMap<String, String>,
    #[serde(default)]
    pub classes: IndexMap<String, ClassMapping>,
}

impl SeedMapping {
    /// Binds the table to `program`.
    ///
    /// Entries for unknown classes or members are skipped with a warning. Two classes mapped to
    /// the same name is an error. Mappings of non-private members are carried down to subclasses
    /// that inherit the member without a mapping of their own.
    pub fn resolve(&self, program: &Program) -> Result<ResolvedSeed> {
        let items = program.items();
        let mut resolved = ResolvedSeed {
            packages: self
                .packages
                .iter()
                .map(|(original, renamed)| (original.clone(), renamed.clone()))
                .collect(),
            ..ResolvedSeed::default()
        };
        let mut targets: HashMap<String, TypeId> = HashMap::new();
        let mut inherited: HashMap<TypeId, Vec<(MethodRef, SmolStr)>> = HashMap::new();
        let mut inherited_fields: HashMap<TypeId, Vec<(FieldRef, SmolStr)>> = HashMap::new();

        for (original, mapping) in &self.classes {
            let descriptor = names::binary_name_to_descriptor(original);
            let Some(class) = program
                .lookup_type(&descriptor)
                .and_then(|ty| program.definition_for(ty))
            else {
                resolved.missing(format!("class {original} is not part of the program"));
                continue;
            };

            let renamed = names::binary_name_to_descriptor(&mapping.renamed);
            names::descriptor_to_binary_name(&renamed)?;
            if let Some(first) = targets.get(&renamed) {
                return Err(MinifyError::ConflictingClassName {
                    name: renamed,
                    first: items.descriptor(*first).to_string(),
                    second: descriptor,
                });
            }
            targets.insert(renamed.clone(), class.ty);
            resolved.classes.insert(class.ty, renamed);

            for member in &mapping.methods {
                let found = program
                    .lookup_method(&descriptor, &member.original.name, &member.original.descriptor)
                    .and_then(|method| program.method_definition(method));
                let Some(method) = found else {
                    resolved.missing(format!(
                        "method {original}.{}{} is not part of the program",
                        member.original.name, member.original.descriptor
                    ));
                    continue;
                };
                let name = SmolStr::new(&member.renamed);
                resolved.methods.insert(method.reference, name.clone());
                if !method.access_flags.is_private() && !method.is_initializer() {
                    inherited
                        .entry(class.ty)
                        .or_default()
                        .push((method.reference, name));
                }
            }
            for member in &mapping.fields {
                let found = program
                    .lookup_field(&descriptor, &member.original.name, &member.original.descriptor)
                    .and_then(|field| program.field_definition(field));
                let Some(field) = found else {
                    resolved.missing(format!(
                        "field {original}.{}:{} is not part of the program",
                        member.original.name, member.original.descriptor
                    ));
                    continue;
                };
                let name = SmolStr::new(&member.renamed);
                resolved.fields.insert(field.reference, name.clone());
                if !field.access_flags.is_private() {
                    inherited_fields
                        .entry(class.ty)
                        .or_default()
                        .push((field.reference, name));
                }
            }
        }

        resolved.propagate(
            program,
            program.object_type(),
            &inherited,
            &inherited_fields,
            &mut Vec::new(),
            &mut Vec::new(),
        );
        Ok(resolved)
    }
}

/// A [`SeedMapping`] bound to the ids of one program.
#[derive(Debug, Default)]
pub struct ResolvedSeed {
    classes: HashMap<TypeId, String>,
    packages: HashMap<String, String>,
    methods: HashMap<MethodRef, SmolStr>,
    fields: HashMap<FieldRef, SmolStr>,
    diagnostics: Vec<Diagnostic>,
}

impl ResolvedSeed {
    fn missing(&mut self, message: String) {
        tracing::debug!(target: "nova.minify", "{message}");
        self.diagnostics
            .push(Diagnostic::warning(MISSING_MAPPING_TARGET, message));
    }

    /// Walks extends-subtypes top-down, carrying the member mappings of every mapped ancestor.
    fn propagate(
        &mut self,
        program: &Program,
        ty: TypeId,
        inherited: &HashMap<TypeId, Vec<(MethodRef, SmolStr)>>,
        inherited_fields: &HashMap<TypeId, Vec<(FieldRef, SmolStr)>>,
        methods: &mut Vec<(MethodRef, SmolStr)>,
        fields: &mut Vec<(FieldRef, SmolStr)>,
    ) {
        // Nearest mapped ancestor wins.
        for (method, name) in methods.iter().rev() {
            self.methods
                .entry(method.with_holder(ty))
                .or_insert_with(|| name.clone());
        }
        for (field, name) in fields.iter().rev() {
            self.fields
                .entry(field.with_holder(ty))
                .or_insert_with(|| name.clone());
        }

        let (method_mark, field_mark) = (methods.len(), fields.len());
        methods.extend(inherited.get(&ty).into_iter().flatten().cloned());
        fields.extend(inherited_fields.get(&ty).into_iter().flatten().cloned());
        for subtype in program.extends_subtypes(ty) {
            self.propagate(program, *subtype, inherited, inherited_fields, methods, fields);
        }
        methods.truncate(method_mark);
        fields.truncate(field_mark);
    }

    pub fn class_descriptor(&self, ty: TypeId) -> Option<&str> {
        self.classes.get(&ty).map(String::as_str)
    }

    /// Package mappings sorted by original package.
    pub fn packages(&self) -> Vec<(&str, &str)> {
        let mut packages: Vec<(&str, &str)> = self
            .packages
            .iter()
            .map(|(original, renamed)| (original.as_str(), renamed.as_str()))
            .collect();
        packages.sort_unstable();
        packages
    }

    pub fn method_name(&self, method: MethodRef) -> Option<&SmolStr> {
        self.methods.get(&method)
    }

    pub fn field_name(&self, field: FieldRef) -> Option<&SmolStr> {
        self.fields.get(&field)
    }

    /// Every method mapping, including the ones carried down to subclasses.
    pub fn methods(&self) -> impl Iterator<Item = (MethodRef, &SmolStr)> {
        self.methods.iter().map(|(method, name)| (*method, name))
    }

    pub fn fields(&self) -> impl Iterator<Item = (FieldRef, &SmolStr)> {
        self.fields.iter().map(|(field, name)| (*field, name))
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }
}
