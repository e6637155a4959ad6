//! Field renaming.
//!
//! Fields are not dispatched, but resolution still walks superclasses and superinterfaces, so a
//! fresh name must not shadow (or be shadowed by) a field that resolution could reach through
//! another static type. Every type gets its own reservation scope below its superclass; forced
//! names are also pulled up into the scopes of program supertypes, and interface fields are
//! named per connected group of interfaces before any class.

use std::collections::{HashMap, HashSet};

use smol_str::SmolStr;

use crate::config::{MinifyConfig, OverloadKey};
use crate::error::{MinifyError, Result};
use crate::naming::{CounterKind, NameGenerator, NamingArena, NamingId, Owner, ReservationArena, ReservationId};
use crate::program::{ClassDef, FieldDef, FieldRef, Program, TypeId};
use crate::strategy::NamingStrategy;
use crate::union_find::UnionFind;

/// Fields share one namespace per class unless names may be overloaded by type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) enum FieldKey {
    Any,
    Type(TypeId),
}

pub(crate) struct FieldRenamer<'a> {
    program: &'a Program,
    strategy: &'a dyn NamingStrategy,
    overload_key: OverloadKey,
    generator: NameGenerator,
    reservations: ReservationArena<FieldKey>,
    naming: NamingArena<FieldKey>,
    reservation_states: HashMap<TypeId, ReservationId>,
    renaming: HashMap<FieldRef, SmolStr>,
}

impl<'a> FieldRenamer<'a> {
    pub fn new(
        program: &'a Program,
        config: &MinifyConfig,
        strategy: &'a dyn NamingStrategy,
    ) -> Self {
        Self {
            program,
            strategy,
            overload_key: config.overload_key,
            generator: NameGenerator::new(
                &config.member_dictionary,
                true,
                config.max_name_attempts,
            ),
            reservations: ReservationArena::default(),
            naming: NamingArena::default(),
            reservation_states: HashMap::new(),
            renaming: HashMap::new(),
        }
    }

    /// Name of every named field definition, unchanged names included.
    pub fn run(mut self) -> Result<HashMap<FieldRef, SmolStr>> {
        let object = self.program.object_type();
        {
            let _span =
                tracing::debug_span!(target: "nova.minify", "phase", name = "reserve-fields")
                    .entered();
            self.allocate_reservation_states(object, None);
            for iface in self.program.interfaces() {
                let root = self.reservations.root();
                self.reservation_states.insert(iface.ty, root);
            }
            self.reserve_field_names()?;
            self.propagate_reserved_names_upwards();
        }
        {
            let _span =
                tracing::debug_span!(target: "nova.minify", "phase", name = "interface-fields")
                    .entered();
            for partition in self.interface_partitions() {
                self.rename_fields_in_interface_partition(&partition)?;
            }
        }
        {
            let _span = tracing::debug_span!(target: "nova.minify", "phase", name = "rename-fields")
                .entered();
            self.rename_fields_in_classes(object, None)?;
        }
        Ok(self.renaming)
    }

    fn key(&self, ty: TypeId) -> FieldKey {
        match self.overload_key {
            OverloadKey::Parameters => FieldKey::Any,
            OverloadKey::FullSignature => FieldKey::Type(ty),
        }
    }

    fn allocate_reservation_states(&mut self, ty: TypeId, parent: Option<ReservationId>) {
        let node = match parent {
            Some(parent) => self.reservations.create_child(parent),
            None => self.reservations.root(),
        };
        self.reservation_states.insert(ty, node);
        let program = self.program;
        for subtype in program.extends_subtypes(ty) {
            self.allocate_reservation_states(*subtype, Some(node));
        }
    }

    fn reserve_field_names(&mut self) -> Result<()> {
        let program = self.program;
        for class in program.classes() {
            let Some(node) = self.reservation_states.get(&class.ty).copied() else {
                continue;
            };
            let mut reserved_any = false;
            for field in &class.fields {
                let Some(name) = self.strategy.reserved_field_name(field, class) else {
                    continue;
                };
                self.reserve(node, class, field, name.clone())?;
                self.renaming.insert(field.reference, name);
                reserved_any = true;
            }
            // Forced interface fields are visible in every implementation.
            if class.is_interface() && reserved_any {
                for subtype in program.all_subtypes(class.ty) {
                    if let Some(target) = self.reservation_states.get(&subtype).copied() {
                        self.reservations.include_reservations(target, node);
                    }
                }
            }
        }
        Ok(())
    }

    fn reserve(
        &mut self,
        node: ReservationId,
        holder: &ClassDef,
        field: &FieldDef,
        name: SmolStr,
    ) -> Result<()> {
        let key = self.key(field.reference.ty);
        let owner = Owner {
            holder: holder.ty,
            original: field.reference.name,
            private: field.access_flags.is_private(),
        };
        for other in self.reservations.owners(node, key, &name) {
            if other.original != owner.original && other.coexists_with(&owner, self.program) {
                let items = self.program.items();
                return Err(MinifyError::ConflictingMemberName {
                    name: name.to_string(),
                    first: other.display(items),
                    second: owner.display(items),
                });
            }
        }
        self.reservations.reserve_name(node, key, name, owner);
        Ok(())
    }

    fn propagate_reserved_names_upwards(&mut self) {
        let program = self.program;
        for ty in top_down_order(program).into_iter().rev() {
            let (Some(class), Some(node)) = (
                program.definition_for(ty),
                self.reservation_states.get(&ty).copied(),
            ) else {
                continue;
            };
            if !class.is_program() {
                continue;
            }
            for supertype in class.super_type.iter().chain(&class.interfaces) {
                let is_program = program
                    .definition_for(*supertype)
                    .is_some_and(ClassDef::is_program);
                if let (true, Some(target)) =
                    (is_program, self.reservation_states.get(supertype).copied())
                {
                    self.reservations.include_reservations_from_below(target, node);
                }
            }
        }
    }

    /// Program interfaces grouped so that two interfaces share a group when one extends the other
    /// or some class implements both.
    fn interface_partitions(&self) -> Vec<Vec<TypeId>> {
        let program = self.program;
        let is_program_interface = |ty: &TypeId| {
            program
                .definition_for(*ty)
                .is_some_and(|class| class.is_interface() && class.is_program())
        };
        let mut partitions = UnionFind::default();
        for iface in program.interfaces().filter(|iface| iface.is_program()) {
            partitions.make_set(iface.ty);
            for parent in iface.interfaces.iter().filter(|ty| is_program_interface(ty)) {
                partitions.union(iface.ty, *parent);
            }
        }
        for class in program.classes().iter().filter(|class| !class.is_interface()) {
            let mut implemented: Vec<TypeId> = Vec::new();
            let mut current = Some(class);
            while let Some(def) = current {
                implemented.extend(def.interfaces.iter().copied().filter(is_program_interface));
                current = def.super_type.and_then(|ty| program.definition_for(ty));
            }
            if let [first, rest @ ..] = implemented.as_slice() {
                for other in rest {
                    partitions.union(*first, *other);
                }
            }
        }
        partitions.sets().into_values().collect()
    }

    fn rename_fields_in_interface_partition(&mut self, partition: &[TypeId]) -> Result<()> {
        let program = self.program;
        let scope = self.reservations.root();
        for iface in partition {
            if let Some(node) = self.reservation_states.get(iface).copied() {
                self.reservations.include_reservations(scope, node);
                self.reservations.include_reservations_from_below(scope, node);
            }
        }
        let naming = self.naming.root(scope);
        let chosen = self.reservations.root();
        for iface in partition {
            let Some(class) = program.definition_for(*iface) else {
                continue;
            };
            for field in &class.fields {
                let name = self.name_field(naming, class, field)?;
                let owner = Owner {
                    holder: class.ty,
                    original: field.reference.name,
                    private: field.access_flags.is_private(),
                };
                let key = self.key(field.reference.ty);
                self.reservations.reserve_name(chosen, key, name, owner);
            }
        }

        // Names chosen here are off limits for implementations and for what they inherit.
        let mut visited = HashSet::new();
        for iface in partition {
            for subtype in program.all_subtypes(*iface) {
                if !visited.insert(subtype) {
                    continue;
                }
                if let Some(node) = self.reservation_states.get(&subtype).copied() {
                    self.reservations.include_reservations(node, chosen);
                }
                let mut ancestor = program
                    .definition_for(subtype)
                    .filter(|class| !class.is_interface())
                    .and_then(|class| class.super_type);
                while let Some(ty) = ancestor {
                    let Some(class) = program.definition_for(ty).filter(|c| c.is_program()) else {
                        break;
                    };
                    if let Some(node) = self.reservation_states.get(&ty).copied() {
                        self.reservations.include_reservations_from_below(node, chosen);
                    }
                    ancestor = class.super_type;
                }
            }
        }
        Ok(())
    }

    fn rename_fields_in_classes(&mut self, ty: TypeId, parent: Option<NamingId>) -> Result<()> {
        let program = self.program;
        let Some(node) = self.reservation_states.get(&ty).copied() else {
            return Ok(());
        };
        let naming = match parent {
            Some(parent) => self.naming.create_child(parent, node),
            None => self.naming.root(node),
        };
        if let Some(holder) = program.definition_for(ty) {
            if self.strategy.allow_member_renaming(holder) {
                for field in &holder.fields {
                    self.name_field(naming, holder, field)?;
                }
            }
        }
        for subtype in program.extends_subtypes(ty) {
            self.rename_fields_in_classes(*subtype, Some(naming))?;
        }
        Ok(())
    }

    fn name_field(
        &mut self,
        naming: NamingId,
        holder: &ClassDef,
        field: &FieldDef,
    ) -> Result<SmolStr> {
        let items = self.program.items();
        let key = self.key(field.reference.ty);
        let original = field.reference.name;
        let name = match self.strategy.reserved_field_name(field, holder) {
            Some(name) => name,
            None => {
                let reservations = &self.reservations;
                self.naming
                    .new_or_reserved_name_for(
                        naming,
                        key,
                        original,
                        None,
                        CounterKind::Virtual,
                        reservations,
                        &self.generator,
                        |arena, candidate| {
                            arena.is_available(naming, key, original, candidate, reservations)
                        },
                    )
                    .ok_or_else(|| MinifyError::NameSpaceExhausted {
                        item: items.field_to_string(field.reference),
                        attempts: self.generator.max_attempts(),
                    })?
            }
        };
        tracing::trace!(
            target: "nova.minify",
            field = %items.field_to_string(field.reference),
            renamed = %name,
            "renamed field"
        );
        self.naming.add_renaming(naming, key, original, name.clone());
        self.renaming.insert(field.reference, name.clone());
        Ok(name)
    }
}

/// Every class and interface after all of its supertypes.
fn top_down_order(program: &Program) -> Vec<TypeId> {
    fn visit(
        program: &Program,
        ty: TypeId,
        visited: &mut HashSet<TypeId>,
        order: &mut Vec<TypeId>,
    ) {
        if !visited.insert(ty) {
            return;
        }
        if let Some(class) = program.definition_for(ty) {
            for supertype in class.super_type.iter().chain(&class.interfaces) {
                visit(program, *supertype, visited, order);
            }
        }
        order.push(ty);
    }

    let mut visited = HashSet::new();
    let mut order = Vec::new();
    for class in program.classes() {
        visit(program, class.ty, &mut visited, &mut order);
    }
    order
}
