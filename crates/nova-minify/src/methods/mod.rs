//! Method renaming.
//!
//! Reservations are recorded per *frontier*: every program class shares the reservation scope of
//! its nearest ancestor that sits directly below a library (or missing) class. Names forced
//! anywhere in a program subtree therefore block fresh names in the whole subtree, while unrelated
//! subtrees still reuse the same short names.
//!
//! The pass runs in three steps: reservation over the class tree, interface method naming (see
//! [`interfaces`]), then top-down naming of the remaining class methods.

mod interfaces;

use std::collections::HashMap;

use smol_str::SmolStr;

use crate::config::{MinifyConfig, OverloadKey};
use crate::error::{MinifyError, Result};
use crate::naming::{
    CounterKind, NameGenerator, NamingArena, NamingId, Owner, ReservationArena, ReservationId,
};
use crate::program::{
    CallSiteId, ClassDef, MethodDef, MethodRef, ParamsId, Program, ProtoId, TypeId,
};
use crate::strategy::NamingStrategy;

/// The part of a prototype that partitions method names.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) enum MethodKey {
    Params(ParamsId),
    Proto(ProtoId),
}

pub(crate) struct MethodRenaming {
    /// Name of every named method definition, unchanged names included.
    pub methods: HashMap<MethodRef, SmolStr>,
    pub call_sites: HashMap<CallSiteId, SmolStr>,
}

pub(crate) struct MethodRenamer<'a> {
    program: &'a Program,
    strategy: &'a dyn NamingStrategy,
    overload_key: OverloadKey,
    generator: NameGenerator,
    reservations: ReservationArena<MethodKey>,
    naming: NamingArena<MethodKey>,
    /// Type -> frontier, for types that are not their own frontier.
    frontiers: HashMap<TypeId, TypeId>,
    /// Frontier or interface -> its reservation scope.
    reservation_states: HashMap<TypeId, ReservationId>,
    naming_states: HashMap<TypeId, NamingId>,
    root_naming: Option<NamingId>,
    renaming: HashMap<MethodRef, SmolStr>,
    call_sites: HashMap<CallSiteId, SmolStr>,
}

impl<'a> MethodRenamer<'a> {
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
            frontiers: HashMap::new(),
            reservation_states: HashMap::new(),
            naming_states: HashMap::new(),
            root_naming: None,
            renaming: HashMap::new(),
            call_sites: HashMap::new(),
        }
    }

    pub fn run(mut self) -> Result<MethodRenaming> {
        let object = self.program.object_type();
        {
            let _span =
                tracing::debug_span!(target: "nova.minify", "phase", name = "reserve-methods")
                    .entered();
            self.reserve_names_in_classes(object, object, None, None)?;
        }
        {
            let _span = tracing::debug_span!(target: "nova.minify", "phase", name = "interfaces")
                .entered();
            self.assign_names_to_interface_methods()?;
        }
        {
            let _span =
                tracing::debug_span!(target: "nova.minify", "phase", name = "rename-methods")
                    .entered();
            self.assign_names_to_class_methods(object)?;
        }
        Ok(MethodRenaming {
            methods: self.renaming,
            call_sites: self.call_sites,
        })
    }

    fn key(&self, proto: ProtoId) -> MethodKey {
        match self.overload_key {
            OverloadKey::Parameters => MethodKey::Params(self.program.items().proto(proto).params),
            OverloadKey::FullSignature => MethodKey::Proto(proto),
        }
    }

    fn frontier(&self, ty: TypeId) -> TypeId {
        self.frontiers.get(&ty).copied().unwrap_or(ty)
    }

    fn reserve_names_in_classes(
        &mut self,
        ty: TypeId,
        frontier: TypeId,
        parent_reservation: Option<ReservationId>,
        parent_naming: Option<NamingId>,
    ) -> Result<()> {
        if frontier != ty {
            self.frontiers.insert(ty, frontier);
        }
        let reservation = match self.reservation_states.get(&frontier) {
            Some(reservation) => *reservation,
            None => {
                let reservation = match parent_reservation {
                    Some(parent) => self.reservations.create_child(parent),
                    None => self.reservations.root(),
                };
                self.reservation_states.insert(frontier, reservation);
                reservation
            }
        };
        let naming = match parent_naming {
            Some(parent) => self.naming.create_child(parent, reservation),
            None => {
                let root = self.naming.root(reservation);
                self.root_naming = Some(root);
                root
            }
        };
        self.naming_states.insert(ty, naming);

        let program = self.program;
        let holder = program.definition_for(ty);
        if let Some(holder) = holder {
            self.reserve_methods(holder, reservation)?;
        }
        // Library and missing classes move the frontier down to each of their subtypes.
        let moves_frontier = holder.map_or(true, |holder| !holder.is_program());
        for subtype in program.extends_subtypes(ty) {
            let next_frontier = if moves_frontier { *subtype } else { frontier };
            self.reserve_names_in_classes(
                *subtype,
                next_frontier,
                Some(reservation),
                Some(naming),
            )?;
        }
        Ok(())
    }

    fn reserve_methods(&mut self, holder: &ClassDef, reservation: ReservationId) -> Result<()> {
        for method in &holder.methods {
            if let Some(name) = self.strategy.reserved_method_name(method, holder) {
                self.reserve(reservation, holder, method, name)?;
            }
        }
        // A bridge without a forced name of its own follows its target's forced name.
        for method in &holder.methods {
            let Some(target) = method.bridge_target else {
                continue;
            };
            if self.strategy.reserved_method_name(method, holder).is_some() {
                continue;
            }
            let forced = holder
                .method(target.name, target.proto)
                .and_then(|target| self.strategy.reserved_method_name(target, holder));
            if let Some(name) = forced {
                self.reserve(reservation, holder, method, name)?;
            }
        }
        Ok(())
    }

    fn reserve(
        &mut self,
        reservation: ReservationId,
        holder: &ClassDef,
        method: &MethodDef,
        name: SmolStr,
    ) -> Result<()> {
        let key = self.key(method.reference.proto);
        let owner = Owner {
            holder: holder.ty,
            original: method.reference.name,
            private: method.access_flags.is_private(),
        };
        for other in self.reservations.owners(reservation, key, &name) {
            if other.original != owner.original && other.coexists_with(&owner, self.program) {
                let items = self.program.items();
                return Err(MinifyError::ConflictingMemberName {
                    name: name.to_string(),
                    first: other.display(items),
                    second: owner.display(items),
                });
            }
        }
        tracing::trace!(
            target: "nova.minify",
            method = %self.program.items().method_to_string(method.reference),
            reserved = %name,
            "reserved method name"
        );
        self.reservations.reserve_name(reservation, key, name, owner);
        Ok(())
    }

    fn assign_names_to_class_methods(&mut self, ty: TypeId) -> Result<()> {
        let program = self.program;
        if let (Some(holder), Some(naming)) =
            (program.definition_for(ty), self.naming_states.get(&ty).copied())
        {
            if self.strategy.allow_member_renaming(holder) {
                // Virtual methods first so private and static names do not constrain subtypes.
                let virtuals = holder.virtual_methods().filter(|m| m.bridge_target.is_none());
                for method in virtuals {
                    self.assign_name_to_method(holder, method, naming, None)?;
                }
                for method in holder.virtual_methods() {
                    let Some(target) = method.bridge_target else {
                        continue;
                    };
                    let preferred = self.renaming.get(&target).cloned();
                    self.assign_name_to_method(holder, method, naming, preferred)?;
                }
                for method in holder.direct_methods() {
                    self.assign_name_to_method(holder, method, naming, None)?;
                }
            }
        }
        for subtype in program.extends_subtypes(ty) {
            self.assign_names_to_class_methods(*subtype)?;
        }
        Ok(())
    }

    fn assign_name_to_method(
        &mut self,
        holder: &ClassDef,
        method: &MethodDef,
        naming: NamingId,
        preferred: Option<SmolStr>,
    ) -> Result<()> {
        if method.is_initializer() {
            return Ok(());
        }
        let items = self.program.items();
        let reference = method.reference;
        let key = self.key(reference.proto);
        let original = reference.name;
        let name = match self.strategy.reserved_method_name(method, holder) {
            Some(name) => name,
            None => {
                let kind = if method.is_direct() {
                    CounterKind::Direct
                } else {
                    CounterKind::Virtual
                };
                let reservations = &self.reservations;
                self.naming
                    .new_or_reserved_name_for(
                        naming,
                        key,
                        original,
                        preferred,
                        kind,
                        reservations,
                        &self.generator,
                        |arena, candidate| {
                            arena.is_available(naming, key, original, candidate, reservations)
                        },
                    )
                    .ok_or_else(|| MinifyError::NameSpaceExhausted {
                        item: items.method_to_string(reference),
                        attempts: self.generator.max_attempts(),
                    })?
            }
        };
        tracing::trace!(
            target: "nova.minify",
            method = %items.method_to_string(reference),
            renamed = %name,
            "renamed method"
        );
        self.naming.add_renaming(naming, key, original, name.clone());
        self.renaming.insert(reference, name);
        Ok(())
    }
}
