//! Interface method naming.
//!
//! Interfaces do not form a tree, so their methods cannot be named by the top-down class walk.
//! Methods with the same name and key are grouped; a group collects the reservation scopes of
//! every interface above or below each member and of the frontiers of every implementing class,
//! and receives one name that is free in all of them. Lambda call sites that implement several
//! groups at once (bridged return types, intersection types) merge those groups.

use std::cmp::Reverse;
use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use smol_str::SmolStr;

use super::{MethodKey, MethodRenamer};
use crate::error::{MinifyError, Result};
use crate::naming::{CounterKind, NamingArena, NamingId, Owner, ReservationArena, ReservationId};
use crate::program::{CallSiteId, MethodRef, Symbol, TypeId};
use crate::union_find::UnionFind;

type GroupKey = (Symbol, MethodKey);

/// One scope a group member must be free in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Slot {
    method: MethodRef,
    key: MethodKey,
    reservation: ReservationId,
    naming: NamingId,
}

#[derive(Debug, Default)]
struct MethodGroup {
    methods: Vec<MethodRef>,
    call_sites: Vec<CallSiteId>,
    /// Methods of intersection interfaces that share parameters with a member but not its name.
    colliding: Vec<MethodRef>,
    slots: Vec<Slot>,
}

impl MethodGroup {
    fn absorb(&mut self, other: MethodGroup) {
        for method in other.methods {
            if !self.methods.contains(&method) {
                self.methods.push(method);
            }
        }
        for call_site in other.call_sites {
            if !self.call_sites.contains(&call_site) {
                self.call_sites.push(call_site);
            }
        }
        for method in other.colliding {
            if !self.colliding.contains(&method) {
                self.colliding.push(method);
            }
        }
    }

    fn scope_count(&self) -> usize {
        self.slots
            .iter()
            .map(|slot| slot.reservation)
            .collect::<HashSet<_>>()
            .len()
    }
}

fn is_available_in_group(
    naming: &NamingArena<MethodKey>,
    reservations: &ReservationArena<MethodKey>,
    slots: &[Slot],
    candidate: &str,
) -> bool {
    slots.iter().all(|slot| {
        naming.is_available(
            slot.naming,
            slot.key,
            slot.method.name,
            candidate,
            reservations,
        )
    })
}

impl MethodRenamer<'_> {
    pub(super) fn assign_names_to_interface_methods(&mut self) -> Result<()> {
        let program = self.program;
        let items = program.items();
        self.reserve_names_in_interfaces()?;
        let reachable = self.reachable_scopes();

        let mut groups: IndexMap<GroupKey, MethodGroup> = IndexMap::new();
        for iface in program.interfaces() {
            for method in iface.methods.iter().filter(|method| !method.is_initializer()) {
                let reference = method.reference;
                groups
                    .entry((reference.name, self.key(reference.proto)))
                    .or_default()
                    .methods
                    .push(reference);
            }
        }

        let mut unification = UnionFind::default();
        for (id, call_site) in program.call_sites() {
            let implemented = program.lambda_implemented_methods(id);
            let mut call_site_groups: Vec<GroupKey> = Vec::new();
            for method in &implemented {
                let key = (method.name, self.key(method.proto));
                if let Some(group) = groups.get_mut(&key) {
                    if !group.call_sites.contains(&id) {
                        group.call_sites.push(id);
                    }
                    if !call_site_groups.contains(&key) {
                        call_site_groups.push(key);
                    }
                }
            }
            if call_site_groups.is_empty() {
                continue;
            }
            for marker in call_site.interfaces.iter().skip(1) {
                let Some(marker) = program.definition_for(*marker) else {
                    continue;
                };
                for method in &implemented {
                    let params = items.proto(method.proto).params;
                    let colliding = marker.virtual_methods().filter(|other| {
                        other.reference.name != method.name
                            && items.proto(other.reference.proto).params == params
                    });
                    let key = (method.name, self.key(method.proto));
                    for other in colliding {
                        if let Some(group) = groups.get_mut(&key) {
                            if !group.colliding.contains(&other.reference) {
                                group.colliding.push(other.reference);
                            }
                        }
                    }
                }
            }
            if let [first, rest @ ..] = call_site_groups.as_slice() {
                unification.make_set(*first);
                for key in rest {
                    unification.union(*first, *key);
                }
            }
        }

        for (representative, members) in unification.sets() {
            for member in members.into_iter().filter(|member| *member != representative) {
                if let Some(merged) = groups.shift_remove(&member) {
                    if let Some(group) = groups.get_mut(&representative) {
                        group.absorb(merged);
                    }
                }
            }
        }

        for group in groups.values_mut() {
            group.methods.sort_by_cached_key(|method| items.method_to_string(*method));
            let mut slots = Vec::new();
            for method in &group.methods {
                let key = self.key(method.proto);
                for ty in reachable.get(&method.holder).into_iter().flatten() {
                    let (Some(reservation), Some(naming)) = (
                        self.reservation_states.get(ty).copied(),
                        self.naming_states.get(ty).copied(),
                    ) else {
                        continue;
                    };
                    let slot = Slot {
                        method: *method,
                        key,
                        reservation,
                        naming,
                    };
                    if !slots.contains(&slot) {
                        slots.push(slot);
                    }
                }
            }
            group.slots = slots;
        }

        // Groups touching more scopes pick first; ties are broken by name and key.
        let mut order: Vec<(Reverse<usize>, String, GroupKey)> = groups
            .iter()
            .map(|(key, group)| {
                let canonical = group
                    .methods
                    .first()
                    .map(|method| {
                        format!(
                            "{}{}",
                            items.str(method.name),
                            items.proto_descriptor(method.proto)
                        )
                    })
                    .unwrap_or_default();
                (Reverse(group.scope_count()), canonical, *key)
            })
            .collect();
        order.sort();

        // Every reservation is in place before the first fresh name is drawn.
        let mut unreserved = Vec::new();
        for (_, _, key) in &order {
            let group = &groups[key];
            match self.group_reserved_name(group)? {
                Some(name) => self.reserve_group_name(group, &name)?,
                None => unreserved.push(*key),
            }
        }
        for key in &unreserved {
            self.assign_group_name(&groups[key])?;
        }
        for key in &unreserved {
            self.rename_colliding_methods(&groups[key])?;
        }

        for group in groups.values() {
            let Some(first) = group.methods.first() else {
                continue;
            };
            let name = self
                .renaming
                .get(first)
                .cloned()
                .unwrap_or_else(|| SmolStr::new(items.str(first.name)));
            for call_site in &group.call_sites {
                self.call_sites.insert(*call_site, name.clone());
            }
        }
        for (id, call_site) in program.call_sites() {
            self.call_sites
                .entry(id)
                .or_insert_with(|| SmolStr::new(items.str(call_site.name)));
        }
        Ok(())
    }

    /// Interfaces are reservation roots of their own.
    fn reserve_names_in_interfaces(&mut self) -> Result<()> {
        let program = self.program;
        let Some(root_naming) = self.root_naming else {
            return Ok(());
        };
        for iface in program.interfaces() {
            let reservation = self.reservations.root();
            self.reservation_states.insert(iface.ty, reservation);
            let naming = self.naming.create_child(root_naming, reservation);
            self.naming_states.insert(iface.ty, naming);
            self.reserve_methods(iface, reservation)?;
        }
        Ok(())
    }

    /// For every interface, the types whose scopes a method declared there must be free in: the
    /// interface, its super- and subinterfaces (transitively), and the frontiers of all classes
    /// implementing any of them.
    fn reachable_scopes(&self) -> HashMap<TypeId, Vec<TypeId>> {
        let program = self.program;
        let mut own: HashMap<TypeId, Vec<TypeId>> = HashMap::new();
        let mut children: HashMap<TypeId, Vec<TypeId>> = HashMap::new();
        for iface in program.interfaces() {
            let mut types = vec![iface.ty];
            for class in program.implementing_classes(iface.ty) {
                let frontier = self.frontier(class);
                if self.reservation_states.contains_key(&frontier) && !types.contains(&frontier) {
                    types.push(frontier);
                }
            }
            own.insert(iface.ty, types);
            for parent in &iface.interfaces {
                if program.is_interface(*parent) {
                    children.entry(*parent).or_default().push(iface.ty);
                }
            }
        }

        let mut reachable = HashMap::new();
        for iface in program.interfaces() {
            let mut visited = vec![iface.ty];
            let mut down = vec![iface.ty];
            while let Some(ty) = down.pop() {
                for child in children.get(&ty).into_iter().flatten() {
                    if !visited.contains(child) {
                        visited.push(*child);
                        down.push(*child);
                    }
                }
            }
            let mut up = vec![iface.ty];
            while let Some(ty) = up.pop() {
                for parent in program.super_interfaces(ty) {
                    if program.is_interface(*parent) && !visited.contains(parent) {
                        visited.push(*parent);
                        up.push(*parent);
                    }
                }
            }
            let mut types: Vec<TypeId> = Vec::new();
            for ty in visited {
                for scope in own.get(&ty).into_iter().flatten() {
                    if !types.contains(scope) {
                        types.push(*scope);
                    }
                }
            }
            reachable.insert(iface.ty, types);
        }
        reachable
    }

    /// The names forced on `method`: the strategy's choice, and its original name when one of
    /// its scopes reserves it.
    fn forced_names(&self, group: &MethodGroup, method: MethodRef) -> Vec<SmolStr> {
        let program = self.program;
        let original = program.items().str(method.name);
        let mut names = Vec::new();
        if let (Some(holder), Some(definition)) = (
            program.definition_for(method.holder),
            program.method_definition(method),
        ) {
            names.extend(self.strategy.reserved_method_name(definition, holder));
        }
        let identity = group
            .slots
            .iter()
            .filter(|slot| slot.method == method)
            .any(|slot| {
                self.reservations
                    .reserved_names_for(slot.reservation, slot.key, method.name)
                    .iter()
                    .any(|name| name == original)
            });
        if identity && !names.iter().any(|name| name == original) {
            names.push(SmolStr::new(original));
        }
        names
    }

    fn owner(&self, method: MethodRef) -> Owner {
        Owner {
            holder: method.holder,
            original: method.name,
            private: self
                .program
                .method_definition(method)
                .is_some_and(|def| def.access_flags.is_private()),
        }
    }

    /// The single name forced on the group, if any. Members forced to different names cannot be
    /// unified.
    fn group_reserved_name(&self, group: &MethodGroup) -> Result<Option<SmolStr>> {
        let mut reserved: Option<(SmolStr, MethodRef)> = None;
        for method in &group.methods {
            for name in self.forced_names(group, *method) {
                if let Some((first, holder)) = &reserved {
                    if *first != name {
                        let items = self.program.items();
                        return Err(MinifyError::ConflictingMemberName {
                            name: name.to_string(),
                            first: self.owner(*holder).display(items),
                            second: self.owner(*method).display(items),
                        });
                    }
                } else {
                    reserved = Some((name, *method));
                }
            }
        }
        Ok(reserved.map(|(name, _)| name))
    }

    fn reserve_group_name(&mut self, group: &MethodGroup, name: &SmolStr) -> Result<()> {
        let program = self.program;
        let items = program.items();
        for method in &group.methods {
            let owner = self.owner(*method);
            for slot in group.slots.iter().filter(|slot| slot.method == *method) {
                let clash = self
                    .reservations
                    .owners(slot.reservation, slot.key, name)
                    .into_iter()
                    .find(|other| {
                        other.original != owner.original && other.coexists_with(&owner, program)
                    });
                if let Some(other) = clash {
                    return Err(MinifyError::ConflictingMemberName {
                        name: name.to_string(),
                        first: other.display(items),
                        second: owner.display(items),
                    });
                }
                self.reservations
                    .reserve_name(slot.reservation, slot.key, name.clone(), owner);
            }
            tracing::trace!(
                target: "nova.minify",
                method = %items.method_to_string(*method),
                reserved = %name,
                "reserved interface method name"
            );
            self.renaming.insert(*method, name.clone());
        }
        Ok(())
    }

    fn assign_group_name(&mut self, group: &MethodGroup) -> Result<()> {
        let Some(first) = group.methods.first().copied() else {
            return Ok(());
        };
        let items = self.program.items();
        let key = self.key(first.proto);
        let Some(naming) = self.naming_states.get(&first.holder).copied() else {
            return Ok(());
        };
        let reservations = &self.reservations;
        let slots = &group.slots;
        let name = self
            .naming
            .new_or_reserved_name_for(
                naming,
                key,
                first.name,
                None,
                CounterKind::Virtual,
                reservations,
                &self.generator,
                |arena, candidate| is_available_in_group(arena, reservations, slots, candidate),
            )
            .ok_or_else(|| MinifyError::NameSpaceExhausted {
                item: items.method_to_string(first),
                attempts: self.generator.max_attempts(),
            })?;
        tracing::trace!(
            target: "nova.minify",
            method = %items.method_to_string(first),
            members = group.methods.len(),
            renamed = %name,
            "renamed interface method group"
        );
        for slot in &group.slots {
            self.naming
                .add_renaming(slot.naming, slot.key, slot.method.name, name.clone());
        }
        for method in &group.methods {
            self.renaming.insert(*method, name.clone());
        }
        Ok(())
    }

    /// Gives intersection-interface methods that would now clash with the group's lambda name a
    /// different name.
    fn rename_colliding_methods(&mut self, group: &MethodGroup) -> Result<()> {
        let Some(first) = group.methods.first().copied() else {
            return Ok(());
        };
        let Some(group_name) = self.renaming.get(&first).cloned() else {
            return Ok(());
        };
        let program = self.program;
        let items = program.items();
        let Some(key_naming) = self.naming_states.get(&first.holder).copied() else {
            return Ok(());
        };
        for colliding in &group.colliding {
            let current = self
                .renaming
                .get(colliding)
                .map_or(items.str(colliding.name), SmolStr::as_str);
            if current != group_name {
                continue;
            }
            let forced = program
                .definition_for(colliding.holder)
                .zip(program.method_definition(*colliding))
                .and_then(|(holder, method)| self.strategy.reserved_method_name(method, holder));
            if forced.is_some() {
                continue;
            }
            let key = self.key(colliding.proto);
            let reservations = &self.reservations;
            let slots = &group.slots;
            let name = self
                .naming
                .next_name(
                    key_naming,
                    key,
                    CounterKind::Virtual,
                    &self.generator,
                    |arena, candidate| {
                        candidate != group_name
                            && is_available_in_group(arena, reservations, slots, candidate)
                    },
                )
                .ok_or_else(|| MinifyError::NameSpaceExhausted {
                    item: items.method_to_string(*colliding),
                    attempts: self.generator.max_attempts(),
                })?;
            tracing::trace!(
                target: "nova.minify",
                method = %items.method_to_string(*colliding),
                renamed = %name,
                "renamed method colliding with a lambda"
            );
            if let Some(naming) = self.naming_states.get(&colliding.holder).copied() {
                self.naming
                    .add_renaming(naming, key, colliding.name, name.clone());
            }
            self.naming
                .add_renaming(key_naming, key, colliding.name, name.clone());
            self.renaming.insert(*colliding, name);
        }
        Ok(())
    }
}
