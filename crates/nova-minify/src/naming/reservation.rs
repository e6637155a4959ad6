use std::collections::HashMap;
use std::hash::Hash;

use indexmap::{IndexMap, IndexSet};
use smol_str::SmolStr;

use crate::naming::Owner;
use crate::program::Symbol;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct ReservationId(u32);

impl ReservationId {
    fn idx(self) -> usize {
        self.0 as usize
    }
}

#[derive(Clone, Debug, Default)]
struct KeyReservations {
    by_name: IndexMap<SmolStr, Vec<Owner>>,
    by_original: IndexMap<Symbol, IndexSet<SmolStr>>,
}

impl KeyReservations {
    fn insert(&mut self, name: SmolStr, owner: Owner) {
        let owners = self.by_name.entry(name.clone()).or_default();
        if !owners.contains(&owner) {
            owners.push(owner);
        }
        self.by_original.entry(owner.original).or_default().insert(name);
    }

    fn extend_from(&mut self, other: &KeyReservations) {
        for (name, owners) in &other.by_name {
            for owner in owners {
                self.insert(name.clone(), *owner);
            }
        }
    }
}

#[derive(Debug)]
struct ReservationNode<K> {
    parent: Option<ReservationId>,
    direct: HashMap<K, KeyReservations>,
    below: HashMap<K, KeyReservations>,
}

/// Names that must not be handed out, organized as a forest of scopes.
///
/// A node sees its own reservations (`direct` plus those pulled up from subtypes into `below`)
/// and the direct reservations of its ancestors.
#[derive(Debug)]
pub(crate) struct ReservationArena<K> {
    nodes: Vec<ReservationNode<K>>,
}

impl<K: Copy + Eq + Hash> Default for ReservationArena<K> {
    fn default() -> Self {
        Self { nodes: Vec::new() }
    }
}

impl<K: Copy + Eq + Hash> ReservationArena<K> {
    pub fn root(&mut self) -> ReservationId {
        self.push(None)
    }

    pub fn create_child(&mut self, parent: ReservationId) -> ReservationId {
        self.push(Some(parent))
    }

    fn push(&mut self, parent: Option<ReservationId>) -> ReservationId {
        self.nodes.push(ReservationNode {
            parent,
            direct: HashMap::new(),
            below: HashMap::new(),
        });
        ReservationId((self.nodes.len() - 1) as u32)
    }

    pub fn reserve_name(&mut self, node: ReservationId, key: K, name: SmolStr, owner: Owner) {
        self.nodes[node.idx()]
            .direct
            .entry(key)
            .or_default()
            .insert(name, owner);
    }

    /// Every reservation table visible from `node` for `key`.
    fn visible(&self, node: ReservationId, key: K) -> impl Iterator<Item = &KeyReservations> {
        let own = &self.nodes[node.idx()];
        let ancestors = std::iter::successors(own.parent, move |id| self.nodes[id.idx()].parent)
            .filter_map(move |id| self.nodes[id.idx()].direct.get(&key));
        own.direct
            .get(&key)
            .into_iter()
            .chain(own.below.get(&key))
            .chain(ancestors)
    }

    pub fn is_reserved(&self, node: ReservationId, key: K, name: &str) -> bool {
        self.visible(node, key)
            .any(|reservations| reservations.by_name.contains_key(name))
    }

    /// Every member that reserved `name` for `key` in scope of `node`.
    pub fn owners(&self, node: ReservationId, key: K, name: &str) -> Vec<Owner> {
        let mut owners = Vec::new();
        for reservations in self.visible(node, key) {
            for owner in reservations.by_name.get(name).into_iter().flatten() {
                if !owners.contains(owner) {
                    owners.push(*owner);
                }
            }
        }
        owners
    }

    /// The names reserved for members originally called `original`.
    pub fn reserved_names_for(&self, node: ReservationId, key: K, original: Symbol) -> Vec<SmolStr> {
        let mut names = Vec::new();
        for reservations in self.visible(node, key) {
            for name in reservations.by_original.get(&original).into_iter().flatten() {
                if !names.contains(name) {
                    names.push(name.clone());
                }
            }
        }
        names
    }

    /// Copies the direct reservations of `source` into the direct reservations of `target`.
    pub fn include_reservations(&mut self, target: ReservationId, source: ReservationId) {
        if target == source {
            return;
        }
        let copied = self.nodes[source.idx()].direct.clone();
        let target = &mut self.nodes[target.idx()].direct;
        for (key, reservations) in copied {
            target.entry(key).or_default().extend_from(&reservations);
        }
    }

    /// Makes everything `source` holds (direct and below) visible in `target` as reservations
    /// made below it.
    pub fn include_reservations_from_below(&mut self, target: ReservationId, source: ReservationId) {
        if target == source {
            return;
        }
        let node = &self.nodes[source.idx()];
        let mut copied: Vec<(K, KeyReservations)> = node
            .direct
            .iter()
            .map(|(key, reservations)| (*key, reservations.clone()))
            .collect();
        copied.extend(
            node.below
                .iter()
                .map(|(key, reservations)| (*key, reservations.clone())),
        );
        let target = &mut self.nodes[target.idx()].below;
        for (key, reservations) in copied {
            target.entry(key).or_default().extend_from(&reservations);
        }
    }
}
