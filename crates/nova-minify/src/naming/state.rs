use std::collections::HashMap;
use std::hash::Hash;

use smol_str::SmolStr;

use crate::naming::{CounterKind, NameCounter, NameGenerator, ReservationArena, ReservationId};
use crate::program::Symbol;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct NamingId(u32);

impl NamingId {
    fn idx(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Default)]
struct KeyState {
    counter: NameCounter,
    /// original name -> assigned name
    assigned: HashMap<Symbol, SmolStr>,
    /// assigned name -> original names using it
    used_by: HashMap<SmolStr, Vec<Symbol>>,
}

#[derive(Debug)]
struct NamingNode<K> {
    parent: Option<NamingId>,
    reservation: ReservationId,
    keys: HashMap<K, KeyState>,
}

/// Names handed out so far, per scope and key.
///
/// A scope sees the assignments of all its ancestors; assignments made in a scope are invisible
/// to its siblings, which is what lets unrelated classes reuse the same short names.
#[derive(Debug)]
pub(crate) struct NamingArena<K> {
    nodes: Vec<NamingNode<K>>,
}

impl<K: Copy + Eq + Hash> Default for NamingArena<K> {
    fn default() -> Self {
        Self { nodes: Vec::new() }
    }
}

impl<K: Copy + Eq + Hash> NamingArena<K> {
    pub fn root(&mut self, reservation: ReservationId) -> NamingId {
        self.push(None, reservation)
    }

    pub fn create_child(&mut self, parent: NamingId, reservation: ReservationId) -> NamingId {
        self.push(Some(parent), reservation)
    }

    fn push(&mut self, parent: Option<NamingId>, reservation: ReservationId) -> NamingId {
        self.nodes.push(NamingNode {
            parent,
            reservation,
            keys: HashMap::new(),
        });
        NamingId((self.nodes.len() - 1) as u32)
    }

    pub fn reservation(&self, node: NamingId) -> ReservationId {
        self.nodes[node.idx()].reservation
    }

    fn chain(&self, node: NamingId) -> impl Iterator<Item = &NamingNode<K>> {
        std::iter::successors(Some(node), move |id| self.nodes[id.idx()].parent)
            .map(move |id| &self.nodes[id.idx()])
    }

    pub fn assigned_name(&self, node: NamingId, key: K, original: Symbol) -> Option<SmolStr> {
        self.chain(node)
            .find_map(|scope| scope.keys.get(&key)?.assigned.get(&original).cloned())
    }

    fn is_used_by(&self, node: NamingId, key: K, name: &str, original: Symbol) -> (bool, bool) {
        let mut used = false;
        for scope in self.chain(node) {
            if let Some(users) = scope.keys.get(&key).and_then(|state| state.used_by.get(name)) {
                if users.contains(&original) {
                    return (true, true);
                }
                used |= !users.is_empty();
            }
        }
        (used, false)
    }

    /// Whether `candidate` can be given to a member originally called `original`.
    ///
    /// A name is available when the same original already uses it, when nobody uses or
    /// reserves it, or when it is one of the names reserved for `original` itself.
    pub fn is_available(
        &self,
        node: NamingId,
        key: K,
        original: Symbol,
        candidate: &str,
        reservations: &ReservationArena<K>,
    ) -> bool {
        let (used, used_by_original) = self.is_used_by(node, key, candidate, original);
        if used_by_original {
            return true;
        }
        let reservation = self.reservation(node);
        if !used && !reservations.is_reserved(reservation, key, candidate) {
            return true;
        }
        reservations
            .reserved_names_for(reservation, key, original)
            .iter()
            .any(|name| name == candidate)
    }

    pub fn add_renaming(&mut self, node: NamingId, key: K, original: Symbol, name: SmolStr) {
        let state = self.key_state_mut(node, key);
        let users = state.used_by.entry(name.clone()).or_default();
        if !users.contains(&original) {
            users.push(original);
        }
        state.assigned.insert(original, name);
    }

    /// The name for a member: a name already assigned in scope, its single reserved name, the
    /// strategy's choice, or a fresh one, whichever is first acceptable.
    #[allow(clippy::too_many_arguments)]
    pub fn new_or_reserved_name_for(
        &mut self,
        node: NamingId,
        key: K,
        original: Symbol,
        strategy_reserved: Option<SmolStr>,
        kind: CounterKind,
        reservations: &ReservationArena<K>,
        generator: &NameGenerator,
        mut is_available: impl FnMut(&Self, &str) -> bool,
    ) -> Option<SmolStr> {
        if let Some(assigned) = self.assigned_name(node, key, original) {
            return Some(assigned);
        }
        if let [single] = reservations
            .reserved_names_for(self.reservation(node), key, original)
            .as_slice()
        {
            if is_available(self, single) {
                return Some(single.clone());
            }
        }
        if let Some(reserved) = strategy_reserved {
            if is_available(self, &reserved) {
                return Some(reserved);
            }
        }
        self.next_name(node, key, kind, generator, is_available)
    }

    pub fn next_name(
        &mut self,
        node: NamingId,
        key: K,
        kind: CounterKind,
        generator: &NameGenerator,
        mut is_available: impl FnMut(&Self, &str) -> bool,
    ) -> Option<SmolStr> {
        let mut counter = self.key_state_mut(node, key).counter;
        let name = generator.next_name(&mut counter, kind, |candidate| {
            is_available(self, candidate)
        });
        self.key_state_mut(node, key).counter = counter;
        name
    }

    fn key_state_mut(&mut self, node: NamingId, key: K) -> &mut KeyState {
        if !self.nodes[node.idx()].keys.contains_key(&key) {
            let counter = match self.nodes[node.idx()].parent {
                Some(parent) => NameCounter::inherit(&self.key_state_mut(parent, key).counter),
                None => NameCounter::default(),
            };
            self.nodes[node.idx()].keys.insert(
                key,
                KeyState {
                    counter,
                    ..KeyState::default()
                },
            );
        }
        self.nodes[node.idx()].keys.entry(key).or_default()
    }
}
