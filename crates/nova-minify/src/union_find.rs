use std::hash::Hash;

use indexmap::IndexMap;

/// Disjoint sets over arbitrary keys.
///
/// The representative of a set is always its earliest inserted element, so results only depend
/// on insertion order.
#[derive(Debug)]
pub(crate) struct UnionFind<T> {
    index: IndexMap<T, usize>,
    parent: Vec<usize>,
}

impl<T: Copy + Eq + Hash> Default for UnionFind<T> {
    fn default() -> Self {
        Self {
            index: IndexMap::new(),
            parent: Vec::new(),
        }
    }
}

impl<T: Copy + Eq + Hash> UnionFind<T> {
    pub fn make_set(&mut self, element: T) -> usize {
        let next = self.parent.len();
        let idx = *self.index.entry(element).or_insert(next);
        if idx == next {
            self.parent.push(next);
        }
        idx
    }

    fn find_idx(&mut self, idx: usize) -> usize {
        let mut root = idx;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        let mut current = idx;
        while self.parent[current] != root {
            let next = self.parent[current];
            self.parent[current] = root;
            current = next;
        }
        root
    }

    pub fn union(&mut self, a: T, b: T) -> T {
        let a = self.make_set(a);
        let b = self.make_set(b);
        let (a, b) = (self.find_idx(a), self.find_idx(b));
        let (root, child) = if a <= b { (a, b) } else { (b, a) };
        self.parent[child] = root;
        self.element(root)
    }

    fn element(&self, idx: usize) -> T {
        *self
            .index
            .get_index(idx)
            .map(|(element, _)| element)
            .unwrap_or_else(|| unreachable!("union-find index {idx} out of bounds"))
    }

    /// Every set as `(representative, members)`, ordered by first insertion.
    pub fn sets(&mut self) -> IndexMap<T, Vec<T>> {
        let mut sets: IndexMap<T, Vec<T>> = IndexMap::new();
        for idx in 0..self.parent.len() {
            let root = self.find_idx(idx);
            let representative = self.element(root);
            let member = self.element(idx);
            sets.entry(representative).or_default().push(member);
        }
        sets
    }
}
