//! Directed graphs over arbitrary hashable vertices.
//!
//! Every vertex is interned into a dense `u32` slot and the out-neighbours of
//! a slot are kept in a [`RoaringBitmap`].  That keeps membership tests and
//! edge insertions cheap while still letting callers use whatever vertex type
//! they like (strings, integers, ...).
//!
//! Enumeration order of vertices and of the children of a vertex is an
//! implementation detail.  Currently it follows slot order, and slots of
//! removed vertices get recycled.
//!
//! # Entry points
//!
//! See [`Digraph::new`] or [`Digraph::from_edges_iter`].  Traversals live in
//! [`crate::dfs`] and [`crate::tarjan`].

use std::collections::{HashMap, HashSet};
use std::fmt::{Debug, Display};
use std::hash::Hash;
use std::io::Write;
use std::ops::Range;

use proptest::prelude::*;
use proptest::strategy::{NewTree, ValueTree};
use proptest::test_runner::{Reason, TestRunner};
use rand::distributions::Uniform;
use rand::prelude::Distribution;
use roaring::RoaringBitmap;

use crate::dfs::DepthFirstSearch;

/// A mutable, single-threaded directed graph.
///
/// Self-loops are allowed, parallel edges are not.
#[derive(Clone)]
pub struct Digraph<V> {
    slots: HashMap<V, u32>,
    labels: Vec<Option<V>>,
    children: Vec<RoaringBitmap>,
    vacant: Vec<u32>,
}

impl<V: Clone + Eq + Hash> Default for Digraph<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone + Eq + Hash + Debug> Debug for Digraph<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let vertices: Vec<&V> = self.iter_vertices().collect();
        let edges: Vec<(&V, &V)> = self.iter_edges().collect();
        write!(
            f,
            "Digraph::from_edges_iter(vec!{:?}, vec!{:?})",
            vertices, edges
        )
    }
}

/// Two digraphs are equal when they have the same vertex and edge sets,
/// regardless of how their slots are laid out.
impl<V: Clone + Eq + Hash> PartialEq for Digraph<V> {
    fn eq(&self, other: &Self) -> bool {
        self.get_vertex_count() == other.get_vertex_count()
            && self.get_edge_count() == other.get_edge_count()
            && self.iter_vertices().all(|v| other.contains_vertex(v))
            && self.iter_edges().all(|(v, w)| other.get_edge(v, w))
    }
}

impl<V: Clone + Eq + Hash> Eq for Digraph<V> {}

impl<V: Clone + Eq + Hash> Digraph<V> {
    /// Constructs a digraph without any vertices.
    pub fn new() -> Self {
        Self {
            slots: HashMap::new(),
            labels: Vec::new(),
            children: Vec::new(),
            vacant: Vec::new(),
        }
    }

    /// Constructs a digraph from its vertices and edges.
    ///
    /// Requires both endpoints of every edge to be among `vertices`.  Panics
    /// otherwise.  Repeated vertices and edges are collapsed.
    pub fn from_edges_iter<I, E>(vertices: I, edges: E) -> Self
    where
        I: IntoIterator<Item = V>,
        E: IntoIterator<Item = (V, V)>,
    {
        let mut digraph = Self::new();
        for v in vertices {
            digraph.add_vertex(v);
        }
        for (v, w) in edges {
            assert!(
                digraph.contains_vertex(&v) && digraph.contains_vertex(&w),
                "edge endpoints must be vertices of the digraph"
            );
            digraph.add_edge(&v, &w);
        }
        digraph
    }

    #[inline]
    pub fn get_vertex_count(&self) -> usize {
        self.slots.len()
    }

    /// Sums the out-degrees of all vertices.
    pub fn get_edge_count(&self) -> usize {
        self.children
            .iter()
            .map(|children| children.len() as usize)
            .sum()
    }

    #[inline]
    pub fn contains_vertex(&self, v: &V) -> bool {
        self.slots.contains_key(v)
    }

    /// Returns `false` if either endpoint is not a vertex.
    pub fn get_edge(&self, v: &V, w: &V) -> bool {
        match (self.slots.get(v), self.slots.get(w)) {
            (Some(from), Some(to)) => self.children[*from as usize].contains(*to),
            _ => false,
        }
    }

    pub fn iter_vertices(&self) -> impl Iterator<Item = &V> + '_ {
        self.labels.iter().flatten()
    }

    /// A snapshot of the vertex set.
    pub fn get_vertices(&self) -> HashSet<V> {
        self.iter_vertices().cloned().collect()
    }

    /// Iterates over vertices `w` such that there's an edge `(v, w)`.
    ///
    /// Requires `v` to be a vertex.  Panics otherwise.
    pub fn iter_children(&self, v: &V) -> impl Iterator<Item = &V> + '_ {
        let slot = self.expect_slot(v);
        self.iter_child_slots(slot)
            .filter_map(move |child| self.label(child))
    }

    /// A snapshot of the out-neighbours of `v`.  Panics if `v` is not a vertex.
    pub fn get_children(&self, v: &V) -> HashSet<V> {
        self.iter_children(v).cloned().collect()
    }

    /// Panics if `v` is not a vertex.
    pub fn get_outdegree(&self, v: &V) -> usize {
        let slot = self.expect_slot(v);
        self.children[slot as usize].len() as usize
    }

    /// Scans the adjacency sets of all vertices.  Panics if `v` is not a vertex.
    pub fn get_indegree(&self, v: &V) -> usize {
        let slot = self.expect_slot(v);
        self.children
            .iter()
            .filter(|children| children.contains(slot))
            .count()
    }

    /// Each emitted pair `(v, w)` is an edge from `v` to `w`.
    pub fn iter_edges(&self) -> impl Iterator<Item = (&V, &V)> + '_ {
        self.labels
            .iter()
            .zip(&self.children)
            .filter_map(|(label, children)| label.as_ref().map(|v| (v, children)))
            .flat_map(move |(v, children)| {
                children
                    .iter()
                    .filter_map(move |child| self.label(child))
                    .map(move |w| (v, w))
            })
    }

    /// Returns `true` if `v` was not a vertex yet.
    pub fn add_vertex(&mut self, v: V) -> bool {
        if self.slots.contains_key(&v) {
            return false;
        }
        let slot = match self.vacant.pop() {
            Some(slot) => {
                self.labels[slot as usize] = Some(v.clone());
                slot
            }
            None => {
                assert!(self.labels.len() < u32::MAX as usize, "too many vertices");
                let slot = self.labels.len() as u32;
                self.labels.push(Some(v.clone()));
                self.children.push(RoaringBitmap::new());
                slot
            }
        };
        self.slots.insert(v, slot);
        true
    }

    /// Returns `true` only if both `v` and `w` are vertices and the edge did
    /// not exist yet.  Leaves the digraph untouched otherwise.
    pub fn add_edge(&mut self, v: &V, w: &V) -> bool {
        let (Some(from), Some(to)) = (self.slots.get(v), self.slots.get(w)) else {
            return false;
        };
        self.children[*from as usize].insert(*to)
    }

    /// Removes `v` together with every edge into or out of it.
    ///
    /// Requires `v` to be a vertex.  Panics otherwise.
    pub fn remove_vertex(&mut self, v: &V) {
        let slot = match self.slots.remove(v) {
            Some(slot) => slot,
            None => panic!("vertex must be in the digraph"),
        };
        self.labels[slot as usize] = None;
        self.children[slot as usize].clear();
        for children in &mut self.children {
            children.remove(slot);
        }
        self.vacant.push(slot);
    }

    /// Requires the edge `(v, w)` to exist.  Panics otherwise.
    pub fn remove_edge(&mut self, v: &V, w: &V) {
        assert!(self.get_edge(v, w), "edge must be in the digraph");
        let from = self.expect_slot(v);
        let to = self.expect_slot(w);
        self.children[from as usize].remove(to);
    }

    /// Returns a new digraph with the same vertices and every edge flipped.
    pub fn reverse(&self) -> Self {
        let mut children = vec![RoaringBitmap::new(); self.children.len()];
        for (from, out) in self.children.iter().enumerate() {
            for to in out {
                children[to as usize].insert(from as u32);
            }
        }
        Self {
            slots: self.slots.clone(),
            labels: self.labels.clone(),
            children,
            vacant: self.vacant.clone(),
        }
    }

    /// Returns `true` if there is no cycle, i.e. a depth-first search finds
    /// no back edges.
    pub fn is_dag(&self) -> bool {
        DepthFirstSearch::new(self).back().get_edge_count() == 0
    }

    /// Returns the vertices in an order where every edge points forward, or
    /// `None` if the digraph has a cycle.
    pub fn get_topologically_ordered_vertices(&self) -> Option<Vec<V>> {
        let dfs = DepthFirstSearch::new(self);
        if dfs.back().get_edge_count() > 0 {
            return None;
        }
        Some(dfs.topological_order().to_vec())
    }

    /// Computes the strongly connected components using Kosaraju's
    /// algorithm.
    ///
    /// The first pass collects a finishing order over the reversed digraph.
    /// The second pass prefers starting its depth-first trees in that order,
    /// so every tree covers exactly one component.  Components are numbered
    /// in the order their trees get launched.
    pub fn kosaraju_components(&self) -> HashMap<V, usize> {
        let reversed = self.reverse();
        let finishing = DepthFirstSearch::new(&reversed);
        let assignment =
            DepthFirstSearch::with_preferred_starts(self, finishing.topological_order());
        log::debug!(
            "kosaraju: {} vertices in {} strongly connected components",
            self.get_vertex_count(),
            assignment.component_count()
        );
        assignment.into_components()
    }

    /// Visit all vertices reachable from `start` in a depth-first-search
    /// (DFS) order.  `start` itself is never emitted.
    ///
    /// Requires `start` to be a vertex.  Panics otherwise.
    pub fn iter_descendants_dfs(&self, start: &V) -> DfsDescendantsIterator<'_, V> {
        let start = self.expect_slot(start);
        DfsDescendantsIterator {
            digraph: self,
            start,
            visited: RoaringBitmap::new(),
            to_visit: vec![start],
        }
    }

    /// Outputs the digraph in the [Graphviz DOT](https://graphviz.org/) format.
    pub fn to_dot<W: Write>(&self, output: &mut W) -> std::result::Result<(), std::io::Error>
    where
        V: Display,
    {
        writeln!(output, "digraph digraph_{} {{", self.get_vertex_count())?;

        for slot in self.iter_slots() {
            if let Some(v) = self.label(slot) {
                writeln!(output, "\t_{}[label=\"{}\"];", slot, v)?;
            }
        }

        writeln!(output, "\n")?;

        for from in self.iter_slots() {
            for to in self.iter_child_slots(from) {
                writeln!(output, "\t_{} -> _{};", from, to)?;
            }
        }

        writeln!(output, "}}")?;
        Ok(())
    }

    pub fn to_dot_file<P: AsRef<std::path::Path>>(
        &self,
        path: P,
    ) -> std::result::Result<(), std::io::Error>
    where
        V: Display,
    {
        let mut file = std::fs::File::create(path)?;
        self.to_dot(&mut file)?;
        Ok(())
    }

    fn expect_slot(&self, v: &V) -> u32 {
        match self.slots.get(v) {
            Some(slot) => *slot,
            None => panic!("vertex must be in the digraph"),
        }
    }

    pub(crate) fn get_slot(&self, v: &V) -> Option<u32> {
        self.slots.get(v).copied()
    }

    /// Upper bound (exclusive) on slot numbers, including vacant ones.
    pub(crate) fn get_slot_capacity(&self) -> usize {
        self.labels.len()
    }

    pub(crate) fn label(&self, slot: u32) -> Option<&V> {
        self.labels.get(slot as usize).and_then(Option::as_ref)
    }

    /// Occupied slots in ascending order.
    pub(crate) fn iter_slots(&self) -> impl Iterator<Item = u32> + '_ {
        self.labels
            .iter()
            .enumerate()
            .filter(|(_, label)| label.is_some())
            .map(|(slot, _)| slot as u32)
    }

    pub(crate) fn iter_child_slots(&self, slot: u32) -> impl Iterator<Item = u32> + '_ {
        self.children[slot as usize].iter()
    }

    /// Same vertices laid out in the same slots, but no edges.
    pub(crate) fn without_edges(&self) -> Self {
        Self {
            slots: self.slots.clone(),
            labels: self.labels.clone(),
            children: vec![RoaringBitmap::new(); self.children.len()],
            vacant: self.vacant.clone(),
        }
    }

    /// Requires both slots to be occupied.
    pub(crate) fn insert_edge_slots(&mut self, from: u32, to: u32) -> bool {
        debug_assert!(self.label(from).is_some() && self.label(to).is_some());
        self.children[from as usize].insert(to)
    }
}

/// See [`Digraph::iter_descendants_dfs`].
pub struct DfsDescendantsIterator<'a, V> {
    digraph: &'a Digraph<V>,
    start: u32,
    visited: RoaringBitmap,
    to_visit: Vec<u32>,
}

impl<'a, V: Clone + Eq + Hash> Iterator for DfsDescendantsIterator<'a, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(u) = self.to_visit.pop() {
            if !self.visited.insert(u) {
                continue;
            }
            self.to_visit.extend(
                self.digraph
                    .iter_child_slots(u)
                    .filter(|w| !self.visited.contains(*w)),
            );
            if u == self.start {
                continue;
            }
            return self.digraph.label(u);
        }
        None
    }
}

/// Generates digraphs over the vertices `0..n`, with `n` drawn from
/// `vertex_count`.  Self-loops are generated too.  Shrinking drops edges one
/// at a time.
pub fn arb_digraph(vertex_count: impl Into<Range<u16>>) -> DigraphStrategy {
    DigraphStrategy {
        vertex_count: vertex_count.into(),
    }
}

#[derive(Debug)]
pub struct DigraphStrategy {
    vertex_count: Range<u16>,
}

#[derive(Debug)]
pub struct DigraphValueTree {
    vertex_count: u16,
    edges: RoaringBitmap,
    next_candidate: u32,
    last_removed: Option<u32>,
}

// Edges of an n-vertex digraph are packed row-major into an n * n bitmap.
#[inline]
fn edge_from_index(index: u32, vertex_count: u16) -> (u16, u16) {
    let n = u32::from(vertex_count);
    ((index / n) as u16, (index % n) as u16)
}

impl Strategy for DigraphStrategy {
    type Tree = DigraphValueTree;

    type Value = Digraph<u16>;

    fn new_tree(&self, runner: &mut TestRunner) -> NewTree<Self> {
        if self.vertex_count.is_empty() {
            panic!(
                "Invalid use of empty size range. (hint: did you \
                 accidentally write {}..{} where you meant {}..={} \
                 somewhere?)",
                self.vertex_count.start,
                self.vertex_count.end,
                self.vertex_count.start,
                self.vertex_count.end
            );
        }
        let vertex_count =
            Uniform::new(self.vertex_count.start, self.vertex_count.end).sample(runner.rng());
        // Dense random digraphs collapse into a single component, so the
        // density is drawn per graph and kept low.
        let density = Uniform::new_inclusive(0.0, 0.4).sample(runner.rng());
        let capacity = u32::from(vertex_count) * u32::from(vertex_count);
        let iter = (0..capacity).filter(|_| runner.rng().gen_bool(density));
        let edges =
            RoaringBitmap::from_sorted_iter(iter).map_err(|e| Reason::from(e.to_string()))?;

        Ok(DigraphValueTree {
            vertex_count,
            edges,
            next_candidate: 0,
            last_removed: None,
        })
    }
}

impl ValueTree for DigraphValueTree {
    type Value = Digraph<u16>;

    fn current(&self) -> Self::Value {
        Digraph::from_edges_iter(
            0..self.vertex_count,
            self.edges
                .iter()
                .map(|index| edge_from_index(index, self.vertex_count)),
        )
    }

    fn simplify(&mut self) -> bool {
        let candidate = self
            .edges
            .iter()
            .find(|index| *index >= self.next_candidate);
        match candidate {
            Some(index) => {
                self.edges.remove(index);
                self.last_removed = Some(index);
                self.next_candidate = index + 1;
                true
            }
            None => {
                self.last_removed = None;
                false
            }
        }
    }

    fn complicate(&mut self) -> bool {
        match self.last_removed.take() {
            Some(index) => {
                self.edges.insert(index);
                true
            }
            None => false,
        }
    }
}
