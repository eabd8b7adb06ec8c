//! Depth-first search over a [`Digraph`] that records everything a single
//! traversal can tell: discovery and finish times, the depth-first forest,
//! the kind of every edge, a topological order and one component id per
//! depth-first tree.
//!
//! The walk uses an explicit stack, so arbitrarily long paths don't blow the
//! call stack.  Finish times are stamped exactly when a vertex runs out of
//! children, which is where a recursive implementation would return.

use std::collections::HashMap;
use std::hash::Hash;

use roaring::RoaringBitmap;

use crate::Digraph;

/// Classification of an edge relative to a depth-first forest.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum EdgeKind {
    /// An edge of the depth-first forest.
    Tree = 0,
    /// Points to an ancestor, self-loops included.
    Back = 1,
    /// Points to a descendant that is not a child.
    Forward = 2,
    /// Neither of the above.
    Cross = 3,
}

/// The outcome of a depth-first search.  Everything is computed up front by
/// the constructors; the digraph can be mutated afterwards without affecting
/// this value.
#[derive(Clone)]
pub struct DepthFirstSearch<V> {
    pre: HashMap<V, usize>,
    post: HashMap<V, usize>,
    parent: HashMap<V, V>,
    component: HashMap<V, usize>,
    component_count: usize,
    topological_order: Vec<V>,
    back: Digraph<V>,
    forward: Digraph<V>,
    cross: Digraph<V>,
}

impl<V: Clone + Eq + Hash> DepthFirstSearch<V> {
    /// Launches a depth-first tree from every unvisited vertex, in vertex
    /// enumeration order.
    pub fn new(digraph: &Digraph<V>) -> Self {
        Self::with_preferred_starts(digraph, std::iter::empty())
    }

    /// Like [`Self::new`], but the first tree is rooted at `start` if it is a
    /// vertex.
    pub fn from_start(digraph: &Digraph<V>, start: &V) -> Self {
        Self::with_preferred_starts(digraph, std::iter::once(start))
    }

    /// Launches depth-first trees from `starts` in the given order, skipping
    /// anything that isn't a vertex or has been visited already.  Vertices
    /// not reached that way are picked up in vertex enumeration order.
    pub fn with_preferred_starts<'s, I>(digraph: &Digraph<V>, starts: I) -> Self
    where
        I: IntoIterator<Item = &'s V>,
        V: 's,
    {
        let mut traversal = Traversal::new(digraph);
        for start in starts {
            match digraph.get_slot(start) {
                Some(slot) => traversal.launch(slot),
                None => {
                    cov_mark::hit!(preferred_start_not_a_vertex);
                }
            }
        }
        for slot in digraph.iter_slots() {
            traversal.launch(slot);
        }
        log::debug!(
            "depth-first search visited {} vertices in {} trees",
            digraph.get_vertex_count(),
            traversal.component_count
        );
        traversal.into_result()
    }

    /// Discovery time of every vertex.
    pub fn pre_times(&self) -> &HashMap<V, usize> {
        &self.pre
    }

    /// Finish time of every vertex.
    pub fn post_times(&self) -> &HashMap<V, usize> {
        &self.post
    }

    /// The depth-first forest as a child -> parent map.  Roots have no entry.
    pub fn parents(&self) -> &HashMap<V, V> {
        &self.parent
    }

    /// Id of the depth-first tree containing each vertex, numbered in launch
    /// order.
    pub fn components(&self) -> &HashMap<V, usize> {
        &self.component
    }

    pub fn into_components(self) -> HashMap<V, usize> {
        self.component
    }

    /// Number of depth-first trees.
    pub fn component_count(&self) -> usize {
        self.component_count
    }

    /// Vertices in decreasing finish time.  This is a topological order only
    /// if [`Self::back`] has no edges.
    pub fn topological_order(&self) -> &[V] {
        &self.topological_order
    }

    pub fn back(&self) -> &Digraph<V> {
        &self.back
    }

    pub fn forward(&self) -> &Digraph<V> {
        &self.forward
    }

    pub fn cross(&self) -> &Digraph<V> {
        &self.cross
    }

    /// Classifies the edge `(v, w)`.
    ///
    /// Requires both `v` and `w` to have been visited.  Panics otherwise.
    pub fn edge_kind(&self, v: &V, w: &V) -> EdgeKind {
        let (Some(pre_v), Some(pre_w)) = (self.pre.get(v), self.pre.get(w)) else {
            panic!("both endpoints must have been visited");
        };
        classify(
            self.parent.get(w) == Some(v),
            v == w,
            (*pre_v, *pre_w),
            (self.post[v], self.post[w]),
        )
    }
}

// Checked in this order: tree, self-loop, forward (pre), back (post), cross.
fn classify(
    is_tree_edge: bool,
    is_self_loop: bool,
    pre: (usize, usize),
    post: (usize, usize),
) -> EdgeKind {
    if is_tree_edge {
        return EdgeKind::Tree;
    }
    if is_self_loop {
        cov_mark::hit!(self_loop_is_back_edge);
        return EdgeKind::Back;
    }
    if pre.0 < pre.1 {
        return EdgeKind::Forward;
    }
    if post.0 < post.1 {
        return EdgeKind::Back;
    }
    EdgeKind::Cross
}

/// Mutable state of one traversal, indexed by digraph slot.
struct Traversal<'a, V> {
    digraph: &'a Digraph<V>,
    visited: RoaringBitmap,
    pre: Vec<usize>,
    post: Vec<usize>,
    parent: Vec<Option<u32>>,
    component: Vec<usize>,
    finished: Vec<u32>,
    clock: usize,
    component_count: usize,
}

impl<'a, V: Clone + Eq + Hash> Traversal<'a, V> {
    fn new(digraph: &'a Digraph<V>) -> Self {
        let capacity = digraph.get_slot_capacity();
        Self {
            digraph,
            visited: RoaringBitmap::new(),
            pre: vec![0; capacity],
            post: vec![0; capacity],
            parent: vec![None; capacity],
            component: vec![0; capacity],
            finished: Vec::with_capacity(digraph.get_vertex_count()),
            clock: 0,
            component_count: 0,
        }
    }

    /// Grows a new depth-first tree from `root` unless it was visited already.
    fn launch(&mut self, root: u32) {
        if self.visited.contains(root) {
            return;
        }
        self.walk(root);
        self.component_count += 1;
    }

    fn walk(&mut self, root: u32) {
        let digraph = self.digraph;
        self.discover(root);
        let mut stack = vec![(root, digraph.iter_child_slots(root))];
        while let Some((u, children)) = stack.last_mut() {
            let u = *u;
            match children.find(|w| !self.visited.contains(*w)) {
                Some(w) => {
                    self.parent[w as usize] = Some(u);
                    self.discover(w);
                    stack.push((w, digraph.iter_child_slots(w)));
                }
                None => {
                    stack.pop();
                    self.finish(u);
                }
            }
        }
    }

    fn discover(&mut self, u: u32) {
        self.visited.insert(u);
        self.pre[u as usize] = self.clock;
        self.component[u as usize] = self.component_count;
        self.clock += 1;
    }

    fn finish(&mut self, u: u32) {
        self.post[u as usize] = self.clock;
        self.clock += 1;
        self.finished.push(u);
    }

    fn classify(&self, from: u32, to: u32) -> EdgeKind {
        let (v, w) = (from as usize, to as usize);
        classify(
            self.parent[w] == Some(from),
            from == to,
            (self.pre[v], self.pre[w]),
            (self.post[v], self.post[w]),
        )
    }

    fn into_result(self) -> DepthFirstSearch<V> {
        let digraph = self.digraph;
        let vertex_count = digraph.get_vertex_count();

        let mut pre = HashMap::with_capacity(vertex_count);
        let mut post = HashMap::with_capacity(vertex_count);
        let mut parent = HashMap::with_capacity(vertex_count);
        let mut component = HashMap::with_capacity(vertex_count);
        let mut back = digraph.without_edges();
        let mut forward = digraph.without_edges();
        let mut cross = digraph.without_edges();

        for from in digraph.iter_slots() {
            let Some(v) = digraph.label(from) else {
                continue;
            };
            let index = from as usize;
            pre.insert(v.clone(), self.pre[index]);
            post.insert(v.clone(), self.post[index]);
            component.insert(v.clone(), self.component[index]);
            if let Some(p) = self.parent[index].and_then(|p| digraph.label(p)) {
                parent.insert(v.clone(), p.clone());
            }

            for to in digraph.iter_child_slots(from) {
                match self.classify(from, to) {
                    EdgeKind::Tree => {}
                    EdgeKind::Back => {
                        back.insert_edge_slots(from, to);
                    }
                    EdgeKind::Forward => {
                        forward.insert_edge_slots(from, to);
                    }
                    EdgeKind::Cross => {
                        cross.insert_edge_slots(from, to);
                    }
                }
            }
        }

        let topological_order = self
            .finished
            .iter()
            .rev()
            .filter_map(|slot| digraph.label(*slot))
            .cloned()
            .collect();

        DepthFirstSearch {
            pre,
            post,
            parent,
            component,
            component_count: self.component_count,
            topological_order,
            back,
            forward,
            cross,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use proptest::prelude::*;

    use super::*;
    use crate::arb_digraph;

    fn cycle_with_tail() -> Digraph<&'static str> {
        Digraph::from_edges_iter(
            vec!["a", "b", "c", "d"],
            vec![("a", "b"), ("b", "c"), ("c", "a"), ("c", "d")],
        )
    }

    fn edges<V: Clone + Eq + Hash>(digraph: &Digraph<V>) -> HashSet<(V, V)> {
        digraph
            .iter_edges()
            .map(|(v, w)| (v.clone(), w.clone()))
            .collect()
    }

    #[test]
    fn empty_digraph() {
        let digraph: Digraph<u8> = Digraph::new();
        let dfs = DepthFirstSearch::new(&digraph);
        assert!(dfs.pre_times().is_empty());
        assert!(dfs.post_times().is_empty());
        assert!(dfs.parents().is_empty());
        assert!(dfs.components().is_empty());
        assert_eq!(dfs.component_count(), 0);
        assert!(dfs.topological_order().is_empty());
    }

    #[test]
    fn cycle_with_tail_has_one_back_edge() {
        let dfs = DepthFirstSearch::new(&cycle_with_tail());
        assert_eq!(edges(dfs.back()), HashSet::from([("c", "a")]));
        assert_eq!(dfs.forward().get_edge_count(), 0);
        assert_eq!(dfs.cross().get_edge_count(), 0);
        assert_eq!(dfs.back().get_vertex_count(), 4);
        assert_eq!(dfs.edge_kind(&"c", &"a"), EdgeKind::Back);
        assert_eq!(dfs.edge_kind(&"a", &"b"), EdgeKind::Tree);
        assert_eq!(dfs.edge_kind(&"c", &"d"), EdgeKind::Tree);
        assert_eq!(dfs.component_count(), 1);
    }

    #[test]
    fn timestamps_of_a_path() {
        let digraph = Digraph::from_edges_iter(vec![0, 1, 2], vec![(0, 1), (1, 2)]);
        let dfs = DepthFirstSearch::new(&digraph);
        assert_eq!(dfs.pre_times(), &HashMap::from([(0, 0), (1, 1), (2, 2)]));
        assert_eq!(dfs.post_times(), &HashMap::from([(2, 3), (1, 4), (0, 5)]));
        assert_eq!(dfs.parents(), &HashMap::from([(1, 0), (2, 1)]));
        assert_eq!(dfs.topological_order(), &[0, 1, 2]);
    }

    #[test]
    fn forward_and_cross_edges() {
        // 0 -> 1 -> 2 with a shortcut 0 -> 2, plus 3 -> 2 from a later tree.
        let digraph = Digraph::from_edges_iter(
            vec![0, 1, 2, 3],
            vec![(0, 1), (1, 2), (0, 2), (3, 2)],
        );
        let dfs = DepthFirstSearch::new(&digraph);
        assert_eq!(dfs.edge_kind(&0, &2), EdgeKind::Forward);
        assert_eq!(dfs.edge_kind(&3, &2), EdgeKind::Cross);
        assert_eq!(edges(dfs.forward()), HashSet::from([(0, 2)]));
        assert_eq!(edges(dfs.cross()), HashSet::from([(3, 2)]));
        assert_eq!(dfs.component_count(), 2);
        assert_eq!(dfs.components()[&3], 1);
    }

    #[test]
    fn preferred_start_goes_first() {
        let digraph = cycle_with_tail();
        let dfs = DepthFirstSearch::from_start(&digraph, &"b");
        assert_eq!(dfs.pre_times()[&"b"], 0);
        assert!(!dfs.parents().contains_key(&"b"));
        assert_eq!(edges(dfs.back()), HashSet::from([("a", "b")]));
    }

    #[test]
    fn preferred_starts_in_order() {
        let digraph = Digraph::from_edges_iter(vec![0, 1, 2], vec![(0, 1)]);
        let dfs = DepthFirstSearch::with_preferred_starts(&digraph, &[2, 1, 0]);
        assert_eq!(dfs.component_count(), 3);
        assert_eq!(dfs.components(), &HashMap::from([(2, 0), (1, 1), (0, 2)]));
        assert_eq!(dfs.edge_kind(&0, &1), EdgeKind::Cross);
    }

    #[test]
    fn unknown_preferred_start_is_skipped() {
        cov_mark::check!(preferred_start_not_a_vertex);
        let digraph = Digraph::from_edges_iter(vec![0, 1], vec![(0, 1)]);
        let dfs = DepthFirstSearch::from_start(&digraph, &7);
        assert_eq!(dfs.pre_times()[&0], 0);
        assert_eq!(dfs.component_count(), 1);
    }

    #[test]
    fn self_loop_is_a_back_edge() {
        cov_mark::check!(self_loop_is_back_edge);
        let digraph = Digraph::from_edges_iter(vec!['x'], vec![('x', 'x')]);
        let dfs = DepthFirstSearch::new(&digraph);
        assert_eq!(edges(dfs.back()), HashSet::from([('x', 'x')]));
    }

    #[test]
    #[should_panic = "both endpoints must have been visited"]
    fn negative_test_edge_kind_of_unknown_vertex() {
        let dfs = DepthFirstSearch::new(&cycle_with_tail());
        dfs.edge_kind(&"a", &"z");
    }

    #[test]
    fn deep_path_does_not_overflow() {
        let n = 200_000u32;
        let digraph = Digraph::from_edges_iter(0..n, (1..n).map(|v| (v - 1, v)));
        let dfs = DepthFirstSearch::new(&digraph);
        assert_eq!(dfs.component_count(), 1);
        assert_eq!(dfs.post_times()[&0], 2 * n as usize - 1);
        assert_eq!(dfs.topological_order().first(), Some(&0));
    }

    #[test]
    fn results_survive_mutation() {
        let mut digraph = cycle_with_tail();
        let dfs = DepthFirstSearch::new(&digraph);
        digraph.remove_vertex(&"c");
        assert_eq!(dfs.back().get_edge_count(), 1);
        assert!(dfs.pre_times().contains_key(&"c"));
    }

    proptest! {
        #[test]
        fn timestamps_are_distinct_and_nested(digraph in arb_digraph(0..25)) {
            let dfs = DepthFirstSearch::new(&digraph);
            let mut seen = HashSet::new();
            for v in digraph.iter_vertices() {
                let (pre, post) = (dfs.pre_times()[v], dfs.post_times()[v]);
                prop_assert!(pre < post);
                prop_assert!(post < 2 * digraph.get_vertex_count());
                prop_assert!(seen.insert(pre));
                prop_assert!(seen.insert(post));
            }
        }

        #[test]
        fn every_edge_is_classified_once(digraph in arb_digraph(0..25)) {
            let dfs = DepthFirstSearch::new(&digraph);
            let tree_edges = dfs.parents().len();
            let classified = dfs.back().get_edge_count()
                + dfs.forward().get_edge_count()
                + dfs.cross().get_edge_count();
            prop_assert_eq!(tree_edges + classified, digraph.get_edge_count());
            for (v, w) in digraph.iter_edges() {
                let expected = match dfs.edge_kind(v, w) {
                    EdgeKind::Tree => dfs.parents().get(w) == Some(v),
                    EdgeKind::Back => dfs.back().get_edge(v, w),
                    EdgeKind::Forward => dfs.forward().get_edge(v, w),
                    EdgeKind::Cross => dfs.cross().get_edge(v, w),
                };
                prop_assert!(expected);
                prop_assert!((dfs.edge_kind(v, w) as u8) < 4);
            }
        }

        #[test]
        fn parent_edges_exist(digraph in arb_digraph(0..25)) {
            let dfs = DepthFirstSearch::new(&digraph);
            for (child, parent) in dfs.parents() {
                prop_assert!(digraph.get_edge(parent, child));
                prop_assert!(dfs.pre_times()[parent] < dfs.pre_times()[child]);
                prop_assert!(dfs.post_times()[child] < dfs.post_times()[parent]);
                prop_assert_eq!(dfs.components()[parent], dfs.components()[child]);
            }
        }

        #[test]
        fn acyclic_iff_topological_order_is_valid(digraph in arb_digraph(0..25)) {
            let dfs = DepthFirstSearch::new(&digraph);
            let position: HashMap<u16, usize> = dfs
                .topological_order()
                .iter()
                .enumerate()
                .map(|(i, v)| (*v, i))
                .collect();
            prop_assert_eq!(position.len(), digraph.get_vertex_count());
            let linearizes = digraph
                .iter_edges()
                .all(|(v, w)| position[v] < position[w]);
            prop_assert_eq!(dfs.back().get_edge_count() == 0, linearizes);
            prop_assert_eq!(digraph.is_dag(), linearizes);
        }
    }
}
