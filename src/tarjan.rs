//! Tarjan's single-pass strongly connected components.
//!
//! Components are numbered in the order they get closed, which is a reverse
//! topological order of the condensation.

use std::collections::HashMap;
use std::hash::Hash;

use roaring::RoaringBitmap;

use crate::Digraph;

#[derive(Clone, Debug)]
pub struct TarjanComponents<V> {
    pre: HashMap<V, usize>,
    low: HashMap<V, usize>,
    component: HashMap<V, usize>,
    component_count: usize,
}

impl<V: Clone + Eq + Hash> TarjanComponents<V> {
    pub fn new(digraph: &Digraph<V>) -> Self {
        let mut state = LowLinks::new(digraph);
        for slot in digraph.iter_slots() {
            if !state.visited.contains(slot) {
                state.walk(slot);
            }
        }
        log::debug!(
            "tarjan: {} vertices in {} strongly connected components",
            digraph.get_vertex_count(),
            state.component_count
        );
        state.into_result()
    }

    /// Discovery order of every vertex, `0..n`.
    pub fn pre_times(&self) -> &HashMap<V, usize> {
        &self.pre
    }

    /// Final low-link values.  Once a component closes its vertices are
    /// pinned to the vertex count, so after a full run every entry holds it.
    pub fn low_links(&self) -> &HashMap<V, usize> {
        &self.low
    }

    pub fn components(&self) -> &HashMap<V, usize> {
        &self.component
    }

    pub fn into_components(self) -> HashMap<V, usize> {
        self.component
    }

    pub fn component_count(&self) -> usize {
        self.component_count
    }
}

struct LowLinks<'a, V> {
    digraph: &'a Digraph<V>,
    visited: RoaringBitmap,
    pre: Vec<usize>,
    low: Vec<usize>,
    component: Vec<usize>,
    open: Vec<u32>,
    clock: usize,
    component_count: usize,
    // Larger than any discovery time.
    closed: usize,
}

impl<'a, V: Clone + Eq + Hash> LowLinks<'a, V> {
    fn new(digraph: &'a Digraph<V>) -> Self {
        let capacity = digraph.get_slot_capacity();
        Self {
            digraph,
            visited: RoaringBitmap::new(),
            pre: vec![0; capacity],
            low: vec![0; capacity],
            component: vec![0; capacity],
            open: Vec::new(),
            clock: 0,
            component_count: 0,
            closed: digraph.get_vertex_count(),
        }
    }

    fn walk(&mut self, root: u32) {
        let digraph = self.digraph;
        self.discover(root);
        let mut stack = vec![(root, digraph.iter_child_slots(root))];
        while let Some((u, children)) = stack.last_mut() {
            let u = *u;
            match children.next() {
                Some(w) if !self.visited.contains(w) => {
                    self.discover(w);
                    stack.push((w, digraph.iter_child_slots(w)));
                }
                Some(w) => {
                    if self.low[w as usize] == self.closed {
                        cov_mark::hit!(closed_component_is_ignored);
                    }
                    self.fold_low(u, w);
                }
                None => {
                    stack.pop();
                    self.close_if_root(u);
                    if let Some((parent, _)) = stack.last() {
                        let parent = *parent;
                        self.fold_low(parent, u);
                    }
                }
            }
        }
    }

    fn discover(&mut self, u: u32) {
        self.visited.insert(u);
        self.pre[u as usize] = self.clock;
        self.low[u as usize] = self.clock;
        self.clock += 1;
        self.open.push(u);
    }

    fn fold_low(&mut self, v: u32, w: u32) {
        let low_w = self.low[w as usize];
        let low_v = &mut self.low[v as usize];
        *low_v = (*low_v).min(low_w);
    }

    /// Pops the component rooted at `u`, if `u` is a root.  Popped vertices get
    /// their low-link pinned to `closed` so they can't lower anybody else's.
    fn close_if_root(&mut self, u: u32) {
        if self.pre[u as usize] != self.low[u as usize] {
            return;
        }
        while let Some(top) = self.open.pop() {
            self.component[top as usize] = self.component_count;
            self.low[top as usize] = self.closed;
            if top == u {
                break;
            }
        }
        self.component_count += 1;
    }

    fn into_result(self) -> TarjanComponents<V> {
        let digraph = self.digraph;
        let vertex_count = digraph.get_vertex_count();
        let mut pre = HashMap::with_capacity(vertex_count);
        let mut low = HashMap::with_capacity(vertex_count);
        let mut component = HashMap::with_capacity(vertex_count);
        for slot in digraph.iter_slots() {
            if let Some(v) = digraph.label(slot) {
                let index = slot as usize;
                pre.insert(v.clone(), self.pre[index]);
                low.insert(v.clone(), self.low[index]);
                component.insert(v.clone(), self.component[index]);
            }
        }
        TarjanComponents {
            pre,
            low,
            component,
            component_count: self.component_count,
        }
    }
}
