#![forbid(unsafe_code)]
//! Three-pass Tarjan bridge finding over a restartable neighbour callback.
//!
//! Vertices are numbered `0..n`; a virtual root at index `n` stitches every
//! connected component into one spanning forest so the three passes can run
//! uniformly without special-casing disconnected input. Bridges are
//! recorded on the child side of the tree edge they correspond to, which is
//! enough because Tarjan's theorem guarantees every bridge is a tree edge of
//! any DFS spanning forest.

use tracing::instrument;

/// A restartable source of `u`'s neighbours, standing in for the C
/// callback's "call with `u=u` to start, `u=-1` to continue" convention: an
/// explicit context object (`self`) plus a restart/continue sentinel
/// (`restart`), rather than an iterator or exception-driven control flow.
pub trait NeighbourSource {
    /// Returns the next neighbour of `u`: the first one if `restart` is
    /// true, the one after the last one returned for this same `u`
    /// otherwise. `None` once `u`'s neighbours are exhausted.
    fn next(&mut self, u: usize, restart: bool) -> Option<usize>;
}

/// A ready-made [`NeighbourSource`] over an explicit adjacency list, for
/// callers who already have one in hand rather than wanting to enumerate
/// lazily.
pub struct AdjacencyList {
    adj: Vec<Vec<usize>>,
    cursor: Option<(usize, usize)>,
}

impl AdjacencyList {
    pub fn new(adj: Vec<Vec<usize>>) -> Self {
        Self { adj, cursor: None }
    }
}

impl NeighbourSource for AdjacencyList {
    fn next(&mut self, u: usize, restart: bool) -> Option<usize> {
        let idx = match self.cursor {
            Some((cu, next_idx)) if cu == u && !restart => next_idx,
            _ => 0,
        };
        let result = self.adj[u].get(idx).copied();
        self.cursor = Some((u, idx + 1));
        result
    }
}

#[derive(Debug, Clone, Copy)]
struct VertexRecord {
    parent: Option<usize>,
    first_child: Option<usize>,
    next_sibling: Option<usize>,
    visited: bool,
    component: usize,
    index: u32,
    maxindex: u32,
    minreachable: u32,
    maxreachable: u32,
    bridge: Option<usize>,
}

impl Default for VertexRecord {
    fn default() -> Self {
        Self {
            parent: None,
            first_child: None,
            next_sibling: None,
            visited: false,
            component: 0,
            index: 0,
            maxindex: 0,
            minreachable: 0,
            maxreachable: 0,
            bridge: None,
        }
    }
}

/// Working state for one graph's bridge analysis. Built fresh by
/// [`new_state`]/[`run`]; queried afterwards via [`LoopState::is_loop_edge`]
/// and [`LoopState::is_bridge`].
pub struct LoopState {
    n: usize,
    root: usize,
    records: Vec<VertexRecord>,
    component_size: Vec<u32>,
    nedges: usize,
    nbridges: usize,
}

/// Allocates working state for an `n`-vertex graph, ready for [`run`].
pub fn new_state(n: usize) -> LoopState {
    LoopState {
        n,
        root: n,
        records: vec![VertexRecord::default(); n + 1],
        component_size: vec![0; n],
        nedges: 0,
        nbridges: 0,
    }
}

fn attach_child(records: &mut [VertexRecord], parent: usize, child: usize) {
    records[child].next_sibling = records[parent].first_child;
    records[parent].first_child = Some(child);
}

fn build_forest(state: &mut LoopState, source: &mut dyn NeighbourSource) {
    let root = state.root;
    state.records[root].visited = true;

    for start in 0..state.n {
        if state.records[start].visited {
            continue;
        }
        state.records[start].visited = true;
        state.records[start].parent = Some(root);
        state.records[start].component = start;
        attach_child(&mut state.records, root, start);
        dfs_build(state, source, start, start);
    }
}

fn dfs_build(state: &mut LoopState, source: &mut dyn NeighbourSource, u: usize, component: usize) {
    state.component_size[component] += 1;
    let mut restart = true;
    loop {
        let Some(v) = source.next(u, restart) else {
            break;
        };
        restart = false;
        if u < v {
            state.nedges += 1;
        }
        if !state.records[v].visited {
            state.records[v].visited = true;
            state.records[v].parent = Some(u);
            state.records[v].component = component;
            attach_child(&mut state.records, u, v);
            dfs_build(state, source, v, component);
        }
    }
}

fn assign_preorder(records: &mut [VertexRecord], u: usize, counter: &mut u32) -> u32 {
    records[u].index = *counter;
    *counter += 1;
    let mut maxidx = records[u].index;
    let mut child = records[u].first_child;
    while let Some(c) = child {
        let cmax = assign_preorder(records, c, counter);
        maxidx = maxidx.max(cmax);
        child = records[c].next_sibling;
    }
    records[u].maxindex = maxidx;
    maxidx
}

fn compute_reachable(
    state: &mut LoopState,
    source: &mut dyn NeighbourSource,
    u: usize,
) -> (u32, u32) {
    let index_u = state.records[u].index;
    let mut minr = index_u;
    let mut maxr = index_u;
    let parent = state.records[u].parent;

    // The virtual root has no real neighbours to ask `source` about; only
    // vertices `0..n` are meaningful queries for a `NeighbourSource`. Its
    // reachability comes entirely from aggregating over its forest children.
    if u != state.root {
        let mut restart = true;
        loop {
            let Some(w) = source.next(u, restart) else {
                break;
            };
            restart = false;
            if parent == Some(w) {
                continue;
            }
            minr = minr.min(state.records[w].index);
            maxr = maxr.max(state.records[w].index);
        }
    }

    let mut child = state.records[u].first_child;
    while let Some(c) = child {
        let (cmin, cmax) = compute_reachable(state, source, c);
        minr = minr.min(cmin);
        maxr = maxr.max(cmax);
        child = state.records[c].next_sibling;
    }

    state.records[u].minreachable = minr;
    state.records[u].maxreachable = maxr;

    if let Some(p) = parent {
        let index_u = state.records[u].index;
        let maxindex_u = state.records[u].maxindex;
        if minr >= index_u && maxr <= maxindex_u {
            state.records[u].bridge = Some(p);
            if p != state.root {
                state.nbridges += 1;
            }
        }
    }

    (minr, maxr)
}

/// Runs the full three-pass analysis over an `n`-vertex graph exposed via
/// `source`, populating `state`. Returns `true` iff the graph contains at
/// least one cycle (equivalently, fewer bridges than edges).
#[instrument(skip(source))]
pub fn run(state: &mut LoopState, source: &mut dyn NeighbourSource) -> bool {
    build_forest(state, source);

    let mut counter = 0u32;
    assign_preorder(&mut state.records, state.root, &mut counter);

    compute_reachable(state, source, state.root);

    state.nbridges < state.nedges
}

impl LoopState {
    /// True iff the `u`-`v` edge is *not* a bridge (i.e. it lies on some
    /// cycle). Checks both tree-edge directions, since a bridge is recorded
    /// only on its child endpoint.
    pub fn is_loop_edge(&self, u: usize, v: usize) -> bool {
        !(self.records[u].bridge == Some(v) || self.records[v].bridge == Some(u))
    }

    /// True iff the `u`-`v` edge is a bridge, reporting the vertex count on
    /// each side of the cut through `u_side`/`v_side`.
    pub fn is_bridge(&self, u: usize, v: usize, u_side: &mut usize, v_side: &mut usize) -> bool {
        let (child, parent) = if self.records[u].bridge == Some(v) && self.records[u].parent == Some(v) {
            (u, v)
        } else if self.records[v].bridge == Some(u) && self.records[v].parent == Some(u) {
            (v, u)
        } else {
            return false;
        };
        let _ = parent;
        let subtree = (self.records[child].maxindex - self.records[child].index + 1) as usize;
        let component = self.records[child].component;
        let total = self.component_size[component] as usize;
        if child == u {
            *u_side = subtree;
            *v_side = total - subtree;
        } else {
            *v_side = subtree;
            *u_side = total - subtree;
        }
        true
    }

    /// `true` iff the graph contains a cycle, as last computed by [`run`].
    pub fn has_cycle(&self) -> bool {
        self.nbridges < self.nedges
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Scenario 5: vertices 0..3, edges {0-1, 1-2, 2-0, 2-3}.
    fn scenario_5() -> AdjacencyList {
        AdjacencyList::new(vec![vec![1, 2], vec![0, 2], vec![0, 1, 3], vec![2]])
    }

    #[test]
    fn scenario_5_has_a_cycle_and_one_bridge() {
        let mut source = scenario_5();
        let mut state = new_state(4);
        assert!(run(&mut state, &mut source));

        assert!(state.is_loop_edge(0, 1));
        assert!(state.is_loop_edge(1, 2));
        assert!(state.is_loop_edge(2, 0));
        assert!(!state.is_loop_edge(2, 3));

        let mut us = 0;
        let mut vs = 0;
        assert!(state.is_bridge(2, 3, &mut us, &mut vs));
        assert_eq!(us, 3);
        assert_eq!(vs, 1);
        assert!(!state.is_bridge(0, 1, &mut us, &mut vs));
    }

    #[test]
    fn tree_has_no_loop_edges() {
        // A simple path 0-1-2-3.
        let adj = vec![vec![1], vec![0, 2], vec![1, 3], vec![2]];
        let mut source = AdjacencyList::new(adj);
        let mut state = new_state(4);
        assert!(!run(&mut state, &mut source));
        assert!(!state.is_loop_edge(0, 1));
        assert!(!state.is_loop_edge(1, 2));
        assert!(!state.is_loop_edge(2, 3));
    }

    #[test]
    fn single_cycle_of_length_n_has_every_edge_a_loop_edge() {
        let n = 6;
        let adj: Vec<Vec<usize>> = (0..n).map(|i| vec![(i + n - 1) % n, (i + 1) % n]).collect();
        let mut source = AdjacencyList::new(adj);
        let mut state = new_state(n);
        assert!(run(&mut state, &mut source));
        for i in 0..n {
            assert!(state.is_loop_edge(i, (i + 1) % n));
        }
    }

    #[test]
    fn disconnected_components_are_each_analysed() {
        // Two disjoint triangles: {0,1,2} and {3,4,5}.
        let adj = vec![
            vec![1, 2],
            vec![0, 2],
            vec![0, 1],
            vec![4, 5],
            vec![3, 5],
            vec![3, 4],
        ];
        let mut source = AdjacencyList::new(adj);
        let mut state = new_state(6);
        assert!(run(&mut state, &mut source));
        for &(u, v) in &[(0, 1), (1, 2), (2, 0), (3, 4), (4, 5), (5, 3)] {
            assert!(state.is_loop_edge(u, v));
        }
    }

    #[test]
    fn single_vertex_no_edges_has_no_cycle() {
        let adj = vec![vec![]];
        let mut source = AdjacencyList::new(adj);
        let mut state = new_state(1);
        assert!(!run(&mut state, &mut source));
    }

    proptest::proptest! {
        #[test]
        fn run_matches_brute_force_cycle_check(
            n in 2usize..8,
            extra_edges in proptest::collection::vec((0usize..8, 0usize..8), 0..10),
        ) {
            // Build a spanning path 0-1-2-...-(n-1), then add extra chords.
            let mut edge_set = std::collections::BTreeSet::new();
            for i in 0..n - 1 {
                edge_set.insert((i, i + 1));
            }
            for (a, b) in extra_edges {
                if a < n && b < n && a != b {
                    edge_set.insert((a.min(b), a.max(b)));
                }
            }
            let mut adj = vec![Vec::new(); n];
            for &(a, b) in &edge_set {
                adj[a].push(b);
                adj[b].push(a);
            }

            let expected_cycle = edge_set.len() > n - 1;

            let mut source = AdjacencyList::new(adj);
            let mut state = new_state(n);
            let has_cycle = run(&mut state, &mut source);
            proptest::prop_assert_eq!(has_cycle, expected_cycle);
        }
    }
}
