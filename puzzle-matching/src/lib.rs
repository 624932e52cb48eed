#![forbid(unsafe_code)]
//! Bipartite maximum matching via Hopcroft–Karp, with an optional
//! randomised choice among equally-maximum matchings and a Kőnig-style
//! maximality witness.
//!
//! The adjacency lists passed in are permuted in place whenever a random
//! source is supplied (see [`with_scratch`]); this is a documented
//! optimisation, not an accident, and callers who need their adjacency
//! lists left untouched should pass a clone.

use puzzle_random::Rng;
use thiserror::Error;
use tracing::instrument;

const NIL: u32 = u32::MAX;

#[derive(Debug, Error)]
pub enum MatchError {
    #[error("failed to allocate scratch space for a {nl}x{nr} matching problem")]
    Allocation { nl: usize, nr: usize },
}

/// Reusable working memory for [`with_scratch`], so tight loops (e.g. the
/// Latin-square generator, which runs one matching problem per row) avoid
/// repeated allocation.
#[derive(Debug, Default)]
pub struct Scratch {
    dist: Vec<u32>,
    queue: Vec<u32>,
    to_r: Vec<u32>,
    to_l: Vec<u32>,
    order: Vec<u32>,
}

impl Scratch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `u32` words this problem size needs; mirrors §6's
    /// `scratch_size(nL, nR)` contract as an allocation-sizing hint rather
    /// than a raw byte count, since Rust's `Vec` manages its own layout.
    pub fn required_capacity(nl: usize, nr: usize) -> usize {
        2 * nl + nr + 1
    }

    fn reserve(&mut self, nl: usize, nr: usize) {
        self.dist.clear();
        self.dist.resize(nl + 1, 0);
        self.queue.clear();
        self.queue.reserve(nl);
        self.to_r.clear();
        self.to_r.resize(nl, NIL);
        self.to_l.clear();
        self.to_l.resize(nr, NIL);
        self.order.clear();
        self.order.extend(0..nl as u32);
    }
}

/// The outcome of a matching run: per-vertex partner indices (`NIL`
/// represented as `-1`) plus the matched edge count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Matching {
    pub out_l: Vec<i32>,
    pub out_r: Vec<i32>,
    pub size: usize,
}

/// Convenience entry point that allocates its own [`Scratch`]. Returns
/// [`MatchError::Allocation`] only if the problem size cannot be
/// represented (§7's "allocation failure" sentinel); otherwise infallible.
#[instrument(skip(adj, rng))]
pub fn matching(
    nl: usize,
    nr: usize,
    adj: &mut [Vec<u32>],
    rng: Option<&mut Rng>,
) -> Result<Matching, MatchError> {
    if nl.checked_add(nr).is_none() || nl > (u32::MAX as usize) || nr > (u32::MAX as usize) {
        return Err(MatchError::Allocation { nl, nr });
    }
    let mut scratch = Scratch::new();
    Ok(with_scratch(&mut scratch, nl, nr, adj, rng))
}

/// Computes a maximum matching of the bipartite graph `(nl, nr, adj)` using
/// caller-owned scratch space. `adj[i]` lists `i`'s R-neighbours; these
/// lists are permuted in place when `rng` is `Some`.
///
/// Infallible on well-formed input (`adj.len() == nl`, every neighbour
/// index `< nr`); malformed input is a programmer error and may panic via
/// indexing, per §7.
#[instrument(skip(scratch, adj, rng))]
pub fn with_scratch(
    scratch: &mut Scratch,
    nl: usize,
    nr: usize,
    adj: &mut [Vec<u32>],
    mut rng: Option<&mut Rng>,
) -> Matching {
    assert_eq!(adj.len(), nl, "adjacency list must have one entry per L-vertex");
    scratch.reserve(nl, nr);

    loop {
        if !bfs_phase(scratch, nl, adj) {
            break;
        }

        if let Some(r) = rng.as_deref_mut() {
            r.shuffle(&mut scratch.order);
        }

        let order = core::mem::take(&mut scratch.order);
        for &u in &order {
            let u = u as usize;
            if scratch.to_r[u] == NIL {
                dfs_phase(scratch, u, adj, rng.as_deref_mut());
            }
        }
        scratch.order = order;
    }

    let out_l = scratch
        .to_r
        .iter()
        .map(|&v| if v == NIL { -1 } else { v as i32 })
        .collect();
    let out_r = scratch
        .to_l
        .iter()
        .map(|&u| if u == NIL { -1 } else { u as i32 })
        .collect();
    let size = scratch.to_r.iter().filter(|&&v| v != NIL).count();

    Matching { out_l, out_r, size }
}

/// Layers vertices breadth-first from every free L-vertex, alternating
/// non-matching L→R edges with matching R→L edges. Returns `true` iff at
/// least one free R-vertex was reached (an augmenting path may exist).
fn bfs_phase(scratch: &mut Scratch, nl: usize, adj: &[Vec<u32>]) -> bool {
    const INF: u32 = u32::MAX;
    scratch.dist.fill(INF);
    scratch.queue.clear();

    for u in 0..nl {
        if scratch.to_r[u] == NIL {
            scratch.dist[u] = 0;
            scratch.queue.push(u as u32);
        }
    }

    let nil_layer = nl; // pseudo-vertex representing "free R reached"
    let mut head = 0usize;
    while head < scratch.queue.len() {
        let u = scratch.queue[head] as usize;
        head += 1;
        if scratch.dist[u] >= scratch.dist[nil_layer] {
            continue;
        }
        for &v in &adj[u] {
            let w = scratch.to_l[v as usize];
            let w_idx = if w == NIL { nil_layer } else { w as usize };
            if scratch.dist[w_idx] == INF {
                scratch.dist[w_idx] = scratch.dist[u] + 1;
                if w_idx != nil_layer {
                    scratch.queue.push(w_idx as u32);
                }
            }
        }
    }

    scratch.dist[nil_layer] != INF
}

/// Searches for a vertex-disjoint augmenting path from free L-vertex `u`,
/// respecting the BFS layering. Flips the path's edges on success.
/// Permutes `adj[u]`'s remaining unexplored neighbours in place when `rng`
/// is given, by swapping the chosen neighbour into the next unused slot —
/// the source of §4.C's documented in-place adjacency permutation.
fn dfs_phase(scratch: &mut Scratch, u: usize, adj: &mut [Vec<u32>], rng: Option<&mut Rng>) -> bool {
    dfs_visit(scratch, u, adj, rng)
}

fn dfs_visit(
    scratch: &mut Scratch,
    u: usize,
    adj: &mut [Vec<u32>],
    mut rng: Option<&mut Rng>,
) -> bool {
    const INF: u32 = u32::MAX;
    let len = adj[u].len();

    for idx in 0..len {
        if let Some(r) = rng.as_deref_mut() {
            let remaining = (len - idx) as u32;
            let pick = idx + r.upto(remaining) as usize;
            adj[u].swap(idx, pick);
        }
        let v = adj[u][idx];
        let w = scratch.to_l[v as usize];
        let next_layer_ok = if w == NIL {
            true
        } else {
            scratch.dist[w as usize] == scratch.dist[u] + 1
        };
        if !next_layer_ok {
            continue;
        }

        let advance = if w == NIL {
            true
        } else {
            dfs_visit(scratch, w as usize, adj, rng.as_deref_mut())
        };

        if advance {
            scratch.to_l[v as usize] = u as u32;
            scratch.to_r[u] = v;
            return true;
        }
    }

    scratch.dist[u] = INF;
    false
}

/// Kőnig-style maximality witness for a matching already produced by
/// [`with_scratch`]/[`matching`]. `labels[0..nl]` are the L labels,
/// `labels[nl..nl + nr]` the R labels: `0` for vertices reached by an
/// alternating BFS from the free L-vertices, `1` otherwise. Guarantees: every
/// unmatched L is `0`, every unmatched R is `1`, every L0→R1 edge is in the
/// matching, and no L1→R0 edge is.
#[instrument(skip(adj, matching, labels))]
pub fn witness(nl: usize, nr: usize, adj: &[Vec<u32>], matching: &Matching, labels: &mut [u8]) {
    assert_eq!(labels.len(), nl + nr, "labels must hold nl + nr entries");

    let mut visited_l = vec![false; nl];
    let mut visited_r = vec![false; nr];
    let mut queue = Vec::new();

    for u in 0..nl {
        if matching.out_l[u] < 0 {
            visited_l[u] = true;
            queue.push(u as u32);
        }
    }

    let mut head = 0usize;
    while head < queue.len() {
        let u = queue[head] as usize;
        head += 1;
        for &v in &adj[u] {
            let v = v as usize;
            if visited_r[v] {
                continue;
            }
            visited_r[v] = true;
            let w = matching.out_r[v];
            if w >= 0 && !visited_l[w as usize] {
                visited_l[w as usize] = true;
                queue.push(w as u32);
            }
        }
    }

    for u in 0..nl {
        labels[u] = if visited_l[u] { 0 } else { 1 };
    }
    for v in 0..nr {
        labels[nl + v] = if visited_r[v] { 0 } else { 1 };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete_bipartite(n: usize) -> Vec<Vec<u32>> {
        (0..n).map(|_| (0..n as u32).collect()).collect()
    }

    #[test]
    fn complete_graph_matches_fully() {
        let mut adj = complete_bipartite(5);
        let m = matching(5, 5, &mut adj, None).unwrap();
        assert_eq!(m.size, 5);
        for (u, &v) in m.out_l.iter().enumerate() {
            assert!(v >= 0);
            assert_eq!(m.out_r[v as usize], u as i32);
        }
    }

    #[test]
    fn scenario_4_three_by_three() {
        // nL=nR=3, edges {(0,0),(0,1),(1,0),(1,1),(2,2)}
        let mut adj = vec![vec![0, 1], vec![0, 1], vec![2]];
        let m = matching(3, 3, &mut adj, None).unwrap();
        assert_eq!(m.size, 3);
        assert_eq!(m.out_l[2], 2);
        assert!((m.out_l[0] == 0 && m.out_l[1] == 1) || (m.out_l[0] == 1 && m.out_l[1] == 0));

        let mut labels = vec![0u8; 6];
        witness(3, 3, &adj, &m, &mut labels);
        for u in 0..3 {
            assert_eq!(m.out_l[u] >= 0, labels[u] == 0);
        }
    }

    #[test]
    fn witness_proves_maximality_on_complete_graph() {
        let n = 6;
        let mut adj = complete_bipartite(n);
        let m = matching(n, n, &mut adj, None).unwrap();
        let mut labels = vec![0u8; 2 * n];
        witness(n, n, &adj, &m, &mut labels);

        for u in 0..n {
            if m.out_l[u] < 0 {
                assert_eq!(labels[u], 0);
            }
        }
        for v in 0..n {
            if m.out_r[v] < 0 {
                assert_eq!(labels[n + v], 1);
            }
        }
        for u in 0..n {
            for &v in &adj[u] {
                let v = v as usize;
                let lu = labels[u];
                let lv = labels[n + v];
                if lu == 0 && lv == 1 {
                    assert_eq!(m.out_l[u], v as i32, "L0->R1 edge must be matched");
                }
                if lu == 1 && lv == 0 {
                    assert_ne!(m.out_l[u], v as i32, "L1->R0 edge must not be matched");
                }
            }
        }
    }

    #[test]
    fn disconnected_vertex_stays_unmatched() {
        let mut adj = vec![vec![0], vec![]];
        let m = matching(2, 1, &mut adj, None).unwrap();
        assert_eq!(m.size, 1);
        assert_eq!(m.out_l[0], 0);
        assert_eq!(m.out_l[1], -1);
    }

    #[test]
    fn randomised_matching_is_still_maximum() {
        let mut adj = complete_bipartite(8);
        let mut rng = Rng::new(b"matching-seed");
        let m = matching(8, 8, &mut adj, Some(&mut rng)).unwrap();
        assert_eq!(m.size, 8);
    }

    /// `{1..b}` vs `{1..b} \ {one element}` test graph: L = subsets of
    /// `1..=b`, R = same subsets with one element removed, edge iff R is an
    /// immediate subset of L. Randomisation coverage: over many seeds every
    /// edge that appears in some maximum matching should eventually appear
    /// in the output.
    fn subset_removal_graph(b: u32) -> (usize, usize, Vec<Vec<u32>>) {
        let subsets: Vec<u32> = (0u32..(1 << b)).collect();
        let index_of = |mask: u32| subsets.iter().position(|&m| m == mask).unwrap();
        let mut adj = vec![Vec::new(); subsets.len()];
        for (li, &mask) in subsets.iter().enumerate() {
            let mut bit = 1u32;
            for _ in 0..b {
                if mask & bit != 0 {
                    let removed = mask & !bit;
                    adj[li].push(index_of(removed) as u32);
                }
                bit <<= 1;
            }
        }
        (subsets.len(), subsets.len(), adj)
    }

    #[test]
    fn randomisation_eventually_covers_every_maximum_matching_edge() {
        let b = 4; // keep small enough to run fast in unit tests
        let (nl, nr, base_adj) = subset_removal_graph(b);

        let mut seen_edges = std::collections::HashSet::new();
        for seed in 0..300u64 {
            let mut adj = base_adj.clone();
            let mut rng = Rng::new(&seed.to_le_bytes());
            let m = matching(nl, nr, &mut adj, Some(&mut rng)).unwrap();
            for (u, &v) in m.out_l.iter().enumerate() {
                if v >= 0 {
                    seen_edges.insert((u, v as usize));
                }
            }
        }

        // Every edge in the bipartite graph lies in some maximum matching of
        // this vertex-transitive construction, so with enough samples every
        // edge should show up at least once.
        let mut all_edges = std::collections::HashSet::new();
        for (u, neighbours) in base_adj.iter().enumerate() {
            for &v in neighbours {
                all_edges.insert((u, v as usize));
            }
        }
        assert_eq!(seen_edges.len(), all_edges.len());
    }
}
