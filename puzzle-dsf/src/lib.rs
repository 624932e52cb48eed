#![forbid(unsafe_code)]
//! Disjoint-set forest with subtree sizes.
//!
//! A mapping from element index in `[0, n)` to a canonical representative,
//! augmented with the size of each equivalence class. Used throughout the
//! puzzle core (rectangle divvy, post-hoc connectivity checks) wherever an
//! algorithm needs to track which cells belong together without caring
//! which particular cell is chosen to stand for the group.

/// A disjoint-set forest over `[0, n)` elements.
///
/// Every element starts as its own singleton class. `merge` joins two
/// classes; `canonify` finds (and path-compresses toward) the
/// representative of a class; `size` reports how many elements share that
/// representative.
#[derive(Debug, Clone)]
pub struct Dsf {
    /// `parent[x]`: another element in the same class, or `x` itself if `x`
    /// is currently a root. Not necessarily the canonical representative
    /// until `canonify` is called (path compression is lazy).
    parent: Vec<u32>,
    /// Valid only at roots: the number of elements in this root's class.
    size: Vec<u32>,
}

impl Dsf {
    /// Creates a forest of `n` singleton classes.
    pub fn new(n: usize) -> Self {
        Self {
            parent: (0..n as u32).collect(),
            size: vec![1; n],
        }
    }

    /// Resets an existing forest to `n` singleton classes in place,
    /// reusing its allocation.
    pub fn init(&mut self, n: usize) {
        self.parent.clear();
        self.parent.extend(0..n as u32);
        self.size.clear();
        self.size.resize(n, 1);
    }

    /// Number of elements the forest was created or reset with.
    pub fn len(&self) -> usize {
        self.parent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parent.is_empty()
    }

    /// Returns the canonical representative of `x`'s class, compressing the
    /// path from `x` to the root so future lookups are cheaper. Idempotent:
    /// `canonify(canonify(x)) == canonify(x)`.
    pub fn canonify(&mut self, x: usize) -> usize {
        let mut root = x;
        while self.parent[root] as usize != root {
            root = self.parent[root] as usize;
        }

        // Second pass: point every element on the path directly at `root`.
        let mut cur = x;
        while self.parent[cur] as usize != root {
            let next = self.parent[cur] as usize;
            self.parent[cur] = root as u32;
            cur = next;
        }

        root
    }

    /// Merges the classes containing `x` and `y`. No-op if they are already
    /// equivalent. The surviving representative is the root of the larger
    /// class; ties favour the numerically smaller root, so the outcome is
    /// deterministic for a given sequence of calls.
    pub fn merge(&mut self, x: usize, y: usize) {
        let rx = self.canonify(x);
        let ry = self.canonify(y);
        if rx == ry {
            return;
        }

        let (small, large) = if self.size[rx] < self.size[ry]
            || (self.size[rx] == self.size[ry] && rx > ry)
        {
            (rx, ry)
        } else {
            (ry, rx)
        };

        self.parent[small] = large as u32;
        self.size[large] += self.size[small];
    }

    /// Size of `x`'s equivalence class. Equal to `size(canonify(x))`.
    pub fn size(&mut self, x: usize) -> usize {
        let root = self.canonify(x);
        self.size[root] as usize
    }

    /// Size of `x`'s class without path compression, for read-only callers
    /// that already hold a `&Dsf` (e.g. post-hoc verification loops that
    /// don't want to mutate while iterating).
    pub fn size_ro(&self, x: usize) -> usize {
        let mut root = x;
        while self.parent[root] as usize != root {
            root = self.parent[root] as usize;
        }
        self.size[root] as usize
    }

    /// Canonical representative of `x` without mutating the forest.
    pub fn canonify_ro(&self, x: usize) -> usize {
        let mut root = x;
        while self.parent[root] as usize != root {
            root = self.parent[root] as usize;
        }
        root
    }
}
