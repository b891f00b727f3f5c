//! # Graph Engine
//!
//! Read-only adjacency view over a frame's nodes and edges.
//!
//! All data structures use `BTreeMap`/`BTreeSet` for deterministic ordering:
//! nodes are visited in id order and neighbors in index order, so every
//! traversal result is reproducible. Every search here is bounded.

use crate::primitives::{CYCLIC_DEPTH_CAP, MAX_PATH_EXPANSIONS};
use crate::{Edge, EdgeRel, Node};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

// =============================================================================
// ARGUMENT GRAPH
// =============================================================================

/// Indexed, immutable view of an argumentation graph.
///
/// Node ids are interned to dense indices in sorted order. Edge endpoints that
/// do not name a node are interned as implicit nodes so that computations
/// never fail on unvalidated input.
#[derive(Debug, Clone)]
pub struct ArgGraph<'a> {
    /// Index -> node id, sorted.
    ids: Vec<&'a str>,
    /// Typed edges as (src index, dst index, relation).
    edges: Vec<(usize, usize, EdgeRel)>,
}

impl<'a> ArgGraph<'a> {
    /// Build the view.
    #[must_use]
    pub fn new(nodes: &'a [Node], edges: &'a [Edge]) -> Self {
        let mut all: BTreeSet<&'a str> = nodes.iter().map(|n| n.id.as_str()).collect();
        for edge in edges {
            all.insert(edge.src.as_str());
            all.insert(edge.dst.as_str());
        }

        let ids: Vec<&'a str> = all.into_iter().collect();
        let index: BTreeMap<&str, usize> = ids.iter().enumerate().map(|(i, id)| (*id, i)).collect();

        let edges = edges
            .iter()
            .filter_map(|e| {
                let src = *index.get(e.src.as_str())?;
                let dst = *index.get(e.dst.as_str())?;
                Some((src, dst, e.rel))
            })
            .collect();

        Self { ids, edges }
    }

    /// Number of nodes (explicit and implicit).
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.ids.len()
    }

    /// Number of edges carrying `rel`.
    #[must_use]
    pub fn count_rel(&self, rel: EdgeRel) -> usize {
        self.edges.iter().filter(|(_, _, r)| *r == rel).count()
    }

    /// Node id at an index.
    #[must_use]
    pub fn id(&self, index: usize) -> Option<&'a str> {
        self.ids.get(index).copied()
    }

    /// Outgoing adjacency restricted to `rels`, neighbors deduplicated and sorted.
    fn adjacency(&self, rels: &[EdgeRel]) -> Vec<BTreeSet<usize>> {
        let mut adj = vec![BTreeSet::new(); self.ids.len()];
        for &(src, dst, rel) in &self.edges {
            if rels.contains(&rel) {
                adj[src].insert(dst);
            }
        }
        adj
    }

    // =========================================================================
    // COMPONENTS
    // =========================================================================

    /// Weakly connected components over all edges.
    #[must_use]
    pub fn weak_components(&self) -> usize {
        let mut parent: Vec<usize> = (0..self.ids.len()).collect();

        fn find(parent: &mut [usize], mut x: usize) -> usize {
            while parent[x] != x {
                parent[x] = parent[parent[x]];
                x = parent[x];
            }
            x
        }

        for &(src, dst, _) in &self.edges {
            let a = find(&mut parent, src);
            let b = find(&mut parent, dst);
            if a != b {
                parent[a.max(b)] = a.min(b);
            }
        }

        (0..parent.len()).filter(|&i| find(&mut parent, i) == i).count()
    }

    // =========================================================================
    // CYCLES
    // =========================================================================

    /// Count back-edges found by a three-colour DFS over the `rels` subgraph.
    ///
    /// A back-edge is an edge into a node that is still on the DFS stack.
    /// Roots are taken in id order and the traversal is iterative.
    #[must_use]
    pub fn back_edges(&self, rels: &[EdgeRel]) -> usize {
        const WHITE: u8 = 0;
        const GRAY: u8 = 1;
        const BLACK: u8 = 2;

        let adj: Vec<Vec<usize>> = self
            .adjacency(rels)
            .into_iter()
            .map(|set| set.into_iter().collect())
            .collect();
        let mut colour = vec![WHITE; adj.len()];
        let mut count = 0;

        for root in 0..adj.len() {
            if colour[root] != WHITE {
                continue;
            }
            // Stack of (node, next neighbor position).
            let mut stack: Vec<(usize, usize)> = vec![(root, 0)];
            colour[root] = GRAY;

            while let Some(top) = stack.last_mut() {
                let node = top.0;
                if let Some(&next) = adj[node].get(top.1) {
                    top.1 += 1;
                    match colour[next] {
                        WHITE => {
                            colour[next] = GRAY;
                            stack.push((next, 0));
                        }
                        GRAY => count += 1,
                        _ => {}
                    }
                } else {
                    colour[node] = BLACK;
                    stack.pop();
                }
            }
        }

        count
    }

    // =========================================================================
    // PATHS
    // =========================================================================

    /// Longest chain over the reversed `rel` subgraph.
    ///
    /// Returns 0 without `rel` edges, the longest path length when the
    /// subgraph is acyclic, and `min(n - 1, CYCLIC_DEPTH_CAP)` otherwise.
    #[must_use]
    pub fn chain_depth(&self, rel: EdgeRel) -> usize {
        let n = self.ids.len();
        let mut out: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut indegree = vec![0usize; n];
        let mut has_edges = false;

        for &(src, dst, r) in &self.edges {
            if r == rel {
                // "A depends_on B" is read as B -> A.
                out[dst].push(src);
                indegree[src] += 1;
                has_edges = true;
            }
        }

        if !has_edges {
            return 0;
        }

        // Kahn's algorithm with longest-distance relaxation.
        let mut queue: VecDeque<usize> = (0..n).filter(|&i| indegree[i] == 0).collect();
        let mut dist = vec![0usize; n];
        let mut processed = 0;

        while let Some(node) = queue.pop_front() {
            processed += 1;
            for &next in &out[node] {
                dist[next] = dist[next].max(dist[node] + 1);
                indegree[next] -= 1;
                if indegree[next] == 0 {
                    queue.push_back(next);
                }
            }
        }

        if processed < n {
            return n.saturating_sub(1).min(CYCLIC_DEPTH_CAP);
        }

        dist.into_iter().max().unwrap_or(0)
    }

    /// Longest simple directed path (in edges) over the `rels` subgraph.
    ///
    /// The search stops early once `cap` is reached or after
    /// `MAX_PATH_EXPANSIONS` node expansions, returning the best length found.
    #[must_use]
    pub fn longest_simple_path(&self, rels: &[EdgeRel], cap: usize) -> usize {
        let adj: Vec<Vec<usize>> = self
            .adjacency(rels)
            .into_iter()
            .map(|set| set.into_iter().collect())
            .collect();

        let mut best = 0;
        let mut expansions = 0;

        for start in 0..adj.len() {
            if best >= cap || expansions >= MAX_PATH_EXPANSIONS {
                break;
            }
            let mut on_path = vec![false; adj.len()];
            on_path[start] = true;
            let mut stack: Vec<(usize, usize)> = vec![(start, 0)];

            loop {
                best = best.max(stack.len().saturating_sub(1));
                if best >= cap || expansions >= MAX_PATH_EXPANSIONS {
                    break;
                }
                let Some(top) = stack.last_mut() else {
                    break;
                };
                let node = top.0;
                if let Some(&next) = adj[node].get(top.1) {
                    top.1 += 1;
                    if !on_path[next] {
                        expansions += 1;
                        on_path[next] = true;
                        stack.push((next, 0));
                    }
                } else {
                    on_path[node] = false;
                    stack.pop();
                }
            }
        }

        best.min(cap)
    }
}

// =============================================================================
// TESTS
// =============================================================================
