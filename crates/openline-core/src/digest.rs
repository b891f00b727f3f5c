//! # Digest Computer
//!
//! Reduces a graph to its five-field structural fingerprint and measures the
//! gap between two fingerprints.
//!
//! - `compute_digest` never fails; an empty graph yields all zeros
//! - `holonomy_gap` is the authoritative L1 distance
//! - `jsd_gap` is the bounded divergence used against untrusted priors

use crate::graph::ArgGraph;
use crate::{Digest, Edge, EdgeRel, Node};

/// Smoothing added to every component before normalizing to a distribution.
const JSD_EPSILON: f64 = 1e-9;

/// Compute the digest of a graph.
///
/// - `b0`: weakly connected components over all edges
/// - `cycle_plus`: back-edges in the `supports`-only subgraph
/// - `x_frontier`: number of `contradicts` edges
/// - `s_over_c`: supports per contradiction (supports count when there are none)
/// - `depth`: longest `depends_on` chain, capped when the chain is cyclic
#[must_use]
pub fn compute_digest(nodes: &[Node], edges: &[Edge]) -> Digest {
    let graph = ArgGraph::new(nodes, edges);
    digest_of(&graph)
}

/// Compute the digest of an already indexed graph.
#[must_use]
pub fn digest_of(graph: &ArgGraph<'_>) -> Digest {
    if graph.node_count() == 0 {
        return Digest::default();
    }

    let supports = graph.count_rel(EdgeRel::Supports);
    let x_frontier = graph.count_rel(EdgeRel::Contradicts);
    let s_over_c = if x_frontier == 0 {
        supports as f64
    } else {
        supports as f64 / x_frontier as f64
    };

    Digest {
        b0: graph.weak_components(),
        cycle_plus: graph.back_edges(&[EdgeRel::Supports]),
        x_frontier,
        s_over_c,
        depth: graph.chain_depth(EdgeRel::DependsOn),
    }
}

/// L1 distance between two digests, summed over all five fields.
///
/// Symmetric, zero on identical digests.
#[must_use]
pub fn holonomy_gap(a: &Digest, b: &Digest) -> f64 {
    a.as_vector()
        .iter()
        .zip(b.as_vector().iter())
        .map(|(x, y)| (x - y).abs())
        .sum()
}

/// L1 gap against an optional prior; no prior means no gap.
#[must_use]
pub fn holonomy_gap_from(prior: Option<&Digest>, current: &Digest) -> f64 {
    prior.map_or(0.0, |p| holonomy_gap(p, current))
}

/// Jensen–Shannon divergence (natural log) between the two digests viewed as
/// distributions.
///
/// Each vector is shifted by a small epsilon and normalized, so the result is
/// always finite and bounded by `ln 2`.
#[must_use]
pub fn jsd_gap(a: &Digest, b: &Digest) -> f64 {
    let p = normalize(a.as_vector());
    let q = normalize(b.as_vector());

    let mut divergence = 0.0;
    for i in 0..p.len() {
        let m = 0.5 * (p[i] + q[i]);
        divergence += 0.5 * p[i] * (p[i] / m).ln() + 0.5 * q[i] * (q[i] / m).ln();
    }
    divergence.max(0.0)
}

fn normalize(v: [f64; 5]) -> [f64; 5] {
    let shifted = v.map(|x| x.max(0.0) + JSD_EPSILON);
    let total: f64 = shifted.iter().sum();
    shifted.map(|x| x / total)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NodeType;

    fn claim(id: &str) -> Node {
        Node::new(id, NodeType::Claim, id)
    }

    #[test]
    fn empty_graph_digest_is_zero() {
        assert_eq!(compute_digest(&[], &[]), Digest::default());
    }

    #[test]
    fn edgeless_graph() {
        let nodes = vec![claim("a"), claim("b"), claim("c")];
        let d = compute_digest(&nodes, &[]);
        assert_eq!(d.b0, 3);
        assert_eq!(d.cycle_plus, 0);
        assert_eq!(d.x_frontier, 0);
        assert!(d.s_over_c.abs() < f64::EPSILON);
        assert_eq!(d.depth, 0);
    }

    #[test]
    fn mixed_graph() {
        let nodes = vec![claim("c1"), claim("e1"), claim("e2"), claim("x1")];
        let edges = vec![
            Edge::new("e1", "c1", EdgeRel::Supports),
            Edge::new("e2", "c1", EdgeRel::Supports),
            Edge::new("x1", "c1", EdgeRel::Contradicts),
            Edge::new("e2", "e1", EdgeRel::DependsOn),
        ];
        let d = compute_digest(&nodes, &edges);
        assert_eq!(d.b0, 1);
        assert_eq!(d.cycle_plus, 0);
        assert_eq!(d.x_frontier, 1);
        assert!((d.s_over_c - 2.0).abs() < f64::EPSILON);
        assert_eq!(d.depth, 1);
    }

    #[test]
    fn support_loop_counts_once() {
        let nodes = vec![claim("a"), claim("b")];
        let edges = vec![
            Edge::new("a", "b", EdgeRel::Supports),
            Edge::new("b", "a", EdgeRel::Supports),
        ];
        assert_eq!(compute_digest(&nodes, &edges).cycle_plus, 1);
    }

    #[test]
    fn l1_gap() {
        let a = Digest {
            b0: 1,
            cycle_plus: 0,
            x_frontier: 2,
            s_over_c: 1.0,
            depth: 0,
        };
        let b = Digest {
            b0: 2,
            cycle_plus: 0,
            x_frontier: 0,
            s_over_c: 1.5,
            depth: 1,
        };
        assert!((holonomy_gap(&a, &b) - 4.5).abs() < 1e-12);
        assert!((holonomy_gap(&b, &a) - 4.5).abs() < 1e-12);
        assert!(holonomy_gap(&a, &a).abs() < f64::EPSILON);
        assert!(holonomy_gap_from(None, &a).abs() < f64::EPSILON);
    }

    #[test]
    fn jsd_is_bounded_and_symmetric() {
        let a = Digest {
            b0: 5,
            ..Digest::default()
        };
        let b = Digest {
            depth: 5,
            ..Digest::default()
        };
        let ab = jsd_gap(&a, &b);
        let ba = jsd_gap(&b, &a);
        assert!(ab > 0.0);
        assert!(ab <= std::f64::consts::LN_2 + 1e-9);
        assert!((ab - ba).abs() < 1e-12);
        assert!(jsd_gap(&a, &a).abs() < 1e-12);
        assert!(jsd_gap(&Digest::default(), &Digest::default()).is_finite());
    }
}
