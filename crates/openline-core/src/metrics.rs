//! # Metrics Engine
//!
//! Pure, deterministic telemetry over text and graphs.
//!
//! Nothing here consults the stream store. All outputs that are documented as
//! bounded are clamped to their range.

use crate::digest::digest_of;
use crate::graph::ArgGraph;
use crate::lexicon::{authority_score, split_sentences, tokenize};
use crate::primitives::PATH_NORM_CAP;
use crate::{Edge, EdgeRel, Node};
use std::collections::BTreeMap;

/// Compression level used for the redundancy signal.
const COMPRESSION_LEVEL: i32 = 3;

/// Mean and spread of the token-length prior used by `kappa_eff`.
const LENGTH_MU: f64 = 250.0;
const LENGTH_SIGMA: f64 = 100.0;

// =============================================================================
// PRIMITIVES
// =============================================================================

/// Logistic function.
#[must_use]
pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Bag of words over [`tokenize`].
#[must_use]
pub fn bag_of_words(text: &str) -> BTreeMap<String, usize> {
    let mut bag = BTreeMap::new();
    for token in tokenize(text) {
        *bag.entry(token).or_insert(0) += 1;
    }
    bag
}

/// Cosine similarity of two bags; 0 when either is empty.
#[must_use]
pub fn cosine(a: &BTreeMap<String, usize>, b: &BTreeMap<String, usize>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let dot: f64 = a
        .iter()
        .filter_map(|(k, x)| b.get(k).map(|y| (*x * *y) as f64))
        .sum();
    let norm = |bag: &BTreeMap<String, usize>| {
        bag.values()
            .map(|v| (*v as f64) * (*v as f64))
            .sum::<f64>()
            .sqrt()
    };
    let (na, nb) = (norm(a), norm(b));
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    dot / (na * nb)
}

/// Sentence discontinuity index.
///
/// `1 - mean cosine` of adjacent sentences, clamped to `[0, 1]`; 0 for fewer
/// than two sentences.
#[must_use]
pub fn sdi(text: &str) -> f64 {
    let sentences = split_sentences(text);
    if sentences.len() < 2 {
        return 0.0;
    }
    let bags: Vec<_> = sentences.iter().map(|s| bag_of_words(s)).collect();
    let sims: Vec<f64> = bags.windows(2).map(|w| cosine(&w[0], &w[1])).collect();
    let mean = sims.iter().sum::<f64>() / sims.len() as f64;
    (1.0 - mean).clamp(0.0, 1.0)
}

/// Compressed size over raw size (zstd); 1.0 for empty text or on failure.
#[must_use]
pub fn compress_ratio(text: &str) -> f64 {
    let raw = text.as_bytes();
    if raw.is_empty() {
        return 1.0;
    }
    match zstd::bulk::compress(raw, COMPRESSION_LEVEL) {
        Ok(compressed) => compressed.len() as f64 / raw.len() as f64,
        Err(e) => {
            tracing::debug!(error = %e, "compression failed; treating text as incompressible");
            1.0
        }
    }
}

/// Normalized Shannon entropy of the token distribution.
///
/// 0 when the vocabulary has at most one word.
#[must_use]
pub fn structural_entropy(tokens: &[String]) -> f64 {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for t in tokens {
        *counts.entry(t.as_str()).or_insert(0) += 1;
    }
    if counts.len() <= 1 {
        return 0.0;
    }
    let total = tokens.len() as f64;
    let h: f64 = counts
        .values()
        .map(|c| {
            let p = *c as f64 / total;
            -p * p.ln()
        })
        .sum();
    (h / (counts.len() as f64).ln()).clamp(0.0, 1.0)
}

// =============================================================================
// COHERENCE
// =============================================================================

/// Topological coherence of a graph in `[0, 1]`.
///
/// `σ(0.40·ln(1 + E/(N+1)) + 0.20·D − 0.35·C − 0.25·X + 0.30·S/(X+1))`
/// where `D` is the normalized longest supports/contradicts/depends_on path,
/// `C` the cycle count, `X` the contradiction count and `S` the support count.
#[must_use]
pub fn phi_topo(nodes: &[Node], edges: &[Edge]) -> f64 {
    let graph = ArgGraph::new(nodes, edges);
    let digest = digest_of(&graph);

    let n = nodes.len() as f64;
    let e = edges.len() as f64;
    let supports = graph.count_rel(EdgeRel::Supports) as f64;
    let x = digest.x_frontier as f64;
    let c = digest.cycle_plus as f64;
    let path = graph.longest_simple_path(
        &[EdgeRel::Supports, EdgeRel::Contradicts, EdgeRel::DependsOn],
        PATH_NORM_CAP,
    );
    let d_norm = path.min(PATH_NORM_CAP) as f64 / PATH_NORM_CAP as f64;

    let lin = 0.40 * (1.0 + e / (n + 1.0)).ln() + 0.20 * d_norm - 0.35 * c - 0.25 * x
        + 0.30 * supports / (x + 1.0);
    sigmoid(lin)
}

/// Semantic coherence of text in `[0, 1]`.
///
/// `0.6·SDI + 0.4·max(0, 1 − compression ratio)`.
#[must_use]
pub fn phi_sem(text: &str) -> f64 {
    let redundancy = (1.0 - compress_ratio(text)).max(0.0);
    (0.6 * sdi(text) + 0.4 * redundancy).clamp(0.0, 1.0)
}

/// Semantic coherence blended with evidence agreement.
///
/// `0.7·phi_sem + 0.3·mean cosine` across `supports` edge endpoint labels.
/// Without `supports` edges this is plain [`phi_sem`].
#[must_use]
pub fn phi_sem_with_evidence(text: &str, nodes: &[Node], edges: &[Edge]) -> f64 {
    let base = phi_sem(text);
    let labels: BTreeMap<&str, &str> = nodes
        .iter()
        .map(|n| (n.id.as_str(), n.label.as_str()))
        .collect();

    let sims: Vec<f64> = edges
        .iter()
        .filter(|e| e.rel == EdgeRel::Supports)
        .filter_map(|e| {
            let src = labels.get(e.src.as_str())?;
            let dst = labels.get(e.dst.as_str())?;
            Some(cosine(&bag_of_words(src), &bag_of_words(dst)))
        })
        .collect();

    if sims.is_empty() {
        return base;
    }
    let agreement = sims.iter().sum::<f64>() / sims.len() as f64;
    (0.7 * base + 0.3 * agreement).clamp(0.0, 1.0)
}

// =============================================================================
// UNCERTAINTY
// =============================================================================

/// `kappa_eff` and the components it was derived from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KappaBreakdown {
    /// Effective uncertainty in `[0, 1]`.
    pub kappa: f64,
    /// Load: length deviation, entropy and sentence rate.
    pub rho: f64,
    /// Structural support, floored at 1e-3.
    pub s_star: f64,
    /// Strongest citation authority in the node labels.
    pub cite_score: f64,
}

/// Effective uncertainty of a text given its coherence signals.
#[must_use]
pub fn kappa_eff(text: &str, phi_topo: f64, phi_sem: f64, nodes: &[Node]) -> KappaBreakdown {
    let tokens = tokenize(text);
    let z_len = ((tokens.len() as f64 - LENGTH_MU) / LENGTH_SIGMA).clamp(-3.0, 3.0);
    let entropy = structural_entropy(&tokens);
    let rate = (split_sentences(text).len() as f64 / 10.0).min(1.0);

    let rho = 0.45 * z_len.abs() + 0.35 * entropy + 0.20 * rate;
    let s_star = (0.45 * phi_topo + 0.45 * phi_sem + 0.10).max(1e-3);
    let kappa_base = sigmoid(1.4 * rho / s_star);

    let cite_score = nodes
        .iter()
        .map(|n| authority_score(&n.label))
        .fold(0.0, f64::max);
    let kappa = (kappa_base * (1.0 - 0.30 * cite_score)).clamp(0.0, 1.0);

    KappaBreakdown {
        kappa,
        rho,
        s_star,
        cite_score,
    }
}

/// Token cost of a text.
#[must_use]
pub fn cost_tokens(text: &str) -> u64 {
    tokenize(text).len() as u64
}

// =============================================================================
// TESTS
// =============================================================================
