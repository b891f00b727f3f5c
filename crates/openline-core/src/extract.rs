//! # Text Extractor
//!
//! Bounded, rule-based extraction of a small argumentation graph from text.
//!
//! - The lead sentence becomes the Claim
//! - Later sentences become Evidence that supports or contradicts it
//! - Citations become Source nodes
//! - Every pass is capped; extraction never fails

use crate::lexicon::{LexicalClassifier, SentenceClassifier, has_cite_marker, split_sentences};
use crate::primitives::{MAX_CONTRADICTIONS, MAX_SENTENCES, MAX_SUPPORTS};
use crate::{Edge, EdgeRel, Node, NodeType};

/// Result of one extraction pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    /// Extraction confidence in `[0, 1]`.
    pub confidence: f64,
    /// All sentences of the input, including those past the extraction cap.
    pub sentences: Vec<String>,
}

/// Text → candidate graph.
pub struct Extractor<C: SentenceClassifier = LexicalClassifier> {
    classifier: C,
}

impl Default for Extractor<LexicalClassifier> {
    fn default() -> Self {
        Self::new(LexicalClassifier::default())
    }
}

impl<C: SentenceClassifier> Extractor<C> {
    /// Create an extractor over a classifier.
    #[must_use]
    pub fn new(classifier: C) -> Self {
        Self { classifier }
    }

    /// Extract nodes and edges from text.
    ///
    /// Empty text yields an empty graph with confidence 0.
    #[must_use]
    pub fn extract(&self, text: &str) -> Extraction {
        let sentences = split_sentences(text);
        let Some(lead) = sentences.first() else {
            return Extraction {
                nodes: Vec::new(),
                edges: Vec::new(),
                confidence: 0.0,
                sentences,
            };
        };

        let mut ids = IdSequence::default();
        let claim_id = ids.next(NodeType::Claim);
        let mut nodes = vec![Node::new(claim_id.clone(), NodeType::Claim, lead.clone())];
        let mut edges = Vec::new();
        let mut supports_used = 0;
        let mut contras_used = 0;

        for sentence in sentences.iter().take(MAX_SENTENCES).skip(1) {
            let is_contra = self.classifier.contradicts(sentence);
            let is_support = self.classifier.supports(sentence);

            let rel = if is_contra && contras_used < MAX_CONTRADICTIONS {
                contras_used += 1;
                Some(EdgeRel::Contradicts)
            } else if (is_support || !is_contra) && supports_used < MAX_SUPPORTS {
                supports_used += 1;
                Some(EdgeRel::Supports)
            } else {
                None
            };

            if let Some(rel) = rel {
                let node_type = self.classifier.classify(sentence);
                let id = ids.next(node_type);
                nodes.push(Node::new(id.clone(), node_type, sentence.clone()));
                edges.push(Edge::new(id, claim_id.clone(), rel));
            }

            if self.classifier.cites(sentence) {
                let citing = nodes
                    .iter()
                    .rev()
                    .find(|n| n.node_type != NodeType::Source)
                    .map_or_else(|| claim_id.clone(), |n| n.id.clone());
                let id = ids.next(NodeType::Source);
                nodes.push(Node::new(id.clone(), NodeType::Source, sentence.clone()));
                edges.push(Edge::new(citing, id, EdgeRel::Cites));
            }
        }

        let confidence = confidence(&nodes, edges.len(), sentences.len());
        tracing::trace!(
            nodes = nodes.len(),
            edges = edges.len(),
            confidence,
            "extracted graph"
        );

        Extraction {
            nodes,
            edges,
            confidence,
            sentences,
        }
    }
}

/// Coverage × link syntax.
fn confidence(nodes: &[Node], edge_count: usize, sentence_count: usize) -> f64 {
    let coverage = ((nodes.len() + edge_count) as f64 / (1 + sentence_count) as f64).min(1.0);
    let link_syntax = if nodes.iter().any(|n| has_cite_marker(&n.label)) {
        1.0
    } else {
        0.5
    };
    (coverage * link_syntax).min(1.0)
}

/// Running id counter shared by all node types: `C1`, `E2`, `S3`, ...
#[derive(Default)]
struct IdSequence {
    counter: usize,
}

impl IdSequence {
    fn next(&mut self, node_type: NodeType) -> String {
        self.counter += 1;
        format!("{}{}", node_type.initial(), self.counter)
    }
}

/// Extract with the default lexical classifier.
#[must_use]
pub fn extract(text: &str) -> Extraction {
    Extractor::default().extract(text)
}

// =============================================================================
// TESTS
// =============================================================================
