//! # Frame Builder
//!
//! The content-generation path: text → complete [`Frame`].
//!
//! Extraction, digest and telemetry are computed locally; nothing is
//! committed. The resulting frame can be submitted to a
//! [`FrameService`](crate::service::FrameService) as-is.

use crate::digest::{compute_digest, holonomy_gap, jsd_gap};
use crate::extract::Extractor;
use crate::lexicon::{LexicalClassifier, SentenceClassifier};
use crate::metrics::{cost_tokens, kappa_eff, phi_sem_with_evidence, phi_topo};
use crate::{Digest, Frame, Gauge, Telemetry};

/// Units string attached to built frames.
pub const BUILT_FRAME_UNITS: &str = "confidence:0..1,cost:tokens";

/// Digest the new frame is measured against.
#[derive(Debug, Clone, PartialEq)]
pub enum PriorDigest {
    /// Produced by this system: gap is the L1 distance.
    Trusted(Digest),
    /// Supplied by a client: gap is the Jensen–Shannon divergence.
    Untrusted(Digest),
}

impl PriorDigest {
    fn gap(&self, current: &Digest) -> f64 {
        match self {
            PriorDigest::Trusted(prior) => holonomy_gap(prior, current),
            PriorDigest::Untrusted(prior) => jsd_gap(prior, current),
        }
    }
}

/// Builder for frames derived from text.
pub struct FrameBuilder<C: SentenceClassifier = LexicalClassifier> {
    stream_id: String,
    logical_time: u64,
    prior: Option<PriorDigest>,
    extractor: Extractor<C>,
}

impl FrameBuilder<LexicalClassifier> {
    /// Start a frame for a stream with the default classifier.
    #[must_use]
    pub fn new(stream_id: impl Into<String>) -> Self {
        Self::with_extractor(stream_id, Extractor::default())
    }
}

impl<C: SentenceClassifier> FrameBuilder<C> {
    /// Start a frame for a stream with a custom extractor.
    #[must_use]
    pub fn with_extractor(stream_id: impl Into<String>, extractor: Extractor<C>) -> Self {
        Self {
            stream_id: stream_id.into(),
            logical_time: 1,
            prior: None,
            extractor,
        }
    }

    /// Set the logical time (default 1).
    #[must_use]
    pub fn logical_time(mut self, t: u64) -> Self {
        self.logical_time = t;
        self
    }

    /// Measure `delta_hol` against a prior digest.
    #[must_use]
    pub fn prior(mut self, prior: Option<PriorDigest>) -> Self {
        self.prior = prior;
        self
    }

    /// Build the frame.
    #[must_use]
    pub fn build(&self, text: &str) -> Frame {
        let extraction = self.extractor.extract(text);
        let digest = compute_digest(&extraction.nodes, &extraction.edges);

        let phi_topo = phi_topo(&extraction.nodes, &extraction.edges);
        let phi_sem = phi_sem_with_evidence(text, &extraction.nodes, &extraction.edges);
        let kappa = kappa_eff(text, phi_topo, phi_sem, &extraction.nodes);
        let delta_hol = self.prior.as_ref().map_or(0.0, |p| p.gap(&digest));

        let telemetry = Telemetry {
            phi_sem,
            phi_topo,
            delta_hol,
            kappa_eff: kappa.kappa,
            cost_tokens: cost_tokens(text),
            rho: Some(kappa.rho),
            s_star: Some(kappa.s_star),
            cite_score: Some(kappa.cite_score),
            confidence: Some(extraction.confidence),
            ..Telemetry::default()
        };

        tracing::debug!(
            stream = %self.stream_id,
            t = self.logical_time,
            nodes = extraction.nodes.len(),
            edges = extraction.edges.len(),
            kappa = kappa.kappa,
            "built frame from text"
        );

        Frame {
            stream_id: self.stream_id.clone(),
            logical_time: self.logical_time,
            gauge: Gauge::Sym,
            units: Some(BUILT_FRAME_UNITS.to_string()),
            nodes: extraction.nodes,
            edges: extraction.edges,
            digest: Some(digest),
            morphs: Vec::new(),
            telemetry,
            signature: None,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::FrameValidator;

    const TEXT: &str = "The treatment reduces risk. Because trials show an effect, \
                        we adopt it. However, one cohort disagrees. \
                        According to doi:10.1000/xyz, findings replicate.";

    #[test]
    fn built_frame_is_valid() {
        let frame = FrameBuilder::new("demo").logical_time(3).build(TEXT);
        assert_eq!(frame.stream_id, "demo");
        assert_eq!(frame.logical_time, 3);
        assert!(FrameValidator::validate(&frame).is_ok());
        assert_eq!(frame.digest.as_ref().map(|d| d.x_frontier), Some(1));
        assert!(frame.telemetry.cost_tokens > 0);
        assert!((frame.telemetry.cite_score.unwrap_or_default() - 1.0).abs() < 1e-12);
        assert!(frame.telemetry.delta_hol.abs() < f64::EPSILON);
    }

    #[test]
    fn trusted_prior_uses_l1() {
        let prior = Digest {
            b0: 4,
            ..Digest::default()
        };
        let frame = FrameBuilder::new("demo")
            .prior(Some(PriorDigest::Trusted(prior.clone())))
            .build(TEXT);
        let current = frame.digest.clone().unwrap_or_default();
        assert!((frame.telemetry.delta_hol - holonomy_gap(&prior, &current)).abs() < 1e-12);
    }

    #[test]
    fn untrusted_prior_uses_jsd() {
        let prior = Digest {
            b0: 4,
            ..Digest::default()
        };
        let frame = FrameBuilder::new("demo")
            .prior(Some(PriorDigest::Untrusted(prior)))
            .build(TEXT);
        assert!(frame.telemetry.delta_hol <= std::f64::consts::LN_2 + 1e-9);
        assert!(frame.telemetry.delta_hol > 0.0);
    }

    #[test]
    fn empty_text_builds_empty_frame() {
        let frame = FrameBuilder::new("demo").build("");
        assert!(frame.nodes.is_empty());
        assert_eq!(frame.digest, Some(Digest::default()));
        assert_eq!(frame.telemetry.confidence, Some(0.0));
    }
}
