//! # Frame Service
//!
//! The acceptance path for submitted frames:
//! validate → recompute digest → guard against the prior → commit.
//!
//! On any failure nothing is committed. Commits are optimistic: the prior is
//! read, guards run without any lock held, and the store's compare-and-set
//! decides. A lost race re-reads the prior and re-runs the guards.

use crate::digest::{compute_digest, holonomy_gap_from};
use crate::guard::GuardEngine;
use crate::primitives::MAX_COMMIT_ATTEMPTS;
use crate::store::{InMemoryStreamStore, StreamStore};
use crate::thresholds::{ScaleCaps, StaticThresholds, ThresholdSource};
use crate::validate::FrameValidator;
use crate::{Digest, Frame, OpenlineError, Telemetry};
use serde::Serialize;
use std::sync::Arc;

/// Outcome of an accepted frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Acceptance {
    pub stream_id: String,
    pub logical_time: u64,
    /// Server-computed digest, now the stream's latest.
    pub digest: Digest,
    /// Submitted telemetry with `delta_hol` set to the L1 gap from `prior`.
    pub telemetry: Telemetry,
    /// The digest this frame was checked against.
    pub prior: Option<Digest>,
}

/// Validates, guards and commits frames.
pub struct FrameService {
    store: Arc<dyn StreamStore>,
    thresholds: Arc<dyn ThresholdSource>,
    guard: GuardEngine,
}

impl Default for FrameService {
    fn default() -> Self {
        Self::new(
            Arc::new(InMemoryStreamStore::new()),
            Arc::new(StaticThresholds::default()),
            GuardEngine::default(),
        )
    }
}

impl std::fmt::Debug for FrameService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameService")
            .field("guard", &self.guard)
            .finish()
    }
}

impl FrameService {
    /// Create a service over an injected store and threshold source.
    #[must_use]
    pub fn new(
        store: Arc<dyn StreamStore>,
        thresholds: Arc<dyn ThresholdSource>,
        guard: GuardEngine,
    ) -> Self {
        Self {
            store,
            thresholds,
            guard,
        }
    }

    /// The guard engine in use.
    #[must_use]
    pub fn guard(&self) -> &GuardEngine {
        &self.guard
    }

    /// Submit a frame for acceptance.
    ///
    /// # Errors
    /// - `InvalidFrame` if the frame is malformed
    /// - `GuardViolation` if a guard rejects the transition
    /// - `StreamConflict` if the stream kept changing underneath
    /// - Store errors are propagated unchanged
    pub fn submit(&self, frame: Frame) -> Result<Acceptance, OpenlineError> {
        let digest = self.prepare(&frame)?;
        let caps = self.thresholds.scale_caps();

        for attempt in 1..=MAX_COMMIT_ATTEMPTS {
            let prior = self.store.get(&frame.stream_id)?;
            self.run_guards(&frame, &digest, prior.as_ref(), &caps)?;

            if self
                .store
                .compare_and_set(&frame.stream_id, prior.as_ref(), digest.clone())?
            {
                let acceptance = accept(frame, digest, prior);
                tracing::info!(
                    stream = %acceptance.stream_id,
                    t = acceptance.logical_time,
                    delta_hol = acceptance.telemetry.delta_hol,
                    "frame accepted"
                );
                return Ok(acceptance);
            }

            tracing::debug!(stream = %frame.stream_id, attempt, "stream changed during commit; retrying");
        }

        tracing::warn!(stream = %frame.stream_id, "frame rejected: stream conflict");
        Err(OpenlineError::StreamConflict(frame.stream_id))
    }

    /// Evaluate a frame against an explicit prior without committing.
    pub fn preview(&self, frame: Frame, prior: Option<Digest>) -> Result<Acceptance, OpenlineError> {
        let digest = self.prepare(&frame)?;
        let caps = self.thresholds.scale_caps();
        self.run_guards(&frame, &digest, prior.as_ref(), &caps)?;
        Ok(accept(frame, digest, prior))
    }

    /// Latest accepted digest of a stream.
    pub fn latest(&self, stream_id: &str) -> Result<Option<Digest>, OpenlineError> {
        self.store.get(stream_id)
    }

    /// Number of streams with at least one accepted frame.
    pub fn stream_count(&self) -> Result<usize, OpenlineError> {
        self.store.len()
    }

    fn prepare(&self, frame: &Frame) -> Result<Digest, OpenlineError> {
        if let Err(e) = FrameValidator::validate(frame) {
            tracing::warn!(stream = %frame.stream_id, error = %e, "frame rejected: invalid shape");
            return Err(e.into());
        }

        let digest = compute_digest(&frame.nodes, &frame.edges);
        if let Some(claimed) = &frame.digest
            && *claimed != digest
        {
            tracing::debug!(
                stream = %frame.stream_id,
                ?claimed,
                computed = ?digest,
                "client digest differs from recomputed digest"
            );
        }
        Ok(digest)
    }

    fn run_guards(
        &self,
        frame: &Frame,
        digest: &Digest,
        prior: Option<&Digest>,
        caps: &ScaleCaps,
    ) -> Result<(), OpenlineError> {
        if let Err(violation) = self.guard.check(frame, digest, prior, caps) {
            tracing::warn!(
                stream = %frame.stream_id,
                code = violation.code(),
                cap = violation.cap(),
                observed = violation.observed(),
                "frame rejected: {violation}"
            );
            return Err(violation.into());
        }
        Ok(())
    }
}

fn accept(frame: Frame, digest: Digest, prior: Option<Digest>) -> Acceptance {
    let mut telemetry = frame.telemetry;
    telemetry.delta_hol = holonomy_gap_from(prior.as_ref(), &digest);
    Acceptance {
        stream_id: frame.stream_id,
        logical_time: frame.logical_time,
        digest,
        telemetry,
        prior,
    }
}

// =============================================================================
// TESTS
// =============================================================================
