//! # Fixed Primitives
//!
//! Hardcoded runtime constants for the OpenLine core.
//!
//! Every extraction pass and graph search is bounded by one of these caps.
//! Guard caps here are the built-in defaults; `GuardConfig` may override them.

// =============================================================================
// EXTRACTION LIMITS
// =============================================================================

/// Maximum number of sentences the extractor examines, lead sentence included.
///
/// Longer inputs are truncated for extraction only; metrics still see the
/// whole text.
pub const MAX_SENTENCES: usize = 8;

/// Maximum `supports` edges the extractor emits per frame.
pub const MAX_SUPPORTS: usize = 4;

/// Maximum `contradicts` edges the extractor emits per frame.
pub const MAX_CONTRADICTIONS: usize = 2;

// =============================================================================
// GUARD DEFAULTS
// =============================================================================

/// Default cap on `cycle_plus` (self-reinforcing support loops).
pub const CYCLE_PLUS_CAP: usize = 4;

/// Default cap on the L1 holonomy gap between consecutive digests.
pub const DELTA_HOL_CAP: f64 = 2.0;

/// Base drift cap for asset classes without an entry in the asset table.
pub const DELTA_SCALE_CAP_DEFAULT: f64 = 0.03;

// =============================================================================
// DIGEST & METRIC BOUNDS
// =============================================================================

/// Ceiling for `depth` when the dependency subgraph contains a cycle.
pub const CYCLIC_DEPTH_CAP: usize = 8;

/// Path length at which `phi_topo`'s depth term saturates.
pub const PATH_NORM_CAP: usize = 6;

/// Node expansions allowed in the bounded longest-path search.
pub const MAX_PATH_EXPANSIONS: usize = 20_000;

// =============================================================================
// FRAME LIMITS
// =============================================================================

/// Recommended maximum size of a serialized frame at the network boundary.
pub const MAX_FRAME_BYTES: usize = 256_000;

/// Maximum number of nodes in a single frame.
///
/// The count caps bound digest and guard work for in-process callers that
/// never pass the byte check.
pub const MAX_FRAME_NODES: usize = 4096;

/// Maximum number of edges in a single frame.
pub const MAX_FRAME_EDGES: usize = 16_384;

/// Maximum number of morphs in a single frame.
pub const MAX_FRAME_MORPHS: usize = 1024;

/// Attempts the frame service makes before reporting a stream conflict.
pub const MAX_COMMIT_ATTEMPTS: usize = 3;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extraction_caps_fit_sentence_budget() {
        assert!(MAX_SUPPORTS + MAX_CONTRADICTIONS < MAX_SENTENCES);
    }

    #[test]
    fn guard_defaults() {
        assert_eq!(CYCLE_PLUS_CAP, 4);
        assert!((DELTA_HOL_CAP - 2.0).abs() < f64::EPSILON);
    }
}
