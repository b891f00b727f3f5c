//! # openline-core
//!
//! The frame acceptance engine for OpenLine - THE LOGIC.
//!
//! OpenLine turns short text into a small typed argumentation graph, reduces
//! that graph to a five-field structural digest plus scalar telemetry, and
//! guards every transition of a stream's digest history.
//!
//! ## Two Paths
//!
//! - **Content generation**: `extract` → `metrics` → `digest`, wrapped by
//!   [`FrameBuilder`]. Pure functions, no shared state.
//! - **Acceptance**: [`FrameService`] validates a frame, recomputes its
//!   digest, runs the [`GuardEngine`] against the stream's prior digest and
//!   commits through a [`StreamStore`].
//!
//! ## Architectural Constraints
//!
//! - NO async, NO network dependencies (pure Rust)
//! - Deterministic: `BTreeMap` only, traversals in id order
//! - Bounded: every extraction pass and graph search has a fixed cap
//! - The stream store is the only shared mutable state

// =============================================================================
// MODULES
// =============================================================================

pub mod builder;
pub mod digest;
pub mod extract;
pub mod graph;
pub mod guard;
pub mod lexicon;
pub mod metrics;
pub mod primitives;
pub mod schema;
pub mod service;
pub mod store;
pub mod thresholds;
pub mod types;
pub mod validate;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{
    Digest, Edge, EdgeRel, Frame, Gauge, MorphOp, Node, NodeType, OpenlineError, ShapeError,
    Telemetry,
};

// =============================================================================
// RE-EXPORTS: Content Generation
// =============================================================================

pub use builder::{FrameBuilder, PriorDigest};
pub use digest::{compute_digest, holonomy_gap, jsd_gap};
pub use extract::{Extraction, Extractor, extract};
pub use lexicon::{LexicalClassifier, SentenceClassifier};
pub use metrics::KappaBreakdown;

// =============================================================================
// RE-EXPORTS: Acceptance
// =============================================================================

pub use guard::{GuardConfig, GuardEngine, GuardViolation};
pub use service::{Acceptance, FrameService};
pub use store::{InMemoryStreamStore, StreamStore};
pub use thresholds::{ScaleCaps, StaticThresholds, ThresholdSource, TunedThresholds};
pub use validate::{FrameValidator, decode_frame};
